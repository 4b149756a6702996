use std::fs::read_to_string;

use jsongraph::{
    bean::{Bean, DynamicAttributes, PropertyOptions, TargetType, TypeDescriptor},
    reader::{
        DiscriminatorSpec, LexErrorKind, Literal, ParseError, SyntaxError, SyntaxErrorKind,
        TokenKind, Tokenizer,
    },
    value::{Map, Value},
    Codec,
};

use crate::test_lib::{
    discriminator_codec, get_test_data_file_path, init_logger, record, Bar, Cell, Foo, Grid,
    Record,
};

mod test_lib;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn object(members: &[(&str, Value)]) -> Value {
    Value::Object(
        members
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect::<Map>(),
    )
}

#[test]
fn discriminator_dispatch() -> TestResult {
    init_logger();
    let json = r#"[{"type":"foo","value":"aaa"},{"type":"bar","value":"bbb"},{"type":"qux","value":"ccc"}]"#;

    let items: Vec<Value> = discriminator_codec(true).parse(json)?;
    assert_eq!(3, items.len());
    assert_eq!(
        Some(&Foo {
            value: "aaa".to_owned()
        }),
        items[0].as_bean::<Foo>()
    );
    assert_eq!(
        Some(&Bar {
            value: "bbb".to_owned()
        }),
        items[1].as_bean::<Bar>()
    );
    assert_eq!(
        object(&[("type", Value::from("qux")), ("value", Value::from("ccc"))]),
        items[2]
    );
    Ok(())
}

#[test]
fn discriminator_undefined_rejected() {
    let json = r#"[{"type":"foo","value":"aaa"},{"type":"bar","value":"bbb"},{"type":"qux","value":"ccc"}]"#;

    match discriminator_codec(false).parse_value(json) {
        Err(ParseError::TypeResolutionError {
            field,
            value,
            location,
        }) => {
            assert_eq!("type", field);
            assert_eq!("qux", value);
            assert_eq!("[]", location.path);
            assert_eq!(json.find("\"qux\"").unwrap(), location.offset);
        }
        r => panic!("Unexpected result: {r:?}"),
    }
}

#[test]
fn discriminator_absent() -> TestResult {
    // Objects without the discriminator member use the fallback, even if undefined values
    // are not allowed
    let value = discriminator_codec(false).parse_value(r#"{"a": {"value": 1}}"#)?;
    assert_eq!(
        object(&[("a", object(&[("value", Value::from(1))]))]),
        value
    );
    Ok(())
}

#[test]
fn discriminator_keeps_declared_types() -> TestResult {
    let codec = discriminator_codec(true);
    let grid: Grid = codec.parse(r#"{"cells": [[{"x": 1}]], "origin": {"x": 2}}"#)?;
    assert_eq!(vec![vec![Cell { x: 1 }]], grid.cells);
    assert_eq!(Some(Cell { x: 2 }), grid.origin);

    // A present discriminator still selects the type
    match codec.parse::<Grid>(r#"{"origin": {"type": "foo", "value": "v"}}"#) {
        Err(ParseError::ConversionError { name, location, .. }) => {
            assert_eq!(Some("origin".to_owned()), name);
            assert_eq!(".origin", location.path);
        }
        r => panic!("Unexpected result: {r:?}"),
    }
    Ok(())
}

#[test]
fn discriminator_fallback_type() -> TestResult {
    let mut codec = Codec::new();
    codec.set_discriminator(
        DiscriminatorSpec::new("type", true)
            .with_type("foo", TargetType::bean::<Foo>())
            .with_fallback(TargetType::bean::<Record>()),
    );
    let value = codec.parse_value(r#"[{"type": 1, "record_name": "r"}]"#)?;
    let record = value.as_array().unwrap()[0].as_bean::<Record>().unwrap();
    assert_eq!("r", record.name);
    // The discriminator member itself is stored as dynamic attribute
    assert_eq!(Value::from(1), record.attributes.attribute("type").cloned().unwrap());
    Ok(())
}

#[test]
fn path_specific_discriminator() -> TestResult {
    let mut codec = discriminator_codec(false);
    codec.set_discriminator_at(
        ".special",
        DiscriminatorSpec::new("kind", false).with_type("record", TargetType::bean::<Record>()),
    );

    let json = r#"{
        "special": {"type": "foo", "kind": "record", "record_name": "r"},
        "other": {"value": "v", "type": "foo"}
    }"#;
    let value = codec.parse_value(json)?;

    let special = value.get("special").and_then(|v| v.as_bean::<Record>()).unwrap();
    assert_eq!("r", special.name);
    assert_eq!(vec!["kind", "type"], special.attributes.attribute_names());

    let other = value.get("other").and_then(|v| v.as_bean::<Foo>()).unwrap();
    assert_eq!("v", other.value);
    Ok(())
}

#[test]
fn type_hints() -> TestResult {
    let mut codec = Codec::new();
    codec.add_type_hint(".rows[].value", TargetType::bean::<Record>());

    let json = r#"{"rows": [{"value": {"record_name": "a", "count": 1}}, {"value": {"count": 2}}]}"#;
    let value = codec.parse_value(json)?;
    let rows = value.get("rows").and_then(Value::as_array).unwrap();
    assert_eq!(
        vec![Some(&record("a", 1)), Some(&record("", 2))],
        rows.iter()
            .map(|row| row.get("value").and_then(|v| v.as_bean::<Record>()))
            .collect::<Vec<_>>()
    );
    Ok(())
}

#[test]
fn type_hint_beats_discriminator() -> TestResult {
    let mut codec = discriminator_codec(false);
    codec.add_type_hint("[]", TargetType::Map);

    let value = codec.parse_value(r#"[{"type": "foo", "other": true}]"#)?;
    assert_eq!(
        Value::Array(vec![object(&[
            ("other", Value::from(true)),
            ("type", Value::from("foo"))
        ])]),
        value
    );
    assert_eq!(Some(TargetType::Map), codec.type_hints().get("[]"));
    Ok(())
}

#[test]
fn unknown_field() {
    let codec = Codec::new();
    let result = codec.parse::<Foo>(r#"{"unknownField":1}"#);
    match result {
        Err(ParseError::PropertyError {
            ref name,
            ref target,
            ref location,
        }) => {
            assert_eq!("unknownField", name);
            assert_eq!("Foo", target);
            assert_eq!(".unknownField", location.path);
            assert_eq!(1, location.offset);
        }
        ref r => panic!("Unexpected result: {r:?}"),
    }
    assert_eq!(
        "cannot set member 'unknownField' on Foo at path '.unknownField', line 0, column 1 (offset 1)",
        result.unwrap_err().to_string()
    );
}

#[test]
fn bean_members() -> TestResult {
    let codec = Codec::new();
    let json = r#"{
        "record_name": "root",
        "count": "3",
        "secret": "s",
        "note": null,
        "children": [{"record_name": "child", "count": 4.0, "extra": [true]}],
        "flag": false
    }"#;
    let parsed: Record = codec.parse(json)?;

    let mut child = record("child", 4);
    child
        .attributes
        .set_attribute("extra", Value::Array(vec![Value::from(true)]));
    let mut expected = Record {
        secret: "s".to_owned(),
        children: vec![child],
        ..record("root", 3)
    };
    expected.attributes.set_attribute("flag", Value::from(false));

    assert_eq!(expected, parsed);
    Ok(())
}

#[test]
fn renamed_property_is_only_set_by_wire_name() {
    let codec = Codec::new();
    match codec.parse::<Record>(r#"{"name": "a"}"#) {
        // Without a property for the member it becomes a dynamic attribute
        Ok(record) => {
            assert_eq!("", record.name);
            assert_eq!(Some(&Value::from("a")), record.attributes.attribute("name"));
        }
        r => panic!("Unexpected result: {r:?}"),
    }
}

#[derive(Clone, PartialEq, Default, Debug)]
struct Playlist {
    name: String,
    tracks: Vec<Foo>,
}

impl Bean for Playlist {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Playlist>("Playlist")
            .property("name", |p| &p.name, |p, v| p.name = v)
            .read_only("tracks", |p: &Playlist| &p.tracks, PropertyOptions::default())
            .accumulator("track", |p: &mut Playlist, track: Foo| p.tracks.push(track))
            .build()
    }
}
jsongraph::bean_value!(Playlist);

#[test]
fn accumulator() -> TestResult {
    let codec = Codec::new();
    let playlist: Playlist =
        codec.parse(r#"{"track": [{"value": "a"}], "name": "p", "track": [{"value": "b"}]}"#)?;
    assert_eq!(
        vec!["a", "b"],
        playlist
            .tracks
            .iter()
            .map(|t| t.value.as_str())
            .collect::<Vec<_>>()
    );
    assert_eq!("p", playlist.name);

    match codec.parse::<Playlist>(r#"{"track": {"value": "a"}}"#) {
        Err(ParseError::PropertyError { name, target, .. }) => {
            assert_eq!("track", name);
            assert_eq!("Playlist", target);
        }
        r => panic!("Unexpected result: {r:?}"),
    }
    Ok(())
}

#[test]
fn conversion_error() {
    let codec = Codec::new();
    match codec.parse::<Record>(r#"{"count": "many"}"#) {
        Err(ParseError::ConversionError {
            name,
            error,
            location,
        }) => {
            assert_eq!(Some("count".to_owned()), name);
            assert_eq!("i64", error.to);
            assert_eq!(".count", location.path);
            assert_eq!(10, location.offset);
        }
        r => panic!("Unexpected result: {r:?}"),
    }
}

#[test]
fn syntax_errors() {
    fn assert_syntax_error(json: &str, expected_kind: SyntaxErrorKind, expected_path: &str) {
        match Codec::new().parse_value(json) {
            Err(ParseError::SyntaxError(SyntaxError { kind, location, .. })) => {
                assert_eq!(expected_kind, kind, "for {json}");
                assert_eq!(expected_path, location.path, "for {json}");
            }
            r => panic!("Unexpected result for {json}: {r:?}"),
        }
    }

    assert_syntax_error(
        "[1,]",
        SyntaxErrorKind::UnexpectedToken {
            expected: &[
                TokenKind::BraceOpen,
                TokenKind::BracketOpen,
                TokenKind::String,
                TokenKind::Integer,
                TokenKind::Decimal,
                TokenKind::True,
                TokenKind::False,
                TokenKind::Null,
            ],
        },
        "[]",
    );
    assert_syntax_error("{}{}", SyntaxErrorKind::TrailingData, "");
    assert_syntax_error("\"a\"", SyntaxErrorKind::NotAContainer, "");
    assert_syntax_error(
        r#"{"a" 1}"#,
        SyntaxErrorKind::UnexpectedToken {
            expected: &[TokenKind::Colon],
        },
        "",
    );
}

#[test]
fn lex_errors() {
    match Codec::new().parse_value(r#"{"a": [tru]}"#) {
        Err(ParseError::LexError { error, path }) => {
            assert_eq!(LexErrorKind::InvalidKeyword, error.kind);
            assert_eq!(7, error.offset);
            // Path of the array whose item could not be lexed
            assert_eq!(".a", path);
        }
        r => panic!("Unexpected result: {r:?}"),
    }

    match Codec::new().parse_value("[\"a\n\"]") {
        Err(ParseError::LexError { error, .. }) => {
            assert_eq!(LexErrorKind::NotEscapedControlCharacter, error.kind);
        }
        r => panic!("Unexpected result: {r:?}"),
    }
}

#[test]
fn large_numbers() -> TestResult {
    let mut tokenizer = Tokenizer::new("99999999999999999999");
    let token = tokenizer.next_token()?;
    assert_eq!(TokenKind::Decimal, token.kind());
    assert_eq!(Some(&Literal::Decimal(1e20)), token.value());

    let value = Codec::new().parse_value("[99999999999999999999, 9223372036854775807]")?;
    assert_eq!(
        Value::Array(vec![Value::Decimal(1e20), Value::Integer(i64::MAX)]),
        value
    );
    Ok(())
}

#[test]
fn token_push_back() -> TestResult {
    let mut tokenizer = Tokenizer::new(r#" {"a": [1.5, true]} "#);
    loop {
        let token = tokenizer.next_token()?;
        tokenizer.push_back(&token);
        assert_eq!(token, tokenizer.next_token()?);
        if token.kind() == TokenKind::End {
            break;
        }
    }
    Ok(())
}

#[test]
fn nesting_depth() -> TestResult {
    let codec = Codec::new();
    let json = format!("{}{}", "[".repeat(256), "]".repeat(256));
    codec.parse_value(&json)?;

    let json = format!("{}{}", "[".repeat(257), "]".repeat(257));
    match codec.parse_value(&json) {
        Err(ParseError::SyntaxError(SyntaxError { kind, .. })) => {
            assert_eq!(SyntaxErrorKind::NestingTooDeep, kind)
        }
        r => panic!("Unexpected result: {r:?}"),
    }
    Ok(())
}

#[test]
fn test_data_file() -> TestResult {
    init_logger();
    let json = read_to_string(get_test_data_file_path())?;
    let value = discriminator_codec(true).parse_value(&json)?;

    assert_eq!(Some("inventory"), value.get("title").and_then(Value::as_str));

    let rows = value.get("rows").and_then(Value::as_array).unwrap();
    assert_eq!("aaa", rows[0].as_bean::<Foo>().unwrap().value);
    assert_eq!("bbb", rows[1].as_bean::<Bar>().unwrap().value);
    assert_eq!(Some("ccc"), rows[2].get("value").and_then(Value::as_str));

    let numbers = value.get("numbers").and_then(Value::as_array).unwrap();
    assert_eq!(
        &[
            Value::Integer(0),
            Value::Integer(-1),
            Value::Integer(i64::MAX),
            Value::Decimal(1.5),
            Value::Decimal(-2.5e-3),
            Value::Decimal(1e20),
        ],
        numbers
    );

    assert_eq!(
        Some("tab\t quote\" slash/ e-acute \u{e9} smiley \u{1f600}"),
        value.get("text").and_then(Value::as_str)
    );

    let deep = value
        .get("nested")
        .and_then(|nested| nested.get("deep"))
        .unwrap();
    assert_eq!(
        &Value::Array(vec![Value::Array(vec![object(&[(
            "a",
            Value::Array(vec![Value::from(1)])
        )])])]),
        deep
    );
    Ok(())
}
