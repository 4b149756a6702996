//! Common library module for integration tests
// See https://doc.rust-lang.org/book/ch11-03-test-organization.html#submodules-in-integration-tests

use std::{collections::BTreeMap, path::PathBuf};

use jsongraph::{
    bean::{
        AttributeBag, Bean, DynamicAttributes, PropertyOptions, Serialization, TargetType,
        TypeDescriptor,
    },
    reader::DiscriminatorSpec,
    Codec,
};

pub fn get_test_data_file_path() -> PathBuf {
    // Get path of test file, see https://stackoverflow.com/a/30004252
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/test_data.json");
    path
}

/// Installs a logger so that `RUST_LOG=debug` shows the decisions of the codec
pub fn init_logger() {
    // Ignore the error if another test already installed the logger
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Bean selected by the discriminator value `foo`
#[derive(Clone, PartialEq, Default, Debug)]
pub struct Foo {
    pub value: String,
}

impl Bean for Foo {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Foo>("Foo")
            .read_only(
                "kind",
                |_: &Foo| "foo",
                PropertyOptions {
                    wire_name: Some("type".to_owned()),
                    ..Default::default()
                },
            )
            .write_only("type", |_: &mut Foo, _: String| {}, PropertyOptions::default())
            .property("value", |f| &f.value, |f, v| f.value = v)
            .build()
    }
}

/// Bean selected by the discriminator value `bar`
#[derive(Clone, PartialEq, Default, Debug)]
pub struct Bar {
    pub value: String,
}

impl Bean for Bar {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Bar>("Bar")
            .read_only(
                "kind",
                |_: &Bar| "bar",
                PropertyOptions {
                    wire_name: Some("type".to_owned()),
                    ..Default::default()
                },
            )
            .write_only("type", |_: &mut Bar, _: String| {}, PropertyOptions::default())
            .property("value", |b| &b.value, |b, v| b.value = v)
            .build()
    }
}

jsongraph::bean_value!(Foo, Bar);

/// Creates a codec which picks [`Foo`] and [`Bar`] by the `type` member of all JSON objects
pub fn discriminator_codec(allow_undefined: bool) -> Codec {
    let mut codec = Codec::new();
    codec.set_discriminator(
        DiscriminatorSpec::new("type", allow_undefined)
            .with_type("foo", TargetType::bean::<Foo>())
            .with_type("bar", TargetType::bean::<Bar>()),
    );
    codec
}

/// Bean using renamed, suppressed and dynamic members
#[derive(Clone, PartialEq, Default, Debug)]
pub struct Record {
    pub name: String,
    pub count: i64,
    pub note: Option<String>,
    pub secret: String,
    pub children: Vec<Record>,
    pub attributes: AttributeBag,
}

impl Bean for Record {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Record>("Record")
            .property_with(
                "name",
                |r| &r.name,
                |r, v| r.name = v,
                PropertyOptions {
                    wire_name: Some("record_name".to_owned()),
                    ..Default::default()
                },
            )
            .property("count", |r| &r.count, |r, v| r.count = v)
            .property_with(
                "note",
                |r| &r.note,
                |r, v| r.note = v,
                PropertyOptions {
                    serialization: Serialization::OmitIfNull,
                    ..Default::default()
                },
            )
            .property_with(
                "secret",
                |r| &r.secret,
                |r, v| r.secret = v,
                PropertyOptions {
                    serialization: Serialization::Never,
                    ..Default::default()
                },
            )
            .property("children", |r| &r.children, |r, v| r.children = v)
            .build()
    }

    fn dynamic_attributes(&self) -> Option<&dyn DynamicAttributes> {
        Some(&self.attributes)
    }

    fn dynamic_attributes_mut(&mut self) -> Option<&mut dyn DynamicAttributes> {
        Some(&mut self.attributes)
    }
}

jsongraph::bean_value!(Record);

pub fn record(name: &str, count: i64) -> Record {
    Record {
        name: name.to_owned(),
        count,
        ..Default::default()
    }
}

#[derive(Clone, PartialEq, Default, Debug)]
pub struct Cell {
    pub x: i32,
}

impl Bean for Cell {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Cell>("Cell")
            .property("x", |c| &c.x, |c, v| c.x = v)
            .build()
    }
}

/// Bean with beans nested in sequences and maps of sequences
#[derive(Clone, PartialEq, Default, Debug)]
pub struct Grid {
    pub cells: Vec<Vec<Cell>>,
    pub groups: BTreeMap<String, Vec<Cell>>,
    pub origin: Option<Cell>,
}

impl Bean for Grid {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Grid>("Grid")
            .property("cells", |g| &g.cells, |g, v| g.cells = v)
            .property("groups", |g| &g.groups, |g, v| g.groups = v)
            .property("origin", |g| &g.origin, |g, v| g.origin = v)
            .build()
    }
}

jsongraph::bean_value!(Cell, Grid);

pub fn grid() -> Grid {
    let mut groups = BTreeMap::new();
    groups.insert("odd".to_owned(), vec![Cell { x: 1 }, Cell { x: 3 }]);
    groups.insert("none".to_owned(), Vec::new());
    Grid {
        cells: vec![vec![Cell { x: 1 }, Cell { x: 2 }], Vec::new(), vec![Cell { x: 3 }]],
        groups,
        origin: Some(Cell { x: 0 }),
    }
}
