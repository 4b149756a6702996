//! The [`Codec`], which holds the configuration for parsing and serializing

use std::{
    any::TypeId,
    collections::HashMap,
    fmt::{Debug, Formatter},
    sync::Arc,
};

use log::debug;

use crate::{
    bean::{Bean, DescriptorCache, TargetType, TypeDescriptor, TypeHint},
    reader::{
        DiscriminatorSpec, Discriminators, LinePosition, Location, ParseError, Parser,
        ParserSettings, TypeHintTable, TypeResolver,
    },
    value::{AsValueRef, FromValue, Value},
    writer::{self, CustomSerializer, SerializeError, Serializer, SerializerSettings},
};

/// Parses JSON text into object graphs and serializes object graphs as JSON text
///
/// A codec is configured once with [type hints](Self::add_type_hint),
/// [discriminators](Self::set_discriminator) and [custom serializers](Self::register_custom_serializer),
/// and can then be used for any number of `parse` and `serialize` calls. Configuration methods
/// take `&mut self`, so the configuration cannot change while a call is in progress. To share
/// a configured codec between threads wrap it in an [`Arc`].
///
/// # Examples
/// ```
/// # use jsongraph::{Codec, bean::TargetType, value::Value};
/// let mut codec = Codec::new();
/// codec.add_type_hint(".rows", TargetType::Sequence);
///
/// let value = codec.parse_value(r#"{"rows": [1, "a"]}"#)?;
/// let rows = value.get("rows").and_then(Value::as_array).unwrap();
/// assert_eq!(&[Value::from(1), Value::from("a")], rows);
///
/// assert_eq!(r#"{"rows":[1,"a"]}"#, codec.serialize(&value)?);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Codec {
    type_hints: TypeHintTable,
    discriminators: Discriminators,
    custom_serializers: HashMap<TypeId, CustomSerializer>,
    descriptors: HashMap<TypeId, Arc<TypeDescriptor>>,
    parser_settings: ParserSettings,
    serializer_settings: SerializerSettings,
}

impl Codec {
    /// Creates a codec with default settings and without any configuration
    pub fn new() -> Self {
        Codec::new_custom(ParserSettings::default(), SerializerSettings::default())
    }

    /// Creates a codec with custom settings
    ///
    /// # Examples
    /// ```
    /// # use jsongraph::{Codec, reader::ParserSettings, writer::SerializerSettings};
    /// let codec = Codec::new_custom(
    ///     ParserSettings {
    ///         max_nesting_depth: 2,
    ///         ..Default::default()
    ///     },
    ///     SerializerSettings::default(),
    /// );
    /// assert!(codec.parse_value("[[[]]]").is_err());
    /// ```
    pub fn new_custom(
        parser_settings: ParserSettings,
        serializer_settings: SerializerSettings,
    ) -> Self {
        Codec {
            type_hints: TypeHintTable::new(),
            discriminators: Discriminators::new(),
            custom_serializers: HashMap::new(),
            descriptors: HashMap::new(),
            parser_settings,
            serializer_settings,
        }
    }

    /// Declares the type of the JSON object or array at `path`
    ///
    /// The path must match exactly, see [`reader::path`](crate::reader::path) for the
    /// notation. Type hints take precedence over discriminators and over the types declared
    /// by bean properties.
    pub fn add_type_hint(&mut self, path: impl Into<String>, target: TargetType) -> &mut Self {
        self.type_hints.insert(path, target);
        self
    }

    /// Gets the type hints added so far
    pub fn type_hints(&self) -> &TypeHintTable {
        &self.type_hints
    }

    /// Sets the discriminator which is used for JSON objects at all paths without a
    /// [path specific discriminator](Self::set_discriminator_at)
    pub fn set_discriminator(&mut self, spec: DiscriminatorSpec) -> &mut Self {
        self.discriminators.set_default(spec);
        self
    }

    /// Sets the discriminator for JSON objects at exactly `path`
    pub fn set_discriminator_at(
        &mut self,
        path: impl Into<String>,
        spec: DiscriminatorSpec,
    ) -> &mut Self {
        self.discriminators.set_for_path(path, spec);
        self
    }

    /// Builds the descriptor of a bean type once, instead of once per call
    pub fn register<T: Bean>(&mut self) -> &mut Self {
        let descriptor = T::describe();
        debug!("registered descriptor of {}", descriptor.name());
        self.descriptors
            .insert(TypeId::of::<T>(), Arc::new(descriptor));
        self
    }

    /// Registers a function which writes the complete JSON text of beans of type `T`
    ///
    /// Custom serializers take precedence over [`Bean::to_json`] and the properties of the
    /// bean. They only apply to beans of exactly type `T`. The returned text is written as is,
    /// without any validation.
    ///
    /// # Examples
    /// ```
    /// # use jsongraph::{Codec, bean::{Bean, TypeDescriptor}};
    /// # #[derive(Clone, PartialEq, Default, Debug)]
    /// # struct Color { rgb: u32 }
    /// # impl Bean for Color {
    /// #     fn describe() -> TypeDescriptor {
    /// #         TypeDescriptor::builder::<Color>("Color")
    /// #             .property("rgb", |c| &c.rgb, |c, v| c.rgb = v)
    /// #             .build()
    /// #     }
    /// # }
    /// # jsongraph::bean_value!(Color);
    /// let mut codec = Codec::new();
    /// codec.register_custom_serializer(|color: &Color| format!("\"#{:06x}\"", color.rgb));
    ///
    /// assert_eq!(r##"["#ff8000"]"##, codec.serialize(&vec![Color { rgb: 0xff8000 }])?);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn register_custom_serializer<T, F>(&mut self, serializer: F) -> &mut Self
    where
        T: Bean,
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        let custom: CustomSerializer = Box::new(move |bean: &dyn Bean| {
            // unwrap() here should be safe since serializers are looked up by the type ID of the bean
            let bean = bean.as_any().downcast_ref::<T>().unwrap();
            serializer(bean)
        });
        self.custom_serializers.insert(TypeId::of::<T>(), custom);
        self
    }

    /// Removes all custom serializers
    pub fn clear_custom_serializers(&mut self) {
        self.custom_serializers.clear();
    }

    /// Parses JSON text as value of type `T`
    ///
    /// The root type comes from [`FromValue::type_hint`] of `T`; if it has none the root
    /// type is resolved like that of any other value, at the path `""`. The root of the
    /// JSON text must be an object or an array.
    ///
    /// # Examples
    /// ```
    /// # use std::collections::BTreeMap;
    /// let codec = jsongraph::Codec::new();
    /// let numbers: Vec<i64> = codec.parse("[1, 2.0, \"3\"]")?;
    /// assert_eq!(vec![1, 2, 3], numbers);
    ///
    /// let map: BTreeMap<String, bool> = codec.parse(r#"{"a": true}"#)?;
    /// assert_eq!(Some(&true), map.get("a"));
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn parse<T: FromValue>(&self, json: &str) -> Result<T, ParseError> {
        let value = self.parse_document(json, T::type_hint(), T::element_hint())?;
        T::from_value(value).map_err(|error| {
            let offset = json.len() - json.trim_start().len();
            ParseError::ConversionError {
                name: None,
                error,
                location: Location {
                    path: String::new(),
                    line_pos: LinePosition::of_offset(json, offset),
                    offset,
                },
            }
        })
    }

    /// Parses JSON text, instantiating `target` for the root value
    pub fn parse_as(&self, target: TargetType, json: &str) -> Result<Value, ParseError> {
        self.parse_document(json, Some(target), None)
    }

    /// Parses JSON text without a declared root type
    ///
    /// Type hints and discriminators apply to the root value at path `""` as well; without
    /// them a root object becomes a [`Value::Object`] and a root array a [`Value::Array`].
    pub fn parse_value(&self, json: &str) -> Result<Value, ParseError> {
        self.parse_document(json, None, None)
    }

    fn parse_document(
        &self,
        json: &str,
        target: Option<TargetType>,
        element_hint: Option<TypeHint>,
    ) -> Result<Value, ParseError> {
        let resolver = TypeResolver::new(&self.type_hints, &self.discriminators);
        let parser = Parser::new(
            json,
            resolver,
            DescriptorCache::new(&self.descriptors),
            &self.parser_settings,
        );
        parser.parse_document(target, element_hint)
    }

    /// Serializes a value as compact JSON text
    pub fn serialize<V: AsValueRef + ?Sized>(&self, value: &V) -> Result<String, SerializeError> {
        self.serialize_ignoring(value, &[])
    }

    /// Serializes a value as compact JSON text, omitting bean properties with the given names
    ///
    /// The names are compared with the property names (not their JSON member names) of beans
    /// on all nesting levels.
    pub fn serialize_ignoring<V: AsValueRef + ?Sized>(
        &self,
        value: &V,
        ignored_properties: &[&str],
    ) -> Result<String, SerializeError> {
        let serializer = Serializer::new(
            &self.custom_serializers,
            DescriptorCache::new(&self.descriptors),
            ignored_properties,
            &self.serializer_settings,
        );
        serializer.serialize(&value.as_value_ref())
    }

    /// Serializes a value as indented JSON text, see [`writer::pretty_print`]
    pub fn serialize_pretty<V: AsValueRef + ?Sized>(
        &self,
        value: &V,
    ) -> Result<String, SerializeError> {
        let compact = self.serialize(value)?;
        Ok(writer::pretty_print(&compact))
    }

    /// Quotes a string as JSON string value, see [`writer::quote`]
    pub fn quote(value: &str) -> String {
        writer::quote(value)
    }
}

impl Default for Codec {
    fn default() -> Self {
        Codec::new()
    }
}

impl Debug for Codec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut registered = self
            .descriptors
            .values()
            .map(|descriptor| descriptor.name())
            .collect::<Vec<_>>();
        registered.sort_unstable();

        f.debug_struct("Codec")
            .field("type_hints", &self.type_hints)
            .field("discriminators", &self.discriminators)
            .field("registered", &registered)
            .field("custom_serializers", &self.custom_serializers.len())
            .field("parser_settings", &self.parser_settings)
            .field("serializer_settings", &self.serializer_settings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{SyntaxError, SyntaxErrorKind};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[derive(Clone, PartialEq, Default, Debug)]
    struct Pair {
        left: i32,
        right: Option<Box<Pair>>,
    }

    impl Bean for Pair {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::builder::<Pair>("Pair")
                .property("left", |p| &p.left, |p, v| p.left = v)
                .property(
                    "right",
                    |p| &p.right,
                    |p, v: Option<Box<Pair>>| p.right = v,
                )
                .build()
        }
    }
    crate::bean_value!(Pair);

    impl FromValue for Box<Pair> {
        fn from_value(value: Value) -> Result<Self, crate::value::ConversionError> {
            Pair::from_value(value).map(Box::new)
        }

        fn type_hint() -> Option<TargetType> {
            Pair::type_hint()
        }
    }

    impl AsValueRef for Box<Pair> {
        fn as_value_ref(&self) -> crate::value::ValueRef<'_> {
            crate::value::ValueRef::Bean(&**self)
        }
    }

    #[test]
    fn codec_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Codec>();
    }

    #[test]
    fn parse_bean() -> TestResult {
        let codec = Codec::new();
        let pair: Pair = codec.parse(r#"{"left": 1, "right": {"left": 2, "right": null}}"#)?;
        assert_eq!(
            Pair {
                left: 1,
                right: Some(Box::new(Pair {
                    left: 2,
                    right: None
                })),
            },
            pair
        );

        assert_eq!(
            r#"{"left":1,"right":{"left":2,"right":null}}"#,
            codec.serialize(&pair)?
        );
        Ok(())
    }

    #[test]
    fn registered_descriptor() -> TestResult {
        let mut codec = Codec::new();
        codec.register::<Pair>();
        let pair: Pair = codec.parse(r#"{"left": 3}"#)?;
        assert_eq!(3, pair.left);
        assert!(format!("{codec:?}").contains("registered: [\"Pair\"]"));
        Ok(())
    }

    #[test]
    fn root_conversion_error() {
        let codec = Codec::new();
        match codec.parse::<Vec<bool>>("\n  [1]") {
            Err(ParseError::ConversionError {
                name: None,
                location,
                ..
            }) => {
                assert_eq!("", location.path);
                assert_eq!(LinePosition { line: 1, column: 2 }, location.line_pos);
                assert_eq!(3, location.offset);
            }
            result => panic!("unexpected result: {result:?}"),
        }
    }

    #[test]
    fn root_must_be_container() {
        let codec = Codec::new();
        match codec.parse_value("true") {
            Err(ParseError::SyntaxError(SyntaxError { kind, .. })) => {
                assert_eq!(SyntaxErrorKind::NotAContainer, kind)
            }
            result => panic!("unexpected result: {result:?}"),
        }
    }

    #[test]
    fn custom_serializers() -> TestResult {
        let mut codec = Codec::new();
        codec.register_custom_serializer(|pair: &Pair| pair.left.to_string());
        let pairs = vec![Pair::default(), Pair { left: 5, right: None }];
        assert_eq!("[0,5]", codec.serialize(&pairs)?);

        codec.clear_custom_serializers();
        assert_eq!(
            r#"[{"left":0,"right":null},{"left":5,"right":null}]"#,
            codec.serialize(&pairs)?
        );
        Ok(())
    }

    #[test]
    fn pretty_and_ignored() -> TestResult {
        let codec = Codec::new();
        let pair = Pair {
            left: 1,
            right: Some(Box::default()),
        };
        // Ignored names apply to nested beans as well
        assert_eq!(
            r#"{"right":{"right":null}}"#,
            codec.serialize_ignoring(&pair, &["left"])?
        );
        assert_eq!(
            "{\n  \"left\": 1,\n  \"right\": null\n}",
            codec.serialize_pretty(&Pair { left: 1, right: None })?
        );
        assert_eq!(r#""a\/b""#, Codec::quote("a/b"));
        Ok(())
    }
}
