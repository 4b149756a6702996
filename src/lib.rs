#![warn(missing_docs)]
#![forbid(unsafe_code)]
// Allow needless `return` because that makes it sometimes more obvious that
// an expression is the result of the function
#![allow(clippy::needless_return)]
// Allow `assert_eq!(true, ...)` because in some cases it is used to check a bool
// value and not a 'flag' / 'state', and `assert_eq!` makes that more explicit
#![allow(clippy::bool_assert_comparison)]
// Enable 'unused' warnings for doc tests (are disabled by default)
#![doc(test(no_crate_inject))]
#![doc(test(attr(warn(unused))))]
// Fail on warnings in doc tests
#![doc(test(attr(deny(warnings))))]

//! jsongraph is a schema-free JSON codec which parses JSON text into typed object graphs and
//! serializes them again.
//!
//! Unlike derive based object mappers it does not require the structure of the JSON document
//! to be known in advance. JSON objects without any declared type become ordered maps and JSON
//! arrays become sequences; which Rust type should be used for a nested value can be declared
//! per *path* in the document, or decided by a *discriminator* member of the JSON object itself.
//!
//! # Terminology
//!
//! - *object*: `{ ... }`, consisting of *members* which are name-value pairs
//! - *array*: `[ ... ]`, consisting of *items*
//! - *bean*: Rust type implementing [`Bean`](bean::Bean); its [`TypeDescriptor`](bean::TypeDescriptor)
//!   lists the *properties* which are read from and written to JSON object members
//! - *path*: structural position of a value, for example `.rows[].value` for the member `value`
//!   of all items of the array member `rows` of the root object; see [`reader::path`]
//! - *type hint*: declared [`TargetType`](bean::TargetType) for the value at a path
//! - *discriminator*: member of a JSON object whose string value selects the target type
//!
//! # Usage examples
//!
//! ```
//! # use jsongraph::{Codec, bean::{Bean, TargetType, TypeDescriptor}, reader::DiscriminatorSpec, value::Value};
//! #[derive(Clone, PartialEq, Default, Debug)]
//! struct Circle {
//!     radius: f64,
//! }
//!
//! impl Bean for Circle {
//!     fn describe() -> TypeDescriptor {
//!         TypeDescriptor::builder::<Circle>("Circle")
//!             // The discriminator member is consumed by this property
//!             .write_only("kind", |_: &mut Circle, _: String| {}, Default::default())
//!             .property("radius", |c| &c.radius, |c, v| c.radius = v)
//!             .build()
//!     }
//! }
//! jsongraph::bean_value!(Circle);
//!
//! let mut codec = Codec::new();
//! codec.set_discriminator_at(
//!     ".shapes[]",
//!     DiscriminatorSpec::new("kind", true).with_type("circle", TargetType::bean::<Circle>()),
//! );
//!
//! let json = r#"{"shapes": [{"kind": "circle", "radius": 1.5}, {"kind": "square"}]}"#;
//! let value = codec.parse_value(json)?;
//!
//! let shapes = value.get("shapes").and_then(Value::as_array).unwrap();
//! assert_eq!(Some(&Circle { radius: 1.5 }), shapes[0].as_bean::<Circle>());
//! // Unknown discriminator values fall back to a generic map
//! assert_eq!(Some("square"), shapes[1].get("kind").and_then(Value::as_str));
//!
//! assert_eq!(
//!     r#"{"shapes":[{"radius":1.5},{"kind":"square"}]}"#,
//!     codec.serialize(&value)?
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Logging
//! Decisions of the type resolver and the creation of bean descriptors are logged with the
//! [`log`](https://docs.rs/log) facade at `debug` and `trace` level.

pub mod bean;
pub mod codec;
pub mod reader;
pub mod value;
pub mod writer;

mod json_number;

pub use codec::Codec;
