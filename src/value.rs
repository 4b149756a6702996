//! Module for the generic value tree and conversions between values and Rust types
//!
//! [`Value`] is what the parser produces: primitives, arrays, objects and instantiated
//! [beans](crate::bean::Bean). [`FromValue`] converts a parsed value into a typed Rust value,
//! [`AsValueRef`] provides the borrowed [`ValueRef`] view the serializer consumes.

use std::{
    collections::BTreeMap,
    fmt::{Debug, Display, Formatter},
};

use duplicate::duplicate_item;
use thiserror::Error;

use crate::bean::{Bean, TargetType, TypeHint};

/// Generic JSON object, ordered by member name
pub type Map = BTreeMap<String, Value>;

/// A parsed JSON value
///
/// Objects for which a [bean type](TargetType::Bean) was resolved are stored as [`Value::Bean`],
/// all other objects as [`Value::Object`].
#[derive(Debug)]
pub enum Value {
    /// JSON `null`
    Null,
    /// JSON boolean
    Bool(bool),
    /// JSON number without fraction and exponent which fits into an `i64`
    Integer(i64),
    /// Any other JSON number
    Decimal(f64),
    /// JSON string
    String(String),
    /// JSON array
    Array(Vec<Value>),
    /// JSON object which was populated as generic map
    Object(Map),
    /// JSON object which was populated as bean
    Bean(Box<dyn Bean>),
}

/// Kind of a [`Value`]
#[derive(PartialEq, Eq, Clone, Copy, strum::Display, Debug)]
pub enum ValueKind {
    /// [`Value::Null`]
    Null,
    /// [`Value::Bool`]
    Bool,
    /// [`Value::Integer`]
    Integer,
    /// [`Value::Decimal`]
    Decimal,
    /// [`Value::String`]
    String,
    /// [`Value::Array`]
    Array,
    /// [`Value::Object`]
    Object,
    /// [`Value::Bean`]
    Bean,
}

impl Value {
    /// Gets the kind of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Integer(_) => ValueKind::Integer,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
            Value::Bean(_) => ValueKind::Bean,
        }
    }

    #[allow(missing_docs)]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[allow(missing_docs)]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[allow(missing_docs)]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Gets the numeric value of an [`Integer`](Value::Integer) or [`Decimal`](Value::Decimal)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    #[allow(missing_docs)]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    #[allow(missing_docs)]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    #[allow(missing_docs)]
    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Gets a reference to the bean if this is a [`Value::Bean`] of type `T`
    pub fn as_bean<T: Bean>(&self) -> Option<&T> {
        match self {
            Value::Bean(bean) => bean.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Gets the member value with the given name if this is a [`Value::Object`]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(name))
    }

    /// Converts this value into a bean of type `T`
    ///
    /// Fails if this is not a [`Value::Bean`] or if the bean has a different type.
    pub fn into_bean<T: Bean>(self) -> Result<T, ConversionError> {
        match self {
            Value::Bean(bean) => {
                if bean.as_any().is::<T>() {
                    match bean.into_any().downcast::<T>() {
                        Ok(bean) => Ok(*bean),
                        Err(_) => unreachable!("type was checked before"),
                    }
                } else {
                    Err(ConversionError {
                        from: ValueKind::Bean,
                        to: std::any::type_name::<T>(),
                        value: bean.bean_type().to_string(),
                    })
                }
            }
            other => Err(ConversionError::new(&other, std::any::type_name::<T>())),
        }
    }

    /// Short description of this value for error messages
    fn summary(&self) -> String {
        match self {
            Value::Null => "null".to_owned(),
            Value::Bool(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::String(s) => s.clone(),
            Value::Array(items) => format!("array of {} items", items.len()),
            Value::Object(map) => format!("object with {} members", map.len()),
            Value::Bean(bean) => bean.bean_type().to_string(),
        }
    }
}

impl Clone for Value {
    fn clone(&self) -> Self {
        match self {
            Value::Null => Value::Null,
            Value::Bool(b) => Value::Bool(*b),
            Value::Integer(i) => Value::Integer(*i),
            Value::Decimal(d) => Value::Decimal(*d),
            Value::String(s) => Value::String(s.clone()),
            Value::Array(items) => Value::Array(items.clone()),
            Value::Object(map) => Value::Object(map.clone()),
            Value::Bean(bean) => Value::Bean(bean.clone_bean()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Bean(a), Value::Bean(b)) => a.bean_eq(b.as_ref()),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

#[duplicate_item(type_template; [i8]; [i16]; [i32]; [i64]; [u8]; [u16]; [u32])]
impl From<type_template> for Value {
    fn from(v: type_template) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Decimal(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<Map> for Value {
    fn from(v: Map) -> Self {
        Value::Object(v)
    }
}

/// Error which occurred while converting a [`Value`] to a Rust type
#[derive(Error, PartialEq, Eq, Clone, Debug)]
#[error("cannot convert {from} value '{value}' to {to}")]
pub struct ConversionError {
    /// Kind of the value which could not be converted
    pub from: ValueKind,
    /// Name of the target type
    pub to: &'static str,
    /// Short description of the value
    pub value: String,
}

impl ConversionError {
    fn new(value: &Value, to: &'static str) -> Self {
        ConversionError {
            from: value.kind(),
            to,
            value: value.summary(),
        }
    }
}

/// Conversion from a parsed [`Value`]
///
/// Besides the conversion itself the trait tells the parser which [`TargetType`] to use for
/// JSON objects and arrays which will be converted to this type, and for the items of such
/// arrays. This is how bean properties declare the types of their nested values.
pub trait FromValue: Sized {
    /// Converts the value
    ///
    /// Primitive values are coerced where this is unambiguous, for example the string `"12"`
    /// to an integer, or the number `12` to a string.
    fn from_value(value: Value) -> Result<Self, ConversionError>;

    /// Target type for a JSON object or array which is converted to this type
    fn type_hint() -> Option<TargetType> {
        None
    }

    /// Type hint for the items of a JSON array (respectively the member values of a
    /// JSON object) which is converted to this type, including the hints for deeper levels
    fn element_hint() -> Option<TypeHint> {
        None
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        Ok(value)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::String(s) if s == "true" => Ok(true),
            Value::String(s) if s == "false" => Ok(false),
            other => Err(ConversionError::new(&other, "bool")),
        }
    }
}

// Ranges of f64 values which can be cast to i64 respectively u64 without saturating
const I64_MIN_F64: f64 = -9_223_372_036_854_775_808.0;
const I64_END_F64: f64 = 9_223_372_036_854_775_808.0;
const U64_END_F64: f64 = 18_446_744_073_709_551_616.0;

#[duplicate_item(
    type_template   wide_type   min_f64       end_f64;
    [i8]            [i64]       [I64_MIN_F64] [I64_END_F64];
    [i16]           [i64]       [I64_MIN_F64] [I64_END_F64];
    [i32]           [i64]       [I64_MIN_F64] [I64_END_F64];
    [i64]           [i64]       [I64_MIN_F64] [I64_END_F64];
    [isize]         [i64]       [I64_MIN_F64] [I64_END_F64];
    [u8]            [u64]       [0.0]         [U64_END_F64];
    [u16]           [u64]       [0.0]         [U64_END_F64];
    [u32]           [u64]       [0.0]         [U64_END_F64];
    [u64]           [u64]       [0.0]         [U64_END_F64];
    [usize]         [u64]       [0.0]         [U64_END_F64]
)]
impl FromValue for type_template {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        let name = stringify!(type_template);
        let converted = match &value {
            Value::Integer(i) => type_template::try_from(*i).ok(),
            // Integer literals which overflow i64 are parsed as decimals
            Value::Decimal(d) if d.fract() == 0.0 && *d >= min_f64 && *d < end_f64 => {
                type_template::try_from(*d as wide_type).ok()
            }
            Value::String(s) => s.trim().parse::<type_template>().ok(),
            _ => None,
        };
        converted.ok_or_else(|| ConversionError::new(&value, name))
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Integer(i) => Ok(i as f64),
            Value::Decimal(d) => Ok(d),
            Value::String(ref s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| ConversionError::new(&value, "f64")),
            other => Err(ConversionError::new(&other, "f64")),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        f64::from_value(value).map(|d| d as f32)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::String(s) => Ok(s),
            Value::Integer(i) => Ok(i.to_string()),
            Value::Decimal(d) => Ok(d.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(ConversionError::new(&other, "String")),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn type_hint() -> Option<TargetType> {
        T::type_hint()
    }

    fn element_hint() -> Option<TypeHint> {
        T::element_hint()
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Array(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(ConversionError::new(&other, "Vec")),
        }
    }

    fn type_hint() -> Option<TargetType> {
        Some(TargetType::Sequence)
    }

    fn element_hint() -> Option<TypeHint> {
        TypeHint::of::<T>()
    }
}

impl<T: FromValue> FromValue for BTreeMap<String, T> {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Object(map) => map
                .into_iter()
                .map(|(name, value)| Ok((name, T::from_value(value)?)))
                .collect(),
            other => Err(ConversionError::new(&other, "BTreeMap")),
        }
    }

    fn type_hint() -> Option<TargetType> {
        Some(TargetType::Map)
    }

    fn element_hint() -> Option<TypeHint> {
        TypeHint::of::<T>()
    }
}

impl FromValue for Box<dyn Bean> {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bean(bean) => Ok(bean),
            other => Err(ConversionError::new(&other, "Box<dyn Bean>")),
        }
    }
}

/// Borrowed view of a value which is about to be serialized
///
/// Bean getters return this view so that serializing does not have to clone property values.
#[derive(Clone, Debug)]
pub enum ValueRef<'a> {
    #[allow(missing_docs)]
    Null,
    #[allow(missing_docs)]
    Bool(bool),
    #[allow(missing_docs)]
    Integer(i64),
    /// Unsigned integer which might not fit into an `i64`
    Unsigned(u64),
    #[allow(missing_docs)]
    Decimal(f64),
    #[allow(missing_docs)]
    String(&'a str),
    /// Items of a JSON array
    Sequence(Vec<ValueRef<'a>>),
    /// Members of a JSON object, in the order in which they are written
    Map(Vec<(&'a str, ValueRef<'a>)>),
    #[allow(missing_docs)]
    Bean(&'a dyn Bean),
    /// An already parsed value
    Value(&'a Value),
}

impl ValueRef<'_> {
    /// Whether this represents JSON `null`
    pub fn is_null(&self) -> bool {
        matches!(self, ValueRef::Null | ValueRef::Value(Value::Null))
    }
}

impl Display for ValueRef<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueRef::Null => write!(f, "null"),
            ValueRef::Bool(b) => write!(f, "{b}"),
            ValueRef::Integer(i) => write!(f, "{i}"),
            ValueRef::Unsigned(u) => write!(f, "{u}"),
            ValueRef::Decimal(d) => write!(f, "{d}"),
            ValueRef::String(s) => write!(f, "{s:?}"),
            ValueRef::Sequence(items) => write!(f, "array of {} items", items.len()),
            ValueRef::Map(members) => write!(f, "object with {} members", members.len()),
            ValueRef::Bean(bean) => write!(f, "{}", bean.bean_type()),
            ValueRef::Value(value) => write!(f, "{}", value.summary()),
        }
    }
}

/// Provides the [`ValueRef`] view of a value for serialization
pub trait AsValueRef {
    #[allow(missing_docs)]
    fn as_value_ref(&self) -> ValueRef<'_>;
}

impl AsValueRef for Value {
    fn as_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Value(self)
    }
}

impl AsValueRef for bool {
    fn as_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Bool(*self)
    }
}

#[duplicate_item(type_template; [i8]; [i16]; [i32]; [i64]; [u8]; [u16]; [u32])]
impl AsValueRef for type_template {
    fn as_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Integer(i64::from(*self))
    }
}

#[duplicate_item(type_template; [u64]; [usize])]
impl AsValueRef for type_template {
    fn as_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Unsigned(*self as u64)
    }
}

impl AsValueRef for isize {
    fn as_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Integer(*self as i64)
    }
}

#[duplicate_item(type_template; [f32]; [f64])]
impl AsValueRef for type_template {
    fn as_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Decimal(f64::from(*self))
    }
}

impl AsValueRef for str {
    fn as_value_ref(&self) -> ValueRef<'_> {
        ValueRef::String(self)
    }
}

impl AsValueRef for String {
    fn as_value_ref(&self) -> ValueRef<'_> {
        ValueRef::String(self)
    }
}

impl<T: AsValueRef + ?Sized> AsValueRef for &T {
    fn as_value_ref(&self) -> ValueRef<'_> {
        (**self).as_value_ref()
    }
}

impl<T: AsValueRef> AsValueRef for Option<T> {
    fn as_value_ref(&self) -> ValueRef<'_> {
        match self {
            Some(v) => v.as_value_ref(),
            None => ValueRef::Null,
        }
    }
}

impl<T: AsValueRef> AsValueRef for [T] {
    fn as_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Sequence(self.iter().map(AsValueRef::as_value_ref).collect())
    }
}

impl<T: AsValueRef> AsValueRef for Vec<T> {
    fn as_value_ref(&self) -> ValueRef<'_> {
        self.as_slice().as_value_ref()
    }
}

impl<T: AsValueRef> AsValueRef for BTreeMap<String, T> {
    fn as_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Map(
            self.iter()
                .map(|(name, value)| (name.as_str(), value.as_value_ref()))
                .collect(),
        )
    }
}

impl AsValueRef for Box<dyn Bean> {
    fn as_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Bean(self.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn integer_conversions() -> TestResult {
        assert_eq!(12, i32::from_value(Value::Integer(12))?);
        assert_eq!(12, u8::from_value(Value::Decimal(12.0))?);
        assert_eq!(-3, i64::from_value(Value::String(" -3 ".to_owned()))?);
        assert_eq!(
            ConversionError {
                from: ValueKind::Integer,
                to: "u8",
                value: "300".to_owned(),
            },
            u8::from_value(Value::Integer(300)).unwrap_err()
        );
        assert!(i32::from_value(Value::Decimal(1.5)).is_err());
        assert!(i64::from_value(Value::Decimal(1e20)).is_err());
        assert_eq!(1 << 63, u64::from_value(Value::Decimal(9_223_372_036_854_775_808.0))?);
        assert!(u64::from_value(Value::Decimal(18_446_744_073_709_551_616.0)).is_err());
        assert!(u8::from_value(Value::Decimal(-1.0)).is_err());
        assert!(u32::from_value(Value::Null).is_err());
        Ok(())
    }

    #[test]
    fn primitive_coercions() -> TestResult {
        assert_eq!(true, bool::from_value(Value::String("true".to_owned()))?);
        assert!(bool::from_value(Value::Integer(1)).is_err());
        assert_eq!("12", String::from_value(Value::Integer(12))?);
        assert_eq!("false", String::from_value(Value::Bool(false))?);
        assert_eq!(2.5, f64::from_value(Value::String("2.5".to_owned()))?);
        assert_eq!(3.0, f64::from_value(Value::Integer(3))?);
        assert!(String::from_value(Value::Array(Vec::new())).is_err());
        Ok(())
    }

    #[test]
    fn container_conversions() -> TestResult {
        let value = Value::Array(vec![Value::Integer(1), Value::Null]);
        assert_eq!(vec![Some(1), None], Vec::<Option<u32>>::from_value(value)?);

        let mut map = Map::new();
        map.insert("a".to_owned(), Value::String("x".to_owned()));
        let converted = BTreeMap::<String, String>::from_value(Value::Object(map))?;
        assert_eq!(Some(&"x".to_owned()), converted.get("a"));

        assert_eq!(None, Option::<String>::from_value(Value::Null)?);
        assert!(Vec::<i32>::from_value(Value::Object(Map::new())).is_err());
        Ok(())
    }

    #[test]
    fn container_hints() {
        assert_eq!(Some(TargetType::Sequence), Vec::<String>::type_hint());
        assert_eq!(None, Vec::<String>::element_hint());
        assert_eq!(
            Some(TypeHint::new(TargetType::Sequence)),
            Vec::<Vec<i32>>::element_hint()
        );
        assert_eq!(
            Some(TypeHint::new(TargetType::Sequence).with_nested(TypeHint::new(TargetType::Map))),
            BTreeMap::<String, Vec<Map>>::element_hint()
        );
        assert_eq!(Some(TargetType::Map), Option::<Map>::type_hint());
        assert_eq!(None, Value::type_hint());
    }

    #[test]
    fn value_accessors() {
        let mut map = Map::new();
        map.insert("n".to_owned(), Value::from(5));
        let value = Value::Object(map);

        assert_eq!(ValueKind::Object, value.kind());
        assert_eq!(Some(5), value.get("n").and_then(Value::as_i64));
        assert_eq!(Some(5.0), value.get("n").and_then(Value::as_f64));
        assert_eq!(None, value.get("missing"));
        assert_eq!(None, Value::from("text").get("n"));
        assert_eq!(Some("text"), Value::from("text").as_str());
        assert!(Value::Null.is_null());
    }

    #[test]
    fn value_ref_null() {
        assert!(Option::<String>::None.as_value_ref().is_null());
        assert!(Value::Null.as_value_ref().is_null());
        assert!(!0_i32.as_value_ref().is_null());
    }
}
