//! Module for beans, Rust types which are populated from and dumped to JSON objects
//!
//! Instead of runtime reflection every bean type provides an explicit [`TypeDescriptor`]
//! through [`Bean::describe`]. The descriptor lists the properties of the type together with
//! getter and setter functions, the JSON member names they are mapped to, serialization rules
//! and type hints for nested values.
//!
//! # Examples
//! ```
//! use jsongraph::bean::*;
//!
//! # #[allow(dead_code)]
//! #[derive(Clone, PartialEq, Default, Debug)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//!     label: Option<String>,
//! }
//!
//! impl Bean for Point {
//!     fn describe() -> TypeDescriptor {
//!         TypeDescriptor::builder::<Point>("Point")
//!             .property("x", |p| &p.x, |p, v| p.x = v)
//!             .property("y", |p| &p.y, |p, v| p.y = v)
//!             .property_with(
//!                 "label",
//!                 |p| &p.label,
//!                 |p, v| p.label = v,
//!                 PropertyOptions {
//!                     wire_name: Some("_label".to_owned()),
//!                     serialization: Serialization::OmitIfNull,
//!                     ..Default::default()
//!                 },
//!             )
//!             .build()
//!     }
//! }
//! jsongraph::bean_value!(Point);
//! ```

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt::{Debug, Display, Formatter},
    hash::{Hash, Hasher},
    marker::PhantomData,
    sync::Arc,
};

use log::debug;

use crate::value::{AsValueRef, ConversionError, FromValue, Map, Value, ValueRef};

/// A Rust type which can be populated from a JSON object and dumped to one
///
/// [`BeanObject`] is implemented automatically for all types which implement `Bean`,
/// `Clone` and `PartialEq`.
pub trait Bean: BeanObject {
    /// Creates the descriptor of this type
    ///
    /// This is called at most once per parse or serialize call, unless the type was
    /// [registered](crate::Codec::register) in which case the registered descriptor is used.
    fn describe() -> TypeDescriptor
    where
        Self: Sized;

    /// Gets the store for JSON members which have no matching property
    ///
    /// When this returns `Some`, unknown members are stored there instead of causing a
    /// [`PropertyError`](crate::reader::ParseError::PropertyError), and the stored attributes
    /// are written after the properties during serialization. `dynamic_attributes_mut` must
    /// return `Some` as well in that case.
    fn dynamic_attributes(&self) -> Option<&dyn DynamicAttributes> {
        None
    }

    /// Mutable variant of [`dynamic_attributes`](Self::dynamic_attributes)
    fn dynamic_attributes_mut(&mut self) -> Option<&mut dyn DynamicAttributes> {
        None
    }

    /// Serializes this bean on its own
    ///
    /// If this returns `Some` the string is emitted verbatim instead of dumping the
    /// properties of the bean. The string must be valid JSON.
    fn to_json(&self) -> Option<String> {
        None
    }
}

/// Type erased operations on a [`Bean`]
///
/// This trait should not be implemented manually; it is implemented for every type which
/// implements `Bean`, `Clone` and `PartialEq`.
pub trait BeanObject: Any + Debug + Send + Sync {
    #[allow(missing_docs)]
    fn as_any(&self) -> &dyn Any;
    #[allow(missing_docs)]
    fn as_any_mut(&mut self) -> &mut dyn Any;
    #[allow(missing_docs)]
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    /// Clones the bean into a new box
    fn clone_bean(&self) -> Box<dyn Bean>;
    /// Whether the other bean has the same type and is equal to this one
    fn bean_eq(&self, other: &dyn Bean) -> bool;
    /// Gets the type of this bean
    fn bean_type(&self) -> BeanType;
}

impl<T: Bean + Clone + PartialEq> BeanObject for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn clone_bean(&self) -> Box<dyn Bean> {
        Box::new(self.clone())
    }

    fn bean_eq(&self, other: &dyn Bean) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .map_or(false, |other| self == other)
    }

    fn bean_type(&self) -> BeanType {
        BeanType::of::<T>()
    }
}

/// Identifies a [`Bean`] type
#[derive(Clone, Copy)]
pub struct BeanType {
    type_id: TypeId,
    name: &'static str,
    describe: fn() -> TypeDescriptor,
}

impl BeanType {
    /// Gets the bean type of `T`
    pub fn of<T: Bean>() -> Self {
        BeanType {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            describe: T::describe,
        }
    }

    #[allow(missing_docs)]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Gets the name of the Rust type, without module path
    pub fn name(&self) -> &'static str {
        let name = self.name;
        // Only strip the module path of the type itself, keep generic arguments as they are
        let end = name.find('<').unwrap_or(name.len());
        match name[..end].rfind("::") {
            Some(index) => &name[index + 2..],
            None => name,
        }
    }

    /// Creates a new descriptor for this type
    pub fn describe(&self) -> TypeDescriptor {
        (self.describe)()
    }
}

impl PartialEq for BeanType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for BeanType {}

impl Hash for BeanType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl Debug for BeanType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BeanType").field(&self.name).finish()
    }
}

impl Display for BeanType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Type which the parser instantiates for a JSON object or array
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub enum TargetType {
    /// Generic map, [`Value::Object`]
    Map,
    /// Generic sequence, [`Value::Array`]
    Sequence,
    /// A bean type, [`Value::Bean`]
    Bean(BeanType),
}

impl TargetType {
    /// Shorthand for `TargetType::Bean(BeanType::of::<T>())`
    pub fn bean<T: Bean>() -> Self {
        TargetType::Bean(BeanType::of::<T>())
    }
}

impl Display for TargetType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetType::Map => write!(f, "map"),
            TargetType::Sequence => write!(f, "sequence"),
            TargetType::Bean(bean_type) => write!(f, "{bean_type}"),
        }
    }
}

/// Declared type of a nested value, together with the declared types of its items
///
/// For a property of type `Vec<Vec<Point>>` the hint for the outer items is a
/// [`TargetType::Sequence`] whose nested hint is the bean type `Point`.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct TypeHint {
    target: TargetType,
    nested: Option<Box<TypeHint>>,
}

impl TypeHint {
    /// Creates a hint without hints for the items of the value
    pub fn new(target: TargetType) -> Self {
        TypeHint {
            target,
            nested: None,
        }
    }

    /// Sets the hint for the items (respectively member values) of the value
    pub fn with_nested(mut self, nested: TypeHint) -> Self {
        self.nested = Some(Box::new(nested));
        self
    }

    /// Gets the hint declared by the type `T`, `None` if `T` declares no target type
    pub fn of<T: FromValue>() -> Option<Self> {
        T::type_hint().map(|target| TypeHint {
            target,
            nested: T::element_hint().map(Box::new),
        })
    }

    #[allow(missing_docs)]
    pub fn target(&self) -> TargetType {
        self.target
    }

    /// Gets the hint for the items of the value
    pub fn nested(&self) -> Option<&TypeHint> {
        self.nested.as_deref()
    }
}

/// Determines when a property is written during serialization
#[derive(PartialEq, Eq, Clone, Copy, Default, strum::Display, Debug)]
pub enum Serialization {
    /// The property is always written
    #[default]
    Always,
    /// The property is omitted when its value is `null`
    OmitIfNull,
    /// The property is never written, it can only be populated by the parser
    Never,
}

/// Additional settings for a property, see [`DescriptorBuilder::property_with`]
#[derive(Clone, Debug, Default)]
pub struct PropertyOptions {
    /// Name of the JSON member, if it differs from the property name
    pub wire_name: Option<String>,
    /// When the property is written during serialization
    pub serialization: Serialization,
    /// Target type for a JSON object or array value of the property, overriding the
    /// hint of the property type
    pub type_hint: Option<TargetType>,
    /// Target type for the items of a JSON array value of the property, overriding the
    /// hint of the property type
    pub element_type_hint: Option<TargetType>,
}

type Getter = Box<dyn for<'a> Fn(&'a dyn Any) -> ValueRef<'a> + Send + Sync>;
type Setter = Box<dyn Fn(&mut dyn Any, Value) -> Result<(), ConversionError> + Send + Sync>;

fn downcast_ref<T: Any>(bean: &dyn Any) -> &T {
    match bean.downcast_ref::<T>() {
        Some(bean) => bean,
        None => panic!(
            "Incorrect descriptor usage: Descriptor for {} used with a different bean type",
            std::any::type_name::<T>()
        ),
    }
}

fn downcast_mut<T: Any>(bean: &mut dyn Any) -> &mut T {
    match bean.downcast_mut::<T>() {
        Some(bean) => bean,
        None => panic!(
            "Incorrect descriptor usage: Descriptor for {} used with a different bean type",
            std::any::type_name::<T>()
        ),
    }
}

// Separate function so that the closure gets the higher-ranked signature of `Getter`
fn erase_getter<F>(f: F) -> Getter
where
    F: for<'a> Fn(&'a dyn Any) -> ValueRef<'a> + Send + Sync + 'static,
{
    Box::new(f)
}

fn typed_getter<T: Bean, V: AsValueRef + ?Sized + 'static>(get: fn(&T) -> &V) -> Getter {
    erase_getter(move |bean| get(downcast_ref::<T>(bean)).as_value_ref())
}

fn typed_setter<T: Bean, V: FromValue + 'static>(set: fn(&mut T, V)) -> Setter {
    Box::new(move |bean: &mut dyn Any, value: Value| {
        let value = V::from_value(value)?;
        set(downcast_mut::<T>(bean), value);
        Ok(())
    })
}

/// Property of a bean type
pub struct PropertyDescriptor {
    name: String,
    wire_name: String,
    serialization: Serialization,
    value_hint: Option<TargetType>,
    element_hint: Option<TypeHint>,
    getter: Option<Getter>,
    setter: Option<Setter>,
}

impl PropertyDescriptor {
    /// Name of the property, used for [ignored properties](crate::Codec::serialize_ignoring)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the JSON member the property is mapped to
    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }

    #[allow(missing_docs)]
    pub fn serialization(&self) -> Serialization {
        self.serialization
    }

    /// Target type for a JSON object or array value of this property
    pub fn value_hint(&self) -> Option<TargetType> {
        self.value_hint
    }

    /// Type hint for the items of a JSON array value of this property
    pub fn element_hint(&self) -> Option<&TypeHint> {
        self.element_hint.as_ref()
    }

    #[allow(missing_docs)]
    pub fn is_readable(&self) -> bool {
        self.getter.is_some()
    }

    #[allow(missing_docs)]
    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    /// Gets the value of the property, `None` if the property is write-only
    pub fn get<'a>(&self, bean: &'a dyn Bean) -> Option<ValueRef<'a>> {
        self.getter.as_ref().map(|get| get(bean.as_any()))
    }

    /// Converts the value and sets it on the bean
    ///
    /// # Panics
    /// Panics if the property is read-only or if the bean has a different type than the
    /// one this property belongs to.
    pub fn set(&self, bean: &mut dyn Bean, value: Value) -> Result<(), ConversionError> {
        match &self.setter {
            Some(set) => set(bean.as_any_mut(), value),
            None => panic!(
                "Incorrect descriptor usage: Property '{}' is read-only",
                self.name
            ),
        }
    }
}

impl Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("wire_name", &self.wire_name)
            .field("serialization", &self.serialization)
            .field("value_hint", &self.value_hint)
            .field("element_hint", &self.element_hint)
            .field("readable", &self.is_readable())
            .field("writable", &self.is_writable())
            .finish()
    }
}

/// Function which receives the items of a JSON array one by one
///
/// An accumulator is used for a JSON member which has no writable property but for which the
/// bean wants to collect the array items itself, for example to append them to an internal list.
pub struct AccumulatorDescriptor {
    member_name: String,
    element_hint: Option<TypeHint>,
    add: Setter,
}

impl AccumulatorDescriptor {
    /// Name of the JSON member whose array items are accumulated
    pub fn member_name(&self) -> &str {
        &self.member_name
    }

    /// Type hint for JSON object and array items
    pub fn element_hint(&self) -> Option<&TypeHint> {
        self.element_hint.as_ref()
    }

    /// Converts the item and adds it to the bean
    pub fn add(&self, bean: &mut dyn Bean, item: Value) -> Result<(), ConversionError> {
        (self.add)(bean.as_any_mut(), item)
    }
}

impl Debug for AccumulatorDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccumulatorDescriptor")
            .field("member_name", &self.member_name)
            .field("element_hint", &self.element_hint)
            .finish_non_exhaustive()
    }
}

/// Describes how a bean type is populated and dumped
pub struct TypeDescriptor {
    name: String,
    bean_type: BeanType,
    create: fn() -> Box<dyn Bean>,
    properties: Vec<PropertyDescriptor>,
    accumulators: Vec<AccumulatorDescriptor>,
}

fn create_default<T: Bean + Default>() -> Box<dyn Bean> {
    Box::new(T::default())
}

impl TypeDescriptor {
    /// Starts building the descriptor for the bean type `T`
    ///
    /// `name` is the name of the type used in error messages. New instances are created
    /// with `T::default()` when the type is the target of a JSON object.
    pub fn builder<T: Bean + Default>(name: &str) -> DescriptorBuilder<T> {
        DescriptorBuilder {
            descriptor: TypeDescriptor {
                name: name.to_owned(),
                bean_type: BeanType::of::<T>(),
                create: create_default::<T>,
                properties: Vec::new(),
                accumulators: Vec::new(),
            },
            marker: PhantomData,
        }
    }

    #[allow(missing_docs)]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[allow(missing_docs)]
    pub fn bean_type(&self) -> BeanType {
        self.bean_type
    }

    /// Creates a new instance of the bean type
    pub fn create(&self) -> Box<dyn Bean> {
        (self.create)()
    }

    /// Gets all properties, in declaration order
    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    /// Gets all accumulators
    pub fn accumulators(&self) -> &[AccumulatorDescriptor] {
        &self.accumulators
    }

    /// Gets the index of the writable property for a JSON member name
    ///
    /// Properties are matched by their [wire name](PropertyOptions::wire_name) only, so a
    /// renamed property cannot be set through its property name.
    pub fn writable_property_index(&self, member_name: &str) -> Option<usize> {
        self.properties
            .iter()
            .position(|p| p.is_writable() && p.wire_name == member_name)
    }

    /// Gets the index of the accumulator for a JSON member name
    pub fn accumulator_index(&self, member_name: &str) -> Option<usize> {
        self.accumulators
            .iter()
            .position(|a| a.member_name == member_name)
    }
}

impl Debug for TypeDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("bean_type", &self.bean_type)
            .field("properties", &self.properties)
            .field("accumulators", &self.accumulators)
            .finish()
    }
}

/// Builder for a [`TypeDescriptor`], created by [`TypeDescriptor::builder`]
pub struct DescriptorBuilder<T> {
    descriptor: TypeDescriptor,
    marker: PhantomData<fn() -> T>,
}

impl<T: Bean + Default> DescriptorBuilder<T> {
    /// Adds a property which is read and written under its own name
    ///
    /// Type hints for nested values come from [`FromValue::type_hint`] and
    /// [`FromValue::element_hint`] of the property type.
    pub fn property<V>(self, name: &str, get: fn(&T) -> &V, set: fn(&mut T, V)) -> Self
    where
        V: FromValue + AsValueRef + 'static,
    {
        self.property_with(name, get, set, PropertyOptions::default())
    }

    /// Adds a property with additional options
    pub fn property_with<V>(
        self,
        name: &str,
        get: fn(&T) -> &V,
        set: fn(&mut T, V),
        options: PropertyOptions,
    ) -> Self
    where
        V: FromValue + AsValueRef + 'static,
    {
        self.push_property::<V>(
            name,
            Some(typed_getter(get)),
            Some(typed_setter(set)),
            options,
        )
    }

    /// Adds a property which is only written during serialization
    pub fn read_only<V>(self, name: &str, get: fn(&T) -> &V, options: PropertyOptions) -> Self
    where
        V: AsValueRef + ?Sized + 'static,
    {
        let property = PropertyDescriptor {
            name: name.to_owned(),
            wire_name: options.wire_name.unwrap_or_else(|| name.to_owned()),
            serialization: options.serialization,
            value_hint: options.type_hint,
            element_hint: options.element_type_hint.map(TypeHint::new),
            getter: Some(typed_getter(get)),
            setter: None,
        };
        self.push(property)
    }

    /// Adds a property which is only populated by the parser
    pub fn write_only<V>(self, name: &str, set: fn(&mut T, V), options: PropertyOptions) -> Self
    where
        V: FromValue + 'static,
    {
        self.push_property::<V>(name, None, Some(typed_setter(set)), options)
    }

    /// Adds an accumulator which receives the items of the JSON array member `member_name`
    /// one by one
    pub fn accumulator<V>(mut self, member_name: &str, add: fn(&mut T, V)) -> Self
    where
        V: FromValue + 'static,
    {
        self.descriptor.accumulators.push(AccumulatorDescriptor {
            member_name: member_name.to_owned(),
            element_hint: TypeHint::of::<V>(),
            add: typed_setter(add),
        });
        self
    }

    fn push_property<V: FromValue>(
        self,
        name: &str,
        getter: Option<Getter>,
        setter: Option<Setter>,
        options: PropertyOptions,
    ) -> Self {
        let property = PropertyDescriptor {
            name: name.to_owned(),
            wire_name: options.wire_name.unwrap_or_else(|| name.to_owned()),
            serialization: options.serialization,
            value_hint: options.type_hint.or_else(V::type_hint),
            element_hint: options
                .element_type_hint
                .map(TypeHint::new)
                .or_else(V::element_hint),
            getter,
            setter,
        };
        self.push(property)
    }

    fn push(mut self, property: PropertyDescriptor) -> Self {
        if self
            .descriptor
            .properties
            .iter()
            .any(|p| p.name == property.name)
        {
            panic!(
                "Incorrect descriptor usage: Property '{}' of {} was already added",
                property.name, self.descriptor.name
            );
        }
        self.descriptor.properties.push(property);
        self
    }

    /// Creates the descriptor
    pub fn build(self) -> TypeDescriptor {
        self.descriptor
    }
}

/// Descriptors used during a single parse or serialize call
///
/// Registered descriptors are shared, descriptors of other bean types are built on
/// first use and kept until the end of the call.
pub(crate) struct DescriptorCache<'c> {
    registered: &'c HashMap<TypeId, Arc<TypeDescriptor>>,
    built: HashMap<TypeId, Arc<TypeDescriptor>>,
}

impl<'c> DescriptorCache<'c> {
    pub(crate) fn new(registered: &'c HashMap<TypeId, Arc<TypeDescriptor>>) -> Self {
        DescriptorCache {
            registered,
            built: HashMap::new(),
        }
    }

    pub(crate) fn get(&mut self, bean_type: BeanType) -> Arc<TypeDescriptor> {
        if let Some(descriptor) = self.registered.get(&bean_type.type_id()) {
            return Arc::clone(descriptor);
        }
        let descriptor = self.built.entry(bean_type.type_id()).or_insert_with(|| {
            debug!("building descriptor of unregistered bean type {bean_type}");
            Arc::new(bean_type.describe())
        });
        Arc::clone(descriptor)
    }
}

/// Store for JSON object members which have no matching bean property
pub trait DynamicAttributes {
    /// Stores an attribute, replacing a previous value with the same name
    fn set_attribute(&mut self, name: &str, value: Value);

    /// Gets the value of an attribute
    fn attribute(&self, name: &str) -> Option<&Value>;

    /// Gets the names of all attributes, in the order in which they are serialized
    fn attribute_names(&self) -> Vec<&str>;
}

/// [`DynamicAttributes`] implementation which can be embedded in a bean
///
/// Attributes are kept ordered by name.
#[derive(Clone, PartialEq, Default, Debug)]
pub struct AttributeBag {
    attributes: Map,
}

impl AttributeBag {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        AttributeBag::default()
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Removes an attribute and returns its value
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.attributes.remove(name)
    }
}

impl DynamicAttributes for AttributeBag {
    fn set_attribute(&mut self, name: &str, value: Value) {
        self.attributes.insert(name.to_owned(), value);
    }

    fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    fn attribute_names(&self) -> Vec<&str> {
        self.attributes.keys().map(String::as_str).collect()
    }
}

/// Implements [`FromValue`] and [`AsValueRef`] for bean types
///
/// This allows using the bean types as property types of other beans, as items of
/// `Vec` properties and as result of [`Codec::parse`](crate::Codec::parse).
///
/// ```
/// # use jsongraph::bean::*;
/// # #[derive(Clone, PartialEq, Default, Debug)]
/// # struct Foo { value: String }
/// # impl Bean for Foo {
/// #     fn describe() -> TypeDescriptor {
/// #         TypeDescriptor::builder::<Foo>("Foo")
/// #             .property("value", |f| &f.value, |f, v| f.value = v)
/// #             .build()
/// #     }
/// # }
/// jsongraph::bean_value!(Foo);
///
/// let codec = jsongraph::Codec::new();
/// let foo: Foo = codec.parse(r#"{"value": "a"}"#)?;
/// assert_eq!("a", foo.value);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[macro_export]
macro_rules! bean_value {
    ( $( $bean:ty ),+ $(,)? ) => {
        $(
            impl $crate::value::FromValue for $bean {
                fn from_value(
                    value: $crate::value::Value,
                ) -> ::std::result::Result<Self, $crate::value::ConversionError> {
                    value.into_bean::<$bean>()
                }

                fn type_hint() -> ::std::option::Option<$crate::bean::TargetType> {
                    ::std::option::Option::Some($crate::bean::TargetType::bean::<$bean>())
                }
            }

            impl $crate::value::AsValueRef for $bean {
                fn as_value_ref(&self) -> $crate::value::ValueRef<'_> {
                    $crate::value::ValueRef::Bean(self)
                }
            }
        )+
    };
}
