//! Descriptor driven serializer
//!
//! Writes compact JSON text for [`ValueRef`]s and [`Value`]s. Beans are written by their custom
//! serializer, by their own [`Bean::to_json`], or member by member based on their
//! [`TypeDescriptor`](crate::bean::TypeDescriptor).

use std::{any::TypeId, collections::HashMap};

use log::trace;

use super::{write_string, CustomSerializer, SerializeError, SerializerSettings};
use crate::{
    bean::{Bean, DescriptorCache, Serialization},
    value::{Map, Value, ValueRef},
};

pub(crate) struct Serializer<'c> {
    out: String,
    custom_serializers: &'c HashMap<TypeId, CustomSerializer>,
    descriptors: DescriptorCache<'c>,
    /// Names of bean properties which are not written, on all nesting levels
    ignored_properties: &'c [&'c str],
    /// Structural path of the value being written, only used for error messages
    path: String,
    depth: u32,
    max_nesting_depth: u32,
}

impl<'c> Serializer<'c> {
    pub(crate) fn new(
        custom_serializers: &'c HashMap<TypeId, CustomSerializer>,
        descriptors: DescriptorCache<'c>,
        ignored_properties: &'c [&'c str],
        settings: &SerializerSettings,
    ) -> Self {
        Serializer {
            out: String::new(),
            custom_serializers,
            descriptors,
            ignored_properties,
            path: String::new(),
            depth: 0,
            max_nesting_depth: settings.max_nesting_depth,
        }
    }

    /// Writes the complete value and returns the JSON text
    pub(crate) fn serialize(mut self, value: &ValueRef<'_>) -> Result<String, SerializeError> {
        self.write_value_ref(value)?;
        debug_assert_eq!(0, self.depth);
        Ok(self.out)
    }

    fn write_value_ref(&mut self, value: &ValueRef<'_>) -> Result<(), SerializeError> {
        match value {
            ValueRef::Null => self.out.push_str("null"),
            ValueRef::Bool(value) => self.write_bool(*value),
            ValueRef::Integer(value) => self.out.push_str(&value.to_string()),
            ValueRef::Unsigned(value) => self.out.push_str(&value.to_string()),
            ValueRef::Decimal(value) => self.write_decimal(*value)?,
            ValueRef::String(value) => write_string(&mut self.out, value),
            ValueRef::Sequence(items) => {
                self.write_sequence(items.as_slice(), Self::write_value_ref)?
            }
            ValueRef::Map(members) => {
                self.begin_object()?;
                for (index, (name, value)) in members.iter().enumerate() {
                    let path_len = self.begin_member(index == 0, name);
                    self.write_value_ref(value)?;
                    self.path.truncate(path_len);
                }
                self.end_object();
            }
            ValueRef::Bean(bean) => self.write_bean(*bean)?,
            ValueRef::Value(value) => self.write_value(value)?,
        }
        Ok(())
    }

    fn write_value(&mut self, value: &Value) -> Result<(), SerializeError> {
        match value {
            Value::Null => self.out.push_str("null"),
            Value::Bool(value) => self.write_bool(*value),
            Value::Integer(value) => self.out.push_str(&value.to_string()),
            Value::Decimal(value) => self.write_decimal(*value)?,
            Value::String(value) => write_string(&mut self.out, value),
            Value::Array(items) => self.write_sequence(items.as_slice(), Self::write_value)?,
            Value::Object(members) => self.write_map(members)?,
            Value::Bean(bean) => self.write_bean(&**bean)?,
        }
        Ok(())
    }

    fn write_bool(&mut self, value: bool) {
        self.out.push_str(if value { "true" } else { "false" });
    }

    fn write_decimal(&mut self, value: f64) -> Result<(), SerializeError> {
        if !value.is_finite() {
            return Err(SerializeError::NonFiniteNumber {
                value,
                path: self.path.clone(),
            });
        }
        // Debug format always contains `.` or `e`, so the number is parsed as decimal again
        self.out.push_str(&format!("{value:?}"));
        Ok(())
    }

    fn enter_container(&mut self) -> Result<(), SerializeError> {
        self.depth += 1;
        if self.depth > self.max_nesting_depth {
            return Err(SerializeError::NestingTooDeep {
                max_depth: self.max_nesting_depth,
                path: self.path.clone(),
            });
        }
        Ok(())
    }

    fn write_sequence<T>(
        &mut self,
        items: &[T],
        mut write_item: impl FnMut(&mut Self, &T) -> Result<(), SerializeError>,
    ) -> Result<(), SerializeError> {
        self.enter_container()?;
        self.out.push('[');
        let path_len = self.path.len();
        self.path.push_str("[]");
        for (index, item) in items.iter().enumerate() {
            if index > 0 {
                self.out.push(',');
            }
            write_item(self, item)?;
        }
        self.path.truncate(path_len);
        self.out.push(']');
        self.depth -= 1;
        Ok(())
    }

    fn write_map(&mut self, members: &Map) -> Result<(), SerializeError> {
        self.begin_object()?;
        for (index, (name, value)) in members.iter().enumerate() {
            let path_len = self.begin_member(index == 0, name);
            self.write_value(value)?;
            self.path.truncate(path_len);
        }
        self.end_object();
        Ok(())
    }

    fn begin_object(&mut self) -> Result<(), SerializeError> {
        self.enter_container()?;
        self.out.push('{');
        Ok(())
    }

    /// Writes the member name and returns the length the path has to be truncated to
    /// once the member value has been written
    fn begin_member(&mut self, is_first: bool, name: &str) -> usize {
        if !is_first {
            self.out.push(',');
        }
        write_string(&mut self.out, name);
        self.out.push(':');

        let path_len = self.path.len();
        self.path.push('.');
        self.path.push_str(name);
        path_len
    }

    fn end_object(&mut self) {
        self.out.push('}');
        self.depth -= 1;
    }

    fn write_bean(&mut self, bean: &dyn Bean) -> Result<(), SerializeError> {
        let bean_type = bean.bean_type();
        if let Some(custom_serializer) = self.custom_serializers.get(&bean_type.type_id()) {
            trace!("using custom serializer for {bean_type} at path '{}'", self.path);
            self.out.push_str(&custom_serializer(bean));
            return Ok(());
        }
        if let Some(json) = bean.to_json() {
            self.out.push_str(&json);
            return Ok(());
        }

        let descriptor = self.descriptors.get(bean_type);
        self.begin_object()?;
        let mut is_first = true;

        for property in descriptor.properties() {
            let name = property.name();
            if self.ignored_properties.iter().any(|ignored| *ignored == name) {
                continue;
            }
            let serialization = property.serialization();
            if serialization == Serialization::Never {
                continue;
            }
            // Write-only property
            let Some(value) = property.get(bean) else {
                continue;
            };
            if serialization == Serialization::OmitIfNull && value.is_null() {
                continue;
            }

            let path_len = self.begin_member(is_first, property.wire_name());
            is_first = false;
            self.write_value_ref(&value)?;
            self.path.truncate(path_len);
        }

        if let Some(attributes) = bean.dynamic_attributes() {
            for name in attributes.attribute_names() {
                if let Some(value) = attributes.attribute(name) {
                    let path_len = self.begin_member(is_first, name);
                    is_first = false;
                    self.write_value(value)?;
                    self.path.truncate(path_len);
                }
            }
        }

        self.end_object();
        Ok(())
    }
}
