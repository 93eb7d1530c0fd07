//! Merging loosely typed key/value sources into typed config structs
//!
//! A source is a lookup function from a field tag to a [`ConfigValue`].
//! Each config struct lists its fields explicitly in [`MergeFromLookup`];
//! only the closed set of field types implementing [`MergeField`] can take
//! part, so there is no open-ended runtime coercion.

use mgc_core::resource::{Attributes, Value};

/// A primitive value offered by a configuration source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    String(String),
    Int(i64),
    Bool(bool),
}

impl ConfigValue {
    /// Zero values never overwrite a field
    pub fn is_zero(&self) -> bool {
        match self {
            ConfigValue::String(s) => s.is_empty(),
            ConfigValue::Int(n) => *n == 0,
            ConfigValue::Bool(b) => !b,
        }
    }

    /// Convert an attribute value; lists, maps, floats and null have no
    /// config representation
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(ConfigValue::String(s.clone())),
            Value::Int(n) => Some(ConfigValue::Int(*n)),
            Value::Bool(b) => Some(ConfigValue::Bool(*b)),
            _ => None,
        }
    }
}

/// A field type that can absorb a [`ConfigValue`]
pub trait MergeField {
    /// Set the field when the value has a compatible type.
    /// Returns whether the field was changed.
    fn merge(&mut self, value: &ConfigValue) -> bool;
}

impl MergeField for String {
    fn merge(&mut self, value: &ConfigValue) -> bool {
        match value {
            ConfigValue::String(s) => {
                *self = s.clone();
                true
            }
            _ => false,
        }
    }
}

impl MergeField for i64 {
    fn merge(&mut self, value: &ConfigValue) -> bool {
        match value {
            ConfigValue::Int(n) => {
                *self = *n;
                true
            }
            _ => false,
        }
    }
}

impl MergeField for bool {
    fn merge(&mut self, value: &ConfigValue) -> bool {
        match value {
            ConfigValue::Bool(b) => {
                *self = *b;
                true
            }
            _ => false,
        }
    }
}

impl<T: MergeField + Default> MergeField for Option<T> {
    fn merge(&mut self, value: &ConfigValue) -> bool {
        let mut inner = T::default();
        if inner.merge(value) {
            *self = Some(inner);
            true
        } else {
            false
        }
    }
}

/// Merge the value found under `tag` into `field`
///
/// Absent values, zero values and values of an incompatible type leave the
/// field untouched.
pub fn merge_field<F, L>(field: &mut F, tag: &str, lookup: &L) -> bool
where
    F: MergeField,
    L: Fn(&str) -> Option<ConfigValue> + ?Sized,
{
    match lookup(tag) {
        Some(value) if !value.is_zero() => field.merge(&value),
        _ => false,
    }
}

/// Config structs that can be filled from a lookup source
pub trait MergeFromLookup {
    fn merge_from(&mut self, lookup: &dyn Fn(&str) -> Option<ConfigValue>);
}

/// Lookup over an attribute map; tags match keys case-insensitively
pub fn attributes_lookup(attributes: &Attributes) -> impl Fn(&str) -> Option<ConfigValue> + '_ {
    move |tag| {
        attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(tag))
            .and_then(|(_, value)| ConfigValue::from_value(value))
    }
}
