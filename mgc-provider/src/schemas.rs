//! Attribute types and attributes shared across adapter schemas

use mgc_core::resource::Value;
use mgc_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use crate::tfutil::split_zone;

/// Availability zone such as `br-se1-a`
pub fn availability_zone() -> AttributeType {
    AttributeType::Custom {
        name: "AvailabilityZone".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value {
            Value::String(s) if split_zone(s).is_some() => Ok(()),
            Value::String(s) => Err(format!(
                "'{}' is not an availability zone (expected e.g. br-se1-a)",
                s
            )),
            _ => Err("Expected string".to_string()),
        },
    }
}

pub fn ip_version() -> AttributeType {
    AttributeType::Enum(vec!["IPv4".to_string(), "IPv6".to_string()])
}

pub fn string_list() -> AttributeType {
    AttributeType::List(Box::new(AttributeType::String))
}

/// Cloud-assigned identifier
pub fn id() -> AttributeSchema {
    AttributeSchema::new("id", AttributeType::String)
        .computed()
        .with_description("Identifier assigned by the cloud")
}

/// Identifier argument of a single-object data source
pub fn id_argument(what: &str) -> AttributeSchema {
    AttributeSchema::new("id", AttributeType::String)
        .required()
        .with_description(format!("ID of the {}", what))
}

pub fn name() -> AttributeSchema {
    AttributeSchema::new("name", types::non_empty_string()).required()
}

pub fn description() -> AttributeSchema {
    AttributeSchema::new("description", AttributeType::String)
}

pub fn computed_string(name: &str) -> AttributeSchema {
    AttributeSchema::new(name, AttributeType::String).computed()
}

pub fn computed_int(name: &str) -> AttributeSchema {
    AttributeSchema::new(name, AttributeType::Int).computed()
}

pub fn computed_bool(name: &str) -> AttributeSchema {
    AttributeSchema::new(name, AttributeType::Bool).computed()
}

pub fn computed_list(name: &str, item: AttributeType) -> AttributeSchema {
    AttributeSchema::new(name, AttributeType::List(Box::new(item))).computed()
}

/// Nested object type carrying every attribute of another schema
pub fn object_of(schema: ResourceSchema) -> AttributeType {
    let mut fields: Vec<AttributeSchema> = schema.attributes.into_values().collect();
    fields.sort_by(|a, b| a.name.cmp(&b.name));
    AttributeType::Object(fields)
}

/// Nested object type from computed fields
pub fn computed_object(fields: impl IntoIterator<Item = AttributeSchema>) -> AttributeType {
    AttributeType::Object(fields.into_iter().collect())
}

/// `created_at` / `updated_at` in RFC 3339
pub fn timestamps() -> [AttributeSchema; 2] {
    [computed_string("created_at"), computed_string("updated_at")]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_type() {
        let zone = availability_zone();
        assert!(zone.validate(&Value::from("br-se1-a")).is_ok());
        assert!(zone.validate(&Value::from("br-se1")).is_err());
        assert!(zone.validate(&Value::from(1i64)).is_err());
        assert!(zone.validate(&Value::Null).is_ok());
    }
}
