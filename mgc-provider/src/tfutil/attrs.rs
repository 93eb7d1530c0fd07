//! Reading configured attributes and building state attribute maps

use mgc_core::provider::{ProviderError, ProviderResult};
use mgc_core::resource::{Attributes, Value};

/// Build an attribute map from `(name, value)` pairs
pub fn attributes<const N: usize>(pairs: [(&str, Value); N]) -> Attributes {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

pub fn required_str(attrs: &Attributes, name: &str) -> ProviderResult<String> {
    optional_str(attrs, name).ok_or_else(|| {
        ProviderError::new("Missing required attribute")
            .with_detail(format!("'{}' must be set", name))
    })
}

pub fn required_int(attrs: &Attributes, name: &str) -> ProviderResult<i64> {
    optional_int(attrs, name).ok_or_else(|| {
        ProviderError::new("Missing required attribute")
            .with_detail(format!("'{}' must be set", name))
    })
}

pub fn optional_str(attrs: &Attributes, name: &str) -> Option<String> {
    attrs.get(name).and_then(Value::as_str).map(str::to_string)
}

pub fn optional_int(attrs: &Attributes, name: &str) -> Option<i64> {
    attrs.get(name).and_then(Value::as_int)
}

pub fn optional_bool(attrs: &Attributes, name: &str) -> Option<bool> {
    attrs.get(name).and_then(Value::as_bool)
}

/// A list of strings; non-string items are skipped
pub fn string_list(attrs: &Attributes, name: &str) -> Option<Vec<String>> {
    match attrs.get(name)? {
        Value::List(items) => Some(
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
        ),
        _ => None,
    }
}

/// A nested object attribute
pub fn object<'a>(attrs: &'a Attributes, name: &str) -> Option<&'a Attributes> {
    attrs.get(name).and_then(Value::as_map)
}

/// A list of nested objects
pub fn object_list<'a>(attrs: &'a Attributes, name: &str) -> Vec<&'a Attributes> {
    match attrs.get(name) {
        Some(Value::List(items)) => items.iter().filter_map(Value::as_map).collect(),
        _ => Vec::new(),
    }
}

/// Copy configuration-only attributes into freshly read state
pub fn carry_over(mut attrs: Attributes, config: &Attributes, names: &[&str]) -> Attributes {
    for name in names {
        if let Some(value) = config.get(*name) {
            attrs.insert(name.to_string(), value.clone());
        }
    }
    attrs
}

/// True when the new configuration sets a value different from the
/// recorded one
///
/// Attributes left unset (or null) in `to` keep their current value and
/// never count as changed.
pub fn changed(from: &Attributes, to: &Attributes, name: &str) -> bool {
    match to.get(name).filter(|v| !v.is_null()) {
        Some(new) => from.get(name) != Some(new),
        None => false,
    }
}

/// Reject updates touching attributes that cannot change in place
pub fn ensure_unchanged(from: &Attributes, to: &Attributes, names: &[&str]) -> ProviderResult<()> {
    let names: Vec<&str> = names
        .iter()
        .copied()
        .filter(|name| changed(from, to, name))
        .collect();
    if names.is_empty() {
        return Ok(());
    }
    Err(ProviderError::new("Attribute change requires replacement").with_detail(format!(
        "{} cannot be updated in place; changing it requires replacement",
        names.join(", ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        let attrs = attributes([
            ("name", Value::from("vpc")),
            ("size", Value::from(20i64)),
            ("enabled", Value::from(true)),
            ("zones", Value::from(vec!["br-se1-a", "br-se1-b"])),
            ("description", Value::Null),
        ]);
        assert_eq!(required_str(&attrs, "name").unwrap(), "vpc");
        assert_eq!(required_int(&attrs, "size").unwrap(), 20);
        assert_eq!(optional_bool(&attrs, "enabled"), Some(true));
        assert_eq!(optional_str(&attrs, "description"), None);
        assert_eq!(
            string_list(&attrs, "zones").unwrap(),
            vec!["br-se1-a".to_string(), "br-se1-b".to_string()]
        );
        assert!(required_str(&attrs, "missing").is_err());
    }

    #[test]
    fn unset_in_new_config_is_unchanged() {
        let from = attributes([("vpc_id", Value::from("vpc-1"))]);
        assert!(!changed(&from, &Attributes::new(), "vpc_id"));
        assert!(!changed(&from, &attributes([("vpc_id", Value::Null)]), "vpc_id"));
        assert!(changed(&Attributes::new(), &from, "vpc_id"));
    }

    #[test]
    fn replacement_names_every_changed_attribute() {
        let from = attributes([("name", Value::from("a")), ("cidr", Value::from("10.0.0.0/24"))]);
        let to = attributes([("name", Value::from("b")), ("cidr", Value::from("10.0.1.0/24"))]);
        let err = ensure_unchanged(&from, &to, &["name", "cidr"]).unwrap_err();
        assert_eq!(err.message, "Attribute change requires replacement");
        assert!(err.detail.unwrap().starts_with("name, cidr cannot be updated"));

        assert!(ensure_unchanged(&from, &from, &["name"]).is_ok());
    }
}
