//! Shapes shared by several services

use serde::{Deserialize, Serialize};

/// Reference to another object, by ID or by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdOrName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl IdOrName {
    pub fn id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: None,
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }
}

/// Body returned by create endpoints
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdResponse {
    pub id: String,
}

/// `{"results": [...]}` listing envelope
#[derive(Debug, Clone, Deserialize)]
pub struct Results<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

/// Query parameters for offset/limit listings using underscore-prefixed names
pub(crate) fn page_query(offset: u32, limit: u32) -> Vec<(&'static str, String)> {
    vec![("_offset", offset.to_string()), ("_limit", limit.to_string())]
}
