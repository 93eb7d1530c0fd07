use mgc_core::resource::{Attributes, Value};
use mgc_sdk::container_registry::{Credentials, Registry, Repository};

use crate::tfutil::{attributes, opt_time_to_rfc3339, time_to_rfc3339};

pub fn flatten_registry(registry: &Registry) -> Attributes {
    attributes([
        ("id", registry.id.clone().into()),
        ("name", registry.name.clone().into()),
        ("storage_usage_bytes", registry.storage_usage_bytes.into()),
        ("created_at", time_to_rfc3339(&registry.created_at).into()),
        (
            "updated_at",
            opt_time_to_rfc3339(registry.updated_at.as_ref()).into(),
        ),
    ])
}

pub fn flatten_credentials(credentials: &Credentials) -> Attributes {
    attributes([
        ("username", credentials.username.clone().into()),
        ("password", credentials.password.clone().into()),
        ("email", credentials.email.clone().into()),
    ])
}

pub fn flatten_repository(repository: &Repository) -> Value {
    Value::Map(attributes([
        ("registry_name", repository.registry_name.clone().into()),
        ("name", repository.name.clone().into()),
        ("image_count", repository.image_count.into()),
        ("created_at", time_to_rfc3339(&repository.created_at).into()),
        (
            "updated_at",
            opt_time_to_rfc3339(repository.updated_at.as_ref()).into(),
        ),
    ]))
}
