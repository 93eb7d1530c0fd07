use mgc_core::resource::{Attributes, Value};
use mgc_sdk::object_storage::Bucket;

use crate::tfutil::attributes;

pub fn flatten_bucket(bucket: &str, versioning: bool) -> Attributes {
    attributes([
        ("id", bucket.into()),
        ("bucket", bucket.into()),
        ("enable_versioning", versioning.into()),
    ])
}

pub fn flatten_bucket_listing(bucket: &Bucket) -> Value {
    Value::Map(attributes([
        ("name", bucket.name.clone().into()),
        ("creation_date", bucket.creation_date.clone().into()),
    ]))
}
