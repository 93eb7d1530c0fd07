//! Shared conversion helpers used by every adapter

pub mod attrs;
pub mod convert;
pub mod errors;
pub mod merge;
pub mod wait;

pub use attrs::*;
pub use convert::{
    i64_ptr_to_int_ptr, int_ptr_to_i64_ptr, opt_time_to_rfc3339, region_from_zone, split_zone,
    time_to_rfc3339,
};
pub use errors::{found, parse_sdk_error, sdk_error};
pub use merge::{ConfigValue, MergeField, MergeFromLookup, attributes_lookup, merge_field};
pub use wait::{Poll, WaitConfig, wait_for};
