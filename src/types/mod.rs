//! Public types for the Huginn API.

mod command;
mod request;
mod response;

pub use command::{
    CacheKey, DEFAULT_TARGET, UNKNOWN_TYPE, USER_PREFIX, command_target, command_type,
};
pub use request::{FulfillmentSlot, PendingRequest, ResponseReceiver};
pub use response::OptimizedResponse;

pub(crate) use response::serialize_millis;
