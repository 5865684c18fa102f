//! Types shared by the journal error and logging facilities
//!
//! - **Correlation types**: `RequestId`, `TraceId`, `RequestContext`
//! - **Schema constants**: canonical structured-logging field keys and event names

pub mod correlation;
pub mod schema;

pub use correlation::{RequestContext, RequestId, TraceId};
