//! HTTP protocol layer module
//!
//! Content-type lookup and response transmission, decoupled from the
//! resolution pipeline.

pub mod mime;
pub mod response;

pub use response::from_plan;
