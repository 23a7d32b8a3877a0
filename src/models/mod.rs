//! Data types for accepted uploads.
//!
//! Nothing here is persisted: a record lives for one request and is gone
//! once its bytes are on disk or the request is rejected.

pub mod category;
pub mod upload;
