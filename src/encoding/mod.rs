//! Schema encoders.
//!
//! Callers that still speak schema A (or proxies serving schema A clients) render
//! normalized results and parts here; schema B is the native shape of this crate.

pub mod schema;
pub mod stream;

pub use schema::*;
pub use stream::*;
