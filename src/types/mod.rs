//! Normalized value types shared by every component of the adapter.

pub mod message;
pub mod reasoning;
pub mod response;
pub mod tools;
pub mod usage;

pub use message::*;
pub use reasoning::*;
pub use response::*;
pub use tools::*;
pub use usage::*;
