//! Request execution plumbing.

pub mod http;
