//! Utility modules: shared HTTP client, timeout.

pub mod http;
pub mod timeout;
