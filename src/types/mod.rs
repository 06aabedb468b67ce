//! Core types for walkwithme.

pub mod completion;
pub mod message;

pub use completion::*;
pub use message::*;
