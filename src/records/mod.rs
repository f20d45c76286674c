//! Record model: raw row validation and event-key matching

pub mod matcher;
pub mod parser;

pub use matcher::*;
pub use parser::*;
