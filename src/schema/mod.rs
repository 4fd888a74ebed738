//! Schema documents per model and the OpenAPI document for the whole route table.

mod introspect;
pub mod openapi;

pub use introspect::*;
