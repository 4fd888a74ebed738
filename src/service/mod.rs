//! Model services: the storable capability, request validation and exposed actions.

pub mod action;
mod storable;
mod validation;
pub use action::{ActionContext, ActionHandler, ActionOutput, SharedActionHandler};
pub use storable::{CreateHook, Storable};
pub(crate) use storable::into_object;
pub use validation::RequestValidator;
