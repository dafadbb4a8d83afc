//! Entity to model mappers
//!
//! `TryFrom<Model> for Entity` converts database rows to domain objects.
//! Enum columns are stored as text, so conversions reject unknown values.

mod invitation;
mod membership;
mod notification;
mod room;

pub use membership::memberships_from_models;
