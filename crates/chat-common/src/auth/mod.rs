//! Identity verification and room password utilities

mod password;
mod token;

pub use password::{hash_room_password, validate_room_password, verify_room_password};
pub use token::{Claims, TokenVerifier};
