//! API DTOs

pub mod common;
pub mod user;
pub mod validated_json;

pub use common::*;
pub use user::*;
pub use validated_json::{ValidatedJson, ValidatedJsonRejection};
