//! Shared types for the study assistant workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::{Secret, SecretString};
