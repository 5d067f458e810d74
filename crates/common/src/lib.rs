//! Types shared by the ambiance crates: secret wrapper and config errors

mod secret;
mod error;

pub use secret::Secret;
pub use error::{Error, Result};
