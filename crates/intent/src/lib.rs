//! Prompt to ambiance intent extraction
//!
//! Sends a free-form prompt to a chat-completions endpoint with a fixed
//! instruction and validates the JSON the model returns into an `Intent`:
//! light on/off, brightness, CIE xy color and an optional song reference.

pub mod error;
pub mod extractor;
pub mod intent;

pub use error::{Error, Result};
pub use extractor::{DEFAULT_MODEL, IntentExtractor, OPENAI_BASE_URL, SYSTEM_PROMPT};
pub use intent::{Intent, SongRequest};
