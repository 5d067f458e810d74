//! Philips Hue bridge client
//!
//! Sends a group action (`on`, `bri`, `xy`) to a bridge on the local network,
//! retrying failed attempts with linear backoff.

pub mod client;
pub mod error;
pub mod state;

pub use client::{HueClient, RetryPolicy};
pub use error::{Error, Result};
pub use state::LightState;
