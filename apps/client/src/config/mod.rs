pub mod client;

pub use client::{ClientConfig, DEFAULT_AI_REQUEST_TIMEOUT_MS};
