pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod processor;
pub mod server;

pub use error::{Error, Result};
