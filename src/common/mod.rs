//! Common utilities shared between client, daemon and template modes

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, Result};
