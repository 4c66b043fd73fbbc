pub mod config;
pub mod error;
pub mod logging;
pub mod validate;

pub use config::{AegisConfig, FileSettings};
pub use error::{AegisError, AegisResult};
