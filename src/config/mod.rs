//! Configuration management for the rating collector
//!
//! This module handles all configuration loading from environment variables
//! and TOML files, validation, and default values.

pub mod app;
pub mod rating;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, SourceSettings};
pub use rating::RatingConfig;
