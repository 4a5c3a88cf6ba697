//! Configuration management for wavebar.
//!
//! Loads and saves application configuration as TOML in the user's config
//! directory.

pub mod file;

pub use file::{config_path, AudioConfig, ResizeConfig, WavebarConfig};
