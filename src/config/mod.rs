// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - `model.rs`: the TOML-backed data model.
//! - `loader.rs`: reading a config file from disk.
//! - `validate.rs`: checks run when turning a `RawConfigFile` into a
//!   `ConfigFile` (tasks present, backend sections complete, no cycles).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    BatchSection, ConfigFile, ConfigSection, RawConfigFile, SchedulerSection, TaskConfig,
};
