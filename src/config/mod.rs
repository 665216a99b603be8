// src/config/mod.rs

//! Launcher configuration: TOML model, validation and loading.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_default};
pub use model::{ConfigFile, LauncherSection, LauncherSettings, RawConfigFile, StoreSection};
