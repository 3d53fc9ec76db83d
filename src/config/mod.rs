/// Database configuration and connection management
pub mod database;

/// Game rule settings loaded from config.toml
pub mod settings;

pub use settings::{
    DoublingSettings, Settings, SharpenSettings, StealSettings, SweepSettings,
    load_default_settings, load_settings,
};
