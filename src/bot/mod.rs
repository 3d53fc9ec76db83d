//! Bot layer - Discord-specific interface and command handlers
//!
//! This module wires the steal engine to Discord: prefix and slash commands,
//! the reaction listener that turns 🛡️ reactions into defences, and the
//! notifier that renders engine notices as messages.

/// Discord command implementations (prawler skills, general)
pub mod commands;
/// Framework setup, error handling and shutdown
pub mod framework;
/// Discord event handlers (reactions)
pub mod handlers;
/// Renders engine notices as Discord messages
pub mod notifier;

use crate::{
    config::Settings,
    core::{
        steal::StealEngine,
        store::SeaOrmStore,
        traits::{SystemClock, ThreadRoller},
    },
};
use notifier::DiscordNotifier;
use std::sync::Arc;

/// The engine as the bot runs it.
pub type Engine = StealEngine<SeaOrmStore, DiscordNotifier, SystemClock, ThreadRoller>;

/// Shared data available to all bot commands.
/// This structure holds the steal engine, which owns the database-backed
/// store, and the loaded game rules.
pub struct BotData {
    /// The steal engine, shared with the expiry sweeper
    pub engine: Engine,
    /// Game rules loaded at startup
    pub settings: Arc<Settings>,
}

impl BotData {
    /// Creates a new `BotData` instance.
    #[must_use]
    pub const fn new(engine: Engine, settings: Arc<Settings>) -> Self {
        Self {
            engine,
            settings,
        }
    }

    /// The store behind the engine
    #[must_use]
    pub const fn store(&self) -> &SeaOrmStore {
        self.engine.store()
    }
}

pub use commands::*;
pub use framework::run_bot;
pub use handlers::*;
