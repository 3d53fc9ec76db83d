//! Core business logic - framework-agnostic steal engine and the pieces around it.
//!
//! Nothing in here knows about Discord: the bot layer feeds the engine typed
//! ids and implements [`traits::Notifier`] to deliver what it announces.

/// Doubling chain rounds and their scheduler
pub mod doubling;
/// Explicit precondition checks for skill commands
pub mod guards;
/// Domain types: actions, outcomes, notices, ids
pub mod model;
/// Knife sharpening upgrade
pub mod sharpen;
/// Steal lifecycle: initiate, defend, sweep
pub mod steal;
/// `SeaORM` implementation of the skill store
pub mod store;
/// Periodic expiry sweep and shutdown signal
pub mod sweeper;
/// Collaborator traits consumed by the engine
pub mod traits;
