//! Unified error types for the steal engine and the bot layer around it.
//!
//! Precondition failures are kept in their own [`ValidationError`] enum so the
//! bot layer can report them to the requester verbatim, while every other
//! variant of [`Error`] is a fault that aborts the current operation.

use std::time::Duration;
use thiserror::Error;

/// A broken precondition. No state was changed when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Attacker and target are the same member
    #[error("you cannot steal from yourself")]
    SelfTarget,

    /// Target is a bot account
    #[error("you cannot steal from a bot")]
    BotTarget,

    /// Target has never created a profile
    #[error("you cannot steal from someone who doesn't have an account")]
    NoAccount,

    /// Target still has the class-less `default` class
    #[error("you cannot steal from someone who has a `default` class")]
    ClasslessTarget,

    /// Target is protected against attacks
    #[error("the target is protected against attacks")]
    TargetProtected,

    /// The member using the skill is knocked out
    #[error("you can't use your skill, because you are knocked-out")]
    KnockedOut,

    /// Defend signal from someone other than the target, or with the wrong symbol
    #[error("only the target can defend against this steal")]
    NotYourSteal,

    /// Attacker already has a steal waiting to be resolved
    #[error("you already have a steal in progress")]
    AlreadyStealing,

    /// The member doesn't belong to the class the skill requires
    #[error("this skill is only available to the `{required}` class")]
    WrongClass {
        /// Class the skill belongs to
        required: String,
    },

    /// The skill was used too recently
    #[error("this skill is on cooldown for another {}s", remaining.as_secs())]
    OnCooldown {
        /// Time left until the skill can be used again
        remaining: Duration,
    },

    /// The member hasn't used enough skills to unlock this one
    #[error("you need to use {required} skills before unlocking this one (used {used})")]
    NotEnoughSkillsUsed {
        /// Skills that must have been used
        required: i32,
        /// Skills used so far
        used: i32,
    },

    /// Command was used outside of the configured commands channel
    #[error("this command can only be used in <#{allowed}>")]
    WrongChannel {
        /// The only channel the command is allowed in
        allowed: u64,
    },

    /// Knife sharpness is already at its cap
    #[error("your knife sharpness is already stacked to its maximum; `{stack}`")]
    MaxSharpness {
        /// Current (maximum) stack
        stack: i32,
    },

    /// Not enough money to pay for the skill
    #[error("you don't have `{required}łł` to use this skill")]
    InsufficientBalance {
        /// Price of the skill
        required: i64,
        /// What the member currently holds
        available: i64,
    },
}

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// A precondition was violated; reported to the requester
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The steal was already resolved (defended, swept or expired)
    #[error("steal action was already resolved")]
    AlreadyResolved,

    /// The notification sink failed to deliver a message
    #[error("Delivery error: {message}")]
    Delivery {
        /// What went wrong while delivering
        message: String,
    },

    /// A stored value could not be decoded
    #[error("Corrupt record: field `{field}` holds `{value}`")]
    CorruptRecord {
        /// Column that failed to decode
        field: &'static str,
        /// Raw stored value
        value: String,
    },

    /// Configuration could not be loaded or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description of the problem
        message: String,
    },

    /// Persistence layer failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required environment variable is missing
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Serenity/Poise framework failure
    #[error("Serenity/Poise framework error: {0}")]
    #[allow(clippy::enum_variant_names)]
    FrameworkError(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::FrameworkError(Box::new(value))
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
