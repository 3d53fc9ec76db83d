//! Domain types shared by the steal engine, its collaborators and the bot layer.

use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Class name every member starts with; such members can't be stolen from.
pub const DEFAULT_CLASS: &str = "default";

/// Class that owns the steal and sharpen skills.
pub const PRAWLER_CLASS: &str = "prawler";

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl $name {
            /// Decodes an id stored as text.
            pub fn parse(raw: &str) -> Result<Self> {
                raw.parse().map(Self).map_err(|_| Error::CorruptRecord {
                    field: $field,
                    value: raw.to_string(),
                })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

snowflake!(
    /// Discord user id
    UserId,
    "user_id"
);
snowflake!(
    /// Discord channel id
    ChannelRef,
    "channel_id"
);
snowflake!(
    /// Discord message id
    MessageRef,
    "message_id"
);

/// Where a steal's notifications go: the channel and the defend request message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Channel holding the defend request
    pub channel: ChannelRef,
    /// The defend request itself
    pub message: MessageRef,
}

/// A steal waiting for the target to defend or for the sweep to expire it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSteal {
    /// Action identifier
    pub id: Uuid,
    /// Member stealing
    pub attacker_id: UserId,
    /// Member being stolen from
    pub target_id: UserId,
    /// When the attempt was created
    pub created_at: DateTime<Utc>,
    /// Reaction the target has to add to defend
    pub defend_symbol: String,
    /// Where outcomes are announced
    pub location: Location,
}

impl PendingSteal {
    /// Whether the action is at least `expiry` old at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, expiry: Duration) -> bool {
        (now - self.created_at)
            .to_std()
            .is_ok_and(|age| age >= expiry)
    }
}

/// Somebody taking part in a steal, as seen by the chat platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Participant {
    /// Member id
    pub id: UserId,
    /// Whether the account is a bot
    pub is_bot: bool,
}

impl Participant {
    /// A human member
    #[must_use]
    pub const fn member(id: UserId) -> Self {
        Self { id, is_bot: false }
    }
}

/// The role-play profile of a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Member id
    pub user_id: UserId,
    /// Class name
    pub class: String,
    /// Total skills used
    pub skills_used: i32,
    /// Knife sharpness stack
    pub sharpness: i32,
}

impl Profile {
    /// Members who never picked a class can't be targeted.
    #[must_use]
    pub fn is_classless(&self) -> bool {
        self.class == DEFAULT_CLASS
    }
}

/// Temporary conditions that gate skills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    /// Can't use skills
    KnockedOut,
    /// Can't be attacked
    Protected,
}

impl Effect {
    /// Stored name of the effect
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KnockedOut => "knocked_out",
            Self::Protected => "protected",
        }
    }

    /// Parses a stored effect name. Unknown effects belong to other cogs and are skipped.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "knocked_out" => Some(Self::KnockedOut),
            "protected" => Some(Self::Protected),
            _ => None,
        }
    }
}

/// Skill slots with independent cooldowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Skill {
    /// First skill: steal
    One,
    /// Second skill: sharpen
    Two,
}

impl Skill {
    /// Stored name of the slot
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::One => "one",
            Self::Two => "two",
        }
    }
}

/// A paid knife sharpening, applied by the store as one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharpenOrder {
    /// Member sharpening
    pub user: UserId,
    /// Price withdrawn from the member's balance
    pub cost: i64,
    /// Stack the knife can't go past
    pub max_stack: i32,
    /// When the sharpening happens; starts the slot cooldown
    pub at: DateTime<Utc>,
    /// Cooldown of the sharpen slot
    pub cooldown: Duration,
}

impl SharpenOrder {
    /// Latest last-use that still lets the slot be used at `at`.
    #[must_use]
    pub fn ready_since(&self) -> DateTime<Utc> {
        chrono::Duration::from_std(self.cooldown)
            .ok()
            .and_then(|cooldown| self.at.checked_sub_signed(cooldown))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// How the store settled a [`SharpenOrder`]. Nothing changes unless it's `Sharpened`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharpenAttempt {
    /// Paid, stack raised, cooldown started
    Sharpened {
        /// New stack
        stack: i32,
    },
    /// The stack is already at its maximum
    AtMaximum,
    /// The balance doesn't cover the price
    CannotAfford,
    /// The sharpen slot was used too recently
    OnCooldown {
        /// When the slot was last used
        last_use: DateTime<Utc>,
    },
}

/// What happened to a steal, or to one round of its doubling chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// The target defended in time
    Defended,
    /// The steal expired and the payout was transferred
    Succeeded {
        /// Amount transferred
        amount: i64,
    },
    /// The steal expired but the target couldn't pay
    FailedInsufficientFunds {
        /// Payout the target couldn't afford
        amount: i64,
    },
    /// A doubling round succeeded
    Doubled {
        /// 1-based round
        round: i32,
        /// Amount transferred in this round
        amount: i64,
    },
    /// A doubling round rolled well but the target couldn't pay; the chain ends
    InsufficientFunds {
        /// Amount the target couldn't afford
        amount: i64,
    },
    /// A doubling round missed; the chain ends
    Missed {
        /// Amount that would have been taken
        amount: i64,
    },
}

/// One expired steal resolved by a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The deleted action
    pub action: PendingSteal,
    /// What the sweep did with it
    pub outcome: Outcome,
}

/// A message the engine wants delivered. Rendering is up to the notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Ask the target to defend
    DefendRequest {
        /// Member stealing
        attacker: UserId,
        /// Member being stolen from
        target: UserId,
        /// Reaction to add
        symbol: String,
        /// Time left to react
        window: Duration,
    },
    /// Announce a steal outcome or a doubling round
    Outcome {
        /// Member stealing
        attacker: UserId,
        /// Member being stolen from
        target: UserId,
        /// What happened
        outcome: Outcome,
    },
    /// A doubling round broke down on a store failure
    ChainFailed {
        /// Member whose chain stopped
        attacker: UserId,
    },
}
