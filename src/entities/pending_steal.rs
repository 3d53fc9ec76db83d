//! Pending steal entity - One row per steal waiting for a defend or an expiry sweep.
//!
//! The unique index on `attacker_id` keeps an attacker down to a single
//! outstanding steal even if two `initiate` calls slip past the engine check.
//! `channel_id` and `message_id` point at the defend request message.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Pending steal database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pending_steals")]
pub struct Model {
    /// Action identifier, generated by the engine
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Discord user ID of the attacker
    #[sea_orm(unique)]
    pub attacker_id: String,
    /// Discord user ID of the target
    pub target_id: String,
    /// When the steal was initiated
    pub created_at: DateTimeUtc,
    /// Reaction the target must add to defend
    pub defend_symbol: String,
    /// Discord channel ID holding the defend request
    pub channel_id: String,
    /// Discord message ID of the defend request
    #[sea_orm(unique)]
    pub message_id: String,
}

/// `PendingSteal` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
