//! Skill cooldown entity - Last time each member used each skill slot.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Skill cooldown database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "skill_cooldowns")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Discord user ID
    pub user_id: String,
    /// Skill slot (`"one"`, `"two"`)
    pub skill: String,
    /// When the skill was last used
    pub used_at: DateTimeUtc,
}

/// `SkillCooldown` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
