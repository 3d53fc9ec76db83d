//! Status effect entity - Temporary conditions on a member.
//!
//! `knocked_out` stops a member from using skills and `protected` shields a
//! member from attacks. A row with no `expires_at` lasts until removed.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Status effect database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "status_effects")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Discord user ID under the effect
    pub user_id: String,
    /// Effect name: `"knocked_out"` or `"protected"`
    pub effect: String,
    /// When the effect wears off
    pub expires_at: Option<DateTimeUtc>,
}

/// `StatusEffect` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
