//! Profile entity - A member's role-play class and skill progression.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Profile database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    /// Discord user ID
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    /// Class name (`"default"` until the member picks one)
    pub class: String,
    /// How many skills the member has used in total
    pub skills_used: i32,
    /// Knife sharpness stack (0 to the configured maximum)
    pub sharpness: i32,
    /// When the profile was created
    pub created_at: DateTimeUtc,
}

/// `Profile` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
