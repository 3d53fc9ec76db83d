//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables the steal engine reads and writes.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod balance;
pub mod pending_steal;
pub mod profile;
pub mod skill_cooldown;
pub mod status_effect;

// Re-export specific types to avoid conflicts
pub use balance::{Column as BalanceColumn, Entity as Balance, Model as BalanceModel};
pub use pending_steal::{
    Column as PendingStealColumn, Entity as PendingSteal, Model as PendingStealModel,
};
pub use profile::{Column as ProfileColumn, Entity as Profile, Model as ProfileModel};
pub use skill_cooldown::{
    Column as SkillCooldownColumn, Entity as SkillCooldown, Model as SkillCooldownModel,
};
pub use status_effect::{
    Column as StatusEffectColumn, Entity as StatusEffect, Model as StatusEffectModel,
};
