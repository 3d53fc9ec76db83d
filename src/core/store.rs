//! `SeaORM`-backed implementation of [`SkillStore`].
//!
//! Balance and counter changes are pushed down to SQL as
//! `column = column + delta` updates, so concurrent steals against the same
//! member never lose an update. `transfer` runs its debit and credit in one
//! database transaction and debits conditionally on the balance covering it;
//! `sharpen_knife` does the same for its cooldown check, capped stack raise
//! and payment.

use crate::{
    core::{
        model::{
            ChannelRef, Effect, Location, MessageRef, PendingSteal, Profile, SharpenAttempt,
            SharpenOrder, Skill, UserId,
        },
        traits::SkillStore,
    },
    entities::{
        Balance, PendingSteal as PendingStealEntity, Profile as ProfileEntity, SkillCooldown,
        StatusEffect, balance, pending_steal, profile, skill_cooldown, status_effect,
    },
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    Condition, QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr,
};
use tracing::{debug, instrument};

/// Store backed by a `SeaORM` connection.
#[derive(Debug, Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    /// Wraps an open connection whose tables already exist.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The underlying connection
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl TryFrom<pending_steal::Model> for PendingSteal {
    type Error = crate::errors::Error;

    fn try_from(model: pending_steal::Model) -> Result<Self> {
        Ok(Self {
            id: model.id,
            attacker_id: UserId::parse(&model.attacker_id)?,
            target_id: UserId::parse(&model.target_id)?,
            created_at: model.created_at,
            defend_symbol: model.defend_symbol,
            location: Location {
                channel: ChannelRef::parse(&model.channel_id)?,
                message: MessageRef::parse(&model.message_id)?,
            },
        })
    }
}

impl From<&PendingSteal> for pending_steal::ActiveModel {
    fn from(action: &PendingSteal) -> Self {
        Self {
            id: Set(action.id),
            attacker_id: Set(action.attacker_id.to_string()),
            target_id: Set(action.target_id.to_string()),
            created_at: Set(action.created_at),
            defend_symbol: Set(action.defend_symbol.clone()),
            channel_id: Set(action.location.channel.to_string()),
            message_id: Set(action.location.message.to_string()),
        }
    }
}

impl TryFrom<profile::Model> for Profile {
    type Error = crate::errors::Error;

    fn try_from(model: profile::Model) -> Result<Self> {
        Ok(Self {
            user_id: UserId::parse(&model.user_id)?,
            class: model.class,
            skills_used: model.skills_used,
            sharpness: model.sharpness,
        })
    }
}

/// Adds `amount` to a balance, creating the row for members who never held money.
async fn credit<C>(db: &C, user: UserId, amount: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let updated = Balance::update_many()
        .col_expr(
            balance::Column::Amount,
            Expr::col(balance::Column::Amount).add(amount),
        )
        .filter(balance::Column::UserId.eq(user.to_string()))
        .exec(db)
        .await?;

    if updated.rows_affected == 0 {
        balance::ActiveModel {
            user_id: Set(user.to_string()),
            amount: Set(amount),
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

/// Subtracts `amount` only if the balance covers it.
async fn debit<C>(db: &C, user: UserId, amount: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let updated = Balance::update_many()
        .col_expr(
            balance::Column::Amount,
            Expr::col(balance::Column::Amount).sub(amount),
        )
        .filter(balance::Column::UserId.eq(user.to_string()))
        .filter(balance::Column::Amount.gte(amount))
        .exec(db)
        .await?;
    Ok(updated.rows_affected == 1)
}

async fn find_skill_use<C>(db: &C, user: UserId, skill: Skill) -> Result<Option<skill_cooldown::Model>>
where
    C: ConnectionTrait,
{
    Ok(SkillCooldown::find()
        .filter(skill_cooldown::Column::UserId.eq(user.to_string()))
        .filter(skill_cooldown::Column::Skill.eq(skill.as_str()))
        .one(db)
        .await?)
}

/// Starts a slot cooldown, updating the slot's row when it already has one.
async fn write_skill_use<C>(db: &C, user: UserId, skill: Skill, at: DateTime<Utc>) -> Result<()>
where
    C: ConnectionTrait,
{
    if let Some(row) = find_skill_use(db, user, skill).await? {
        let mut active_model: skill_cooldown::ActiveModel = row.into();
        active_model.used_at = Set(at);
        active_model.update(db).await?;
    } else {
        skill_cooldown::ActiveModel {
            user_id: Set(user.to_string()),
            skill: Set(skill.as_str().to_string()),
            used_at: Set(at),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

impl SkillStore for SeaOrmStore {
    async fn get_pending(&self, attacker: UserId) -> Result<Option<PendingSteal>> {
        PendingStealEntity::find()
            .filter(pending_steal::Column::AttackerId.eq(attacker.to_string()))
            .one(&self.db)
            .await?
            .map(PendingSteal::try_from)
            .transpose()
    }

    async fn get_pending_by_message(&self, message: MessageRef) -> Result<Option<PendingSteal>> {
        PendingStealEntity::find()
            .filter(pending_steal::Column::MessageId.eq(message.to_string()))
            .one(&self.db)
            .await?
            .map(PendingSteal::try_from)
            .transpose()
    }

    #[instrument(skip(self, action), fields(action_id = %action.id))]
    async fn put(&self, action: &PendingSteal) -> Result<()> {
        pending_steal::ActiveModel::from(action)
            .insert(&self.db)
            .await?;
        debug!("Pending steal stored");
        Ok(())
    }

    async fn delete_if_exists(&self, id: Uuid) -> Result<bool> {
        let deleted = PendingStealEntity::delete_by_id(id).exec(&self.db).await?;
        Ok(deleted.rows_affected == 1)
    }

    async fn list_expired(&self, cutoff: DateTime<Utc>) -> Result<Vec<PendingSteal>> {
        PendingStealEntity::find()
            .filter(pending_steal::Column::CreatedAt.lte(cutoff))
            .order_by_asc(pending_steal::Column::CreatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(PendingSteal::try_from)
            .collect()
    }

    async fn get_balance(&self, user: UserId) -> Result<i64> {
        Ok(Balance::find_by_id(user.to_string())
            .one(&self.db)
            .await?
            .map_or(0, |row| row.amount))
    }

    #[instrument(skip(self))]
    async fn transfer(&self, from: UserId, to: UserId, amount: i64) -> Result<bool> {
        let txn = self.db.begin().await?;

        if !debit(&txn, from, amount).await? {
            txn.rollback().await?;
            debug!("Transfer refused, balance too low");
            return Ok(false);
        }
        credit(&txn, to, amount).await?;

        txn.commit().await?;
        Ok(true)
    }

    async fn get_sharpness(&self, user: UserId) -> Result<i32> {
        Ok(ProfileEntity::find_by_id(user.to_string())
            .one(&self.db)
            .await?
            .map_or(0, |row| row.sharpness))
    }

    #[instrument(skip(self, order), fields(user = %order.user))]
    async fn sharpen_knife(&self, order: &SharpenOrder) -> Result<SharpenAttempt> {
        let txn = self.db.begin().await?;

        if let Some(row) = find_skill_use(&txn, order.user, Skill::Two).await? {
            if row.used_at > order.ready_since() {
                txn.rollback().await?;
                return Ok(SharpenAttempt::OnCooldown {
                    last_use: row.used_at,
                });
            }
        }

        let raised = ProfileEntity::update_many()
            .col_expr(
                profile::Column::Sharpness,
                Expr::col(profile::Column::Sharpness).add(1),
            )
            .col_expr(
                profile::Column::SkillsUsed,
                Expr::col(profile::Column::SkillsUsed).add(1),
            )
            .filter(profile::Column::UserId.eq(order.user.to_string()))
            .filter(profile::Column::Sharpness.lt(order.max_stack))
            .exec(&txn)
            .await?;
        if raised.rows_affected == 0 {
            txn.rollback().await?;
            debug!("Sharpen refused, stack at its maximum");
            return Ok(SharpenAttempt::AtMaximum);
        }

        if !debit(&txn, order.user, order.cost).await? {
            txn.rollback().await?;
            debug!("Sharpen refused, balance too low");
            return Ok(SharpenAttempt::CannotAfford);
        }

        write_skill_use(&txn, order.user, Skill::Two, order.at).await?;
        let stack = ProfileEntity::find_by_id(order.user.to_string())
            .one(&txn)
            .await?
            .map_or(0, |row| row.sharpness);

        txn.commit().await?;
        Ok(SharpenAttempt::Sharpened { stack })
    }

    async fn get_profile(&self, user: UserId) -> Result<Option<Profile>> {
        ProfileEntity::find_by_id(user.to_string())
            .one(&self.db)
            .await?
            .map(Profile::try_from)
            .transpose()
    }

    async fn active_effects(&self, user: UserId, now: DateTime<Utc>) -> Result<Vec<Effect>> {
        let rows = StatusEffect::find()
            .filter(status_effect::Column::UserId.eq(user.to_string()))
            .filter(
                Condition::any()
                    .add(status_effect::Column::ExpiresAt.is_null())
                    .add(status_effect::Column::ExpiresAt.gt(now)),
            )
            .all(&self.db)
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| Effect::from_name(&row.effect))
            .collect())
    }

    async fn record_skill_used(&self, user: UserId) -> Result<()> {
        ProfileEntity::update_many()
            .col_expr(
                profile::Column::SkillsUsed,
                Expr::col(profile::Column::SkillsUsed).add(1),
            )
            .filter(profile::Column::UserId.eq(user.to_string()))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn last_skill_use(&self, user: UserId, skill: Skill) -> Result<Option<DateTime<Utc>>> {
        Ok(find_skill_use(&self.db, user, skill)
            .await?
            .map(|row| row.used_at))
    }

    async fn record_skill_use(&self, user: UserId, skill: Skill, at: DateTime<Utc>) -> Result<()> {
        write_skill_use(&self.db, user, skill, at).await
    }
}
