//! Shared test utilities for the steal engine.
//!
//! This module provides helpers for setting up test databases, seeding
//! members, and in-memory doubles for every engine collaborator.

#![allow(clippy::unwrap_used, clippy::panic)]

use crate::{
    config::{DoublingSettings, Settings},
    core::{
        doubling::DoublingChains,
        model::{
            ChannelRef, Effect, Location, MessageRef, Notice, Outcome, PendingSteal, Profile,
            SharpenAttempt, SharpenOrder, Skill, UserId,
        },
        steal::StealEngine,
        store::SeaOrmStore,
        traits::{Clock, Notifier, Roller, SkillStore},
    },
    entities::{Balance, balance, profile, status_effect},
    errors::{Error, Result},
};
use chrono::{DateTime, TimeZone, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, Set};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a [`SeaOrmStore`] over a fresh in-memory database.
pub async fn setup_test_store() -> Result<SeaOrmStore> {
    Ok(SeaOrmStore::new(setup_test_db().await?))
}

/// Creates a profile with sensible defaults.
///
/// # Defaults
/// * `skills_used`: 0
/// * `sharpness`: 0
pub async fn create_test_profile(
    db: &DatabaseConnection,
    user: UserId,
    class: &str,
) -> Result<profile::Model> {
    Ok(profile::ActiveModel {
        user_id: Set(user.to_string()),
        class: Set(class.to_string()),
        skills_used: Set(0),
        sharpness: Set(0),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await?)
}

/// Sets a member's balance, creating the row if needed.
pub async fn fund(db: &DatabaseConnection, user: UserId, amount: i64) -> Result<()> {
    let row = balance::ActiveModel {
        user_id: Set(user.to_string()),
        amount: Set(amount),
    };
    if Balance::find_by_id(user.to_string()).one(db).await?.is_some() {
        row.update(db).await?;
    } else {
        row.insert(db).await?;
    }
    Ok(())
}

/// Overwrites a member's knife sharpness.
pub async fn set_sharpness(db: &DatabaseConnection, user: UserId, stack: i32) -> Result<()> {
    profile::ActiveModel {
        user_id: Set(user.to_string()),
        sharpness: Set(stack),
        ..Default::default()
    }
    .update(db)
    .await?;
    Ok(())
}

/// Puts an effect on a member. `None` never wears off.
pub async fn add_effect(
    db: &DatabaseConnection,
    user: UserId,
    effect: Effect,
    expires_at: Option<DateTime<Utc>>,
) -> Result<()> {
    status_effect::ActiveModel {
        user_id: Set(user.to_string()),
        effect: Set(effect.as_str().to_string()),
        expires_at: Set(expires_at),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(())
}

/// Routes engine logs to the test harness. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("prawler=debug")
        .with_test_writer()
        .try_init();
}

/// Default settings with doubling rounds firing immediately.
pub fn instant_settings() -> Settings {
    Settings {
        doubling: DoublingSettings {
            delay_secs: 0,
            ..DoublingSettings::default()
        },
        ..Settings::default()
    }
}

/// Waits until every scheduled round of `attacker` has finished.
///
/// # Panics
/// If the chain is still running after five seconds.
pub async fn wait_for_chains<S, N, R>(chains: &DoublingChains<S, N, R>, attacker: UserId)
where
    S: SkillStore,
    N: Notifier,
    R: Roller,
{
    for _ in 0..500 {
        if chains.in_flight(attacker) == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("doubling chain of {attacker} never finished");
}

/// Waits until every outcome notice the engine handed off has been delivered.
///
/// # Panics
/// If deliveries are still running after five seconds.
pub async fn wait_for_notices<S, N, C, R>(engine: &StealEngine<S, N, C, R>)
where
    S: SkillStore,
    N: Notifier,
    C: Clock,
    R: Roller,
{
    for _ in 0..500 {
        if engine.pending_notices() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("outcome notices never finished delivering");
}

/// A clock that only moves when told to.
///
/// # Defaults
/// * 2024-06-01 12:00:00 UTC
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl Default for FixedClock {
    fn default() -> Self {
        Self {
            now: Arc::new(Mutex::new(
                Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            )),
        }
    }
}

impl FixedClock {
    /// Moves the clock forward.
    pub fn advance(&self, by: chrono::Duration) {
        *self.now.lock().unwrap() += by;
    }

    /// Jumps to `at`.
    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap() = at;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Hands out pre-recorded rolls, then misses forever.
#[derive(Debug, Clone)]
pub struct ScriptedRoller {
    rolls: Arc<Mutex<VecDeque<f64>>>,
}

impl ScriptedRoller {
    /// Plays `rolls` in order.
    pub fn new(rolls: &[f64]) -> Self {
        Self {
            rolls: Arc::new(Mutex::new(rolls.iter().copied().collect())),
        }
    }
}

impl Roller for ScriptedRoller {
    fn roll(&self) -> f64 {
        self.rolls.lock().unwrap().pop_front().unwrap_or(0.99)
    }
}

#[derive(Debug, Default)]
struct Recorded {
    posts: Vec<(ChannelRef, Notice)>,
    notices: Vec<(tokio::time::Instant, Notice)>,
}

/// Notifier that remembers everything it was asked to deliver.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    recorded: Arc<Mutex<Recorded>>,
    next_message: Arc<AtomicU64>,
    failing: Arc<AtomicBool>,
    stalled: Arc<AtomicBool>,
}

impl RecordingNotifier {
    /// Makes every later delivery fail with [`Error::Delivery`].
    pub fn fail_deliveries(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    /// Makes every later `notify` hang until its caller gives up.
    pub fn stall_deliveries(&self, stall: bool) {
        self.stalled.store(stall, Ordering::SeqCst);
    }

    /// Messages posted so far, with their channel.
    pub fn posts(&self) -> Vec<(ChannelRef, Notice)> {
        self.recorded.lock().unwrap().posts.clone()
    }

    /// Notices delivered about existing steals.
    pub fn notices(&self) -> Vec<Notice> {
        self.timed_notices()
            .into_iter()
            .map(|(_, notice)| notice)
            .collect()
    }

    /// Notices delivered about existing steals, with when they arrived.
    pub fn timed_notices(&self) -> Vec<(tokio::time::Instant, Notice)> {
        self.recorded.lock().unwrap().notices.clone()
    }

    /// Outcomes announced so far, in order.
    pub fn outcomes(&self) -> Vec<Outcome> {
        self.notices()
            .into_iter()
            .filter_map(|notice| match notice {
                Notice::Outcome { outcome, .. } => Some(outcome),
                _ => None,
            })
            .collect()
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Delivery {
                message: "recording notifier set to fail".to_string(),
            });
        }
        Ok(())
    }
}

impl Notifier for RecordingNotifier {
    async fn post(&self, channel: ChannelRef, notice: Notice) -> Result<Location> {
        self.check()?;
        let message = MessageRef(self.next_message.fetch_add(1, Ordering::SeqCst) + 1);
        self.recorded.lock().unwrap().posts.push((channel, notice));
        Ok(Location { channel, message })
    }

    async fn notify(&self, _location: Location, notice: Notice) -> Result<()> {
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.check()?;
        self.recorded
            .lock()
            .unwrap()
            .notices
            .push((tokio::time::Instant::now(), notice));
        Ok(())
    }

    async fn retract(&self, _location: Location) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    pending: HashMap<Uuid, PendingSteal>,
    balances: HashMap<UserId, i64>,
    profiles: HashMap<UserId, Profile>,
    effects: Vec<(UserId, Effect, Option<DateTime<Utc>>)>,
    cooldowns: HashMap<(UserId, Skill), DateTime<Utc>>,
    fail_transfers: bool,
}

/// In-memory [`SkillStore`] for tests that run on paused time.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Overwrites a member's balance.
    pub fn set_balance(&self, user: UserId, amount: i64) {
        self.state.lock().unwrap().balances.insert(user, amount);
    }

    /// Current balance, 0 when never set.
    pub fn balance(&self, user: UserId) -> i64 {
        self.state
            .lock()
            .unwrap()
            .balances
            .get(&user)
            .copied()
            .unwrap_or(0)
    }

    /// Gives a member a profile.
    pub fn add_profile(&self, user: UserId, class: &str, skills_used: i32, sharpness: i32) {
        self.state.lock().unwrap().profiles.insert(
            user,
            Profile {
                user_id: user,
                class: class.to_string(),
                skills_used,
                sharpness,
            },
        );
    }

    /// Makes every later transfer fail with a database error.
    pub fn fail_transfers(&self, fail: bool) {
        self.state.lock().unwrap().fail_transfers = fail;
    }
}

impl SkillStore for MemoryStore {
    async fn get_pending(&self, attacker: UserId) -> Result<Option<PendingSteal>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .pending
            .values()
            .find(|action| action.attacker_id == attacker)
            .cloned())
    }

    async fn get_pending_by_message(&self, message: MessageRef) -> Result<Option<PendingSteal>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .pending
            .values()
            .find(|action| action.location.message == message)
            .cloned())
    }

    async fn put(&self, action: &PendingSteal) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state
            .pending
            .values()
            .any(|existing| existing.attacker_id == action.attacker_id)
        {
            return Err(DbErr::Custom("attacker already has a pending steal".to_string()).into());
        }
        state.pending.insert(action.id, action.clone());
        Ok(())
    }

    async fn delete_if_exists(&self, id: Uuid) -> Result<bool> {
        Ok(self.state.lock().unwrap().pending.remove(&id).is_some())
    }

    async fn list_expired(&self, cutoff: DateTime<Utc>) -> Result<Vec<PendingSteal>> {
        let state = self.state.lock().unwrap();
        let mut expired: Vec<PendingSteal> = state
            .pending
            .values()
            .filter(|action| action.created_at <= cutoff)
            .cloned()
            .collect();
        expired.sort_by_key(|action| action.created_at);
        Ok(expired)
    }

    async fn get_balance(&self, user: UserId) -> Result<i64> {
        Ok(self.balance(user))
    }

    async fn transfer(&self, from: UserId, to: UserId, amount: i64) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        if state.fail_transfers {
            return Err(DbErr::Custom("transfer failed".to_string()).into());
        }
        let available = state.balances.get(&from).copied().unwrap_or(0);
        if available < amount {
            return Ok(false);
        }
        state.balances.insert(from, available - amount);
        *state.balances.entry(to).or_insert(0) += amount;
        Ok(true)
    }

    async fn get_sharpness(&self, user: UserId) -> Result<i32> {
        let state = self.state.lock().unwrap();
        Ok(state.profiles.get(&user).map_or(0, |p| p.sharpness))
    }

    async fn sharpen_knife(&self, order: &SharpenOrder) -> Result<SharpenAttempt> {
        let mut state = self.state.lock().unwrap();
        if let Some(&last_use) = state.cooldowns.get(&(order.user, Skill::Two)) {
            if last_use > order.ready_since() {
                return Ok(SharpenAttempt::OnCooldown { last_use });
            }
        }
        let stack = state.profiles.get(&order.user).map_or(0, |p| p.sharpness);
        if !state.profiles.contains_key(&order.user) || stack >= order.max_stack {
            return Ok(SharpenAttempt::AtMaximum);
        }
        let available = state.balances.get(&order.user).copied().unwrap_or(0);
        if available < order.cost {
            return Ok(SharpenAttempt::CannotAfford);
        }
        state.balances.insert(order.user, available - order.cost);
        let profile = state.profiles.get_mut(&order.user).unwrap();
        profile.sharpness += 1;
        profile.skills_used += 1;
        let stack = profile.sharpness;
        state.cooldowns.insert((order.user, Skill::Two), order.at);
        Ok(SharpenAttempt::Sharpened { stack })
    }

    async fn get_profile(&self, user: UserId) -> Result<Option<Profile>> {
        Ok(self.state.lock().unwrap().profiles.get(&user).cloned())
    }

    async fn active_effects(&self, user: UserId, now: DateTime<Utc>) -> Result<Vec<Effect>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .effects
            .iter()
            .filter(|(owner, _, expires_at)| {
                *owner == user && expires_at.is_none_or(|at| at > now)
            })
            .map(|(_, effect, _)| *effect)
            .collect())
    }

    async fn record_skill_used(&self, user: UserId) -> Result<()> {
        if let Some(profile) = self.state.lock().unwrap().profiles.get_mut(&user) {
            profile.skills_used += 1;
        }
        Ok(())
    }

    async fn last_skill_use(&self, user: UserId, skill: Skill) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .cooldowns
            .get(&(user, skill))
            .copied())
    }

    async fn record_skill_use(&self, user: UserId, skill: Skill, at: DateTime<Utc>) -> Result<()> {
        self.state.lock().unwrap().cooldowns.insert((user, skill), at);
        Ok(())
    }
}
