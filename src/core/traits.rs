//! Collaborators the steal engine consumes: persistence, delivery, time and chance.
//!
//! The engine only talks to these traits. `SeaOrmStore` and `DiscordNotifier`
//! are the production implementations; tests swap in in-memory doubles.

use crate::core::model::{
    ChannelRef, Effect, Location, MessageRef, Notice, PendingSteal, Profile, SharpenAttempt,
    SharpenOrder, Skill, UserId,
};
use crate::errors::Result;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

/// Durable state behind the engine.
///
/// Balance changes must be atomic in the store itself (`balance = balance - x`
/// guarded by `balance >= x`), never read-then-write in the caller.
pub trait SkillStore: Send + Sync + Clone + 'static {
    /// The outstanding steal of an attacker, if any.
    fn get_pending(
        &self,
        attacker: UserId,
    ) -> impl Future<Output = Result<Option<PendingSteal>>> + Send;

    /// The outstanding steal whose defend request is `message`.
    fn get_pending_by_message(
        &self,
        message: MessageRef,
    ) -> impl Future<Output = Result<Option<PendingSteal>>> + Send;

    /// Persists a new steal.
    fn put(&self, action: &PendingSteal) -> impl Future<Output = Result<()>> + Send;

    /// Deletes the steal if it is still there. Exactly one caller sees `true`.
    fn delete_if_exists(&self, id: Uuid) -> impl Future<Output = Result<bool>> + Send;

    /// Every steal created at or before `cutoff`, oldest first.
    fn list_expired(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<PendingSteal>>> + Send;

    /// Current balance; members without a balance row hold 0.
    fn get_balance(&self, user: UserId) -> impl Future<Output = Result<i64>> + Send;

    /// Moves `amount` from `from` to `to`. Returns `false`, changing nothing,
    /// when `from` can't afford it.
    fn transfer(
        &self,
        from: UserId,
        to: UserId,
        amount: i64,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Knife sharpness stack; 0 without a profile.
    fn get_sharpness(&self, user: UserId) -> impl Future<Output = Result<i32>> + Send;

    /// Applies a sharpening in one transaction: the slot must be off cooldown,
    /// the stack below its maximum and the balance enough to pay. On success
    /// the price is debited, stack and skills-used both go up by one and the
    /// cooldown starts; otherwise nothing changes.
    fn sharpen_knife(
        &self,
        order: &SharpenOrder,
    ) -> impl Future<Output = Result<SharpenAttempt>> + Send;

    /// The member's profile, if they have one.
    fn get_profile(&self, user: UserId) -> impl Future<Output = Result<Option<Profile>>> + Send;

    /// Effects on the member that haven't worn off at `now`.
    fn active_effects(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Effect>>> + Send;

    /// Bumps the skills-used counter.
    fn record_skill_used(&self, user: UserId) -> impl Future<Output = Result<()>> + Send;

    /// When the member last used a skill slot.
    fn last_skill_use(
        &self,
        user: UserId,
        skill: Skill,
    ) -> impl Future<Output = Result<Option<DateTime<Utc>>>> + Send;

    /// Starts the cooldown of a skill slot at `at`.
    fn record_skill_use(
        &self,
        user: UserId,
        skill: Skill,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Renders and delivers engine notices.
pub trait Notifier: Send + Sync + Clone + 'static {
    /// Posts a new message in `channel` and returns where it landed.
    fn post(
        &self,
        channel: ChannelRef,
        notice: Notice,
    ) -> impl Future<Output = Result<Location>> + Send;

    /// Announces a notice about the steal living at `location`.
    fn notify(&self, location: Location, notice: Notice) -> impl Future<Output = Result<()>> + Send;

    /// Removes a message posted earlier.
    fn retract(&self, location: Location) -> impl Future<Output = Result<()>> + Send;
}

/// Source of the current time.
pub trait Clock: Send + Sync + Clone + 'static {
    /// Now, in UTC
    fn now(&self) -> DateTime<Utc>;
}

/// Source of uniform rolls in `[0, 1)`.
pub trait Roller: Send + Sync + Clone + 'static {
    /// Next roll
    fn roll(&self) -> f64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Rolls from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRoller;

impl Roller for ThreadRoller {
    fn roll(&self) -> f64 {
        rand::random::<f64>()
    }
}

/// Delivers a notice, waiting at most `timeout`. Failures are logged and dropped.
pub(crate) async fn deliver<N: Notifier>(
    notifier: &N,
    timeout: Duration,
    location: Location,
    notice: Notice,
) {
    match tokio::time::timeout(timeout, notifier.notify(location, notice)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, channel = %location.channel, "Failed to deliver notice"),
        Err(_) => warn!(
            channel = %location.channel,
            timeout_secs = timeout.as_secs(),
            "Notice delivery timed out"
        ),
    }
}

/// Sends notices from detached tasks, so callers never wait on delivery.
#[derive(Debug, Clone)]
pub struct Dispatcher<N> {
    notifier: N,
    timeout: Duration,
    in_flight: Arc<AtomicUsize>,
}

impl<N: Notifier> Dispatcher<N> {
    /// Each delivery gets at most `timeout`.
    pub fn new(notifier: N, timeout: Duration) -> Self {
        Self {
            notifier,
            timeout,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queues `notice` for delivery and returns immediately.
    pub fn send(&self, location: Location, notice: Notice) {
        let notifier = self.notifier.clone();
        let timeout = self.timeout;
        let guard = InFlight::enter(&self.in_flight);
        tokio::spawn(async move {
            let _guard = guard;
            deliver(&notifier, timeout, location, notice).await;
        });
    }

    /// Deliveries started but not yet finished
    pub fn pending(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{ChannelRef, Outcome};
    use crate::test_utils::RecordingNotifier;

    fn defended() -> Notice {
        Notice::Outcome {
            attacker: UserId(1),
            target: UserId(2),
            outcome: Outcome::Defended,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_delivery_is_given_up_after_timeout() {
        let notifier = RecordingNotifier::default();
        notifier.stall_deliveries(true);
        let dispatcher = Dispatcher::new(notifier.clone(), Duration::from_secs(5));
        let location = Location {
            channel: ChannelRef(1),
            message: MessageRef(2),
        };

        dispatcher.send(location, defended());
        assert_eq!(dispatcher.pending(), 1);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(dispatcher.pending(), 1);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(dispatcher.pending(), 0);
        assert!(notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_dispatched_notice_arrives() {
        let notifier = RecordingNotifier::default();
        let dispatcher = Dispatcher::new(notifier.clone(), Duration::from_secs(5));
        let location = Location {
            channel: ChannelRef(1),
            message: MessageRef(2),
        };

        dispatcher.send(location, defended());
        while dispatcher.pending() > 0 {
            tokio::task::yield_now().await;
        }

        assert_eq!(notifier.notices(), vec![defended()]);
    }
}
