//! Doubling chain: the sharpened-knife bonus that follows a resolved steal.
//!
//! Each round doubles the previous amount and rolls once. A hit transfers the
//! doubled amount from the target (if affordable) and, while the round number
//! is below the attacker's sharpness stack, schedules the next round. A miss
//! or an unaffordable amount ends the chain.
//!
//! Rounds are independent tokio tasks keyed by the steal they follow and the
//! round number, so chains of the same attacker can overlap. Every round waits
//! the configured delay before rolling. Rounds still waiting at shutdown are
//! cancelled.

use crate::{
    config::Settings,
    core::{
        model::{Location, Notice, Outcome, UserId},
        traits::{Notifier, Roller, SkillStore, deliver},
    },
    errors::Result,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::AbortHandle;
use uuid::Uuid;
use tracing::{debug, error, info, instrument};

/// Timing and odds of the chain.
#[derive(Debug, Clone)]
pub struct DoublingRules {
    /// Pause before each round
    pub delay: Duration,
    /// Rolls at or below this value hit
    pub success_chance: f64,
    /// Upper bound on a single notice delivery
    pub notify_timeout: Duration,
}

impl DoublingRules {
    /// Builds the rules from loaded settings.
    #[must_use]
    pub const fn from_settings(settings: &Settings) -> Self {
        Self {
            delay: Duration::from_secs(settings.doubling.delay_secs),
            success_chance: settings.doubling.success_chance,
            notify_timeout: Duration::from_secs(settings.sweep.notify_timeout_secs),
        }
    }
}

/// Identifies one scheduled round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainKey {
    /// Attacker the chain belongs to
    pub attacker: UserId,
    /// Steal the chain follows
    pub action: Uuid,
    /// 1-based round
    pub round: i32,
}

/// Everything a chain needs to play out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainRequest {
    /// Steal the chain follows
    pub action: Uuid,
    /// Member stealing
    pub attacker: UserId,
    /// Member paying for each hit
    pub target: UserId,
    /// Sharpness stack, the maximum number of rounds
    pub stack: i32,
    /// Amount the first round doubles
    pub seed: i64,
    /// Where round outcomes are announced
    pub location: Location,
}

/// Runs and tracks doubling chains.
#[derive(Clone)]
pub struct DoublingChains<S, N, R> {
    store: S,
    notifier: N,
    roller: R,
    rules: Arc<DoublingRules>,
    pending: Arc<Mutex<HashMap<ChainKey, AbortHandle>>>,
}

impl<S, N, R> DoublingChains<S, N, R>
where
    S: SkillStore,
    N: Notifier,
    R: Roller,
{
    /// Creates a chain runner with nothing scheduled.
    pub fn new(store: S, notifier: N, roller: R, rules: DoublingRules) -> Self {
        Self {
            store,
            notifier,
            roller,
            rules: Arc::new(rules),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Plays a single round without waiting.
    ///
    /// Returns the round's outcome and, when the chain goes on, the amount the
    /// next round doubles.
    pub async fn play_round(
        &self,
        request: &ChainRequest,
        round: i32,
        seed: i64,
    ) -> Result<(Outcome, Option<i64>)> {
        let amount = seed.saturating_mul(2);

        if self.roller.roll() > self.rules.success_chance {
            return Ok((Outcome::Missed { amount }, None));
        }

        if !self
            .store
            .transfer(request.target, request.attacker, amount)
            .await?
        {
            return Ok((Outcome::InsufficientFunds { amount }, None));
        }

        let next = (round < request.stack).then_some(amount);
        Ok((Outcome::Doubled { round, amount }, next))
    }

    /// Schedules the chain on background tasks, one task per round.
    #[instrument(skip(self, request), fields(attacker = %request.attacker, action = %request.action))]
    pub fn schedule(&self, request: ChainRequest) {
        info!(
            stack = request.stack,
            seed = request.seed,
            "Doubling chain scheduled"
        );
        self.schedule_round(request, 1, request.seed);
    }

    /// Cancels every scheduled round. Called once the bot is shutting down.
    pub fn cancel_all(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, handle) in pending.drain() {
            handle.abort();
        }
    }

    /// Rounds scheduled but not finished for `attacker`.
    pub fn in_flight(&self, attacker: UserId) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .filter(|key| key.attacker == attacker)
            .count()
    }

    fn schedule_round(&self, request: ChainRequest, round: i32, seed: i64) {
        let key = ChainKey {
            attacker: request.attacker,
            action: request.action,
            round,
        };
        let chains = self.clone();

        // Registered under the lock so the task can't unregister before it is registered
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(chains.rules.delay).await;
            chains.finish_round(request, key, seed).await;
        });
        pending.insert(key, handle.abort_handle());
    }

    async fn finish_round(&self, request: ChainRequest, key: ChainKey, seed: i64) {
        match self.play_round(&request, key.round, seed).await {
            Ok((outcome, next)) => {
                self.announce(&request, outcome).await;
                if let Some(amount) = next {
                    self.schedule_round(request, key.round + 1, amount);
                }
            }
            Err(e) => self.report_failure(&request, key.round, &e).await,
        }
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
    }

    async fn announce(&self, request: &ChainRequest, outcome: Outcome) {
        debug!(attacker = %request.attacker, ?outcome, "Doubling round played");
        deliver(
            &self.notifier,
            self.rules.notify_timeout,
            request.location,
            Notice::Outcome {
                attacker: request.attacker,
                target: request.target,
                outcome,
            },
        )
        .await;
    }

    async fn report_failure(&self, request: &ChainRequest, round: i32, e: &crate::errors::Error) {
        error!(attacker = %request.attacker, round, error = %e, "Doubling round failed");
        deliver(
            &self.notifier,
            self.rules.notify_timeout,
            request.location,
            Notice::ChainFailed {
                attacker: request.attacker,
            },
        )
        .await;
    }
}
