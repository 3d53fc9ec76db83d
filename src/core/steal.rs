//! Steal engine - The lifecycle of a steal from initiation to resolution.
//!
//! A steal is created by [`StealEngine::initiate`] and resolved exactly once,
//! either by the target through [`StealEngine::defend`] or by
//! [`StealEngine::sweep_expired`] once the defend window has passed. Both paths
//! go through [`SkillStore::delete_if_exists`], and only the caller that
//! actually deleted the record acts on it.

use crate::{
    config::Settings,
    core::{
        doubling::{ChainRequest, DoublingChains, DoublingRules},
        guards,
        model::{
            ChannelRef, Effect, MessageRef, Notice, Outcome, Participant, PendingSteal,
            Resolution, UserId,
        },
        traits::{Clock, Dispatcher, Notifier, Roller, SkillStore},
    },
    errors::{Error, Result, ValidationError},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Fixed parameters of a steal.
#[derive(Debug, Clone)]
pub struct StealRules {
    /// Amount an undefended steal moves
    pub payout: i64,
    /// How long the target has to defend
    pub expiry: Duration,
    /// Reaction that defends
    pub defend_symbol: String,
    /// Upper bound on a single notice delivery
    pub notify_timeout: Duration,
}

impl StealRules {
    /// Builds the rules from loaded settings.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            payout: settings.steal.payout,
            expiry: settings.steal.expiry(),
            defend_symbol: settings.steal.defend_symbol.clone(),
            notify_timeout: Duration::from_secs(settings.sweep.notify_timeout_secs),
        }
    }
}

/// The steal engine, generic over its collaborators.
#[derive(Clone)]
pub struct StealEngine<S, N, C, R> {
    store: S,
    notifier: N,
    clock: C,
    rules: Arc<StealRules>,
    notices: Dispatcher<N>,
    chains: DoublingChains<S, N, R>,
}

impl<S, N, C, R> StealEngine<S, N, C, R>
where
    S: SkillStore,
    N: Notifier,
    C: Clock,
    R: Roller,
{
    /// Wires an engine from its collaborators and the loaded settings.
    pub fn new(store: S, notifier: N, clock: C, roller: R, settings: &Settings) -> Self {
        let chains = DoublingChains::new(
            store.clone(),
            notifier.clone(),
            roller,
            DoublingRules::from_settings(settings),
        );
        let rules = StealRules::from_settings(settings);
        Self {
            store,
            notices: Dispatcher::new(notifier.clone(), rules.notify_timeout),
            notifier,
            clock,
            rules: Arc::new(rules),
            chains,
        }
    }

    /// The store the engine writes to
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The doubling chain runner
    pub const fn chains(&self) -> &DoublingChains<S, N, R> {
        &self.chains
    }

    /// Outcome notices still being delivered
    pub fn pending_notices(&self) -> usize {
        self.notices.pending()
    }

    /// The rules in force
    pub fn rules(&self) -> &StealRules {
        &self.rules
    }

    /// Current time according to the engine's clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Starts a steal of `attacker` against `target`, announced in `channel`.
    ///
    /// Every precondition failure is a [`ValidationError`] and leaves no trace.
    /// The defend request is posted before anything is stored; if it can't be
    /// posted the steal doesn't happen.
    #[instrument(skip(self), fields(attacker = %attacker.id, target = %target.id))]
    pub async fn initiate(
        &self,
        attacker: Participant,
        target: Participant,
        channel: ChannelRef,
    ) -> Result<PendingSteal> {
        if attacker.id == target.id {
            return Err(ValidationError::SelfTarget.into());
        }
        if target.is_bot {
            return Err(ValidationError::BotTarget.into());
        }

        let now = self.clock.now();
        let attacker_effects = self.store.active_effects(attacker.id, now).await?;
        guards::ensure_not_knocked_out(&attacker_effects)?;

        let target_profile = self
            .store
            .get_profile(target.id)
            .await?
            .ok_or(ValidationError::NoAccount)?;
        if target_profile.is_classless() {
            return Err(ValidationError::ClasslessTarget.into());
        }
        if self
            .store
            .active_effects(target.id, now)
            .await?
            .contains(&Effect::Protected)
        {
            return Err(ValidationError::TargetProtected.into());
        }
        if self.store.get_pending(attacker.id).await?.is_some() {
            return Err(ValidationError::AlreadyStealing.into());
        }

        let request = Notice::DefendRequest {
            attacker: attacker.id,
            target: target.id,
            symbol: self.rules.defend_symbol.clone(),
            window: self.rules.expiry,
        };
        let location = tokio::time::timeout(
            self.rules.notify_timeout,
            self.notifier.post(channel, request),
        )
        .await
        .map_err(|_| Error::Delivery {
            message: "timed out posting the defend request".to_string(),
        })??;

        let action = PendingSteal {
            id: Uuid::new_v4(),
            attacker_id: attacker.id,
            target_id: target.id,
            created_at: now,
            defend_symbol: self.rules.defend_symbol.clone(),
            location,
        };

        if let Err(e) = self.store.put(&action).await {
            if let Err(retract_err) = self.notifier.retract(location).await {
                warn!(error = %retract_err, "Failed to retract defend request");
            }
            return Err(e);
        }

        if let Err(e) = self.store.record_skill_used(attacker.id).await {
            warn!(error = %e, "Failed to count skill use");
        }

        info!(action_id = %action.id, "Steal initiated");
        Ok(action)
    }

    /// Resolves a steal in the target's favour.
    ///
    /// Only the target, reacting with the defend symbol before the window
    /// closes, can defend. Returns [`Error::AlreadyResolved`] when the record
    /// is gone or past its window; callers drop that silently.
    #[instrument(skip(self, action), fields(action_id = %action.id))]
    pub async fn defend(
        &self,
        action: &PendingSteal,
        signaler: UserId,
        symbol: &str,
    ) -> Result<Outcome> {
        if signaler != action.target_id || symbol != action.defend_symbol {
            return Err(ValidationError::NotYourSteal.into());
        }
        if action.is_expired(self.clock.now(), self.rules.expiry) {
            debug!("Defend arrived after the window closed");
            return Err(Error::AlreadyResolved);
        }
        if !self.store.delete_if_exists(action.id).await? {
            debug!("Steal already resolved");
            return Err(Error::AlreadyResolved);
        }

        info!(attacker = %action.attacker_id, target = %action.target_id, "Steal defended");
        self.notices.send(
            action.location,
            Notice::Outcome {
                attacker: action.attacker_id,
                target: action.target_id,
                outcome: Outcome::Defended,
            },
        );
        Ok(Outcome::Defended)
    }

    /// Looks a steal up by its defend request message and defends it.
    pub async fn defend_by_message(
        &self,
        message: MessageRef,
        signaler: UserId,
        symbol: &str,
    ) -> Result<Outcome> {
        let action = self
            .store
            .get_pending_by_message(message)
            .await?
            .ok_or(Error::AlreadyResolved)?;
        self.defend(&action, signaler, symbol).await
    }

    /// Resolves every steal past its defend window.
    ///
    /// Outcome notices are handed to background tasks, so a slow or stuck
    /// notifier never holds the sweep up. A failure on one record is logged
    /// and the sweep goes on with the next.
    /// Only a failure to list the expired records aborts the sweep.
    #[instrument(skip(self))]
    pub async fn sweep_expired(&self) -> Result<Vec<Resolution>> {
        let now = self.clock.now();
        let Some(cutoff) = chrono::Duration::from_std(self.rules.expiry)
            .ok()
            .and_then(|expiry| now.checked_sub_signed(expiry))
        else {
            return Ok(Vec::new());
        };

        let expired = self.store.list_expired(cutoff).await?;
        let mut resolutions = Vec::with_capacity(expired.len());

        for action in expired {
            let action_id = action.id;
            match self.resolve_expired(action).await {
                Ok(Some(resolution)) => resolutions.push(resolution),
                Ok(None) => debug!(%action_id, "Steal resolved elsewhere, skipping"),
                Err(e) => error!(%action_id, error = %e, "Failed to resolve expired steal"),
            }
        }

        if !resolutions.is_empty() {
            info!(resolved = resolutions.len(), "Expired steals resolved");
        }
        Ok(resolutions)
    }

    async fn resolve_expired(&self, action: PendingSteal) -> Result<Option<Resolution>> {
        if !self.store.delete_if_exists(action.id).await? {
            return Ok(None);
        }

        let payout = self.rules.payout;
        let transferred = self
            .store
            .transfer(action.target_id, action.attacker_id, payout)
            .await;

        let outcome = match &transferred {
            Ok(true) => Some(Outcome::Succeeded { amount: payout }),
            Ok(false) => Some(Outcome::FailedInsufficientFunds { amount: payout }),
            Err(_) => None,
        };
        if let Some(outcome) = outcome {
            self.notices.send(
                action.location,
                Notice::Outcome {
                    attacker: action.attacker_id,
                    target: action.target_id,
                    outcome,
                },
            );
        }

        // The chain follows whatever happened to the base payout
        self.start_chain(&action).await;

        transferred?;
        Ok(outcome.map(|outcome| Resolution { action, outcome }))
    }

    async fn start_chain(&self, action: &PendingSteal) {
        let stack = match self.store.get_sharpness(action.attacker_id).await {
            Ok(stack) => stack,
            Err(e) => {
                warn!(attacker = %action.attacker_id, error = %e, "Failed to read sharpness");
                return;
            }
        };
        if stack > 0 {
            self.chains.schedule(ChainRequest {
                action: action.id,
                attacker: action.attacker_id,
                target: action.target_id,
                stack,
                seed: self.rules.payout,
                location: action.location,
            });
        }
    }
}
