//! Precondition checks composed in front of skill commands.
//!
//! Each `ensure_*` function is pure and works on data the caller already
//! loaded; [`ready_to_use_skill`] loads what it needs from the store and
//! chains the checks shared by every class skill.

use crate::{
    core::{
        model::{ChannelRef, Effect, Profile, Skill, UserId},
        traits::SkillStore,
    },
    errors::{Result, ValidationError},
};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Rejects commands used outside the configured commands channel.
pub fn ensure_channel(
    channel: ChannelRef,
    allowed: Option<u64>,
) -> std::result::Result<(), ValidationError> {
    match allowed {
        Some(allowed) if allowed != channel.0 => Err(ValidationError::WrongChannel { allowed }),
        _ => Ok(()),
    }
}

/// Requires a profile of the given class.
pub fn ensure_class(
    profile: Option<&Profile>,
    required: &str,
) -> std::result::Result<(), ValidationError> {
    match profile {
        Some(profile) if profile.class == required => Ok(()),
        _ => Err(ValidationError::WrongClass {
            required: required.to_string(),
        }),
    }
}

/// Requires at least `required` skills used.
pub fn ensure_skills_used(
    profile: &Profile,
    required: i32,
) -> std::result::Result<(), ValidationError> {
    if profile.skills_used >= required {
        Ok(())
    } else {
        Err(ValidationError::NotEnoughSkillsUsed {
            required,
            used: profile.skills_used,
        })
    }
}

/// Time left on a cooldown that started at `last_use`; zero once it has passed.
#[must_use]
pub fn cooldown_remaining(last_use: DateTime<Utc>, now: DateTime<Utc>, cooldown: Duration) -> Duration {
    // A last use in the future (clock skew) counts as just used
    let elapsed = (now - last_use).to_std().unwrap_or(Duration::ZERO);
    cooldown.saturating_sub(elapsed)
}

/// Requires `cooldown` to have passed since `last_use`.
pub fn ensure_cooldown_elapsed(
    last_use: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    cooldown: Duration,
) -> std::result::Result<(), ValidationError> {
    let Some(last_use) = last_use else {
        return Ok(());
    };
    let remaining = cooldown_remaining(last_use, now, cooldown);
    if remaining.is_zero() {
        Ok(())
    } else {
        Err(ValidationError::OnCooldown { remaining })
    }
}

/// Knocked-out members can't use skills.
pub fn ensure_not_knocked_out(effects: &[Effect]) -> std::result::Result<(), ValidationError> {
    if effects.contains(&Effect::KnockedOut) {
        Err(ValidationError::KnockedOut)
    } else {
        Ok(())
    }
}

/// Loads the member's profile and checks class and slot cooldown.
///
/// Returns the profile so callers can run further checks on it.
pub async fn ready_to_use_skill<S: SkillStore>(
    store: &S,
    user: UserId,
    class: &str,
    skill: Skill,
    cooldown: Duration,
    now: DateTime<Utc>,
) -> Result<Profile> {
    let profile = store.get_profile(user).await?;
    ensure_class(profile.as_ref(), class)?;
    let last_use = store.last_skill_use(user, skill).await?;
    ensure_cooldown_elapsed(last_use, now, cooldown)?;

    profile.ok_or_else(|| {
        ValidationError::WrongClass {
            required: class.to_string(),
        }
        .into()
    })
}
