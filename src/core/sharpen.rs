//! Knife sharpening - The paid upgrade that feeds the doubling chain.
//!
//! Sharpening costs a fixed price, unlocks after a number of skills used, has
//! its own (long) cooldown on skill slot two and caps at a maximum stack.

use crate::{
    config::SharpenSettings,
    core::{
        guards,
        model::{PRAWLER_CLASS, SharpenAttempt, SharpenOrder, Skill, UserId},
        traits::{Clock, SkillStore},
    },
    errors::{Result, ValidationError},
};
use tracing::{info, instrument};

/// Raises the member's sharpness stack by one and returns the new stack.
///
/// The checks up front give early answers; the store then re-checks cooldown,
/// cap and balance while applying the sharpening, so concurrent calls can't
/// pay twice or push the stack past its maximum.
#[instrument(skip(store, clock, rules))]
pub async fn sharpen<S, C>(
    store: &S,
    clock: &C,
    rules: &SharpenSettings,
    user: UserId,
) -> Result<i32>
where
    S: SkillStore,
    C: Clock,
{
    let now = clock.now();
    let profile = guards::ready_to_use_skill(
        store,
        user,
        PRAWLER_CLASS,
        Skill::Two,
        rules.cooldown(),
        now,
    )
    .await?;
    guards::ensure_not_knocked_out(&store.active_effects(user, now).await?)?;
    guards::ensure_skills_used(&profile, rules.skills_required)?;

    if profile.sharpness >= rules.max_stack {
        return Err(ValidationError::MaxSharpness {
            stack: profile.sharpness,
        }
        .into());
    }

    let order = SharpenOrder {
        user,
        cost: rules.cost,
        max_stack: rules.max_stack,
        at: now,
        cooldown: rules.cooldown(),
    };
    match store.sharpen_knife(&order).await? {
        SharpenAttempt::Sharpened { stack } => {
            info!(%user, stack, "Knife sharpened");
            Ok(stack)
        }
        SharpenAttempt::AtMaximum => Err(ValidationError::MaxSharpness {
            stack: rules.max_stack,
        }
        .into()),
        SharpenAttempt::CannotAfford => {
            let available = store.get_balance(user).await?;
            Err(ValidationError::InsufficientBalance {
                required: rules.cost,
                available,
            }
            .into())
        }
        SharpenAttempt::OnCooldown { last_use } => Err(ValidationError::OnCooldown {
            remaining: guards::cooldown_remaining(last_use, now, rules.cooldown()),
        }
        .into()),
    }
}
