//! Discord delivery of engine notices.

use crate::{
    core::{
        model::{ChannelRef, Location, MessageRef, Notice, Outcome},
        traits::Notifier,
    },
    errors::Result,
};
use poise::serenity_prelude as serenity;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Posts notices through the bot's HTTP client.
///
/// Defend requests are fresh messages carrying the defend reaction; every
/// other notice is a reply to the defend request.
#[derive(Clone)]
pub struct DiscordNotifier {
    http: Arc<serenity::Http>,
    doubling_chance: f64,
}

impl DiscordNotifier {
    /// Creates a notifier. `doubling_chance` is only used to label doubling rounds.
    #[must_use]
    pub const fn new(http: Arc<serenity::Http>, doubling_chance: f64) -> Self {
        Self {
            http,
            doubling_chance,
        }
    }
}

impl Notifier for DiscordNotifier {
    async fn post(&self, channel: ChannelRef, notice: Notice) -> Result<Location> {
        let channel_id = serenity::ChannelId::new(channel.0);
        let content = describe(&notice, self.doubling_chance);
        let message = channel_id
            .send_message(&*self.http, serenity::CreateMessage::new().content(content))
            .await?;

        let location = Location {
            channel,
            message: MessageRef(message.id.get()),
        };
        // The message is live from here on, so the steal has to go ahead
        if let Notice::DefendRequest { symbol, .. } = notice {
            react_best_effort(
                message.react(&*self.http, serenity::ReactionType::Unicode(symbol)),
                location,
            )
            .await;
        }

        debug!(channel = %channel, message = %message.id, "Notice posted");
        Ok(location)
    }

    async fn notify(&self, location: Location, notice: Notice) -> Result<()> {
        let channel_id = serenity::ChannelId::new(location.channel.0);
        let message_id = serenity::MessageId::new(location.message.0);
        let reply = serenity::CreateMessage::new()
            .content(describe(&notice, self.doubling_chance))
            .reference_message((channel_id, message_id));
        channel_id.send_message(&*self.http, reply).await?;
        Ok(())
    }

    async fn retract(&self, location: Location) -> Result<()> {
        serenity::ChannelId::new(location.channel.0)
            .delete_message(&*self.http, serenity::MessageId::new(location.message.0))
            .await?;
        Ok(())
    }
}

/// Adds the defend reaction if Discord lets us. Without it the target can
/// still react by hand, so a failure is only logged.
async fn react_best_effort<T, F>(reaction: F, location: Location) -> bool
where
    F: Future<Output = serenity::Result<T>>,
{
    match reaction.await {
        Ok(_) => true,
        Err(e) => {
            warn!(
                error = %e,
                channel = %location.channel,
                message = %location.message,
                "Failed to add the defend reaction"
            );
            false
        }
    }
}

/// Renders a notice as message text.
#[must_use]
pub fn describe(notice: &Notice, doubling_chance: f64) -> String {
    match notice {
        Notice::DefendRequest {
            attacker,
            target,
            symbol,
            window,
        } => format!(
            "**<@{target}>, you are being robbed by <@{attacker}>! Defend yourself by reacting with {symbol}!**\n\
            *You have {} minutes to defend yourself!*",
            window.as_secs() / 60
        ),
        Notice::Outcome {
            attacker,
            target,
            outcome,
        } => match outcome {
            Outcome::Defended => format!(
                "**<@{target}> defended themselves against <@{attacker}>'s stealing, good luck next time!**"
            ),
            Outcome::Succeeded { amount } => {
                format!("🍃 <@{attacker}> stole {amount}łł from <@{target}>! 🍃")
            }
            Outcome::FailedInsufficientFunds { amount } => format!(
                "🍃 <@{attacker}> tried to steal {amount}łł from <@{target}>, but they didn't have it! 🍃"
            ),
            Outcome::Doubled { round, amount } => format!(
                "**Rob stack {round} ({:.0}% chance)**: <@{attacker}> managed to double their stealing, and got `{amount}łł` more 🔪🍃",
                doubling_chance * 100.0
            ),
            Outcome::InsufficientFunds { amount } => format!(
                "<@{attacker}> tried to double their stealing to `{amount}łł`, but <@{target}> didn't have it!"
            ),
            Outcome::Missed { amount } => {
                format!("<@{attacker}> failed to double their stealing to `{amount}łł` 🔪")
            }
        },
        Notice::ChainFailed { attacker } => {
            format!("**For some reason the stealing streak of <@{attacker}> broke down!**")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::UserId;
    use std::time::Duration;

    fn outcome(outcome: Outcome) -> Notice {
        Notice::Outcome {
            attacker: UserId(1),
            target: UserId(2),
            outcome,
        }
    }

    #[test]
    fn test_defend_request_mentions_both_and_window() {
        let text = describe(
            &Notice::DefendRequest {
                attacker: UserId(1),
                target: UserId(2),
                symbol: "🛡️".to_string(),
                window: Duration::from_secs(2400),
            },
            0.5,
        );
        assert!(text.starts_with("**<@2>, you are being robbed by <@1>!"));
        assert!(text.contains("reacting with 🛡️"));
        assert!(text.contains("40 minutes"));
    }

    #[test]
    fn test_outcome_texts() {
        assert_eq!(
            describe(&outcome(Outcome::Succeeded { amount: 5 }), 0.5),
            "🍃 <@1> stole 5łł from <@2>! 🍃"
        );
        assert!(
            describe(&outcome(Outcome::FailedInsufficientFunds { amount: 5 }), 0.5)
                .contains("but they didn't have it")
        );
        assert!(describe(&outcome(Outcome::Defended), 0.5).starts_with("**<@2> defended"));
    }

    #[test]
    fn test_doubled_round_shows_stack_and_chance() {
        let text = describe(&outcome(Outcome::Doubled { round: 2, amount: 20 }), 0.5);
        assert!(text.starts_with("**Rob stack 2 (50% chance)**"));
        assert!(text.contains("`20łł`"));
    }

    #[tokio::test]
    async fn test_failed_reaction_does_not_fail_the_post() {
        let location = Location {
            channel: ChannelRef(10),
            message: MessageRef(20),
        };

        let refused = react_best_effort(
            async { Err::<(), _>(serenity::Error::Other("missing permissions")) },
            location,
        )
        .await;
        let added = react_best_effort(async { Ok::<_, serenity::Error>(()) }, location).await;

        assert!(!refused);
        assert!(added);
    }
}
