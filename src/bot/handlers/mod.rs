//! Discord event handlers
//!
//! Poise routes every gateway event through [`event_handler`]; only reaction
//! adds matter to the steal engine.

/// Defend reactions on steal messages
pub mod reactions;

use crate::{bot::BotData, errors::{Error, Result}};
use poise::serenity_prelude as serenity;

/// Dispatches gateway events to their handlers.
pub async fn event_handler(
    _ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, BotData, Error>,
    data: &BotData,
) -> Result<()> {
    match event {
        serenity::FullEvent::ReactionAdd { add_reaction } => {
            reactions::on_reaction_add(data, add_reaction).await
        }
        serenity::FullEvent::Ready { data_about_bot } => {
            tracing::info!("{} is connected", data_about_bot.user.name);
            Ok(())
        }
        _ => Ok(()),
    }
}
