//! Reaction handler - Turns a target's 🛡️ reaction into a defence.

use crate::{
    bot::BotData,
    core::model::{MessageRef, UserId},
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use tracing::{debug, instrument};

/// The symbol a reaction stands for, if it can defend at all.
///
/// Only human members reacting inside a guild with a plain Unicode emoji can
/// defend; custom emoji never match a defend symbol.
#[must_use]
pub fn defend_symbol(in_guild: bool, is_bot: bool, emoji: &serenity::ReactionType) -> Option<&str> {
    if !in_guild || is_bot {
        return None;
    }
    match emoji {
        serenity::ReactionType::Unicode(symbol) => Some(symbol),
        _ => None,
    }
}

/// Handles a reaction added anywhere the bot can see.
///
/// Reactions on messages that aren't pending steals, from the wrong member or
/// arriving after resolution are ignored.
#[instrument(skip(data, reaction), fields(message = %reaction.message_id))]
pub async fn on_reaction_add(data: &BotData, reaction: &serenity::Reaction) -> Result<()> {
    let Some(member) = &reaction.member else {
        return Ok(());
    };
    let Some(symbol) = defend_symbol(reaction.guild_id.is_some(), member.user.bot, &reaction.emoji)
    else {
        return Ok(());
    };

    let result = data
        .engine
        .defend_by_message(
            MessageRef(reaction.message_id.get()),
            UserId(member.user.id.get()),
            symbol,
        )
        .await;

    match result {
        Ok(outcome) => {
            debug!(?outcome, "Defence accepted");
            Ok(())
        }
        Err(Error::AlreadyResolved | Error::Validation(_)) => Ok(()),
        Err(e) => Err(e),
    }
}
