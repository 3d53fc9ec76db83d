//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// General utility commands
pub mod general;

/// Prawler class skills
pub mod prawler;

use crate::{
    bot::BotData,
    errors::{Error, Result},
};
use poise::serenity_prelude::Mentionable;

/// Replies to the author when `result` is a rejected precondition.
///
/// Rejections are expected and end the command quietly with `Ok(None)`; any
/// other error is passed on to the framework's error handler.
pub(crate) async fn reply_on_rejection<T>(
    ctx: poise::Context<'_, BotData, Error>,
    result: Result<T>,
) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(Error::Validation(rejection)) => {
            ctx.say(format!("**{}, {rejection}!**", ctx.author().mention()))
                .await?;
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

// Export commands
pub use general::*;
pub use prawler::*;
