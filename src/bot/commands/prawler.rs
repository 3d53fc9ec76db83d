//! Prawler Discord commands - `steal` and `sharpen`.
//!
//! Both commands run the same checks in front of the core: the commands
//! channel, the prawler class and the skill slot's cooldown. Rejections are
//! answered in the channel; everything else goes to the framework error handler.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, commands::reply_on_rejection},
        core::{
            guards,
            model::{ChannelRef, PRAWLER_CLASS, Participant, Skill, UserId},
            sharpen::sharpen as sharpen_knife,
            traits::{SkillStore, SystemClock},
        },
        errors::{Error, Result},
    };
    use poise::serenity_prelude::{self as serenity, Mentionable};
    use tracing::info;

    /// Steals money from a member.
    ///
    /// The target has 40 minutes to defend themselves by reacting with 🛡️.
    #[poise::command(slash_command, prefix_command, aliases("stl", "rob"), guild_only)]
    pub async fn steal(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "The member you want to steal from"] target: Option<serenity::User>,
    ) -> Result<()> {
        let data = ctx.data();
        let engine = &data.engine;
        let attacker = UserId(ctx.author().id.get());
        let channel = ChannelRef(ctx.channel_id().get());
        let now = engine.now();

        let ready = async {
            guards::ensure_channel(channel, data.settings.commands_channel_id)?;
            guards::ready_to_use_skill(
                engine.store(),
                attacker,
                PRAWLER_CLASS,
                Skill::One,
                data.settings.steal.cooldown(),
                now,
            )
            .await
        };
        if reply_on_rejection(ctx, ready.await).await?.is_none() {
            return Ok(());
        }

        let Some(target) = target else {
            ctx.say(format!(
                "**Inform a member to steal, {}!**",
                ctx.author().mention()
            ))
            .await?;
            return Ok(());
        };

        let initiated = engine
            .initiate(
                Participant::member(attacker),
                Participant {
                    id: UserId(target.id.get()),
                    is_bot: target.bot,
                },
                channel,
            )
            .await;
        let Some(action) = reply_on_rejection(ctx, initiated).await? else {
            return Ok(());
        };

        engine
            .store()
            .record_skill_use(attacker, Skill::One, action.created_at)
            .await?;
        info!(action_id = %action.id, "Steal started from Discord");

        if let poise::Context::Application(_) = ctx {
            ctx.send(
                poise::CreateReply::default()
                    .content(format!("**You are now stealing from {}!**", target.mention()))
                    .ephemeral(true),
            )
            .await?;
        }
        Ok(())
    }

    /// Sharpens your knife, letting your steals double one more time.
    ///
    /// Costs `500łł` and can be used once every 30 days.
    #[poise::command(slash_command, prefix_command, guild_only)]
    pub async fn sharpen(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let data = ctx.data();
        let user = UserId(ctx.author().id.get());

        let sharpened = async {
            guards::ensure_channel(
                ChannelRef(ctx.channel_id().get()),
                data.settings.commands_channel_id,
            )?;
            sharpen_knife(data.store(), &SystemClock, &data.settings.sharpen, user).await
        };
        let Some(stack) = reply_on_rejection(ctx, sharpened.await).await? else {
            return Ok(());
        };

        ctx.say(format!(
            "**{} has just sharpened their knife to stack `{stack}` 🔪**",
            ctx.author().mention()
        ))
        .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
