//! Framework setup - Builds the poise framework, starts the expiry sweeper and
//! runs the client until a shutdown signal arrives.

use crate::{
    bot::{BotData, Engine, commands, handlers, notifier::DiscordNotifier},
    config::Settings,
    core::{
        steal::StealEngine,
        store::SeaOrmStore,
        sweeper::{run_sweeper, shutdown_signal},
        traits::{SystemClock, ThreadRoller},
    },
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument};

/// Prefix for text commands
const PREFIX: &str = "z!";

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {error}");
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {error}", ctx.command().name);
            if let Err(e) = ctx
                .say("**Your skill failed miserably for some reason!**")
                .await
            {
                error!("Failed to send error message: {e}");
            }
        }
        poise::FrameworkError::EventHandler { error, event, .. } => {
            error!("Error handling {}: {error}", event.snake_case_name());
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {e}");
            }
        }
    }
}

/// Builds the engine around the client's HTTP handle.
fn build_engine(http: Arc<serenity::Http>, database: DatabaseConnection, settings: &Settings) -> Engine {
    let notifier = DiscordNotifier::new(http, settings.doubling.success_chance);
    StealEngine::new(
        SeaOrmStore::new(database),
        notifier,
        SystemClock,
        ThreadRoller,
        settings,
    )
}

/// Runs the bot until Ctrl+C or SIGTERM.
///
/// On shutdown the sweeper stops, every doubling round still waiting is
/// cancelled and the shards are closed.
#[instrument(skip(token, settings, database))]
pub async fn run_bot(
    token: String,
    settings: Arc<Settings>,
    database: DatabaseConnection,
) -> Result<()> {
    let setup_settings = Arc::clone(&settings);
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::steal(),
                commands::sharpen(),
                commands::ping(),
                commands::help(),
            ],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(PREFIX.to_string()),
                ..Default::default()
            },
            event_handler: |ctx, event, framework, data| {
                Box::pin(handlers::event_handler(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                info!("Registering commands globally...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let engine = build_engine(Arc::clone(&ctx.http), database, &setup_settings);
                let sweeper = engine.clone();
                let period = Duration::from_secs(setup_settings.sweep.interval_secs);
                tokio::spawn(async move {
                    run_sweeper(sweeper.clone(), period, shutdown_signal()).await;
                    sweeper.chains().cancel_all();
                    info!("Pending doubling rounds cancelled");
                });

                Ok(BotData::new(engine, setup_settings))
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    let shard_manager = Arc::clone(&client.shard_manager);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, closing shards");
        shard_manager.shutdown_all().await;
    });

    info!("Starting bot client...");
    client.start().await?;
    Ok(())
}
