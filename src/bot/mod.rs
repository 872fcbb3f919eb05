//! Discord interface: poise framework wiring and the command surface.
//!
//! Everything in here is presentation. Commands validate eligibility, call
//! into the core services carried in [`Data`], and render the structured
//! outcomes as embeds; the core never sees a poise or serenity type.

pub mod commands;

use crate::config::{AppConfig, Settings};
use crate::games::SessionRegistry;
use crate::ledger::Ledger;
use crate::permissions::PermissionRegistry;
use crate::responses::ResponseCatalog;
use crate::{errors, ledger};
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{error, info, instrument};

// Shared services, available in every command invocation.
pub struct Data {
    pub app_config: Arc<AppConfig>,
    pub settings: Arc<Settings>,
    pub ledger: Ledger,
    pub permissions: Arc<PermissionRegistry>,
    pub responses: Arc<ResponseCatalog>,
    pub sessions: Arc<SessionRegistry>,
}

// Type aliases poise threads through every command
pub(crate) type Error = errors::Error;
pub(crate) type Context<'a> = poise::Context<'a, Data, Error>;

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {error:?}");
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {error:?}", ctx.command().name);
            // Domain failures were already rendered; this is the generic path
            // for unexpected faults.
            if let Err(e) = ctx.say("An error occurred while processing this command.").await {
                error!("Failed to send error message: {e}");
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {e}");
            }
        }
    }
}

#[instrument(skip(token, data))]
pub async fn run_bot(token: String, data: Data) -> Result<(), serenity::Error> {
    let startup_ledger = data.ledger.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::bank::balance(),
                commands::bank::deposit(),
                commands::bank::withdraw(),
                commands::bank::donate(),
                commands::bank::leaderboard(),
                commands::activities::work(),
                commands::activities::crime(),
                commands::activities::rob(),
                commands::games::roulette(),
                commands::games::blackjack(),
                commands::prison::escape(),
                commands::prison::breakout(),
                commands::status::status(),
                commands::status::see_mortician(),
                commands::general::toggleheadpats(),
                commands::admin::add_medals(),
                commands::admin::remove_medals(),
                commands::admin::eco_set(),
                commands::admin::permit(),
                commands::admin::incarcerate(),
                commands::admin::release_prisoner(),
                commands::admin::flush_cache(),
            ],
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                info!("Registering commands globally...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                // Process sentences that expired while the bot was down.
                let mut released = 0;
                for guild in &ready.guilds {
                    released += startup_ledger.release_expired(guild.id.get()).await;
                }
                info!("Released {released} prisoners on startup");

                Ok(data)
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged();

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::Client::builder(&token, intents)
        .framework(framework)
        .await?;

    if let Err(why) = client.start().await {
        error!("Client error: {why:?}");
        return Err(why);
    }
    Ok(())
}

/// Unix timestamp formatted for embeds.
pub(crate) fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("t+{}", ts - ledger::unix_now()))
}
