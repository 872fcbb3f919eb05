//! The work / crime / rob command surface.

use crate::activities::{
    self, CrimeOutcome, CrimeRolls, ROB_VICTIM_COOLDOWN, RobOutcome, RobRolls, WorkRolls,
};
use crate::bot::commands::{
    self, DARK_ORANGE, DARK_RED, GOLD, GREEN, ORANGE, RED, author_name, economy_precheck,
    format_duration, guild_of, handle_cooldown, send_embed,
};
use crate::bot::{Context, Error};
use crate::models::Activity;
use crate::status;
use poise::serenity_prelude::{self as serenity, Mentionable};
use tracing::instrument;

/// Work to earn Medals.
#[poise::command(slash_command, guild_only)]
#[instrument(skip(ctx))]
pub async fn work(ctx: Context<'_>) -> Result<(), Error> {
    if !economy_precheck(&ctx).await? {
        return Ok(());
    }
    let data = ctx.data();
    let guild_id = guild_of(&ctx);
    let user_id = ctx.author().id.get();
    let username = author_name(&ctx);

    let injuries = data.ledger.account(guild_id, user_id, &username).await.injuries;
    let window = status::modified_cooldown(activities::WORK_COOLDOWN, injuries);
    if !handle_cooldown(&ctx, Activity::Work, window, "work").await? {
        return Ok(());
    }

    let settings = data.settings.get().await;
    let rolls = {
        let mut rng = rand::thread_rng();
        WorkRolls::roll(&mut rng, &settings)
    };
    let outcome = activities::work(&data.ledger, guild_id, user_id, &username, rolls).await;

    if let Some(multiplier) = outcome.critical {
        let message = data
            .responses
            .render(
                "work_rare_success",
                &[
                    ("amount", outcome.amount.to_string()),
                    ("original", outcome.original.to_string()),
                    ("multiplier", multiplier.to_string()),
                ],
            )
            .await;
        send_embed(
            ctx,
            &format!("Work - **{multiplier}x** CRITICAL SUCCESS!"),
            &message,
            GOLD,
            false,
        )
        .await?;
    } else {
        let message = data
            .responses
            .render("work", &[("amount", outcome.amount.to_string())])
            .await;
        send_embed(ctx, "Work", &message, GREEN, false).await?;
    }

    commands::games::maybe_trigger_challenge(&ctx, ctx.author()).await
}

/// Commit a crime for Medals (risk involved).
#[poise::command(slash_command, guild_only)]
#[instrument(skip(ctx))]
pub async fn crime(ctx: Context<'_>) -> Result<(), Error> {
    if !economy_precheck(&ctx).await? {
        return Ok(());
    }
    let data = ctx.data();
    let guild_id = guild_of(&ctx);
    let user_id = ctx.author().id.get();
    let username = author_name(&ctx);

    let injuries = data.ledger.account(guild_id, user_id, &username).await.injuries;
    let window = status::modified_cooldown(activities::CRIME_COOLDOWN, injuries);
    if !handle_cooldown(&ctx, Activity::Crime, window, "commit a crime").await? {
        return Ok(());
    }

    let settings = data.settings.get().await;
    let rolls = {
        let mut rng = rand::thread_rng();
        CrimeRolls::roll(&mut rng, &settings)
    };
    let outcome = activities::crime(&data.ledger, guild_id, user_id, &username, rolls).await;
    render_crime_outcome(&ctx, &outcome).await?;

    commands::games::maybe_trigger_challenge(&ctx, ctx.author()).await
}

async fn render_crime_outcome(ctx: &Context<'_>, outcome: &CrimeOutcome) -> Result<(), Error> {
    let responses = &ctx.data().responses;
    match outcome {
        CrimeOutcome::Success {
            amount,
            original,
            critical: Some(multiplier),
        } => {
            let message = responses
                .render(
                    "crime_rare_success",
                    &[
                        ("amount", amount.to_string()),
                        ("original", original.to_string()),
                        ("multiplier", multiplier.to_string()),
                    ],
                )
                .await;
            send_embed(
                *ctx,
                &format!("Crime - **{multiplier}x** CRITICAL SUCCESS!"),
                &message,
                GOLD,
                false,
            )
            .await
        }
        CrimeOutcome::Success { amount, .. } => {
            let message = responses
                .render("crime_success", &[("amount", amount.to_string())])
                .await;
            send_embed(*ctx, "Crime Success", &message, GREEN, false).await
        }
        CrimeOutcome::Death {
            pockets_lost,
            savings_penalty,
        } => {
            let message = responses
                .render("death", &[("amount", pockets_lost.to_string())])
                .await;
            send_embed(
                *ctx,
                "Crime Failed - Death!",
                &format!(
                    "{message}\n\n**{savings_penalty} Medals (10% of your savings) have been taken to pay the reaper's tax**"
                ),
                DARK_RED,
                false,
            )
            .await
        }
        CrimeOutcome::ReaperImprisoned { .. } => {
            let message = responses.render("prison", &[]).await;
            send_embed(
                *ctx,
                "Crime Failed - Reaper's Tax Imprisonment!",
                &format!(
                    "**You had no money to pay the reaper's tax, so you were sent to prison instead.**\n\n{message}"
                ),
                DARK_ORANGE,
                false,
            )
            .await
        }
        CrimeOutcome::Injured { fine, tier_name } => {
            let message = responses
                .render("injury", &[("amount", fine.to_string())])
                .await;
            send_embed(
                *ctx,
                &format!("Crime Failed - {tier_name}!"),
                &format!("{message}\n\nYour condition: **{tier_name}**\n*You can walk it off :3*"),
                RED,
                false,
            )
            .await
        }
        CrimeOutcome::Imprisoned { .. } => {
            let message = responses.render("prison", &[]).await;
            send_embed(*ctx, "Crime Failed - Prison!", &message, DARK_ORANGE, false).await
        }
    }
}

/// Attempt to rob another member.
#[poise::command(slash_command, guild_only)]
#[instrument(skip(ctx))]
pub async fn rob(
    ctx: Context<'_>,
    #[description = "The player you want to rob"] target: serenity::User,
) -> Result<(), Error> {
    if target.id == ctx.author().id {
        return send_embed(
            ctx,
            "Error",
            "Why are you trying to rob yourself???",
            RED,
            true,
        )
        .await;
    }
    if target.bot {
        return send_embed(ctx, "Error", "Bots keep their Medals in cold storage.", RED, true).await;
    }
    if !economy_precheck(&ctx).await? {
        return Ok(());
    }

    let data = ctx.data();
    let guild_id = guild_of(&ctx);
    let user_id = ctx.author().id.get();
    let username = author_name(&ctx);
    let target_id = target.id.get();
    let target_name = target.display_name().to_string();

    // Victims get a protection window after every successful robbery.
    let (robbable, remaining) = data
        .ledger
        .check_last_robbed(guild_id, target_id, &target_name, ROB_VICTIM_COOLDOWN)
        .await;
    if !robbable {
        return send_embed(
            ctx,
            "Leave Them Alone",
            &format!(
                "**{} was already robbed recently.**\n\n*Cannot be robbed again for another:* ***{}***.",
                target.mention(),
                format_duration(remaining)
            ),
            ORANGE,
            true,
        )
        .await;
    }

    let injuries = data.ledger.account(guild_id, user_id, &username).await.injuries;
    let window = status::modified_cooldown(activities::ROB_COOLDOWN, injuries);
    if !handle_cooldown(&ctx, Activity::Rob, window, "attempt a robbery").await? {
        return Ok(());
    }

    let rolls = {
        let mut rng = rand::thread_rng();
        RobRolls::roll(&mut rng)
    };
    let outcome = activities::rob(
        &data.ledger,
        guild_id,
        user_id,
        &username,
        target_id,
        &target_name,
        rolls,
    )
    .await;
    render_rob_outcome(&ctx, &target, &outcome).await?;

    commands::games::maybe_trigger_challenge(&ctx, ctx.author()).await
}

async fn render_rob_outcome(
    ctx: &Context<'_>,
    target: &serenity::User,
    outcome: &RobOutcome,
) -> Result<(), Error> {
    let responses = &ctx.data().responses;
    let mention = target.mention().to_string();
    match outcome {
        RobOutcome::NotWorthRobbing => {
            send_embed(
                *ctx,
                "Robbery Attempt",
                &format!("{mention} barely had anything to steal!"),
                ORANGE,
                false,
            )
            .await
        }
        RobOutcome::Success { stolen } => {
            let message = responses
                .render(
                    "rob_success",
                    &[("target", mention), ("amount", stolen.to_string())],
                )
                .await;
            send_embed(*ctx, "Robbery Success", &message, GREEN, false).await
        }
        RobOutcome::Death {
            pockets_lost,
            savings_penalty,
        } => {
            let message = responses
                .render(
                    "rob_death",
                    &[("target", mention), ("amount", pockets_lost.to_string())],
                )
                .await;
            send_embed(
                *ctx,
                "Robbery Failed - Death!",
                &format!(
                    "{message}\n\n**{savings_penalty} Medals (10% of your savings) have been taken to pay the reaper's tax**"
                ),
                DARK_RED,
                false,
            )
            .await
        }
        RobOutcome::ReaperImprisoned { .. } => {
            let message = responses.render("prison", &[]).await;
            send_embed(
                *ctx,
                "Robbery Failed - Reaper's Tax Imprisonment!",
                &format!(
                    "**You had no money to pay the reaper's tax, so you were sent to prison instead.**\n\n{message}"
                ),
                DARK_ORANGE,
                false,
            )
            .await
        }
        RobOutcome::Injured { fine, tier_name } => {
            let message = responses
                .render(
                    "rob_injury",
                    &[("target", mention), ("amount", fine.to_string())],
                )
                .await;
            send_embed(
                *ctx,
                &format!("Robbery Failed - {tier_name}!"),
                &format!("{message}\n\nYour condition: **{tier_name}**\n*You can walk it off :3*"),
                RED,
                false,
            )
            .await
        }
        RobOutcome::Imprisoned { .. } => {
            let message = responses.render("prison", &[]).await;
            send_embed(*ctx, "Robbery Failed - Prison!", &message, DARK_ORANGE, false).await
        }
    }
}
