//! Shared helpers for the command surface: embed rendering, eligibility
//! prechecks, and the color palette.

pub mod activities;
pub mod admin;
pub mod bank;
pub mod games;
pub mod general;
pub mod prison;
pub mod status;

use crate::bot::{Context, Error};
use crate::permissions::Category;
use poise::serenity_prelude as serenity;

// Embed colors
pub(crate) const GREEN: u32 = 0x57F287;
pub(crate) const RED: u32 = 0xED4245;
pub(crate) const ORANGE: u32 = 0xE67E22;
pub(crate) const GOLD: u32 = 0xF1C40F;
pub(crate) const BLUE: u32 = 0x3498DB;
pub(crate) const BLURPLE: u32 = 0x5865F2;
pub(crate) const DARK_RED: u32 = 0x992D22;
pub(crate) const DARK_ORANGE: u32 = 0xA84300;

/// Send a single-embed reply, the uniform shape of almost every response.
pub(crate) async fn send_embed(
    ctx: Context<'_>,
    title: &str,
    description: &str,
    color: u32,
    ephemeral: bool,
) -> Result<(), Error> {
    let embed = serenity::CreateEmbed::default()
        .title(title)
        .description(description)
        .color(color);
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(ephemeral))
        .await?;
    Ok(())
}

pub(crate) fn basic_embed(title: &str, description: &str, color: u32) -> serenity::CreateEmbed {
    serenity::CreateEmbed::default()
        .title(title)
        .description(description)
        .color(color)
}

/// `3m 20s` style cooldown formatting.
pub(crate) fn format_duration(total_secs: i64) -> String {
    let total_secs = total_secs.max(0);
    let (hours, rest) = (total_secs / 3600, total_secs % 3600);
    let (minutes, seconds) = (rest / 60, rest % 60);
    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Guild id for a guild-only command.
pub(crate) fn guild_of(ctx: &Context<'_>) -> u64 {
    ctx.guild_id().map_or(0, |id| id.get())
}

/// The invoking user's display name, used as the account username hint.
pub(crate) fn author_name(ctx: &Context<'_>) -> String {
    ctx.author().display_name().to_string()
}

/// Economy commands require the guild to be on the allow-list.
pub(crate) async fn ensure_economy(ctx: &Context<'_>) -> Result<bool, Error> {
    let enabled = ctx
        .data()
        .permissions
        .is_enabled(guild_of(ctx), Category::Economy)
        .await;
    if !enabled {
        send_embed(
            *ctx,
            "Not Whitelisted",
            "This server is not whitelisted for economy commands.",
            RED,
            true,
        )
        .await?;
    }
    Ok(enabled)
}

/// Admin commands are gated the same way, on their own category.
pub(crate) async fn ensure_admin(ctx: &Context<'_>) -> Result<bool, Error> {
    let enabled = ctx
        .data()
        .permissions
        .is_enabled(guild_of(ctx), Category::Admin)
        .await;
    if !enabled {
        send_embed(
            *ctx,
            "Not Whitelisted",
            "This server is not whitelisted for admin commands.",
            RED,
            true,
        )
        .await?;
    }
    Ok(enabled)
}

/// Prisoners cannot use most economy commands.
pub(crate) async fn ensure_free(ctx: &Context<'_>) -> Result<bool, Error> {
    let data = ctx.data();
    let imprisoned = data
        .ledger
        .is_in_prison(guild_of(ctx), ctx.author().id.get(), &author_name(ctx))
        .await;
    if imprisoned {
        send_embed(
            *ctx,
            "Prison",
            "You are in prison and cannot use this command.",
            RED,
            true,
        )
        .await?;
    }
    Ok(!imprisoned)
}

/// Players mid-way through the balance challenge are locked out of everything
/// else.
pub(crate) async fn ensure_not_in_challenge(ctx: &Context<'_>) -> Result<bool, Error> {
    let in_challenge = ctx
        .data()
        .sessions
        .in_challenge(guild_of(ctx), ctx.author().id.get())
        .await;
    if in_challenge {
        send_embed(
            *ctx,
            "Balance Challenge",
            "You are currently in a balance challenge and cannot use this command.",
            RED,
            true,
        )
        .await?;
    }
    Ok(!in_challenge)
}

/// Standard economy precheck: whitelisted, free, and not mid-challenge.
pub(crate) async fn economy_precheck(ctx: &Context<'_>) -> Result<bool, Error> {
    Ok(ensure_economy(ctx).await?
        && ensure_free(ctx).await?
        && ensure_not_in_challenge(ctx).await?)
}

/// Check-and-report a cooldown. Sends the refusal embed when still cooling
/// down and returns `false`.
pub(crate) async fn handle_cooldown(
    ctx: &Context<'_>,
    activity: crate::models::Activity,
    window: i64,
    verb: &str,
) -> Result<bool, Error> {
    let data = ctx.data();
    let (ready, remaining) = data
        .ledger
        .check_cooldown(
            guild_of(ctx),
            ctx.author().id.get(),
            &author_name(ctx),
            activity,
            window,
        )
        .await;
    if !ready {
        send_embed(
            *ctx,
            "Cooldown",
            &format!(
                "You cannot {verb} for another **{}**.",
                format_duration(remaining)
            ),
            ORANGE,
            true,
        )
        .await?;
    }
    Ok(ready)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_format_like_the_embeds_expect() {
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(200), "3m 20s");
        assert_eq!(format_duration(3725), "1h 2m 5s");
        assert_eq!(format_duration(-5), "0s");
    }
}
