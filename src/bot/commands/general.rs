//! General-category commands.

use crate::bot::commands::{GREEN, RED, guild_of, send_embed};
use crate::bot::{Context, Error};
use crate::permissions::Category;
use tracing::instrument;

/// Turn headpats on or off in this server.
#[poise::command(slash_command, guild_only)]
#[instrument(skip(ctx))]
pub async fn toggleheadpats(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    let guild_id = guild_of(&ctx);
    if !data.permissions.is_enabled(guild_id, Category::General).await {
        return send_embed(
            ctx,
            "Not Whitelisted",
            "This server is not whitelisted for general commands.",
            RED,
            true,
        )
        .await;
    }

    let enabled = data.ledger.toggle_headpats(guild_id).await;
    let (text, color) = if enabled {
        ("Headpats are now **enabled** in this server.", GREEN)
    } else {
        ("Headpats are now **disabled** in this server.", RED)
    };
    send_embed(ctx, "Headpats", text, color, false).await
}
