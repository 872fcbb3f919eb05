//! Banking commands: balance, deposit, withdraw, donate, leaderboard.

use crate::bot::commands::{
    self, BLUE, GREEN, RED, author_name, economy_precheck, ensure_economy, guild_of, send_embed,
};
use crate::bot::{Context, Error};
use poise::serenity_prelude::{self as serenity, Mentionable};
use tracing::instrument;

/// Either an exact amount or `all`.
fn parse_amount(input: &str, available: i64) -> Result<i64, &'static str> {
    if input.eq_ignore_ascii_case("all") {
        if available <= 0 {
            return Err("You have nothing to move.");
        }
        return Ok(available);
    }
    let amount: i64 = input
        .parse()
        .map_err(|_| "Please provide a valid number or 'all'.")?;
    if amount <= 0 {
        return Err("The amount must be greater than zero.");
    }
    if amount > available {
        return Err("You don't have that many Medals.");
    }
    Ok(amount)
}

/// Check your or another member's balance.
#[poise::command(slash_command, guild_only)]
#[instrument(skip(ctx))]
pub async fn balance(
    ctx: Context<'_>,
    #[description = "The member whose balance to check"] member: Option<serenity::User>,
) -> Result<(), Error> {
    if !ensure_economy(&ctx).await? {
        return Ok(());
    }
    let data = ctx.data();
    let member = member.as_ref().unwrap_or_else(|| ctx.author());
    let account = data
        .ledger
        .account(
            guild_of(&ctx),
            member.id.get(),
            member.display_name(),
        )
        .await;

    let description = format!(
        "{}\n\n**{}** Medals in pockets\n**{}** Medals in savings",
        member.mention(),
        account.pockets,
        account.savings
    );
    send_embed(ctx, "Balance", &description, GREEN, false).await?;

    commands::games::maybe_trigger_challenge(&ctx, ctx.author()).await
}

/// Deposit Medals into your savings.
#[poise::command(slash_command, guild_only)]
#[instrument(skip(ctx))]
pub async fn deposit(
    ctx: Context<'_>,
    #[description = "Amount to deposit or 'all'"] amount: String,
) -> Result<(), Error> {
    if !economy_precheck(&ctx).await? {
        return Ok(());
    }
    let data = ctx.data();
    let guild_id = guild_of(&ctx);
    let user_id = ctx.author().id.get();
    let username = author_name(&ctx);

    let pockets = data.ledger.pockets(guild_id, user_id, &username).await;
    if pockets < 0 {
        return send_embed(
            ctx,
            "Error",
            "You have a negative pocket balance. You cannot deposit until you resolve your debt.",
            RED,
            true,
        )
        .await;
    }
    let amount = match parse_amount(&amount, pockets) {
        Ok(amount) => amount,
        Err(reason) => return send_embed(ctx, "Error", reason, RED, true).await,
    };

    data.ledger
        .update_pockets(guild_id, user_id, &username, -amount)
        .await;
    data.ledger
        .update_savings(guild_id, user_id, &username, amount)
        .await;
    send_embed(
        ctx,
        "Deposit Successful",
        &format!("Deposited **{amount}** Medals from pockets to savings."),
        GREEN,
        false,
    )
    .await?;

    commands::games::maybe_trigger_challenge(&ctx, ctx.author()).await
}

/// Withdraw Medals from your savings.
#[poise::command(slash_command, guild_only)]
#[instrument(skip(ctx))]
pub async fn withdraw(
    ctx: Context<'_>,
    #[description = "Amount to withdraw or 'all'"] amount: String,
) -> Result<(), Error> {
    if !economy_precheck(&ctx).await? {
        return Ok(());
    }
    let data = ctx.data();
    let guild_id = guild_of(&ctx);
    let user_id = ctx.author().id.get();
    let username = author_name(&ctx);

    let savings = data.ledger.savings(guild_id, user_id, &username).await;
    if savings < 0 {
        return send_embed(
            ctx,
            "Error",
            "You have a negative savings balance. You cannot withdraw until you resolve your debt.",
            RED,
            true,
        )
        .await;
    }
    let amount = match parse_amount(&amount, savings) {
        Ok(amount) => amount,
        Err(reason) => return send_embed(ctx, "Error", reason, RED, true).await,
    };

    data.ledger
        .update_savings(guild_id, user_id, &username, -amount)
        .await;
    data.ledger
        .update_pockets(guild_id, user_id, &username, amount)
        .await;
    send_embed(
        ctx,
        "Withdrawal Successful",
        &format!("Withdrew **{amount}** Medals from savings to pockets."),
        GREEN,
        false,
    )
    .await?;

    commands::games::maybe_trigger_challenge(&ctx, ctx.author()).await
}

/// Donate pocket Medals to another member.
#[poise::command(slash_command, guild_only)]
#[instrument(skip(ctx))]
pub async fn donate(
    ctx: Context<'_>,
    #[description = "Who receives the Medals"] target: serenity::User,
    #[description = "How many Medals to donate"] amount: i64,
) -> Result<(), Error> {
    if target.id == ctx.author().id {
        return send_embed(ctx, "Error", "Donating to yourself moves nothing.", RED, true).await;
    }
    if target.bot {
        return send_embed(ctx, "Error", "Bots have no use for Medals.", RED, true).await;
    }
    if !economy_precheck(&ctx).await? {
        return Ok(());
    }
    let data = ctx.data();
    let guild_id = guild_of(&ctx);
    let user_id = ctx.author().id.get();
    let username = author_name(&ctx);

    if amount <= 0 {
        return send_embed(ctx, "Error", "The amount must be greater than zero.", RED, true).await;
    }
    let pockets = data.ledger.pockets(guild_id, user_id, &username).await;
    if pockets < amount {
        return send_embed(
            ctx,
            "Error",
            &format!("You need {amount} Medals in your pockets but only have {pockets}."),
            RED,
            true,
        )
        .await;
    }

    let target_name = target.display_name().to_string();
    data.ledger
        .update_pockets(guild_id, user_id, &username, -amount)
        .await;
    data.ledger
        .update_pockets(guild_id, target.id.get(), &target_name, amount)
        .await;
    send_embed(
        ctx,
        "Donation",
        &format!(
            "{} donated **{amount}** Medals to {}.",
            ctx.author().mention(),
            target.mention()
        ),
        GREEN,
        false,
    )
    .await?;

    // A donation can push either side over the challenge threshold.
    commands::games::maybe_trigger_challenge(&ctx, &target).await?;
    commands::games::maybe_trigger_challenge(&ctx, ctx.author()).await
}

/// Show the richest members of this server.
#[poise::command(slash_command, guild_only)]
#[instrument(skip(ctx))]
pub async fn leaderboard(ctx: Context<'_>) -> Result<(), Error> {
    if !ensure_economy(&ctx).await? {
        return Ok(());
    }
    let data = ctx.data();
    let top = data.ledger.richest(guild_of(&ctx), 10).await;
    if top.is_empty() {
        return send_embed(ctx, "Leaderboard", "Nobody has any Medals yet.", BLUE, false).await;
    }

    let lines: Vec<String> = top
        .iter()
        .enumerate()
        .map(|(rank, account)| {
            format!(
                "**{}.** {} — **{}** Medals ({} pockets / {} savings)",
                rank + 1,
                account.username,
                account.total_balance(),
                account.pockets,
                account.savings
            )
        })
        .collect();
    send_embed(ctx, "Richest in the Caves", &lines.join("\n"), BLUE, false).await
}
