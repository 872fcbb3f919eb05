//! Admin-gated management commands: balance adjustment, settings, guild
//! permissions, prison management, cache control.

use crate::bot::commands::{BLUE, GREEN, RED, ensure_admin, guild_of, send_embed};
use crate::bot::{Context, Error};
use crate::models::{DEFAULT_SENTENCE_SECS, PrisonTier};
use crate::permissions::Category;
use poise::ChoiceParameter;
use poise::serenity_prelude::{self as serenity, Mentionable};
use tracing::{info, instrument};

#[derive(poise::ChoiceParameter, Clone, Copy, Debug)]
pub enum AccountKind {
    #[name = "Pockets"]
    Pockets,
    #[name = "Savings"]
    Savings,
}

#[derive(poise::ChoiceParameter, Clone, Copy, Debug)]
pub enum SettingKind {
    #[name = "Starting balance"]
    StartingBalance,
    #[name = "Critical success chance (%)"]
    CriticalChance,
    #[name = "Critical multiplier minimum"]
    CriticalMin,
    #[name = "Critical multiplier maximum"]
    CriticalMax,
}

#[derive(poise::ChoiceParameter, Clone, Copy, Debug)]
pub enum CategoryChoice {
    #[name = "General"]
    General,
    #[name = "Economy"]
    Economy,
    #[name = "Admin"]
    Admin,
}

impl From<CategoryChoice> for Category {
    fn from(choice: CategoryChoice) -> Self {
        match choice {
            CategoryChoice::General => Category::General,
            CategoryChoice::Economy => Category::Economy,
            CategoryChoice::Admin => Category::Admin,
        }
    }
}

/// Add Medals to a user's balance.
#[poise::command(slash_command, guild_only)]
#[instrument(skip(ctx))]
pub async fn add_medals(
    ctx: Context<'_>,
    #[description = "Who receives the Medals"] target: serenity::User,
    #[description = "How many Medals to add"] amount: i64,
    #[description = "Which balance to credit"] account: AccountKind,
) -> Result<(), Error> {
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }
    if amount <= 0 {
        return send_embed(ctx, "Error", "The amount must be greater than zero.", RED, true).await;
    }
    let data = ctx.data();
    let guild_id = guild_of(&ctx);
    let name = target.display_name().to_string();

    let new_balance = match account {
        AccountKind::Pockets => {
            data.ledger
                .update_pockets(guild_id, target.id.get(), &name, amount)
                .await
        }
        AccountKind::Savings => {
            data.ledger
                .update_savings(guild_id, target.id.get(), &name, amount)
                .await
        }
    };
    info!("Admin credited {amount} Medals to {} in guild {guild_id}", target.id);
    send_embed(
        ctx,
        "Medals Added",
        &format!(
            "Added **{amount}** Medals to {}. New balance: **{new_balance}**.",
            target.mention()
        ),
        GREEN,
        false,
    )
    .await
}

/// Remove Medals from a user's balance.
#[poise::command(slash_command, guild_only)]
#[instrument(skip(ctx))]
pub async fn remove_medals(
    ctx: Context<'_>,
    #[description = "Who loses the Medals"] target: serenity::User,
    #[description = "How many Medals to remove"] amount: i64,
    #[description = "Which balance to debit"] account: AccountKind,
) -> Result<(), Error> {
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }
    if amount <= 0 {
        return send_embed(ctx, "Error", "The amount must be greater than zero.", RED, true).await;
    }
    let data = ctx.data();
    let guild_id = guild_of(&ctx);
    let name = target.display_name().to_string();

    let new_balance = match account {
        AccountKind::Pockets => {
            data.ledger
                .update_pockets(guild_id, target.id.get(), &name, -amount)
                .await
        }
        AccountKind::Savings => {
            data.ledger
                .update_savings(guild_id, target.id.get(), &name, -amount)
                .await
        }
    };
    info!("Admin debited {amount} Medals from {} in guild {guild_id}", target.id);
    send_embed(
        ctx,
        "Medals Removed",
        &format!(
            "Removed **{amount}** Medals from {}. New balance: **{new_balance}**.",
            target.mention()
        ),
        GREEN,
        false,
    )
    .await
}

/// Change an economy tuning setting.
#[poise::command(slash_command, guild_only)]
#[instrument(skip(ctx))]
pub async fn eco_set(
    ctx: Context<'_>,
    #[description = "Which setting to change"] setting: SettingKind,
    #[description = "The new value"] value: i64,
) -> Result<(), Error> {
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }
    if value < 0 {
        return send_embed(ctx, "Error", "Settings cannot be negative.", RED, true).await;
    }
    let data = ctx.data();
    let persisted = data
        .settings
        .update(|settings| match setting {
            SettingKind::StartingBalance => settings.starting_balance = value,
            SettingKind::CriticalChance => settings.critical_success_chance = value as u32,
            SettingKind::CriticalMin => settings.critical_multiplier_min = value as u32,
            SettingKind::CriticalMax => settings.critical_multiplier_max = value as u32,
        })
        .await;

    let note = if persisted {
        ""
    } else {
        "\n\n*Warning: the settings file could not be written; this change lasts until restart.*"
    };
    send_embed(
        ctx,
        "Settings Updated",
        &format!("Set **{}** to **{value}**.{note}", setting.name()),
        GREEN,
        false,
    )
    .await
}

/// Grant or revoke a command category for this server.
#[poise::command(slash_command, guild_only)]
#[instrument(skip(ctx))]
pub async fn permit(
    ctx: Context<'_>,
    #[description = "Which category"] category: CategoryChoice,
    #[description = "Enable or disable"] enabled: bool,
) -> Result<(), Error> {
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }
    let data = ctx.data();
    let guild_id = guild_of(&ctx);
    let guild_name = ctx
        .guild()
        .map(|guild| guild.name.to_string());
    let category: Category = category.into();

    let persisted = data
        .permissions
        .set(guild_id, category, enabled, guild_name.as_deref())
        .await;
    if !persisted {
        return send_embed(
            ctx,
            "Error",
            "The permission change could not be saved.",
            RED,
            true,
        )
        .await;
    }
    send_embed(
        ctx,
        "Permissions Updated",
        &format!(
            "Category **{}** is now **{}** for this server.",
            category.as_str(),
            if enabled { "enabled" } else { "disabled" }
        ),
        GREEN,
        false,
    )
    .await
}

#[derive(poise::ChoiceParameter, Clone, Copy, Debug)]
pub enum TierChoice {
    #[name = "Officer Group"]
    OfficerGroup,
    #[name = "Old Guards"]
    OldGuards,
    #[name = "Soldat Brigade"]
    SoldatBrigade,
    #[name = "Lancer Legion"]
    LancerLegion,
    #[name = "Rook Division"]
    RookDivision,
    #[name = "Mortician Wing"]
    MorticianWing,
    #[name = "Jaeger Camp"]
    JaegerCamp,
}

impl From<TierChoice> for PrisonTier {
    fn from(choice: TierChoice) -> Self {
        match choice {
            TierChoice::OfficerGroup => PrisonTier::OfficerGroup,
            TierChoice::OldGuards => PrisonTier::OldGuards,
            TierChoice::SoldatBrigade => PrisonTier::SoldatBrigade,
            TierChoice::LancerLegion => PrisonTier::LancerLegion,
            TierChoice::RookDivision => PrisonTier::RookDivision,
            TierChoice::MorticianWing => PrisonTier::MorticianWing,
            TierChoice::JaegerCamp => PrisonTier::JaegerCamp,
        }
    }
}

/// Send a user to prison, rolling a weighted random tier when none is given.
#[poise::command(slash_command, guild_only)]
#[instrument(skip(ctx))]
pub async fn incarcerate(
    ctx: Context<'_>,
    #[description = "Who to lock up"] target: serenity::User,
    #[description = "Prison tier (random if omitted)"] tier: Option<TierChoice>,
) -> Result<(), Error> {
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }
    let data = ctx.data();
    let name = target.display_name().to_string();
    let tier: PrisonTier = match tier {
        Some(choice) => choice.into(),
        None => {
            let mut rng = rand::thread_rng();
            PrisonTier::random(&mut rng)
        }
    };
    data.ledger
        .send_to_prison(
            guild_of(&ctx),
            target.id.get(),
            &name,
            tier,
            DEFAULT_SENTENCE_SECS,
        )
        .await;
    send_embed(
        ctx,
        "Incarcerated",
        &format!(
            "{} has been sent to the **{}** for 1 hour.",
            target.mention(),
            tier.name()
        ),
        GREEN,
        false,
    )
    .await
}

/// Release a user from prison.
#[poise::command(slash_command, guild_only)]
#[instrument(skip(ctx))]
pub async fn release_prisoner(
    ctx: Context<'_>,
    #[description = "Who to release"] target: serenity::User,
) -> Result<(), Error> {
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }
    let data = ctx.data();
    let name = target.display_name().to_string();
    let released = data
        .ledger
        .release_from_prison(guild_of(&ctx), target.id.get(), &name)
        .await;
    if released {
        send_embed(
            ctx,
            "Released",
            &format!("{} has been released from prison.", target.mention()),
            GREEN,
            false,
        )
        .await
    } else {
        send_embed(
            ctx,
            "Error",
            &format!("{} is not in prison.", target.mention()),
            RED,
            true,
        )
        .await
    }
}

/// Drop every cached guild document, forcing fresh reads from disk.
#[poise::command(slash_command, guild_only)]
#[instrument(skip(ctx))]
pub async fn flush_cache(ctx: Context<'_>) -> Result<(), Error> {
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }
    ctx.data().ledger.store().flush_cache().await;
    send_embed(ctx, "Cache Flushed", "All cached guild data was dropped.", BLUE, true).await
}
