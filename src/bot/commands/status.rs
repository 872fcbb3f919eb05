//! Status and healing commands.

use crate::bot::commands::{
    BLUE, GREEN, ORANGE, RED, author_name, ensure_economy, guild_of, send_embed,
};
use crate::bot::{Context, Error, format_timestamp};
use crate::status::{self, HealOutcome};
use poise::serenity_prelude::{self as serenity, Mentionable};
use tracing::instrument;

/// Check your injury status and other conditions.
#[poise::command(slash_command, guild_only)]
#[instrument(skip(ctx))]
pub async fn status(
    ctx: Context<'_>,
    #[description = "The member whose status to check"] member: Option<serenity::User>,
) -> Result<(), Error> {
    if !ensure_economy(&ctx).await? {
        return Ok(());
    }
    let data = ctx.data();
    let guild_id = guild_of(&ctx);
    let member = member.as_ref().unwrap_or_else(|| ctx.author());
    let name = member.display_name().to_string();

    // Reading the status is what performs the lazy auto-release.
    let was_imprisoned = data
        .ledger
        .account(guild_id, member.id.get(), &name)
        .await
        .prison
        .is_some();
    let prison = data
        .ledger
        .prison_status(guild_id, member.id.get(), &name)
        .await;
    if was_imprisoned && prison.is_none() && member.id == ctx.author().id {
        return send_embed(
            ctx,
            "Prison Release",
            &format!(
                "{}, you have served your time and have been released...",
                member.mention()
            ),
            GREEN,
            false,
        )
        .await;
    }

    let account = data.ledger.account(guild_id, member.id.get(), &name).await;
    let tier = status::tier_for(account.injuries);

    let mut effects = Vec::new();
    if tier.effects.cooldown_multiplier > 1.0 {
        effects.push(format!(
            "Cooldowns +{}%",
            ((tier.effects.cooldown_multiplier - 1.0) * 100.0) as i64
        ));
    }
    if tier.effects.fail_rate_mod > 0 {
        effects.push(format!("Fail rate +{}%", tier.effects.fail_rate_mod));
    }
    if tier.effects.earning_penalty > 0.0 {
        effects.push(format!(
            "Earnings -{}%",
            (tier.effects.earning_penalty * 100.0) as i64
        ));
    }
    if tier.effects.death_chance_mod > 0 {
        effects.push(format!("Death chance +{}%", tier.effects.death_chance_mod));
    }
    if tier.effects.prison_chance_mod > 0 {
        effects.push(format!("Prison chance +{}%", tier.effects.prison_chance_mod));
    }
    let effects_text = if account.injuries == 0 {
        "None".to_string()
    } else if tier.name == "Critical Condition" {
        "you should be dead...".to_string()
    } else {
        effects.join(", ")
    };

    let prison_text = prison
        .map(|status| {
            format!(
                "\nImprisoned with the ***{}*** until: **{}**",
                status.tier.name(),
                format_timestamp(status.release_time)
            )
        })
        .unwrap_or_default();

    let description = format!(
        "**Status for {}**\nCondition: **{}**\nHealing Cost: {} Medals\nEffects: {}{}",
        member.mention(),
        tier.name,
        tier.heal_cost,
        effects_text,
        prison_text
    );
    send_embed(ctx, "User Status", &description, BLUE, false).await
}

/// Visit the Mortician's Wing to heal your injuries.
#[poise::command(slash_command, guild_only)]
#[instrument(skip(ctx))]
pub async fn see_mortician(ctx: Context<'_>) -> Result<(), Error> {
    if !ensure_economy(&ctx).await? {
        return Ok(());
    }
    let data = ctx.data();
    let guild_id = guild_of(&ctx);
    let user_id = ctx.author().id.get();
    let username = author_name(&ctx);

    match status::visit_mortician(&data.ledger, guild_id, user_id, &username).await {
        HealOutcome::RefusedMorticianWing => {
            send_embed(
                ctx,
                "Mortician's Hell",
                "No matter how much you beg... the Morts would rather see you in pain...",
                RED,
                false,
            )
            .await
        }
        HealOutcome::RefusedJaegerCamp => {
            send_embed(
                ctx,
                "Jaeger's Resolve",
                "Jaegers don't need Morts. So neither do you. Suffer in silence...",
                RED,
                false,
            )
            .await
        }
        HealOutcome::NotInjured => {
            send_embed(
                ctx,
                "Mortician's Wing",
                "You are not injured. Did you just come here to steal my stims???",
                ORANGE,
                true,
            )
            .await
        }
        HealOutcome::InsufficientFunds { cost, total } => {
            send_embed(
                ctx,
                "Mortician's Wing",
                &format!(
                    "You need **{cost}** Medals to heal. You only have **{total}** Medals total."
                ),
                RED,
                true,
            )
            .await
        }
        HealOutcome::NegativePockets => {
            send_embed(
                ctx,
                "Error",
                "You have a negative pocket balance. Resolve your debt before healing.",
                RED,
                true,
            )
            .await
        }
        HealOutcome::Healed { cost, tier_name } => {
            send_embed(
                ctx,
                "Mortician's Wing",
                &format!("The Mortician tended to your {tier_name} for **{cost}** Medals <3"),
                GREEN,
                false,
            )
            .await
        }
    }
}
