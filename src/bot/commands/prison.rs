//! Escape and breakout commands: the interactive drivers for the per-tier
//! prison mini-games.
//!
//! The mini-game rules live in `games::breakout`; this file renders them as
//! button views. Every view carries a hard timeout; an abandoned attempt is
//! forcibly resolved as a loss with the harsher execution penalty applied to
//! whoever initiated it.

use crate::bot::commands::{
    BLUE, DARK_RED, GREEN, ORANGE, RED, author_name, basic_embed, ensure_economy,
    ensure_not_in_challenge, ensure_free, format_duration, guild_of, handle_cooldown, send_embed,
};
use crate::bot::{Context, Error};
use crate::games::SessionKind;
use crate::games::breakout::{
    self, BoxColor, BoxPrize, DoorGuess, JaegerEscapeDraw, KnifeResolution, LancerDoors,
    LancerStep, LockPick, LockPickStep, PathRun, PathStep, VialColor, VialPuzzle, VialStep,
};
use crate::models::{Activity, PrisonTier};
use crate::status;
use poise::serenity_prelude::{self as serenity, Mentionable};
use rand::Rng;
use std::time::Duration;
use tracing::instrument;

// View timeouts, per mini-game.
const SIMPLE_VIEW_TIMEOUT: u64 = 60;
const PUZZLE_VIEW_TIMEOUT: u64 = 120;
const PATH_VIEW_TIMEOUT: u64 = 300;
const JAEGER_ESCAPE_TIMEOUT: u64 = 1800;

/// Safe and dangerous path flavor for the Jaeger run.
const SAFE_PATHS: [&str; 5] = [
    "You find a safe passage through the darkness.",
    "You avoid a tripwire just in time.",
    "You sidestep what appears to be a bear trap.",
    "You narrowly make it out of a triggered gas bomb.",
    "You carefully navigate around the shotshell trap in the wall.",
];
const BAD_PATHS: [&str; 5] = [
    "You stumble into a trip wire, a tin bomb goes off and you're knocked back.",
    "You step on a trip wire, a shotshell trap goes off and hits your arm.",
    "You walk into a bear trap, your leg is broken.",
    "You walk face-first into a lamp trap, burning your face.",
    "You trigger a gas bomb that makes it hard to breathe.",
];

async fn next_press(
    ctx: &Context<'_>,
    author: serenity::UserId,
    prefix: &str,
    timeout_secs: u64,
) -> Option<serenity::ComponentInteraction> {
    serenity::ComponentInteractionCollector::new(ctx.serenity_context())
        .author_id(author)
        .channel_id(ctx.channel_id())
        .timeout(Duration::from_secs(timeout_secs))
        .filter({
            let prefix = prefix.to_string();
            move |mci| mci.data.custom_id.starts_with(&prefix)
        })
        .await
}

async fn update_view(
    ctx: &Context<'_>,
    mci: &serenity::ComponentInteraction,
    embed: serenity::CreateEmbed,
    components: Vec<serenity::CreateActionRow>,
) -> Result<(), Error> {
    mci.create_response(
        ctx.serenity_context(),
        serenity::CreateInteractionResponse::UpdateMessage(
            serenity::CreateInteractionResponseMessage::new()
                .embed(embed)
                .components(components),
        ),
    )
    .await?;
    Ok(())
}

fn numbered_buttons(prefix: &str, tag: &str, numbers: &[u8]) -> Vec<serenity::CreateActionRow> {
    vec![serenity::CreateActionRow::Buttons(
        numbers
            .iter()
            .map(|n| {
                serenity::CreateButton::new(format!("{prefix}{tag}_{n}"))
                    .label(n.to_string())
                    .style(serenity::ButtonStyle::Primary)
            })
            .collect(),
    )]
}

fn box_buttons(prefix: &str) -> Vec<serenity::CreateActionRow> {
    vec![serenity::CreateActionRow::Buttons(
        BoxColor::ALL
            .iter()
            .map(|color| {
                serenity::CreateButton::new(format!("{prefix}box_{}", color.name()))
                    .emoji(
                        color
                            .emoji()
                            .chars()
                            .next()
                            .unwrap_or('\u{1f7e2}'),
                    )
                    .style(serenity::ButtonStyle::Secondary)
            })
            .collect(),
    )]
}

fn vial_buttons(prefix: &str, remaining: &[VialColor]) -> Vec<serenity::CreateActionRow> {
    vec![serenity::CreateActionRow::Buttons(
        remaining
            .iter()
            .map(|color| {
                serenity::CreateButton::new(format!("{prefix}vial_{}", color.name()))
                    .emoji(color.emoji().chars().next().unwrap_or('\u{1f534}'))
                    .style(serenity::ButtonStyle::Secondary)
            })
            .collect(),
    )]
}

fn suffix_number(custom_id: &str) -> Option<u8> {
    custom_id.rsplit('_').next()?.parse().ok()
}

/// The timeout execution: wipe the initiator and report the penalty.
async fn forced_loss_view(
    ctx: &Context<'_>,
    reply: &poise::ReplyHandle<'_>,
    user_id: u64,
    username: &str,
) -> Result<(), Error> {
    let penalty =
        breakout::forced_loss(&ctx.data().ledger, guild_of(ctx), user_id, username).await;
    reply
        .edit(
            *ctx,
            poise::CreateReply::default()
                .embed(basic_embed(
                    "Impatient Wolves",
                    &format!(
                        "The Jaegers grew impatient of your silly games.\n\n**They have lobbed your head off.**\n\n\
                         Taking **all** Medals from your pockets and **{penalty}** Medals from savings..."
                    ),
                    DARK_RED,
                ))
                .components(vec![]),
        )
        .await?;
    Ok(())
}

/// Attempt to escape from prison.
#[poise::command(slash_command, guild_only)]
#[instrument(skip(ctx))]
pub async fn escape(ctx: Context<'_>) -> Result<(), Error> {
    if !ensure_economy(&ctx).await? || !ensure_not_in_challenge(&ctx).await? {
        return Ok(());
    }
    let data = ctx.data();
    let guild_id = guild_of(&ctx);
    let user_id = ctx.author().id.get();
    let username = author_name(&ctx);

    let (ready, remaining) = data
        .ledger
        .check_cooldown(guild_id, user_id, &username, Activity::Escape, breakout::ESCAPE_COOLDOWN)
        .await;
    if !ready {
        return send_embed(
            ctx,
            "Escape Cooldown",
            &format!(
                "You're too tired to try to escape. Rest for **{}**.",
                format_duration(remaining)
            ),
            ORANGE,
            true,
        )
        .await;
    }

    let Some(prison) = data.ledger.prison_status(guild_id, user_id, &username).await else {
        return send_embed(
            ctx,
            "Escape",
            "Escape? From WHAT??? You're not in prison!",
            ORANGE,
            true,
        )
        .await;
    };

    // Stamped up front so a failed attempt still costs the window.
    data.ledger
        .set_cooldown(guild_id, user_id, &username, Activity::Escape)
        .await;

    if prison.tier == PrisonTier::JaegerCamp {
        return jaeger_escape_view(&ctx, user_id, &username).await;
    }

    let injuries = data.ledger.account(guild_id, user_id, &username).await.injuries;
    let roll = {
        let mut rng = rand::thread_rng();
        rng.gen_range(1..=100)
    };
    if breakout::single_roll_succeeds(roll, prison.tier, injuries) {
        data.ledger.release_from_prison(guild_id, user_id, &username).await;
        let message = data.responses.render("escape_success", &[]).await;
        return send_embed(ctx, "Escape Successful!", &message, GREEN, false).await;
    }

    let failure =
        breakout::apply_escape_failure(&data.ledger, guild_id, user_id, &username, prison.tier)
            .await;
    let penalty_text = match failure {
        breakout::EscapeFailure::NoPenalty => String::new(),
        breakout::EscapeFailure::SavingsFine { amount } => {
            format!("\n\n**{amount} Medals** were deducted from your savings.")
        }
        breakout::EscapeFailure::FineAndInjury { amount, tier_name } => format!(
            "\n\n**{amount} Medals** were deducted from your savings and your condition is now **{tier_name}**."
        ),
        breakout::EscapeFailure::ExtendedAndInjured { extra_secs, tier_name } => format!(
            "\n\nYour sentence was extended by **{}** and your condition is now **{tier_name}**.",
            format_duration(extra_secs)
        ),
        breakout::EscapeFailure::Worsened { tier_name } => {
            format!("\n\nYour condition has worsened to **{tier_name}**.")
        }
        breakout::EscapeFailure::MortsTookSavings { amount } => format!(
            "\n\nThe Morts took all the willpower out of you and **{amount} Medals** from your savings instead."
        ),
    };
    let message = data.responses.render("escape_failure", &[]).await;
    send_embed(
        ctx,
        "Escape Failed!",
        &format!("{message}{penalty_text}"),
        RED,
        false,
    )
    .await
}

/// The Jaeger Camp escape: four boxes, one of them fatal.
async fn jaeger_escape_view(ctx: &Context<'_>, user_id: u64, username: &str) -> Result<(), Error> {
    let data = ctx.data();
    let guild_id = guild_of(ctx);
    let prefix = format!("jesc_{}_", ctx.id());

    let draw = {
        let mut rng = rand::thread_rng();
        JaegerEscapeDraw::new(&mut rng)
    };
    let reply = ctx
        .send(
            poise::CreateReply::default()
                .content(ctx.author().mention().to_string())
                .embed(basic_embed(
                    "The Four Boxes",
                    "The Jaegers have caught you trying to escape.\n\nThey drag you into a room with \
                     many more of them, malice in their eyes.\n\n**They present to you 4 different \
                     colored boxes:**\n\n1 box contains a **Playing Card**\n1 box contains a \
                     **Broken Watch**\n1 box contains stolen **Medical Supplies**\n1 box contains a \
                     **Knife**\n\n***Choose wisely...***",
                    ORANGE,
                ))
                .components(box_buttons(&prefix)),
        )
        .await?;

    let Some(mci) = next_press(ctx, ctx.author().id, &prefix, JAEGER_ESCAPE_TIMEOUT).await else {
        return forced_loss_view(ctx, &reply, user_id, username).await;
    };
    let color = BoxColor::ALL
        .iter()
        .copied()
        .find(|c| mci.data.custom_id.ends_with(c.name()))
        .unwrap_or(BoxColor::Green);
    let outcome = draw.open(color);
    let lucky = {
        let mut rng = rand::thread_rng();
        rng.gen_bool(0.45)
    };
    let resolution =
        breakout::apply_jaeger_escape(&data.ledger, guild_id, user_id, username, outcome, lucky)
            .await;

    let (title, text, color_code) = match resolution {
        breakout::JaegerEscapeResolution::LuckyEscape => (
            "Organized Chaos",
            "The room shakes; screams echo down the halls. In the confusion you slip out of the \
             camp and never look back.\n\n**In the midst of chaos, there is also opportunity.**"
                .to_string(),
            GREEN,
        ),
        breakout::JaegerEscapeResolution::Executed { savings_penalty } => (
            "The Knife",
            format!(
                "You chose the box with the **Knife**. The Jaegers forced you to fight to the death \
                 in an arena.\n\nYou didn't survive...\n\nYou lost everything in your pockets and \
                 **{savings_penalty}** Medals from your savings."
            ),
            DARK_RED,
        ),
        breakout::JaegerEscapeResolution::Injured { tier_name, extension_secs } => (
            "Bad Hand",
            format!(
                "You chose the box with the **Card**. The Jaegers took this as their cue to play a \
                 game with your body.\n\nYour condition is now **{tier_name}** and your prison time \
                 was extended by **{}**.",
                format_duration(extension_secs)
            ),
            RED,
        ),
        breakout::JaegerEscapeResolution::Healed { tier_name } => (
            "Displeased Mercy",
            format!(
                "The box contained **medical supplies**. The Jaegers let you treat your wounds, but \
                 not without taking a fee of **20** Medals.\n\nYour condition improved to \
                 **{tier_name}**."
            ),
            GREEN,
        ),
        breakout::JaegerEscapeResolution::Extended { extension_secs } => (
            "Prolonged Silence",
            format!(
                "Inside the box was a **broken watch**...\n\nThe Jaegers sigh in disappointment and \
                 put you back in your cell.\n\nYour sentence has increased an extra **{}**.",
                format_duration(extension_secs)
            ),
            RED,
        ),
    };
    update_view(ctx, &mci, basic_embed(title, &text, color_code), vec![]).await
}

/// Attempt to break another player out of prison.
#[poise::command(slash_command, guild_only)]
#[instrument(skip(ctx))]
pub async fn breakout(
    ctx: Context<'_>,
    #[description = "The player you want to break out of prison"] target: serenity::User,
) -> Result<(), Error> {
    if !ensure_economy(&ctx).await? || !ensure_free(&ctx).await? || !ensure_not_in_challenge(&ctx).await? {
        return Ok(());
    }
    if target.id == ctx.author().id {
        return send_embed(
            ctx,
            "Error",
            "Use `/escape` to escape yourself from prison... Don't act stupid!",
            RED,
            true,
        )
        .await;
    }
    if target.bot {
        return send_embed(
            ctx,
            "Error",
            "You can't break out a bot. They've probably already escaped on their own anyway.",
            RED,
            true,
        )
        .await;
    }

    let data = ctx.data();
    let guild_id = guild_of(&ctx);
    let helper_id = ctx.author().id.get();
    let helper_name = author_name(&ctx);
    let target_id = target.id.get();
    let target_name = target.display_name().to_string();

    let Some(target_prison) = data
        .ledger
        .prison_status(guild_id, target_id, &target_name)
        .await
    else {
        return send_embed(
            ctx,
            "Error",
            &format!("{target_name} is not in prison!"),
            RED,
            true,
        )
        .await;
    };

    if !handle_cooldown(&ctx, Activity::Breakout, breakout::BREAKOUT_COOLDOWN, "attempt another breakout")
        .await?
    {
        return Ok(());
    }
    // Stamp immediately so abandoning the view cannot dodge the window.
    data.ledger
        .set_cooldown(guild_id, helper_id, &helper_name, Activity::Breakout)
        .await;

    if !data
        .sessions
        .try_claim(guild_id, &[helper_id], SessionKind::Breakout)
        .await
    {
        return send_embed(ctx, "Error", "You are already in a game.", RED, true).await;
    }

    let result = run_breakout(
        &ctx,
        &target,
        target_prison.tier,
        helper_id,
        &helper_name,
        target_id,
        &target_name,
    )
    .await;
    data.sessions.release(guild_id, &[helper_id]).await;
    result
}

#[allow(clippy::too_many_lines)]
async fn run_breakout(
    ctx: &Context<'_>,
    target: &serenity::User,
    tier: PrisonTier,
    helper_id: u64,
    helper_name: &str,
    target_id: u64,
    target_name: &str,
) -> Result<(), Error> {
    let data = ctx.data();
    let guild_id = guild_of(ctx);
    let prefix = format!("br_{}_", ctx.id());
    let mention = target.mention().to_string();

    match tier {
        PrisonTier::OfficerGroup | PrisonTier::OldGuards => {
            let (title, intro, emoji, success_text, failure_text) =
                if tier == PrisonTier::OfficerGroup {
                    (
                        "Officer Group Breakout",
                        "**Just walk through the door...**".to_string(),
                        '\u{1f6aa}',
                        format!(
                            "You simply walked through the door and freed {mention} from the \
                             Officer Group.\n\n**(that was easy)**"
                        ),
                        format!(
                            "You were caught trying to free {mention} from the Officer Group.\n\n\
                             **Now YOU have been sent to the Officer Group prison for 1 hour. (HOW????)**"
                        ),
                    )
                } else {
                    (
                        "Old Guards Breakout",
                        "The guards are sleeping...\n\n**Steal the keys c:<**".to_string(),
                        '\u{1f511}',
                        format!(
                            "You stole the keys while the Vanguard was sleeping and opened \
                             {mention}'s cell without making a noise.\n\n**You both escape from the \
                             Old Guards. (eepy zzz)**"
                        ),
                        format!(
                            "You were caught trying to steal the keys to free {mention} from the \
                             sleeping Vanguard.\n\n**You've been sent to the Old Guards prison for 1 \
                             hour with them.**"
                        ),
                    )
                };

            let reply = ctx
                .send(
                    poise::CreateReply::default()
                        .content(ctx.author().mention().to_string())
                        .embed(basic_embed(title, &intro, BLUE))
                        .components(vec![serenity::CreateActionRow::Buttons(vec![
                            serenity::CreateButton::new(format!("{prefix}go"))
                                .emoji(emoji)
                                .style(serenity::ButtonStyle::Primary),
                        ])]),
                )
                .await?;

            let Some(mci) = next_press(ctx, ctx.author().id, &prefix, SIMPLE_VIEW_TIMEOUT).await
            else {
                return forced_loss_view(ctx, &reply, helper_id, helper_name).await;
            };

            let injuries = data
                .ledger
                .account(guild_id, helper_id, helper_name)
                .await
                .injuries;
            let roll = {
                let mut rng = rand::thread_rng();
                rng.gen_range(1..=100)
            };
            if breakout::single_roll_succeeds(roll, tier, injuries) {
                breakout::free_target(&data.ledger, guild_id, target_id, target_name).await;
                update_view(
                    ctx,
                    &mci,
                    basic_embed("Breakout Successful!", &success_text, GREEN),
                    vec![],
                )
                .await
            } else {
                breakout::jail_helper(&data.ledger, guild_id, helper_id, helper_name, tier).await;
                update_view(
                    ctx,
                    &mci,
                    basic_embed("Breakout Failed!", &failure_text, RED),
                    vec![],
                )
                .await
            }
        }

        PrisonTier::SoldatBrigade => {
            let game = {
                let mut rng = rand::thread_rng();
                DoorGuess::new(&mut rng, 2)
            };
            let reply = ctx
                .send(
                    poise::CreateReply::default()
                        .content(ctx.author().mention().to_string())
                        .embed(basic_embed(
                            "Soldat Brigade Breakout",
                            "It's teeming with Soldats patrolling around the prison...\n\n**Pick a \
                             door to enter through**",
                            BLUE,
                        ))
                        .components(numbered_buttons(&prefix, "door", &[1, 2])),
                )
                .await?;

            let Some(mci) = next_press(ctx, ctx.author().id, &prefix, SIMPLE_VIEW_TIMEOUT).await
            else {
                return forced_loss_view(ctx, &reply, helper_id, helper_name).await;
            };
            let choice = suffix_number(&mci.data.custom_id).unwrap_or(1);
            if game.pick(choice) {
                breakout::free_target(&data.ledger, guild_id, target_id, target_name).await;
                update_view(
                    ctx,
                    &mci,
                    basic_embed(
                        "Breakout Successful!",
                        &format!(
                            "You open the door to see {mention} inside!\n\n**You both escape from \
                             the Soldat Brigade.**"
                        ),
                        GREEN,
                    ),
                    vec![],
                )
                .await
            } else {
                breakout::jail_helper(&data.ledger, guild_id, helper_id, helper_name, tier).await;
                update_view(
                    ctx,
                    &mci,
                    basic_embed(
                        "Breakout Failed!",
                        &format!(
                            "You open the wrong door to a group of Soldats playing blackjack.\n\n\
                             **They put you in the same cell as {mention} for an hour. (womp womp)**"
                        ),
                        RED,
                    ),
                    vec![],
                )
                .await
            }
        }

        PrisonTier::LancerLegion => {
            let mut game = {
                let mut rng = rand::thread_rng();
                LancerDoors::new(&mut rng)
            };
            let reply = ctx
                .send(
                    poise::CreateReply::default()
                        .content(ctx.author().mention().to_string())
                        .embed(basic_embed(
                            "Lancer Legion Breakout",
                            "You hear cheering down the hallways...\n\nThe Legion is hosting a feast \
                             tonight. **Pick a door to enter through. Do not pick the wrong one**",
                            BLUE,
                        ))
                        .components(numbered_buttons(&prefix, "door", &[1, 2, 3, 4])),
                )
                .await?;

            loop {
                let Some(mci) = next_press(ctx, ctx.author().id, &prefix, SIMPLE_VIEW_TIMEOUT).await
                else {
                    return forced_loss_view(ctx, &reply, helper_id, helper_name).await;
                };
                let choice = suffix_number(&mci.data.custom_id).unwrap_or(1);
                let step = {
                    let mut rng = rand::thread_rng();
                    game.pick(&mut rng, choice)
                };
                match step {
                    LancerStep::Freed => {
                        breakout::free_target(&data.ledger, guild_id, target_id, target_name).await;
                        return update_view(
                            ctx,
                            &mci,
                            basic_embed(
                                "Breakout Successful!",
                                &format!(
                                    "You open the door to {mention} playing cards with a wall.\n\n\
                                     **You both escape from the Lancer Legion!**"
                                ),
                                GREEN,
                            ),
                            vec![],
                        )
                        .await;
                    }
                    LancerStep::SecondChance { remaining } => {
                        update_view(
                            ctx,
                            &mci,
                            basic_embed(
                                "Second Chance",
                                "You open the door to an empty storage closet...\nThe Lancer feast \
                                 is about to conclude.\n\n**You do not have much time. Pick the \
                                 correct door before the Legion catches on**",
                                ORANGE,
                            ),
                            numbered_buttons(&prefix, "door", &remaining),
                        )
                        .await?;
                    }
                    LancerStep::Caught => {
                        let tier_name = breakout::jail_and_injure(
                            &data.ledger,
                            guild_id,
                            helper_id,
                            helper_name,
                            tier,
                        )
                        .await;
                        return update_view(
                            ctx,
                            &mci,
                            basic_embed(
                                "Breakout Failed!",
                                &format!(
                                    "You open the door to an empty prison cell...\n\nThe Lancers \
                                     creep up behind you and push you straight in as you **break \
                                     your arm on the fall**.\n\n{mention} has a friend now :D\n\n\
                                     Your condition is now **{tier_name}**."
                                ),
                                RED,
                            ),
                            vec![],
                        )
                        .await;
                    }
                }
            }
        }

        PrisonTier::RookDivision => {
            let mut lock = {
                let mut rng = rand::thread_rng();
                LockPick::new(&mut rng)
            };
            let reply = ctx
                .send(
                    poise::CreateReply::default()
                        .content(ctx.author().mention().to_string())
                        .embed(basic_embed(
                            "Rook Division Breakout",
                            &format!(
                                "It'd be impossible to break into the Rook's domain by force.\n\n\
                                 Maybe you can pick the locks instead...\n\n**Pick the correct order \
                                 of pins to break in.**\n*Lockpick Durability: ({})*",
                                lock.durability
                            ),
                            BLUE,
                        ))
                        .components(numbered_buttons(&prefix, "pin", &lock.available_pins())),
                )
                .await?;

            loop {
                let Some(mci) = next_press(ctx, ctx.author().id, &prefix, PUZZLE_VIEW_TIMEOUT).await
                else {
                    return forced_loss_view(ctx, &reply, helper_id, helper_name).await;
                };
                let pin = suffix_number(&mci.data.custom_id).unwrap_or(1);
                match lock.try_pin(pin) {
                    LockPickStep::Opened => {
                        breakout::free_target(&data.ledger, guild_id, target_id, target_name).await;
                        return update_view(
                            ctx,
                            &mci,
                            basic_embed(
                                "Breakout Successful!",
                                &format!(
                                    "After a while you successfully picked the lock and found \
                                     {mention}'s cell.\n\n**You both break out from the Rook \
                                     Division!**"
                                ),
                                GREEN,
                            ),
                            vec![],
                        )
                        .await;
                    }
                    LockPickStep::PinSet { remaining_pins } => {
                        update_view(
                            ctx,
                            &mci,
                            basic_embed(
                                "Lockpicking in Progress",
                                &format!(
                                    "Pin set :D\n\n**Raise the next pin**\n*Lockpick Durability: \
                                     ({})*",
                                    lock.durability
                                ),
                                BLUE,
                            ),
                            numbered_buttons(&prefix, "pin", &remaining_pins),
                        )
                        .await?;
                    }
                    LockPickStep::WrongPin { durability } => {
                        update_view(
                            ctx,
                            &mci,
                            basic_embed(
                                "Lockpicking in Progress",
                                &format!(
                                    "Wrong pin D:\n\n**Try again**\n*Lockpick Durability: \
                                     ({durability})*"
                                ),
                                ORANGE,
                            ),
                            numbered_buttons(&prefix, "pin", &lock.available_pins()),
                        )
                        .await?;
                    }
                    LockPickStep::Broke => {
                        let tier_name = breakout::jail_and_injure(
                            &data.ledger,
                            guild_id,
                            helper_id,
                            helper_name,
                            tier,
                        )
                        .await;
                        return update_view(
                            ctx,
                            &mci,
                            basic_embed(
                                "Breakout Failed!",
                                &format!(
                                    "Your lockpick broke...\n\n{mention} has been watching you do \
                                     this for an hour, unimpressed...\n\nThe Rook Division throws \
                                     you in the cell right next to {mention} and you incur an \
                                     **injury while resisting**.\n\nYour condition is now \
                                     **{tier_name}**."
                                ),
                                RED,
                            ),
                            vec![],
                        )
                        .await;
                    }
                }
            }
        }

        PrisonTier::MorticianWing => {
            let mut puzzle = {
                let mut rng = rand::thread_rng();
                VialPuzzle::new(&mut rng)
            };
            let reply = ctx
                .send(
                    poise::CreateReply::default()
                        .content(ctx.author().mention().to_string())
                        .embed(basic_embed(
                            "Mortician Wing Breakout",
                            "You disguised yourself as a Mort to gain entry.\n\nThe other Morts \
                             would like to test your pharmaceutical knowledge: in front of you are \
                             **6 colored vials with covered labels**.\n\nTest bottles on other \
                             prisoners until 1 remains. If the **last bottle remaining is \
                             Amatoxin**, you fooled them. If you **pick the Amatoxin yourself**, it \
                             is you who plays the fool...",
                            BLUE,
                        ))
                        .components(vial_buttons(&prefix, &puzzle.remaining)),
                )
                .await?;

            loop {
                let Some(mci) = next_press(ctx, ctx.author().id, &prefix, PUZZLE_VIEW_TIMEOUT).await
                else {
                    return forced_loss_view(ctx, &reply, helper_id, helper_name).await;
                };
                let color = VialColor::ALL
                    .iter()
                    .copied()
                    .find(|c| mci.data.custom_id.ends_with(c.name()))
                    .unwrap_or(VialColor::Red);
                match puzzle.pick(color) {
                    VialStep::Poisoned => {
                        breakout::jail_helper(
                            &data.ledger,
                            guild_id,
                            helper_id,
                            helper_name,
                            tier,
                        )
                        .await;
                        status::set_injuries(
                            &data.ledger,
                            guild_id,
                            helper_id,
                            helper_name,
                            status::NEEDS_SURGERY_INJURIES,
                        )
                        .await;
                        return update_view(
                            ctx,
                            &mci,
                            basic_embed(
                                "Breakout Failed!",
                                &format!(
                                    "You picked the {} bottle. It was **Amatoxin**.\n\nThe Morts \
                                     immediately apprehend you and stick **4 different stims into \
                                     your bloodstream**.\nYou and {mention} become lab rats in the \
                                     Mortician Wing.\n\nYour condition has worsened to **Needs \
                                     Surgery**.",
                                    color.emoji()
                                ),
                                RED,
                            ),
                            vec![],
                        )
                        .await;
                    }
                    VialStep::Revealed { drug, effect, cleared } => {
                        if cleared {
                            breakout::free_target(&data.ledger, guild_id, target_id, target_name)
                                .await;
                            return update_view(
                                ctx,
                                &mci,
                                basic_embed(
                                    "Breakout Successful!",
                                    &format!(
                                        "Through process of elimination, you identified the {} \
                                         bottle as Amatoxin. The Morts, appeased with your \
                                         performance, let you be.\n\n**Both you and {mention} \
                                         escape the Mortician Wing with all the stolen stimulants.**",
                                        puzzle.amatoxin().emoji()
                                    ),
                                    GREEN,
                                ),
                                vec![],
                            )
                            .await;
                        }
                        update_view(
                            ctx,
                            &mci,
                            basic_embed(
                                "Pharmaceutical Test",
                                &format!(
                                    "You picked the {} bottle. It contained **{drug}**.\n\n{effect}\n\n\
                                     **Pick the next bottle...**",
                                    color.emoji()
                                ),
                                BLUE,
                            ),
                            vial_buttons(&prefix, &puzzle.remaining),
                        )
                        .await?;
                    }
                }
            }
        }

        PrisonTier::JaegerCamp => {
            jaeger_path_view(ctx, &prefix, helper_id, helper_name, target_id, target_name, &mention)
                .await
        }
    }
}

fn direction_buttons(prefix: &str) -> Vec<serenity::CreateActionRow> {
    vec![serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new(format!("{prefix}dir_left"))
            .emoji('\u{2b05}')
            .style(serenity::ButtonStyle::Primary),
        serenity::CreateButton::new(format!("{prefix}dir_straight"))
            .emoji('\u{2b06}')
            .style(serenity::ButtonStyle::Primary),
        serenity::CreateButton::new(format!("{prefix}dir_right"))
            .emoji('\u{27a1}')
            .style(serenity::ButtonStyle::Primary),
    ])]
}

#[allow(clippy::too_many_arguments)]
async fn jaeger_path_view(
    ctx: &Context<'_>,
    prefix: &str,
    helper_id: u64,
    helper_name: &str,
    target_id: u64,
    target_name: &str,
    mention: &str,
) -> Result<(), Error> {
    let data = ctx.data();
    let guild_id = guild_of(ctx);
    let mut run = PathRun::new();

    let reply = ctx
        .send(
            poise::CreateReply::default()
                .content(ctx.author().mention().to_string())
                .embed(basic_embed(
                    "Jaeger Camp Breakout",
                    &format!(
                        "Breaking into the Jaeger Camp will prove difficult.\n\nYou soon find \
                         yourself trapped in a cave system filled with Jaeger traps.\n\n**Traverse \
                         Carefully**\n*Successfully traverse {} paths before reaching Critical \
                         Condition*",
                        breakout::JAEGER_PATHS_REQUIRED
                    ),
                    BLUE,
                ))
                .components(direction_buttons(prefix)),
        )
        .await?;

    loop {
        let Some(mci) = next_press(ctx, ctx.author().id, prefix, PATH_VIEW_TIMEOUT).await else {
            return forced_loss_view(ctx, &reply, helper_id, helper_name).await;
        };

        let injuries = data
            .ledger
            .account(guild_id, helper_id, helper_name)
            .await
            .injuries;
        let (roll, flavor_index) = {
            let mut rng = rand::thread_rng();
            (rng.gen_range(1..=100), rng.gen_range(0..SAFE_PATHS.len()))
        };
        match run.step(roll, injuries) {
            PathStep::Arrived { last_was_safe } => {
                breakout::free_target(&data.ledger, guild_id, target_id, target_name).await;
                let description = if last_was_safe {
                    format!(
                        "{}\n\n**After fighting your way out, you both run clear away from the \
                         Jaeger Camp!**",
                        SAFE_PATHS[flavor_index]
                    )
                } else {
                    format!(
                        "{}\n\nDespite your injuries, you finally reached {mention}!\n\n**After a \
                         brief struggle, you both escape from the Jaeger Camp!**",
                        BAD_PATHS[flavor_index]
                    )
                };
                return update_view(
                    ctx,
                    &mci,
                    basic_embed("Breakout Successful!", &description, GREEN),
                    vec![],
                )
                .await;
            }
            PathStep::Safe { progress } => {
                update_view(
                    ctx,
                    &mci,
                    basic_embed(
                        "Navigating the Jaeger Camp",
                        &format!(
                            "{}\n\n*{progress}/{} of the way there*",
                            SAFE_PATHS[flavor_index],
                            breakout::JAEGER_PATHS_REQUIRED
                        ),
                        BLUE,
                    ),
                    direction_buttons(prefix),
                )
                .await?;
            }
            PathStep::Hurt { progress } => {
                let new_injuries =
                    status::add_injury(&data.ledger, guild_id, helper_id, helper_name).await;
                let tier_name = status::tier_for(new_injuries).name;
                if tier_name == "Critical Condition" {
                    update_view(
                        ctx,
                        &mci,
                        basic_embed(
                            "Critical Condition!",
                            &format!(
                                "{}\n\nYour **Critical Condition** has made you unable to carry \
                                 on... You wake up to see {mention} across from you, a Jaeger with a \
                                 knife at their throat.\n\n**They present to you 4 different colored \
                                 boxes:**\n\n1 box contains a **Knife**\n1 box contains a **Broken \
                                 Watch**\n1 box contains stolen **Medical Supplies**\n1 box contains \
                                 a **Joker Card**\n\n***Choose wisely...***",
                                BAD_PATHS[flavor_index]
                            ),
                            ORANGE,
                        ),
                        box_buttons(prefix),
                    )
                    .await?;
                    return jaeger_boxes_view(
                        ctx,
                        &reply,
                        prefix,
                        helper_id,
                        helper_name,
                        target_id,
                        target_name,
                        mention,
                    )
                    .await;
                }
                update_view(
                    ctx,
                    &mci,
                    basic_embed(
                        &format!("Injured - {tier_name}"),
                        &format!(
                            "{}\n\nYour condition worsened to **{tier_name}**.\n\n*{progress}/{} of \
                             the way there*",
                            BAD_PATHS[flavor_index],
                            breakout::JAEGER_PATHS_REQUIRED
                        ),
                        ORANGE,
                    ),
                    direction_buttons(prefix),
                )
                .await?;
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn jaeger_boxes_view(
    ctx: &Context<'_>,
    reply: &poise::ReplyHandle<'_>,
    prefix: &str,
    helper_id: u64,
    helper_name: &str,
    target_id: u64,
    target_name: &str,
    mention: &str,
) -> Result<(), Error> {
    let data = ctx.data();
    let guild_id = guild_of(ctx);
    let draw = {
        let mut rng = rand::thread_rng();
        breakout::BoxDraw::new(&mut rng)
    };

    let Some(mci) = next_press(ctx, ctx.author().id, prefix, PUZZLE_VIEW_TIMEOUT).await else {
        return forced_loss_view(ctx, reply, helper_id, helper_name).await;
    };
    let color = BoxColor::ALL
        .iter()
        .copied()
        .find(|c| mci.data.custom_id.ends_with(c.name()))
        .unwrap_or(BoxColor::Green);

    match draw.open(color) {
        BoxPrize::Knife => {
            let lucky = {
                let mut rng = rand::thread_rng();
                rng.gen_bool(0.45)
            };
            match breakout::resolve_knife(
                &data.ledger,
                guild_id,
                helper_id,
                helper_name,
                target_id,
                target_name,
                lucky,
            )
            .await
            {
                KnifeResolution::LuckyEscape => {
                    update_view(
                        ctx,
                        &mci,
                        basic_embed(
                            "War Investment",
                            &format!(
                                "The game is interrupted: a benefactor trades a crate of Medals for \
                                 both of your freedoms.\n\n**War is an economy. Anybody who tells \
                                 you otherwise is either in on it or stupid.**\n\nYou successfully \
                                 free {mention}!"
                            ),
                            GREEN,
                        ),
                        vec![],
                    )
                    .await
                }
                KnifeResolution::TargetExecuted { savings_penalty } => {
                    update_view(
                        ctx,
                        &mci,
                        basic_embed(
                            "Regretful Solitude",
                            &format!(
                                "Inside the {} box was a **Knife**...\n\nYou are forced to watch as \
                                 **{mention} crashes to the ground, a bullet through their head**.\n\n\
                                 All their pocket Medals and **{savings_penalty}** Medals from \
                                 savings get looted off their corpse. You now face the same fate, as \
                                 your hour of hell has only just begun...",
                                color.emoji()
                            ),
                            DARK_RED,
                        ),
                        vec![],
                    )
                    .await
                }
            }
        }
        BoxPrize::BrokenWatch => {
            breakout::apply_broken_watch(
                &data.ledger,
                guild_id,
                helper_id,
                helper_name,
                target_id,
                target_name,
            )
            .await;
            update_view(
                ctx,
                &mci,
                basic_embed(
                    "Shared Silence",
                    &format!(
                        "Inside the {} box was a broken watch...\n\nThe Jaegers sigh in \
                         disappointment and put both you and {mention} back in your cells.\n\nBoth \
                         your sentences have been increased by an extra **15 minutes** each.",
                        color.emoji()
                    ),
                    RED,
                ),
                vec![],
            )
            .await
        }
        BoxPrize::MedicalSupplies => {
            let (helper_tier, target_tier) = breakout::apply_medical_supplies(
                &data.ledger,
                guild_id,
                helper_id,
                helper_name,
                target_id,
                target_name,
            )
            .await;
            update_view(
                ctx,
                &mci,
                basic_embed(
                    "Reluctant Gifts",
                    &format!(
                        "Inside the {} box were medical supplies!\n\nThe Jaegers reluctantly allow \
                         you both to treat your wounds.\n\nYour condition improved to \
                         **{helper_tier}** and {mention}'s condition improved to **{target_tier}**.\n\n\
                         However, both of you remain in prison for now...",
                        color.emoji()
                    ),
                    GREEN,
                ),
                vec![],
            )
            .await
        }
        BoxPrize::JokerCard => {
            let target_tier = breakout::apply_joker_card(
                &data.ledger,
                guild_id,
                helper_id,
                helper_name,
                target_id,
                target_name,
            )
            .await;
            update_view(
                ctx,
                &mci,
                basic_embed(
                    "Indirect Punishment",
                    &format!(
                        "Inside the {} box was a Joker Card.\n\nAs soon as you picked it up, the \
                         Jaegers started laughing as they **cut a finger off of {mention}'s \
                         hand.**\n\nTheir condition has worsened to **{target_tier}**.\n\nBoth of \
                         you remain in prison for now...",
                        color.emoji()
                    ),
                    RED,
                ),
                vec![],
            )
            .await
        }
    }
}
