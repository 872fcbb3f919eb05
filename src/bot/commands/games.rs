//! Gambling commands: roulette, player-vs-player blackjack, and the forced
//! balance challenge.
//!
//! The interactive flows follow one pattern: the core state machine owns the
//! rules, the command loop here owns buttons and timeouts. Every timeout maps
//! to the coordinator's defined default resolution, and any error after funds
//! were escrowed refunds before propagating.

use crate::activities::{self, RouletteColor};
use crate::bot::commands::{
    BLUE, BLURPLE, GOLD, GREEN, RED, author_name, basic_embed, economy_precheck, guild_of,
    handle_cooldown, send_embed,
};
use crate::bot::{Context, Error};
use crate::games::blackjack::{
    self, BlackjackMatch, Seat, Settlement, INVITE_TIMEOUT_SECS, TURN_TIMEOUT_SECS,
};
use crate::games::challenge::{
    self, CHALLENGE_STAKE, ChallengeHand, ChallengeSeries, HAND_TIMEOUT_SECS, HandVerdict,
    WINS_NEEDED,
};
use crate::games::{SessionKind, deck};
use crate::models::Activity;
use poise::serenity_prelude::{self as serenity, Mentionable};
use std::time::Duration;
use tracing::{instrument, warn};

#[derive(poise::ChoiceParameter, Clone, Copy, Debug)]
pub enum RouletteChoice {
    #[name = "Purple"]
    Purple,
    #[name = "Yellow"]
    Yellow,
    #[name = "Green"]
    Green,
}

impl From<RouletteChoice> for RouletteColor {
    fn from(choice: RouletteChoice) -> Self {
        match choice {
            RouletteChoice::Purple => RouletteColor::Purple,
            RouletteChoice::Yellow => RouletteColor::Yellow,
            RouletteChoice::Green => RouletteColor::Green,
        }
    }
}

/// Play roulette: bet on purple, yellow, or green!
#[poise::command(slash_command, guild_only)]
#[instrument(skip(ctx))]
pub async fn roulette(
    ctx: Context<'_>,
    #[description = "How many Medals you want to bet"] bet: i64,
    #[description = "Pick a color"] choice: RouletteChoice,
) -> Result<(), Error> {
    if !economy_precheck(&ctx).await? {
        return Ok(());
    }
    if !handle_cooldown(&ctx, Activity::Roulette, activities::ROULETTE_COOLDOWN, "play roulette")
        .await?
    {
        return Ok(());
    }
    let data = ctx.data();
    let guild_id = guild_of(&ctx);
    let user_id = ctx.author().id.get();
    let username = author_name(&ctx);

    if bet <= 0 {
        return send_embed(ctx, "Error", "What's the point of betting nothing???", RED, true).await;
    }
    let pockets = data.ledger.pockets(guild_id, user_id, &username).await;
    if bet > pockets {
        return send_embed(
            ctx,
            "Error",
            "You don't have enough Medals in your pockets for that bet.",
            RED,
            true,
        )
        .await;
    }

    let choice: RouletteColor = choice.into();
    send_embed(
        ctx,
        "Roulette",
        &format!("You bet {bet} on **{}...**", choice.name()),
        BLURPLE,
        false,
    )
    .await?;

    let landed = {
        let mut rng = rand::thread_rng();
        activities::spin_wheel(&mut rng)
    };
    let outcome =
        activities::roulette(&data.ledger, guild_id, user_id, &username, bet, choice, landed).await;

    if outcome.won {
        send_embed(
            ctx,
            "Roulette Win",
            &format!(
                "The ball landed on **{} (x{})**!\n\nYou won **{} Medals :D**",
                outcome.landed.name(),
                outcome.landed.multiplier(),
                outcome.payout
            ),
            GREEN,
            false,
        )
        .await?;
    } else {
        send_embed(
            ctx,
            "Roulette L",
            &format!(
                "The ball landed on **{}**.\n\nYou lost your bet of **{bet} Medals D:**",
                outcome.landed.name()
            ),
            RED,
            false,
        )
        .await?;
    }

    maybe_trigger_challenge(&ctx, ctx.author()).await
}

fn bj_buttons(prefix: &str) -> Vec<serenity::CreateActionRow> {
    vec![serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new(format!("{prefix}hit"))
            .label("Hit")
            .style(serenity::ButtonStyle::Primary),
        serenity::CreateButton::new(format!("{prefix}stand"))
            .label("Stand")
            .style(serenity::ButtonStyle::Secondary),
        serenity::CreateButton::new(format!("{prefix}peek"))
            .label("Peek at Hand")
            .style(serenity::ButtonStyle::Secondary),
    ])]
}

/// Public table view: first card up, the rest face down.
fn table_embed(
    game: &BlackjackMatch,
    initiator_name: &str,
    opponent_name: &str,
    turn_name: &str,
) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::default()
        .title("Blackjack")
        .description(format!(
            "Bet: **{}** Medals each\nTotal Pot: **{}** Medals",
            game.bet,
            game.pot()
        ))
        .color(GOLD)
        .field(
            "Current Turn",
            format!("It's **{turn_name}**'s turn."),
            false,
        );
    for (seat, name) in [(Seat::Initiator, initiator_name), (Seat::Opponent, opponent_name)] {
        let hand = game.hand(seat);
        let shown = hand[0];
        let hidden = " \u{1f0a0}".repeat(hand.len() - 1);
        let mut field = format!("{}{hidden}", shown.label());
        if game.has_stood(seat) {
            field.push_str("\n*stood*");
        }
        embed = embed.field(
            format!("{name}'s Hand (Showing {})", deck::hand_value(&hand[..1])),
            field,
            false,
        );
    }
    embed
}

/// Final table view with everything revealed.
fn reveal_embed(
    game: &BlackjackMatch,
    initiator_name: &str,
    opponent_name: &str,
    result_line: &str,
) -> serenity::CreateEmbed {
    serenity::CreateEmbed::default()
        .title("Blackjack Game Over")
        .description(result_line)
        .color(GOLD)
        .field(
            format!(
                "{initiator_name}'s Hand ({})",
                game.value(Seat::Initiator)
            ),
            deck::format_hand(game.hand(Seat::Initiator)),
            false,
        )
        .field(
            format!("{opponent_name}'s Hand ({})", game.value(Seat::Opponent)),
            deck::format_hand(game.hand(Seat::Opponent)),
            false,
        )
}

/// Challenge another player to a game of blackjack for Medals.
#[poise::command(slash_command, guild_only)]
#[instrument(skip(ctx))]
pub async fn blackjack(
    ctx: Context<'_>,
    #[description = "The player you want to challenge"] opponent: serenity::User,
    #[description = "How many Medals to bet"] bet: i64,
) -> Result<(), Error> {
    if opponent.id == ctx.author().id {
        return send_embed(
            ctx,
            "Error",
            "You can't challenge yourself to blackjack...",
            RED,
            true,
        )
        .await;
    }
    if opponent.bot {
        return send_embed(ctx, "Error", "I'd wipe the floor against you", RED, true).await;
    }
    if bet <= 0 {
        return send_embed(ctx, "Error", "The bet must be greater than 0 Medals.", RED, true).await;
    }
    if !economy_precheck(&ctx).await? {
        return Ok(());
    }

    let data = ctx.data();
    let guild_id = guild_of(&ctx);
    let author = ctx.author();
    let author_id = author.id.get();
    let initiator_name = author_name(&ctx);
    let opponent_id = opponent.id.get();
    let opponent_name = opponent.display_name().to_string();

    if let Some(status) = data
        .ledger
        .prison_status(guild_id, opponent_id, &opponent_name)
        .await
    {
        return send_embed(
            ctx,
            "Prison Restriction",
            &format!(
                "{} is currently in prison with the **{}** and cannot play blackjack.",
                opponent.mention(),
                status.tier.name()
            ),
            RED,
            true,
        )
        .await;
    }

    let initiator_pockets = data.ledger.pockets(guild_id, author_id, &initiator_name).await;
    if initiator_pockets < bet {
        return send_embed(
            ctx,
            "Error",
            &format!(
                "You don't have enough Medals for this bet. You need {bet} but only have {initiator_pockets}."
            ),
            RED,
            true,
        )
        .await;
    }
    let opponent_pockets = data.ledger.pockets(guild_id, opponent_id, &opponent_name).await;
    if opponent_pockets < bet {
        return send_embed(
            ctx,
            "Error",
            &format!(
                "{opponent_name} doesn't have enough Medals for this bet. They need {bet} but only have {opponent_pockets}."
            ),
            RED,
            true,
        )
        .await;
    }

    if !data
        .sessions
        .try_claim(guild_id, &[author_id, opponent_id], SessionKind::Blackjack)
        .await
    {
        return send_embed(
            ctx,
            "Error",
            "You or your opponent is already in a game.",
            RED,
            true,
        )
        .await;
    }

    let prefix = format!("bj_{}_", ctx.id());
    let result = run_blackjack(
        &ctx,
        &opponent,
        bet,
        &prefix,
        &initiator_name,
        &opponent_name,
    )
    .await;
    data.sessions.release(guild_id, &[author_id, opponent_id]).await;
    result
}

async fn run_blackjack(
    ctx: &Context<'_>,
    opponent: &serenity::User,
    bet: i64,
    prefix: &str,
    initiator_name: &str,
    opponent_name: &str,
) -> Result<(), Error> {
    let data = ctx.data();
    let guild_id = guild_of(ctx);
    let author = ctx.author();
    let author_id = author.id.get();
    let opponent_id = opponent.id.get();

    // Invitation handshake.
    let invite_rows = vec![serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new(format!("{prefix}accept"))
            .label("Accept")
            .style(serenity::ButtonStyle::Success),
        serenity::CreateButton::new(format!("{prefix}decline"))
            .label("Decline")
            .style(serenity::ButtonStyle::Danger),
    ])];
    let invite_embed = basic_embed(
        "Blackjack Challenge!",
        &format!(
            "{} has challenged {} to a game of blackjack with a bet of **{bet}** Medals each.",
            author.mention(),
            opponent.mention()
        ),
        BLUE,
    );
    let reply = ctx
        .send(
            poise::CreateReply::default()
                .content(opponent.mention().to_string())
                .embed(invite_embed)
                .components(invite_rows),
        )
        .await?;

    let invite = serenity::ComponentInteractionCollector::new(ctx.serenity_context())
        .author_id(opponent.id)
        .channel_id(ctx.channel_id())
        .timeout(Duration::from_secs(INVITE_TIMEOUT_SECS))
        .filter({
            let prefix = prefix.to_string();
            move |mci| mci.data.custom_id.starts_with(&prefix)
        })
        .await;

    let accepted = match invite {
        None => {
            reply
                .edit(
                    *ctx,
                    poise::CreateReply::default()
                        .embed(basic_embed(
                            "Blackjack Expired",
                            &format!(
                                "{} did not respond to the blackjack challenge in time.",
                                opponent.mention()
                            ),
                            RED,
                        ))
                        .components(vec![]),
                )
                .await?;
            false
        }
        Some(mci) => {
            if mci.data.custom_id.ends_with("decline") {
                mci.create_response(
                    ctx.serenity_context(),
                    serenity::CreateInteractionResponse::UpdateMessage(
                        serenity::CreateInteractionResponseMessage::new()
                            .embed(basic_embed(
                                "Blackjack Declined",
                                &format!(
                                    "{} has declined {}'s blackjack game :<",
                                    opponent.mention(),
                                    author.mention()
                                ),
                                RED,
                            ))
                            .components(vec![]),
                    ),
                )
                .await?;
                false
            } else {
                // Funds may have moved since the invite went out.
                let opponent_pockets = data
                    .ledger
                    .pockets(guild_id, opponent_id, opponent_name)
                    .await;
                if opponent_pockets < bet {
                    mci.create_response(
                        ctx.serenity_context(),
                        serenity::CreateInteractionResponse::UpdateMessage(
                            serenity::CreateInteractionResponseMessage::new()
                                .embed(basic_embed(
                                    "Blackjack Failed",
                                    &format!(
                                        "{} no longer has enough Medals to accept the bet.",
                                        opponent.mention()
                                    ),
                                    RED,
                                ))
                                .components(vec![]),
                        ),
                    )
                    .await?;
                    false
                } else {
                    mci.create_response(
                        ctx.serenity_context(),
                        serenity::CreateInteractionResponse::Acknowledge,
                    )
                    .await?;
                    true
                }
            }
        }
    };
    if !accepted {
        return Ok(());
    }

    // Bets are escrowed the moment the invite is accepted.
    let mut game = {
        let mut rng = rand::thread_rng();
        BlackjackMatch::deal(author_id, opponent_id, bet, &mut rng)
    };
    blackjack::escrow_bets(&data.ledger, guild_id, &game, initiator_name, opponent_name).await;

    let driven = drive_blackjack_table(
        ctx,
        &reply,
        &mut game,
        prefix,
        initiator_name,
        opponent_name,
    )
    .await;
    if let Err(e) = driven {
        // Never strand the escrow on a transport failure.
        warn!("Blackjack table failed mid-game, refunding: {e}");
        blackjack::refund_bets(&data.ledger, guild_id, &game, initiator_name, opponent_name).await;
        return Err(e);
    }

    let settlement =
        blackjack::settle(&data.ledger, guild_id, &game, initiator_name, opponent_name).await;
    let result_line = match settlement {
        Settlement::Refunded => format!(
            "The game ended in a tie. Both players get their **{bet}** Medals back."
        ),
        Settlement::Paid { winner, amount, bonus } => {
            let winner_name = if winner == author_id {
                initiator_name
            } else {
                opponent_name
            };
            if bonus > 0 {
                format!(
                    "**{winner_name}** wins with a Blackjack! They take the pot plus a **{bonus}** Medal bonus for **{amount}** Medals total."
                )
            } else {
                format!("**{winner_name}** wins and takes the entire pot of **{amount}** Medals!")
            }
        }
    };
    reply
        .edit(
            *ctx,
            poise::CreateReply::default()
                .embed(reveal_embed(&game, initiator_name, opponent_name, &result_line))
                .components(vec![]),
        )
        .await?;
    Ok(())
}

/// Drive the turn loop until the match resolves. Timeouts auto-stand the
/// absent player, or forfeit the hand outright when theirs was the last
/// decision left.
async fn drive_blackjack_table(
    ctx: &Context<'_>,
    reply: &poise::ReplyHandle<'_>,
    game: &mut BlackjackMatch,
    prefix: &str,
    initiator_name: &str,
    opponent_name: &str,
) -> Result<(), Error> {
    let name_of = |seat: Seat| match seat {
        Seat::Initiator => initiator_name,
        Seat::Opponent => opponent_name,
    };

    reply
        .edit(
            *ctx,
            poise::CreateReply::default()
                .embed(table_embed(
                    game,
                    initiator_name,
                    opponent_name,
                    name_of(game.turn()),
                ))
                .components(bj_buttons(prefix)),
        )
        .await?;

    while !game.is_over() {
        let seat = game.turn();
        let current = game.current_player();
        let mci = serenity::ComponentInteractionCollector::new(ctx.serenity_context())
            .author_id(serenity::UserId::new(current))
            .channel_id(ctx.channel_id())
            .timeout(Duration::from_secs(TURN_TIMEOUT_SECS))
            .filter({
                let prefix = prefix.to_string();
                move |mci| mci.data.custom_id.starts_with(&prefix)
            })
            .await;

        let Some(mci) = mci else {
            if game.has_stood(seat.other()) {
                // Their decision was the only one left; inaction forfeits.
                game.forfeit(seat);
            } else {
                game.stand(seat);
            }
            if !game.is_over() {
                reply
                    .edit(
                        *ctx,
                        poise::CreateReply::default()
                            .embed(table_embed(
                                game,
                                initiator_name,
                                opponent_name,
                                name_of(game.turn()),
                            ))
                            .components(bj_buttons(prefix)),
                    )
                    .await?;
            }
            continue;
        };

        if mci.data.custom_id.ends_with("peek") {
            let hand = game.hand(seat);
            mci.create_response(
                ctx.serenity_context(),
                serenity::CreateInteractionResponse::Message(
                    serenity::CreateInteractionResponseMessage::new()
                        .ephemeral(true)
                        .embed(basic_embed(
                            &format!("Your Hand ({})", game.value(seat)),
                            &deck::format_hand(hand),
                            BLUE,
                        )),
                ),
            )
            .await?;
            continue;
        }

        if mci.data.custom_id.ends_with("hit") {
            let mut rng = rand::thread_rng();
            game.hit(seat, &mut rng);
        } else {
            game.stand(seat);
        }

        let response = if game.is_over() {
            serenity::CreateInteractionResponseMessage::new()
                .embed(table_embed(
                    game,
                    initiator_name,
                    opponent_name,
                    name_of(game.turn()),
                ))
                .components(vec![])
        } else {
            serenity::CreateInteractionResponseMessage::new()
                .embed(table_embed(
                    game,
                    initiator_name,
                    opponent_name,
                    name_of(game.turn()),
                ))
                .components(bj_buttons(prefix))
        };
        mci.create_response(
            ctx.serenity_context(),
            serenity::CreateInteractionResponse::UpdateMessage(response),
        )
        .await?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Balance challenge

/// Trigger the balance challenge for `user` if their wealth crossed the
/// threshold. Called after every balance-affecting command.
pub(crate) async fn maybe_trigger_challenge(
    ctx: &Context<'_>,
    user: &serenity::User,
) -> Result<(), Error> {
    if user.bot {
        return Ok(());
    }
    let data = ctx.data();
    let guild_id = guild_of(ctx);
    let user_id = user.id.get();
    let username = user.display_name().to_string();

    if !challenge::should_trigger(&data.ledger, &data.sessions, guild_id, user_id, &username).await
    {
        return Ok(());
    }
    if !data
        .sessions
        .try_claim(guild_id, &[user_id], SessionKind::Challenge)
        .await
    {
        return Ok(());
    }
    let result = run_challenge(ctx, user, &username).await;
    data.sessions.release(guild_id, &[user_id]).await;
    result
}

fn challenge_embed(
    round: u32,
    series: &ChallengeSeries,
    hand: &ChallengeHand,
    username: &str,
    reveal_house: bool,
) -> serenity::CreateEmbed {
    let house_field = if reveal_house {
        format!(
            "{} ({})",
            deck::format_hand(hand.house_hand()),
            hand.house_value()
        )
    } else {
        format!("{} \u{1f0a0}", hand.house_upcard().label())
    };
    serenity::CreateEmbed::default()
        .title(format!("DEFEAT THE HOUSE - Round {round}"))
        .description(format!("The stakes: **{CHALLENGE_STAKE}** Medals"))
        .color(GOLD)
        .field(
            "Current Score",
            format!(
                "{username}: **{}** wins\nThe House: **{}** wins\n\nFirst to ***{WINS_NEEDED} wins!***",
                series.player_wins, series.house_wins
            ),
            false,
        )
        .field(
            format!("Your Hand ({})", hand.player_value()),
            deck::format_hand(hand.player_hand()),
            false,
        )
        .field("The House's Hand", house_field, false)
}

async fn run_challenge(
    ctx: &Context<'_>,
    user: &serenity::User,
    username: &str,
) -> Result<(), Error> {
    let data = ctx.data();
    let guild_id = guild_of(ctx);
    let user_id = user.id.get();
    let house_id = data.app_config.house_user_id;

    let intro = format!(
        "This is not the first time we have crossed paths {}!\n\n\
         You have become richer than the house itself.\n\n\
         **IF you beat me in a game of Blackjack**, consider yourself the richest individual in these caves...\n\n\
         **ELSE IF you lose to me**, not only will you lose **{CHALLENGE_STAKE}** Medals but you will also be sent to the **Jaeger Camp**.\n\n\
         In addition, **ALL WHO HAVE STOOD BESIDE YOU, WILL STAND NO LONGER**\n\n\nLet us begin...",
        user.mention()
    );
    ctx.channel_id()
        .send_message(
            ctx.serenity_context(),
            serenity::CreateMessage::new()
                .content(user.mention().to_string())
                .embed(basic_embed("\u{1f52a} DEFEAT THE HOUSE \u{1f52a}", &intro, GOLD)),
        )
        .await?;

    let prefix = format!("chal_{}_", ctx.id());
    let buttons = vec![serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new(format!("{prefix}hit"))
            .label("Hit")
            .style(serenity::ButtonStyle::Primary),
        serenity::CreateButton::new(format!("{prefix}stand"))
            .label("Stand")
            .style(serenity::ButtonStyle::Secondary),
    ])];

    let mut series = ChallengeSeries::new();
    loop {
        let round = series.begin_hand();
        let mut hand = {
            let mut rng = rand::thread_rng();
            ChallengeHand::deal(&mut rng)
        };

        let mut message = ctx
            .channel_id()
            .send_message(
                ctx.serenity_context(),
                serenity::CreateMessage::new()
                    .content(user.mention().to_string())
                    .embed(challenge_embed(round, &series, &hand, username, false))
                    .components(buttons.clone()),
            )
            .await?;

        // Decision loop for one hand.
        let verdict = loop {
            let mci = serenity::ComponentInteractionCollector::new(ctx.serenity_context())
                .author_id(user.id)
                .message_id(message.id)
                .timeout(Duration::from_secs(HAND_TIMEOUT_SECS))
                .filter({
                    let prefix = prefix.clone();
                    move |mci| mci.data.custom_id.starts_with(&prefix)
                })
                .await;

            let Some(mci) = mci else {
                message
                    .edit(
                        ctx.serenity_context(),
                        serenity::EditMessage::new()
                            .embed(basic_embed(
                                "Timeout!",
                                "You took too long to respond! **The house wins this round. :/**",
                                RED,
                            ))
                            .components(vec![]),
                    )
                    .await?;
                break HandVerdict::House;
            };

            if mci.data.custom_id.ends_with("hit") {
                {
                    let mut rng = rand::thread_rng();
                    hand.hit(&mut rng);
                }
                if hand.player_busted() {
                    mci.create_response(
                        ctx.serenity_context(),
                        serenity::CreateInteractionResponse::UpdateMessage(
                            serenity::CreateInteractionResponseMessage::new()
                                .embed(challenge_embed(round, &series, &hand, username, true))
                                .components(vec![]),
                        ),
                    )
                    .await?;
                    break HandVerdict::House;
                }
                mci.create_response(
                    ctx.serenity_context(),
                    serenity::CreateInteractionResponse::UpdateMessage(
                        serenity::CreateInteractionResponseMessage::new()
                            .embed(challenge_embed(round, &series, &hand, username, false)),
                    ),
                )
                .await?;
            } else {
                let verdict = {
                    let mut rng = rand::thread_rng();
                    hand.resolve_stand(&mut rng)
                };
                mci.create_response(
                    ctx.serenity_context(),
                    serenity::CreateInteractionResponse::UpdateMessage(
                        serenity::CreateInteractionResponseMessage::new()
                            .embed(challenge_embed(round, &series, &hand, username, true))
                            .components(vec![]),
                    ),
                )
                .await?;
                break verdict;
            }
        };

        match series.record(verdict) {
            None => continue,
            Some(true) => {
                challenge::settle_victory(&data.ledger, guild_id, user_id, username).await;
                let win_line = format!(
                    "I concede {}...\n\n**But I shall return. Next time with higher stakes on the line.**\n\n\
                     {} has beaten the house and was rewarded **{CHALLENGE_STAKE}** Medals for their victory \
                     and the ensured safety of everyone within the caves.",
                    user.mention(),
                    user.mention()
                );
                ctx.channel_id()
                    .send_message(
                        ctx.serenity_context(),
                        serenity::CreateMessage::new()
                            .content(user.mention().to_string())
                            .embed(basic_embed("The House Defeated", &win_line, GREEN)),
                    )
                    .await?;
                return Ok(());
            }
            Some(false) => {
                challenge::settle_defeat(&data.ledger, guild_id, user_id, username, house_id).await;
                let loss_line = format!(
                    "***The house always wins...***\n\n**{CHALLENGE_STAKE}** Medals were taken from your \
                     savings and you have been thrown into the **Jaeger Camp**.\n\nEveryone you have \
                     considered a friend has been transported to spend time with the **Rook Division** \
                     for this gamble. :<"
                );
                ctx.channel_id()
                    .send_message(
                        ctx.serenity_context(),
                        serenity::CreateMessage::new()
                            .content(user.mention().to_string())
                            .embed(basic_embed(
                                &format!("{username} Failed"),
                                &loss_line,
                                RED,
                            )),
                    )
                    .await?;
                return Ok(());
            }
        }
    }
}
