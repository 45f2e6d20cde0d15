//! Interactive terminal: reads commands from stdin and renders session
//! updates as they arrive.

use anyhow::{Context, Result};
use chrono::Local;
use escoba::{
    game::{MatchView, Username, ViewCard, card::deck},
    net::messages::{MatchHistory, PlayerProfile},
    session::{BOT_OPPONENT, Notice, SessionError, SessionHandle, SessionPhase, SessionUpdate, Severity},
};
use std::{fmt::Write as _, sync::Arc};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};

use crate::{
    api_client::ApiClient,
    commands::{ConsoleCommand, HELP, parse_command},
};

pub struct Console {
    handle: SessionHandle,
    api: Arc<ApiClient>,
    updates: mpsc::Receiver<SessionUpdate>,
}

impl Console {
    pub fn new(
        handle: SessionHandle,
        api: Arc<ApiClient>,
        updates: mpsc::Receiver<SessionUpdate>,
    ) -> Self {
        Self {
            handle,
            api,
            updates,
        }
    }

    /// Run until `quit` or end of input.
    pub async fn run(mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        println!("Logged in as {}.\n\n{HELP}", self.handle.local());

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line.context("Failed to read from stdin")? else {
                        break;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match parse_command(&line) {
                        Ok(ConsoleCommand::Quit) => break,
                        Ok(command) => self.execute(command).await,
                        Err(e) => println!("{e}"),
                    }
                }

                Some(update) = self.updates.recv() => {
                    render_update(&update);
                }
            }
        }

        if let Ok(true) = self.handle.leave().await {
            tracing::info!("Left the running match on exit");
        }
        self.handle.shutdown().await;
        Ok(())
    }

    async fn execute(&self, command: ConsoleCommand) {
        match command {
            ConsoleCommand::Create(opponent) => {
                if let Ok(match_id) = self.handle.create(&opponent).await {
                    println!("Match id: {match_id} (share it with {opponent} to join)");
                }
            }
            ConsoleCommand::Quick => {
                let _ = self.handle.quick_match().await;
            }
            ConsoleCommand::Join(match_id) => {
                let _ = self.handle.join(&match_id).await;
            }
            ConsoleCommand::Play(card_id) => {
                // Outcomes arrive as notices.
                let _ = self.handle.play(card_id).await;
            }
            ConsoleCommand::Leave => match self.handle.leave().await {
                Ok(false) => println!("No match to leave"),
                Ok(true) => {}
                Err(e) => report_error(&e),
            },
            ConsoleCommand::Dismiss => match self.handle.dismiss().await {
                Ok(true) => println!("Match closed. Type 'new NAME' or 'quick' to play again."),
                Ok(false) => println!("Nothing to dismiss"),
                Err(e) => report_error(&e),
            },
            ConsoleCommand::Rematch => {
                if let Err(e) = self.handle.rematch().await {
                    if e.is_local() {
                        report_error(&e);
                    }
                }
            }
            ConsoleCommand::Refresh => {
                if let Err(e) = self.handle.refresh().await {
                    if e.is_local() {
                        report_error(&e);
                    }
                }
            }
            ConsoleCommand::Status => match self.handle.status().await {
                Ok(status) => {
                    println!("Phase: {}", status.phase);
                    if let Some(match_id) = &status.match_id {
                        let opponent = status
                            .opponent
                            .as_ref()
                            .map_or_else(|| "?".to_string(), Username::to_string);
                        println!("Match {match_id} against {opponent}");
                    }
                    if let Some(view) = &status.view {
                        print!("{}", render_view(view));
                    }
                    if status.poll_failures > 0 {
                        println!("Last {} refreshes failed", status.poll_failures);
                    }
                }
                Err(e) => report_error(&e),
            },
            ConsoleCommand::Profile(name) => {
                let username = self.target(name);
                match self.api.player_profile(&username).await {
                    Ok(profile) => print!("{}", render_profile(&profile)),
                    Err(e) => println!("Couldn't load profile of {username}: {e}"),
                }
            }
            ConsoleCommand::History(name) => {
                let username = self.target(name);
                match self.api.player_history(&username).await {
                    Ok(history) => print!("{}", render_history(&history)),
                    Err(e) => println!("Couldn't load history of {username}: {e}"),
                }
            }
            ConsoleCommand::Cards => print!("{}", render_deck()),
            ConsoleCommand::Help => print!("{HELP}"),
            ConsoleCommand::Quit => {}
        }
    }

    fn target(&self, name: Option<String>) -> Username {
        name.map_or_else(|| self.handle.local().clone(), Username::from)
    }
}

fn report_error(error: &SessionError) {
    println!("{}", timestamped(&error.to_string(), Severity::Error));
}

fn render_update(update: &SessionUpdate) {
    match update {
        SessionUpdate::Snapshot(view) => print!("{}", render_view(view)),
        SessionUpdate::Notice(notice) => println!("{}", render_notice(notice)),
        SessionUpdate::Phase(SessionPhase::Finished) => {
            println!("Match over. Type 'rematch' to play again or 'dismiss' to close it.");
        }
        SessionUpdate::Phase(phase) => tracing::debug!("Session is now {phase}"),
    }
}

fn render_notice(notice: &Notice) -> String {
    timestamped(&notice.message, notice.severity)
}

fn timestamped(message: &str, severity: Severity) -> String {
    let marker = match severity {
        Severity::Info => "·",
        Severity::Success => "✓",
        Severity::Error => "✗",
    };
    format!("[{}] {marker} {message}", Local::now().format("%H:%M:%S"))
}

fn render_cards(cards: &[ViewCard], with_ids: bool) -> String {
    if cards.is_empty() {
        return "(none)".to_string();
    }
    cards
        .iter()
        .map(|card| {
            if with_ids {
                format!("[{}]{card}", card.id())
            } else {
                card.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn render_view(view: &MatchView) -> String {
    let [first, second] = &view.players;
    let mut out = String::new();
    let _ = writeln!(out, "\n── Match {}: {first} vs {second} ──", view.match_id);
    let _ = write!(out, "Score: {}", view.score_line);
    if let Some(remaining) = view.remaining_deck {
        let _ = write!(out, "   Deck: {remaining}");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Table:     {}", render_cards(&view.table, false));
    let _ = writeln!(out, "Your hand: {}", render_cards(&view.hand, true));
    if !view.captured.is_empty() {
        let _ = writeln!(out, "Captured:  {} cards", view.captured.len());
    }
    let _ = writeln!(out, "{}", view.turn_line());

    if let Some(outcome) = &view.outcome {
        let _ = write!(out, "Result: {outcome}");
        if let Some(result) = &view.your_result {
            let _ = write!(out, " ({result})");
        }
        let _ = writeln!(out);
        if view.players.iter().any(|player| player.as_str() == BOT_OPPONENT) {
            let _ = writeln!(out, "Type 'quick' for another game against the bot.");
        }
    }
    out
}

fn render_profile(profile: &PlayerProfile) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "── {} ── level {}", profile.username, profile.level);
    let _ = writeln!(out, "Total score:    {}", profile.total_score);
    let _ = writeln!(
        out,
        "Matches:        {} played, {} won, {} lost",
        profile.matches_played, profile.matches_won, profile.matches_lost
    );
    let _ = writeln!(out, "Win rate:       {:.1}%", profile.win_rate);
    if let Some(created_at) = &profile.created_at {
        let _ = writeln!(out, "Member since:   {created_at}");
    }
    out
}

fn render_history(history: &MatchHistory) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "── {} ── {} matches", history.username, history.match_count);
    if history.matches.is_empty() {
        let _ = writeln!(out, "No finished matches yet");
    }
    for entry in &history.matches {
        let opponent = entry.opponent_of(&history.username);
        let result = entry.your_result.as_deref().unwrap_or("-");
        let scores = format!(
            "{}-{}",
            entry.scores.get(&history.username).copied().unwrap_or(0),
            entry.scores.get(opponent).copied().unwrap_or(0)
        );
        let _ = write!(out, "{}  vs {opponent:<12} {result:<5} {scores}", entry.match_id);
        if let Some(end_time) = &entry.end_time {
            let _ = write!(out, "  {end_time}");
        }
        let _ = writeln!(out);
    }
    out
}

fn render_deck() -> String {
    let mut out = String::new();
    for (i, card) in deck().enumerate() {
        let _ = write!(out, "{:>2}:{card} ", card.id);
        if (i + 1) % 10 == 0 {
            let _ = writeln!(out);
        }
    }
    out
}
