//! Command implementations for challengectl.

use anyhow::{bail, Result};
use challenge_common::seed::canonical_date;
use challenge_common::week::DayPosition;
use challenge_common::{
    ChallengeConfig, CompletionEngine, DailyBoard, NotificationKind, Notifier, WeekDay,
};
use chrono::{Datelike, NaiveDate};
use owo_colors::OwoColorize;
use std::io::{self, Write};
use std::sync::Arc;

const THIN_SEP: &str = "------------------------------------------------------------";

/// Prints notifications straight to the terminal
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str, kind: NotificationKind) {
        match kind {
            NotificationKind::Success => println!("  {}", message.green().bold()),
            NotificationKind::Info => println!("  {}", message.yellow()),
        }
    }
}

/// Shared state for one invocation
pub struct Context {
    engine: CompletionEngine,
    date: NaiveDate,
    json: bool,
}

impl Context {
    pub fn new(config: ChallengeConfig, date: NaiveDate, json: bool) -> Self {
        let notifier: Arc<dyn Notifier> = if json {
            Arc::new(challenge_common::TracingNotifier)
        } else {
            Arc::new(ConsoleNotifier)
        };
        Self {
            engine: CompletionEngine::from_config(&config, notifier),
            date,
            json,
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_header(title: &str, date: NaiveDate) {
    println!();
    println!("  {}  {}", title.bold(), canonical_date(date).dimmed());
    println!("{}", THIN_SEP);
}

pub async fn today(ctx: &Context) -> Result<()> {
    let board = ctx.engine.board(ctx.date).await;
    if ctx.json {
        return print_json(&board.today);
    }

    print_header("Today's Challenge", ctx.date);
    print_today(&board);
    println!();
    Ok(())
}

fn print_today(board: &DailyBoard) {
    let challenge = &board.today.challenge;
    if board.completed {
        println!("  {} {}", "[done]".green(), challenge.title.bold());
        println!("  +{} points earned. Come back tomorrow!", challenge.reward);
    } else {
        println!("  {} (+{} pts)", challenge.title.bold(), challenge.reward);
        println!("  {}", challenge.description);
        println!("  Start at: {}", challenge.link.cyan());
    }
}

pub async fn week(ctx: &Context) -> Result<()> {
    let board = ctx.engine.board(ctx.date).await;
    if ctx.json {
        return print_json(&board.week);
    }

    print_header("This Week", ctx.date);
    for day in &board.week {
        println!(
            "  {} {:>2}  {}  {}",
            day.name,
            day.instance.date.day(),
            day_mark(day),
            day.instance.challenge.title
        );
    }
    println!();
    Ok(())
}

fn day_mark(day: &WeekDay) -> String {
    if day.completed {
        "[x]".green().to_string()
    } else {
        match day.position {
            DayPosition::Past => "[-]".red().to_string(),
            DayPosition::Today => "[ ]".yellow().to_string(),
            DayPosition::Future => "[.]".dimmed().to_string(),
        }
    }
}

pub async fn complete(ctx: &Context) -> Result<()> {
    let result = ctx.engine.complete_daily(ctx.date).await;
    if ctx.json {
        return match result {
            Ok(outcome) => print_json(&outcome),
            Err(already) => print_json(&serde_json::json!({ "already_completed": already.key })),
        };
    }

    println!();
    match result {
        Ok(outcome) => {
            if ctx.engine.celebration().is_active() {
                println!("  {}", "*** Challenge Completed! ***".yellow().bold());
            }
            if !outcome.persisted {
                println!("  {}", "Warning: progress could not be saved".red());
            }
        }
        Err(already) => {
            println!("  Already completed today ({}).", already.key.dimmed());
        }
    }
    println!();
    Ok(())
}

pub async fn status(ctx: &Context) -> Result<()> {
    let board = ctx.engine.board(ctx.date).await;
    if ctx.json {
        return print_json(&board);
    }

    print_header("Daily Challenge", ctx.date);
    println!("{}", "[PROGRESS]".cyan());
    println!("  Points:  {}", board.total_points);
    println!("  Streak:  {} days", board.streak);
    println!("  Level:   {}", board.level);
    println!();

    println!("{}", "[TODAY]".cyan());
    print_today(&board);
    println!();

    println!("{}", "[REWARDS]".cyan());
    for status in &board.tiers {
        let mark = if status.unlocked {
            "[x]".green().to_string()
        } else {
            "[ ]".dimmed().to_string()
        };
        println!(
            "  {} {} {}  (Level {}, {} points)",
            mark,
            status.tier.badge,
            status.tier.name,
            status.tier.level,
            status.tier.points_required()
        );
    }
    println!("{}", THIN_SEP);
    println!();
    Ok(())
}

pub async fn reset(ctx: &Context, force: bool) -> Result<()> {
    if !force && !confirm("Type 'reset' to clear all challenge progress: ")? {
        println!("  Aborted.");
        return Ok(());
    }

    if let Err(e) = ctx.engine.reset().await {
        bail!("Failed to clear progress: {}", e);
    }
    if ctx.json {
        return print_json(&serde_json::json!({ "reset": true }));
    }
    println!("  Progress cleared.");
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("  {}", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(answer.trim() == "reset")
}
