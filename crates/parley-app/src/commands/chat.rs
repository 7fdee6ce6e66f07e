//! Interactive conversation loop and the `ping` check.

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use parley_ai::{GenerationClient, Message, SharedClient, TurnEvent};
use parley_common::ParleyError;
use parley_config::Parameter;
use parley_history::HistoryStore;
use parley_session::{SessionSettings, SessionState};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use super::history::format_summary;
use super::Context;

const HELP: &str = "\
Commands:
  /new                 start a new conversation
  /resume ID           continue a saved conversation
  /list                list saved conversations
  /rename TITLE        retitle this conversation
  /delete              delete this conversation and start over
  /endpoint NAME|URL   switch endpoint
  /set PARAM VALUE     set temperature, top_p or max_tokens
  /help                show this help
  /quit                save and exit
Ctrl-C stops a reply in progress; pressed while idle it exits.";

#[derive(Debug, PartialEq)]
enum Input {
    Message(String),
    Command(SlashCommand),
}

#[derive(Debug, PartialEq)]
enum SlashCommand {
    New,
    Resume(String),
    List,
    Rename(String),
    Delete,
    Endpoint(String),
    Set(String, String),
    Help,
    Quit,
    Unknown(String),
}

fn parse_input(line: &str) -> Option<Input> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let Some(command) = trimmed.strip_prefix('/') else {
        return Some(Input::Message(line.trim_end_matches(['\r', '\n']).to_string()));
    };

    let (name, rest) = command
        .split_once(char::is_whitespace)
        .map(|(n, r)| (n, r.trim()))
        .unwrap_or((command, ""));
    let cmd = match (name, rest) {
        ("new", _) => SlashCommand::New,
        ("list", _) => SlashCommand::List,
        ("delete", _) => SlashCommand::Delete,
        ("help", _) => SlashCommand::Help,
        ("quit" | "exit", _) => SlashCommand::Quit,
        ("resume", id) if !id.is_empty() => SlashCommand::Resume(id.to_string()),
        ("rename", title) if !title.is_empty() => SlashCommand::Rename(title.to_string()),
        ("endpoint", target) if !target.is_empty() => SlashCommand::Endpoint(target.to_string()),
        ("set", args) => match args.split_once(char::is_whitespace) {
            Some((param, value)) => SlashCommand::Set(param.to_string(), value.trim().to_string()),
            None => SlashCommand::Unknown(trimmed.to_string()),
        },
        _ => SlashCommand::Unknown(trimmed.to_string()),
    };
    Some(Input::Command(cmd))
}

/// Lines from stdin, read on a plain thread that runtime shutdown does not
/// wait for.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn flush_stdout() {
    let _ = std::io::stdout().flush();
}

fn print_event(event: &TurnEvent) {
    match event {
        TurnEvent::Delta(delta) => print!("{delta}"),
        TurnEvent::Restart { attempt, reason } => {
            print!("\n[{reason}; retrying, attempt {attempt}]\nAssistant: ")
        }
        TurnEvent::Failed(text) => print!("\n{text}"),
    }
    flush_stdout();
}

pub async fn run(ctx: &Context, resume: Option<String>) -> Result<(), ParleyError> {
    let client = ctx.client()?;
    let history = Arc::new(ctx.titled_history(&client).await?);
    let mut state = SessionState::new(
        history.clone(),
        SessionSettings::from_config(&ctx.config.snapshot()),
    );

    if let Some(id) = resume {
        if !state.resume(&id).await? {
            return Err(ParleyError::Other(format!(
                "no saved conversation with id {id}"
            )));
        }
        println!(
            "Resumed \"{}\" ({} turns)",
            state.record().display_title(),
            state.record().turns.len()
        );
    }
    println!(
        "Parley {} talking to {}. Type /help for commands.",
        env!("CARGO_PKG_VERSION"),
        ctx.config.current_endpoint()
    );

    let (quit_tx, mut quit_rx) = mpsc::unbounded_channel();
    let control = state.control();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if !control.stop() && quit_tx.send(()).is_err() {
                break;
            }
        }
    });

    let mut lines = spawn_stdin_reader();
    loop {
        state.check_pending_saves().await;
        print!("\nYou: ");
        flush_stdout();

        let Some(line) = next_line(&mut state, &mut lines, &mut quit_rx).await else {
            println!();
            break;
        };

        match parse_input(&line) {
            None => {}
            Some(Input::Message(text)) => send(ctx, &mut state, &client, &text).await,
            Some(Input::Command(cmd)) => {
                if !handle(ctx, &mut state, &client, &history, cmd).await {
                    break;
                }
            }
        }
    }

    if !state.flush().await {
        eprintln!("warning: the conversation could not be saved");
    }
    tracing::info!("chat ended");
    Ok(())
}

/// Wait for the next input line, retrying a pending save once per cooldown
/// in the meantime. `None` when stdin closes or quitting was requested.
async fn next_line(
    state: &mut SessionState,
    lines: &mut mpsc::UnboundedReceiver<String>,
    quit: &mut mpsc::UnboundedReceiver<()>,
) -> Option<String> {
    let period = state
        .settings()
        .retry_cooldown
        .max(Duration::from_millis(100));
    let mut ticks = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            line = lines.recv() => return line,
            Some(()) = quit.recv() => return None,
            _ = ticks.tick() => {
                state.check_pending_saves().await;
            }
        }
    }
}

async fn send(ctx: &Context, state: &mut SessionState, client: &SharedClient, text: &str) {
    state.set_settings(SessionSettings::from_config(&ctx.config.snapshot()));
    print!("Assistant: ");
    flush_stdout();

    let result = state
        .submit(
            Arc::new(client.clone()),
            ctx.config.parameters(),
            text,
            print_event,
        )
        .await;
    match result {
        Err(e) => println!("\n! {e}"),
        Ok(outcome) => {
            println!();
            if outcome.stopped() {
                println!("[stopped]");
            }
            if state.has_pending_save() {
                println!("[not saved yet; will retry]");
            }
        }
    }
}

/// Returns `false` when the loop should end.
async fn handle(
    ctx: &Context,
    state: &mut SessionState,
    client: &SharedClient,
    history: &HistoryStore,
    cmd: SlashCommand,
) -> bool {
    if cmd == SlashCommand::Quit {
        return false;
    }
    let result: Result<(), ParleyError> = async {
        match cmd {
            SlashCommand::Quit => {}
            SlashCommand::Help => println!("{HELP}"),
            SlashCommand::New => {
                state.new_conversation().await?;
                println!("Started a new conversation.");
            }
            SlashCommand::Resume(id) => {
                if state.resume(&id).await? {
                    println!(
                        "Resumed \"{}\" ({} turns)",
                        state.record().display_title(),
                        state.record().turns.len()
                    );
                } else {
                    println!("No saved conversation {id}");
                }
            }
            SlashCommand::List => {
                for summary in history.list().await? {
                    println!("{}", format_summary(&summary));
                }
            }
            SlashCommand::Rename(title) => {
                state.rename(&title).await?;
                println!("Title: {}", state.record().display_title());
            }
            SlashCommand::Delete => {
                state.delete().await?;
                println!("Deleted; started a new conversation.");
            }
            SlashCommand::Endpoint(target) => {
                let address = ctx.switch_endpoint(client, &target)?;
                println!("Now using {address}");
            }
            SlashCommand::Set(param, value) => {
                let param: Parameter = param.parse()?;
                let value: f64 = value
                    .parse()
                    .map_err(|_| ParleyError::Other(format!("not a number: {value}")))?;
                let params = ctx.config.update_parameter(param, value)?;
                println!(
                    "temperature={} top_p={} max_tokens={}",
                    params.temperature, params.top_p, params.max_tokens
                );
            }
            SlashCommand::Unknown(input) => println!("Unknown command {input}; try /help"),
        }
        Ok(())
    }
    .await;

    if let Err(e) = result {
        println!("! {e}");
    }
    true
}

/// Send one message without a session and stream the reply to stdout.
pub async fn ping(ctx: &Context, message: Option<&str>) -> Result<(), ParleyError> {
    let client = ctx.client()?;
    let message = message.unwrap_or("Hello! Can you hear me?");
    let messages = vec![
        Message::system(ctx.config.system_message()),
        Message::user(message),
    ];

    let started = Instant::now();
    let mut stream = client
        .stream_chat(&messages, &ctx.config.parameters())
        .await?;
    let mut chars = 0usize;
    while let Some(delta) = stream.next().await {
        let delta = delta?;
        chars += delta.chars().count();
        print!("{delta}");
        flush_stdout();
    }
    println!(
        "\n[{} answered {} chars in {:.1}s]",
        ctx.config.current_endpoint(),
        chars,
        started.elapsed().as_secs_f64()
    );
    Ok(())
}
