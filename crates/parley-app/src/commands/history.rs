//! Offline commands over saved conversations.

use chrono::Local;
use parley_common::ParleyError;
use parley_history::{RecordStore, SessionRecord, SessionSummary};

use super::Context;

pub async fn list(ctx: &Context) -> Result<(), ParleyError> {
    let sessions = ctx.history().await?.list().await?;
    if sessions.is_empty() {
        println!("No saved conversations.");
        return Ok(());
    }
    for summary in &sessions {
        println!("{}", format_summary(summary));
    }
    Ok(())
}

pub async fn show(ctx: &Context, id: &str) -> Result<(), ParleyError> {
    let record = ctx
        .history()
        .await?
        .load(id)
        .await?
        .ok_or_else(|| not_found(id))?;
    print!("{}", format_transcript(&record));
    Ok(())
}

pub async fn rename(ctx: &Context, id: &str, title: &str) -> Result<(), ParleyError> {
    let record = ctx
        .history()
        .await?
        .rename(id, title)
        .await?
        .ok_or_else(|| not_found(id))?;
    println!("Renamed {id} to \"{}\"", record.display_title());
    Ok(())
}

pub async fn delete(ctx: &Context, id: &str) -> Result<(), ParleyError> {
    if ctx.history().await?.delete(id).await? {
        println!("Deleted {id}");
    } else {
        println!("No conversation {id}; nothing deleted");
    }
    Ok(())
}

fn not_found(id: &str) -> ParleyError {
    ParleyError::Other(format!("no saved conversation with id {id}"))
}

pub(super) fn format_summary(summary: &SessionSummary) -> String {
    format!(
        "{}  {}  {}",
        summary
            .last_modified_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M"),
        summary.id,
        summary.title
    )
}

fn format_transcript(record: &SessionRecord) -> String {
    let mut out = format!("# {}\n\n", record.display_title());
    for turn in &record.turns {
        out.push_str(&format!("You: {}\n", turn.user));
        match &turn.assistant {
            Some(reply) => out.push_str(&format!("Assistant: {reply}\n\n")),
            None => out.push_str("Assistant: (no reply)\n\n"),
        }
    }
    out
}
