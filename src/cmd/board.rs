//! Board view and move commands: `leadflow board`, `leadflow move`.

use std::sync::Arc;

use anyhow::{Context, Result};
use console::style;
use leadflow::backend;
use leadflow::board::{
    Column, DiscardReason, DragEndEvent, DragOutcome, InMemorySnapshotStore, PipelineBoard,
};
use leadflow::config::LeadflowConfig;
use leadflow::{LeadId, LeadStatus};

async fn open_board(config: &LeadflowConfig) -> Result<PipelineBoard> {
    let backend = backend::from_config(config).context("Failed to set up lead backend")?;
    let board = PipelineBoard::new(
        Arc::new(InMemorySnapshotStore::new()),
        backend,
        config.pipeline(),
    );
    let source = if config.demo {
        "demo pipeline".to_string()
    } else {
        config.backend().base_url.clone()
    };
    board
        .refresh()
        .await
        .with_context(|| format!("Failed to load leads from {}", source))?;
    Ok(board)
}

/// Accepts `quote_sent`, `quote-sent` and `QUOTE_SENT`.
fn parse_status(value: &str) -> Result<LeadStatus> {
    value
        .trim()
        .to_uppercase()
        .replace('-', "_")
        .parse::<LeadStatus>()
        .map_err(anyhow::Error::msg)
}

fn print_column(status: LeadStatus, column: &Column, highlight: Option<&LeadId>) {
    println!(
        "{} {}",
        style(status.as_str()).bold().cyan(),
        style(format!("({})", column.len())).dim()
    );
    if column.is_empty() {
        println!("  {}", style("(empty)").dim());
    }
    for record in column.iter() {
        let line = format!("  {:>3}  {}", record.position, record.id);
        if highlight == Some(&record.id) {
            println!("{}", style(line).green().bold());
        } else {
            println!("{}", line);
        }
    }
    println!();
}

pub async fn cmd_board(config: &LeadflowConfig, status: Option<&str>) -> Result<()> {
    let only = status.map(parse_status).transpose()?;
    let board = open_board(config).await?;
    let snapshot = board.snapshot();

    println!();
    println!("{}", style("Lead Pipeline").bold());
    println!("─────────────");
    for (status, column) in snapshot.columns() {
        if only.is_some_and(|only| only != status) {
            continue;
        }
        print_column(status, column, None);
    }
    if only.is_none() {
        println!("{} leads", snapshot.len());
    }

    board.teardown();
    Ok(())
}

pub async fn cmd_move(config: &LeadflowConfig, lead_id: &str, target: &str) -> Result<()> {
    let board = open_board(config).await?;
    let lead = LeadId::new(lead_id);
    let origin = board.snapshot().locate(&lead).map(|(status, _)| status);

    board.on_drag_start(&lead);
    board.on_drag_over(target);
    let handle = match board.on_drag_end(DragEndEvent::new(lead_id, Some(target))) {
        DragOutcome::Committing(handle) => handle,
        DragOutcome::Discarded(DiscardReason::NoOp) => {
            println!("{} is already there", lead);
            return Ok(());
        }
        DragOutcome::Discarded(reason) => {
            anyhow::bail!("Move of {} discarded: {}", lead, reason);
        }
    };

    let command = handle.command.clone();
    println!(
        "Committing {} → {}[{}] {}",
        style(&command.lead_id).bold(),
        command.target_status,
        command.target_index,
        style(format!("(ticket {})", handle.ticket)).dim()
    );

    let settled = handle
        .settled()
        .await
        .context("Board closed before the commit settled")?;

    if settled.success {
        println!("{}", style("Committed").green().bold());
    } else {
        println!("{}", style("Rejected by the backend; reverted").red().bold());
    }
    if settled.refreshed_version.is_none() {
        println!(
            "{}",
            style("Warning: refetch failed; showing the last known board").yellow()
        );
    }
    println!();

    let snapshot = board.snapshot();
    let mut shown = Vec::new();
    for status in origin.into_iter().chain([command.target_status]) {
        if !shown.contains(&status) {
            print_column(status, snapshot.column(status), Some(&lead));
            shown.push(status);
        }
    }

    board.teardown();
    if !settled.success {
        anyhow::bail!("Move of {} was rejected", lead);
    }
    Ok(())
}
