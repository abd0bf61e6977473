use std::sync::Arc;

use colored::Colorize;
use roster_backend::KeyedBackend;
use roster_list::{EventStream, MapList, RosterList, ShareList, VecList, VecMapList};
use roster_store::InMemorySharedStore;
use roster_types::ChangeEvent;
use serde::Serialize;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{info, warn};

use crate::cli::*;
use crate::script::{load_config, load_script, Op, Outcome, Record};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Replay(args) => cmd_replay(args, &cli.format),
        Command::Check(args) => cmd_check(args, &cli.format),
    }
}

/// The result of one script step.
#[derive(Debug, Serialize)]
pub struct Step {
    pub index: usize,
    pub op: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub events: Vec<ChangeEvent>,
}

/// Everything a replay produced.
#[derive(Debug, Serialize)]
pub struct Report {
    pub steps: Vec<Step>,
    pub items: Vec<Record>,
    pub has_more: bool,
    pub failed: usize,
}

/// Collect what the list broadcast during one step. A step that outruns
/// the channel buffer keeps its newest events and logs how many were lost.
fn drain_step(stream: &mut EventStream, index: usize) -> Vec<ChangeEvent> {
    let mut events = Vec::new();
    loop {
        match stream.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Lagged(skipped)) => {
                warn!(index, skipped, "step events overflowed the buffer");
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return events,
        }
    }
}

/// Apply `ops` to `list` in order, capturing the events of every step.
///
/// A failing step is recorded and skipped unless `strict` is set, in which
/// case the replay stops with that step's error.
pub fn replay<B>(mut list: RosterList<B>, ops: Vec<Op>, strict: bool) -> anyhow::Result<Report>
where
    B: KeyedBackend<Item = Record>,
{
    let mut stream = list.subscribe();

    let mut steps = Vec::with_capacity(ops.len());
    let mut failed = 0;
    for (index, op) in ops.into_iter().enumerate() {
        let name = op.name();
        let result = op.apply(&mut list);
        let events = drain_step(&mut stream, index);
        let step = match result {
            Ok(outcome) => Step {
                index,
                op: name,
                outcome: Some(outcome),
                error: None,
                events,
            },
            Err(e) if strict => {
                return Err(anyhow::Error::new(e).context(format!("step {index} ({name}) failed")));
            }
            Err(e) => {
                warn!(index, op = name, error = %e, "step failed");
                failed += 1;
                Step {
                    index,
                    op: name,
                    outcome: None,
                    error: Some(e.to_string()),
                    events,
                }
            }
        };
        steps.push(step);
    }

    info!(list = %list.id(), steps = steps.len(), failed, "replay finished");
    Ok(Report {
        steps,
        items: list.to_vec()?,
        has_more: list.has_more(),
        failed,
    })
}

fn cmd_replay(args: ReplayArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let ops = load_script(&args.script)?;
    let config = load_config(args.config.as_deref())?;
    let report = match args.backend {
        BackendKind::Vec => replay(VecList::<Record>::with_config(config), ops, args.strict)?,
        BackendKind::VecMap => {
            replay(VecMapList::<Record>::with_config(config), ops, args.strict)?
        }
        BackendKind::Map => replay(MapList::<Record>::with_config(config), ops, args.strict)?,
        BackendKind::Share => {
            let store = Arc::new(InMemorySharedStore::<Record>::new());
            replay(ShareList::<Record>::shared(store, config), ops, args.strict)?
        }
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report, args.events),
    }
    Ok(())
}

fn print_report(report: &Report, events: bool) {
    for step in &report.steps {
        match (&step.outcome, &step.error) {
            (Some(outcome), _) => println!(
                "{} [{}] {} {}",
                "✓".green(),
                step.index,
                step.op.bold(),
                outcome.to_string().dimmed()
            ),
            (None, error) => println!(
                "{} [{}] {} {}",
                "✗".red().bold(),
                step.index,
                step.op.bold(),
                error.as_deref().unwrap_or("failed").red()
            ),
        }
        if events {
            for event in &step.events {
                println!("      {}", event.to_string().cyan());
            }
        }
    }

    println!();
    let more = if report.has_more {
        " (more available)".yellow().to_string()
    } else {
        String::new()
    };
    println!("{} items{}", report.items.len().to_string().bold(), more);
    for (pos, record) in report.items.iter().enumerate() {
        println!("  {:>3}  {} = {}", pos, record.key.yellow(), record.value);
    }
    if report.failed > 0 {
        println!("{} {} step(s) failed", "!".red().bold(), report.failed);
    }
}

fn cmd_check(args: CheckArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let ops = load_script(&args.script)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&ops)?),
        OutputFormat::Text => {
            println!(
                "{} {} operation(s) in {}",
                "✓".green().bold(),
                ops.len(),
                args.script.display().to_string().bold()
            );
            for (index, op) in ops.iter().enumerate() {
                println!("  [{}] {}", index, op.name());
            }
        }
    }
    Ok(())
}
