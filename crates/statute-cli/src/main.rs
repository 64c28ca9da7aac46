//! `statute` command-line interface.
//!
//! Thin wrapper over the evaluator: every subcommand loads a bundle,
//! runs one operation, and prints a JSON report.

#![forbid(unsafe_code)]

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use statute_engine::{EntityStateMap, Evaluator};

#[derive(Debug, Parser)]
#[command(name = "statute", version, about = "Deterministic policy bundle evaluator")]
struct Cli {
    /// Path to the bundle JSON file.
    #[arg(long, global = true, default_value = "bundle.json")]
    bundle: Utf8PathBuf,

    /// Write the JSON report here instead of stdout.
    #[arg(long, global = true)]
    output: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load and validate a bundle, reporting its construct counts.
    Validate,
    /// Evaluate all rules over a fact set and print the verdicts.
    Evaluate {
        /// Path to a JSON object of fact values.
        #[arg(long)]
        facts: Option<Utf8PathBuf>,
    },
    /// Compute the action space for a persona.
    Actions {
        #[arg(long)]
        facts: Option<Utf8PathBuf>,
        /// Path to a JSON object of entity id -> current state.
        #[arg(long)]
        entity_states: Option<Utf8PathBuf>,
        #[arg(long)]
        persona: String,
    },
    /// Simulate one flow end to end.
    Simulate {
        #[arg(long)]
        flow: String,
        #[arg(long)]
        facts: Option<Utf8PathBuf>,
        #[arg(long)]
        entity_states: Option<Utf8PathBuf>,
        #[arg(long)]
        persona: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let bundle_text = std::fs::read_to_string(&cli.bundle)
        .with_context(|| format!("reading bundle from {}", cli.bundle))?;
    let evaluator = Evaluator::from_str(&bundle_text)
        .with_context(|| format!("loading bundle from {}", cli.bundle))?;

    let report = match &cli.command {
        Command::Validate => {
            let bundle = evaluator.bundle();
            serde_json::json!({
                "id": bundle.id,
                "tenor": bundle.tenor,
                "tenor_version": bundle.tenor_version,
                "facts": bundle.facts.len(),
                "entities": bundle.entities.len(),
                "rules": bundle.rules.len(),
                "operations": bundle.operations.len(),
                "flows": bundle.flows.len(),
            })
        }
        Command::Evaluate { facts } => {
            let facts = read_json(facts.as_ref(), "facts")?;
            let verdicts = evaluator.evaluate(&facts).context("evaluating rules")?;
            verdicts.to_json()
        }
        Command::Actions {
            facts,
            entity_states,
            persona,
        } => {
            let facts = read_json(facts.as_ref(), "facts")?;
            let states = read_entity_states(entity_states.as_ref())?;
            let space = evaluator
                .compute_action_space(&facts, &states, persona)
                .context("computing action space")?;
            serde_json::to_value(&space).context("serializing action space")?
        }
        Command::Simulate {
            flow,
            facts,
            entity_states,
            persona,
        } => {
            let facts = read_json(facts.as_ref(), "facts")?;
            let states = read_entity_states(entity_states.as_ref())?;
            let result = evaluator
                .execute_flow(flow, &facts, &states, persona)
                .with_context(|| format!("simulating flow '{flow}'"))?;
            serde_json::to_value(&result).context("serializing flow result")?
        }
    };

    let rendered = serde_json::to_string_pretty(&report).context("rendering report")?;
    match &cli.output {
        Some(path) => std::fs::write(path, rendered + "\n")
            .with_context(|| format!("writing report to {path}"))?,
        None => println!("{rendered}"),
    }
    Ok(())
}

/// Read a JSON file, defaulting to an empty object when no path is given.
fn read_json(path: Option<&Utf8PathBuf>, what: &str) -> anyhow::Result<serde_json::Value> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {what} from {path}"))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {what} from {path}"))
        }
        None => Ok(serde_json::json!({})),
    }
}

fn read_entity_states(path: Option<&Utf8PathBuf>) -> anyhow::Result<EntityStateMap> {
    let value = read_json(path, "entity states")?;
    let obj = value
        .as_object()
        .context("entity states must be a JSON object")?;
    obj.iter()
        .map(|(entity_id, state)| {
            let state = state
                .as_str()
                .with_context(|| format!("state for entity '{entity_id}' must be a string"))?;
            Ok((entity_id.clone(), state.to_string()))
        })
        .collect()
}
