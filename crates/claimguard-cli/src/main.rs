//! CLI for the claimguard guardrail pipeline.
//!
//! Exposes the deterministic pieces over local files so operators and
//! CI can screen narratives, redact text, and replay the review
//! pipeline on captured model output without any external service.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use claimguard_core::{
    decision_from_json, review, ClaimRequest, GuardrailConfig, InputScreener, PolicyClause,
    Redactor,
};

#[derive(Parser)]
#[command(name = "claimguard", version, about = "Guardrails for AI-generated claim decisions")]
struct Cli {
    /// Path to a guardrail config file (YAML); defaults apply if omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Screen a narrative for adversarial patterns
    Screen {
        /// Narrative text; reads the file at --file instead when given
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,

        /// File containing the narrative
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Redact sensitive data from a text file
    Redact {
        /// File to redact
        file: PathBuf,
    },

    /// Report sensitive-data categories found in a text file
    Detect {
        /// File to scan
        file: PathBuf,
    },

    /// Replay the deterministic review pipeline on captured output
    Review {
        /// Claim request (JSON)
        #[arg(long)]
        claim: PathBuf,

        /// Raw model decision (JSON)
        #[arg(long)]
        decision: PathBuf,

        /// Retrieved clauses (JSON array)
        #[arg(long)]
        clauses: PathBuf,

        /// Supporting document text files, repeatable
        #[arg(long = "document")]
        documents: Vec<PathBuf>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => GuardrailConfig::from_yaml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => GuardrailConfig::default(),
    };

    match cli.command {
        Command::Screen { text, file } => {
            let narrative = match (text, file) {
                (Some(text), _) => text,
                (None, Some(path)) => fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                (None, None) => anyhow::bail!("provide --text or --file"),
            };

            let result = InputScreener::new().screen(&narrative);
            println!("{}", serde_json::to_string_pretty(&result)?);

            if result.is_valid {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }

        Command::Redact { file } => {
            let text =
                fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
            let redactor = Redactor::new();
            print!("{}", redactor.redact(&redactor.redact_narrative_terms(&text)));
            Ok(ExitCode::SUCCESS)
        }

        Command::Detect { file } => {
            let text =
                fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
            let counts = Redactor::new().detect_types(&text);
            println!("{}", serde_json::to_string_pretty(&counts)?);
            Ok(ExitCode::SUCCESS)
        }

        Command::Review {
            claim,
            decision,
            clauses,
            documents,
        } => {
            let request: ClaimRequest = read_json(&claim)?;
            request.validate().context("invalid claim request")?;

            let decision_value: serde_json::Value = read_json(&decision)?;
            let raw = decision_from_json(&decision_value).context("invalid model decision")?;

            let retrieved: Vec<PolicyClause> = read_json(&clauses)?;

            let mut supporting_texts = Vec::with_capacity(documents.len());
            for path in &documents {
                supporting_texts.push(
                    fs::read_to_string(path)
                        .with_context(|| format!("reading {}", path.display()))?,
                );
            }

            let outcome = review(&request, raw, &retrieved, &supporting_texts, &config);
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}
