//! notescrub: PHI detection, redaction, and zero-knowledge temporal
//! tokenization for clinical note text.

use clap::{Args, Parser, Subcommand};
use ns_core::{
    assemble_bundle, parse_date, run_detection, scan_for_leaks, DocumentSpec, MergeMode,
    MergePolicy, RedactionOptions, TemporalAnchor,
};
use serde::Deserialize;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::warn;

/// Clinical note PHI redaction.
#[derive(Parser)]
#[command(name = "notescrub")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Merge policy flags shared by detection commands.
#[derive(Args, Debug, Clone)]
struct PolicyOpts {
    /// How to combine detector outputs
    #[arg(long, value_enum, default_value_t = MergeMode::Union)]
    merge_mode: MergeMode,

    /// Drop machine spans below this confidence
    #[arg(long, default_value_t = 0.5)]
    confidence_threshold: f64,

    /// Leave provider/clinician names unredacted
    #[arg(long, env = "NOTESCRUB_PROTECT_PROVIDERS")]
    protect_providers: bool,
}

impl PolicyOpts {
    fn to_policy(&self) -> MergePolicy {
        MergePolicy::new(self.merge_mode)
            .with_confidence_threshold(self.confidence_threshold)
            .with_protect_providers(self.protect_providers)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Detect and redact PHI in a note
    Redact {
        /// Input file, or '-' for stdin
        input: String,

        /// Anchor date (e.g. 2024-06-01); enables relative-offset date
        /// tokens
        #[arg(long)]
        anchor: Option<String>,

        #[command(flatten)]
        policy: PolicyOpts,
    },

    /// Print detected spans as JSON
    Spans {
        /// Input file, or '-' for stdin
        input: String,

        #[command(flatten)]
        policy: PolicyOpts,
    },

    /// Leak-scan text; exits non-zero when residual dates remain
    Scan {
        /// Input file, or '-' for stdin
        input: String,
    },

    /// Assemble a multi-document bundle from a JSON spec
    Bundle {
        /// Spec file: {"anchor_date": ..., "documents": [...]}
        spec: PathBuf,

        #[command(flatten)]
        policy: PolicyOpts,
    },
}

#[derive(Debug, Deserialize)]
struct BundleSpecFile {
    anchor_date: String,
    documents: Vec<DocumentSpec>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Redact {
            input,
            anchor,
            policy,
        } => {
            let text = read_input(&input)?;
            let options = match anchor {
                Some(raw) => {
                    let parsed = parse_date(&raw);
                    let date = parsed.date.ok_or_else(|| {
                        format!(
                            "invalid anchor date '{}': {}",
                            raw,
                            parsed.warning.unwrap_or_default()
                        )
                    })?;
                    RedactionOptions::anchored(TemporalAnchor::new(date))
                }
                None => RedactionOptions::generic(),
            };
            let mut session = run_detection(&text, policy.to_policy());
            let outcome = session.finalize_and_redact(&options);
            for warning in &outcome.warnings {
                warn!(span = %warning.id, label = %warning.label, "{}", warning.message);
            }
            println!("{}", outcome.text);
            Ok(ExitCode::SUCCESS)
        }

        Commands::Spans { input, policy } => {
            let text = read_input(&input)?;
            let session = run_detection(&text, policy.to_policy());
            println!("{}", serde_json::to_string_pretty(session.spans())?);
            Ok(ExitCode::SUCCESS)
        }

        Commands::Scan { input } => {
            let text = read_input(&input)?;
            let result = scan_for_leaks(&text);
            println!("{}", serde_json::to_string_pretty(&result)?);
            if result.is_clean() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }

        Commands::Bundle { spec, policy } => {
            let raw = std::fs::read_to_string(&spec)?;
            let spec_file: BundleSpecFile = serde_json::from_str(&raw)?;
            let bundle =
                assemble_bundle(spec_file.documents, &spec_file.anchor_date, &policy.to_policy())?;
            println!("{}", serde_json::to_string_pretty(&bundle)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn read_input(input: &str) -> std::io::Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(input)
    }
}
