//! One-shot planner run from the command line.
//!
//! The transcript file, when given, is loaded before the run and rewritten
//! afterwards so repeated invocations build up one consultation.

use anyhow::Context as _;
use clap::Parser;
use healthcare_planner::{
    Collaborators, LabDocument, PatientIntake, PlanRequest, Planner, Transcript, WorkflowVariant,
};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Diagnosis, treatment and compatibility suggestions for one patient.
#[derive(Parser, Debug)]
#[command(name = "plan", version, about, long_about = None)]
struct Cli {
    /// Symptoms, free text
    #[arg(long)]
    symptoms: String,

    #[arg(long, default_value = "")]
    medical_history: String,

    #[arg(long, default_value = "")]
    medications: String,

    /// Lab report PDF
    #[arg(long)]
    lab_report: Option<PathBuf>,

    /// base or extended
    #[arg(long, default_value = "extended")]
    variant: WorkflowVariant,

    /// JSON file holding the running transcript
    #[arg(long)]
    transcript: Option<PathBuf>,
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "healthcare_planner=info,chain_flow=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_transcript(path: &Path) -> anyhow::Result<Transcript> {
    if !path.exists() {
        return Ok(Transcript::new());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading transcript {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing transcript {}", path.display()))
}

fn save_transcript(path: &Path, transcript: &Transcript) -> anyhow::Result<()> {
    let raw = serde_json::to_string_pretty(transcript)?;
    std::fs::write(path, raw).with_context(|| format!("writing transcript {}", path.display()))
}

fn read_lab_report(path: &Path) -> anyhow::Result<LabDocument> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let document = LabDocument::from_bytes(
        file_name,
        &std::fs::read(path).with_context(|| format!("reading lab report {}", path.display()))?,
    );
    if !document.is_pdf() {
        anyhow::bail!("lab report {} is not a PDF", path.display());
    }
    Ok(document)
}

fn print_section(title: &str, body: &str) {
    println!("## {}\n\n{}\n", title, body);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    if cli.symptoms.trim().is_empty() {
        anyhow::bail!("--symptoms must not be empty");
    }

    let (_, planner) =
        Planner::bootstrap(|key| std::env::var(key).ok(), Collaborators::from_config)?;

    let transcript = match &cli.transcript {
        Some(path) => load_transcript(path)?,
        None => Transcript::new(),
    };
    let lab_report = cli.lab_report.as_deref().map(read_lab_report).transpose()?;

    let request = PlanRequest {
        intake: PatientIntake {
            symptoms: cli.symptoms,
            medical_history: cli.medical_history,
            current_medications: cli.medications,
        },
        lab_report,
        variant: cli.variant,
    };

    match planner.plan(request, transcript).await {
        Ok(outcome) => {
            if let Some(content) = &outcome.lab_content {
                print_section("Lab Report Content", content);
            }
            if let Some(summary) = &outcome.lab_summary {
                print_section("Lab Report Summary", summary);
            }
            if let Some(summary) = &outcome.wiki_summary {
                print_section("Wikipedia Summary", summary);
            }
            if let Some(summary) = &outcome.arxiv_summary {
                print_section("arXiv Summary", summary);
            }
            print_section("Diagnosis", &outcome.diagnosis);
            print_section("Suggested Treatments", &outcome.treatments);
            print_section("Compatibility Check", &outcome.compatibility);

            if let Some(path) = &cli.transcript {
                save_transcript(path, &outcome.transcript)?;
                info!(entries = outcome.transcript.entry_count(), "transcript saved");
            }
            Ok(())
        }
        Err(failure) => {
            error!("{}", failure);
            if let Some(path) = &cli.transcript {
                save_transcript(path, &failure.transcript)?;
            }
            Err(failure.into())
        }
    }
}
