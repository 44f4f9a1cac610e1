// SPDX-FileCopyrightText: © 2024-2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tdx_artifact_verifier::{
    default_search_roots, TdxHardwareStatus, VerificationResult, Verifier,
};
use tracing::info;

/// TDX attestation artifact verifier
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Seconds allowed for a single JSON parse
    #[arg(long, default_value_t = 5)]
    parse_timeout_secs: u64,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Structurally verify a single attestation artifact
    Verify(VerifyArgs),
    /// Discover and verify all known artifacts, writing a JSON report
    VerifyAll(VerifyAllArgs),
}

#[derive(Parser)]
struct VerifyArgs {
    /// artifact kind
    #[arg(value_enum)]
    kind: KindArg,

    /// path to the artifact file
    path: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Evidence,
    Token,
    Quote,
}

#[derive(Parser)]
struct VerifyAllArgs {
    /// directory to search for artifacts (repeatable; defaults to "." and "output")
    #[arg(long = "root")]
    roots: Vec<PathBuf>,

    /// where to write the JSON report
    #[arg(long, default_value = "verification-report.json")]
    report: PathBuf,

    /// JSON file with externally detected TDX hardware status to embed in the report
    #[arg(long)]
    tdx_status: Option<PathBuf>,
}

fn print_result(result: &VerificationResult) -> Result<()> {
    let mark = if result.valid { "✓" } else { "✗" };
    let detail = match (result.error, result.format) {
        (Some(code), _) => code.as_str().to_string(),
        (None, Some(format)) => format!("valid {} {}", format.as_str(), result.kind.as_str()),
        (None, None) => format!("valid {}", result.kind.as_str()),
    };
    println!("{mark} {}: {detail}", result.file);
    println!(
        "{}",
        serde_json::to_string_pretty(result).context("Failed to serialize result")?
    );
    Ok(())
}

fn cmd_verify(verifier: &Verifier, args: VerifyArgs) -> Result<()> {
    let result = match args.kind {
        KindArg::Evidence => verifier.verify_evidence(&args.path),
        KindArg::Token => verifier.verify_token(&args.path),
        KindArg::Quote => verifier.verify_quote(&args.path),
    };
    print_result(&result)?;
    if let Some(code) = result.error {
        bail!("verification failed: {}", code.as_str());
    }
    Ok(())
}

fn cmd_verify_all(mut verifier: Verifier, args: VerifyAllArgs) -> Result<()> {
    if let Some(path) = &args.tdx_status {
        let content = fs_err::read_to_string(path).context("Failed to read TDX status file")?;
        let status: TdxHardwareStatus =
            serde_json::from_str(&content).context("Failed to parse TDX status file")?;
        verifier = verifier.with_tdx_status(status);
    }

    let roots = if args.roots.is_empty() {
        default_search_roots()
    } else {
        args.roots.clone()
    };
    info!("searching {} roots for artifacts", roots.len());

    let report = verifier.verify_all(&roots);
    for result in &report.results {
        print_result(result)?;
    }

    report
        .write_to(&args.report)
        .context("Failed to write verification report")?;

    println!();
    println!("{}", report.conclusion);
    println!("Report written to {}", args.report.display());

    if !report.overall_valid() {
        bail!("no valid attestation artifacts found");
    }
    Ok(())
}

fn main() -> Result<()> {
    {
        use tracing_subscriber::{fmt, EnvFilter};
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt().with_env_filter(filter).init();
    }

    let cli = Cli::parse();
    let verifier = Verifier::new(Duration::from_secs(cli.parse_timeout_secs));

    match cli.command {
        Commands::Verify(args) => cmd_verify(&verifier, args),
        Commands::VerifyAll(args) => cmd_verify_all(verifier, args),
    }
}
