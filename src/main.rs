use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use mc_discover::config::Settings;
use mc_discover::scanner::{self, LOOPBACK};
use mc_discover::types::{DiscoveryReport, ProbeReport};
use mc_discover::{server, verifier};

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// mc-discover — find the local Minecraft Java server port and verify it with a status ping.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mc-discover",
    version,
    about = "Find the local Minecraft Java server port and verify it with a status ping.",
    long_about = None
)]
struct Cli {
    /// Path to a JSON settings file. Missing file means defaults.
    #[arg(long, default_value = "mc-discover.json")]
    config: PathBuf,

    /// Probe timeout in milliseconds (connect and exchange each).
    #[arg(long = "timeout-ms")]
    timeout_ms: Option<u64>,

    /// Candidates probed at once; 1 probes them in order.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Substring of the server process's executable name.
    #[arg(long = "process-marker")]
    process_marker: Option<String>,

    /// Substring of one of the server process's arguments.
    #[arg(long = "argument-marker")]
    argument_marker: Option<String>,

    /// Probe a single loopback port instead of scanning.
    #[arg(long)]
    probe: Option<u16>,

    /// Write the report as pretty JSON to this path (optional).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Serve the discovery API instead of running once.
    #[arg(long, default_value_t = false)]
    serve: bool,

    /// Debug logging (overridden by RUST_LOG).
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

impl Cli {
    fn apply(&self, settings: &mut Settings) {
        if let Some(ms) = self.timeout_ms {
            settings.timeout_ms = ms;
        }
        if let Some(n) = self.concurrency {
            settings.concurrency = n;
        }
        if let Some(m) = &self.process_marker {
            settings.process_marker = m.clone();
        }
        if let Some(m) = &self.argument_marker {
            settings.argument_marker = m.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut settings = Settings::load_or_default(&cli.config)?;
    cli.apply(&mut settings);
    let options = settings.scan_options();

    if cli.serve {
        println!("Discovery API on http://{} (Ctrl+C to stop)", settings.bind);
        tokio::select! {
            res = server::spawn_server(&settings.bind, options) => res?,
            _ = tokio::signal::ctrl_c() => {}
        }
        return Ok(ExitCode::SUCCESS);
    }

    if let Some(port) = cli.probe {
        let report = verifier::probe_report(LOOPBACK, port, options.timeout).await;
        print_probe(&report);
        if let Some(path) = cli.output.as_deref() {
            write_json(path, &report);
        }
        return Ok(if report.verified {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let report = scanner::discover(&options).await;
    print_candidates_table(&report);
    if let Some(path) = cli.output.as_deref() {
        write_json(path, &report);
    }

    match report.port {
        Some(port) => {
            println!("\nMinecraft server verified on port {port}");
            Ok(ExitCode::SUCCESS)
        }
        None => {
            print_not_found_banner();
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_probe(report: &ProbeReport) {
    match (&report.status, &report.error) {
        (Some(status), _) => {
            println!("{}:{} speaks the status protocol", LOOPBACK, report.port);
            println!("  description : {}", status.description);
            let players = match (status.players_online, status.players_max) {
                (Some(online), Some(max)) => format!("{online}/{max}"),
                (Some(online), None) => online.to_string(),
                _ => "<unknown>".to_string(),
            };
            println!("  players     : {players}");
            println!(
                "  version     : {}",
                status.version.as_deref().unwrap_or("<unknown>")
            );
        }
        (None, err) => {
            println!(
                "{}:{} did not verify: {}",
                LOOPBACK,
                report.port,
                err.as_deref().unwrap_or("unknown error")
            );
        }
    }
}

fn print_candidates_table(report: &DiscoveryReport) {
    if report.candidates.is_empty() {
        println!("No listening process matched the candidate filter.");
        return;
    }

    let pid_w = 3usize.max(
        report
            .candidates
            .iter()
            .map(|c| c.pid.to_string().len())
            .max()
            .unwrap_or(0),
    );
    let port_w = 5usize;
    let name_w = 7usize.max(
        report
            .candidates
            .iter()
            .map(|c| c.process_name.len())
            .max()
            .unwrap_or(0),
    );

    println!("Candidates: {}", report.candidates.len());
    println!(
        "{:>pid_w$}  {:>port_w$}  {:<name_w$}  {}",
        "pid", "port", "process", "verified"
    );
    println!("{:-<pid_w$}  {:-<port_w$}  {:-<name_w$}  {:-<8}", "", "", "", "");
    for c in &report.candidates {
        let verified = if report.port == Some(c.port) { "yes" } else { "" };
        println!(
            "{:>pid_w$}  {:>port_w$}  {:<name_w$}  {}",
            c.pid, c.port, c.process_name, verified
        );
    }
}

fn print_not_found_banner() {
    println!();
    println!("\x1b[41;33m************************************************************************* \x1b[0m");
    println!("\x1b[41;33m*** Unable to connect to Minecraft. Please make sure Minecraft is     *** \x1b[0m");
    println!("\x1b[41;33m*** running and that 'Open to LAN' has been clicked.                  *** \x1b[0m");
    println!("\x1b[41;33m************************************************************************* \x1b[0m");
    println!();
}

fn write_json<T: serde::Serialize>(path: &std::path::Path, value: &T) {
    let res = File::create(path)
        .map_err(anyhow::Error::from)
        .and_then(|file| serde_json::to_writer_pretty(file, value).map_err(Into::into));
    match res {
        Ok(()) => println!("Wrote JSON report to {}", path.display()),
        Err(e) => eprintln!("Failed to write JSON to {}: {}", path.display(), e),
    }
}
