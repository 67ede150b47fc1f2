// src/main.rs

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use seo_audit::config::AuditConfig;
use seo_audit::lifecycle;
use seo_audit::service::{ProgressBroadcaster, ProgressSink, RunnerMode};

#[derive(Parser, Debug)]
#[command(name = "seo-audit")]
#[command(about = "Audit a single web page and print an SEO report as JSON")]
#[command(version)]
struct Args {
    /// Page to audit (absolute http/https URL)
    url: String,

    /// Skip the AI recommendation stage even if GEMINI_API_KEY is set
    #[arg(long)]
    no_ai: bool,

    /// Run the audit through the background job queue
    #[arg(long)]
    queued: bool,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,

    /// Print progress events to stderr while the audit runs
    #[arg(long)]
    progress: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    lifecycle::init_logging();
    let args = Args::parse();

    let mut config = AuditConfig::from_env();
    if args.no_ai {
        config.gemini_api_key = None;
    }
    if args.queued {
        config.runner_mode = RunnerMode::Queued;
    }

    match run(&args, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args, config: &AuditConfig) -> anyhow::Result<()> {
    let runner = lifecycle::build_runner(config)?;

    let broadcaster = ProgressBroadcaster::default();
    let printer = args.progress.then(|| {
        let mut subscription = broadcaster.subscribe();
        tokio::spawn(async move {
            while let Some(event) = subscription.next().await {
                eprintln!("[{:>3}%] {:<9} {}", event.progress, event.stage.as_str(), event.message);
            }
        })
    });

    let sink: Arc<dyn ProgressSink> = Arc::new(broadcaster);
    let result = runner.submit(&args.url, Some(sink)).await;
    drop(runner);

    if let Some(printer) = printer {
        // The subscription ends once the last broadcaster handle is dropped.
        let _ = printer.await;
    }

    let report = result?;
    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{}", json);
    Ok(())
}
