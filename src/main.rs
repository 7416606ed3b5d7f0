mod config;
mod issue;
mod pipeline;
mod report;
mod summary;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

use issue::IssueSource;
use summary::{ModelInvoker, SummarizationEngine};

/// Bug Aging Report: fetches open bugs from Jira, summarizes their comment
/// threads with a language model, and writes a JSON and a text report.
#[derive(Parser, Debug)]
#[command(name = "bug-aging-report", version, about)]
struct Cli {
    /// Path to a TOML config file (defaults to .bug-report.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JQL filter overriding the configured one
    #[arg(long)]
    jql: Option<String>,

    /// Where to write the JSON report
    #[arg(long)]
    json_output: Option<PathBuf>,

    /// Where to write the text report
    #[arg(long)]
    text_output: Option<PathBuf>,

    /// Maximum number of summarization calls in flight
    #[arg(long)]
    concurrency: Option<usize>,

    /// Use built-in sample issues and an offline summarizer (no credentials needed)
    #[arg(long)]
    r#mock: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    info!("loading configuration");
    let mut config = match &cli.config {
        Some(path) => config::Config::load_from(path)?.with_env(),
        None => config::Config::load()?,
    };
    if let Some(jql) = cli.jql {
        config.jira.jql = jql;
    }
    if let Some(concurrency) = cli.concurrency {
        config.report.concurrency = concurrency;
    }
    let json_path = cli
        .json_output
        .unwrap_or_else(|| PathBuf::from(&config.report.json_path));
    let text_path = cli
        .text_output
        .unwrap_or_else(|| PathBuf::from(&config.report.text_path));

    let _main_span = info_span!("bug_report", jql = %config.jira.jql).entered();

    let (source, invoker): (Box<dyn IssueSource>, Arc<dyn ModelInvoker>) = if cli.r#mock {
        info!("using sample issues and offline summarizer");
        (
            Box::new(issue::fixture::FixtureSource::sample()?) as Box<dyn IssueSource>,
            Arc::new(summary::canned::CannedInvoker) as Arc<dyn ModelInvoker>,
        )
    } else {
        (
            Box::new(issue::JiraClient::new(&config)?) as Box<dyn IssueSource>,
            Arc::new(summary::anthropic::AnthropicInvoker::new(
                &config.model,
                config.timeout(),
            )?) as Arc<dyn ModelInvoker>,
        )
    };
    debug!(url = %config.jira.url, model = %config.model.model, "collaborators ready");

    let engine = Arc::new(SummarizationEngine::new(invoker, config.timeout()));
    let options = pipeline::RunOptions::from_config(&config);

    info!("running report pipeline");
    let outcome = pipeline::run(source.as_ref(), engine, &options, chrono::Utc::now()).await?;

    info!("writing reports");
    report::output(&outcome.report, &json_path, &text_path)?;
    report::print_terminal_summary(&outcome.report, &json_path, &text_path);
    info!(
        bugs = outcome.report.records.len(),
        skipped = outcome.diagnostics.skipped(),
        degraded = outcome.diagnostics.degraded(),
        "done"
    );

    Ok(())
}
