//! Command-line entry point for `get-papers-list`.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use get_papers_list::export::{export_to_csv, filter_company_papers, print_results};
use get_papers_list::sources::{PubMedSource, Source};
use get_papers_list::utils::validate_email;

#[derive(Parser, Debug)]
#[command(
    name = "get-papers-list",
    version,
    about = "Fetch PubMed papers with pharma/biotech company-affiliated authors"
)]
struct Cli {
    /// PubMed search query (full PubMed query syntax supported)
    query: String,

    /// Write results to a CSV file instead of the console
    #[arg(short, long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Print debug information during execution
    #[arg(short, long)]
    debug: bool,

    /// Maximum number of search results to fetch
    #[arg(short, long, default_value_t = 500, value_name = "N")]
    max_results: usize,

    /// Contact email sent to NCBI with every request
    #[arg(short, long, default_value = "your.email@example.com", value_name = "ADDR")]
    email: String,

    /// NCBI API key for a higher request rate (falls back to $NCBI_API_KEY)
    #[arg(short = 'k', long, value_name = "KEY")]
    api_key: Option<String>,
}

fn init_tracing(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("get_papers_list={}", level)),
    );

    // Logs go to stderr so console output stays clean
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    if !validate_email(&cli.email) {
        anyhow::bail!("invalid contact email: {}", cli.email);
    }

    let api_key = cli
        .api_key
        .clone()
        .or_else(|| std::env::var("NCBI_API_KEY").ok());
    let source = PubMedSource::new(cli.email.clone(), api_key);

    info!("searching {} for: {}", source.name(), cli.query);
    let ids = source
        .search(&cli.query, cli.max_results)
        .await
        .context("search failed")?;
    info!("found {} matching papers", ids.len());

    let records = source
        .fetch_details(&ids)
        .await
        .context("failed to fetch paper details")?;

    let filtered = filter_company_papers(records);

    match &cli.file {
        Some(path) => export_to_csv(&filtered, path)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => {
            let stdout = std::io::stdout();
            print_results(&filtered, &mut stdout.lock())?;
        }
    }

    Ok(())
}


#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    tokio::select! {
        result = run(&cli) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("{:#}", e);
                eprintln!("Error: {:#}", e);
                ExitCode::from(2)
            }
        },
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Interrupted.");
            ExitCode::from(1)
        }
    }
}
