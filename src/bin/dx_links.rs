use std::process::ExitCode;

use camino::Utf8PathBuf;
use chrono::Utc;
use clap::Parser;
use clap::error::ErrorKind;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use dnanexus_links::app::{App, CategoryStatus, RunOptions, RunSummary};
use dnanexus_links::catalog::DnanexusHttpClient;
use dnanexus_links::config::ConfigLoader;
use dnanexus_links::domain::{OutputFormat, RecencyWindow};
use dnanexus_links::error::LinksError;
use dnanexus_links::output::{JsonOutput, OutputMode};
use dnanexus_links::tui::Tui;

#[derive(Parser)]
#[command(name = "dx-links")]
#[command(about = "Generate pre-authenticated download links for BAM/VCF files on DNAnexus")]
#[command(version, author)]
struct Cli {
    /// How far back to search, e.g. -12w, 30d, "12 weeks" or 2024-01-31
    #[arg(allow_hyphen_values = true)]
    window: String,

    /// Where to write the table (.json for the dashboard envelope, anything else for CSV)
    output: Utf8PathBuf,

    #[arg(long)]
    config: Option<String>,

    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    #[arg(long)]
    ttl_seconds: Option<u64>,

    /// Only run the named categories (repeatable)
    #[arg(long = "category")]
    categories: Vec<String>,

    #[arg(long)]
    non_interactive: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(summary) => {
            if summary.failed_categories() > 0 || summary.failed_rows() > 0 {
                return ExitCode::from(4);
            }
            ExitCode::SUCCESS
        }
        Err(report) => {
            eprintln!("{report:?}");
            if let Some(error) = report.downcast_ref::<LinksError>() {
                return ExitCode::from(map_exit_code(error));
            }
            ExitCode::from(1)
        }
    }
}

fn map_exit_code(error: &LinksError) -> u8 {
    match error {
        LinksError::Usage(_)
        | LinksError::InvalidRecency(_)
        | LinksError::InvalidPattern { .. }
        | LinksError::MissingToken(_)
        | LinksError::ConfigRead(_)
        | LinksError::ConfigParse(_) => 2,
        error if error.is_remote() => 3,
        _ => 1,
    }
}

fn parse_cli() -> Result<Cli, LinksError> {
    match Cli::try_parse() {
        Ok(cli) => Ok(cli),
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => Err(LinksError::Usage(err.to_string().trim().to_string())),
    }
}

fn run() -> miette::Result<RunSummary> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = parse_cli()?;
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let window: RecencyWindow = cli.window.parse()?;
    let mut config = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(ttl) = cli.ttl_seconds {
        if ttl == 0 {
            return Err(LinksError::Usage("--ttl-seconds must be greater than zero".to_string()).into());
        }
        config.ttl = std::time::Duration::from_secs(ttl);
    }
    config.select_categories(&cli.categories)?;

    let format = cli
        .format
        .unwrap_or_else(|| OutputFormat::from_path(&cli.output));
    let options = RunOptions {
        window,
        output: cli.output,
        format,
        now: Utc::now(),
    };

    let catalog = DnanexusHttpClient::from_config(&config)?;
    let app = App::new(catalog, config);

    match output_mode {
        OutputMode::NonInteractive => {
            let summary = app.run(options, &JsonOutput)?;
            JsonOutput::print_summary(&summary).into_diagnostic()?;
            Ok(summary)
        }
        OutputMode::Interactive => {
            let mut tui = Tui::new();
            let summary = tui.run(move |sink| app.run(options, sink))?;
            print_summary(&summary);
            Ok(summary)
        }
    }
}

fn print_summary(summary: &RunSummary) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let red = "\x1b[31m";
    let reset = "\x1b[0m";

    println!("{cyan}DX-LINKS summary (window {}){reset}", summary.window);
    for category in &summary.categories {
        let color = match category.status {
            CategoryStatus::Linked => green,
            CategoryStatus::Skipped => yellow,
            CategoryStatus::Failed => red,
        };
        println!(
            "{color}* {}: {} found, {} paired, {} linked{reset}",
            category.label,
            category.primary_count,
            category.paired_count,
            category.linked_count
        );
        if let Some(error) = &category.error {
            println!("{red}  error: {error}{reset}");
        }
        for dropped in &category.dropped {
            println!(
                "{yellow}  no index: {} ({}){reset}",
                dropped.name, dropped.folder
            );
        }
        for failed in &category.failed_rows {
            println!("{red}  failed: {} ({}){reset}", failed.name, failed.reason);
        }
    }

    let dropped = summary.dropped_rows();
    if dropped > 0 {
        println!("{yellow}{dropped} files left out for lack of an index{reset}");
    }

    if summary.written {
        println!(
            "{green}{} rows written to {}{reset}",
            summary.rows_written, summary.output
        );
    } else {
        println!(
            "{yellow}No matching files were found within the time frame specified: {}{reset}",
            summary.window
        );
    }
}
