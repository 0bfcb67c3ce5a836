//! figindex - index the captioned figures of an EPUB

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use figindex::{CaptionRecord, IndexOptions, index_figures, read_epub, write_epub};

#[derive(Parser)]
#[command(name = "figindex")]
#[command(version, about = "Anchor captioned figures and build an index of figures", long_about = None)]
#[command(after_help = "EXAMPLES:
    figindex book.epub indexed.epub    Write a copy with an index of figures
    figindex -n --json book.epub       List the figures that would be indexed")]
struct Cli {
    /// Input EPUB
    #[arg(value_name = "INPUT")]
    input: String,

    /// Output EPUB
    #[arg(value_name = "OUTPUT", required_unless_present = "dry_run")]
    output: Option<String>,

    /// Scan and report without writing
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Print the indexed figures as JSON (plain text, entities resolved)
    #[arg(long)]
    json: bool,

    /// Title and heading of the index page
    #[arg(long, env = "FIGINDEX_TITLE")]
    title: Option<String>,

    /// File name of the index page
    #[arg(long)]
    file_name: Option<String>,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Log every anchored figure
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let default_filter = if cli.quiet {
        "figindex=warn"
    } else if cli.verbose {
        "figindex=debug"
    } else {
        "figindex=info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: &Cli) -> Result<(), String> {
    let mut book = read_epub(&cli.input).map_err(|e| e.to_string())?;

    let mut options = IndexOptions::default();
    if let Some(title) = &cli.title {
        options.title = title.clone();
        options.heading = title.clone();
    }
    if let Some(file_name) = &cli.file_name {
        options.file_name = file_name.clone();
    }

    let report = index_figures(&mut book, &options).map_err(|e| e.to_string())?;

    if cli.json {
        let captions: Vec<_> = report.captions.iter().map(CaptionRecord::unescaped).collect();
        let json = serde_json::to_string_pretty(&captions).map_err(|e| e.to_string())?;
        println!("{json}");
    }

    if cli.dry_run {
        tracing::info!(
            figures = report.captions.len(),
            documents = report.updated_documents.len(),
            "dry run, nothing written"
        );
        return Ok(());
    }

    if let Some(output) = &cli.output {
        write_epub(&book, output).map_err(|e| e.to_string())?;
        tracing::info!("wrote {}", output);
    }

    Ok(())
}
