use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use sparql_selectivity::config::{split_list, RecapConfig};
use sparql_selectivity::{analyze, summarize_corpus, DocumentFilter, MatchMode, ReportFormat};

#[derive(Parser)]
#[command(name = "selectivity", about = "Triple pattern selectivity for SPARQL benchmarks", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show debug diagnostics, including skipped paths
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all log output
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Report every query triple pattern and its matches in the corpus
    Patterns {
        /// Corpus root; each top-level directory is one pod
        #[arg(long)]
        pods: PathBuf,

        /// Directory of query files
        #[arg(long)]
        queries: PathBuf,

        /// File to write the report to
        #[arg(long)]
        output: PathBuf,

        /// Comma-separated list of extensions to parse as RDF
        #[arg(long, default_value = ".nq")]
        extensions: String,

        /// Comma-separated keywords; query files containing one are skipped
        #[arg(long = "exclude", default_value = "complex")]
        exclusions: String,

        #[arg(long, value_enum, default_value_t = FormatArg::Tsv)]
        format: FormatArg,

        /// Path matching semantics
        #[arg(long, value_enum, default_value_t = ModeArg::Approximate)]
        mode: ModeArg,

        /// Worker threads; each scans whole pods
        #[arg(long, default_value_t = NonZeroUsize::MIN)]
        jobs: NonZeroUsize,

        /// Test every pattern against every triple
        #[arg(long)]
        no_index: bool,
    },

    /// Count pods, documents and triples in the corpus
    Dataset {
        #[arg(long)]
        pods: PathBuf,

        /// Comma-separated list of extensions to parse as RDF
        #[arg(long, default_value = ".nq")]
        extensions: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Tsv,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    /// A path matches any predicate it mentions
    Approximate,
    /// Single-hop path witness honouring direction and negation
    Strict,
}

fn init_tracing(cli: &Cli) {
    // --quiet → off, --verbose → debug, otherwise RUST_LOG or info.
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("off")
    } else if cli.verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "info".into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> sparql_selectivity::Result<()> {
    match command {
        Commands::Patterns {
            pods,
            queries,
            output,
            extensions,
            exclusions,
            format,
            mode,
            jobs,
            no_index,
        } => {
            let mode = match mode {
                ModeArg::Approximate => MatchMode::Approximate,
                ModeArg::Strict => MatchMode::Strict,
            };
            let format = match format {
                FormatArg::Tsv => ReportFormat::Tsv,
                FormatArg::Json => ReportFormat::Json,
            };
            let config = RecapConfig::new(pods, queries)
                .with_extensions(split_list(&extensions))
                .with_exclusions(split_list(&exclusions))
                .with_match_mode(mode)
                .with_predicate_index(!no_index)
                .with_jobs(jobs);

            let report = analyze(&config)?;
            report.write_to(&output, format)
        }

        Commands::Dataset { pods, extensions } => {
            let filter = DocumentFilter::from_extensions(&split_list(&extensions))?;
            let totals = summarize_corpus(&pods, &filter)?;
            println!("Pods path: {}", pods.display());
            println!(
                "Total of {} pods, {} files, {} triples",
                totals.pods, totals.documents, totals.triples
            );
            Ok(())
        }
    }
}
