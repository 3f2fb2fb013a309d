use anyhow::Context;
use clap::Parser;
use mergefiles::{version, Config, Pipeline, PromptStore};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "mergefiles",
    version,
    long_version = version::build_version(),
    about = "Merge a source tree into a single prompt file",
    long_about = "Merge every file of a source tree into one text file, prefixed with a prompt.\n\n\
    Each file is wrapped in '--- START FILE: <path> ---' / '--- END FILE ---' delimiters \
    and a code fence. The output is sized up front and filled in parallel.\n\n\
    Prompts are looked up by key in ~/.config/mergefiles/config.json (or \
    $MERGEFILES_CONFIG_DIR/config.json), created with defaults on first run. \
    An unknown key is used as the prompt text itself.\n\n\
    USAGE EXAMPLES:\n  \
      # Merge the current directory into output.txt\n  \
      mergefiles\n\n  \
      # Merge only Go and Markdown files of a project\n  \
      mergefiles --dir ./my-project --ext go --ext md --out bundle.txt\n\n  \
      # Use the 'go' prompt and skip vendored code\n  \
      mergefiles -d . -p go -x 'vendor/**'"
)]
struct Cli {
    /// Source directory (searched recursively)
    #[arg(short, long, default_value = ".", value_name = "PATH")]
    dir: PathBuf,

    /// Output file
    #[arg(short, long, default_value = "output.txt", value_name = "FILE")]
    out: PathBuf,

    /// Prompt key from the prompt store, or literal prompt text
    #[arg(short, long, default_value = "default", value_name = "KEY")]
    prompt: String,

    /// File extension to include (repeatable, e.g. -e .txt -e md)
    #[arg(short, long = "ext", value_name = "EXT")]
    ext: Vec<String>,

    /// Glob of relative paths to skip (repeatable)
    #[arg(short = 'x', long, value_name = "GLOB")]
    exclude: Vec<String>,

    /// Follow symbolic links while walking
    #[arg(long)]
    follow_links: bool,

    /// Number of writer threads (defaults to the number of CPUs)
    #[arg(short = 'j', long, value_name = "N")]
    threads: Option<usize>,

    /// Prompt store file
    #[arg(long, value_name = "FILE", env = "MERGEFILES_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose)?;

    let store_path = cli.config.unwrap_or_else(PromptStore::default_path);
    let store = PromptStore::load_or_init(&store_path)
        .context("Error initializing configuration")?;
    let prompt = store.lookup(&cli.prompt);

    let mut builder = Config::builder()
        .source_root(cli.dir)
        .output_path(cli.out)
        .prompt(prompt)
        .extensions(cli.ext)
        .follow_links(cli.follow_links);

    for pattern in cli.exclude {
        builder = builder.exclude(pattern);
    }

    if let Some(threads) = cli.threads {
        builder = builder.threads(threads);
    }

    let config = builder.build().context("Invalid arguments")?;

    let stats = Pipeline::new(config)
        .context("Failed to create pipeline")?
        .run()
        .context("Merge failed")?;

    if stats.output_written {
        stats.print_summary();
        info!("Done! Merged file written to {}", stats.output_path);
    }

    Ok(())
}

fn setup_tracing(verbosity: u8) -> anyhow::Result<()> {
    let filter = match verbosity {
        0 => EnvFilter::new("mergefiles=info"),
        1 => EnvFilter::new("mergefiles=debug"),
        _ => EnvFilter::new("mergefiles=trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}
