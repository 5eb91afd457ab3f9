//! glue-crawl — run crawl jobs from the command line.

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use glue_crawl::GlueMode;
use glue_crawl_executor::cli;
use glue_crawl_executor::config::{ConfigOverrides, ExecutorConfig};
use glue_crawl_executor::Executor;

#[derive(Parser)]
#[command(
    name = "glue-crawl",
    about = "glue-crawl — scheduled crawl jobs with dynamically supplied page parsers",
    version,
    after_help = "Run 'glue-crawl <command> --help' for details on each command."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Browser binary (env: GLUE_CRAWL_DRIVER_PATH)
    #[arg(long, global = true)]
    driver_path: Option<PathBuf>,

    /// Parser construction mode: plain or injected (env: GLUE_CRAWL_GLUE_MODE)
    #[arg(long, global = true)]
    glue_mode: Option<GlueMode>,

    /// Default page timeout in milliseconds (env: GLUE_CRAWL_TIMEOUT_MS)
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Handler cache bound, 0 for unbounded (env: GLUE_CRAWL_CACHE_CAPACITY)
    #[arg(long, global = true)]
    cache_capacity: Option<usize>,

    /// Append extracted records to this JSON-lines file (env: GLUE_CRAWL_OUTPUT)
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a job handler
    Run {
        /// Handler name (crawlerJob, httpJobHandler, commandJobHandler)
        handler: String,
        /// Job parameter
        #[arg(long)]
        param: Option<String>,
        /// Read the job parameter from a file
        #[arg(long)]
        param_file: Option<PathBuf>,
        /// Number of parallel invocations
        #[arg(long, default_value = "1")]
        repeat: usize,
    },
    /// Compile a glue source (stdin when PATH is omitted)
    Compile {
        path: Option<PathBuf>,
    },
    /// List registered job handlers
    Handlers,
    /// Check environment and diagnose issues
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish)
        shell: Shell,
    },
}

async fn run_job(
    overrides: ConfigOverrides,
    handler: &str,
    param: Option<String>,
    param_file: Option<PathBuf>,
    repeat: usize,
    json: bool,
) -> anyhow::Result<bool> {
    let config = ExecutorConfig::resolve(overrides)?;
    let executor = Executor::new(config)?;
    let param = cli::run_cmd::read_param(param, param_file.as_deref())?;
    cli::run_cmd::run(&executor, handler, &param, repeat, json).await
}

fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json);
    let json = cli.json;

    let overrides = ConfigOverrides {
        driver_path: cli.driver_path.clone(),
        glue_mode: cli.glue_mode,
        timeout_millis: cli.timeout_ms,
        cache_capacity: cli.cache_capacity,
        output: cli.output.clone(),
    };

    let result: anyhow::Result<bool> = match cli.command {
        Commands::Run {
            handler,
            param,
            param_file,
            repeat,
        } => run_job(overrides, &handler, param, param_file, repeat, json).await,
        Commands::Compile { path } => cli::compile_cmd::run(path.as_deref(), json).map(|_| true),
        Commands::Handlers => ExecutorConfig::resolve(overrides)
            .and_then(Executor::new)
            .map(|executor| {
                let names = executor.registry().names();
                if json {
                    println!("{}", serde_json::json!(names));
                } else {
                    for name in names {
                        println!("{name}");
                    }
                }
                true
            }),
        Commands::Doctor => {
            ExecutorConfig::resolve(overrides).and_then(|config| cli::doctor::run(&config, json))
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "glue-crawl", &mut std::io::stdout());
            Ok(true)
        }
    };

    // Consistent exit codes: 0=success, 1=error or failed job
    match result {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            if !json {
                eprintln!("  Error: {e:#}");
            } else {
                println!("{}", serde_json::json!({ "error": format!("{e:#}") }));
            }
            std::process::exit(1);
        }
    }
}
