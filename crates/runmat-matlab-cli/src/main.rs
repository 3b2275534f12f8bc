//! runmat-matlab - evaluate code in a MATLAB engine session from the shell.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{debug, info};
use runmat_matlab_engine::{EngineConfigBuilder, EngineError, Session};
use runmat_mxarray::coerce::to_json;

#[derive(Parser)]
#[command(
    name = "runmat-matlab",
    version = env!("CARGO_PKG_VERSION"),
    about = "Drive a MATLAB engine session from the command line",
    after_help = r#"
Environment Variables:
  MATLABROOT=<path>                MATLAB installation root (default: found via PATH)
  RUNMAT_MATLAB_OPTIONS=<opts>     Startup options passed to MATLAB (default: -nosplash)
  RUNMAT_MATLAB_BUFFER_SIZE=<n>    Output buffer size in bytes (0 disables capture)
  RUNMAT_LOG_LEVEL=debug           Set log level (error, warn, info, debug, trace)
"#
)]
#[command(propagate_version = true)]
struct Cli {
    /// MATLAB installation root
    #[arg(long, env = "MATLABROOT")]
    matlab_root: Option<PathBuf>,

    /// Startup options passed to the MATLAB launcher
    #[arg(long, env = "RUNMAT_MATLAB_OPTIONS")]
    options: Option<String>,

    /// Size of the command-window output buffer in bytes
    #[arg(long, env = "RUNMAT_MATLAB_BUFFER_SIZE", default_value_t = 65536)]
    buffer_size: usize,

    /// Set log level
    #[arg(
        long,
        value_enum,
        env = "RUNMAT_LOG_LEVEL",
        default_value = "warn",
        value_parser = parse_log_level_env
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate expressions in order, then print the requested variables
    Eval {
        /// MATLAB expressions
        #[arg(required = true)]
        exprs: Vec<String>,

        /// Variables to fetch after evaluation
        #[arg(long = "get", value_name = "NAME")]
        get: Vec<String>,

        /// Print fetched variables as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start MATLAB and report the engine library version
    Version,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log level parser that accepts an empty environment variable.
fn parse_log_level_env(s: &str) -> Result<LogLevel, String> {
    if s.is_empty() {
        return Ok(LogLevel::Warn);
    }
    match s.to_lowercase().as_str() {
        "error" => Ok(LogLevel::Error),
        "warn" => Ok(LogLevel::Warn),
        "info" => Ok(LogLevel::Info),
        "debug" => Ok(LogLevel::Debug),
        "trace" => Ok(LogLevel::Trace),
        _ => Err(format!(
            "Invalid log level '{s}'. Expected: error, warn, info, debug, trace"
        )),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or("warn"))
        .filter_level(cli.log_level.into())
        .init();

    let mut builder = EngineConfigBuilder::new().output_buffer_size(cli.buffer_size);
    if let Some(root) = &cli.matlab_root {
        builder = builder.matlab_root(root);
    }
    if let Some(options) = &cli.options {
        builder = builder.startup_options(options);
    }
    let config = builder.build().context("invalid engine configuration")?;
    debug!("Configuration: {config:?}");

    info!("Starting MATLAB engine");
    let mut session = Session::open(config).context("failed to start MATLAB")?;

    match cli.command {
        Commands::Eval { exprs, get, json } => execute(&mut session, &exprs, &get, json),
        Commands::Version => {
            match session.version() {
                Some((major, minor)) => println!("MATLAB engine {major}.{minor}"),
                None => println!("MATLAB engine (unknown version)"),
            }
            Ok(())
        }
    }
}

fn execute<B: runmat_matlab_engine::EngineBackend>(
    session: &mut Session<B>,
    exprs: &[String],
    names: &[String],
    json: bool,
) -> Result<()> {
    for expr in exprs {
        let evaluated = session.eval(expr);
        match session.output_buffer() {
            Ok(output) => print!("{output}"),
            Err(EngineError::OutputBufferDisabled) => {}
            Err(e) => return Err(e.into()),
        }
        evaluated.with_context(|| format!("evaluating `{expr}`"))?;
    }

    for name in names {
        let value = session
            .get(name)
            .with_context(|| format!("fetching variable `{name}`"))?;
        if json {
            println!("{name} = {}", serde_json::to_string(&to_json(&value))?);
        } else {
            println!("{name} =\n{value}\n");
        }
    }
    Ok(())
}
