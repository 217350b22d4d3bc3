//! `nbtidy` — keeps plain-text copies of notebooks current.
//!
//! Continuous mode (`watch`) monitors a directory tree for writes and
//! invokes a conversion program per changed file; one-shot mode (`scan`)
//! walks the existing tree once with the same filtering rules.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use nbtidy_watcher::{
    ChangeAction, CommandAction, DebounceLoop, PathFilter, ScanWalker, WatchConfig,
};

#[derive(Parser)]
#[command(name = "nbtidy", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Watch the tree and convert notebooks as they change.
    Watch(RunArgs),

    /// Convert every matching notebook already on disk, then exit.
    Scan(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Root directory to watch.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Maximum number of buffered change events.
    #[arg(long, default_value_t = 65535)]
    max_events: usize,

    /// Regular expression a path must match to be converted.
    #[arg(long, default_value = "[.]nb$")]
    include: String,

    /// Suffix marking generated output; matching paths are never
    /// re-converted.
    #[arg(long, default_value = ".plain.nb")]
    exclude_suffix: String,

    /// Log detections without invoking the conversion program.
    #[arg(long)]
    try_run: bool,

    /// Conversion program invoked per changed file.
    #[arg(long, default_value = "wolframscript")]
    program: String,

    /// Argument template for the conversion program; `{path}`,
    /// `{pattern}` and `{suffix}` are substituted per invocation.
    /// Repeat for each argument. Defaults to the stock notebook
    /// cleanup invocation.
    #[arg(long = "arg", value_name = "TEMPLATE")]
    args: Vec<String>,

    /// Per-invocation deadline in seconds.
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    /// Sleep between drain cycles, in milliseconds.
    #[arg(long, default_value_t = 500)]
    debounce_ms: u64,

    /// Drain cycles between full watch-set rebuilds.
    #[arg(long, default_value_t = 100)]
    rebuild_period: u32,
}

impl RunArgs {
    fn into_parts(self) -> (WatchConfig, Arc<dyn ChangeAction>) {
        let mut config = WatchConfig::new(self.root)
            .with_max_events(self.max_events)
            .with_include_pattern(self.include)
            .with_exclude_suffix(self.exclude_suffix)
            .with_action_timeout(Duration::from_secs(self.timeout_secs))
            .with_debounce_interval(Duration::from_millis(self.debounce_ms))
            .with_rebuild_period(self.rebuild_period);
        if self.try_run {
            config = config.try_run();
        }

        let template = if self.args.is_empty() {
            CommandAction::notebook_template()
        } else {
            self.args
        };
        let action = CommandAction::new(self.program, template, config.action_timeout)
            .with_template_params(&config.include_pattern, &config.exclude_suffix);

        (config, Arc::new(action))
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run(Cli::parse()).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Watch(args) => {
            let (config, action) = args.into_parts();
            let debounce = DebounceLoop::new(config, action)?;

            let cancel = CancellationToken::new();
            let signal_cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("interrupt received, shutting down");
                    signal_cancel.cancel();
                }
            });

            debounce.run(cancel).await?;
        }
        Command::Scan(args) => {
            let (config, action) = args.into_parts();
            config.validate()?;
            let filter = Arc::new(PathFilter::new(
                &config.include_pattern,
                &config.exclude_suffix,
            )?);
            ScanWalker::new(filter, action, config.try_run)
                .scan(&config.root)
                .await?;
        }
    }
    Ok(())
}
