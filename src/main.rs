use anyhow::Context;
use clap::Parser;

use rewatch::watcher::registrar;
use rewatch::{
    CommandSpec, PathFilter, RetryPolicy, RetryState, Settings, Supervisor, WatchObserver, logging,
};

#[derive(Parser)]
#[command(name = "rewatch")]
#[command(version)]
#[command(about = "Runs a command and restarts it whenever files change")]
struct Cli {
    /// Maximum directory depth to watch below the working directory
    #[arg(long, env = "REWATCH_DEPTH")]
    depth: Option<u32>,

    /// Give up after this many failed supervisor runs
    #[arg(long)]
    max_attempts: Option<u32>,

    /// The program to run, followed by its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load().unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        eprintln!("Using default configuration for now.");
        Settings::default()
    });
    if let Some(depth) = cli.depth {
        settings.watch.max_depth = depth;
    }
    if let Some(attempts) = cli.max_attempts {
        settings.retry.max_attempts = attempts;
    }

    logging::init_with_config(&settings.logging);

    let spec = CommandSpec::from_argv(&cli.command).context("invalid command line")?;
    let filter = PathFilter::new(settings.watch.ignore_dirs.clone());
    let max_depth = settings.watch.max_depth;

    // The recovery driver: each attempt gets a fresh observer, a fresh watch
    // set and a fresh process. A supervisor only ever comes back with a fatal
    // error or a panic; both count against the retry budget.
    let mut retry = RetryState::new(RetryPolicy::from(&settings.retry));
    loop {
        let run = tokio::spawn(run_supervisor(spec.clone(), filter.clone(), max_depth));

        let error = match run.await {
            Ok(Err(e)) => e,
            Ok(Ok(())) => break,
            Err(join) if join.is_panic() => anyhow::anyhow!("supervisor panicked: {join}"),
            Err(join) => anyhow::anyhow!("supervisor task failed: {join}"),
        };
        tracing::error!("[supervisor] attempt {} failed: {error:#}", retry.attempts() + 1);

        match retry.next_delay() {
            Some(delay) => {
                rewatch::log_event!("supervisor", "restarting", "in {}ms", delay.as_millis());
                tokio::time::sleep(delay).await;
            }
            None => {
                anyhow::bail!("giving up after {} failed attempts", retry.attempts());
            }
        }
    }

    Ok(())
}

/// One full supervisor run: build the watch set from the working directory,
/// then supervise until a loop-fatal error.
async fn run_supervisor(
    spec: CommandSpec,
    filter: PathFilter,
    max_depth: u32,
) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("failed to resolve working directory")?;

    let mut observer = WatchObserver::new().context("failed to set up file watcher")?;
    let dirs = registrar::register_tree(observer.watcher_mut(), &cwd, max_depth, &filter)
        .context("failed to register watch directories")?;
    rewatch::log_event!(
        "watcher",
        "monitoring",
        "{} directories under {}",
        dirs.len(),
        cwd.display()
    );

    let supervisor = Supervisor::new(spec, observer, filter, max_depth);
    supervisor.run().await?;
    Ok(())
}
