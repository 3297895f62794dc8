//! ICMP Latency Reporter - Main CLI Application
//!
//! Pings every configured host once per interval and posts each round-trip
//! time to the collector until interrupted.

use clap::Parser;
use icmp_latency_reporter::{
    cli::Cli,
    config::{display_config_summary, load_config, EnvManager},
    error::Result,
    logging::LoggerFactory,
    CollectorDriver, HttpPublisher, IcmpProber, BUILD_TIME, GIT_COMMIT, PKG_NAME, TARGET_TRIPLE,
    VERSION,
};
use std::process;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    // Panics on the blocking pool surface to the driver as a failed target
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        if std::thread::current().name() == Some("main") {
            process::exit(99);
        }
    }));

    let cli = Cli::parse();

    if cli.show_env {
        print_env_help(&cli);
        return;
    }

    if let Err(e) = run_application(cli.clone()).await {
        eprintln!("{}", e.format_for_console(cli.use_colors()));
        process::exit(e.exit_code());
    }
}

/// Main application logic
async fn run_application(cli: Cli) -> Result<()> {
    let config = Arc::new(load_config(cli.clone())?);

    let factory = LoggerFactory::new((*config).clone());
    let logger = factory.create_logger("pinger").await;

    logger.info(&format!("{} v{} starting", PKG_NAME, VERSION))
        .field("build_time", BUILD_TIME)
        .field("git_commit", GIT_COMMIT.unwrap_or("unknown"))
        .field("target", TARGET_TRIPLE.unwrap_or("unknown"))
        .field("targets", config.targets.len())
        .field("interval_seconds", config.interval_seconds)
        .log()
        .await;

    if config.verbose || config.debug {
        println!("{}", display_config_summary(&config));
        println!();
    }

    let prober = IcmpProber::from_config(&config);
    let publisher = HttpPublisher::from_config(&config)?;
    let driver = CollectorDriver::new(Arc::clone(&config), prober, publisher, logger.clone());

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    if cli.once {
        let summary = driver.run_cycle(1, &cancel).await;
        if config.verbose {
            println!("Probed {} targets, {} replies, {} published",
                summary.probed, summary.succeeded, summary.published);
        }
        return Ok(());
    }

    driver.run(cancel).await;
    Ok(())
}

/// Cancel the token on Ctrl-C or SIGTERM
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    cancel.cancel();
}

/// Print supported variables and what the current environment sets them to
fn print_env_help(cli: &Cli) {
    println!("{}", EnvManager::display_env_help());

    let (path, explicit) = cli.env_file_path();
    match EnvManager::load_env_file(&path, explicit, cli.debug) {
        Ok(file_vars) => {
            let status = EnvManager::display_env_status(|key| {
                std::env::var(key).ok().or_else(|| file_vars.get(key).cloned())
            });
            println!("{}", status);
        }
        Err(e) => eprintln!("{}", e.format_for_console(cli.use_colors())),
    }
}
