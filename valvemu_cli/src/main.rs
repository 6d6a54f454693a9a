//! valvemu binary: logging setup, ctrl-c handling, command dispatch.

mod cli;
mod diag_fmt;
mod rt;
mod run;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use cli::{Cli, Commands, FILE_GUARD, JSON_MODE};

fn init_tracing(args: &Cli, logging: &valvemu_config::Logging) -> eyre::Result<()> {
    let level = logging.level.as_deref().unwrap_or(&args.log_level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let file_writer = match &logging.file {
        Some(path) => {
            let path = std::path::Path::new(path);
            let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let name = path.file_name().unwrap_or_else(|| "valvemu.log".as_ref());
            let appender = match logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(writer)
        }
        None => None,
    };

    match (args.json, file_writer) {
        (false, None) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
        (true, None) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        (false, Some(w)) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_ansi(false)
                        .with_writer(w),
                )
                .init();
        }
        (true, Some(w)) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_ansi(false)
                        .with_writer(w),
                )
                .init();
        }
    }
    Ok(())
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();
    let _ = JSON_MODE.set(args.json);

    let cfg = run::load_config(&args.config)?;
    init_tracing(&args, &cfg.logging)?;
    let table = run::load_table(&cfg, args.table.as_ref())?;

    match args.cmd {
        Commands::Run {
            ticks,
            state_file,
            diag,
            exercise,
            stats,
            rt,
            rt_prio,
        } => {
            rt::setup_rt_once(rt, rt_prio);

            let shutdown = Arc::new(AtomicBool::new(false));
            let shutdown_handler = shutdown.clone();
            ctrlc::set_handler(move || {
                shutdown_handler.store(true, Ordering::Relaxed);
            })
            .wrap_err("install ctrl-c handler")?;

            run::run_emulator(
                &cfg, table, ticks, state_file, diag, exercise, stats, shutdown,
            )
        }
        Commands::SelfCheck => run::self_check(&cfg, table),
        Commands::DumpState { state_file } => run::dump_state(&cfg, state_file),
    }
}
