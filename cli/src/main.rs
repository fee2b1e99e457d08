use clap::Parser;
use nowplaying::{Accumulator, AppendStore, CancellationHandler, CodecRegistry, Session};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

mod config;

use config::AppConfig;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(AppConfig::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Polls until interrupted or out of polls, then saves the session's events.
async fn run(config: AppConfig) -> nowplaying::Result<()> {
    let producer = config.producer()?;
    let store = AppendStore::new(CodecRegistry::standard()?);
    let handler = Arc::new(CancellationHandler::new(store, config.db_file.clone()));
    tokio::spawn(listen_for_interrupts(handler.clone()));

    info!(
        "Logging songs to {:?}, snapshots at {:?}",
        config.db_file, config.snapshot_file
    );
    let session = Session::new(Arc::new(producer), config.session());
    let mut accumulator = Accumulator::new();
    session.run(&mut accumulator, &handler.token()).await;

    if let Some(report) = handler.flush(&mut accumulator).await.transpose()? {
        info!(
            "{:?} now holds {} events ({})",
            report.path, report.written, report.codec
        );
    }
    Ok(())
}

/// Forwards Ctrl-C (and SIGTERM on unix) to the handler until the process exits.
async fn listen_for_interrupts(handler: Arc<CancellationHandler>) {
    #[cfg(unix)]
    let mut terminate =
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(signal) => Some(signal),
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                None
            }
        };

    loop {
        #[cfg(unix)]
        let received = match terminate.as_mut() {
            Some(signal) => tokio::select! {
                r = tokio::signal::ctrl_c() => r.is_ok(),
                _ = signal.recv() => true,
            },
            None => tokio::signal::ctrl_c().await.is_ok(),
        };
        #[cfg(not(unix))]
        let received = tokio::signal::ctrl_c().await.is_ok();

        if !received {
            warn!("Cannot listen for Ctrl-C, interrupts disabled");
            return;
        }
        handler.interrupt();
    }
}
