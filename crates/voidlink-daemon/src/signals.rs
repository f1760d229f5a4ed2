//! Signal handling for graceful shutdown.

use anyhow::{Context, Result};
use tokio::signal::unix::{Signal, SignalKind, signal};
use tracing::info;

/// Resolves once SIGTERM or SIGINT (Ctrl+C) arrives.
pub struct ShutdownSignal {
    terminate: Signal,
    interrupt: Signal,
}

impl ShutdownSignal {
    /// Install the SIGTERM and SIGINT handlers.
    pub fn install() -> Result<Self> {
        Ok(Self {
            terminate: signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?,
            interrupt: signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?,
        })
    }

    /// Wait for the next shutdown signal.
    pub async fn recv(&mut self) {
        tokio::select! {
            _ = self.terminate.recv() => info!("Received SIGTERM"),
            _ = self.interrupt.recv() => info!("Received SIGINT"),
        }
    }
}
