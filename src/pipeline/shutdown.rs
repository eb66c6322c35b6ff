//! Signal handling and graceful drain of the pipeline.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::queue::WorkQueue;
use super::worker::WorkerStats;

/// Lifecycle of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Pollers, workers and the backfill scan run normally
    Running,
    /// The queue is closed; workers finish their current link and exit
    Draining,
    /// Every worker has exited
    Stopped,
}

/// Owns the transition `Running -> Draining -> Stopped`.
///
/// Pollers receive a child of the coordinator's token and stop at their
/// next fetch or sleep once draining begins. They are not awaited.
/// Workers are awaited: each finishes its in-flight link and exits. Links
/// still buffered in the queue are left for the next backfill.
pub struct ShutdownCoordinator {
    state: watch::Sender<PipelineState>,
    pollers: CancellationToken,
    queue: WorkQueue,
}

impl ShutdownCoordinator {
    pub fn new(queue: WorkQueue) -> Self {
        let (state, _) = watch::channel(PipelineState::Running);
        Self {
            state,
            pollers: CancellationToken::new(),
            queue,
        }
    }

    /// Token to hand to a poller
    pub fn poller_token(&self) -> CancellationToken {
        self.pollers.child_token()
    }

    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    /// Close the queue and wait for every worker to exit.
    ///
    /// Returns the combined worker statistics.
    pub async fn drain(&self, workers: Vec<JoinHandle<WorkerStats>>) -> WorkerStats {
        self.state.send_replace(PipelineState::Draining);
        tracing::info!(
            workers = workers.len(),
            pending = self.queue.len(),
            "Draining pipeline"
        );

        self.pollers.cancel();
        self.queue.close();

        let mut total = WorkerStats::default();
        for handle in workers {
            match handle.await {
                Ok(stats) => total = total.merge(stats),
                Err(e) => tracing::error!(error = %e, "Extraction worker panicked"),
            }
        }

        self.state.send_replace(PipelineState::Stopped);
        tracing::info!(
            left_for_backfill = self.queue.len(),
            extracted = total.extracted,
            skipped = total.skipped,
            failed = total.failed,
            "Pipeline stopped"
        );
        total
    }
}

/// Wait for SIGINT or SIGTERM. Returns the name of the signal received.
#[cfg(unix)]
pub async fn shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let name = tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
    };
    tracing::info!(signal = name, "Signal received");
    Ok(name)
}

/// Wait for Ctrl-C. Returns the name of the signal received.
#[cfg(not(unix))]
pub async fn shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    tracing::info!(signal = "ctrl-c", "Signal received");
    Ok("ctrl-c")
}
