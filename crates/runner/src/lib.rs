//! Long-running process orchestration with graceful shutdown.
//!
//! A [`Runner`] owns a set of processes (HTTP server, simulator loop, ...)
//! that share one [`CancellationToken`]. The first process error or an OS
//! shutdown signal cancels the token; every process is expected to notice
//! and return, after which the registered closers run under a timeout.
//! `run` resolves once everything has stopped and reports the first
//! process error, leaving exit codes to the binary.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

type BoxedProcess = Box<
    dyn FnOnce(CancellationToken) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>
        + Send,
>;
type BoxedCloser = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>> + Send>;

pub struct Runner {
    processes: Vec<BoxedProcess>,
    closers: Vec<BoxedCloser>,
    closer_timeout: Duration,
    token: CancellationToken,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    pub fn new() -> Self {
        Self {
            processes: Vec::new(),
            closers: Vec::new(),
            closer_timeout: Duration::from_secs(10),
            token: CancellationToken::new(),
        }
    }

    /// Register a long-running process.
    ///
    /// Processes run concurrently. Each receives the shared token and must
    /// return promptly once it is cancelled.
    pub fn with_process<F, Fut>(mut self, process: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.processes
            .push(Box::new(move |token| Box::pin(process(token))));
        self
    }

    /// Register cleanup that runs after every process has stopped,
    /// whatever the reason they stopped.
    pub fn with_closer<F, Fut>(mut self, closer: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.closers.push(Box::new(move || Box::pin(closer())));
        self
    }

    /// How long the closers may take, together. Default 10 seconds.
    pub fn with_closer_timeout(mut self, timeout: Duration) -> Self {
        self.closer_timeout = timeout;
        self
    }

    /// Use an externally owned token, e.g. to trigger shutdown from a test
    /// or another subsystem.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Drive every process to completion.
    ///
    /// Cancellation (signal, error or external token) is cooperative: the
    /// token is cancelled and each process is drained rather than aborted,
    /// so in-flight work finishes cleanly.
    pub async fn run(self) -> anyhow::Result<()> {
        let token = self.token;
        let mut processes = JoinSet::new();
        for process in self.processes {
            processes.spawn(process(token.clone()));
        }

        spawn_signal_listeners(token.clone());

        let mut first_error: Option<anyhow::Error> = None;
        while let Some(joined) = processes.join_next().await {
            match joined {
                Ok(Ok(())) => debug!("process finished"),
                Ok(Err(err)) => {
                    error!("process failed: {err:#}");
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                    token.cancel();
                }
                Err(err) => {
                    error!("process panicked: {err}");
                    if first_error.is_none() {
                        first_error = Some(anyhow::anyhow!("process panicked: {err}"));
                    }
                    token.cancel();
                }
            }
        }

        run_closers(self.closers, self.closer_timeout).await;

        match first_error {
            Some(err) => Err(err),
            None => {
                info!("runner stopped cleanly");
                Ok(())
            }
        }
    }
}

async fn run_closers(closers: Vec<BoxedCloser>, timeout: Duration) {
    if closers.is_empty() {
        return;
    }
    info!(?timeout, "running closers");

    let mut set = JoinSet::new();
    for closer in closers {
        set.spawn(closer());
    }
    let drain = async {
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(())) => debug!("closer finished"),
                Ok(Err(err)) => error!("closer failed: {err:#}"),
                Err(err) => error!("closer panicked: {err}"),
            }
        }
    };

    if tokio::time::timeout(timeout, drain).await.is_err() {
        error!(?timeout, "closers timed out");
    }
}

fn spawn_signal_listeners(token: CancellationToken) {
    tokio::spawn({
        let token = token.clone();
        async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("failed to listen for interrupt: {err}");
                return;
            }
            info!("interrupt received; shutting down");
            token.cancel();
        }
    });

    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("SIGTERM received; shutting down");
                token.cancel();
            }
            Err(err) => error!("failed to listen for SIGTERM: {err}"),
        }
    });
}
