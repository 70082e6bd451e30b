pub mod command;

use std::thread;

use crossbeam_channel::Receiver;
use tracing::{debug, info};

use crate::config::{ThrottlerConfig, VazaoConfig};
use crate::error::ServiceError;
use crate::throttler::{Throttler, ThrottlerStats};

pub use command::ThrottleCommand;

/// Thread-backed front end for the throttler. The service owns a dedicated
/// worker thread holding the `Throttler` exclusively; producer threads and
/// the consumer talk to it through a bounded command channel, so every
/// operation — registration included — is serialized by a single owner.
pub struct ThrottleService<M> {
    command_tx: crossbeam_channel::Sender<ThrottleCommand<M>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl<M: Send + 'static> ThrottleService<M> {
    /// Validate the configuration and spawn the worker thread.
    pub fn new(config: VazaoConfig) -> Result<Self, ServiceError> {
        let throttler = Throttler::new(config.throttler)?;
        Self::start(throttler, config.service.command_channel_capacity)
    }

    /// Same as `new`, with an injected tie-break seed for reproducible runs.
    pub fn with_seed(config: VazaoConfig, seed: u64) -> Result<Self, ServiceError> {
        let throttler = Throttler::with_seed(config.throttler, seed)?;
        Self::start(throttler, config.service.command_channel_capacity)
    }

    fn start(throttler: Throttler<M>, channel_capacity: usize) -> Result<Self, ServiceError> {
        let (tx, rx) = crossbeam_channel::bounded::<ThrottleCommand<M>>(channel_capacity);
        let worker = thread::Builder::new()
            .name("vazao-throttle".to_string())
            .spawn(move || run(throttler, rx))
            .map_err(|e| ServiceError::Spawn(e.to_string()))?;

        info!("throttle service started");

        Ok(Self {
            command_tx: tx,
            worker: Some(worker),
        })
    }

    /// Send a raw command to the worker. Returns an error if the channel is
    /// full or the worker is gone.
    pub fn send_command(&self, cmd: ThrottleCommand<M>) -> Result<(), ServiceError> {
        self.command_tx.try_send(cmd).map_err(|e| match e {
            crossbeam_channel::TrySendError::Full(_) => ServiceError::ChannelFull,
            crossbeam_channel::TrySendError::Disconnected(_) => ServiceError::Disconnected,
        })
    }

    #[tracing::instrument(skip_all)]
    pub fn configure(&self, config: ThrottlerConfig) -> Result<(), ServiceError> {
        let (reply, rx) = tokio::sync::oneshot::channel();
        self.send_command(ThrottleCommand::Configure { config, reply })?;
        rx.blocking_recv().map_err(|_| ServiceError::Disconnected)??;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn register_source(&self, key: impl Into<String>) -> Result<(), ServiceError> {
        let (reply, rx) = tokio::sync::oneshot::channel();
        self.send_command(ThrottleCommand::RegisterSource {
            key: key.into(),
            reply,
        })?;
        rx.blocking_recv().map_err(|_| ServiceError::Disconnected)??;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn set_weight(&self, key: impl Into<String>, weight: f64) -> Result<(), ServiceError> {
        let (reply, rx) = tokio::sync::oneshot::channel();
        self.send_command(ThrottleCommand::SetWeight {
            key: key.into(),
            weight,
            reply,
        })?;
        rx.blocking_recv().map_err(|_| ServiceError::Disconnected)??;
        Ok(())
    }

    pub fn buffer(&self, key: impl Into<String>, message: M) -> Result<(), ServiceError> {
        let (reply, rx) = tokio::sync::oneshot::channel();
        self.send_command(ThrottleCommand::Buffer {
            key: key.into(),
            message,
            reply,
        })?;
        rx.blocking_recv().map_err(|_| ServiceError::Disconnected)??;
        Ok(())
    }

    /// Poll the throttler at `now`. `Ok(None)` means nothing to emit.
    pub fn poll(&self, now: f64) -> Result<Option<(String, M)>, ServiceError> {
        let (reply, rx) = tokio::sync::oneshot::channel();
        self.send_command(ThrottleCommand::Poll { now, reply })?;
        rx.blocking_recv().map_err(|_| ServiceError::Disconnected)
    }

    pub fn stats(&self) -> Result<ThrottlerStats, ServiceError> {
        let (reply, rx) = tokio::sync::oneshot::channel();
        self.send_command(ThrottleCommand::Stats { reply })?;
        rx.blocking_recv().map_err(|_| ServiceError::Disconnected)
    }

    /// Initiate graceful shutdown: send the shutdown command and wait for
    /// the worker thread to finish.
    #[tracing::instrument(skip_all)]
    pub fn shutdown(mut self) -> Result<(), ServiceError> {
        info!("initiating throttle service shutdown");

        // Ignore a send error if the channel is already closed
        let _ = self.command_tx.send(ThrottleCommand::Shutdown);

        if let Some(worker) = self.worker.take() {
            worker.join().map_err(|_| ServiceError::WorkerPanicked)?;
        }

        info!("throttle service shutdown complete");
        Ok(())
    }
}

impl<M> Drop for ThrottleService<M> {
    fn drop(&mut self) {
        // If shutdown wasn't called explicitly, attempt to stop the worker
        if self.worker.is_some() {
            let _ = self.command_tx.send(ThrottleCommand::Shutdown);
            if let Some(worker) = self.worker.take() {
                let _ = worker.join();
            }
        }
    }
}

/// Worker loop: drain commands until shutdown or until every handle is
/// gone. Replies are fire-and-forget; a caller that dropped its receiver
/// simply misses the answer.
fn run<M>(mut throttler: Throttler<M>, inbound: Receiver<ThrottleCommand<M>>) {
    info!("throttle worker started");

    while let Ok(cmd) = inbound.recv() {
        match cmd {
            ThrottleCommand::Configure { config, reply } => {
                debug!("configure command received");
                let _ = reply.send(throttler.configure(config));
            }
            ThrottleCommand::RegisterSource { key, reply } => {
                debug!(%key, "register command received");
                let _ = reply.send(throttler.register_source(key));
            }
            ThrottleCommand::SetWeight { key, weight, reply } => {
                debug!(%key, weight, "set-weight command received");
                let _ = reply.send(throttler.set_weight(&key, weight));
            }
            ThrottleCommand::Buffer { key, message, reply } => {
                let _ = reply.send(throttler.buffer(&key, message));
            }
            ThrottleCommand::Poll { now, reply } => {
                let _ = reply.send(throttler.poll(now));
            }
            ThrottleCommand::Stats { reply } => {
                let _ = reply.send(throttler.stats());
            }
            ThrottleCommand::Shutdown => break,
        }
    }

    info!("throttle worker stopped");
}
