use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::error::{OutputError, Result};
use crate::instance::InstanceContext;
use crate::registry::InstanceRegistry;

/// Entry point of the component that actually serves an instance.
///
/// `run` is expected to return once `cancel` fires.
#[async_trait::async_trait]
pub trait Worker: Send + Sync {
    async fn run(
        &self,
        ctx: Arc<InstanceContext>,
        cancel: CancellationToken,
    ) -> anyhow::Result<()>;
}

pub type DynWorker = Arc<dyn Worker>;

/// Starts and cancels one worker per registered instance.
pub struct LifecycleManager {
    registry: Arc<InstanceRegistry>,
    worker: DynWorker,
    cancel_all: CancellationToken,
    running: Mutex<HashMap<usize, WorkerContainer>>,
}

struct WorkerContainer {
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
    started_at: chrono::DateTime<chrono::Utc>,
}

impl WorkerContainer {
    fn is_live(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl LifecycleManager {
    pub fn new(registry: Arc<InstanceRegistry>, worker: DynWorker) -> Self {
        Self {
            registry,
            worker,
            cancel_all: CancellationToken::new(),
            running: Mutex::new(HashMap::new()),
        }
    }

    /// Spawns the worker of instance `id` on the current tokio runtime.
    ///
    /// The worker runs detached: nothing waits for it unless the whole
    /// manager is shut down.
    pub fn start(&self, id: usize) -> Result<()> {
        let ctx = self.registry.get(id)?;

        if self.cancel_all.is_cancelled() {
            return Err(OutputError::Internal(anyhow!(
                "lifecycle manager is shutting down"
            )));
        }

        let runtime = Handle::try_current()
            .map_err(|err| OutputError::Internal(anyhow!("no async runtime available: {}", err)))?;

        let mut running = self.running.lock();
        if running.get(&id).is_some_and(WorkerContainer::is_live) {
            return Err(OutputError::AlreadyRunning(id));
        }

        debug!(instance_id = id, "launching server worker");

        let cancel_token = self.cancel_all.child_token();
        let task_cancel = cancel_token.clone();
        let worker = self.worker.clone();

        let handle = runtime.spawn(
            async move {
                info!("server worker started");
                match worker.run(ctx, task_cancel).await {
                    Ok(()) => info!("server worker exited"),
                    Err(err) => error!("server worker failed: {:#}", err),
                }
            }
            .instrument(info_span!("instance", instance_id = id)),
        );

        // a finished worker left behind by a previous start is replaced here
        running.insert(
            id,
            WorkerContainer {
                handle,
                cancel_token,
                started_at: chrono::Utc::now(),
            },
        );

        Ok(())
    }

    /// Requests cancellation of the worker of instance `id` and returns
    /// without waiting for it.
    ///
    /// This is a coarse cleanup primitive, not a graceful drain: client
    /// connections the worker already accepted are not guaranteed to be
    /// closed cleanly. Succeeds whether or not a worker was still running.
    pub fn stop(&self, id: usize) -> Result<()> {
        self.registry.get(id)?;

        match self.running.lock().remove(&id) {
            Some(container) => {
                let uptime = chrono::Utc::now() - container.started_at;
                info!(
                    instance_id = id,
                    "cancelling server worker after {}s",
                    uptime.num_seconds()
                );
                container.cancel_token.cancel();
                // dropping the handle detaches the task
            }
            None => debug!(instance_id = id, "no server worker to cancel"),
        }

        Ok(())
    }

    pub fn is_running(&self, id: usize) -> bool {
        self.running
            .lock()
            .get(&id)
            .is_some_and(WorkerContainer::is_live)
    }

    /// Ids of instances with a live worker, ascending.
    pub fn running(&self) -> Vec<usize> {
        let mut ids: Vec<usize> = self
            .running
            .lock()
            .iter()
            .filter(|(_, container)| container.is_live())
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Cancels every worker and waits for the tracked ones to exit. No
    /// worker can be started afterwards.
    pub async fn shutdown(&self) {
        info!("shutting down all server workers");
        self.cancel_all.cancel();

        let containers: Vec<(usize, WorkerContainer)> = self.running.lock().drain().collect();
        for (id, container) in containers {
            if let Err(err) = container.handle.await {
                warn!(instance_id = id, "server worker did not exit cleanly: {}", err);
            }
        }

        info!("all server workers exited");
    }
}
