//! Activation poller
//!
//! 激活轮询器：每次 tick 调用一次后端的激活检查，并将结果归类为
//! 待定 / 已激活 / 失败。下一次 tick 由状态机决定是否重新挂载，
//! 形成一条可在两次 tick 之间取消的链，而不是阻塞循环。

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::{debug, warn};
use vp_core::ports::DeviceBackendPort;
use vp_core::{DeviceIdentity, PairingErrorKind, SessionId};

use super::scheduler::TaskScheduler;

/// Classified result of one activation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The user has not entered the code yet.
    Pending,
    Activated(DeviceIdentity),
    Failed {
        kind: PairingErrorKind,
        error: String,
    },
}

/// Checks activation on a chain of scheduled ticks.
pub struct ActivationPoller {
    backend: Arc<dyn DeviceBackendPort>,
    scheduler: Arc<TaskScheduler>,
    interval: Duration,
}

impl ActivationPoller {
    pub fn new(
        backend: Arc<dyn DeviceBackendPort>,
        scheduler: Arc<TaskScheduler>,
        interval: Duration,
    ) -> Self {
        Self {
            backend,
            scheduler,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one activation check.
    pub async fn check(&self, session_id: &SessionId, access_token: &str) -> PollOutcome {
        match self.backend.check_activation(session_id, access_token).await {
            Ok(identity) => {
                debug!(%session_id, uuid = %identity.uuid, "activation confirmed by backend");
                PollOutcome::Activated(identity)
            }
            Err(err) if err.kind() == PairingErrorKind::Pending => {
                debug!(%session_id, "activation still pending");
                PollOutcome::Pending
            }
            Err(err) => {
                warn!(%session_id, error = %err, "activation check failed");
                PollOutcome::Failed {
                    kind: err.kind(),
                    error: err.to_string(),
                }
            }
        }
    }

    /// Arm the next tick. Returns `false` once the poller is stopped.
    pub fn schedule_tick(&self, delay: Duration, tick: BoxFuture<'static, ()>) -> bool {
        self.scheduler.schedule(delay, tick)
    }

    pub fn is_stopped(&self) -> bool {
        self.scheduler.is_shut_down()
    }

    /// Stop arming ticks and wait for an in-flight one to finish.
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }
}
