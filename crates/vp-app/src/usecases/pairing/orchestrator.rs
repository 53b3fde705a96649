//! Pairing orchestrator
//!
//! 这个模块负责编排配对状态机：把用户触发、后端结果、存储结果和定时器
//! 事件转换为状态机事件，并执行状态机返回的动作。
//!
//! # Architecture / 架构
//!
//! ```text
//! request_pairing / poll tick / save retry / restart
//!   ↓
//! PairingOrchestrator (dispatch lock, 串行化所有转换)
//!   ↓
//! PairingStateMachine (pure state transitions)
//!   ↓
//! PairingActions (executed here, results fed back as events)
//!   ↓
//! Backend / Credential store / Notifier / TaskScheduler
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tracing::{debug, info, info_span, warn, Instrument};

use vp_core::pairing::{
    PairingAction, PairingEvent, PairingNotification, PairingPolicy, PairingSession,
    PairingStateMachine, PairingStatus, RestartCause,
};
use vp_core::ports::{ClockPort, CredentialStorePort, DeviceBackendPort, NotifierPort};
use vp_core::settings::model::{PairingSettings, Settings};
use vp_core::SessionId;

use super::poller::{ActivationPoller, PollOutcome};
use super::presenter::NotificationPresenter;
use super::scheduler::TaskScheduler;

/// 配对编排器配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingConfig {
    /// 轮询间隔(秒)
    pub poll_interval_secs: u64,
    /// 每 N 次待定轮询重新播报配对码
    pub code_repeat_every: u32,
    /// 配对码有效期上限(秒)
    pub code_lifetime_secs: u64,
    /// 取码失败后的重试间隔(秒)
    pub code_fetch_retry_delay_secs: u64,
    /// 取码最大重试次数
    pub max_code_fetch_retries: u32,
    /// 保存失败后的重试间隔(秒)
    pub save_retry_delay_secs: u64,
    /// 保存总尝试次数
    pub max_save_attempts: u32,
    /// 会话中止后重新开始前的等待(秒)
    pub restart_delay_secs: u64,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl PairingConfig {
    /// Build from settings; every duration and count is at least 1.
    pub fn from_settings(settings: &Settings) -> Self {
        let pairing = &settings.pairing;
        Self {
            poll_interval_secs: pairing.poll_interval_secs.max(1),
            code_repeat_every: pairing.code_repeat_every.max(1),
            code_lifetime_secs: pairing.code_lifetime_secs.max(1),
            code_fetch_retry_delay_secs: pairing.code_fetch_retry_delay_secs.max(1),
            max_code_fetch_retries: pairing.max_code_fetch_retries.max(1),
            save_retry_delay_secs: pairing.save_retry_delay_secs.max(1),
            max_save_attempts: pairing.max_save_attempts.max(1),
            restart_delay_secs: pairing.restart_delay_secs.max(1),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn policy(&self) -> PairingPolicy {
        PairingPolicy::from_settings(&PairingSettings {
            poll_interval_secs: self.poll_interval_secs,
            code_repeat_every: self.code_repeat_every,
            code_lifetime_secs: self.code_lifetime_secs,
            code_fetch_retry_delay_secs: self.code_fetch_retry_delay_secs,
            max_code_fetch_retries: self.max_code_fetch_retries,
            save_retry_delay_secs: self.save_retry_delay_secs,
            max_save_attempts: self.max_save_attempts,
            restart_delay_secs: self.restart_delay_secs,
        })
    }
}

/// Last published view of the machine, readable without the dispatch lock.
#[derive(Debug, Clone)]
struct PairingSnapshot {
    status: PairingStatus,
    session: Option<PairingSession>,
}

/// 配对编排器
///
/// Owns the device's single pairing flow. All transitions run under one
/// dispatch lock, so triggers, poll ticks and retries are totally ordered.
#[derive(Clone)]
pub struct PairingOrchestrator {
    /// State machine; the mutex doubles as the dispatch lock.
    machine: Arc<Mutex<PairingStateMachine>>,
    /// Read side for status queries; never held across an await.
    snapshot: Arc<RwLock<PairingSnapshot>>,
    backend: Arc<dyn DeviceBackendPort>,
    credentials: Arc<dyn CredentialStorePort>,
    clock: Arc<dyn ClockPort>,
    presenter: Arc<NotificationPresenter>,
    poller: Arc<ActivationPoller>,
    scheduler: Arc<TaskScheduler>,
    shut_down: Arc<AtomicBool>,
}

impl PairingOrchestrator {
    pub fn new(
        config: PairingConfig,
        backend: Arc<dyn DeviceBackendPort>,
        credentials: Arc<dyn CredentialStorePort>,
        notifier: Arc<dyn NotifierPort>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        let scheduler = Arc::new(TaskScheduler::new());
        let poller = Arc::new(ActivationPoller::new(
            backend.clone(),
            scheduler.clone(),
            config.poll_interval(),
        ));

        Self {
            machine: Arc::new(Mutex::new(PairingStateMachine::with_policy(config.policy()))),
            snapshot: Arc::new(RwLock::new(PairingSnapshot {
                status: PairingStatus::Idle,
                session: None,
            })),
            backend,
            credentials,
            clock,
            presenter: Arc::new(NotificationPresenter::new(notifier)),
            poller,
            scheduler,
            shut_down: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start pairing unless a session is already running or the device is paired.
    pub async fn request_pairing(&self) {
        let span = info_span!("usecase.pairing.request_pairing");
        async {
            let mut machine = self.machine.lock().await;
            if self.is_shut_down() {
                info!("pairing shut down; request ignored");
                return;
            }
            if machine.is_active() {
                info!(
                    session_id = ?machine.session().map(|s| s.session_id().as_str()),
                    status = ?machine.status(),
                    "pairing already in progress"
                );
                return;
            }

            self.begin(&mut machine, PairingEvent::StartPairing).await;
        }
        .instrument(span)
        .await
    }

    /// Entry point for the "device not paired" signal.
    pub async fn handle_not_paired(&self, quiet: bool) {
        let span = info_span!("usecase.pairing.handle_not_paired", quiet);
        async {
            if self.is_shut_down() {
                info!("pairing shut down; not-paired signal ignored");
                return;
            }
            if !quiet {
                self.presenter
                    .present(&PairingNotification::NotPaired)
                    .await;
            }
            self.request_pairing().await;
        }
        .instrument(span)
        .await
    }

    /// Cancel pending timers and wait for any in-flight tick before returning.
    pub async fn shutdown(&self) {
        let span = info_span!("usecase.pairing.shutdown");
        async {
            if self.shut_down.swap(true, Ordering::SeqCst) {
                debug!("pairing already shut down");
                return;
            }
            self.poller.shutdown().await;

            let mut machine = self.machine.lock().await;
            if let Some(session) = machine.session() {
                info!(
                    session_id = %session.session_id(),
                    status = ?session.status(),
                    "dropping pairing session on shutdown"
                );
            }
            *machine = PairingStateMachine::with_policy(machine.policy().clone());
            self.publish(&machine);
            info!("pairing shut down");
        }
        .instrument(span)
        .await
    }

    pub fn status(&self) -> PairingStatus {
        self.read_snapshot().status
    }

    pub fn current_session(&self) -> Option<PairingSession> {
        self.read_snapshot().session
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Whether the rest of the device has finished starting up.
    pub fn set_system_ready(&self, ready: bool) {
        self.presenter.set_system_ready(ready);
    }

    fn read_snapshot(&self) -> PairingSnapshot {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, machine: &PairingStateMachine) {
        let mut snapshot = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        snapshot.status = machine.status();
        snapshot.session = machine.session().cloned();
    }

    /// Dispatch `trigger` unless the credential store already holds an identity.
    ///
    /// Caller must hold the dispatch lock.
    async fn begin(&self, machine: &mut PairingStateMachine, trigger: PairingEvent) {
        let event = match self.credentials.load() {
            Ok(Some(identity)) => {
                info!(uuid = %identity.uuid, "device already paired");
                PairingEvent::AlreadyPaired
            }
            Ok(None) => trigger,
            Err(err) => {
                warn!(error = %err, "could not read stored identity; pairing anyway");
                trigger
            }
        };
        self.dispatch(machine, event).await;
    }

    /// Feed `event` through the machine, executing actions until no follow-up remains.
    ///
    /// Caller must hold the dispatch lock.
    async fn dispatch(&self, machine: &mut PairingStateMachine, event: PairingEvent) {
        let mut queue = VecDeque::from([event]);

        while let Some(event) = queue.pop_front() {
            let (_, actions) = machine.handle_event(event, self.clock.now_ms());
            self.publish(machine);

            for action in actions {
                if let Some(follow_up) = self.execute_action(machine, action).await {
                    queue.push_back(follow_up);
                }
            }
        }
    }

    async fn execute_action(
        &self,
        machine: &PairingStateMachine,
        action: PairingAction,
    ) -> Option<PairingEvent> {
        match action {
            PairingAction::LogTransition {
                session_id,
                old_status,
                event,
                new_status,
            } => {
                info!(
                    session_id = ?session_id.as_ref().map(SessionId::as_str),
                    from = ?old_status,
                    to = ?new_status,
                    event = %event,
                    "pairing state transition"
                );
                None
            }
            PairingAction::FetchCode { session_id } => Some(self.fetch_code(session_id).await),
            PairingAction::Notify(notification) => {
                self.presenter.present(&notification).await;
                None
            }
            PairingAction::StartPoller { session_id } => {
                info!(%session_id, interval_secs = self.poller.interval().as_secs(), "activation poller armed");
                Some(PairingEvent::PollerStarted { session_id })
            }
            PairingAction::SchedulePoll { session_id, delay } => {
                let tick = self.poll_tick(session_id.clone());
                if !self.poller.schedule_tick(delay, tick) {
                    debug!(%session_id, "poller stopped; tick not armed");
                }
                None
            }
            PairingAction::SaveIdentity { session_id, delay } => {
                if delay.is_zero() {
                    return self.save_identity(machine, session_id);
                }
                let task = self.save_tick(session_id.clone());
                if !self.scheduler.schedule(delay, task) {
                    debug!(%session_id, "scheduler stopped; save retry dropped");
                }
                None
            }
            PairingAction::StopNarration => {
                self.presenter.stop_narration().await;
                None
            }
            PairingAction::Emit(event) => {
                self.presenter.emit(&event).await;
                None
            }
            PairingAction::ScheduleRestart {
                delay,
                cause,
                generation,
            } => {
                info!(?cause, generation, delay_secs = delay.as_secs(), "pairing restart scheduled");
                if !self.scheduler.schedule(delay, self.restart_tick(cause, generation)) {
                    debug!(?cause, generation, "scheduler stopped; restart dropped");
                }
                None
            }
        }
    }

    async fn fetch_code(&self, session_id: SessionId) -> PairingEvent {
        match self.backend.request_code(&session_id).await {
            Ok(code) => {
                info!(%session_id, code = %code.code, expires_in_secs = code.expires_in_secs, "pairing code issued");
                PairingEvent::CodeIssued { session_id, code }
            }
            Err(err) => {
                warn!(%session_id, error = %err, "pairing code request failed");
                PairingEvent::CodeFetchFailed {
                    session_id,
                    kind: err.kind(),
                    error: err.to_string(),
                }
            }
        }
    }

    fn save_identity(
        &self,
        machine: &PairingStateMachine,
        session_id: SessionId,
    ) -> Option<PairingEvent> {
        let Some(identity) = machine.pending_identity_for(&session_id) else {
            debug!(%session_id, "no identity waiting to be saved");
            return None;
        };

        match self.credentials.save(&identity) {
            Ok(()) => {
                info!(%session_id, uuid = %identity.uuid, "device identity saved");
                Some(PairingEvent::IdentitySaved { session_id })
            }
            Err(err) => {
                warn!(%session_id, error = %err, kind = %err.kind(), "saving device identity failed");
                Some(PairingEvent::IdentitySaveFailed {
                    session_id,
                    error: err.to_string(),
                })
            }
        }
    }

    fn poll_tick(&self, session_id: SessionId) -> BoxFuture<'static, ()> {
        let this = self.clone();
        let span = info_span!("usecase.pairing.poll_tick", session_id = %session_id);
        Box::pin(
            async move {
                let mut machine = this.machine.lock().await;
                if this.is_shut_down() || !machine.is_current(&session_id) {
                    debug!("stale poll tick skipped");
                    return;
                }
                let Some(access_token) = machine.access_token_for(&session_id) else {
                    debug!("session has no access token; tick skipped");
                    return;
                };

                let event = match this.poller.check(&session_id, &access_token).await {
                    PollOutcome::Pending => PairingEvent::ActivationPending { session_id },
                    PollOutcome::Activated(identity) => PairingEvent::ActivationConfirmed {
                        session_id,
                        identity,
                    },
                    PollOutcome::Failed { kind, error } => PairingEvent::ActivationFailed {
                        session_id,
                        kind,
                        error,
                    },
                };
                this.dispatch(&mut machine, event).await;
            }
            .instrument(span),
        )
    }

    fn save_tick(&self, session_id: SessionId) -> BoxFuture<'static, ()> {
        let this = self.clone();
        let span = info_span!("usecase.pairing.save_retry", session_id = %session_id);
        Box::pin(
            async move {
                let mut machine = this.machine.lock().await;
                if this.is_shut_down() || !machine.is_current(&session_id) {
                    debug!("stale save retry skipped");
                    return;
                }
                if let Some(event) = this.save_identity(&machine, session_id) {
                    this.dispatch(&mut machine, event).await;
                }
            }
            .instrument(span),
        )
    }

    fn restart_tick(&self, cause: RestartCause, generation: u64) -> BoxFuture<'static, ()> {
        let this = self.clone();
        let span = info_span!("usecase.pairing.restart", cause = ?cause, generation);
        Box::pin(
            async move {
                let mut machine = this.machine.lock().await;
                if this.is_shut_down() || !machine.is_restart_pending(generation) {
                    debug!("superseded restart skipped");
                    return;
                }
                this.begin(&mut machine, PairingEvent::RestartDue { generation })
                    .await;
            }
            .instrument(span),
        )
    }
}
