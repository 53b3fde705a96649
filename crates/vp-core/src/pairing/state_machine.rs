//! Device pairing state machine
//!
//! 设备配对状态机：纯函数式状态转换，不包含任何 I/O。
//!
//! # Design Principles / 设计原则
//!
//! - **显式状态**: 每个阶段都有明确的 [`PairingStatus`]
//! - **单飞**: 同一时刻最多一个活跃会话，重复触发是空操作
//! - **审计友好**: 每次转换都产生一条 `LogTransition` 动作
//! - **可测试**: `(state, event, now) -> (new_state, actions[])`
//!
//! # Architecture / 架构
//!
//! ```text
//! PairingStateMachine (vp-core)
//!   ├── PairingSession: 当前会话 (session_id / code / 过期时间 / 计数器)
//!   ├── PairingEvent:   后端结果、轮询结果、存储结果
//!   └── PairingAction:  取码、展示、轮询调度、持久化、通知
//!
//! PairingOrchestrator (vp-app)
//!   ├── 串行化所有事件 (dispatch lock)
//!   ├── 调用状态机获取 actions
//!   └── 执行 actions (后端调用 / 定时器 / 存储 / Notifier)
//! ```

use std::time::Duration;

use crate::device::DeviceIdentity;
use crate::ids::SessionId;
use crate::pairing::error::PairingErrorKind;
use crate::pairing::notification::{PairingBusEvent, PairingNotification};
use crate::pairing::retry::{save_retry_decision, RetryDecision, RetryPolicy, RetryTracker};
use crate::pairing::session::{IssuedCode, PairingSession, PairingStatus};
use crate::settings::model::PairingSettings;

/// Events that drive the pairing flow.
///
/// 驱动配对流程的事件。除 `StartPairing` 外，所有事件都带有会话 ID，
/// 与当前会话不匹配的事件会被忽略（例如重启后才触发的旧定时器）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingEvent {
    /// External trigger: not paired / explicit pairing request.
    StartPairing,
    /// A scheduled restart fired. Only the most recently armed one is honoured.
    RestartDue { generation: u64 },
    /// The credential store already holds an identity; nothing to pair.
    AlreadyPaired,
    /// Backend issued a code.
    CodeIssued {
        session_id: SessionId,
        code: IssuedCode,
    },
    /// Code request failed.
    CodeFetchFailed {
        session_id: SessionId,
        kind: PairingErrorKind,
        error: String,
    },
    /// The poller for the session has been armed.
    PollerStarted { session_id: SessionId },
    /// Backend says the user has not finished activation yet.
    ActivationPending { session_id: SessionId },
    /// Backend returned the device identity.
    ActivationConfirmed {
        session_id: SessionId,
        identity: DeviceIdentity,
    },
    /// Activation check failed with anything other than the pending signal.
    ActivationFailed {
        session_id: SessionId,
        kind: PairingErrorKind,
        error: String,
    },
    /// Credential store accepted the identity.
    IdentitySaved { session_id: SessionId },
    /// Credential store rejected the identity.
    IdentitySaveFailed {
        session_id: SessionId,
        error: String,
    },
}

impl PairingEvent {
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            PairingEvent::StartPairing
            | PairingEvent::RestartDue { .. }
            | PairingEvent::AlreadyPaired => None,
            PairingEvent::CodeIssued { session_id, .. }
            | PairingEvent::CodeFetchFailed { session_id, .. }
            | PairingEvent::PollerStarted { session_id }
            | PairingEvent::ActivationPending { session_id }
            | PairingEvent::ActivationConfirmed { session_id, .. }
            | PairingEvent::ActivationFailed { session_id, .. }
            | PairingEvent::IdentitySaved { session_id }
            | PairingEvent::IdentitySaveFailed { session_id, .. } => Some(session_id),
        }
    }
}

/// Why a fresh pairing attempt is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartCause {
    /// Code fetch failed; retry quietly.
    CodeFetchRetry,
    /// Session aborted; start over with a new code.
    SessionAborted,
}

/// Side effects produced by transitions.
///
/// 状态转换产生的动作，由 orchestrator 执行。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingAction {
    /// Request a code from the backend for this session.
    FetchCode { session_id: SessionId },
    /// Tell the user something.
    Notify(PairingNotification),
    /// Arm the activation poller.
    StartPoller { session_id: SessionId },
    /// Run an activation check after `delay`.
    SchedulePoll {
        session_id: SessionId,
        delay: Duration,
    },
    /// Persist the session's pending identity after `delay`.
    SaveIdentity {
        session_id: SessionId,
        delay: Duration,
    },
    /// Stop any code narration still playing.
    StopNarration,
    /// Publish an event on the device bus.
    Emit(PairingBusEvent),
    /// Re-enter pairing quietly after `delay` by feeding back
    /// `RestartDue { generation }`.
    ScheduleRestart {
        delay: Duration,
        cause: RestartCause,
        generation: u64,
    },
    /// Audit record of a transition.
    LogTransition {
        session_id: Option<SessionId>,
        old_status: PairingStatus,
        event: String,
        new_status: PairingStatus,
    },
}

/// Timing and limits for the pairing flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingPolicy {
    /// Delay between activation checks.
    pub poll_interval: Duration,
    /// Re-present the code on every n-th pending poll.
    pub code_repeat_every: u32,
    /// Upper bound on how long a code stays valid.
    pub code_lifetime: Duration,
    /// Delay before a new attempt after an aborted session.
    pub restart_delay: Duration,
    pub retry: RetryPolicy,
}

impl PairingPolicy {
    pub fn from_settings(settings: &PairingSettings) -> Self {
        Self {
            poll_interval: Duration::from_secs(settings.poll_interval_secs),
            code_repeat_every: settings.code_repeat_every,
            code_lifetime: Duration::from_secs(settings.code_lifetime_secs),
            restart_delay: Duration::from_secs(settings.restart_delay_secs),
            retry: RetryPolicy {
                code_fetch_retry_delay: Duration::from_secs(settings.code_fetch_retry_delay_secs),
                max_code_fetch_retries: settings.max_code_fetch_retries,
                save_retry_delay: Duration::from_secs(settings.save_retry_delay_secs),
                max_save_attempts: settings.max_save_attempts,
            },
        }
    }
}

impl Default for PairingPolicy {
    fn default() -> Self {
        Self::from_settings(&PairingSettings::default())
    }
}

/// Pairing state machine.
///
/// Owns the single pairing session of the device and decides every
/// transition. It performs no I/O; callers feed results back in as events.
///
/// # Example / 示例
///
/// ```
/// use vp_core::pairing::{PairingAction, PairingEvent, PairingStateMachine, PairingStatus};
///
/// let mut sm = PairingStateMachine::new();
/// let (status, actions) = sm.handle_event(PairingEvent::StartPairing, 0);
/// assert_eq!(status, PairingStatus::AwaitingCode);
/// assert!(actions
///     .iter()
///     .any(|action| matches!(action, PairingAction::FetchCode { .. })));
/// ```
#[derive(Debug, Clone)]
pub struct PairingStateMachine {
    session: Option<PairingSession>,
    retry: RetryTracker,
    policy: PairingPolicy,
    /// Terminal status reached by the last transition, reported once in its log record.
    last_terminal: Option<PairingStatus>,
    /// Generation of the armed restart, if any. Superseded timers carry an older one.
    pending_restart: Option<u64>,
    restart_generation: u64,
}

impl Default for PairingStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PairingStateMachine {
    pub fn new() -> Self {
        Self::with_policy(PairingPolicy::default())
    }

    pub fn with_policy(policy: PairingPolicy) -> Self {
        Self {
            session: None,
            retry: RetryTracker::new(),
            policy,
            last_terminal: None,
            pending_restart: None,
            restart_generation: 0,
        }
    }

    pub fn policy(&self) -> &PairingPolicy {
        &self.policy
    }

    /// Current status; `Idle` when no session exists.
    pub fn status(&self) -> PairingStatus {
        self.session
            .as_ref()
            .map(PairingSession::status)
            .unwrap_or(PairingStatus::Idle)
    }

    /// Whether a session currently holds the single-flight slot.
    pub fn is_active(&self) -> bool {
        self.status().is_active()
    }

    pub fn session(&self) -> Option<&PairingSession> {
        self.session.as_ref()
    }

    pub fn retry_tracker(&self) -> &RetryTracker {
        &self.retry
    }

    /// Generation of the restart currently armed.
    pub fn pending_restart(&self) -> Option<u64> {
        self.pending_restart
    }

    /// Whether a restart timer carrying `generation` is still the armed one.
    pub fn is_restart_pending(&self, generation: u64) -> bool {
        self.pending_restart == Some(generation)
    }

    /// Whether `session_id` names the live session.
    pub fn is_current(&self, session_id: &SessionId) -> bool {
        self.session
            .as_ref()
            .map(|session| session.session_id() == session_id)
            .unwrap_or(false)
    }

    /// Access token of the live session, used for activation checks.
    pub fn access_token_for(&self, session_id: &SessionId) -> Option<String> {
        self.session
            .as_ref()
            .filter(|session| session.session_id() == session_id)
            .and_then(|session| session.access_token().map(str::to_string))
    }

    /// Identity waiting to be saved for the live session.
    pub fn pending_identity_for(&self, session_id: &SessionId) -> Option<DeviceIdentity> {
        self.session
            .as_ref()
            .filter(|session| session.session_id() == session_id)
            .and_then(|session| session.pending_identity().cloned())
    }

    /// Handle one event and return the new status plus the actions to run.
    pub fn handle_event(
        &mut self,
        event: PairingEvent,
        now_ms: i64,
    ) -> (PairingStatus, Vec<PairingAction>) {
        let old_status = self.status();
        let session_id = event
            .session_id()
            .cloned()
            .or_else(|| self.session.as_ref().map(|s| s.session_id().clone()));
        let event_debug = format!("{:?}", event);

        let actions = self.transition(event, now_ms);
        let new_status = self.last_terminal.take().unwrap_or_else(|| self.status());

        let log_action = PairingAction::LogTransition {
            session_id,
            old_status,
            event: event_debug,
            new_status,
        };

        let mut all_actions = vec![log_action];
        all_actions.extend(actions);
        (self.status(), all_actions)
    }

    fn transition(&mut self, event: PairingEvent, now_ms: i64) -> Vec<PairingAction> {
        match event {
            PairingEvent::StartPairing => {
                if self.is_active() {
                    return Vec::new();
                }
                // A fresh trigger takes over from any armed restart.
                self.pending_restart = None;
                self.begin_session()
            }
            PairingEvent::RestartDue { generation } => {
                if self.is_active() || !self.is_restart_pending(generation) {
                    return Vec::new();
                }
                self.pending_restart = None;
                self.begin_session()
            }
            PairingEvent::AlreadyPaired => {
                if self.is_active() {
                    return Vec::new();
                }
                self.pending_restart = None;
                self.retry = RetryTracker::new();
                vec![PairingAction::Notify(PairingNotification::AlreadyPaired)]
            }
            PairingEvent::CodeIssued { session_id, code } => {
                let lifetime_ms = self.code_lifetime_ms(&code);
                let presented = code.code.clone();
                let Some(session) = self.live_session(&session_id, PairingStatus::AwaitingCode)
                else {
                    return Vec::new();
                };
                if !session.attach_code(code, now_ms, lifetime_ms) {
                    return Vec::new();
                }
                session.set_status(PairingStatus::CodePresented);
                self.retry.record_code_fetch_success();
                vec![
                    PairingAction::Notify(PairingNotification::PresentCode {
                        code: presented,
                        repeat: false,
                    }),
                    PairingAction::StartPoller { session_id },
                ]
            }
            PairingEvent::CodeFetchFailed { session_id, .. } => {
                if self
                    .live_session(&session_id, PairingStatus::AwaitingCode)
                    .is_none()
                {
                    return Vec::new();
                }
                self.session = None;
                match self.retry.record_code_fetch_failure(&self.policy.retry) {
                    RetryDecision::RetryAfter(delay) => {
                        vec![self.arm_restart(delay, RestartCause::CodeFetchRetry)]
                    }
                    RetryDecision::Exhausted => {
                        self.last_terminal = Some(PairingStatus::Aborted);
                        vec![PairingAction::Notify(PairingNotification::ConnectionError)]
                    }
                }
            }
            PairingEvent::PollerStarted { session_id } => {
                let delay = self.policy.poll_interval;
                let Some(session) = self.live_session(&session_id, PairingStatus::CodePresented)
                else {
                    return Vec::new();
                };
                session.set_status(PairingStatus::Polling);
                vec![PairingAction::SchedulePoll { session_id, delay }]
            }
            PairingEvent::ActivationPending { session_id } => {
                let delay = self.policy.poll_interval;
                let repeat_every = self.policy.code_repeat_every.max(1);
                let Some(session) = self.live_session(&session_id, PairingStatus::Polling) else {
                    return Vec::new();
                };
                if session.pending_identity().is_some() {
                    return Vec::new();
                }
                session.failed_poll_count += 1;

                if session.is_expired(now_ms) {
                    // Polling -> AwaitingCode: start over with a new session and code.
                    let next = PairingSession::new(SessionId::generate());
                    let next_id = next.session_id().clone();
                    self.session = Some(next);
                    return vec![PairingAction::FetchCode {
                        session_id: next_id,
                    }];
                }

                let mut actions = Vec::new();
                if session.failed_poll_count % repeat_every == 0 {
                    if let Some(code) = session.code() {
                        actions.push(PairingAction::Notify(PairingNotification::PresentCode {
                            code: code.to_string(),
                            repeat: true,
                        }));
                    }
                }
                actions.push(PairingAction::SchedulePoll { session_id, delay });
                actions
            }
            PairingEvent::ActivationConfirmed {
                session_id,
                identity,
            } => {
                let Some(session) = self.live_session(&session_id, PairingStatus::Polling) else {
                    return Vec::new();
                };
                if session.pending_identity().is_some() {
                    return Vec::new();
                }
                session.hold_identity(identity);
                vec![PairingAction::SaveIdentity {
                    session_id,
                    delay: Duration::ZERO,
                }]
            }
            PairingEvent::ActivationFailed { session_id, .. } => {
                if self
                    .live_session(&session_id, PairingStatus::Polling)
                    .is_none()
                {
                    return Vec::new();
                }
                self.abort_and_restart()
            }
            PairingEvent::IdentitySaved { session_id } => {
                let Some(session) = self.live_session(&session_id, PairingStatus::Polling) else {
                    return Vec::new();
                };
                let Some(uuid) = session.pending_identity().map(|i| i.uuid.clone()) else {
                    return Vec::new();
                };
                session.set_status(PairingStatus::Activated);
                self.session = None;
                self.retry = RetryTracker::new();
                self.last_terminal = Some(PairingStatus::Activated);
                vec![
                    PairingAction::StopNarration,
                    PairingAction::Notify(PairingNotification::Paired),
                    PairingAction::Emit(PairingBusEvent::Paired { uuid }),
                    PairingAction::Emit(PairingBusEvent::MicUnmute),
                    PairingAction::Emit(PairingBusEvent::ConfigurationUpdated),
                ]
            }
            PairingEvent::IdentitySaveFailed { session_id, .. } => {
                let retry_policy = self.policy.retry.clone();
                let Some(session) = self.live_session(&session_id, PairingStatus::Polling) else {
                    return Vec::new();
                };
                if session.pending_identity().is_none() {
                    return Vec::new();
                }
                session.failed_save_count += 1;
                match save_retry_decision(session.failed_save_count, &retry_policy) {
                    RetryDecision::RetryAfter(delay) => {
                        vec![PairingAction::SaveIdentity { session_id, delay }]
                    }
                    RetryDecision::Exhausted => self.abort_and_restart(),
                }
            }
        }
    }

    /// Live session with the given id, only if it is in `status`.
    fn live_session(
        &mut self,
        session_id: &SessionId,
        status: PairingStatus,
    ) -> Option<&mut PairingSession> {
        self.session
            .as_mut()
            .filter(|session| session.session_id() == session_id && session.status() == status)
    }

    fn code_lifetime_ms(&self, code: &IssuedCode) -> i64 {
        let policy_secs = self.policy.code_lifetime.as_secs();
        let secs = match code.expires_in_secs {
            0 => policy_secs,
            reported => reported.min(policy_secs),
        };
        i64::try_from(secs.saturating_mul(1000)).unwrap_or(i64::MAX)
    }

    fn begin_session(&mut self) -> Vec<PairingAction> {
        let session = PairingSession::new(SessionId::generate());
        let session_id = session.session_id().clone();
        self.session = Some(session);
        vec![PairingAction::FetchCode { session_id }]
    }

    /// Arm a restart, replacing whichever one was armed before.
    fn arm_restart(&mut self, delay: Duration, cause: RestartCause) -> PairingAction {
        self.restart_generation += 1;
        self.pending_restart = Some(self.restart_generation);
        PairingAction::ScheduleRestart {
            delay,
            cause,
            generation: self.restart_generation,
        }
    }

    fn abort_and_restart(&mut self) -> Vec<PairingAction> {
        if let Some(session) = self.session.as_mut() {
            session.set_status(PairingStatus::Aborted);
        }
        self.session = None;
        self.last_terminal = Some(PairingStatus::Aborted);
        let restart = self.arm_restart(self.policy.restart_delay, RestartCause::SessionAborted);
        vec![
            PairingAction::Notify(PairingNotification::RestartingAfterError),
            PairingAction::Emit(PairingBusEvent::NotPaired),
            restart,
        ]
    }
}
