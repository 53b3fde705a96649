#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use vp_app::{PairingConfig, PairingOrchestrator};
use vp_core::pairing::IssuedCode;
use vp_core::ports::{
    BackendError, ClockPort, CredentialStoreError, CredentialStorePort, DeviceBackendPort,
    DisplayContent, NotifierPort,
};
use vp_core::{DeviceIdentity, SessionId};

pub fn test_config() -> PairingConfig {
    PairingConfig {
        poll_interval_secs: 10,
        code_repeat_every: 6,
        code_lifetime_secs: 72_000,
        code_fetch_retry_delay_secs: 10,
        max_code_fetch_retries: 3,
        save_retry_delay_secs: 2,
        max_save_attempts: 2,
        restart_delay_secs: 5,
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// --- clock ---

/// Milliseconds since construction on tokio's (pausable) clock.
pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl ClockPort for TokioClock {
    fn now_ms(&self) -> i64 {
        self.origin.elapsed().as_millis() as i64
    }
}

// --- backend ---

#[derive(Debug, Clone)]
pub enum CodeReply {
    Issue {
        code: String,
        token: String,
        expires_in_secs: u64,
    },
    Offline,
}

impl CodeReply {
    pub fn issue(code: &str, token: &str, expires_in_secs: u64) -> Self {
        CodeReply::Issue {
            code: code.to_string(),
            token: token.to_string(),
            expires_in_secs,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ActivationReply {
    Pending,
    Activate(DeviceIdentity),
    ServerError,
}

/// Scripted backend. Queued replies are used first, then the defaults.
pub struct FakeBackend {
    code_replies: Mutex<VecDeque<CodeReply>>,
    default_code: Mutex<CodeReply>,
    activation_replies: Mutex<VecDeque<ActivationReply>>,
    code_delay: Mutex<Duration>,
    activation_delay: Mutex<Duration>,
    code_requests: Mutex<Vec<SessionId>>,
    activation_checks: Mutex<Vec<(SessionId, String)>>,
    completed_checks: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            code_replies: Mutex::new(VecDeque::new()),
            default_code: Mutex::new(CodeReply::issue("ABC123", "T1", 72_000)),
            activation_replies: Mutex::new(VecDeque::new()),
            code_delay: Mutex::new(Duration::ZERO),
            activation_delay: Mutex::new(Duration::ZERO),
            code_requests: Mutex::new(Vec::new()),
            activation_checks: Mutex::new(Vec::new()),
            completed_checks: AtomicUsize::new(0),
        }
    }

    pub fn push_code(&self, reply: CodeReply) {
        self.code_replies.lock().unwrap().push_back(reply);
    }

    pub fn set_default_code(&self, reply: CodeReply) {
        *self.default_code.lock().unwrap() = reply;
    }

    pub fn push_activation(&self, reply: ActivationReply) {
        self.activation_replies.lock().unwrap().push_back(reply);
    }

    pub fn set_code_delay(&self, delay: Duration) {
        *self.code_delay.lock().unwrap() = delay;
    }

    pub fn set_activation_delay(&self, delay: Duration) {
        *self.activation_delay.lock().unwrap() = delay;
    }

    pub fn code_requests(&self) -> Vec<SessionId> {
        self.code_requests.lock().unwrap().clone()
    }

    pub fn activation_checks(&self) -> Vec<(SessionId, String)> {
        self.activation_checks.lock().unwrap().clone()
    }

    pub fn completed_checks(&self) -> usize {
        self.completed_checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceBackendPort for FakeBackend {
    async fn request_code(&self, session_id: &SessionId) -> Result<IssuedCode, BackendError> {
        self.code_requests.lock().unwrap().push(session_id.clone());
        let delay = *self.code_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let reply = self
            .code_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default_code.lock().unwrap().clone());
        match reply {
            CodeReply::Issue {
                code,
                token,
                expires_in_secs,
            } => Ok(IssuedCode {
                code,
                access_token: token,
                expires_in_secs,
            }),
            CodeReply::Offline => Err(BackendError::Connectivity("connection refused".into())),
        }
    }

    async fn check_activation(
        &self,
        session_id: &SessionId,
        access_token: &str,
    ) -> Result<DeviceIdentity, BackendError> {
        self.activation_checks
            .lock()
            .unwrap()
            .push((session_id.clone(), access_token.to_string()));
        let delay = *self.activation_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let reply = self
            .activation_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ActivationReply::Pending);
        self.completed_checks.fetch_add(1, Ordering::SeqCst);
        match reply {
            ActivationReply::Pending => Err(BackendError::Pending),
            ActivationReply::Activate(identity) => Ok(identity),
            ActivationReply::ServerError => Err(BackendError::Status {
                status: 500,
                message: "internal error".into(),
            }),
        }
    }
}

// --- notifier ---

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Speak(String, Value),
    Display(DisplayContent),
    Emit(String, Value),
    StopSpeaking,
}

#[derive(Default)]
pub struct FakeNotifier {
    calls: Mutex<Vec<Call>>,
    speaking: AtomicBool,
}

impl FakeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_speaking(&self, speaking: bool) {
        self.speaking.store(speaking, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Speak(dialog, _) => Some(dialog),
                _ => None,
            })
            .collect()
    }

    pub fn spoken_count(&self, dialog: &str) -> usize {
        self.spoken().iter().filter(|d| d.as_str() == dialog).count()
    }

    pub fn events(&self) -> Vec<(String, Value)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Emit(name, payload) => Some((name, payload)),
                _ => None,
            })
            .collect()
    }

    pub fn event_names(&self) -> Vec<String> {
        self.events().into_iter().map(|(name, _)| name).collect()
    }
}

#[async_trait]
impl NotifierPort for FakeNotifier {
    async fn speak(&self, dialog: &str, data: Value) -> anyhow::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Speak(dialog.to_string(), data));
        Ok(())
    }

    async fn display(&self, content: DisplayContent) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(Call::Display(content));
        Ok(())
    }

    async fn emit_event(&self, name: &str, payload: Value) -> anyhow::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Emit(name.to_string(), payload));
        Ok(())
    }

    async fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    async fn stop_speaking(&self) -> anyhow::Result<()> {
        self.speaking.store(false, Ordering::SeqCst);
        self.calls.lock().unwrap().push(Call::StopSpeaking);
        Ok(())
    }
}

// --- credential store ---

#[derive(Default)]
pub struct MemoryCredentialStore {
    identity: Mutex<Option<DeviceIdentity>>,
    failing_saves: AtomicUsize,
    save_calls: AtomicUsize,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(identity: DeviceIdentity) -> Self {
        let store = Self::default();
        *store.identity.lock().unwrap() = Some(identity);
        store
    }

    /// Make the next `count` saves fail.
    pub fn fail_next_saves(&self, count: usize) {
        self.failing_saves.store(count, Ordering::SeqCst);
    }

    pub fn stored(&self) -> Option<DeviceIdentity> {
        self.identity.lock().unwrap().clone()
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }
}

impl CredentialStorePort for MemoryCredentialStore {
    fn load(&self) -> Result<Option<DeviceIdentity>, CredentialStoreError> {
        Ok(self.identity.lock().unwrap().clone())
    }

    fn save(&self, identity: &DeviceIdentity) -> Result<(), CredentialStoreError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self.failing_saves.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_saves.store(failing - 1, Ordering::SeqCst);
            return Err(CredentialStoreError::Store("disk full".into()));
        }
        *self.identity.lock().unwrap() = Some(identity.clone());
        Ok(())
    }
}

mockall::mock! {
    pub CredentialStore {}

    impl CredentialStorePort for CredentialStore {
        fn load(&self) -> Result<Option<DeviceIdentity>, CredentialStoreError>;
        fn save(&self, identity: &DeviceIdentity) -> Result<(), CredentialStoreError>;
    }
}

// --- harness ---

pub struct Harness {
    pub orchestrator: PairingOrchestrator,
    pub backend: Arc<FakeBackend>,
    pub notifier: Arc<FakeNotifier>,
    pub store: Arc<MemoryCredentialStore>,
}

pub fn harness() -> Harness {
    harness_with(test_config(), MemoryCredentialStore::new())
}

pub fn harness_with(config: PairingConfig, store: MemoryCredentialStore) -> Harness {
    init_tracing();
    let backend = Arc::new(FakeBackend::new());
    let notifier = Arc::new(FakeNotifier::new());
    let store = Arc::new(store);
    let orchestrator = PairingOrchestrator::new(
        config,
        backend.clone(),
        store.clone(),
        notifier.clone(),
        Arc::new(TokioClock::new()),
    );
    Harness {
        orchestrator,
        backend,
        notifier,
        store,
    }
}
