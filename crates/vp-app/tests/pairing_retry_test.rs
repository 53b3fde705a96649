mod common;

use std::time::Duration;

use serde_json::json;
use vp_app::usecases::pairing::dialogs;
use vp_core::{DeviceIdentity, PairingStatus};

use common::{harness, ActivationReply, CodeReply};

#[tokio::test(start_paused = true)]
async fn pairing_retry_test_fetch_failures_are_bounded() {
    let h = harness();
    h.backend.set_default_code(CodeReply::Offline);

    h.orchestrator.handle_not_paired(false).await;
    tokio::time::sleep(Duration::from_secs(120)).await;

    // One initial attempt plus three retries.
    assert_eq!(h.backend.code_requests().len(), 4);
    assert_eq!(h.notifier.spoken_count(dialogs::CONNECTION_ERROR), 1);
    // Retries re-enter quietly.
    assert_eq!(h.notifier.spoken_count(dialogs::NOT_PAIRED), 1);
    assert_eq!(h.orchestrator.status(), PairingStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn pairing_retry_test_fetch_recovers_before_cap() {
    let h = harness();
    h.backend.push_code(CodeReply::Offline);
    h.backend.push_code(CodeReply::Offline);

    h.orchestrator.request_pairing().await;
    assert_eq!(h.orchestrator.status(), PairingStatus::Idle);

    tokio::time::sleep(Duration::from_secs(21)).await;
    assert_eq!(h.backend.code_requests().len(), 3);
    assert_eq!(h.orchestrator.status(), PairingStatus::Polling);
    assert_eq!(h.notifier.spoken_count(dialogs::CONNECTION_ERROR), 0);
    assert_eq!(h.notifier.spoken_count(dialogs::CODE), 1);
}

#[tokio::test(start_paused = true)]
async fn pairing_retry_test_save_fails_twice_then_session_restarts() {
    let h = harness();
    h.store.fail_next_saves(2);
    h.backend
        .push_activation(ActivationReply::Activate(DeviceIdentity::new("u1", "T2")));

    h.orchestrator.request_pairing().await;
    let first = h.orchestrator.current_session().expect("first session");

    // Poll at 10s, save retry at 12s, restart at 17s.
    tokio::time::sleep(Duration::from_secs(20)).await;

    assert_eq!(h.store.save_calls(), 2);
    assert!(h.store.stored().is_none());
    assert!(!h.notifier.event_names().contains(&"device.paired".to_string()));
    assert_eq!(
        h.notifier.events(),
        vec![("device.not.paired".to_string(), json!({ "quiet": true }))]
    );
    assert_eq!(h.notifier.spoken_count(dialogs::RESTARTING), 1);
    assert_eq!(h.notifier.spoken_count(dialogs::PAIRED), 0);

    let requests = h.backend.code_requests();
    assert_eq!(requests.len(), 2);
    assert_ne!(requests[1], *first.session_id());
    assert_eq!(h.orchestrator.status(), PairingStatus::Polling);
}

#[tokio::test(start_paused = true)]
async fn pairing_retry_test_save_succeeds_on_retry() {
    let h = harness();
    h.store.fail_next_saves(1);
    h.backend
        .push_activation(ActivationReply::Activate(DeviceIdentity::new("u1", "T2")));

    h.orchestrator.request_pairing().await;
    tokio::time::sleep(Duration::from_secs(13)).await;

    assert_eq!(h.store.save_calls(), 2);
    assert_eq!(h.store.stored().map(|i| i.uuid), Some("u1".to_string()));
    assert_eq!(
        h.notifier.event_names(),
        vec!["device.paired", "mic.unmute", "configuration.updated"]
    );
    assert_eq!(h.orchestrator.status(), PairingStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn pairing_retry_test_unexpected_poll_error_restarts_with_new_session() {
    let h = harness();
    h.backend.push_activation(ActivationReply::ServerError);

    h.orchestrator.request_pairing().await;
    let first = h.orchestrator.current_session().expect("first session");

    tokio::time::sleep(Duration::from_secs(12)).await;
    assert_eq!(h.orchestrator.status(), PairingStatus::Idle);
    assert_eq!(h.notifier.spoken_count(dialogs::RESTARTING), 1);
    assert_eq!(h.notifier.event_names(), vec!["device.not.paired"]);

    tokio::time::sleep(Duration::from_secs(5)).await;
    let second = h.orchestrator.current_session().expect("restarted session");
    assert_ne!(second.session_id(), first.session_id());
    assert_eq!(second.failed_poll_count, 0);
    assert_eq!(h.backend.code_requests().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn pairing_retry_test_expired_code_restarts_with_new_session() {
    let h = harness();
    h.backend
        .set_default_code(CodeReply::issue("ABC123", "T1", 30));

    h.orchestrator.request_pairing().await;
    let first = h.orchestrator.current_session().expect("first session");
    assert_eq!(first.expires_at_ms(), Some(30_000));

    tokio::time::sleep(Duration::from_secs(45)).await;

    let requests = h.backend.code_requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0], *first.session_id());
    assert_ne!(requests[1], requests[0]);

    let current = h.orchestrator.current_session().expect("new session");
    assert_eq!(current.session_id(), &requests[1]);
    assert_eq!(h.notifier.spoken_count(dialogs::CODE), 2);
    assert_eq!(h.notifier.spoken_count(dialogs::RESTARTING), 0);
}

#[tokio::test(start_paused = true)]
async fn pairing_retry_test_retrigger_during_fetch_retry_wait_keeps_one_chain() {
    let h = harness();
    h.backend.set_default_code(CodeReply::Offline);

    h.orchestrator.request_pairing().await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    h.orchestrator.request_pairing().await;
    tokio::time::sleep(Duration::from_secs(600)).await;

    // One initial attempt plus three retries, shared by both triggers.
    assert_eq!(h.backend.code_requests().len(), 4);
    assert_eq!(h.notifier.spoken_count(dialogs::CONNECTION_ERROR), 1);
    assert_eq!(h.orchestrator.status(), PairingStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn pairing_retry_test_trigger_during_restart_wait_replaces_restart() {
    let h = harness();
    h.backend.push_activation(ActivationReply::ServerError);

    h.orchestrator.request_pairing().await;
    // Poll at 10s aborts; the restart is armed for 15s.
    tokio::time::sleep(Duration::from_secs(12)).await;
    assert_eq!(h.orchestrator.status(), PairingStatus::Idle);

    h.orchestrator.handle_not_paired(true).await;
    let replacement = h.orchestrator.current_session().expect("new session");
    assert_eq!(h.backend.code_requests().len(), 2);

    tokio::time::sleep(Duration::from_secs(8)).await;
    assert_eq!(h.backend.code_requests().len(), 2);
    let current = h.orchestrator.current_session().expect("session kept");
    assert_eq!(current.session_id(), replacement.session_id());
    assert_eq!(h.notifier.spoken_count(dialogs::CODE), 2);
}
