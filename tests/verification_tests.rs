mod common;

use common::*;
use pressing_checkout::application::poller::{PollOutcome, VerificationPoller};
use pressing_checkout::config::PollConfig;
use pressing_checkout::domain::classifier::ErrorKind;
use pressing_checkout::domain::route::Terminal;
use pressing_checkout::domain::transaction::TransactionStatus;
use pressing_checkout::infrastructure::in_memory::{InMemoryOrderApi, RecordingNavigator};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

fn poll_config() -> PollConfig {
    PollConfig {
        deadline: Duration::from_secs(30),
        ..PollConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_pending_checkout_is_verified() {
    use TransactionStatus::*;
    let provider = Arc::new(
        ScriptedProvider::accepting(Pending).with_statuses(&[Pending, Pending, Succeeded]),
    );
    let navigator = Arc::new(RecordingNavigator::new());
    let flow = flow(
        collaborators(
            provider.clone(),
            Arc::new(InMemoryOrderApi::new()),
            Vec::new(),
            navigator.clone(),
        ),
        12000,
    );
    to_wallet_confirmation(&flow, "0712345678");
    let outcome = flow.confirm().await.unwrap();
    assert_eq!(outcome.terminal, Terminal::Pending);

    let poller = VerificationPoller::new(provider.clone(), navigator.clone(), poll_config());
    let handle = poller.attach(outcome.terminal, &outcome.payload).unwrap();

    assert_eq!(handle.outcome().await, Some(PollOutcome::Verified(Succeeded)));
    assert_eq!(provider.queries.load(Ordering::SeqCst), 3);
    let (terminal, payload) = navigator.last_terminal().unwrap();
    assert_eq!(terminal, Terminal::Success);
    assert_eq!(payload.verified_status, Some(Succeeded));
    assert_eq!(payload.order_id, outcome.payload.order_id);
}

#[tokio::test(start_paused = true)]
async fn test_pending_checkout_times_out() {
    let provider = Arc::new(ScriptedProvider::accepting(TransactionStatus::Pending));
    let navigator = Arc::new(RecordingNavigator::new());
    let flow = flow(
        collaborators(
            provider.clone(),
            Arc::new(InMemoryOrderApi::new()),
            Vec::new(),
            navigator.clone(),
        ),
        12000,
    );
    to_wallet_confirmation(&flow, "0712345678");
    let outcome = flow.confirm().await.unwrap();

    let poller = VerificationPoller::new(provider.clone(), navigator.clone(), poll_config());
    let result = poller
        .run(
            outcome.terminal,
            outcome.payload.transaction_id.as_deref().unwrap(),
            outcome.payload.clone(),
        )
        .await;

    assert_eq!(result, PollOutcome::TimedOut);
    // one query at start, then one every 2s until 30s have elapsed
    assert_eq!(provider.queries.load(Ordering::SeqCst), 16);
    let (terminal, payload) = navigator.last_terminal().unwrap();
    assert_eq!(terminal, Terminal::Failed);
    assert_eq!(payload.error.unwrap().kind, ErrorKind::Timeout);
}

#[tokio::test(start_paused = true)]
async fn test_leaving_the_screen_stops_polling() {
    let provider = Arc::new(ScriptedProvider::accepting(TransactionStatus::Pending));
    let navigator = Arc::new(RecordingNavigator::new());
    let flow = flow(
        collaborators(
            provider.clone(),
            Arc::new(InMemoryOrderApi::new()),
            Vec::new(),
            navigator.clone(),
        ),
        12000,
    );
    to_wallet_confirmation(&flow, "0712345678");
    let outcome = flow.confirm().await.unwrap();
    let routes_before = navigator.routes().len();

    let poller = VerificationPoller::new(provider.clone(), navigator.clone(), poll_config());
    let handle = poller.attach(outcome.terminal, &outcome.payload).unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    drop(handle);
    let queries = provider.queries.load(Ordering::SeqCst);
    assert!(queries >= 1);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(provider.queries.load(Ordering::SeqCst), queries);
    assert_eq!(navigator.routes().len(), routes_before);
}

#[tokio::test]
async fn test_cash_on_delivery_has_nothing_to_verify() {
    let provider = Arc::new(ScriptedProvider::accepting(TransactionStatus::Succeeded));
    let navigator = Arc::new(RecordingNavigator::new());
    let flow = flow(
        collaborators(
            provider.clone(),
            Arc::new(InMemoryOrderApi::new()),
            Vec::new(),
            navigator.clone(),
        ),
        5000,
    );
    to_cash_confirmation(&flow);
    let outcome = flow.confirm().await.unwrap();

    let poller = VerificationPoller::new(provider.clone(), navigator, poll_config());
    assert!(poller.attach(outcome.terminal, &outcome.payload).is_none());
    assert_eq!(provider.queries.load(Ordering::SeqCst), 0);
}
