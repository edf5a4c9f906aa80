//! Verification of a transaction's real outcome.
//!
//! Every terminal screen can host a [`VerificationPoller`]. It asks the provider for the
//! status of the screen's transaction on a fixed interval and re-routes when the status
//! seen by the provider differs from the one the screen assumed. Polling ends on the first
//! final status, when the deadline elapses, or when the hosting screen drops its
//! [`PollHandle`].

use crate::config::PollConfig;
use crate::domain::classifier::{ClassifiedError, ErrorKind};
use crate::domain::ports::{NavigatorRef, PaymentProviderRef};
use crate::domain::route::{Terminal, TerminalPayload};
use crate::domain::transaction::{StatusReport, TransactionStatus, VerificationOutcome};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The provider reported a final status.
    Verified(VerificationOutcome),
    /// The transaction was still pending when the deadline elapsed.
    TimedOut,
}

#[derive(Clone)]
pub struct VerificationPoller {
    provider: PaymentProviderRef,
    navigator: NavigatorRef,
    config: PollConfig,
}

impl VerificationPoller {
    pub fn new(provider: PaymentProviderRef, navigator: NavigatorRef, config: PollConfig) -> Self {
        Self {
            provider,
            navigator,
            config,
        }
    }

    /// Starts polling on behalf of `screen`.
    ///
    /// Returns `None` when the payload carries no transaction (cash on delivery): those
    /// screens are purely local and have nothing to verify.
    pub fn attach(&self, screen: Terminal, payload: &TerminalPayload) -> Option<PollHandle> {
        let transaction_id = payload.transaction_id.clone()?;
        let poller = self.clone();
        let payload = payload.clone();
        let task = tokio::spawn(async move { poller.run(screen, &transaction_id, payload).await });
        Some(PollHandle { task })
    }

    /// Polls until a final status or the deadline, routing away from `screen` when the
    /// observed status contradicts it.
    pub async fn run(
        &self,
        screen: Terminal,
        transaction_id: &str,
        payload: TerminalPayload,
    ) -> PollOutcome {
        let interval = self.config.interval_for(screen);
        let started = Instant::now();
        info!(
            transaction_id,
            %screen,
            ?interval,
            "verification polling started"
        );

        loop {
            let report = match self.provider.get_status(transaction_id).await {
                Ok(report) => report,
                Err(e) => {
                    warn!(transaction_id, error = %e, "status query failed, treating as pending");
                    StatusReport::new(TransactionStatus::Pending)
                }
            };
            debug!(transaction_id, status = %report.status, "status observed");

            if report.status.is_final() {
                return self.conclude(screen, transaction_id, report, payload);
            }

            if started.elapsed() >= self.config.deadline {
                warn!(transaction_id, "transaction still pending at deadline");
                if screen != Terminal::Failed {
                    self.route_failure(payload, ClassifiedError::of(ErrorKind::Timeout), None);
                }
                return PollOutcome::TimedOut;
            }
            tokio::time::sleep(interval).await;
        }
    }

    fn conclude(
        &self,
        screen: Terminal,
        transaction_id: &str,
        report: StatusReport,
        payload: TerminalPayload,
    ) -> PollOutcome {
        if report.status == TransactionStatus::Succeeded {
            if screen != Terminal::Success {
                let payload = TerminalPayload {
                    message: "Payment confirmed by the operator.".to_string(),
                    error: None,
                    verified_status: Some(TransactionStatus::Succeeded),
                    ..payload
                };
                self.navigator.goto_terminal(Terminal::Success, payload);
            }
            info!(transaction_id, "transaction verified as succeeded");
            return PollOutcome::Verified(TransactionStatus::Succeeded);
        }

        let error = match report.message {
            Some(raw) => ClassifiedError::from_raw(raw),
            None => ClassifiedError::of(ErrorKind::TransactionDeclined),
        };
        info!(
            transaction_id,
            status = %report.status,
            kind = %error.kind,
            "transaction verified as failed"
        );
        if screen != Terminal::Failed {
            self.route_failure(payload, error, Some(report.status));
        }
        PollOutcome::Verified(report.status)
    }

    fn route_failure(
        &self,
        payload: TerminalPayload,
        error: ClassifiedError,
        verified_status: Option<TransactionStatus>,
    ) {
        let payload = TerminalPayload {
            message: error.guidance().explanation.to_string(),
            error: Some(error),
            verified_status,
            ..payload
        };
        self.navigator.goto_terminal(Terminal::Failed, payload);
    }
}

/// Ties a polling task to the lifetime of its hosting screen.
///
/// Dropping the handle cancels the task, so no route change can happen after the user
/// navigated elsewhere.
#[derive(Debug)]
pub struct PollHandle {
    task: JoinHandle<PollOutcome>,
}

impl PollHandle {
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the poll to end. `None` if it was cancelled.
    pub async fn outcome(mut self) -> Option<PollOutcome> {
        (&mut self.task).await.ok()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
