use crate::application::dispatcher::NotificationDispatcher;
use crate::application::flow::{Collaborators, PaymentFlow};
use crate::application::poller::VerificationPoller;
use crate::config::CheckoutConfig;
use crate::domain::operator::OperatorCatalogue;
use crate::domain::ports::{DraftStoreBox, NavigatorRef, OrderApiRef, PaymentProviderRef};
use crate::domain::route::{Terminal, TerminalPayload};
use crate::domain::session::{Action, Field, Step};
use crate::error::{CheckoutError, FieldError, Result};
use crate::infrastructure::in_memory::RecordingNavigator;
use crate::interfaces::csv::checkout_reader::CheckoutRequest;
use crate::interfaces::csv::outcome_writer::CheckoutReport;
use std::sync::Arc;
use tracing::{info, warn};

/// Replays checkouts through the full payment flow, one session at a time.
///
/// Drafts of failed sessions are saved so a later run resumes them with their retry count.
/// Drafts of settled sessions are removed.
pub struct BatchRunner {
    provider: PaymentProviderRef,
    order_api: OrderApiRef,
    dispatcher: Arc<NotificationDispatcher>,
    store: DraftStoreBox,
    catalogue: OperatorCatalogue,
    config: CheckoutConfig,
}

impl BatchRunner {
    pub fn new(
        provider: PaymentProviderRef,
        order_api: OrderApiRef,
        dispatcher: Arc<NotificationDispatcher>,
        store: DraftStoreBox,
        config: CheckoutConfig,
    ) -> Self {
        Self {
            provider,
            order_api,
            dispatcher,
            store,
            catalogue: OperatorCatalogue::default(),
            config,
        }
    }

    pub fn with_catalogue(mut self, catalogue: OperatorCatalogue) -> Self {
        self.catalogue = catalogue;
        self
    }

    /// Runs one checkout to a report. Only draft storage failures are returned as errors;
    /// everything the flow rejects ends up in the report.
    pub async fn run(&self, request: CheckoutRequest) -> Result<CheckoutReport> {
        let session_id = request.session_id.clone();
        let navigator = Arc::new(RecordingNavigator::new());
        let collaborators = Collaborators {
            provider: self.provider.clone(),
            order_api: self.order_api.clone(),
            dispatcher: self.dispatcher.clone(),
            navigator: navigator.clone(),
        };

        let flow = match self.store.load(&session_id).await? {
            Some(snapshot) => match PaymentFlow::restore(snapshot, collaborators, &self.config) {
                Ok(flow) => flow,
                Err(e) => {
                    warn!(session = %session_id, error = %e, "stale draft discarded");
                    self.store.remove(&session_id).await?;
                    return Ok(CheckoutReport::rejected(session_id, 0, e.to_string()));
                }
            },
            None => PaymentFlow::new(
                session_id.clone(),
                request.draft.clone(),
                request.amounts,
                collaborators,
                &self.config,
            ),
        };

        if let Err(e) = self.resume(&flow, &request) {
            return Ok(CheckoutReport::rejected(
                session_id,
                flow.session().retry_count(),
                e.to_string(),
            ));
        }
        if let Err(e) = self.drive(&flow, &request) {
            self.store.save(flow.snapshot()).await?;
            return Ok(CheckoutReport::rejected(
                session_id,
                flow.session().retry_count(),
                e.to_string(),
            ));
        }

        let outcome = match flow.confirm().await {
            Ok(outcome) => outcome,
            Err(e) => {
                return Ok(CheckoutReport::rejected(
                    session_id,
                    flow.session().retry_count(),
                    e.to_string(),
                ));
            }
        };
        let (terminal, payload) = match outcome.terminal {
            Terminal::Pending => self.verify(navigator, outcome.payload).await,
            terminal => (terminal, outcome.payload),
        };

        let session = flow.session();
        if terminal == Terminal::Failed && !session.order_created() {
            self.store.save(flow.snapshot()).await?;
        } else {
            self.store.remove(&session_id).await?;
        }
        info!(session = %session_id, %terminal, "checkout finished");
        Ok(CheckoutReport::settled(
            session_id,
            session.retry_count(),
            terminal,
            &payload,
        ))
    }

    /// Leaves the failed terminal of a restored session: the same method is a retry and
    /// counts against the cap, another method starts over without one.
    fn resume(&self, flow: &PaymentFlow, request: &CheckoutRequest) -> Result<()> {
        if flow.step() != Step::Terminal(Terminal::Failed) {
            return Ok(());
        }
        if flow.session().method() == request.method {
            flow.retry()?;
        } else {
            flow.change_method()?;
        }
        Ok(())
    }

    /// Walks the flow forward until it reaches confirmation.
    fn drive(&self, flow: &PaymentFlow, request: &CheckoutRequest) -> Result<()> {
        loop {
            match flow.step() {
                Step::Method => {
                    flow.select_method(request.method)?;
                    flow.next()?;
                }
                Step::Operator => {
                    let id = request.operator.as_deref().unwrap_or_default();
                    let operator = self.catalogue.find(id).cloned().ok_or_else(|| {
                        FieldError::new(Field::Operator, format!("Unknown operator '{id}'"))
                    })?;
                    flow.select_operator(operator)?;
                    flow.next()?;
                }
                Step::Details => {
                    flow.enter_phone_number(request.phone_number.as_deref().unwrap_or_default())?;
                    flow.next()?;
                }
                Step::Confirmation => return Ok(()),
                from => {
                    return Err(CheckoutError::InvalidTransition {
                        from,
                        action: Action::Confirm,
                    });
                }
            }
        }
    }

    /// Waits for the verification poller and returns the screen the session ends on.
    async fn verify(
        &self,
        navigator: Arc<RecordingNavigator>,
        payload: TerminalPayload,
    ) -> (Terminal, TerminalPayload) {
        let poller = VerificationPoller::new(
            self.provider.clone(),
            navigator.clone() as NavigatorRef,
            self.config.poll.clone(),
        );
        let Some(handle) = poller.attach(Terminal::Pending, &payload) else {
            return (Terminal::Pending, payload);
        };
        handle.outcome().await;
        match navigator.last_terminal() {
            Some((terminal, routed)) if terminal != Terminal::Pending => (terminal, routed),
            _ => (Terminal::Pending, payload),
        }
    }
}
