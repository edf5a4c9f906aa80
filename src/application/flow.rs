use crate::application::dispatcher::NotificationDispatcher;
use crate::application::reference::next_order_reference;
use crate::config::CheckoutConfig;
use crate::domain::classifier::{ClassifiedError, ErrorKind};
use crate::domain::notification::NotificationRequest;
use crate::domain::operator::{Operator, normalize_phone_number};
use crate::domain::order::{OrderDraft, OrderSubmission, PaymentMetadata};
use crate::domain::ports::{NavigatorRef, OrderApiRef, PaymentProviderRef};
use crate::domain::route::{Terminal, TerminalPayload};
use crate::domain::session::{
    Action, Amounts, Field, PaymentMethod, PaymentSession, SessionSnapshot, Step,
};
use crate::domain::transaction::{PaymentInitiation, PaymentRequest, TransactionStatus};
use crate::error::{CheckoutError, FieldError, Result};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{error, info, warn};

/// External collaborators of a checkout.
#[derive(Clone)]
pub struct Collaborators {
    pub provider: PaymentProviderRef,
    pub order_api: OrderApiRef,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub navigator: NavigatorRef,
}

/// Where a settlement ended and what the terminal screen receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementOutcome {
    pub terminal: Terminal,
    pub payload: TerminalPayload,
}

struct FlowState {
    session: PaymentSession,
    step: Step,
    /// Set once the flow leaves the method step; cleared only by `change_method`.
    method_locked: bool,
    /// Reentrancy guard, raised before the first suspension point of a settlement and
    /// lowered when the settlement reaches its terminal.
    settling: bool,
    draft: OrderDraft,
    last_outcome: Option<SettlementOutcome>,
}

/// Drives one checkout from method selection to a terminal screen.
///
/// Step transitions before confirmation are pure local validation. [`PaymentFlow::confirm`]
/// runs the settlement: payment initiation, exactly-once order creation and notification
/// fan-out. All methods take `&self`, so duplicate UI events may race; the session lock is
/// never held across a suspension point.
pub struct PaymentFlow {
    state: Mutex<FlowState>,
    collaborators: Collaborators,
    provider_timeout: Duration,
}

/// Public API
impl PaymentFlow {
    pub fn new(
        session_id: impl Into<String>,
        draft: OrderDraft,
        amounts: Amounts,
        collaborators: Collaborators,
        config: &CheckoutConfig,
    ) -> Self {
        let session = PaymentSession::new(session_id, amounts, config.max_retries);
        info!(session = %session.id(), amount = session.amount(), "checkout started");
        Self::from_state(
            FlowState {
                session,
                step: Step::Method,
                method_locked: false,
                settling: false,
                draft,
                last_outcome: None,
            },
            collaborators,
            config,
        )
    }

    /// Resumes a checkout from a saved draft.
    ///
    /// A snapshot whose order already exists cannot be resumed, and neither can one taken
    /// while a settlement was running: that settlement may still charge the wallet or create
    /// the order.
    pub fn restore(
        snapshot: SessionSnapshot,
        collaborators: Collaborators,
        config: &CheckoutConfig,
    ) -> Result<Self> {
        snapshot.session.check_invariants()?;
        if snapshot.session.order_created() {
            return Err(CheckoutError::OrderAlreadyCreated);
        }
        let (step, method_locked) = match snapshot.step {
            Step::Processing => return Err(CheckoutError::SettlementInProgress),
            Step::Terminal(Terminal::Failed) => (snapshot.step, snapshot.method_locked),
            Step::Terminal(_) | Step::Abandoned => (Step::Method, false),
            step => (step, snapshot.method_locked),
        };
        info!(session = %snapshot.session.id(), %step, "checkout restored");
        Ok(Self::from_state(
            FlowState {
                session: snapshot.session,
                step,
                method_locked,
                settling: false,
                draft: snapshot.draft,
                last_outcome: None,
            },
            collaborators,
            config,
        ))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        SessionSnapshot {
            session: state.session.clone(),
            step: state.step,
            method_locked: state.method_locked,
            draft: state.draft.clone(),
        }
    }

    pub fn step(&self) -> Step {
        self.lock().step
    }

    pub fn session(&self) -> PaymentSession {
        self.lock().session.clone()
    }

    pub fn last_outcome(&self) -> Option<SettlementOutcome> {
        self.lock().last_outcome.clone()
    }

    /// Whether the confirm action may be enabled right now.
    pub fn can_confirm(&self) -> bool {
        let state = self.lock();
        Self::confirmable(&state)
    }

    /// Actions the UI may offer on the current step.
    pub fn available_actions(&self) -> Vec<Action> {
        let state = self.lock();
        match state.step {
            Step::Method => vec![Action::SelectMethod, Action::Next, Action::Cancel],
            Step::Operator => vec![
                Action::SelectOperator,
                Action::Next,
                Action::Previous,
                Action::Cancel,
            ],
            Step::Details => vec![
                Action::EnterPhoneNumber,
                Action::Next,
                Action::Previous,
                Action::Cancel,
            ],
            Step::Confirmation => {
                let mut actions = Vec::with_capacity(3);
                if Self::confirmable(&state) {
                    actions.push(Action::Confirm);
                }
                actions.extend([Action::Previous, Action::Cancel]);
                actions
            }
            Step::Terminal(Terminal::Failed) => {
                let mut actions = Vec::with_capacity(3);
                if state.session.can_retry() {
                    actions.push(Action::Retry);
                }
                actions.extend([Action::ChangeMethod, Action::Cancel]);
                actions
            }
            Step::Processing | Step::Terminal(_) | Step::Abandoned => Vec::new(),
        }
    }

    pub fn select_method(&self, method: PaymentMethod) -> Result<()> {
        let mut state = self.lock();
        Self::expect_step(&state, Step::Method, Action::SelectMethod)?;
        if method == PaymentMethod::Unset {
            return Err(FieldError::new(Field::Method, "Choose a payment method").into());
        }
        if state.method_locked && state.session.method() != method {
            return Err(CheckoutError::InvalidTransition {
                from: state.step,
                action: Action::SelectMethod,
            });
        }
        state.session.set_method(method);
        Ok(())
    }

    pub fn select_operator(&self, operator: Operator) -> Result<()> {
        let mut state = self.lock();
        Self::expect_step(&state, Step::Operator, Action::SelectOperator)?;
        state.session.set_operator(operator);
        Ok(())
    }

    /// Stores the phone number in normalized form. Operator constraints are checked when
    /// leaving the details step.
    pub fn enter_phone_number(&self, raw: &str) -> Result<()> {
        let mut state = self.lock();
        Self::expect_step(&state, Step::Details, Action::EnterPhoneNumber)?;
        let digits = normalize_phone_number(raw)?;
        state.session.set_phone_number(digits);
        Ok(())
    }

    /// Moves forward one step after validating the current one.
    pub fn next(&self) -> Result<Step> {
        let next = {
            let mut state = self.lock();
            let next = match state.step {
                Step::Method => match state.session.method() {
                    PaymentMethod::Unset => {
                        return Err(
                            FieldError::new(Field::Method, "Choose a payment method").into()
                        );
                    }
                    PaymentMethod::WalletTransfer => Step::Operator,
                    PaymentMethod::CashOnDelivery => Step::Confirmation,
                },
                Step::Operator => {
                    if state.session.operator().is_none() {
                        return Err(FieldError::new(Field::Operator, "Choose an operator").into());
                    }
                    Step::Details
                }
                Step::Details => {
                    let operator = state
                        .session
                        .operator()
                        .ok_or_else(|| FieldError::new(Field::Operator, "Choose an operator"))?;
                    if state.session.phone_number().is_empty() {
                        return Err(
                            FieldError::new(Field::PhoneNumber, "Phone number is required").into()
                        );
                    }
                    operator.validate_number(state.session.phone_number())?;
                    Step::Confirmation
                }
                from => {
                    return Err(CheckoutError::InvalidTransition {
                        from,
                        action: Action::Next,
                    });
                }
            };
            if state.step == Step::Method {
                state.method_locked = true;
            }
            state.step = next;
            info!(session = %state.session.id(), step = %next, "step advanced");
            next
        };
        self.collaborators.navigator.goto_step(next);
        Ok(next)
    }

    /// Returns to the immediately preceding step, keeping every collected input.
    pub fn previous(&self) -> Result<Step> {
        let previous = {
            let mut state = self.lock();
            let previous = match state.step {
                Step::Operator => Step::Method,
                Step::Details => Step::Operator,
                Step::Confirmation => match state.session.method() {
                    PaymentMethod::CashOnDelivery => Step::Method,
                    _ => Step::Details,
                },
                from => {
                    return Err(CheckoutError::InvalidTransition {
                        from,
                        action: Action::Previous,
                    });
                }
            };
            state.step = previous;
            previous
        };
        self.collaborators.navigator.goto_step(previous);
        Ok(previous)
    }

    /// Re-enters the method step from the failed terminal with the same method.
    pub fn retry(&self) -> Result<Step> {
        {
            let mut state = self.lock();
            Self::expect_step(&state, Step::Terminal(Terminal::Failed), Action::Retry)?;
            state.session.consume_retry()?;
            state.step = Step::Method;
            state.last_outcome = None;
            info!(
                session = %state.session.id(),
                retry_count = state.session.retry_count(),
                max_retries = state.session.max_retries(),
                "checkout retried"
            );
        }
        self.collaborators.navigator.goto_step(Step::Method);
        Ok(Step::Method)
    }

    /// Re-enters the method step from the failed terminal with the method cleared.
    pub fn change_method(&self) -> Result<Step> {
        {
            let mut state = self.lock();
            Self::expect_step(&state, Step::Terminal(Terminal::Failed), Action::ChangeMethod)?;
            state.session.set_method(PaymentMethod::Unset);
            state.session.set_transaction_id(None);
            state.method_locked = false;
            state.step = Step::Method;
            state.last_outcome = None;
        }
        self.collaborators.navigator.goto_step(Step::Method);
        Ok(Step::Method)
    }

    /// Abandons the checkout.
    pub fn cancel(&self) -> Result<()> {
        {
            let mut state = self.lock();
            let from = state.step;
            // A failed attempt can still be abandoned; every other terminal step is final.
            let cancellable = from != Step::Processing
                && (!from.is_terminal() || from == Step::Terminal(Terminal::Failed));
            if !cancellable {
                return Err(CheckoutError::InvalidTransition {
                    from,
                    action: Action::Cancel,
                });
            }
            state.step = Step::Abandoned;
            info!(session = %state.session.id(), "checkout abandoned");
        }
        self.collaborators.navigator.goto_step(Step::Abandoned);
        Ok(())
    }

    /// Runs the settlement for the confirmed session.
    ///
    /// Rejected without side effects while another settlement is in flight or once an
    /// order exists. Provider and order API failures never escape: they are classified and
    /// returned as a failed terminal.
    pub async fn confirm(&self) -> Result<SettlementOutcome> {
        let (session, draft) = {
            let mut state = self.lock();
            if state.settling {
                warn!(session = %state.session.id(), "duplicate confirmation ignored");
                return Err(CheckoutError::SettlementInProgress);
            }
            if state.session.order_created() {
                warn!(session = %state.session.id(), "confirmation after order creation ignored");
                return Err(CheckoutError::OrderAlreadyCreated);
            }
            Self::expect_step(&state, Step::Confirmation, Action::Confirm)?;
            if state.session.method() == PaymentMethod::Unset {
                return Err(FieldError::new(Field::Method, "Choose a payment method").into());
            }
            state.settling = true;
            state.step = Step::Processing;
            (state.session.clone(), state.draft.clone())
        };
        self.collaborators.navigator.goto_step(Step::Processing);

        let guard = SettlementGuard {
            flow: self,
            armed: true,
        };
        let outcome = self.settle(session, draft).await;
        guard.finish(&outcome);

        self.collaborators
            .navigator
            .goto_terminal(outcome.terminal, outcome.payload.clone());
        Ok(outcome)
    }
}

/// Leaves the flow in an actionable state when a settlement future is dropped before it
/// completes.
struct SettlementGuard<'a> {
    flow: &'a PaymentFlow,
    armed: bool,
}

impl SettlementGuard<'_> {
    fn finish(mut self, outcome: &SettlementOutcome) {
        self.armed = false;
        let mut state = self.flow.lock();
        state.settling = false;
        state.step = Step::Terminal(outcome.terminal);
        state.last_outcome = Some(outcome.clone());
    }
}

impl Drop for SettlementGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let outcome = {
            let mut state = self.flow.lock();
            let session = &state.session;
            let outcome = if session.order_created() {
                // The order exists; only the confirmation of the payment is unknown.
                let terminal = match session.method() {
                    PaymentMethod::CashOnDelivery => Terminal::Success,
                    _ => Terminal::Pending,
                };
                SettlementOutcome {
                    terminal,
                    payload: TerminalPayload {
                        order_id: session.created_order_id().map(str::to_string),
                        order_reference: session.order_reference().map(str::to_string),
                        transaction_id: session.transaction_id().map(str::to_string),
                        message: "Order placed. Its confirmation was interrupted.".to_string(),
                        ..TerminalPayload::default()
                    },
                }
            } else {
                PaymentFlow::failure(
                    session.order_reference().unwrap_or_default(),
                    session.transaction_id().map(str::to_string),
                    ClassifiedError {
                        kind: ErrorKind::NetworkError,
                        raw: Some("settlement interrupted".to_string()),
                    },
                )
            };
            warn!(
                session = %session.id(),
                terminal = %outcome.terminal,
                "settlement interrupted"
            );
            state.settling = false;
            state.step = Step::Terminal(outcome.terminal);
            state.last_outcome = Some(outcome.clone());
            outcome
        };
        self.flow
            .collaborators
            .navigator
            .goto_terminal(outcome.terminal, outcome.payload);
    }
}

/// Private API
impl PaymentFlow {
    fn from_state(
        state: FlowState,
        collaborators: Collaborators,
        config: &CheckoutConfig,
    ) -> Self {
        Self {
            state: Mutex::new(state),
            collaborators,
            provider_timeout: config.provider_timeout,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FlowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn confirmable(state: &FlowState) -> bool {
        state.step == Step::Confirmation && !state.settling && !state.session.order_created()
    }

    fn expect_step(state: &FlowState, expected: Step, action: Action) -> Result<()> {
        if state.step != expected {
            return Err(CheckoutError::InvalidTransition {
                from: state.step,
                action,
            });
        }
        Ok(())
    }

    fn update_session<T>(&self, f: impl FnOnce(&mut PaymentSession) -> T) -> T {
        f(&mut self.lock().session)
    }

    /// Settlement:
    /// - obtain a payment (synthesized for cash on delivery, initiated otherwise)
    /// - create the order once, flipping the session's idempotency guard
    /// - fan out notifications without letting them affect the outcome
    async fn settle(&self, session: PaymentSession, draft: OrderDraft) -> SettlementOutcome {
        // A reference from an earlier attempt is kept so the order API can deduplicate.
        let reference = session
            .order_reference()
            .map(str::to_string)
            .or_else(|| draft.reference.clone())
            .unwrap_or_else(next_order_reference);
        self.update_session(|s| s.set_order_reference(reference.clone()));
        let method = session.method();
        info!(session = %session.id(), %method, %reference, "settlement started");

        let payment = match method {
            PaymentMethod::WalletTransfer => match self.initiate(&session, &reference).await {
                Ok(payment) => payment,
                Err(error) => {
                    return Self::failure(&reference, None, error);
                }
            },
            PaymentMethod::CashOnDelivery => PaymentInitiation {
                status: TransactionStatus::Pending,
                transaction_id: None,
                message: None,
            },
            PaymentMethod::Unset => {
                return Self::failure(
                    &reference,
                    None,
                    ClassifiedError::of(ErrorKind::TransactionDeclined),
                );
            }
        };
        self.update_session(|s| s.set_transaction_id(payment.transaction_id.clone()));

        let amounts = session.amounts();
        let submission = OrderSubmission {
            reference: reference.clone(),
            draft: draft.clone(),
            payment: PaymentMetadata {
                method,
                status: payment.status,
                operator_id: session.operator().map(|o| o.id.clone()),
                amount: session.amount(),
                subtotal: amounts.subtotal(),
                fees: amounts.fees(),
                discount: amounts.discount(),
                transaction_id: payment.transaction_id.clone(),
            },
        };

        let created = match self.collaborators.order_api.create(submission).await {
            Ok(created) => created,
            Err(e) => {
                if method == PaymentMethod::WalletTransfer {
                    error!(
                        session = %session.id(),
                        transaction_id = payment.transaction_id.as_deref().unwrap_or_default(),
                        error = %e,
                        "payment accepted but order creation failed"
                    );
                } else {
                    warn!(session = %session.id(), error = %e, "order creation failed");
                }
                let error = ClassifiedError {
                    kind: ErrorKind::OrderCreationFailed,
                    raw: Some(e.to_string()),
                };
                return Self::failure(&reference, payment.transaction_id, error);
            }
        };
        if let Err(e) = self.update_session(|s| s.record_order(created.id.clone())) {
            error!(
                session = %session.id(),
                order_id = %created.id,
                error = %e,
                "order recorded twice"
            );
            let error = ClassifiedError {
                kind: ErrorKind::OrderCreationFailed,
                raw: Some(e.to_string()),
            };
            return Self::failure(&reference, payment.transaction_id, error);
        }
        info!(session = %session.id(), order_id = %created.id, "order created");

        let request = NotificationRequest {
            order_id: created.id.clone(),
            order_reference: created.reference.clone(),
            customer: draft.customer,
            pressing: draft.pressing,
            method,
            amount: session.amount(),
            transaction_id: payment.transaction_id.clone(),
            placed_at: Utc::now(),
        };
        let notifications = self.collaborators.dispatcher.dispatch(&request).await;

        let (terminal, message) = match (method, payment.status) {
            (PaymentMethod::CashOnDelivery, _) => (
                Terminal::Success,
                format!(
                    "Order {} confirmed. Pay {} FCFA in cash on delivery.",
                    created.reference,
                    session.amount()
                ),
            ),
            (_, TransactionStatus::Pending) => (
                Terminal::Pending,
                format!(
                    "Order {} placed. Approve the {} FCFA payment on your phone.",
                    created.reference,
                    session.amount()
                ),
            ),
            _ => (
                Terminal::Success,
                format!(
                    "Payment of {} FCFA via {} received. Order {} placed.",
                    session.amount(),
                    session.operator().map(|o| o.name.as_str()).unwrap_or("mobile money"),
                    created.reference
                ),
            ),
        };
        info!(session = %session.id(), %terminal, "settlement finished");

        SettlementOutcome {
            terminal,
            payload: TerminalPayload {
                order_id: Some(created.id),
                order_reference: Some(created.reference),
                transaction_id: payment.transaction_id,
                message,
                error: None,
                verified_status: None,
                notifications,
            },
        }
    }

    /// Calls the provider, bounded by the provider timeout. Only an accepted payment
    /// (succeeded or pending) is returned as `Ok`.
    async fn initiate(
        &self,
        session: &PaymentSession,
        reference: &str,
    ) -> std::result::Result<PaymentInitiation, ClassifiedError> {
        let operator = session
            .operator()
            .ok_or_else(|| ClassifiedError::from_raw("invalid number: no operator selected"))?;
        let request = PaymentRequest {
            operator_id: operator.id.clone(),
            phone_number: session.phone_number().to_string(),
            amount: session.amount(),
            order_reference: reference.to_string(),
        };

        let call = self.collaborators.provider.initiate(request);
        let initiation = match tokio::time::timeout(self.provider_timeout, call).await {
            Ok(Ok(initiation)) => initiation,
            Ok(Err(e)) => {
                warn!(session = %session.id(), error = %e, "payment initiation failed");
                return Err(ClassifiedError::from_raw(e.to_string()));
            }
            Err(_) => {
                warn!(session = %session.id(), "payment initiation timed out");
                return Err(ClassifiedError {
                    kind: ErrorKind::Timeout,
                    raw: Some(format!(
                        "no answer from provider within {}s",
                        self.provider_timeout.as_secs()
                    )),
                });
            }
        };

        match initiation.status {
            TransactionStatus::Succeeded | TransactionStatus::Pending => {
                info!(
                    session = %session.id(),
                    status = %initiation.status,
                    transaction_id = initiation.transaction_id.as_deref().unwrap_or_default(),
                    "payment accepted"
                );
                Ok(initiation)
            }
            TransactionStatus::Failed | TransactionStatus::Canceled => {
                let raw = initiation
                    .message
                    .unwrap_or_else(|| initiation.status.to_string());
                warn!(session = %session.id(), %raw, "payment refused by provider");
                Err(ClassifiedError::from_raw(raw))
            }
        }
    }

    fn failure(
        reference: &str,
        transaction_id: Option<String>,
        error: ClassifiedError,
    ) -> SettlementOutcome {
        info!(%reference, kind = %error.kind, "settlement failed");
        SettlementOutcome {
            terminal: Terminal::Failed,
            payload: TerminalPayload {
                order_id: None,
                order_reference: Some(reference.to_string()),
                transaction_id,
                message: error.guidance().explanation.to_string(),
                error: Some(error),
                verified_status: None,
                notifications: Vec::new(),
            },
        }
    }
}
