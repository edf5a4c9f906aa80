use crate::domain::order::{CreatedOrder, OrderSubmission};
use crate::domain::ports::{DraftStore, Navigator, OrderApi};
use crate::domain::route::{Route, Terminal, TerminalPayload};
use crate::domain::session::{SessionSnapshot, Step};
use crate::error::{CheckoutError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// An order API keeping created orders in memory.
///
/// Can be configured with a latency, to widen the window in which duplicate submissions
/// could race, or to reject every submission.
#[derive(Default)]
pub struct InMemoryOrderApi {
    submissions: RwLock<Vec<OrderSubmission>>,
    next_id: AtomicU64,
    latency: Option<Duration>,
    rejection: Option<String>,
}

impl InMemoryOrderApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Every submission fails with the given message.
    pub fn rejecting(message: impl Into<String>) -> Self {
        Self {
            rejection: Some(message.into()),
            ..Self::default()
        }
    }

    pub async fn submissions(&self) -> Vec<OrderSubmission> {
        self.submissions.read().await.clone()
    }

    pub async fn created_count(&self) -> usize {
        self.submissions.read().await.len()
    }

    /// Number of `create` calls, including rejected ones.
    pub fn calls(&self) -> u64 {
        self.next_id.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderApi for InMemoryOrderApi {
    async fn create(&self, submission: OrderSubmission) -> Result<CreatedOrder> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(message) = &self.rejection {
            return Err(CheckoutError::OrderApi(message.clone()));
        }

        let order = CreatedOrder {
            id: format!("order-{n}"),
            reference: submission.reference.clone(),
        };
        self.submissions.write().await.push(submission);
        debug!(order_id = %order.id, reference = %order.reference, "order stored");
        Ok(order)
    }
}

/// A thread-safe in-memory store for checkout drafts.
#[derive(Default, Clone)]
pub struct InMemoryDraftStore {
    drafts: Arc<RwLock<HashMap<String, SessionSnapshot>>>,
}

impl InMemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DraftStore for InMemoryDraftStore {
    async fn save(&self, snapshot: SessionSnapshot) -> Result<()> {
        let mut drafts = self.drafts.write().await;
        drafts.insert(snapshot.session_id().to_string(), snapshot);
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<SessionSnapshot>> {
        let drafts = self.drafts.read().await;
        Ok(drafts.get(session_id).cloned())
    }

    async fn remove(&self, session_id: &str) -> Result<()> {
        self.drafts.write().await.remove(session_id);
        Ok(())
    }
}

/// A navigator that only records where it was asked to go.
#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routes(&self) -> Vec<Route> {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_terminal(&self) -> Option<(Terminal, TerminalPayload)> {
        self.routes().into_iter().rev().find_map(|route| match route {
            Route::Terminal(terminal, payload) => Some((terminal, payload)),
            Route::Step(_) => None,
        })
    }

    pub fn steps(&self) -> Vec<Step> {
        self.routes()
            .into_iter()
            .filter_map(|route| match route {
                Route::Step(step) => Some(step),
                Route::Terminal(..) => None,
            })
            .collect()
    }

    fn push(&self, route: Route) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(route);
    }
}

impl Navigator for RecordingNavigator {
    fn goto_step(&self, step: Step) {
        debug!(%step, "navigate to step");
        self.push(Route::Step(step));
    }

    fn goto_terminal(&self, terminal: Terminal, payload: TerminalPayload) {
        debug!(%terminal, "navigate to terminal");
        self.push(Route::Terminal(terminal, payload));
    }
}
