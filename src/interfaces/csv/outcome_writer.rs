use crate::domain::route::{Terminal, TerminalPayload};
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

/// One output row per replayed checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutReport {
    pub session: String,
    /// `success`, `pending`, `failed`, or `rejected` when the checkout never reached
    /// settlement.
    pub status: String,
    pub order_id: Option<String>,
    pub transaction_id: Option<String>,
    pub error_kind: Option<String>,
    pub retry_count: u32,
    pub notifications_ok: usize,
    pub notifications_failed: usize,
    pub message: String,
}

impl CheckoutReport {
    pub fn settled(
        session: impl Into<String>,
        retry_count: u32,
        terminal: Terminal,
        payload: &TerminalPayload,
    ) -> Self {
        let delivered = payload.notifications.iter().filter(|n| n.success).count();
        Self {
            session: session.into(),
            status: terminal.to_string(),
            order_id: payload.order_id.clone(),
            transaction_id: payload.transaction_id.clone(),
            error_kind: payload.error.as_ref().map(|e| e.kind.code().to_string()),
            retry_count,
            notifications_ok: delivered,
            notifications_failed: payload.notifications.len() - delivered,
            message: payload.message.clone(),
        }
    }

    pub fn rejected(
        session: impl Into<String>,
        retry_count: u32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            session: session.into(),
            status: "rejected".to_string(),
            order_id: None,
            transaction_id: None,
            error_kind: None,
            retry_count,
            notifications_ok: 0,
            notifications_failed: 0,
            message: message.into(),
        }
    }
}

/// Writes checkout reports as CSV, header first.
pub struct OutcomeWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OutcomeWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write(&mut self, report: &CheckoutReport) -> Result<()> {
        self.writer.serialize(report)?;
        Ok(())
    }

    pub fn write_all<'a>(
        &mut self,
        reports: impl IntoIterator<Item = &'a CheckoutReport>,
    ) -> Result<()> {
        for report in reports {
            self.write(report)?;
        }
        self.flush()
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
