use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

static ORDER_REFERENCES: ReferenceGenerator = ReferenceGenerator::new();

/// Returns a process-wide unique order reference.
pub fn next_order_reference() -> String {
    ORDER_REFERENCES.next()
}

/// Produces `ORD-<millis>` references that strictly increase even when the clock stalls or
/// several references are requested within the same millisecond.
#[derive(Debug)]
pub struct ReferenceGenerator {
    last: AtomicI64,
}

impl ReferenceGenerator {
    pub const fn new() -> Self {
        Self {
            last: AtomicI64::new(0),
        }
    }

    pub fn next(&self) -> String {
        let now = Utc::now().timestamp_millis();
        let mut previous = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(previous + 1);
            match self.last.compare_exchange_weak(
                previous,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return format!("ORD-{candidate}"),
                Err(actual) => previous = actual,
            }
        }
    }
}

impl Default for ReferenceGenerator {
    fn default() -> Self {
        Self::new()
    }
}
