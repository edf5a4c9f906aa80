//! Application layer orchestrating a checkout.
//!
//! [`flow::PaymentFlow`] owns the session and walks it through its steps. Settlement talks
//! to the outside world only through the ports in [`crate::domain::ports`], so every
//! collaborator can be swapped for an in-memory or sandbox adapter.

pub mod dispatcher;
pub mod flow;
pub mod poller;
pub mod reference;
