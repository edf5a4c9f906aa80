//! Mapping of raw provider error text onto a closed set of failure kinds.
//!
//! Classification is a pure, deterministic keyword match over the lowercased text. The
//! first matching rule wins; text matching nothing is reported as a network error.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InsufficientFunds,
    InvalidNumber,
    TransactionDeclined,
    NetworkError,
    Timeout,
    /// Structural failure of the order API; never produced by [`classify`].
    OrderCreationFailed,
}

/// Display text attached to an [`ErrorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guidance {
    pub title: &'static str,
    pub explanation: &'static str,
    pub suggestions: &'static [&'static str],
}

const RULES: &[(ErrorKind, &[&str])] = &[
    (
        ErrorKind::InsufficientFunds,
        &["insufficient", "not enough", "solde insuffisant", "low balance"],
    ),
    (
        ErrorKind::InvalidNumber,
        &[
            "invalid number",
            "invalid phone",
            "invalid msisdn",
            "number format",
            "unknown subscriber",
            "numéro invalide",
        ],
    ),
    (
        ErrorKind::TransactionDeclined,
        &["declined", "rejected", "refused", "denied", "canceled", "cancelled"],
    ),
    (
        ErrorKind::Timeout,
        &["timeout", "timed out", "expired", "deadline"],
    ),
    (
        ErrorKind::NetworkError,
        &["network", "connection", "unreachable", "unavailable"],
    ),
];

/// Classifies raw provider error text.
pub fn classify(raw: &str) -> ErrorKind {
    let text = raw.to_lowercase();
    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(kind, _)| *kind)
        .unwrap_or(ErrorKind::NetworkError)
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::InvalidNumber => "invalid_number",
            ErrorKind::TransactionDeclined => "transaction_declined",
            ErrorKind::NetworkError => "network_error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::OrderCreationFailed => "order_creation_failed",
        }
    }

    pub fn guidance(&self) -> Guidance {
        match self {
            ErrorKind::InsufficientFunds => Guidance {
                title: "Insufficient balance",
                explanation: "Your wallet balance does not cover the order amount.",
                suggestions: &[
                    "Top up your mobile-money wallet",
                    "Pay with another operator",
                    "Choose cash on delivery",
                ],
            },
            ErrorKind::InvalidNumber => Guidance {
                title: "Invalid phone number",
                explanation: "The operator did not recognise the phone number.",
                suggestions: &[
                    "Check the number and the selected operator",
                    "Use the number linked to your wallet",
                ],
            },
            ErrorKind::TransactionDeclined => Guidance {
                title: "Transaction declined",
                explanation: "The payment was declined or cancelled on your phone.",
                suggestions: &[
                    "Approve the payment prompt on your phone",
                    "Check your wallet limits",
                    "Try again or change payment method",
                ],
            },
            ErrorKind::NetworkError => Guidance {
                title: "Connection problem",
                explanation: "We could not reach the payment service.",
                suggestions: &[
                    "Check your internet connection",
                    "Try again in a few moments",
                ],
            },
            ErrorKind::Timeout => Guidance {
                title: "Payment timed out",
                explanation: "The payment was not confirmed in time.",
                suggestions: &[
                    "Check your wallet history before paying again",
                    "Try again",
                    "Choose cash on delivery",
                ],
            },
            ErrorKind::OrderCreationFailed => Guidance {
                title: "Order not created",
                explanation: "Your order could not be registered.",
                suggestions: &[
                    "Contact support with your transaction reference",
                    "Do not pay a second time before support confirms",
                ],
            },
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A classified failure as shown on the failed terminal screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    /// Raw text the kind was derived from, when there was one.
    pub raw: Option<String>,
}

impl ClassifiedError {
    pub fn from_raw(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        Self {
            kind: classify(&raw),
            raw: Some(raw),
        }
    }

    pub fn of(kind: ErrorKind) -> Self {
        Self { kind, raw: None }
    }

    pub fn guidance(&self) -> Guidance {
        self.kind.guidance()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_kinds() {
        assert_eq!(classify("insufficient balance"), ErrorKind::InsufficientFunds);
        assert_eq!(classify("invalid number format"), ErrorKind::InvalidNumber);
        assert_eq!(classify("Transaction DECLINED by user"), ErrorKind::TransactionDeclined);
        assert_eq!(classify("request timed out"), ErrorKind::Timeout);
        assert_eq!(classify("connection reset"), ErrorKind::NetworkError);
    }

    #[test]
    fn test_classify_defaults_to_network_error() {
        assert_eq!(classify("random gibberish"), ErrorKind::NetworkError);
        assert_eq!(classify(""), ErrorKind::NetworkError);
    }

    #[test]
    fn test_classify_is_deterministic() {
        let inputs = ["insufficient balance", "invalid number format", "random gibberish"];
        for input in inputs {
            assert_eq!(classify(input), classify(input));
        }
    }

    #[test]
    fn test_first_rule_wins() {
        // both "insufficient" and "declined" match; funds is checked first
        assert_eq!(
            classify("declined: insufficient funds"),
            ErrorKind::InsufficientFunds
        );
    }

    #[test]
    fn test_every_kind_has_guidance() {
        let kinds = [
            ErrorKind::InsufficientFunds,
            ErrorKind::InvalidNumber,
            ErrorKind::TransactionDeclined,
            ErrorKind::NetworkError,
            ErrorKind::Timeout,
            ErrorKind::OrderCreationFailed,
        ];
        for kind in kinds {
            let guidance = kind.guidance();
            assert!(!guidance.title.is_empty());
            assert!(!guidance.suggestions.is_empty());
        }
    }

    #[test]
    fn test_classified_error_keeps_raw_text() {
        let err = ClassifiedError::from_raw("Solde insuffisant");
        assert_eq!(err.kind, ErrorKind::InsufficientFunds);
        assert_eq!(err.raw.as_deref(), Some("Solde insuffisant"));
    }
}
