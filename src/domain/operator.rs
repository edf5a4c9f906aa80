use crate::domain::session::Field;
use crate::error::FieldError;
use serde::{Deserialize, Serialize};

/// A mobile-money operator accepting wallet transfers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub id: String,
    pub name: String,
    /// Leading digits a subscriber number must start with.
    pub prefixes: Vec<String>,
    /// Exact number of digits of a subscriber number.
    pub digits: usize,
}

impl Operator {
    pub fn new(id: &str, name: &str, prefixes: &[&str], digits: usize) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
            digits,
        }
    }

    /// Checks a normalized (digits-only) number against this operator's constraints.
    pub fn validate_number(&self, number: &str) -> Result<(), FieldError> {
        if number.len() != self.digits {
            return Err(FieldError::new(
                Field::PhoneNumber,
                format!(
                    "{} numbers must have exactly {} digits",
                    self.name, self.digits
                ),
            ));
        }
        if !self.prefixes.iter().any(|p| number.starts_with(p.as_str())) {
            return Err(FieldError::new(
                Field::PhoneNumber,
                format!(
                    "{} numbers must start with {}",
                    self.name,
                    self.prefixes.join(", ")
                ),
            ));
        }
        Ok(())
    }
}

/// Strips common separators and rejects anything that is not a digit.
pub fn normalize_phone_number(raw: &str) -> Result<String, FieldError> {
    let mut digits = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '.' => {}
            _ => {
                return Err(FieldError::new(
                    Field::PhoneNumber,
                    "Phone number may only contain digits",
                ));
            }
        }
    }
    if digits.is_empty() {
        return Err(FieldError::new(Field::PhoneNumber, "Phone number is required"));
    }
    Ok(digits)
}

/// The operators offered at checkout.
#[derive(Debug, Clone)]
pub struct OperatorCatalogue {
    operators: Vec<Operator>,
}

impl OperatorCatalogue {
    pub fn new(operators: Vec<Operator>) -> Self {
        Self { operators }
    }

    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    pub fn find(&self, id: &str) -> Option<&Operator> {
        self.operators.iter().find(|o| o.id.eq_ignore_ascii_case(id))
    }
}

impl Default for OperatorCatalogue {
    fn default() -> Self {
        Self::new(vec![
            Operator::new("orange", "Orange Money", &["07"], 10),
            Operator::new("mtn", "MTN MoMo", &["05"], 10),
            Operator::new("moov", "Moov Money", &["01"], 10),
            Operator::new("wave", "Wave", &["01", "05", "07"], 10),
        ])
    }
}
