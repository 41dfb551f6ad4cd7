//! Discriminated result handed back to the UI layer for every user action

use serde::Serialize;
use std::collections::BTreeMap;

/// Form field a validation message belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Amount,
    RecipientName,
    RecipientEmail,
}

/// Per-field validation messages, ordered by field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Field, &String)> {
        self.0.iter()
    }
}

/// Why an action failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ErrorClass {
    /// Rejected client-side before any network call
    FieldValidation { fields: FieldErrors },
    /// The action cannot be attempted (missing funding source, already claimed, busy)
    Precondition,
    /// The server received and declined the request
    ServerRejection { status: Option<u16> },
    /// The request never reached the server or timed out
    TransientNetwork,
    /// The owning view went away before the action finished
    Cancelled,
}

/// Terminal failure of a user action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
    pub user_message: String,
    pub classification: ErrorClass,
}

impl Failure {
    pub fn new(classification: ErrorClass, user_message: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            classification,
        }
    }

    pub fn precondition(user_message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Precondition, user_message)
    }

    pub fn fields(fields: FieldErrors) -> Self {
        let user_message = fields
            .iter()
            .next()
            .map(|(_, m)| m.clone())
            .unwrap_or_default();
        Self::new(ErrorClass::FieldValidation { fields }, user_message)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorClass::Cancelled, "Cancelled")
    }

    /// Field errors, if this is a validation failure
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match &self.classification {
            ErrorClass::FieldValidation { fields } => Some(fields),
            _ => None,
        }
    }
}

/// Result of a user action: never a panic, never an untyped error
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Outcome<T> {
    Success { data: T },
    Error(Failure),
}

impl<T> Outcome<T> {
    pub fn success(data: T) -> Self {
        Outcome::Success { data }
    }

    pub fn failure(failure: Failure) -> Self {
        Outcome::Error(failure)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Outcome::Success { data } => Some(data),
            Outcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&Failure> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::Error(f) => Some(f),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Success { data } => Outcome::Success { data: f(data) },
            Outcome::Error(e) => Outcome::Error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_failure_surfaces_first_message() {
        let mut fields = FieldErrors::new();
        fields.insert(Field::RecipientEmail, "Recipient email is required");
        fields.insert(Field::Amount, "Minimum gift card amount is $5.");
        let failure = Failure::fields(fields);
        assert_eq!(failure.user_message, "Minimum gift card amount is $5.");
        assert_eq!(failure.field_errors().unwrap().len(), 2);
    }

    #[test]
    fn test_outcome_serializes_with_kind_tag() {
        let ok: Outcome<u32> = Outcome::success(7);
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["kind"], "success");
        assert_eq!(json["data"], 7);

        let err: Outcome<u32> = Outcome::failure(Failure::precondition("busy"));
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "error");
        assert_eq!(json["userMessage"], "busy");
        assert_eq!(json["classification"]["type"], "precondition");
    }
}
