use crate::validator::{EmailValidator, ValidationResult, VerifyOptions};
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;

pub const NOT_A_STRING: &str = "email must be a string";
pub const PROCESSING_ERROR: &str = "processing error";

/// One entry of a bulk request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkItem {
    Address(String),
    /// Anything that was not a JSON string, kept in its JSON rendering
    NotAString(String),
}

impl From<Value> for BulkItem {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => BulkItem::Address(s),
            other => BulkItem::NotAString(other.to_string()),
        }
    }
}

impl From<&str> for BulkItem {
    fn from(value: &str) -> Self {
        BulkItem::Address(value.to_string())
    }
}

impl From<String> for BulkItem {
    fn from(value: String) -> Self {
        BulkItem::Address(value)
    }
}

/// Validates many addresses concurrently while keeping input order.
///
/// Each item runs in its own task; a bad item (or a panicking one) turns into
/// its own failed result and never affects its neighbours.
#[derive(Debug, Clone)]
pub struct BulkProcessor {
    validator: Arc<EmailValidator>,
}

impl BulkProcessor {
    pub fn new(validator: Arc<EmailValidator>) -> Self {
        Self { validator }
    }

    pub async fn process<I>(&self, items: I, options: VerifyOptions) -> Vec<ValidationResult>
    where
        I: IntoIterator,
        I::Item: Into<BulkItem>,
    {
        let handles: Vec<_> = items
            .into_iter()
            .map(Into::<BulkItem>::into)
            .map(|item| {
                let validator = Arc::clone(&self.validator);
                let label = match &item {
                    BulkItem::Address(email) => email.trim().to_string(),
                    BulkItem::NotAString(raw) => raw.clone(),
                };
                let handle = tokio::spawn(async move {
                    match item {
                        BulkItem::Address(email) => validator.validate(&email, options).await,
                        BulkItem::NotAString(raw) => ValidationResult::rejected(raw, NOT_A_STRING),
                    }
                });
                (label, handle)
            })
            .collect();

        let results = join_in_order(handles).await;
        log::debug!("Bulk run finished: {} results", results.len());
        results
    }
}

/// Await item tasks in submission order. A task that panicked or was
/// cancelled yields a `processing error` result under its label.
async fn join_in_order(
    handles: Vec<(String, JoinHandle<ValidationResult>)>,
) -> Vec<ValidationResult> {
    let mut results = Vec::with_capacity(handles.len());
    for (label, handle) in handles {
        match handle.await {
            Ok(result) => results.push(result),
            Err(e) => {
                log::warn!("Bulk item {label:?} failed: {e}");
                results.push(ValidationResult::rejected(label, PROCESSING_ERROR));
            }
        }
    }
    results
}
