//! Payloads returned to callers.
//!
//! Every payload carries a `code`, which the HTTP layer uses as the status.

use common::DealId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const CODE_CREATED: u16 = 201;
pub const CODE_OK: u16 = 200;
pub const CODE_INTERNAL: u16 = 500;

/// Failure payload shared by all operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailurePayload {
    /// Diagnostic detail, preserving the original error message.
    pub error: String,
    /// Human-readable summary.
    pub message: String,
    pub code: u16,
}

impl FailurePayload {
    pub fn internal(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            code: CODE_INTERNAL,
        }
    }
}

/// Success payload of the order creation saga.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub status: String,
    pub code: u16,
    pub order_label: String,
    pub remote_deal_id: DealId,
    pub vehicles: Vec<Map<String, Value>>,
}

impl OrderCreated {
    pub fn new(order_label: String, remote_deal_id: DealId, vehicles: Vec<Map<String, Value>>) -> Self {
        Self {
            status: "success".to_string(),
            code: CODE_CREATED,
            order_label,
            remote_deal_id,
            vehicles,
        }
    }
}

/// Outcome of the order creation saga.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OrderResponse {
    Created(OrderCreated),
    Failed(FailurePayload),
}

impl OrderResponse {
    pub fn code(&self) -> u16 {
        match self {
            OrderResponse::Created(created) => created.code,
            OrderResponse::Failed(failure) => failure.code,
        }
    }
}

/// `{status, message, code}` payload used for normal outcomes that carry no
/// data, including "not found".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusPayload {
    pub status: String,
    pub message: String,
    pub code: u16,
}

/// Outcome of a reconciliation update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReconcileResponse {
    Updated(StatusPayload),
    NotFound(StatusPayload),
    Failed(FailurePayload),
}

impl ReconcileResponse {
    pub fn updated() -> Self {
        ReconcileResponse::Updated(StatusPayload {
            status: "success".to_string(),
            message: "Record updated successfully".to_string(),
            code: CODE_OK,
        })
    }

    pub fn not_found() -> Self {
        ReconcileResponse::NotFound(StatusPayload {
            status: "error".to_string(),
            message: "Record not found".to_string(),
            code: CODE_OK,
        })
    }

    pub fn code(&self) -> u16 {
        match self {
            ReconcileResponse::Updated(p) | ReconcileResponse::NotFound(p) => p.code,
            ReconcileResponse::Failed(failure) => failure.code,
        }
    }
}

/// Success payload of a forwarded deal update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealUpdated {
    pub status: String,
    pub code: u16,
    /// The CRM's response body.
    pub data: Value,
}

/// Outcome of a forwarded deal update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DealUpdateResponse {
    Updated(DealUpdated),
    Failed(FailurePayload),
}

impl DealUpdateResponse {
    pub fn code(&self) -> u16 {
        match self {
            DealUpdateResponse::Updated(updated) => updated.code,
            DealUpdateResponse::Failed(failure) => failure.code,
        }
    }
}
