//! Reconciliation of CRM status updates into the order store.

use chrono::{DateTime, NaiveDateTime, Utc};
use order_store::{OrderPatch, OrderRecord, OrderStore, PatchValue};
use serde_json::{Map, Value};

use crate::error::ReconcileError;
use crate::request::{DEAL_ID_KEY, deal_id_from};
use crate::response::ReconcileResponse;

/// Fields a reconciliation update may change. Everything else is ignored.
pub const UPDATABLE_FIELDS: [&str; 9] = [
    "Status",
    "EstimatedDropoffTime",
    "EstimatedPickupTime",
    "CarrierID",
    "CarrierName",
    "CustomerPrice",
    "CarrierCost",
    "ActualDeliveryTime",
    "ActualPickupTime",
];

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

type Field<T> = std::result::Result<Option<PatchValue<T>>, ReconcileError>;

fn invalid(field: &'static str, reason: impl Into<String>) -> ReconcileError {
    ReconcileError::InvalidField {
        field,
        reason: reason.into(),
    }
}

fn text(body: &Map<String, Value>, field: &'static str) -> Field<String> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(Some(PatchValue::Clear)),
        Some(Value::String(s)) => Ok(Some(PatchValue::Set(s.clone()))),
        Some(Value::Number(n)) => Ok(Some(PatchValue::Set(n.to_string()))),
        Some(other) => Err(invalid(field, format!("expected text, got {other}"))),
    }
}

fn timestamp(body: &Map<String, Value>, field: &'static str) -> Field<DateTime<Utc>> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(Some(PatchValue::Clear)),
        Some(Value::String(s)) => parse_timestamp(s.trim())
            .map(|t| Some(PatchValue::Set(t)))
            .ok_or_else(|| invalid(field, format!("unparseable timestamp '{s}'"))),
        Some(other) => Err(invalid(field, format!("expected a timestamp, got {other}"))),
    }
}

fn amount(body: &Map<String, Value>, field: &'static str) -> Field<f64> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(|v| Some(PatchValue::Set(v)))
            .ok_or_else(|| invalid(field, format!("amount out of range: {n}"))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(Some(PatchValue::Clear)),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(|v| Some(PatchValue::Set(v)))
            .map_err(|_| invalid(field, format!("unparseable amount '{s}'"))),
        Some(other) => Err(invalid(field, format!("expected an amount, got {other}"))),
    }
}

/// Parses RFC 3339, or a zone-less date-time taken as UTC.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Some(t.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

/// Builds the patch for the whitelisted fields present in `body`.
pub fn parse_patch(body: &Map<String, Value>) -> Result<OrderPatch, ReconcileError> {
    Ok(OrderPatch {
        status: text(body, "Status")?,
        estimated_pickup_time: timestamp(body, "EstimatedPickupTime")?,
        estimated_dropoff_time: timestamp(body, "EstimatedDropoffTime")?,
        actual_pickup_time: timestamp(body, "ActualPickupTime")?,
        actual_delivery_time: timestamp(body, "ActualDeliveryTime")?,
        carrier_id: text(body, "CarrierID")?,
        carrier_name: text(body, "CarrierName")?,
        customer_price: amount(body, "CustomerPrice")?,
        carrier_cost: amount(body, "CarrierCost")?,
    })
}

/// Applies CRM-side changes to the matching local order.
pub struct ReconciliationUpdater<S>
where
    S: OrderStore,
{
    store: S,
}

impl<S> ReconciliationUpdater<S>
where
    S: OrderStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Applies an update body keyed by `DealID`.
    ///
    /// A missing order is a normal outcome, not a failure.
    #[tracing::instrument(skip(self, body))]
    pub async fn update(&self, body: Value) -> ReconcileResponse {
        match self.apply(body).await {
            Ok(Some(order)) => {
                metrics::counter!("reconciliation_updates_total", "outcome" => "updated")
                    .increment(1);
                tracing::info!(order_id = %order.id, "order reconciled");
                ReconcileResponse::updated()
            }
            Ok(None) => {
                metrics::counter!("reconciliation_updates_total", "outcome" => "not_found")
                    .increment(1);
                tracing::info!("no order for deal");
                ReconcileResponse::not_found()
            }
            Err(e) => {
                metrics::counter!("reconciliation_updates_total", "outcome" => "failed")
                    .increment(1);
                tracing::error!(error = %e, "reconciliation failed");
                ReconcileResponse::Failed(e.into_failure())
            }
        }
    }

    async fn apply(&self, body: Value) -> Result<Option<OrderRecord>, ReconcileError> {
        let Value::Object(body) = body else {
            return Err(ReconcileError::InvalidBody(
                "expected a JSON object".to_string(),
            ));
        };
        let Some(deal_id) = deal_id_from(&body) else {
            return Ok(None);
        };

        let ignored: Vec<&str> = body
            .keys()
            .map(String::as_str)
            .filter(|k| *k != DEAL_ID_KEY && !UPDATABLE_FIELDS.contains(k))
            .collect();
        if !ignored.is_empty() {
            tracing::debug!(?ignored, "ignoring fields outside the whitelist");
        }

        let patch = parse_patch(&body)?;
        if patch.is_empty() {
            tracing::debug!(%deal_id, "no updatable fields, checking the order exists");
        }
        Ok(self.store.apply_patch(&deal_id, &patch).await?)
    }
}
