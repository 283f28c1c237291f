//! Order creation, reconciliation and deal update endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use order_store::OrderStore;
use saga::error::{CREATE_FAILURE_MESSAGE, DEAL_UPDATE_FAILURE_MESSAGE, RECONCILE_FAILURE_MESSAGE};
use saga::{
    DealUpdateResponse, OrderResponse, ReconcileResponse, ReconciliationUpdater,
    RemoteDealUpdater, SagaCoordinator,
};
use serde_json::Value;

use crate::error::{ApiError, status_for};

/// Shared application state accessible from all handlers.
pub struct AppState<S: OrderStore> {
    pub saga_coordinator: SagaCoordinator<S>,
    pub reconciler: ReconciliationUpdater<S>,
    pub deal_updater: RemoteDealUpdater,
}

type Body = Result<Json<Value>, JsonRejection>;

/// POST /orders: run the order creation saga.
#[tracing::instrument(skip(state, body))]
pub async fn create<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    body: Body,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let Json(body) = body.map_err(|e| ApiError::invalid_body(e, CREATE_FAILURE_MESSAGE))?;

    let response = state.saga_coordinator.create_order_from_json(body).await;
    Ok((status_for(response.code()), Json(response)))
}

/// POST /orders/reconcile: apply CRM-side changes to the local order.
#[tracing::instrument(skip(state, body))]
pub async fn reconcile<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    body: Body,
) -> Result<(StatusCode, Json<ReconcileResponse>), ApiError> {
    let Json(body) = body.map_err(|e| ApiError::invalid_body(e, RECONCILE_FAILURE_MESSAGE))?;

    let response = state.reconciler.update(body).await;
    Ok((status_for(response.code()), Json(response)))
}

/// PUT /orders/remote: forward field changes to the CRM deal.
#[tracing::instrument(skip(state, body))]
pub async fn update_remote<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    body: Body,
) -> Result<(StatusCode, Json<DealUpdateResponse>), ApiError> {
    let Json(body) = body.map_err(|e| ApiError::invalid_body(e, DEAL_UPDATE_FAILURE_MESSAGE))?;

    let response = state.deal_updater.update(body).await;
    Ok((status_for(response.code()), Json(response)))
}
