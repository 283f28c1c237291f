//! Saga coordinator for transport order creation.

use std::sync::Arc;
use std::time::Instant;

use crm::{CrmClient, DEALS_MODULE, FileFetcher, Notifier, VEHICLES_MODULE};
use order_store::{OrderStore, OrderTransaction};
use serde_json::Value;

use crate::error::{AttachmentError, Result, SagaError};
use crate::normalizer::{LocatorResolver, normalize_release_forms, release_form};
use crate::request::OrderRequest;
use crate::response::{OrderCreated, OrderResponse};
use crate::services::{
    AttachmentUploader, DealCreator, VehicleRegistrar, announce_order, open_order,
    order_announcement, output_record,
};
use crate::settings::SagaSettings;
use crate::step::SagaStep;

/// Orchestrates the creation of a transport order across the order store
/// and the CRM.
///
/// The local transaction stays open from the order insert until the deal id
/// has been linked. Failures before the deal exists roll it back and leave
/// nothing behind. Failures after the deal exists roll it back too, but the
/// deal is not compensated: it is reported as orphaned.
pub struct SagaCoordinator<S>
where
    S: OrderStore,
{
    store: S,
    deals: DealCreator,
    vehicles: VehicleRegistrar,
    attachments: AttachmentUploader,
    notifier: Arc<dyn Notifier>,
    locator: LocatorResolver,
    crm_web_url: String,
}

impl<S> SagaCoordinator<S>
where
    S: OrderStore,
{
    /// Creates a new saga coordinator.
    pub fn new(
        store: S,
        crm: Arc<dyn CrmClient>,
        fetcher: Arc<dyn FileFetcher>,
        notifier: Arc<dyn Notifier>,
        settings: SagaSettings,
    ) -> Self {
        Self {
            store,
            deals: DealCreator::new(Arc::clone(&crm)),
            vehicles: VehicleRegistrar::new(Arc::clone(&crm), settings.vehicle_layout),
            attachments: AttachmentUploader::new(crm, fetcher, settings.scratch_dir),
            notifier,
            locator: LocatorResolver::new(settings.file_source_base),
            crm_web_url: settings.crm_web_url,
        }
    }

    /// Returns the order store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs the saga for a raw JSON request body.
    ///
    /// A body that does not describe an order is reported like any other
    /// failure.
    pub async fn create_order_from_json(&self, body: Value) -> OrderResponse {
        match serde_json::from_value::<OrderRequest>(body) {
            Ok(request) => self.create_order(request).await,
            Err(e) => {
                metrics::counter!("saga_executions_total").increment(1);
                self.finish(Instant::now(), Err(SagaError::InvalidRequest(e.to_string())))
            }
        }
    }

    /// Runs the order creation saga.
    ///
    /// Never fails: fatal errors are converted into a failure payload.
    #[tracing::instrument(skip(self, request), fields(saga_type = "TransportOrder", vehicles = request.vehicles.len()))]
    pub async fn create_order(&self, request: OrderRequest) -> OrderResponse {
        metrics::counter!("saga_executions_total").increment(1);
        let saga_start = Instant::now();
        let outcome = self.execute(&request).await;
        self.finish(saga_start, outcome)
    }

    fn finish(&self, saga_start: Instant, outcome: Result<OrderCreated>) -> OrderResponse {
        metrics::histogram!("saga_duration_seconds").record(saga_start.elapsed().as_secs_f64());

        match outcome {
            Ok(created) => {
                metrics::counter!("saga_completed").increment(1);
                tracing::info!(
                    order_label = %created.order_label,
                    deal_id = %created.remote_deal_id,
                    "saga completed"
                );
                OrderResponse::Created(created)
            }
            Err(e) => {
                let step = e.step();
                metrics::counter!("saga_failed", "step" => step.as_str()).increment(1);

                if let Some(deal_id) = e.orphaned_deal() {
                    metrics::counter!("saga_orphaned_deals_total").increment(1);
                    tracing::error!(
                        orphaned_deal_id = %deal_id,
                        %step,
                        "CRM deal has no local order"
                    );
                }

                tracing::error!(%step, error = %e, "saga failed");
                OrderResponse::Failed(e.into_failure())
            }
        }
    }

    async fn execute(&self, request: &OrderRequest) -> Result<OrderCreated> {
        // 1. Normalize release forms
        let release_forms = match normalize_release_forms(&request.vehicles, &self.locator) {
            Ok(forms) => forms,
            Err(e) => {
                tracing::warn!(error = %e, "continuing without deal attachments");
                Vec::new()
            }
        };

        // 2. Insert the order, leaving the transaction open
        tracing::info!(step = %SagaStep::PersistOrder, "saga step started");
        let (mut tx, order) = open_order(&self.store, &request.new_order())
            .await
            .map_err(SagaError::OrderPersistence)?;

        // 3. Create the deal
        tracing::info!(step = %SagaStep::CreateDeal, order_id = %order.id, "saga step started");
        let deal_id = match self.deals.create(&order, request).await {
            Ok(deal_id) => deal_id,
            Err(e) => {
                Self::rollback(tx).await;
                return Err(SagaError::DealCreation(e));
            }
        };

        // 4. Attach release forms to the deal
        for url in &release_forms {
            if let Err(e) = self
                .attachments
                .upload(DEALS_MODULE, deal_id.as_str(), url)
                .await
            {
                Self::attachment_failed(SagaStep::AttachDealFiles, deal_id.as_str(), &e);
            }
        }

        // 5. Create the vehicles in one batch
        tracing::info!(step = %SagaStep::RegisterVehicles, %deal_id, "saga step started");
        let registered = match self
            .vehicles
            .register(&deal_id, &order, &request.vehicles)
            .await
        {
            Ok(registered) => registered,
            Err(source) => {
                Self::rollback(tx).await;
                return Err(SagaError::VehicleCreation { deal_id, source });
            }
        };

        // 6. Attach each vehicle's own release form
        for (vehicle, created) in request.vehicles.iter().zip(&registered) {
            let (Some(vehicle_id), Some(reference)) = (&created.vehicle_id, release_form(vehicle))
            else {
                continue;
            };

            let attached = match self.locator.resolve_form(reference) {
                Ok(url) => {
                    self.attachments
                        .link(VEHICLES_MODULE, vehicle_id.as_str(), &url)
                        .await
                }
                Err(e) => Err(AttachmentError::from(e)),
            };
            if let Err(e) = attached {
                Self::attachment_failed(SagaStep::AttachVehicleFiles, vehicle_id.as_str(), &e);
            }
        }

        // 7. Link the deal and commit; an early return drops the transaction
        tracing::info!(step = %SagaStep::LinkDeal, %deal_id, "saga step started");
        if let Err(source) = tx.link_deal(order.id, &deal_id).await {
            return Err(SagaError::LinkDeal { deal_id, source });
        }
        if let Err(source) = tx.commit().await {
            return Err(SagaError::LinkDeal { deal_id, source });
        }

        // 8. Announce
        let message =
            order_announcement(&order, registered.len(), &deal_id, &self.crm_web_url);
        announce_order(self.notifier.as_ref(), &message).await;

        let vehicles = registered.iter().map(output_record).collect();
        Ok(OrderCreated::new(order.id.label(), deal_id, vehicles))
    }

    async fn rollback(tx: S::Transaction) {
        if let Err(e) = tx.rollback().await {
            tracing::warn!(error = %e, "explicit rollback failed, transaction dropped");
        }
    }

    fn attachment_failed(step: SagaStep, record_id: &str, error: &AttachmentError) {
        metrics::counter!("saga_attachment_failures_total").increment(1);
        tracing::warn!(%step, record_id, error = %error, "attachment failed");
    }
}
