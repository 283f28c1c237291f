//! Steps of the order creation saga.

use serde::{Deserialize, Serialize};

/// A step of the order creation saga, in execution order.
///
/// ```text
/// ParseRequest ──► NormalizeAttachments ──► PersistOrder ──► CreateDeal
///   ──► AttachDealFiles ──► RegisterVehicles ──► AttachVehicleFiles
///   ──► LinkDeal ──► Notify
/// ```
///
/// The local transaction is open from `PersistOrder` through `LinkDeal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SagaStep {
    ParseRequest,
    NormalizeAttachments,
    PersistOrder,
    CreateDeal,
    AttachDealFiles,
    RegisterVehicles,
    AttachVehicleFiles,
    LinkDeal,
    Notify,
}

impl SagaStep {
    /// Returns the step name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaStep::ParseRequest => "parse_request",
            SagaStep::NormalizeAttachments => "normalize_attachments",
            SagaStep::PersistOrder => "persist_order",
            SagaStep::CreateDeal => "create_deal",
            SagaStep::AttachDealFiles => "attach_deal_files",
            SagaStep::RegisterVehicles => "register_vehicles",
            SagaStep::AttachVehicleFiles => "attach_vehicle_files",
            SagaStep::LinkDeal => "link_deal",
            SagaStep::Notify => "notify",
        }
    }
}

impl std::fmt::Display for SagaStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(SagaStep::PersistOrder.to_string(), "persist_order");
        assert_eq!(SagaStep::RegisterVehicles.to_string(), "register_vehicles");
        assert_eq!(SagaStep::ParseRequest.to_string(), "parse_request");
    }
}
