//! Static configuration of the order saga.

use std::path::PathBuf;

use url::Url;

/// Layout tag the CRM requires on every vehicle record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleLayout {
    pub name: String,
    pub id: String,
}

impl Default for VehicleLayout {
    fn default() -> Self {
        Self {
            name: "Transport Vehicles".to_string(),
            id: "3384000001943151".to_string(),
        }
    }
}

/// Settings shared by the saga services.
#[derive(Debug, Clone)]
pub struct SagaSettings {
    pub vehicle_layout: VehicleLayout,
    /// Directory downloaded release forms are staged in before upload.
    pub scratch_dir: PathBuf,
    /// Base of the CRM web UI, used for links in notifications.
    pub crm_web_url: String,
    /// Base URL relative release form references are resolved against.
    pub file_source_base: Option<Url>,
}

impl Default for SagaSettings {
    fn default() -> Self {
        Self {
            vehicle_layout: VehicleLayout::default(),
            scratch_dir: std::env::temp_dir(),
            crm_web_url: "https://crm.zohocloud.ca/crm/tab/Potentials".to_string(),
            file_source_base: None,
        }
    }
}
