//! Saga steps wrapping one collaborator call each.

pub mod attachments;
pub mod deal;
pub mod notification;
pub mod store_writer;
pub mod vehicles;

pub use attachments::AttachmentUploader;
pub use deal::{DealCreator, deal_payload};
pub use notification::{announce_order, order_announcement};
pub use store_writer::open_order;
pub use vehicles::{RegisteredVehicle, VehicleRegistrar, output_record, vehicle_payload};
