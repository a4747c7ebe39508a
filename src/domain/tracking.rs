use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

text_enum! {
    pub enum TrackingStatus {
        LabelCreated => "label_created",
        InTransit => "in_transit",
        OutForDelivery => "out_for_delivery",
        Delivered => "delivered",
        Exception => "exception",
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ShipmentTracking {
    pub id: Uuid,
    pub order_id: Uuid,
    pub vendor_assignment_id: Uuid,
    pub carrier: String,
    pub tracking_number: String,
    pub status: TrackingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTracking {
    pub order_id: Uuid,
    pub vendor_assignment_id: Uuid,
    pub carrier: String,
    pub tracking_number: String,
    pub created_at: DateTime<Utc>,
}
