pub mod assignment_service;
pub mod fulfillment_service;
pub mod ingestion_service;
pub mod monitor_service;
pub mod proof_service;
pub mod scheduler;
