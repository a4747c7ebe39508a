pub mod diesel_repo;
pub mod models;
