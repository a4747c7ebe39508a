use std::sync::{Arc, RwLock};

use marketplace_fulfillment::application::assignment_service::AssignmentService;
use marketplace_fulfillment::application::fulfillment_service::FulfillmentService;
use marketplace_fulfillment::application::ingestion_service::IngestionService;
use marketplace_fulfillment::application::monitor_service::MonitorService;
use marketplace_fulfillment::application::proof_service::ProofService;
use marketplace_fulfillment::application::scheduler::spawn_monitor_job;
use marketplace_fulfillment::config::AppConfig;
use marketplace_fulfillment::connectors::HttpConnectorFactory;
use marketplace_fulfillment::domain::monitor::SweepKind;
use marketplace_fulfillment::domain::ports::MonitorRepository;
use marketplace_fulfillment::infrastructure::diesel_repo::DieselRepository;
use marketplace_fulfillment::{build_server, create_pool, run_migrations, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().expect("Invalid configuration");

    let pool = create_pool(
        &config.database_url,
        config.db_pool_size,
        config.db_connection_timeout,
    )
    .expect("Failed to create database connection pool");
    run_migrations(&pool).expect("Failed to run database migrations");

    let repo = DieselRepository::new(pool);

    // Persisted admin overrides win over environment defaults.
    let thresholds = match repo.load_thresholds() {
        Ok(Some(saved)) => saved,
        Ok(None) => config.default_thresholds,
        Err(e) => {
            log::warn!("Could not load saved thresholds, using defaults: {}", e);
            config.default_thresholds
        }
    };
    log::info!("SLA thresholds in effect: {:?}", thresholds);

    let monitor = Arc::new(MonitorService::new(
        repo.clone(),
        Arc::new(RwLock::new(thresholds)),
    ));
    let state = AppState {
        ingestion: Arc::new(IngestionService::new(
            repo.clone(),
            HttpConnectorFactory::new(config.connector_timeout),
        )),
        assignments: Arc::new(AssignmentService::new(repo.clone())),
        fulfillment: Arc::new(FulfillmentService::new(repo.clone())),
        proofs: Arc::new(ProofService::new(repo, config.proof_ttl)),
        monitor: monitor.clone(),
    };

    spawn_monitor_job(
        monitor.clone(),
        SweepKind::Critical,
        config.critical_sweep_interval,
    );
    spawn_monitor_job(monitor, SweepKind::Full, config.full_sweep_interval);

    log::info!("Starting server at http://{}:{}", config.host, config.port);

    build_server(state, &config.host, config.port)?.await
}
