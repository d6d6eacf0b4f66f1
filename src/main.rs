use school_library_lending::{
    adapters::{mock, postgres},
    api::{handlers::AppState, router::create_router},
    application::borrowing::{self, ServiceDependencies},
    config::{AppConfig, StorageBackend},
    domain::LendingTerms,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let terms = config.lending.to_terms()?;

    let service_deps = match config.storage.backend {
        StorageBackend::Postgres => postgres_dependencies(&config, terms).await?,
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on shutdown");
            memory_dependencies(terms)
        }
    };

    if let Some(interval) = config.reservations.sweep_interval() {
        spawn_expiry_sweep(service_deps.clone(), interval);
    }

    // Create application state
    let app_state = Arc::new(AppState { service_deps });

    // Create router
    let app = create_router(app_state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn postgres_dependencies(
    config: &AppConfig,
    terms: LendingTerms,
) -> Result<ServiceDependencies, BoxError> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(ServiceDependencies {
        borrower_repository: Arc::new(postgres::PostgresBorrowerRepository::new(pool.clone())),
        copy_ledger: Arc::new(postgres::PostgresCopyLedger::new(pool.clone())),
        loan_repository: Arc::new(postgres::PostgresLoanRepository::new(pool.clone())),
        reservation_repository: Arc::new(postgres::PostgresReservationRepository::new(
            pool.clone(),
        )),
        event_store: Arc::new(postgres::PostgresEventStore::new(pool)),
        terms,
    })
}

fn memory_dependencies(terms: LendingTerms) -> ServiceDependencies {
    ServiceDependencies {
        borrower_repository: Arc::new(mock::BorrowerRepository::new()),
        copy_ledger: Arc::new(mock::CopyLedger::new()),
        loan_repository: Arc::new(mock::LoanRepository::new()),
        reservation_repository: Arc::new(mock::ReservationRepository::new()),
        event_store: Arc::new(mock::EventStore::new()),
        terms,
    }
}

/// Periodically cancels pending reservations whose hold has lapsed.
fn spawn_expiry_sweep(deps: ServiceDependencies, interval: Duration) {
    tracing::info!(interval_secs = interval.as_secs(), "Reservation expiry sweep enabled");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match borrowing::expire_reservations(&deps, chrono::Utc::now()).await {
                Ok(0) => {}
                Ok(expired) => tracing::info!(expired, "Expired pending reservations"),
                Err(e) => tracing::error!(error = %e, "Reservation expiry sweep failed"),
            }
        }
    });
}
