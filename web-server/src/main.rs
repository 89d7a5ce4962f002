//! HTTP surface for the verification core: document upload, status
//! queries, and the admin review gateway.

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use vetmarket_verification::{
    AdminReviewGateway, DocumentUploadPipeline, InMemoryProfileDirectory, InMemoryRecordStore,
    LocalObjectStore, LogNotifier, ObjectStore, ProfileRole, StatusQueryService,
    VerificationRecordStore,
};

mod routes;

use routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "vetmarket_web_server=info,tower_http=debug".to_string()),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let document_store_path =
        std::env::var("DOCUMENT_STORE_PATH").unwrap_or_else(|_| "document-store".to_string());
    info!("Storing documents under {}", document_store_path);

    let records = build_record_store().await?;
    let objects: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(&document_store_path));

    // The profile directory is the marketplace's own profile tables in a
    // real deployment; the POC seeds a demo profile per role.
    let profiles = Arc::new(InMemoryProfileDirectory::new());
    seed_demo_profiles(&profiles).await;

    let state = AppState {
        pipeline: Arc::new(DocumentUploadPipeline::new(
            profiles.clone(),
            objects,
            records.clone(),
        )),
        gateway: Arc::new(AdminReviewGateway::new(records.clone())),
        status: Arc::new(StatusQueryService::new(records)),
        notifier: Arc::new(LogNotifier),
    };

    let app = routes::create_router(state);

    // Determine port
    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()
        .unwrap_or(3000);

    let addr = format!("0.0.0.0:{}", port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_record_store() -> anyhow::Result<Arc<dyn VerificationRecordStore>> {
    #[cfg(feature = "database")]
    {
        if let Ok(database_url) = std::env::var("DATABASE_URL") {
            info!("Connecting to database");
            let store = vetmarket_verification::PgRecordStore::connect(&database_url).await?;
            store.ensure_schema().await?;
            return Ok(Arc::new(store));
        }
    }

    info!("DATABASE_URL not set; using in-memory record store");
    Ok(Arc::new(InMemoryRecordStore::new()))
}

async fn seed_demo_profiles(profiles: &InMemoryProfileDirectory) {
    for (role, name) in [
        (ProfileRole::Doctor, "Dr. Meera Anand"),
        (ProfileRole::Farmer, "Green Acres Dairy"),
        (ProfileRole::MedicalStore, "City Vet Supplies"),
    ] {
        let profile = profiles.register(Uuid::new_v4(), role, name).await;
        info!(profile_id = %profile.profile_id, role = %role, "seeded demo profile");
    }
}
