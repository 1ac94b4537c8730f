use std::{error::Error, sync::Arc};

use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use upload_presign_server::{
    config::PresignConfig, router::build_presign_router, signer::s3::S3UploadSigner,
    state::PresignServerState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();

    // setup tracing and logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // load configuration
    let config = match std::env::var("PRESIGN_CONFIG") {
        Ok(path) => PresignConfig::from_file(path)?,
        Err(_) => PresignConfig::from_env()?,
    };

    // configure url signer, one s3 client shared by every request
    let signer = S3UploadSigner::from_config(&config).await;

    // initialize server state
    let bind_address = config.bind_address().to_owned();
    let state = PresignServerState::new(config, Arc::new(signer));

    // start server
    let app = build_presign_router(Arc::new(state)).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %bind_address, "presign server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
