mod config;
mod error;
mod models;
mod routes;
mod services;
mod storage;

use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, StorageType};
use crate::routes::{create_router, AppState};
use crate::services::{ResizePlanner, VariantMaterializer};
use crate::storage::{LocalStorage, S3Storage, StorageBackend, StorageError};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lazy_resize=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    tracing::info!(
        "Source bucket {}, target bucket {}, output format {}",
        config.bucket_source,
        config.bucket_target,
        config.format_policy.as_str()
    );
    if config.allowed_dimensions.is_empty() {
        tracing::warn!("ALLOWED_DIMENSIONS not set - every dimension is accepted");
    }
    if config.allowed_extensions.is_empty() {
        tracing::info!("ALLOWED_EXTENSIONS not set - every recognized extension is accepted");
    }

    let (source, target, variant_dir) = match config.storage_type {
        StorageType::S3 => {
            tracing::info!("Using S3 storage");
            let (source, target) = s3_buckets(&config)?;
            (source, target, None)
        }
        StorageType::Local => {
            tracing::info!("Using local storage under {}", config.storage_dir);
            let root = PathBuf::from(&config.storage_dir);
            let source = LocalStorage::new(root.join(&config.bucket_source), &config.url);
            let target = LocalStorage::new(root.join(&config.bucket_target), &config.url);
            source.ensure_dir().await?;
            target.ensure_dir().await?;
            let variant_dir = target.root().to_path_buf();

            let source: Arc<dyn StorageBackend> = Arc::new(source);
            let target: Arc<dyn StorageBackend> = Arc::new(target);
            (source, target, Some(variant_dir))
        }
    };

    let materializer =
        VariantMaterializer::new(source, target, ResizePlanner::new(config.format_policy));

    let state = AppState {
        config: Arc::new(config.clone()),
        materializer: Arc::new(materializer),
    };

    let app = create_router(state, variant_dir);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Variants redirect to {}", config.url);

    axum::serve(listener, app).await?;

    Ok(())
}

fn s3_buckets(
    config: &Config,
) -> Result<(Arc<dyn StorageBackend>, Arc<dyn StorageBackend>), StorageError> {
    let region = S3Storage::region(&config.s3_region, config.s3_endpoint.as_deref())?;
    let credentials = S3Storage::credentials(
        config.s3_access_key.as_deref(),
        config.s3_secret_key.as_deref(),
    )?;

    let source = S3Storage::new(
        &config.bucket_source,
        region.clone(),
        credentials.clone(),
        config.s3_path_style,
        &config.url,
    )?;
    let target = S3Storage::new(
        &config.bucket_target,
        region,
        credentials,
        config.s3_path_style,
        &config.url,
    )?;

    Ok((Arc::new(source), Arc::new(target)))
}
