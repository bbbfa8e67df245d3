pub mod resize;

use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::services::VariantMaterializer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub materializer: Arc<VariantMaterializer>,
}

/// `variant_dir` is set when variants live on local disk; the router then
/// serves them itself so that redirect targets resolve.
pub fn create_router(state: AppState, variant_dir: Option<PathBuf>) -> Router {
    let router = Router::new().merge(resize::routes());

    let router = match variant_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
