use std::sync::Arc;
use thiserror::Error;

use crate::models::{VariantRedirect, VariantRequest};
use crate::services::image::{self, CodecError};
use crate::services::planner::{PlanError, ResizePlanner};
use crate::storage::{StorageBackend, StorageError};

/// Tag attached to every stored variant so bucket lifecycle rules can tell
/// derived objects from originals.
pub const RESIZED_TAG: (&str, &str) = ("resized", "true");

#[derive(Error, Debug)]
pub enum MaterializeError {
    #[error("Original not found: {0}")]
    OriginalNotFound(String),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Produces variants: fetch original, decode, plan, resize, encode, store.
pub struct VariantMaterializer {
    source: Arc<dyn StorageBackend>,
    target: Arc<dyn StorageBackend>,
    planner: ResizePlanner,
}

impl VariantMaterializer {
    pub fn new(
        source: Arc<dyn StorageBackend>,
        target: Arc<dyn StorageBackend>,
        planner: ResizePlanner,
    ) -> Self {
        Self {
            source,
            target,
            planner,
        }
    }

    pub async fn materialize(
        &self,
        req: &VariantRequest,
        accepts_webp: bool,
    ) -> Result<VariantRedirect, MaterializeError> {
        // Also covers a no-op request whose variant key is the original itself.
        let (_, variant_key) = self.planner.output_for(req, accepts_webp);
        if self.target.object_exists(&variant_key).await? {
            tracing::info!("Variant {} already stored", variant_key);
            return Ok(self.redirect(variant_key));
        }

        let original = match self.source.get_object(&req.original_key).await {
            Ok(data) => data,
            Err(StorageError::NotFound(_)) => {
                return Err(MaterializeError::OriginalNotFound(req.original_key.clone()))
            }
            Err(e) => return Err(e.into()),
        };

        let decoded = run_blocking(move || image::decode(&original)).await?;
        let plan = self.planner.plan(req, decoded.meta, accepts_webp)?;

        tracing::info!(
            "Rendering {} from {} ({}x{} -> {}x{}, {})",
            plan.variant_key,
            req.original_key,
            decoded.meta.width,
            decoded.meta.height,
            plan.target_width,
            plan.target_height,
            plan.content_type()
        );

        let source_image = decoded.image;
        let render_plan = plan.clone();
        let data = run_blocking(move || image::render(source_image, &render_plan)).await?;

        self.target
            .put_object(&plan.variant_key, &data, plan.content_type(), &[RESIZED_TAG])
            .await?;

        Ok(self.redirect(plan.variant_key))
    }

    fn redirect(&self, variant_key: String) -> VariantRedirect {
        VariantRedirect {
            location: self.target.public_url(&variant_key),
            variant_key,
        }
    }
}

async fn run_blocking<T, F>(task: F) -> Result<T, CodecError>
where
    F: FnOnce() -> Result<T, CodecError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| CodecError::Task(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::image::decode;
    use crate::services::image::tests::encoded;
    use crate::services::key_parser::parse_variant_key;
    use crate::storage::LocalStorage;
    use async_trait::async_trait;
    use ::image::ImageFormat;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tempfile::{tempdir, TempDir};

    const BASE_URL: &str = "https://img.example.com";

    /// Local bucket that counts reads and writes, optionally refusing tags.
    struct CountingStorage {
        inner: LocalStorage,
        gets: AtomicUsize,
        puts: AtomicUsize,
        fail_tagging: AtomicBool,
    }

    impl CountingStorage {
        fn new(dir: &TempDir) -> Arc<Self> {
            Arc::new(Self {
                inner: LocalStorage::new(dir.path(), BASE_URL),
                gets: AtomicUsize::new(0),
                puts: AtomicUsize::new(0),
                fail_tagging: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl StorageBackend for CountingStorage {
        async fn get_object(&self, key: &str) -> Result<Vec<u8>, StorageError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.inner.get_object(key).await
        }

        async fn object_exists(&self, key: &str) -> Result<bool, StorageError> {
            self.inner.object_exists(key).await
        }

        async fn write_object(
            &self,
            key: &str,
            data: &[u8],
            content_type: &str,
        ) -> Result<(), StorageError> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            self.inner.write_object(key, data, content_type).await
        }

        async fn tag_object(&self, key: &str, tags: &[(&str, &str)]) -> Result<(), StorageError> {
            if self.fail_tagging.load(Ordering::SeqCst) {
                return Err(StorageError::UploadFailed(format!("tagging {} refused", key)));
            }
            self.inner.tag_object(key, tags).await
        }

        async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
            self.inner.delete_object(key).await
        }

        fn public_url(&self, key: &str) -> String {
            self.inner.public_url(key)
        }
    }

    struct Fixture {
        _source_dir: TempDir,
        _target_dir: TempDir,
        source: Arc<CountingStorage>,
        target: Arc<CountingStorage>,
        materializer: VariantMaterializer,
    }

    fn fixture() -> Fixture {
        let source_dir = tempdir().unwrap();
        let target_dir = tempdir().unwrap();
        let source = CountingStorage::new(&source_dir);
        let target = CountingStorage::new(&target_dir);
        let materializer =
            VariantMaterializer::new(source.clone(), target.clone(), ResizePlanner::default());

        Fixture {
            _source_dir: source_dir,
            _target_dir: target_dir,
            source,
            target,
            materializer,
        }
    }

    async fn seed(storage: &CountingStorage, key: &str, data: &[u8]) {
        storage.inner.put_object(key, data, "image/jpeg", &[]).await.unwrap();
    }

    fn request(key: &str) -> VariantRequest {
        parse_variant_key(Some(key)).unwrap()
    }

    #[tokio::test]
    async fn stores_resized_jpeg_and_redirects() {
        let f = fixture();
        seed(&f.source, "photo.jpg", &encoded(1000, 800, ImageFormat::Jpeg)).await;

        let redirect = f
            .materializer
            .materialize(&request("300x200/photo.jpg"), false)
            .await
            .unwrap();

        assert_eq!(redirect.variant_key, "300x200/photo.jpg");
        assert_eq!(redirect.location, format!("{}/300x200/photo.jpg", BASE_URL));

        let stored = f.target.inner.get_object("300x200/photo.jpg").await.unwrap();
        assert_eq!(::image::guess_format(&stored).unwrap(), ImageFormat::Jpeg);
        let decoded = decode(&stored).unwrap();
        assert_eq!((decoded.meta.width, decoded.meta.height), (300, 200));
    }

    #[tokio::test]
    async fn webp_client_gets_webp_variant() {
        let f = fixture();
        seed(&f.source, "photo.jpg", &encoded(1000, 800, ImageFormat::Jpeg)).await;

        let redirect = f
            .materializer
            .materialize(&request("300x200/photo.jpg"), true)
            .await
            .unwrap();

        assert_eq!(redirect.location, format!("{}/300x200/photo.webp", BASE_URL));
        let stored = f.target.inner.get_object("300x200/photo.webp").await.unwrap();
        assert_eq!(::image::guess_format(&stored).unwrap(), ImageFormat::WebP);
        assert!(!f.target.inner.object_exists("300x200/photo.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn second_request_reuses_stored_variant() {
        let f = fixture();
        seed(&f.source, "photo.png", &encoded(400, 400, ImageFormat::Png)).await;
        let req = request("100x/photo.png");

        let first = f.materializer.materialize(&req, false).await.unwrap();
        let stored = f.target.inner.get_object("100x/photo.png").await.unwrap();
        let second = f.materializer.materialize(&req, false).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(f.source.gets.load(Ordering::SeqCst), 1);
        assert_eq!(f.target.puts.load(Ordering::SeqCst), 1);
        assert_eq!(f.target.inner.get_object("100x/photo.png").await.unwrap(), stored);
    }

    #[tokio::test]
    async fn missing_original() {
        let f = fixture();
        let result = f.materializer.materialize(&request("300x200/gone.jpg"), false).await;

        assert!(matches!(result, Err(MaterializeError::OriginalNotFound(key)) if key == "gone.jpg"));
        assert_eq!(f.target.puts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn undecodable_original_stores_nothing() {
        let f = fixture();
        seed(&f.source, "broken.jpg", b"not really a jpeg").await;

        let result = f.materializer.materialize(&request("10x10/broken.jpg"), false).await;

        assert!(matches!(result, Err(MaterializeError::Codec(_))));
        assert_eq!(f.target.puts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn echo_request_never_overwrites_original_in_shared_bucket() {
        let dir = tempdir().unwrap();
        let bucket = CountingStorage::new(&dir);
        let materializer =
            VariantMaterializer::new(bucket.clone(), bucket.clone(), ResizePlanner::default());
        let original = encoded(50, 50, ImageFormat::Png);
        seed(&bucket, "logo.png", &original).await;

        let redirect = materializer.materialize(&request("logo.png"), false).await.unwrap();

        assert_eq!(redirect.location, format!("{}/logo.png", BASE_URL));
        assert_eq!(bucket.puts.load(Ordering::SeqCst), 0);
        assert_eq!(bucket.inner.get_object("logo.png").await.unwrap(), original);
    }

    #[tokio::test]
    async fn failed_tagging_leaves_no_variant_behind() {
        let f = fixture();
        seed(&f.source, "photo.jpg", &encoded(1000, 800, ImageFormat::Jpeg)).await;
        f.target.fail_tagging.store(true, Ordering::SeqCst);
        let req = request("300x200/photo.jpg");

        let result = f.materializer.materialize(&req, false).await;

        assert!(matches!(
            result,
            Err(MaterializeError::Storage(StorageError::UploadFailed(_)))
        ));
        assert!(!f.target.inner.object_exists("300x200/photo.jpg").await.unwrap());

        // the next request renders again instead of reusing an untagged object
        f.target.fail_tagging.store(false, Ordering::SeqCst);
        f.materializer.materialize(&req, false).await.unwrap();

        assert_eq!(f.source.gets.load(Ordering::SeqCst), 2);
        assert_eq!(f.target.puts.load(Ordering::SeqCst), 2);
        assert!(f.target.inner.object_exists("300x200/photo.jpg").await.unwrap());
    }
}
