//! Content-addressed keychain generation.
//!
//! [`KeychainGenerator::generate`] resolves the base model, derives the cache
//! key and either returns the cached STL or asks the CAD kernel to build it.
//! Builds write to a unique `.part` file next to the final path and are
//! renamed into place, so a concurrent reader never sees a partial STL.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tempfile::TempPath;

use crate::cache_key::{cache_key, cached_stl_filename};
use crate::kernel::{CadKernel, KernelError};
use crate::layout::StorageLayout;
use crate::plan::{layout_slots, BuildPlan};

/// Errors from [`KeychainGenerator::generate`].
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("Base model not found at: {}", .0.display())]
    BaseModelNotFound(PathBuf),

    #[error(transparent)]
    Kernel(#[from] KernelError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a successful generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedStl {
    pub path: PathBuf,
    /// `true` if the artifact already existed and the kernel was not invoked.
    pub cache_hit: bool,
}

/// Generates keychain STLs and caches them by input hash.
#[derive(Clone)]
pub struct KeychainGenerator {
    base_models_dir: PathBuf,
    cache_dir: PathBuf,
    kernel: Arc<dyn CadKernel>,
}

impl KeychainGenerator {
    pub fn new(layout: &StorageLayout, kernel: Arc<dyn CadKernel>) -> Self {
        Self {
            base_models_dir: layout.base_models_dir.clone(),
            cache_dir: layout.cache_dir.clone(),
            kernel,
        }
    }

    /// Resolve `base_model` to an existing STEP file.
    ///
    /// An existing file path is used as-is; anything else is looked up in the
    /// base-models directory.
    pub async fn resolve_base_model(&self, base_model: &str) -> Result<PathBuf, GenerateError> {
        let direct = Path::new(base_model);
        if is_file(direct).await {
            return Ok(direct.to_path_buf());
        }

        let in_base_dir = self.base_models_dir.join(base_model);
        if is_file(&in_base_dir).await {
            Ok(in_base_dir)
        } else {
            Err(GenerateError::BaseModelNotFound(in_base_dir))
        }
    }

    /// Path the artifact for this tuple is (or will be) cached at.
    pub fn cache_path(&self, bar_heights: &[f64], base_model: &str, extrusion_height: f64) -> PathBuf {
        let key = cache_key(bar_heights, base_model, extrusion_height);
        self.cache_dir.join(cached_stl_filename(&key))
    }

    /// Return the STL for this tuple, building it on a cache miss.
    ///
    /// The cache key is computed from `base_model` exactly as given, not from
    /// the resolved path.
    pub async fn generate(
        &self,
        bar_heights: &[f64],
        base_model: &str,
        extrusion_height: f64,
    ) -> Result<GeneratedStl, GenerateError> {
        let step_path = self.resolve_base_model(base_model).await?;
        let stl_path = self.cache_path(bar_heights, base_model, extrusion_height);

        if is_file(&stl_path).await {
            tracing::debug!(path = %stl_path.display(), "STL cache hit");
            return Ok(GeneratedStl {
                path: stl_path,
                cache_hit: true,
            });
        }

        // Removed on drop unless the rename below succeeds, including when
        // this future is dropped mid-build.
        let part = TempPath::from_path(part_path_for(&stl_path));
        let plan = BuildPlan {
            base_model: step_path,
            output: part.to_path_buf(),
            extrusion_height,
            slots: layout_slots(bar_heights),
        };

        let start = Instant::now();
        self.kernel.build(&plan).await?;
        tokio::fs::rename(&part, &stl_path).await?;
        // Renamed away; nothing left to clean up.
        let _ = part.keep();

        tracing::info!(
            path = %stl_path.display(),
            bars = bar_heights.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Generated keychain STL"
        );

        Ok(GeneratedStl {
            path: stl_path,
            cache_hit: false,
        })
    }
}

/// Unique temporary sibling of `final_path` for an in-flight build.
fn part_path_for(final_path: &Path) -> PathBuf {
    let mut name = final_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.part", uuid::Uuid::new_v4()));
    final_path.with_file_name(name)
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use async_trait::async_trait;

    use super::*;

    /// Writes a fixed payload and records every plan it receives.
    #[derive(Default)]
    struct RecordingKernel {
        calls: AtomicUsize,
        plans: Mutex<Vec<BuildPlan>>,
    }

    #[async_trait]
    impl CadKernel for RecordingKernel {
        async fn build(&self, plan: &BuildPlan) -> Result<(), KernelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.plans.lock().unwrap().push(plan.clone());
            tokio::fs::write(&plan.output, b"solid test\nendsolid test\n").await?;
            Ok(())
        }
    }

    struct FailingKernel;

    #[async_trait]
    impl CadKernel for FailingKernel {
        async fn build(&self, plan: &BuildPlan) -> Result<(), KernelError> {
            tokio::fs::write(&plan.output, b"partial").await?;
            Err(KernelError::ExecutionFailed {
                exit_code: 1,
                stderr: "boolean operation failed".into(),
            })
        }
    }

    /// Leaves a partial output behind and never finishes on its own.
    struct StalledKernel;

    #[async_trait]
    impl CadKernel for StalledKernel {
        async fn build(&self, plan: &BuildPlan) -> Result<(), KernelError> {
            tokio::fs::write(&plan.output, b"partial").await?;
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            Ok(())
        }
    }

    async fn setup() -> (tempfile::TempDir, StorageLayout) {
        let root = tempfile::tempdir().expect("create temp dir");
        let layout = StorageLayout::under(root.path());
        layout.ensure_dirs().await.expect("ensure dirs");
        std::fs::write(layout.base_models_dir.join("circle.step"), b"ISO-10303-21;").unwrap();
        (root, layout)
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[tokio::test]
    async fn cache_miss_builds_then_hit_reuses() {
        let (_root, layout) = setup().await;
        let kernel = Arc::new(RecordingKernel::default());
        let generator = KeychainGenerator::new(&layout, kernel.clone());

        let first = generator.generate(&[1.0, 2.0], "circle.step", 3.0).await.unwrap();
        let second = generator.generate(&[1.0, 2.0], "circle.step", 3.0).await.unwrap();

        assert!(!first.cache_hit);
        assert!(second.cache_hit);
        assert_eq!(first.path, second.path);
        assert_eq!(kernel.calls.load(Ordering::SeqCst), 1);
        assert_eq!(dir_entries(&layout.cache_dir).len(), 1);
    }

    #[tokio::test]
    async fn distinct_inputs_build_separately() {
        let (_root, layout) = setup().await;
        let kernel = Arc::new(RecordingKernel::default());
        let generator = KeychainGenerator::new(&layout, kernel.clone());

        let a = generator.generate(&[1.0, 2.0], "circle.step", 3.0).await.unwrap();
        let b = generator.generate(&[2.0, 1.0], "circle.step", 3.0).await.unwrap();

        assert_ne!(a.path, b.path);
        assert_eq!(kernel.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn plan_carries_resolved_model_and_slots() {
        let (_root, layout) = setup().await;
        let kernel = Arc::new(RecordingKernel::default());
        let generator = KeychainGenerator::new(&layout, kernel.clone());

        generator.generate(&[5.0, 1.0], "circle.step", 2.5).await.unwrap();

        let plans = kernel.plans.lock().unwrap();
        let plan = &plans[0];
        assert_eq!(plan.base_model, layout.base_models_dir.join("circle.step"));
        assert_eq!(plan.extrusion_height, 2.5);
        assert_eq!(plan.slots.len(), 2);
        assert_eq!(plan.slots[0].center, [15.5, 7.5]);
        assert!(plan.output.to_string_lossy().ends_with(".part"));
    }

    #[tokio::test]
    async fn direct_path_is_used_as_is() {
        let (_root, layout) = setup().await;
        let upload = layout.uploads_dir.join("abc.step");
        std::fs::write(&upload, b"ISO-10303-21;").unwrap();
        let generator = KeychainGenerator::new(&layout, Arc::new(RecordingKernel::default()));

        let resolved = generator
            .resolve_base_model(upload.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(resolved, upload);
    }

    #[tokio::test]
    async fn missing_base_model_is_not_found_and_builds_nothing() {
        let (_root, layout) = setup().await;
        let kernel = Arc::new(RecordingKernel::default());
        let generator = KeychainGenerator::new(&layout, kernel.clone());

        let err = generator
            .generate(&[1.0], "nope.step", 1.0)
            .await
            .unwrap_err();

        assert_matches!(err, GenerateError::BaseModelNotFound(_));
        assert!(err.to_string().contains("nope.step"));
        assert_eq!(kernel.calls.load(Ordering::SeqCst), 0);
        assert!(dir_entries(&layout.cache_dir).is_empty());
    }

    #[tokio::test]
    async fn kernel_failure_leaves_no_artifacts() {
        let (_root, layout) = setup().await;
        let generator = KeychainGenerator::new(&layout, Arc::new(FailingKernel));

        let err = generator
            .generate(&[1.0], "circle.step", 1.0)
            .await
            .unwrap_err();

        assert_matches!(err, GenerateError::Kernel(KernelError::ExecutionFailed { .. }));
        assert!(err.to_string().contains("boolean operation failed"));
        assert!(dir_entries(&layout.cache_dir).is_empty());
    }

    #[tokio::test]
    async fn abandoned_build_leaves_no_artifacts() {
        let (_root, layout) = setup().await;
        let generator = KeychainGenerator::new(&layout, Arc::new(StalledKernel));

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(200),
            generator.generate(&[1.0], "circle.step", 1.0),
        )
        .await;

        assert!(result.is_err(), "build should still be running");
        assert!(dir_entries(&layout.cache_dir).is_empty());
    }

    #[tokio::test]
    async fn concurrent_identical_requests_yield_complete_file() {
        let (_root, layout) = setup().await;
        let generator = KeychainGenerator::new(&layout, Arc::new(RecordingKernel::default()));

        let (a, b) = tokio::join!(
            generator.generate(&[1.0, 2.0], "circle.step", 3.0),
            generator.generate(&[1.0, 2.0], "circle.step", 3.0),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a.path, b.path);
        assert_eq!(
            std::fs::read(&a.path).unwrap(),
            b"solid test\nendsolid test\n"
        );
        // No stray .part files.
        assert_eq!(dir_entries(&layout.cache_dir).len(), 1);
    }

    #[test]
    fn part_path_is_unique_sibling() {
        let final_path = Path::new("/tmp/cache/abc.stl");
        let a = part_path_for(final_path);
        let b = part_path_for(final_path);
        assert_ne!(a, b);
        assert_eq!(a.parent(), final_path.parent());
        assert!(a.file_name().unwrap().to_string_lossy().starts_with("abc.stl."));
    }
}
