//! The transform orchestrator: one immutable build pass over an options map.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::bundler::{BundleRequest, Bundler, OutputDescriptor, ResolutionMode, WrapBundler};
use crate::cache::{CacheNamespace, PersistentCache};
use crate::cache_key::compute_cache_key;
use crate::error::{AmdifyError, Result};
use crate::fingerprint::DependencyFingerprinter;
use crate::options::{TransformEntry, TransformOptions, PACKAGE_NAMESPACE};
use crate::resolver::PackageResolver;

/// Summary of one build pass.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Entries that went through the bundler this pass.
    pub entries_bundled: usize,

    /// Entries replayed from the persistent cache.
    pub entries_from_cache: usize,

    /// The cache key namespacing this configuration.
    pub cache_key: String,

    /// True when the instance had already built and the call was a no-op.
    pub already_built: bool,
}

/// Build-pipeline plugin wrapping CommonJS packages as AMD modules.
///
/// One instance represents one immutable logical build of a fixed input
/// set: the first successful `build` does the work, later calls return
/// immediately. A failed pass leaves the instance unbuilt, so the host's
/// next build request retries from scratch. Whether anything actually
/// changed between host-triggered builds is tracked by the cache key, not
/// by instance reuse.
pub struct CjsTransform {
    input_dir: PathBuf,
    project_root: PathBuf,
    options: TransformOptions,
    resolver: PackageResolver,
    fingerprinter: DependencyFingerprinter,
    cache: PersistentCache,
    bundler: Arc<dyn Bundler>,
    concurrency: usize,
    built: bool,
}

impl std::fmt::Debug for CjsTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CjsTransform")
            .field("input_dir", &self.input_dir)
            .field("project_root", &self.project_root)
            .field("options", &self.options)
            .field("resolver", &self.resolver)
            .field("fingerprinter", &self.fingerprinter)
            .field("cache", &self.cache)
            .field("bundler", &"<dyn Bundler>")
            .field("concurrency", &self.concurrency)
            .field("built", &self.built)
            .finish()
    }
}

impl CjsTransform {
    /// Construct an orchestrator over a source snapshot and options map.
    ///
    /// Every declared entry is validated here, synchronously, before any
    /// build work: paths outside the package namespace are usage errors.
    pub fn new(
        input_dir: impl Into<PathBuf>,
        project_root: impl Into<PathBuf>,
        options: TransformOptions,
    ) -> Result<Self> {
        let input_dir = input_dir.into();
        let project_root = project_root.into();

        for entry in options.entries() {
            if !entry.relative_path.starts_with(PACKAGE_NAMESPACE) {
                return Err(AmdifyError::OutsidePackageNamespace {
                    asset: entry.relative_path.clone(),
                });
            }
        }

        let resolver = PackageResolver::new(&project_root).with_snapshot(&input_dir);

        Ok(Self {
            input_dir,
            project_root,
            options,
            resolver,
            fingerprinter: DependencyFingerprinter::new(),
            cache: PersistentCache::new(None)?,
            bundler: Arc::new(WrapBundler),
            concurrency: num_cpus::get().max(2),
            built: false,
        })
    }

    /// Use a specific cache store (hermetic builds, tests).
    pub fn with_cache(mut self, cache: PersistentCache) -> Self {
        self.cache = cache;
        self
    }

    /// Swap the bundler collaborator.
    pub fn with_bundler(mut self, bundler: Arc<dyn Bundler>) -> Self {
        self.bundler = bundler;
        self
    }

    /// Bound the number of entries in flight at once.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn has_built(&self) -> bool {
        self.built
    }

    /// Compute the cache key for the current options against on-disk
    /// dependency state. Resolution failure is a hard error: there is no
    /// usable key without a successful resolve.
    fn cache_key(&self) -> Result<String> {
        let mut fingerprints: BTreeMap<PathBuf, String> = BTreeMap::new();
        for entry in self.options.entries() {
            let root = self.resolver.package_root(&entry.relative_path)?;
            if !fingerprints.contains_key(&root) {
                let digest = self.fingerprinter.fingerprint(&root)?;
                fingerprints.insert(root, digest);
            }
        }
        compute_cache_key(&self.options, &fingerprints)
    }

    /// Run one build pass, writing wrapped modules under `output_dir`,
    /// mirroring each entry's relative path.
    ///
    /// Entries build concurrently and independently; the pass completes only
    /// when every entry has succeeded. On any failure the files written this
    /// pass are removed, the first error is surfaced, and the instance stays
    /// unbuilt.
    pub async fn build(&mut self, output_dir: &Path) -> Result<BuildReport> {
        if self.built {
            debug!("transform already built; skipping");
            return Ok(BuildReport {
                already_built: true,
                ..BuildReport::default()
            });
        }

        if self.options.is_empty() {
            self.built = true;
            return Ok(BuildReport::default());
        }

        let cache_key = self.cache_key()?;
        let namespace = self.cache.namespace(&cache_key);
        namespace.init().await?;

        info!(
            "building {} module(s) into {} (cache namespace {})",
            self.options.len(),
            output_dir.display(),
            &cache_key[..12]
        );

        let outcomes: Vec<Result<EntryOutcome>> = stream::iter(self.options.entries().cloned())
            .map(|entry| {
                let namespace = namespace.clone();
                let resolver = self.resolver.clone();
                let bundler = Arc::clone(&self.bundler);
                let output_dir = output_dir.to_path_buf();
                async move { build_entry(entry, namespace, resolver, bundler, output_dir).await }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = BuildReport {
            cache_key,
            ..BuildReport::default()
        };
        let mut written = Vec::new();
        let mut first_error = None;

        for outcome in outcomes {
            match outcome {
                Ok(outcome) => {
                    if outcome.from_cache {
                        report.entries_from_cache += 1;
                    } else {
                        report.entries_bundled += 1;
                    }
                    written.push(outcome.output_path);
                }
                Err(err) => {
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }

        if let Some(err) = first_error {
            rollback(&written).await;
            return Err(err);
        }

        self.built = true;
        info!(
            "build complete: {} bundled, {} from cache",
            report.entries_bundled, report.entries_from_cache
        );
        Ok(report)
    }
}

struct EntryOutcome {
    output_path: PathBuf,
    from_cache: bool,
}

async fn build_entry(
    entry: TransformEntry,
    namespace: CacheNamespace,
    resolver: PackageResolver,
    bundler: Arc<dyn Bundler>,
    output_dir: PathBuf,
) -> Result<EntryOutcome> {
    let output_path = output_dir.join(&entry.relative_path);

    if let Some(bytes) = namespace.get(&entry.relative_path, &entry.output_name).await {
        write_output(&output_path, &bytes).await?;
        return Ok(EntryOutcome {
            output_path,
            from_cache: true,
        });
    }

    let entry_file = resolver.resolve(&entry.relative_path)?;
    let request = BundleRequest {
        entry_file,
        base_dir: resolver.base_dir().to_path_buf(),
        resolution: ResolutionMode::Browser,
        output: OutputDescriptor {
            module_id: entry.output_name.clone(),
            named_exports: true,
        },
        plugins: BundleRequest::plugin_chain(&entry.extra_plugins),
    };

    let text = bundler.bundle(&request).await?;

    if let Err(err) = namespace
        .set(&entry.relative_path, &entry.output_name, text.as_bytes())
        .await
    {
        warn!(
            "failed to cache {}: {} (entry will be rebundled next time)",
            entry.relative_path, err
        );
    }

    write_output(&output_path, text.as_bytes()).await?;
    Ok(EntryOutcome {
        output_path,
        from_cache: false,
    })
}

async fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, bytes).await?;
    Ok(())
}

/// Remove everything written during a failed pass, so the output tree never
/// mixes fresh and stale state.
async fn rollback(written: &[PathBuf]) {
    for path in written {
        if let Err(err) = fs::remove_file(path).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!("rollback: could not remove {}: {}", path.display(), err);
            }
        }
    }
}
