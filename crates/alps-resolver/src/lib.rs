#![forbid(unsafe_code)]

//! Reference resolution for ALPS profiles.
//!
//! A [`ResolveSession`] owns the external-document cache for one conversion
//! session. Resolution first loads every distinct external location the tree
//! mentions, concurrently, then builds the resolved tree in one synchronous
//! depth-first pass. Failed loads degrade the affected references to
//! "unresolved" and never abort sibling branches.

mod cache;
mod loader;
mod tree;

pub use cache::{ExternalCache, LoadOutcome};
pub use loader::{DocumentLoader, LoadError, SourceLoader, is_remote, locate};

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use alps_core::{AlpsDocument, ResolvedDocument, split_reference};
use futures::future::join_all;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use tracing::{debug, info};

use crate::tree::TreeBuilder;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Anchor for relative file references. `None` uses the working directory.
    pub base_dir: Option<PathBuf>,
    pub fetch_timeout: Duration,
    pub allow_remote: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            allow_remote: true,
        }
    }
}

impl ResolverConfig {
    /// The fetch timeout, never zero.
    #[must_use]
    pub fn effective_timeout(&self) -> Duration {
        if self.fetch_timeout.is_zero() {
            DEFAULT_FETCH_TIMEOUT
        } else {
            self.fetch_timeout
        }
    }
}

/// Counters accumulated over a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolveReport {
    /// Distinct external locations loaded successfully.
    pub loaded: usize,
    /// Distinct external locations that failed to load.
    pub failed: usize,
    /// Descriptors left unresolved.
    pub unresolved: usize,
}

pub struct ResolveSession<L = SourceLoader> {
    loader: L,
    config: ResolverConfig,
    cache: ExternalCache,
    report: Mutex<ResolveReport>,
}

impl ResolveSession<SourceLoader> {
    pub fn new(config: ResolverConfig) -> Result<Self, LoadError> {
        let loader = SourceLoader::new(&config)?;
        Ok(Self::with_loader(loader, config))
    }
}

impl<L: DocumentLoader> ResolveSession<L> {
    #[must_use]
    pub fn with_loader(loader: L, config: ResolverConfig) -> Self {
        Self {
            loader,
            config,
            cache: ExternalCache::new(),
            report: Mutex::new(ResolveReport::default()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    #[must_use]
    pub fn report(&self) -> ResolveReport {
        *self.report.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve every reference in `document`.
    pub async fn resolve<'a>(&self, document: &'a AlpsDocument) -> ResolvedDocument<'a> {
        let locations = external_locations(document, self.config.base_dir.as_deref());
        if !locations.is_empty() {
            debug!(count = locations.len(), "loading external profiles");
        }

        let outcomes = join_all(
            locations
                .iter()
                .map(|location| self.load_external(location)),
        )
        .await;

        let mut loaded = 0;
        let mut failed = 0;
        let mut externals = FxHashMap::default();
        for (location, outcome) in locations.into_iter().zip(outcomes) {
            if outcome.is_ok() {
                loaded += 1;
            } else {
                failed += 1;
            }
            externals.insert(location, outcome);
        }

        let resolved =
            TreeBuilder::new(document, Some(&externals), self.config.base_dir.as_deref())
                .build(document);
        let unresolved = resolved.unresolved_count();
        info!(loaded, failed, unresolved, "resolved profile references");

        let mut report = self.report.lock().unwrap_or_else(PoisonError::into_inner);
        report.loaded += loaded;
        report.failed += failed;
        report.unresolved += unresolved;
        resolved
    }

    /// Load one external location through the session cache, bounded by the
    /// configured timeout. Concurrent calls for the same location share a
    /// single load.
    pub async fn load_external(&self, location: &str) -> LoadOutcome {
        let timeout = self.config.effective_timeout();
        self.cache
            .get_or_load(location, || async {
                match tokio::time::timeout(timeout, self.loader.load(location)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(LoadError::timeout(location, timeout)),
                }
            })
            .await
    }
}

/// Resolve without any I/O. External references stay unresolved.
#[must_use]
pub fn resolve_local(document: &AlpsDocument) -> ResolvedDocument<'_> {
    TreeBuilder::new(document, None, None).build(document)
}

/// Distinct external locations in first-mention order.
fn external_locations(document: &AlpsDocument, base_dir: Option<&std::path::Path>) -> Vec<String> {
    let mut seen = FxHashSet::default();
    let mut locations = Vec::new();
    document.walk(|descriptor| {
        let Some(href) = descriptor.href.as_deref() else {
            return;
        };
        if descriptor.id.is_some() || href.starts_with('#') {
            return;
        }
        let (path, _) = split_reference(href);
        if path.is_empty() {
            return;
        }
        let location = locate(base_dir, path);
        if seen.insert(location.clone()) {
            locations.push(location);
        }
    });
    locations
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use alps_core::{AlpsDocument, Descriptor};
    use async_trait::async_trait;
    use futures::future::join_all;

    use super::{
        DocumentLoader, LoadError, ResolveReport, ResolveSession, ResolverConfig, resolve_local,
    };

    /// In-memory loader that counts how often each load actually runs.
    struct CountingLoader {
        loads: Arc<AtomicUsize>,
        delay: Duration,
    }

    #[async_trait]
    impl DocumentLoader for CountingLoader {
        async fn load(&self, location: &str) -> Result<AlpsDocument, LoadError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if location.ends_with("missing.json") {
                return Err(LoadError::NotFound {
                    location: location.to_string(),
                });
            }
            let mut go_blog = Descriptor::with_id("goBlog");
            go_blog.kind = Some("safe".to_string());
            go_blog.rt = Some("#Blog".to_string());
            Ok(AlpsDocument::new(vec![go_blog, Descriptor::with_id("Blog")]))
        }
    }

    fn session(delay: Duration) -> (ResolveSession<CountingLoader>, Arc<AtomicUsize>) {
        let loads = Arc::new(AtomicUsize::new(0));
        let loader = CountingLoader {
            loads: Arc::clone(&loads),
            delay,
        };
        (
            ResolveSession::with_loader(loader, ResolverConfig::default()),
            loads,
        )
    }

    fn profile_with_externals() -> AlpsDocument {
        let mut home = Descriptor::with_id("Home");
        home.descriptor.push(Descriptor::with_href("common.json#goBlog"));
        let mut about = Descriptor::with_id("About");
        about.descriptor.push(Descriptor::with_href("common.json#goBlog"));
        about.descriptor.push(Descriptor::with_href("missing.json#x"));
        AlpsDocument::new(vec![home, about, Descriptor::with_href("#Home")])
    }

    #[tokio::test]
    async fn concurrent_identical_loads_collapse() {
        let (session, loads) = session(Duration::from_millis(20));
        let outcomes = join_all((0..10).map(|_| session.load_external("common.json"))).await;

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(outcomes.iter().all(Result::is_ok));
    }

    #[tokio::test]
    async fn failed_external_does_not_abort_siblings() {
        let (session, loads) = session(Duration::ZERO);
        let document = profile_with_externals();
        let resolved = session.resolve(&document).await;

        // one load per distinct location
        assert_eq!(loads.load(Ordering::SeqCst), 2);

        let home_ref = &resolved.descriptors[0].descriptor[0];
        assert!(home_ref.is_resolved);
        assert_eq!(home_ref.resolved_id, "goBlog");
        assert_eq!(home_ref.rt.as_deref(), Some("#Blog"));

        let about = &resolved.descriptors[1];
        assert!(about.descriptor[0].is_resolved);
        assert!(!about.descriptor[1].is_resolved);
        assert!(resolved.descriptors[2].is_resolved);

        assert_eq!(
            session.report(),
            ResolveReport {
                loaded: 1,
                failed: 1,
                unresolved: 1,
            }
        );
    }

    #[tokio::test]
    async fn cache_is_reused_within_a_session() {
        let (session, loads) = session(Duration::ZERO);
        let document = profile_with_externals();
        let _ = session.resolve(&document).await;
        let _ = session.resolve(&document).await;
        assert_eq!(loads.load(Ordering::SeqCst), 2);
        assert_eq!(session.report().loaded, 2);
    }

    #[tokio::test]
    async fn slow_loads_time_out() {
        let loads = Arc::new(AtomicUsize::new(0));
        let loader = CountingLoader {
            loads,
            delay: Duration::from_secs(5),
        };
        let config = ResolverConfig {
            fetch_timeout: Duration::from_millis(10),
            ..ResolverConfig::default()
        };
        let session = ResolveSession::with_loader(loader, config);
        let outcome = session.load_external("common.json").await;
        assert!(matches!(outcome, Err(LoadError::Timeout { .. })));
    }

    #[tokio::test]
    async fn resolves_relative_files_against_base_dir() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut file = std::fs::File::create(dir.path().join("common.json")).expect("create");
        write!(
            file,
            r##"{{"alps": {{"descriptor": [{{"id": "goHome", "type": "safe", "rt": "#Home"}}]}}}}"##
        )
        .expect("write");

        let config = ResolverConfig {
            base_dir: Some(dir.path().to_path_buf()),
            ..ResolverConfig::default()
        };
        let session = ResolveSession::new(config).expect("session");
        let document = AlpsDocument::new(vec![Descriptor::with_href("common.json#goHome")]);
        let resolved = session.resolve(&document).await;

        assert!(resolved.descriptors[0].is_resolved);
        assert_eq!(resolved.descriptors[0].kind.as_deref(), Some("safe"));
        assert_eq!(session.report().loaded, 1);
    }

    #[test]
    fn local_resolution_never_loads() {
        let document = profile_with_externals();
        let resolved = resolve_local(&document);
        assert_eq!(resolved.unresolved_count(), 3);
        assert!(resolved.descriptors[2].is_resolved);
    }

    #[test]
    fn zero_timeout_falls_back_to_default() {
        let config = ResolverConfig {
            fetch_timeout: Duration::ZERO,
            ..ResolverConfig::default()
        };
        assert_eq!(config.effective_timeout(), super::DEFAULT_FETCH_TIMEOUT);
    }
}
