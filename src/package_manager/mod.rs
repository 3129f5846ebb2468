//! Package manager detection
//!
//! Decides which package manager governs a project: lockfiles first, then
//! whichever known command answers `--version`. Results are cached per
//! directory for the life of the detector, which is one process invocation.

mod probe;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use semver::Version;
use thiserror::Error;
use tracing::debug;

use crate::utils::is_file;

pub use probe::{parse_version, CommandProbe, SystemProbe};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageManager {
    Yarn,
    Npm,
    Pnpm,
}

impl PackageManager {
    /// Executable name
    pub fn command(self) -> &'static str {
        match self {
            PackageManager::Yarn => "yarn",
            PackageManager::Npm => "npm",
            PackageManager::Pnpm => "pnpm",
        }
    }

    pub fn lockfile(self) -> &'static str {
        match self {
            PackageManager::Yarn => "yarn.lock",
            PackageManager::Npm => "package-lock.json",
            PackageManager::Pnpm => "pnpm-lock.yaml",
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("unable to detect package manager for {}", dir.display())]
    NotDetected { dir: PathBuf },
}

/// Where a lockfile is looked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Search {
    /// The directory and every parent up to the filesystem root
    Ancestors,
    /// The directory only
    Here,
}

/// Lockfile checks in priority order
const LOCKFILE_CANDIDATES: [(PackageManager, Search); 3] = [
    (PackageManager::Yarn, Search::Ancestors),
    (PackageManager::Npm, Search::Here),
    (PackageManager::Pnpm, Search::Here),
];

/// Global commands in probe order
const GLOBAL_CANDIDATES: [PackageManager; 3] =
    [PackageManager::Yarn, PackageManager::Npm, PackageManager::Pnpm];

/// Package manager detector with a per-directory result cache
pub struct PackageManagerDetector {
    probe: Arc<dyn CommandProbe>,
    cache: DashMap<PathBuf, PackageManager>,
}

impl PackageManagerDetector {
    /// Detector probing the real system
    pub fn new() -> Self {
        Self::with_probe(Arc::new(SystemProbe))
    }

    pub fn with_probe(probe: Arc<dyn CommandProbe>) -> Self {
        Self {
            probe,
            cache: DashMap::new(),
        }
    }

    /// Identify the package manager for `dir`
    pub async fn identify(&self, dir: &Path) -> Result<PackageManager, DetectError> {
        if let Some(cached) = self.cache.get(dir) {
            return Ok(*cached);
        }

        let manager = match self.from_lockfiles(dir).await {
            Some(manager) => manager,
            None => {
                debug!("No lockfile found, trying globals");
                self.from_globals().await.ok_or_else(|| DetectError::NotDetected {
                    dir: dir.to_path_buf(),
                })?
            }
        };

        debug!("Detected {} for {}", manager, dir.display());
        self.cache.insert(dir.to_path_buf(), manager);
        Ok(manager)
    }

    /// Version reported by `<command> --version`, if it answers cleanly
    pub async fn version_of(&self, manager: PackageManager) -> Option<Version> {
        let output = self.probe.probe(manager.command()).await?;
        parse_version(&output)
    }

    /// Whether the installed version is at least `minimum`
    pub async fn verify_version(&self, manager: PackageManager, minimum: &Version) -> bool {
        match self.version_of(manager).await {
            Some(version) => version >= *minimum,
            None => false,
        }
    }

    async fn from_lockfiles(&self, dir: &Path) -> Option<PackageManager> {
        let [yarn, npm, pnpm] = LOCKFILE_CANDIDATES;
        let found = tokio::join!(
            has_lockfile(dir, yarn),
            has_lockfile(dir, npm),
            has_lockfile(dir, pnpm),
        );

        [(yarn.0, found.0), (npm.0, found.1), (pnpm.0, found.2)]
            .into_iter()
            .find_map(|(manager, found)| found.then_some(manager))
    }

    async fn from_globals(&self) -> Option<PackageManager> {
        for manager in GLOBAL_CANDIDATES {
            if self.probe.probe(manager.command()).await.is_some() {
                return Some(manager);
            }
        }
        None
    }
}

impl Default for PackageManagerDetector {
    fn default() -> Self {
        Self::new()
    }
}

async fn has_lockfile(dir: &Path, (manager, search): (PackageManager, Search)) -> bool {
    match search {
        Search::Here => is_file(&dir.join(manager.lockfile())).await,
        Search::Ancestors => {
            let start = tokio::fs::canonicalize(dir)
                .await
                .unwrap_or_else(|_| dir.to_path_buf());
            for ancestor in start.ancestors() {
                if is_file(&ancestor.join(manager.lockfile())).await {
                    return true;
                }
            }
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    /// Answers from a fixed table and counts calls
    #[derive(Default)]
    struct FakeProbe {
        answers: HashMap<&'static str, &'static str>,
        calls: AtomicUsize,
    }

    impl FakeProbe {
        fn answering(answers: &[(&'static str, &'static str)]) -> Arc<Self> {
            Arc::new(Self {
                answers: answers.iter().copied().collect(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CommandProbe for FakeProbe {
        async fn probe(&self, command: &str) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answers.get(command).map(|answer| answer.to_string())
        }
    }

    #[tokio::test]
    async fn test_yarn_lockfile_in_ancestor() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("yarn.lock"), "").unwrap();
        let nested = root.path().join("packages/web/src");
        fs::create_dir_all(&nested).unwrap();

        let detector = PackageManagerDetector::with_probe(FakeProbe::answering(&[]));
        assert_eq!(detector.identify(&nested).await.unwrap(), PackageManager::Yarn);
    }

    #[tokio::test]
    async fn test_yarn_wins_over_other_lockfiles() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("yarn.lock"), "").unwrap();
        fs::write(root.path().join("package-lock.json"), "{}").unwrap();
        fs::write(root.path().join("pnpm-lock.yaml"), "").unwrap();

        let detector = PackageManagerDetector::with_probe(FakeProbe::answering(&[]));
        assert_eq!(detector.identify(root.path()).await.unwrap(), PackageManager::Yarn);
    }

    #[tokio::test]
    async fn test_npm_before_pnpm_in_directory() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("package-lock.json"), "{}").unwrap();
        fs::write(root.path().join("pnpm-lock.yaml"), "").unwrap();

        let detector = PackageManagerDetector::with_probe(FakeProbe::answering(&[]));
        assert_eq!(detector.identify(root.path()).await.unwrap(), PackageManager::Npm);
    }

    #[tokio::test]
    async fn test_secondary_lockfiles_are_not_searched_upward() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("pnpm-lock.yaml"), "").unwrap();
        let nested = root.path().join("app");
        fs::create_dir_all(&nested).unwrap();

        let probe = FakeProbe::answering(&[("npm", "10.2.4")]);
        let detector = PackageManagerDetector::with_probe(probe);
        assert_eq!(detector.identify(&nested).await.unwrap(), PackageManager::Npm);
    }

    #[tokio::test]
    async fn test_global_probe_order() {
        let root = tempfile::tempdir().unwrap();
        let probe = FakeProbe::answering(&[("npm", "10.2.4"), ("pnpm", "8.15.0")]);
        let detector = PackageManagerDetector::with_probe(probe);
        assert_eq!(detector.identify(root.path()).await.unwrap(), PackageManager::Npm);
    }

    #[tokio::test]
    async fn test_nothing_detected() {
        let root = tempfile::tempdir().unwrap();
        let detector = PackageManagerDetector::with_probe(FakeProbe::answering(&[]));

        let err = detector.identify(root.path()).await.unwrap_err();
        assert!(matches!(err, DetectError::NotDetected { .. }));
    }

    #[tokio::test]
    async fn test_cache_survives_filesystem_changes() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("package-lock.json"), "{}").unwrap();

        let probe = FakeProbe::answering(&[("pnpm", "8.15.0")]);
        let detector = PackageManagerDetector::with_probe(probe.clone());
        assert_eq!(detector.identify(root.path()).await.unwrap(), PackageManager::Npm);

        fs::remove_file(root.path().join("package-lock.json")).unwrap();
        fs::write(root.path().join("yarn.lock"), "").unwrap();

        assert_eq!(detector.identify(root.path()).await.unwrap(), PackageManager::Npm);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_global_result_is_cached() {
        let root = tempfile::tempdir().unwrap();
        let probe = FakeProbe::answering(&[("yarn", "1.22.19")]);
        let detector = PackageManagerDetector::with_probe(probe.clone());

        detector.identify(root.path()).await.unwrap();
        detector.identify(root.path()).await.unwrap();
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_verify_version() {
        let minimum = Version::new(2, 0, 0);

        let berry = PackageManagerDetector::with_probe(FakeProbe::answering(&[("yarn", "3.6.1")]));
        assert!(berry.verify_version(PackageManager::Yarn, &minimum).await);

        let classic = PackageManagerDetector::with_probe(FakeProbe::answering(&[("yarn", "1.22.19")]));
        assert!(!classic.verify_version(PackageManager::Yarn, &minimum).await);

        let missing = PackageManagerDetector::with_probe(FakeProbe::answering(&[]));
        assert!(!missing.verify_version(PackageManager::Yarn, &minimum).await);
    }
}
