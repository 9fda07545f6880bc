//! Configuration provider with once-only lazy initialization

use crossbeam::channel::{self, RecvTimeoutError};
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{
    ConfigError, ConfigurationSet, Result, CARBON_HOME_ENV, CONFIG_DIR_SEGMENTS,
    CONFIG_FILE_NAME, DEFAULT_MAX_FILE_BYTES, DEFAULT_READ_TIMEOUT_MS,
};

/// Process-wide provider backing `ConfigurationProvider::instance()`
static GLOBAL: Lazy<LazyProvider> =
    Lazy::new(|| LazyProvider::new(ConfigurationProvider::deployment_root));

/// Paths with a reader thread still running
static READS_IN_FLIGHT: Lazy<Mutex<HashSet<PathBuf>>> = Lazy::new(Default::default);

/// Bounds applied to the one-time file read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Maximum time to wait for the read to finish.
    ///
    /// A reader that times out keeps running in the background. While it is
    /// outstanding, further loads of the same path fail with
    /// `ConfigurationTimeout` without starting another reader.
    pub read_timeout: Duration,
    /// Maximum file size accepted
    pub max_file_bytes: u64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

/// Adapter configuration loaded from the deployment's properties file
#[derive(Debug)]
pub struct ConfigurationProvider {
    path: PathBuf,
    configuration: ConfigurationSet,
}

impl ConfigurationProvider {
    /// Shared provider, loading the file on first call.
    ///
    /// Concurrent first callers wait on a single load and all receive the
    /// same instance. A failed load is returned to the caller and not
    /// remembered, so the next call tries again.
    pub fn instance() -> Result<Arc<ConfigurationProvider>> {
        GLOBAL.get()
    }

    /// Deployment root from `CARBON_HOME`; empty when unset
    pub fn deployment_root() -> PathBuf {
        match std::env::var_os(CARBON_HOME_ENV) {
            Some(root) => PathBuf::from(root),
            None => {
                warn!(
                    "{} is not set, resolving configuration relative to the working directory",
                    CARBON_HOME_ENV
                );
                PathBuf::new()
            }
        }
    }

    /// `<root>/repository/conf/identity/identity-outbound-adapter.properties`
    pub fn resolve_path(root: impl AsRef<Path>) -> PathBuf {
        let mut path = root.as_ref().to_path_buf();
        path.extend(CONFIG_DIR_SEGMENTS);
        path.push(CONFIG_FILE_NAME);
        path
    }

    /// Load from the properties file below `root`
    pub fn load(root: impl AsRef<Path>) -> Result<Self> {
        Self::from_path_with(Self::resolve_path(root), LoadOptions::default())
    }

    /// Load from an explicit file path
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        Self::from_path_with(path, LoadOptions::default())
    }

    /// Load from an explicit file path with custom read bounds
    pub fn from_path_with(path: impl Into<PathBuf>, options: LoadOptions) -> Result<Self> {
        let path = path.into();

        // Only a confirmed absence is "missing"; other stat failures are unreadable
        match path.try_exists() {
            Ok(true) => {}
            Ok(false) => {
                return Err(ConfigError::ConfigurationMissing {
                    file_name: CONFIG_FILE_NAME.to_string(),
                    path,
                })
            }
            Err(source) => return Err(ConfigError::ConfigurationUnreadable { source }),
        }

        let text = read_bounded(&path, options)?;
        let configuration = ConfigurationSet::parse(&text).map_err(io::Error::from)?;

        info!(
            "Loaded {} adapter properties from {}",
            configuration.len(),
            path.display()
        );

        Ok(Self {
            path,
            configuration,
        })
    }

    /// Trimmed value for `name`; `None` when absent or blank
    pub fn get_property(&self, name: &str) -> Option<&str> {
        self.configuration.get(name)
    }

    /// Underlying snapshot
    pub fn configuration(&self) -> &ConfigurationSet {
        &self.configuration
    }

    /// File the snapshot was read from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Once-only cell for a `ConfigurationProvider`.
///
/// The deployment root is resolved when the load actually runs, not when
/// the cell is created.
pub struct LazyProvider {
    cell: OnceCell<Arc<ConfigurationProvider>>,
    root: Box<dyn Fn() -> PathBuf + Send + Sync>,
    options: LoadOptions,
    attempts: AtomicUsize,
}

impl LazyProvider {
    /// Cell resolving its root through `root` with default read bounds
    pub fn new(root: impl Fn() -> PathBuf + Send + Sync + 'static) -> Self {
        Self::with_options(root, LoadOptions::default())
    }

    /// Cell with explicit read bounds
    pub fn with_options(
        root: impl Fn() -> PathBuf + Send + Sync + 'static,
        options: LoadOptions,
    ) -> Self {
        Self {
            cell: OnceCell::new(),
            root: Box::new(root),
            options,
            attempts: AtomicUsize::new(0),
        }
    }

    /// Provider, loading it if no load has succeeded yet
    pub fn get(&self) -> Result<Arc<ConfigurationProvider>> {
        self.cell
            .get_or_try_init(|| {
                let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
                let path = ConfigurationProvider::resolve_path((self.root)());
                debug!(
                    "Loading adapter configuration (attempt {}) from {}",
                    attempt,
                    path.display()
                );

                ConfigurationProvider::from_path_with(path, self.options)
                    .map(Arc::new)
                    .map_err(|e| {
                        warn!("Adapter configuration load failed: {}", e);
                        e
                    })
            })
            .map(Arc::clone)
    }

    /// Provider if a load already succeeded
    pub fn get_if_loaded(&self) -> Option<Arc<ConfigurationProvider>> {
        self.cell.get().cloned()
    }

    /// Number of loads started so far, failed ones included
    pub fn load_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for LazyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyProvider")
            .field("loaded", &self.cell.get().is_some())
            .field("options", &self.options)
            .field("attempts", &self.load_attempts())
            .finish()
    }
}

/// Read the file on a helper thread, giving up after `read_timeout`.
fn read_bounded(path: &Path, options: LoadOptions) -> Result<String> {
    let timed_out = || ConfigError::ConfigurationTimeout {
        path: path.to_path_buf(),
        timeout_ms: options.read_timeout.as_millis() as u64,
    };

    if !READS_IN_FLIGHT.lock().insert(path.to_path_buf()) {
        warn!(
            "Earlier read of {} has not finished, not starting another",
            path.display()
        );
        return Err(timed_out());
    }

    let (tx, rx) = channel::bounded(1);
    let owned = path.to_path_buf();
    let limit = options.max_file_bytes;

    let spawned = std::thread::Builder::new()
        .name("adapter-config-read".to_string())
        .spawn(move || {
            let result = read_capped(&owned, limit);
            READS_IN_FLIGHT.lock().remove(&owned);
            // Receiver may already have timed out
            let _ = tx.send(result);
        });
    if let Err(e) = spawned {
        READS_IN_FLIGHT.lock().remove(path);
        return Err(e.into());
    }

    match rx.recv_timeout(options.read_timeout) {
        Ok(result) => result.map_err(ConfigError::from),
        Err(RecvTimeoutError::Timeout) => Err(timed_out()),
        Err(RecvTimeoutError::Disconnected) => Err(io::Error::new(
            io::ErrorKind::Other,
            "configuration reader exited without a result",
        )
        .into()),
    }
}

fn read_capped(path: &Path, limit: u64) -> io::Result<String> {
    let mut bytes = Vec::new();
    File::open(path)?.take(limit + 1).read_to_end(&mut bytes)?;

    if bytes.len() as u64 > limit {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("configuration file exceeds {} bytes", limit),
        ));
    }

    // Latin-1 fallback for files that are not valid UTF-8
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn deployment(contents: &str) -> TempDir {
        let root = TempDir::new().unwrap();
        let path = ConfigurationProvider::resolve_path(root.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        root
    }

    #[test]
    fn test_resolve_path() {
        let path = ConfigurationProvider::resolve_path("/opt/is");
        assert_eq!(
            path,
            PathBuf::from("/opt/is/repository/conf/identity/identity-outbound-adapter.properties")
        );
    }

    #[test]
    fn test_load_and_lookup() {
        let root = deployment("hub.endpoint=https://hub.example.org\nhub.secret=   \n");
        let provider = ConfigurationProvider::load(root.path()).unwrap();

        assert_eq!(provider.get_property("hub.endpoint"), Some("https://hub.example.org"));
        assert_eq!(provider.get_property("hub.secret"), None);
        assert_eq!(provider.get_property("hub.missing"), None);
        assert!(provider.path().ends_with(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_missing_file() {
        let root = TempDir::new().unwrap();
        let err = ConfigurationProvider::load(root.path()).unwrap_err();

        assert!(err.is_missing());
        assert_eq!(
            err.to_string(),
            "identity-outbound-adapter.properties configuration file doesn't exist."
        );
    }

    #[test]
    fn test_malformed_file_is_unreadable() {
        let root = deployment("bad=\\uZZZZ\n");
        let err = ConfigurationProvider::load(root.path()).unwrap_err();

        match err {
            ConfigError::ConfigurationUnreadable { source } => {
                assert_eq!(source.kind(), io::ErrorKind::InvalidData);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_directory_is_unreadable() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(ConfigurationProvider::resolve_path(root.path())).unwrap();

        let err = ConfigurationProvider::load(root.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigurationUnreadable { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_unresolvable_path_is_unreadable() {
        let root = TempDir::new().unwrap();
        let path = ConfigurationProvider::resolve_path(root.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::os::unix::fs::symlink(&path, &path).unwrap();

        let err = ConfigurationProvider::from_path(path).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigurationUnreadable { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_read_timeout() {
        let root = TempDir::new().unwrap();
        let path = ConfigurationProvider::resolve_path(root.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let status = std::process::Command::new("mkfifo").arg(&path).status().unwrap();
        assert!(status.success());

        let options = LoadOptions {
            read_timeout: Duration::from_millis(100),
            ..LoadOptions::default()
        };

        // No writer, so the reader blocks opening the pipe
        let err = ConfigurationProvider::from_path_with(path.clone(), options).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigurationTimeout { timeout_ms: 100, .. }));
        assert!(READS_IN_FLIGHT.lock().contains(&path));

        // Retry while the first reader is still stuck does not start another
        let err = ConfigurationProvider::from_path_with(path.clone(), options).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigurationTimeout { .. }));

        // Unblock the reader; it sees EOF and clears its entry
        drop(fs::OpenOptions::new().write(true).open(&path).unwrap());
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while READS_IN_FLIGHT.lock().contains(&path) {
            assert!(std::time::Instant::now() < deadline, "reader never finished");
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_size_limit() {
        let root = deployment("key=0123456789\n");
        let options = LoadOptions {
            max_file_bytes: 4,
            ..LoadOptions::default()
        };

        let path = ConfigurationProvider::resolve_path(root.path());
        let err = ConfigurationProvider::from_path_with(path, options).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigurationUnreadable { .. }));
    }

    #[test]
    fn test_latin1_fallback() {
        let root = TempDir::new().unwrap();
        let path = ConfigurationProvider::resolve_path(root.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"name=caf\xe9\n").unwrap();

        let provider = ConfigurationProvider::from_path(path.clone()).unwrap();
        assert_eq!(provider.get_property("name"), Some("café"));
    }

    #[test]
    fn test_lazy_provider_caches_instance() {
        let root = deployment("a=1\n");
        let dir = root.path().to_path_buf();
        let lazy = LazyProvider::new(move || dir.clone());

        let first = lazy.get().unwrap();
        let second = lazy.get().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(lazy.load_attempts(), 1);
    }

    #[test]
    fn test_lazy_provider_retries_after_failure() {
        let root = TempDir::new().unwrap();
        let dir = root.path().to_path_buf();
        let lazy = LazyProvider::new(move || dir.clone());

        assert!(lazy.get().unwrap_err().is_missing());
        assert!(lazy.get_if_loaded().is_none());

        let path = ConfigurationProvider::resolve_path(root.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "a=1\n").unwrap();

        let provider = lazy.get().unwrap();
        assert_eq!(provider.get_property("a"), Some("1"));
        assert_eq!(lazy.load_attempts(), 2);
    }
}
