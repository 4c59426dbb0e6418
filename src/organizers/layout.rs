use crate::config::types::SessionConfig;
use crate::core::errors::AetherError;
use crate::core::models::Target;
use crate::core::profile::ScanProfile;
use crate::core::state::Session;
use regex::Regex;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU32, Ordering};

static UNSAFE_CHARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_-]").expect("sanitize pattern is valid"));

/// Upper bound on probing; only reachable if something is badly wrong with
/// the base directory.
const MAX_SESSION_ID: u32 = 100_000;

/// Hands out `<prefix>_<n>` session directories under a base directory.
pub struct WorkspaceAllocator {
    base_dir: PathBuf,
    prefix: String,
    last_claimed: AtomicU32,
}

impl WorkspaceAllocator {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            base_dir: config.base_dir.clone(),
            prefix: config.prefix.clone(),
            last_claimed: AtomicU32::new(0),
        }
    }

    /// Claims the lowest free identifier above anything this allocator
    /// already handed out. `create_dir` is the claim: a directory that
    /// appears under us (another run) just moves the probe along.
    pub fn allocate(&self, target: &Target, profile: ScanProfile) -> Result<Session, AetherError> {
        let stem = self.prefix.replace("{host}", &sanitize_host(&target.host));

        fs::create_dir_all(&self.base_dir).map_err(|e| AetherError::workspace(&self.base_dir, e))?;

        let mut id = self.last_claimed.load(Ordering::SeqCst).saturating_add(1).max(1);
        loop {
            if id > MAX_SESSION_ID {
                return Err(AetherError::workspace(
                    &self.base_dir,
                    std::io::Error::other(format!("no free session identifier for {}", stem)),
                ));
            }

            let root = self.base_dir.join(format!("{}_{}", stem, id));
            match fs::create_dir(&root) {
                Ok(()) => {
                    self.last_claimed.fetch_max(id, Ordering::SeqCst);
                    return populate(Session::new(id, root, target.clone(), profile));
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!("Session directory {:?} taken, probing next", root);
                    id += 1;
                }
                Err(e) => return Err(AetherError::workspace(root, e)),
            }
        }
    }
}

/// Lays out a freshly claimed root. On failure the root is removed again so
/// no empty session is left behind.
fn populate(session: Session) -> Result<Session, AetherError> {
    if let Err(e) = fs::create_dir(&session.raw_logs) {
        if let Err(cleanup) = fs::remove_dir_all(&session.root) {
            tracing::warn!("Failed to remove {:?}: {}", session.root, cleanup);
        }
        return Err(AetherError::workspace(&session.raw_logs, e));
    }
    sync_dir(&session.root);

    tracing::info!("Allocated session directory {:?}", session.root);
    Ok(session)
}

fn sanitize_host(host: &str) -> String {
    UNSAFE_CHARS_RE.replace_all(host, "_").into_owned()
}

// Durability of the new entry; best effort.
fn sync_dir(dir: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        if let Ok(handle) = fs::OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_DIRECTORY)
            .open(dir)
        {
            let _ = handle.sync_all();
        }
    }
    #[cfg(not(unix))]
    let _ = dir;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::RAW_LOGS_DIR;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn allocator(base: &Path) -> WorkspaceAllocator {
        WorkspaceAllocator::new(&SessionConfig {
            base_dir: base.to_path_buf(),
            prefix: "Aether_{host}".to_string(),
        })
    }

    fn target() -> Target {
        Target::parse("http://scan.example.com:8080/").unwrap()
    }

    #[test]
    fn test_sequential_allocations_are_distinct_and_monotonic() {
        let tmp = TempDir::new().unwrap();
        let alloc = allocator(tmp.path());

        let ids: Vec<u32> = (0..4)
            .map(|_| alloc.allocate(&target(), ScanProfile::Standard).unwrap().id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);

        for id in ids {
            let dir = tmp.path().join(format!("Aether_scan_example_com_{}", id));
            assert!(dir.join(RAW_LOGS_DIR).is_dir());
        }
    }

    #[test]
    fn test_existing_directories_are_skipped() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("Aether_scan_example_com_1")).unwrap();
        fs::create_dir(tmp.path().join("Aether_scan_example_com_2")).unwrap();

        let session = allocator(tmp.path()).allocate(&target(), ScanProfile::Stealth).unwrap();
        assert_eq!(session.id, 3);
    }

    #[test]
    fn test_lowest_gap_is_used_first() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("Aether_scan_example_com_2")).unwrap();

        let alloc = allocator(tmp.path());
        assert_eq!(alloc.allocate(&target(), ScanProfile::Standard).unwrap().id, 1);
        assert_eq!(alloc.allocate(&target(), ScanProfile::Standard).unwrap().id, 3);
    }

    #[test]
    fn test_claimed_identifier_not_reused_after_removal() {
        let tmp = TempDir::new().unwrap();
        let alloc = allocator(tmp.path());

        let first = alloc.allocate(&target(), ScanProfile::Standard).unwrap();
        first.discard().unwrap();

        assert_eq!(alloc.allocate(&target(), ScanProfile::Standard).unwrap().id, 2);
    }

    #[test]
    fn test_concurrent_allocators_never_collide() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().to_path_buf();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let base = base.clone();
                std::thread::spawn(move || allocator(&base).allocate(&target(), ScanProfile::Standard).unwrap().id)
            })
            .collect();

        let mut ids: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=8).collect::<Vec<u32>>());
    }

    #[test]
    fn test_host_is_sanitized_for_directory_names() {
        assert_eq!(sanitize_host("10.0.0.1"), "10_0_0_1");
        assert_eq!(sanitize_host("my-host.lan"), "my-host_lan");
    }

    #[test]
    fn test_failed_layout_releases_claim() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("Aether_scan_example_com_1");
        fs::create_dir(&root).unwrap();
        fs::write(root.join(RAW_LOGS_DIR), "not a directory").unwrap();

        let err = populate(Session::new(1, root.clone(), target(), ScanProfile::Standard)).unwrap_err();
        assert!(matches!(err, AetherError::Workspace { .. }));
        assert!(!root.exists());
    }

    #[test]
    fn test_io_failure_is_workspace_error() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("not_a_dir");
        fs::write(&blocker, "x").unwrap();

        let err = allocator(&blocker).allocate(&target(), ScanProfile::Standard).unwrap_err();
        assert!(matches!(err, AetherError::Workspace { .. }));
    }
}
