use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime};

/// The file-system facts change detection depends on.
pub trait BuildFs: Send + Sync {
    /// Modification time, or `None` when the path cannot be stat'd.
    fn modified(&self, path: &Path) -> Option<SystemTime>;

    /// Whole file as UTF-8, or `None` when it cannot be read.
    fn read_to_string(&self, path: &Path) -> Option<String>;
}

/// The real file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl BuildFs for LocalFs {
    fn modified(&self, path: &Path) -> Option<SystemTime> {
        std::fs::metadata(path).and_then(|m| m.modified()).ok()
    }

    fn read_to_string(&self, path: &Path) -> Option<String> {
        std::fs::read_to_string(path).ok()
    }
}

#[derive(Debug, Clone)]
struct MemoryFile {
    modified: SystemTime,
    contents: String,
}

/// In-memory file system with a manual clock, for deterministic tests and
/// dry runs.
#[derive(Debug, Default)]
pub struct MemoryFs {
    files: Mutex<HashMap<PathBuf, MemoryFile>>,
    clock: Mutex<u64>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    fn tick(&self) -> SystemTime {
        let mut clock = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
        *clock += 1;
        SystemTime::UNIX_EPOCH + Duration::from_secs(*clock)
    }

    /// Creates or overwrites `path`, stamping it with the next clock tick.
    pub fn write(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        let modified = self.tick();
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                path.into(),
                MemoryFile {
                    modified,
                    contents: contents.into(),
                },
            );
    }

    /// Bumps the modification time of `path`, creating it empty if absent.
    pub fn touch(&self, path: impl Into<PathBuf>) {
        let modified = self.tick();
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(path.into())
            .and_modify(|f| f.modified = modified)
            .or_insert(MemoryFile {
                modified,
                contents: String::new(),
            });
    }

    /// Pins the modification time of an existing file.
    pub fn set_modified(&self, path: impl AsRef<Path>, modified: SystemTime) {
        if let Some(f) = self
            .files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(path.as_ref())
        {
            f.modified = modified;
        }
    }

    pub fn remove(&self, path: &Path) {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path);
    }
}

impl BuildFs for MemoryFs {
    fn modified(&self, path: &Path) -> Option<SystemTime> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .map(|f| f.modified)
    }

    fn read_to_string(&self, path: &Path) -> Option<String> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .map(|f| f.contents.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_fs_orders_writes() {
        let fs = MemoryFs::new();
        fs.write("a.v", "module a; endmodule");
        fs.write("b.v", "");
        let a = fs.modified(Path::new("a.v")).unwrap();
        let b = fs.modified(Path::new("b.v")).unwrap();
        assert!(b > a);

        fs.touch("a.v");
        assert!(fs.modified(Path::new("a.v")).unwrap() > b);
        assert_eq!(
            fs.read_to_string(Path::new("a.v")).as_deref(),
            Some("module a; endmodule")
        );
        fs.remove(Path::new("a.v"));
        assert!(fs.modified(Path::new("a.v")).is_none());
    }

    #[test]
    fn local_fs_reads_real_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("top.ys");
        std::fs::write(&path, "synth -top top").unwrap();
        assert!(LocalFs.modified(&path).is_some());
        assert_eq!(LocalFs.read_to_string(&path).as_deref(), Some("synth -top top"));
        assert!(LocalFs.modified(&dir.path().join("missing")).is_none());
    }
}
