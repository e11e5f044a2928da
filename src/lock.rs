use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Exclusive advisory lock on a sidecar file; released on drop.
/// The lock file stays on disk after release.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Sidecar lock path for a data file: `<file>.lock`.
pub fn lock_path_for(data: &Path) -> PathBuf {
    let mut name = data
        .file_name()
        .map(|s| s.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    data.with_file_name(name)
}

/// Acquire an exclusive lock at `p`, polling until `wait` elapses.
pub fn acquire_lock_at(p: &Path, wait: Duration) -> io::Result<FileLock> {
    if let Some(parent) = p.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(p)?;

    let started = Instant::now();
    loop {
        match file.try_lock_exclusive() {
            Ok(()) => {
                return Ok(FileLock {
                    file,
                    path: p.to_path_buf(),
                })
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock || is_lock_contended(&e) => {
                if started.elapsed() >= wait {
                    return Err(io::Error::new(
                        io::ErrorKind::WouldBlock,
                        format!("lock held by another process: {}", p.display()),
                    ));
                }
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(e) => return Err(e),
        }
    }
}

fn is_lock_contended(e: &io::Error) -> bool {
    e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
