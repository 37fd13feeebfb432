//! Environment layer: resolves the on-disk location of the store and owns
//! the `heed` (LMDB) environment handle, mirroring `dbing.py`'s `Databaser`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use heed::types::Bytes;
use heed::{DatabaseFlags, EnvOpenOptions};
use tracing::{debug, warn};

use crate::errors::{Result, StoreError};

/// Raw byte-to-byte LMDB database handle used throughout the keyspace layer.
pub type KelDatabase = heed::Database<Bytes, Bytes>;

/// Maximum number of named sub-databases a single environment can hold.
pub const MAX_NAMED_SUB_STORES: u32 = 16;

/// Default LMDB map size: 100 MiB.
pub const MAP_SIZE: usize = 100 * 1024 * 1024;

/// Maximum key size LMDB accepts; checked up front so callers get
/// [`StoreError::KeyTooLong`] instead of an opaque `heed` error.
pub const MAX_KEY_SIZE: usize = 511;

const HEAD_DIR_PATH: &str = "/var";
const TAIL_DIR_PATH: &str = "keri/db";
const ALT_TAIL_DIR_PATH: &str = ".keri/db";
const TEMP_PREFIX: &str = "keri_lmdb_";
const TEMP_SUFFIX: &str = "_test";

/// Verifies `key` fits within LMDB's key-size limit.
pub fn check_key_len(key: &[u8]) -> Result<()> {
    if key.len() > MAX_KEY_SIZE {
        return Err(StoreError::KeyTooLong {
            len: key.len(),
            max: MAX_KEY_SIZE,
        });
    }
    Ok(())
}

/// POSIX-style `access(path, R_OK|W_OK)`: effective-uid-aware, unlike
/// inspecting raw mode bits, which cannot tell whether the *current*
/// process owns, groups with, or is a stranger to the path.
///
/// `std` has no `access()` wrapper, so this performs the real operations
/// `access()` would only simulate: list the directory for read, and
/// attempt (then discard) a real temp file in it for write.
fn has_full_access(path: &Path) -> bool {
    let readable = fs::read_dir(path).is_ok();
    let writable = tempfile::Builder::new()
        .prefix(".access_check_")
        .tempfile_in(path)
        .is_ok();
    readable && writable
}

fn expand_user(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

// EACCES and EPERM are 13 and 1 on every platform `heed`/LMDB actually ship
// on; checked by raw errno rather than `ErrorKind` since EPERM has no
// dedicated stable `ErrorKind` and `ErrorKind::Other` also catches
// unrelated failures (ENOSPC, ENOTDIR, EROFS, EIO, …) that must propagate
// as `StoreError::Io` instead of triggering the alt-path fallback.
const EACCES: i32 = 13;
const EPERM: i32 = 1;

fn is_permission_denied(err: &std::io::Error) -> bool {
    matches!(err.raw_os_error(), Some(EACCES) | Some(EPERM))
}

fn resolve_path(name: &str, temp: bool, head_dir_path: Option<&Path>) -> Result<PathBuf> {
    if temp {
        let dir = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempdir()
            .map_err(StoreError::Io)?
            .into_path();
        let path = dir.join(TAIL_DIR_PATH).join(name);
        fs::create_dir_all(&path).map_err(StoreError::Io)?;
        return Ok(path);
    }

    let head = head_dir_path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(HEAD_DIR_PATH));
    let primary = expand_user(&head.join(TAIL_DIR_PATH).join(name));

    if !primary.exists() {
        match fs::create_dir_all(&primary) {
            Ok(()) => {
                debug!(path = %primary.display(), "opened primary db path");
                return Ok(primary);
            }
            Err(e) if is_permission_denied(&e) => {
                warn!(path = %primary.display(), "primary db path rejected, falling back");
            }
            Err(e) => return Err(StoreError::Io(e)),
        }
    } else if has_full_access(&primary) {
        debug!(path = %primary.display(), "opened primary db path");
        return Ok(primary);
    } else {
        warn!(path = %primary.display(), "primary db path lacks full access, falling back");
    }

    let alt_head = dirs::home_dir().ok_or_else(|| {
        StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no home directory available for alt db path",
        ))
    })?;
    let alt = alt_head.join(ALT_TAIL_DIR_PATH).join(name);
    fs::create_dir_all(&alt).map_err(StoreError::Io)?;
    warn!(path = %alt.display(), "using alt db path");
    Ok(alt)
}

/// The opened environment: a directory on disk plus the `heed::Env` handle
/// over it. Cheap to clone — `heed::Env` is internally reference-counted.
#[derive(Clone)]
pub struct KelEnv {
    env: heed::Env,
    path: PathBuf,
    temp: bool,
    closed: std::sync::Arc<AtomicBool>,
}

impl KelEnv {
    /// Opens (creating if necessary) an environment named `name`.
    ///
    /// `temp` opens a throwaway environment under a freshly created temp
    /// directory, removed entirely on [`KelEnv::close`]. `head_dir_path`
    /// overrides the default head directory (`/var`) for the primary path.
    pub fn open(name: &str, temp: bool, head_dir_path: Option<&Path>) -> Result<Self> {
        let path = resolve_path(name, temp, head_dir_path)?;
        // SAFETY: the environment is opened with a fixed map size and is not
        // concurrently opened elsewhere with a different size, matching the
        // single-process LMDB usage this engine assumes (§5).
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(MAP_SIZE)
                .max_dbs(MAX_NAMED_SUB_STORES)
                .open(&path)
        }
        .map_err(StoreError::Env)?;
        debug!(path = %path.display(), temp, "environment opened");
        Ok(Self {
            env,
            path,
            temp,
            closed: std::sync::Arc::new(AtomicBool::new(false)),
        })
    }

    /// Opens, creating if absent, a sub-database at `name`.
    ///
    /// `dup_sort` fixes the LMDB duplicate-sort flag at creation time; it has
    /// no effect on a database that already exists with a different flag.
    pub fn create_database(&self, name: &str, dup_sort: bool) -> Result<KelDatabase> {
        self.ensure_open()?;
        let mut wtxn = self.env.write_txn().map_err(StoreError::Env)?;
        let mut options = self.env.database_options().types::<Bytes, Bytes>();
        options.name(name);
        if dup_sort {
            options.flags(DatabaseFlags::DUP_SORT);
        }
        let db: KelDatabase = options.create(&mut wtxn).map_err(StoreError::Env)?;
        wtxn.commit().map_err(StoreError::Env)?;
        Ok(db)
    }

    /// Returns `true` once this handle has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(StoreError::NotOpened);
        }
        Ok(())
    }

    /// Closes the environment. Idempotent: closing an already-closed
    /// environment succeeds silently. A `temp` environment additionally
    /// removes its backing directory tree.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if self.temp {
            if let Err(e) = fs::remove_dir_all(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    return Err(StoreError::Io(e));
                }
            }
        }
        debug!(path = %self.path.display(), "environment closed");
        Ok(())
    }

    /// The resolved on-disk path backing this environment.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn env(&self) -> Result<&heed::Env> {
        self.ensure_open()?;
        Ok(&self.env)
    }
}
