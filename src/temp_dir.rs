//! Scratch directory lifecycle.
//!
//! Build sessions without an explicit build directory get a uniquely named
//! directory under the platform temp root. Removal is registered with the
//! [`ResourceRegistry`](crate::cleanup::ResourceRegistry) before the path is
//! handed out, so the directory is cleaned up on every exit path that follows
//! its creation.

use crate::cleanup::ResourceRegistry;
use regex::Regex;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::{env, fs};

/// Prefix shared by every scratch directory. The full name is the prefix
/// followed by six random alphanumeric characters, and the cleanup guard
/// matches exactly that shape.
pub const SCRATCH_PREFIX: &str = "go-wasm-";

const RAND_LEN: usize = 6;

fn scratch_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^go-wasm-.{6}$").expect("static scratch-name pattern"))
}

pub fn is_scratch_dir_name(name: &str) -> bool {
    scratch_name_pattern().is_match(name)
}

/// Create a fresh scratch directory under the platform temp root and register
/// its removal with the global cleanup registry.
pub fn create_scratch_dir() -> io::Result<PathBuf> {
    create_scratch_dir_in(&env::temp_dir())
}

/// Like [`create_scratch_dir`], with an explicit temp root (used by tests).
pub fn create_scratch_dir_in(temp_root: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(temp_root)?;

    let dir = tempfile::Builder::new()
        .prefix(SCRATCH_PREFIX)
        .rand_bytes(RAND_LEN)
        .tempdir_in(temp_root)?;

    // Registered before ownership leaves this function: a crash between here
    // and the caller still removes the directory.
    let path = dir.path().to_path_buf();
    let registered = path.clone();
    ResourceRegistry::global().register(move || remove_scratch_dir_sync(&registered));

    Ok(dir.keep())
}

/// Synchronously and recursively remove a scratch directory.
///
/// Only paths whose basename matches the scratch naming pattern are touched;
/// anything else is silently ignored so an arbitrary caller-supplied path can
/// never be deleted by accident. A missing directory is not an error.
pub fn remove_scratch_dir_sync(path: &Path) {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return;
    };
    if !is_scratch_dir_name(name) {
        return;
    }
    if let Err(e) = fs::remove_dir_all(path) {
        if e.kind() != io::ErrorKind::NotFound {
            log::warn!("Could not remove scratch directory {}: {e}", path.display());
        }
    }
}

/// Best-effort sweep of scratch directories left behind by crashed runs.
///
/// Deletes every immediate child of `root` that is a directory matching the
/// scratch naming pattern. Individual failures are logged and skipped, never
/// propagated. Returns the number of directories removed.
pub fn sweep_stale_dirs(root: &Path) -> usize {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Could not list {}: {e}", root.display());
            return 0;
        }
    };

    let mut swept = 0;
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Could not read an entry under {}: {e}", root.display());
                continue;
            }
        };
        let path = entry.path();
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !is_scratch_dir_name(name) || !path.is_dir() {
            continue;
        }
        match fs::remove_dir_all(&path) {
            Ok(()) => swept += 1,
            Err(e) => log::warn!("Could not sweep {}: {e}", path.display()),
        }
    }
    swept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_dir_name_matches_the_fixed_pattern() {
        let root = tempfile::tempdir().unwrap();
        let dir = create_scratch_dir_in(root.path()).unwrap();
        let name = dir.file_name().unwrap().to_str().unwrap();
        assert!(is_scratch_dir_name(name), "unexpected name: {name}");
        assert!(dir.is_dir());
    }

    #[test]
    fn two_calls_yield_two_distinct_directories() {
        let root = tempfile::tempdir().unwrap();
        let a = create_scratch_dir_in(root.path()).unwrap();
        let b = create_scratch_dir_in(root.path()).unwrap();
        assert_ne!(a, b);
        assert!(a.is_dir());
        assert!(b.is_dir());
    }

    #[test]
    fn remove_is_a_no_op_for_foreign_names() {
        let root = tempfile::tempdir().unwrap();
        let foreign = root.path().join("keep-me");
        fs::create_dir(&foreign).unwrap();

        remove_scratch_dir_sync(&foreign);
        assert!(foreign.is_dir());
    }

    #[test]
    fn remove_deletes_matching_directories_recursively() {
        let root = tempfile::tempdir().unwrap();
        let scratch = root.path().join("go-wasm-abc123");
        fs::create_dir_all(scratch.join("nested")).unwrap();
        fs::write(scratch.join("nested").join("mod.wasm"), b"\0asm").unwrap();

        remove_scratch_dir_sync(&scratch);
        assert!(!scratch.exists());
    }

    #[test]
    fn remove_tolerates_missing_paths() {
        remove_scratch_dir_sync(Path::new("/nonexistent/go-wasm-zzzzzz"));
    }

    #[test]
    fn name_pattern_rejects_wrong_prefix_and_length() {
        assert!(is_scratch_dir_name("go-wasm-a1b2c3"));
        assert!(!is_scratch_dir_name("go-wasm-a1b2c"));
        assert!(!is_scratch_dir_name("go-wasm-a1b2c3d"));
        assert!(!is_scratch_dir_name("rs-wasm-a1b2c3"));
        assert!(!is_scratch_dir_name("go-wasm-"));
    }

    #[test]
    fn sweep_removes_only_matching_directories() {
        let root = tempfile::tempdir().unwrap();
        let stale_a = root.path().join("go-wasm-111111");
        let stale_b = root.path().join("go-wasm-222222");
        let unrelated = root.path().join("unrelated");
        let matching_file = root.path().join("go-wasm-333333");
        fs::create_dir(&stale_a).unwrap();
        fs::create_dir(&stale_b).unwrap();
        fs::create_dir(&unrelated).unwrap();
        fs::write(&matching_file, b"not a directory").unwrap();

        let swept = sweep_stale_dirs(root.path());

        assert_eq!(swept, 2);
        assert!(!stale_a.exists());
        assert!(!stale_b.exists());
        assert!(unrelated.is_dir());
        assert!(matching_file.is_file());
    }

    #[test]
    fn sweep_of_a_missing_root_is_a_no_op() {
        assert_eq!(sweep_stale_dirs(Path::new("/nonexistent/temp/root")), 0);
    }
}
