use std::path::{Path, PathBuf};

/// Returns `dir/base.cnf`, or the first free `dir/base (N).cnf` for
/// `N = 1, 2, ...` when that is taken.
///
/// Nothing is reserved: two callers racing on the same directory can get
/// the same answer.
pub fn unique_path(dir: &Path, base: &str) -> PathBuf {
    let path = dir.join(format!("{base}.cnf"));
    if !path.exists() {
        return path;
    }

    let mut counter = 1usize;
    loop {
        let path = dir.join(format!("{base} ({counter}).cnf"));
        if !path.exists() {
            return path;
        }
        counter += 1;
    }
}
