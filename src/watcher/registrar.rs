//! Depth-bounded recursive watch registration.

use std::path::{Path, PathBuf};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use super::WatchError;

/// Directory-name exclusion filter threaded through registration.
///
/// Matches on the final path component only, so `target` excludes any
/// directory named `target` at any depth.
#[derive(Debug, Clone)]
pub struct PathFilter {
    ignore_dirs: Vec<String>,
}

impl PathFilter {
    pub fn new(ignore_dirs: Vec<String>) -> Self {
        Self { ignore_dirs }
    }

    /// True if the path should be skipped: neither watched nor descended into.
    pub fn is_excluded(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|name| self.ignore_dirs.iter().any(|d| d == name))
            .unwrap_or(false)
    }
}

impl Default for PathFilter {
    fn default() -> Self {
        Self::new(vec![
            ".git".to_string(),
            "target".to_string(),
            "node_modules".to_string(),
        ])
    }
}

/// Register `root` and every non-excluded directory reachable within
/// `max_depth` directory hops. Depth 0 registers only the root.
///
/// The depth bound caps pathological trees from exhausting watch-handle
/// limits. Any single registration or listing failure aborts the whole call;
/// already-registered watches are not rolled back.
///
/// Returns the registered directories in registration order.
pub fn register_tree(
    watcher: &mut RecommendedWatcher,
    root: &Path,
    max_depth: u32,
    filter: &PathFilter,
) -> Result<Vec<PathBuf>, WatchError> {
    let mut registered = Vec::new();
    register_into(watcher, root, max_depth, filter, &mut registered)?;
    Ok(registered)
}

fn register_into(
    watcher: &mut RecommendedWatcher,
    dir: &Path,
    depth: u32,
    filter: &PathFilter,
    registered: &mut Vec<PathBuf>,
) -> Result<(), WatchError> {
    watcher
        .watch(dir, RecursiveMode::NonRecursive)
        .map_err(|e| WatchError::Register {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;
    registered.push(dir.to_path_buf());
    crate::debug_event!("watcher", "watching", "{}", dir.display());

    if depth == 0 {
        return Ok(());
    }

    let entries = std::fs::read_dir(dir).map_err(|source| WatchError::ListDir {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| WatchError::ListDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let file_type = entry.file_type().map_err(|source| WatchError::ListDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if file_type.is_dir() && !filter.is_excluded(&path) {
            register_into(watcher, &path, depth - 1, filter, registered)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;
    use tempfile::tempdir;

    fn new_watcher() -> RecommendedWatcher {
        notify::recommended_watcher(|_res: notify::Result<notify::Event>| {}).unwrap()
    }

    /// root/
    ///   a/
    ///     deep/
    ///   b/
    ///   target/
    ///   file.txt
    fn build_tree(root: &Path) {
        fs::create_dir_all(root.join("a/deep")).unwrap();
        fs::create_dir(root.join("b")).unwrap();
        fs::create_dir(root.join("target")).unwrap();
        fs::write(root.join("file.txt"), "x").unwrap();
    }

    fn registered_set(dirs: &[PathBuf]) -> HashSet<PathBuf> {
        dirs.iter().cloned().collect()
    }

    #[test]
    fn test_depth_zero_registers_only_root() {
        let dir = tempdir().unwrap();
        build_tree(dir.path());
        let mut watcher = new_watcher();

        let dirs =
            register_tree(&mut watcher, dir.path(), 0, &PathFilter::new(vec![])).unwrap();
        assert_eq!(dirs, vec![dir.path().to_path_buf()]);
    }

    #[test]
    fn test_depth_one_registers_immediate_children() {
        let dir = tempdir().unwrap();
        build_tree(dir.path());
        let mut watcher = new_watcher();

        let dirs =
            register_tree(&mut watcher, dir.path(), 1, &PathFilter::new(vec![])).unwrap();
        let expected: HashSet<PathBuf> = [
            dir.path().to_path_buf(),
            dir.path().join("a"),
            dir.path().join("b"),
            dir.path().join("target"),
        ]
        .into();
        assert_eq!(registered_set(&dirs), expected);
    }

    #[test]
    fn test_depth_two_reaches_nested_dirs() {
        let dir = tempdir().unwrap();
        build_tree(dir.path());
        let mut watcher = new_watcher();

        let dirs =
            register_tree(&mut watcher, dir.path(), 2, &PathFilter::new(vec![])).unwrap();
        assert!(registered_set(&dirs).contains(&dir.path().join("a/deep")));
        assert_eq!(dirs.len(), 5);
    }

    #[test]
    fn test_excluded_dirs_are_skipped() {
        let dir = tempdir().unwrap();
        build_tree(dir.path());
        let mut watcher = new_watcher();

        let dirs = register_tree(&mut watcher, dir.path(), 2, &PathFilter::default()).unwrap();
        let set = registered_set(&dirs);
        assert!(!set.contains(&dir.path().join("target")));
        assert!(set.contains(&dir.path().join("a")));
        assert!(set.contains(&dir.path().join("a/deep")));
    }

    #[test]
    fn test_missing_root_propagates_error() {
        let dir = tempdir().unwrap();
        let mut watcher = new_watcher();

        let err = register_tree(
            &mut watcher,
            &dir.path().join("gone"),
            1,
            &PathFilter::default(),
        )
        .unwrap_err();
        assert!(matches!(err, WatchError::Register { .. }));
    }

    #[test]
    fn test_filter_matches_on_name_only() {
        let filter = PathFilter::new(vec!["build".to_string()]);
        assert!(filter.is_excluded(Path::new("/work/project/build")));
        assert!(filter.is_excluded(Path::new("build")));
        assert!(!filter.is_excluded(Path::new("/work/build-scripts")));
        assert!(!filter.is_excluded(Path::new("/work/project/src")));
    }
}
