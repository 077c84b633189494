use handbridge_core::paths::CONFIG_FILE;
use std::path::{Path, PathBuf};

/// Resolve the project root.
///
/// Priority:
/// 1. `--root` flag / `HANDBRIDGE_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `handbridge.yaml`
/// 3. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_root_from(&cwd).unwrap_or(cwd)
}

fn find_root_from(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(CONFIG_FILE).is_file())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins() {
        let dir = TempDir::new().unwrap();
        let result = resolve_root(Some(dir.path()));
        assert_eq!(result, dir.path());
    }

    #[test]
    fn finds_config_in_ancestor() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "version: 1\n").unwrap();
        let subdir = dir.path().join("recordings/today");
        std::fs::create_dir_all(&subdir).unwrap();

        assert_eq!(find_root_from(&subdir).as_deref(), Some(dir.path()));
    }

    #[test]
    fn no_config_anywhere() {
        let dir = TempDir::new().unwrap();
        let subdir = dir.path().join("a/b");
        std::fs::create_dir_all(&subdir).unwrap();
        // A stray handbridge.yaml above the temp dir would be found; only
        // assert the walk does not stop inside it.
        let found = find_root_from(&subdir);
        assert!(found.map_or(true, |p| !p.starts_with(dir.path())));
    }
}
