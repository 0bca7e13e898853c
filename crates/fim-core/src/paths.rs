use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub const APP_QUALIFIER: &str = "com";
pub const APP_ORG: &str = "darklock";
pub const APP_NAME: &str = "fim";

pub const CONFIG_ENV: &str = "FIM_CONFIG";

pub fn data_dir() -> anyhow::Result<PathBuf> {
    let dirs = ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .ok_or_else(|| anyhow::anyhow!("cannot determine data directory"))?;
    Ok(dirs.data_dir().to_path_buf())
}

pub fn config_path() -> anyhow::Result<PathBuf> {
    if let Ok(override_path) = std::env::var(CONFIG_ENV) {
        return Ok(PathBuf::from(override_path));
    }
    Ok(data_dir()?.join("config.json"))
}

/// Absolute, symlink-resolved form of `path` used as the registry key.
///
/// Paths that no longer exist are resolved through their parent directory so
/// a deleted file maps to the same key it was registered under.
pub fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) => parent
            .canonicalize()
            .map(|p| p.join(name))
            .unwrap_or(absolute),
        _ => absolute,
    }
}

/// Registry key for `path`. `None` when the normalized path is not valid
/// UTF-8; such paths are never registered.
pub fn record_key(path: &Path) -> Option<String> {
    normalize(path).into_os_string().into_string().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn deleted_file_keeps_its_key() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, b"x").unwrap();
        let before = record_key(&file).unwrap();
        fs::remove_file(&file).unwrap();
        assert_eq!(record_key(&file).unwrap(), before);
    }

    #[test]
    fn dot_segments_are_resolved() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, b"x").unwrap();
        let indirect = dir.path().join("sub").join("..").join("a.txt");
        assert_eq!(normalize(&indirect), normalize(&file));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_path_has_no_key() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        assert!(record_key(Path::new(OsStr::from_bytes(b"/tmp/bad\xff.txt"))).is_none());
        assert!(record_key(Path::new("/tmp/bad\u{FFFD}.txt")).is_some());
    }
}
