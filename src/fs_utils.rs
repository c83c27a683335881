//! Path helpers shared by the registries and the engine
//!
//! Document identity, overlay keys and dependency matching all compare paths,
//! so every path entering the tracker goes through [`normalize_path`] first:
//! - relative paths are joined onto the current working directory
//! - `.` and `..` components are resolved lexically (no symlink resolution,
//!   the file may not exist yet)
//! - the Windows extended-length `\\?\` prefix is stripped

use std::path::{Component, Path, PathBuf};

/// Normalize a path for use as a tracking key.
///
/// # Examples
///
/// ```
/// use std::path::{Path, PathBuf};
/// use tu_tracker::fs_utils::normalize_path;
///
/// # #[cfg(unix)]
/// assert_eq!(
///     normalize_path(Path::new("/src/./lib/../main.cpp")),
///     PathBuf::from("/src/main.cpp")
/// );
/// ```
pub fn normalize_path(path: &Path) -> PathBuf {
    let path = strip_extended_prefix(path);
    let absolute = if path.is_absolute() {
        path
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path,
        }
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Never pop past the root.
                if !matches!(
                    normalized.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                ) {
                    normalized.pop();
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Render a path with the platform's native separators.
///
/// This is the form handed to the parsing engine on the command line.
pub fn to_native_separators(path: &Path) -> String {
    let rendered = path.to_string_lossy();
    if cfg!(windows) {
        rendered.replace('/', "\\")
    } else {
        rendered.into_owned()
    }
}

fn strip_extended_prefix(path: &Path) -> PathBuf {
    #[cfg(windows)]
    {
        let s = path.to_string_lossy();
        // \\?\UNC\server\share -> \\server\share
        if let Some(stripped) = s.strip_prefix(r"\\?\UNC\") {
            return PathBuf::from(format!(r"\\{}", stripped));
        }
        // \\?\C:\path -> C:\path
        if let Some(stripped) = s.strip_prefix(r"\\?\") {
            return PathBuf::from(stripped);
        }
    }
    path.to_path_buf()
}
