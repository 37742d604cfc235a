//! Import path resolution.

use std::path::{Component, Path, PathBuf};

/// Resolves an import string against the importing file's directory.
///
/// Absolute imports are only cleaned. Leading `./` segments are dropped and
/// each leading `../` pops one directory off `work_dir`. The result is
/// cleaned with [`normalize`] so one file always resolves to one path.
pub fn resolve_import_path(work_dir: &Path, import: &str) -> Result<PathBuf, String> {
    let path = Path::new(import);
    if path.is_absolute() {
        return Ok(normalize(path));
    }

    let mut base = normalize(work_dir);
    let mut rest = import;
    loop {
        if let Some(stripped) = rest.strip_prefix("./") {
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix("../") {
            if !base.pop() {
                return Err(format!(
                    "'{}' walks above the filesystem root from '{}'",
                    import,
                    work_dir.display()
                ));
            }
            rest = stripped;
        } else {
            break;
        }
    }

    Ok(normalize(&base.join(rest)))
}

/// Lexically cleans `path`: drops `.` and folds each `..` into its parent.
///
/// `..` directly under the root stays at the root. Leading `..` of a relative
/// path is kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Diagnostic label for a file: its base name.
pub fn line_prefix(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}
