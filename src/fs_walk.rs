use std::fs;
use std::path::{Path, PathBuf};

/// Expand a command line path into the transcript files to search, in a
/// stable order. Hidden entries are skipped while recursing.
pub fn collect_files(root: &Path, recursive: bool) -> Vec<PathBuf> {
    if root.is_file() {
        return vec![root.to_path_buf()];
    }
    if !root.is_dir() {
        log::warn!("{}: no such file or directory", root.display());
        return Vec::new();
    }
    if !recursive {
        log::warn!("{}: is a directory", root.display());
        return Vec::new();
    }
    let mut out = Vec::new();
    collect_recursive(root, &mut out);
    out
}

fn collect_recursive(dir: &Path, out: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            log::warn!("{}: {err}", dir.display());
            return;
        }
    };
    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| !is_hidden(path))
        .collect();
    paths.sort();

    for path in paths {
        if path.is_dir() {
            collect_recursive(&path, out);
        } else if path.is_file() {
            out.push(path);
        }
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_entries() {
        assert!(is_hidden(Path::new("dir/.git")));
        assert!(!is_hidden(Path::new("dir/words.txt")));
    }

    #[test]
    fn missing_paths_yield_nothing() {
        assert!(collect_files(Path::new("/definitely/not/here"), true).is_empty());
    }
}
