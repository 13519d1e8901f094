//! Include/exclude glob + size gating (spec §4.8).

use globset::{Glob, GlobSetBuilder};
use std::path::Path;

/// `should_process(path, project_root, includes, excludes, max_size)`.
///
/// - `path` must resolve within `project_root`.
/// - The file name must match at least one include glob.
/// - The full path relative to `project_root` must not match any exclude
///   glob; directory patterns ending in `/` match at any nested depth, not
///   only at the path's prefix.
/// - If the file exists, its size must be `<= max_size`.
pub fn should_process(
    path: &Path,
    project_root: &Path,
    includes: &[String],
    excludes: &[String],
    max_size: u64,
) -> bool {
    let Ok(relative) = path.strip_prefix(project_root) else {
        return false;
    };

    let file_name = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        None => return false,
    };

    if !matches_any(includes, file_name) {
        return false;
    }

    if matches_excluded(excludes, relative) {
        return false;
    }

    if let Ok(metadata) = path.metadata() {
        if metadata.is_file() && metadata.len() > max_size {
            return false;
        }
    }

    true
}

fn matches_any(patterns: &[String], candidate: &str) -> bool {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        if let Ok(glob) = Glob::new(pattern) {
            builder.add(glob);
        }
    }
    match builder.build() {
        Ok(set) => set.is_match(candidate),
        Err(_) => false,
    }
}

/// Directory patterns (ending in `/`) match at any component of the
/// relative path, not just its prefix — `__pycache__/` excludes
/// `a/b/__pycache__/x.pyc` as well as `__pycache__/x.pyc`.
fn matches_excluded(patterns: &[String], relative: &Path) -> bool {
    let relative_str = relative.to_string_lossy();

    for pattern in patterns {
        if let Some(dir_name) = pattern.strip_suffix('/') {
            if relative
                .components()
                .any(|c| c.as_os_str() == dir_name)
            {
                return true;
            }
            continue;
        }

        if let Ok(glob) = Glob::new(pattern) {
            let matcher = glob.compile_matcher();
            if matcher.is_match(relative_str.as_ref()) {
                return true;
            }
            if let Some(name) = relative.file_name().and_then(|n| n.to_str()) {
                if matcher.is_match(name) {
                    return true;
                }
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_include_glob_matches() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("foo.py");
        std::fs::write(&file, "x").unwrap();

        assert!(should_process(
            &file,
            dir.path(),
            &["*.py".to_string()],
            &[],
            1_048_576
        ));
    }

    #[test]
    fn test_include_glob_rejects_other_extensions() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("foo.rs");
        std::fs::write(&file, "x").unwrap();

        assert!(!should_process(
            &file,
            dir.path(),
            &["*.py".to_string()],
            &[],
            1_048_576
        ));
    }

    #[test]
    fn test_exclude_directory_pattern_matches_nested() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a/b/__pycache__");
        std::fs::create_dir_all(&nested).unwrap();
        let file = nested.join("x.pyc");
        std::fs::write(&file, "x").unwrap();

        assert!(!should_process(
            &file,
            dir.path(),
            &["*.pyc".to_string()],
            &["__pycache__/".to_string()],
            1_048_576
        ));
    }

    #[test]
    fn test_max_size_boundary() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("big.py");
        let mut f = std::fs::File::create(&file).unwrap();
        f.write_all(&vec![b'x'; 10]).unwrap();

        assert!(should_process(&file, dir.path(), &["*.py".to_string()], &[], 10));
        assert!(!should_process(&file, dir.path(), &["*.py".to_string()], &[], 9));
    }

    #[test]
    fn test_outside_project_root_rejected() {
        let dir = tempdir().unwrap();
        let other = tempdir().unwrap();
        let file = other.path().join("foo.py");
        std::fs::write(&file, "x").unwrap();

        assert!(!should_process(
            &file,
            dir.path(),
            &["*.py".to_string()],
            &[],
            1_048_576
        ));
    }
}
