//! Glob expansion and directory walks over the configured workspace
//! locations.
//!
//! Every entry is a workspace-relative glob; a plain path is a glob without
//! wildcards. Matching directories are walked without following symlinks.
//! Results are sorted so rescans register steps in a stable order.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Step definition files found for the configured entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepFiles {
    /// Files in entry order, each listed once.
    pub files: Vec<PathBuf>,
    /// Entries that matched no file.
    pub unmatched: Vec<String>,
}

/// Collect step definition files from the configured `entries`.
///
/// Each entry is expanded as a glob relative to `root`. A matching file is
/// taken as is; a matching directory yields every file beneath it.
///
/// # Examples
///
/// ```ignore
/// use std::path::Path;
/// use stepscope_server::discovery::find_step_files;
///
/// let found = find_step_files(
///     Path::new("/path/to/project"),
///     &["test/features/step_definitions/*.js".to_owned()],
/// );
/// for entry in &found.unmatched {
///     eprintln!("no step files for {entry}");
/// }
/// ```
#[must_use]
pub fn find_step_files(root: &Path, entries: &[String]) -> StepFiles {
    let mut found = StepFiles::default();
    let mut seen = HashSet::new();
    for entry in entries {
        let files = expand_entry(root, entry, &|_| true);
        if files.is_empty() {
            warn!(entry = %entry, "no step files found");
            found.unmatched.push(entry.clone());
        }
        found
            .files
            .extend(files.into_iter().filter(|file| seen.insert(file.clone())));
    }
    found
}

/// Collect `.feature` files matched by the workspace-relative `pattern`.
///
/// An empty pattern stands for the workspace root itself.
#[must_use]
pub fn find_feature_files(root: &Path, pattern: &str) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    expand_entry(root, pattern, &is_feature_file)
        .into_iter()
        .filter(|file| seen.insert(file.clone()))
        .collect()
}

/// Whether `path` is matched by, or lies beneath a match of, one of the
/// configured step `entries`.
#[must_use]
pub fn is_step_file(root: &Path, entries: &[String], path: &Path) -> bool {
    entries.iter().any(|entry| {
        glob::Pattern::new(&rooted_pattern(root, entry)).is_ok_and(|pattern| {
            path.ancestors()
                .any(|candidate| pattern.matches_path(candidate))
        })
    })
}

/// Whether `path` has a `.feature` extension.
#[must_use]
pub fn is_feature_file(path: &Path) -> bool {
    path.extension()
        .and_then(std::ffi::OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("feature"))
}

/// Join `entry` onto `root`, escaping the root so only `entry` carries
/// glob syntax.
fn rooted_pattern(root: &Path, entry: &str) -> String {
    let base = glob::Pattern::escape(&root.to_string_lossy());
    let entry = entry.trim_matches(['/', '\\']);
    if entry.is_empty() {
        base
    } else {
        format!("{base}/{entry}")
    }
}

fn expand_entry(root: &Path, entry: &str, keep: &dyn Fn(&Path) -> bool) -> Vec<PathBuf> {
    let pattern = rooted_pattern(root, entry);
    let matches = match glob::glob(&pattern) {
        Ok(matches) => matches,
        Err(err) => {
            warn!(entry = %entry, error = %err, "invalid location pattern");
            return Vec::new();
        }
    };
    let mut files = Vec::new();
    for next in matches {
        let path = match next {
            Ok(path) => path,
            Err(err) => {
                debug!(error = %err, "skipping unreadable match");
                continue;
            }
        };
        if path.is_dir() {
            walk_files(&path, keep, &mut files);
        } else if path.is_file() && keep(&path) {
            files.push(path);
        }
    }
    files
}

fn walk_files(dir: &Path, keep: &dyn Fn(&Path) -> bool, files: &mut Vec<PathBuf>) {
    for next in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
        match next {
            Ok(entry) => {
                if is_regular_file(&entry) && keep(entry.path()) {
                    files.push(entry.into_path());
                }
            }
            Err(err) => debug!(path = %dir.display(), error = %err, "skipping unreadable entry"),
        }
    }
}

/// Files and symlinks to files; symlinked directories are not entered.
fn is_regular_file(entry: &DirEntry) -> bool {
    entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file())
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    reason = "tests require explicit panic messages for debugging failures"
)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::fs;
    use tempfile::TempDir;

    #[fixture]
    fn workspace() -> TempDir {
        let dir = TempDir::new().expect("failed to create temp dir");
        let steps = dir.path().join("steps").join("nested");
        fs::create_dir_all(&steps).expect("failed to create steps dir");
        fs::write(dir.path().join("steps").join("b.js"), "").expect("write b.js");
        fs::write(dir.path().join("steps").join("a.js"), "").expect("write a.js");
        fs::write(steps.join("c.ts"), "").expect("write c.ts");
        fs::write(dir.path().join("single.js"), "").expect("write single.js");

        let features = dir.path().join("features").join("nested");
        fs::create_dir_all(&features).expect("failed to create features dir");
        fs::write(features.join("login.feature"), "Feature: x").expect("write feature");
        fs::write(dir.path().join("features").join("notes.txt"), "").expect("write notes");
        dir
    }

    fn relative(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|file| {
                file.strip_prefix(root)
                    .expect("inside workspace")
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[rstest]
    fn collects_step_files_in_sorted_order(workspace: TempDir) {
        let entries = vec!["steps".to_owned(), "single.js".to_owned(), "missing".to_owned()];
        let found = find_step_files(workspace.path(), &entries);
        assert_eq!(
            relative(workspace.path(), &found.files),
            vec!["steps/a.js", "steps/b.js", "steps/nested/c.ts", "single.js"]
        );
        assert_eq!(found.unmatched, vec!["missing".to_owned()]);
    }

    #[rstest]
    fn expands_glob_entries() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let defs = dir.path().join("test/features/step_definitions");
        fs::create_dir_all(&defs).expect("failed to create step definitions dir");
        fs::write(defs.join("a.js"), "").expect("write a.js");
        fs::write(defs.join("notes.md"), "").expect("write notes.md");

        let entries = vec!["test/features/step_definitions/*.js".to_owned()];
        let found = find_step_files(dir.path(), &entries);
        assert_eq!(
            relative(dir.path(), &found.files),
            vec!["test/features/step_definitions/a.js"]
        );
        assert!(found.unmatched.is_empty());
        assert!(is_step_file(dir.path(), &entries, &defs.join("a.js")));
        assert!(!is_step_file(dir.path(), &entries, &defs.join("notes.md")));
    }

    #[rstest]
    fn overlapping_entries_list_each_file_once(workspace: TempDir) {
        let entries = vec!["steps/*.js".to_owned(), "steps".to_owned()];
        let found = find_step_files(workspace.path(), &entries);
        assert_eq!(
            relative(workspace.path(), &found.files),
            vec!["steps/a.js", "steps/b.js", "steps/nested/c.ts"]
        );
    }

    #[rstest]
    #[case::directory("features")]
    #[case::glob("features/**/*.feature")]
    fn collects_only_feature_files(workspace: TempDir, #[case] pattern: &str) {
        let files = find_feature_files(workspace.path(), pattern);
        assert_eq!(
            relative(workspace.path(), &files),
            vec!["features/nested/login.feature"]
        );
    }

    #[rstest]
    fn whole_workspace_and_absent_locations(workspace: TempDir) {
        let files = find_feature_files(workspace.path(), "");
        assert_eq!(
            relative(workspace.path(), &files),
            vec!["features/nested/login.feature"]
        );
        assert!(find_feature_files(workspace.path(), "absent").is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_loops_are_not_followed() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let features = dir.path().join("features");
        fs::create_dir_all(&features).expect("failed to create features dir");
        fs::write(features.join("a.feature"), "Feature: a").expect("write feature");
        std::os::unix::fs::symlink("..", features.join("loop")).expect("create symlink loop");

        let files = find_feature_files(dir.path(), "features");
        assert_eq!(relative(dir.path(), &files), vec!["features/a.feature"]);
    }

    #[rstest]
    fn recognises_step_files(workspace: TempDir) {
        let entries = vec!["steps".to_owned()];
        let root = workspace.path();
        assert!(is_step_file(root, &entries, &root.join("steps/nested/c.ts")));
        assert!(!is_step_file(root, &entries, &root.join("single.js")));
        assert!(!is_step_file(root, &entries, &root.join("stepsextra/x.js")));
    }

    #[test]
    fn invalid_patterns_match_nothing() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let entries = vec!["steps/[".to_owned()];
        let found = find_step_files(dir.path(), &entries);
        assert!(found.files.is_empty());
        assert_eq!(found.unmatched, entries);
        assert!(!is_step_file(dir.path(), &entries, &dir.path().join("steps/a.js")));
    }

    #[rstest]
    #[case("a.feature", true)]
    #[case("A.FEATURE", true)]
    #[case("a.feature.bak", false)]
    #[case("feature", false)]
    fn recognises_feature_files(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_feature_file(Path::new(name)), expected);
    }
}
