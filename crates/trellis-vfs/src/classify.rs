//! Path classification.
//!
//! Classification is purely path/name based; file contents are never read.

use std::path::{Path, PathBuf};

pub const BUILD_FILE_NAMES: [&str; 2] = ["BUILD", "BUILD.bazel"];
pub const WORKSPACE_FILE_NAMES: [&str; 4] = ["MODULE", "MODULE.bazel", "WORKSPACE", "WORKSPACE.bazel"];
pub const STARLARK_EXTENSION: &str = "bzl";

/// Semantic kind of a watched path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Package build definition (`BUILD`, `BUILD.bazel`).
    BuildFile,
    /// Workspace/module marker (`WORKSPACE`, `MODULE.bazel`, ...).
    WorkspaceFile,
    /// Extension-macro file (`.bzl`).
    StarlarkFile,
    /// Everything else under watch.
    SourceFile,
}

impl FileKind {
    pub fn classify(path: &Path) -> FileKind {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();

        if BUILD_FILE_NAMES.iter().any(|name| file_name == *name) {
            return FileKind::BuildFile;
        }
        if WORKSPACE_FILE_NAMES.iter().any(|name| file_name == *name) {
            return FileKind::WorkspaceFile;
        }
        if path
            .extension()
            .is_some_and(|extension| extension == STARLARK_EXTENSION)
        {
            return FileKind::StarlarkFile;
        }
        FileKind::SourceFile
    }
}

/// A path together with its classification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassifiedFile {
    pub path: PathBuf,
    pub kind: FileKind,
}

impl ClassifiedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let kind = FileKind::classify(&path);
        Self { path, kind }
    }
}

/// Pre-filter for the filesystem event source: the fixed build/workspace
/// file names, extension-macro files, and source files with a registered
/// extension.
#[derive(Debug, Clone, Default)]
pub struct WatchFilter {
    source_extensions: hashbrown::HashSet<String>,
}

impl WatchFilter {
    pub fn new(source_extensions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            source_extensions: source_extensions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, path: &Path) -> bool {
        match FileKind::classify(path) {
            FileKind::BuildFile | FileKind::WorkspaceFile | FileKind::StarlarkFile => true,
            FileKind::SourceFile => path
                .extension()
                .map(|extension| extension.to_string_lossy())
                .is_some_and(|extension| self.source_extensions.contains(extension.as_ref())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_fixed_names_and_extensions() {
        assert_eq!(FileKind::classify(Path::new("pkg/BUILD")), FileKind::BuildFile);
        assert_eq!(
            FileKind::classify(Path::new("pkg/BUILD.bazel")),
            FileKind::BuildFile
        );
        assert_eq!(
            FileKind::classify(Path::new("WORKSPACE")),
            FileKind::WorkspaceFile
        );
        assert_eq!(
            FileKind::classify(Path::new("MODULE.bazel")),
            FileKind::WorkspaceFile
        );
        assert_eq!(
            FileKind::classify(Path::new("defs/macros.bzl")),
            FileKind::StarlarkFile
        );
        assert_eq!(
            FileKind::classify(Path::new("src/main.py")),
            FileKind::SourceFile
        );
        assert_eq!(
            FileKind::classify(Path::new("src/Main.java")),
            FileKind::SourceFile
        );
    }

    #[test]
    fn build_file_lookalikes_are_sources() {
        assert_eq!(
            FileKind::classify(Path::new("pkg/BUILD.txt")),
            FileKind::SourceFile
        );
        assert_eq!(
            FileKind::classify(Path::new("pkg/NOTBUILD")),
            FileKind::SourceFile
        );
    }

    #[test]
    fn watch_filter_combines_names_and_extensions() {
        let filter = WatchFilter::new(["rs", "java"]);
        assert!(filter.matches(Path::new("pkg/BUILD")));
        assert!(filter.matches(Path::new("defs.bzl")));
        assert!(filter.matches(Path::new("src/lib.rs")));
        assert!(!filter.matches(Path::new("notes.md")));
        assert!(!filter.matches(Path::new("binary")));
    }
}
