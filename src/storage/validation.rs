//! Path validation
//!
//! The trust boundary of the server. Every caller-supplied path string goes
//! through [`normalize`] and [`WorkspaceRoot::resolve`] before any other
//! component touches the filesystem, and every caller-supplied name goes
//! through [`EntryName::parse`].

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::WorkspaceError;

/// Maximum length of a single path component, in bytes.
pub const MAX_NAME_LENGTH: usize = 255;

/// Characters that may never appear in an entry name.
pub const RESERVED_CHARS: [char; 9] = ['<', '>', ':', '"', '|', '/', '\\', '*', '?'];

/// A root-relative path made only of plain segments.
///
/// Never contains `.` or `..` segments, separators other than `/`, or
/// reserved characters. The empty path denotes the workspace root itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RelativePath(String);

impl RelativePath {
    pub fn root() -> Self {
        RelativePath(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|segment| !segment.is_empty())
    }

    /// Final segment, or `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        self.segments().last()
    }

    /// Parent path, or `None` for the root.
    pub fn parent(&self) -> Option<RelativePath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(idx) => Some(RelativePath(self.0[..idx].to_string())),
            None => Some(RelativePath::root()),
        }
    }

    pub fn join(&self, name: &EntryName) -> RelativePath {
        if self.is_root() {
            RelativePath(name.as_str().to_string())
        } else {
            RelativePath(format!("{}/{}", self.0, name.as_str()))
        }
    }

    /// Segment-wise prefix test: `a/b` starts with `a` but not with `a/b2`'s `a/b`.
    pub fn starts_with(&self, other: &RelativePath) -> bool {
        let mut mine = self.segments();
        other
            .segments()
            .all(|segment| mine.next() == Some(segment))
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0)
    }
}

/// Lexically normalizes an untrusted path string into a [`RelativePath`].
///
/// Both `/` and `\` separate segments. `.` and empty segments vanish, `..`
/// pops the previous segment and is clamped at the root instead of being
/// rejected. A leading separator means root-relative, never
/// filesystem-absolute. Pure: touches no filesystem state.
pub fn normalize(raw: &str) -> Result<RelativePath, WorkspaceError> {
    if raw.contains('\0') {
        return Err(WorkspaceError::validation("path contains a NUL byte"));
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => {
                check_segment(other)?;
                segments.push(other);
            }
        }
    }

    Ok(RelativePath(segments.join("/")))
}

fn check_segment(segment: &str) -> Result<(), WorkspaceError> {
    if segment.len() > MAX_NAME_LENGTH {
        return Err(WorkspaceError::validation(format!(
            "path segment exceeds {} bytes",
            MAX_NAME_LENGTH
        )));
    }
    if let Some(c) = segment.chars().find(|c| RESERVED_CHARS.contains(c)) {
        return Err(WorkspaceError::validation(format!(
            "path contains reserved character '{}'",
            c
        )));
    }
    if segment.chars().any(char::is_control) {
        return Err(WorkspaceError::validation(
            "path contains control characters",
        ));
    }
    Ok(())
}

/// A single, validated path component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryName(String);

impl EntryName {
    /// Validates a bare directory or file name.
    ///
    /// Accepts 1 to 255 bytes, rejects separators, the reserved characters
    /// `< > : " | / \ * ?`, control characters, and the `.`/`..` aliases.
    pub fn parse(raw: &str) -> Result<Self, WorkspaceError> {
        if raw.is_empty() {
            return Err(WorkspaceError::validation("name cannot be empty"));
        }
        if raw.trim().is_empty() {
            return Err(WorkspaceError::validation("name cannot be blank"));
        }
        if raw.len() > MAX_NAME_LENGTH {
            return Err(WorkspaceError::validation(format!(
                "name exceeds {} bytes",
                MAX_NAME_LENGTH
            )));
        }
        if let Some(c) = raw.chars().find(|c| RESERVED_CHARS.contains(c)) {
            return Err(WorkspaceError::validation(format!(
                "name contains reserved character '{}'",
                c
            )));
        }
        if raw.chars().any(char::is_control) {
            return Err(WorkspaceError::validation(
                "name contains control characters",
            ));
        }
        if raw == "." || raw == ".." {
            return Err(WorkspaceError::validation("name cannot be '.' or '..'"));
        }
        Ok(EntryName(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A path that has passed the sandbox check, in both forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    relative: RelativePath,
    absolute: PathBuf,
}

impl ResolvedPath {
    pub fn relative(&self) -> &RelativePath {
        &self.relative
    }

    pub fn absolute(&self) -> &Path {
        &self.absolute
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.relative.fmt(f)
    }
}

/// The sandbox base directory.
///
/// Holds the canonical form of the root, so symlinked roots compare
/// correctly against canonicalized candidates.
#[derive(Debug, Clone)]
pub struct WorkspaceRoot {
    path: PathBuf,
}

impl WorkspaceRoot {
    /// Opens an existing directory as a workspace root.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, WorkspaceError> {
        let path = path.as_ref();
        let canonical = match path.canonicalize() {
            Ok(canonical) => canonical,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(WorkspaceError::not_found(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        if !canonical.is_dir() {
            return Err(WorkspaceError::validation(format!(
                "workspace root {} is not a directory",
                path.display()
            )));
        }
        Ok(Self { path: canonical })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolves an untrusted path string inside this root.
    pub fn resolve(&self, raw: &str) -> Result<ResolvedPath, WorkspaceError> {
        self.resolve_relative(normalize(raw)?)
    }

    /// Joins an already-normalized path to the root and verifies that its
    /// canonical form, or that of its deepest existing ancestor, is still
    /// inside the root. Catches escapes through symlinks.
    pub fn resolve_relative(&self, relative: RelativePath) -> Result<ResolvedPath, WorkspaceError> {
        let mut absolute = self.path.clone();
        for segment in relative.segments() {
            absolute.push(segment);
        }

        self.verify_contained(&absolute)?;

        Ok(ResolvedPath { relative, absolute })
    }

    /// Narrows the sandbox to an existing sub-directory. `None` or an empty
    /// scope keeps the current root.
    pub fn scoped(&self, scope: Option<&str>) -> Result<WorkspaceRoot, WorkspaceError> {
        let Some(scope) = scope else {
            return Ok(self.clone());
        };
        let resolved = self.resolve(scope)?;
        if resolved.relative().is_root() {
            return Ok(self.clone());
        }
        if !resolved.absolute().is_dir() {
            return Err(WorkspaceError::not_found(resolved.relative().to_string()));
        }
        WorkspaceRoot::new(resolved.absolute())
    }

    fn verify_contained(&self, absolute: &Path) -> Result<(), WorkspaceError> {
        let mut probe = absolute;
        loop {
            match probe.canonicalize() {
                Ok(canonical) => {
                    if canonical.starts_with(&self.path) {
                        return Ok(());
                    }
                    return Err(WorkspaceError::validation("path escapes workspace"));
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
                    ) =>
                {
                    probe = match probe.parent() {
                        Some(parent) => parent,
                        None => return Err(WorkspaceError::validation("path escapes workspace")),
                    };
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
