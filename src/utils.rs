//! Utility functions

use md5::Digest;
use path_slash::PathExt as _;
use std::{
    fmt,
    path::{Path, PathBuf},
};

/// Extensions of files in the statically typed language.
pub const TS_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts"];

/// Extensions of files in the dynamically typed dialect.
pub const JS_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs"];

/// Declaration-file suffixes. Checked before the plain extension predicates
/// since `.d.ts` also carries the `ts` extension.
pub const DECLARATION_SUFFIXES: &[&str] = &[".d.ts", ".d.mts", ".d.cts"];

fn file_name_str(file: &Path) -> Option<&str> {
    file.file_name().and_then(|s| s.to_str())
}

/// Returns `true` for declaration files (`.d.ts` and friends).
pub fn is_declaration_file(file: &Path) -> bool {
    file_name_str(file)
        .map(|name| DECLARATION_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)))
        .unwrap_or_default()
}

/// Returns `true` for files with a TypeScript extension, declaration files
/// included.
pub fn has_ts_extension(file: &Path) -> bool {
    file.extension()
        .and_then(|e| e.to_str())
        .map(|ext| TS_EXTENSIONS.contains(&ext))
        .unwrap_or_default()
}

/// Returns `true` for files with a JavaScript extension.
pub fn has_js_extension(file: &Path) -> bool {
    file.extension()
        .and_then(|e| e.to_str())
        .map(|ext| JS_EXTENSIONS.contains(&ext))
        .unwrap_or_default()
}

/// Returns `true` for JavaScript sources and declaration files, the two file
/// classes that never contribute checked TypeScript to a program.
pub fn is_js_or_dts(file: &Path) -> bool {
    has_js_extension(file) || is_declaration_file(file)
}

/// Case-folded, slash-normalized form of a path, used as the stable key of
/// every per-file map in the core.
///
/// The user-facing spelling of a file name is kept separately (`PathBuf`);
/// two spellings that canonicalize equally refer to the same file.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalPath(PathBuf);

impl CanonicalPath {
    /// Canonicalizes `file_name`: simplifies verbatim prefixes, normalizes
    /// separators to `/` and folds case on case-insensitive hosts.
    pub fn new(file_name: &Path, use_case_sensitive_file_names: bool) -> Self {
        let slashed = dunce::simplified(file_name).to_slash_lossy();
        let canonical = if use_case_sensitive_file_names {
            slashed.into_owned()
        } else {
            slashed.to_lowercase()
        };
        CanonicalPath(PathBuf::from(canonical))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl AsRef<Path> for CanonicalPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Returns the directory portion of `file`, or `.` at the root.
pub fn directory_of(file: &Path) -> PathBuf {
    file.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."))
}

/// Walks two sorted, deduplicated sequences and reports every element present
/// only in `new` (`inserted`) or only in `old` (`deleted`).
pub fn enumerate_inserts_and_deletes<'a, T: Ord>(
    new: &'a [T],
    old: &'a [T],
    mut inserted: impl FnMut(&'a T),
    mut deleted: impl FnMut(&'a T),
) {
    let mut new_iter = new.iter().peekable();
    let mut old_iter = old.iter().peekable();
    loop {
        match (new_iter.peek(), old_iter.peek()) {
            (Some(n), Some(o)) => match n.cmp(o) {
                std::cmp::Ordering::Less => inserted(new_iter.next().unwrap()),
                std::cmp::Ordering::Greater => deleted(old_iter.next().unwrap()),
                std::cmp::Ordering::Equal => {
                    new_iter.next();
                    old_iter.next();
                }
            },
            (Some(_), None) => inserted(new_iter.next().unwrap()),
            (None, Some(_)) => deleted(old_iter.next().unwrap()),
            (None, None) => break,
        }
    }
}

/// md5 hex digest of `content`, the default content-hash used by hosts.
pub fn content_hash(content: &str) -> String {
    let mut hasher = md5::Md5::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
