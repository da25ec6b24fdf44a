//! Per-file cache of bare module specifiers that failed resolution.
//!
//! The typings helper decides what to auto-acquire from the union of these
//! specifiers, so the index trims each failed specifier down to its package
//! prefix: `lodash/fp` contributes `lodash`, `@scope/pkg/sub` contributes
//! `@scope/pkg`. Relative specifiers never contribute.

use crate::{program::ProgramFile, utils::CanonicalPath};
use std::{collections::BTreeMap, rc::Rc};

/// Versioned path → specifier-list cache. Entries are inserted on first
/// extraction, dropped when the file's resolutions change, and cleared
/// wholesale when compiler options affect module resolution.
#[derive(Debug, Default)]
pub struct UnresolvedImportsIndex {
    per_file: BTreeMap<CanonicalPath, Rc<[String]>>,
    version: usize,
}

impl UnresolvedImportsIndex {
    pub fn get(&self, path: &CanonicalPath) -> Option<Rc<[String]>> {
        self.per_file.get(path).cloned()
    }

    pub fn insert(&mut self, path: CanonicalPath, imports: Rc<[String]>) {
        self.per_file.insert(path, imports);
        self.version += 1;
    }

    pub fn remove(&mut self, path: &CanonicalPath) {
        if self.per_file.remove(path).is_some() {
            self.version += 1;
        }
    }

    pub fn clear(&mut self) {
        if !self.per_file.is_empty() {
            self.per_file.clear();
        }
        self.version += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.per_file.is_empty()
    }

    pub fn len(&self) -> usize {
        self.per_file.len()
    }

    pub fn version(&self) -> usize {
        self.version
    }
}

/// Returns `true` for specifiers resolved relative to the importing file.
fn is_relative_specifier(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier.starts_with('/')
}

/// Trims a bare specifier to its package prefix: the segment before the
/// first `/`, or before the second `/` for scoped packages.
fn package_prefix(specifier: &str) -> &str {
    let mut slashes = specifier.match_indices('/');
    let cut = if specifier.starts_with('@') {
        slashes.nth(1).map(|(idx, _)| idx)
    } else {
        slashes.next().map(|(idx, _)| idx)
    };
    match cut {
        Some(idx) => &specifier[..idx],
        None => specifier,
    }
}

/// Collects the unresolved package names of `file` into `sink`, consulting
/// and populating the per-file cache. An empty cached list is a valid
/// sentinel and short-circuits later extractions.
pub fn extract_unresolved_imports(
    file: &ProgramFile,
    index: &mut UnresolvedImportsIndex,
    sink: &mut Vec<String>,
) {
    if let Some(cached) = index.get(&file.path) {
        sink.extend(cached.iter().cloned());
        return;
    }
    let mut entry = Vec::new();
    for (specifier, resolved) in &file.resolved_modules {
        let specifier = specifier.trim();
        if resolved.is_none() && !is_relative_specifier(specifier) {
            entry.push(package_prefix(specifier).to_string());
        }
    }
    sink.extend(entry.iter().cloned());
    index.insert(file.path.clone(), entry.into());
}
