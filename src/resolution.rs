//! The seam to the external module resolver.
//!
//! The resolver memoizes (containing file, specifier) lookups and ties their
//! invalidation to failed-lookup watchers it owns itself. The core only
//! steers it: invalidate a file, bracket a graph update with a recording
//! window, and query the per-file invalidation predicate that is published to
//! the compilation engine.

use crate::utils::CanonicalPath;

pub trait ResolutionCache {
    /// Drops cached resolutions for the given containing file.
    fn invalidate(&self, path: &CanonicalPath);

    /// Starts recording files whose resolutions change. Windows do not nest.
    fn start_recording_changes(&self);

    /// Ends the recording window, returning every containing file whose
    /// resolution results changed during it.
    fn finish_recording_changes(&self) -> Vec<CanonicalPath>;

    /// Snapshot predicate: `true` if the file's cached resolutions must not
    /// be reused by the current program synchronization.
    fn has_invalidated_resolution(&self, path: &CanonicalPath) -> bool;

    /// Drops every cached resolution. Used when compiler options change in
    /// ways that affect module resolution.
    fn clear(&self);

    /// Releases the resolver's failed-lookup watchers. Called once, when the
    /// owning project closes.
    fn close(&self);
}
