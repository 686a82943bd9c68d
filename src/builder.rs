//! Builder API for configuring a sync.
//!
//! The builder is a fluent front end over [`SyncOptions`] and
//! [`sync_dir`](crate::sync_dir).
//!
//! # Examples
//!
//! ```no_run
//! use marksync::SyncBuilder;
//!
//! let stats = SyncBuilder::new("photos", "/mnt/backup/photos")
//!     .parallel(8)
//!     .run()?;
//! println!("Copied {} files", stats.files_copied);
//! # Ok::<(), marksync::Error>(())
//! ```
//!
//! ## Checking for interrupted transfers first
//!
//! ```no_run
//! use marksync::SyncBuilder;
//!
//! let builder = SyncBuilder::new("src", "dst");
//! let pending = builder.scan_orphans().count();
//! if pending > 0 {
//!     println!("{pending} incomplete transfers will resume");
//! }
//! let stats = builder.run()?;
//! # Ok::<(), marksync::Error>(())
//! ```

use crate::error::Result;
use crate::options::{FailurePolicy, SyncOptions};
use crate::sync::{OrphanScan, SyncStats, scan_orphans, sync_dir};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// A builder for configuring and running a sync.
///
/// # Example
///
/// ```no_run
/// use marksync::SyncBuilder;
///
/// let stats = SyncBuilder::new("/data/project", "/backup/project")
///     .parallel(4)
///     .remove_marker_on_failure()
///     .run()?;
/// # Ok::<(), marksync::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct SyncBuilder {
    src: PathBuf,
    dst: PathBuf,
    options: SyncOptions,
}

impl SyncBuilder {
    /// Create a builder with default options (sequential, markers kept on
    /// failure, timestamps and permissions preserved, fsync on).
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dst: Q) -> Self {
        Self {
            src: src.as_ref().to_path_buf(),
            dst: dst.as_ref().to_path_buf(),
            options: SyncOptions::default(),
        }
    }

    /// Set the number of worker threads. Default is 1.
    #[must_use]
    pub fn parallel(mut self, threads: usize) -> Self {
        self.options = self.options.with_parallel(threads);
        self
    }

    /// Set what happens to a marker when its copy fails.
    #[must_use]
    pub fn on_failure(mut self, policy: FailurePolicy) -> Self {
        self.options = self.options.with_on_failure(policy);
        self
    }

    /// Leave the marker behind after a failed copy (default), so the next
    /// run redoes the file.
    #[must_use]
    pub fn keep_marker_on_failure(self) -> Self {
        self.on_failure(FailurePolicy::KeepMarker)
    }

    /// Remove the marker after a failed copy.
    ///
    /// The partial destination then looks like a normal file to the next
    /// run and is only replaced if the source is newer.
    #[must_use]
    pub fn remove_marker_on_failure(self) -> Self {
        self.on_failure(FailurePolicy::RemoveMarker)
    }

    /// Disable fsync of markers and copied files.
    ///
    /// Faster, but a crash may leave a copied file incomplete with no marker
    /// to flag it.
    #[must_use]
    pub fn no_fsync(mut self) -> Self {
        self.options = self.options.without_fsync();
        self
    }

    /// Do not copy modification and access times.
    #[must_use]
    pub fn no_timestamps(mut self) -> Self {
        self.options = self.options.without_timestamps();
        self
    }

    /// Do not copy permission bits.
    #[must_use]
    pub fn no_permissions(mut self) -> Self {
        self.options = self.options.without_permissions();
        self
    }

    /// Limit recursion depth. Depth 0 syncs only top-level files.
    #[must_use]
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.options = self.options.with_max_depth(depth);
        self
    }

    /// Set a cancellation token for cooperative cancellation.
    ///
    /// When the token is set, no new files are started and the run returns
    /// [`Error::Cancelled`](crate::Error::Cancelled). A file already in
    /// progress finishes its marker protocol first.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use marksync::SyncBuilder;
    /// use std::sync::Arc;
    /// use std::sync::atomic::AtomicBool;
    ///
    /// let cancel = Arc::new(AtomicBool::new(false));
    /// let result = SyncBuilder::new("src", "dst")
    ///     .cancel_token(cancel.clone())
    ///     .run();
    /// ```
    #[must_use]
    pub fn cancel_token(mut self, token: Arc<AtomicBool>) -> Self {
        self.options = self.options.with_cancel_token(token);
        self
    }

    /// Set a handler for warnings (failed files, skipped entries, files
    /// flagged for review).
    ///
    /// # Example
    ///
    /// ```no_run
    /// use marksync::SyncBuilder;
    ///
    /// let stats = SyncBuilder::new("src", "dst")
    ///     .on_warning(|msg| eprintln!("Warning: {}", msg))
    ///     .run()?;
    /// # Ok::<(), marksync::Error>(())
    /// ```
    #[must_use]
    pub fn on_warning(mut self, handler: fn(&str)) -> Self {
        self.options = self.options.with_warn_handler(handler);
        self
    }

    /// Set a handler for per-file progress messages.
    #[must_use]
    pub fn verbose(mut self, handler: fn(&str)) -> Self {
        self.options = self.options.with_verbose_handler(handler);
        self
    }

    /// Get a reference to the current options.
    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Count markers left under the destination by interrupted runs.
    pub fn scan_orphans(&self) -> OrphanScan {
        scan_orphans(&self.dst, &self.options)
    }

    /// Run the sync.
    ///
    /// # Errors
    ///
    /// See [`sync_dir`](crate::sync_dir).
    pub fn run(self) -> Result<SyncStats> {
        sync_dir(&self.src, &self.dst, &self.options)
    }
}
