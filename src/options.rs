//! Configuration options for sync operations.
//!
//! This module provides [`SyncOptions`] for configuring the walk and the
//! guarded copy, and [`FailurePolicy`] for deciding what happens to a
//! transfer marker when its copy fails.
//!
//! # Example
//!
//! ```
//! use marksync::{FailurePolicy, SyncOptions};
//!
//! let options = SyncOptions::default()
//!     .with_parallel(4)
//!     .with_on_failure(FailurePolicy::RemoveMarker)
//!     .with_max_depth(64);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// What to do with the transfer marker when a guarded copy fails.
///
/// # Default
///
/// The default is [`FailurePolicy::KeepMarker`], which makes the next run
/// retry the file regardless of timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum FailurePolicy {
    /// Leave the marker in place (default).
    ///
    /// A later run sees the marker and redoes the copy, giving
    /// at-least-once retry semantics for unattended runs.
    #[default]
    KeepMarker,
    /// Remove the marker on a best-effort basis.
    ///
    /// The failure is still reported; a failed removal is ignored so it
    /// never hides the copy error. Suited to interactive runs where the
    /// operator reacts to the failure immediately.
    RemoveMarker,
}

/// Options for sync operations.
///
/// # Default Values
///
/// | Field | Default | Description |
/// |-------|---------|-------------|
/// | `parallel` | 1 | Worker threads (1 = sequential walk) |
/// | `on_failure` | `KeepMarker` | Marker handling on copy failure |
/// | `preserve_permissions` | `true` | Copy file permissions |
/// | `preserve_timestamps` | `true` | Copy file timestamps (mtime/atime) |
/// | `fsync` | `true` | Sync marker and file to disk |
/// | `max_depth` | `None` | No depth limit |
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SyncOptions {
    /// Number of worker threads (default: 1)
    ///
    /// Sibling files and subdirectories are processed concurrently when
    /// greater than 1. Results are identical to the sequential walk.
    pub parallel: usize,

    /// Marker handling when a copy fails
    pub on_failure: FailurePolicy,

    /// Whether to preserve file permissions (default: true)
    pub preserve_permissions: bool,

    /// Whether to preserve file timestamps (default: true)
    ///
    /// With timestamps preserved, the destination mtime equals the source
    /// mtime after a copy, so an unchanged source is reported up-to-date
    /// on the next run.
    pub preserve_timestamps: bool,

    /// Whether to sync the marker and copied file to disk (default: true)
    ///
    /// The marker must be durable before copying starts for a power loss
    /// to be detectable on the next run.
    pub fsync: bool,

    /// Maximum directory depth to traverse (default: None = unlimited)
    ///
    /// Directories below the limit are skipped with a warning.
    pub max_depth: Option<usize>,

    /// Callback for warnings (optional)
    ///
    /// If not set and `tracing` feature is enabled, warnings are logged via tracing.
    /// Otherwise, warnings are silently ignored.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub warn_handler: Option<fn(&str)>,

    /// Callback for per-file events (optional)
    ///
    /// If not set and `tracing` feature is enabled, events are logged at debug level.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub verbose_handler: Option<fn(&str)>,

    /// Cancellation token checked before each file
    #[cfg_attr(feature = "serde", serde(skip))]
    pub cancel_token: Option<Arc<AtomicBool>>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            parallel: 1,
            on_failure: FailurePolicy::KeepMarker,
            preserve_permissions: true,
            preserve_timestamps: true,
            fsync: true,
            max_depth: None,
            warn_handler: None,
            verbose_handler: None,
            cancel_token: None,
        }
    }
}

impl SyncOptions {
    /// Create options with a warning handler
    #[must_use]
    pub fn with_warn_handler(mut self, handler: fn(&str)) -> Self {
        self.warn_handler = Some(handler);
        self
    }

    /// Create options with a handler for per-file events
    #[must_use]
    pub fn with_verbose_handler(mut self, handler: fn(&str)) -> Self {
        self.verbose_handler = Some(handler);
        self
    }

    /// Set the number of worker threads
    ///
    /// Value is clamped to at least 1.
    #[must_use]
    pub fn with_parallel(mut self, n: usize) -> Self {
        self.parallel = n.max(1);
        self
    }

    /// Set the marker failure policy
    #[must_use]
    pub fn with_on_failure(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }

    /// Disable fsync for faster (but less crash-safe) syncs
    #[must_use]
    pub fn without_fsync(mut self) -> Self {
        self.fsync = false;
        self
    }

    /// Set maximum directory depth
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Disable timestamp preservation
    ///
    /// Copied files get the current time as mtime, which is still newer
    /// than the source, so the next run skips them.
    #[must_use]
    pub fn without_timestamps(mut self) -> Self {
        self.preserve_timestamps = false;
        self
    }

    /// Disable permission preservation
    #[must_use]
    pub fn without_permissions(mut self) -> Self {
        self.preserve_permissions = false;
        self
    }

    /// Attach a cancellation token
    ///
    /// Setting the flag stops the walk before the next file. Copies already
    /// in flight complete their marker protocol first.
    #[must_use]
    pub fn with_cancel_token(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancel_token = Some(token);
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel_token
            .as_ref()
            .is_some_and(|t| t.load(Ordering::Relaxed))
    }

    pub(crate) fn warn(&self, msg: &str) {
        if let Some(handler) = self.warn_handler {
            handler(msg);
        } else {
            #[cfg(feature = "tracing")]
            tracing::warn!("{}", msg);
        }
    }

    pub(crate) fn verbose(&self, msg: &str) {
        if let Some(handler) = self.verbose_handler {
            handler(msg);
        } else {
            #[cfg(feature = "tracing")]
            tracing::debug!("{}", msg);
        }
    }
}
