//! Event filtering rules.
//!
//! Filtering happens after coalescing and before index application, so a
//! storm on an excluded path costs one dropped event, not a scan.

use camino::{Utf8Path, Utf8PathBuf};

use ff_core::{FxHashSet, SizeRange};

use crate::events::{ChangeEvent, ChangeKind};

/// Declarative accept/reject rules for change events.
///
/// An empty filter accepts everything. Rules compose as AND: an event must
/// clear every configured rule to pass.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use ff_watcher::{ChangeEvent, EventFilter};
///
/// let filter = EventFilter::new().exclude_extension("tmp");
///
/// assert!(filter.accepts(&ChangeEvent::created(Utf8PathBuf::from("/a.txt"))));
/// assert!(!filter.accepts(&ChangeEvent::created(Utf8PathBuf::from("/a.tmp"))));
/// ```
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    exclude_paths: Vec<Utf8PathBuf>,
    exclude_extensions: FxHashSet<String>,
    allowed_kinds: Option<FxHashSet<ChangeKind>>,
    size_range: Option<SizeRange>,
}

impl EventFilter {
    /// Creates a filter that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects events under this path prefix.
    #[must_use]
    pub fn exclude_path(mut self, prefix: Utf8PathBuf) -> Self {
        self.exclude_paths.push(prefix);
        self
    }

    /// Rejects events whose file carries this extension
    /// (case-insensitive).
    #[must_use]
    pub fn exclude_extension(mut self, extension: impl AsRef<str>) -> Self {
        self.exclude_extensions
            .insert(extension.as_ref().trim_start_matches('.').to_lowercase());
        self
    }

    /// Restricts accepted events to these kinds.
    #[must_use]
    pub fn allow_kinds(mut self, kinds: impl IntoIterator<Item = ChangeKind>) -> Self {
        self.allowed_kinds = Some(kinds.into_iter().collect());
        self
    }

    /// Rejects create/modify events whose file size is outside the range.
    ///
    /// Deletions always pass a size rule (the file is gone).
    #[must_use]
    pub fn size_range(mut self, range: SizeRange) -> Self {
        self.size_range = Some(range);
        self
    }

    /// Seeds the path/extension rules from the indexing configuration.
    #[must_use]
    pub fn from_config(config: &ff_core::IndexingConfig) -> Self {
        let mut filter = Self::new();
        filter.exclude_paths = config.exclude_paths.clone();
        filter.exclude_extensions = config
            .exclude_extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .collect();
        filter
    }

    /// Returns `true` when the event clears every configured rule.
    #[must_use]
    pub fn accepts(&self, event: &ChangeEvent) -> bool {
        if let Some(kinds) = &self.allowed_kinds {
            if !kinds.contains(&event.kind) {
                return false;
            }
        }
        if self.is_path_excluded(&event.path) {
            return false;
        }
        if let Some(ext) = event.extension() {
            if self.exclude_extensions.contains(&ext.to_lowercase()) {
                return false;
            }
        }
        if let Some(range) = self.size_range {
            if event.kind != ChangeKind::Deleted {
                if let Ok(metadata) = std::fs::symlink_metadata(event.path.as_std_path()) {
                    if !metadata.is_dir() && !range.contains(metadata.len()) {
                        return false;
                    }
                }
            }
        }
        true
    }

    fn is_path_excluded(&self, path: &Utf8Path) -> bool {
        self.exclude_paths
            .iter()
            .any(|prefix| path.starts_with(prefix))
    }
}
