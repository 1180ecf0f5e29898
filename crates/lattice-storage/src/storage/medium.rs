//! Medium metadata and the enumeration cache.

use std::collections::HashMap;

use lattice_storage_core::Signal;
use lattice_storage_core::logging::targets;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::DeviceType;

/// Identifier of a medium (disk image or host drive).
pub type MediumId = Uuid;

/// Display metadata of an enumerated medium.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Medium {
    /// Medium identifier.
    pub id: MediumId,
    /// Device type the medium can be attached as.
    pub device_type: Option<DeviceType>,
    /// Short name, usually the file name.
    pub name: String,
    /// Tooltip text.
    #[serde(default)]
    pub tool_tip: String,
    /// Whether this is a drive of the host rather than an image.
    #[serde(default)]
    pub host_drive: bool,
    /// Actual size, formatted.
    #[serde(default)]
    pub size: String,
    /// Virtual size, formatted.
    #[serde(default)]
    pub logical_size: String,
    /// Location on the host.
    #[serde(default)]
    pub location: String,
    /// Hard disk variant, such as "Normal".
    #[serde(default)]
    pub disk_type: String,
    /// Image format, such as "VDI".
    #[serde(default)]
    pub disk_format: String,
    /// Storage details, such as "Dynamically allocated storage".
    #[serde(default)]
    pub storage_details: String,
    /// Names of machines using the medium.
    #[serde(default)]
    pub usage: String,
    /// Encryption password id, when the medium is encrypted.
    #[serde(default)]
    pub encryption_password_id: Option<String>,
}

/// Source of medium metadata.
pub trait MediumEnumerator: Send + Sync {
    /// Metadata for `id`, or `None` if the medium is unknown.
    fn medium(&self, id: &MediumId) -> Option<Medium>;
}

/// In-memory medium registry with change notification.
///
/// Hosts feed it from their medium enumeration and connect the editor to its
/// signals; see `StorageSettingsEditor::connect_medium_cache`.
#[derive(Default)]
pub struct MediumCache {
    media: RwLock<HashMap<MediumId, Medium>>,
    medium_enumerated: Signal<MediumId>,
    medium_deleted: Signal<MediumId>,
}

impl MediumCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or refreshes a medium and emits `medium_enumerated`.
    pub fn insert(&self, medium: Medium) {
        let id = medium.id;
        self.media.write().insert(id, medium);
        tracing::debug!(target: targets::MEDIUM, %id, "medium enumerated");
        self.medium_enumerated.emit(id);
    }

    /// Removes a medium, emitting `medium_deleted` if it was known.
    pub fn remove(&self, id: &MediumId) -> Option<Medium> {
        let removed = self.media.write().remove(id);
        if removed.is_some() {
            tracing::debug!(target: targets::MEDIUM, %id, "medium deleted");
            self.medium_deleted.emit(*id);
        }
        removed
    }

    /// Number of known media.
    pub fn len(&self) -> usize {
        self.media.read().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.media.read().is_empty()
    }

    /// Emitted after a medium is added or refreshed.
    pub fn medium_enumerated(&self) -> &Signal<MediumId> {
        &self.medium_enumerated
    }

    /// Emitted after a medium is removed.
    pub fn medium_deleted(&self) -> &Signal<MediumId> {
        &self.medium_deleted
    }
}

impl MediumEnumerator for MediumCache {
    fn medium(&self, id: &MediumId) -> Option<Medium> {
        self.media.read().get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_cache_insert_and_lookup() {
        let cache = MediumCache::new();
        let id = Uuid::new_v4();
        cache.insert(Medium {
            id,
            name: "disk.vdi".into(),
            ..Default::default()
        });

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.medium(&id).map(|m| m.name), Some("disk.vdi".to_string()));
        assert!(cache.medium(&Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_cache_signals() {
        let cache = MediumCache::new();
        let enumerated = Arc::new(AtomicUsize::new(0));
        let deleted = Arc::new(AtomicUsize::new(0));

        let counter = enumerated.clone();
        cache.medium_enumerated().connect(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = deleted.clone();
        cache.medium_deleted().connect(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let id = Uuid::new_v4();
        cache.insert(Medium { id, ..Default::default() });
        cache.insert(Medium { id, ..Default::default() });
        assert!(cache.remove(&id).is_some());
        assert!(cache.remove(&id).is_none());

        assert_eq!(enumerated.load(Ordering::SeqCst), 2);
        assert_eq!(deleted.load(Ordering::SeqCst), 1);
        assert!(cache.is_empty());
    }
}
