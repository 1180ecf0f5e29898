//! Medium pickers the editor delegates to.

use crate::storage::{DeviceType, MediumId};

/// Outcome of the medium selector dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediumSelection {
    /// The user picked a medium. A `None` id counts as no choice.
    Accepted(Option<MediumId>),
    /// The user chose to leave the drive empty.
    LeftEmpty,
    /// The dialog was dismissed.
    Rejected,
}

impl MediumSelection {
    /// Medium to attach for a drive of `device_type`.
    ///
    /// The outer `None` means abort. Leaving a drive empty is only possible
    /// for removable devices.
    pub fn resolve(self, device_type: DeviceType) -> Option<Option<MediumId>> {
        match self {
            Self::Accepted(Some(id)) => Some(Some(id)),
            Self::Accepted(None) | Self::Rejected => None,
            Self::LeftEmpty => device_type.allows_empty().then_some(None),
        }
    }
}

/// Modal pickers used to choose media.
///
/// Calls block until the dialog is dismissed.
pub trait MediumSelector: Send + Sync {
    /// Open the medium selector for a drive of `device_type`, preselecting
    /// `current`.
    fn select_medium(&self, device_type: DeviceType, current: Option<MediumId>) -> MediumSelection;

    /// Open a file dialog and register the chosen image. `None` if
    /// cancelled.
    fn open_medium_file(&self, device_type: DeviceType) -> Option<MediumId>;
}

/// Selector that never picks anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSelection;

impl MediumSelector for NoSelection {
    fn select_medium(&self, _device_type: DeviceType, _current: Option<MediumId>) -> MediumSelection {
        MediumSelection::Rejected
    }

    fn open_medium_file(&self, _device_type: DeviceType) -> Option<MediumId> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_resolve() {
        let id = Uuid::new_v4();
        assert_eq!(MediumSelection::Accepted(Some(id)).resolve(DeviceType::HardDisk), Some(Some(id)));
        assert_eq!(MediumSelection::Accepted(None).resolve(DeviceType::Dvd), None);
        assert_eq!(MediumSelection::Rejected.resolve(DeviceType::Dvd), None);
        assert_eq!(MediumSelection::LeftEmpty.resolve(DeviceType::Floppy), Some(None));
        assert_eq!(MediumSelection::LeftEmpty.resolve(DeviceType::HardDisk), None);
    }
}
