//! User confirmations requested by destructive edits.

/// Asks the user to approve edits that drop attachments.
///
/// Every method blocks until the user answers and returns `true` to
/// proceed. Implementations backed by dialogs run on the UI thread.
pub trait MessageCenter: Send + Sync {
    /// Moving `controller` to `bus` requires removing its optical drives.
    fn confirm_bus_change_with_optical_removal(&self, controller: &str, bus: &str) -> bool;

    /// Moving `controller` to `bus` leaves room for fewer devices, so
    /// `excess` attachments have to go.
    fn confirm_bus_change_with_excessive_removal(&self, controller: &str, bus: &str, excess: usize) -> bool;

    /// The optical drive about to be removed is the machine's last one.
    fn confirm_removing_last_optical_drive(&self, controller: &str) -> bool;
}

/// Approves everything without asking.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl MessageCenter for AcceptAll {
    fn confirm_bus_change_with_optical_removal(&self, _controller: &str, _bus: &str) -> bool {
        true
    }

    fn confirm_bus_change_with_excessive_removal(&self, _controller: &str, _bus: &str, _excess: usize) -> bool {
        true
    }

    fn confirm_removing_last_optical_drive(&self, _controller: &str) -> bool {
        true
    }
}
