//! Integration tests for properties paired with change signals.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use lattice_storage_core::{Property, Signal};
use parking_lot::Mutex;

struct ControllerSettings {
    name: Property<String>,
    io_cache: Property<bool>,
    name_changed: Signal<String>,
    io_cache_changed: Signal<bool>,
}

impl ControllerSettings {
    fn new(name: &str) -> Self {
        Self {
            name: Property::new(name.to_string()),
            io_cache: Property::new(false),
            name_changed: Signal::new(),
            io_cache_changed: Signal::new(),
        }
    }

    fn set_name(&self, name: &str) {
        if self.name.set(name.to_string()) {
            self.name_changed.emit(name.to_string());
        }
    }

    fn set_io_cache(&self, enabled: bool) {
        if self.io_cache.set(enabled) {
            self.io_cache_changed.emit(enabled);
        }
    }
}

#[test]
fn test_notification_only_on_change() {
    let settings = ControllerSettings::new("IDE");
    let names = Arc::new(Mutex::new(Vec::new()));

    let names_clone = names.clone();
    settings.name_changed.connect(move |name| {
        names_clone.lock().push(name.clone());
    });

    settings.set_name("IDE");
    settings.set_name("SATA");
    settings.set_name("SATA");
    settings.set_name("NVMe");

    assert_eq!(*names.lock(), vec!["SATA".to_string(), "NVMe".to_string()]);
    assert_eq!(settings.name.get(), "NVMe");
}

#[test]
fn test_independent_signals() {
    let settings = ControllerSettings::new("Floppy");
    let toggles = Arc::new(AtomicUsize::new(0));

    let toggles_clone = toggles.clone();
    settings.io_cache_changed.connect(move |_| {
        toggles_clone.fetch_add(1, Ordering::SeqCst);
    });

    settings.set_io_cache(true);
    settings.set_io_cache(true);
    settings.set_io_cache(false);
    settings.set_name("Floppy 2");

    assert_eq!(toggles.load(Ordering::SeqCst), 2);
    assert_eq!(settings.name_changed.connection_count(), 0);
}

#[test]
fn test_shared_signal_across_threads() {
    let signal = Arc::new(Signal::<u32>::new());
    let total = Arc::new(AtomicUsize::new(0));

    let total_clone = total.clone();
    signal.connect(move |value| {
        total_clone.fetch_add(*value as usize, Ordering::SeqCst);
    });

    let worker = {
        let signal = signal.clone();
        std::thread::spawn(move || signal.emit(5))
    };
    worker.join().expect("worker thread panicked");
    signal.emit(2);

    assert_eq!(total.load(Ordering::SeqCst), 7);
}
