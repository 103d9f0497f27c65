//! Integration tests for managedalloc.

use std::borrow::Cow;
use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use managedalloc::diagnostics::{self, CollectingSink, DiagnosticKind};
use managedalloc::{
    AllocError, DeviceBuffer, DeviceMemoryResource, DiagnosticsConfig, HostBackend,
    ManagedMemoryResource, StatusCode, Stream, UnifiedMemoryBackend, MANAGED_ALIGNMENT,
};

/// Serializes tests that touch process-wide diagnostics state.
static GLOBAL_STATE: Mutex<()> = Mutex::new(());

fn lock_globals() -> MutexGuard<'static, ()> {
    GLOBAL_STATE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Test double for the primitive: records calls and fails on demand.
#[derive(Default)]
struct RecordingBackend {
    host: HostBackend,
    fail_allocations: AtomicBool,
    fail_releases: AtomicBool,
    allocations: AtomicUsize,
    releases: AtomicUsize,
}

impl RecordingBackend {
    fn failing() -> Self {
        let backend = Self::default();
        backend.fail_allocations.store(true, Ordering::Relaxed);
        backend
    }
}

impl UnifiedMemoryBackend for RecordingBackend {
    const ALLOCATE_PRIMITIVE: &'static str = "recordMallocManaged";
    const RELEASE_PRIMITIVE: &'static str = "recordFree";

    fn allocate_managed(&self, bytes: usize) -> Result<NonNull<u8>, StatusCode> {
        assert_ne!(bytes, 0, "zero-byte request reached the primitive");
        self.allocations.fetch_add(1, Ordering::Relaxed);
        if self.fail_allocations.load(Ordering::Relaxed) {
            return Err(StatusCode::MEMORY_ALLOCATION);
        }
        self.host.allocate_managed(bytes)
    }

    unsafe fn release(&self, ptr: *mut u8) -> Result<(), StatusCode> {
        self.releases.fetch_add(1, Ordering::Relaxed);
        if self.fail_releases.load(Ordering::Relaxed) {
            return Err(StatusCode(700));
        }
        self.host.release(ptr)
    }

    fn error_name(&self, status: StatusCode) -> Cow<'static, str> {
        Cow::Owned(format!("recordError{}", status.0))
    }

    fn error_string(&self, _status: StatusCode) -> Cow<'static, str> {
        Cow::Borrowed("simulated failure")
    }
}

fn stream(raw: usize) -> Stream {
    Stream::from_raw(raw as *mut c_void)
}

#[test]
fn test_zero_bytes_never_reaches_primitive() {
    let mr = ManagedMemoryResource::with_backend(RecordingBackend::default());

    for s in [Stream::DEFAULT, stream(0x10), stream(0xdead0)] {
        let ptr = mr.allocate(0, s).unwrap();
        assert!(ptr.is_null());
    }

    assert_eq!(mr.backend().allocations.load(Ordering::Relaxed), 0);
}

#[test]
fn test_allocations_aligned_for_any_stream() {
    let mr = ManagedMemoryResource::with_backend(HostBackend::new());

    for (i, s) in [Stream::DEFAULT, stream(0x20), stream(0x30)].into_iter().enumerate() {
        let bytes = 100 + i * 1000;
        let ptr = mr.allocate(bytes, s).unwrap();
        assert!(!ptr.is_null());
        assert_eq!(ptr as usize % MANAGED_ALIGNMENT, 0);
        unsafe { mr.deallocate(ptr, bytes, s) };
    }

    assert_eq!(mr.backend().live_allocations(), 0);
}

#[test]
fn test_failure_is_out_of_memory() {
    let mr = ManagedMemoryResource::with_backend(RecordingBackend::failing());

    let err = mr.allocate(1 << 40, Stream::DEFAULT).unwrap_err();
    assert!(err.is_out_of_memory());
    assert_eq!(err, AllocError::OutOfMemory { bytes: 1 << 40 });
    assert_eq!(
        err.to_string(),
        "out of memory: could not satisfy request of 1099511627776 bytes"
    );

    // No retry.
    assert_eq!(mr.backend().allocations.load(Ordering::Relaxed), 1);
}

#[test]
fn test_host_capacity_failure() {
    let mr = ManagedMemoryResource::with_backend(HostBackend::with_capacity(1 << 20));

    let ok = mr.allocate(1 << 19, Stream::DEFAULT).unwrap();
    let err = mr.allocate(1 << 20, Stream::DEFAULT).unwrap_err();
    assert_eq!(err.requested_bytes(), 1 << 20);

    unsafe { mr.deallocate(ok, 1 << 19, Stream::DEFAULT) };
    assert_eq!(mr.backend().bytes_in_use(), 0);
}

#[test]
fn test_supports_streams_is_constant() {
    let mr = ManagedMemoryResource::with_backend(RecordingBackend::failing());
    assert!(!mr.supports_streams());
    let _ = mr.allocate(64, stream(0x40));
    assert!(!mr.supports_streams());
}

#[test]
fn test_deallocate_null_any_stream() {
    let mr = ManagedMemoryResource::with_backend(HostBackend::new());

    unsafe {
        mr.deallocate(std::ptr::null_mut(), 0, Stream::DEFAULT);
        mr.deallocate(std::ptr::null_mut(), 4096, stream(0x50));
    }

    assert_eq!(mr.backend().release_calls(), 2);
}

#[test]
fn test_round_trip_across_streams() {
    let mr = ManagedMemoryResource::with_backend(HostBackend::new());

    let ptr = mr.allocate(2048, stream(0x60)).unwrap();
    unsafe { mr.deallocate(ptr, 2048, stream(0x70)) };

    assert_eq!(mr.backend().live_allocations(), 0);
}

#[test]
fn test_scenario_host_access() {
    let mr = ManagedMemoryResource::with_backend(HostBackend::new());

    let ptr = mr.allocate(1024, Stream::DEFAULT).unwrap();
    assert!(!ptr.is_null());
    assert_eq!(ptr as usize % 256, 0);

    unsafe {
        for i in 0..1024 {
            *ptr.add(i) = (i % 251) as u8;
        }
        assert_eq!(*ptr.add(1000), (1000 % 251) as u8);
        mr.deallocate(ptr, 1024, Stream::DEFAULT);
    }
}

// Deallocating the same address twice is a caller error with unspecified
// behavior; it is intentionally not exercised here.

#[test]
fn test_release_failure_is_absorbed_and_reported() {
    let _guard = lock_globals();
    let sink = Arc::new(CollectingSink::new());
    let previous = diagnostics::set_sink(Some(sink.clone()));

    let mr = ManagedMemoryResource::with_backend(RecordingBackend::default());
    let ptr = mr.allocate(512, Stream::DEFAULT).unwrap();

    mr.backend().fail_releases.store(true, Ordering::Relaxed);
    unsafe { mr.deallocate(ptr, 512, Stream::DEFAULT) };
    assert_eq!(mr.backend().releases.load(Ordering::Relaxed), 1);

    let reports = sink.with_code("MR002");
    if diagnostics::enabled() {
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].kind, DiagnosticKind::Warning);
        assert_eq!(reports[0].message, "recordFree failed: recordError700 simulated failure");
    } else {
        assert!(reports.is_empty());
    }

    diagnostics::set_sink(previous);
    mr.backend().fail_releases.store(false, Ordering::Relaxed);
    unsafe { mr.deallocate(ptr, 512, Stream::DEFAULT) };
}

#[test]
fn test_allocation_failure_reported() {
    let _guard = lock_globals();
    let sink = Arc::new(CollectingSink::new());
    let previous = diagnostics::set_sink(Some(sink.clone()));

    let mr = ManagedMemoryResource::with_backend(RecordingBackend::failing());
    assert!(mr.allocate(4096, Stream::DEFAULT).is_err());

    // Other tests may fail allocations concurrently; match on this one's text.
    let expected = "recordMallocManaged failed for 4096 bytes: recordError2 simulated failure";
    let reports: Vec<_> = sink
        .with_code("MR001")
        .into_iter()
        .filter(|d| d.message == expected)
        .collect();
    if diagnostics::enabled() {
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].kind, DiagnosticKind::Error);
        assert!(sink.has_errors());
    } else {
        assert!(reports.is_empty());
    }

    diagnostics::set_sink(previous);
}

#[test]
fn test_silent_config_keeps_results() {
    let _guard = lock_globals();
    let sink = Arc::new(CollectingSink::new());
    let previous_sink = diagnostics::set_sink(Some(sink.clone()));
    let previous_config = DiagnosticsConfig::current();

    DiagnosticsConfig::silent().install();

    let mr = ManagedMemoryResource::with_backend(RecordingBackend::failing());
    assert_eq!(
        mr.allocate(128, Stream::DEFAULT),
        Err(AllocError::OutOfMemory { bytes: 128 })
    );
    assert!(sink
        .diagnostics()
        .iter()
        .all(|d| !d.message.contains("failed for 128 bytes")));

    previous_config.install();
    assert_eq!(DiagnosticsConfig::current(), previous_config);
    diagnostics::set_sink(previous_sink);
}

#[test]
fn test_polymorphic_use() {
    let resources: Vec<Arc<dyn DeviceMemoryResource>> = vec![
        Arc::new(ManagedMemoryResource::with_backend(HostBackend::new())),
        Arc::new(ManagedMemoryResource::with_backend(RecordingBackend::default())),
    ];

    for mr in &resources {
        assert!(!mr.supports_streams());
        let buf = DeviceBuffer::new_in(300, Stream::DEFAULT, Arc::clone(mr)).unwrap();
        assert_eq!(buf.as_ptr() as usize % MANAGED_ALIGNMENT, 0);
    }

    assert!(!resources[0].is_equal(resources[1].as_ref()));
    assert!(resources[0].is_equal(resources[0].as_ref()));
}

#[test]
fn test_equality_follows_shared_heap() {
    let backend = HostBackend::new();
    let a = ManagedMemoryResource::with_backend(backend.clone());
    let b = ManagedMemoryResource::with_backend(backend.clone());

    let ptr = a.allocate(64, Stream::DEFAULT).unwrap();
    assert!(a.is_equal(&b));
    unsafe { b.deallocate(ptr, 64, Stream::DEFAULT) };
    assert_eq!(backend.live_allocations(), 0);
}

#[test]
fn test_equality_defaults_to_shared_address_space() {
    let a = ManagedMemoryResource::with_backend(RecordingBackend::default());
    let b = ManagedMemoryResource::with_backend(RecordingBackend::default());

    assert!(a.is_equal(&b));
    assert!(!a.is_equal(&ManagedMemoryResource::with_backend(HostBackend::new())));
}

#[test]
fn test_concurrent_allocation() {
    let backend = HostBackend::new();
    let mr = Arc::new(ManagedMemoryResource::with_backend(backend.clone()));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let mr = Arc::clone(&mr);
            thread::spawn(move || {
                for i in 1..=200 {
                    let bytes = i * (t + 1);
                    let ptr = mr.allocate(bytes, Stream::DEFAULT).unwrap();
                    unsafe {
                        ptr.write(t as u8);
                        mr.deallocate(ptr, bytes, Stream::DEFAULT);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(backend.allocate_calls(), 800);
    assert_eq!(backend.live_allocations(), 0);
}

#[cfg(not(feature = "cuda"))]
#[test]
fn test_default_resource_buffer() {
    let buf = DeviceBuffer::new(1000, Stream::DEFAULT).unwrap();
    assert_eq!(buf.len(), 1000);
    assert!(!buf.resource().supports_streams());
}
