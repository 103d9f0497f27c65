//! Managed (unified) memory resource.
//!
//! Allocates with the backend's managed-memory primitive, so the memory is
//! addressable from the host and from every device. No pooling, no stream
//! ordering: each call goes straight to the primitive.

use std::any::Any;
use std::fmt;

use super::traits::{AllocError, DeviceMemoryResource, Stream};
use crate::backend::{DefaultBackend, UnifiedMemoryBackend};
use crate::diagnostics::macros::mr_report;

/// Memory resource backed by a unified-memory primitive.
///
/// Holds nothing but the backend handle; with the CUDA runtime backend it is
/// zero-sized. Addresses are aligned to at least
/// [`MANAGED_ALIGNMENT`](crate::backend::MANAGED_ALIGNMENT).
///
/// # Example
///
/// ```rust
/// use managedalloc::{DeviceMemoryResource, ManagedMemoryResource, Stream};
///
/// let mr = ManagedMemoryResource::new();
/// let ptr = mr.allocate(1024, Stream::DEFAULT).unwrap();
/// assert!(!ptr.is_null());
/// unsafe { mr.deallocate(ptr, 1024, Stream::DEFAULT) };
/// ```
#[derive(Clone, Default)]
pub struct ManagedMemoryResource<B: UnifiedMemoryBackend = DefaultBackend> {
    backend: B,
}

impl ManagedMemoryResource<DefaultBackend> {
    /// Create a resource over the default backend.
    pub fn new() -> Self {
        Self::with_backend(DefaultBackend::default())
    }
}

impl<B: UnifiedMemoryBackend> ManagedMemoryResource<B> {
    /// Create a resource over the given backend.
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }

    /// The underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: UnifiedMemoryBackend> fmt::Debug for ManagedMemoryResource<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedMemoryResource")
            .field("primitive", &B::ALLOCATE_PRIMITIVE)
            .finish()
    }
}

impl<B: UnifiedMemoryBackend> DeviceMemoryResource for ManagedMemoryResource<B> {
    fn supports_streams(&self) -> bool {
        false
    }

    fn allocate(&self, bytes: usize, _stream: Stream) -> Result<*mut u8, AllocError> {
        // The managed primitive rejects zero-size requests as invalid, unlike
        // plain device allocation. Treat them as an empty success instead.
        if bytes == 0 {
            return Ok(std::ptr::null_mut());
        }

        match self.backend.allocate_managed(bytes) {
            Ok(ptr) => Ok(ptr.as_ptr()),
            Err(status) => {
                mr_report!(
                    MR001,
                    "{} failed for {} bytes: {} {}",
                    B::ALLOCATE_PRIMITIVE,
                    bytes,
                    self.backend.error_name(status),
                    self.backend.error_string(status)
                );
                Err(AllocError::OutOfMemory { bytes })
            }
        }
    }

    unsafe fn deallocate(&self, ptr: *mut u8, _bytes: usize, _stream: Stream) {
        if let Err(status) = self.backend.release(ptr) {
            mr_report!(
                MR002,
                "{} failed: {} {}",
                B::RELEASE_PRIMITIVE,
                self.backend.error_name(status),
                self.backend.error_string(status)
            );
        }
    }

    fn is_equal(&self, other: &dyn DeviceMemoryResource) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .map_or(false, |other| self.backend.same_address_space(&other.backend))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
