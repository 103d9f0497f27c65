//! Device memory resource interface.
//!
//! This module defines the allocator interface every memory resource
//! implements, without pulling in any backend. Callers hold
//! `Arc<dyn DeviceMemoryResource>` and can swap strategies freely.

use std::any::Any;
use std::ffi::c_void;

/// Errors a memory resource can report from `allocate`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum AllocError {
    /// The request could not be satisfied.
    #[error("out of memory: could not satisfy request of {bytes} bytes")]
    OutOfMemory {
        /// Size of the failed request.
        bytes: usize,
    },
}

impl AllocError {
    /// Whether this is an out-of-memory failure.
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, AllocError::OutOfMemory { .. })
    }

    /// Size of the request that failed.
    pub fn requested_bytes(&self) -> usize {
        match self {
            AllocError::OutOfMemory { bytes } => *bytes,
        }
    }
}

/// Handle to an execution stream (a `cudaStream_t`).
///
/// Stored as an address so it can cross threads. [`Stream::DEFAULT`] stands
/// for "no particular stream".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Stream(usize);

impl Stream {
    /// The default (legacy) stream.
    pub const DEFAULT: Self = Self(0);

    /// Wrap a raw stream handle.
    pub fn from_raw(raw: *mut c_void) -> Self {
        Self(raw as usize)
    }

    /// The raw stream handle.
    pub fn as_raw(self) -> *mut c_void {
        self.0 as *mut c_void
    }

    /// Whether this is the default stream.
    pub const fn is_default(self) -> bool {
        self.0 == 0
    }
}

/// A memory resource: one allocation strategy of the framework.
///
/// The trait is object-safe for use with `Arc<dyn DeviceMemoryResource>`.
pub trait DeviceMemoryResource: Send + Sync + 'static {
    /// Whether allocation and deallocation are ordered on the given stream.
    ///
    /// Resources returning `false` ignore the stream argument entirely;
    /// callers that need stream ordering must synchronize themselves.
    fn supports_streams(&self) -> bool;

    /// Allocate at least `bytes` bytes.
    ///
    /// A zero-byte request returns null and succeeds. Any other success
    /// returns a non-null address owned by the caller until it is passed to
    /// [`deallocate`](Self::deallocate).
    fn allocate(&self, bytes: usize, stream: Stream) -> Result<*mut u8, AllocError>;

    /// Return memory to the resource. Never fails observably.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or an address returned by `allocate` on this
    /// resource (or one it [is equal to](Self::is_equal)) with the same
    /// `bytes`, and not deallocated since. Deallocating twice is undefined.
    unsafe fn deallocate(&self, ptr: *mut u8, bytes: usize, stream: Stream);

    /// Whether memory allocated by `self` may be deallocated by `other`
    /// and vice versa.
    ///
    /// Defaults to identity.
    fn is_equal(&self, other: &dyn DeviceMemoryResource) -> bool {
        std::ptr::eq(
            self as *const Self as *const (),
            other as *const dyn DeviceMemoryResource as *const (),
        )
    }

    /// Upcast for equality checks between concrete resource types.
    fn as_any(&self) -> &dyn Any;
}
