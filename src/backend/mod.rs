//! Unified-memory primitives.
//!
//! A backend is the opaque service the managed resource delegates to: given a
//! byte count it returns an address or a failure status, and given an address
//! it releases it. The resource layer depends on this trait only.
//!
//! ## Backends
//! - `host`: host-memory emulation, always available
//! - `cuda`: the CUDA runtime (enable the `cuda` feature)

use std::borrow::Cow;
use std::fmt;
use std::ptr::NonNull;

pub mod host;
pub use host::HostBackend;

#[cfg(feature = "cuda")]
pub mod cuda;
#[cfg(feature = "cuda")]
pub use cuda::CudaRuntime;

/// Minimum alignment of every address a backend hands out.
pub const MANAGED_ALIGNMENT: usize = 256;

/// Backend selected when no backend is named explicitly.
#[cfg(feature = "cuda")]
pub type DefaultBackend = CudaRuntime;

/// Backend selected when no backend is named explicitly.
#[cfg(not(feature = "cuda"))]
pub type DefaultBackend = HostBackend;

/// Raw status reported by a backend primitive.
///
/// Uses the CUDA runtime numbering: zero is success, everything else is a
/// failure whose meaning the backend can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(pub i32);

impl StatusCode {
    /// The call succeeded.
    pub const SUCCESS: Self = Self(0);
    /// An argument was rejected (zero-size managed request, unknown address).
    pub const INVALID_VALUE: Self = Self(1);
    /// The request could not be satisfied.
    pub const MEMORY_ALLOCATION: Self = Self(2);

    /// Whether this status reports success.
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }

    /// Turn a raw status into a `Result`.
    pub fn into_result(self) -> Result<(), StatusCode> {
        if self.is_success() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status {}", self.0)
    }
}

/// A unified-memory allocation primitive.
///
/// Implementations must be safe to call concurrently from multiple threads.
pub trait UnifiedMemoryBackend: Send + Sync + 'static {
    /// Name of the allocation primitive, used in diagnostics.
    const ALLOCATE_PRIMITIVE: &'static str;

    /// Name of the release primitive, used in diagnostics.
    const RELEASE_PRIMITIVE: &'static str;

    /// Allocate at least `bytes` bytes of unified memory.
    ///
    /// On success the address is aligned to at least [`MANAGED_ALIGNMENT`].
    fn allocate_managed(&self, bytes: usize) -> Result<NonNull<u8>, StatusCode>;

    /// Release memory obtained from [`allocate_managed`](Self::allocate_managed).
    ///
    /// Releasing null succeeds and does nothing.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or an address returned by this backend that has not
    /// been released yet. The memory must not be accessed afterwards.
    unsafe fn release(&self, ptr: *mut u8) -> Result<(), StatusCode>;

    /// Short symbolic name of a status (e.g. `cudaErrorMemoryAllocation`).
    fn error_name(&self, status: StatusCode) -> Cow<'static, str>;

    /// Human-readable description of a status.
    fn error_string(&self, status: StatusCode) -> Cow<'static, str>;

    /// Whether memory from `self` may be released through `other`.
    fn same_address_space(&self, _other: &Self) -> bool
    where
        Self: Sized,
    {
        true
    }
}
