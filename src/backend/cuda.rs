//! CUDA runtime backend.
//!
//! Binds `cudaMallocManaged` and `cudaFree` from `libcudart`. The build
//! script adds the link directives when the `cuda` feature is enabled.

use std::borrow::Cow;
use std::ffi::{c_char, c_int, c_uint, c_void, CStr};
use std::ptr::{self, NonNull};

use super::{StatusCode, UnifiedMemoryBackend};

#[allow(non_camel_case_types)]
type cudaError_t = c_int;

/// Memory is accessible from any stream on any device.
const CUDA_MEM_ATTACH_GLOBAL: c_uint = 0x01;

extern "C" {
    fn cudaMallocManaged(dev_ptr: *mut *mut c_void, size: usize, flags: c_uint) -> cudaError_t;
    fn cudaFree(dev_ptr: *mut c_void) -> cudaError_t;
    fn cudaGetErrorName(error: cudaError_t) -> *const c_char;
    fn cudaGetErrorString(error: cudaError_t) -> *const c_char;
}

/// The CUDA runtime's managed-memory primitives.
///
/// Zero-sized: the runtime keeps all state, so every instance is
/// interchangeable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CudaRuntime;

impl CudaRuntime {
    /// Create a handle to the runtime.
    pub const fn new() -> Self {
        Self
    }
}

/// Copy a static string returned by the runtime.
fn runtime_text(text: *const c_char, fallback: &'static str) -> Cow<'static, str> {
    if text.is_null() {
        return Cow::Borrowed(fallback);
    }
    // SAFETY: the runtime returns NUL-terminated strings with static lifetime.
    let text = unsafe { CStr::from_ptr(text) };
    Cow::Owned(text.to_string_lossy().into_owned())
}

impl UnifiedMemoryBackend for CudaRuntime {
    const ALLOCATE_PRIMITIVE: &'static str = "cudaMallocManaged";
    const RELEASE_PRIMITIVE: &'static str = "cudaFree";

    fn allocate_managed(&self, bytes: usize) -> Result<NonNull<u8>, StatusCode> {
        let mut ptr: *mut c_void = ptr::null_mut();
        // SAFETY: `ptr` is a valid out-parameter for the duration of the call.
        let status = StatusCode(unsafe { cudaMallocManaged(&mut ptr, bytes, CUDA_MEM_ATTACH_GLOBAL) });
        status.into_result()?;
        NonNull::new(ptr.cast::<u8>()).ok_or(StatusCode::MEMORY_ALLOCATION)
    }

    unsafe fn release(&self, ptr: *mut u8) -> Result<(), StatusCode> {
        StatusCode(cudaFree(ptr.cast::<c_void>())).into_result()
    }

    fn error_name(&self, status: StatusCode) -> Cow<'static, str> {
        // SAFETY: cudaGetErrorName accepts any code.
        runtime_text(unsafe { cudaGetErrorName(status.0) }, "cudaErrorUnknown")
    }

    fn error_string(&self, status: StatusCode) -> Cow<'static, str> {
        // SAFETY: cudaGetErrorString accepts any code.
        runtime_text(unsafe { cudaGetErrorString(status.0) }, "unrecognized error code")
    }
}
