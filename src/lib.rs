//! # managedalloc
//!
//! Unified-memory allocation behind a pluggable memory resource interface.
//!
//! ## Features
//!
//! - [`DeviceMemoryResource`]: the allocator interface shared by every strategy
//! - [`ManagedMemoryResource`]: allocates unified (host- and device-visible)
//!   memory with `cudaMallocManaged`, aligned to at least 256 bytes
//! - Host emulation backend for machines without a device
//! - Process-wide default resource and an owning [`DeviceBuffer`]
//! - Failure diagnostics in debug builds
//!
//! ## Cargo features
//!
//! - `cuda`: use the CUDA runtime as the default backend
//! - `parking_lot`: faster mutexes
//! - `log`: route diagnostics through the `log` crate
//! - `diagnostics`: keep diagnostics in release builds
//!
//! ## Quick Start
//!
//! ```rust
//! use managedalloc::{DeviceMemoryResource, ManagedMemoryResource, Stream};
//!
//! let mr = ManagedMemoryResource::new();
//! assert!(!mr.supports_streams());
//!
//! let ptr = mr.allocate(1024, Stream::DEFAULT).unwrap();
//! // ... use the memory from host or device ...
//! unsafe { mr.deallocate(ptr, 1024, Stream::DEFAULT) };
//! ```

pub mod backend;
pub mod config;
pub mod diagnostics;
pub mod resource;

mod sync;
mod util;

// Re-export public API at crate root for convenience
pub use backend::{DefaultBackend, HostBackend, StatusCode, UnifiedMemoryBackend, MANAGED_ALIGNMENT};
#[cfg(feature = "cuda")]
pub use backend::CudaRuntime;
pub use config::DiagnosticsConfig;
pub use resource::{
    default_resource, set_default_resource, AllocError, DeviceBuffer, DeviceMemoryResource,
    ManagedMemoryResource, Stream,
};
