//! Memory resources.
//!
//! A memory resource is one allocation strategy. All of them implement
//! [`DeviceMemoryResource`], so callers can hold `Arc<dyn DeviceMemoryResource>`
//! and swap strategies without code changes.

pub mod buffer;
pub mod default;
pub mod managed;
pub mod traits;

pub use buffer::DeviceBuffer;
pub use default::{default_resource, set_default_resource};
pub use managed::ManagedMemoryResource;
pub use traits::{AllocError, DeviceMemoryResource, Stream};
