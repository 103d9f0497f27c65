//! Process-wide default resource.
//!
//! Code that does not take a resource explicitly allocates from the resource
//! installed here. Until something else is installed that is a
//! [`ManagedMemoryResource`] over the default backend.

use std::sync::{Arc, OnceLock};

use super::managed::ManagedMemoryResource;
use super::traits::DeviceMemoryResource;
use crate::sync::mutex::Mutex;

static DEFAULT_RESOURCE: OnceLock<Mutex<Arc<dyn DeviceMemoryResource>>> = OnceLock::new();

fn slot() -> &'static Mutex<Arc<dyn DeviceMemoryResource>> {
    DEFAULT_RESOURCE.get_or_init(|| {
        let resource: Arc<dyn DeviceMemoryResource> = Arc::new(ManagedMemoryResource::new());
        Mutex::new(resource)
    })
}

/// The currently installed default resource.
pub fn default_resource() -> Arc<dyn DeviceMemoryResource> {
    Arc::clone(&slot().lock())
}

/// Install `resource` as the default, returning the previous default.
///
/// Memory already allocated from the previous resource must still be
/// returned to it; callers holding the returned `Arc` can do so.
pub fn set_default_resource(resource: Arc<dyn DeviceMemoryResource>) -> Arc<dyn DeviceMemoryResource> {
    std::mem::replace(&mut *slot().lock(), resource)
}
