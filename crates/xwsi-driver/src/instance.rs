//! Instance creation and destruction.

use ash::vk;
use ash::vk::Handle;
use dashmap::DashSet;
use tracing::{error, trace, warn};
use xwsi_core::{DriverError, DriverResult, HandleKind};

use crate::bindings::NativeBindings;
use crate::surface::SurfaceStore;
use crate::translate;

/// Native instances created through this driver and not yet destroyed.
#[derive(Debug, Default)]
pub struct InstanceRegistry {
    live: DashSet<u64>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, instance: vk::Instance) -> bool {
        self.live.contains(&instance.as_raw())
    }

    /// Fails with `InvalidHandle` unless `instance` is live.
    pub fn check(&self, instance: vk::Instance) -> DriverResult<()> {
        if self.contains(instance) {
            Ok(())
        } else {
            Err(DriverError::InvalidHandle {
                kind: HandleKind::Instance,
                raw: instance.as_raw(),
            })
        }
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    fn insert(&self, instance: vk::Instance) {
        self.live.insert(instance.as_raw());
    }

    fn remove(&self, instance: vk::Instance) -> bool {
        self.live.remove(&instance.as_raw()).is_some()
    }
}

/// Translate `create_info` and create the native instance from it.
///
/// # Safety
/// `create_info` must be a valid `VkInstanceCreateInfo` (see
/// [`translate::translate`]).
pub unsafe fn create_instance(
    bindings: &NativeBindings,
    registry: &InstanceRegistry,
    create_info: &vk::InstanceCreateInfo<'_>,
    allocator: Option<&vk::AllocationCallbacks<'_>>,
) -> DriverResult<vk::Instance> {
    if allocator.is_some() {
        warn!("support for allocation callbacks not implemented yet");
    }

    let host_info = match unsafe { translate::translate(create_info) } {
        Ok(info) => info,
        Err(e) => {
            error!("failed to convert instance create info: {}", e);
            return Err(e);
        }
    };
    trace!(
        extensions = create_info.enabled_extension_count,
        substituted = host_info.substitutions(),
        dropped_chain = host_info.dropped_chain().len(),
        "creating native instance"
    );

    let result = unsafe { bindings.create_instance(&host_info.as_raw()) };
    drop(host_info);

    let instance = result?;
    registry.insert(instance);
    trace!("created instance {:?}", instance);
    Ok(instance)
}

/// Destroy a native instance created by [`create_instance`].
///
/// Surfaces still alive on the instance are destroyed first.
///
/// # Safety
/// No other thread may use `instance` concurrently.
pub unsafe fn destroy_instance(
    bindings: &NativeBindings,
    registry: &InstanceRegistry,
    surfaces: &SurfaceStore,
    instance: vk::Instance,
    allocator: Option<&vk::AllocationCallbacks<'_>>,
) -> DriverResult<()> {
    if allocator.is_some() {
        warn!("support for allocation callbacks not implemented yet");
    }

    if instance == vk::Instance::null() {
        return Ok(());
    }

    if !registry.remove(instance) {
        error!("destroying unknown instance {:?}", instance);
        return Err(DriverError::InvalidHandle {
            kind: HandleKind::Instance,
            raw: instance.as_raw(),
        });
    }

    let leaked = surfaces.drain_for(instance);
    if !leaked.is_empty() {
        warn!("instance {:?} destroyed with {} live surfaces", instance, leaked.len());
        for surface in leaked {
            unsafe { bindings.destroy_surface(instance, surface.native) };
        }
    }

    unsafe { bindings.destroy_instance(instance) };
    Ok(())
}
