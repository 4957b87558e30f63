//! The Xlib-backed driver and the version-checked factory that hands it out.

use std::ffi::CStr;
use std::sync::Arc;

use ash::vk;
use ash::vk::Handle;
use tracing::{error, trace, warn};
use xwsi_core::{DriverError, DriverResult, Operation};

use crate::bindings::{BindingState, NativeBindings, NativeLoader};
use crate::dispatch::{stub, Enumeration, VulkanDriver};
use crate::extensions;
use crate::instance::{self, InstanceRegistry};
use crate::surface::{self, SurfaceStore, WindowSystem};

/// Dispatch-table version this driver was built against. The host must ask
/// for exactly this version.
pub const DRIVER_VERSION: u32 = 1;

pub fn check_version(version: u32) -> DriverResult<()> {
    if version == DRIVER_VERSION {
        Ok(())
    } else {
        Err(DriverError::VersionMismatch {
            expected: DRIVER_VERSION,
            actual: version,
        })
    }
}

pub struct X11Driver {
    bindings: Arc<NativeBindings>,
    windows: Arc<dyn WindowSystem>,
    instances: InstanceRegistry,
    surfaces: SurfaceStore,
}

impl X11Driver {
    pub fn new(bindings: Arc<NativeBindings>, windows: Arc<dyn WindowSystem>) -> Self {
        Self {
            bindings,
            windows,
            instances: InstanceRegistry::new(),
            surfaces: SurfaceStore::new(),
        }
    }

    pub fn bindings(&self) -> &NativeBindings {
        &self.bindings
    }

    pub fn instances(&self) -> &InstanceRegistry {
        &self.instances
    }

    pub fn surfaces(&self) -> &SurfaceStore {
        &self.surfaces
    }
}

fn ignore_allocator(allocator: Option<&vk::AllocationCallbacks<'_>>) {
    if allocator.is_some() {
        warn!("support for allocation callbacks not implemented yet");
    }
}

impl VulkanDriver for X11Driver {
    fn acquire_next_image(
        &self,
        device: vk::Device,
        swapchain: vk::SwapchainKHR,
        timeout: u64,
        semaphore: vk::Semaphore,
        fence: vk::Fence,
    ) -> DriverResult<u32> {
        stub(
            Operation::AcquireNextImage,
            format_args!("{:?}, {:?}, {:#x}, {:?}, {:?}", device, swapchain, timeout, semaphore, fence),
        )
    }

    unsafe fn create_instance(
        &self,
        create_info: &vk::InstanceCreateInfo<'_>,
        allocator: Option<&vk::AllocationCallbacks<'_>>,
    ) -> DriverResult<vk::Instance> {
        trace!("create_info {:p}, allocator {:?}", create_info, allocator.is_some());
        unsafe { instance::create_instance(&self.bindings, &self.instances, create_info, allocator) }
    }

    fn create_swapchain(
        &self,
        device: vk::Device,
        create_info: &vk::SwapchainCreateInfoKHR<'_>,
        allocator: Option<&vk::AllocationCallbacks<'_>>,
    ) -> DriverResult<vk::SwapchainKHR> {
        stub(
            Operation::CreateSwapchain,
            format_args!("{:?}, {:p}, {:?}", device, create_info, allocator.is_some()),
        )
    }

    unsafe fn create_win32_surface(
        &self,
        instance: vk::Instance,
        create_info: &vk::Win32SurfaceCreateInfoKHR<'_>,
        allocator: Option<&vk::AllocationCallbacks<'_>>,
    ) -> DriverResult<vk::SurfaceKHR> {
        trace!("{:?} {:p} {:?}", instance, create_info, allocator.is_some());
        ignore_allocator(allocator);

        if let Err(e) = self.instances.check(instance) {
            error!("{}", e);
            return Err(e);
        }

        unsafe {
            surface::create_surface(
                &self.bindings,
                &self.windows,
                &self.surfaces,
                instance,
                create_info.hwnd,
            )
        }
    }

    unsafe fn destroy_instance(
        &self,
        instance: vk::Instance,
        allocator: Option<&vk::AllocationCallbacks<'_>>,
    ) -> DriverResult<()> {
        trace!("{:?} {:?}", instance, allocator.is_some());
        unsafe {
            instance::destroy_instance(&self.bindings, &self.instances, &self.surfaces, instance, allocator)
        }
    }

    unsafe fn destroy_surface(
        &self,
        instance: vk::Instance,
        surface: vk::SurfaceKHR,
        allocator: Option<&vk::AllocationCallbacks<'_>>,
    ) -> DriverResult<()> {
        trace!("{:?} {:#x} {:?}", instance, surface.as_raw(), allocator.is_some());
        ignore_allocator(allocator);

        let result = self
            .instances
            .check(instance)
            .and_then(|()| unsafe { surface::destroy_surface(&self.bindings, &self.surfaces, instance, surface) });
        if let Err(e) = &result {
            error!("{}", e);
        }
        result
    }

    fn destroy_swapchain(
        &self,
        device: vk::Device,
        swapchain: vk::SwapchainKHR,
        allocator: Option<&vk::AllocationCallbacks<'_>>,
    ) -> DriverResult<()> {
        stub(
            Operation::DestroySwapchain,
            format_args!("{:?}, {:?}, {:?}", device, swapchain, allocator.is_some()),
        )
    }

    fn enumerate_instance_extension_properties(
        &self,
        layer_name: Option<&CStr>,
        properties: Option<&mut [vk::ExtensionProperties]>,
    ) -> DriverResult<Enumeration> {
        trace!("layer_name {:?}, properties {:?}", layer_name, properties.as_ref().map(|p| p.len()));
        extensions::enumerate_instance_extensions(layer_name, properties)
    }

    unsafe fn get_device_proc_addr(&self, device: vk::Device, name: &CStr) -> vk::PFN_vkVoidFunction {
        trace!("{:?}, {:?}", device, name);
        unsafe { self.bindings.get_device_proc_addr(device, name) }
    }

    unsafe fn get_instance_proc_addr(
        &self,
        instance: vk::Instance,
        name: &CStr,
    ) -> vk::PFN_vkVoidFunction {
        trace!("{:?}, {:?}", instance, name);
        unsafe { self.bindings.get_instance_proc_addr(instance, name) }
    }

    fn get_physical_device_surface_capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> DriverResult<vk::SurfaceCapabilitiesKHR> {
        stub(
            Operation::GetPhysicalDeviceSurfaceCapabilities,
            format_args!("{:?}, {:?}", physical_device, surface),
        )
    }

    fn get_physical_device_surface_formats(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        formats: Option<&mut [vk::SurfaceFormatKHR]>,
    ) -> DriverResult<Enumeration> {
        stub(
            Operation::GetPhysicalDeviceSurfaceFormats,
            format_args!("{:?}, {:?}, {:?}", physical_device, surface, formats.map(|f| f.len())),
        )
    }

    fn get_physical_device_surface_present_modes(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        modes: Option<&mut [vk::PresentModeKHR]>,
    ) -> DriverResult<Enumeration> {
        stub(
            Operation::GetPhysicalDeviceSurfacePresentModes,
            format_args!("{:?}, {:?}, {:?}", physical_device, surface, modes.map(|m| m.len())),
        )
    }

    fn get_physical_device_surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family_index: u32,
        surface: vk::SurfaceKHR,
    ) -> DriverResult<bool> {
        stub(
            Operation::GetPhysicalDeviceSurfaceSupport,
            format_args!("{:?}, {}, {:?}", physical_device, queue_family_index, surface),
        )
    }

    unsafe fn get_physical_device_win32_presentation_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family_index: u32,
    ) -> bool {
        trace!("{:?} {}", physical_device, queue_family_index);
        unsafe {
            self.bindings.xlib_presentation_support(
                physical_device,
                queue_family_index,
                self.windows.display(),
                self.windows.default_visual_id(),
            )
        }
    }

    fn get_swapchain_images(
        &self,
        device: vk::Device,
        swapchain: vk::SwapchainKHR,
        images: Option<&mut [vk::Image]>,
    ) -> DriverResult<Enumeration> {
        stub(
            Operation::GetSwapchainImages,
            format_args!("{:?}, {:?}, {:?}", device, swapchain, images.map(|i| i.len())),
        )
    }

    fn queue_present(&self, queue: vk::Queue, present_info: &vk::PresentInfoKHR<'_>) -> DriverResult<()> {
        stub(Operation::QueuePresent, format_args!("{:?}, {:p}", queue, present_info))
    }
}

/// Hands out the driver once the native bindings are available.
///
/// `get_driver` takes `&mut self`: the host serializes driver acquisition,
/// and exclusive access is what lets the binding state be initialized
/// without a lock of its own.
pub struct DriverFactory<L> {
    loader: L,
    windows: Arc<dyn WindowSystem>,
    state: BindingState,
    driver: Option<Arc<X11Driver>>,
}

impl<L: NativeLoader> DriverFactory<L> {
    pub fn new(loader: L, windows: Arc<dyn WindowSystem>) -> Self {
        Self {
            loader,
            windows,
            state: BindingState::Uninitialized,
            driver: None,
        }
    }

    /// Returns the driver for `version`, or `None` on a version mismatch or
    /// when the native library is unavailable. A mismatch never touches the
    /// loader.
    pub fn get_driver(&mut self, version: u32) -> Option<Arc<X11Driver>> {
        if let Err(e) = check_version(version) {
            error!("{}", e);
            return None;
        }

        if let Some(driver) = &self.driver {
            return Some(Arc::clone(driver));
        }

        let bindings = self.state.initialize(&self.loader)?;
        let driver = Arc::new(X11Driver::new(bindings, Arc::clone(&self.windows)));
        self.driver = Some(Arc::clone(&driver));
        Some(driver)
    }

    pub fn state(&self) -> &BindingState {
        &self.state
    }
}
