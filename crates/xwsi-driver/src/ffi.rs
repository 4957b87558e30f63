//! C ABI surface: the dispatch table handed to the host and the hooks the
//! host uses to provide its window system.

#![allow(non_snake_case)]

use std::ffi::{c_char, CStr};
use std::ptr;
use std::sync::{Arc, OnceLock};

use ash::vk;
use parking_lot::Mutex;
use tracing::{error, warn};
use xwsi_core::config::{default_config_path, DriverConfig, LogConfig};
use xwsi_core::{DriverError, Operation};

use crate::bindings::LibraryLoader;
use crate::dispatch::{Enumeration, VulkanDriver};
use crate::driver::{check_version, DriverFactory, X11Driver};
use crate::surface::WindowSystem;

/// The presentation dispatch table, in the host's field order.
#[repr(C)]
pub struct VulkanFuncs {
    pub acquire_next_image: unsafe extern "system" fn(
        vk::Device,
        vk::SwapchainKHR,
        u64,
        vk::Semaphore,
        vk::Fence,
        *mut u32,
    ) -> vk::Result,
    pub create_instance: unsafe extern "system" fn(
        *const vk::InstanceCreateInfo<'_>,
        *const vk::AllocationCallbacks<'_>,
        *mut vk::Instance,
    ) -> vk::Result,
    pub create_swapchain: unsafe extern "system" fn(
        vk::Device,
        *const vk::SwapchainCreateInfoKHR<'_>,
        *const vk::AllocationCallbacks<'_>,
        *mut vk::SwapchainKHR,
    ) -> vk::Result,
    pub create_win32_surface: unsafe extern "system" fn(
        vk::Instance,
        *const vk::Win32SurfaceCreateInfoKHR<'_>,
        *const vk::AllocationCallbacks<'_>,
        *mut vk::SurfaceKHR,
    ) -> vk::Result,
    pub destroy_instance: unsafe extern "system" fn(vk::Instance, *const vk::AllocationCallbacks<'_>),
    pub destroy_surface:
        unsafe extern "system" fn(vk::Instance, vk::SurfaceKHR, *const vk::AllocationCallbacks<'_>),
    pub destroy_swapchain:
        unsafe extern "system" fn(vk::Device, vk::SwapchainKHR, *const vk::AllocationCallbacks<'_>),
    pub enumerate_instance_extension_properties:
        unsafe extern "system" fn(*const c_char, *mut u32, *mut vk::ExtensionProperties) -> vk::Result,
    pub get_device_proc_addr:
        unsafe extern "system" fn(vk::Device, *const c_char) -> vk::PFN_vkVoidFunction,
    pub get_instance_proc_addr:
        unsafe extern "system" fn(vk::Instance, *const c_char) -> vk::PFN_vkVoidFunction,
    pub get_physical_device_surface_capabilities: unsafe extern "system" fn(
        vk::PhysicalDevice,
        vk::SurfaceKHR,
        *mut vk::SurfaceCapabilitiesKHR,
    ) -> vk::Result,
    pub get_physical_device_surface_formats: unsafe extern "system" fn(
        vk::PhysicalDevice,
        vk::SurfaceKHR,
        *mut u32,
        *mut vk::SurfaceFormatKHR,
    ) -> vk::Result,
    pub get_physical_device_surface_present_modes: unsafe extern "system" fn(
        vk::PhysicalDevice,
        vk::SurfaceKHR,
        *mut u32,
        *mut vk::PresentModeKHR,
    ) -> vk::Result,
    pub get_physical_device_surface_support: unsafe extern "system" fn(
        vk::PhysicalDevice,
        u32,
        vk::SurfaceKHR,
        *mut vk::Bool32,
    ) -> vk::Result,
    pub get_physical_device_win32_presentation_support:
        unsafe extern "system" fn(vk::PhysicalDevice, u32) -> vk::Bool32,
    pub get_swapchain_images:
        unsafe extern "system" fn(vk::Device, vk::SwapchainKHR, *mut u32, *mut vk::Image) -> vk::Result,
    pub queue_present: unsafe extern "system" fn(vk::Queue, *const vk::PresentInfoKHR<'_>) -> vk::Result,
}

static VULKAN_FUNCS: VulkanFuncs = VulkanFuncs {
    acquire_next_image: vkAcquireNextImageKHR,
    create_instance: vkCreateInstance,
    create_swapchain: vkCreateSwapchainKHR,
    create_win32_surface: vkCreateWin32SurfaceKHR,
    destroy_instance: vkDestroyInstance,
    destroy_surface: vkDestroySurfaceKHR,
    destroy_swapchain: vkDestroySwapchainKHR,
    enumerate_instance_extension_properties: vkEnumerateInstanceExtensionProperties,
    get_device_proc_addr: vkGetDeviceProcAddr,
    get_instance_proc_addr: vkGetInstanceProcAddr,
    get_physical_device_surface_capabilities: vkGetPhysicalDeviceSurfaceCapabilitiesKHR,
    get_physical_device_surface_formats: vkGetPhysicalDeviceSurfaceFormatsKHR,
    get_physical_device_surface_present_modes: vkGetPhysicalDeviceSurfacePresentModesKHR,
    get_physical_device_surface_support: vkGetPhysicalDeviceSurfaceSupportKHR,
    get_physical_device_win32_presentation_support: vkGetPhysicalDeviceWin32PresentationSupportKHR,
    get_swapchain_images: vkGetSwapchainImagesKHR,
    queue_present: vkQueuePresentKHR,
};

// ── Host window system ──────────────────────────────────────

/// Window-system callbacks supplied by the host before the first
/// `get_vulkan_driver` call.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct HostWindowOps {
    pub display: *mut vk::Display,
    pub default_visual_id: vk::VisualID,
    pub parent_is_desktop: unsafe extern "C" fn(hwnd: vk::HWND) -> vk::Bool32,
    /// Returns 0 on failure.
    pub create_child_window: unsafe extern "C" fn(parent: vk::HWND, visual: vk::VisualID) -> vk::Window,
    pub destroy_window: unsafe extern "C" fn(window: vk::Window),
}

struct HostWindowSystem(HostWindowOps);

// The display connection is opened once by the host and only read here.
unsafe impl Send for HostWindowSystem {}
unsafe impl Sync for HostWindowSystem {}

impl WindowSystem for HostWindowSystem {
    fn display(&self) -> *mut vk::Display {
        self.0.display
    }

    fn default_visual_id(&self) -> vk::VisualID {
        self.0.default_visual_id
    }

    fn parent_is_desktop(&self, hwnd: vk::HWND) -> bool {
        unsafe { (self.0.parent_is_desktop)(hwnd) != vk::FALSE }
    }

    fn create_child_window(&self, parent: vk::HWND, visual: vk::VisualID) -> Option<vk::Window> {
        match unsafe { (self.0.create_child_window)(parent, visual) } {
            0 => None,
            window => Some(window),
        }
    }

    fn destroy_window(&self, window: vk::Window) {
        unsafe { (self.0.destroy_window)(window) }
    }
}

static CONFIG: OnceLock<DriverConfig> = OnceLock::new();
static HOST_WINDOWS: OnceLock<Arc<HostWindowSystem>> = OnceLock::new();
static FACTORY: OnceLock<Mutex<DriverFactory<LibraryLoader>>> = OnceLock::new();
static DRIVER: OnceLock<Arc<X11Driver>> = OnceLock::new();

fn config() -> &'static DriverConfig {
    CONFIG.get_or_init(|| {
        let config = DriverConfig::load_or_default(&default_config_path());
        xwsi_common::init_logging(&config.log.filter);
        config
    })
}

fn driver() -> Option<&'static X11Driver> {
    DRIVER.get().map(|driver| driver.as_ref())
}

/// Make `driver` the one behind the C dispatch table.
///
/// Only the first installed driver is kept; a later one is handed back.
pub fn install(driver: Arc<X11Driver>) -> Result<&'static VulkanFuncs, Arc<X11Driver>> {
    match DRIVER.set(driver) {
        Ok(()) => Ok(&VULKAN_FUNCS),
        Err(rejected) => {
            if DRIVER.get().is_some_and(|current| Arc::ptr_eq(current, &rejected)) {
                Ok(&VULKAN_FUNCS)
            } else {
                Err(rejected)
            }
        }
    }
}

/// Register the host's window-system callbacks. Only the first registration
/// takes effect.
///
/// # Safety
/// `ops` must point to a valid `HostWindowOps` whose callbacks stay callable
/// for the life of the process.
#[no_mangle]
pub unsafe extern "C" fn xwsi_set_host_window_ops(ops: *const HostWindowOps) -> vk::Result {
    let _ = config();
    let Some(ops) = (unsafe { ops.as_ref() }) else {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    };
    if HOST_WINDOWS.set(Arc::new(HostWindowSystem(*ops))).is_err() {
        warn!("host window ops already registered, ignoring");
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }
    vk::Result::SUCCESS
}

/// Returns the dispatch table, or null if `version` does not match, the host
/// has not registered its window system, or the native library is unusable.
///
/// # Safety
/// Must not be called concurrently with itself.
#[no_mangle]
pub unsafe extern "C" fn get_vulkan_driver(version: u32) -> *const VulkanFuncs {
    driver_table(version, config)
}

fn driver_table(version: u32, config: impl FnOnce() -> &'static DriverConfig) -> *const VulkanFuncs {
    if let Err(e) = check_version(version) {
        xwsi_common::init_logging(&LogConfig::default().filter);
        error!("{}", e);
        return ptr::null();
    }

    let config = config();
    let Some(windows) = HOST_WINDOWS.get() else {
        error!("host window ops not registered");
        return ptr::null();
    };

    let factory = FACTORY.get_or_init(|| {
        let windows: Arc<dyn WindowSystem> = windows.clone();
        Mutex::new(DriverFactory::new(
            LibraryLoader::new(config.native.library_candidates.clone()),
            windows,
        ))
    });

    let Some(driver) = factory.lock().get_driver(version) else {
        return ptr::null();
    };
    match install(driver) {
        Ok(funcs) => ptr::from_ref(funcs),
        Err(_) => {
            error!("a different driver is already installed");
            ptr::null()
        }
    }
}

// ── Trampolines ─────────────────────────────────────────────

macro_rules! driver_or {
    ($fail:expr) => {
        match driver() {
            Some(driver) => driver,
            None => {
                error!("dispatch table used before a driver was installed");
                return $fail;
            }
        }
    };
}

/// The caller's output array, if both the count and the array were given.
unsafe fn out_slice<'a, T>(p_count: *mut u32, p_items: *mut T) -> Option<&'a mut [T]> {
    if p_count.is_null() || p_items.is_null() {
        None
    } else {
        Some(unsafe { std::slice::from_raw_parts_mut(p_items, *p_count as usize) })
    }
}

/// A null count pointer only matters once the call itself succeeded: the
/// entry's own error (layer rejection, stub) is reported as is.
unsafe fn write_enumeration(
    result: Result<Enumeration, DriverError>,
    p_count: *mut u32,
) -> vk::Result {
    match result {
        Ok(_) if p_count.is_null() => vk::Result::ERROR_INITIALIZATION_FAILED,
        Ok(enumeration) => {
            unsafe { *p_count = enumeration.count() };
            enumeration.to_vk()
        }
        Err(e) => e.to_vk_result(),
    }
}

unsafe extern "system" fn vkAcquireNextImageKHR(
    device: vk::Device,
    swapchain: vk::SwapchainKHR,
    timeout: u64,
    semaphore: vk::Semaphore,
    fence: vk::Fence,
    p_image_index: *mut u32,
) -> vk::Result {
    let driver = driver_or!(vk::Result::ERROR_INITIALIZATION_FAILED);
    match driver.acquire_next_image(device, swapchain, timeout, semaphore, fence) {
        Ok(index) => {
            if !p_image_index.is_null() {
                unsafe { *p_image_index = index };
            }
            vk::Result::SUCCESS
        }
        Err(e) => e.to_vk_result(),
    }
}

unsafe extern "system" fn vkCreateInstance(
    p_create_info: *const vk::InstanceCreateInfo<'_>,
    p_allocator: *const vk::AllocationCallbacks<'_>,
    p_instance: *mut vk::Instance,
) -> vk::Result {
    let driver = driver_or!(vk::Result::ERROR_INITIALIZATION_FAILED);
    if p_create_info.is_null() || p_instance.is_null() {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }
    match unsafe { driver.create_instance(&*p_create_info, p_allocator.as_ref()) } {
        Ok(instance) => {
            unsafe { *p_instance = instance };
            vk::Result::SUCCESS
        }
        Err(e) => e.to_vk_result(),
    }
}

unsafe extern "system" fn vkCreateSwapchainKHR(
    device: vk::Device,
    p_create_info: *const vk::SwapchainCreateInfoKHR<'_>,
    p_allocator: *const vk::AllocationCallbacks<'_>,
    p_swapchain: *mut vk::SwapchainKHR,
) -> vk::Result {
    let driver = driver_or!(vk::Result::ERROR_INITIALIZATION_FAILED);
    let Some(create_info) = (unsafe { p_create_info.as_ref() }) else {
        return DriverError::NotImplemented(Operation::CreateSwapchain).to_vk_result();
    };
    match driver.create_swapchain(device, create_info, unsafe { p_allocator.as_ref() }) {
        Ok(swapchain) => {
            if !p_swapchain.is_null() {
                unsafe { *p_swapchain = swapchain };
            }
            vk::Result::SUCCESS
        }
        Err(e) => e.to_vk_result(),
    }
}

unsafe extern "system" fn vkCreateWin32SurfaceKHR(
    instance: vk::Instance,
    p_create_info: *const vk::Win32SurfaceCreateInfoKHR<'_>,
    p_allocator: *const vk::AllocationCallbacks<'_>,
    p_surface: *mut vk::SurfaceKHR,
) -> vk::Result {
    let driver = driver_or!(vk::Result::ERROR_INITIALIZATION_FAILED);
    if p_create_info.is_null() || p_surface.is_null() {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }
    match unsafe { driver.create_win32_surface(instance, &*p_create_info, p_allocator.as_ref()) } {
        Ok(surface) => {
            unsafe { *p_surface = surface };
            vk::Result::SUCCESS
        }
        Err(e) => e.to_vk_result(),
    }
}

unsafe extern "system" fn vkDestroyInstance(
    instance: vk::Instance,
    p_allocator: *const vk::AllocationCallbacks<'_>,
) {
    let driver = driver_or!(());
    let _ = unsafe { driver.destroy_instance(instance, p_allocator.as_ref()) };
}

unsafe extern "system" fn vkDestroySurfaceKHR(
    instance: vk::Instance,
    surface: vk::SurfaceKHR,
    p_allocator: *const vk::AllocationCallbacks<'_>,
) {
    let driver = driver_or!(());
    let _ = unsafe { driver.destroy_surface(instance, surface, p_allocator.as_ref()) };
}

unsafe extern "system" fn vkDestroySwapchainKHR(
    device: vk::Device,
    swapchain: vk::SwapchainKHR,
    p_allocator: *const vk::AllocationCallbacks<'_>,
) {
    let driver = driver_or!(());
    let _ = driver.destroy_swapchain(device, swapchain, unsafe { p_allocator.as_ref() });
}

unsafe extern "system" fn vkEnumerateInstanceExtensionProperties(
    p_layer_name: *const c_char,
    p_property_count: *mut u32,
    p_properties: *mut vk::ExtensionProperties,
) -> vk::Result {
    let driver = driver_or!(vk::Result::ERROR_INITIALIZATION_FAILED);
    let layer_name = if p_layer_name.is_null() {
        None
    } else {
        Some(unsafe { CStr::from_ptr(p_layer_name) })
    };
    let properties = unsafe { out_slice(p_property_count, p_properties) };
    let result = driver.enumerate_instance_extension_properties(layer_name, properties);
    unsafe { write_enumeration(result, p_property_count) }
}

unsafe extern "system" fn vkGetDeviceProcAddr(
    device: vk::Device,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    let driver = driver_or!(None);
    if p_name.is_null() {
        return None;
    }
    unsafe { driver.get_device_proc_addr(device, CStr::from_ptr(p_name)) }
}

unsafe extern "system" fn vkGetInstanceProcAddr(
    instance: vk::Instance,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    let driver = driver_or!(None);
    if p_name.is_null() {
        return None;
    }
    unsafe { driver.get_instance_proc_addr(instance, CStr::from_ptr(p_name)) }
}

unsafe extern "system" fn vkGetPhysicalDeviceSurfaceCapabilitiesKHR(
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    p_capabilities: *mut vk::SurfaceCapabilitiesKHR,
) -> vk::Result {
    let driver = driver_or!(vk::Result::ERROR_INITIALIZATION_FAILED);
    match driver.get_physical_device_surface_capabilities(physical_device, surface) {
        Ok(capabilities) => {
            if !p_capabilities.is_null() {
                unsafe { *p_capabilities = capabilities };
            }
            vk::Result::SUCCESS
        }
        Err(e) => e.to_vk_result(),
    }
}

unsafe extern "system" fn vkGetPhysicalDeviceSurfaceFormatsKHR(
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    p_surface_format_count: *mut u32,
    p_surface_formats: *mut vk::SurfaceFormatKHR,
) -> vk::Result {
    let driver = driver_or!(vk::Result::ERROR_INITIALIZATION_FAILED);
    let formats = unsafe { out_slice(p_surface_format_count, p_surface_formats) };
    let result = driver.get_physical_device_surface_formats(physical_device, surface, formats);
    unsafe { write_enumeration(result, p_surface_format_count) }
}

unsafe extern "system" fn vkGetPhysicalDeviceSurfacePresentModesKHR(
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    p_present_mode_count: *mut u32,
    p_present_modes: *mut vk::PresentModeKHR,
) -> vk::Result {
    let driver = driver_or!(vk::Result::ERROR_INITIALIZATION_FAILED);
    let modes = unsafe { out_slice(p_present_mode_count, p_present_modes) };
    let result = driver.get_physical_device_surface_present_modes(physical_device, surface, modes);
    unsafe { write_enumeration(result, p_present_mode_count) }
}

unsafe extern "system" fn vkGetPhysicalDeviceSurfaceSupportKHR(
    physical_device: vk::PhysicalDevice,
    queue_family_index: u32,
    surface: vk::SurfaceKHR,
    p_supported: *mut vk::Bool32,
) -> vk::Result {
    let driver = driver_or!(vk::Result::ERROR_INITIALIZATION_FAILED);
    match driver.get_physical_device_surface_support(physical_device, queue_family_index, surface) {
        Ok(supported) => {
            if !p_supported.is_null() {
                unsafe { *p_supported = if supported { vk::TRUE } else { vk::FALSE } };
            }
            vk::Result::SUCCESS
        }
        Err(e) => e.to_vk_result(),
    }
}

unsafe extern "system" fn vkGetPhysicalDeviceWin32PresentationSupportKHR(
    physical_device: vk::PhysicalDevice,
    queue_family_index: u32,
) -> vk::Bool32 {
    let driver = driver_or!(vk::FALSE);
    if unsafe { driver.get_physical_device_win32_presentation_support(physical_device, queue_family_index) } {
        vk::TRUE
    } else {
        vk::FALSE
    }
}

unsafe extern "system" fn vkGetSwapchainImagesKHR(
    device: vk::Device,
    swapchain: vk::SwapchainKHR,
    p_swapchain_image_count: *mut u32,
    p_swapchain_images: *mut vk::Image,
) -> vk::Result {
    let driver = driver_or!(vk::Result::ERROR_INITIALIZATION_FAILED);
    let images = unsafe { out_slice(p_swapchain_image_count, p_swapchain_images) };
    let result = driver.get_swapchain_images(device, swapchain, images);
    unsafe { write_enumeration(result, p_swapchain_image_count) }
}

unsafe extern "system" fn vkQueuePresentKHR(
    queue: vk::Queue,
    p_present_info: *const vk::PresentInfoKHR<'_>,
) -> vk::Result {
    let driver = driver_or!(vk::Result::ERROR_INITIALIZATION_FAILED);
    let Some(present_info) = (unsafe { p_present_info.as_ref() }) else {
        return DriverError::NotImplemented(Operation::QueuePresent).to_vk_result();
    };
    match driver.queue_present(queue, present_info) {
        Ok(()) => vk::Result::SUCCESS,
        Err(e) => e.to_vk_result(),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::driver::DRIVER_VERSION;

    #[test]
    fn version_mismatch_reads_no_configuration() {
        let loaded = Cell::new(false);
        let table = driver_table(DRIVER_VERSION + 1, || {
            loaded.set(true);
            config()
        });
        assert!(table.is_null());
        assert!(!loaded.get());
    }
}
