//! The presentation dispatch table as a Rust trait.
//!
//! One method per table entry, in table order. Entry points whose
//! [`Operation::support`] is [`Support::Stub`](xwsi_core::Support::Stub)
//! return [`DriverError::NotImplemented`] and never reach the native driver.

use std::ffi::CStr;

use ash::vk;
use tracing::warn;
use xwsi_core::{DriverError, DriverResult, Operation};

/// Outcome of a count/array query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enumeration {
    /// Every element was reported; holds the count written or available.
    Complete(u32),
    /// The caller's buffer was too short; holds the count written.
    Incomplete(u32),
}

impl Enumeration {
    pub fn count(self) -> u32 {
        match self {
            Enumeration::Complete(n) | Enumeration::Incomplete(n) => n,
        }
    }

    pub fn to_vk(self) -> vk::Result {
        match self {
            Enumeration::Complete(_) => vk::Result::SUCCESS,
            Enumeration::Incomplete(_) => vk::Result::INCOMPLETE,
        }
    }
}

pub(crate) fn stub<T>(op: Operation, args: std::fmt::Arguments<'_>) -> DriverResult<T> {
    warn!("stub: {} {}", op, args);
    Err(DriverError::NotImplemented(op))
}

pub trait VulkanDriver: Send + Sync {
    fn acquire_next_image(
        &self,
        device: vk::Device,
        swapchain: vk::SwapchainKHR,
        timeout: u64,
        semaphore: vk::Semaphore,
        fence: vk::Fence,
    ) -> DriverResult<u32>;

    /// # Safety
    /// `create_info` must be a valid `VkInstanceCreateInfo`.
    unsafe fn create_instance(
        &self,
        create_info: &vk::InstanceCreateInfo<'_>,
        allocator: Option<&vk::AllocationCallbacks<'_>>,
    ) -> DriverResult<vk::Instance>;

    fn create_swapchain(
        &self,
        device: vk::Device,
        create_info: &vk::SwapchainCreateInfoKHR<'_>,
        allocator: Option<&vk::AllocationCallbacks<'_>>,
    ) -> DriverResult<vk::SwapchainKHR>;

    /// # Safety
    /// `instance` must not be destroyed concurrently.
    unsafe fn create_win32_surface(
        &self,
        instance: vk::Instance,
        create_info: &vk::Win32SurfaceCreateInfoKHR<'_>,
        allocator: Option<&vk::AllocationCallbacks<'_>>,
    ) -> DriverResult<vk::SurfaceKHR>;

    /// # Safety
    /// No other thread may use `instance` concurrently.
    unsafe fn destroy_instance(
        &self,
        instance: vk::Instance,
        allocator: Option<&vk::AllocationCallbacks<'_>>,
    ) -> DriverResult<()>;

    /// # Safety
    /// No other thread may use `surface` concurrently.
    unsafe fn destroy_surface(
        &self,
        instance: vk::Instance,
        surface: vk::SurfaceKHR,
        allocator: Option<&vk::AllocationCallbacks<'_>>,
    ) -> DriverResult<()>;

    fn destroy_swapchain(
        &self,
        device: vk::Device,
        swapchain: vk::SwapchainKHR,
        allocator: Option<&vk::AllocationCallbacks<'_>>,
    ) -> DriverResult<()>;

    fn enumerate_instance_extension_properties(
        &self,
        layer_name: Option<&CStr>,
        properties: Option<&mut [vk::ExtensionProperties]>,
    ) -> DriverResult<Enumeration>;

    /// # Safety
    /// `device` must be a native device handle or null.
    unsafe fn get_device_proc_addr(&self, device: vk::Device, name: &CStr) -> vk::PFN_vkVoidFunction;

    /// # Safety
    /// `instance` must be a native instance handle or null.
    unsafe fn get_instance_proc_addr(
        &self,
        instance: vk::Instance,
        name: &CStr,
    ) -> vk::PFN_vkVoidFunction;

    fn get_physical_device_surface_capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> DriverResult<vk::SurfaceCapabilitiesKHR>;

    fn get_physical_device_surface_formats(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        formats: Option<&mut [vk::SurfaceFormatKHR]>,
    ) -> DriverResult<Enumeration>;

    fn get_physical_device_surface_present_modes(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        modes: Option<&mut [vk::PresentModeKHR]>,
    ) -> DriverResult<Enumeration>;

    fn get_physical_device_surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family_index: u32,
        surface: vk::SurfaceKHR,
    ) -> DriverResult<bool>;

    /// # Safety
    /// `physical_device` must be a native physical device handle.
    unsafe fn get_physical_device_win32_presentation_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family_index: u32,
    ) -> bool;

    fn get_swapchain_images(
        &self,
        device: vk::Device,
        swapchain: vk::SwapchainKHR,
        images: Option<&mut [vk::Image]>,
    ) -> DriverResult<Enumeration>;

    fn queue_present(&self, queue: vk::Queue, present_info: &vk::PresentInfoKHR<'_>) -> DriverResult<()>;
}
