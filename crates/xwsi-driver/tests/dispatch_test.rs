//! Integration test: dispatch table entry points
//!
//! Extension enumeration, forwarded lookups, presentation support and the
//! stubbed swapchain and surface-query entries.
//!
//! Run with: cargo test -p xwsi-driver --test dispatch_test

mod common;

use std::ffi::CStr;

use ash::vk;
use ash::vk::Handle;
use common::*;
use xwsi_core::{DriverError, Operation};
use xwsi_driver::{Enumeration, VulkanDriver};

fn extension_name(props: &vk::ExtensionProperties) -> &CStr {
    unsafe { CStr::from_ptr(props.extension_name.as_ptr()) }
}

fn assert_stub<T: std::fmt::Debug>(result: Result<T, DriverError>, op: Operation) {
    let err = result.unwrap_err();
    assert_eq!(err, DriverError::NotImplemented(op));
    assert_eq!(err.to_vk_result(), vk::Result::ERROR_OUT_OF_HOST_MEMORY);
}

#[test]
fn test_enumerate_count_only() {
    let (driver, _windows) = fake_driver();
    let result = driver.enumerate_instance_extension_properties(None, None).expect("enumerate");
    assert_eq!(result, Enumeration::Complete(2));
    assert_eq!(result.to_vk(), vk::Result::SUCCESS);
}

#[test]
fn test_enumerate_short_buffer() {
    let (driver, _windows) = fake_driver();
    let mut props = [vk::ExtensionProperties::default(); 1];
    let result = driver
        .enumerate_instance_extension_properties(None, Some(&mut props))
        .expect("enumerate");

    assert_eq!(result, Enumeration::Incomplete(1));
    assert_eq!(result.to_vk(), vk::Result::INCOMPLETE);
    assert_eq!(extension_name(&props[0]), c"VK_KHR_surface");
    assert_eq!(props[0].spec_version, 1);
}

#[test]
fn test_enumerate_large_buffer() {
    let (driver, _windows) = fake_driver();
    let mut props = [vk::ExtensionProperties::default(); 4];
    let result = driver
        .enumerate_instance_extension_properties(None, Some(&mut props))
        .expect("enumerate");

    assert_eq!(result, Enumeration::Complete(2));
    assert_eq!(extension_name(&props[0]), c"VK_KHR_surface");
    assert_eq!(extension_name(&props[1]), c"VK_KHR_win32_surface");
    assert_eq!(props[1].spec_version, 1);
    assert_eq!(props[2].spec_version, 0);
}

#[test]
fn test_enumerate_empty_buffer() {
    let (driver, _windows) = fake_driver();
    let mut props: [vk::ExtensionProperties; 0] = [];
    let result = driver
        .enumerate_instance_extension_properties(None, Some(&mut props))
        .expect("enumerate");
    assert_eq!(result, Enumeration::Incomplete(0));
}

#[test]
fn test_enumerate_layer_rejected() {
    let (driver, _windows) = fake_driver();
    let mut props = [vk::ExtensionProperties::default(); 2];
    let err = driver
        .enumerate_instance_extension_properties(Some(c"VK_LAYER_KHRONOS_validation"), Some(&mut props))
        .unwrap_err();

    assert_eq!(err, DriverError::LayerNotPresent);
    assert_eq!(err.to_vk_result(), vk::Result::ERROR_LAYER_NOT_PRESENT);
    assert_eq!(props[0].spec_version, 0);
}

#[test]
fn test_presentation_support_follows_native() {
    let (driver, _windows) = fake_driver();
    let gpu = vk::PhysicalDevice::from_raw(0x77);

    assert!(unsafe { driver.get_physical_device_win32_presentation_support(gpu, 3) });

    set_behavior(NativeBehavior {
        presentation_support: vk::FALSE,
        ..NativeBehavior::default()
    });
    assert!(!unsafe { driver.get_physical_device_win32_presentation_support(gpu, 3) });

    let queries = native_log(|log| log.presentation_queries.clone());
    assert_eq!(queries, [(gpu, 3, FAKE_DISPLAY, FAKE_VISUAL); 2]);
}

#[test]
fn test_proc_addr_forwarded() {
    let (driver, _windows) = fake_driver();

    let found = unsafe { driver.get_instance_proc_addr(vk::Instance::null(), c"vkFakeEntry") };
    assert!(found.is_some());
    let missing = unsafe { driver.get_device_proc_addr(vk::Device::null(), c"vkNoSuchEntry") };
    assert!(missing.is_none());

    let lookups = native_log(|log| log.proc_lookups.clone());
    assert_eq!(lookups, ["vkFakeEntry", "vkNoSuchEntry"]);
}

#[test]
fn test_stubs_fail_without_native_calls() {
    let (driver, _windows) = fake_driver();
    let device = vk::Device::from_raw(0x5);
    let swapchain = vk::SwapchainKHR::from_raw(0x6);
    let gpu = vk::PhysicalDevice::from_raw(0x7);
    let surface = vk::SurfaceKHR::from_raw(0x8);

    assert_stub(
        driver.acquire_next_image(device, swapchain, u64::MAX, vk::Semaphore::null(), vk::Fence::null()),
        Operation::AcquireNextImage,
    );
    assert_stub(
        driver.create_swapchain(device, &vk::SwapchainCreateInfoKHR::default(), None),
        Operation::CreateSwapchain,
    );
    assert_stub(
        driver.destroy_swapchain(device, swapchain, None),
        Operation::DestroySwapchain,
    );
    assert_stub(
        driver.get_physical_device_surface_capabilities(gpu, surface),
        Operation::GetPhysicalDeviceSurfaceCapabilities,
    );

    let mut formats = [vk::SurfaceFormatKHR::default(); 4];
    assert_stub(
        driver.get_physical_device_surface_formats(gpu, surface, Some(&mut formats)),
        Operation::GetPhysicalDeviceSurfaceFormats,
    );
    assert_stub(
        driver.get_physical_device_surface_present_modes(gpu, surface, None),
        Operation::GetPhysicalDeviceSurfacePresentModes,
    );
    assert_stub(
        driver.get_physical_device_surface_support(gpu, 0, surface),
        Operation::GetPhysicalDeviceSurfaceSupport,
    );
    assert_stub(
        driver.get_swapchain_images(device, swapchain, None),
        Operation::GetSwapchainImages,
    );
    assert_stub(
        driver.queue_present(vk::Queue::from_raw(0x9), &vk::PresentInfoKHR::default()),
        Operation::QueuePresent,
    );

    assert_eq!(native_log(|log| log.total_calls()), 0);
}

#[test]
fn test_every_stub_is_declared() {
    let stubs: Vec<_> = Operation::ALL.iter().filter(|op| op.is_stub()).collect();
    assert_eq!(stubs.len(), 9);
}
