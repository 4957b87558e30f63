//! The fixed entry-point set of the presentation dispatch table.

use std::fmt;

/// How an entry point is backed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Support {
    /// Rewrites its arguments before calling the native driver.
    Translated,
    /// Calls the native driver with its arguments unchanged.
    Forwarded,
    /// Answered from data compiled into the driver.
    Static,
    /// Declared but unimplemented; always fails without a native call.
    Stub,
}

/// One entry of the dispatch table, in table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    AcquireNextImage,
    CreateInstance,
    CreateSwapchain,
    CreateWin32Surface,
    DestroyInstance,
    DestroySurface,
    DestroySwapchain,
    EnumerateInstanceExtensionProperties,
    GetDeviceProcAddr,
    GetInstanceProcAddr,
    GetPhysicalDeviceSurfaceCapabilities,
    GetPhysicalDeviceSurfaceFormats,
    GetPhysicalDeviceSurfacePresentModes,
    GetPhysicalDeviceSurfaceSupport,
    GetPhysicalDeviceWin32PresentationSupport,
    GetSwapchainImages,
    QueuePresent,
}

impl Operation {
    pub const ALL: [Operation; 17] = [
        Operation::AcquireNextImage,
        Operation::CreateInstance,
        Operation::CreateSwapchain,
        Operation::CreateWin32Surface,
        Operation::DestroyInstance,
        Operation::DestroySurface,
        Operation::DestroySwapchain,
        Operation::EnumerateInstanceExtensionProperties,
        Operation::GetDeviceProcAddr,
        Operation::GetInstanceProcAddr,
        Operation::GetPhysicalDeviceSurfaceCapabilities,
        Operation::GetPhysicalDeviceSurfaceFormats,
        Operation::GetPhysicalDeviceSurfacePresentModes,
        Operation::GetPhysicalDeviceSurfaceSupport,
        Operation::GetPhysicalDeviceWin32PresentationSupport,
        Operation::GetSwapchainImages,
        Operation::QueuePresent,
    ];

    /// The Vulkan command name of this entry point.
    pub fn entry_point(self) -> &'static str {
        match self {
            Operation::AcquireNextImage => "vkAcquireNextImageKHR",
            Operation::CreateInstance => "vkCreateInstance",
            Operation::CreateSwapchain => "vkCreateSwapchainKHR",
            Operation::CreateWin32Surface => "vkCreateWin32SurfaceKHR",
            Operation::DestroyInstance => "vkDestroyInstance",
            Operation::DestroySurface => "vkDestroySurfaceKHR",
            Operation::DestroySwapchain => "vkDestroySwapchainKHR",
            Operation::EnumerateInstanceExtensionProperties => {
                "vkEnumerateInstanceExtensionProperties"
            }
            Operation::GetDeviceProcAddr => "vkGetDeviceProcAddr",
            Operation::GetInstanceProcAddr => "vkGetInstanceProcAddr",
            Operation::GetPhysicalDeviceSurfaceCapabilities => {
                "vkGetPhysicalDeviceSurfaceCapabilitiesKHR"
            }
            Operation::GetPhysicalDeviceSurfaceFormats => "vkGetPhysicalDeviceSurfaceFormatsKHR",
            Operation::GetPhysicalDeviceSurfacePresentModes => {
                "vkGetPhysicalDeviceSurfacePresentModesKHR"
            }
            Operation::GetPhysicalDeviceSurfaceSupport => "vkGetPhysicalDeviceSurfaceSupportKHR",
            Operation::GetPhysicalDeviceWin32PresentationSupport => {
                "vkGetPhysicalDeviceWin32PresentationSupportKHR"
            }
            Operation::GetSwapchainImages => "vkGetSwapchainImagesKHR",
            Operation::QueuePresent => "vkQueuePresentKHR",
        }
    }

    pub fn support(self) -> Support {
        match self {
            Operation::CreateInstance | Operation::CreateWin32Surface | Operation::DestroySurface => {
                Support::Translated
            }
            Operation::DestroyInstance
            | Operation::GetDeviceProcAddr
            | Operation::GetInstanceProcAddr
            | Operation::GetPhysicalDeviceWin32PresentationSupport => Support::Forwarded,
            Operation::EnumerateInstanceExtensionProperties => Support::Static,
            Operation::AcquireNextImage
            | Operation::CreateSwapchain
            | Operation::DestroySwapchain
            | Operation::GetPhysicalDeviceSurfaceCapabilities
            | Operation::GetPhysicalDeviceSurfaceFormats
            | Operation::GetPhysicalDeviceSurfacePresentModes
            | Operation::GetPhysicalDeviceSurfaceSupport
            | Operation::GetSwapchainImages
            | Operation::QueuePresent => Support::Stub,
        }
    }

    pub fn is_stub(self) -> bool {
        self.support() == Support::Stub
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entry_point())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_order_is_alphabetical_by_entry_point() {
        let names: Vec<_> = Operation::ALL.iter().map(|op| op.entry_point()).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[test]
    fn stub_set() {
        let stubs: Vec<_> = Operation::ALL.into_iter().filter(|op| op.is_stub()).collect();
        assert_eq!(
            stubs,
            vec![
                Operation::AcquireNextImage,
                Operation::CreateSwapchain,
                Operation::DestroySwapchain,
                Operation::GetPhysicalDeviceSurfaceCapabilities,
                Operation::GetPhysicalDeviceSurfaceFormats,
                Operation::GetPhysicalDeviceSurfacePresentModes,
                Operation::GetPhysicalDeviceSurfaceSupport,
                Operation::GetSwapchainImages,
                Operation::QueuePresent,
            ]
        );
        assert_eq!(
            Operation::GetPhysicalDeviceWin32PresentationSupport.support(),
            Support::Forwarded
        );
    }
}
