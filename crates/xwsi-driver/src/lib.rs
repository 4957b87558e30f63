//! Win32 surface presentation for Vulkan on X11.
//!
//! Applications ask for `VK_KHR_win32_surface` and hand over window handles.
//! This crate rewrites instance creation so the native driver sees
//! `VK_KHR_xlib_surface` instead, backs every Win32 surface with a native
//! child window and an Xlib surface, and exposes the result to the host as a
//! versioned table of C entry points (see [`ffi::get_vulkan_driver`]).
//!
//! Swapchain and surface-query entry points are stubs: they log their
//! arguments and fail without touching the native driver.

pub mod bindings;
pub mod dispatch;
pub mod driver;
pub mod extensions;
pub mod ffi;
pub mod instance;
pub mod surface;
pub mod translate;

pub use bindings::{BindingState, LibraryLoader, NativeBindings, NativeFns, NativeLoader};
pub use dispatch::{Enumeration, VulkanDriver};
pub use driver::{check_version, DriverFactory, X11Driver, DRIVER_VERSION};
pub use surface::{SurfaceStore, WindowSystem};
