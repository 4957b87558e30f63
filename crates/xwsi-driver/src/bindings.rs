//! Native graphics library binding table.
//!
//! Uses `libloading` to open the host's Vulkan loader (`libvulkan.so.1` on
//! Linux) and resolves the handful of entry points the translation layer
//! calls directly. Resolution is all-or-nothing.

use std::ffi::{c_char, c_void, CStr};
use std::fmt;
use std::ptr::{self, NonNull};
use std::sync::Arc;

use ash::prelude::VkResult;
use ash::vk;
use libloading::{Library, Symbol};
use tracing::{debug, error, info};
use xwsi_core::{DriverError, DriverResult};

pub type FnCreateInstance = unsafe extern "system" fn(
    p_create_info: *const vk::InstanceCreateInfo<'_>,
    p_allocator: *const vk::AllocationCallbacks<'_>,
    p_instance: *mut vk::Instance,
) -> vk::Result;
pub type FnCreateXlibSurface = unsafe extern "system" fn(
    instance: vk::Instance,
    p_create_info: *const vk::XlibSurfaceCreateInfoKHR<'_>,
    p_allocator: *const vk::AllocationCallbacks<'_>,
    p_surface: *mut vk::SurfaceKHR,
) -> vk::Result;
pub type FnDestroyInstance =
    unsafe extern "system" fn(instance: vk::Instance, p_allocator: *const vk::AllocationCallbacks<'_>);
pub type FnDestroySurface = unsafe extern "system" fn(
    instance: vk::Instance,
    surface: vk::SurfaceKHR,
    p_allocator: *const vk::AllocationCallbacks<'_>,
);
pub type FnGetDeviceProcAddr =
    unsafe extern "system" fn(device: vk::Device, p_name: *const c_char) -> vk::PFN_vkVoidFunction;
pub type FnGetInstanceProcAddr =
    unsafe extern "system" fn(instance: vk::Instance, p_name: *const c_char) -> vk::PFN_vkVoidFunction;
pub type FnXlibPresentationSupport = unsafe extern "system" fn(
    physical_device: vk::PhysicalDevice,
    queue_family_index: u32,
    dpy: *mut vk::Display,
    visual_id: vk::VisualID,
) -> vk::Bool32;

/// Every symbol the binding table needs, in resolution order.
pub const REQUIRED_SYMBOLS: [&CStr; 7] = [
    c"vkCreateInstance",
    c"vkCreateXlibSurfaceKHR",
    c"vkDestroyInstance",
    c"vkDestroySurfaceKHR",
    c"vkGetDeviceProcAddr",
    c"vkGetInstanceProcAddr",
    c"vkGetPhysicalDeviceXlibPresentationSupportKHR",
];

/// Anything symbols can be looked up in.
pub trait SymbolSource {
    fn resolve(&self, symbol: &CStr) -> Option<NonNull<c_void>>;
}

impl SymbolSource for Library {
    fn resolve(&self, symbol: &CStr) -> Option<NonNull<c_void>> {
        let sym: Symbol<*mut c_void> = unsafe { self.get(symbol.to_bytes_with_nul()) }.ok()?;
        NonNull::new(*sym)
    }
}

/// The resolved native entry points.
#[derive(Clone, Copy)]
pub struct NativeFns {
    pub create_instance: FnCreateInstance,
    pub create_xlib_surface: FnCreateXlibSurface,
    pub destroy_instance: FnDestroyInstance,
    pub destroy_surface: FnDestroySurface,
    pub get_device_proc_addr: FnGetDeviceProcAddr,
    pub get_instance_proc_addr: FnGetInstanceProcAddr,
    pub xlib_presentation_support: FnXlibPresentationSupport,
}

impl NativeFns {
    /// Resolve every entry point from `source`, failing on the first one missing.
    pub fn resolve<S: SymbolSource + ?Sized>(source: &S) -> DriverResult<Self> {
        unsafe {
            Ok(Self {
                create_instance: load_fn(source, REQUIRED_SYMBOLS[0])?,
                create_xlib_surface: load_fn(source, REQUIRED_SYMBOLS[1])?,
                destroy_instance: load_fn(source, REQUIRED_SYMBOLS[2])?,
                destroy_surface: load_fn(source, REQUIRED_SYMBOLS[3])?,
                get_device_proc_addr: load_fn(source, REQUIRED_SYMBOLS[4])?,
                get_instance_proc_addr: load_fn(source, REQUIRED_SYMBOLS[5])?,
                xlib_presentation_support: load_fn(source, REQUIRED_SYMBOLS[6])?,
            })
        }
    }
}

/// # Safety
/// `F` must be a function pointer type matching the symbol's real signature.
unsafe fn load_fn<S: SymbolSource + ?Sized, F: Copy>(source: &S, name: &CStr) -> DriverResult<F> {
    debug_assert_eq!(std::mem::size_of::<F>(), std::mem::size_of::<*mut c_void>());
    let ptr = source.resolve(name).ok_or_else(|| {
        DriverError::MissingSymbol(name.to_string_lossy().into_owned())
    })?;
    Ok(unsafe { std::mem::transmute_copy::<*mut c_void, F>(&ptr.as_ptr()) })
}

/// Immutable native binding table. Keeps the library mapped for as long as
/// the table lives.
pub struct NativeBindings {
    fns: NativeFns,
    _library: Option<Library>,
}

impl NativeBindings {
    /// Wrap entry points that were resolved elsewhere.
    pub fn from_fns(fns: NativeFns) -> Self {
        Self { fns, _library: None }
    }

    /// Open the first loadable library from `candidates` and resolve the table.
    pub fn open(candidates: &[String]) -> DriverResult<Self> {
        let library = load_library(candidates)?;
        let fns = NativeFns::resolve(&library)?;
        info!("native Vulkan bindings resolved");
        Ok(Self {
            fns,
            _library: Some(library),
        })
    }

    /// # Safety
    /// `create_info` must be a valid, fully initialized descriptor.
    pub unsafe fn create_instance(&self, create_info: &vk::InstanceCreateInfo<'_>) -> VkResult<vk::Instance> {
        let mut instance = vk::Instance::null();
        let res = unsafe { (self.fns.create_instance)(create_info, ptr::null(), &mut instance) };
        res.result_with_success(instance)
    }

    /// # Safety
    /// `instance` must be a live native instance.
    pub unsafe fn destroy_instance(&self, instance: vk::Instance) {
        unsafe { (self.fns.destroy_instance)(instance, ptr::null()) }
    }

    /// # Safety
    /// `instance` must be a live native instance and `create_info` must name
    /// a window on the display it carries.
    pub unsafe fn create_xlib_surface(
        &self,
        instance: vk::Instance,
        create_info: &vk::XlibSurfaceCreateInfoKHR<'_>,
    ) -> VkResult<vk::SurfaceKHR> {
        let mut surface = vk::SurfaceKHR::null();
        let res = unsafe {
            (self.fns.create_xlib_surface)(instance, create_info, ptr::null(), &mut surface)
        };
        res.result_with_success(surface)
    }

    /// # Safety
    /// `surface` must have been created from `instance` and not yet destroyed.
    pub unsafe fn destroy_surface(&self, instance: vk::Instance, surface: vk::SurfaceKHR) {
        unsafe { (self.fns.destroy_surface)(instance, surface, ptr::null()) }
    }

    /// # Safety
    /// `name` must be NUL-terminated and `device` valid for the native loader.
    pub unsafe fn get_device_proc_addr(&self, device: vk::Device, name: &CStr) -> vk::PFN_vkVoidFunction {
        unsafe { (self.fns.get_device_proc_addr)(device, name.as_ptr()) }
    }

    /// # Safety
    /// `instance` must be null or a live native instance.
    pub unsafe fn get_instance_proc_addr(
        &self,
        instance: vk::Instance,
        name: &CStr,
    ) -> vk::PFN_vkVoidFunction {
        unsafe { (self.fns.get_instance_proc_addr)(instance, name.as_ptr()) }
    }

    /// # Safety
    /// `display` must be an open connection and `physical_device` a native handle.
    pub unsafe fn xlib_presentation_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family_index: u32,
        display: *mut vk::Display,
        visual_id: vk::VisualID,
    ) -> bool {
        let supported = unsafe {
            (self.fns.xlib_presentation_support)(physical_device, queue_family_index, display, visual_id)
        };
        supported != vk::FALSE
    }
}

impl fmt::Debug for NativeBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeBindings")
            .field("library", &self._library.is_some())
            .finish_non_exhaustive()
    }
}

fn load_library(candidates: &[String]) -> DriverResult<Library> {
    let mut last_err = String::from("no library candidates configured");
    for name in candidates {
        match unsafe { Library::new(name) } {
            Ok(lib) => {
                info!("loaded native Vulkan library from: {}", name);
                return Ok(lib);
            }
            Err(e) => {
                last_err = format!("{}: {}", name, e);
                debug!("failed to load {}: {}", name, e);
            }
        }
    }
    Err(DriverError::LibraryUnavailable(last_err))
}

/// Produces a binding table on demand.
pub trait NativeLoader {
    fn load(&self) -> DriverResult<NativeBindings>;
}

/// Loads the table from the native Vulkan library on disk.
#[derive(Debug, Clone)]
pub struct LibraryLoader {
    pub candidates: Vec<String>,
}

impl LibraryLoader {
    pub fn new(candidates: Vec<String>) -> Self {
        Self { candidates }
    }
}

impl NativeLoader for LibraryLoader {
    fn load(&self) -> DriverResult<NativeBindings> {
        NativeBindings::open(&self.candidates)
    }
}

impl<F> NativeLoader for F
where
    F: Fn() -> DriverResult<NativeBindings>,
{
    fn load(&self) -> DriverResult<NativeBindings> {
        self()
    }
}

/// Initialization state of the binding table.
#[derive(Debug, Default)]
pub enum BindingState {
    #[default]
    Uninitialized,
    Ready(Arc<NativeBindings>),
    Unavailable,
}

impl BindingState {
    /// Load on first call, then keep answering with the same outcome.
    /// A failed load is never retried.
    pub fn initialize<L: NativeLoader + ?Sized>(&mut self, loader: &L) -> Option<Arc<NativeBindings>> {
        match self {
            BindingState::Ready(bindings) => return Some(Arc::clone(bindings)),
            BindingState::Unavailable => return None,
            BindingState::Uninitialized => {}
        }

        match loader.load() {
            Ok(bindings) => {
                let bindings = Arc::new(bindings);
                *self = BindingState::Ready(Arc::clone(&bindings));
                Some(bindings)
            }
            Err(e) => {
                error!("native Vulkan bindings unavailable: {}", e);
                *self = BindingState::Unavailable;
                None
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, BindingState::Ready(_))
    }
}
