//! Fake native driver and window system shared by the integration tests.
//!
//! The native entry points record what they were called with in
//! thread-local logs, so tests running in parallel do not see each other's
//! calls. Handle values come from a process-wide counter and never repeat.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::ffi::{c_char, CStr};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use ash::vk;
use ash::vk::Handle;
use parking_lot::Mutex;
use xwsi_driver::{NativeBindings, NativeFns, VulkanDriver, WindowSystem, X11Driver};

pub const FAKE_DISPLAY: usize = 0xd15;
pub const FAKE_VISUAL: vk::VisualID = 0x21;

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(0x1000);

fn next_handle() -> u64 {
    NEXT_HANDLE.fetch_add(1, Ordering::Relaxed)
}

// ── Native driver fake ──────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CreatedInstance {
    pub instance: vk::Instance,
    pub extensions: Vec<String>,
    pub layer_count: u32,
    pub layer_names_null: bool,
    pub chain_null: bool,
    pub application_info: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct CreatedSurface {
    pub instance: vk::Instance,
    pub window: vk::Window,
    pub display: usize,
    pub surface: vk::SurfaceKHR,
}

#[derive(Debug, Default)]
pub struct NativeLog {
    pub created_instances: Vec<CreatedInstance>,
    pub destroyed_instances: Vec<vk::Instance>,
    pub created_surfaces: Vec<CreatedSurface>,
    pub destroyed_surfaces: Vec<(vk::Instance, vk::SurfaceKHR)>,
    pub proc_lookups: Vec<String>,
    pub presentation_queries: Vec<(vk::PhysicalDevice, u32, usize, vk::VisualID)>,
}

impl NativeLog {
    pub fn total_calls(&self) -> usize {
        self.created_instances.len()
            + self.destroyed_instances.len()
            + self.created_surfaces.len()
            + self.destroyed_surfaces.len()
            + self.proc_lookups.len()
            + self.presentation_queries.len()
    }
}

/// What the fake native driver answers with.
#[derive(Debug, Clone, Copy)]
pub struct NativeBehavior {
    pub create_instance: vk::Result,
    pub create_surface: vk::Result,
    pub presentation_support: vk::Bool32,
}

impl Default for NativeBehavior {
    fn default() -> Self {
        Self {
            create_instance: vk::Result::SUCCESS,
            create_surface: vk::Result::SUCCESS,
            presentation_support: vk::TRUE,
        }
    }
}

thread_local! {
    static LOG: RefCell<NativeLog> = RefCell::new(NativeLog::default());
    static BEHAVIOR: Cell<NativeBehavior> = Cell::new(NativeBehavior::default());
}

pub fn native_log<R>(f: impl FnOnce(&NativeLog) -> R) -> R {
    LOG.with(|log| f(&log.borrow()))
}

pub fn set_behavior(behavior: NativeBehavior) {
    BEHAVIOR.with(|b| b.set(behavior));
}

fn behavior() -> NativeBehavior {
    BEHAVIOR.with(|b| b.get())
}

fn record(f: impl FnOnce(&mut NativeLog)) {
    LOG.with(|log| f(&mut log.borrow_mut()));
}

unsafe extern "system" fn fake_create_instance(
    p_create_info: *const vk::InstanceCreateInfo<'_>,
    _p_allocator: *const vk::AllocationCallbacks<'_>,
    p_instance: *mut vk::Instance,
) -> vk::Result {
    let result = behavior().create_instance;
    if result != vk::Result::SUCCESS {
        return result;
    }

    let info = unsafe { &*p_create_info };
    let extensions = (0..info.enabled_extension_count as usize)
        .map(|i| {
            let name = unsafe { CStr::from_ptr(*info.pp_enabled_extension_names.add(i)) };
            name.to_string_lossy().into_owned()
        })
        .collect();

    let instance = vk::Instance::from_raw(next_handle());
    unsafe { *p_instance = instance };
    record(|log| {
        log.created_instances.push(CreatedInstance {
            instance,
            extensions,
            layer_count: info.enabled_layer_count,
            layer_names_null: info.pp_enabled_layer_names.is_null(),
            chain_null: info.p_next.is_null(),
            application_info: info.p_application_info as usize,
        })
    });
    vk::Result::SUCCESS
}

unsafe extern "system" fn fake_destroy_instance(
    instance: vk::Instance,
    _p_allocator: *const vk::AllocationCallbacks<'_>,
) {
    record(|log| log.destroyed_instances.push(instance));
}

unsafe extern "system" fn fake_create_xlib_surface(
    instance: vk::Instance,
    p_create_info: *const vk::XlibSurfaceCreateInfoKHR<'_>,
    _p_allocator: *const vk::AllocationCallbacks<'_>,
    p_surface: *mut vk::SurfaceKHR,
) -> vk::Result {
    let result = behavior().create_surface;
    if result != vk::Result::SUCCESS {
        return result;
    }

    let info = unsafe { &*p_create_info };
    let surface = vk::SurfaceKHR::from_raw(next_handle());
    unsafe { *p_surface = surface };
    record(|log| {
        log.created_surfaces.push(CreatedSurface {
            instance,
            window: info.window,
            display: info.dpy as usize,
            surface,
        })
    });
    vk::Result::SUCCESS
}

unsafe extern "system" fn fake_destroy_surface(
    instance: vk::Instance,
    surface: vk::SurfaceKHR,
    _p_allocator: *const vk::AllocationCallbacks<'_>,
) {
    record(|log| log.destroyed_surfaces.push((instance, surface)));
}

unsafe extern "system" fn fake_entry_point() {}

unsafe extern "system" fn fake_get_device_proc_addr(
    _device: vk::Device,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    lookup(p_name)
}

unsafe extern "system" fn fake_get_instance_proc_addr(
    _instance: vk::Instance,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    lookup(p_name)
}

fn lookup(p_name: *const c_char) -> vk::PFN_vkVoidFunction {
    let name = unsafe { CStr::from_ptr(p_name) }.to_string_lossy().into_owned();
    let found = name == "vkFakeEntry";
    record(|log| log.proc_lookups.push(name));
    if found {
        Some(fake_entry_point)
    } else {
        None
    }
}

unsafe extern "system" fn fake_xlib_presentation_support(
    physical_device: vk::PhysicalDevice,
    queue_family_index: u32,
    dpy: *mut vk::Display,
    visual_id: vk::VisualID,
) -> vk::Bool32 {
    record(|log| {
        log.presentation_queries
            .push((physical_device, queue_family_index, dpy as usize, visual_id))
    });
    behavior().presentation_support
}

pub fn fake_fns() -> NativeFns {
    NativeFns {
        create_instance: fake_create_instance,
        create_xlib_surface: fake_create_xlib_surface,
        destroy_instance: fake_destroy_instance,
        destroy_surface: fake_destroy_surface,
        get_device_proc_addr: fake_get_device_proc_addr,
        get_instance_proc_addr: fake_get_instance_proc_addr,
        xlib_presentation_support: fake_xlib_presentation_support,
    }
}

pub fn fake_bindings() -> NativeBindings {
    NativeBindings::from_fns(fake_fns())
}

// ── Window system fake ──────────────────────────────────────

#[derive(Default)]
pub struct FakeWindows {
    child_hwnds: Mutex<HashSet<usize>>,
    fail_create: AtomicBool,
    next_window: AtomicU64,
    created: Mutex<Vec<(usize, vk::Window, vk::VisualID)>>,
    destroyed: Mutex<Vec<vk::Window>>,
}

impl FakeWindows {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_window: AtomicU64::new(0x400001),
            ..Self::default()
        })
    }

    /// Make `hwnd` report a parent other than the desktop.
    pub fn mark_child(&self, hwnd: vk::HWND) {
        self.child_hwnds.lock().insert(hwnd as usize);
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn created(&self) -> Vec<(usize, vk::Window, vk::VisualID)> {
        self.created.lock().clone()
    }

    pub fn destroyed(&self) -> Vec<vk::Window> {
        self.destroyed.lock().clone()
    }
}

impl WindowSystem for FakeWindows {
    fn display(&self) -> *mut vk::Display {
        FAKE_DISPLAY as *mut vk::Display
    }

    fn default_visual_id(&self) -> vk::VisualID {
        FAKE_VISUAL
    }

    fn parent_is_desktop(&self, hwnd: vk::HWND) -> bool {
        !self.child_hwnds.lock().contains(&(hwnd as usize))
    }

    fn create_child_window(&self, parent: vk::HWND, visual: vk::VisualID) -> Option<vk::Window> {
        if self.fail_create.load(Ordering::SeqCst) {
            return None;
        }
        let window = self.next_window.fetch_add(1, Ordering::SeqCst) as vk::Window;
        self.created.lock().push((parent as usize, window, visual));
        Some(window)
    }

    fn destroy_window(&self, window: vk::Window) {
        self.destroyed.lock().push(window);
    }
}

// ── Helpers ─────────────────────────────────────────────────

pub fn hwnd(value: usize) -> vk::HWND {
    value as vk::HWND
}

pub fn fake_driver() -> (X11Driver, Arc<FakeWindows>) {
    let windows = FakeWindows::new();
    let system: Arc<dyn WindowSystem> = windows.clone();
    (X11Driver::new(Arc::new(fake_bindings()), system), windows)
}

pub fn create_win32_instance(driver: &X11Driver) -> vk::Instance {
    let names = [c"VK_KHR_surface".as_ptr(), c"VK_KHR_win32_surface".as_ptr()];
    let info = vk::InstanceCreateInfo::default().enabled_extension_names(&names);
    unsafe { driver.create_instance(&info, None) }.expect("instance creation failed")
}

pub fn create_surface_for(
    driver: &X11Driver,
    instance: vk::Instance,
    window: vk::HWND,
) -> Result<vk::SurfaceKHR, xwsi_core::DriverError> {
    let info = vk::Win32SurfaceCreateInfoKHR::default().hwnd(window);
    unsafe { driver.create_win32_surface(instance, &info, None) }
}
