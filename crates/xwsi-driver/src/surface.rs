//! Surface objects: a native child window plus the Xlib surface created on it.

use std::fmt;
use std::sync::Arc;

use ash::vk;
use ash::vk::Handle;
use tracing::{error, trace};
use xwsi_core::handle_map::HandleArena;
use xwsi_core::{DriverError, DriverResult, HandleKind};

use crate::bindings::NativeBindings;

/// Host window-system primitives the driver relies on.
pub trait WindowSystem: Send + Sync {
    /// The process-wide display connection.
    fn display(&self) -> *mut vk::Display;

    fn default_visual_id(&self) -> vk::VisualID;

    /// Whether the immediate ancestor of `hwnd` is the desktop window.
    fn parent_is_desktop(&self, hwnd: vk::HWND) -> bool;

    /// Create a native window that tracks the client area of `parent`.
    fn create_child_window(&self, parent: vk::HWND, visual: vk::VisualID) -> Option<vk::Window>;

    fn destroy_window(&self, window: vk::Window);
}

/// A native window destroyed when dropped.
pub struct ChildWindow {
    window: vk::Window,
    windows: Arc<dyn WindowSystem>,
}

impl ChildWindow {
    pub fn create(
        windows: &Arc<dyn WindowSystem>,
        parent: vk::HWND,
        visual: vk::VisualID,
    ) -> Option<Self> {
        let window = windows.create_child_window(parent, visual)?;
        Some(Self {
            window,
            windows: Arc::clone(windows),
        })
    }

    pub fn id(&self) -> vk::Window {
        self.window
    }
}

impl Drop for ChildWindow {
    fn drop(&mut self) {
        trace!("destroying native window {:#x}", self.window);
        self.windows.destroy_window(self.window);
    }
}

impl fmt::Debug for ChildWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ChildWindow").field(&self.window).finish()
    }
}

#[derive(Debug)]
pub struct Surface {
    pub instance: vk::Instance,
    pub window: ChildWindow,
    /// Null until the native driver has created the surface.
    pub native: vk::SurfaceKHR,
}

/// Live surfaces, addressed by generation-checked handles.
#[derive(Default)]
pub struct SurfaceStore {
    arena: HandleArena<Surface>,
}

impl SurfaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove the surface behind `handle` if it is live and was created from
    /// `instance`.
    pub fn take(&self, instance: vk::Instance, handle: vk::SurfaceKHR) -> DriverResult<Surface> {
        let raw = handle.as_raw();
        let invalid = DriverError::InvalidHandle {
            kind: HandleKind::Surface,
            raw,
        };
        match self.arena.with(raw, |s| s.instance == instance) {
            Some(true) => self.arena.remove(raw).ok_or(invalid),
            Some(false) => {
                error!("surface {:#x} does not belong to instance {:?}", raw, instance);
                Err(invalid)
            }
            None => Err(invalid),
        }
    }

    /// The native handle behind `handle`, if it is live.
    pub fn native(&self, handle: vk::SurfaceKHR) -> Option<vk::SurfaceKHR> {
        self.arena.with(handle.as_raw(), |s| s.native)
    }

    pub fn window(&self, handle: vk::SurfaceKHR) -> Option<vk::Window> {
        self.arena.with(handle.as_raw(), |s| s.window.id())
    }

    pub fn drain_for(&self, instance: vk::Instance) -> Vec<Surface> {
        self.arena.drain_where(|s| s.instance == instance)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }
}

/// Create an Xlib surface for the top-level window `hwnd`.
///
/// Child windows are rejected with `IncompatibleDriver` before anything is
/// allocated. The native window is released on every failure path.
///
/// # Safety
/// `instance` must be a live native instance created with
/// `VK_KHR_xlib_surface` enabled.
pub unsafe fn create_surface(
    bindings: &NativeBindings,
    windows: &Arc<dyn WindowSystem>,
    store: &SurfaceStore,
    instance: vk::Instance,
    hwnd: vk::HWND,
) -> DriverResult<vk::SurfaceKHR> {
    if !windows.parent_is_desktop(hwnd) {
        error!("application requires child window rendering, which is not supported");
        return Err(DriverError::IncompatibleDriver);
    }

    let window = ChildWindow::create(windows, hwnd, windows.default_visual_id()).ok_or_else(|| {
        error!("failed to create native window for {:?}", hwnd);
        DriverError::OutOfHostMemory
    })?;
    let window_id = window.id();

    let raw = store.arena.insert(Surface {
        instance,
        window,
        native: vk::SurfaceKHR::null(),
    })?;

    let create_info = vk::XlibSurfaceCreateInfoKHR::default()
        .dpy(windows.display())
        .window(window_id);

    match unsafe { bindings.create_xlib_surface(instance, &create_info) } {
        Ok(native) => {
            store.arena.with_mut(raw, |s| s.native = native);
            trace!("created surface {:#x} on window {:#x}", raw, window_id);
            Ok(vk::SurfaceKHR::from_raw(raw))
        }
        Err(res) => {
            error!("native surface creation failed: {:?}", res);
            drop(store.arena.remove(raw));
            Err(DriverError::Native(res))
        }
    }
}

/// Destroy the native surface, then its window.
///
/// # Safety
/// `instance` must be the live native instance the surface was created from.
pub unsafe fn destroy_surface(
    bindings: &NativeBindings,
    store: &SurfaceStore,
    instance: vk::Instance,
    handle: vk::SurfaceKHR,
) -> DriverResult<()> {
    if handle == vk::SurfaceKHR::null() {
        return Ok(());
    }

    let surface = store.take(instance, handle)?;
    unsafe { bindings.destroy_surface(instance, surface.native) };
    drop(surface);
    Ok(())
}
