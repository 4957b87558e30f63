//! Win32 → Xlib instance create-info translation.
//!
//! The native loader sees a descriptor with no layers, no `pNext` chain and
//! the platform surface extension swapped for its Xlib counterpart.

use std::ffi::{c_char, CStr};
use std::ptr;

use ash::vk;
use tracing::{error, warn};
use xwsi_core::{DriverError, DriverResult};

/// Host extension name → native extension name.
pub const EXTENSION_SUBSTITUTIONS: &[(&CStr, &CStr)] =
    &[(c"VK_KHR_win32_surface", c"VK_KHR_xlib_surface")];

/// The name the native driver knows `name` by.
pub fn native_extension_name(name: &CStr) -> &CStr {
    EXTENSION_SUBSTITUTIONS
        .iter()
        .find(|(host, _)| *host == name)
        .map(|(_, native)| *native)
        .unwrap_or(name)
}

/// An instance descriptor rewritten for the native driver.
///
/// Owns the rewritten extension-name array; dropping it releases the array.
/// Name pointers borrow from the source descriptor or from
/// [`EXTENSION_SUBSTITUTIONS`].
#[derive(Debug)]
pub struct HostInstanceCreateInfo<'a> {
    s_type: vk::StructureType,
    flags: vk::InstanceCreateFlags,
    application_info: *const vk::ApplicationInfo<'a>,
    extension_count: u32,
    extension_names: Vec<*const c_char>,
    dropped_chain: Vec<vk::StructureType>,
    substitutions: usize,
}

impl<'a> HostInstanceCreateInfo<'a> {
    /// The descriptor to hand to the native `vkCreateInstance`.
    pub fn as_raw(&self) -> vk::InstanceCreateInfo<'_> {
        let mut info = vk::InstanceCreateInfo::default();
        info.s_type = self.s_type;
        info.p_next = ptr::null();
        info.flags = self.flags;
        info.p_application_info = self.application_info;
        info.enabled_layer_count = 0;
        info.pp_enabled_layer_names = ptr::null();
        info.enabled_extension_count = self.extension_count;
        info.pp_enabled_extension_names = if self.extension_names.is_empty() {
            ptr::null()
        } else {
            self.extension_names.as_ptr()
        };
        info
    }

    pub fn extension_names(&self) -> impl Iterator<Item = &'a CStr> + '_ {
        // Every pointer came from a `&'a CStr`, see `translate`.
        self.extension_names
            .iter()
            .map(|&name| -> &'a CStr { unsafe { CStr::from_ptr(name) } })
    }

    /// Structure types found on the source `pNext` chain, in chain order.
    pub fn dropped_chain(&self) -> &[vk::StructureType] {
        &self.dropped_chain
    }

    /// How many extension names were replaced.
    pub fn substitutions(&self) -> usize {
        self.substitutions
    }
}

/// Rewrite `src` for the native driver.
///
/// Fails with `OutOfHostMemory` if the name array cannot be allocated; no
/// partially built descriptor escapes in that case.
///
/// # Safety
/// `src` must be a valid `VkInstanceCreateInfo`: its `pNext` chain must be
/// null-terminated, and `ppEnabledExtensionNames` must hold
/// `enabledExtensionCount` NUL-terminated strings that outlive `'a`.
pub unsafe fn translate<'a>(src: &vk::InstanceCreateInfo<'a>) -> DriverResult<HostInstanceCreateInfo<'a>> {
    let dropped_chain = unsafe { walk_chain(src.p_next) };

    let count = src.enabled_extension_count as usize;
    let mut extension_names: Vec<*const c_char> = Vec::new();
    let mut substitutions = 0;

    if count > 0 {
        if extension_names.try_reserve_exact(count).is_err() {
            error!("failed to allocate memory for {} enabled extensions", count);
            return Err(DriverError::OutOfHostMemory);
        }

        let names = unsafe { std::slice::from_raw_parts(src.pp_enabled_extension_names, count) };
        for &name in names {
            let host: &'a CStr = unsafe { CStr::from_ptr(name) };
            let native = native_extension_name(host);
            if !ptr::eq(native, host) {
                substitutions += 1;
            }
            extension_names.push(native.as_ptr());
        }
    }

    Ok(HostInstanceCreateInfo {
        s_type: src.s_type,
        flags: src.flags,
        application_info: src.p_application_info,
        extension_count: src.enabled_extension_count,
        extension_names,
        dropped_chain,
        substitutions,
    })
}

/// Collect the structure type of every chained structure, reporting each one.
unsafe fn walk_chain(mut next: *const std::ffi::c_void) -> Vec<vk::StructureType> {
    let mut types = Vec::new();
    while !next.is_null() {
        let header = unsafe { &*(next as *const vk::BaseInStructure<'_>) };
        warn!(
            "application requested a linked structure of type {:?}, dropping it",
            header.s_type
        );
        types.push(header.s_type);
        next = header.p_next as *const std::ffi::c_void;
    }
    types
}
