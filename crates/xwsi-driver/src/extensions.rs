//! Instance extensions advertised by the driver.

use std::ffi::{c_char, CStr};

use ash::vk;
use tracing::{error, trace};
use xwsi_core::{DriverError, DriverResult};

use crate::dispatch::Enumeration;

/// Instance extensions this driver exposes to the host, with spec versions.
pub const INSTANCE_EXTENSIONS: [(&CStr, u32); 2] = [
    (c"VK_KHR_surface", 1),
    (c"VK_KHR_win32_surface", 1),
];

pub fn extension_properties(name: &CStr, spec_version: u32) -> vk::ExtensionProperties {
    let mut props = vk::ExtensionProperties::default();
    write_c_string(name, &mut props.extension_name);
    props.spec_version = spec_version;
    props
}

/// `vkEnumerateInstanceExtensionProperties` over [`INSTANCE_EXTENSIONS`].
///
/// With no buffer, reports the total. With a buffer, copies
/// `min(buffer.len(), total)` entries and reports `Incomplete` if the buffer
/// was too short. A layer name is always rejected: this is a driver, not a
/// layer.
pub fn enumerate_instance_extensions(
    layer_name: Option<&CStr>,
    properties: Option<&mut [vk::ExtensionProperties]>,
) -> DriverResult<Enumeration> {
    if let Some(layer) = layer_name {
        error!("layer enumeration not supported from a driver: {:?}", layer);
        return Err(DriverError::LayerNotPresent);
    }

    let total = INSTANCE_EXTENSIONS.len();
    let Some(properties) = properties else {
        return Ok(Enumeration::Complete(total as u32));
    };

    let copied = properties.len().min(total);
    for (dst, (name, version)) in properties.iter_mut().zip(INSTANCE_EXTENSIONS) {
        *dst = extension_properties(name, version);
    }

    let result = if copied < total {
        Enumeration::Incomplete(copied as u32)
    } else {
        Enumeration::Complete(copied as u32)
    };
    trace!("result {:?}, extensions copied {}", result, copied);
    Ok(result)
}

fn write_c_string(src: &CStr, dst: &mut [c_char]) {
    let bytes = src.to_bytes();
    let len = std::cmp::min(bytes.len(), dst.len() - 1);
    for (d, &b) in dst.iter_mut().zip(&bytes[..len]) {
        *d = b as c_char;
    }
    dst[len] = 0;
}
