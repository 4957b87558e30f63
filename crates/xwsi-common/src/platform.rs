/// Returns the native graphics library names to try, most specific first.
pub fn default_native_library_names() -> Vec<String> {
    #[cfg(target_os = "linux")]
    let names: &[&str] = &["libvulkan.so.1", "libvulkan.so"];

    #[cfg(any(target_os = "freebsd", target_os = "openbsd", target_os = "netbsd"))]
    let names: &[&str] = &["libvulkan.so.1", "libvulkan.so"];

    #[cfg(target_os = "macos")]
    let names: &[&str] = &["libvulkan.1.dylib", "libvulkan.dylib"];

    #[cfg(not(any(
        target_os = "linux",
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "macos"
    )))]
    let names: &[&str] = &[];

    names.iter().map(|s| s.to_string()).collect()
}

/// Returns the platform name string.
pub fn platform_name() -> &'static str {
    #[cfg(target_os = "linux")]
    { "linux" }
    #[cfg(target_os = "freebsd")]
    { "freebsd" }
    #[cfg(target_os = "macos")]
    { "macos" }
    #[cfg(not(any(target_os = "linux", target_os = "freebsd", target_os = "macos")))]
    { "unknown" }
}
