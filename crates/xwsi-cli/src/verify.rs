use libloading::Library;
use serde::Serialize;
use xwsi_core::config::{default_config_path, DriverConfig};
use xwsi_driver::bindings::{SymbolSource, REQUIRED_SYMBOLS};
use xwsi_driver::NativeFns;

// ── Check result types ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Warn,
    Skip,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    details: Vec<String>,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.to_string(),
            details: Vec::new(),
        }
    }

    fn pass(name: &str, message: &str) -> Self {
        Self::new(name, CheckStatus::Pass, message)
    }

    fn fail(name: &str, message: &str) -> Self {
        Self::new(name, CheckStatus::Fail, message)
    }

    fn warn(name: &str, message: &str) -> Self {
        Self::new(name, CheckStatus::Warn, message)
    }

    fn skip(name: &str, message: &str) -> Self {
        Self::new(name, CheckStatus::Skip, message)
    }

    fn detail(mut self, detail: &str) -> Self {
        self.details.push(detail.to_string());
        self
    }
}

// ── Main entry point ────────────────────────────────────────────────────────

pub fn run_verify(config_path: Option<&str>, libraries: &[String], json: bool) -> anyhow::Result<()> {
    let mut results: Vec<CheckResult> = Vec::new();

    // Check 1: Configuration
    let config_path = config_path.map(str::to_string).unwrap_or_else(default_config_path);
    let config = check_config(&config_path, &mut results);

    let candidates = if libraries.is_empty() {
        config.native.library_candidates.clone()
    } else {
        libraries.to_vec()
    };

    // Check 2: Native library
    let library = check_library(&candidates, &mut results);

    // Check 3 + 4: Entry points, then the binding table as a whole
    match &library {
        Some(library) => {
            check_symbols(library, &mut results);
            check_binding_table(library, &mut results);
        }
        None => {
            results.push(CheckResult::skip(
                "Entry points",
                "No native library loaded, cannot resolve symbols",
            ));
        }
    }

    if json {
        print_results_json(&results)?;
    } else {
        print_results_pretty(&results);
    }

    if results
        .iter()
        .any(|r| matches!(r.status, CheckStatus::Fail))
    {
        std::process::exit(1);
    }

    Ok(())
}

// ── Check 1: Configuration ──────────────────────────────────────────────────

fn check_config(config_path: &str, results: &mut Vec<CheckResult>) -> DriverConfig {
    if !std::path::Path::new(config_path).exists() {
        results.push(
            CheckResult::warn(
                "Configuration",
                &format!("Config file not found: {}", config_path),
            )
            .detail("Using default configuration"),
        );
        return DriverConfig::default();
    }

    match DriverConfig::load(config_path) {
        Ok(config) => {
            results.push(
                CheckResult::pass("Configuration", &format!("Loaded {}", config_path))
                    .detail(&format!(
                        "Library candidates: {}",
                        config.native.library_candidates.join(", ")
                    ))
                    .detail(&format!("Log filter: {}", config.log.filter)),
            );
            config
        }
        Err(e) => {
            results.push(
                CheckResult::fail("Configuration", &format!("{}", e))
                    .detail("Falling back to default configuration"),
            );
            DriverConfig::default()
        }
    }
}

// ── Check 2: Native library ─────────────────────────────────────────────────

fn check_library(candidates: &[String], results: &mut Vec<CheckResult>) -> Option<Library> {
    if candidates.is_empty() {
        results.push(CheckResult::fail(
            "Native library",
            "No library candidates configured",
        ));
        return None;
    }

    let mut failures: Vec<String> = Vec::new();
    for name in candidates {
        match unsafe { Library::new(name) } {
            Ok(library) => {
                let mut result =
                    CheckResult::pass("Native library", &format!("Loaded {}", name));
                for failure in &failures {
                    result = result.detail(failure);
                }
                results.push(result);
                return Some(library);
            }
            Err(e) => failures.push(format!("{}: {}", name, e)),
        }
    }

    let mut result = CheckResult::fail("Native library", "No candidate could be loaded");
    for failure in &failures {
        result = result.detail(failure);
    }
    results.push(result.detail("Install the Vulkan loader (libvulkan1 / vulkan-loader)"));
    None
}

// ── Check 3: Entry points ───────────────────────────────────────────────────

fn check_symbols(library: &Library, results: &mut Vec<CheckResult>) {
    for symbol in REQUIRED_SYMBOLS {
        let name = symbol.to_string_lossy();
        if library.resolve(symbol).is_some() {
            results.push(CheckResult::pass(&name, "resolved"));
        } else {
            results.push(CheckResult::fail(&name, "not exported by the native library"));
        }
    }
}

// ── Check 4: Binding table ──────────────────────────────────────────────────

fn check_binding_table(library: &Library, results: &mut Vec<CheckResult>) {
    match NativeFns::resolve(library) {
        Ok(_) => results.push(CheckResult::pass(
            "Binding table",
            "All entry points resolved, the driver can be handed out",
        )),
        Err(e) => results.push(
            CheckResult::fail("Binding table", &format!("{}", e))
                .detail("get_vulkan_driver will return null on this system"),
        ),
    }
}

// ── Output ──────────────────────────────────────────────────────────────────

fn print_results_pretty(results: &[CheckResult]) {
    println!();
    println!("xwsi Native Driver Verification ({})", xwsi_common::platform::platform_name());
    println!("=======================================");
    println!();

    let mut pass_count = 0u32;
    let mut fail_count = 0u32;
    let mut warn_count = 0u32;

    for result in results {
        let (icon, color_start, color_end) = match result.status {
            CheckStatus::Pass => {
                pass_count += 1;
                ("[PASS]", "\x1b[32m", "\x1b[0m")
            }
            CheckStatus::Fail => {
                fail_count += 1;
                ("[FAIL]", "\x1b[31m", "\x1b[0m")
            }
            CheckStatus::Warn => {
                warn_count += 1;
                ("[WARN]", "\x1b[33m", "\x1b[0m")
            }
            CheckStatus::Skip => ("[SKIP]", "\x1b[90m", "\x1b[0m"),
        };

        println!(
            "  {}{}{} {} - {}",
            color_start, icon, color_end, result.name, result.message
        );
        for detail in &result.details {
            println!("         {}", detail);
        }
    }

    println!();
    println!("---------------------------------------");
    println!(
        "  {} passed, {} failed, {} warnings",
        pass_count, fail_count, warn_count
    );
    println!();
}

fn results_json(results: &[CheckResult]) -> anyhow::Result<String> {
    Ok(serde_json::to_string(results)?)
}

fn print_results_json(results: &[CheckResult]) -> anyhow::Result<()> {
    println!("{}", results_json(results)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_warns_and_defaults() {
        let mut results = Vec::new();
        let config = check_config("/nonexistent/xwsi.toml", &mut results);
        assert_eq!(config, DriverConfig::default());
        assert!(matches!(results[0].status, CheckStatus::Warn));
    }

    #[test]
    fn unloadable_library_fails() {
        let mut results = Vec::new();
        let library = check_library(&["libxwsi-missing.so.0".to_string()], &mut results);
        assert!(library.is_none());
        assert!(matches!(results[0].status, CheckStatus::Fail));
        assert!(results[0].details[0].starts_with("libxwsi-missing.so.0"));
    }

    #[test]
    fn empty_candidate_list_fails() {
        let mut results = Vec::new();
        assert!(check_library(&[], &mut results).is_none());
        assert!(matches!(results[0].status, CheckStatus::Fail));
    }

    #[test]
    fn json_output_survives_multiline_messages() {
        let mut results = Vec::new();
        let config = std::env::temp_dir().join(format!("xwsi-verify-{}.toml", std::process::id()));
        std::fs::write(&config, "[native]\nlibrary_candidates = 3\n").unwrap();
        check_config(config.to_str().unwrap(), &mut results);
        let _ = std::fs::remove_file(&config);

        assert!(matches!(results[0].status, CheckStatus::Fail));
        assert!(results[0].message.contains('\n'));

        let json = results_json(&results).unwrap();
        assert!(!json.contains('\n'));
        assert!(json.contains("\"status\":\"fail\""));
        assert!(json.contains("\\n"));
    }

    #[test]
    fn json_omits_empty_details() {
        let json = results_json(&[CheckResult::pass("Binding table", "ok")]).unwrap();
        assert_eq!(json, r#"[{"name":"Binding table","status":"pass","message":"ok"}]"#);
    }
}
