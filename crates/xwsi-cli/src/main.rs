use std::ffi::{c_char, CString};

use anyhow::Context;
use ash::vk;
use clap::{Parser, Subcommand};
use tracing::debug;
use xwsi_driver::extensions::INSTANCE_EXTENSIONS;
use xwsi_driver::translate::{translate, EXTENSION_SUBSTITUTIONS};

mod verify;

#[derive(Parser)]
#[command(name = "xwsi")]
#[command(about = "xwsi - Win32 surface presentation on the native Xlib Vulkan driver")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the native Vulkan library loads and exports every required entry point
    Verify {
        /// Configuration file path (defaults to $XWSI_CONFIG, then the system paths)
        #[arg(short, long)]
        config: Option<String>,

        /// Library to try instead of the configured candidates (repeatable)
        #[arg(short, long)]
        library: Vec<String>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the instance extensions the driver advertises
    Extensions,

    /// Show what the native driver receives for a given instance request
    Translate {
        /// Extension requested by the application (repeatable)
        #[arg(short, long)]
        extension: Vec<String>,

        /// Layer requested by the application (repeatable)
        #[arg(short, long)]
        layer: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    xwsi_common::init_logging("warn");

    let cli = Cli::parse();

    match cli.command {
        Commands::Verify {
            config,
            library,
            json,
        } => {
            verify::run_verify(config.as_deref(), &library, json)?;
        }

        Commands::Extensions => {
            println!("Advertised instance extensions:");
            println!();
            for (name, version) in INSTANCE_EXTENSIONS {
                println!("  {:<32} version {}", name.to_string_lossy(), version);
            }
            println!();
            println!("Substituted before reaching the native driver:");
            println!();
            for (host, native) in EXTENSION_SUBSTITUTIONS {
                println!("  {} -> {}", host.to_string_lossy(), native.to_string_lossy());
            }
        }

        Commands::Translate { extension, layer } => {
            run_translate(&extension, &layer)?;
        }
    }

    Ok(())
}

fn to_c_strings(names: &[String]) -> anyhow::Result<Vec<CString>> {
    names
        .iter()
        .map(|name| CString::new(name.as_str()).with_context(|| format!("invalid name: {:?}", name)))
        .collect()
}

fn run_translate(extensions: &[String], layers: &[String]) -> anyhow::Result<()> {
    let extensions = to_c_strings(extensions)?;
    let layers = to_c_strings(layers)?;
    let extension_ptrs: Vec<*const c_char> = extensions.iter().map(|s| s.as_ptr()).collect();
    let layer_ptrs: Vec<*const c_char> = layers.iter().map(|s| s.as_ptr()).collect();

    let create_info = vk::InstanceCreateInfo::default()
        .enabled_extension_names(&extension_ptrs)
        .enabled_layer_names(&layer_ptrs);

    let host = unsafe { translate(&create_info) }.map_err(|e| anyhow::anyhow!("{}", e))?;
    debug!("{} substitution(s)", host.substitutions());

    println!("Extensions passed to the native driver:");
    println!();
    if extensions.is_empty() {
        println!("  (none)");
    }
    for name in host.extension_names() {
        println!("  {}", name.to_string_lossy());
    }

    if !layers.is_empty() {
        println!();
        println!("Layers stripped:");
        println!();
        for layer in &layers {
            println!("  {}", layer.to_string_lossy());
        }
    }

    Ok(())
}
