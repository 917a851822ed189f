//! Command-line inspector for PE images and the desktop configuration.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;
use win32_surface::pe::PeHeaders;

#[derive(Parser)]
#[command(
    name = "win32-surface",
    version,
    about = "Inspect PE images, monitors, display paths, DPI and windows"
)]
struct Cli {
    /// Log decode decisions and fallbacks (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the headers of PE images
    Pe {
        /// Images to inspect
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List monitors and their current modes
    #[cfg(windows)]
    Monitors,
    /// List display configuration paths
    #[cfg(windows)]
    Displays,
    /// Show DPI awareness and the DPI of each monitor
    #[cfg(windows)]
    Dpi,
    /// List top-level windows
    #[cfg(windows)]
    Windows {
        /// Include hidden and untitled windows
        #[arg(long)]
        all: bool,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ok = match cli.command {
        Commands::Pe { files } => inspect_images(&files),
        #[cfg(windows)]
        Commands::Monitors => report(desktop::monitors()),
        #[cfg(windows)]
        Commands::Displays => report(desktop::displays()),
        #[cfg(windows)]
        Commands::Dpi => report(desktop::dpi()),
        #[cfg(windows)]
        Commands::Windows { all } => report(desktop::windows(all)),
    };

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(windows)]
fn report(result: win32_surface::error::Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            error!("{e}");
            false
        }
    }
}

fn inspect_images(files: &[PathBuf]) -> bool {
    let mut ok = true;
    for (i, path) in files.iter().enumerate() {
        if i > 0 {
            println!();
        }
        match PeHeaders::from_file(path) {
            Ok(headers) => print_headers(path, &headers),
            Err(e) => {
                error!(path = %path.display(), "{e}");
                ok = false;
            }
        }
    }
    ok
}

fn print_headers(path: &std::path::Path, headers: &PeHeaders) {
    let file = &headers.file_header;
    println!("{}", path.display());
    println!("  machine          {}", file.machine());
    println!("  format           {}", headers.optional_kind);
    println!("  kind             {}", headers.kind());
    println!("  characteristics  {:#06x}", file.characteristics().0);
    println!("  dll              {}", headers.is_dll());
    println!("  entry point      {:#x}", headers.entry_point);
    println!("  image base       {:#x}", headers.image_base);
    println!("  subsystem        {}", headers.subsystem);
    println!("  sections         {}", headers.sections.len());
    if let Some(clr) = &headers.clr_header {
        println!(
            "  clr              v{}.{} flags {:#x}",
            clr.major_runtime_version, clr.minor_runtime_version, clr.flags.0
        );
    }
    for (entry, dir) in headers.present_directories() {
        println!(
            "  {:<16} rva {:#010x} size {:#x}",
            entry.name(),
            dir.virtual_address,
            dir.size
        );
    }
}

#[cfg(windows)]
mod desktop {
    use tracing::warn;
    use win32_surface::display::{DisplayConfig, QueryFlags};
    use win32_surface::dpi::{
        dpi_for_monitor, set_process_awareness, system_dpi, thread_awareness, DpiAwareness,
        DpiScale, MonitorDpiType,
    };
    use win32_surface::error::Result;
    use win32_surface::gdi::monitors as all_monitors;
    use win32_surface::geometry::Rect;
    use win32_surface::window::{enumerate_windows, top_level_windows};

    fn rect(r: Rect) -> String {
        format!("{},{} {}x{}", r.left, r.top, r.width(), r.height())
    }

    pub fn monitors() -> Result<()> {
        // Physical coordinates rather than virtualized ones.
        if let Err(e) = set_process_awareness(DpiAwareness::PerMonitorAwareV2) {
            warn!("keeping current DPI awareness: {e}");
        }
        for monitor in all_monitors()? {
            let info = monitor.info()?;
            let mode = monitor
                .display_mode()
                .map(|m| m.to_string())
                .unwrap_or_else(|e| format!("unknown ({e})"));
            println!(
                "{}{}  {}  work {}  {}",
                info.device_name,
                if info.is_primary { " (primary)" } else { "" },
                rect(info.rect),
                rect(info.work_area),
                mode
            );
        }
        Ok(())
    }

    pub fn displays() -> Result<()> {
        let config = DisplayConfig::query(QueryFlags::ONLY_ACTIVE_PATHS)?;
        for display in config.displays() {
            println!(
                "{} source {} target {}  {}",
                display.adapter_id,
                display.source_id,
                display.target_id,
                display.gdi_device_name.as_deref().unwrap_or("-")
            );
            println!(
                "    monitor {}  {:?}",
                display.friendly_name.as_deref().unwrap_or("-"),
                display.output_technology
            );
            if let Some(bounds) = display.source_bounds {
                println!("    bounds  {}", rect(bounds));
            }
            println!(
                "    refresh {:.2}Hz  rotation {:?}  scaling {:?}",
                display.refresh_rate, display.rotation, display.scaling
            );
        }
        Ok(())
    }

    pub fn dpi() -> Result<()> {
        match set_process_awareness(DpiAwareness::PerMonitorAwareV2) {
            Ok(applied) => println!("awareness  {applied:?}"),
            Err(e) => println!("awareness  unchanged ({e})"),
        }
        println!("thread     {:?}", thread_awareness());
        println!("system     {} dpi", system_dpi());
        for monitor in all_monitors()? {
            let name = monitor.info()?.device_name;
            match dpi_for_monitor(monitor, MonitorDpiType::Effective) {
                Ok(dpi) => println!(
                    "{name:<14} {dpi} dpi ({}%)",
                    DpiScale::from_dpi(dpi).percent()
                ),
                Err(e) => println!("{name:<14} {e}"),
            }
        }
        Ok(())
    }

    pub fn windows(all: bool) -> Result<()> {
        let windows = if all {
            top_level_windows()?
        } else {
            enumerate_windows(|w| w.is_visible() && !w.title().is_empty())?
        };
        for window in windows {
            let class = window.class_name().unwrap_or_default();
            let pid = window.process_id().unwrap_or(0);
            let bounds = window.rect().map(rect).unwrap_or_default();
            println!(
                "{:?} pid {pid:<6} {class:<32} {bounds:<22} {}",
                window.as_raw().0,
                window.title()
            );
        }
        Ok(())
    }
}
