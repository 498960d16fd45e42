//! Frame buffer viewer: entry point.
//!
//! ```text
//! fbview-gui                     Open with defaults
//! fbview-gui --config <path>     Use custom config TOML
//! fbview-gui --mode hardware     Override the preferred render mode
//! fbview-gui --gen-config        Dump default config and exit
//! fbview-gui --write-config <p>  Write default config to <p> and exit
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use fbview_core::{
    Dimension, DisplaySurface, ModeSwitch, PixelFormat, Rect, RenderError, RenderMode,
    Win32Backend,
};

use fbview_gui::config::ViewerConfig;
use fbview_gui::input::{ViewerCommand, translate_event};
use fbview_gui::window::{NativeWindow, WindowEvent};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "fbview-gui", about = "Frame buffer viewer with switchable GDI / Direct2D rendering")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "fbview-gui.toml")]
    config: PathBuf,

    /// Preferred render mode (overrides config): software or hardware.
    #[arg(short, long, value_parser = parse_mode)]
    mode: Option<RenderMode>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Write the default configuration to this file and exit.
    #[arg(long, value_name = "PATH")]
    write_config: Option<PathBuf>,
}

fn parse_mode(s: &str) -> Result<RenderMode, String> {
    match s.to_ascii_lowercase().as_str() {
        "software" | "gdi" => Ok(RenderMode::Software),
        "hardware" | "d2d" | "direct2d" => Ok(RenderMode::Hardware),
        other => Err(format!("unknown render mode '{other}' (expected software or hardware)")),
    }
}

type ViewerSurface = DisplaySurface<Win32Backend>;

// ── Main ─────────────────────────────────────────────────────────

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&ViewerConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    if let Some(path) = &cli.write_config {
        ViewerConfig::write_default(path)?;
        println!("wrote default config to {}", path.display());
        return Ok(());
    }

    let mut config = ViewerConfig::load(&cli.config);
    if let Some(mode) = cli.mode {
        config.render.preferred_mode = mode;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("fbview-gui v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Create the window ────────────────────────────────────

    let window = NativeWindow::create("Frame Buffer Viewer", config.display.width, config.display.height)?;

    // ── 2. Attach the display surface ───────────────────────────

    let mut surface = ViewerSurface::new(Win32Backend, config.render.clone());
    let hardware = surface.hardware_available();
    info!(hardware, "hardware rendering {}", if hardware { "available" } else { "unavailable" });

    let dimension = Dimension::new(config.display.width as i32, config.display.height as i32);
    surface.set_properties(dimension, PixelFormat::BGRX32, window.handle())?;
    surface.draw_test_pattern()?;

    // ── 3. Event loop ───────────────────────────────────────────

    let frame = surface.dimension().to_rect();
    let mut client = frame;

    'running: loop {
        for event in window.poll_events() {
            match event {
                WindowEvent::Resize(w, h) => {
                    client = Rect::new(0, 0, w as i32, h as i32);
                    if client.is_empty() {
                        continue;
                    }
                    if let Err(e) = surface.resize(&client) {
                        report("resize", &e);
                    }
                    present(&mut surface, &frame, &client, config.display.scale_to_window);
                }
                WindowEvent::Paint => {
                    present(&mut surface, &frame, &client, config.display.scale_to_window);
                }
                other => match translate_event(&other) {
                    Some(ViewerCommand::Quit) => break 'running,
                    Some(ViewerCommand::ToggleRenderMode) => {
                        toggle_mode(&mut surface)?;
                        present(&mut surface, &frame, &client, config.display.scale_to_window);
                    }
                    Some(ViewerCommand::CaptureScreen) => {
                        match surface.capture(&frame) {
                            Ok(()) => info!("captured {}x{} screen region", frame.width(), frame.height()),
                            Err(e) => report("capture", &e),
                        }
                        present(&mut surface, &frame, &client, config.display.scale_to_window);
                    }
                    Some(ViewerCommand::DrawTestPattern) => {
                        if let Err(e) = surface.draw_test_pattern() {
                            report("test pattern", &e);
                        }
                    }
                    None => {}
                },
            }
        }

        std::thread::sleep(Duration::from_millis(10));
    }

    // ── 4. Shutdown ─────────────────────────────────────────────

    info!("shutting down");
    surface.release();
    drop(window);

    Ok(())
}

/// Present the frame buffer, stretched over `client` when scaling is on.
fn present(surface: &mut ViewerSurface, frame: &Rect, client: &Rect, scale: bool) {
    if client.is_empty() {
        return;
    }
    let result = if scale && frame != client {
        surface.present_scaled(frame, client)
    } else {
        surface.present(frame)
    };
    if let Err(e) = result {
        report("present", &e);
    }
}

/// Flip between software and hardware rendering. Only an engine that
/// cannot be rebuilt in either mode ends the viewer.
fn toggle_mode(surface: &mut ViewerSurface) -> Result<(), RenderError> {
    let target = match surface.render_mode() {
        RenderMode::Software => RenderMode::Hardware,
        RenderMode::Hardware => RenderMode::Software,
    };

    match surface.set_render_mode(target) {
        Ok(ModeSwitch::Switched(mode)) => info!("now rendering in {mode} mode"),
        Ok(ModeSwitch::FellBack { requested }) => {
            warn!("{requested} mode could not be started; staying in software mode")
        }
        Ok(ModeSwitch::Unavailable) => warn!("hardware rendering is not available on this system"),
        Ok(ModeSwitch::Unchanged) => {}
        Err(e) => {
            error!("switching to {target} mode failed: {e}");
            surface.set_render_mode(RenderMode::Software)?;
        }
    }
    Ok(())
}

fn report(operation: &str, e: &RenderError) {
    if e.is_recoverable() {
        warn!("{operation} failed: {e}");
    } else {
        error!("{operation} failed: {e}");
    }
}
