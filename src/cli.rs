//! Command-line parsing.
//!
//! Flag names and defaults mirror the original's `usage()` text
//! (`examples/original_source/commoner.c`), ported to `clap`'s derive macro
//! the way Smithay's own binaries (e.g. `anvil`) structure their CLIs.

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "commoner", about = "An X11 compositing manager: shadows, fading and translucency for any window manager.")]
pub struct Cli {
    /// Daemonize (fork into the background).
    #[arg(short = 'b', long = "daemon")]
    pub daemon: bool,

    /// Display to use; defaults to $DISPLAY.
    #[arg(short = 'd', long = "display")]
    pub display: Option<String>,

    /// Avoid drawing shadows on dock/panel windows.
    #[arg(short = 'C', long = "no-dock-shadow")]
    pub no_dock_shadow: bool,

    /// Disable fading (enabled by default).
    #[arg(long = "no-fading")]
    pub no_fading: bool,

    /// Opacity change between fade steps, 0.01-1.0.
    #[arg(long = "fade-in-step", default_value_t = 0.06)]
    pub fade_in_step: f64,

    /// Opacity change between fade steps, 0.01-1.0.
    #[arg(long = "fade-out-step", default_value_t = 0.07)]
    pub fade_out_step: f64,

    /// Time between fade steps in milliseconds.
    #[arg(long = "fade-delta", default_value_t = 8)]
    pub fade_delta: u64,

    /// Dim inactive windows to the given opacity, 0.0-1.0.
    #[arg(short = 'i', long = "inactive-opacity")]
    pub inactive_opacity: Option<f64>,

    /// Unredirect fullscreen windows for better performance.
    #[arg(long = "unredir-if-possible")]
    pub unredir_if_possible: bool,

    /// Radius of the shadow blur kernel.
    #[arg(short = 'r', long = "shadow-radius", default_value_t = 12)]
    pub shadow_radius: i32,

    /// Left offset of the shadow relative to its window, in pixels.
    #[arg(short = 'l', long = "shadow-left", default_value_t = -15)]
    pub shadow_left: i32,

    /// Top offset of the shadow relative to its window, in pixels.
    #[arg(short = 't', long = "shadow-top", default_value_t = -15)]
    pub shadow_top: i32,

    /// Opacity of the shadow itself, 0.0-1.0.
    #[arg(short = 'o', long = "shadow-opacity", default_value_t = 0.75)]
    pub shadow_opacity: f64,

    /// Exclude a window type from shadows, e.g. "dock", repeatable.
    #[arg(short = 'e', long = "no-shadow-type", value_name = "TYPE")]
    pub no_shadow_types: Vec<String>,

    /// Raise log verbosity to debug for this crate's own spans/events.
    #[arg(long = "debug")]
    pub debug: bool,

    /// Synchronize with the X server; useful when debugging protocol errors.
    #[arg(short = 's', long = "synchronous")]
    pub synchronous: bool,
}
