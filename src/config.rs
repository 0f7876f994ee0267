//! Resolved runtime configuration, assembled once from [`crate::cli::Cli`]
//! at startup. Grounded on the global option variables the original sets up
//! in `get_cfg`/`main` (`examples/original_source/commoner.c`) and collapsed
//! here into one struct the rest of the compositor borrows from, the same
//! shape Smithay's `anvil` binary uses for its own `Config`.

use crate::classify::{TypeDefaults, WindowType};
use crate::cli::Cli;

#[derive(Debug, Clone)]
pub struct Config {
    pub display: Option<String>,
    pub daemon: bool,
    pub synchronous: bool,
    pub debug: bool,

    pub fading: bool,
    pub fade_in_step: f64,
    pub fade_out_step: f64,
    pub fade_delta_ms: u64,

    pub inactive_opacity: Option<f64>,
    pub unredir_if_possible: bool,

    pub shadow_radius: i32,
    pub shadow_left: i32,
    pub shadow_top: i32,
    pub shadow_opacity: f64,

    pub type_defaults: TypeDefaults,
}

fn window_type_by_name(name: &str) -> Option<WindowType> {
    let normalized = name.to_ascii_lowercase().replace(['-', '_'], "");
    WindowType::ALL.into_iter().find(|ty| format!("{ty:?}").to_ascii_lowercase() == normalized)
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Self {
        let mut type_defaults = TypeDefaults::default();

        if cli.no_dock_shadow {
            type_defaults.disable_dock_shadow();
        }
        for name in &cli.no_shadow_types {
            match window_type_by_name(name) {
                Some(ty) => type_defaults.set_shadow_enabled(ty, false),
                None => tracing::warn!(type_name = %name, "unrecognized window type in --no-shadow-type, ignoring"),
            }
        }
        Config {
            display: cli.display.clone(),
            daemon: cli.daemon,
            synchronous: cli.synchronous,
            debug: cli.debug,
            fading: !cli.no_fading,
            fade_in_step: cli.fade_in_step.clamp(0.01, 1.0),
            fade_out_step: cli.fade_out_step.clamp(0.01, 1.0),
            fade_delta_ms: cli.fade_delta.max(1),
            inactive_opacity: cli.inactive_opacity.map(|v| v.clamp(0.0, 1.0)),
            unredir_if_possible: cli.unredir_if_possible,
            shadow_radius: cli.shadow_radius.max(1),
            shadow_left: cli.shadow_left,
            shadow_top: cli.shadow_top,
            shadow_opacity: cli.shadow_opacity.clamp(0.0, 1.0),
            type_defaults,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cli() -> Cli {
        Cli {
            daemon: false,
            display: None,
            no_dock_shadow: false,
            no_fading: false,
            fade_in_step: 0.06,
            fade_out_step: 0.07,
            fade_delta: 8,
            inactive_opacity: None,
            unredir_if_possible: false,
            shadow_radius: 12,
            shadow_left: -15,
            shadow_top: -15,
            shadow_opacity: 0.75,
            no_shadow_types: Vec::new(),
            debug: false,
            synchronous: false,
        }
    }

    #[test]
    fn no_dock_shadow_flag_disables_only_dock_type() {
        let mut cli = base_cli();
        cli.no_dock_shadow = true;
        let cfg = Config::from_cli(&cli);
        assert!(!cfg.type_defaults.shadow_enabled(WindowType::Dock));
        assert!(cfg.type_defaults.shadow_enabled(WindowType::Normal));
    }

    #[test]
    fn no_shadow_type_by_name_disables_named_type() {
        let mut cli = base_cli();
        cli.no_shadow_types = vec!["tooltip".to_string()];
        let cfg = Config::from_cli(&cli);
        assert!(!cfg.type_defaults.shadow_enabled(WindowType::Tooltip));
    }

    #[test]
    fn inactive_opacity_is_clamped_to_unit_interval() {
        let mut cli = base_cli();
        cli.inactive_opacity = Some(1.5);
        let cfg = Config::from_cli(&cli);
        assert_eq!(cfg.inactive_opacity, Some(1.0));
    }
}
