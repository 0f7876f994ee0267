//! Tracing setup: a stderr `fmt` subscriber with `EnvFilter`, the same
//! pattern Smithay's compositor binaries wire up. `--debug` raises this
//! crate's own target to `debug` without touching the verbosity of
//! `x11rb`/`calloop` unless the user overrides `RUST_LOG` themselves.

use tracing_subscriber::{fmt, EnvFilter};

pub fn init(debug: bool) {
    let default_directive = if debug { "commoner=debug,warn" } else { "commoner=info,warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}
