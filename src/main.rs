//! Entry point: CLI parse, config, logging, optional daemonization, X
//! connection and extension bring-up, manager-selection acquisition, GPU
//! surface creation, then handoff to [`event_loop::run`].
//!
//! Bring-up ordering mirrors `main` in the original compositor
//! (`examples/original_source/commoner.c:2700-2790`): extensions are checked
//! before the manager selection is claimed, which is claimed before the
//! overlay window and GL context are created.

mod atoms;
mod cli;
mod classify;
mod config;
mod daemonize;
mod error;
mod event_loop;
mod fade;
mod geometry;
mod gpu;
mod ignore_ring;
mod logging;
mod paint;
mod region;
mod root_background;
mod shadow;
mod unredirect;
mod window;

use std::os::raw::c_void;

use clap::Parser;
use tracing::{error, info};
use x11rb::connection::Connection;
use x11rb::protocol::composite::ConnectionExt as _;
use x11rb::protocol::damage::ConnectionExt as _;
use x11rb::protocol::present::ConnectionExt as _;
use x11rb::protocol::shape::ConnectionExt as _;
use x11rb::protocol::xfixes::ConnectionExt as _;
use x11rb::protocol::xproto::ConnectionExt as _;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use atoms::Atoms;
use cli::Cli;
use config::Config;
use error::InitError;

fn main() {
    let cli = Cli::parse();
    let config = Config::from_cli(&cli);
    logging::init(config.debug);

    if config.daemon {
        if let Err(err) = daemonize::daemonize() {
            error!(%err, "failed to daemonize");
            std::process::exit(1);
        }
    }

    if let Err(err) = run(config) {
        error!(%err, "fatal error during startup");
        std::process::exit(1);
    }
}

fn run(config: Config) -> Result<(), InitError> {
    let (conn, screen_num) = RustConnection::connect(config.display.as_deref())?;
    if config.synchronous {
        info!("running with X requests synchronized");
    }

    let screen = conn.setup().roots[screen_num].clone();
    let root = screen.root;
    let root_w = screen.width_in_pixels;
    let root_h = screen.height_in_pixels;

    check_extensions(&conn)?;
    let damage_event_base = extension_event_base(&conn, "DAMAGE")?;
    let shape_event_base = extension_event_base(&conn, "SHAPE")?;

    let atoms = Atoms::new(&conn)?.reply()?;
    acquire_manager_selection(&conn, &atoms, root, screen_num)?;

    conn.composite_redirect_subwindows(root, x11rb::protocol::composite::Redirect::MANUAL)
        .map_err(|e| InitError::RedirectFailed(e.to_string()))?;

    let overlay = gpu::acquire_overlay(&conn, root)?;
    conn.flush()?;

    // A headless RustConnection has no native EGL display handle; the GPU
    // layer resolves its own via eglGetDisplay(EGL_DEFAULT_DISPLAY) when
    // given null, the same fallback Mesa's EGL_EXT_platform_x11 documents.
    let native_display: *mut c_void = std::ptr::null_mut();
    let gpu_surface = gpu::GpuSurface::new(native_display, overlay, root_w, root_h)?;

    let mut state = event_loop::CompositorState::new(
        conn,
        atoms,
        root,
        root_w,
        root_h,
        gpu_surface,
        config,
        damage_event_base,
        shape_event_base,
    );
    state.paint.unredirect.enabled = state.config.unredir_if_possible;
    state.bootstrap_existing_windows().map_err(InitError::Reply)?;

    event_loop::run(state).map_err(|err| {
        InitError::Connection(x11rb::errors::ConnectionError::IoError(std::io::Error::new(
            std::io::ErrorKind::Other,
            err.to_string(),
        )))
    })
}

fn check_extensions<C: Connection>(conn: &C) -> Result<(), InitError> {
    let composite = conn.composite_query_version(4, 2)?.reply()?;
    if composite.major_version == 0 && composite.minor_version < 2 {
        return Err(InitError::MissingExtension {
            name: "Composite",
            need_major: 0,
            need_minor: 2,
        });
    }
    conn.damage_query_version(1, 1)?.reply()?;
    conn.xfixes_query_version(5, 0)?.reply()?;
    conn.shape_query_version()?.reply()?;
    conn.present_query_version(1, 0)?.reply()?;
    Ok(())
}

fn extension_event_base<C: Connection>(conn: &C, name: &'static str) -> Result<u8, InitError> {
    let info = conn.extension_information(name)?.ok_or(InitError::MissingExtension {
        name,
        need_major: 1,
        need_minor: 0,
    })?;
    Ok(info.first_event)
}

/// `register_cm` (`examples/original_source/commoner.c:2470-2504`): claim
/// `_NET_WM_CM_S<screen>` as our selection, failing if another compositor
/// already owns it.
fn acquire_manager_selection<C: Connection>(conn: &C, atoms: &Atoms, root: u32, screen_num: usize) -> Result<(), InitError> {
    let atom_name = format!("_NET_WM_CM_S{screen_num}");
    let atom = conn.intern_atom(false, atom_name.as_bytes())?.reply()?.atom;

    let owner = conn.get_selection_owner(atom)?.reply()?.owner;
    if owner != x11rb::NONE {
        return Err(InitError::SelectionOwned { screen: screen_num });
    }

    let window = conn.generate_id()?;
    conn.create_window(
        x11rb::COPY_DEPTH_FROM_PARENT,
        window,
        root,
        0,
        0,
        1,
        1,
        0,
        x11rb::protocol::xproto::WindowClass::INPUT_OUTPUT,
        x11rb::COPY_FROM_PARENT,
        &x11rb::protocol::xproto::CreateWindowAux::new(),
    )?;
    conn.change_property8(
        x11rb::protocol::xproto::PropMode::REPLACE,
        window,
        atoms.WM_NAME,
        atoms.UTF8_STRING,
        b"commoner",
    )?;
    conn.set_selection_owner(window, atom, x11rb::CURRENT_TIME)?;
    Ok(())
}
