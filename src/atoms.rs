//! Atom table used throughout the compositor.
//!
//! Built with x11rb's `atom_manager!`, which batch-interns every atom in a
//! single round trip at startup instead of one `InternAtom` request each.

x11rb::atom_manager! {
    pub Atoms: AtomsCookie {
        // manager selection / identification
        WM_NAME,
        UTF8_STRING,

        // opacity and background
        _NET_WM_WINDOW_OPACITY,
        _XROOTPMAP_ID,
        _XSETROOT_ID,

        // window type classification
        _NET_WM_WINDOW_TYPE,
        _NET_WM_WINDOW_TYPE_DESKTOP,
        _NET_WM_WINDOW_TYPE_DOCK,
        _NET_WM_WINDOW_TYPE_TOOLBAR,
        _NET_WM_WINDOW_TYPE_MENU,
        _NET_WM_WINDOW_TYPE_UTILITY,
        _NET_WM_WINDOW_TYPE_SPLASH,
        _NET_WM_WINDOW_TYPE_DIALOG,
        _NET_WM_WINDOW_TYPE_NORMAL,
        _NET_WM_WINDOW_TYPE_DROPDOWN_MENU,
        _NET_WM_WINDOW_TYPE_POPUP_MENU,
        _NET_WM_WINDOW_TYPE_TOOLTIP,
        _NET_WM_WINDOW_TYPE_NOTIFICATION,
        _NET_WM_WINDOW_TYPE_COMBO,
        _NET_WM_WINDOW_TYPE_DND,

        // client/frame introspection
        WM_STATE,
        _NET_FRAME_EXTENTS,
        _GTK_FRAME_EXTENTS,
    }
}
