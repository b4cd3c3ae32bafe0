//! Data types for working with X atoms
use strum::*;

/// A quay internal representation of X atoms.
///
/// Atom names are shared between all X11 API libraries so this enum allows us
/// to get a little bit of type safety around their use. Implementors of
/// [XConn][crate::x::XConn] should accept any variant of [Atom] that they are
/// passed by client code.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(AsRefStr, EnumString, EnumIter, Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum Atom {
    /// ATOM
    #[strum(serialize = "ATOM")]
    Atom,
    /// MANAGER
    #[strum(serialize = "MANAGER")]
    Manager,
    /// UTF8_STRING
    #[strum(serialize = "UTF8_STRING")]
    UTF8String,
    /// WM_CLASS
    #[strum(serialize = "WM_CLASS")]
    WmClass,
    /// WM_DELETE_WINDOW
    #[strum(serialize = "WM_DELETE_WINDOW")]
    WmDeleteWindow,
    /// WM_HINTS
    #[strum(serialize = "WM_HINTS")]
    WmHints,
    /// WM_NAME
    #[strum(serialize = "WM_NAME")]
    WmName,
    /// WM_NORMAL_HINTS
    #[strum(serialize = "WM_NORMAL_HINTS")]
    WmNormalHints,
    /// WM_PROTOCOLS
    #[strum(serialize = "WM_PROTOCOLS")]
    WmProtocols,
    /// WM_STATE
    #[strum(serialize = "WM_STATE")]
    WmState,
    /// WM_TAKE_FOCUS
    #[strum(serialize = "WM_TAKE_FOCUS")]
    WmTakeFocus,
    /// WM_TRANSIENT_FOR
    #[strum(serialize = "WM_TRANSIENT_FOR")]
    WmTransientFor,
    /// WM_WINDOW_ROLE
    #[strum(serialize = "WM_WINDOW_ROLE")]
    WmWindowRole,

    /// _NET_ACTIVE_WINDOW
    #[strum(serialize = "_NET_ACTIVE_WINDOW")]
    NetActiveWindow,
    /// _NET_CLIENT_LIST
    #[strum(serialize = "_NET_CLIENT_LIST")]
    NetClientList,
    /// _NET_CLIENT_LIST_STACKING
    #[strum(serialize = "_NET_CLIENT_LIST_STACKING")]
    NetClientListStacking,
    /// _NET_CURRENT_DESKTOP
    #[strum(serialize = "_NET_CURRENT_DESKTOP")]
    NetCurrentDesktop,
    /// _NET_DESKTOP_LAYOUT
    #[strum(serialize = "_NET_DESKTOP_LAYOUT")]
    NetDesktopLayout,
    /// _NET_DESKTOP_NAMES
    #[strum(serialize = "_NET_DESKTOP_NAMES")]
    NetDesktopNames,
    /// _NET_FRAME_EXTENTS
    #[strum(serialize = "_NET_FRAME_EXTENTS")]
    NetFrameExtents,
    /// _NET_NUMBER_OF_DESKTOPS
    #[strum(serialize = "_NET_NUMBER_OF_DESKTOPS")]
    NetNumberOfDesktops,
    /// _NET_SUPPORTED
    #[strum(serialize = "_NET_SUPPORTED")]
    NetSupported,
    /// _NET_SUPPORTING_WM_CHECK
    #[strum(serialize = "_NET_SUPPORTING_WM_CHECK")]
    NetSupportingWmCheck,
    /// _NET_WM_ALLOWED_ACTIONS
    #[strum(serialize = "_NET_WM_ALLOWED_ACTIONS")]
    NetWmAllowedActions,
    /// _NET_WM_DESKTOP
    #[strum(serialize = "_NET_WM_DESKTOP")]
    NetWmDesktop,
    /// _NET_WM_ICON
    #[strum(serialize = "_NET_WM_ICON")]
    NetWmIcon,
    /// _NET_WM_NAME
    #[strum(serialize = "_NET_WM_NAME")]
    NetWmName,
    /// _NET_WM_PID
    #[strum(serialize = "_NET_WM_PID")]
    NetWmPid,
    /// _NET_WM_STATE
    #[strum(serialize = "_NET_WM_STATE")]
    NetWmState,
    /// _NET_WM_STRUT_PARTIAL
    #[strum(serialize = "_NET_WM_STRUT_PARTIAL")]
    NetWmStrutPartial,
    /// _NET_WM_WINDOW_OPACITY
    #[strum(serialize = "_NET_WM_WINDOW_OPACITY")]
    NetWmWindowOpacity,
    /// _NET_WM_WINDOW_TYPE
    #[strum(serialize = "_NET_WM_WINDOW_TYPE")]
    NetWmWindowType,

    // _NET_WM_STATE values
    /// _NET_WM_STATE_ABOVE
    #[strum(serialize = "_NET_WM_STATE_ABOVE")]
    NetWmStateAbove,
    /// _NET_WM_STATE_BELOW
    #[strum(serialize = "_NET_WM_STATE_BELOW")]
    NetWmStateBelow,
    /// _NET_WM_STATE_DEMANDS_ATTENTION
    #[strum(serialize = "_NET_WM_STATE_DEMANDS_ATTENTION")]
    NetWmStateDemandsAttention,
    /// _NET_WM_STATE_FULLSCREEN
    #[strum(serialize = "_NET_WM_STATE_FULLSCREEN")]
    NetWmStateFullscreen,
    /// _NET_WM_STATE_HIDDEN
    #[strum(serialize = "_NET_WM_STATE_HIDDEN")]
    NetWmStateHidden,
    /// _NET_WM_STATE_MAXIMIZED_HORZ
    #[strum(serialize = "_NET_WM_STATE_MAXIMIZED_HORZ")]
    NetWmStateMaximizedHorz,
    /// _NET_WM_STATE_MAXIMIZED_VERT
    #[strum(serialize = "_NET_WM_STATE_MAXIMIZED_VERT")]
    NetWmStateMaximizedVert,
    /// _NET_WM_STATE_SHADED
    #[strum(serialize = "_NET_WM_STATE_SHADED")]
    NetWmStateShaded,
    /// _NET_WM_STATE_SKIP_PAGER
    #[strum(serialize = "_NET_WM_STATE_SKIP_PAGER")]
    NetWmStateSkipPager,
    /// _NET_WM_STATE_SKIP_TASKBAR
    #[strum(serialize = "_NET_WM_STATE_SKIP_TASKBAR")]
    NetWmStateSkipTaskbar,
    /// _NET_WM_STATE_STICKY
    #[strum(serialize = "_NET_WM_STATE_STICKY")]
    NetWmStateSticky,

    // Window types
    /// _NET_WM_WINDOW_TYPE_DESKTOP
    #[strum(serialize = "_NET_WM_WINDOW_TYPE_DESKTOP")]
    NetWindowTypeDesktop,
    /// _NET_WM_WINDOW_TYPE_DIALOG
    #[strum(serialize = "_NET_WM_WINDOW_TYPE_DIALOG")]
    NetWindowTypeDialog,
    /// _NET_WM_WINDOW_TYPE_DOCK
    #[strum(serialize = "_NET_WM_WINDOW_TYPE_DOCK")]
    NetWindowTypeDock,
    /// _NET_WM_WINDOW_TYPE_DROPDOWN_MENU
    #[strum(serialize = "_NET_WM_WINDOW_TYPE_DROPDOWN_MENU")]
    NetWindowTypeDropdownMenu,
    /// _NET_WM_WINDOW_TYPE_MENU
    #[strum(serialize = "_NET_WM_WINDOW_TYPE_MENU")]
    NetWindowTypeMenu,
    /// _NET_WM_WINDOW_TYPE_NORMAL
    #[strum(serialize = "_NET_WM_WINDOW_TYPE_NORMAL")]
    NetWindowTypeNormal,
    /// _NET_WM_WINDOW_TYPE_POPUP_MENU
    #[strum(serialize = "_NET_WM_WINDOW_TYPE_POPUP_MENU")]
    NetWindowTypePopupMenu,
    /// _NET_WM_WINDOW_TYPE_SPLASH
    #[strum(serialize = "_NET_WM_WINDOW_TYPE_SPLASH")]
    NetWindowTypeSplash,
    /// _NET_WM_WINDOW_TYPE_TOOLBAR
    #[strum(serialize = "_NET_WM_WINDOW_TYPE_TOOLBAR")]
    NetWindowTypeToolbar,
    /// _NET_WM_WINDOW_TYPE_UTILITY
    #[strum(serialize = "_NET_WM_WINDOW_TYPE_UTILITY")]
    NetWindowTypeUtility,

    // _NET_WM_ALLOWED_ACTIONS values
    /// _NET_WM_ACTION_CHANGE_DESKTOP
    #[strum(serialize = "_NET_WM_ACTION_CHANGE_DESKTOP")]
    NetWmActionChangeDesktop,
    /// _NET_WM_ACTION_CLOSE
    #[strum(serialize = "_NET_WM_ACTION_CLOSE")]
    NetWmActionClose,
    /// _NET_WM_ACTION_FULLSCREEN
    #[strum(serialize = "_NET_WM_ACTION_FULLSCREEN")]
    NetWmActionFullscreen,
    /// _NET_WM_ACTION_MAXIMIZE_HORZ
    #[strum(serialize = "_NET_WM_ACTION_MAXIMIZE_HORZ")]
    NetWmActionMaximizeHorz,
    /// _NET_WM_ACTION_MAXIMIZE_VERT
    #[strum(serialize = "_NET_WM_ACTION_MAXIMIZE_VERT")]
    NetWmActionMaximizeVert,
    /// _NET_WM_ACTION_MINIMIZE
    #[strum(serialize = "_NET_WM_ACTION_MINIMIZE")]
    NetWmActionMinimize,
    /// _NET_WM_ACTION_MOVE
    #[strum(serialize = "_NET_WM_ACTION_MOVE")]
    NetWmActionMove,
    /// _NET_WM_ACTION_RESIZE
    #[strum(serialize = "_NET_WM_ACTION_RESIZE")]
    NetWmActionResize,
    /// _NET_WM_ACTION_SHADE
    #[strum(serialize = "_NET_WM_ACTION_SHADE")]
    NetWmActionShade,
    /// _NET_WM_ACTION_STICK
    #[strum(serialize = "_NET_WM_ACTION_STICK")]
    NetWmActionStick,

    // quay private atoms
    /// _QUAY_BG_PID: pid of the background helper owning the root pixmap
    #[strum(serialize = "_QUAY_BG_PID")]
    QuayBgPid,
    /// _QUAY_CMD: the control channel used by the quay ctrl client
    #[strum(serialize = "_QUAY_CMD")]
    QuayCmd,
}

/// Currently supported EWMH atoms, published via `_NET_SUPPORTED`.
pub const EWMH_SUPPORTED_ATOMS: &[Atom] = &[
    Atom::NetActiveWindow,
    Atom::NetClientList,
    Atom::NetClientListStacking,
    Atom::NetCurrentDesktop,
    Atom::NetDesktopLayout,
    Atom::NetDesktopNames,
    Atom::NetFrameExtents,
    Atom::NetNumberOfDesktops,
    Atom::NetSupported,
    Atom::NetSupportingWmCheck,
    Atom::NetWmAllowedActions,
    Atom::NetWmDesktop,
    Atom::NetWmIcon,
    Atom::NetWmName,
    Atom::NetWmPid,
    Atom::NetWmState,
    Atom::NetWmStateAbove,
    Atom::NetWmStateBelow,
    Atom::NetWmStateDemandsAttention,
    Atom::NetWmStateFullscreen,
    Atom::NetWmStateHidden,
    Atom::NetWmStateMaximizedHorz,
    Atom::NetWmStateMaximizedVert,
    Atom::NetWmStateShaded,
    Atom::NetWmStateSkipPager,
    Atom::NetWmStateSkipTaskbar,
    Atom::NetWmStateSticky,
    Atom::NetWmStrutPartial,
    Atom::NetWmWindowType,
];

/// The window type atoms that carry built-in AutoProperty defaults.
pub const TYPED_WINDOW_TYPES: &[Atom] = &[
    Atom::NetWindowTypeDesktop,
    Atom::NetWindowTypeDock,
    Atom::NetWindowTypeToolbar,
    Atom::NetWindowTypeMenu,
    Atom::NetWindowTypeUtility,
    Atom::NetWindowTypeSplash,
    Atom::NetWindowTypeDialog,
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn atom_names_round_trip() {
        use strum::IntoEnumIterator;

        for atom in Atom::iter() {
            assert_eq!(Atom::from_str(atom.as_ref()), Ok(atom));
        }
    }

    #[test]
    fn supported_atoms_include_state_and_type() {
        assert!(EWMH_SUPPORTED_ATOMS.contains(&Atom::NetWmState));
        assert!(EWMH_SUPPORTED_ATOMS.contains(&Atom::NetWmWindowType));
        assert!(EWMH_SUPPORTED_ATOMS.contains(&Atom::NetClientListStacking));
    }
}
