//! The managed application window
use crate::{
    autoprops::ClassHint,
    frame::FrameId,
    pure::{geometry::Rect, Layer},
    x::{property::WmNormalHints, Atom},
    Xid,
};
use bitflags::bitflags;

bitflags! {
    /// Toggleable state carried by every client, mirrored to `_NET_WM_STATE`.
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StateFlags: u16 {
        /// Visible on every workspace
        const STICKY = 1 << 0;
        /// Rolled up into the titlebar
        const SHADED = 1 << 1;
        /// Hidden from the screen but not withdrawn
        const ICONIFIED = 1 << 2;
        /// Maximized vertically
        const MAXIMIZED_VERT = 1 << 3;
        /// Maximized horizontally
        const MAXIMIZED_HORZ = 1 << 4;
        /// Covering the whole head, borderless
        const FULLSCREEN = 1 << 5;
        /// The client has asked for the user's attention
        const DEMANDS_ATTENTION = 1 << 6;
    }
}

bitflags! {
    /// Surfaces a client asks to be left out of.
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SkipFlags: u8 {
        /// Skip window menus and goto lists
        const MENUS = 1 << 0;
        /// Never promoted by focus toggling / MRU recovery
        const FOCUS_TOGGLE = 1 << 1;
        /// Ignored by the move / resize snap algorithms
        const SNAP = 1 << 2;
        /// Hidden from pagers
        const PAGER = 1 << 3;
        /// Hidden from taskbars
        const TASKBAR = 1 << 4;
    }
}

bitflags! {
    /// Client requests the window manager refuses to honor.
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CfgDeny: u16 {
        /// Ignore client moves
        const POSITION = 1 << 0;
        /// Ignore client resizes
        const SIZE = 1 << 1;
        /// Ignore client restack requests
        const STACKING = 1 << 2;
        /// Ignore _NET_ACTIVE_WINDOW requests
        const ACTIVE_WINDOW = 1 << 3;
        /// Ignore maximize requests
        const MAXIMIZED_VERT = 1 << 4;
        /// Ignore maximize requests
        const MAXIMIZED_HORZ = 1 << 5;
        /// Ignore fullscreen requests
        const FULLSCREEN = 1 << 6;
        /// Ignore above-layer requests
        const ABOVE = 1 << 7;
        /// Ignore below-layer requests
        const BELOW = 1 << 8;
        /// Ignore the client's strut property
        const STRUT = 1 << 9;
    }
}

bitflags! {
    /// WM operations a client may be subjected to, mirrored to
    /// `_NET_WM_ALLOWED_ACTIONS`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct WmActions: u16 {
        /// The window may be moved
        const MOVE = 1 << 0;
        /// The window may be resized
        const RESIZE = 1 << 1;
        /// The window may be iconified
        const ICONIFY = 1 << 2;
        /// The window may be shaded
        const SHADE = 1 << 3;
        /// The window may be made sticky
        const STICK = 1 << 4;
        /// The window may be maximized horizontally
        const MAXIMIZE_HORZ = 1 << 5;
        /// The window may be maximized vertically
        const MAXIMIZE_VERT = 1 << 6;
        /// The window may be made fullscreen
        const FULLSCREEN = 1 << 7;
        /// The window may be sent to another workspace
        const CHANGE_DESKTOP = 1 << 8;
        /// The window may be closed
        const CLOSE = 1 << 9;
    }
}

impl Default for WmActions {
    fn default() -> Self {
        Self::all()
    }
}

impl WmActions {
    /// The `_NET_WM_ACTION_*` atoms corresponding to the set bits.
    pub fn atoms(&self) -> Vec<Atom> {
        [
            (Self::MOVE, Atom::NetWmActionMove),
            (Self::RESIZE, Atom::NetWmActionResize),
            (Self::ICONIFY, Atom::NetWmActionMinimize),
            (Self::SHADE, Atom::NetWmActionShade),
            (Self::STICK, Atom::NetWmActionStick),
            (Self::MAXIMIZE_HORZ, Atom::NetWmActionMaximizeHorz),
            (Self::MAXIMIZE_VERT, Atom::NetWmActionMaximizeVert),
            (Self::FULLSCREEN, Atom::NetWmActionFullscreen),
            (Self::CHANGE_DESKTOP, Atom::NetWmActionChangeDesktop),
            (Self::CLOSE, Atom::NetWmActionClose),
        ]
        .iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, atom)| *atom)
        .collect()
    }
}

/// Focused / unfocused opacity, in `_NET_WM_WINDOW_OPACITY` units.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opacity {
    /// Opacity applied while the client's frame holds focus
    pub focused: u32,
    /// Opacity applied otherwise
    pub unfocused: u32,
}

impl Default for Opacity {
    fn default() -> Self {
        Self {
            focused: u32::MAX,
            unfocused: u32::MAX,
        }
    }
}

/// Mutable window-manager state for one client.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientState {
    /// Current state flags
    pub flags: StateFlags,
    /// Flags requested before the client was first mapped
    pub initial: StateFlags,
    /// Flags saved across a fullscreen / maximize toggle
    pub saved: StateFlags,
    /// Surfaces to skip
    pub skip: SkipFlags,
    /// Client requests to refuse
    pub cfg_deny: CfgDeny,
    /// Stacking layer
    pub layer: Layer,
    /// Workspace membership
    pub workspace: usize,
}

/// One managed X window.
///
/// Clients are owned by the window manager state and reparented into frames;
/// `frame` is a weak back reference that is re-validated through the frame
/// map on every dereference (the frame may be destroyed between X events).
#[derive(Debug, Clone)]
pub struct Client {
    /// The client window itself
    pub id: Xid,
    /// Identifying tuple used for AutoProperty matching
    pub hint: ClassHint,
    /// Mutable WM state
    pub state: ClientState,
    /// The client window this one is transient for, by window id.
    ///
    /// Resolved through the client map on use; the parent may already be
    /// gone.
    pub transient_for: Option<Xid>,
    /// The frame currently decorating this client
    pub frame: Option<FrameId>,
    /// Operations this client may be subjected to
    pub allowed_actions: WmActions,
    /// Operations explicitly denied for this client
    pub disallowed_actions: WmActions,
    /// Focused / unfocused opacity pair
    pub opacity: Opacity,
    /// Icon pixmap handle, when one was supplied
    pub icon: Option<Xid>,
    /// Cached WM_NORMAL_HINTS
    pub normal_hints: WmNormalHints,
    /// Whether the client accepts input focus
    pub focusable: bool,
    /// Title override produced by a matching title rewrite rule.
    ///
    /// Replaces the displayed title only; the window's title property is
    /// left untouched.
    pub title_override: Option<String>,
    /// Geometry of the client window inside its frame
    pub geometry: Rect,
    /// Whether the client is currently mapped
    pub mapped: bool,
}

impl Client {
    /// Create a new client wrapping `id` with default state.
    pub fn new(id: Xid, hint: ClassHint) -> Self {
        Self {
            id,
            hint,
            state: ClientState::default(),
            transient_for: None,
            frame: None,
            allowed_actions: WmActions::all(),
            disallowed_actions: WmActions::empty(),
            opacity: Opacity::default(),
            icon: None,
            normal_hints: WmNormalHints::default(),
            focusable: true,
            title_override: None,
            geometry: Rect::default(),
            mapped: false,
        }
    }

    /// The title shown in the frame: the rewrite result when a title rule
    /// matched, the client's own title otherwise.
    pub fn effective_title(&self) -> &str {
        self.title_override.as_deref().unwrap_or(&self.hint.title)
    }

    /// Whether an action is currently permitted for this client.
    pub fn allows(&self, action: WmActions) -> bool {
        self.allowed_actions.contains(action) && !self.disallowed_actions.contains(action)
    }

    /// Whether this client is visible on workspace `ws`.
    pub fn on_workspace(&self, ws: usize) -> bool {
        self.state.flags.contains(StateFlags::STICKY) || self.state.workspace == ws
    }

    /// The `_NET_WM_STATE` atoms corresponding to the current state flags.
    pub fn net_wm_states(&self) -> Vec<Atom> {
        let mut atoms = Vec::new();
        let f = self.state.flags;

        if f.contains(StateFlags::STICKY) {
            atoms.push(Atom::NetWmStateSticky);
        }
        if f.contains(StateFlags::SHADED) {
            atoms.push(Atom::NetWmStateShaded);
        }
        if f.contains(StateFlags::ICONIFIED) {
            atoms.push(Atom::NetWmStateHidden);
        }
        if f.contains(StateFlags::MAXIMIZED_VERT) {
            atoms.push(Atom::NetWmStateMaximizedVert);
        }
        if f.contains(StateFlags::MAXIMIZED_HORZ) {
            atoms.push(Atom::NetWmStateMaximizedHorz);
        }
        if f.contains(StateFlags::FULLSCREEN) {
            atoms.push(Atom::NetWmStateFullscreen);
        }
        if f.contains(StateFlags::DEMANDS_ATTENTION) {
            atoms.push(Atom::NetWmStateDemandsAttention);
        }
        if self.state.skip.contains(SkipFlags::PAGER) {
            atoms.push(Atom::NetWmStateSkipPager);
        }
        if self.state.skip.contains(SkipFlags::TASKBAR) {
            atoms.push(Atom::NetWmStateSkipTaskbar);
        }

        atoms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    fn client_with(flags: StateFlags, skip: SkipFlags) -> Client {
        let mut c = Client::new(Xid(1), ClassHint::default());
        c.state.flags = flags;
        c.state.skip = skip;
        c
    }

    #[test]
    fn net_wm_states_mirror_flags() {
        let c = client_with(
            StateFlags::STICKY | StateFlags::FULLSCREEN,
            SkipFlags::TASKBAR,
        );

        assert_eq!(
            c.net_wm_states(),
            vec![
                Atom::NetWmStateSticky,
                Atom::NetWmStateFullscreen,
                Atom::NetWmStateSkipTaskbar,
            ]
        );
    }

    #[test_case(StateFlags::STICKY, 3, true; "sticky on other workspace")]
    #[test_case(StateFlags::empty(), 0, true; "own workspace")]
    #[test_case(StateFlags::empty(), 3, false; "other workspace")]
    #[test]
    fn on_workspace(flags: StateFlags, ws: usize, expected: bool) {
        let c = client_with(flags, SkipFlags::empty());

        assert_eq!(c.on_workspace(ws), expected);
    }

    #[test]
    fn disallowed_beats_allowed() {
        let mut c = Client::new(Xid(1), ClassHint::default());
        c.disallowed_actions = WmActions::CLOSE;

        assert!(c.allows(WmActions::MOVE));
        assert!(!c.allows(WmActions::CLOSE));
    }

    #[test]
    fn title_override_wins_over_property_title() {
        let mut c = Client::new(
            Xid(1),
            ClassHint {
                title: "raw".into(),
                ..Default::default()
            },
        );
        assert_eq!(c.effective_title(), "raw");

        c.title_override = Some("rewritten".into());
        assert_eq!(c.effective_title(), "rewritten");
    }
}
