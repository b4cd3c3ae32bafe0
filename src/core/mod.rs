//! Core state and the window manager run loop
use crate::{
    autoprops::AutoProperties,
    client::{Client, SkipFlags, StateFlags},
    core::{
        bindings::{Bindings, DoubleClickTracker},
        observer::{Observation, ObserverBus},
        timeouts::TimeoutQueue,
    },
    decor::{DecorProfile, DecorStore},
    frame::{Frame, FrameId, FrameIdGen},
    harbour::{Harbour, HarbourConfig},
    input::snap::SnapConfig,
    panel::CommandSpec,
    pure::{
        geometry::{head_nearest, Head, Point, Rect, StrutStore},
        placement::PlacementModel,
        StackingList, Workspaces,
    },
    x::{Atom, Prop, WmState, XConn, XConnExt},
    Error, Result, Xid,
};
use nix::{
    poll::{poll, PollFd, PollFlags},
    sys::signal::{signal, SigHandler, Signal},
};
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};
use tracing::{debug, error, span, trace, Level};

pub mod actions;
pub mod bindings;
pub mod handle;
pub mod manage;
pub mod observer;
pub mod timeouts;

use actions::Action;

/// The kinds of window-owning objects events can resolve to.
///
/// Event routing switches on this tag after looking the event window up in
/// the window map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinObj {
    /// A managed client window
    Client(Xid),
    /// A frame (or one of its decoration windows)
    Frame(FrameId),
    /// The root window
    Root,
    /// A screen edge zone
    Edge(ScreenEdge),
    /// A harbour dock app
    DockApp(Xid),
    /// A menu window
    Menu(Xid),
    /// An internal dialog window
    Dialog(Xid),
}

/// The four screen edge zones.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenEdge {
    /// Top edge of the screen
    Top,
    /// Bottom edge of the screen
    Bottom,
    /// Left edge of the screen
    Left,
    /// Right edge of the screen
    Right,
}

/// The parsed window manager configuration.
///
/// The configuration file grammar is an external concern: quay consumes
/// this value, typically produced by a parser from the config directory.
#[derive(Debug)]
pub struct Config {
    /// Number of workspaces to start with
    pub workspace_count: i32,
    /// Display names for leading workspaces
    pub workspace_names: Vec<String>,
    /// Re-selecting the active workspace returns to the previous one
    pub workspaces_back_and_forth: bool,
    /// Show the transient indicator window on workspace switches
    pub show_workspace_indicator: bool,
    /// Double click promotion interval in milliseconds; 0 disables
    pub double_click_ms: u32,
    /// Edge attraction / resistance for interactive moves
    pub snap: SnapConfig,
    /// Move windows live instead of drawing an outline
    pub opaque_move: bool,
    /// Resize windows live instead of drawing an outline
    pub opaque_resize: bool,
    /// Thickness of the screen edge zones in pixels; 0 disables them
    pub edge_size: u32,
    /// Placement strategies tried in order for new frames
    pub placement: Vec<PlacementModel>,
    /// Focus new clients when they are first mapped
    pub focus_new: bool,
    /// Focus follows the mouse pointer
    pub focus_follow_mouse: bool,
    /// Warp the pointer to the focused frame on workspace switches
    pub warp_pointer_on_goto: bool,
    /// Harbour configuration
    pub harbour: HarbourConfig,
    /// Key and mouse bindings
    pub bindings: Bindings,
    /// Key table consumed by the keyboard move / resize loop
    pub moveresize_keys: Vec<(bindings::KeyCode, crate::input::moveresize::MoveResizeAction)>,
    /// Decor profiles; must include `DEFAULT`
    pub decor_profiles: Vec<DecorProfile>,
    /// Font height used to resolve adapt-to-font title heights
    pub font_height: u32,
    /// Panel sampler commands (consumed by the panel loop, not the WM)
    pub panel_commands: Vec<CommandSpec>,
}

impl Default for Config {
    fn default() -> Self {
        let strings = |slice: &[&str]| slice.iter().map(|s| s.to_string()).collect();

        Config {
            workspace_count: 4,
            workspace_names: strings(&[]),
            workspaces_back_and_forth: false,
            show_workspace_indicator: true,
            double_click_ms: 250,
            snap: SnapConfig::default(),
            opaque_move: true,
            opaque_resize: false,
            edge_size: 1,
            placement: vec![PlacementModel::Smart, PlacementModel::MouseCentered],
            focus_new: true,
            focus_follow_mouse: true,
            warp_pointer_on_goto: false,
            harbour: HarbourConfig::default(),
            bindings: Bindings::default(),
            moveresize_keys: vec![],
            decor_profiles: vec![DecorProfile::plain(crate::decor::DEFAULT_DECOR)],
            font_height: 12,
            panel_commands: vec![],
        }
    }
}

/// Mutable internal state for the window manager.
///
/// The state exclusively owns every [Client] and [Frame]; all
/// back-references between objects are ids resolved through the maps here,
/// and every destruction path removes the map entry before dropping the
/// object, so a failed lookup is the signal that a reference went stale.
#[derive(Debug)]
pub struct State {
    /// The active configuration
    pub config: Config,
    /// All managed clients keyed by their window
    pub clients: HashMap<Xid, Client>,
    /// All frames keyed by their stable id
    pub frames: HashMap<FrameId, Frame>,
    /// Window to object resolution map
    pub win_map: HashMap<Xid, WinObj>,
    /// The authoritative global stacking order
    pub stacking: StackingList,
    /// The workspace set
    pub workspaces: Workspaces,
    /// Current heads with their effective struts
    pub heads: Vec<Head>,
    /// Registered struts
    pub struts: StrutStore,
    /// The dock app container
    pub harbour: Harbour,
    /// The active auto property rule set
    pub autoprops: AutoProperties,
    /// The loaded decor profiles
    pub decors: DecorStore,
    /// The frame currently holding input focus
    pub focused: Option<FrameId>,
    /// Scheduled actions keyed for cancellation
    pub timeouts: TimeoutQueue<Action>,
    /// Double click promotion state
    pub double_clicks: DoubleClickTracker,
    /// Model change notifications
    pub observers: ObserverBus<Observation>,
    /// The root window
    pub root: Xid,
    /// Screen edge zone windows in [ScreenEdge] order
    pub edge_windows: Vec<(Xid, ScreenEdge)>,
    /// The transient workspace indicator window, when shown
    pub(crate) indicator: Option<Xid>,
    /// In-progress dock app drag: (window, grab x offset, grab y offset)
    pub(crate) harbour_drag: Option<(Xid, i32, i32)>,
    /// Strut store keys for struts contributed by client windows
    pub(crate) client_struts: HashMap<Xid, u64>,
    /// Reassembly state for the `_QUAY_CMD` control channel
    pub(crate) ctrl: crate::ctrl::CommandAssembler,
    pub(crate) frame_ids: FrameIdGen,
    pub(crate) harbour_strut_key: Option<u64>,
    pub(crate) cascade_index: usize,
    pub(crate) running: bool,
    pub(crate) restart: bool,
}

impl State {
    /// Build the initial state from a config against a live connection.
    pub fn try_new<X: XConn>(config: Config, x: &X) -> Result<Self> {
        let decors = DecorStore::new(config.decor_profiles.clone())?;
        let workspaces = Workspaces::new(
            config.workspace_count,
            config.workspace_names.clone(),
            config.workspaces_back_and_forth,
        );
        let harbour = Harbour::new(config.harbour);
        let heads = x
            .screen_details()?
            .into_iter()
            .map(Head::new)
            .collect::<Vec<_>>();

        let root = x.root();
        let mut win_map = HashMap::new();
        win_map.insert(root, WinObj::Root);

        Ok(Self {
            config,
            clients: HashMap::new(),
            frames: HashMap::new(),
            win_map,
            stacking: StackingList::new(),
            workspaces,
            heads,
            struts: StrutStore::default(),
            harbour,
            autoprops: AutoProperties::default(),
            decors,
            focused: None,
            timeouts: TimeoutQueue::new(),
            double_clicks: DoubleClickTracker::default(),
            observers: ObserverBus::new(),
            root,
            edge_windows: Vec::new(),
            indicator: None,
            harbour_drag: None,
            client_struts: HashMap::new(),
            ctrl: crate::ctrl::CommandAssembler::new(),
            frame_ids: FrameIdGen::default(),
            harbour_strut_key: None,
            cascade_index: 0,
            running: true,
            restart: false,
        })
    }

    /// Resolve an event window to the object owning it.
    pub fn object_at(&self, id: Xid) -> Option<WinObj> {
        self.win_map.get(&id).copied()
    }

    /// The client wrapping window `id`.
    pub fn client(&self, id: Xid) -> Result<&Client> {
        self.clients.get(&id).ok_or(Error::UnknownClient(id))
    }

    /// Mutable access to the client wrapping window `id`.
    pub fn client_mut(&mut self, id: Xid) -> Result<&mut Client> {
        self.clients.get_mut(&id).ok_or(Error::UnknownClient(id))
    }

    /// The frame with the given id.
    pub fn frame(&self, id: FrameId) -> Result<&Frame> {
        self.frames.get(&id).ok_or(Error::UnknownFrame(id))
    }

    /// Mutable access to the frame with the given id.
    pub fn frame_mut(&mut self, id: FrameId) -> Result<&mut Frame> {
        self.frames.get_mut(&id).ok_or(Error::UnknownFrame(id))
    }

    /// The frame currently decorating client `id`, re-validated through the
    /// frame map.
    pub fn frame_of(&self, client: Xid) -> Option<&Frame> {
        let fid = self.clients.get(&client)?.frame?;
        self.frames.get(&fid)
    }

    /// The active client of frame `id`, when both still exist.
    pub fn active_client_of(&self, id: FrameId) -> Option<&Client> {
        let frame = self.frames.get(&id)?;
        self.clients.get(&frame.active_client()?)
    }

    /// The index of the head containing `p`.
    pub fn head_at<P: Into<Point>>(&self, p: P) -> usize {
        head_nearest(&self.heads, p)
    }

    /// The usable rect of the head nearest to the center of `r`.
    pub fn usable_head_for(&self, r: &Rect) -> Rect {
        let i = self.head_at(r.midpoint());
        self.heads
            .get(i)
            .map(|h| h.usable())
            .unwrap_or(Rect::new(0, 0, 1, 1))
    }

    /// Recompute each head's effective strut from the registered struts.
    pub fn apply_struts(&mut self) {
        for (i, head) in self.heads.iter_mut().enumerate() {
            head.strut = self.struts.effective(i);
        }
    }

    /// Re-read head geometry after a RandR / Xinerama change.
    pub fn update_heads<X: XConn>(&mut self, x: &X) -> Result<()> {
        let rects = x.screen_details()?;
        self.heads = rects.into_iter().map(Head::new).collect();
        self.apply_struts();

        // re-clamp the harbour and republish its strut
        let head = self.harbour_head();
        self.harbour.update_geometry(head);
        self.sync_harbour_strut();

        self.observers.notify(&Observation::HeadsChanged);

        Ok(())
    }

    /// The usable rect of the head the harbour is configured for.
    pub fn harbour_head(&self) -> Rect {
        let i = self.harbour.config().head.min(self.heads.len().saturating_sub(1));
        self.heads
            .get(i)
            .map(|h| h.r)
            .unwrap_or(Rect::new(0, 0, 1, 1))
    }

    /// Push the harbour's current strut into the strut store and recompute
    /// head struts.
    pub fn sync_harbour_strut(&mut self) {
        let strut = self.harbour.strut();

        match self.harbour_strut_key {
            Some(key) => self.struts.update(key, strut),
            None => self.harbour_strut_key = Some(self.struts.add(strut)),
        }

        self.apply_struts();
    }

    // ---------------------------------------------------------------------
    // stacking

    /// Frames whose active client is transient for `client`, in stacking
    /// order.
    fn transient_frames_of(&self, client: Xid) -> Vec<Xid> {
        self.stacking
            .iter()
            .filter_map(|e| match self.win_map.get(&e.id) {
                Some(WinObj::Frame(fid)) => self.frames.get(fid),
                _ => None,
            })
            .filter(|f| {
                f.active_client()
                    .and_then(|c| self.clients.get(&c))
                    .and_then(|c| c.transient_for)
                    == Some(client)
            })
            .map(|f| f.window)
            .collect()
    }

    /// Raise a frame to the top of its layer, bringing its transient family
    /// with it (parent first).
    pub fn raise_frame<X: XConn>(&mut self, x: &X, id: FrameId) -> Result<()> {
        let frame = self.frame(id)?;
        let window = frame.window;
        let active = frame.active_client();

        // when raising a transient, the whole family moves: parent first
        let (parent_win, family_root) = match active
            .and_then(|c| self.clients.get(&c))
            .and_then(|c| c.transient_for)
            .and_then(|p| self.frame_of(p))
        {
            Some(parent) => (parent.window, parent.active_client()),
            None => (window, active),
        };

        let children = family_root
            .map(|c| self.transient_frames_of(c))
            .unwrap_or_default();

        self.stacking.raise_family(parent_win, &children);
        if parent_win != window && !children.contains(&window) {
            self.stacking.raise(window);
        }

        self.restack(x)
    }

    /// Lower a frame to the bottom of its layer with its transient family
    /// (parent last).
    pub fn lower_frame<X: XConn>(&mut self, x: &X, id: FrameId) -> Result<()> {
        let frame = self.frame(id)?;
        let window = frame.window;
        let active = frame.active_client();

        let (parent_win, family_root) = match active
            .and_then(|c| self.clients.get(&c))
            .and_then(|c| c.transient_for)
            .and_then(|p| self.frame_of(p))
        {
            Some(parent) => (parent.window, parent.active_client()),
            None => (window, active),
        };

        let children = family_root
            .map(|c| self.transient_frames_of(c))
            .unwrap_or_default();

        self.stacking.lower_family(parent_win, &children);

        self.restack(x)
    }

    /// Push the stacking list to the X server and republish
    /// `_NET_CLIENT_LIST_STACKING`.
    pub fn restack<X: XConn>(&mut self, x: &X) -> Result<()> {
        debug_assert!(self.stacking.is_layer_sorted());

        let ids = self.stacking.ids();
        x.restack(ids.iter())?;

        self.publish_client_list_stacking(x)?;
        self.observers.notify(&Observation::StackingChanged);

        Ok(())
    }

    // ---------------------------------------------------------------------
    // focus

    /// Find a frame to receive focus on the active workspace.
    ///
    /// The MRU path walks the most-recently-used list; the fallback walks
    /// the stacking list bottom up. Unmapped, non-focusable and
    /// `SKIP_FOCUS_TOGGLE` objects are never returned.
    pub fn find_focus_candidate(&self, mru: bool) -> Option<FrameId> {
        let focusable = |fid: &FrameId| -> bool {
            match self.frames.get(fid) {
                Some(f) => {
                    f.mapped
                        && self
                            .active_client_of(*fid)
                            .map(|c| {
                                c.focusable && !c.state.skip.contains(SkipFlags::FOCUS_TOGGLE)
                            })
                            .unwrap_or(false)
                }
                None => false,
            }
        };

        if mru {
            if let Some(fid) = self.workspaces.mru_iter().find(|fid| focusable(fid)) {
                return Some(fid);
            }
        }

        self.stacking
            .iter()
            .filter_map(|e| match self.win_map.get(&e.id) {
                Some(WinObj::Frame(fid)) => Some(*fid),
                _ => None,
            })
            .find(|fid| focusable(fid))
    }

    /// Move input focus to `frame` (or the root when `None`), updating MRU,
    /// per-workspace records, opacity and EWMH hints.
    pub fn focus_frame<X: XConn>(&mut self, x: &X, frame: Option<FrameId>) -> Result<()> {
        let previous = self.focused.take();

        if let Some(prev) = previous.and_then(|f| self.frames.get(&f)) {
            if let Some(c) = prev.active_client().and_then(|c| self.clients.get(&c)) {
                x.set_window_opacity(prev.window, c.opacity.unfocused)?;
            }
        }

        match frame.and_then(|f| self.frames.get(&f)) {
            Some(f) => {
                let fid = f.id;
                let window = f.window;
                let active = f.active_client();

                if let Some(c) = active.and_then(|c| self.clients.get(&c)) {
                    if !c.focusable {
                        return Ok(());
                    }
                    x.set_window_opacity(window, c.opacity.focused)?;
                }
                if let Some(c) = active {
                    x.focus(c)?;
                    x.set_prop(
                        self.root,
                        Atom::NetActiveWindow.as_ref(),
                        Prop::Window(vec![c]),
                    )?;
                }

                self.focused = Some(fid);

                let skip = active
                    .and_then(|c| self.clients.get(&c))
                    .map(|c| c.state.skip.contains(SkipFlags::FOCUS_TOGGLE))
                    .unwrap_or(false);
                if !skip {
                    self.workspaces.mru_promote(fid);
                }

                let ws = self.workspaces.active();
                self.workspaces.set_last_focused(ws, Some(fid));
            }
            None => {
                x.focus(self.root)?;
                x.delete_prop(self.root, Atom::NetActiveWindow.as_ref())?;
            }
        }

        if previous != self.focused {
            self.observers.notify(&Observation::FocusChanged);
        }

        Ok(())
    }

    // ---------------------------------------------------------------------
    // workspaces

    /// Switch to workspace `n` per the back-and-forth policy, remapping
    /// windows and reasserting focus. Returns false when nothing changed.
    pub fn goto_workspace<X: XConn>(
        &mut self,
        x: &X,
        n: usize,
        warp_pointer: bool,
        show_indicator: bool,
    ) -> Result<bool> {
        let switch = match self.workspaces.switch_to(n) {
            Some(s) => s,
            None => return Ok(false),
        };
        debug!(from = switch.from, to = switch.to, "switching workspace");

        // unmap non-sticky frames of the old workspace, map those of the new
        let frame_ids: Vec<FrameId> = self.frames.keys().copied().collect();
        for fid in frame_ids {
            let (on_old, on_new, iconified) = {
                let f = &self.frames[&fid];
                let iconified = self
                    .active_client_of(fid)
                    .map(|c| c.state.flags.contains(StateFlags::ICONIFIED))
                    .unwrap_or(false);
                (
                    f.sticky || f.workspace == switch.from,
                    f.sticky || f.workspace == switch.to,
                    iconified,
                )
            };

            if on_new && !iconified {
                self.show_frame(x, fid)?;
            } else if on_old {
                self.hide_frame(x, fid)?;
            }
        }

        // focus chain: workspace last-focused, then MRU, then root
        let target = self
            .workspaces
            .last_focused(switch.to)
            .filter(|fid| {
                self.frames
                    .get(fid)
                    .map(|f| f.mapped)
                    .unwrap_or(false)
                    && self
                        .active_client_of(*fid)
                        .map(|c| c.focusable)
                        .unwrap_or(false)
            })
            .or_else(|| self.find_focus_candidate(true));
        self.focus_frame(x, target)?;

        if warp_pointer {
            if let Some(f) = target.and_then(|fid| self.frames.get(&fid)) {
                let r = f.geometry;
                x.warp_pointer(f.window, r.w as i16 / 2, r.h as i16 / 2)?;
            }
        }

        self.publish_current_desktop(x)?;
        self.observers.notify(&Observation::WorkspaceChanged {
            from: switch.from,
            to: switch.to,
        });

        if show_indicator && self.config.show_workspace_indicator {
            self.timeouts.schedule(
                "workspace-indicator",
                Instant::now() + Duration::from_millis(500),
                Action::HideWorkspaceIndicator,
            );
        }

        Ok(true)
    }

    /// Resize the workspace set, relocating windows from dropped workspaces
    /// to the highest remaining one. Returns true iff the size changed.
    pub fn set_workspace_count<X: XConn>(&mut self, x: &X, n: i32) -> Result<bool> {
        if !self.workspaces.set_size(n) {
            return Ok(false);
        }

        let last = self.workspaces.len() - 1;
        let moved: Vec<FrameId> = self
            .frames
            .iter()
            .filter(|(_, f)| f.workspace > last)
            .map(|(id, _)| *id)
            .collect();
        for fid in moved {
            self.move_frame_to_workspace(x, fid, last)?;
        }

        self.publish_workspace_shape(x)?;
        self.observers
            .notify(&Observation::WorkspaceSetResized(self.workspaces.len()));

        Ok(true)
    }

    /// Move a frame (all of its clients) to workspace `ws`.
    pub fn move_frame_to_workspace<X: XConn>(
        &mut self,
        x: &X,
        fid: FrameId,
        ws: usize,
    ) -> Result<()> {
        let ws = ws.min(self.workspaces.len() - 1);
        let clients: Vec<Xid> = self.frame(fid)?.clients().to_vec();

        for c in clients {
            if let Some(client) = self.clients.get_mut(&c) {
                client.state.workspace = ws;
            }
            x.set_prop(c, Atom::NetWmDesktop.as_ref(), Prop::Cardinal(vec![ws as u32]))?;

            // workspace-phase rules fire when a client changes workspace
            let hint = self.client(c)?.hint.clone();
            if let Some(prop) = self
                .autoprops
                .find_auto_property(&hint, Some(ws), crate::autoprops::ApplyOn::WORKSPACE)
                .cloned()
            {
                if let Some(client) = self.clients.get_mut(&c) {
                    manage::apply_auto_property(client, &prop);
                }
                self.publish_client_state(x, c)?;
            }
        }
        self.frame_mut(fid)?.workspace = ws;

        let active_ws = self.workspaces.active();
        let visible = {
            let f = self.frame(fid)?;
            f.sticky || ws == active_ws
        };
        if visible {
            self.show_frame(x, fid)?;
        } else {
            self.hide_frame(x, fid)?;
            if self.focused == Some(fid) {
                let next = self.find_focus_candidate(true);
                self.focus_frame(x, next)?;
            }
        }

        Ok(())
    }

    /// Map a frame and mark its clients Normal.
    pub fn show_frame<X: XConn>(&mut self, x: &X, fid: FrameId) -> Result<()> {
        let (window, clients, mapped) = {
            let f = self.frame(fid)?;
            (f.window, f.clients().to_vec(), f.mapped)
        };

        if !mapped {
            x.map(window)?;
        }
        for c in clients {
            x.set_wm_state(c, WmState::Normal)?;
            if let Some(client) = self.clients.get_mut(&c) {
                client.mapped = true;
            }
        }
        self.frame_mut(fid)?.mapped = true;

        Ok(())
    }

    /// Unmap a frame and mark its clients Iconic.
    pub fn hide_frame<X: XConn>(&mut self, x: &X, fid: FrameId) -> Result<()> {
        let (window, clients, mapped) = {
            let f = self.frame(fid)?;
            (f.window, f.clients().to_vec(), f.mapped)
        };

        if mapped {
            x.unmap(window)?;
        }
        for c in clients {
            x.set_wm_state(c, WmState::Iconic)?;
            if let Some(client) = self.clients.get_mut(&c) {
                client.mapped = false;
            }
        }
        self.frame_mut(fid)?.mapped = false;

        Ok(())
    }

    // ---------------------------------------------------------------------
    // EWMH publishing

    pub(crate) fn publish_client_list<X: XConn>(&self, x: &X) -> Result<()> {
        let ids: Vec<Xid> = self.clients.keys().copied().collect();
        x.set_prop(self.root, Atom::NetClientList.as_ref(), Prop::Window(ids))
    }

    pub(crate) fn publish_client_list_stacking<X: XConn>(&self, x: &X) -> Result<()> {
        // only client windows appear in the EWMH list, in stacking order
        let ids: Vec<Xid> = self
            .stacking
            .iter()
            .filter_map(|e| match self.win_map.get(&e.id) {
                Some(WinObj::Frame(fid)) => {
                    self.frames.get(fid).and_then(|f| f.active_client())
                }
                Some(WinObj::DockApp(c)) => Some(*c),
                _ => None,
            })
            .collect();

        x.set_prop(
            self.root,
            Atom::NetClientListStacking.as_ref(),
            Prop::Window(ids),
        )
    }

    pub(crate) fn publish_current_desktop<X: XConn>(&self, x: &X) -> Result<()> {
        x.set_prop(
            self.root,
            Atom::NetCurrentDesktop.as_ref(),
            Prop::Cardinal(vec![self.workspaces.active() as u32]),
        )
    }

    pub(crate) fn publish_workspace_shape<X: XConn>(&self, x: &X) -> Result<()> {
        x.set_prop(
            self.root,
            Atom::NetNumberOfDesktops.as_ref(),
            Prop::Cardinal(vec![self.workspaces.len() as u32]),
        )?;

        let names: Vec<String> = self.workspaces.iter().map(|w| w.name.clone()).collect();
        x.set_prop(
            self.root,
            Atom::NetDesktopNames.as_ref(),
            Prop::UTF8String(names),
        )?;

        // single-row horizontal layout, top-left starting corner
        x.set_prop(
            self.root,
            Atom::NetDesktopLayout.as_ref(),
            Prop::Cardinal(vec![0, self.workspaces.len() as u32, 1, 0]),
        )?;

        self.publish_current_desktop(x)
    }

    pub(crate) fn publish_client_state<X: XConn>(&self, x: &X, id: Xid) -> Result<()> {
        let client = self.client(id)?;

        let states: Vec<String> = client
            .net_wm_states()
            .iter()
            .map(|a| a.as_ref().to_string())
            .collect();
        x.set_prop(id, Atom::NetWmState.as_ref(), Prop::Atom(states))?;

        let actions: Vec<String> = client
            .allowed_actions
            .difference(client.disallowed_actions)
            .atoms()
            .iter()
            .map(|a| a.as_ref().to_string())
            .collect();
        x.set_prop(id, Atom::NetWmAllowedActions.as_ref(), Prop::Atom(actions))?;

        x.set_prop(
            id,
            Atom::NetWmDesktop.as_ref(),
            Prop::Cardinal(vec![client.state.workspace as u32]),
        )
    }
}

/// A top level struct holding all of the state required to run as an X11
/// window manager.
pub struct WindowManager<X>
where
    X: XConn,
{
    x: X,
    /// The model state being managed
    pub state: State,
}

impl<X> std::fmt::Debug for WindowManager<X>
where
    X: XConn,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowManager")
            .field("state", &self.state)
            .finish()
    }
}

impl<X> WindowManager<X>
where
    X: XConn,
{
    /// Construct a new [WindowManager] with the provided config and X
    /// connection.
    pub fn new(config: Config, x: X) -> Result<Self> {
        let state = State::try_new(config, &x)?;

        Ok(Self { x, state })
    }

    /// Access to the underlying connection.
    pub fn conn(&self) -> &X {
        &self.x
    }

    /// Perform the X-side setup a window manager run needs: root event
    /// selection, binding grabs, EWMH bootstrap, edge windows, initial
    /// client scan.
    pub fn startup(&mut self) -> Result<()> {
        trace!("registering SIGCHLD handler");
        if let Err(e) = unsafe { signal(Signal::SIGCHLD, SigHandler::SigIgn) } {
            return Err(Error::Raw(format!("unable to set signal handler: {e}")));
        }

        let root = self.state.root;
        self.x.set_client_attributes(
            root,
            &[crate::x::ClientAttr::RootEventMask],
        )?;

        trace!("grabbing key and mouse bindings");
        let codes: Vec<_> = self.state.config.bindings.keys.iter().map(|b| b.code).collect();
        self.x.grab_keys(&codes)?;

        self.state.publish_workspace_shape(&self.x)?;
        self.state.publish_client_list(&self.x)?;

        manage::create_edge_windows(&mut self.state, &self.x)?;

        // scan existing clients under a server grab so nothing maps halfway
        self.x.grab_server();
        let scan = manage::scan_existing(&mut self.state, &self.x);
        self.x.ungrab_server();
        scan?;

        // START rules only fire during the scan
        self.state.autoprops.remove_apply_on_start();

        let initial = self.state.find_focus_candidate(false);
        self.state.focus_frame(&self.x, initial)?;

        Ok(())
    }

    /// Start the window manager and run it until told to exit.
    ///
    /// Returns true when a restart was requested. A panic inside the event
    /// loop takes the emergency exit: release all grabs, hand every managed
    /// client back to the root window, then resume unwinding.
    pub fn run(mut self) -> Result<bool> {
        self.startup()?;

        let caught =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| self.event_loop()));

        match caught {
            Ok(result) => {
                result?;
                let restart = self.state.restart;
                self.shutdown()?;

                Ok(restart)
            }
            Err(panic) => {
                error!("panic in the event loop: releasing grabs and bailing out");
                self.x.ungrab_server();
                self.x.ungrab_pointer();
                self.x.ungrab_keyboard();

                let ids: Vec<Xid> = self.state.clients.keys().copied().collect();
                for id in ids {
                    let _ = manage::unmanage_client(&mut self.state, &self.x, id, true);
                }
                self.x.flush();

                std::panic::resume_unwind(panic)
            }
        }
    }

    /// The inner event loop: blocks on the X connection descriptor with the
    /// earliest scheduled timeout as the deadline, dispatches at most one X
    /// event fully, then fires all due timeouts.
    fn event_loop(&mut self) -> Result<()> {
        while self.state.running {
            // at most one queued event is dispatched per cycle
            if let Some(event) = self.x.poll_event()? {
                self.dispatch(event);
                self.x.flush();
                continue;
            }

            let timeout_ms: i32 = self
                .state
                .timeouts
                .until_next(Instant::now())
                .map(|d| d.as_millis().min(i32::MAX as u128) as i32)
                .unwrap_or(-1);

            let fd = self.x.connection_fd();
            if fd >= 0 {
                let mut fds = [PollFd::new(fd, PollFlags::POLLIN)];
                match poll(&mut fds, timeout_ms) {
                    Ok(_) => (),
                    Err(nix::errno::Errno::EINTR) => continue,
                    Err(e) => return Err(Error::Raw(format!("poll failed: {e}"))),
                }
            } else if let Ok(event) = self.x.next_event() {
                // descriptor-less connections (tests) fall back to blocking
                self.dispatch(event);
                self.x.flush();
                continue;
            } else {
                break;
            }

            for action in self.state.timeouts.pop_due(Instant::now()) {
                if let Err(e) =
                    actions::handle_action(&action, None, &mut self.state, &self.x)
                {
                    error!(%e, ?action, "error running scheduled action");
                }
            }
        }

        Ok(())
    }

    /// Dispatch one X event. Handler errors are logged, never propagated:
    /// the event loop must survive anything a client throws at it.
    pub fn dispatch(&mut self, event: crate::x::XEvent) {
        let span = span!(target: "quay", Level::DEBUG, "XEvent", %event);
        let _enter = span.enter();
        trace!(details = ?event, "event details");

        if let Err(e) = handle::x_event(event, &mut self.state, &self.x) {
            match e {
                Error::UnknownClient(id) => {
                    // X resource gone between queue and dispatch
                    debug!(%id, "event for unknown client: dropping");
                    self.state.win_map.remove(&id);
                }
                e => error!(%e, "error handling X event"),
            }
        }
    }

    fn shutdown(mut self) -> Result<()> {
        debug!("shutting down: reparenting clients back to root");

        self.x.grab_server();
        let client_ids: Vec<Xid> = self.state.clients.keys().copied().collect();
        for id in client_ids {
            let _ = manage::unmanage_client(&mut self.state, &self.x, id, true);
        }
        self.x.ungrab_server();
        self.x.flush();

        Ok(())
    }
}

