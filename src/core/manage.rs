//! Establishing and removing window manager state for windows
use crate::{
    autoprops::{ApplyOn, AutoProperty, ClassHint, Group},
    client::{Client, StateFlags},
    core::{ScreenEdge, State, WinObj},
    frame::{Frame, FrameId, RemoveOutcome},
    harbour::DockApp,
    pure::{
        geometry::{Point, Rect},
        placement::{place, PlacementInput},
    },
    x::{
        property::{MapState, WmState},
        Atom, ClientAttr, WinType, XConn, XConnExt,
    },
    Error, Result, Xid,
};
use std::str::FromStr;
use tracing::{debug, trace, warn};

/// Establish window manager state for every window that already exists.
///
/// Run under a server grab during startup. Windows that are override
/// redirect or neither viewable nor iconic are left alone.
pub fn scan_existing<X: XConn>(state: &mut State, x: &X) -> Result<()> {
    for id in x.existing_clients()? {
        if state.win_map.contains_key(&id) {
            continue;
        }

        let attrs = match x.get_window_attributes(id) {
            Ok(attrs) => attrs,
            Err(_) => continue, // gone already
        };
        if attrs.override_redirect {
            continue;
        }

        let managed_state = x.get_wm_state(id).unwrap_or(None);
        let viewable = attrs.map_state == MapState::Viewable;
        let iconic = managed_state == Some(WmState::Iconic);
        if !viewable && !iconic && !matches!(x.wm_hints(id), Ok(Some(h)) if h.is_dock_app()) {
            continue;
        }

        if let Err(e) = manage_window(state, x, id, ApplyOn::START) {
            warn!(%id, %e, "unable to manage existing window");
        }
    }

    Ok(())
}

/// Route a map request: harbour for withdrawn-with-icon windows, the frame
/// tree for everything else. Override-redirect windows are ignored.
pub fn manage_window<X: XConn>(state: &mut State, x: &X, id: Xid, phase: ApplyOn) -> Result<()> {
    if state.win_map.contains_key(&id) {
        trace!(%id, "window already managed");
        return Ok(());
    }

    let attrs = x.get_window_attributes(id)?;
    if attrs.override_redirect {
        trace!(%id, "override redirect: ignoring");
        return Ok(());
    }

    let hints = x.wm_hints(id)?.unwrap_or_default();
    if hints.is_dock_app() {
        return manage_dock_app(state, x, id, hints.icon_window);
    }

    manage_client(state, x, id, phase)
}

fn manage_client<X: XConn>(state: &mut State, x: &X, id: Xid, phase: ApplyOn) -> Result<()> {
    trace!(%id, "managing new client");
    x.set_client_attributes(id, &[ClientAttr::ClientEventMask])?;

    // passive grabs so client-scope mouse bindings reach us first
    let client_states: Vec<_> = state
        .config
        .bindings
        .mouse
        .get(&crate::core::bindings::BindingScope::Client)
        .map(|bs| bs.iter().map(|b| b.state).collect())
        .unwrap_or_default();
    if !client_states.is_empty() {
        x.grab_buttons(id, &client_states)?;
    }

    let mut hint = x.class_hint(id)?;
    let transient_for = x.transient_for(id)?;
    let mut client = Client::new(id, hint.clone());
    client.transient_for = transient_for;
    client.normal_hints = x.normal_hints(id)?.unwrap_or_default();
    client.geometry = x.client_geometry(id)?;
    client.state.workspace = state.workspaces.active();
    if let Some(h) = x.wm_hints(id)? {
        client.focusable = h.accepts_input;
        client.icon = h.icon_pixmap;
        if h.urgent {
            client.state.flags |= StateFlags::DEMANDS_ATTENTION;
        }
    }

    // window-type defaults first, explicit rules override per property
    let type_prop = x
        .window_types(id)?
        .iter()
        .filter_map(|name| Atom::from_str(name).ok())
        .find_map(|atom| state.autoprops.find_window_type_property(atom))
        .cloned();

    let phase = if transient_for.is_some() {
        phase | ApplyOn::TRANSIENT
    } else {
        phase
    };
    let explicit = state
        .autoprops
        .find_auto_property(&hint, Some(client.state.workspace), phase)
        .cloned();

    let prop = match (explicit, type_prop) {
        (Some(e), Some(t)) => Some(e.or_defaults(&t)),
        (Some(e), None) => Some(e),
        (None, Some(t)) => Some(t),
        (None, None) => None,
    };

    let mut decor_name = crate::decor::DEFAULT_DECOR.to_string();
    let mut titlebar = true;
    let mut bordered = true;
    let mut focus_new = state.config.focus_new;
    let mut place_new = true;
    let mut frame_geometry = None;
    let mut group = None;

    if let Some(prop) = &prop {
        apply_auto_property(&mut client, prop);
        if let Some(name) = &prop.decor {
            decor_name = name.clone();
        }
        if let Some(t) = prop.titlebar {
            titlebar = t;
        }
        if let Some(b) = prop.border {
            bordered = b;
        }
        if let Some(f) = prop.focus_new {
            focus_new = f;
        }
        if let Some(p) = prop.place_new {
            place_new = p;
        }
        frame_geometry = prop.frame_geometry;
        if let Some(g) = prop.client_geometry {
            client.geometry = g;
        }
        group = prop.group.clone();
        if let Some(g) = &group {
            hint.group = g.name.clone();
            client.hint.group = g.name.clone();
        }
    }

    if let Some(rule) = state.autoprops.find_decor_property(&hint) {
        decor_name = rule.decor.clone();
    }
    if let Some(rule) = state.autoprops.find_title_property(&hint) {
        client.title_override = rule.rule.rewrite(&hint.title);
    }

    let ws = client.state.workspace;
    state.clients.insert(id, client);
    state.win_map.insert(id, WinObj::Client(id));

    // grouping: join an existing frame when the rule finds a candidate
    if let Some(g) = &group {
        if let Some(fid) = group_candidate(state, g, &hint, ws) {
            debug!(%id, frame = %fid, group = %g.name, "grouping client into existing frame");
            attach_client(state, x, fid, id)?;

            if g.raise {
                state.raise_frame(x, fid)?;
            }
            if focus_new {
                state.focus_frame(x, Some(fid))?;
            }
            state.publish_client_list(x)?;
            state.publish_client_state(x, id)?;

            return Ok(());
        }
    }

    let fid = create_frame(state, x, id, &decor_name, titlebar, bordered)?;

    // place fresh frames unless a geometry was dictated
    let geometry = match frame_geometry {
        Some(r) => r,
        None if place_new => {
            let size = state.frame(fid)?.geometry;
            let pointer = x.cursor_position().unwrap_or_default();
            place_frame(state, size, pointer, transient_for)
        }
        None => state.frame(fid)?.geometry,
    };
    set_frame_geometry(state, x, fid, geometry)?;

    let (behind, raise) = group
        .as_ref()
        .map(|g| (g.behind, g.raise))
        .unwrap_or((false, false));
    let focused_window = state
        .focused
        .and_then(|f| state.frames.get(&f))
        .map(|f| f.window);
    if raise || !behind {
        state.raise_frame(x, fid)?;
    } else if let Some(focused_window) = focused_window {
        let window = state.frame(fid)?.window;
        state.stacking.stack_above(focused_window, window);
        state.restack(x)?;
    }

    let visible = {
        let c = state.client(id)?;
        !c.state.flags.contains(StateFlags::ICONIFIED) && c.on_workspace(state.workspaces.active())
    };
    if visible {
        state.show_frame(x, fid)?;
        if focus_new {
            state.focus_frame(x, Some(fid))?;
        }
    } else {
        state.hide_frame(x, fid)?;
    }

    state.publish_client_list(x)?;
    state.publish_client_state(x, id)?;

    Ok(())
}

// copy every set payload field onto the client
pub(crate) fn apply_auto_property(client: &mut Client, prop: &AutoProperty) {
    let mut set = |flag: StateFlags, value: Option<bool>| {
        if let Some(v) = value {
            client.state.flags.set(flag, v);
        }
    };

    set(StateFlags::STICKY, prop.sticky);
    set(StateFlags::SHADED, prop.shaded);
    set(StateFlags::ICONIFIED, prop.iconified);
    set(StateFlags::MAXIMIZED_VERT, prop.maximized_vert);
    set(StateFlags::MAXIMIZED_HORZ, prop.maximized_horz);
    set(StateFlags::FULLSCREEN, prop.fullscreen);

    if let Some(ws) = prop.workspace {
        client.state.workspace = ws;
    }
    if let Some(skip) = prop.skip {
        client.state.skip = skip;
    }
    if let Some(deny) = prop.cfg_deny {
        client.state.cfg_deny = deny;
    }
    if let Some(layer) = prop.layer {
        client.state.layer = layer;
    }
    if let Some(opacity) = prop.opacity {
        client.opacity = opacity;
    }
    if let Some(allowed) = prop.allowed_actions {
        client.allowed_actions = allowed;
    }
    if let Some(disallowed) = prop.disallowed_actions {
        client.disallowed_actions = disallowed;
    }
    if let Some(focusable) = prop.focusable {
        client.focusable = focusable;
    }

    client.state.initial = client.state.flags;
}

/// Search existing frames for one the grouping rule lets this client join.
pub fn group_candidate(
    state: &State,
    group: &Group,
    hint: &ClassHint,
    ws: usize,
) -> Option<FrameId> {
    // group size 1 always creates a new frame; 0 is unbounded
    if group.size == 1 {
        return None;
    }

    let candidate_ok = |fid: FrameId| -> bool {
        let frame = match state.frames.get(&fid) {
            Some(f) => f,
            None => return false,
        };
        let active = match state.active_client_of(fid) {
            Some(c) => c,
            None => return false,
        };

        let name_match = if group.name.is_empty() {
            active.hint.class == hint.class
        } else {
            active.hint.group == group.name
        };
        if !name_match {
            return false;
        }

        let matches_workspace = frame.workspace == ws || frame.sticky;
        if !matches_workspace && !group.global {
            return false;
        }

        let iconified = active.state.flags.contains(StateFlags::ICONIFIED);
        if iconified && !(group.global && matches_workspace) {
            return false;
        }

        group.size == 0 || frame.len() < group.size
    };

    if group.focused_first {
        if let Some(fid) = state.focused.filter(|&fid| candidate_ok(fid)) {
            return Some(fid);
        }
    }

    state
        .frames
        .keys()
        .copied()
        .filter(|&fid| candidate_ok(fid))
        .min() // deterministic: oldest frame first
}

/// Insert an existing client into `frame` as a new tab.
///
/// Fails with [Error::StaleParent] when the frame has been destroyed; the
/// caller treats that as an unmanage.
pub fn attach_client<X: XConn>(state: &mut State, x: &X, fid: FrameId, id: Xid) -> Result<()> {
    if !state.frames.contains_key(&fid) {
        return Err(Error::StaleParent(fid));
    }

    let (window, offset, content, workspace) = {
        let frame = state.frame(fid)?;
        (
            frame.window,
            frame.layout.content_offset(),
            frame.client_geometry(),
            frame.workspace,
        )
    };

    x.reparent(id, window, offset)?;
    x.position_window(id, content)?;

    {
        let client = state.client_mut(id)?;
        client.frame = Some(fid);
        client.state.workspace = workspace;
        client.geometry = content;
    }

    let frame = state.frame_mut(fid)?;
    frame.insert_client(id);
    rederive_frame(state, x, fid)?;

    Ok(())
}

/// Create a fresh frame wrapping `id` sized from the client's geometry.
pub fn create_frame<X: XConn>(
    state: &mut State,
    x: &X,
    id: Xid,
    decor_name: &str,
    titlebar: bool,
    bordered: bool,
) -> Result<FrameId> {
    let fid = state.frame_ids.next();
    let client_r = state.client(id)?.geometry;
    let layer = state.client(id)?.state.layer;
    let workspace = state.client(id)?.state.workspace;

    let profile = state.decors.get(decor_name).clone();
    let font_height = state.config.font_height;

    // provisional layout to derive the outer size from the client size
    let provisional = crate::decor::DecorLayout::derive(
        &profile,
        (client_r.w.max(1), client_r.h.max(1)),
        font_height,
        titlebar,
        bordered,
        &[0],
    );
    let (fw, fh) = provisional.frame_size_for(client_r.w.max(1), client_r.h.max(1));
    let frame_r = Rect::new(client_r.x, client_r.y, fw, fh);

    let window = x.create_window(WinType::InputOutput(Atom::NetWindowTypeNormal), frame_r, true)?;
    x.set_client_attributes(window, &[ClientAttr::FrameEventMask])?;

    let mut frame = Frame::new(fid, window, frame_r, id, decor_name, &profile, font_height);
    frame.layer = layer;
    frame.workspace = workspace;
    frame.titlebar_disabled = !titlebar;
    frame.border_disabled = !bordered;
    frame.rederive_layout(&profile, font_height, titlebar, bordered, &[0]);

    let offset = frame.layout.content_offset();
    x.reparent(id, window, offset)?;

    state.frames.insert(fid, frame);
    state.win_map.insert(window, WinObj::Frame(fid));
    state.client_mut(id)?.frame = Some(fid);

    state.stacking.insert(window, layer);
    rederive_frame(state, x, fid)?;

    Ok(fid)
}

/// Apply a new outer geometry to a frame, repositioning the client inside.
pub fn set_frame_geometry<X: XConn>(
    state: &mut State,
    x: &X,
    fid: FrameId,
    r: Rect,
) -> Result<()> {
    {
        let frame = state.frame_mut(fid)?;
        frame.geometry = r;
    }
    rederive_frame(state, x, fid)?;

    let (window, client_r, clients) = {
        let frame = state.frame(fid)?;
        (frame.window, frame.client_geometry(), frame.clients().to_vec())
    };

    x.set_client_config(window, &[crate::x::ClientConfig::Position(r)])?;
    for c in clients {
        x.position_window(c, client_r)?;
        if let Some(client) = state.clients.get_mut(&c) {
            client.geometry = client_r;
        }
    }

    Ok(())
}

/// Re-derive a frame's decoration layout, mirrors and shape from its active
/// client.
///
/// Runs whenever border / titlebar toggles, the decor name changes, the
/// theme is reloaded or the active tab switches.
pub fn rederive_frame<X: XConn>(state: &mut State, x: &X, fid: FrameId) -> Result<()> {
    let (decor_name, tab_titles, active) = {
        let frame = state.frame(fid)?;
        let titles: Vec<String> = frame
            .clients()
            .iter()
            .filter_map(|c| state.clients.get(c))
            .map(|c| c.effective_title().to_string())
            .collect();
        (frame.decor_name.clone(), titles, frame.active_client())
    };

    let profile = state.decors.get(&decor_name).clone();
    let font_height = state.config.font_height;

    // width request per tab: a crude font model, real text measuring is the
    // renderer's concern
    let (pad_l, pad_r) = profile.title_pad;
    let requests: Vec<u32> = tab_titles
        .iter()
        .map(|t| t.len() as u32 * (font_height / 2).max(1) + pad_l + pad_r)
        .collect();

    let active_client = active.and_then(|c| state.clients.get(&c).cloned());
    let fullscreen = active_client
        .as_ref()
        .map(|c| c.state.flags.contains(StateFlags::FULLSCREEN))
        .unwrap_or(false);
    let (titlebar, bordered) = {
        let f = state.frame(fid)?;
        (
            !fullscreen && !f.titlebar_disabled,
            !fullscreen && !f.border_disabled,
        )
    };

    {
        let frame = state.frame_mut(fid)?;
        frame.rederive_layout(&profile, font_height, titlebar, bordered, &requests);
        if let Some(c) = &active_client {
            frame.sync_mirrors(c);
        }
    }

    let (window, layout, extents) = {
        let frame = state.frame(fid)?;
        (
            frame.window,
            frame.layout.clone(),
            frame.layout.border,
        )
    };

    x.set_shape(window, &layout.shape_rects(None))?;
    if let Some(c) = active {
        x.set_frame_extents(
            c,
            extents.left,
            extents.right,
            extents.top + layout.title_height,
            extents.bottom,
        )?;
    }

    // keep the stacking layer in sync with the active client
    if let Some(c) = active_client {
        state.stacking.set_layer(window, c.state.layer);
    }

    Ok(())
}

fn place_frame(state: &mut State, size: Rect, pointer: Point, transient_for: Option<Xid>) -> Rect {
    // transients center on their parent's frame
    if let Some(parent_frame) = transient_for.and_then(|p| state.frame_of(p)) {
        return size.centered_in(&parent_frame.geometry);
    }

    let head = state.usable_head_for(&size);
    let existing: Vec<Rect> = state
        .frames
        .values()
        .filter(|f| f.mapped)
        .filter(|f| {
            state
                .active_client_of(f.id)
                .map(|c| !c.state.skip.contains(crate::client::SkipFlags::SNAP))
                .unwrap_or(true)
        })
        .map(|f| f.geometry)
        .collect();

    let models = state
        .workspaces
        .get(state.workspaces.active())
        .and_then(|w| w.layout.clone())
        .unwrap_or_else(|| state.config.placement.clone());

    let input = PlacementInput {
        head,
        pointer,
        existing: &existing,
        cascade_step: state.config.font_height + 6,
        cascade_index: state.cascade_index,
    };
    if models.contains(&crate::pure::placement::PlacementModel::Cascade) {
        state.cascade_index = (state.cascade_index + 1) % 16;
    }

    place(&models, size, &input)
}

/// Remove the window manager state for a client.
///
/// The map entry goes first on every path; the frame is notified and either
/// promotes a sibling tab or is destroyed with focus handed to the MRU
/// recovery candidate.
pub fn unmanage_client<X: XConn>(
    state: &mut State,
    x: &X,
    id: Xid,
    reparent_to_root: bool,
) -> Result<()> {
    trace!(%id, "removing client");
    state.win_map.remove(&id);
    state.double_clicks.forget(id);

    let client = match state.clients.remove(&id) {
        Some(c) => c,
        None => return Ok(()),
    };

    if reparent_to_root {
        let r = client.geometry;
        let _ = x.reparent(id, state.root, Point::new(r.x, r.y));
        let _ = x.set_wm_state(id, WmState::Withdrawn);
    }

    if let Some(fid) = client.frame {
        let outcome = match state.frames.get_mut(&fid) {
            Some(frame) => frame.remove_client(id),
            None => RemoveOutcome::NotAMember,
        };

        match outcome {
            RemoveOutcome::Promoted(sibling) => {
                debug!(frame = %fid, %sibling, "promoting sibling tab");
                rederive_frame(state, x, fid)?;
                if state.focused == Some(fid) {
                    x.focus(sibling)?;
                }
            }
            RemoveOutcome::Empty => {
                let keep = state.frame(fid).map(|f| f.keep_empty).unwrap_or(false);
                if !keep {
                    destroy_frame(state, x, fid)?;
                }
            }
            RemoveOutcome::Kept | RemoveOutcome::NotAMember => {
                if state.frames.contains_key(&fid) {
                    rederive_frame(state, x, fid)?;
                }
            }
        }
    }

    state.publish_client_list(x)?;

    Ok(())
}

/// Destroy a frame window and every record pointing at it, then recover
/// focus through the MRU list.
pub fn destroy_frame<X: XConn>(state: &mut State, x: &X, fid: FrameId) -> Result<()> {
    let window = match state.frames.get(&fid) {
        Some(f) => f.window,
        None => return Ok(()),
    };

    debug!(frame = %fid, "destroying frame");
    state.win_map.remove(&window);
    state.stacking.remove(window);
    state.workspaces.forget_frame(fid);
    state.frames.remove(&fid);

    let _ = x.destroy_window(window);
    state.restack(x)?;

    if state.focused == Some(fid) {
        state.focused = None;
        let next = state.find_focus_candidate(true);
        state.focus_frame(x, next)?;
    }

    Ok(())
}

// ---------------------------------------------------------------------
// dock apps

fn manage_dock_app<X: XConn>(
    state: &mut State,
    x: &X,
    id: Xid,
    icon_window: Option<Xid>,
) -> Result<()> {
    debug!(%id, ?icon_window, "routing window to the harbour");

    let hint = x.class_hint(id)?;
    let position = state
        .autoprops
        .find_dock_app_property(&hint)
        .map(|p| p.position)
        .unwrap_or(0);

    let shown = icon_window.unwrap_or(id);
    let r = x.client_geometry(shown)?;
    let parent = x.create_window(WinType::InputOutput(Atom::NetWindowTypeDock), r, true)?;
    x.reparent(shown, parent, Point::new(0, 0))?;

    let mut da = DockApp::new(id, parent, r, position);
    da.icon_window = icon_window;
    da.mapped = true;

    let sorted = state.autoprops.is_harbour_sort();
    let head = state.harbour_head();
    state.harbour.add_dock_app(da, sorted, head);

    let layer = state.harbour.layer();
    state.stacking.insert(parent, layer);

    state.win_map.insert(id, WinObj::DockApp(id));
    state.win_map.insert(parent, WinObj::DockApp(id));
    if let Some(icon) = icon_window {
        state.win_map.insert(icon, WinObj::DockApp(id));
    }

    // push the new geometry to the server
    if let Some(da) = state.harbour.find_dock_app(id) {
        x.set_client_config(parent, &[crate::x::ClientConfig::Position(da.geometry)])?;
        x.set_window_opacity(parent, state.harbour.config().opacity)?;
    }
    x.map(parent)?;
    x.map(shown)?;
    x.set_wm_state(id, WmState::Normal)?;

    state.sync_harbour_strut();
    state.restack(x)?;

    Ok(())
}

/// Remove a dock app (window destroyed or withdrawn).
pub fn unmanage_dock_app<X: XConn>(state: &mut State, x: &X, id: Xid) -> Result<()> {
    let sorted = state.autoprops.is_harbour_sort();
    let head = state.harbour_head();

    let da = match state.harbour.remove_dock_app(id, sorted, head) {
        Some(da) => da,
        None => return Ok(()),
    };

    state.win_map.remove(&da.window);
    state.win_map.remove(&da.frame);
    if let Some(icon) = da.icon_window {
        state.win_map.remove(&icon);
    }
    state.stacking.remove(da.frame);

    let _ = x.destroy_window(da.frame);

    // re-push re-placed dock apps
    for other in state.harbour.dock_apps() {
        x.set_client_config(
            other.frame,
            &[crate::x::ClientConfig::Position(other.geometry)],
        )?;
    }

    state.sync_harbour_strut();
    state.restack(x)?;

    Ok(())
}

// ---------------------------------------------------------------------
// screen edges

/// Create (or re-create) the four screen edge zone windows.
pub fn create_edge_windows<X: XConn>(state: &mut State, x: &X) -> Result<()> {
    for (window, _) in state.edge_windows.drain(..) {
        state.win_map.remove(&window);
        state.stacking.remove(window);
        let _ = x.destroy_window(window);
    }

    let size = state.config.edge_size;
    if size == 0 {
        return Ok(());
    }

    let total = bounding_box(&state.heads);
    let edges = [
        (ScreenEdge::Top, Rect::new(total.x, total.y, total.w, size)),
        (
            ScreenEdge::Bottom,
            Rect::new(total.x, total.bottom() - size as i32, total.w, size),
        ),
        (ScreenEdge::Left, Rect::new(total.x, total.y, size, total.h)),
        (
            ScreenEdge::Right,
            Rect::new(total.right() - size as i32, total.y, size, total.h),
        ),
    ];

    for (edge, r) in edges {
        let window = x.create_window(WinType::InputOnly, r, false)?;
        x.set_client_attributes(window, &[ClientAttr::EdgeEventMask])?;
        x.map(window)?;

        state.win_map.insert(window, WinObj::Edge(edge));
        state.edge_windows.push((window, edge));
    }

    Ok(())
}

fn bounding_box(heads: &[crate::pure::geometry::Head]) -> Rect {
    let mut it = heads.iter();
    let first = match it.next() {
        Some(h) => h.r,
        None => return Rect::new(0, 0, 1, 1),
    };

    it.fold(first, |acc, h| {
        let x = acc.x.min(h.r.x);
        let y = acc.y.min(h.r.y);
        let right = acc.right().max(h.r.right());
        let bottom = acc.bottom().max(h.r.bottom());
        Rect::new(x, y, (right - x) as u32, (bottom - y) as u32)
    })
}

// used by the detach actions

/// Detach every non-active tab of `fid` into a fresh frame occupying the
/// first part of the split geometry; the original frame keeps the second.
pub fn detach_split<X: XConn>(
    state: &mut State,
    x: &X,
    fid: FrameId,
    ratio: f64,
    horizontal: bool,
) -> Result<Option<FrameId>> {
    let (detached_r, kept_r) = state.frame(fid)?.split_geometry(ratio, horizontal);
    let moved = state.frame_mut(fid)?.detach_others();
    if moved.is_empty() {
        return Ok(None);
    }

    set_frame_geometry(state, x, fid, kept_r)?;
    rederive_frame(state, x, fid)?;

    let first = moved[0];
    let decor_name = state.frame(fid)?.decor_name.clone();
    {
        let client = state.client_mut(first)?;
        client.frame = None;
        client.geometry = detached_r;
    }
    let new_fid = create_frame(state, x, first, &decor_name, true, true)?;
    for &c in &moved[1..] {
        state.client_mut(c)?.frame = None;
        attach_client(state, x, new_fid, c)?;
    }
    // first client stays active in the new frame
    state.frame_mut(new_fid)?.activate_client(first);
    set_frame_geometry(state, x, new_fid, detached_r)?;

    let ws = state.frame(fid)?.workspace;
    state.frame_mut(new_fid)?.workspace = ws;
    state.show_frame(x, new_fid)?;
    state.restack(x)?;

    Ok(Some(new_fid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;
    use crate::x::StubXConn;

    struct Conn {
        next_window: std::cell::Cell<u32>,
    }

    impl Conn {
        fn new() -> Self {
            Self {
                next_window: std::cell::Cell::new(1000),
            }
        }
    }

    impl StubXConn for Conn {
        fn stub_create_window(
            &self,
            _: crate::x::WinType,
            _: Rect,
            _: bool,
        ) -> crate::Result<Xid> {
            let id = self.next_window.get();
            self.next_window.set(id + 1);
            Ok(Xid(id))
        }
    }

    fn state() -> (State, Conn) {
        let conn = Conn::new();
        let state = State::try_new(Config::default(), &conn).unwrap();
        (state, conn)
    }

    fn add_client(state: &mut State, id: u32, class: &str, ws: usize, group: &str) -> Xid {
        let xid = Xid(id);
        let mut c = Client::new(xid, ClassHint::new("app", class));
        c.hint.group = group.to_string();
        c.state.workspace = ws;
        state.clients.insert(xid, c);
        state.win_map.insert(xid, WinObj::Client(xid));
        xid
    }

    fn add_frame(state: &mut State, conn: &Conn, client: Xid, ws: usize) -> FrameId {
        let fid = create_frame(state, conn, client, "DEFAULT", true, true).unwrap();
        state.frame_mut(fid).unwrap().workspace = ws;
        state.frame_mut(fid).unwrap().mapped = true;
        fid
    }

    #[test]
    fn group_size_one_always_creates_a_new_frame() {
        let (mut s, conn) = state();
        let c = add_client(&mut s, 1, "Term", 0, "work");
        add_frame(&mut s, &conn, c, 0);

        let group = Group {
            name: "work".into(),
            size: 1,
            ..Default::default()
        };

        assert_eq!(
            group_candidate(&s, &group, &ClassHint::new("x", "Term"), 0),
            None
        );
    }

    #[test]
    fn group_by_name_finds_candidate() {
        let (mut s, conn) = state();
        let c = add_client(&mut s, 1, "Term", 0, "work");
        let fid = add_frame(&mut s, &conn, c, 0);

        let group = Group {
            name: "work".into(),
            ..Default::default()
        };

        assert_eq!(
            group_candidate(&s, &group, &ClassHint::new("x", "Term"), 0),
            Some(fid)
        );
    }

    #[test]
    fn group_requires_same_workspace_unless_global() {
        let (mut s, conn) = state();
        let c = add_client(&mut s, 1, "Term", 1, "work");
        let fid = add_frame(&mut s, &conn, c, 1);

        let mut group = Group {
            name: "work".into(),
            ..Default::default()
        };

        assert_eq!(
            group_candidate(&s, &group, &ClassHint::new("x", "Term"), 0),
            None
        );

        group.global = true;
        assert_eq!(
            group_candidate(&s, &group, &ClassHint::new("x", "Term"), 0),
            Some(fid)
        );
    }

    #[test]
    fn group_size_limit_is_respected() {
        let (mut s, conn) = state();
        let c1 = add_client(&mut s, 1, "Term", 0, "work");
        let fid = add_frame(&mut s, &conn, c1, 0);
        let c2 = add_client(&mut s, 2, "Term", 0, "work");
        attach_client(&mut s, &conn, fid, c2).unwrap();

        let mut group = Group {
            name: "work".into(),
            size: 2,
            ..Default::default()
        };
        assert_eq!(
            group_candidate(&s, &group, &ClassHint::new("x", "Term"), 0),
            None
        );

        // 0 means unbounded
        group.size = 0;
        assert_eq!(
            group_candidate(&s, &group, &ClassHint::new("x", "Term"), 0),
            Some(fid)
        );
    }

    #[test]
    fn attach_to_destroyed_frame_is_stale_parent() {
        let (mut s, conn) = state();
        let c = add_client(&mut s, 1, "Term", 0, "");

        let err = attach_client(&mut s, &conn, FrameId(99), c);
        assert!(matches!(err, Err(Error::StaleParent(FrameId(99)))));
    }

    #[test]
    fn detach_split_horz_migrates_inactive_tabs() {
        let (mut s, conn) = state();
        let a = add_client(&mut s, 1, "Term", 0, "");
        let fid = add_frame(&mut s, &conn, a, 0);
        let b = add_client(&mut s, 2, "Term", 0, "");
        attach_client(&mut s, &conn, fid, b).unwrap();
        s.frame_mut(fid).unwrap().activate_client(a);
        set_frame_geometry(&mut s, &conn, fid, Rect::new(100, 200, 500, 400)).unwrap();

        let new_fid = detach_split(&mut s, &conn, fid, 0.5, true)
            .unwrap()
            .unwrap();

        assert_eq!(s.frame(fid).unwrap().geometry, Rect::new(100, 400, 500, 200));
        assert_eq!(
            s.frame(new_fid).unwrap().geometry,
            Rect::new(100, 200, 500, 200)
        );
        assert_eq!(s.frame(fid).unwrap().clients(), &[a]);
        assert_eq!(s.frame(new_fid).unwrap().clients(), &[b]);
    }

    #[test]
    fn unmanage_removes_map_entry_before_frame_teardown() {
        let (mut s, conn) = state();
        let a = add_client(&mut s, 1, "Term", 0, "");
        let fid = add_frame(&mut s, &conn, a, 0);
        let frame_window = s.frame(fid).unwrap().window;

        unmanage_client(&mut s, &conn, a, false).unwrap();

        assert!(s.object_at(a).is_none());
        assert!(s.object_at(frame_window).is_none());
        assert!(s.frames.get(&fid).is_none());
        assert!(!s.stacking.contains(frame_window));
    }

    #[test]
    fn unmanage_tab_promotes_sibling() {
        let (mut s, conn) = state();
        let a = add_client(&mut s, 1, "Term", 0, "");
        let fid = add_frame(&mut s, &conn, a, 0);
        let b = add_client(&mut s, 2, "Term", 0, "");
        attach_client(&mut s, &conn, fid, b).unwrap();

        unmanage_client(&mut s, &conn, b, false).unwrap();

        assert!(s.frames.contains_key(&fid));
        assert_eq!(s.frame(fid).unwrap().active_client(), Some(a));
    }
}
