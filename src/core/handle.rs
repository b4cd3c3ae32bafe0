//! Default per-event handlers for the main loop
use crate::{
    autoprops::ApplyOn,
    client::{CfgDeny, StateFlags},
    core::{actions, manage, State, WinObj},
    input,
    pure::geometry::Strut,
    x::{
        event::{ClientMessage, ConfigureRequestEvent, PointerChange, PropertyEvent},
        Atom, Prop, XConn, XConnExt, XEvent,
    },
    Result, Xid,
};
use tracing::{debug, trace, warn};

/// Dispatch one X event to its handler.
pub fn x_event<X: XConn>(event: XEvent, state: &mut State, x: &X) -> Result<()> {
    use XEvent::*;

    match event {
        ClientMessage(m) => client_message(m, state, x),
        ConfigureNotify(e) if e.id == state.root => heads_changed(state, x),
        ConfigureNotify(_) => Ok(()),
        ConfigureRequest(e) => configure_request(e, state, x),
        Destroy(id) => destroy(id, state, x),
        Enter(p) => enter(p, state, x),
        FocusIn(_) => Ok(()),
        KeyPress(code, _) => input::handle_key_press(state, x, code),
        KeyRelease(_, _) => Ok(()),
        Leave(_) => Ok(()),
        MappingNotify => regrab_keys(state, x),
        MapRequest(id) => manage::manage_window(state, x, id, ApplyOn::NEW),
        MouseEvent(ev) => input::handle_mouse_event(state, x, ev),
        PropertyNotify(e) => property_notify(e, state, x),
        RandrNotify => heads_changed(state, x),
        SelectionClear(_) => {
            // another manager took WM_Sn: exit cleanly
            debug!("manager selection cleared: shutting down");
            state.running = false;
            Ok(())
        }
        ShapeNotify(id) => shape_notify(id, state, x),
        UnmapNotify(id) => unmap_notify(id, state, x),
    }
}

fn destroy<X: XConn>(id: Xid, state: &mut State, x: &X) -> Result<()> {
    match state.object_at(id) {
        Some(WinObj::Client(c)) => {
            remove_client_strut(state, c);
            manage::unmanage_client(state, x, c, false)
        }
        Some(WinObj::DockApp(d)) => manage::unmanage_dock_app(state, x, d),
        _ => {
            // stale or foreign window: drop any map entry and move on
            state.win_map.remove(&id);
            Ok(())
        }
    }
}

fn unmap_notify<X: XConn>(id: Xid, state: &mut State, x: &X) -> Result<()> {
    match state.object_at(id) {
        // a client unmapping itself is withdrawing from management; frame
        // window unmaps are our own doing
        Some(WinObj::Client(c)) => {
            let self_unmap = state.clients.get(&c).map(|cl| !cl.mapped).unwrap_or(true);
            if self_unmap {
                return Ok(());
            }
            trace!(%c, "client withdrew itself");
            remove_client_strut(state, c);
            manage::unmanage_client(state, x, c, true)
        }
        Some(WinObj::DockApp(d)) => manage::unmanage_dock_app(state, x, d),
        _ => Ok(()),
    }
}

fn enter<X: XConn>(p: PointerChange, state: &mut State, x: &X) -> Result<()> {
    if !state.config.focus_follow_mouse {
        return Ok(());
    }

    let fid = match state.object_at(p.id) {
        Some(WinObj::Frame(fid)) => Some(fid),
        Some(WinObj::Client(id)) => state.frame_of(id).map(|f| f.id),
        _ => None,
    };

    if let Some(fid) = fid {
        if state.focused != Some(fid) {
            state.focus_frame(x, Some(fid))?;
        }
    }

    Ok(())
}

fn regrab_keys<X: XConn>(state: &mut State, x: &X) -> Result<()> {
    trace!("keyboard mapping changed: re-grabbing bindings");
    let codes: Vec<_> = state.config.bindings.keys.iter().map(|b| b.code).collect();

    x.grab_keys(&codes)
}

fn heads_changed<X: XConn>(state: &mut State, x: &X) -> Result<()> {
    debug!("head geometry changed");
    state.update_heads(x)?;
    manage::create_edge_windows(state, x)?;

    // push re-clamped dock apps to the server
    for da in state.harbour.dock_apps() {
        x.set_client_config(da.frame, &[crate::x::ClientConfig::Position(da.geometry)])?;
    }

    Ok(())
}

fn shape_notify<X: XConn>(id: Xid, state: &mut State, x: &X) -> Result<()> {
    if let Some(WinObj::Client(c)) = state.object_at(id) {
        if let Some(fid) = state.frame_of(c).map(|f| f.id) {
            manage::rederive_frame(state, x, fid)?;
        }
    }

    Ok(())
}

fn configure_request<X: XConn>(
    e: ConfigureRequestEvent,
    state: &mut State,
    x: &X,
) -> Result<()> {
    match state.object_at(e.id) {
        Some(WinObj::DockApp(d)) => {
            // the harbour honors size only
            let head = state.harbour_head();
            let current = state
                .harbour
                .find_dock_app(d)
                .map(|da| da.geometry)
                .unwrap_or_default();
            let (w, h) = (e.w.unwrap_or(current.w), e.h.unwrap_or(current.h));

            if state.harbour.resize_dock_app(d, w, h, head) {
                if let Some(da) = state.harbour.find_dock_app(d) {
                    x.set_client_config(
                        da.frame,
                        &[crate::x::ClientConfig::Position(da.geometry)],
                    )?;
                }
                state.sync_harbour_strut();
            }

            Ok(())
        }
        Some(WinObj::Client(c)) => {
            let (deny, fid) = {
                let client = state.client(c)?;
                (client.state.cfg_deny, client.frame)
            };
            let fid = match fid.filter(|f| state.frames.contains_key(f)) {
                Some(fid) => fid,
                None => return Ok(()),
            };

            let mut r = state.frame(fid)?.geometry;
            if !deny.contains(CfgDeny::POSITION) {
                if let Some(cx) = e.x {
                    r.x = cx;
                }
                if let Some(cy) = e.y {
                    r.y = cy;
                }
            }
            if !deny.contains(CfgDeny::SIZE) {
                let layout = &state.frame(fid)?.layout;
                if let Some(w) = e.w {
                    r.w = layout.frame_size_for(w, 1).0;
                }
                if let Some(h) = e.h {
                    r.h = layout.frame_size_for(1, h).1;
                }
            }

            manage::set_frame_geometry(state, x, fid, r)
        }
        _ => {
            // unmanaged window: let it configure itself
            let current = x.client_geometry(e.id).unwrap_or_default();
            let r = crate::pure::geometry::Rect::new(
                e.x.unwrap_or(current.x),
                e.y.unwrap_or(current.y),
                e.w.unwrap_or(current.w),
                e.h.unwrap_or(current.h),
            );
            x.set_client_config(e.id, &[crate::x::ClientConfig::Position(r)])
        }
    }
}

fn property_notify<X: XConn>(e: PropertyEvent, state: &mut State, x: &X) -> Result<()> {
    let c = match state.object_at(e.id) {
        Some(WinObj::Client(c)) => c,
        _ => return Ok(()),
    };

    match e.atom.as_str() {
        a if a == Atom::WmName.as_ref() || a == Atom::NetWmName.as_ref() => {
            let title = x.window_title(c)?;
            {
                let client = state.client_mut(c)?;
                client.hint.title = title.clone();
                client.title_override = None;
            }
            let hint = state.client(c)?.hint.clone();
            let rewritten = state
                .autoprops
                .find_title_property(&hint)
                .and_then(|rule| rule.rule.rewrite(&title));
            state.client_mut(c)?.title_override = rewritten;

            if let Some(fid) = state.frame_of(c).map(|f| f.id) {
                manage::rederive_frame(state, x, fid)?;
            }
        }
        a if a == Atom::WmNormalHints.as_ref() => {
            state.client_mut(c)?.normal_hints = x.normal_hints(c)?.unwrap_or_default();
        }
        a if a == Atom::WmHints.as_ref() => {
            if let Some(h) = x.wm_hints(c)? {
                state
                    .client_mut(c)?
                    .state
                    .flags
                    .set(StateFlags::DEMANDS_ATTENTION, h.urgent);
                state.publish_client_state(x, c)?;
            }
        }
        a if a == Atom::NetWmStrutPartial.as_ref() => {
            update_client_strut(state, x, c)?;
        }
        _ => (),
    }

    Ok(())
}

fn update_client_strut<X: XConn>(state: &mut State, x: &X, c: Xid) -> Result<()> {
    if state.client(c)?.state.cfg_deny.contains(CfgDeny::STRUT) {
        return Ok(());
    }

    let strut = match x.get_prop(c, Atom::NetWmStrutPartial.as_ref())? {
        Some(Prop::Cardinal(v)) if v.len() >= 4 => {
            let head = state.head_at(state.client(c)?.geometry.midpoint());
            Some(Strut::new(v[0], v[1], v[2], v[3], Some(head)))
        }
        _ => None,
    };

    match (strut, state.client_struts.get(&c).copied()) {
        (Some(s), Some(key)) => state.struts.update(key, s),
        (Some(s), None) => {
            let key = state.struts.add(s);
            state.client_struts.insert(c, key);
        }
        (None, Some(key)) => {
            state.struts.remove(key);
            state.client_struts.remove(&c);
        }
        (None, None) => (),
    }

    state.apply_struts();

    Ok(())
}

pub(crate) fn remove_client_strut(state: &mut State, c: Xid) {
    if let Some(key) = state.client_struts.remove(&c) {
        state.struts.remove(key);
        state.apply_struts();
    }
}

fn client_message<X: XConn>(m: ClientMessage, state: &mut State, x: &X) -> Result<()> {
    let dtype = m.dtype.as_str();

    if dtype == Atom::QuayCmd.as_ref() {
        if let Some(data) = m.data.as_bytes() {
            if let Some(cmd) = state.ctrl.push(data)? {
                debug!(%cmd, "control channel command");
                match actions::Action::from_command(&cmd) {
                    Some(action) => {
                        return actions::handle_action(&action, None, state, x);
                    }
                    None => warn!(%cmd, "unknown control command"),
                }
            }
        }

        return Ok(());
    }

    if dtype == Atom::NetCurrentDesktop.as_ref() {
        if let Some(&n) = m.data.as_usize().first() {
            state.goto_workspace(x, n, false, true)?;
        }
        return Ok(());
    }

    if dtype == Atom::NetNumberOfDesktops.as_ref() {
        if let Some(&n) = m.data.as_usize().first() {
            state.set_workspace_count(x, n as i32)?;
        }
        return Ok(());
    }

    if dtype == Atom::NetActiveWindow.as_ref() {
        if let Some(WinObj::Client(c)) = state.object_at(m.id) {
            let denied = state
                .client(c)?
                .state
                .cfg_deny
                .contains(CfgDeny::ACTIVE_WINDOW);
            if !denied {
                if let Some(fid) = state.frame_of(c).map(|f| f.id) {
                    let ws = state.frame(fid).map(|f| f.workspace).unwrap_or(0);
                    if ws != state.workspaces.active() {
                        state.goto_workspace(x, ws, false, false)?;
                    }
                    state.raise_frame(x, fid)?;
                    state.focus_frame(x, Some(fid))?;
                }
            }
        }
        return Ok(());
    }

    if dtype == Atom::NetWmState.as_ref() {
        return net_wm_state_message(m, state, x);
    }

    if dtype == Atom::NetWmDesktop.as_ref() {
        if let (Some(WinObj::Client(c)), Some(&ws)) =
            (state.object_at(m.id), m.data.as_usize().first())
        {
            if let Some(fid) = state.frame_of(c).map(|f| f.id) {
                state.move_frame_to_workspace(x, fid, ws)?;
            }
        }
        return Ok(());
    }

    trace!(%dtype, "unhandled client message");
    Ok(())
}

// _NET_WM_STATE: data[0] = {0 remove, 1 add, 2 toggle}, data[1..3] = atoms
fn net_wm_state_message<X: XConn>(m: ClientMessage, state: &mut State, x: &X) -> Result<()> {
    let c = match state.object_at(m.id) {
        Some(WinObj::Client(c)) => c,
        _ => return Ok(()),
    };
    let fid = match state.frame_of(c).map(|f| f.id) {
        Some(fid) => fid,
        None => return Ok(()),
    };

    let data = m.data.as_usize();
    let op = data.first().copied().unwrap_or(2);

    for &raw in data.iter().skip(1).take(2).filter(|&&a| a != 0) {
        let name = match x.atom_name(Xid(raw as u32)) {
            Ok(name) => name,
            Err(_) => continue,
        };

        let flag = match name.as_str() {
            s if s == Atom::NetWmStateFullscreen.as_ref() => {
                let current = state
                    .client(c)?
                    .state
                    .flags
                    .contains(StateFlags::FULLSCREEN);
                let denied = state.client(c)?.state.cfg_deny.contains(CfgDeny::FULLSCREEN);
                if !denied && should_toggle(op, current) {
                    actions::handle_action(&actions::Action::ToggleFullscreen, Some(WinObj::Frame(fid)), state, x)?;
                }
                continue;
            }
            s if s == Atom::NetWmStateSticky.as_ref() => Some(StateFlags::STICKY),
            s if s == Atom::NetWmStateShaded.as_ref() => Some(StateFlags::SHADED),
            s if s == Atom::NetWmStateDemandsAttention.as_ref() => {
                Some(StateFlags::DEMANDS_ATTENTION)
            }
            s if s == Atom::NetWmStateMaximizedVert.as_ref()
                || s == Atom::NetWmStateMaximizedHorz.as_ref() =>
            {
                let current = state.client(c)?.state.flags.intersects(
                    StateFlags::MAXIMIZED_VERT | StateFlags::MAXIMIZED_HORZ,
                );
                if should_toggle(op, current) {
                    actions::handle_action(
                        &actions::Action::ToggleMaximized {
                            horz: true,
                            vert: true,
                        },
                        Some(WinObj::Frame(fid)),
                        state,
                        x,
                    )?;
                }
                continue;
            }
            _ => None,
        };

        if let Some(flag) = flag {
            let current = state.client(c)?.state.flags.contains(flag);
            if should_toggle(op, current) {
                if flag == StateFlags::STICKY {
                    actions::handle_action(
                        &actions::Action::ToggleSticky,
                        Some(WinObj::Frame(fid)),
                        state,
                        x,
                    )?;
                } else if flag == StateFlags::SHADED {
                    actions::handle_action(
                        &actions::Action::ToggleShaded,
                        Some(WinObj::Frame(fid)),
                        state,
                        x,
                    )?;
                } else {
                    state.client_mut(c)?.state.flags.toggle(flag);
                    state.publish_client_state(x, c)?;
                }
            }
        }
    }

    Ok(())
}

// 0 = remove, 1 = add, 2 = toggle: whether the flag should flip
fn should_toggle(op: usize, current: bool) -> bool {
    match op {
        0 => current,
        1 => !current,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::Config,
        ctrl::encode_command,
        x::{event::ClientEventMask, event::ClientMessageData, StubXConn},
    };

    struct Conn;
    impl StubXConn for Conn {}

    fn ctrl_message(data: [u8; 20]) -> ClientMessage {
        ClientMessage::new(
            Xid(0),
            ClientEventMask::NoEventMask,
            Atom::QuayCmd.as_ref(),
            ClientMessageData::U8(data),
        )
    }

    #[test]
    fn chunked_control_command_executes_exactly_one_action() {
        let mut state = State::try_new(Config::default(), &Conn).unwrap();
        state.workspaces.set_back_and_forth(true);

        // 45 byte command: 3 chunks with opcodes 1, 2, 3
        let cmd = "GotoWorkspace 2 please and thank you kindly!!";
        assert_eq!(cmd.len(), 45);
        let msgs = encode_command(cmd);
        assert_eq!(msgs.len(), 3);

        for m in &msgs {
            client_message(ctrl_message(*m), &mut state, &Conn).unwrap();
        }

        assert_eq!(state.workspaces.active(), 2);
    }

    #[test]
    fn control_command_exit() {
        let mut state = State::try_new(Config::default(), &Conn).unwrap();

        for m in encode_command("Exit") {
            client_message(ctrl_message(m), &mut state, &Conn).unwrap();
        }

        assert!(!state.running);
    }

    #[test]
    fn unknown_control_command_is_ignored() {
        let mut state = State::try_new(Config::default(), &Conn).unwrap();

        for m in encode_command("NoSuchCommand at all") {
            client_message(ctrl_message(m), &mut state, &Conn).unwrap();
        }

        assert!(state.running);
    }

    #[test]
    fn current_desktop_message_switches_workspace() {
        let mut state = State::try_new(Config::default(), &Conn).unwrap();

        let m = ClientMessage::new(
            Xid(0),
            ClientEventMask::NoEventMask,
            Atom::NetCurrentDesktop.as_ref(),
            ClientMessageData::U32([2, 0, 0, 0, 0]),
        );
        client_message(m, &mut state, &Conn).unwrap();

        assert_eq!(state.workspaces.active(), 2);
    }

    #[test]
    fn selection_clear_stops_the_manager() {
        let mut state = State::try_new(Config::default(), &Conn).unwrap();

        x_event(XEvent::SelectionClear(Xid(0)), &mut state, &Conn).unwrap();

        assert!(!state.running);
    }
}
