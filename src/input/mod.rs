//! Translation from raw X input events to actions.
//!
//! Every event window resolves through the window map to an owning object;
//! the object kind selects the action list, and the first binding whose
//! normalized `(button | key, modifier mask, event kind)` triple equals the
//! event fires.
use crate::{
    core::{
        actions::{handle_action, Action},
        bindings::{BindingScope, KeyCode, MouseEvent, MouseEventKind},
        State, WinObj,
    },
    decor::DecorPart,
    pure::geometry::Point,
    x::{ClientConfig, XConn},
    Result,
};
use tracing::trace;

pub mod moveresize;
pub mod snap;

/// Route a mouse event to its binding and run the resulting action.
pub fn handle_mouse_event<X: XConn>(state: &mut State, x: &X, mut ev: MouseEvent) -> Result<()> {
    // double click detection runs per window and button, on releases
    if ev.kind == MouseEventKind::Release {
        if let Some(button) = ev.button {
            let interval = state.config.double_click_ms;
            if state
                .double_clicks
                .on_release(ev.id, button.into(), ev.time, interval)
            {
                trace!(id = %ev.id, "promoting release to double click");
                ev.kind = MouseEventKind::DoubleClick;
            }
        }
    }

    let obj = match state.object_at(ev.id) {
        Some(obj) => obj,
        None => return Ok(()), // stale window
    };

    let (scope, border) = match obj {
        WinObj::Root => (BindingScope::Root, None),
        WinObj::Client(_) => (BindingScope::Client, None),
        WinObj::Menu(_) => (BindingScope::Menu, None),
        WinObj::Dialog(_) => (BindingScope::Frame, None),
        WinObj::Edge(_) => (BindingScope::Edge, None),
        WinObj::DockApp(id) => return handle_dock_app_event(state, x, id, &ev),
        WinObj::Frame(fid) => {
            let part = state
                .frame(fid)?
                .layout
                .hit_test(Point::new(ev.ex, ev.ey));
            match part {
                DecorPart::Title(_) => (BindingScope::Title, None),
                DecorPart::Border(pos) => (BindingScope::Border, Some(pos)),
                DecorPart::ButtonLeft(_) | DecorPart::ButtonRight(_) => {
                    (BindingScope::Title, None)
                }
                DecorPart::Content => (BindingScope::Frame, None),
            }
        }
    };

    let action = match state.config.bindings.match_mouse(scope, &ev) {
        Some(action) => action.clone(),
        None => return Ok(()),
    };
    trace!(?scope, ?action, "mouse binding matched");

    match action {
        Action::MoveInteractive => {
            let fid = match obj {
                WinObj::Frame(fid) => Some(fid),
                WinObj::Client(id) => state.frame_of(id).map(|f| f.id),
                _ => None,
            };
            if let Some(fid) = fid {
                let outcome = moveresize::pointer_move(state, x, fid, &ev)?;
                if outcome == moveresize::MoveResizeOutcome::Committed {
                    fire_edge_action(state, x, &ev)?;
                }
            }
        }
        Action::ResizeInteractive => {
            let fid = match obj {
                WinObj::Frame(fid) => Some(fid),
                WinObj::Client(id) => state.frame_of(id).map(|f| f.id),
                _ => None,
            };
            if let Some(fid) = fid {
                let from = border.unwrap_or(crate::decor::BorderPosition::BottomRight);
                moveresize::pointer_resize(state, x, fid, from, &ev)?;
            }
        }
        action => handle_action(&action, Some(obj), state, x)?,
    }

    Ok(())
}

/// Route a grabbed key press to its binding and run the resulting action.
pub fn handle_key_press<X: XConn>(state: &mut State, x: &X, code: KeyCode) -> Result<()> {
    let action = match state.config.bindings.match_key(code) {
        Some(action) => action.clone(),
        None => return Ok(()),
    };
    trace!(?action, "key binding matched");

    let target = state.focused.map(WinObj::Frame);
    handle_action(&action, target, state, x)
}

// a move ending inside a screen edge zone fires the edge binding for the
// initiating button, matched as a release
fn fire_edge_action<X: XConn>(state: &mut State, x: &X, ev: &MouseEvent) -> Result<()> {
    let size = state.config.edge_size as i32;
    if size == 0 || state.heads.is_empty() {
        return Ok(());
    }

    let p = x.cursor_position()?;
    let (mut x0, mut y0, mut x1, mut y1) = (i32::MAX, i32::MAX, i32::MIN, i32::MIN);
    for h in &state.heads {
        x0 = x0.min(h.r.x);
        y0 = y0.min(h.r.y);
        x1 = x1.max(h.r.right());
        y1 = y1.max(h.r.bottom());
    }

    let in_edge = p.x < x0 + size || p.x >= x1 - size || p.y < y0 + size || p.y >= y1 - size;
    if !in_edge {
        return Ok(());
    }

    let release = MouseEvent {
        kind: MouseEventKind::Release,
        rx: p.x,
        ry: p.y,
        ..*ev
    };
    if let Some(action) = state
        .config
        .bindings
        .match_mouse(BindingScope::Edge, &release)
        .cloned()
    {
        trace!(?action, "firing screen edge action after move");
        handle_action(&action, None, state, x)?;
    }

    Ok(())
}

// dock apps are dragged along the harbour axis rather than bound to actions
fn handle_dock_app_event<X: XConn>(
    state: &mut State,
    x: &X,
    id: crate::Xid,
    ev: &MouseEvent,
) -> Result<()> {
    match ev.kind {
        MouseEventKind::Press => {
            state.harbour_drag = Some((id, ev.ex, ev.ey));
        }
        MouseEventKind::Motion => {
            if let Some((dragged, dx, dy)) = state.harbour_drag {
                if dragged == id {
                    let head = state.harbour_head();
                    state.harbour.drag_to(id, ev.rx - dx, ev.ry - dy, head);

                    if let Some(da) = state.harbour.find_dock_app(id) {
                        x.set_client_config(
                            da.frame,
                            &[ClientConfig::Position(da.geometry)],
                        )?;
                    }
                }
            }
        }
        MouseEventKind::Release | MouseEventKind::DoubleClick => {
            state.harbour_drag = None;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{
            bindings::{MouseBinding, MouseButton, MouseState},
            Config,
        },
        x::StubXConn,
        Xid,
    };

    struct Conn;
    impl StubXConn for Conn {}

    fn press(id: u32, time: u32) -> MouseEvent {
        MouseEvent {
            id: Xid(id),
            rx: 0,
            ry: 0,
            ex: 0,
            ey: 0,
            mask: 0,
            button: Some(MouseButton::Left),
            kind: MouseEventKind::Press,
            time,
        }
    }

    fn release(id: u32, time: u32) -> MouseEvent {
        MouseEvent {
            kind: MouseEventKind::Release,
            ..press(id, time)
        }
    }

    fn state_with_root_binding(kind: MouseEventKind, action: Action) -> State {
        let mut config = Config::default();
        config.bindings.mouse.insert(
            BindingScope::Root,
            vec![MouseBinding {
                state: MouseState::new(MouseButton::Left, &[]),
                kind,
                action,
            }],
        );

        State::try_new(config, &Conn).unwrap()
    }

    #[test]
    fn double_click_on_root_fires_double_binding() {
        let mut state =
            state_with_root_binding(MouseEventKind::DoubleClick, Action::GotoWorkspace(
                crate::core::actions::WorkspaceTarget::Next,
            ));
        let root = state.root;

        handle_mouse_event(&mut state, &Conn, release(*root, 1000)).unwrap();
        assert_eq!(state.workspaces.active(), 0);

        handle_mouse_event(&mut state, &Conn, release(*root, 1100)).unwrap();
        assert_eq!(state.workspaces.active(), 1);
    }

    #[test]
    fn events_for_stale_windows_are_dropped() {
        let mut state = state_with_root_binding(MouseEventKind::Press, Action::Exit);

        handle_mouse_event(&mut state, &Conn, press(999, 0)).unwrap();

        assert!(state.running);
    }

    #[test]
    fn unbound_events_are_ignored() {
        let mut state = state_with_root_binding(MouseEventKind::DoubleClick, Action::Exit);
        let root = state.root;

        handle_mouse_event(&mut state, &Conn, press(*root, 0)).unwrap();

        assert!(state.running);
    }
}
