//! The action vocabulary and its executor.
//!
//! Bindings, screen edges, the control channel and scheduled timeouts all
//! produce [Action] records; this module mutates the model accordingly.
use crate::{
    client::{StateFlags, WmActions},
    core::{manage, State, WinObj},
    frame::FrameId,
    pure::{geometry::Rect, Layer},
    util,
    x::{WinType, XConn, XConnExt},
    Result,
};
use tracing::{debug, trace, warn};

/// Workspace selection for workspace directed actions.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceTarget {
    /// A workspace by index
    Index(usize),
    /// The workspace to the right, wrapping
    Next,
    /// The workspace to the left, wrapping
    Prev,
}

/// An executable window manager action.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Focus the target frame
    Focus,
    /// Raise the target frame within its layer
    Raise,
    /// Lower the target frame within its layer
    Lower,
    /// Ask the target client to close
    Close,
    /// Kill the target client outright
    Kill,
    /// Switch workspace
    GotoWorkspace(WorkspaceTarget),
    /// Send the target frame to a workspace
    SendToWorkspace(WorkspaceTarget),
    /// Resize the workspace set
    SetWorkspaceCount(i32),
    /// Start an interactive pointer move (dispatched with event context)
    MoveInteractive,
    /// Start an interactive pointer resize (dispatched with event context)
    ResizeInteractive,
    /// Start the keyboard move / resize loop
    KeyboardMoveResize,
    /// Toggle visible-on-all-workspaces
    ToggleSticky,
    /// Toggle rolled-up-to-titlebar
    ToggleShaded,
    /// Iconify the target frame
    Iconify,
    /// Toggle maximization
    ToggleMaximized {
        /// Maximize horizontally
        horz: bool,
        /// Maximize vertically
        vert: bool,
    },
    /// Toggle fullscreen
    ToggleFullscreen,
    /// Move the target to a specific layer
    SetLayer(Layer),
    /// Activate the tab `n` steps to the right (negative = left)
    CycleTab(i32),
    /// Activate the tab at an index
    ActivateTab(usize),
    /// Detach the active tab into its own frame
    Detach,
    /// Split the frame, migrating inactive tabs to the top part
    DetachSplitHorz(f64),
    /// Split the frame, migrating inactive tabs to the left part
    DetachSplitVert(f64),
    /// Toggle the frame border
    ToggleBorder,
    /// Toggle the frame titlebar
    ToggleTitlebar,
    /// Switch the frame to a named decor profile
    SetDecor(String),
    /// Hide or unhide the harbour
    ToggleHarbourHidden,
    /// Run an external command
    Exec(String),
    /// Re-fire RELOAD phase auto properties after a config swap
    Reload,
    /// Exit, restarting the process
    Restart,
    /// Exit the window manager
    Exit,
    /// Show the transient workspace indicator
    ShowWorkspaceIndicator,
    /// Hide the transient workspace indicator
    HideWorkspaceIndicator,
}

impl Action {
    /// Parse a control channel command string into an action.
    ///
    /// Command names are case insensitive; workspace indices are 0-based;
    /// surplus tokens are ignored so senders may pad. `Exec` consumes the
    /// whole remainder of the line.
    pub fn from_command(s: &str) -> Option<Action> {
        let mut tokens = s.split_whitespace();
        let head = tokens.next()?.to_ascii_lowercase();

        let index_arg = |tokens: &mut dyn Iterator<Item = &str>| -> Option<WorkspaceTarget> {
            match tokens.next()? {
                "next" | "Next" => Some(WorkspaceTarget::Next),
                "prev" | "Prev" => Some(WorkspaceTarget::Prev),
                n => n.parse().ok().map(WorkspaceTarget::Index),
            }
        };

        let action = match head.as_str() {
            "exit" => Action::Exit,
            "restart" => Action::Restart,
            "reload" => Action::Reload,
            "close" => Action::Close,
            "kill" => Action::Kill,
            "focus" => Action::Focus,
            "raise" => Action::Raise,
            "lower" => Action::Lower,
            "stick" | "togglesticky" => Action::ToggleSticky,
            "shade" | "toggleshaded" => Action::ToggleShaded,
            "iconify" => Action::Iconify,
            "fullscreen" | "togglefullscreen" => Action::ToggleFullscreen,
            "maximize" | "togglemaximized" => Action::ToggleMaximized {
                horz: true,
                vert: true,
            },
            "detach" => Action::Detach,
            "detachsplithorz" => {
                Action::DetachSplitHorz(tokens.next()?.parse().ok()?)
            }
            "detachsplitvert" => {
                Action::DetachSplitVert(tokens.next()?.parse().ok()?)
            }
            "gotoworkspace" => Action::GotoWorkspace(index_arg(&mut tokens)?),
            "sendtoworkspace" => Action::SendToWorkspace(index_arg(&mut tokens)?),
            "setworkspacecount" => Action::SetWorkspaceCount(tokens.next()?.parse().ok()?),
            "toggleharbourhidden" => Action::ToggleHarbourHidden,
            "exec" => {
                let rest: Vec<&str> = tokens.collect();
                if rest.is_empty() {
                    return None;
                }
                Action::Exec(rest.join(" "))
            }
            _ => return None,
        };

        Some(action)
    }
}

/// Resolve the frame an action should operate on.
fn target_frame(state: &State, target: Option<WinObj>) -> Option<FrameId> {
    match target {
        Some(WinObj::Frame(fid)) => state.frames.contains_key(&fid).then_some(fid),
        Some(WinObj::Client(id)) => state.frame_of(id).map(|f| f.id),
        _ => state.focused,
    }
}

/// Execute one action against the model.
pub fn handle_action<X: XConn>(
    action: &Action,
    target: Option<WinObj>,
    state: &mut State,
    x: &X,
) -> Result<()> {
    trace!(?action, ?target, "running action");
    let frame = target_frame(state, target);

    match action {
        Action::Focus => {
            if frame.is_some() {
                state.focus_frame(x, frame)?;
            }
        }
        Action::Raise => {
            if let Some(fid) = frame {
                state.raise_frame(x, fid)?;
            }
        }
        Action::Lower => {
            if let Some(fid) = frame {
                state.lower_frame(x, fid)?;
            }
        }
        Action::Close => {
            if let Some(c) = frame.and_then(|f| state.frame(f).ok()).and_then(|f| f.active_client())
            {
                if state.client(c)?.allows(WmActions::CLOSE) {
                    x.close_client(c)?;
                }
            }
        }
        Action::Kill => {
            if let Some(c) = frame.and_then(|f| state.frame(f).ok()).and_then(|f| f.active_client())
            {
                x.kill(c)?;
            }
        }
        Action::GotoWorkspace(t) => {
            let n = resolve_workspace(state, *t);
            let warp = state.config.warp_pointer_on_goto;
            if state.goto_workspace(x, n, warp, true)? && state.config.show_workspace_indicator {
                show_workspace_indicator(state, x)?;
            }
        }
        Action::SendToWorkspace(t) => {
            if let Some(fid) = frame {
                let n = resolve_workspace(state, *t);
                state.move_frame_to_workspace(x, fid, n)?;
            }
        }
        Action::SetWorkspaceCount(n) => {
            state.set_workspace_count(x, *n)?;
        }
        Action::MoveInteractive | Action::ResizeInteractive => {
            // needs the initiating pointer event; routed by the dispatcher
            warn!(?action, "interactive action fired without pointer context");
        }
        Action::KeyboardMoveResize => {
            if let Some(fid) = frame {
                crate::input::moveresize::keyboard_move_resize(state, x, fid)?;
            }
        }
        Action::ToggleSticky => {
            if let Some(fid) = frame {
                toggle_sticky(state, x, fid)?;
            }
        }
        Action::ToggleShaded => {
            if let Some(fid) = frame {
                toggle_shaded(state, x, fid)?;
            }
        }
        Action::Iconify => {
            if let Some(fid) = frame {
                iconify(state, x, fid)?;
            }
        }
        Action::ToggleMaximized { horz, vert } => {
            if let Some(fid) = frame {
                toggle_maximized(state, x, fid, *horz, *vert)?;
            }
        }
        Action::ToggleFullscreen => {
            if let Some(fid) = frame {
                toggle_fullscreen(state, x, fid)?;
            }
        }
        Action::SetLayer(layer) => {
            if let Some(fid) = frame {
                set_layer(state, x, fid, *layer)?;
            }
        }
        Action::CycleTab(n) => {
            if let Some(fid) = frame {
                state.frame_mut(fid)?.cycle_active(*n);
                activate_current_tab(state, x, fid)?;
            }
        }
        Action::ActivateTab(i) => {
            if let Some(fid) = frame {
                let clients = state.frame(fid)?.clients().to_vec();
                if let Some(&c) = clients.get(*i) {
                    state.frame_mut(fid)?.activate_client(c);
                    activate_current_tab(state, x, fid)?;
                }
            }
        }
        Action::Detach => {
            if let Some(fid) = frame {
                detach_active(state, x, fid)?;
            }
        }
        Action::DetachSplitHorz(ratio) => {
            if let Some(fid) = frame {
                manage::detach_split(state, x, fid, *ratio, true)?;
            }
        }
        Action::DetachSplitVert(ratio) => {
            if let Some(fid) = frame {
                manage::detach_split(state, x, fid, *ratio, false)?;
            }
        }
        Action::ToggleBorder => {
            if let Some(fid) = frame {
                let f = state.frame_mut(fid)?;
                f.border_disabled = !f.border_disabled;
                let r = f.geometry;
                manage::rederive_frame(state, x, fid)?;
                manage::set_frame_geometry(state, x, fid, r)?;
            }
        }
        Action::ToggleTitlebar => {
            if let Some(fid) = frame {
                let f = state.frame_mut(fid)?;
                f.titlebar_disabled = !f.titlebar_disabled;
                let r = f.geometry;
                manage::rederive_frame(state, x, fid)?;
                manage::set_frame_geometry(state, x, fid, r)?;
            }
        }
        Action::SetDecor(name) => {
            if let Some(fid) = frame {
                state.frame_mut(fid)?.decor_name = name.clone();
                manage::rederive_frame(state, x, fid)?;
            }
        }
        Action::ToggleHarbourHidden => {
            let hidden = state.harbour.is_hidden();
            if state.harbour.set_hidden(!hidden) {
                for da in state.harbour.dock_apps() {
                    if hidden {
                        x.map(da.frame)?;
                    } else {
                        x.unmap(da.frame)?;
                    }
                }
                state.sync_harbour_strut();
            }
        }
        Action::Exec(cmd) => {
            if let Err(e) = util::spawn(cmd.clone()) {
                warn!(%cmd, %e, "unable to spawn command");
            }
        }
        Action::Reload => {
            apply_reload(state, x)?;
        }
        Action::Restart => {
            state.restart = true;
            state.running = false;
        }
        Action::Exit => {
            state.running = false;
        }
        Action::ShowWorkspaceIndicator => {
            show_workspace_indicator(state, x)?;
        }
        Action::HideWorkspaceIndicator => {
            if let Some(win) = state.indicator.take() {
                state.win_map.remove(&win);
                state.stacking.remove(win);
                let _ = x.destroy_window(win);
            }
        }
    }

    Ok(())
}

fn resolve_workspace(state: &State, t: WorkspaceTarget) -> usize {
    let len = state.workspaces.len();
    let active = state.workspaces.active();

    match t {
        WorkspaceTarget::Index(n) => n,
        WorkspaceTarget::Next => (active + 1) % len,
        WorkspaceTarget::Prev => (active + len - 1) % len,
    }
}

fn activate_current_tab<X: XConn>(state: &mut State, x: &X, fid: FrameId) -> Result<()> {
    manage::rederive_frame(state, x, fid)?;

    if let Some(c) = state.frame(fid)?.active_client() {
        // raise the new active window inside the frame hierarchy
        let r = state.frame(fid)?.client_geometry();
        x.position_window(c, r)?;
        if state.focused == Some(fid) {
            x.focus(c)?;
        }
    }

    Ok(())
}

fn detach_active<X: XConn>(state: &mut State, x: &X, fid: FrameId) -> Result<()> {
    let (active, n, geometry, decor_name) = {
        let f = state.frame(fid)?;
        (
            f.active_client(),
            f.len(),
            f.geometry,
            f.decor_name.clone(),
        )
    };
    let active = match active {
        Some(c) if n > 1 => c,
        _ => return Ok(()), // nothing to detach from
    };

    state.frame_mut(fid)?.remove_client(active);
    manage::rederive_frame(state, x, fid)?;

    {
        let client = state.client_mut(active)?;
        client.frame = None;
        client.geometry = geometry;
    }
    let new_fid = manage::create_frame(state, x, active, &decor_name, true, true)?;
    manage::set_frame_geometry(
        state,
        x,
        new_fid,
        Rect::new(geometry.x + 20, geometry.y + 20, geometry.w, geometry.h),
    )?;
    state.show_frame(x, new_fid)?;
    state.raise_frame(x, new_fid)?;
    state.focus_frame(x, Some(new_fid))?;

    Ok(())
}

fn toggle_sticky<X: XConn>(state: &mut State, x: &X, fid: FrameId) -> Result<()> {
    let clients = state.frame(fid)?.clients().to_vec();
    let sticky = !state.frame(fid)?.sticky;

    for c in &clients {
        let client = state.client_mut(*c)?;
        client.state.flags.set(StateFlags::STICKY, sticky);
    }
    state.frame_mut(fid)?.sticky = sticky;

    for c in clients {
        state.publish_client_state(x, c)?;
    }

    Ok(())
}

fn toggle_shaded<X: XConn>(state: &mut State, x: &X, fid: FrameId) -> Result<()> {
    let shaded = !state.frame(fid)?.shaded;

    {
        let frame = state.frame_mut(fid)?;
        frame.shaded = shaded;
        if shaded {
            frame.saved_geometry = Some(frame.geometry);
        }
    }

    if let Some(c) = state.frame(fid)?.active_client() {
        state
            .client_mut(c)?
            .state
            .flags
            .set(StateFlags::SHADED, shaded);
        state.publish_client_state(x, c)?;
    }

    let r = if shaded {
        let f = state.frame(fid)?;
        let title = f.layout.border.top + f.layout.title_height + f.layout.border.bottom;
        f.geometry.sized(f.geometry.w, title.max(1))
    } else {
        state
            .frame_mut(fid)?
            .saved_geometry
            .take()
            .unwrap_or(state.frame(fid)?.geometry)
    };
    manage::set_frame_geometry(state, x, fid, r)?;

    Ok(())
}

fn iconify<X: XConn>(state: &mut State, x: &X, fid: FrameId) -> Result<()> {
    let clients = state.frame(fid)?.clients().to_vec();
    for c in clients {
        let client = state.client_mut(c)?;
        client.state.flags.insert(StateFlags::ICONIFIED);
        state.publish_client_state(x, c)?;
    }

    state.hide_frame(x, fid)?;

    if state.focused == Some(fid) {
        state.focused = None;
        let next = state.find_focus_candidate(true);
        state.focus_frame(x, next)?;
    }

    Ok(())
}

fn toggle_maximized<X: XConn>(
    state: &mut State,
    x: &X,
    fid: FrameId,
    horz: bool,
    vert: bool,
) -> Result<()> {
    let active = match state.frame(fid)?.active_client() {
        Some(c) => c,
        None => return Ok(()),
    };

    let currently = {
        let c = state.client(active)?;
        (horz && c.state.flags.contains(StateFlags::MAXIMIZED_HORZ))
            || (vert && c.state.flags.contains(StateFlags::MAXIMIZED_VERT))
    };

    let r = if currently {
        let saved = state.frame_mut(fid)?.saved_geometry.take();
        {
            let c = state.client_mut(active)?;
            if horz {
                c.state.flags.remove(StateFlags::MAXIMIZED_HORZ);
            }
            if vert {
                c.state.flags.remove(StateFlags::MAXIMIZED_VERT);
            }
        }
        saved.unwrap_or(state.frame(fid)?.geometry)
    } else {
        let current = state.frame(fid)?.geometry;
        state.frame_mut(fid)?.saved_geometry = Some(current);
        {
            let c = state.client_mut(active)?;
            if horz {
                c.state.flags.insert(StateFlags::MAXIMIZED_HORZ);
            }
            if vert {
                c.state.flags.insert(StateFlags::MAXIMIZED_VERT);
            }
        }

        let usable = state.usable_head_for(&current);
        let mut r = current;
        if horz {
            r.x = usable.x;
            r.w = usable.w;
        }
        if vert {
            r.y = usable.y;
            r.h = usable.h;
        }
        r
    };

    manage::set_frame_geometry(state, x, fid, r)?;
    state.publish_client_state(x, active)?;

    Ok(())
}

fn toggle_fullscreen<X: XConn>(state: &mut State, x: &X, fid: FrameId) -> Result<()> {
    let active = match state.frame(fid)?.active_client() {
        Some(c) => c,
        None => return Ok(()),
    };

    let entering = !state
        .client(active)?
        .state
        .flags
        .contains(StateFlags::FULLSCREEN);

    let r = if entering {
        let current = state.frame(fid)?.geometry;
        state.frame_mut(fid)?.saved_geometry = Some(current);
        state
            .client_mut(active)?
            .state
            .flags
            .insert(StateFlags::FULLSCREEN);

        let head = state.head_at(current.midpoint());
        state.heads.get(head).map(|h| h.r).unwrap_or(current)
    } else {
        state
            .client_mut(active)?
            .state
            .flags
            .remove(StateFlags::FULLSCREEN);
        let fallback = state.frame(fid)?.geometry;
        state.frame_mut(fid)?.saved_geometry.take().unwrap_or(fallback)
    };

    // fullscreen windows drop their decorations and move layers
    let layer = if entering {
        Layer::Fullscreen
    } else {
        Layer::Normal
    };
    set_layer(state, x, fid, layer)?;
    manage::rederive_frame(state, x, fid)?;
    manage::set_frame_geometry(state, x, fid, r)?;
    state.publish_client_state(x, active)?;

    Ok(())
}

fn set_layer<X: XConn>(state: &mut State, x: &X, fid: FrameId, layer: Layer) -> Result<()> {
    let (window, clients) = {
        let f = state.frame(fid)?;
        (f.window, f.clients().to_vec())
    };

    for c in clients {
        state.client_mut(c)?.state.layer = layer;
    }
    state.frame_mut(fid)?.layer = layer;
    state.stacking.set_layer(window, layer);
    state.restack(x)?;

    Ok(())
}

/// Re-fire RELOAD phase auto properties for every client after the rule set
/// was swapped, and re-derive every frame against the (possibly reloaded)
/// decor profiles.
pub fn apply_reload<X: XConn>(state: &mut State, x: &X) -> Result<()> {
    debug!("applying reload to all clients");
    state.observers.notify(&crate::core::observer::Observation::GrabAbort);

    let ids: Vec<crate::Xid> = state.clients.keys().copied().collect();
    for id in ids {
        let (hint, ws) = {
            let c = state.client(id)?;
            (c.hint.clone(), c.state.workspace)
        };

        if let Some(prop) = state
            .autoprops
            .find_auto_property(&hint, Some(ws), crate::autoprops::ApplyOn::RELOAD)
            .cloned()
        {
            let mut client = state.client_mut(id)?.clone();
            manage::apply_auto_property(&mut client, &prop);
            *state.client_mut(id)? = client;
            state.publish_client_state(x, id)?;
        }

        let rewritten = state
            .autoprops
            .find_title_property(&hint)
            .and_then(|rule| rule.rule.rewrite(&hint.title));
        if rewritten.is_some() {
            state.client_mut(id)?.title_override = rewritten;
        }
    }

    let fids: Vec<FrameId> = state.frames.keys().copied().collect();
    for fid in fids {
        manage::rederive_frame(state, x, fid)?;
    }

    state
        .observers
        .notify(&crate::core::observer::Observation::ThemeReloaded);

    Ok(())
}

fn show_workspace_indicator<X: XConn>(state: &mut State, x: &X) -> Result<()> {
    let head = state
        .heads
        .get(state.head_at((0, 0)))
        .map(|h| h.r)
        .unwrap_or(Rect::new(0, 0, 1, 1));
    let size = Rect::new(0, 0, head.w / 8, head.h / 8).centered_in(&head);

    let win = match state.indicator {
        Some(win) => win,
        None => {
            let win = x.create_window(
                WinType::InputOutput(crate::x::Atom::NetWindowTypeNormal),
                size,
                false,
            )?;
            state.indicator = Some(win);
            state.win_map.insert(win, WinObj::Dialog(win));
            state.stacking.insert(win, Layer::OnTop);
            win
        }
    };

    x.set_client_config(win, &[crate::x::ClientConfig::Position(size)])?;
    x.map(win)?;
    state.restack(x)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::x::StubXConn;

    struct Conn;
    impl StubXConn for Conn {}

    fn fixture() -> State {
        let mut state = State::try_new(Default::default(), &Conn).unwrap();
        state.workspaces.set_back_and_forth(true);
        state
    }

    #[test]
    fn goto_workspace_next_prev_wrap() {
        let state = fixture();

        assert_eq!(resolve_workspace(&state, WorkspaceTarget::Next), 1);
        assert_eq!(resolve_workspace(&state, WorkspaceTarget::Prev), 3);
        assert_eq!(resolve_workspace(&state, WorkspaceTarget::Index(2)), 2);
    }

    #[test]
    fn exit_action_stops_the_loop() {
        let mut state = fixture();
        assert!(state.running);

        handle_action(&Action::Exit, None, &mut state, &Conn).unwrap();

        assert!(!state.running);
        assert!(!state.restart);
    }

    #[test]
    fn restart_action_sets_both_flags() {
        let mut state = fixture();

        handle_action(&Action::Restart, None, &mut state, &Conn).unwrap();

        assert!(!state.running);
        assert!(state.restart);
    }

    #[test]
    fn command_parsing() {
        assert_eq!(Action::from_command("Exit"), Some(Action::Exit));
        assert_eq!(
            Action::from_command("GotoWorkspace 2"),
            Some(Action::GotoWorkspace(WorkspaceTarget::Index(2)))
        );
        assert_eq!(
            Action::from_command("gotoworkspace next"),
            Some(Action::GotoWorkspace(WorkspaceTarget::Next))
        );
        assert_eq!(
            Action::from_command("Exec xterm -e top"),
            Some(Action::Exec("xterm -e top".into()))
        );
        assert_eq!(
            Action::from_command("DetachSplitHorz 0.5"),
            Some(Action::DetachSplitHorz(0.5))
        );
        assert_eq!(Action::from_command("NoSuchThing"), None);
        assert_eq!(Action::from_command(""), None);
        assert_eq!(Action::from_command("Exec"), None);
    }

    #[test]
    fn actions_without_target_or_focus_are_noops() {
        let mut state = fixture();

        for action in [
            Action::Raise,
            Action::Lower,
            Action::Close,
            Action::ToggleSticky,
            Action::ToggleFullscreen,
            Action::CycleTab(1),
        ] {
            handle_action(&action, None, &mut state, &Conn).unwrap();
        }
    }
}
