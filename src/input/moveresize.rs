//! Interactive pointer and keyboard move / resize loops.
//!
//! These are the only places outside of the outer poll where the window
//! manager blocks on X events: a grab is taken, motion is consumed until a
//! terminating event, then the grab is released on every exit path.
use crate::{
    core::{bindings::MouseEvent, manage, State},
    decor::BorderPosition,
    frame::FrameId,
    input::snap::{snap, SnapConfig},
    pure::geometry::Rect,
    x::{XConn, XEvent},
    Error, Result,
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// How an interactive loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveResizeOutcome {
    /// The user released the button / pressed the end key: keep the final
    /// geometry
    Committed,
    /// The user cancelled: the pre-grab geometry was restored
    Cancelled,
    /// The grabbed object went away or the grab was torn down externally;
    /// the last in-progress geometry stays
    Aborted,
}

/// The keyboard vocabulary of the move / resize loop.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveResizeAction {
    /// Move by `n` pixels horizontally
    MoveHorizontal(i32),
    /// Move by `n` pixels vertically
    MoveVertical(i32),
    /// Grow (or shrink) by `n` pixels horizontally
    ResizeHorizontal(i32),
    /// Grow (or shrink) by `n` pixels vertically
    ResizeVertical(i32),
    /// Run the snap pass against the current head
    MoveSnap,
    /// Restore the pre-grab geometry and stop
    Cancel,
    /// Keep the current geometry and stop
    End,
}

// frames other than `fid` considered by the WO snap pass
fn snap_others(state: &State, fid: FrameId) -> Vec<Rect> {
    state
        .frames
        .values()
        .filter(|f| f.id != fid && f.mapped)
        .filter(|f| {
            state
                .active_client_of(f.id)
                .map(|c| !c.state.skip.contains(crate::client::SkipFlags::SNAP))
                .unwrap_or(true)
        })
        .map(|f| f.geometry)
        .collect()
}

fn apply_geometry<X: XConn>(
    state: &mut State,
    x: &X,
    fid: FrameId,
    r: Rect,
    opaque: bool,
) -> Result<()> {
    if opaque {
        manage::set_frame_geometry(state, x, fid, r)?;
    } else {
        x.draw_outline(r)?;
    }

    Ok(())
}

// drain queued motion events, keeping only the latest for this window; a
// non-matching event ends the run and is handed back for normal handling
fn coalesce_motion<X: XConn>(
    x: &X,
    first: MouseEvent,
) -> Result<(MouseEvent, Option<XEvent>)> {
    use crate::core::bindings::MouseEventKind;

    let mut latest = first;
    while let Some(event) = x.poll_event()? {
        match event {
            XEvent::MouseEvent(ev)
                if ev.kind == MouseEventKind::Motion && ev.id == latest.id =>
            {
                latest = ev;
            }
            other => return Ok((latest, Some(other))),
        }
    }

    Ok((latest, None))
}

/// Interactive pointer move of a frame.
///
/// Grabs the pointer (and, for outline moves, the server); after every
/// motion the edge snap and frame snap passes run against the nearest head.
/// Release commits, a key press cancels and restores, destruction of the
/// grabbed frame aborts keeping the in-progress geometry.
pub fn pointer_move<X: XConn>(
    state: &mut State,
    x: &X,
    fid: FrameId,
    ev: &MouseEvent,
) -> Result<MoveResizeOutcome> {
    use crate::core::bindings::MouseEventKind;

    let start = state.frame(fid)?.geometry;
    let frame_window = state.frame(fid)?.window;
    let grab_dx = ev.rx - start.x;
    let grab_dy = ev.ry - start.y;
    let button = ev.button;
    let opaque = state.config.opaque_move;
    let snap_cfg: SnapConfig = state.config.snap;

    if let Err(e) = x.grab_pointer(state.root) {
        debug!(%e, "pointer grab denied: aborting move");
        return Ok(MoveResizeOutcome::Aborted);
    }
    if !opaque {
        x.grab_server();
        x.draw_outline(start)?;
    }

    let mut current = start;
    let mut pending: Option<XEvent> = None;
    let outcome = loop {
        let event = match pending.take() {
            Some(event) => event,
            None => match x.next_event() {
                Ok(event) => event,
                Err(e) => {
                    debug!(%e, "connection error during move grab");
                    break MoveResizeOutcome::Aborted;
                }
            },
        };

        match event {
            XEvent::MouseEvent(ev) if ev.kind == MouseEventKind::Motion => {
                let (ev, next) = coalesce_motion(x, ev)?;
                pending = next;
                if !opaque {
                    x.clear_outline()?;
                }

                let proposed = current.at(ev.rx - grab_dx, ev.ry - grab_dy);
                let others = snap_others(state, fid);
                let head = state.usable_head_for(&proposed);
                current = snap(proposed, &others, head, snap_cfg);

                apply_geometry(state, x, fid, current, opaque)?;
            }
            XEvent::MouseEvent(ev)
                if ev.kind == MouseEventKind::Release && ev.button == button =>
            {
                break MoveResizeOutcome::Committed;
            }
            XEvent::KeyPress(_, _) => {
                current = start;
                break MoveResizeOutcome::Cancelled;
            }
            XEvent::Destroy(id) if id == frame_window || state.frame_of(id).map(|f| f.id) == Some(fid) => {
                debug!(%id, "grabbed object destroyed during move");
                break MoveResizeOutcome::Aborted;
            }
            _ => (),
        }
    };

    if !opaque {
        x.clear_outline()?;
        x.ungrab_server();
    }
    x.ungrab_pointer();

    match outcome {
        MoveResizeOutcome::Aborted => (),
        _ => {
            if state.frames.contains_key(&fid) {
                manage::set_frame_geometry(state, x, fid, current)?;
            }
        }
    }

    Ok(outcome)
}

/// Interactive pointer resize of a frame from the given border position.
pub fn pointer_resize<X: XConn>(
    state: &mut State,
    x: &X,
    fid: FrameId,
    from: BorderPosition,
    ev: &MouseEvent,
) -> Result<MoveResizeOutcome> {
    use crate::core::bindings::MouseEventKind;

    let start = state.frame(fid)?.geometry;
    let frame_window = state.frame(fid)?.window;
    let (start_rx, start_ry) = (ev.rx, ev.ry);
    let button = ev.button;
    let opaque = state.config.opaque_resize;

    let (left, right, top, bottom) = resize_sides(from);

    if let Err(e) = x.grab_pointer(state.root) {
        debug!(%e, "pointer grab denied: aborting resize");
        return Ok(MoveResizeOutcome::Aborted);
    }
    if !opaque {
        x.grab_server();
        x.draw_outline(start)?;
    }

    let mut current = start;
    let mut pending: Option<XEvent> = None;
    let outcome = loop {
        let event = match pending.take() {
            Some(event) => event,
            None => match x.next_event() {
                Ok(event) => event,
                Err(e) => {
                    debug!(%e, "connection error during resize grab");
                    break MoveResizeOutcome::Aborted;
                }
            },
        };

        match event {
            XEvent::MouseEvent(ev) if ev.kind == MouseEventKind::Motion => {
                let (ev, next) = coalesce_motion(x, ev)?;
                pending = next;
                if !opaque {
                    x.clear_outline()?;
                }

                let (dx, dy) = (ev.rx - start_rx, ev.ry - start_ry);
                current = resized(start, dx, dy, left, right, top, bottom);

                apply_geometry(state, x, fid, current, opaque)?;
            }
            XEvent::MouseEvent(ev)
                if ev.kind == MouseEventKind::Release && ev.button == button =>
            {
                break MoveResizeOutcome::Committed;
            }
            XEvent::KeyPress(_, _) => {
                current = start;
                break MoveResizeOutcome::Cancelled;
            }
            XEvent::Destroy(id) if id == frame_window || state.frame_of(id).map(|f| f.id) == Some(fid) => {
                debug!(%id, "grabbed object destroyed during resize");
                break MoveResizeOutcome::Aborted;
            }
            _ => (),
        }
    };

    if !opaque {
        x.clear_outline()?;
        x.ungrab_server();
    }
    x.ungrab_pointer();

    match outcome {
        MoveResizeOutcome::Aborted => (),
        _ => {
            if state.frames.contains_key(&fid) {
                manage::set_frame_geometry(state, x, fid, current)?;
            }
        }
    }

    Ok(outcome)
}

// which sides of the frame a border position resizes
fn resize_sides(from: BorderPosition) -> (bool, bool, bool, bool) {
    use BorderPosition::*;

    match from {
        TopLeft => (true, false, true, false),
        Top => (false, false, true, false),
        TopRight => (false, true, true, false),
        Left => (true, false, false, false),
        Right => (false, true, false, false),
        BottomLeft => (true, false, false, true),
        Bottom => (false, false, false, true),
        BottomRight => (false, true, false, true),
    }
}

const MIN_FRAME_SIZE: u32 = 16;

fn resized(start: Rect, dx: i32, dy: i32, left: bool, right: bool, top: bool, bottom: bool) -> Rect {
    let mut r = start;

    if right {
        r.w = (start.w as i32 + dx).max(MIN_FRAME_SIZE as i32) as u32;
    } else if left {
        let w = (start.w as i32 - dx).max(MIN_FRAME_SIZE as i32);
        r.x = start.x + (start.w as i32 - w);
        r.w = w as u32;
    }

    if bottom {
        r.h = (start.h as i32 + dy).max(MIN_FRAME_SIZE as i32) as u32;
    } else if top {
        let h = (start.h as i32 - dy).max(MIN_FRAME_SIZE as i32);
        r.y = start.y + (start.h as i32 - h);
        r.h = h as u32;
    }

    r
}

/// The keyboard driven move / resize loop.
///
/// Grabs the keyboard and consumes key presses mapped through the
/// configured move / resize key table until an end or cancel action.
pub fn keyboard_move_resize<X: XConn>(state: &mut State, x: &X, fid: FrameId) -> Result<()> {
    let start = state.frame(fid)?.geometry;
    let frame_window = state.frame(fid)?.window;
    let snap_cfg = state.config.snap;

    if let Err(e) = x.grab_keyboard(state.root) {
        debug!(%e, "keyboard grab denied: aborting keyboard move");
        return match e {
            Error::GrabDenied(_) => Ok(()),
            e => Err(e),
        };
    }

    let mut current = start;
    let mut cancelled = false;

    loop {
        let event = match x.next_event() {
            Ok(event) => event,
            Err(_) => break,
        };

        let action = match &event {
            XEvent::KeyPress(code, _) => {
                let code = code.normalized();
                state
                    .config
                    .moveresize_keys
                    .iter()
                    .find(|(k, _)| *k == code)
                    .map(|(_, a)| *a)
            }
            XEvent::Destroy(id)
                if *id == frame_window
                    || state.frame_of(*id).map(|f| f.id) == Some(fid) =>
            {
                // destruction commits the in-progress geometry
                x.ungrab_keyboard();
                return Ok(());
            }
            _ => None,
        };

        let action = match action {
            Some(a) => a,
            None => continue,
        };
        trace!(?action, "keyboard move/resize step");

        match action {
            MoveResizeAction::MoveHorizontal(n) => current.x += n,
            MoveResizeAction::MoveVertical(n) => current.y += n,
            MoveResizeAction::ResizeHorizontal(n) => {
                current.w = (current.w as i32 + n).max(MIN_FRAME_SIZE as i32) as u32
            }
            MoveResizeAction::ResizeVertical(n) => {
                current.h = (current.h as i32 + n).max(MIN_FRAME_SIZE as i32) as u32
            }
            MoveResizeAction::MoveSnap => {
                let others = snap_others(state, fid);
                let head = state.usable_head_for(&current);
                current = snap(current, &others, head, snap_cfg);
            }
            MoveResizeAction::Cancel => {
                current = start;
                cancelled = true;
            }
            MoveResizeAction::End => (),
        }

        manage::set_frame_geometry(state, x, fid, current)?;

        if cancelled || action == MoveResizeAction::End {
            break;
        }
    }

    x.ungrab_keyboard();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    #[test_case(BorderPosition::BottomRight, 50, 30, Rect::new(0, 0, 150, 130); "grow bottom right")]
    #[test_case(BorderPosition::TopLeft, 20, 10, Rect::new(20, 10, 80, 90); "shrink top left")]
    #[test_case(BorderPosition::Right, 50, 99, Rect::new(0, 0, 150, 100); "right only")]
    #[test_case(BorderPosition::Top, 99, -25, Rect::new(0, -25, 100, 125); "grow upward")]
    #[test]
    fn resize_from_border(from: BorderPosition, dx: i32, dy: i32, expected: Rect) {
        let start = Rect::new(0, 0, 100, 100);
        let (l, r, t, b) = resize_sides(from);

        assert_eq!(resized(start, dx, dy, l, r, t, b), expected);
    }

    #[test]
    fn resize_clamps_to_minimum() {
        let start = Rect::new(0, 0, 100, 100);
        let (l, r, t, b) = resize_sides(BorderPosition::BottomRight);

        let shrunk = resized(start, -500, -500, l, r, t, b);
        assert_eq!((shrunk.w, shrunk.h), (MIN_FRAME_SIZE, MIN_FRAME_SIZE));
    }
}
