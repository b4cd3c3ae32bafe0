//! Conversions between x11rb protocol types and quay data types
use crate::{
    core::bindings::{KeyCode, MouseButton, MouseEvent, MouseEventKind},
    pure::geometry::{Point, Rect},
    x::event::{ConfigureEvent, ConfigureRequestEvent, PointerChange},
    Xid,
};
use x11rb::protocol::xproto::{
    ButtonPressEvent, ConfigureNotifyEvent, ConfigureRequestEvent as XConfigureRequestEvent,
    ConfigWindow, EnterNotifyEvent, KeyButMask, MotionNotifyEvent,
};

pub(crate) fn to_keycode(detail: u8, state: KeyButMask) -> KeyCode {
    KeyCode {
        mask: u16::from(state),
        code: detail,
    }
}

// motion events carry no button detail: recover the held button from the
// state mask before it is stripped for binding lookup
pub(crate) fn held_button(state: KeyButMask) -> Option<MouseButton> {
    let state = u16::from(state);

    if state & (1 << 8) != 0 {
        Some(MouseButton::Left)
    } else if state & (1 << 9) != 0 {
        Some(MouseButton::Middle)
    } else if state & (1 << 10) != 0 {
        Some(MouseButton::Right)
    } else if state & (1 << 11) != 0 {
        Some(MouseButton::ScrollUp)
    } else if state & (1 << 12) != 0 {
        Some(MouseButton::ScrollDown)
    } else {
        None
    }
}

pub(crate) fn to_button_event(ev: &ButtonPressEvent, kind: MouseEventKind) -> MouseEvent {
    MouseEvent {
        id: Xid(ev.event),
        rx: ev.root_x as i32,
        ry: ev.root_y as i32,
        ex: ev.event_x as i32,
        ey: ev.event_y as i32,
        mask: u16::from(ev.state),
        button: MouseButton::from_detail(ev.detail),
        kind,
        time: ev.time,
    }
}

pub(crate) fn to_motion_event(ev: &MotionNotifyEvent) -> MouseEvent {
    MouseEvent {
        id: Xid(ev.event),
        rx: ev.root_x as i32,
        ry: ev.root_y as i32,
        ex: ev.event_x as i32,
        ey: ev.event_y as i32,
        mask: u16::from(ev.state),
        button: held_button(ev.state),
        kind: MouseEventKind::Motion,
        time: ev.time,
    }
}

pub(crate) fn to_pointer_change(ev: &EnterNotifyEvent) -> PointerChange {
    PointerChange {
        id: Xid(ev.event),
        abs: Point::new(ev.root_x as i32, ev.root_y as i32),
        relative: Point::new(ev.event_x as i32, ev.event_y as i32),
    }
}

pub(crate) fn to_configure_notify(ev: &ConfigureNotifyEvent, root: u32) -> ConfigureEvent {
    ConfigureEvent {
        id: Xid(ev.window),
        r: Rect::new(
            ev.x as i32,
            ev.y as i32,
            ev.width as u32,
            ev.height as u32,
        ),
        is_root: ev.window == root,
    }
}

pub(crate) fn to_configure_request(ev: &XConfigureRequestEvent) -> ConfigureRequestEvent {
    let has = |m: ConfigWindow| u16::from(ev.value_mask) & u16::from(m) != 0;

    ConfigureRequestEvent {
        id: Xid(ev.window),
        x: has(ConfigWindow::X).then_some(ev.x as i32),
        y: has(ConfigWindow::Y).then_some(ev.y as i32),
        w: has(ConfigWindow::WIDTH).then_some(ev.width as u32),
        h: has(ConfigWindow::HEIGHT).then_some(ev.height as u32),
    }
}
