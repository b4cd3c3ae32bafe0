//! Logic for interacting with the X server
use crate::{
    autoprops::ClassHint,
    core::bindings::{KeyCode, MouseState},
    pure::geometry::{Point, Rect},
    x::event::{ClientEventMask, ClientMessage},
    Result, Xid,
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::os::fd::RawFd;
use tracing::trace;

pub mod atom;
pub mod event;
pub mod mock;
pub mod property;

pub use atom::{Atom, EWMH_SUPPORTED_ATOMS, TYPED_WINDOW_TYPES};
pub use event::XEvent;
pub use mock::StubXConn;
pub use property::{Prop, WindowAttributes, WmHints, WmNormalHints, WmState};

/// A window type to be specified when creating a new window in the X server
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WinType {
    /// A simple hidden stub window for facilitating other API calls
    CheckWin,
    /// A window that receives input only (not queryable)
    InputOnly,
    /// A regular window. The [Atom] passed should be a
    /// valid _NET_WM_WINDOW_TYPE (this is not enforced)
    InputOutput(Atom),
}

/// On screen configuration options for X clients
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ClientConfig {
    /// The border width in pixels
    BorderPx(u32),
    /// Absolute size and position on the screen as a [Rect]
    Position(Rect),
    /// Mark this window as stacking directly above the given Xid
    StackAbove(Xid),
    /// Mark this window as stacking above all other windows
    StackTop,
    /// Mark this window as stacking below all other windows
    StackBottom,
}

/// Attributes for an X11 client window
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClientAttr {
    /// Border color as an argb hex value
    BorderColor(u32),
    /// Set the pre-defined client event mask
    ClientEventMask,
    /// Set the pre-defined client event mask for sending unmap notify events
    ClientUnmapMask,
    /// Set the pre-defined event mask for frame windows
    FrameEventMask,
    /// Set the enter-window mask used by screen edge zones
    EdgeEventMask,
    /// Set the pre-defined root event mask (includes substructure redirect)
    RootEventMask,
}

/// A handle on a running X11 connection that we can use for issuing X
/// requests.
///
/// XConn is an abstraction layer allowing the rest of the window manager to
/// communicate with the display server without knowing the backing API. All
/// of quay above this trait is backend agnostic; the shipped backend lives in
/// [crate::x11rb] and a scripted stub for tests in [mock].
pub trait XConn {
    /// The ID of the window manager root window.
    fn root(&self) -> Xid;
    /// Ask the X server for the dimensions of each currently available
    /// screen, via RandR or Xinerama where available.
    fn screen_details(&self) -> Result<Vec<Rect>>;
    /// Ask the X server for the current (x, y) coordinate of the mouse
    /// cursor.
    fn cursor_position(&self) -> Result<Point>;
    /// The poll-able file descriptor of the underlying connection.
    fn connection_fd(&self) -> RawFd;

    /// Block and wait for the next event from the X server.
    fn next_event(&self) -> Result<XEvent>;
    /// Return the next already-queued event without blocking.
    fn poll_event(&self) -> Result<Option<XEvent>>;
    /// Flush any pending requests to the X server.
    fn flush(&self);

    /// Look up the [Xid] of a given [Atom] name. If it is not currently
    /// interned, intern it.
    fn intern_atom(&self, atom: &str) -> Result<Xid>;
    /// Look up the string name of a given [Atom] by its [Xid].
    fn atom_name(&self, xid: Xid) -> Result<String>;

    /// Create a new window of the given type.
    fn create_window(&self, ty: WinType, r: Rect, managed: bool) -> Result<Xid>;
    /// Destroy a window we created (frames, edges, manager windows).
    fn destroy_window(&self, id: Xid) -> Result<()>;
    /// Reparent `id` under `parent` at the given offset.
    fn reparent(&self, id: Xid, parent: Xid, at: Point) -> Result<()>;
    /// Map the given window to the screen, making it visible.
    fn map(&self, id: Xid) -> Result<()>;
    /// Unmap the given window from the screen, hiding it.
    fn unmap(&self, id: Xid) -> Result<()>;
    /// Forcibly kill the client owning the given window.
    fn kill(&self, id: Xid) -> Result<()>;
    /// Set X input focus to be held by the given window.
    fn focus(&self, id: Xid) -> Result<()>;
    /// Look up the current dimensions and position of a given window.
    fn client_geometry(&self, id: Xid) -> Result<Rect>;
    /// Ask the X server for the IDs of all existing top level windows.
    fn existing_clients(&self) -> Result<Vec<Xid>>;

    /// Look up a specific property on a given window.
    fn get_prop(&self, id: Xid, prop_name: &str) -> Result<Option<Prop>>;
    /// List the known property names set for a given window.
    fn list_props(&self, id: Xid) -> Result<Vec<String>>;
    /// Get the current ICCCM [WmState] for a given window.
    fn get_wm_state(&self, id: Xid) -> Result<Option<WmState>>;
    /// Request the [WindowAttributes] for a given window from the X server.
    fn get_window_attributes(&self, id: Xid) -> Result<WindowAttributes>;

    /// Set the current ICCCM [WmState] for a given window.
    fn set_wm_state(&self, id: Xid, wm_state: WmState) -> Result<()>;
    /// Set a specific property on a given window.
    fn set_prop(&self, id: Xid, name: &str, val: Prop) -> Result<()>;
    /// Delete a property from a given window.
    fn delete_prop(&self, id: Xid, prop_name: &str) -> Result<()>;
    /// Set one or more [ClientAttr] for a given window.
    fn set_client_attributes(&self, id: Xid, attrs: &[ClientAttr]) -> Result<()>;
    /// Set the [ClientConfig] for a given window.
    fn set_client_config(&self, id: Xid, data: &[ClientConfig]) -> Result<()>;
    /// Send a [ClientMessage] to a given window.
    fn send_client_message(&self, msg: ClientMessage) -> Result<()>;
    /// Reposition the mouse cursor to the given (x, y) coordinates within
    /// the specified window.
    fn warp_pointer(&self, id: Xid, x: i16, y: i16) -> Result<()>;

    /// Passively grab the given key codes on the root window.
    fn grab_keys(&self, key_codes: &[KeyCode]) -> Result<()>;
    /// Passively grab the given button states on the given window.
    fn grab_buttons(&self, id: Xid, states: &[MouseState]) -> Result<()>;
    /// Actively grab the pointer for an interactive loop.
    ///
    /// Fails with [GrabDenied][crate::Error::GrabDenied] when the server
    /// refuses the grab.
    fn grab_pointer(&self, id: Xid) -> Result<()>;
    /// Release an active pointer grab.
    fn ungrab_pointer(&self);
    /// Actively grab the keyboard for an interactive loop.
    fn grab_keyboard(&self, id: Xid) -> Result<()>;
    /// Release an active keyboard grab.
    fn ungrab_keyboard(&self);
    /// Grab the X server itself. Every grab must be paired with an
    /// [ungrab_server][XConn::ungrab_server] on all exit paths.
    fn grab_server(&self);
    /// Release a server grab.
    fn ungrab_server(&self);

    /// Apply a bounding shape to the given window as a union of rectangles,
    /// when the shape extension is present. A no-op otherwise.
    fn set_shape(&self, id: Xid, rects: &[Rect]) -> Result<()>;
    /// Draw an invert-GC outline on the root window (non-opaque move /
    /// resize feedback).
    fn draw_outline(&self, r: Rect) -> Result<()>;
    /// Remove a previously drawn outline.
    fn clear_outline(&self) -> Result<()>;

    /// The current owner of the given manager selection, if any.
    fn selection_owner(&self, selection: &str) -> Result<Option<Xid>>;
    /// Claim the given manager selection for `owner`.
    fn acquire_selection(&self, owner: Xid, selection: &str) -> Result<()>;
}

/// Extended functionality for [XConn] impls built on top of the base
/// capability set.
pub trait XConnExt: XConn + Sized {
    /// Request the title of a given window following ICCCM / EWMH standards.
    fn window_title(&self, id: Xid) -> Result<String> {
        match self.get_prop(id, Atom::NetWmName.as_ref())? {
            Some(Prop::UTF8String(mut strs)) if !strs.is_empty() => Ok(strs.remove(0)),
            _ => match self.get_prop(id, Atom::WmName.as_ref())? {
                Some(Prop::UTF8String(mut strs)) if !strs.is_empty() => Ok(strs.remove(0)),
                _ => Ok("".to_owned()),
            },
        }
    }

    /// Read the full [ClassHint] identifying tuple for a window.
    fn class_hint(&self, id: Xid) -> Result<ClassHint> {
        let (name, class) = match self.get_prop(id, Atom::WmClass.as_ref())? {
            Some(Prop::UTF8String(strs)) if strs.len() >= 2 => {
                (strs[0].clone(), strs[1].clone())
            }
            _ => (String::new(), String::new()),
        };

        let role = match self.get_prop(id, Atom::WmWindowRole.as_ref())? {
            Some(Prop::UTF8String(mut strs)) if !strs.is_empty() => strs.remove(0),
            _ => String::new(),
        };

        Ok(ClassHint {
            name,
            class,
            role,
            title: self.window_title(id)?,
            group: String::new(),
        })
    }

    /// The WM_HINTS property for a window, if set.
    fn wm_hints(&self, id: Xid) -> Result<Option<WmHints>> {
        match self.get_prop(id, Atom::WmHints.as_ref())? {
            Some(Prop::WmHints(hints)) => Ok(Some(hints)),
            _ => Ok(None),
        }
    }

    /// The WM_NORMAL_HINTS property for a window, if set.
    fn normal_hints(&self, id: Xid) -> Result<Option<WmNormalHints>> {
        match self.get_prop(id, Atom::WmNormalHints.as_ref())? {
            Some(Prop::WmNormalHints(hints)) => Ok(Some(hints)),
            _ => Ok(None),
        }
    }

    /// The WM_TRANSIENT_FOR parent for a window, if set.
    fn transient_for(&self, id: Xid) -> Result<Option<Xid>> {
        match self.get_prop(id, Atom::WmTransientFor.as_ref())? {
            Some(Prop::Window(ids)) if !ids.is_empty() => Ok(Some(ids[0])),
            _ => Ok(None),
        }
    }

    /// The `_NET_WM_WINDOW_TYPE` atoms set for a window, first preferred.
    fn window_types(&self, id: Xid) -> Result<Vec<String>> {
        match self.get_prop(id, Atom::NetWmWindowType.as_ref())? {
            Some(Prop::Atom(atoms)) => Ok(atoms),
            _ => Ok(vec![]),
        }
    }

    /// Request a window's PID via the `_NET_WM_PID` property.
    fn window_pid(&self, id: Xid) -> Option<u32> {
        match self.get_prop(id, Atom::NetWmPid.as_ref()) {
            Ok(Some(Prop::Cardinal(vals))) if !vals.is_empty() => Some(vals[0]),
            _ => None,
        }
    }

    /// Check to see if a given window supports a particular protocol or not
    fn client_supports_protocol(&self, id: Xid, proto: &str) -> Result<bool> {
        if let Some(Prop::Atom(protocols)) = self.get_prop(id, Atom::WmProtocols.as_ref())? {
            Ok(protocols.iter().any(|p| p == proto))
        } else {
            Ok(false)
        }
    }

    /// Ask a client to close via WM_DELETE_WINDOW when supported, killing it
    /// outright otherwise.
    fn close_client(&self, id: Xid) -> Result<()> {
        if self.client_supports_protocol(id, Atom::WmDeleteWindow.as_ref())? {
            trace!(%id, "sending WM_DELETE_WINDOW");
            let data = &[*self.intern_atom(Atom::WmDeleteWindow.as_ref())?, 0, 0, 0, 0];
            let msg = ClientMessage::new(
                id,
                ClientEventMask::NoEventMask,
                Atom::WmProtocols.as_ref(),
                data,
            );

            self.send_client_message(msg)
        } else {
            trace!(%id, "client does not support WM_DELETE_WINDOW: killing");
            self.kill(id)
        }
    }

    /// Update the geometry of a given window, honoring its size hints.
    fn position_window(&self, id: Xid, mut r: Rect) -> Result<()> {
        if let Some(hints) = self.normal_hints(id)? {
            trace!(%id, ?hints, "client has WM_NORMAL_HINTS: applying size hints");
            r = hints.apply_to(r);
        }

        trace!(%id, ?r, "positioning window");
        self.set_client_config(id, &[ClientConfig::Position(r)])
    }

    /// Restack the given windows, bottom first, each one above the last.
    fn restack<'a, I>(&self, mut ids: I) -> Result<()>
    where
        I: Iterator<Item = &'a Xid>,
    {
        let mut previous = match ids.next() {
            Some(id) => *id,
            None => return Ok(()), // nothing to stack
        };

        for &id in ids {
            self.set_client_config(id, &[ClientConfig::StackAbove(previous)])?;
            previous = id;
        }

        Ok(())
    }

    /// Set the `_NET_WM_WINDOW_OPACITY` property on a window, deleting it at
    /// full opacity so that compositors fall back to their default.
    fn set_window_opacity(&self, id: Xid, opacity: u32) -> Result<()> {
        if opacity == u32::MAX {
            self.delete_prop(id, Atom::NetWmWindowOpacity.as_ref())
        } else {
            self.set_prop(
                id,
                Atom::NetWmWindowOpacity.as_ref(),
                Prop::Cardinal(vec![opacity]),
            )
        }
    }

    /// Publish `_NET_FRAME_EXTENTS` for a framed client.
    fn set_frame_extents(&self, id: Xid, left: u32, right: u32, top: u32, bottom: u32) -> Result<()> {
        self.set_prop(
            id,
            Atom::NetFrameExtents.as_ref(),
            Prop::Cardinal(vec![left, right, top, bottom]),
        )
    }
}

// Auto impl XConnExt for all XConn impls
impl<T> XConnExt for T where T: XConn {}
