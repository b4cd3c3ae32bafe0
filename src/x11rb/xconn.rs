//! API wrapper for talking to the X server using x11rb
use crate::{
    core::bindings::{KeyCode, MouseEventKind, MouseState},
    pure::geometry::{Point, Rect},
    x::{
        event::{ClientEventMask, ClientMessage, ClientMessageData},
        property::{MapState, Prop, WindowAttributes, WmHints, WmNormalHints, WmState},
        Atom, ClientAttr, ClientConfig, WinType, XConn, XEvent,
    },
    x11rb::{conversions::*, BackendError, Result as BackendResult},
    Result, Xid,
};
use std::{cell::RefCell, collections::HashMap, os::fd::{AsRawFd, RawFd}};
use strum::IntoEnumIterator;
use tracing::{trace, warn};
use x11rb::{
    connection::Connection,
    protocol::{
        randr::{self, ConnectionExt as _},
        shape::{self, ConnectionExt as _},
        xinerama::ConnectionExt as _,
        xproto::{
            AtomEnum, ChangeWindowAttributesAux, ClientMessageEvent, ClipOrdering,
            ConfigureWindowAux, ConnectionExt as _, CreateGCAux, CreateWindowAux, EventMask,
            Gcontext, GrabMode, GrabStatus, GX, InputFocus, MapState as XMapState, PropMode,
            Rectangle, StackMode, Window, WindowClass, CLIENT_MESSAGE_EVENT,
        },
        Event,
    },
    rust_connection::RustConnection,
    wrapper::ConnectionExt as _,
    CURRENT_TIME, NONE,
};

fn root_event_mask() -> EventMask {
    EventMask::SUBSTRUCTURE_REDIRECT
        | EventMask::SUBSTRUCTURE_NOTIFY
        | EventMask::BUTTON_PRESS
        | EventMask::BUTTON_RELEASE
        | EventMask::PROPERTY_CHANGE
        | EventMask::STRUCTURE_NOTIFY
}

fn client_event_mask() -> EventMask {
    EventMask::ENTER_WINDOW
        | EventMask::STRUCTURE_NOTIFY
        | EventMask::PROPERTY_CHANGE
        | EventMask::FOCUS_CHANGE
}

fn frame_event_mask() -> EventMask {
    EventMask::ENTER_WINDOW
        | EventMask::BUTTON_PRESS
        | EventMask::BUTTON_RELEASE
        | EventMask::BUTTON_MOTION
        | EventMask::EXPOSURE
        | EventMask::SUBSTRUCTURE_REDIRECT
}

fn edge_event_mask() -> EventMask {
    EventMask::ENTER_WINDOW
        | EventMask::BUTTON_PRESS
        | EventMask::BUTTON_RELEASE
        | EventMask::BUTTON_MOTION
}

fn pointer_grab_mask() -> EventMask {
    EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::BUTTON_MOTION
}

// modifier combinations a passive grab must cover so bindings fire with
// lock keys held: none, caps, num, caps+num
const LOCK_COMBOS: [u16; 4] = [0x0000, 0x0002, 0x0010, 0x0012];

/// Handles communication with an X server via the x11rb crate.
#[derive(Debug)]
pub struct X11rbConn<C: Connection> {
    conn: C,
    root: Window,
    fd: RawFd,
    atoms: HashMap<Atom, u32>,
    has_shape: bool,
    has_randr: bool,
    outline_gc: RefCell<Option<Gcontext>>,
    outline: RefCell<Option<Rect>>,
}

impl X11rbConn<RustConnection> {
    /// Connect to the display named in `$DISPLAY`.
    pub fn new() -> Result<Self> {
        let (conn, screen) = RustConnection::connect(None).map_err(BackendError::from)?;
        let fd = conn.stream().as_raw_fd();

        Self::new_for_connection(conn, screen, fd)
    }
}

impl<C: Connection> X11rbConn<C> {
    /// Wrap an established connection.
    pub fn new_for_connection(conn: C, screen: usize, fd: RawFd) -> Result<Self> {
        let root = conn.setup().roots[screen].root;

        // send all InternAtom requests first, then collect the replies
        let cookies = Atom::iter()
            .map(|atom| Ok((atom, conn.intern_atom(false, atom.as_ref().as_bytes())?)))
            .collect::<BackendResult<Vec<_>>>()?;
        let atoms = cookies
            .into_iter()
            .map(|(atom, cookie)| Ok((atom, cookie.reply()?.atom)))
            .collect::<BackendResult<HashMap<_, _>>>()?;

        let has_shape = conn
            .extension_information(shape::X11_EXTENSION_NAME)
            .map_err(BackendError::from)?
            .is_some();
        let has_randr = conn
            .extension_information(randr::X11_EXTENSION_NAME)
            .map_err(BackendError::from)?
            .is_some();

        if has_randr {
            let mask = randr::NotifyMask::OUTPUT_CHANGE
                | randr::NotifyMask::CRTC_CHANGE
                | randr::NotifyMask::SCREEN_CHANGE;
            conn.randr_select_input(root, mask)
                .map_err(BackendError::from)?;
        }

        Ok(Self {
            conn,
            root,
            fd,
            atoms,
            has_shape,
            has_randr,
            outline_gc: RefCell::new(None),
            outline: RefCell::new(None),
        })
    }

    fn known_atom(&self, atom: Atom) -> u32 {
        self.atoms[&atom]
    }

    fn atom_id(&self, name: &str) -> BackendResult<u32> {
        use std::str::FromStr;

        if let Ok(atom) = Atom::from_str(name) {
            return Ok(self.known_atom(atom));
        }

        Ok(self.conn.intern_atom(false, name.as_bytes())?.reply()?.atom)
    }

    fn atom_string(&self, id: u32) -> BackendResult<String> {
        if let Some((atom, _)) = self.atoms.iter().find(|(_, &v)| v == id) {
            return Ok(atom.as_ref().to_string());
        }

        let reply = self.conn.get_atom_name(id)?.reply()?;
        Ok(String::from_utf8_lossy(&reply.name).into_owned())
    }

    fn convert_event(&self, event: Event) -> Option<XEvent> {
        match event {
            Event::ButtonPress(ev) => Some(XEvent::MouseEvent(to_button_event(
                &ev,
                MouseEventKind::Press,
            ))),
            Event::ButtonRelease(ev) => Some(XEvent::MouseEvent(to_button_event(
                &ev,
                MouseEventKind::Release,
            ))),
            Event::MotionNotify(ev) => Some(XEvent::MouseEvent(to_motion_event(&ev))),
            Event::KeyPress(ev) => Some(XEvent::KeyPress(
                to_keycode(ev.detail, ev.state),
                ev.time,
            )),
            Event::KeyRelease(ev) => Some(XEvent::KeyRelease(
                to_keycode(ev.detail, ev.state),
                ev.time,
            )),
            Event::MapRequest(ev) => Some(XEvent::MapRequest(Xid(ev.window))),
            Event::DestroyNotify(ev) => Some(XEvent::Destroy(Xid(ev.window))),
            Event::UnmapNotify(ev) => Some(XEvent::UnmapNotify(Xid(ev.window))),
            Event::EnterNotify(ev) => Some(XEvent::Enter(to_pointer_change(&ev))),
            Event::LeaveNotify(ev) => Some(XEvent::Leave(to_pointer_change(&ev))),
            Event::FocusIn(ev) => Some(XEvent::FocusIn(Xid(ev.event))),
            Event::ConfigureNotify(ev) => {
                Some(XEvent::ConfigureNotify(to_configure_notify(&ev, self.root)))
            }
            Event::ConfigureRequest(ev) => {
                Some(XEvent::ConfigureRequest(to_configure_request(&ev)))
            }
            Event::PropertyNotify(ev) => {
                let atom = self.atom_string(ev.atom).ok()?;
                Some(XEvent::PropertyNotify(crate::x::event::PropertyEvent {
                    id: Xid(ev.window),
                    atom,
                    is_root: ev.window == self.root,
                }))
            }
            Event::ClientMessage(ev) => {
                let dtype = self.atom_string(ev.type_).ok()?;
                let data = match ev.format {
                    8 => ClientMessageData::U8(ev.data.as_data8()),
                    16 => ClientMessageData::U16(ev.data.as_data16()),
                    32 => ClientMessageData::U32(ev.data.as_data32()),
                    n => {
                        warn!(format = n, "dropping client message with invalid format");
                        return None;
                    }
                };

                Some(XEvent::ClientMessage(ClientMessage {
                    id: Xid(ev.window),
                    mask: ClientEventMask::NoEventMask,
                    dtype,
                    data,
                }))
            }
            Event::SelectionClear(ev) => Some(XEvent::SelectionClear(Xid(ev.owner))),
            Event::MappingNotify(_) => Some(XEvent::MappingNotify),
            Event::RandrScreenChangeNotify(_) | Event::RandrNotify(_) => {
                Some(XEvent::RandrNotify)
            }
            Event::ShapeNotify(ev) => Some(XEvent::ShapeNotify(Xid(ev.affected_window))),
            _ => None,
        }
    }

    fn outline_gc(&self) -> BackendResult<Gcontext> {
        if let Some(gc) = *self.outline_gc.borrow() {
            return Ok(gc);
        }

        let gc = self.conn.generate_id()?;
        let aux = CreateGCAux::new()
            .function(GX::XOR)
            .foreground(0xffff_ffff)
            .subwindow_mode(x11rb::protocol::xproto::SubwindowMode::INCLUDE_INFERIORS)
            .line_width(1);
        self.conn.create_gc(gc, self.root, &aux)?;
        *self.outline_gc.borrow_mut() = Some(gc);

        Ok(gc)
    }

    fn invert_rect(&self, r: Rect) -> BackendResult<()> {
        let gc = self.outline_gc()?;
        let rect = Rectangle {
            x: r.x as i16,
            y: r.y as i16,
            width: r.w as u16,
            height: r.h as u16,
        };
        self.conn.poly_rectangle(self.root, gc, &[rect])?;
        self.conn.flush()?;

        Ok(())
    }

    fn screens_from_randr(&self) -> BackendResult<Vec<Rect>> {
        let resources = self
            .conn
            .randr_get_screen_resources_current(self.root)?
            .reply()?;

        let cookies = resources
            .crtcs
            .iter()
            .map(|&c| Ok(self.conn.randr_get_crtc_info(c, 0)?))
            .collect::<BackendResult<Vec<_>>>()?;

        let screens: Vec<Rect> = cookies
            .into_iter()
            .flat_map(|cookie| cookie.reply().ok())
            .filter(|reply| reply.width > 0)
            .map(|reply| {
                Rect::new(
                    reply.x as i32,
                    reply.y as i32,
                    reply.width as u32,
                    reply.height as u32,
                )
            })
            .collect();

        Ok(screens)
    }

    fn screens_from_xinerama(&self) -> BackendResult<Vec<Rect>> {
        let reply = self.conn.xinerama_query_screens()?.reply()?;

        Ok(reply
            .screen_info
            .iter()
            .map(|s| Rect::new(s.x_org as i32, s.y_org as i32, s.width as u32, s.height as u32))
            .collect())
    }
}

impl<C: Connection> XConn for X11rbConn<C> {
    fn root(&self) -> Xid {
        Xid(self.root)
    }

    fn screen_details(&self) -> Result<Vec<Rect>> {
        if self.has_randr {
            if let Ok(screens) = self.screens_from_randr() {
                if !screens.is_empty() {
                    return Ok(screens);
                }
            }
        }

        if let Ok(screens) = self.screens_from_xinerama() {
            if !screens.is_empty() {
                return Ok(screens);
            }
        }

        // a single synthetic head covering the root
        let reply = self
            .conn
            .get_geometry(self.root)
            .map_err(BackendError::from)?
            .reply()
            .map_err(BackendError::from)?;

        Ok(vec![Rect::new(
            0,
            0,
            reply.width as u32,
            reply.height as u32,
        )])
    }

    fn cursor_position(&self) -> Result<Point> {
        let reply = self
            .conn
            .query_pointer(self.root)
            .map_err(BackendError::from)?
            .reply()
            .map_err(BackendError::from)?;

        Ok(Point::new(reply.root_x as i32, reply.root_y as i32))
    }

    fn connection_fd(&self) -> RawFd {
        self.fd
    }

    fn next_event(&self) -> Result<XEvent> {
        loop {
            let event = self.conn.wait_for_event().map_err(BackendError::from)?;
            if let Some(converted) = self.convert_event(event) {
                return Ok(converted);
            }
        }
    }

    fn poll_event(&self) -> Result<Option<XEvent>> {
        loop {
            match self.conn.poll_for_event().map_err(BackendError::from)? {
                Some(event) => {
                    if let Some(converted) = self.convert_event(event) {
                        return Ok(Some(converted));
                    }
                }
                None => return Ok(None),
            }
        }
    }

    fn flush(&self) {
        let _ = self.conn.flush();
    }

    fn intern_atom(&self, atom: &str) -> Result<Xid> {
        Ok(Xid(self.atom_id(atom)?))
    }

    fn atom_name(&self, xid: Xid) -> Result<String> {
        Ok(self.atom_string(*xid)?)
    }

    fn create_window(&self, ty: WinType, r: Rect, _managed: bool) -> Result<Xid> {
        let id = self.conn.generate_id().map_err(BackendError::from)?;

        let (class, aux, depth) = match ty {
            WinType::CheckWin => (
                WindowClass::INPUT_OUTPUT,
                CreateWindowAux::new().override_redirect(1),
                x11rb::COPY_DEPTH_FROM_PARENT,
            ),
            WinType::InputOnly => (
                WindowClass::INPUT_ONLY,
                CreateWindowAux::new().override_redirect(1),
                0,
            ),
            WinType::InputOutput(_) => (
                WindowClass::INPUT_OUTPUT,
                CreateWindowAux::new().override_redirect(1),
                x11rb::COPY_DEPTH_FROM_PARENT,
            ),
        };

        self.conn
            .create_window(
                depth,
                id,
                self.root,
                r.x as i16,
                r.y as i16,
                r.w as u16,
                r.h as u16,
                0,
                class,
                x11rb::COPY_FROM_PARENT,
                &aux,
            )
            .map_err(BackendError::from)?;

        if let WinType::InputOutput(atom) = ty {
            let type_atom = self.known_atom(atom);
            self.conn
                .change_property32(
                    PropMode::REPLACE,
                    id,
                    self.known_atom(Atom::NetWmWindowType),
                    AtomEnum::ATOM,
                    &[type_atom],
                )
                .map_err(BackendError::from)?;
        }

        Ok(Xid(id))
    }

    fn destroy_window(&self, id: Xid) -> Result<()> {
        self.conn.destroy_window(*id).map_err(BackendError::from)?;

        Ok(())
    }

    fn reparent(&self, id: Xid, parent: Xid, at: Point) -> Result<()> {
        self.conn
            .reparent_window(*id, *parent, at.x as i16, at.y as i16)
            .map_err(BackendError::from)?;

        Ok(())
    }

    fn map(&self, id: Xid) -> Result<()> {
        self.conn.map_window(*id).map_err(BackendError::from)?;

        Ok(())
    }

    fn unmap(&self, id: Xid) -> Result<()> {
        self.conn.unmap_window(*id).map_err(BackendError::from)?;

        Ok(())
    }

    fn kill(&self, id: Xid) -> Result<()> {
        self.conn.kill_client(*id).map_err(BackendError::from)?;

        Ok(())
    }

    fn focus(&self, id: Xid) -> Result<()> {
        self.conn
            .set_input_focus(InputFocus::POINTER_ROOT, *id, CURRENT_TIME)
            .map_err(BackendError::from)?;

        Ok(())
    }

    fn client_geometry(&self, id: Xid) -> Result<Rect> {
        let geo = self
            .conn
            .get_geometry(*id)
            .map_err(BackendError::from)?
            .reply()
            .map_err(BackendError::from)?;
        let coords = self
            .conn
            .translate_coordinates(*id, self.root, 0, 0)
            .map_err(BackendError::from)?
            .reply()
            .map_err(BackendError::from)?;

        Ok(Rect::new(
            coords.dst_x as i32,
            coords.dst_y as i32,
            geo.width as u32,
            geo.height as u32,
        ))
    }

    fn existing_clients(&self) -> Result<Vec<Xid>> {
        let reply = self
            .conn
            .query_tree(self.root)
            .map_err(BackendError::from)?
            .reply()
            .map_err(BackendError::from)?;

        Ok(reply.children.into_iter().map(Xid).collect())
    }

    fn get_prop(&self, id: Xid, prop_name: &str) -> Result<Option<Prop>> {
        let atom = self.atom_id(prop_name)?;
        let reply = self
            .conn
            .get_property(false, *id, atom, AtomEnum::ANY, 0, 1024)
            .map_err(BackendError::from)?
            .reply()
            .map_err(BackendError::from)?;

        if reply.type_ == NONE || reply.value_len == 0 {
            return Ok(None);
        }

        let utf8 = self.known_atom(Atom::UTF8String);
        let prop = if reply.type_ == u32::from(AtomEnum::ATOM) {
            let names = reply
                .value32()
                .into_iter()
                .flatten()
                .map(|a| self.atom_string(a))
                .collect::<BackendResult<Vec<String>>>()?;
            Prop::Atom(names)
        } else if reply.type_ == u32::from(AtomEnum::WINDOW) {
            Prop::Window(reply.value32().into_iter().flatten().map(Xid).collect())
        } else if reply.type_ == u32::from(AtomEnum::CARDINAL) {
            Prop::Cardinal(reply.value32().into_iter().flatten().collect())
        } else if reply.type_ == utf8 || reply.type_ == u32::from(AtomEnum::STRING) {
            let strs = reply
                .value
                .split(|&b| b == 0)
                .filter(|s| !s.is_empty())
                .map(|s| String::from_utf8_lossy(s).into_owned())
                .collect();
            Prop::UTF8String(strs)
        } else if reply.type_ == u32::from(AtomEnum::WM_HINTS) {
            let vals: Vec<u32> = reply.value32().into_iter().flatten().collect();
            Prop::WmHints(parse_wm_hints(&vals))
        } else if reply.type_ == u32::from(AtomEnum::WM_SIZE_HINTS) {
            let vals: Vec<u32> = reply.value32().into_iter().flatten().collect();
            Prop::WmNormalHints(parse_size_hints(&vals))
        } else {
            Prop::Bytes(reply.value)
        };

        Ok(Some(prop))
    }

    fn list_props(&self, id: Xid) -> Result<Vec<String>> {
        let reply = self
            .conn
            .list_properties(*id)
            .map_err(BackendError::from)?
            .reply()
            .map_err(BackendError::from)?;

        reply
            .atoms
            .into_iter()
            .map(|a| self.atom_string(a).map_err(crate::Error::from))
            .collect()
    }

    fn get_wm_state(&self, id: Xid) -> Result<Option<WmState>> {
        let atom = self.known_atom(Atom::WmState);
        let reply = self
            .conn
            .get_property(false, *id, atom, atom, 0, 2)
            .map_err(BackendError::from)?
            .reply()
            .map_err(BackendError::from)?;

        let raw = reply.value32().into_iter().flatten().next();
        match raw {
            Some(raw) => Ok(WmState::try_from(raw).ok()),
            None => Ok(None),
        }
    }

    fn get_window_attributes(&self, id: Xid) -> Result<WindowAttributes> {
        let reply = self
            .conn
            .get_window_attributes(*id)
            .map_err(BackendError::from)?
            .reply()
            .map_err(BackendError::from)?;

        let map_state = if reply.map_state == XMapState::UNMAPPED {
            MapState::Unmapped
        } else if reply.map_state == XMapState::UNVIEWABLE {
            MapState::UnViewable
        } else {
            MapState::Viewable
        };

        Ok(WindowAttributes::new(reply.override_redirect, map_state))
    }

    fn set_wm_state(&self, id: Xid, wm_state: WmState) -> Result<()> {
        let atom = self.known_atom(Atom::WmState);
        self.conn
            .change_property32(
                PropMode::REPLACE,
                *id,
                atom,
                atom,
                &[u32::from(wm_state), NONE],
            )
            .map_err(BackendError::from)?;

        Ok(())
    }

    fn set_prop(&self, id: Xid, name: &str, val: Prop) -> Result<()> {
        let atom = self.atom_id(name)?;

        match val {
            Prop::Atom(names) => {
                let atoms = names
                    .iter()
                    .map(|n| self.atom_id(n))
                    .collect::<BackendResult<Vec<u32>>>()?;
                self.conn
                    .change_property32(PropMode::REPLACE, *id, atom, AtomEnum::ATOM, &atoms)
                    .map_err(BackendError::from)?;
            }
            Prop::Cardinal(vals) => {
                self.conn
                    .change_property32(PropMode::REPLACE, *id, atom, AtomEnum::CARDINAL, &vals)
                    .map_err(BackendError::from)?;
            }
            Prop::Window(ids) => {
                let raw: Vec<u32> = ids.iter().map(|x| **x).collect();
                self.conn
                    .change_property32(PropMode::REPLACE, *id, atom, AtomEnum::WINDOW, &raw)
                    .map_err(BackendError::from)?;
            }
            Prop::UTF8String(strs) => {
                let joined = strs.join("\0");
                self.conn
                    .change_property8(
                        PropMode::REPLACE,
                        *id,
                        atom,
                        self.known_atom(Atom::UTF8String),
                        joined.as_bytes(),
                    )
                    .map_err(BackendError::from)?;
            }
            Prop::Bytes(bytes) => {
                self.conn
                    .change_property8(PropMode::REPLACE, *id, atom, AtomEnum::STRING, &bytes)
                    .map_err(BackendError::from)?;
            }
            Prop::WmHints(_) | Prop::WmNormalHints(_) => {
                trace!(%id, %name, "refusing to write ICCCM hint properties");
            }
        }

        Ok(())
    }

    fn delete_prop(&self, id: Xid, prop_name: &str) -> Result<()> {
        let atom = self.atom_id(prop_name)?;
        self.conn
            .delete_property(*id, atom)
            .map_err(BackendError::from)?;

        Ok(())
    }

    fn set_client_attributes(&self, id: Xid, attrs: &[ClientAttr]) -> Result<()> {
        let mut aux = ChangeWindowAttributesAux::new();

        for attr in attrs {
            aux = match attr {
                ClientAttr::BorderColor(c) => aux.border_pixel(*c),
                ClientAttr::ClientEventMask => aux.event_mask(client_event_mask()),
                ClientAttr::ClientUnmapMask => aux.event_mask(EventMask::NO_EVENT),
                ClientAttr::FrameEventMask => aux.event_mask(frame_event_mask()),
                ClientAttr::EdgeEventMask => aux.event_mask(edge_event_mask()),
                ClientAttr::RootEventMask => aux.event_mask(root_event_mask()),
            };
        }

        self.conn
            .change_window_attributes(*id, &aux)
            .map_err(BackendError::from)?;

        Ok(())
    }

    fn set_client_config(&self, id: Xid, data: &[ClientConfig]) -> Result<()> {
        for conf in data {
            let aux = match conf {
                ClientConfig::BorderPx(px) => ConfigureWindowAux::new().border_width(*px),
                ClientConfig::Position(r) => ConfigureWindowAux::new()
                    .x(r.x)
                    .y(r.y)
                    .width(r.w)
                    .height(r.h),
                ClientConfig::StackAbove(sibling) => ConfigureWindowAux::new()
                    .sibling(**sibling)
                    .stack_mode(StackMode::ABOVE),
                ClientConfig::StackTop => {
                    ConfigureWindowAux::new().stack_mode(StackMode::ABOVE)
                }
                ClientConfig::StackBottom => {
                    ConfigureWindowAux::new().stack_mode(StackMode::BELOW)
                }
            };

            self.conn
                .configure_window(*id, &aux)
                .map_err(BackendError::from)?;
        }

        Ok(())
    }

    fn send_client_message(&self, msg: ClientMessage) -> Result<()> {
        let type_ = self.atom_id(&msg.dtype)?;
        let mask = match msg.mask {
            ClientEventMask::SubstructureNotify => EventMask::SUBSTRUCTURE_NOTIFY,
            ClientEventMask::SubstructureRedirect => {
                EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY
            }
            ClientEventMask::StructureNotify => EventMask::STRUCTURE_NOTIFY,
            ClientEventMask::NoEventMask => EventMask::NO_EVENT,
        };

        let data: [u32; 5] = match &msg.data {
            ClientMessageData::U32(d) => *d,
            other => {
                let mut d = [0u32; 5];
                for (i, v) in other.as_usize().iter().take(5).enumerate() {
                    d[i] = *v as u32;
                }
                d
            }
        };

        let event = ClientMessageEvent {
            response_type: CLIENT_MESSAGE_EVENT,
            format: 32,
            sequence: 0,
            window: *msg.id,
            type_,
            data: data.into(),
        };

        self.conn
            .send_event(false, *msg.id, mask, event)
            .map_err(BackendError::from)?;

        Ok(())
    }

    fn warp_pointer(&self, id: Xid, x: i16, y: i16) -> Result<()> {
        self.conn
            .warp_pointer(NONE, *id, 0, 0, 0, 0, x, y)
            .map_err(BackendError::from)?;

        Ok(())
    }

    fn grab_keys(&self, key_codes: &[KeyCode]) -> Result<()> {
        for code in key_codes {
            for combo in LOCK_COMBOS {
                self.conn
                    .grab_key(
                        false,
                        self.root,
                        (code.mask | combo).into(),
                        code.code,
                        GrabMode::ASYNC,
                        GrabMode::ASYNC,
                    )
                    .map_err(BackendError::from)?;
            }
        }

        Ok(())
    }

    fn grab_buttons(&self, id: Xid, states: &[MouseState]) -> Result<()> {
        for state in states {
            for combo in LOCK_COMBOS {
                self.conn
                    .grab_button(
                        false,
                        *id,
                        pointer_grab_mask(),
                        GrabMode::ASYNC,
                        GrabMode::ASYNC,
                        NONE,
                        NONE,
                        x11rb::protocol::xproto::ButtonIndex::from(u8::from(state.button)),
                        (state.mask | combo).into(),
                    )
                    .map_err(BackendError::from)?;
            }
        }

        Ok(())
    }

    fn grab_pointer(&self, id: Xid) -> Result<()> {
        let reply = self
            .conn
            .grab_pointer(
                false,
                *id,
                pointer_grab_mask(),
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                NONE,
                NONE,
                CURRENT_TIME,
            )
            .map_err(BackendError::from)?
            .reply()
            .map_err(BackendError::from)?;

        if reply.status != GrabStatus::SUCCESS {
            return Err(crate::Error::GrabDenied("pointer"));
        }

        Ok(())
    }

    fn ungrab_pointer(&self) {
        let _ = self.conn.ungrab_pointer(CURRENT_TIME);
        let _ = self.conn.flush();
    }

    fn grab_keyboard(&self, id: Xid) -> Result<()> {
        let reply = self
            .conn
            .grab_keyboard(false, *id, CURRENT_TIME, GrabMode::ASYNC, GrabMode::ASYNC)
            .map_err(BackendError::from)?
            .reply()
            .map_err(BackendError::from)?;

        if reply.status != GrabStatus::SUCCESS {
            return Err(crate::Error::GrabDenied("keyboard"));
        }

        Ok(())
    }

    fn ungrab_keyboard(&self) {
        let _ = self.conn.ungrab_keyboard(CURRENT_TIME);
        let _ = self.conn.flush();
    }

    fn grab_server(&self) {
        let _ = self.conn.grab_server();
        let _ = self.conn.flush();
    }

    fn ungrab_server(&self) {
        let _ = self.conn.ungrab_server();
        let _ = self.conn.flush();
    }

    fn set_shape(&self, id: Xid, rects: &[Rect]) -> Result<()> {
        if !self.has_shape {
            return Ok(());
        }

        let rectangles: Vec<Rectangle> = rects
            .iter()
            .map(|r| Rectangle {
                x: r.x as i16,
                y: r.y as i16,
                width: r.w as u16,
                height: r.h as u16,
            })
            .collect();

        self.conn
            .shape_rectangles(
                shape::SO::SET,
                shape::SK::BOUNDING,
                ClipOrdering::UNSORTED,
                *id,
                0,
                0,
                &rectangles,
            )
            .map_err(BackendError::from)?;

        Ok(())
    }

    fn draw_outline(&self, r: Rect) -> Result<()> {
        self.clear_outline()?;
        self.invert_rect(r)?;
        *self.outline.borrow_mut() = Some(r);

        Ok(())
    }

    fn clear_outline(&self) -> Result<()> {
        if let Some(r) = self.outline.borrow_mut().take() {
            self.invert_rect(r)?;
        }

        Ok(())
    }

    fn selection_owner(&self, selection: &str) -> Result<Option<Xid>> {
        let atom = self.atom_id(selection)?;
        let reply = self
            .conn
            .get_selection_owner(atom)
            .map_err(BackendError::from)?
            .reply()
            .map_err(BackendError::from)?;

        Ok((reply.owner != NONE).then_some(Xid(reply.owner)))
    }

    fn acquire_selection(&self, owner: Xid, selection: &str) -> Result<()> {
        let atom = self.atom_id(selection)?;
        self.conn
            .set_selection_owner(*owner, atom, CURRENT_TIME)
            .map_err(BackendError::from)?;
        self.conn.flush().map_err(BackendError::from)?;

        Ok(())
    }
}

// ICCCM WM_HINTS flag bits
const INPUT_HINT: u32 = 1 << 0;
const STATE_HINT: u32 = 1 << 1;
const ICON_PIXMAP_HINT: u32 = 1 << 2;
const ICON_WINDOW_HINT: u32 = 1 << 3;
const WINDOW_GROUP_HINT: u32 = 1 << 6;
const URGENCY_HINT: u32 = 1 << 8;

// WM_HINTS layout: flags, input, initial_state, icon_pixmap, icon_window,
// icon_x, icon_y, icon_mask, window_group
fn parse_wm_hints(vals: &[u32]) -> WmHints {
    let flags = vals.first().copied().unwrap_or(0);
    let get = |i: usize| vals.get(i).copied().unwrap_or(0);
    let window = |i: usize, flag: u32| {
        (flags & flag != 0 && get(i) != 0).then(|| Xid(get(i)))
    };

    let initial_state = if flags & STATE_HINT != 0 {
        WmState::try_from(get(2)).unwrap_or(WmState::Normal)
    } else {
        WmState::Normal
    };

    WmHints {
        accepts_input: flags & INPUT_HINT == 0 || get(1) != 0,
        initial_state,
        icon_window: window(4, ICON_WINDOW_HINT),
        icon_pixmap: window(3, ICON_PIXMAP_HINT),
        window_group: window(8, WINDOW_GROUP_HINT),
        urgent: flags & URGENCY_HINT != 0,
    }
}

// WM_SIZE_HINTS flag bits
const P_MIN_SIZE: u32 = 1 << 4;
const P_MAX_SIZE: u32 = 1 << 5;
const P_RESIZE_INC: u32 = 1 << 6;
const P_ASPECT: u32 = 1 << 7;
const P_BASE_SIZE: u32 = 1 << 8;

// WM_SIZE_HINTS layout: flags, pad x4, min_w, min_h, max_w, max_h, w_inc,
// h_inc, min_aspect (num, den), max_aspect (num, den), base_w, base_h,
// win_gravity
fn parse_size_hints(vals: &[u32]) -> WmNormalHints {
    let flags = vals.first().copied().unwrap_or(0);
    let pair = |flag: u32, i: usize| {
        (flags & flag != 0)
            .then(|| {
                let a = vals.get(i).copied().unwrap_or(0);
                let b = vals.get(i + 1).copied().unwrap_or(0);
                (a, b)
            })
            .filter(|&(a, b)| a > 0 || b > 0)
    };

    WmNormalHints {
        min: pair(P_MIN_SIZE, 5),
        max: pair(P_MAX_SIZE, 7),
        base: pair(P_BASE_SIZE, 15),
        increment: pair(P_RESIZE_INC, 9),
        aspect: (flags & P_ASPECT != 0)
            .then(|| {
                let num = |i: usize| vals.get(i).copied().unwrap_or(0) as f64;
                let den = |i: usize| vals.get(i).copied().unwrap_or(1).max(1) as f64;
                (num(11) / den(12), num(13) / den(14))
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wm_hints_dock_app_convention() {
        // StateHint + IconWindowHint, initial state Withdrawn
        let vals = [
            STATE_HINT | ICON_WINDOW_HINT,
            0,
            0, // Withdrawn
            0,
            77, // icon window
            0,
            0,
            0,
            0,
        ];

        let hints = parse_wm_hints(&vals);

        assert_eq!(hints.initial_state, WmState::Withdrawn);
        assert_eq!(hints.icon_window, Some(Xid(77)));
        assert!(hints.is_dock_app());
    }

    #[test]
    fn wm_hints_without_state_hint_is_normal() {
        let vals = [ICON_PIXMAP_HINT, 0, 0, 55, 0, 0, 0, 0, 0];

        let hints = parse_wm_hints(&vals);

        assert_eq!(hints.initial_state, WmState::Normal);
        assert_eq!(hints.icon_pixmap, Some(Xid(55)));
        assert!(!hints.is_dock_app());
    }

    #[test]
    fn wm_hints_urgency_and_input() {
        let vals = [URGENCY_HINT | INPUT_HINT, 0, 0, 0, 0, 0, 0, 0, 0];

        let hints = parse_wm_hints(&vals);

        assert!(hints.urgent);
        assert!(!hints.accepts_input);
    }

    #[test]
    fn size_hints_fields_follow_flags() {
        let mut vals = [0u32; 18];
        vals[0] = P_MIN_SIZE | P_RESIZE_INC | P_BASE_SIZE;
        vals[5] = 100; // min_w
        vals[6] = 50; // min_h
        vals[9] = 8; // w_inc
        vals[10] = 16; // h_inc
        vals[15] = 4; // base_w
        vals[16] = 4; // base_h

        let hints = parse_size_hints(&vals);

        assert_eq!(hints.min, Some((100, 50)));
        assert_eq!(hints.increment, Some((8, 16)));
        assert_eq!(hints.base, Some((4, 4)));
        assert_eq!(hints.max, None);
        assert_eq!(hints.aspect, None);
    }
}
