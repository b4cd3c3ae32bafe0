//! A stub implementation of XConn for writing tests against.
//!
//! Every method has a benign default (`Ok` with empty data) so test conns
//! only implement the `stub_` hooks their scenario needs.
use crate::{
    core::bindings::{KeyCode, MouseState},
    pure::geometry::{Point, Rect},
    x::{
        event::ClientMessage,
        property::{MapState, Prop, WindowAttributes, WmState},
        ClientAttr, ClientConfig, WinType, XConn, XEvent,
    },
    Error, Result, Xid,
};
use std::os::fd::RawFd;

/// All methods on this trait have a default implementation so a test conn
/// only needs to provide the hooks its scenario relies on.
///
/// Any implementation of `StubXConn` automatically implements [XConn] by
/// forwarding each `$method` to `stub_$method`.
#[allow(unused_variables, missing_docs)]
pub trait StubXConn {
    fn stub_root(&self) -> Xid {
        Xid(0)
    }

    fn stub_screen_details(&self) -> Result<Vec<Rect>> {
        Ok(vec![Rect::new(0, 0, 1920, 1080)])
    }

    fn stub_cursor_position(&self) -> Result<Point> {
        Ok(Point::new(0, 0))
    }

    fn stub_connection_fd(&self) -> RawFd {
        -1
    }

    fn stub_next_event(&self) -> Result<XEvent> {
        Err(Error::ConnectionClosed)
    }

    fn stub_poll_event(&self) -> Result<Option<XEvent>> {
        Ok(None)
    }

    fn stub_flush(&self) {}

    fn stub_intern_atom(&self, atom: &str) -> Result<Xid> {
        Ok(Xid(0))
    }

    fn stub_atom_name(&self, xid: Xid) -> Result<String> {
        Ok(String::new())
    }

    fn stub_create_window(&self, ty: WinType, r: Rect, managed: bool) -> Result<Xid> {
        Ok(Xid(0))
    }

    fn stub_destroy_window(&self, id: Xid) -> Result<()> {
        Ok(())
    }

    fn stub_reparent(&self, id: Xid, parent: Xid, at: Point) -> Result<()> {
        Ok(())
    }

    fn stub_map(&self, id: Xid) -> Result<()> {
        Ok(())
    }

    fn stub_unmap(&self, id: Xid) -> Result<()> {
        Ok(())
    }

    fn stub_kill(&self, id: Xid) -> Result<()> {
        Ok(())
    }

    fn stub_focus(&self, id: Xid) -> Result<()> {
        Ok(())
    }

    fn stub_client_geometry(&self, id: Xid) -> Result<Rect> {
        Ok(Rect::new(0, 0, 100, 100))
    }

    fn stub_existing_clients(&self) -> Result<Vec<Xid>> {
        Ok(vec![])
    }

    fn stub_get_prop(&self, id: Xid, prop_name: &str) -> Result<Option<Prop>> {
        Ok(None)
    }

    fn stub_list_props(&self, id: Xid) -> Result<Vec<String>> {
        Ok(vec![])
    }

    fn stub_get_wm_state(&self, id: Xid) -> Result<Option<WmState>> {
        Ok(None)
    }

    fn stub_get_window_attributes(&self, id: Xid) -> Result<WindowAttributes> {
        Ok(WindowAttributes::new(false, MapState::Unmapped))
    }

    fn stub_set_wm_state(&self, id: Xid, wm_state: WmState) -> Result<()> {
        Ok(())
    }

    fn stub_set_prop(&self, id: Xid, name: &str, val: Prop) -> Result<()> {
        Ok(())
    }

    fn stub_delete_prop(&self, id: Xid, prop_name: &str) -> Result<()> {
        Ok(())
    }

    fn stub_set_client_attributes(&self, id: Xid, attrs: &[ClientAttr]) -> Result<()> {
        Ok(())
    }

    fn stub_set_client_config(&self, id: Xid, data: &[ClientConfig]) -> Result<()> {
        Ok(())
    }

    fn stub_send_client_message(&self, msg: ClientMessage) -> Result<()> {
        Ok(())
    }

    fn stub_warp_pointer(&self, id: Xid, x: i16, y: i16) -> Result<()> {
        Ok(())
    }

    fn stub_grab_keys(&self, key_codes: &[KeyCode]) -> Result<()> {
        Ok(())
    }

    fn stub_grab_buttons(&self, id: Xid, states: &[MouseState]) -> Result<()> {
        Ok(())
    }

    fn stub_grab_pointer(&self, id: Xid) -> Result<()> {
        Ok(())
    }

    fn stub_ungrab_pointer(&self) {}

    fn stub_grab_keyboard(&self, id: Xid) -> Result<()> {
        Ok(())
    }

    fn stub_ungrab_keyboard(&self) {}

    fn stub_grab_server(&self) {}

    fn stub_ungrab_server(&self) {}

    fn stub_set_shape(&self, id: Xid, rects: &[Rect]) -> Result<()> {
        Ok(())
    }

    fn stub_draw_outline(&self, r: Rect) -> Result<()> {
        Ok(())
    }

    fn stub_clear_outline(&self) -> Result<()> {
        Ok(())
    }

    fn stub_selection_owner(&self, selection: &str) -> Result<Option<Xid>> {
        Ok(None)
    }

    fn stub_acquire_selection(&self, owner: Xid, selection: &str) -> Result<()> {
        Ok(())
    }
}

impl<T> XConn for T
where
    T: StubXConn,
{
    fn root(&self) -> Xid {
        self.stub_root()
    }

    fn screen_details(&self) -> Result<Vec<Rect>> {
        self.stub_screen_details()
    }

    fn cursor_position(&self) -> Result<Point> {
        self.stub_cursor_position()
    }

    fn connection_fd(&self) -> RawFd {
        self.stub_connection_fd()
    }

    fn next_event(&self) -> Result<XEvent> {
        self.stub_next_event()
    }

    fn poll_event(&self) -> Result<Option<XEvent>> {
        self.stub_poll_event()
    }

    fn flush(&self) {
        self.stub_flush()
    }

    fn intern_atom(&self, atom: &str) -> Result<Xid> {
        self.stub_intern_atom(atom)
    }

    fn atom_name(&self, xid: Xid) -> Result<String> {
        self.stub_atom_name(xid)
    }

    fn create_window(&self, ty: WinType, r: Rect, managed: bool) -> Result<Xid> {
        self.stub_create_window(ty, r, managed)
    }

    fn destroy_window(&self, id: Xid) -> Result<()> {
        self.stub_destroy_window(id)
    }

    fn reparent(&self, id: Xid, parent: Xid, at: Point) -> Result<()> {
        self.stub_reparent(id, parent, at)
    }

    fn map(&self, id: Xid) -> Result<()> {
        self.stub_map(id)
    }

    fn unmap(&self, id: Xid) -> Result<()> {
        self.stub_unmap(id)
    }

    fn kill(&self, id: Xid) -> Result<()> {
        self.stub_kill(id)
    }

    fn focus(&self, id: Xid) -> Result<()> {
        self.stub_focus(id)
    }

    fn client_geometry(&self, id: Xid) -> Result<Rect> {
        self.stub_client_geometry(id)
    }

    fn existing_clients(&self) -> Result<Vec<Xid>> {
        self.stub_existing_clients()
    }

    fn get_prop(&self, id: Xid, prop_name: &str) -> Result<Option<Prop>> {
        self.stub_get_prop(id, prop_name)
    }

    fn list_props(&self, id: Xid) -> Result<Vec<String>> {
        self.stub_list_props(id)
    }

    fn get_wm_state(&self, id: Xid) -> Result<Option<WmState>> {
        self.stub_get_wm_state(id)
    }

    fn get_window_attributes(&self, id: Xid) -> Result<WindowAttributes> {
        self.stub_get_window_attributes(id)
    }

    fn set_wm_state(&self, id: Xid, wm_state: WmState) -> Result<()> {
        self.stub_set_wm_state(id, wm_state)
    }

    fn set_prop(&self, id: Xid, name: &str, val: Prop) -> Result<()> {
        self.stub_set_prop(id, name, val)
    }

    fn delete_prop(&self, id: Xid, prop_name: &str) -> Result<()> {
        self.stub_delete_prop(id, prop_name)
    }

    fn set_client_attributes(&self, id: Xid, attrs: &[ClientAttr]) -> Result<()> {
        self.stub_set_client_attributes(id, attrs)
    }

    fn set_client_config(&self, id: Xid, data: &[ClientConfig]) -> Result<()> {
        self.stub_set_client_config(id, data)
    }

    fn send_client_message(&self, msg: ClientMessage) -> Result<()> {
        self.stub_send_client_message(msg)
    }

    fn warp_pointer(&self, id: Xid, x: i16, y: i16) -> Result<()> {
        self.stub_warp_pointer(id, x, y)
    }

    fn grab_keys(&self, key_codes: &[KeyCode]) -> Result<()> {
        self.stub_grab_keys(key_codes)
    }

    fn grab_buttons(&self, id: Xid, states: &[MouseState]) -> Result<()> {
        self.stub_grab_buttons(id, states)
    }

    fn grab_pointer(&self, id: Xid) -> Result<()> {
        self.stub_grab_pointer(id)
    }

    fn ungrab_pointer(&self) {
        self.stub_ungrab_pointer()
    }

    fn grab_keyboard(&self, id: Xid) -> Result<()> {
        self.stub_grab_keyboard(id)
    }

    fn ungrab_keyboard(&self) {
        self.stub_ungrab_keyboard()
    }

    fn grab_server(&self) {
        self.stub_grab_server()
    }

    fn ungrab_server(&self) {
        self.stub_ungrab_server()
    }

    fn set_shape(&self, id: Xid, rects: &[Rect]) -> Result<()> {
        self.stub_set_shape(id, rects)
    }

    fn draw_outline(&self, r: Rect) -> Result<()> {
        self.stub_draw_outline(r)
    }

    fn clear_outline(&self) -> Result<()> {
        self.stub_clear_outline()
    }

    fn selection_owner(&self, selection: &str) -> Result<Option<Xid>> {
        self.stub_selection_owner(selection)
    }

    fn acquire_selection(&self, owner: Xid, selection: &str) -> Result<()> {
        self.stub_acquire_selection(owner, selection)
    }
}
