//! Hidden manager windows: EWMH hint exchange and the WM_Sn manager
//! selection used for window manager replacement.
use crate::{
    pure::geometry::Rect,
    x::{
        event::{ClientEventMask, ClientMessage},
        Atom, Prop, WinType, XConn, EWMH_SUPPORTED_ATOMS,
    },
    Error, Result, Xid,
};
use std::{
    thread::sleep,
    time::{Duration, Instant},
};
use tracing::{debug, info};

const WM_NAME: &str = "quay";

/// How long a replacement handshake waits for the previous owner to exit.
pub const REPLACE_TIMEOUT: Duration = Duration::from_secs(5);

/// The hidden window advertising EWMH support on the root window.
#[derive(Debug, Clone, Copy)]
pub struct HintWindow {
    /// The check window itself
    pub window: Xid,
}

impl HintWindow {
    /// Create the check window and publish `_NET_SUPPORTING_WM_CHECK` plus
    /// `_NET_SUPPORTED` on the root window.
    pub fn create<X: XConn>(x: &X, root: Xid) -> Result<Self> {
        let window = x.create_window(WinType::CheckWin, Rect::new(-200, -200, 5, 5), false)?;

        x.set_prop(
            window,
            Atom::NetSupportingWmCheck.as_ref(),
            Prop::Window(vec![window]),
        )?;
        x.set_prop(
            window,
            Atom::NetWmName.as_ref(),
            Prop::UTF8String(vec![WM_NAME.to_string()]),
        )?;
        x.set_prop(
            root,
            Atom::NetSupportingWmCheck.as_ref(),
            Prop::Window(vec![window]),
        )?;

        let supported: Vec<String> = EWMH_SUPPORTED_ATOMS
            .iter()
            .map(|a| a.as_ref().to_string())
            .collect();
        x.set_prop(root, Atom::NetSupported.as_ref(), Prop::Atom(supported))?;

        Ok(Self { window })
    }

    /// Tear down the root properties on shutdown.
    pub fn destroy<X: XConn>(&self, x: &X, root: Xid) -> Result<()> {
        x.delete_prop(root, Atom::NetSupportingWmCheck.as_ref())?;
        x.delete_prop(root, Atom::NetSupported.as_ref())?;
        x.destroy_window(self.window)
    }
}

/// Claim the `WM_Sn` manager selection for this screen.
///
/// When another manager owns the selection this fails unless `replace` was
/// requested, in which case the selection is taken over and we wait a
/// bounded interval for the previous owner's window to disappear. The
/// previous manager sees a SelectionClear and is expected to exit; a
/// successful acquisition is announced with a MANAGER client message on the
/// root window.
pub fn acquire_manager_selection<X: XConn>(
    x: &X,
    root: Xid,
    owner: Xid,
    screen: usize,
    replace: bool,
    timeout: Duration,
) -> Result<()> {
    let selection = format!("WM_S{screen}");
    let previous = x.selection_owner(&selection)?;

    match previous {
        Some(prev) if !replace => {
            debug!(%prev, %selection, "selection already owned");
            Err(Error::WmAlreadyRunning(
                "another window manager owns the screen (try --replace)",
            ))
        }
        Some(prev) => {
            info!(%prev, %selection, "replacing the running window manager");
            x.acquire_selection(owner, &selection)?;

            if x.selection_owner(&selection)? != Some(owner) {
                return Err(Error::WmAlreadyRunning("unable to take the selection"));
            }

            // wait for the previous owner to wind down and destroy its
            // selection window
            let deadline = Instant::now() + timeout;
            while x.get_window_attributes(prev).is_ok() {
                if Instant::now() >= deadline {
                    return Err(Error::WmAlreadyRunning(
                        "previous owner did not exit within the handshake timeout",
                    ));
                }
                sleep(Duration::from_millis(50));
            }

            announce(x, root, owner, &selection)
        }
        None => {
            x.acquire_selection(owner, &selection)?;

            if x.selection_owner(&selection)? != Some(owner) {
                return Err(Error::WmAlreadyRunning("unable to take the selection"));
            }

            announce(x, root, owner, &selection)
        }
    }
}

fn announce<X: XConn>(x: &X, root: Xid, owner: Xid, selection: &str) -> Result<()> {
    let selection_atom = x.intern_atom(selection)?;
    let msg = ClientMessage::new(
        root,
        ClientEventMask::StructureNotify,
        Atom::Manager.as_ref(),
        [0u32, *selection_atom, *owner, 0, 0],
    );

    x.send_client_message(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::x::{
        property::{MapState, WindowAttributes},
        StubXConn,
    };
    use std::cell::{Cell, RefCell};

    // an X server where the selection is owned and the previous owner's
    // window disappears after a few attribute queries
    struct ReplaceConn {
        owner: Cell<Option<Xid>>,
        prev_alive_polls: Cell<u32>,
        announced: RefCell<Vec<String>>,
    }

    impl ReplaceConn {
        fn new(polls: u32) -> Self {
            Self {
                owner: Cell::new(Some(Xid(7))),
                prev_alive_polls: Cell::new(polls),
                announced: RefCell::new(vec![]),
            }
        }
    }

    impl StubXConn for ReplaceConn {
        fn stub_selection_owner(&self, _: &str) -> crate::Result<Option<Xid>> {
            Ok(self.owner.get())
        }

        fn stub_acquire_selection(&self, owner: Xid, _: &str) -> crate::Result<()> {
            self.owner.set(Some(owner));
            Ok(())
        }

        fn stub_get_window_attributes(&self, id: Xid) -> crate::Result<WindowAttributes> {
            if id == Xid(7) && self.prev_alive_polls.get() > 0 {
                self.prev_alive_polls.set(self.prev_alive_polls.get() - 1);
                Ok(WindowAttributes::new(false, MapState::Viewable))
            } else {
                Err(crate::Error::UnknownClient(id))
            }
        }

        fn stub_send_client_message(&self, msg: ClientMessage) -> crate::Result<()> {
            self.announced.borrow_mut().push(msg.dtype);
            Ok(())
        }
    }

    #[test]
    fn occupied_selection_without_replace_is_fatal() {
        let conn = ReplaceConn::new(0);

        let res = acquire_manager_selection(
            &conn,
            Xid(0),
            Xid(100),
            0,
            false,
            Duration::from_millis(100),
        );

        assert!(matches!(res, Err(Error::WmAlreadyRunning(_))));
    }

    #[test]
    fn replace_waits_for_previous_owner_then_announces() {
        let conn = ReplaceConn::new(2);

        acquire_manager_selection(
            &conn,
            Xid(0),
            Xid(100),
            0,
            true,
            Duration::from_secs(1),
        )
        .unwrap();

        assert_eq!(conn.owner.get(), Some(Xid(100)));
        assert_eq!(*conn.announced.borrow(), vec!["MANAGER".to_string()]);
    }

    #[test]
    fn replace_times_out_when_owner_stays() {
        let conn = ReplaceConn::new(u32::MAX);

        let res = acquire_manager_selection(
            &conn,
            Xid(0),
            Xid(100),
            0,
            true,
            Duration::from_millis(60),
        );

        assert!(matches!(res, Err(Error::WmAlreadyRunning(_))));
    }

    struct FreeConn {
        owner: Cell<Option<Xid>>,
    }

    impl StubXConn for FreeConn {
        fn stub_selection_owner(&self, _: &str) -> crate::Result<Option<Xid>> {
            Ok(self.owner.get())
        }

        fn stub_acquire_selection(&self, owner: Xid, _: &str) -> crate::Result<()> {
            self.owner.set(Some(owner));
            Ok(())
        }
    }

    #[test]
    fn free_selection_is_acquired_directly() {
        let conn = FreeConn {
            owner: Cell::new(None),
        };

        acquire_manager_selection(&conn, Xid(0), Xid(5), 0, false, REPLACE_TIMEOUT).unwrap();

        assert_eq!(conn.owner.get(), Some(Xid(5)));
    }
}
