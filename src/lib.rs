//! Quay: a stacking, reparenting window manager for X11
//!
//! Quay owns the life-cycle of every top-level window on a display:
//! discovering them, wrapping each one in a decorated [Frame][crate::frame::Frame],
//! arranging frames on virtual workspaces across one or more heads, routing
//! mouse / keyboard / screen-edge input into [Action][crate::core::actions::Action]s
//! and keeping a persistent, layer-major stacking order through focus changes,
//! workspace switches and hot-plug geometry updates.
//!
//! The crate is split along the same seam as the X protocol itself:
//!   * [pure] holds data structures that never talk to the X server and can
//!     be tested without one (geometry, struts, layers, the stacking list,
//!     workspaces, placement).
//!   * [x] defines the [XConn][crate::x::XConn] capability trait through which
//!     everything else reaches the display, with a real backend in [x11rb]
//!     and a scripted mock for tests.
//!   * the remaining modules are the window manager proper: the
//!     client / frame / decor object graph, the input dispatcher, the
//!     AutoProperties rule engine, the Harbour dock-app container and the
//!     panel variable sampler.
#![warn(
    clippy::complexity,
    clippy::correctness,
    clippy::style,
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    rust_2021_compatibility,
    unused
)]

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::ops::Deref;

pub mod autoprops;
pub mod client;
pub mod core;
pub mod ctrl;
pub mod decor;
pub mod frame;
pub mod harbour;
pub mod input;
pub mod managers;
pub mod panel;
pub mod pure;
pub mod util;
pub mod x;

#[cfg(feature = "x11rb")]
pub mod x11rb;

pub use crate::core::{Config, State, WindowManager};
pub use frame::FrameId;
pub use pure::geometry::{Point, Rect, Strut};
pub use pure::Layer;

/// An X11 ID for a given resource
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Default, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct Xid(pub(crate) u32);

impl std::fmt::Display for Xid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Deref for Xid {
    type Target = u32;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<u32> for Xid {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<Xid> for u32 {
    fn from(id: Xid) -> Self {
        id.0
    }
}

/// Error variants from the core window manager logic
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The underlying connection to the X server is closed
    #[error("The underlying connection to the X server is closed")]
    ConnectionClosed,

    /// A pointer / keyboard / server grab was denied by the X server
    #[error("unable to establish a {0} grab")]
    GrabDenied(&'static str),

    /// Data received in a client message had an invalid format
    #[error("Invalid client message format: {0} (expected 8, 16 or 32)")]
    InvalidClientMessageData(u8),

    /// A control message chunk carried an opcode outside of {0, 1, 2, 3}
    #[error("invalid control message opcode: {0}")]
    InvalidControlOpcode(u8),

    /// Wm(Normal)Hints received from the X server were invalid
    #[error("Invalid window hints property: {0}")]
    InvalidHints(String),

    /// A title rewrite rule was not of the form s/pattern/replacement/flags
    #[error("invalid title rewrite rule: {0}")]
    InvalidTitleRule(String),

    /// There is no decor profile registered under the `DEFAULT` name
    #[error("no DEFAULT decor profile: unable to continue")]
    MissingDefaultDecor,

    /// The requested property is not set for the given client
    #[error("The {0} property is not set for client {1}")]
    MissingProperty(String, Xid),

    /// An IO operation failed (subprocess plumbing, poll)
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Parsing a regex for an auto property matcher failed
    #[error(transparent)]
    Regex(#[from] regex::Error),

    /// A generic error type for use in user code when needing to construct
    /// a simple [Error].
    #[error("{0}")]
    Raw(String),

    /// An attempt was made to insert a client into a frame that no longer exists
    #[error("frame {0} has been destroyed")]
    StaleParent(FrameId),

    /// Parsing an [Atom][crate::x::Atom] from a str failed.
    ///
    /// This happens when the atom name being requested is not a known atom.
    #[error(transparent)]
    Strum(#[from] strum::ParseError),

    /// An attempt was made to reference a client that is not known to quay
    #[error("{0} is not a known client")]
    UnknownClient(Xid),

    /// An attempt was made to reference a frame that is not known to quay
    #[error("{0} is not a known frame")]
    UnknownFrame(FrameId),

    /// Another window manager holds the manager selection and --replace was
    /// not requested (or the previous owner failed to exit in time)
    #[error("another window manager is running: {0}")]
    WmAlreadyRunning(&'static str),

    /// An error was returned from the x11rb backend
    #[cfg(feature = "x11rb")]
    #[error(transparent)]
    X11rb(#[from] crate::x11rb::BackendError),
}

/// A Result where the error type is a quay [Error]
pub type Result<T> = std::result::Result<T, Error>;

#[doc(hidden)]
#[macro_export]
macro_rules! map {
    {} => { ::std::collections::HashMap::new() };
    { $($key:expr => $value:expr),+ $(,)? } => {
        {
            let mut _map = ::std::collections::HashMap::new();
            $(_map.insert($key, $value);)+
            _map
        }
    };
}
