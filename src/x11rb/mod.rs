//! Helpers and utilities for using x11rb as a back end for quay
use crate::x::Atom;

pub mod conversions;
pub mod xconn;

pub use xconn::X11rbConn;

/// Result type for fallible methods using x11rb
pub type Result<T> = std::result::Result<T, BackendError>;

/// Enum to store the various ways that operations can fail inside of the
/// x11rb implementation of the quay X traits.
#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    /// Unable to establish a connection to the X server
    #[error(transparent)]
    Connect(#[from] ::x11rb::errors::ConnectError),

    /// The X11 connection broke
    #[error(transparent)]
    Connection(#[from] ::x11rb::errors::ConnectionError),

    /// Could not get X11 request reply
    #[error(transparent)]
    ReplyError(#[from] ::x11rb::errors::ReplyError),

    /// Could not get X11 request reply or could not generate_id()
    #[error(transparent)]
    ReplyOrIdError(#[from] ::x11rb::errors::ReplyOrIdError),

    /// A requested client property was empty
    #[error("'{}' prop is not set for client {1}", .0.as_ref())]
    MissingProp(Atom, crate::Xid),

    /// The X server rejected an active grab
    #[error("the X server denied the {0} grab")]
    GrabDenied(&'static str),
}
