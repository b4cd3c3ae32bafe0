//! Pure data structures for the window manager: everything in this module
//! can be constructed and tested without an X server.
pub mod geometry;
pub mod layer;
pub mod placement;
pub mod stacking;
pub mod workspaces;

pub use geometry::{head_nearest, Head, Point, Rect, Strut, StrutStore};
pub use layer::Layer;
pub use placement::{place, PlacementInput, PlacementModel};
pub use stacking::{StackEntry, StackingList};
pub use workspaces::{Switch, Workspace, Workspaces};
