//! The shared stacking layer enumeration
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The stacking layer of a mapped object.
///
/// Every stackable object (frame, dock app, menu, edge window, dialog)
/// carries a layer; the global stacking order is strictly layer-major with
/// insertion order breaking ties inside a layer.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    /// Desktop windows, always at the very bottom
    Desktop,
    /// Below normal windows
    Below,
    /// The default layer for client frames
    #[default]
    Normal,
    /// Dock apps and panels
    Dock,
    /// Above normal windows
    Above,
    /// Menus
    Menu,
    /// Always-on-top windows
    OnTop,
    /// Fullscreen windows
    Fullscreen,
    /// Critical dialogs, always at the very top
    CriticalDialog,
}

impl Layer {
    /// The layer directly above this one, saturating at the top.
    pub fn raised(self) -> Layer {
        use Layer::*;

        match self {
            Desktop => Below,
            Below => Normal,
            Normal => Dock,
            Dock => Above,
            Above => Menu,
            Menu => OnTop,
            OnTop => Fullscreen,
            Fullscreen => CriticalDialog,
            CriticalDialog => CriticalDialog,
        }
    }

    /// The layer directly below this one, saturating at the bottom.
    pub fn lowered(self) -> Layer {
        use Layer::*;

        match self {
            Desktop => Desktop,
            Below => Desktop,
            Normal => Below,
            Dock => Normal,
            Above => Dock,
            Menu => Above,
            OnTop => Menu,
            Fullscreen => OnTop,
            CriticalDialog => Fullscreen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_order_is_total() {
        use Layer::*;

        let layers = [
            Desktop,
            Below,
            Normal,
            Dock,
            Above,
            Menu,
            OnTop,
            Fullscreen,
            CriticalDialog,
        ];

        for pair in layers.windows(2) {
            assert!(pair[0] < pair[1], "{:?} < {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn raise_lower_round_trip() {
        assert_eq!(Layer::Normal.raised().lowered(), Layer::Normal);
        assert_eq!(Layer::CriticalDialog.raised(), Layer::CriticalDialog);
        assert_eq!(Layer::Desktop.lowered(), Layer::Desktop);
    }
}
