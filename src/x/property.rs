//! Data types for working with X window properties
use crate::{pure::geometry::Rect, Xid};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Known property types that can be queried from the X server.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Prop {
    /// One or more atom names
    Atom(Vec<String>),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// One or more cardinal values
    Cardinal(Vec<u32>),
    /// UTF-8 encoded string data
    UTF8String(Vec<String>),
    /// One or more window ids
    Window(Vec<Xid>),
    /// The ICCCM WM_HINTS property
    WmHints(WmHints),
    /// The ICCCM WM_NORMAL_HINTS property
    WmNormalHints(WmNormalHints),
}

/// The ICCCM defined window states.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WmState {
    /// Window is not visible on any workspace
    Withdrawn,
    /// Window is visible
    Normal,
    /// Window is iconified
    Iconic,
}

impl From<WmState> for u32 {
    fn from(s: WmState) -> u32 {
        match s {
            WmState::Withdrawn => 0,
            WmState::Normal => 1,
            WmState::Iconic => 3,
        }
    }
}

impl TryFrom<u32> for WmState {
    type Error = crate::Error;

    fn try_from(raw: u32) -> crate::Result<Self> {
        match raw {
            0 => Ok(WmState::Withdrawn),
            1 => Ok(WmState::Normal),
            3 => Ok(WmState::Iconic),
            n => Err(crate::Error::InvalidHints(format!("WM_STATE = {n}"))),
        }
    }
}

/// Client requested hints about information other than window geometry.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WmHints {
    /// Does the client accept keyboard input?
    pub accepts_input: bool,
    /// The state the window should start in
    pub initial_state: WmState,
    /// A window to use as an icon, the dock-app convention
    pub icon_window: Option<Xid>,
    /// A pixmap to use as an icon
    pub icon_pixmap: Option<Xid>,
    /// The leader of the window group this client belongs to
    pub window_group: Option<Xid>,
    /// Set when the client demands the user's attention
    pub urgent: bool,
}

impl Default for WmHints {
    fn default() -> Self {
        Self {
            accepts_input: true,
            initial_state: WmState::Normal,
            icon_window: None,
            icon_pixmap: None,
            window_group: None,
            urgent: false,
        }
    }
}

impl WmHints {
    /// A window following the dock-app convention: initial state Withdrawn
    /// with an icon window set.
    pub fn is_dock_app(&self) -> bool {
        self.initial_state == WmState::Withdrawn && self.icon_window.is_some()
    }
}

/// Client requested hints about window geometry.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct WmNormalHints {
    /// The minimum (width, height) for this client
    pub min: Option<(u32, u32)>,
    /// The maximum (width, height) for this client
    pub max: Option<(u32, u32)>,
    /// The base (width, height) for this client
    pub base: Option<(u32, u32)>,
    /// The (width, height) resize increments for this client
    pub increment: Option<(u32, u32)>,
    /// The (min, max) aspect ratios for this client
    pub aspect: Option<(f64, f64)>,
}

impl WmNormalHints {
    /// Constrain `r` to these hints: clamp to min / max, snap width and
    /// height down to the nearest increment above base.
    pub fn apply_to(&self, r: Rect) -> Rect {
        let (mut w, mut h) = (r.w, r.h);

        if let Some((min_w, min_h)) = self.min {
            w = w.max(min_w);
            h = h.max(min_h);
        }
        if let Some((max_w, max_h)) = self.max {
            w = w.min(max_w);
            h = h.min(max_h);
        }
        if let Some((inc_w, inc_h)) = self.increment {
            let (base_w, base_h) = self.base.unwrap_or(self.min.unwrap_or((0, 0)));
            if inc_w > 0 && w > base_w {
                w = base_w + ((w - base_w) / inc_w) * inc_w;
            }
            if inc_h > 0 && h > base_h {
                h = base_h + ((h - base_h) / inc_h) * inc_h;
            }
        }

        r.sized(w, h)
    }
}

/// The input focus model requested by a client.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapState {
    /// The window is unmapped
    Unmapped,
    /// The window is unviewable
    UnViewable,
    /// The window is viewable
    Viewable,
}

/// Attributes of a client window as reported by the X server.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowAttributes {
    /// Whether the window bypasses the window manager
    pub override_redirect: bool,
    /// Current map state
    pub map_state: MapState,
}

impl WindowAttributes {
    /// Create a new [WindowAttributes].
    pub fn new(override_redirect: bool, map_state: MapState) -> Self {
        Self {
            override_redirect,
            map_state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    #[test_case(
        WmNormalHints { min: Some((100, 50)), ..Default::default() },
        Rect::new(0, 0, 40, 40),
        Rect::new(0, 0, 100, 50);
        "clamps to min"
    )]
    #[test_case(
        WmNormalHints { max: Some((300, 200)), ..Default::default() },
        Rect::new(0, 0, 500, 500),
        Rect::new(0, 0, 300, 200);
        "clamps to max"
    )]
    #[test_case(
        WmNormalHints {
            base: Some((10, 10)),
            increment: Some((7, 13)),
            ..Default::default()
        },
        Rect::new(0, 0, 100, 100),
        Rect::new(0, 0, 94, 88);
        "snaps to increments over base"
    )]
    #[test_case(WmNormalHints::default(), Rect::new(5, 5, 60, 60), Rect::new(5, 5, 60, 60); "no hints")]
    #[test]
    fn apply_to(hints: WmNormalHints, r: Rect, expected: Rect) {
        assert_eq!(hints.apply_to(r), expected);
    }

    #[test]
    fn wm_state_round_trips() {
        for state in [WmState::Withdrawn, WmState::Normal, WmState::Iconic] {
            assert_eq!(WmState::try_from(u32::from(state)).unwrap(), state);
        }
        assert!(WmState::try_from(2).is_err());
    }

    #[test]
    fn dock_app_detection() {
        let plain = WmHints::default();
        assert!(!plain.is_dock_app());

        let dock = WmHints {
            initial_state: WmState::Withdrawn,
            icon_window: Some(Xid(5)),
            ..Default::default()
        };
        assert!(dock.is_dock_app());

        let withdrawn_only = WmHints {
            initial_state: WmState::Withdrawn,
            ..Default::default()
        };
        assert!(!withdrawn_only.is_dock_app());
    }
}
