//! User defined key / mouse bindings and input-event normalization
use crate::{core::actions::Action, Xid};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::EnumIter;

/// A u16 X key-code bitmask
pub type KeyCodeMask = u16;

/// A u8 X key-code enum value
pub type KeyCodeValue = u8;

// X modifier mask bits that never carry binding meaning: caps lock, num
// lock, scroll lock and the keyboard layout group bits (13-14).
const IGNORED_MASK: KeyCodeMask = 0x0002 | 0x0010 | 0x0020 | (1 << 13) | (1 << 14);

// Button1Mask..Button5Mask, stripped from motion events after the held
// button has been recorded.
const BUTTON_MASK: KeyCodeMask = 0x1f00;

/// Strip modifier bits that are not semantic for binding lookup.
pub fn strip_modifiers(mask: KeyCodeMask) -> KeyCodeMask {
    mask & !IGNORED_MASK
}

/// Strip non-semantic modifiers and all button-held bits (motion events).
pub fn strip_modifiers_and_buttons(mask: KeyCodeMask) -> KeyCodeMask {
    mask & !(IGNORED_MASK | BUTTON_MASK)
}

/// A key press and held modifiers
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KeyCode {
    /// The held modifier mask
    pub mask: KeyCodeMask,
    /// The key code that was held
    pub code: KeyCodeValue,
}

impl KeyCode {
    /// Create a new [KeyCode] from this one that removes the given mask
    pub fn ignoring_modifier(&self, mask: KeyCodeMask) -> KeyCode {
        KeyCode {
            mask: self.mask & !mask,
            code: self.code,
        }
    }

    /// This [KeyCode] with all non-semantic modifier bits removed.
    pub fn normalized(&self) -> KeyCode {
        KeyCode {
            mask: strip_modifiers(self.mask),
            code: self.code,
        }
    }
}

/// Known mouse buttons for binding actions
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MouseButton {
    /// 1
    Left,
    /// 2
    Middle,
    /// 3
    Right,
    /// 4
    ScrollUp,
    /// 5
    ScrollDown,
}

impl From<MouseButton> for u8 {
    fn from(b: MouseButton) -> u8 {
        match b {
            MouseButton::Left => 1,
            MouseButton::Middle => 2,
            MouseButton::Right => 3,
            MouseButton::ScrollUp => 4,
            MouseButton::ScrollDown => 5,
        }
    }
}

impl MouseButton {
    /// Map a raw X button detail to a known button.
    pub fn from_detail(detail: u8) -> Option<Self> {
        match detail {
            1 => Some(Self::Left),
            2 => Some(Self::Middle),
            3 => Some(Self::Right),
            4 => Some(Self::ScrollUp),
            5 => Some(Self::ScrollDown),
            _ => None,
        }
    }
}

/// Known modifier keys for bindings
#[derive(Debug, EnumIter, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ModifierKey {
    /// Control
    Ctrl,
    /// Alt
    Alt,
    /// Shift
    Shift,
    /// Meta / super / windows
    Meta,
}

impl ModifierKey {
    /// The X modifier mask bit for this key.
    pub fn mask(&self) -> KeyCodeMask {
        match self {
            ModifierKey::Shift => 1 << 0,
            ModifierKey::Ctrl => 1 << 2,
            ModifierKey::Alt => 1 << 3,
            ModifierKey::Meta => 1 << 6,
        }
    }
}

impl TryFrom<&str> for ModifierKey {
    type Error = crate::Error;

    fn try_from(s: &str) -> crate::Result<Self> {
        match s {
            "C" => Ok(Self::Ctrl),
            "A" => Ok(Self::Alt),
            "S" => Ok(Self::Shift),
            "M" => Ok(Self::Meta),
            _ => Err(crate::Error::Raw(format!("unknown modifier: {s}"))),
        }
    }
}

/// A mouse state specification indicating the button and modifiers held
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MouseState {
    /// The [MouseButton] being held
    pub button: MouseButton,
    /// The normalized modifier mask being held
    pub mask: KeyCodeMask,
}

impl MouseState {
    /// Construct a new MouseState from a button and a list of modifiers.
    pub fn new(button: MouseButton, modifiers: &[ModifierKey]) -> Self {
        let mask = modifiers.iter().fold(0, |acc, m| acc | m.mask());
        Self { button, mask }
    }
}

/// The kind of a mouse event after normalization
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MouseEventKind {
    /// A button was pressed
    Press,
    /// A button was released
    Release,
    /// A release promoted by the double-click detector
    DoubleClick,
    /// The mouse was moved while a button was held
    Motion,
}

/// A mouse movement or button event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MouseEvent {
    /// The ID of the window that contained the event
    pub id: Xid,
    /// Absolute x coordinate of the event
    pub rx: i32,
    /// Absolute y coordinate of the event
    pub ry: i32,
    /// x coordinate relative to the top-left of the window itself
    pub ex: i32,
    /// y coordinate relative to the top-left of the window itself
    pub ey: i32,
    /// The raw modifier mask that was received
    pub mask: KeyCodeMask,
    /// The button involved, if any
    pub button: Option<MouseButton>,
    /// Was this press, release or motion?
    pub kind: MouseEventKind,
    /// X server timestamp in milliseconds
    pub time: u32,
}

impl MouseEvent {
    /// The normalized modifier mask for binding lookup.
    ///
    /// Motion events additionally strip the button-held bits after the held
    /// button itself has been recorded in [MouseEvent::button].
    pub fn normalized_mask(&self) -> KeyCodeMask {
        match self.kind {
            MouseEventKind::Motion => strip_modifiers_and_buttons(self.mask),
            _ => strip_modifiers(self.mask),
        }
    }
}

/// The window kinds that carry their own action lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BindingScope {
    /// The root window
    Root,
    /// The client content window
    Client,
    /// The frame window outside of title and border
    Frame,
    /// The titlebar
    Title,
    /// The frame border
    Border,
    /// Menu windows
    Menu,
    /// Screen edge zones
    Edge,
}

/// A mouse binding: fires when the normalized `(button, mask, kind)` triple
/// of an event equals this binding's triple.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MouseBinding {
    /// The button that triggers this binding
    pub state: MouseState,
    /// The event kind that triggers this binding
    pub kind: MouseEventKind,
    /// The action to run
    pub action: Action,
}

/// A key binding: fires on a normalized [KeyCode] match.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KeyBinding {
    /// The key and modifier mask that triggers this binding
    pub code: KeyCode,
    /// The action to run
    pub action: Action,
}

/// Per-scope mouse action lists plus the global key bindings.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bindings {
    /// Mouse bindings per window kind
    pub mouse: HashMap<BindingScope, Vec<MouseBinding>>,
    /// Grabbed key bindings
    pub keys: Vec<KeyBinding>,
}

impl Bindings {
    /// The first mouse binding in `scope` matching the normalized event.
    pub fn match_mouse(&self, scope: BindingScope, ev: &MouseEvent) -> Option<&Action> {
        let button = ev.button?;
        let mask = ev.normalized_mask();

        self.mouse.get(&scope).and_then(|bindings| {
            bindings
                .iter()
                .find(|b| b.state.button == button && b.state.mask == mask && b.kind == ev.kind)
                .map(|b| &b.action)
        })
    }

    /// The first key binding matching the normalized key code.
    pub fn match_key(&self, code: KeyCode) -> Option<&Action> {
        let code = code.normalized();

        self.keys
            .iter()
            .find(|b| b.code == code)
            .map(|b| &b.action)
    }
}

/// Per-window, per-button double-click detection.
///
/// A second release on the same window and button within the configured
/// interval promotes the event to a double click; the stored time is then
/// cleared so a third release starts a fresh cycle. An interval of 0
/// disables promotion entirely.
#[derive(Debug, Default)]
pub struct DoubleClickTracker {
    last_release: HashMap<(Xid, u8), u32>,
}

impl DoubleClickTracker {
    /// Record a button release, returning true when it completes a double
    /// click.
    pub fn on_release(&mut self, id: Xid, button: u8, time: u32, interval_ms: u32) -> bool {
        if interval_ms == 0 {
            return false;
        }

        match self.last_release.remove(&(id, button)) {
            Some(prev) if time.wrapping_sub(prev) <= interval_ms => true,
            _ => {
                self.last_release.insert((id, button), time);
                false
            }
        }
    }

    /// Drop any stored state for a destroyed window.
    pub fn forget(&mut self, id: Xid) {
        self.last_release.retain(|(w, _), _| *w != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    #[test_case(0x0002, 0x0000; "caps lock")]
    #[test_case(0x0010, 0x0000; "num lock")]
    #[test_case(0x0020, 0x0000; "scroll lock")]
    #[test_case(1 << 13, 0x0000; "layout bit 13")]
    #[test_case(0x0012 | (1 << 6), 1 << 6; "locks plus meta keeps meta")]
    #[test]
    fn modifier_stripping(raw: u16, expected: u16) {
        assert_eq!(strip_modifiers(raw), expected);
    }

    #[test]
    fn motion_stripping_removes_button_bits() {
        let raw = (1 << 8) | (1 << 10) | (1 << 2); // Button1 + Button3 + Ctrl
        assert_eq!(strip_modifiers_and_buttons(raw), 1 << 2);
    }

    fn release(id: u32, time: u32) -> (Xid, u8, u32) {
        (Xid(id), 1, time)
    }

    #[test]
    fn double_click_promotes_second_release() {
        let mut t = DoubleClickTracker::default();
        let (id, b, _) = release(1, 0);

        assert!(!t.on_release(id, b, 1000, 250));
        assert!(t.on_release(id, b, 1200, 250));
    }

    #[test]
    fn double_click_state_clears_after_promotion() {
        let mut t = DoubleClickTracker::default();
        let (id, b, _) = release(1, 0);

        assert!(!t.on_release(id, b, 1000, 250));
        assert!(t.on_release(id, b, 1100, 250));
        // a third release starts over instead of re-triggering
        assert!(!t.on_release(id, b, 1200, 250));
    }

    #[test]
    fn double_click_respects_interval() {
        let mut t = DoubleClickTracker::default();
        let (id, b, _) = release(1, 0);

        assert!(!t.on_release(id, b, 1000, 250));
        assert!(!t.on_release(id, b, 1500, 250));
    }

    #[test]
    fn double_click_zero_interval_disables() {
        let mut t = DoubleClickTracker::default();
        let (id, b, _) = release(1, 0);

        assert!(!t.on_release(id, b, 1000, 0));
        assert!(!t.on_release(id, b, 1000, 0));
    }

    #[test]
    fn double_click_is_per_window_and_button() {
        let mut t = DoubleClickTracker::default();

        assert!(!t.on_release(Xid(1), 1, 1000, 250));
        assert!(!t.on_release(Xid(2), 1, 1050, 250));
        assert!(!t.on_release(Xid(1), 3, 1100, 250));
        assert!(t.on_release(Xid(1), 1, 1150, 250));
    }

    #[test]
    fn mouse_binding_lookup_matches_triple() {
        use crate::core::actions::Action;

        let mut bindings = Bindings::default();
        bindings.mouse.insert(
            BindingScope::Title,
            vec![
                MouseBinding {
                    state: MouseState::new(MouseButton::Left, &[]),
                    kind: MouseEventKind::DoubleClick,
                    action: Action::ToggleShaded,
                },
                MouseBinding {
                    state: MouseState::new(MouseButton::Left, &[]),
                    kind: MouseEventKind::Press,
                    action: Action::Raise,
                },
            ],
        );

        let ev = MouseEvent {
            id: Xid(1),
            rx: 0,
            ry: 0,
            ex: 0,
            ey: 0,
            mask: 0x0010, // num lock held
            button: Some(MouseButton::Left),
            kind: MouseEventKind::Press,
            time: 0,
        };

        assert!(matches!(
            bindings.match_mouse(BindingScope::Title, &ev),
            Some(Action::Raise)
        ));
        assert!(bindings.match_mouse(BindingScope::Root, &ev).is_none());
    }
}
