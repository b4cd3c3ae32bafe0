//! Workspace membership, last-focused tracking and the back-and-forth policy
use crate::{frame::FrameId, pure::placement::PlacementModel};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single virtual workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// Display name, from the EWMH desktop names property or "1", "2", ...
    pub name: String,
    /// Position of this workspace in the workspace set
    pub index: usize,
    /// The frame that last held focus while this workspace was active.
    ///
    /// A weak reference: it is resolved through the current object map on
    /// re-entry and used only if the frame is still mapped and focusable.
    pub last_focused: Option<FrameId>,
    /// Per-workspace placement strategy override
    pub layout: Option<Vec<PlacementModel>>,
}

impl Workspace {
    fn new(index: usize, name: String) -> Self {
        Self {
            name,
            index,
            last_focused: None,
            layout: None,
        }
    }
}

/// A completed workspace switch.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Switch {
    /// The workspace that was active before the switch
    pub from: usize,
    /// The workspace that is active after the switch
    pub to: usize,
}

/// The workspace set: membership metadata, the active / previous indices and
/// the MRU focus-recovery list.
///
/// Mapping and unmapping of windows on a switch is carried out by the owner
/// of the object model; this type only decides what the switch is.
#[derive(Debug, Clone)]
pub struct Workspaces {
    workspaces: Vec<Workspace>,
    names: Vec<String>,
    active: usize,
    previous: usize,
    back_and_forth: bool,
    mru: Vec<FrameId>,
}

impl Workspaces {
    /// Create a workspace set of the given size.
    ///
    /// `names` provides display names for the leading workspaces; workspaces
    /// beyond the configured names get "1", "2", ... defaults.
    pub fn new(size: i32, names: Vec<String>, back_and_forth: bool) -> Self {
        let mut ws = Self {
            workspaces: Vec::new(),
            names,
            active: 0,
            previous: 0,
            back_and_forth,
            mru: Vec::new(),
        };
        ws.set_size(size);

        ws
    }

    fn name_for(&self, index: usize) -> String {
        self.names
            .get(index)
            .cloned()
            .unwrap_or_else(|| (index + 1).to_string())
    }

    /// Number of workspaces in the set. Always at least 1.
    pub fn len(&self) -> usize {
        self.workspaces.len()
    }

    /// Workspace sets are never empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Index of the active workspace.
    pub fn active(&self) -> usize {
        self.active
    }

    /// Index of the workspace that was active before the last switch.
    pub fn previous(&self) -> usize {
        self.previous
    }

    /// The workspace at `index`, if it exists.
    pub fn get(&self, index: usize) -> Option<&Workspace> {
        self.workspaces.get(index)
    }

    /// Mutable access to the workspace at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Workspace> {
        self.workspaces.get_mut(index)
    }

    /// Iterate over all workspaces in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Workspace> {
        self.workspaces.iter()
    }

    /// Replace the configured display names and re-derive workspace names.
    pub fn set_names(&mut self, names: Vec<String>) {
        self.names = names;
        for i in 0..self.workspaces.len() {
            self.workspaces[i].name = self.name_for(i);
        }
    }

    /// Resize the workspace set, returning true iff the size changed.
    ///
    /// `n <= 0` is coerced to 1. Growth appends workspaces with configured or
    /// default names. Shrinking keeps the active index valid by clamping it;
    /// callers relocate windows from dropped workspaces to the highest
    /// remaining one.
    pub fn set_size(&mut self, n: i32) -> bool {
        let n = n.max(1) as usize;
        if n == self.workspaces.len() {
            return false;
        }

        while self.workspaces.len() > n {
            self.workspaces.pop();
        }
        while self.workspaces.len() < n {
            let i = self.workspaces.len();
            self.workspaces.push(Workspace::new(i, self.name_for(i)));
        }

        self.active = self.active.min(n - 1);
        self.previous = self.previous.min(n - 1);

        true
    }

    /// Whether re-selecting the active workspace switches to the previous one.
    pub fn back_and_forth(&self) -> bool {
        self.back_and_forth
    }

    /// Enable or disable the back-and-forth policy.
    pub fn set_back_and_forth(&mut self, enabled: bool) {
        self.back_and_forth = enabled;
    }

    /// Decide a switch to workspace `n`.
    ///
    /// Selecting the active workspace switches to the previously active one
    /// when back-and-forth is enabled and is a no-op otherwise. Out-of-range
    /// requests never switch. `None` means nothing changed.
    pub fn switch_to(&mut self, n: usize) -> Option<Switch> {
        if n >= self.workspaces.len() {
            return None;
        }

        let target = if n == self.active {
            if !self.back_and_forth || self.previous == self.active {
                return None;
            }
            self.previous
        } else {
            n
        };

        let s = Switch {
            from: self.active,
            to: target,
        };
        self.previous = self.active;
        self.active = target;

        Some(s)
    }

    /// Record the frame that held focus on workspace `ws`.
    pub fn set_last_focused(&mut self, ws: usize, frame: Option<FrameId>) {
        if let Some(w) = self.workspaces.get_mut(ws) {
            w.last_focused = frame;
        }
    }

    /// The recorded last-focused frame for workspace `ws`.
    pub fn last_focused(&self, ws: usize) -> Option<FrameId> {
        self.workspaces.get(ws).and_then(|w| w.last_focused)
    }

    /// Drop `frame` from every per-workspace and MRU record.
    ///
    /// Called on frame destruction so that stale ids are never handed out.
    pub fn forget_frame(&mut self, frame: FrameId) {
        for w in self.workspaces.iter_mut() {
            if w.last_focused == Some(frame) {
                w.last_focused = None;
            }
        }
        self.mru.retain(|&f| f != frame);
    }

    /// Promote `frame` to the front of the MRU focus list.
    ///
    /// Objects carrying `SKIP_FOCUS_TOGGLE` must not be promoted; that
    /// filtering happens at the call site where flags are known.
    pub fn mru_promote(&mut self, frame: FrameId) {
        self.mru.retain(|&f| f != frame);
        self.mru.insert(0, frame);
    }

    /// Most-recently-used first iteration of the focus recovery list.
    pub fn mru_iter(&self) -> impl Iterator<Item = FrameId> + '_ {
        self.mru.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    fn fixture(size: i32, back_and_forth: bool) -> Workspaces {
        Workspaces::new(size, vec![], back_and_forth)
    }

    #[test]
    fn back_and_forth_reselect_goes_to_previous() {
        let mut ws = fixture(4, true);
        assert_eq!(ws.active(), 0);

        assert_eq!(ws.switch_to(1), Some(Switch { from: 0, to: 1 }));
        assert_eq!(ws.active(), 1);

        // re-selecting the active workspace returns to the previous one
        assert_eq!(ws.switch_to(1), Some(Switch { from: 1, to: 0 }));
        assert_eq!(ws.active(), 0);

        assert_eq!(ws.switch_to(1), Some(Switch { from: 0, to: 1 }));
        assert_eq!(ws.switch_to(3), Some(Switch { from: 1, to: 3 }));
        assert_eq!(ws.active(), 3);

        assert_eq!(ws.switch_to(3), Some(Switch { from: 3, to: 1 }));
        assert_eq!(ws.active(), 1);
    }

    #[test]
    fn reselect_without_back_and_forth_is_noop() {
        let mut ws = fixture(4, false);
        ws.switch_to(2);

        assert_eq!(ws.switch_to(2), None);
        assert_eq!(ws.active(), 2);
    }

    #[test_case(4, 4; "at size")]
    #[test_case(4, 10; "past size")]
    #[test]
    fn out_of_range_switch_is_rejected(size: i32, target: usize) {
        let mut ws = fixture(size, true);
        ws.switch_to(1);

        assert_eq!(ws.switch_to(target), None);
        assert_eq!(ws.active(), 1);
    }

    #[test]
    fn set_size_zero_coerces_to_one() {
        let mut ws = fixture(4, false);

        assert!(ws.set_size(0));
        assert_eq!(ws.len(), 1);
        assert_eq!(ws.active(), 0);
        assert_eq!(ws.previous(), 0);
    }

    #[test]
    fn set_size_growth_uses_default_names() {
        let mut ws = fixture(1, false);

        assert!(ws.set_size(4));
        let names: Vec<&str> = ws.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn set_size_growth_prefers_configured_names() {
        let mut ws = Workspaces::new(1, vec!["mail".into(), "web".into()], false);

        ws.set_size(3);
        let names: Vec<&str> = ws.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["mail", "web", "3"]);
    }

    #[test]
    fn set_size_same_returns_false() {
        let mut ws = fixture(1, false);

        assert!(ws.set_size(4));
        assert!(!ws.set_size(4));
        assert_eq!(ws.len(), 4);
    }

    #[test]
    fn mru_promote_is_front_and_dedups() {
        let mut ws = fixture(1, false);
        ws.mru_promote(FrameId(1));
        ws.mru_promote(FrameId(2));
        ws.mru_promote(FrameId(1));

        let order: Vec<FrameId> = ws.mru_iter().collect();
        assert_eq!(order, vec![FrameId(1), FrameId(2)]);
    }

    #[test]
    fn forget_frame_clears_all_records() {
        let mut ws = fixture(2, false);
        ws.set_last_focused(1, Some(FrameId(7)));
        ws.mru_promote(FrameId(7));

        ws.forget_frame(FrameId(7));

        assert_eq!(ws.last_focused(1), None);
        assert_eq!(ws.mru_iter().count(), 0);
    }
}
