//! The decorated container wrapping one or more client tabs
use crate::{
    client::Client,
    decor::{DecorLayout, DecorProfile},
    pure::{geometry::Rect, Layer},
    Xid,
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A stable numeric frame identifier, also reported over EWMH.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(pub(crate) u32);

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Allocates frame ids, reusing nothing so stale references can never
/// resolve to a new frame.
#[derive(Debug, Default, Clone)]
pub struct FrameIdGen {
    next: u32,
}

impl FrameIdGen {
    /// The next unused frame id.
    pub fn next(&mut self) -> FrameId {
        let id = FrameId(self.next);
        self.next += 1;
        id
    }
}

/// What happened to a frame when a client was removed from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The removed client was not a member
    NotAMember,
    /// A sibling tab was promoted to active
    Promoted(Xid),
    /// The active tab survived unchanged
    Kept,
    /// The last client left; the frame must be destroyed unless it is
    /// configured to remain empty
    Empty,
}

/// The decorated container: a non-empty ordered list of client tabs with
/// exactly one active, plus the decoration state derived from the active
/// client.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Stable id of this frame
    pub id: FrameId,
    /// The frame window created in the X server
    pub window: Xid,
    /// Outer geometry of the frame window
    pub geometry: Rect,
    /// The client tabs, in titlebar order
    clients: Vec<Xid>,
    active: usize,
    /// Name of the decor profile in use
    pub decor_name: String,
    /// Derived decoration layout for the current geometry
    pub layout: DecorLayout,
    /// Stacking layer; always equal to the active client's layer
    pub layer: Layer,
    /// Workspace membership mirror of the active client
    pub workspace: usize,
    /// Sticky mirror of the active client
    pub sticky: bool,
    /// Shaded mirror of the active client
    pub shaded: bool,
    /// Title mirror of the active client, shown in the titlebar
    pub title: String,
    /// Whether the frame is currently mapped
    pub mapped: bool,
    /// Survive losing the last client (system menus and similar)
    pub keep_empty: bool,
    /// Titlebar switched off for this frame
    pub titlebar_disabled: bool,
    /// Border switched off for this frame
    pub border_disabled: bool,
    /// Geometry to restore when leaving fullscreen / maximized state
    pub saved_geometry: Option<Rect>,
}

impl Frame {
    /// Create a frame wrapping a first client.
    pub fn new(
        id: FrameId,
        window: Xid,
        geometry: Rect,
        first_client: Xid,
        decor_name: impl Into<String>,
        profile: &DecorProfile,
        font_height: u32,
    ) -> Self {
        let decor_name = decor_name.into();
        let layout = DecorLayout::derive(
            profile,
            (geometry.w, geometry.h),
            font_height,
            true,
            true,
            &[0],
        );

        Self {
            id,
            window,
            geometry,
            clients: vec![first_client],
            active: 0,
            decor_name,
            layout,
            layer: Layer::Normal,
            workspace: 0,
            sticky: false,
            shaded: false,
            title: String::new(),
            mapped: false,
            keep_empty: false,
            titlebar_disabled: false,
            border_disabled: false,
            saved_geometry: None,
        }
    }

    /// The client tabs in titlebar order.
    pub fn clients(&self) -> &[Xid] {
        &self.clients
    }

    /// Number of client tabs.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// A frame with no clients is only valid when `keep_empty` is set.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// The currently active client tab.
    pub fn active_client(&self) -> Option<Xid> {
        self.clients.get(self.active).copied()
    }

    /// Index of the active tab.
    pub fn active_index(&self) -> usize {
        self.active
    }

    /// Whether `id` is one of this frame's tabs.
    pub fn contains(&self, id: Xid) -> bool {
        self.clients.contains(&id)
    }

    /// Append a client as the new rightmost tab and activate it.
    pub fn insert_client(&mut self, id: Xid) {
        self.clients.push(id);
        self.active = self.clients.len() - 1;
    }

    /// Activate the tab holding `id`, returning false when it is not a
    /// member.
    pub fn activate_client(&mut self, id: Xid) -> bool {
        match self.clients.iter().position(|&c| c == id) {
            Some(i) => {
                self.active = i;
                true
            }
            None => false,
        }
    }

    /// Activate the tab `n` positions to the right (wrapping), negative for
    /// left.
    pub fn cycle_active(&mut self, n: i32) {
        let len = self.clients.len() as i32;
        if len == 0 {
            return;
        }

        self.active = (((self.active as i32 + n) % len + len) % len) as usize;
    }

    /// Remove a client tab.
    ///
    /// Removing the active tab promotes its successor, or its predecessor
    /// when the active tab was last. Removing the final tab reports
    /// [RemoveOutcome::Empty]: the frame must then be destroyed unless
    /// `keep_empty` is set.
    pub fn remove_client(&mut self, id: Xid) -> RemoveOutcome {
        let i = match self.clients.iter().position(|&c| c == id) {
            Some(i) => i,
            None => return RemoveOutcome::NotAMember,
        };

        self.clients.remove(i);

        if self.clients.is_empty() {
            self.active = 0;
            return RemoveOutcome::Empty;
        }

        if i < self.active {
            self.active -= 1;
            RemoveOutcome::Kept
        } else if i == self.active {
            // promote the successor, or the predecessor at the end
            if self.active >= self.clients.len() {
                self.active = self.clients.len() - 1;
            }
            RemoveOutcome::Promoted(self.clients[self.active])
        } else {
            RemoveOutcome::Kept
        }
    }

    /// Remove and return every tab except the active one.
    pub fn detach_others(&mut self) -> Vec<Xid> {
        let active = match self.active_client() {
            Some(id) => id,
            None => return vec![],
        };

        let detached: Vec<Xid> = self
            .clients
            .iter()
            .copied()
            .filter(|&c| c != active)
            .collect();
        self.clients = vec![active];
        self.active = 0;

        detached
    }

    /// Update the observable mirrors from the active client.
    ///
    /// Keeps the frame's layer equal to its active client's layer at all
    /// times.
    pub fn sync_mirrors(&mut self, active: &Client) {
        self.layer = active.state.layer;
        self.workspace = active.state.workspace;
        self.sticky = active
            .state
            .flags
            .contains(crate::client::StateFlags::STICKY);
        self.shaded = active
            .state
            .flags
            .contains(crate::client::StateFlags::SHADED);
        self.title = active.effective_title().to_string();
    }

    /// Re-derive the decoration layout for the current geometry.
    pub fn rederive_layout(
        &mut self,
        profile: &DecorProfile,
        font_height: u32,
        titlebar: bool,
        bordered: bool,
        tab_requests: &[u32],
    ) {
        self.layout = DecorLayout::derive(
            profile,
            (self.geometry.w, self.geometry.h),
            font_height,
            titlebar,
            bordered,
            tab_requests,
        );
    }

    /// The geometry of the active client inside the frame:
    /// `(border-left, border-top + title-height, content-w, content-h)`.
    pub fn client_geometry(&self) -> Rect {
        let offset = self.layout.content_offset();
        let (w, h) = self.layout.content_size();

        Rect::new(offset.x, offset.y, w, h)
    }

    /// The on-screen geometry of the active client.
    pub fn client_geometry_on_root(&self) -> Rect {
        let r = self.client_geometry();

        Rect::new(self.geometry.x + r.x, self.geometry.y + r.y, r.w, r.h)
    }

    /// Split this frame's geometry at `ratio`, returning
    /// `(detached_part, remaining_part)`.
    ///
    /// A horizontal split stacks the parts: the detached part takes the top
    /// `ratio` share and the frame keeps the bottom. A vertical split puts
    /// the detached part on the left.
    pub fn split_geometry(&self, ratio: f64, horizontal: bool) -> (Rect, Rect) {
        let Rect { x, y, w, h } = self.geometry;
        let ratio = ratio.clamp(0.1, 0.9);

        if horizontal {
            let top = (h as f64 * ratio) as u32;
            (
                Rect::new(x, y, w, top),
                Rect::new(x, y + top as i32, w, h - top),
            )
        } else {
            let left = (w as f64 * ratio) as u32;
            (
                Rect::new(x, y, left, h),
                Rect::new(x + left as i32, y, w - left, h),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decor::DecorProfile;
    use simple_test_case::test_case;

    fn frame_with(clients: &[u32]) -> Frame {
        let profile = DecorProfile::plain("DEFAULT");
        let mut f = Frame::new(
            FrameId(0),
            Xid(100),
            Rect::new(100, 200, 500, 400),
            Xid(clients[0]),
            "DEFAULT",
            &profile,
            12,
        );
        for &c in &clients[1..] {
            f.insert_client(Xid(c));
        }
        f
    }

    #[test]
    fn insert_activates_new_tab() {
        let f = frame_with(&[1, 2, 3]);

        assert_eq!(f.active_client(), Some(Xid(3)));
        assert_eq!(f.len(), 3);
    }

    #[test]
    fn removing_active_promotes_successor() {
        let mut f = frame_with(&[1, 2, 3]);
        f.activate_client(Xid(2));

        assert_eq!(f.remove_client(Xid(2)), RemoveOutcome::Promoted(Xid(3)));
        assert_eq!(f.active_client(), Some(Xid(3)));
    }

    #[test]
    fn removing_last_active_promotes_predecessor() {
        let mut f = frame_with(&[1, 2, 3]);

        assert_eq!(f.remove_client(Xid(3)), RemoveOutcome::Promoted(Xid(2)));
        assert_eq!(f.active_client(), Some(Xid(2)));
    }

    #[test]
    fn removing_before_active_keeps_active() {
        let mut f = frame_with(&[1, 2, 3]);

        assert_eq!(f.remove_client(Xid(1)), RemoveOutcome::Kept);
        assert_eq!(f.active_client(), Some(Xid(3)));
    }

    #[test]
    fn removing_final_client_reports_empty() {
        let mut f = frame_with(&[1]);

        assert_eq!(f.remove_client(Xid(1)), RemoveOutcome::Empty);
        assert!(f.is_empty());
    }

    #[test]
    fn remove_unknown_is_not_a_member() {
        let mut f = frame_with(&[1]);

        assert_eq!(f.remove_client(Xid(9)), RemoveOutcome::NotAMember);
        assert_eq!(f.len(), 1);
    }

    #[test_case(1, 1; "step right")]
    #[test_case(-1, 2; "wrap left")]
    #[test_case(3, 0; "full cycle")]
    #[test]
    fn cycle_active(step: i32, expected_idx: usize) {
        let mut f = frame_with(&[1, 2, 3]);
        f.activate_client(Xid(1));

        f.cycle_active(step);

        assert_eq!(f.active_index(), expected_idx);
    }

    #[test]
    fn detach_others_keeps_only_active() {
        let mut f = frame_with(&[1, 2, 3]);
        f.activate_client(Xid(1));

        let detached = f.detach_others();

        assert_eq!(detached, vec![Xid(2), Xid(3)]);
        assert_eq!(f.clients(), &[Xid(1)]);
        assert_eq!(f.active_client(), Some(Xid(1)));
    }

    #[test]
    fn split_horz_stacks_detached_on_top() {
        let f = frame_with(&[1, 2]);

        let (detached, kept) = f.split_geometry(0.5, true);

        assert_eq!(detached, Rect::new(100, 200, 500, 200));
        assert_eq!(kept, Rect::new(100, 400, 500, 200));
    }

    #[test]
    fn split_vert_puts_detached_left() {
        let f = frame_with(&[1, 2]);

        let (detached, kept) = f.split_geometry(0.25, false);

        assert_eq!(detached, Rect::new(100, 200, 125, 400));
        assert_eq!(kept, Rect::new(225, 200, 375, 400));
    }

    #[test]
    fn client_geometry_tracks_layout() {
        let f = frame_with(&[1]);
        let r = f.client_geometry();

        // plain profile: 2px borders, 18px title
        assert_eq!(r, Rect::new(2, 20, 496, 378));
        assert_eq!(
            f.client_geometry_on_root(),
            Rect::new(102, 220, 496, 378)
        );
    }
}
