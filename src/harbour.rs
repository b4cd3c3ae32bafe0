//! The Harbour: a dedicated dock-app container.
//!
//! Dock apps live outside of the frame tree: each one is a window (or its
//! icon window) reparented into a small bordered parent, placed along one
//! screen edge, sorted by the position carried in dock-app auto properties
//! and contributing a strut when not hidden.
use crate::{
    pure::{
        geometry::{Rect, Strut},
        Layer,
    },
    Xid,
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The screen edge the harbour occupies.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarbourPlacement {
    /// Along the top edge
    Top,
    /// Along the bottom edge
    Bottom,
    /// Along the left edge
    Left,
    /// Along the right edge
    Right,
}

/// Direction dock apps are laid out along the placement edge.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarbourOrientation {
    /// From the top / left end toward the other
    TopToBottom,
    /// From the bottom / right end toward the other
    BottomToTop,
}

/// Parsed harbour configuration.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarbourConfig {
    /// Which edge the harbour occupies
    pub placement: HarbourPlacement,
    /// Layout direction along the edge
    pub orientation: HarbourOrientation,
    /// Stack dock apps in the DOCK layer instead of DESKTOP
    pub ontop: bool,
    /// Let maximized windows cover the harbour (drops the strut)
    pub maximize_over: bool,
    /// The head the harbour lives on
    pub head: usize,
    /// Opacity applied to dock apps
    pub opacity: u32,
}

impl Default for HarbourConfig {
    fn default() -> Self {
        Self {
            placement: HarbourPlacement::Right,
            orientation: HarbourOrientation::TopToBottom,
            ontop: true,
            maximize_over: false,
            head: 0,
            opacity: u32::MAX,
        }
    }
}

/// One dock app held by the harbour.
#[derive(Debug, Clone)]
pub struct DockApp {
    /// The dock app's client window
    pub window: Xid,
    /// The bordered parent window the dock app is reparented into
    pub frame: Xid,
    /// The icon window from WM_HINTS, when that is what is shown
    pub icon_window: Option<Xid>,
    /// On screen geometry of the parent window
    pub geometry: Rect,
    /// Sort position from the matched dock-app property
    pub position: i32,
    /// Whether the dock app is currently mapped
    pub mapped: bool,
}

impl DockApp {
    /// Create a dock app record.
    pub fn new(window: Xid, frame: Xid, geometry: Rect, position: i32) -> Self {
        Self {
            window,
            frame,
            icon_window: None,
            geometry,
            position,
            mapped: false,
        }
    }

    /// Whether `id` is the client, icon or parent window of this dock app.
    pub fn owns(&self, id: Xid) -> bool {
        self.window == id || self.frame == id || self.icon_window == Some(id)
    }
}

/// The dock-app container.
#[derive(Debug, Default, Clone)]
pub struct Harbour {
    dapps: Vec<DockApp>,
    cfg: HarbourConfig,
    hidden: bool,
    size: u32,
}

impl Harbour {
    /// Create an empty harbour with the given configuration.
    pub fn new(cfg: HarbourConfig) -> Self {
        Self {
            dapps: Vec::new(),
            cfg,
            hidden: false,
            size: 0,
        }
    }

    /// The current configuration.
    pub fn config(&self) -> &HarbourConfig {
        &self.cfg
    }

    /// Replace the configuration (reload); callers re-place afterwards.
    pub fn set_config(&mut self, cfg: HarbourConfig) {
        self.cfg = cfg;
    }

    /// The dock apps in list order.
    pub fn dock_apps(&self) -> &[DockApp] {
        &self.dapps
    }

    /// Number of dock apps held.
    pub fn len(&self) -> usize {
        self.dapps.len()
    }

    /// True when the harbour holds no dock apps.
    pub fn is_empty(&self) -> bool {
        self.dapps.is_empty()
    }

    /// Whether the harbour is hidden.
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// The layer dock apps stack in under the current configuration.
    pub fn layer(&self) -> Layer {
        if self.cfg.ontop {
            Layer::Dock
        } else {
            Layer::Desktop
        }
    }

    /// The dock app owning window `id`, if any.
    pub fn find_dock_app(&self, id: Xid) -> Option<&DockApp> {
        self.dapps.iter().find(|da| da.owns(id))
    }

    /// Mutable access to the dock app owning window `id`.
    pub fn find_dock_app_mut(&mut self, id: Xid) -> Option<&mut DockApp> {
        self.dapps.iter_mut().find(|da| da.owns(id))
    }

    /// Add a dock app, placing it according to `sorted`.
    ///
    /// With sorting enabled the app is inserted by its position and every
    /// dock app is re-placed; otherwise it lands in the first empty slot
    /// along the placement edge.
    pub fn add_dock_app(&mut self, da: DockApp, sorted: bool, head: Rect) {
        debug!(window = %da.window, position = da.position, sorted, "adding dock app");

        if sorted {
            self.insert_sorted(da);
            self.place_sorted(head);
        } else {
            self.dapps.push(da);
            let i = self.dapps.len() - 1;
            self.place_in_first_free(i, head);
        }

        self.update_size();
    }

    /// Remove the dock app owning `id`, re-placing the rest when sorted.
    pub fn remove_dock_app(&mut self, id: Xid, sorted: bool, head: Rect) -> Option<DockApp> {
        let i = self.dapps.iter().position(|da| da.owns(id))?;
        let da = self.dapps.remove(i);

        if sorted {
            self.place_sorted(head);
        }
        self.update_size();

        Some(da)
    }

    /// Remove every dock app, returning them for unmanagement.
    pub fn drain(&mut self) -> Vec<DockApp> {
        let dapps = std::mem::take(&mut self.dapps);
        self.update_size();

        dapps
    }

    /// Hide or unhide the harbour. Returns true when the state changed.
    pub fn set_hidden(&mut self, hidden: bool) -> bool {
        if self.hidden == hidden {
            return false;
        }

        self.hidden = hidden;
        true
    }

    /// The strut the harbour currently contributes.
    ///
    /// Zero when hidden or when maximized windows may cover the harbour.
    pub fn strut(&self) -> Strut {
        let mut strut = Strut {
            head: Some(self.cfg.head),
            ..Strut::default()
        };

        if self.hidden || self.cfg.maximize_over {
            return strut;
        }

        match self.cfg.placement {
            HarbourPlacement::Top => strut.top = self.size,
            HarbourPlacement::Bottom => strut.bottom = self.size,
            HarbourPlacement::Left => strut.left = self.size,
            HarbourPlacement::Right => strut.right = self.size,
        }

        strut
    }

    /// Re-clamp every dock app into the new head rectangle; the response to
    /// RandR geometry changes.
    pub fn update_geometry(&mut self, head: Rect) {
        for i in 0..self.dapps.len() {
            self.clamp_inside(i, head);
        }
    }

    /// Re-run placement for every dock app (config reload).
    pub fn rearrange(&mut self, sorted: bool, head: Rect) {
        if sorted {
            self.place_sorted(head);
        } else {
            for i in 0..self.dapps.len() {
                self.place_in_first_free(i, head);
            }
        }

        self.update_size();
    }

    /// Move a dragged dock app, constrained to the harbour's axis.
    pub fn drag_to(&mut self, id: Xid, x_root: i32, y_root: i32, head: Rect) {
        let horizontal = matches!(
            self.cfg.placement,
            HarbourPlacement::Top | HarbourPlacement::Bottom
        );

        if let Some(da) = self.find_dock_app_mut(id) {
            let r = da.geometry;
            if horizontal {
                let x = x_root
                    .min(head.right() - r.w as i32)
                    .max(head.x);
                da.geometry.x = x;
            } else {
                let y = y_root
                    .min(head.bottom() - r.h as i32)
                    .max(head.y);
                da.geometry.y = y;
            }
        }
    }

    /// Resize a dock app (configure request). Only width and height are
    /// honored; the app is then re-clamped to the placement edge.
    pub fn resize_dock_app(&mut self, id: Xid, w: u32, h: u32, head: Rect) -> bool {
        let i = match self.dapps.iter().position(|da| da.owns(id)) {
            Some(i) => i,
            None => return false,
        };

        self.dapps[i].geometry.w = w;
        self.dapps[i].geometry.h = h;
        self.clamp_inside(i, head);
        self.update_size();

        true
    }

    // The config-file order is "1 2 3 0 0 0 -3 -2 -1": positives ascending
    // from the start, zeros in the middle, negatives ascending toward the
    // end.
    fn insert_sorted(&mut self, da: DockApp) {
        let pos = da.position;
        let mut it = 0;

        if pos == 0 {
            while it < self.dapps.len() && self.dapps[it].position >= 0 {
                it += 1;
            }
        } else if pos > 0 {
            while it < self.dapps.len()
                && self.dapps[it].position >= 1
                && pos > self.dapps[it].position
            {
                it += 1;
            }
        } else {
            while it < self.dapps.len() && self.dapps[it].position >= 0 {
                it += 1;
            }
            while it < self.dapps.len() && pos >= self.dapps[it].position {
                it += 1;
            }
        }

        self.dapps.insert(it, da);
    }

    fn start_coordinate(&self, head: Rect) -> i32 {
        let reversed = self.cfg.orientation == HarbourOrientation::BottomToTop;

        match self.cfg.placement {
            HarbourPlacement::Top | HarbourPlacement::Bottom => {
                if reversed {
                    head.right()
                } else {
                    head.x
                }
            }
            HarbourPlacement::Left | HarbourPlacement::Right => {
                if reversed {
                    head.bottom()
                } else {
                    head.y
                }
            }
        }
    }

    fn edge_coordinate(&self, head: Rect, da: &DockApp) -> i32 {
        match self.cfg.placement {
            HarbourPlacement::Top => head.y,
            HarbourPlacement::Bottom => head.bottom() - da.geometry.h as i32,
            HarbourPlacement::Left => head.x,
            HarbourPlacement::Right => head.right() - da.geometry.w as i32,
        }
    }

    fn place_sorted(&mut self, head: Rect) {
        let horizontal = matches!(
            self.cfg.placement,
            HarbourPlacement::Top | HarbourPlacement::Bottom
        );
        let reversed = self.cfg.orientation == HarbourOrientation::BottomToTop;

        if self.dapps.is_empty() {
            return;
        }
        let mut along = self.start_coordinate(head);

        for i in 0..self.dapps.len() {
            let extent = if horizontal {
                self.dapps[i].geometry.w
            } else {
                self.dapps[i].geometry.h
            } as i32;
            let edge = self.edge_coordinate(head, &self.dapps[i]);

            let coord = if reversed { along - extent } else { along };
            if horizontal {
                self.dapps[i].geometry.x = coord;
                self.dapps[i].geometry.y = edge;
            } else {
                self.dapps[i].geometry.x = edge;
                self.dapps[i].geometry.y = coord;
            }

            along = if reversed { along - extent } else { along + extent };
        }
    }

    fn place_in_first_free(&mut self, i: usize, head: Rect) {
        let horizontal = matches!(
            self.cfg.placement,
            HarbourPlacement::Top | HarbourPlacement::Bottom
        );
        let reversed = self.cfg.orientation == HarbourOrientation::BottomToTop;

        let extent = if horizontal {
            self.dapps[i].geometry.w
        } else {
            self.dapps[i].geometry.h
        } as i32;
        let edge = self.edge_coordinate(head, &self.dapps[i]);

        let (axis_start, axis_end) = if horizontal {
            (head.x, head.right())
        } else {
            (head.y, head.bottom())
        };

        let mut test = if reversed {
            axis_end - extent
        } else {
            axis_start
        };

        // linear scan skipping over occupied ranges until a free slot fits
        let mut placed = false;
        while !placed && (if reversed { test >= axis_start } else { test + extent <= axis_end }) {
            placed = true;

            for (j, other) in self.dapps.iter().enumerate() {
                if j == i {
                    continue;
                }

                let (o_start, o_end) = if horizontal {
                    (other.geometry.x, other.geometry.right())
                } else {
                    (other.geometry.y, other.geometry.bottom())
                };

                if o_start < test + extent && o_end > test {
                    placed = false;
                    test = if reversed { o_start - extent } else { o_end };
                    break;
                }
            }
        }

        let coord = if placed {
            test
        } else if reversed {
            axis_end - extent
        } else {
            axis_start
        };

        if horizontal {
            self.dapps[i].geometry.x = coord;
            self.dapps[i].geometry.y = edge;
        } else {
            self.dapps[i].geometry.x = edge;
            self.dapps[i].geometry.y = coord;
        }
    }

    fn clamp_inside(&mut self, i: usize, head: Rect) {
        let horizontal = matches!(
            self.cfg.placement,
            HarbourPlacement::Top | HarbourPlacement::Bottom
        );
        let edge = self.edge_coordinate(head, &self.dapps[i]);
        let r = self.dapps[i].geometry;

        if horizontal {
            self.dapps[i].geometry.x = r.x.min(head.right() - r.w as i32).max(head.x);
            self.dapps[i].geometry.y = edge;
        } else {
            self.dapps[i].geometry.y = r.y.min(head.bottom() - r.h as i32).max(head.y);
            self.dapps[i].geometry.x = edge;
        }
    }

    // harbour size is the largest dock-app extent along the placement edge
    fn update_size(&mut self) {
        self.size = self
            .dapps
            .iter()
            .map(|da| match self.cfg.placement {
                HarbourPlacement::Top | HarbourPlacement::Bottom => da.geometry.h,
                HarbourPlacement::Left | HarbourPlacement::Right => da.geometry.w,
            })
            .max()
            .unwrap_or(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    const HEAD: Rect = Rect::new(0, 0, 1000, 800);

    fn harbour(placement: HarbourPlacement, orientation: HarbourOrientation) -> Harbour {
        Harbour::new(HarbourConfig {
            placement,
            orientation,
            ..Default::default()
        })
    }

    fn da(id: u32, position: i32) -> DockApp {
        DockApp::new(Xid(id), Xid(id + 1000), Rect::new(0, 0, 64, 64), position)
    }

    #[test]
    fn sorted_order_is_positives_zeros_negatives() {
        let mut h = harbour(HarbourPlacement::Top, HarbourOrientation::TopToBottom);
        for (id, pos) in [(1, 0), (2, -1), (3, 2), (4, 1), (5, 0), (6, -3), (7, 3)] {
            h.add_dock_app(da(id, pos), true, HEAD);
        }

        let order: Vec<i32> = h.dock_apps().iter().map(|d| d.position).collect();
        assert_eq!(order, vec![1, 2, 3, 0, 0, -3, -1]);
    }

    #[test]
    fn sorted_placement_runs_along_the_edge() {
        let mut h = harbour(HarbourPlacement::Top, HarbourOrientation::TopToBottom);
        h.add_dock_app(da(1, 1), true, HEAD);
        h.add_dock_app(da(2, 2), true, HEAD);
        h.add_dock_app(da(3, 3), true, HEAD);

        let xs: Vec<i32> = h.dock_apps().iter().map(|d| d.geometry.x).collect();
        let ys: Vec<i32> = h.dock_apps().iter().map(|d| d.geometry.y).collect();

        assert_eq!(xs, vec![0, 64, 128]);
        assert_eq!(ys, vec![0, 0, 0]);
    }

    #[test]
    fn first_fit_skips_occupied_slots() {
        let mut h = harbour(HarbourPlacement::Bottom, HarbourOrientation::TopToBottom);
        h.add_dock_app(da(1, 0), false, HEAD);
        h.add_dock_app(da(2, 0), false, HEAD);
        h.add_dock_app(da(3, 0), false, HEAD);

        let xs: Vec<i32> = h.dock_apps().iter().map(|d| d.geometry.x).collect();
        assert_eq!(xs, vec![0, 64, 128]);

        // all pinned to the bottom edge
        assert!(h.dock_apps().iter().all(|d| d.geometry.bottom() == 800));
    }

    #[test]
    fn first_fit_reversed_starts_at_far_end() {
        let mut h = harbour(HarbourPlacement::Top, HarbourOrientation::BottomToTop);
        h.add_dock_app(da(1, 0), false, HEAD);
        h.add_dock_app(da(2, 0), false, HEAD);

        let xs: Vec<i32> = h.dock_apps().iter().map(|d| d.geometry.x).collect();
        assert_eq!(xs, vec![936, 872]);
    }

    #[test_case(HarbourPlacement::Top, Strut::new(0, 0, 64, 0, Some(0)); "top")]
    #[test_case(HarbourPlacement::Bottom, Strut::new(0, 0, 0, 64, Some(0)); "bottom")]
    #[test_case(HarbourPlacement::Left, Strut::new(64, 0, 0, 0, Some(0)); "left")]
    #[test_case(HarbourPlacement::Right, Strut::new(0, 64, 0, 0, Some(0)); "right")]
    #[test]
    fn strut_follows_placement(placement: HarbourPlacement, expected: Strut) {
        let mut h = harbour(placement, HarbourOrientation::TopToBottom);
        h.add_dock_app(da(1, 0), false, HEAD);

        assert_eq!(h.strut(), expected);
    }

    #[test]
    fn hiding_drops_the_strut() {
        let mut h = harbour(HarbourPlacement::Right, HarbourOrientation::TopToBottom);
        h.add_dock_app(da(1, 0), false, HEAD);
        assert_eq!(h.strut().right, 64);

        assert!(h.set_hidden(true));
        assert!(h.strut().is_empty());

        assert!(h.set_hidden(false));
        assert_eq!(h.strut().right, 64);

        // no change, no toggle
        assert!(!h.set_hidden(false));
    }

    #[test]
    fn maximize_over_drops_the_strut() {
        let mut h = Harbour::new(HarbourConfig {
            maximize_over: true,
            ..Default::default()
        });
        h.add_dock_app(da(1, 0), false, HEAD);

        assert!(h.strut().is_empty());
    }

    #[test]
    fn ontop_selects_dock_layer() {
        let h = Harbour::new(HarbourConfig {
            ontop: true,
            ..Default::default()
        });
        assert_eq!(h.layer(), Layer::Dock);

        let h = Harbour::new(HarbourConfig {
            ontop: false,
            ..Default::default()
        });
        assert_eq!(h.layer(), Layer::Desktop);
    }

    #[test]
    fn randr_reclamps_to_new_head() {
        let mut h = harbour(HarbourPlacement::Right, HarbourOrientation::TopToBottom);
        h.add_dock_app(da(1, 0), false, HEAD);
        assert_eq!(h.dock_apps()[0].geometry.x, 936);

        let smaller = Rect::new(0, 0, 800, 600);
        h.update_geometry(smaller);

        let r = h.dock_apps()[0].geometry;
        assert_eq!(r.x, 736); // snapped back to the right edge
        assert!(smaller.contains(&r));
    }

    #[test]
    fn drag_is_axis_constrained_and_clamped() {
        let mut h = harbour(HarbourPlacement::Bottom, HarbourOrientation::TopToBottom);
        h.add_dock_app(da(1, 0), false, HEAD);
        let y_before = h.dock_apps()[0].geometry.y;

        h.drag_to(Xid(1), 500, 100, HEAD);
        assert_eq!(h.dock_apps()[0].geometry.x, 500);
        assert_eq!(h.dock_apps()[0].geometry.y, y_before);

        h.drag_to(Xid(1), 5000, 100, HEAD);
        assert_eq!(h.dock_apps()[0].geometry.x, 936);
    }

    #[test]
    fn resize_honors_size_only_and_updates_strut() {
        let mut h = harbour(HarbourPlacement::Right, HarbourOrientation::TopToBottom);
        h.add_dock_app(da(1, 0), false, HEAD);

        assert!(h.resize_dock_app(Xid(1), 128, 32, HEAD));

        let r = h.dock_apps()[0].geometry;
        assert_eq!((r.w, r.h), (128, 32));
        assert_eq!(r.x, 872); // re-clamped to the right edge
        assert_eq!(h.strut().right, 128);
    }
}
