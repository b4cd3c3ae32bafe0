//! Decor profiles: the visual box around a frame.
//!
//! Rendering of textures and fonts is an external concern; this module owns
//! the box model: border widths, title height, tab widths, button layout,
//! hit testing and the rectangles that make up a frame's shape mask.
use crate::{
    pure::geometry::{Point, Rect},
    Error, Result,
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// The name every decor store must provide a profile for.
pub const DEFAULT_DECOR: &str = "DEFAULT";

/// The texture name substituted for missing assets.
pub const EMPTY_TEXTURE: &str = "EMPTY";

/// Per-side border widths in pixels.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BorderWidths {
    /// Top border width
    pub top: u32,
    /// Bottom border width
    pub bottom: u32,
    /// Left border width
    pub left: u32,
    /// Right border width
    pub right: u32,
}

impl BorderWidths {
    /// Uniform borders on all sides.
    pub fn uniform(px: u32) -> Self {
        Self {
            top: px,
            bottom: px,
            left: px,
            right: px,
        }
    }
}

/// How the title height is derived.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleHeight {
    /// A fixed pixel height
    Fixed(u32),
    /// Track the height of the active tab's font plus padding
    AdaptToFont {
        /// Pixels added above and below the font
        pad: u32,
    },
}

/// Focus states a decor renders differently.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FocusState {
    /// The frame holds input focus
    Focused,
    /// The frame does not hold input focus
    Unfocused,
}

/// A titlebar button slot.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecorButton {
    /// Name of the button (close, iconify, ...)
    pub name: String,
    /// Button width in pixels
    pub width: u32,
}

/// A named decor profile.
#[derive(Debug, Clone)]
pub struct DecorProfile {
    /// Profile name, referenced from frames and auto properties
    pub name: String,
    /// Per-side border widths
    pub border: BorderWidths,
    /// Title height policy
    pub title_height: TitleHeight,
    /// Minimum tab width in pixels
    pub title_width_min: u32,
    /// Maximum tab width in pixels, 0 for unbounded
    pub title_width_max: u32,
    /// All tabs equal width when set; request-based otherwise
    pub title_width_symmetric: bool,
    /// Horizontal padding inside a tab (left, right)
    pub title_pad: (u32, u32),
    /// Buttons anchored at the left end of the titlebar
    pub buttons_left: Vec<DecorButton>,
    /// Buttons anchored at the right end of the titlebar
    pub buttons_right: Vec<DecorButton>,
    /// Texture names per focus state
    pub textures: HashMap<FocusState, String>,
}

impl DecorProfile {
    /// A minimal profile usable as the `DEFAULT` fallback.
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            border: BorderWidths::uniform(2),
            title_height: TitleHeight::Fixed(18),
            title_width_min: 32,
            title_width_max: 0,
            title_width_symmetric: true,
            title_pad: (4, 4),
            buttons_left: Vec::new(),
            buttons_right: Vec::new(),
            textures: HashMap::new(),
        }
    }

    /// The resolved title height for a frame showing a titlebar.
    pub fn resolved_title_height(&self, font_height: u32, titlebar: bool) -> u32 {
        if !titlebar {
            return 0;
        }

        match self.title_height {
            TitleHeight::Fixed(h) => h,
            TitleHeight::AdaptToFont { pad } => font_height + 2 * pad,
        }
    }

    /// The texture name for a focus state, falling back to `EMPTY` with a
    /// warning when the profile does not provide one.
    pub fn texture(&self, state: FocusState) -> &str {
        match self.textures.get(&state) {
            Some(name) => name,
            None => {
                warn!(profile = %self.name, ?state, "missing texture: using EMPTY");
                EMPTY_TEXTURE
            }
        }
    }

    /// Total width taken by titlebar buttons on the given side.
    pub fn buttons_width(&self, left: bool) -> u32 {
        let buttons = if left {
            &self.buttons_left
        } else {
            &self.buttons_right
        };

        buttons.iter().map(|b| b.width).sum()
    }
}

/// The named decor profiles currently loaded.
///
/// Lookup by unknown name falls back to `DEFAULT`; construction without a
/// `DEFAULT` profile is an error, fatal at startup.
#[derive(Debug, Clone)]
pub struct DecorStore {
    profiles: HashMap<String, DecorProfile>,
}

impl DecorStore {
    /// Build a store from named profiles. Fails without a `DEFAULT` entry.
    pub fn new(profiles: Vec<DecorProfile>) -> Result<Self> {
        let profiles: HashMap<String, DecorProfile> = profiles
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect();

        if !profiles.contains_key(DEFAULT_DECOR) {
            return Err(Error::MissingDefaultDecor);
        }

        Ok(Self { profiles })
    }

    /// The profile registered under `name`, or `DEFAULT` when missing.
    pub fn get(&self, name: &str) -> &DecorProfile {
        match self.profiles.get(name) {
            Some(p) => p,
            None => {
                warn!(%name, "unknown decor profile: falling back to DEFAULT");
                &self.profiles[DEFAULT_DECOR]
            }
        }
    }

    /// Replace all profiles, keeping the previous set when the new one has
    /// no `DEFAULT`.
    pub fn reload(&mut self, profiles: Vec<DecorProfile>) -> bool {
        match Self::new(profiles) {
            Ok(new) => {
                *self = new;
                true
            }
            Err(_) => {
                warn!("decor reload without DEFAULT profile: keeping previous set");
                false
            }
        }
    }
}

/// Compute symmetric tab widths: all tabs equal, remainder distributed one
/// pixel per leading tab.
pub fn tab_widths_symmetric(available: u32, n: usize) -> Vec<u32> {
    if n == 0 {
        return vec![];
    }

    let n32 = n as u32;
    let each = available / n32;
    let remainder = (available % n32) as usize;

    (0..n)
        .map(|i| if i < remainder { each + 1 } else { each })
        .collect()
}

/// Compute request-based tab widths.
///
/// When the requests fit, each tab keeps its request. Otherwise tabs
/// requesting less than the per-tab average keep their request and the
/// remaining space is split equally among the oversized tabs, with the
/// division remainder spread one pixel per leading oversized tab.
pub fn tab_widths_asymmetric(requests: &[u32], available: u32) -> Vec<u32> {
    let n = requests.len();
    if n == 0 {
        return vec![];
    }

    let total: u32 = requests.iter().sum();
    if total <= available {
        return requests.to_vec();
    }

    // all-small would mean total < available, so at least one tab is
    // oversized on this path
    let average = available / n as u32;
    let small: Vec<usize> = (0..n).filter(|&i| requests[i] < average).collect();
    let small_total: u32 = small.iter().map(|&i| requests[i]).sum();

    let oversized = (n - small.len()) as u32;
    let remaining = available - small_total;
    let per_big = remaining / oversized;
    let mut leftover = remaining % oversized;

    (0..n)
        .map(|i| {
            if small.contains(&i) {
                requests[i]
            } else if leftover > 0 {
                leftover -= 1;
                per_big + 1
            } else {
                per_big
            }
        })
        .collect()
}

/// A border hit position, also used to pick resize directions and cursors.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BorderPosition {
    /// Top left corner
    TopLeft,
    /// Top edge
    Top,
    /// Top right corner
    TopRight,
    /// Left edge
    Left,
    /// Right edge
    Right,
    /// Bottom left corner
    BottomLeft,
    /// Bottom edge
    Bottom,
    /// Bottom right corner
    BottomRight,
}

/// What a point inside a frame window hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecorPart {
    /// A titlebar tab, by index
    Title(usize),
    /// A left-aligned titlebar button, by index
    ButtonLeft(usize),
    /// A right-aligned titlebar button, by index
    ButtonRight(usize),
    /// A border segment
    Border(BorderPosition),
    /// The client content area
    Content,
}

/// The derived layout of one frame's decorations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecorLayout {
    /// Outer size of the frame window
    pub size: (u32, u32),
    /// Border widths in effect (zeroed when borders are disabled)
    pub border: BorderWidths,
    /// Resolved title height (0 when the titlebar is hidden)
    pub title_height: u32,
    /// Widths of the titlebar tabs, leftmost first
    pub tab_widths: Vec<u32>,
    /// Widths of the left-aligned buttons
    pub buttons_left: Vec<u32>,
    /// Widths of the right-aligned buttons
    pub buttons_right: Vec<u32>,
}

// Corner segments extend along the edges so that diagonal resizing has a
// reasonable target even with thin borders.
const CORNER_EXTENT: u32 = 16;

impl DecorLayout {
    /// Derive the layout for a frame of the given outer size.
    ///
    /// `tab_requests` are the text widths (padding included) requested per
    /// tab; ignored in symmetric mode.
    pub fn derive(
        profile: &DecorProfile,
        size: (u32, u32),
        font_height: u32,
        titlebar: bool,
        bordered: bool,
        tab_requests: &[u32],
    ) -> Self {
        let border = if bordered {
            profile.border
        } else {
            BorderWidths::default()
        };
        let title_height = profile.resolved_title_height(font_height, titlebar);

        let buttons_left: Vec<u32> = profile.buttons_left.iter().map(|b| b.width).collect();
        let buttons_right: Vec<u32> = profile.buttons_right.iter().map(|b| b.width).collect();

        let tabs_avail = (size.0)
            .saturating_sub(border.left + border.right)
            .saturating_sub(buttons_left.iter().sum::<u32>())
            .saturating_sub(buttons_right.iter().sum::<u32>());

        let n = tab_requests.len().max(1);
        let tab_widths = if !titlebar {
            vec![]
        } else if profile.title_width_symmetric {
            tab_widths_symmetric(tabs_avail, n)
        } else {
            let clamped: Vec<u32> = tab_requests
                .iter()
                .map(|&w| {
                    let w = w.max(profile.title_width_min);
                    if profile.title_width_max > 0 {
                        w.min(profile.title_width_max)
                    } else {
                        w
                    }
                })
                .collect();
            let requests = if clamped.is_empty() {
                vec![tabs_avail]
            } else {
                clamped
            };
            tab_widths_asymmetric(&requests, tabs_avail)
        };

        Self {
            size,
            border,
            title_height,
            tab_widths,
            buttons_left,
            buttons_right,
        }
    }

    /// Offset of the client content area inside the frame window.
    pub fn content_offset(&self) -> Point {
        Point::new(
            self.border.left as i32,
            (self.border.top + self.title_height) as i32,
        )
    }

    /// Size of the client content area for this frame size.
    pub fn content_size(&self) -> (u32, u32) {
        let (w, h) = self.size;
        (
            w.saturating_sub(self.border.left + self.border.right),
            h.saturating_sub(self.border.top + self.border.bottom + self.title_height),
        )
    }

    /// The frame size needed to wrap a client of `(w, h)`.
    pub fn frame_size_for(&self, w: u32, h: u32) -> (u32, u32) {
        (
            w + self.border.left + self.border.right,
            h + self.border.top + self.border.bottom + self.title_height,
        )
    }

    /// Resolve a point relative to the frame window into the decoration
    /// part it hits.
    pub fn hit_test(&self, p: Point) -> DecorPart {
        let (w, h) = self.size;
        let (x, y) = (p.x, p.y);

        if x < 0 || y < 0 || x >= w as i32 || y >= h as i32 {
            return DecorPart::Content;
        }
        let (ux, uy) = (x as u32, y as u32);

        if let Some(border) = self.border_hit(ux, uy) {
            return DecorPart::Border(border);
        }

        // inside the border box; titlebar next
        if uy < self.border.top + self.title_height {
            let mut cursor = self.border.left;
            for (i, bw) in self.buttons_left.iter().enumerate() {
                if ux < cursor + bw {
                    return DecorPart::ButtonLeft(i);
                }
                cursor += bw;
            }

            let right_total: u32 = self.buttons_right.iter().sum();
            let right_start = w.saturating_sub(self.border.right + right_total);
            if ux >= right_start {
                let mut cursor = right_start;
                for (i, bw) in self.buttons_right.iter().enumerate() {
                    if ux < cursor + bw {
                        return DecorPart::ButtonRight(i);
                    }
                    cursor += bw;
                }
            }

            let mut tab_start = self.border.left + self.buttons_left.iter().sum::<u32>();
            for (i, tw) in self.tab_widths.iter().enumerate() {
                if ux < tab_start + tw {
                    return DecorPart::Title(i);
                }
                tab_start += tw;
            }

            return DecorPart::Title(self.tab_widths.len().saturating_sub(1));
        }

        DecorPart::Content
    }

    fn border_hit(&self, x: u32, y: u32) -> Option<BorderPosition> {
        let (w, h) = self.size;
        let b = self.border;

        let on_left = x < b.left;
        let on_right = x >= w.saturating_sub(b.right);
        let on_top = y < b.top;
        let on_bottom = y >= h.saturating_sub(b.bottom);

        if !(on_left || on_right || on_top || on_bottom) {
            return None;
        }

        let near_left = x < b.left.max(CORNER_EXTENT);
        let near_right = x >= w.saturating_sub(b.right.max(CORNER_EXTENT));
        let near_top = y < b.top.max(CORNER_EXTENT);
        let near_bottom = y >= h.saturating_sub(b.bottom.max(CORNER_EXTENT));

        let pos = match (on_top, on_bottom, on_left, on_right) {
            (true, _, _, _) if near_left => BorderPosition::TopLeft,
            (true, _, _, _) if near_right => BorderPosition::TopRight,
            (true, _, _, _) => BorderPosition::Top,
            (_, true, _, _) if near_left => BorderPosition::BottomLeft,
            (_, true, _, _) if near_right => BorderPosition::BottomRight,
            (_, true, _, _) => BorderPosition::Bottom,
            (_, _, true, _) if near_top => BorderPosition::TopLeft,
            (_, _, true, _) if near_bottom => BorderPosition::BottomLeft,
            (_, _, true, _) => BorderPosition::Left,
            (_, _, _, true) if near_top => BorderPosition::TopRight,
            (_, _, _, true) if near_bottom => BorderPosition::BottomRight,
            _ => BorderPosition::Right,
        };

        Some(pos)
    }

    /// The rectangles forming the frame's composite shape mask: the border
    /// ring and title rectangle plus the client shape translated into frame
    /// coordinates, all clipped to the frame's bounding rectangle.
    pub fn shape_rects(&self, client_shape: Option<&[Rect]>) -> Vec<Rect> {
        let (w, h) = self.size;
        let bounding = Rect::new(0, 0, w, h);
        let mut rects = Vec::new();

        let deco_height = self.border.top + self.title_height;
        if deco_height > 0 {
            rects.push(Rect::new(0, 0, w, deco_height));
        }
        if self.border.bottom > 0 {
            rects.push(Rect::new(0, (h - self.border.bottom) as i32, w, self.border.bottom));
        }
        if self.border.left > 0 {
            rects.push(Rect::new(0, 0, self.border.left, h));
        }
        if self.border.right > 0 {
            rects.push(Rect::new((w - self.border.right) as i32, 0, self.border.right, h));
        }

        let offset = self.content_offset();
        match client_shape {
            Some(shape) => {
                for r in shape {
                    let translated = Rect::new(r.x + offset.x, r.y + offset.y, r.w, r.h);
                    if let Some(clipped) = intersect(&translated, &bounding) {
                        rects.push(clipped);
                    }
                }
            }
            None => {
                let (cw, ch) = self.content_size();
                rects.push(Rect::new(offset.x, offset.y, cw, ch));
            }
        }

        rects
    }
}

fn intersect(a: &Rect, b: &Rect) -> Option<Rect> {
    if !a.overlaps(b) {
        return None;
    }

    let x = a.x.max(b.x);
    let y = a.y.max(b.y);
    let right = a.right().min(b.right());
    let bottom = a.bottom().min(b.bottom());

    Some(Rect::new(x, y, (right - x) as u32, (bottom - y) as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    fn profile() -> DecorProfile {
        let mut p = DecorProfile::plain(DEFAULT_DECOR);
        p.buttons_right = vec![DecorButton {
            name: "close".into(),
            width: 16,
        }];
        p
    }

    #[test_case(100, 4, vec![25, 25, 25, 25]; "even split")]
    #[test_case(103, 4, vec![26, 26, 26, 25]; "remainder to leading tabs")]
    #[test_case(10, 3, vec![4, 3, 3]; "small")]
    #[test]
    fn symmetric_tabs(avail: u32, n: usize, expected: Vec<u32>) {
        let widths = tab_widths_symmetric(avail, n);

        assert_eq!(widths, expected);
        assert_eq!(widths.iter().sum::<u32>(), avail);
    }

    #[test]
    fn asymmetric_tabs_keep_requests_when_fitting() {
        assert_eq!(
            tab_widths_asymmetric(&[40, 80, 60], 300),
            vec![40, 80, 60]
        );
    }

    #[test]
    fn asymmetric_tabs_shrink_only_oversized() {
        // average is 100; the 40px tab keeps its request and the two large
        // tabs split the remaining 260px equally
        let widths = tab_widths_asymmetric(&[40, 200, 300], 300);

        assert_eq!(widths, vec![40, 130, 130]);
    }

    #[test]
    fn asymmetric_tabs_spread_the_remainder() {
        // 259px left over two oversized tabs: the leading one takes the
        // odd pixel so the titlebar stays fully covered
        let widths = tab_widths_asymmetric(&[41, 200, 300], 300);

        assert_eq!(widths, vec![41, 130, 129]);
        assert_eq!(widths.iter().sum::<u32>(), 300);
    }

    #[test]
    fn missing_default_profile_is_fatal() {
        let err = DecorStore::new(vec![DecorProfile::plain("other")]);

        assert!(matches!(err, Err(Error::MissingDefaultDecor)));
    }

    #[test]
    fn unknown_profile_falls_back_to_default() {
        let store = DecorStore::new(vec![DecorProfile::plain(DEFAULT_DECOR)]).unwrap();

        assert_eq!(store.get("no-such-profile").name, DEFAULT_DECOR);
    }

    #[test]
    fn missing_texture_is_empty() {
        let p = DecorProfile::plain(DEFAULT_DECOR);

        assert_eq!(p.texture(FocusState::Focused), EMPTY_TEXTURE);
    }

    fn layout() -> DecorLayout {
        // 2px borders, 18px fixed title, one 16px right button
        DecorLayout::derive(&profile(), (200, 100), 12, true, true, &[50, 50])
    }

    #[test]
    fn content_offset_is_border_plus_title() {
        let l = layout();

        assert_eq!(l.content_offset(), Point::new(2, 20));
        assert_eq!(l.content_size(), (196, 78));
        assert_eq!(l.frame_size_for(196, 78), (200, 100));
    }

    #[test_case(Point::new(100, 50), DecorPart::Content; "content")]
    #[test_case(Point::new(50, 10), DecorPart::Title(0); "first tab")]
    #[test_case(Point::new(160, 10), DecorPart::Title(1); "second tab")]
    #[test_case(Point::new(190, 10), DecorPart::ButtonRight(0); "close button")]
    #[test_case(Point::new(0, 50), DecorPart::Border(BorderPosition::Left); "left border")]
    #[test_case(Point::new(199, 50), DecorPart::Border(BorderPosition::Right); "right border")]
    #[test_case(Point::new(100, 99), DecorPart::Border(BorderPosition::Bottom); "bottom border")]
    #[test_case(Point::new(0, 99), DecorPart::Border(BorderPosition::BottomLeft); "bottom left corner")]
    #[test_case(Point::new(199, 0), DecorPart::Border(BorderPosition::TopRight); "top right corner")]
    #[test]
    fn hit_test(p: Point, expected: DecorPart) {
        assert_eq!(layout().hit_test(p), expected);
    }

    #[test]
    fn shape_rects_without_client_shape_cover_frame() {
        let l = layout();
        let rects = l.shape_rects(None);

        // every pixel of the frame is covered by some rect
        for &(x, y) in &[(0, 0), (199, 99), (100, 10), (100, 50), (0, 99)] {
            assert!(
                rects.iter().any(|r| r.contains_point(Point::new(x, y))),
                "({x}, {y}) uncovered"
            );
        }
    }

    #[test]
    fn shape_rects_clip_client_shape_to_bounds() {
        let l = layout();
        let client_shape = [Rect::new(0, 0, 500, 500)]; // larger than the frame
        let rects = l.shape_rects(Some(&client_shape));

        let bounding = Rect::new(0, 0, 200, 100);
        assert!(rects.iter().all(|r| bounding.contains(r)));
    }
}
