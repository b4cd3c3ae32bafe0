//! Placement strategies for newly mapped frames
use crate::pure::geometry::{Point, Rect};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single placement strategy.
///
/// Strategies are tried in configured order; the first one that yields a
/// geometry fully inside the target head wins.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlacementModel {
    /// Scan the head for the position with minimum overlap
    Smart,
    /// Center inside the head
    Centered,
    /// Place the top left corner at the pointer
    MouseTopLeft,
    /// Center the window on the pointer
    MouseCentered,
    /// Step diagonally from the head origin
    Cascade,
}

/// Context for a placement decision.
#[derive(Debug, Clone)]
pub struct PlacementInput<'a> {
    /// The usable area of the target head (struts already subtracted)
    pub head: Rect,
    /// Current pointer position
    pub pointer: Point,
    /// Geometry of every mapped, non-skip-snap frame on the head
    pub existing: &'a [Rect],
    /// Pixels stepped per cascade slot, usually the title height
    pub cascade_step: u32,
    /// Number of cascade placements already performed
    pub cascade_index: usize,
}

/// Place a window of `size` using the given strategy order.
///
/// Falls back to the head origin when no strategy produces a geometry fully
/// inside the head.
pub fn place(models: &[PlacementModel], size: Rect, input: &PlacementInput<'_>) -> Rect {
    for model in models {
        if let Some(r) = try_place(*model, size, input) {
            if input.head.contains(&r) {
                return r;
            }
        }
    }

    size.at(input.head.x, input.head.y)
}

fn try_place(model: PlacementModel, size: Rect, input: &PlacementInput<'_>) -> Option<Rect> {
    match model {
        PlacementModel::Smart => place_smart(size, input),
        PlacementModel::Centered => Some(size.centered_in(&input.head)),
        PlacementModel::MouseTopLeft => {
            Some(clamp_into(size.at(input.pointer.x, input.pointer.y), input.head))
        }
        PlacementModel::MouseCentered => {
            let r = size.at(
                input.pointer.x - size.w as i32 / 2,
                input.pointer.y - size.h as i32 / 2,
            );
            Some(clamp_into(r, input.head))
        }
        PlacementModel::Cascade => {
            let step = (input.cascade_step.max(1) * input.cascade_index as u32) as i32;
            let r = size.at(input.head.x + step, input.head.y + step);
            input.head.contains(&r).then_some(r)
        }
    }
}

// Candidate positions are the head origin plus the right / bottom edges of
// every existing frame; the candidate fully inside the head with the lowest
// aggregate overlap wins, ties broken top-to-bottom then left-to-right.
fn place_smart(size: Rect, input: &PlacementInput<'_>) -> Option<Rect> {
    let head = input.head;

    let mut xs = vec![head.x];
    let mut ys = vec![head.y];
    for r in input.existing {
        xs.push(r.right());
        xs.push(r.x);
        ys.push(r.bottom());
        ys.push(r.y);
    }
    xs.sort_unstable();
    xs.dedup();
    ys.sort_unstable();
    ys.dedup();

    let mut best: Option<(u64, Rect)> = None;
    for &y in &ys {
        for &x in &xs {
            let candidate = size.at(x, y);
            if !head.contains(&candidate) {
                continue;
            }

            let overlap: u64 = input
                .existing
                .iter()
                .map(|r| candidate.overlap_area(r))
                .sum();

            match best {
                Some((b, _)) if b <= overlap => (),
                _ => best = Some((overlap, candidate)),
            }

            if overlap == 0 {
                return Some(candidate);
            }
        }
    }

    best.map(|(_, r)| r)
}

fn clamp_into(r: Rect, head: Rect) -> Rect {
    let x = r
        .x
        .min(head.right() - r.w as i32)
        .max(head.x);
    let y = r
        .y
        .min(head.bottom() - r.h as i32)
        .max(head.y);

    r.at(x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    const HEAD: Rect = Rect::new(0, 0, 1000, 800);

    fn input<'a>(existing: &'a [Rect], pointer: Point) -> PlacementInput<'a> {
        PlacementInput {
            head: HEAD,
            pointer,
            existing,
            cascade_step: 20,
            cascade_index: 0,
        }
    }

    #[test]
    fn smart_picks_first_free_spot() {
        let existing = [Rect::new(0, 0, 500, 800)];
        let got = place(
            &[PlacementModel::Smart],
            Rect::new(0, 0, 400, 300),
            &input(&existing, Point::new(0, 0)),
        );

        assert_eq!(got, Rect::new(500, 0, 400, 300));
        assert_eq!(got.overlap_area(&existing[0]), 0);
    }

    #[test]
    fn smart_minimises_overlap_when_full() {
        // the head is fully covered; least-covered slot is on the right
        let existing = [
            Rect::new(0, 0, 600, 800),
            Rect::new(600, 0, 400, 800),
            Rect::new(600, 0, 400, 800),
        ];
        let got = place(
            &[PlacementModel::Smart],
            Rect::new(0, 0, 600, 800),
            &input(&existing, Point::new(0, 0)),
        );

        assert_eq!(got.x, 0);
    }

    #[test]
    fn centered_centers_in_head() {
        let got = place(
            &[PlacementModel::Centered],
            Rect::new(0, 0, 200, 200),
            &input(&[], Point::new(0, 0)),
        );

        assert_eq!(got, Rect::new(400, 300, 200, 200));
    }

    #[test_case(Point::new(100, 200), Rect::new(100, 200, 50, 50); "inside")]
    #[test_case(Point::new(990, 790), Rect::new(950, 750, 50, 50); "clamped to edge")]
    #[test]
    fn mouse_top_left(pointer: Point, expected: Rect) {
        let got = place(
            &[PlacementModel::MouseTopLeft],
            Rect::new(0, 0, 50, 50),
            &input(&[], pointer),
        );

        assert_eq!(got, expected);
    }

    #[test]
    fn mouse_centered_centers_on_pointer() {
        let got = place(
            &[PlacementModel::MouseCentered],
            Rect::new(0, 0, 100, 100),
            &input(&[], Point::new(500, 400)),
        );

        assert_eq!(got, Rect::new(450, 350, 100, 100));
    }

    #[test]
    fn cascade_steps_by_index() {
        let mut inp = input(&[], Point::new(0, 0));
        inp.cascade_index = 3;

        let got = place(&[PlacementModel::Cascade], Rect::new(0, 0, 100, 100), &inp);

        assert_eq!(got, Rect::new(60, 60, 100, 100));
    }

    #[test]
    fn strategy_order_falls_through() {
        // a window as large as the head cannot cascade at index 1, so the
        // centered fallback wins
        let mut inp = input(&[], Point::new(0, 0));
        inp.cascade_index = 1;

        let got = place(
            &[PlacementModel::Cascade, PlacementModel::Centered],
            Rect::new(0, 0, 1000, 800),
            &inp,
        );

        assert_eq!(got, Rect::new(0, 0, 1000, 800));
    }

    #[test]
    fn no_winning_strategy_uses_head_origin() {
        let got = place(
            &[],
            Rect::new(50, 60, 100, 100),
            &input(&[], Point::new(0, 0)),
        );

        assert_eq!(got, Rect::new(0, 0, 100, 100));
    }
}
