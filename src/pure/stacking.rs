//! The global, layer-major stacking list
use crate::{pure::Layer, Xid};

/// One mapped object in the stacking order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackEntry {
    /// The top level X window of the stacked object
    pub id: Xid,
    /// The layer the object is stacked in
    pub layer: Layer,
}

/// The single authoritative ordering of every mapped object, bottom first.
///
/// All insertions and moves preserve layer-major order: for any two adjacent
/// entries `a, b` it holds that `a.layer <= b.layer`. The list drives both
/// the on-screen Z order (via X restack requests) and the EWMH
/// `_NET_CLIENT_LIST_STACKING` property.
#[derive(Default, Debug, Clone)]
pub struct StackingList {
    entries: Vec<StackEntry>,
}

impl StackingList {
    /// Create an empty stacking list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stacked objects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is stacked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bottom-to-top iteration over the stacked entries.
    pub fn iter(&self) -> impl Iterator<Item = &StackEntry> {
        self.entries.iter()
    }

    /// Top-to-bottom iteration over the stacked entries.
    pub fn iter_top_down(&self) -> impl Iterator<Item = &StackEntry> {
        self.entries.iter().rev()
    }

    /// The ids in stacking order, bottom first, as published via
    /// `_NET_CLIENT_LIST_STACKING`.
    pub fn ids(&self) -> Vec<Xid> {
        self.entries.iter().map(|e| e.id).collect()
    }

    /// Whether `id` is currently stacked.
    pub fn contains(&self, id: Xid) -> bool {
        self.position(id).is_some()
    }

    /// The layer `id` is currently stacked in, if present.
    pub fn layer_of(&self, id: Xid) -> Option<Layer> {
        self.position(id).map(|i| self.entries[i].layer)
    }

    fn position(&self, id: Xid) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    // Search from the end of the list for the last entry with layer <= the
    // new entry's layer and insert after it.
    fn insertion_point(&self, layer: Layer) -> usize {
        self.entries
            .iter()
            .rposition(|e| e.layer <= layer)
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    /// Insert `id` at the top of `layer`. A re-insert of a known id moves it.
    pub fn insert(&mut self, id: Xid, layer: Layer) {
        self.remove(id);
        let at = self.insertion_point(layer);
        self.entries.insert(at, StackEntry { id, layer });
    }

    /// Remove `id` from the stacking order. Unknown ids are ignored.
    pub fn remove(&mut self, id: Xid) {
        self.entries.retain(|e| e.id != id);
    }

    /// Move `id` to the top of its layer. Idempotent.
    pub fn raise(&mut self, id: Xid) -> bool {
        let i = match self.position(id) {
            Some(i) => i,
            None => return false,
        };

        let entry = self.entries.remove(i);
        let at = self.insertion_point(entry.layer);
        self.entries.insert(at, entry);

        true
    }

    /// Move `id` to the bottom of its layer. Idempotent.
    pub fn lower(&mut self, id: Xid) -> bool {
        let i = match self.position(id) {
            Some(i) => i,
            None => return false,
        };

        let entry = self.entries.remove(i);
        let at = self
            .entries
            .iter()
            .position(|e| e.layer >= entry.layer)
            .unwrap_or(self.entries.len());
        self.entries.insert(at, entry);

        true
    }

    /// Exchange the stacking slots of `a` and `b`.
    ///
    /// Both objects keep their layers; only their positions swap, so this is
    /// only meaningful for objects in the same layer.
    pub fn swap(&mut self, a: Xid, b: Xid) -> bool {
        match (self.position(a), self.position(b)) {
            (Some(i), Some(j)) => {
                self.entries.swap(i, j);
                true
            }
            _ => false,
        }
    }

    /// Move `id` so that it stacks directly above `other`.
    pub fn stack_above(&mut self, id: Xid, other: Xid) -> bool {
        if id == other {
            return false;
        }

        let i = match self.position(id) {
            Some(i) => i,
            None => return false,
        };
        let entry = self.entries.remove(i);

        match self.position(other) {
            Some(j) => {
                self.entries.insert(j + 1, entry);
                true
            }
            None => {
                // restore: other is not stacked
                self.entries.insert(i.min(self.entries.len()), entry);
                false
            }
        }
    }

    /// Update the layer of `id`, re-inserting at the top of the new layer.
    pub fn set_layer(&mut self, id: Xid, layer: Layer) {
        if self.position(id).is_some() {
            self.insert(id, layer);
        }
    }

    /// Raise a transient family as one unit: the parent first, then each
    /// child in the given order directly above it.
    pub fn raise_family(&mut self, parent: Xid, children: &[Xid]) {
        self.raise(parent);
        let mut below = parent;
        for &c in children {
            if self.stack_above(c, below) {
                below = c;
            }
        }
    }

    /// Lower a transient family as one unit: children keep their relative
    /// order on top of the parent, the parent goes to the layer bottom last.
    pub fn lower_family(&mut self, parent: Xid, children: &[Xid]) {
        for &c in children.iter().rev() {
            self.lower(c);
        }
        self.lower(parent);
    }

    /// Verify the layer-major invariant. Used by debug assertions and tests.
    pub fn is_layer_sorted(&self) -> bool {
        self.entries.windows(2).all(|p| p[0].layer <= p[1].layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;
    use simple_test_case::test_case;

    fn ids(s: &StackingList) -> Vec<u32> {
        s.ids().into_iter().map(|id| *id).collect()
    }

    fn listed(entries: &[(u32, Layer)]) -> StackingList {
        let mut s = StackingList::new();
        for &(id, layer) in entries {
            s.insert(Xid(id), layer);
        }
        s
    }

    #[test]
    fn insert_is_layer_major_insertion_minor() {
        let s = listed(&[
            (1, Layer::Normal),
            (2, Layer::Desktop),
            (3, Layer::Normal),
            (4, Layer::Dock),
            (5, Layer::Below),
        ]);

        assert_eq!(ids(&s), vec![2, 5, 1, 3, 4]);
        assert!(s.is_layer_sorted());
    }

    #[test]
    fn raise_moves_to_layer_top_only() {
        let mut s = listed(&[(1, Layer::Normal), (2, Layer::Normal), (3, Layer::Dock)]);

        s.raise(Xid(1));

        // 1 passes 2 but never 3 which is in a higher layer
        assert_eq!(ids(&s), vec![2, 1, 3]);
    }

    #[test]
    fn lower_moves_to_layer_bottom_only() {
        let mut s = listed(&[(1, Layer::Desktop), (2, Layer::Normal), (3, Layer::Normal)]);

        s.lower(Xid(3));

        assert_eq!(ids(&s), vec![1, 3, 2]);
    }

    #[test_case(&[(1, Layer::Normal), (2, Layer::Normal), (3, Layer::Normal)]; "single layer")]
    #[test_case(&[(1, Layer::Desktop), (2, Layer::Normal), (3, Layer::OnTop)]; "spread layers")]
    #[test]
    fn raise_and_lower_are_idempotent(entries: &[(u32, Layer)]) {
        let mut s = listed(entries);

        s.raise(Xid(1));
        let once = ids(&s);
        s.raise(Xid(1));
        assert_eq!(ids(&s), once);

        s.lower(Xid(3));
        let once = ids(&s);
        s.lower(Xid(3));
        assert_eq!(ids(&s), once);
    }

    #[test]
    fn swap_in_stack() {
        let mut s = listed(&[
            (0, Layer::Normal),
            (1, Layer::Normal),
            (2, Layer::Normal),
            (3, Layer::Normal),
            (4, Layer::Normal),
        ]);

        assert!(s.swap(Xid(2), Xid(4)));
        assert_eq!(ids(&s), vec![0, 1, 4, 3, 2]);

        assert!(s.swap(Xid(2), Xid(0)));
        assert_eq!(ids(&s), vec![2, 1, 4, 3, 0]);
    }

    #[test]
    fn stack_above_target() {
        let mut s = listed(&[
            (0, Layer::Normal),
            (1, Layer::Normal),
            (2, Layer::Normal),
            (3, Layer::Normal),
            (4, Layer::Normal),
        ]);

        assert!(s.stack_above(Xid(1), Xid(3)));
        assert_eq!(ids(&s), vec![0, 2, 3, 1, 4]);
    }

    #[test]
    fn stack_above_missing_target_restores() {
        let mut s = listed(&[(0, Layer::Normal), (1, Layer::Normal)]);

        assert!(!s.stack_above(Xid(0), Xid(9)));
        assert_eq!(ids(&s), vec![0, 1]);
    }

    #[test]
    fn family_raise_keeps_parent_below_children() {
        let mut s = listed(&[
            (1, Layer::Normal),
            (10, Layer::Normal),
            (11, Layer::Normal),
            (2, Layer::Normal),
        ]);

        s.raise_family(Xid(1), &[Xid(10), Xid(11)]);

        assert_eq!(ids(&s), vec![2, 1, 10, 11]);
    }

    #[test]
    fn family_lower_puts_parent_at_bottom() {
        let mut s = listed(&[
            (2, Layer::Normal),
            (1, Layer::Normal),
            (10, Layer::Normal),
            (11, Layer::Normal),
        ]);

        s.lower_family(Xid(1), &[Xid(10), Xid(11)]);

        assert_eq!(ids(&s), vec![1, 10, 11, 2]);
    }

    #[derive(Debug, Clone, Copy)]
    struct AnyLayer(Layer);

    impl Arbitrary for AnyLayer {
        fn arbitrary(g: &mut Gen) -> Self {
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
            AnyLayer(*g.choose(&layers).unwrap())
        }
    }

    #[quickcheck]
    fn arbitrary_inserts_preserve_layer_order(layers: Vec<AnyLayer>) -> bool {
        let mut s = StackingList::new();
        for (i, AnyLayer(layer)) in layers.into_iter().enumerate() {
            s.insert(Xid(i as u32), layer);
        }

        s.is_layer_sorted()
    }

    #[quickcheck]
    fn arbitrary_raises_preserve_layer_order(layers: Vec<AnyLayer>, raises: Vec<usize>) -> bool {
        let mut s = StackingList::new();
        let n = layers.len();
        for (i, AnyLayer(layer)) in layers.into_iter().enumerate() {
            s.insert(Xid(i as u32), layer);
        }
        for r in raises {
            if n > 0 {
                s.raise(Xid((r % n) as u32));
            }
        }

        s.is_layer_sorted()
    }
}
