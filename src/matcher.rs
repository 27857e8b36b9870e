//! Attaches recognized text to detected components.
//!
//! Two strategies share the [`TextMatcher`] interface:
//!
//! - [`IndexedMatcher`] (feature `spatial-index`): R-tree over component
//!   boxes; each text block goes to the smallest-area component whose box
//!   intersects it, ties broken by lowest detection index.
//! - [`BruteForceMatcher`]: always available; each text block goes to the
//!   first component (detection order) containing the block's top-left
//!   corner. No area comparison, so nested components are not resolved to
//!   the innermost one.
//!
//! Both are two-phase: the input components are left untouched and a new
//! annotated sequence is returned. A component receives text at most once;
//! a block whose chosen component is already taken stays an orphan.

use tracing::{debug, info};

use crate::config::MatchStrategy;
use crate::types::{Component, TextBlock};

pub trait TextMatcher: Send + Sync {
    fn name(&self) -> &'static str;

    /// Component index chosen for `block`, before the at-most-once rule.
    fn candidate(&self, components: &[Component], block: &TextBlock) -> Option<usize>;

    fn match_text(&self, components: &[Component], blocks: &[TextBlock]) -> Vec<Component> {
        let mut matched = components.to_vec();
        let mut assigned = 0usize;
        for (block_index, block) in blocks.iter().enumerate() {
            let Some(idx) = self.candidate(components, block) else {
                continue;
            };
            let target = &mut matched[idx];
            if target.has_text() {
                debug!(component = idx, text = %block.text, "component already labeled; block stays orphan");
                continue;
            }
            *target = target.clone().with_text(block.text.clone(), block_index);
            assigned += 1;
        }
        info!(
            strategy = self.name(),
            components = components.len(),
            blocks = blocks.len(),
            assigned,
            "matched text to components"
        );
        matched
    }
}

/// Point-in-rectangle on the text block's top-left corner; first hit wins.
#[derive(Debug, Default, Clone, Copy)]
pub struct BruteForceMatcher;

impl TextMatcher for BruteForceMatcher {
    fn name(&self) -> &'static str {
        "brute-force"
    }

    fn candidate(&self, components: &[Component], block: &TextBlock) -> Option<usize> {
        let corner = crate::types::Point::new(block.bounding_box.x, block.bounding_box.y);
        components
            .iter()
            .position(|c| c.bounding_box.contains_point(corner))
    }
}

/// Smallest intersecting component, looked up through an R-tree.
#[cfg(feature = "spatial-index")]
#[derive(Debug, Default, Clone, Copy)]
pub struct IndexedMatcher;

#[cfg(feature = "spatial-index")]
mod index {
    use rstar::{RTree, RTreeObject, AABB};

    use crate::types::{BoundingBox, Component};

    pub(super) struct IndexedBox {
        pub index: usize,
        pub bbox: BoundingBox,
    }

    impl RTreeObject for IndexedBox {
        type Envelope = AABB<[i64; 2]>;

        fn envelope(&self) -> Self::Envelope {
            envelope_of(&self.bbox)
        }
    }

    pub(super) fn envelope_of(bbox: &BoundingBox) -> AABB<[i64; 2]> {
        AABB::from_corners(
            [i64::from(bbox.x), i64::from(bbox.y)],
            [i64::from(bbox.right()), i64::from(bbox.bottom())],
        )
    }

    pub(super) fn build(components: &[Component]) -> RTree<IndexedBox> {
        RTree::bulk_load(
            components
                .iter()
                .enumerate()
                .map(|(index, c)| IndexedBox {
                    index,
                    bbox: c.bounding_box,
                })
                .collect(),
        )
    }
}

#[cfg(feature = "spatial-index")]
impl IndexedMatcher {
    fn smallest_hit(tree: &rstar::RTree<index::IndexedBox>, block: &TextBlock) -> Option<usize> {
        let query = index::envelope_of(&block.bounding_box);
        tree.locate_in_envelope_intersecting(&query)
            // Envelope tests are closed; keep positive-area overlaps only.
            .filter(|hit| hit.bbox.intersects(&block.bounding_box))
            .min_by_key(|hit| (hit.bbox.area(), hit.index))
            .map(|hit| hit.index)
    }
}

#[cfg(feature = "spatial-index")]
impl TextMatcher for IndexedMatcher {
    fn name(&self) -> &'static str {
        "indexed"
    }

    fn candidate(&self, components: &[Component], block: &TextBlock) -> Option<usize> {
        let tree = index::build(components);
        Self::smallest_hit(&tree, block)
    }

    fn match_text(&self, components: &[Component], blocks: &[TextBlock]) -> Vec<Component> {
        let tree = index::build(components);
        let indexed = PrebuiltIndex { tree: &tree };
        indexed.match_text(components, blocks)
    }
}

/// Reuses one R-tree across all blocks of a single match call.
#[cfg(feature = "spatial-index")]
struct PrebuiltIndex<'a> {
    tree: &'a rstar::RTree<index::IndexedBox>,
}

#[cfg(feature = "spatial-index")]
impl TextMatcher for PrebuiltIndex<'_> {
    fn name(&self) -> &'static str {
        "indexed"
    }

    fn candidate(&self, _components: &[Component], block: &TextBlock) -> Option<usize> {
        IndexedMatcher::smallest_hit(self.tree, block)
    }
}

/// True when the R-tree strategy is compiled into this build.
#[inline]
pub const fn index_available() -> bool {
    cfg!(feature = "spatial-index")
}

/// Indexed when available, brute force otherwise.
pub fn default_matcher() -> Box<dyn TextMatcher> {
    #[cfg(feature = "spatial-index")]
    {
        Box::new(IndexedMatcher)
    }
    #[cfg(not(feature = "spatial-index"))]
    {
        Box::new(BruteForceMatcher)
    }
}

/// Resolves a configured strategy. Returns `None` when `Indexed` is
/// requested but not compiled in.
pub fn matcher_for(strategy: MatchStrategy) -> Option<Box<dyn TextMatcher>> {
    match strategy {
        MatchStrategy::Auto => Some(default_matcher()),
        MatchStrategy::BruteForce => Some(Box::new(BruteForceMatcher)),
        #[cfg(feature = "spatial-index")]
        MatchStrategy::Indexed => Some(Box::new(IndexedMatcher)),
        #[cfg(not(feature = "spatial-index"))]
        MatchStrategy::Indexed => None,
    }
}
