use hashbrown::HashMap;
use rstar::{RTree, RTreeObject, AABB};

use crate::geometry::{Point, Rect};

use super::ids::ItemRef;
use super::FixedState;

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Obstacle {
    pub item: ItemRef,
    pub rect: Rect,
}

impl RTreeObject for Obstacle {
    type Envelope = AABB<Point>;

    fn envelope(&self) -> Self::Envelope {
        self.rect.envelope()
    }
}

/// R-tree over the rectangles of every placed block and diagram pin.
#[derive(Default)]
pub(crate) struct ObstacleIndex {
    tree: RTree<Obstacle>,
    rects: HashMap<ItemRef, Rect, FixedState>,
}

impl ObstacleIndex {
    pub fn upsert(&mut self, item: ItemRef, rect: Rect) {
        if let Some(previous) = self.rects.insert(item, rect) {
            if previous == rect {
                return;
            }
            self.tree.remove(&Obstacle { item, rect: previous });
        }
        self.tree.insert(Obstacle { item, rect });
    }

    pub fn remove(&mut self, item: ItemRef) {
        if let Some(rect) = self.rects.remove(&item) {
            self.tree.remove(&Obstacle { item, rect });
        }
    }

    pub fn rect(&self, item: ItemRef) -> Option<Rect> {
        self.rects.get(&item).copied()
    }

    pub fn overlaps_any(&self, rect: &Rect, ignore: Option<ItemRef>) -> bool {
        self.tree
            .locate_in_envelope_intersecting(&rect.envelope())
            .any(|obstacle| Some(obstacle.item) != ignore && obstacle.rect.overlaps(rect))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.rects.len()
    }
}
