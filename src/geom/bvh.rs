use super::BBox;

#[derive(Debug, Clone, Copy)]
struct BvhNode {
    bbox: BBox,
    left: u32,
    right: u32,
    start: u32,
    count: u32,
}

impl BvhNode {
    const fn leaf(bbox: BBox, start: u32, count: u32) -> Self {
        Self {
            bbox,
            left: u32::MAX,
            right: u32::MAX,
            start,
            count,
        }
    }

    const fn inner(bbox: BBox, left: u32, right: u32) -> Self {
        Self {
            bbox,
            left,
            right,
            start: 0,
            count: 0,
        }
    }

    const fn is_leaf(self) -> bool {
        self.count != 0
    }
}

/// Median-split bounding volume hierarchy over primitive boxes.
#[derive(Debug, Clone)]
pub(crate) struct Bvh {
    nodes: Vec<BvhNode>,
    prim_indices: Vec<u32>,
}

impl Bvh {
    const LEAF_SIZE: usize = 8;

    #[must_use]
    pub(crate) fn build(bboxes: &[BBox]) -> Option<Self> {
        if bboxes.is_empty() {
            return None;
        }

        let mut bvh = Self {
            nodes: Vec::with_capacity(bboxes.len().saturating_mul(2)),
            prim_indices: (0..bboxes.len() as u32).collect(),
        };
        bvh.build_node(bboxes, 0, bboxes.len());
        Some(bvh)
    }

    fn build_node(&mut self, bboxes: &[BBox], start: usize, end: usize) -> u32 {
        let node_index = self.nodes.len() as u32;
        let bbox = self.prim_indices[start + 1..end]
            .iter()
            .fold(bboxes[self.prim_indices[start] as usize], |acc, &i| {
                acc.union(bboxes[i as usize])
            });
        self.nodes.push(BvhNode::leaf(bbox, start as u32, (end - start) as u32));

        let count = end - start;
        if count <= Self::LEAF_SIZE {
            return node_index;
        }

        let size = bbox.size();
        let axis = if size.x >= size.y && size.x >= size.z {
            0
        } else if size.y >= size.z {
            1
        } else {
            2
        };
        let key = |i: u32| {
            let c = bboxes[i as usize].center();
            [c.x, c.y, c.z][axis]
        };

        let mid = start + count / 2;
        self.prim_indices[start..end]
            .select_nth_unstable_by(mid - start, |a, b| key(*a).total_cmp(&key(*b)));

        let left = self.build_node(bboxes, start, mid);
        let right = self.build_node(bboxes, mid, end);
        self.nodes[node_index as usize] = BvhNode::inner(bbox, left, right);
        node_index
    }

    /// Visits primitives whose box intersects `query` until `visit` returns
    /// `false`.
    pub(crate) fn query_bbox<F>(&self, query: BBox, mut visit: F)
    where
        F: FnMut(usize) -> bool,
    {
        let mut stack = vec![0u32];
        while let Some(node_idx) = stack.pop() {
            let node = self.nodes[node_idx as usize];
            if !node.bbox.intersects(query) {
                continue;
            }

            if node.is_leaf() {
                let start = node.start as usize;
                let end = start + node.count as usize;
                for &prim in &self.prim_indices[start..end] {
                    if !visit(prim as usize) {
                        return;
                    }
                }
                continue;
            }

            stack.push(node.left);
            stack.push(node.right);
        }
    }

    /// Returns `true` if any primitive box intersects `query`.
    #[must_use]
    pub(crate) fn any_overlap(&self, query: BBox, bboxes: &[BBox]) -> bool {
        let mut hit = false;
        self.query_bbox(query, |i| {
            hit = bboxes[i].intersects(query);
            !hit
        });
        hit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Point3;

    fn unit_box_at(x: f64) -> BBox {
        BBox::new(Point3::new(x, 0.0, 0.0), Point3::new(x + 1.0, 1.0, 1.0))
    }

    #[test]
    fn query_returns_only_intersecting_primitives() {
        let bboxes: Vec<BBox> = (0..40).map(|i| unit_box_at(f64::from(i) * 2.0)).collect();
        let bvh = Bvh::build(&bboxes).expect("non-empty");

        let query = BBox::new(Point3::new(9.5, 0.2, 0.2), Point3::new(12.5, 0.4, 0.4));
        let mut hits = Vec::new();
        bvh.query_bbox(query, |i| {
            if bboxes[i].intersects(query) {
                hits.push(i);
            }
            true
        });
        hits.sort_unstable();
        assert_eq!(hits, vec![5, 6]);

        assert!(bvh.any_overlap(query, &bboxes));
        let miss = BBox::new(Point3::new(1.2, 0.0, 0.0), Point3::new(1.8, 1.0, 1.0));
        assert!(!bvh.any_overlap(miss, &bboxes));
    }

    #[test]
    fn empty_input_has_no_tree() {
        assert!(Bvh::build(&[]).is_none());
    }
}
