use std::collections::{HashMap, HashSet};

/// Undirected edge key, smaller index first.
pub(crate) fn edge_key(a: u32, b: u32) -> (u32, u32) {
    (a.min(b), a.max(b))
}

fn edge_counts(indices: &[u32]) -> HashMap<(u32, u32), u32> {
    let mut counts: HashMap<(u32, u32), u32> = HashMap::new();
    for tri in indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0], tri[1], tri[2]);
        if i0 == i1 || i1 == i2 || i0 == i2 {
            continue;
        }
        for (a, b) in [(i0, i1), (i1, i2), (i2, i0)] {
            *counts.entry(edge_key(a, b)).or_insert(0) += 1;
        }
    }
    counts
}

/// Edges used by exactly one triangle.
pub(crate) fn open_edges(indices: &[u32]) -> HashSet<(u32, u32)> {
    edge_counts(indices)
        .into_iter()
        .filter_map(|(edge, count)| (count == 1).then_some(edge))
        .collect()
}

/// Counts (open, non-manifold) undirected edges of an indexed triangle list.
pub(crate) fn count_edge_topology(indices: &[u32]) -> (usize, usize) {
    edge_counts(indices)
        .values()
        .fold((0, 0), |(open, non_manifold), &count| match count {
            1 => (open + 1, non_manifold),
            2 => (open, non_manifold),
            _ => (open, non_manifold + 1),
        })
}

/// Number of vertex-connected components among the referenced vertices.
///
/// Two triangles belong to the same component when they share a vertex
/// index, so the mesh should be welded beforehand.
#[must_use]
pub fn connected_components(vertex_count: usize, indices: &[u32]) -> usize {
    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    let mut parent: Vec<usize> = (0..vertex_count).collect();
    let mut used = vec![false; vertex_count];

    for tri in indices.chunks_exact(3) {
        let corners = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if corners.iter().any(|&c| c >= vertex_count) {
            continue;
        }
        for &c in &corners {
            used[c] = true;
        }
        for &c in &corners[1..] {
            let ra = find(&mut parent, corners[0]);
            let rb = find(&mut parent, c);
            if ra != rb {
                parent[rb] = ra;
            }
        }
    }

    (0..vertex_count)
        .filter(|&i| used[i] && find(&mut parent, i) == i)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_triangle_has_three_open_edges() {
        assert_eq!(count_edge_topology(&[0, 1, 2]), (3, 0));
    }

    #[test]
    fn shared_diagonal_is_not_open() {
        let indices = [0, 1, 2, 0, 2, 3];
        let open = open_edges(&indices);
        assert_eq!(open.len(), 4);
        assert!(!open.contains(&edge_key(2, 0)));
        assert!(open.contains(&edge_key(3, 0)));
    }

    #[test]
    fn fan_of_three_on_one_edge_is_non_manifold() {
        let indices = [0, 1, 2, 1, 0, 3, 0, 1, 4];
        let (_, non_manifold) = count_edge_topology(&indices);
        assert_eq!(non_manifold, 1);
    }

    #[test]
    fn components_join_through_shared_vertices() {
        // Two triangles touching at vertex 2, a third one apart.
        let indices = [0, 1, 2, 2, 3, 4, 5, 6, 7];
        assert_eq!(connected_components(8, &indices), 2);
    }

    #[test]
    fn unreferenced_vertices_are_ignored() {
        assert_eq!(connected_components(10, &[0, 1, 2]), 1);
        assert_eq!(connected_components(4, &[]), 0);
    }
}
