/// HNSW candidate graph
use super::{IndexEntry, Metric};
use hnsw_rs::prelude::*;
use std::collections::HashMap;

/// Upper bound on HNSW layers (hnsw_rs caps at 16)
const MAX_LAYERS: usize = 16;

enum Graph {
    Cosine(Hnsw<'static, f32, DistCosine>),
    L2(Hnsw<'static, f32, DistL2>),
}

/// HNSW graph over entry positions.
///
/// Entries with bit-identical vectors form a group. The graph only needs to
/// reach one member of a group: every proposed position is widened to its
/// whole group, so exact rescoring can break the tie by position.
pub(crate) struct AnnGraph {
    graph: Graph,
    groups: Vec<Vec<usize>>,
    group_of: Vec<usize>,
}

impl AnnGraph {
    /// Insert every entry, using its build position as the point id
    pub(crate) fn build(
        entries: &[IndexEntry],
        metric: Metric,
        m: usize,
        ef_construction: usize,
    ) -> Self {
        let max_elements = entries.len().max(1);

        let graph = match metric {
            Metric::Cosine => {
                let graph =
                    Hnsw::<f32, DistCosine>::new(m, max_elements, MAX_LAYERS, ef_construction, DistCosine);
                for (position, entry) in entries.iter().enumerate() {
                    graph.insert((&entry.vector, position));
                }
                Graph::Cosine(graph)
            }
            Metric::L2 => {
                let graph =
                    Hnsw::<f32, DistL2>::new(m, max_elements, MAX_LAYERS, ef_construction, DistL2);
                for (position, entry) in entries.iter().enumerate() {
                    graph.insert((&entry.vector, position));
                }
                Graph::L2(graph)
            }
        };

        let (groups, group_of) = duplicate_groups(entries);

        Self {
            graph,
            groups,
            group_of,
        }
    }

    /// Candidate positions for the `k` nearest entries, sorted, without
    /// duplicates. At least `max(ef_search, k)` neighbours are requested
    /// from the graph before widening to duplicate groups.
    pub(crate) fn search(&self, query: &[f32], k: usize, ef_search: usize) -> Vec<usize> {
        let fetch = ef_search.max(k);
        let neighbours = match &self.graph {
            Graph::Cosine(graph) => graph.search(query, fetch, fetch),
            Graph::L2(graph) => graph.search(query, fetch, fetch),
        };

        let mut positions: Vec<usize> = neighbours
            .into_iter()
            .filter_map(|n| self.group_of.get(n.d_id))
            .flat_map(|&group| self.groups[group].iter().copied())
            .collect();
        positions.sort_unstable();
        positions.dedup();
        positions
    }
}

/// Group entry positions by identical vector bits, in position order
fn duplicate_groups(entries: &[IndexEntry]) -> (Vec<Vec<usize>>, Vec<usize>) {
    let mut by_vector: HashMap<Vec<u32>, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut group_of = Vec::with_capacity(entries.len());

    for (position, entry) in entries.iter().enumerate() {
        // -0.0 and 0.0 are the same point
        let key: Vec<u32> = entry
            .vector
            .iter()
            .map(|x| if *x == 0.0 { 0 } else { x.to_bits() })
            .collect();

        let group = *by_vector.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[group].push(position);
        group_of.push(group);
    }

    (groups, group_of)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::Chunk;

    fn entry(position: usize, vector: Vec<f32>) -> IndexEntry {
        let text = format!("chunk {}", position);
        IndexEntry::new(
            Chunk {
                source: "doc.txt".to_string(),
                ordinal: position,
                start: 0,
                end: text.chars().count(),
                byte_start: 0,
                byte_end: text.len(),
                overlap: 0,
                text,
            },
            vector,
        )
    }

    #[test]
    fn test_duplicate_groups() {
        let entries = vec![
            entry(0, vec![1.0, 0.0]),
            entry(1, vec![0.0, 1.0]),
            entry(2, vec![1.0, -0.0]),
            entry(3, vec![1.0, 0.0]),
        ];
        let (groups, group_of) = duplicate_groups(&entries);

        assert_eq!(groups, vec![vec![0, 2, 3], vec![1]]);
        assert_eq!(group_of, vec![0, 1, 0, 0]);
    }

    #[test]
    fn test_search_widens_to_whole_group() {
        let mut entries: Vec<IndexEntry> = (0..20).map(|i| entry(i, vec![1.0, 0.0, 0.0])).collect();
        entries.push(entry(20, vec![0.0, 1.0, 0.0]));
        entries.push(entry(21, vec![0.0, 0.0, 1.0]));

        let graph = AnnGraph::build(&entries, Metric::Cosine, 16, 200);
        let positions = graph.search(&[1.0, 0.0, 0.0], 2, 2);

        for position in 0..20 {
            assert!(positions.contains(&position));
        }
    }
}
