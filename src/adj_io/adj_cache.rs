use std::collections::btree_map;
use std::collections::BTreeMap;

use crate::types::graph_query::GraphQuery;
use crate::types::{AdjacencyRecord, VertexId};

/// Append-only map from vertex id to its resolved adjacency.
///
/// Entries are never evicted nor replaced: once a vertex is resolved, found in
/// the source or confirmed absent, its record is fixed for the run. Iteration
/// is in ascending id order, which is what makes push passes reproducible.
#[derive(Debug, Clone, Default)]
pub struct AdjacencyCache {
    records: BTreeMap<VertexId, AdjacencyRecord>,
}

impl AdjacencyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, vertex_id: &str) -> Option<&AdjacencyRecord> {
        self.records.get(vertex_id)
    }

    pub fn contains(&self, vertex_id: &str) -> bool {
        self.records.contains_key(vertex_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates over resolved vertices in ascending id order.
    pub fn iter(&self) -> btree_map::Iter<'_, VertexId, AdjacencyRecord> {
        self.records.iter()
    }

    /// Inserts a record unless the vertex is already resolved.
    ///
    /// Returns `true` when the record was inserted.
    pub(crate) fn insert(&mut self, vertex_id: VertexId, record: AdjacencyRecord) -> bool {
        match self.records.entry(vertex_id) {
            btree_map::Entry::Occupied(_) => false,
            btree_map::Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        }
    }

    /// Total number of cached edges, with multiplicity.
    pub fn edge_count(&self) -> usize {
        self.records.values().map(AdjacencyRecord::degree).sum()
    }
}

impl GraphQuery for AdjacencyCache {
    fn read_neighbor(&self, vertex_id: &str) -> &[VertexId] {
        self.records
            .get(vertex_id)
            .map(AdjacencyRecord::neighbors)
            .unwrap_or(&[])
    }

    fn has_vertex(&self, vertex_id: &str) -> bool {
        self.contains(vertex_id)
    }

    fn vertex_list(&self) -> Vec<VertexId> {
        self.records.keys().cloned().collect()
    }
}
