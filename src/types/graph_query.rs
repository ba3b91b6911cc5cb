use crate::types::VertexId;

/// Read-only queries over an out-adjacency structure.
///
/// Implemented by the lazily populated adjacency cache and by induced
/// subgraphs, so that algorithms and exporters can work on either.
pub trait GraphQuery {
    /// Retrieves the ordered out-neighbours of a vertex.
    ///
    /// Returns an empty slice both for dangling vertices and for vertices the
    /// structure does not know; use [`GraphQuery::has_vertex`] to tell them apart.
    fn read_neighbor(&self, vertex_id: &str) -> &[VertexId];

    /// Checks if a vertex is known to this structure.
    fn has_vertex(&self, vertex_id: &str) -> bool;

    /// Retrieves a list of all known vertices.
    fn vertex_list(&self) -> Vec<VertexId>;

    /// Out-degree of a known vertex, counting duplicate edges.
    fn degree(&self, vertex_id: &str) -> Option<usize> {
        if self.has_vertex(vertex_id) {
            Some(self.read_neighbor(vertex_id).len())
        } else {
            None
        }
    }

    /// Determines if an edge exists from `src_id` to `dst_id`.
    fn has_edge(&self, src_id: &str, dst_id: &str) -> bool {
        self.read_neighbor(src_id).iter().any(|n| n == dst_id)
    }
}
