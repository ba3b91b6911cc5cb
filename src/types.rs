use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{LocalClusterError, Result};
use crate::types::graph_query::GraphQuery;

pub mod graph_query;

/// Opaque vertex identifier as it appears in the adjacency source.
pub type VertexId = String;

/// Field separator of the adjacency source.
pub const FIELD_SEPARATOR: char = '\t';

/// The ordered out-neighbour list of one vertex.
///
/// Duplicates and self loops are kept exactly as written in the source, so
/// `degree` counts edges with multiplicity. An empty list is a valid, explicit
/// state: the vertex is dangling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjacencyRecord {
    neighbors: Vec<VertexId>,
}

impl AdjacencyRecord {
    pub fn new(neighbors: Vec<VertexId>) -> Self {
        AdjacencyRecord { neighbors }
    }

    /// Record of a vertex without out-edges.
    pub fn dangling() -> Self {
        AdjacencyRecord::default()
    }

    pub fn neighbors(&self) -> &[VertexId] {
        &self.neighbors
    }

    pub fn degree(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_dangling(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// Parses the neighbour part of a line (everything after the first tab).
    ///
    /// An absent or empty tail yields a dangling record; an empty field in a
    /// non-empty tail (two consecutive tabs, or a trailing tab after a
    /// neighbour) is rejected.
    ///
    /// # Arguments
    /// * `tail` - Neighbour fields, `None` if the line had no tab at all
    /// * `line` - 1-based line number, used in diagnostics
    pub fn parse_tail(tail: Option<&str>, line: u64) -> Result<Self> {
        check_tail(tail, line)?;
        let neighbors = match tail {
            None | Some("") => Vec::new(),
            Some(tail) => tail.split(FIELD_SEPARATOR).map(str::to_string).collect(),
        };
        Ok(AdjacencyRecord { neighbors })
    }
}

/// Checks the neighbour part of a line without building a record.
///
/// Every line a scan reads goes through this, requested or not, so a
/// malformed record is reported wherever it sits in the source.
pub fn check_tail(tail: Option<&str>, line: u64) -> Result<()> {
    let tail = match tail {
        None | Some("") => return Ok(()),
        Some(tail) => tail,
    };
    match tail.split(FIELD_SEPARATOR).position(str::is_empty) {
        None => Ok(()),
        Some(field) => Err(LocalClusterError::MalformedRecord {
            line,
            reason: format!("empty neighbour id in field {}", field + 2),
        }),
    }
}

/// Splits a raw source line into its vertex id and neighbour tail.
///
/// Returns `Ok(None)` for blank lines (empty or spaces only), which are not
/// records. A line whose vertex id is empty, including a line made of tabs,
/// cannot be attributed to any vertex and is rejected.
pub fn split_record_line(raw: &str, line: u64) -> Result<Option<(&str, Option<&str>)>> {
    let trimmed = raw.trim_end_matches(['\n', '\r']);
    if trimmed.trim_matches(' ').is_empty() {
        return Ok(None);
    }

    let mut parts = trimmed.splitn(2, FIELD_SEPARATOR);
    let vertex = parts.next().unwrap_or_default();
    if vertex.is_empty() {
        return Err(LocalClusterError::MalformedRecord {
            line,
            reason: "empty vertex id".to_string(),
        });
    }
    Ok(Some((vertex, parts.next())))
}

/// A small in-memory subgraph induced by a vertex subset.
/// Used to export a community together with the edges between its members.
#[derive(Debug)]
pub struct InducedSubGraph {
    /// Vertices of the subgraph, each with the offset of its first neighbour.
    pub vertex_list: Vec<(VertexId, usize)>,

    /// Flattened neighbour lists, restricted to members of the subgraph.
    pub neighbor_list: Vec<VertexId>,

    /// Position of each vertex in `vertex_list`.
    pub vertex_index: FxHashMap<VertexId, usize>,
}

impl InducedSubGraph {
    /// Induces the subgraph of `members` over an adjacency lookup.
    ///
    /// Vertex order follows `members`; neighbour order follows the source.
    /// Members without known adjacency are kept as isolated vertices.
    pub fn induce<G: GraphQuery>(graph: &G, members: &[VertexId]) -> Self {
        let member_set: FxHashSet<&str> = members.iter().map(String::as_str).collect();

        let mut vertex_list = Vec::with_capacity(members.len());
        let mut neighbor_list = Vec::new();
        let mut vertex_index = FxHashMap::default();

        for vertex in members {
            if vertex_index.contains_key(vertex) {
                continue;
            }
            vertex_index.insert(vertex.clone(), vertex_list.len());
            vertex_list.push((vertex.clone(), neighbor_list.len()));
            neighbor_list.extend(
                graph
                    .read_neighbor(vertex)
                    .iter()
                    .filter(|n| member_set.contains(n.as_str()))
                    .cloned(),
            );
        }

        InducedSubGraph {
            vertex_list,
            neighbor_list,
            vertex_index,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_list.len()
    }

    pub fn edge_count(&self) -> usize {
        self.neighbor_list.len()
    }

    /// Iterates over `(source, target)` pairs in vertex order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.vertex_list.iter().flat_map(move |(vertex, _)| {
            self.read_neighbor(vertex)
                .iter()
                .map(move |n| (vertex.as_str(), n.as_str()))
        })
    }
}

impl GraphQuery for InducedSubGraph {
    fn read_neighbor(&self, vertex_id: &str) -> &[VertexId] {
        let idx = match self.vertex_index.get(vertex_id) {
            None => return &[],
            Some(idx) => *idx,
        };
        let start = self.vertex_list[idx].1;
        let end = if idx + 1 == self.vertex_list.len() {
            self.neighbor_list.len()
        } else {
            self.vertex_list[idx + 1].1
        };
        &self.neighbor_list[start..end]
    }

    fn has_vertex(&self, vertex_id: &str) -> bool {
        self.vertex_index.contains_key(vertex_id)
    }

    fn vertex_list(&self) -> Vec<VertexId> {
        self.vertex_list.iter().map(|(v, _)| v.clone()).collect()
    }
}
