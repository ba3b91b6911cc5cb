use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;

use crate::algorithms::cluster::ClusterReport;
use crate::error::{LocalClusterError, Result};
use crate::types::graph_query::GraphQuery;
use crate::types::{InducedSubGraph, VertexId};

/// Writes `id<TAB>rank` lines.
pub fn write_ranking<W: Write>(writer: &mut W, pairs: &[(VertexId, f64)]) -> std::io::Result<()> {
    for (vertex, rank) in pairs {
        writeln!(writer, "{}\t{}", vertex, rank)?;
    }
    Ok(())
}

fn gdf_quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Writes the subgraph induced by `members` in GDF, the format read by Gephi.
///
/// Only edges between members are written. Returns the number of nodes and
/// edges emitted.
pub fn write_gdf<W, G>(
    writer: &mut W,
    members: &[VertexId],
    graph: &G,
) -> std::io::Result<(usize, usize)>
where
    W: Write,
    G: GraphQuery,
{
    let subgraph = InducedSubGraph::induce(graph, members);

    writeln!(writer, "nodedef>name VARCHAR")?;
    for (vertex, _) in &subgraph.vertex_list {
        writeln!(writer, "{}", gdf_quote(vertex))?;
    }

    writeln!(writer, "edgedef>node1 VARCHAR,node2 VARCHAR")?;
    for (src, dst) in subgraph.edges() {
        writeln!(writer, "{},{}", gdf_quote(src), gdf_quote(dst))?;
    }

    Ok((subgraph.vertex_count(), subgraph.edge_count()))
}

/// Serializes a run report as YAML.
pub fn write_report<W: Write>(writer: &mut W, report: &ClusterReport) -> Result<()> {
    serde_yaml::to_writer(writer, report)?;
    Ok(())
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| LocalClusterError::io(e, path))
}

/// [`write_gdf`] into a new file at `path`.
pub fn save_gdf<G: GraphQuery>(path: &Path, members: &[VertexId], graph: &G) -> Result<()> {
    let mut writer = create(path)?;
    let (nodes, edges) = write_gdf(&mut writer, members, graph)
        .and_then(|counts| writer.flush().map(|_| counts))
        .map_err(|e| LocalClusterError::io(e, path))?;
    info!("Wrote {} nodes and {} edges to {}", nodes, edges, path.display());
    Ok(())
}

/// [`write_report`] into a new file at `path`.
pub fn save_report(path: &Path, report: &ClusterReport) -> Result<()> {
    let mut writer = create(path)?;
    write_report(&mut writer, report)?;
    writer.flush().map_err(|e| LocalClusterError::io(e, path))
}
