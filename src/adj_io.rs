use std::io::ErrorKind;

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::error::{LocalClusterError, Result};
use crate::io_status::{IOStatsCollector, ScanStats};
use crate::types::{check_tail, split_record_line, AdjacencyRecord, VertexId};

pub mod adj_cache;
pub mod source;

pub use adj_cache::AdjacencyCache;
pub use source::{AdjacencySource, FileSource, MemorySource};

/// Lines between two progress bar refreshes.
const PROGRESS_STRIDE: u64 = 4096;

/// What a single [`AdjacencyStore::resolve`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolveOutcome {
    /// Requested ids that were not cached yet.
    pub requested: usize,
    /// Of those, ids with a record in the source.
    pub found: usize,
    /// Of those, ids absent from the source, cached as dangling.
    pub dangling: usize,
    /// Cost of the pass; `None` when nothing had to be scanned.
    pub scan: Option<ScanStats>,
}

/// Lazy adjacency lookup over a source too large to load.
///
/// Vertices are resolved in batches, each batch costing one sequential pass
/// over the source. Resolved records accumulate in an [`AdjacencyCache`] that
/// only grows.
///
/// The first pass reads the whole source and checks every line, so a
/// malformed record fails the run no matter where it sits. Later passes stop
/// as soon as every requested id has been matched.
pub struct AdjacencyStore<S> {
    source: S,
    cache: AdjacencyCache,
    /// Set once a pass has read and checked the whole source.
    source_checked: bool,
    scan_count: u64,
    scan_totals: ScanStats,
    show_progress: bool,
}

impl<S: AdjacencySource> AdjacencyStore<S> {
    pub fn new(source: S) -> Self {
        AdjacencyStore {
            source,
            cache: AdjacencyCache::new(),
            source_checked: false,
            scan_count: 0,
            scan_totals: ScanStats::default(),
            show_progress: false,
        }
    }

    /// Draws a progress bar over the bytes of each pass.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cache(&self) -> &AdjacencyCache {
        &self.cache
    }

    pub fn into_cache(self) -> AdjacencyCache {
        self.cache
    }

    pub fn contains(&self, vertex_id: &str) -> bool {
        self.cache.contains(vertex_id)
    }

    pub fn neighbors(&self, vertex_id: &str) -> Option<&[VertexId]> {
        self.cache.get(vertex_id).map(AdjacencyRecord::neighbors)
    }

    pub fn degree(&self, vertex_id: &str) -> Option<usize> {
        self.cache.get(vertex_id).map(AdjacencyRecord::degree)
    }

    /// Number of passes performed over the source so far.
    pub fn scan_count(&self) -> u64 {
        self.scan_count
    }

    /// Accumulated cost of every pass so far.
    pub fn scan_totals(&self) -> ScanStats {
        self.scan_totals
    }

    /// Resolves a batch of vertex ids with a single pass over the source.
    ///
    /// Already cached ids are ignored; if none remain, no pass happens. Ids
    /// without a record in the source are cached as dangling so that they are
    /// never requested again. The first pass reads the source to its end;
    /// later passes end as soon as every requested id has been matched.
    ///
    /// # Errors
    /// * [`LocalClusterError::Io`] if the source cannot be opened or read
    /// * [`LocalClusterError::MalformedRecord`] for a line that is not valid
    ///   UTF-8, has no vertex id, or has an empty neighbour field
    ///
    /// On error the cache keeps whatever was inserted before the failing line,
    /// but the run is expected to abort.
    pub fn resolve<I>(&mut self, requested: I) -> Result<ResolveOutcome>
    where
        I: IntoIterator<Item = VertexId>,
    {
        let mut pending: FxHashSet<VertexId> = requested
            .into_iter()
            .filter(|v| !self.cache.contains(v))
            .collect();

        if pending.is_empty() {
            return Ok(ResolveOutcome::default());
        }

        let requested_count = pending.len();
        let measured = IOStatsCollector::measure(|| self.scan(&mut pending));
        let mut scan = measured.result?;
        scan.elapsed_us = measured.duration.as_micros() as u64;
        scan.io = measured.io_stats;

        // Whatever is left has no outgoing record in the source.
        let dangling_count = pending.len();
        for vertex in pending {
            debug!(
                "Vertex {:?} absent from {}; treated as dangling",
                vertex,
                self.source.path().display()
            );
            self.cache.insert(vertex, AdjacencyRecord::dangling());
        }

        self.scan_count += 1;
        self.scan_totals += scan;

        let outcome = ResolveOutcome {
            requested: requested_count,
            found: requested_count - dangling_count,
            dangling: dangling_count,
            scan: Some(scan),
        };
        info!(
            "Scan #{}: resolved {} vertices ({} found, {} dangling), \
             {} lines, {} bytes, {} us; cache holds {}",
            self.scan_count,
            outcome.requested,
            outcome.found,
            outcome.dangling,
            scan.lines_read,
            scan.bytes_read,
            scan.elapsed_us,
            self.cache.len()
        );
        Ok(outcome)
    }

    /// One sequential pass, moving matched ids from `pending` into the cache.
    fn scan(&mut self, pending: &mut FxHashSet<VertexId>) -> Result<ScanStats> {
        let mut reader = self.source.open()?;
        let path = self.source.path();

        let pb = if self.show_progress {
            let pb = ProgressBar::new(self.source.len_hint().unwrap_or(0));
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] \
                         {bytes}/{total_bytes} ({eta}) {msg}",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=>-"),
            );
            pb.set_message(format!("Resolving {} vertices.", pending.len()));
            pb
        } else {
            ProgressBar::hidden()
        };

        let full_pass = !self.source_checked;
        let mut stats = ScanStats::default();
        let mut line = String::new();
        let mut unreported_bytes = 0u64;

        while full_pass || !pending.is_empty() {
            line.clear();
            let read = match reader.read_line(&mut line) {
                Ok(read) => read,
                Err(e) if e.kind() == ErrorKind::InvalidData => {
                    return Err(LocalClusterError::MalformedRecord {
                        line: stats.lines_read + 1,
                        reason: "line is not valid UTF-8".to_string(),
                    });
                }
                Err(e) => return Err(LocalClusterError::io(e, path)),
            };
            if read == 0 {
                break;
            }
            stats.lines_read += 1;
            stats.bytes_read += read as u64;
            unreported_bytes += read as u64;

            if let Some((vertex, tail)) = split_record_line(&line, stats.lines_read)? {
                if pending.remove(vertex) {
                    let record = AdjacencyRecord::parse_tail(tail, stats.lines_read)?;
                    self.cache.insert(vertex.to_string(), record);
                } else {
                    check_tail(tail, stats.lines_read)?;
                }
            }

            if stats.lines_read % PROGRESS_STRIDE == 0 {
                pb.inc(unreported_bytes);
                unreported_bytes = 0;
            }
        }

        pb.inc(unreported_bytes);
        pb.finish_and_clear();
        if full_pass {
            debug!("Checked all {} lines of {}", stats.lines_read, path.display());
            self.source_checked = true;
        }
        Ok(stats)
    }
}
