//! Delegation of expensive metrics to an external calculator process.
//!
//! Centrality, clustering, diameter and clique metrics are computed by
//! an external executable rather than in-process. The contract is file
//! based: the graph's edges are serialised to a temporary edge-list
//! file, the calculator is invoked as
//! `<calculator> <edgeFile> <true|false> <bitmask> <outputFile>`, and
//! its output file is handed back to the caller to parse. A non-empty
//! error stream means failure, and every temporary file — inputs and
//! any partial output — is deleted before the error propagates. Once
//! the subprocess has started there is no cancellation; the call blocks
//! until it exits.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::{BitOr, BitOrAssign};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{Directedness, Graph, GroupInfo};

/// Error returned by [`ExternalMetrics::calculate`].
#[derive(Debug, Error)]
pub enum ExternalMetricsError {
    #[error("i/o failure during metric delegation")]
    Io(#[from] std::io::Error),

    /// The calculator wrote to its error stream.
    #[error("metrics calculator reported errors: {stderr}")]
    CalculatorFailed { stderr: String },

    /// The calculator exited cleanly but produced no output file.
    #[error("metrics calculator produced no output file")]
    MissingOutput,

    /// A numeric field in the output file failed to parse.
    #[error("malformed numeric field in calculator output: {field:?}")]
    MalformedOutput { field: String },
}

/// Bitmask selecting which metrics the external calculator computes.
///
/// Flags combine with `|`; [`MetricSelection::bits`] is the integer
/// passed on the calculator's command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricSelection(u32);

impl MetricSelection {
    pub const NONE: Self = Self(0);
    pub const IN_DEGREE: Self = Self(1 << 0);
    pub const OUT_DEGREE: Self = Self(1 << 1);
    pub const DEGREE: Self = Self(1 << 2);
    pub const BETWEENNESS_CLOSENESS: Self = Self(1 << 3);
    pub const EIGENVECTOR: Self = Self(1 << 4);
    pub const PAGERANK: Self = Self(1 << 5);
    pub const CLUSTERING_COEFFICIENT: Self = Self(1 << 6);
    pub const RECIPROCATED_PAIR_RATIO: Self = Self(1 << 7);
    pub const GEODESIC_DISTANCE: Self = Self(1 << 8);
    pub const GROUP_METRICS: Self = Self(1 << 9);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for MetricSelection {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for MetricSelection {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// The calculator's output file, alive until dropped.
///
/// Dropping this deletes the output file together with the temporary
/// input files; parse what you need first.
#[derive(Debug)]
pub struct MetricsOutput {
    // Holds the scratch directory open; dropping it deletes every
    // file the delegation produced.
    _dir: TempDir,
    path: PathBuf,
}

impl MetricsOutput {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_to_string(&self) -> Result<String, ExternalMetricsError> {
        Ok(std::fs::read_to_string(&self.path)?)
    }
}

/// Handle to the external metrics calculator executable.
#[derive(Debug, Clone)]
pub struct ExternalMetrics {
    calculator: PathBuf,
    temp_parent: Option<PathBuf>,
}

impl ExternalMetrics {
    pub fn new(calculator: impl Into<PathBuf>) -> Self {
        Self {
            calculator: calculator.into(),
            temp_parent: None,
        }
    }

    /// Place the temporary scratch directory under `parent` instead of
    /// the system temp directory.
    pub fn with_temp_parent(mut self, parent: impl Into<PathBuf>) -> Self {
        self.temp_parent = Some(parent.into());
        self
    }

    /// Runs the external calculator over the graph's edges.
    ///
    /// Serialises one line per edge (two tab-separated integer vertex
    /// IDs) and, when [`MetricSelection::GROUP_METRICS`] is selected, a
    /// companion `<edgeFile>groups` file with one tab-separated line of
    /// member vertex IDs per group; members with degree zero are left
    /// out and groups emptied by that filter are skipped. The
    /// directedness flag passed to the calculator is `true` exactly
    /// when the graph's policy is [`Directedness::Directed`].
    ///
    /// On success the returned [`MetricsOutput`] owns the output file;
    /// on any failure all temporary files are deleted before the error
    /// is returned.
    pub fn calculate(
        &self,
        graph: &Graph,
        selection: MetricSelection,
        groups: &[GroupInfo],
    ) -> Result<MetricsOutput, ExternalMetricsError> {
        let dir = match &self.temp_parent {
            Some(parent) => TempDir::new_in(parent)?,
            None => TempDir::new()?,
        };

        let edge_path = dir.path().join("edges");
        let output_path = dir.path().join("metrics");

        write_edge_file(graph, &edge_path)?;

        if selection.contains(MetricSelection::GROUP_METRICS) {
            let group_path = PathBuf::from(format!("{}groups", edge_path.display()));
            write_group_file(graph, groups, &group_path)?;
        }

        let directed = graph.directedness() == Directedness::Directed;

        debug!(
            calculator = %self.calculator.display(),
            bitmask = selection.bits(),
            directed,
            edges = graph.edge_count(),
            "invoking external metrics calculator"
        );

        let output = Command::new(&self.calculator)
            .arg(&edge_path)
            .arg(if directed { "true" } else { "false" })
            .arg(selection.bits().to_string())
            .arg(&output_path)
            .output()?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            warn!(stderr = %stderr, "metrics calculator failed");
            // `dir` drops here, deleting the inputs and any partial
            // output before the error reaches the caller.
            return Err(ExternalMetricsError::CalculatorFailed {
                stderr: stderr.into_owned(),
            });
        }

        if !output_path.is_file() {
            return Err(ExternalMetricsError::MissingOutput);
        }

        Ok(MetricsOutput {
            _dir: dir,
            path: output_path,
        })
    }
}

/// Parses a numeric field from the calculator's output with fixed,
/// locale-insensitive conventions. A field that fails to parse is a
/// fatal format error for the calculation it belongs to.
pub fn parse_metric_field<T: FromStr>(field: &str) -> Result<T, ExternalMetricsError> {
    field
        .trim()
        .parse()
        .map_err(|_| ExternalMetricsError::MalformedOutput {
            field: field.to_owned(),
        })
}

fn write_edge_file(graph: &Graph, path: &Path) -> Result<(), ExternalMetricsError> {
    let mut writer = BufWriter::new(File::create(path)?);

    for (_, edge) in graph.edges() {
        writeln!(writer, "{}\t{}", edge.vertex1(), edge.vertex2())?;
    }

    writer.flush()?;
    Ok(())
}

fn write_group_file(
    graph: &Graph,
    groups: &[GroupInfo],
    path: &Path,
) -> Result<(), ExternalMetricsError> {
    let mut writer = BufWriter::new(File::create(path)?);

    for group in groups {
        let members: Vec<String> = group
            .vertices()
            .iter()
            .filter(|&&vertex| graph.degree(vertex) > 0)
            .map(|vertex| vertex.to_string())
            .collect();

        if members.is_empty() {
            continue;
        }

        writeln!(writer, "{}", members.join("\t"))?;
    }

    writer.flush()?;
    Ok(())
}
