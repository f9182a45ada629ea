//! Processing stage declarations.

use serde::Serialize;
use std::path::PathBuf;

use crate::geometry::ChunkGeometry;
use crate::truncation::TruncationConfig;

/// Parameters for the raw-reader stage, minus its output wiring.
///
/// The tuning fields are optional pass-throughs to the engine's reader;
/// unset values are omitted from the serialized stage so the engine applies
/// its own defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReaderParams {
    /// Absolute path to the raw receiver dump.
    pub filename: PathBuf,
    /// Chunk geometry the reader divides the file into.
    pub chunk_size: ChunkGeometry,
    /// Number of blocks to advise the OS to read ahead.
    pub readahead_blocks: Option<u32>,
    /// Maximum read rate in MB/s; unset means unlimited.
    pub max_read_rate: Option<f64>,
    /// Seconds to pause after the read completes before signalling shutdown.
    pub sleep_time: Option<f64>,
}

impl RawReaderParams {
    /// Reader parameters with no tuning overrides.
    pub fn new(filename: impl Into<PathBuf>, chunk_size: ChunkGeometry) -> Self {
        Self {
            filename: filename.into(),
            chunk_size,
            readahead_blocks: None,
            max_read_rate: None,
            sleep_time: None,
        }
    }
}

/// Parameters for the transpose-writer stage, minus its input wiring.
#[derive(Debug, Clone, PartialEq)]
pub struct TransposeParams {
    /// Chunk geometry, which must match the reader's.
    pub chunk_size: ChunkGeometry,
    /// Absolute path to the companion metadata file.
    pub md_filename: PathBuf,
    /// Absolute path for the output archive.
    pub filename: PathBuf,
}

/// One processing stage in the pipeline graph.
///
/// Serializes with the engine's stage-kind identifiers as the `kind` tag,
/// matching the consumed interface shape
/// `{ kind, <stage params>, in_buf?, out_buf? }`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind")]
pub enum StageSpec {
    /// Source stage: streams frames out of the raw dump.
    #[serde(rename = "visRawReader")]
    RawReader {
        /// Absolute input file path.
        filename: PathBuf,
        /// Read chunk geometry.
        chunk_size: ChunkGeometry,
        /// OS readahead hint in blocks.
        #[serde(skip_serializing_if = "Option::is_none")]
        readahead_blocks: Option<u32>,
        /// Read rate cap in MB/s.
        #[serde(skip_serializing_if = "Option::is_none")]
        max_read_rate: Option<f64>,
        /// Post-read shutdown delay in seconds.
        #[serde(skip_serializing_if = "Option::is_none")]
        sleep_time: Option<f64>,
        /// Buffer the stage produces into.
        out_buf: String,
    },

    /// Frame-for-frame lossy precision truncation. Frame size is unchanged;
    /// only precision is reduced, which is why its input and output buffers
    /// are structurally identical.
    #[serde(rename = "visTruncate")]
    Truncate {
        /// Precision controls.
        #[serde(flatten)]
        precision: TruncationConfig,
        /// Buffer the stage consumes from.
        in_buf: String,
        /// Buffer the stage produces into.
        out_buf: String,
    },

    /// Sink stage: transposes, compresses, and writes the archive.
    #[serde(rename = "visTranspose")]
    Transpose {
        /// Chunk geometry, identical to the reader's.
        chunk_size: ChunkGeometry,
        /// Absolute metadata file path.
        md_filename: PathBuf,
        /// Absolute output archive path.
        filename: PathBuf,
        /// Buffer the stage consumes from.
        in_buf: String,
    },
}

impl StageSpec {
    /// The engine's stage-kind identifier.
    pub fn kind(&self) -> &'static str {
        match self {
            StageSpec::RawReader { .. } => "visRawReader",
            StageSpec::Truncate { .. } => "visTruncate",
            StageSpec::Transpose { .. } => "visTranspose",
        }
    }

    /// Name of the buffer this stage consumes, if any.
    pub fn in_buf(&self) -> Option<&str> {
        match self {
            StageSpec::RawReader { .. } => None,
            StageSpec::Truncate { in_buf, .. } | StageSpec::Transpose { in_buf, .. } => {
                Some(in_buf)
            }
        }
    }

    /// Name of the buffer this stage produces into, if any.
    pub fn out_buf(&self) -> Option<&str> {
        match self {
            StageSpec::RawReader { out_buf, .. } | StageSpec::Truncate { out_buf, .. } => {
                Some(out_buf)
            }
            StageSpec::Transpose { .. } => None,
        }
    }

    /// The chunk geometry carried by this stage, if it has one.
    pub fn chunk_size(&self) -> Option<ChunkGeometry> {
        match self {
            StageSpec::RawReader { chunk_size, .. } | StageSpec::Transpose { chunk_size, .. } => {
                Some(*chunk_size)
            }
            StageSpec::Truncate { .. } => None,
        }
    }
}
