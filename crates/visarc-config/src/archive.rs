//! Top-level assembly of the raw-to-archive conversion pipeline.
//!
//! [`ArchiveConfig`] gathers everything the caller can choose and
//! [`ArchiveConfig::assemble`] turns it into the three-stage graph the
//! engine executes:
//!
//! ```text
//! read_raw --> read_buffer --> truncate --> trunc_buffer --> transpose
//! ```

use std::path::{Path, PathBuf};

use crate::buffer::BufferSpec;
use crate::error::ConfigError;
use crate::geometry::{ChunkGeometry, frame_size_expr};
use crate::paths;
use crate::pipeline::{GlobalConfig, PipelineBuilder, PipelineConfig};
use crate::stage::{RawReaderParams, TransposeParams};
use crate::truncation::TruncationConfig;

/// Name of the buffer between the reader and the truncation stage.
pub const READ_BUFFER: &str = "read_buffer";
/// Name of the buffer between the truncation and transpose stages.
pub const TRUNC_BUFFER: &str = "trunc_buffer";
/// Metadata pool shared by both buffers.
pub const METADATA_POOL: &str = "vis_pool";
/// Default number of correlator elements.
pub const DEFAULT_NUM_ELEMENTS: u32 = 2048;

/// Caller-facing options for one archive conversion.
///
/// Construct with [`ArchiveConfig::new`], adjust with the `with_*` setters,
/// then call [`ArchiveConfig::assemble`].
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    /// Path to the raw receiver dump.
    pub infile: PathBuf,
    /// Path for the compressed, transposed archive.
    pub outfile: PathBuf,
    /// Transpose chunk geometry, shared by reader and transpose stages.
    pub chunk: ChunkGeometry,
    /// Precision policy for the truncation stage.
    pub truncation: TruncationConfig,
    /// Engine log level.
    pub log_level: String,
    /// Number of correlator elements.
    pub num_elements: u32,
    /// OS readahead hint for the reader, in blocks.
    pub readahead_blocks: Option<u32>,
    /// Reader rate cap in MB/s.
    pub max_read_rate: Option<f64>,
    /// Reader post-read shutdown delay in seconds.
    pub sleep_time: Option<f64>,
}

impl ArchiveConfig {
    /// Conversion options with all defaults.
    pub fn new(infile: impl Into<PathBuf>, outfile: impl Into<PathBuf>) -> Self {
        Self {
            infile: infile.into(),
            outfile: outfile.into(),
            chunk: ChunkGeometry::default(),
            truncation: TruncationConfig::default(),
            log_level: "info".to_string(),
            num_elements: DEFAULT_NUM_ELEMENTS,
            readahead_blocks: None,
            max_read_rate: None,
            sleep_time: None,
        }
    }

    /// Set the chunk geometry.
    pub fn with_chunk(mut self, chunk: ChunkGeometry) -> Self {
        self.chunk = chunk;
        self
    }

    /// Set the truncation precision policy.
    pub fn with_truncation(mut self, truncation: TruncationConfig) -> Self {
        self.truncation = truncation;
        self
    }

    /// Set the engine log level.
    pub fn with_log_level(mut self, log_level: impl Into<String>) -> Self {
        self.log_level = log_level.into();
        self
    }

    /// Set the number of correlator elements.
    pub fn with_num_elements(mut self, num_elements: u32) -> Self {
        self.num_elements = num_elements;
        self
    }

    /// The metadata file path the transpose stage will read, derived from
    /// the input path.
    pub fn metadata_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(paths::metadata_path(&paths::absolutize(&self.infile)?))
    }

    /// Assemble the pipeline graph.
    ///
    /// Validates the precision policy and element count, normalizes all
    /// paths to absolute form, declares the two structurally identical
    /// buffers, and wires the three stages into a linear path. Everything
    /// after this point is the engine's responsibility.
    pub fn assemble(&self) -> Result<PipelineConfig, ConfigError> {
        self.truncation.validate()?;
        if self.num_elements == 0 {
            return Err(ConfigError::InvalidGeometry {
                dimension: "num_elements",
            });
        }

        let infile = paths::absolutize(&self.infile)?;
        let outfile = paths::absolutize(&self.outfile)?;
        let md_filename = paths::metadata_path(&infile);

        tracing::info!(
            infile = %infile.display(),
            outfile = %outfile.display(),
            chunk = %self.chunk,
            "assembling archive pipeline"
        );

        let mut builder = PipelineBuilder::new(GlobalConfig {
            log_level: self.log_level.clone(),
            num_elements: self.num_elements,
        });

        // Both buffers carry the identical frame-size expression: the
        // truncation stage reduces precision, not shape.
        let read = builder.declare_buffer(
            READ_BUFFER,
            BufferSpec::standard(METADATA_POOL, frame_size_expr()),
        )?;
        let trunc = builder.declare_buffer(
            TRUNC_BUFFER,
            BufferSpec::standard(METADATA_POOL, frame_size_expr()),
        )?;

        builder.add_raw_reader(
            "read_raw",
            RawReaderParams {
                filename: infile,
                chunk_size: self.chunk,
                readahead_blocks: self.readahead_blocks,
                max_read_rate: self.max_read_rate,
                sleep_time: self.sleep_time,
            },
            read,
        )?;
        builder.add_truncate("truncate", self.truncation, read, trunc)?;
        builder.add_transpose(
            "transpose",
            TransposeParams {
                chunk_size: self.chunk,
                md_filename,
                filename: outfile,
            },
            trunc,
        )?;

        builder.finish()
    }
}

/// Convenience wrapper: assemble a default-configured conversion of
/// `infile` into `outfile`.
pub fn assemble_archive(
    infile: impl AsRef<Path>,
    outfile: impl AsRef<Path>,
) -> Result<PipelineConfig, ConfigError> {
    ArchiveConfig::new(infile.as_ref(), outfile.as_ref()).assemble()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::StageSpec;

    #[test]
    fn assembles_two_buffers_three_stages() {
        let config = assemble_archive("/data/run1.raw", "/data/run1.h5").unwrap();
        assert_eq!(config.buffers.len(), 2);
        assert_eq!(config.processes.len(), 3);
        assert!(config.buffer(READ_BUFFER).is_some());
        assert!(config.buffer(TRUNC_BUFFER).is_some());
    }

    #[test]
    fn buffers_are_identical_except_for_name() {
        let config = assemble_archive("/data/run1.raw", "/data/run1.h5").unwrap();
        assert_eq!(config.buffer(READ_BUFFER), config.buffer(TRUNC_BUFFER));
    }

    #[test]
    fn stages_form_linear_path() {
        let config = assemble_archive("/data/run1.raw", "/data/run1.h5").unwrap();
        let reader = config.stage("read_raw").unwrap();
        let truncate = config.stage("truncate").unwrap();
        let transpose = config.stage("transpose").unwrap();

        assert_eq!(reader.out_buf(), Some(READ_BUFFER));
        assert_eq!(truncate.in_buf(), Some(READ_BUFFER));
        assert_eq!(truncate.out_buf(), Some(TRUNC_BUFFER));
        assert_eq!(transpose.in_buf(), Some(TRUNC_BUFFER));
        assert_eq!(reader.in_buf(), None);
        assert_eq!(transpose.out_buf(), None);
    }

    #[test]
    fn reader_and_transpose_share_geometry() {
        let chunk = ChunkGeometry::new(8, 32, 64).unwrap();
        let config = ArchiveConfig::new("/in.raw", "/out.h5")
            .with_chunk(chunk)
            .assemble()
            .unwrap();
        assert_eq!(config.stage("read_raw").unwrap().chunk_size(), Some(chunk));
        assert_eq!(config.stage("transpose").unwrap().chunk_size(), Some(chunk));
    }

    #[test]
    fn metadata_path_derivation() {
        let config = assemble_archive("/data/run1.raw", "/data/run1.h5").unwrap();
        match config.stage("transpose").unwrap() {
            StageSpec::Transpose { md_filename, .. } => {
                assert_eq!(md_filename, &PathBuf::from("/data/run1.raw.meta"));
            }
            other => panic!("unexpected stage: {other:?}"),
        }
    }

    #[test]
    fn relative_paths_become_absolute() {
        let config = assemble_archive("run1.raw", "run1.h5").unwrap();
        match config.stage("read_raw").unwrap() {
            StageSpec::RawReader { filename, .. } => assert!(filename.is_absolute()),
            other => panic!("unexpected stage: {other:?}"),
        }
        match config.stage("transpose").unwrap() {
            StageSpec::Transpose {
                filename,
                md_filename,
                ..
            } => {
                assert!(filename.is_absolute());
                assert!(md_filename.is_absolute());
            }
            other => panic!("unexpected stage: {other:?}"),
        }
    }

    #[test]
    fn default_globals() {
        let config = assemble_archive("/in.raw", "/out.h5").unwrap();
        assert_eq!(config.config.log_level, "info");
        assert_eq!(config.config.num_elements, 2048);
    }

    #[test]
    fn zero_num_elements_rejected() {
        let err = ArchiveConfig::new("/in.raw", "/out.h5")
            .with_num_elements(0)
            .assemble()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidGeometry {
                dimension: "num_elements"
            }
        ));
    }

    #[test]
    fn invalid_truncation_rejected() {
        let err = ArchiveConfig::new("/in.raw", "/out.h5")
            .with_truncation(TruncationConfig::default().with_err_sq_lim(f64::INFINITY))
            .assemble()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPrecision { .. }));
    }

    #[test]
    fn reader_tuning_passthrough() {
        let mut options = ArchiveConfig::new("/in.raw", "/out.h5");
        options.readahead_blocks = Some(16);
        options.max_read_rate = Some(250.0);
        let config = options.assemble().unwrap();
        match config.stage("read_raw").unwrap() {
            StageSpec::RawReader {
                readahead_blocks,
                max_read_rate,
                sleep_time,
                ..
            } => {
                assert_eq!(*readahead_blocks, Some(16));
                assert_eq!(*max_read_rate, Some(250.0));
                assert_eq!(*sleep_time, None);
            }
            other => panic!("unexpected stage: {other:?}"),
        }
    }
}
