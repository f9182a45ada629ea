//! Pipeline graph construction.
//!
//! The builder accumulates buffer and stage declarations and hands out
//! [`BufferHandle`]s for wiring. Stages can only reference buffers through
//! handles issued by the same builder, so a dangling buffer name is a
//! construction-time error rather than an undefined failure inside the
//! engine. [`PipelineBuilder::finish`] additionally checks that every
//! buffer has exactly one producer and exactly one consumer.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::buffer::BufferSpec;
use crate::error::ConfigError;
use crate::stage::{RawReaderParams, StageSpec, TransposeParams};
use crate::truncation::TruncationConfig;

/// Global settings handed to the engine alongside the graph.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GlobalConfig {
    /// Engine log level.
    pub log_level: String,
    /// Number of correlator elements.
    pub num_elements: u32,
}

/// A reference to a buffer declared on a [`PipelineBuilder`].
///
/// Handles are only meaningful to the builder that issued them; passing one
/// to a different builder is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferHandle(usize);

/// The assembled configuration: the complete declarative input to the
/// engine.
///
/// Constructed once per invocation, handed whole to the engine, then
/// discarded. The engine owns all run-time buffer and stage lifecycles.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PipelineConfig {
    /// Buffer declarations by name.
    pub buffers: BTreeMap<String, BufferSpec>,
    /// Stage declarations by name.
    pub processes: BTreeMap<String, StageSpec>,
    /// Global settings.
    pub config: GlobalConfig,
}

impl PipelineConfig {
    /// Serialize to the engine's JSON wire form.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Look up a buffer declaration by name.
    pub fn buffer(&self, name: &str) -> Option<&BufferSpec> {
        self.buffers.get(name)
    }

    /// Look up a stage declaration by name.
    pub fn stage(&self, name: &str) -> Option<&StageSpec> {
        self.processes.get(name)
    }
}

/// Builder for a [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineBuilder {
    buffers: BTreeMap<String, BufferSpec>,
    // Handle index to buffer name.
    handles: Vec<String>,
    processes: BTreeMap<String, StageSpec>,
    config: GlobalConfig,
}

impl PipelineBuilder {
    /// Start a new pipeline with the given global settings.
    pub fn new(config: GlobalConfig) -> Self {
        Self {
            buffers: BTreeMap::new(),
            handles: Vec::new(),
            processes: BTreeMap::new(),
            config,
        }
    }

    /// Declare a named buffer, returning a handle for stage wiring.
    pub fn declare_buffer(
        &mut self,
        name: &str,
        spec: BufferSpec,
    ) -> Result<BufferHandle, ConfigError> {
        if self.buffers.contains_key(name) {
            return Err(ConfigError::DuplicateBuffer(name.to_string()));
        }
        self.buffers.insert(name.to_string(), spec);
        self.handles.push(name.to_string());
        Ok(BufferHandle(self.handles.len() - 1))
    }

    /// Resolve a handle back to its buffer name.
    pub fn buffer_name(&self, handle: BufferHandle) -> Result<&str, ConfigError> {
        self.handles
            .get(handle.0)
            .map(String::as_str)
            .ok_or(ConfigError::ForeignHandle(handle.0))
    }

    /// Add the source stage reading raw frames into `out_buf`.
    pub fn add_raw_reader(
        &mut self,
        name: &str,
        params: RawReaderParams,
        out_buf: BufferHandle,
    ) -> Result<(), ConfigError> {
        let out_buf = self.buffer_name(out_buf)?.to_string();
        self.add_stage(
            name,
            StageSpec::RawReader {
                filename: params.filename,
                chunk_size: params.chunk_size,
                readahead_blocks: params.readahead_blocks,
                max_read_rate: params.max_read_rate,
                sleep_time: params.sleep_time,
                out_buf,
            },
        )
    }

    /// Add the truncation stage between `in_buf` and `out_buf`.
    pub fn add_truncate(
        &mut self,
        name: &str,
        precision: TruncationConfig,
        in_buf: BufferHandle,
        out_buf: BufferHandle,
    ) -> Result<(), ConfigError> {
        precision.validate()?;
        let in_buf = self.buffer_name(in_buf)?.to_string();
        let out_buf = self.buffer_name(out_buf)?.to_string();
        self.add_stage(
            name,
            StageSpec::Truncate {
                precision,
                in_buf,
                out_buf,
            },
        )
    }

    /// Add the sink stage draining `in_buf` into the archive.
    pub fn add_transpose(
        &mut self,
        name: &str,
        params: TransposeParams,
        in_buf: BufferHandle,
    ) -> Result<(), ConfigError> {
        let in_buf = self.buffer_name(in_buf)?.to_string();
        self.add_stage(
            name,
            StageSpec::Transpose {
                chunk_size: params.chunk_size,
                md_filename: params.md_filename,
                filename: params.filename,
                in_buf,
            },
        )
    }

    fn add_stage(&mut self, name: &str, stage: StageSpec) -> Result<(), ConfigError> {
        if self.processes.contains_key(name) {
            return Err(ConfigError::DuplicateStage(name.to_string()));
        }
        self.processes.insert(name.to_string(), stage);
        Ok(())
    }

    /// Validate the graph and produce the final configuration.
    ///
    /// Every declared buffer must have exactly one producer stage and
    /// exactly one consumer stage. Source and sink stages are the path
    /// endpoints by virtue of having no input or no output buffer.
    pub fn finish(self) -> Result<PipelineConfig, ConfigError> {
        for name in self.buffers.keys() {
            let producers = self
                .processes
                .values()
                .filter(|s| s.out_buf() == Some(name))
                .count();
            let consumers = self
                .processes
                .values()
                .filter(|s| s.in_buf() == Some(name))
                .count();
            if producers != 1 {
                return Err(ConfigError::invalid_graph(
                    name,
                    format!("expected exactly 1 producer stage, found {producers}"),
                ));
            }
            if consumers != 1 {
                return Err(ConfigError::invalid_graph(
                    name,
                    format!("expected exactly 1 consumer stage, found {consumers}"),
                ));
            }
        }

        tracing::debug!(
            buffers = self.buffers.len(),
            stages = self.processes.len(),
            "pipeline graph assembled"
        );

        Ok(PipelineConfig {
            buffers: self.buffers,
            processes: self.processes,
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferSpec;
    use crate::geometry::{ChunkGeometry, frame_size_expr};
    use std::path::PathBuf;

    fn globals() -> GlobalConfig {
        GlobalConfig {
            log_level: "info".to_string(),
            num_elements: 2048,
        }
    }

    fn standard_buffer() -> BufferSpec {
        BufferSpec::standard("vis_pool", frame_size_expr())
    }

    fn reader_params() -> RawReaderParams {
        RawReaderParams::new("/in.raw", ChunkGeometry::default())
    }

    fn transpose_params() -> TransposeParams {
        TransposeParams {
            chunk_size: ChunkGeometry::default(),
            md_filename: PathBuf::from("/in.raw.meta"),
            filename: PathBuf::from("/out.h5"),
        }
    }

    fn linear_pipeline() -> PipelineBuilder {
        let mut builder = PipelineBuilder::new(globals());
        let read = builder.declare_buffer("read_buffer", standard_buffer()).unwrap();
        let trunc = builder.declare_buffer("trunc_buffer", standard_buffer()).unwrap();
        builder.add_raw_reader("read_raw", reader_params(), read).unwrap();
        builder
            .add_truncate("truncate", TruncationConfig::default(), read, trunc)
            .unwrap();
        builder.add_transpose("transpose", transpose_params(), trunc).unwrap();
        builder
    }

    #[test]
    fn linear_pipeline_finishes() {
        let config = linear_pipeline().finish().unwrap();
        assert_eq!(config.buffers.len(), 2);
        assert_eq!(config.processes.len(), 3);
    }

    #[test]
    fn duplicate_buffer_rejected() {
        let mut builder = PipelineBuilder::new(globals());
        builder.declare_buffer("read_buffer", standard_buffer()).unwrap();
        let err = builder
            .declare_buffer("read_buffer", standard_buffer())
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateBuffer(ref n) if n == "read_buffer"));
    }

    #[test]
    fn duplicate_stage_rejected() {
        let mut builder = PipelineBuilder::new(globals());
        let read = builder.declare_buffer("read_buffer", standard_buffer()).unwrap();
        builder.add_raw_reader("read_raw", reader_params(), read).unwrap();
        let err = builder
            .add_raw_reader("read_raw", reader_params(), read)
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateStage(ref n) if n == "read_raw"));
    }

    #[test]
    fn foreign_handle_rejected() {
        let mut other = PipelineBuilder::new(globals());
        other.declare_buffer("a", standard_buffer()).unwrap();
        let foreign = other.declare_buffer("b", standard_buffer()).unwrap();

        let mut builder = PipelineBuilder::new(globals());
        builder.declare_buffer("only", standard_buffer()).unwrap();
        // `foreign` has index 1, which this builder never issued.
        let err = builder
            .add_raw_reader("read_raw", reader_params(), foreign)
            .unwrap_err();
        assert!(matches!(err, ConfigError::ForeignHandle(1)));
    }

    #[test]
    fn unconsumed_buffer_fails_finish() {
        let mut builder = PipelineBuilder::new(globals());
        let read = builder.declare_buffer("read_buffer", standard_buffer()).unwrap();
        builder.add_raw_reader("read_raw", reader_params(), read).unwrap();

        let err = builder.finish().unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidGraph { ref buffer, .. } if buffer == "read_buffer"),
            "got: {err:?}"
        );
    }

    #[test]
    fn unproduced_buffer_fails_finish() {
        let mut builder = PipelineBuilder::new(globals());
        let trunc = builder.declare_buffer("trunc_buffer", standard_buffer()).unwrap();
        builder.add_transpose("transpose", transpose_params(), trunc).unwrap();

        let err = builder.finish().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidGraph { .. }));
    }

    #[test]
    fn two_producers_fail_finish() {
        let mut builder = PipelineBuilder::new(globals());
        let read = builder.declare_buffer("read_buffer", standard_buffer()).unwrap();
        builder.add_raw_reader("read_a", reader_params(), read).unwrap();
        builder.add_raw_reader("read_b", reader_params(), read).unwrap();
        builder.add_transpose("transpose", transpose_params(), read).unwrap();

        let err = builder.finish().unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidGraph { ref reason, .. } if reason.contains("2")),
            "got: {err:?}"
        );
    }

    #[test]
    fn invalid_precision_rejected_at_add() {
        let mut builder = PipelineBuilder::new(globals());
        let read = builder.declare_buffer("read_buffer", standard_buffer()).unwrap();
        let trunc = builder.declare_buffer("trunc_buffer", standard_buffer()).unwrap();
        let bad = TruncationConfig::default().with_err_sq_lim(-1.0);
        let err = builder.add_truncate("truncate", bad, read, trunc).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPrecision { .. }));
    }

    #[test]
    fn to_json_has_top_level_sections() {
        let config = linear_pipeline().finish().unwrap();
        let json: serde_json::Value = serde_json::from_str(&config.to_json().unwrap()).unwrap();
        assert!(json["buffers"].is_object());
        assert!(json["processes"].is_object());
        assert_eq!(json["config"]["log_level"], "info");
        assert_eq!(json["config"]["num_elements"], 2048);
    }
}
