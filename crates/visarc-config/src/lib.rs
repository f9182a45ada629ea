//! Pipeline configuration assembly for the visarc archive converter.
//!
//! This crate builds the declarative configuration consumed by the external
//! pipeline engine that turns a raw interferometric-visibility dump into a
//! transposed, precision-truncated, bitshuffle-compressed archive. It does
//! no I/O, scheduling, or numerical work of its own: the output is a graph
//! of two bounded buffers and three processing stages, plus the parameters
//! each stage needs.
//!
//! # Example
//!
//! ```rust
//! use visarc_config::{ArchiveConfig, ChunkGeometry, TruncationConfig};
//!
//! let pipeline = ArchiveConfig::new("/data/run1.raw", "/data/run1.h5")
//!     .with_chunk(ChunkGeometry::new(16, 16, 16).unwrap())
//!     .with_truncation(TruncationConfig::default())
//!     .assemble()
//!     .unwrap();
//!
//! let json = pipeline.to_json().unwrap();
//! assert!(json.contains("visRawReader"));
//! ```

mod archive;
mod buffer;
mod error;
mod geometry;
mod pipeline;
mod stage;
mod truncation;

/// Symbolic size expressions resolved by the engine.
pub mod expr;

/// Path normalization helpers.
pub mod paths;

pub use archive::{
    ArchiveConfig, DEFAULT_NUM_ELEMENTS, METADATA_POOL, READ_BUFFER, TRUNC_BUFFER,
    assemble_archive,
};
pub use buffer::{BufferKind, BufferSpec};
pub use error::ConfigError;
pub use expr::SizeExpr;
pub use geometry::{ChunkGeometry, frame_size_expr};
pub use pipeline::{BufferHandle, GlobalConfig, PipelineBuilder, PipelineConfig};
pub use stage::{RawReaderParams, StageSpec, TransposeParams};
pub use truncation::TruncationConfig;
