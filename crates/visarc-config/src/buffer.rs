//! Buffer declarations.

use serde::Serialize;

use crate::expr::{SizeExpr, symbols};

/// Kind of buffer the engine should instantiate.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BufferKind {
    /// A plain bounded ring buffer of fixed-size frames.
    Standard,
}

/// A named bounded buffer declaration.
///
/// The assembler never allocates anything; this is a description the engine
/// turns into a real ring buffer at run time. Depth stays symbolic
/// (`buffer_depth`) and the frame size is a [`SizeExpr`] the engine resolves
/// once it knows the input file's frequency-chunk width.
///
/// Adjacent stages exchange frames without the engine validating
/// compatibility, so every buffer in one pipeline must carry the identical
/// frame-size expression.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BufferSpec {
    /// Buffer kind.
    pub kind: BufferKind,
    /// Name of the shared metadata pool the engine attaches to frames.
    pub metadata_pool: String,
    /// Buffer depth in frames, symbolic until run time.
    pub num_frames: SizeExpr,
    /// Width of one integer sample in bytes.
    pub sizeof_int: u32,
    /// Per-frame byte size expression.
    pub frame_size: SizeExpr,
}

impl BufferSpec {
    /// A standard buffer bound to `metadata_pool` with the given frame size,
    /// engine-resolved depth, and 4-byte integer samples.
    pub fn standard(metadata_pool: impl Into<String>, frame_size: SizeExpr) -> Self {
        Self {
            kind: BufferKind::Standard,
            metadata_pool: metadata_pool.into(),
            num_frames: SizeExpr::symbol(symbols::BUFFER_DEPTH),
            sizeof_int: 4,
            frame_size,
        }
    }
}
