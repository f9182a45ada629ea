//! Chunk geometry for the transpose tiling.

use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::ConfigError;
use crate::expr::{SizeExpr, symbols};

/// How the visibility matrix is tiled for transposition: chunk extents along
/// the frequency, product, and time axes.
///
/// The same geometry must be handed to both the reader and the transpose
/// stage; the engine does not cross-check them, and a mismatch produces a
/// corrupted archive rather than an error. [`crate::ArchiveConfig`] wires a
/// single geometry into both stages for exactly this reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkGeometry {
    freq: u32,
    prod: u32,
    time: u32,
}

impl ChunkGeometry {
    /// Create a geometry, rejecting zero extents.
    ///
    /// A zero chunk dimension would surface much later as an opaque
    /// allocation failure inside the engine, so it is caught here instead.
    pub fn new(freq: u32, prod: u32, time: u32) -> Result<Self, ConfigError> {
        for (dimension, value) in [("freq", freq), ("prod", prod), ("time", time)] {
            if value == 0 {
                return Err(ConfigError::InvalidGeometry { dimension });
            }
        }
        Ok(Self { freq, prod, time })
    }

    /// Chunk extent along the frequency axis.
    pub fn freq(&self) -> u32 {
        self.freq
    }

    /// Chunk extent along the correlation-product axis.
    pub fn prod(&self) -> u32 {
        self.prod
    }

    /// Chunk extent along the time axis.
    pub fn time(&self) -> u32 {
        self.time
    }
}

/// Default chunking of 16 x 16 x 16.
impl Default for ChunkGeometry {
    fn default() -> Self {
        Self {
            freq: 16,
            prod: 16,
            time: 16,
        }
    }
}

impl fmt::Display for ChunkGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.freq, self.prod, self.time)
    }
}

/// Serialized as the engine's `[freq, prod, time]` array form.
impl Serialize for ChunkGeometry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq([self.freq, self.prod, self.time])
    }
}

/// The per-frame byte-size expression shared by every buffer in the
/// pipeline:
///
/// ```text
/// 2 * sizeof_int * num_local_freq * num_elements * num_elements
/// ```
///
/// The factor 2 accounts for the paired visibility and weight values per
/// correlation product. Every quantity except the leading factor is
/// symbolic: the engine resolves them once the reader knows the actual
/// frequency-chunk width of the input file.
pub fn frame_size_expr() -> SizeExpr {
    SizeExpr::product([
        SizeExpr::literal(2),
        SizeExpr::symbol(symbols::SIZEOF_INT),
        SizeExpr::symbol(symbols::NUM_LOCAL_FREQ),
        SizeExpr::symbol(symbols::NUM_ELEMENTS),
        SizeExpr::symbol(symbols::NUM_ELEMENTS),
    ])
}
