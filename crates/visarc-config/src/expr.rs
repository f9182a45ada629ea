//! Symbolic size expressions.
//!
//! Buffer frame sizes are not known at assembly time: the true per-frame
//! frequency count only becomes available once the engine's reader has
//! inspected the input file. Sizes are therefore declared as small symbolic
//! expressions over engine-resolved quantities, which the assembler can
//! inspect structurally and which serialize to the engine's textual
//! arithmetic form only at the boundary.

use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

use crate::error::ConfigError;

/// Names of the symbolic quantities resolved by the engine at run time.
pub mod symbols {
    /// Width of one integer sample in bytes.
    pub const SIZEOF_INT: &str = "sizeof_int";
    /// Number of frequency channels handled by this host.
    pub const NUM_LOCAL_FREQ: &str = "num_local_freq";
    /// Number of correlator elements.
    pub const NUM_ELEMENTS: &str = "num_elements";
    /// Ring buffer depth in frames.
    pub const BUFFER_DEPTH: &str = "buffer_depth";
}

/// A size expression over integer literals and engine-resolved symbols.
///
/// Only products appear in practice; the engine's expression language is
/// plain arithmetic, so `Display` renders factors joined by `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizeExpr {
    /// A fixed integer factor.
    Literal(u64),
    /// A named quantity resolved by the engine.
    Symbol(String),
    /// The product of the contained factors.
    Product(Vec<SizeExpr>),
}

impl SizeExpr {
    /// A literal factor.
    pub fn literal(value: u64) -> Self {
        SizeExpr::Literal(value)
    }

    /// A symbolic factor.
    pub fn symbol(name: impl Into<String>) -> Self {
        SizeExpr::Symbol(name.into())
    }

    /// The product of the given factors.
    pub fn product(factors: impl IntoIterator<Item = SizeExpr>) -> Self {
        SizeExpr::Product(factors.into_iter().collect())
    }

    /// All symbol names referenced by this expression, in order of
    /// appearance. Repeated references are kept.
    pub fn symbols(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            SizeExpr::Literal(_) => {}
            SizeExpr::Symbol(name) => out.push(name),
            SizeExpr::Product(factors) => {
                for f in factors {
                    f.collect_symbols(out);
                }
            }
        }
    }

    /// Evaluate the expression with every symbol bound to a concrete value.
    ///
    /// This is what the engine does at run time; the assembler only uses it
    /// to sanity-check expressions in tests.
    pub fn evaluate(&self, bindings: &HashMap<&str, u64>) -> Result<u64, ConfigError> {
        match self {
            SizeExpr::Literal(v) => Ok(*v),
            SizeExpr::Symbol(name) => bindings
                .get(name.as_str())
                .copied()
                .ok_or_else(|| ConfigError::UnboundSymbol(name.clone())),
            SizeExpr::Product(factors) => {
                let mut acc: u64 = 1;
                for f in factors {
                    acc = acc.saturating_mul(f.evaluate(bindings)?);
                }
                Ok(acc)
            }
        }
    }
}

impl fmt::Display for SizeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeExpr::Literal(v) => write!(f, "{v}"),
            SizeExpr::Symbol(name) => write!(f, "{name}"),
            SizeExpr::Product(factors) => {
                for (i, factor) in factors.iter().enumerate() {
                    if i > 0 {
                        write!(f, " * ")?;
                    }
                    // Nested products would need parentheses; the assembler
                    // never builds them, but render them correctly anyway.
                    match factor {
                        SizeExpr::Product(_) => write!(f, "({factor})")?,
                        _ => write!(f, "{factor}")?,
                    }
                }
                Ok(())
            }
        }
    }
}

impl Serialize for SizeExpr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            // A bare symbol or literal crosses the boundary as itself, not
            // as a one-element arithmetic string.
            SizeExpr::Literal(v) => serializer.serialize_u64(*v),
            SizeExpr::Symbol(name) => serializer.serialize_str(name),
            SizeExpr::Product(_) => serializer.collect_str(self),
        }
    }
}
