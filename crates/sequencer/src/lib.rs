use serde::{Deserialize, Serialize};
use thiserror::Error;

mod commands;
pub use commands::*;
mod curve;
pub use curve::*;
mod cut;
pub use cut::*;
mod fades;
pub use fades::*;
mod grab;
pub use grab::*;
mod markers;
pub use markers::*;
mod parent;
pub use parent::*;
mod prefs;
pub use prefs::*;
mod query;
pub use query::*;
mod ripple;
pub use ripple::*;
mod shell;
pub use shell::*;
mod strip;
pub use strip::*;
mod timecode;
pub use timecode::*;
mod timeline;
pub use timeline::*;

#[derive(Debug, Error)]
pub enum SequencerError {
    #[error("invalid operation: {0}")]
    InvalidOp(String),
    #[error("strip not found: {0}")]
    StripNotFound(String),
    #[error("strip already exists: {0}")]
    StripExists(String),
    #[error("nothing selected")]
    NothingSelected,
}

/// Time in frames. Negative values are valid offsets.
pub type Frame = i64;

/// Channel lane index. Valid placements are always >= 1; probing is
/// unbounded upward.
pub type Channel = i64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Fps {
    pub num: u32,
    pub den: u32,
}

impl Fps {
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den.max(1) as f64
    }

    /// Whole frames per second, rounded. Never zero.
    pub fn rounded(&self) -> i64 {
        (self.as_f64().round() as i64).max(1)
    }
}

impl Default for Fps {
    fn default() -> Self {
        Self { num: 30, den: 1 }
    }
}
