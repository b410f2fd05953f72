// 2-D cross-sections of 3-D volumes

use crate::error::{CorpusError, Result};
use crate::volume::Volume;
use clap::ValueEnum;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// spatial axis of a volume in array order (x, y, z)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn to_usize(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
            Axis::Z => write!(f, "z"),
        }
    }
}

impl From<Axis> for ndarray::Axis {
    fn from(axis: Axis) -> Self {
        ndarray::Axis(axis.to_usize())
    }
}

/// which slice to take: an axis and a signed index, negative indices count back from the end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceSpec {
    pub axis: Axis,
    pub index: isize,
}

impl Default for SliceSpec {
    fn default() -> Self {
        Self {
            axis: Axis::Y,
            index: 100,
        }
    }
}

impl SliceSpec {
    pub fn new(axis: Axis, index: isize) -> Self {
        Self { axis, index }
    }

    /// resolves the signed index against a volume shape. Valid indices are -n..n for an axis of
    /// extent n. Nothing wraps beyond that.
    pub fn resolve(&self, shape: &[usize; 3]) -> Result<usize> {
        let extent = shape[self.axis.to_usize()];
        let out_of_range = || CorpusError::SliceOutOfRange {
            axis: self.axis,
            index: self.index,
            extent,
        };

        if self.index >= 0 {
            let i = self.index as usize;
            if i < extent { Ok(i) } else { Err(out_of_range()) }
        } else {
            let back = self.index.unsigned_abs();
            if back <= extent { Ok(extent - back) } else { Err(out_of_range()) }
        }
    }
}

/// returns an owned copy of the requested slice. The remaining two axes keep their order.
pub fn extract(volume: &Volume, spec: &SliceSpec) -> Result<Array2<f32>> {
    let index = spec.resolve(&volume.shape())?;
    Ok(volume.data().index_axis(spec.axis.into(), index).to_owned())
}
