use crate::error::{CorpusError, Result};
use ndarray::{Array3, ArrayD, Axis, Ix3};
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// a single 3-D scan. Voxel intensities are stored as f32 with the header's linear scaling applied.
#[derive(Debug, Clone)]
pub struct Volume {
    data: Array3<f32>,
    voxel_size: [f32; 3],
    path: Option<PathBuf>,
}

impl Volume {
    /// decodes a .nii or .nii.gz file. Trailing singleton dimensions are dropped so that
    /// a (x, y, z, 1) file loads as a 3-D volume.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let decode_err = |source| CorpusError::Decode {
            path: path.to_path_buf(),
            source,
        };

        let obj = ReaderOptions::new().read_file(path).map_err(decode_err)?;
        let pixdim = obj.header().pixdim;
        let data: ArrayD<f32> = obj.into_volume().into_ndarray::<f32>().map_err(decode_err)?;
        let data = squeeze_trailing(data);

        let shape = data.shape().to_vec();
        let data = data.into_dimensionality::<Ix3>().map_err(|_| CorpusError::NotVolumetric {
            path: path.to_path_buf(),
            shape,
        })?;

        debug!("loaded {} with shape {:?}", path.display(), data.dim());
        Ok(Self {
            data,
            voxel_size: [pixdim[1], pixdim[2], pixdim[3]],
            path: Some(path.to_path_buf()),
        })
    }

    /// wraps an in-memory array with unit voxel size
    pub fn from_array(data: Array3<f32>) -> Self {
        Self {
            data,
            voxel_size: [1., 1., 1.],
            path: None,
        }
    }

    pub fn shape(&self) -> [usize; 3] {
        let (nx, ny, nz) = self.data.dim();
        [nx, ny, nz]
    }

    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    pub fn voxel_size(&self) -> [f32; 3] {
        self.voxel_size
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// min and max over finite voxels, (0, 0) if there are none
    pub fn intensity_range(&self) -> (f32, f32) {
        finite_range(self.data.iter().copied())
    }
}

pub(crate) fn finite_range(values: impl Iterator<Item = f32>) -> (f32, f32) {
    let (lo, hi) = values.filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo > hi { (0., 0.) } else { (lo, hi) }
}

fn squeeze_trailing(mut data: ArrayD<f32>) -> ArrayD<f32> {
    while data.ndim() > 3 && data.shape()[data.ndim() - 1] == 1 {
        let last = data.ndim() - 1;
        data = data.index_axis_move(Axis(last), 0);
    }
    data
}
