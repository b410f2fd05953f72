pub mod audit;
pub mod corpus;
pub mod error;
pub mod render;
pub mod sample;
pub mod slice;
pub mod volume;

use crate::corpus::{Corpus, Pairing};
use crate::render::{to_grayscale, Colormap, Figure, Panel, PanelSource};
use crate::sample::{select_pair, Selection};
use crate::slice::{extract, Axis, SliceSpec};
use crate::volume::Volume;
use clap::Parser;
pub use error::{CorpusError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// widest gap accepted between figure panels
pub const MAX_PANEL_GAP: u32 = 1024;

/// run parameters, stored as a toml file next to the data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectParams {
    /// source modality, also the name of its subdirectory and its panel title
    pub source_modality: String,
    /// target modality, also the name of its subdirectory and its panel title
    pub target_modality: String,
    pub file_pattern: String,
    pub pairing: Pairing,
    /// seed for every random choice made during a run
    pub seed: u64,
    pub colormap: Colormap,
    /// draw the first in-plane axis horizontally
    pub transpose: bool,
    /// pixels between panels
    pub panel_gap: u32,
    pub slice: SliceSpec,
    pub selection: Selection,
}

impl Default for InspectParams {
    fn default() -> Self {
        Self {
            source_modality: "t1".to_string(),
            target_modality: "t2".to_string(),
            file_pattern: "*.nii*".to_string(),
            pairing: Pairing::default(),
            seed: 42,
            colormap: Colormap::default(),
            transpose: true,
            panel_gap: 4,
            slice: SliceSpec::default(),
            selection: Selection::default(),
        }
    }
}

impl InspectParams {
    /// reads parameters from a toml file. Missing keys fall back to their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let toml_str = fs::read_to_string(path).map_err(|e| {
            CorpusError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let params = toml::from_str::<InspectParams>(&toml_str)?;
        params.validate()?;
        Ok(params)
    }

    /// writes these parameters as toml, returning the file written (always .toml)
    pub fn write(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let mut toml_string = toml::to_string(self)?;
        toml_string.push('\n');
        let filename = path.as_ref().with_extension("toml");
        fs::write(&filename, toml_string)?;
        Ok(filename)
    }

    pub fn validate(&self) -> Result<()> {
        if self.source_modality.is_empty() || self.target_modality.is_empty() {
            return Err(CorpusError::Config("modality names must not be empty".to_string()));
        }
        if self.source_modality == self.target_modality {
            return Err(CorpusError::Config(format!(
                "source and target modality are both {:?}",
                self.source_modality
            )));
        }
        if self.file_pattern.is_empty() {
            return Err(CorpusError::Config("file pattern must not be empty".to_string()));
        }
        if self.panel_gap > MAX_PANEL_GAP {
            return Err(CorpusError::Config(format!(
                "panel_gap {} exceeds {} px",
                self.panel_gap, MAX_PANEL_GAP
            )));
        }
        Ok(())
    }
}

/// per-invocation arguments of the inspector
#[derive(Debug, Clone, Parser)]
pub struct DataSetArgs {
    /// corpus root holding one subdirectory per modality
    #[arg(short, long)]
    pub root: PathBuf,
    /// parameter file (see pair-inspect-params). Defaults are used when omitted.
    #[arg(short, long)]
    pub params: Option<PathBuf>,
    /// output figure (png). A .json manifest is written alongside it.
    #[arg(short, long, default_value = "pair_slice.png")]
    pub output: PathBuf,
    /// slice axis, overrides the parameter file
    #[arg(long)]
    pub axis: Option<Axis>,
    /// slice index, negative counts from the end. Overrides the parameter file.
    #[arg(long, allow_hyphen_values = true)]
    pub slice: Option<isize>,
    /// corpus entry to show, overrides the parameter file
    #[arg(long)]
    pub pair: Option<usize>,
}

impl DataSetArgs {
    /// loads the parameter file (or defaults) and applies command line overrides
    pub fn resolve_params(&self) -> Result<InspectParams> {
        let mut params = match &self.params {
            Some(p) => InspectParams::from_file(p)?,
            None => InspectParams::default(),
        };
        if let Some(axis) = self.axis {
            params.slice.axis = axis;
        }
        if let Some(index) = self.slice {
            params.slice.index = index;
        }
        if let Some(index) = self.pair {
            params.selection = Selection::Index { index };
        }
        Ok(params)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub subject: String,
    pub source_shape: [usize; 3],
    pub target_shape: [usize; 3],
    pub axis: Axis,
    pub source_index: usize,
    pub target_index: usize,
    pub figure_path: PathBuf,
    pub manifest_path: PathBuf,
}

/// locate -> select -> load -> slice -> render. Each step runs only if the one before it succeeded.
pub fn inspect_exec(args: &DataSetArgs, params: &InspectParams) -> Result<InspectReport> {
    params.validate()?;
    let now = Instant::now();

    info!("locating corpus in {} ...", args.root.display());
    let corpus = Corpus::discover(
        &args.root,
        &params.source_modality,
        &params.target_modality,
        &params.file_pattern,
        params.pairing,
    )?;

    let entry = select_pair(&corpus, params.selection, params.seed)?;

    info!("loading volumes ...");
    let source = Volume::load(&entry.source)?;
    let target = Volume::load(&entry.target)?;
    let loaded = [(corpus.source_modality(), &source), (corpus.target_modality(), &target)];
    for (modality, volume) in loaded {
        info!("{} shape: {:?}", modality, volume.shape());
        debug!("{} intensity range: {:?}", modality, volume.intensity_range());
    }

    let source_index = params.slice.resolve(&source.shape())?;
    let target_index = params.slice.resolve(&target.shape())?;
    let source_slice = extract(&source, &params.slice)?;
    let target_slice = extract(&target, &params.slice)?;
    info!("extracted slice {} along {}", params.slice.index, params.slice.axis);

    let mut figure = Figure::new(params.panel_gap);
    for (title, volume, slice, index) in [
        (corpus.source_modality(), &source, &source_slice, source_index),
        (corpus.target_modality(), &target, &target_slice, target_index),
    ] {
        let image = to_grayscale(slice, params.colormap, params.transpose);
        figure.push(Panel::new(title, image).with_source(PanelSource {
            path: volume.path().map(Path::to_path_buf),
            volume_shape: volume.shape(),
            voxel_size: volume.voxel_size(),
            axis: params.slice.axis,
            index,
        }));
    }

    info!("rendering ...");
    let manifest_path = figure.save(&args.output)?;

    info!("done in {:.03} secs", now.elapsed().as_secs_f32());
    Ok(InspectReport {
        subject: entry.subject.clone(),
        source_shape: source.shape(),
        target_shape: target.shape(),
        axis: params.slice.axis,
        source_index,
        target_index,
        figure_path: args.output.clone(),
        manifest_path,
    })
}

/// installs the fmt subscriber used by the binaries. RUST_LOG overrides the default info level.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_params_round_trip_through_toml() {
        let dir = tempdir().unwrap();
        let written = InspectParams::default().write(dir.path().join("params")).unwrap();
        assert_eq!(written.extension().unwrap(), "toml");
        assert_eq!(InspectParams::from_file(&written).unwrap(), InspectParams::default());
    }

    #[test]
    fn partial_params_use_defaults() {
        let params: InspectParams = toml::from_str(
            "target_modality = \"flair\"\n[slice]\naxis = \"z\"\nindex = -1\n"
        ).unwrap();
        assert_eq!(params.source_modality, "t1");
        assert_eq!(params.target_modality, "flair");
        assert_eq!(params.slice, SliceSpec::new(Axis::Z, -1));
        assert_eq!(params.seed, 42);
    }

    #[test]
    fn invalid_params() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("bad.toml");
        fs::write(&file, "source_modality = \"t2\"\n").unwrap();
        assert!(matches!(InspectParams::from_file(&file), Err(CorpusError::Config(_))));

        fs::write(&file, "slice = 3\n").unwrap();
        assert!(matches!(InspectParams::from_file(&file), Err(CorpusError::Config(_))));

        let missing = InspectParams::from_file(dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(CorpusError::Config(_))));
    }

    #[test]
    fn panel_gap_is_bounded() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("gap.toml");
        fs::write(&file, format!("panel_gap = {}\n", u32::MAX)).unwrap();
        assert!(matches!(InspectParams::from_file(&file), Err(CorpusError::Config(_))));

        fs::write(&file, format!("panel_gap = {}\n", MAX_PANEL_GAP)).unwrap();
        assert_eq!(InspectParams::from_file(&file).unwrap().panel_gap, MAX_PANEL_GAP);

        let params = InspectParams { panel_gap: MAX_PANEL_GAP + 1, ..InspectParams::default() };
        let args = DataSetArgs::parse_from(["pair-inspect", "--root", "unused"]);
        assert!(matches!(inspect_exec(&args, &params), Err(CorpusError::Config(_))));
    }

    #[test]
    fn cli_overrides_params() {
        let args = DataSetArgs::parse_from([
            "pair-inspect", "--root", "data", "--axis", "x", "--slice", "-3", "--pair", "2",
        ]);
        let params = args.resolve_params().unwrap();
        assert_eq!(params.slice, SliceSpec::new(Axis::X, -3));
        assert_eq!(params.selection, Selection::Index { index: 2 });
        assert_eq!(args.output, PathBuf::from("pair_slice.png"));
    }
}
