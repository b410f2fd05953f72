//! Grayscale rendering of slices and side-by-side figure composition.
//!
//! A [Figure] is a row of panels on a black background with each panel's title drawn in a band
//! above it, written as a PNG. Provenance of every panel is written next to it as a JSON manifest.

use crate::error::{CorpusError, Result};
use crate::slice::Axis;
use crate::volume::finite_range;
use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{imageops, GrayImage, ImageFormat, Luma};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

const GLYPH_SIZE: u32 = 8;
const TITLE_PAD: u32 = 2;
/// rows reserved above the panels for their titles
pub const TITLE_BAND_HEIGHT: u32 = GLYPH_SIZE + 2 * TITLE_PAD;
const MAX_FIGURE_PIXELS: u64 = 1 << 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Colormap {
    #[default]
    Gray,
    GrayInverted,
}

/// min-max normalizes a slice into an 8-bit image. Row 0 of the (possibly transposed) slice is
/// the top row of the image. Non-finite voxels are drawn black.
pub fn to_grayscale(slice: &Array2<f32>, colormap: Colormap, transpose: bool) -> GrayImage {
    let view = if transpose { slice.t() } else { slice.view() };
    let (rows, cols) = view.dim();
    let (lo, hi) = finite_range(view.iter().copied());
    let scale = if hi > lo { 255. / (hi - lo) } else { 0. };

    GrayImage::from_fn(cols as u32, rows as u32, |x, y| {
        let v = view[[y as usize, x as usize]];
        if !v.is_finite() {
            return Luma([0]);
        }
        let level = ((v - lo) * scale).round().clamp(0., 255.) as u8;
        match colormap {
            Colormap::Gray => Luma([level]),
            Colormap::GrayInverted => Luma([255 - level]),
        }
    })
}

/// draws `text` in white 8x8 glyphs into the title band over the columns x0..x0 + width.
/// Characters without a glyph are drawn as '?'.
fn draw_title(canvas: &mut GrayImage, text: &str, x0: u32, width: u32) {
    let n_chars = text.chars().count() as u64;
    let text_width = n_chars * GLYPH_SIZE as u64;
    let start = if text_width < width as u64 {
        x0 + (width - text_width as u32) / 2
    } else {
        x0
    };
    let x_end = x0 + width;

    for (i, c) in text.chars().enumerate() {
        let glyph = BASIC_FONTS.get(c).or_else(|| BASIC_FONTS.get('?')).unwrap_or([0; 8]);
        let glyph_x = start as u64 + i as u64 * GLYPH_SIZE as u64;
        if glyph_x >= x_end as u64 {
            break;
        }
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                let x = glyph_x + col as u64;
                if bits & (1 << col) != 0 && x < x_end as u64 {
                    canvas.put_pixel(x as u32, TITLE_PAD + row as u32, Luma([255]));
                }
            }
        }
    }
}

/// where a panel's pixels came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelSource {
    pub path: Option<PathBuf>,
    pub volume_shape: [usize; 3],
    /// voxel size (mm) of the source volume
    pub voxel_size: [f32; 3],
    pub axis: Axis,
    pub index: usize,
}

#[derive(Debug, Clone)]
pub struct Panel {
    pub title: String,
    pub image: GrayImage,
    pub source: Option<PanelSource>,
}

impl Panel {
    pub fn new(title: impl Into<String>, image: GrayImage) -> Self {
        Self {
            title: title.into(),
            image,
            source: None,
        }
    }

    pub fn with_source(mut self, source: PanelSource) -> Self {
        self.source = Some(source);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelRecord {
    pub title: String,
    pub x_offset: u32,
    pub y_offset: u32,
    pub width: u32,
    pub height: u32,
    pub source: Option<PanelSource>,
}

/// the JSON sidecar written next to a figure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FigureManifest {
    pub width: u32,
    pub height: u32,
    pub gap: u32,
    pub panels: Vec<PanelRecord>,
}

#[derive(Debug, Clone)]
pub struct Figure {
    panels: Vec<Panel>,
    gap: u32,
}

impl Figure {
    pub fn new(gap: u32) -> Self {
        Self { panels: vec![], gap }
    }

    pub fn push(&mut self, panel: Panel) {
        self.panels.push(panel);
    }

    /// lays panels out left to right below a title band, separated by `gap` black columns.
    /// Each panel's title is drawn centered above it and clipped to the panel width.
    pub fn compose(&self) -> Result<(GrayImage, FigureManifest)> {
        if self.panels.is_empty() {
            return Err(CorpusError::Render("figure has no panels".to_string()));
        }
        let too_large = || {
            CorpusError::Render(format!("figure too large with a gap of {} px", self.gap))
        };

        let panel_height = self.panels.iter().map(|p| p.image.height()).max().unwrap_or(0);
        let height = panel_height.checked_add(TITLE_BAND_HEIGHT).ok_or_else(too_large)?;

        let gaps = self.gap.checked_mul(self.panels.len() as u32 - 1).ok_or_else(too_large)?;
        let width = self.panels.iter()
            .try_fold(gaps, |acc, p| acc.checked_add(p.image.width()))
            .ok_or_else(too_large)?;
        if (width as u64) * (height as u64) > MAX_FIGURE_PIXELS {
            return Err(too_large());
        }

        let mut canvas = GrayImage::new(width, height);
        let mut records = Vec::with_capacity(self.panels.len());
        let mut x_offset = 0u32;
        for panel in &self.panels {
            let (x, y) = (x_offset as i64, TITLE_BAND_HEIGHT as i64);
            imageops::replace(&mut canvas, &panel.image, x, y);
            draw_title(&mut canvas, &panel.title, x_offset, panel.image.width());
            records.push(PanelRecord {
                title: panel.title.clone(),
                x_offset,
                y_offset: TITLE_BAND_HEIGHT,
                width: panel.image.width(),
                height: panel.image.height(),
                source: panel.source.clone(),
            });
            x_offset = x_offset.saturating_add(panel.image.width()).saturating_add(self.gap);
        }

        let manifest = FigureManifest {
            width,
            height,
            gap: self.gap,
            panels: records,
        };
        Ok((canvas, manifest))
    }

    /// writes the figure as PNG to `path` and its manifest to `path` with a .json extension.
    /// Returns the manifest path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        let (canvas, manifest) = self.compose()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        canvas.save_with_format(path, ImageFormat::Png)?;

        let manifest_path = path.with_extension("json");
        let f = BufWriter::new(File::create(&manifest_path)?);
        serde_json::to_writer_pretty(f, &manifest)?;

        info!("wrote {}x{} figure to {}", manifest.width, manifest.height, path.display());
        Ok(manifest_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::tempdir;

    #[test]
    fn grayscale_normalizes_to_full_range() {
        let slice = array![[0., 1.], [2., 4.]];
        let img = to_grayscale(&slice, Colormap::Gray, false);
        assert_eq!(img.dimensions(), (2, 2));
        assert_eq!(img.get_pixel(0, 0)[0], 0);
        assert_eq!(img.get_pixel(1, 1)[0], 255);
        assert_eq!(img.get_pixel(0, 1)[0], 128);
    }

    #[test]
    fn transpose_swaps_image_axes() {
        let slice = array![[0., 1., 2.], [3., 4., 5.]];
        let img = to_grayscale(&slice, Colormap::Gray, true);
        assert_eq!(img.dimensions(), (2, 3));
        assert_eq!(img.get_pixel(1, 0)[0], 153);
        assert_eq!(img.get_pixel(1, 2)[0], 255);
    }

    #[test]
    fn constant_and_non_finite() {
        let slice = array![[3., 3.], [f32::NAN, 3.]];
        let img = to_grayscale(&slice, Colormap::Gray, false);
        assert!(img.pixels().all(|p| p[0] == 0));

        let img = to_grayscale(&slice, Colormap::GrayInverted, false);
        assert_eq!(img.get_pixel(0, 0)[0], 255);
        assert_eq!(img.get_pixel(0, 1)[0], 0);
    }

    #[test]
    fn compose_side_by_side() {
        let mut fig = Figure::new(2);
        fig.push(Panel::new("t1", GrayImage::from_pixel(3, 4, Luma([200]))));
        fig.push(Panel::new("t2", GrayImage::from_pixel(2, 2, Luma([100]))));

        let (canvas, manifest) = fig.compose().unwrap();
        let band = TITLE_BAND_HEIGHT;
        assert_eq!(canvas.dimensions(), (7, 4 + band));
        assert_eq!(canvas.get_pixel(0, band + 3)[0], 200);
        assert_eq!(canvas.get_pixel(3, band)[0], 0);
        assert_eq!(canvas.get_pixel(5, band + 1)[0], 100);
        assert_eq!(canvas.get_pixel(5, band + 3)[0], 0);
        assert_eq!(manifest.panels[1].x_offset, 5);
        assert_eq!(manifest.panels[1].y_offset, band);
        assert_eq!(manifest.panels[1].title, "t2");
    }

    #[test]
    fn titles_are_drawn_above_each_panel() {
        let mut fig = Figure::new(6);
        fig.push(Panel::new("T1", GrayImage::new(40, 10)));
        fig.push(Panel::new("T2", GrayImage::new(40, 10)));

        let (canvas, _) = fig.compose().unwrap();
        assert!(canvas.height() > 10);

        let lit_in = |x_range: std::ops::Range<u32>| {
            x_range.flat_map(|x| (0..TITLE_BAND_HEIGHT).map(move |y| (x, y)))
                .filter(|&(x, y)| canvas.get_pixel(x, y)[0] == 255)
                .count()
        };
        assert!(lit_in(0..40) > 0);
        assert!(lit_in(46..86) > 0);
        assert_eq!(lit_in(40..46), 0);
        // panels themselves are untouched
        assert!(canvas.enumerate_pixels()
            .filter(|(_, y, _)| *y >= TITLE_BAND_HEIGHT)
            .all(|(_, _, p)| p[0] == 0));
    }

    #[test]
    fn long_titles_are_clipped_to_their_panel() {
        let mut fig = Figure::new(3);
        fig.push(Panel::new("a very long modality name", GrayImage::new(5, 5)));
        fig.push(Panel::new("", GrayImage::new(5, 5)));

        let (canvas, _) = fig.compose().unwrap();
        let gap_and_right = (5..13).flat_map(|x| (0..TITLE_BAND_HEIGHT).map(move |y| (x, y)));
        assert!(gap_and_right.into_iter().all(|(x, y)| canvas.get_pixel(x, y)[0] == 0));
        assert!((0..5).any(|x| (0..TITLE_BAND_HEIGHT).any(|y| canvas.get_pixel(x, y)[0] == 255)));
    }

    #[test]
    fn oversized_gap_is_an_error() {
        let mut fig = Figure::new(u32::MAX);
        fig.push(Panel::new("t1", GrayImage::new(2, 2)));
        fig.push(Panel::new("t2", GrayImage::new(2, 2)));
        assert!(matches!(fig.compose(), Err(CorpusError::Render(_))));

        let mut fig = Figure::new(u32::MAX / 2);
        fig.push(Panel::new("t1", GrayImage::new(2, 2)));
        fig.push(Panel::new("t2", GrayImage::new(2, 2)));
        assert!(matches!(fig.compose(), Err(CorpusError::Render(_))));
    }

    #[test]
    fn empty_figure_is_an_error() {
        assert!(matches!(Figure::new(0).compose(), Err(CorpusError::Render(_))));
    }

    #[test]
    fn save_writes_png_and_manifest() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("figures").join("pair.png");
        let mut fig = Figure::new(0);
        fig.push(Panel::new("t1", GrayImage::from_pixel(2, 2, Luma([10]))));

        let manifest_path = fig.save(&out).unwrap();
        assert!(out.is_file());
        assert_eq!(manifest_path, dir.path().join("figures").join("pair.json"));

        let manifest = fs::read_to_string(manifest_path).unwrap();
        let manifest: FigureManifest = serde_json::from_str(&manifest).unwrap();
        assert_eq!(manifest.panels.len(), 1);
        assert_eq!(manifest.panels[0].title, "t1");

        let decoded = image::open(&out).unwrap().to_luma8();
        assert_eq!(decoded.dimensions(), (2, 2 + TITLE_BAND_HEIGHT));
    }
}
