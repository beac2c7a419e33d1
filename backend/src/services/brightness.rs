//! Brightness-anomaly heuristic for flagging corrupted images.
//!
//! Each image is converted to intensity, block-averaged down to a coarse grid
//! and flattened into one row of a table (rows = images, columns = cells).
//! Rows are centred on their median so global exposure differences cancel out.
//! Every column then gets an acceptable range from its lower and upper
//! percentiles, widened by a multiple of the inter-percentile range. An image
//! with any cell outside its column's range is flagged.
//!
//! # Coordinate System
//!
//! Intensity arrays use ndarray indexing `[row, col] = [y, x]` with shape
//! `(height, width)`.

use image::DynamicImage;
use log::{debug, info};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::archive::ImageSource;
use crate::error::{DetectorError, DetectorResult};

/// Default side length of the reduced grid.
pub const DEFAULT_GRID_SIZE: u32 = 16;

/// Percentile fence applied to every grid column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FenceParams {
    pub lower_percentile: f64,
    pub upper_percentile: f64,
    /// Multiple of the inter-percentile range added on both sides
    pub multiplier: f64,
}

impl Default for FenceParams {
    fn default() -> Self {
        Self {
            lower_percentile: 4.0,
            upper_percentile: 96.0,
            multiplier: 1.5,
        }
    }
}

impl FenceParams {
    /// Checked constructor.
    pub fn new(
        lower_percentile: f64,
        upper_percentile: f64,
        multiplier: f64,
    ) -> DetectorResult<Self> {
        let fence = Self {
            lower_percentile,
            upper_percentile,
            multiplier,
        };
        fence.validate()?;
        Ok(fence)
    }

    /// Require `0 <= lower < upper <= 100` and a finite, non-negative multiplier.
    ///
    /// NaN in any field fails.
    pub fn validate(&self) -> DetectorResult<()> {
        let in_range = |p: f64| (0.0..=100.0).contains(&p);
        if !in_range(self.lower_percentile)
            || !in_range(self.upper_percentile)
            || self.lower_percentile >= self.upper_percentile
        {
            return Err(DetectorError::InvalidFence(format!(
                "percentiles must satisfy 0 <= lower < upper <= 100 (got {} and {})",
                self.lower_percentile, self.upper_percentile
            )));
        }
        if !self.multiplier.is_finite() || self.multiplier < 0.0 {
            return Err(DetectorError::InvalidFence(format!(
                "multiplier must be finite and non-negative (got {})",
                self.multiplier
            )));
        }
        Ok(())
    }

    /// Inclusive acceptable range for one column.
    ///
    /// Assumes [`validate`](Self::validate) passed; NaN percentiles give NaN bounds.
    pub fn bounds(&self, column: &[f64]) -> (f64, f64) {
        let lower = percentile(column, self.lower_percentile);
        let upper = percentile(column, self.upper_percentile);
        let spread = upper - lower;
        (
            lower - self.multiplier * spread,
            upper + self.multiplier * spread,
        )
    }
}

/// Single-channel intensity of an image using ITU-R 601-2 luma.
///
/// Values are rounded to whole grey levels, so greyscale input is returned
/// unchanged.
pub fn to_intensity(image: &DynamicImage) -> Array2<f64> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();

    Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
        let [r, g, b] = rgb.get_pixel(x as u32, y as u32).0;
        let luma = (u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114 + 500) / 1000;
        f64::from(luma)
    })
}

/// Block-average `intensity` so its width becomes roughly `grid_size`.
///
/// The block factor is `floor(width / grid_size)`. Edges that do not fill a
/// whole block are padded with zeros, giving `ceil(h / f) x ceil(w / f)` cells.
pub fn block_reduce_image(intensity: &Array2<f64>, grid_size: u32) -> DetectorResult<Array2<f64>> {
    let (height, width) = intensity.dim();
    if grid_size == 0 {
        return Err(DetectorError::InvalidGrid(
            "grid size must be positive".to_string(),
        ));
    }

    let factor = width / grid_size as usize;
    if factor == 0 {
        return Err(DetectorError::InvalidGrid(format!(
            "image width {} is smaller than grid size {}",
            width, grid_size
        )));
    }

    let rows = height.div_ceil(factor);
    let cols = width.div_ceil(factor);
    let block_area = (factor * factor) as f64;

    let mut reduced = Array2::<f64>::zeros((rows, cols));
    for ((y, x), value) in intensity.indexed_iter() {
        reduced[[y / factor, x / factor]] += value;
    }
    reduced.mapv_inplace(|sum| sum / block_area);

    Ok(reduced)
}

/// Reduced intensity grids for a batch of images, one row per image.
#[derive(Debug, Clone, PartialEq)]
pub struct BrightnessGrid {
    urls: Vec<String>,
    cells: Array2<f64>,
}

impl BrightnessGrid {
    /// Assemble a grid from flattened rows keyed by URL.
    ///
    /// # Errors
    /// `EmptyBatch` without rows, `ShapeMismatch` when a row's length differs
    /// from the first row's.
    pub fn from_rows(rows: Vec<(String, Vec<f64>)>) -> DetectorResult<Self> {
        let expected = match rows.first() {
            Some((_, cells)) => cells.len(),
            None => return Err(DetectorError::EmptyBatch),
        };

        let mut urls = Vec::with_capacity(rows.len());
        let mut flat = Vec::with_capacity(rows.len() * expected);
        for (url, cells) in rows {
            if cells.len() != expected {
                return Err(DetectorError::ShapeMismatch {
                    url,
                    expected,
                    actual: cells.len(),
                });
            }
            urls.push(url);
            flat.extend(cells);
        }

        let cells = Array2::from_shape_vec((urls.len(), expected), flat)
            .map_err(|e| DetectorError::InvalidGrid(e.to_string()))?;
        Ok(Self { urls, cells })
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Cell values, shape `(images, cells)`.
    pub fn cells(&self) -> &Array2<f64> {
        &self.cells
    }

    pub fn n_images(&self) -> usize {
        self.cells.nrows()
    }

    pub fn n_cells(&self) -> usize {
        self.cells.ncols()
    }
}

/// Per-cell "within range" flags, same layout as the [`BrightnessGrid`].
#[derive(Debug, Clone, PartialEq)]
pub struct CellMask {
    urls: Vec<String>,
    within: Array2<bool>,
}

impl CellMask {
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn within(&self) -> &Array2<bool> {
        &self.within
    }

    /// URLs with at least one out-of-range cell, in input order.
    pub fn flagged_urls(&self) -> Vec<String> {
        self.urls
            .iter()
            .zip(self.within.axis_iter(Axis(0)))
            .filter(|(_, row)| row.iter().any(|ok| !ok))
            .map(|(url, _)| url.clone())
            .collect()
    }
}

/// Fetch, reduce and flatten every image in `urls`, in order.
///
/// The first failing image aborts the batch.
pub async fn segment_images(
    source: &dyn ImageSource,
    urls: &[String],
    grid_size: u32,
) -> DetectorResult<BrightnessGrid> {
    let mut rows = Vec::with_capacity(urls.len());
    for url in urls {
        let image = source.fetch(url).await?;
        let reduced = block_reduce_image(&to_intensity(&image), grid_size)?;
        debug!(
            "{}: {}x{} -> {}x{} cells",
            url,
            image.width(),
            image.height(),
            reduced.ncols(),
            reduced.nrows()
        );
        rows.push((url.clone(), reduced.iter().copied().collect()));
    }
    BrightnessGrid::from_rows(rows)
}

/// Centre each row on its median and test every cell against its column fence.
pub fn mask_cells_outside_iqr(grid: &BrightnessGrid, fence: FenceParams) -> CellMask {
    let mut centered = grid.cells.clone();
    for mut row in centered.axis_iter_mut(Axis(0)) {
        let values: Vec<f64> = row.iter().copied().collect();
        let m = median(&values);
        row.mapv_inplace(|v| v - m);
    }

    let mut within = Array2::from_elem(centered.dim(), true);
    for (j, column) in centered.axis_iter(Axis(1)).enumerate() {
        let values: Vec<f64> = column.iter().copied().collect();
        let (low, high) = fence.bounds(&values);
        for (i, value) in values.iter().enumerate() {
            within[[i, j]] = low <= *value && *value <= high;
        }
    }

    CellMask {
        urls: grid.urls.clone(),
        within,
    }
}

/// Configurable run of the heuristic over an [`ImageSource`].
pub struct CorruptImageFinder<'a> {
    source: &'a dyn ImageSource,
    grid_size: u32,
    fence: FenceParams,
}

impl<'a> CorruptImageFinder<'a> {
    pub fn new(source: &'a dyn ImageSource) -> Self {
        Self {
            source,
            grid_size: DEFAULT_GRID_SIZE,
            fence: FenceParams::default(),
        }
    }

    pub fn with_grid_size(mut self, grid_size: u32) -> Self {
        self.grid_size = grid_size;
        self
    }

    pub fn with_fence(mut self, fence: FenceParams) -> Self {
        self.fence = fence;
        self
    }

    /// URLs of images judged corrupted, in input order.
    ///
    /// An empty `urls` list yields an empty result without fetching anything.
    ///
    /// # Errors
    /// `InvalidFence` before any fetch when the fence parameters are invalid.
    pub async fn run(&self, urls: &[String]) -> DetectorResult<Vec<String>> {
        self.fence.validate()?;
        if urls.is_empty() {
            return Ok(Vec::new());
        }

        let grid = segment_images(self.source, urls, self.grid_size).await?;
        let flagged = mask_cells_outside_iqr(&grid, self.fence).flagged_urls();

        info!(
            "{} of {} images flagged ({} cells each)",
            flagged.len(),
            grid.n_images(),
            grid.n_cells()
        );
        Ok(flagged)
    }
}

/// Flag corrupted images with the default fence.
pub async fn find_corrupt_images(
    source: &dyn ImageSource,
    urls: &[String],
    grid_size: u32,
) -> DetectorResult<Vec<String>> {
    find_corrupt_images_with(source, urls, grid_size, FenceParams::default()).await
}

/// Flag corrupted images with an explicit fence.
pub async fn find_corrupt_images_with(
    source: &dyn ImageSource,
    urls: &[String],
    grid_size: u32,
    fence: FenceParams,
) -> DetectorResult<Vec<String>> {
    CorruptImageFinder::new(source)
        .with_grid_size(grid_size)
        .with_fence(fence)
        .run(urls)
        .await
}

/// Median of `values`; `NaN` when empty.
pub fn median(values: &[f64]) -> f64 {
    percentile(values, 50.0)
}

/// Percentile `q` (0-100) with linear interpolation between closest ranks.
///
/// Returns `NaN` for an empty slice.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}
