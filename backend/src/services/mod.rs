//! Service layer.
//!
//! The services sit on top of the archive layer: [`sampler`] turns one
//! time-range request into as many archive queries as the result cap requires,
//! and [`brightness`] screens the returned images for corruption.

pub mod brightness;
pub mod sampler;


pub use brightness::{
    find_corrupt_images, find_corrupt_images_with, mask_cells_outside_iqr, segment_images,
    BrightnessGrid, CellMask, CorruptImageFinder, FenceParams, DEFAULT_GRID_SIZE,
};
pub use sampler::{sample_by_cadence, CappedSampler, NSO_CAP_QUERY_SIZE};
