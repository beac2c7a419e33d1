//! Sampling followed by the brightness-anomaly heuristic.

mod support;

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use vso_sampler::archive::MemoryImageSource;
use vso_sampler::services::{
    find_corrupt_images, find_corrupt_images_with, sample_by_cadence, FenceParams,
};
use vso_sampler::DetectorError;

/// 64x48 frame with a slow horizontal gradient, scaled by `exposure`.
fn frame(exposure: f64) -> DynamicImage {
    let img = RgbImage::from_fn(64, 48, |x, _| {
        let level = ((40.0 + f64::from(x)) * exposure).min(255.0) as u8;
        Rgb([level, level, level])
    });
    DynamicImage::ImageRgb8(img)
}

/// Frame with a saturated streak across rows 8..16.
fn streaked(exposure: f64) -> DynamicImage {
    let mut img = frame(exposure).to_rgb8();
    for y in 8..16 {
        for x in 0..64 {
            img.put_pixel(x, y, Rgb([255, 255, 255]));
        }
    }
    DynamicImage::ImageRgb8(img)
}

#[tokio::test]
async fn test_flags_streaked_frame_from_sampled_batch() {
    let archive = support::minute_archive(10_000);
    let batch = sample_by_cadence(
        &archive,
        "2012-01-05 00:00:00",
        "2012-01-05 12:00:00",
        20,
        "ML",
        false,
    )
    .await
    .unwrap();

    let urls: Vec<String> = batch.iter().flat_map(|r| r.jpg_urls()).collect();
    assert_eq!(urls.len(), 36);

    let source = MemoryImageSource::new();
    for (i, url) in urls.iter().enumerate() {
        // Exposure drifts a little between frames.
        let exposure = 1.0 + (i % 5) as f64 * 0.01;
        let image = if i == 11 {
            streaked(exposure)
        } else {
            frame(exposure)
        };
        source.insert(url.clone(), image);
    }

    let flagged = find_corrupt_images(&source, &urls, 8).await.unwrap();
    assert_eq!(flagged, vec![urls[11].clone()]);
}

#[tokio::test]
async fn test_uniform_frames_are_clean() {
    let urls: Vec<String> = (0..12).map(|i| format!("mem://frame{}.jpg", i)).collect();
    let source = MemoryImageSource::new();
    for url in &urls {
        source.insert(url.clone(), frame(1.0));
    }

    assert!(find_corrupt_images(&source, &urls, 16).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_zero_multiplier_tightens_fence() {
    // Every column holds distinct values, so a fence at the extremes with no
    // widening still accepts all of them while a narrower one does not.
    let urls: Vec<String> = (0..10).map(|i| format!("mem://g{}.png", i)).collect();
    let source = MemoryImageSource::new();
    for (i, url) in urls.iter().enumerate() {
        let mut img = GrayImage::from_pixel(8, 8, Luma([100]));
        img.put_pixel(0, 0, Luma([100 + 10 * i as u8]));
        source.insert(url.clone(), DynamicImage::ImageLuma8(img));
    }

    let full_range = FenceParams {
        lower_percentile: 0.0,
        upper_percentile: 100.0,
        multiplier: 0.0,
    };
    let flagged = find_corrupt_images_with(&source, &urls, 8, full_range)
        .await
        .unwrap();
    assert!(flagged.is_empty());

    let inner_range = FenceParams {
        lower_percentile: 25.0,
        upper_percentile: 75.0,
        multiplier: 0.0,
    };
    let flagged = find_corrupt_images_with(&source, &urls, 8, inner_range)
        .await
        .unwrap();
    assert_eq!(flagged.first(), Some(&urls[0]));
    assert_eq!(flagged.last(), Some(&urls[9]));
}

#[tokio::test]
async fn test_grid_larger_than_image_is_rejected() {
    let urls = vec!["mem://tiny.png".to_string()];
    let source = MemoryImageSource::new();
    source.insert(
        urls[0].clone(),
        DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([1]))),
    );

    let err = find_corrupt_images(&source, &urls, 16).await.unwrap_err();
    assert!(matches!(err, DetectorError::InvalidGrid(_)));
}
