// Raster watermarking tests

use super::fixtures;
use highline_watermark::constants::DEFAULT_MAX_IMAGE_PIXELS;
use highline_watermark::watermark::{
    try_watermark_image, watermark_image, ImageDimensions, ImagePattern, WatermarkError,
    WatermarkOutcome,
};
use bytes::Bytes;
use image::codecs::webp::WebPEncoder;
use image::{ColorType, DynamicImage, GenericImageView, ImageEncoder, ImageFormat, Rgb, RgbImage};
use rstest::rstest;

#[rstest]
#[case(ImageFormat::Png)]
#[case(ImageFormat::Jpeg)]
#[case(ImageFormat::Gif)]
#[case(ImageFormat::Bmp)]
#[case(ImageFormat::Tiff)]
fn test_container_is_preserved(#[case] format: ImageFormat) {
    let data = fixtures::encode(DynamicImage::ImageRgb8(fixtures::photo(240, 160)), format);
    let out = try_watermark_image(&data, DEFAULT_MAX_IMAGE_PIXELS).unwrap();

    assert_eq!(image::guess_format(&out).unwrap(), format);
    let decoded = image::load_from_memory_with_format(&out, format).unwrap();
    assert_eq!(decoded.dimensions(), (240, 160));
}

#[test]
fn test_webp_is_stamped() {
    let source = fixtures::photo(160, 120);
    let mut data = Vec::new();
    WebPEncoder::new_lossless(&mut data)
        .write_image(source.as_raw(), 160, 120, ColorType::Rgb8)
        .unwrap();

    let out = try_watermark_image(&data, DEFAULT_MAX_IMAGE_PIXELS).unwrap();
    assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::WebP);
    assert_eq!(image::load_from_memory(&out).unwrap().dimensions(), (160, 120));
}

#[rstest]
#[case(600, 400, 33)]
#[case(100, 100, 30)]
#[case(3000, 2000, 167)]
#[case(400, 6000, 33)]
fn test_font_scales_with_short_side(#[case] width: u32, #[case] height: u32, #[case] expected: u32) {
    let pattern = ImagePattern::for_image(ImageDimensions::new(width, height));
    assert_eq!(pattern.font_size.round() as u32, expected);
}

#[test]
fn test_watermark_covers_the_whole_image() {
    let white = RgbImage::from_pixel(900, 900, Rgb([255, 255, 255]));
    let data = fixtures::encode(DynamicImage::ImageRgb8(white), ImageFormat::Png);
    let out = image::load_from_memory(&try_watermark_image(&data, DEFAULT_MAX_IMAGE_PIXELS).unwrap())
        .unwrap()
        .to_rgb8();

    // Every quadrant holds some tinted pixels
    for qy in 0..2 {
        for qx in 0..2 {
            let tinted = (qy * 450..(qy + 1) * 450)
                .flat_map(|y| (qx * 450..(qx + 1) * 450).map(move |x| (x, y)))
                .filter(|&(x, y)| out.get_pixel(x, y)[2] < 255)
                .count();
            assert!(tinted > 0, "quadrant ({}, {}) has no watermark", qx, qy);
        }
    }
}

#[test]
fn test_transparent_png_stays_transparent_outside_text() {
    let out = try_watermark_image(&fixtures::transparent_png(300, 200), DEFAULT_MAX_IMAGE_PIXELS)
        .unwrap();
    let decoded = image::load_from_memory(&out).unwrap().to_rgba8();

    assert!(decoded.pixels().any(|p| p[3] == 0));
    assert!(decoded.pixels().any(|p| p[3] > 0));
    // Alpha never exceeds the watermark opacity over a transparent base
    assert!(decoded.pixels().all(|p| p[3] <= 90));
}

#[test]
fn test_corrupt_inputs_fall_back() {
    let jpeg = fixtures::jpeg(200, 200);
    let cases: Vec<Bytes> = vec![
        Bytes::new(),
        Bytes::from_static(b"not an image at all"),
        Bytes::copy_from_slice(&jpeg[..jpeg.len() / 8]),
    ];

    for data in cases {
        let outcome = watermark_image(data.clone(), DEFAULT_MAX_IMAGE_PIXELS);
        assert_eq!(outcome, WatermarkOutcome::Unchanged(data));
    }
}

#[test]
fn test_decompression_bomb_is_rejected_before_decoding() {
    let data = fixtures::png(2000, 2000);
    let err = try_watermark_image(&data, 1_000_000).unwrap_err();
    assert!(matches!(err, WatermarkError::ImageTooLarge { .. }));
    assert!(!err.is_expected());
}
