//! Integration test: run generated images through the full pipeline and export to SVG.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use hilbert_draw_pipeline::{CurveConfig, DensityStrategy, Point};

/// A 32x32 PNG: black disc on a white background.
fn disc_png() -> Vec<u8> {
    let img = image::RgbaImage::from_fn(32, 32, |x, y| {
        let dx = f64::from(x) - 16.0;
        let dy = f64::from(y) - 16.0;
        if dx.hypot(dy) < 10.0 {
            image::Rgba([0, 0, 0, 255])
        } else {
            image::Rgba([255, 255, 255, 255])
        }
    });
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    image::ImageEncoder::write_image(
        encoder,
        img.as_raw(),
        img.width(),
        img.height(),
        image::ExtendedColorType::Rgba8,
    )
    .unwrap();
    buf
}

#[test]
fn disc_pipeline_to_svg() {
    let config = CurveConfig {
        max_level: 5,
        ..CurveConfig::default()
    };
    let result = hilbert_draw_pipeline::process(&disc_png(), &config).expect("pipeline should succeed");

    assert_eq!(result.dimensions.width, 32);
    assert_eq!(result.dimensions.height, 32);
    // Adaptive: more than a coarse grid, fewer than the full 32x32.
    assert!(result.polyline.len() > 64, "got {} points", result.polyline.len());
    assert!(result.polyline.len() < 1024, "got {} points", result.polyline.len());
    assert_eq!(result.polyline.first(), Some(&Point::new(0.0, 0.0)));

    let config_json = serde_json::to_string(&config).unwrap();
    let meta = hilbert_draw_export::SvgMetadata {
        title: Some("disc"),
        description: Some("max_level=5"),
        config_json: Some(&config_json),
    };
    let svg = hilbert_draw_export::to_svg(&result.polyline, result.dimensions, &meta);

    assert!(svg.contains("<svg"));
    assert!(svg.contains(r#"viewBox="0 0 32 32""#));
    assert_eq!(svg.matches("<path").count(), 1);
    assert!(svg.contains("<title>disc</title>"));
    assert!(svg.contains("max_level"));
    assert!(svg.trim_end().ends_with("</svg>"));

    // One M and one L per remaining anchor.
    let path = &svg[svg.find("<path").unwrap()..];
    let d_start = path.find(r#" d=""#).unwrap() + 4;
    let d_len = path[d_start..].find('"').unwrap();
    let d = &path[d_start..d_start + d_len];
    assert_eq!(d.matches('M').count(), 1);
    assert_eq!(d.matches('L').count(), result.polyline.len() - 1);
}

#[test]
fn every_strategy_exports() {
    for density in [
        DensityStrategy::Max,
        DensityStrategy::Average,
        DensityStrategy::Majority,
        DensityStrategy::Circles,
    ] {
        let config = CurveConfig {
            max_level: 4,
            density,
            seed: 3,
            ..CurveConfig::default()
        };
        let result = hilbert_draw_pipeline::process(&disc_png(), &config).unwrap();
        assert!(!result.polyline.is_empty(), "{density:?} produced no points");
        let svg = hilbert_draw_export::to_svg(
            &result.polyline,
            result.dimensions,
            &hilbert_draw_export::SvgMetadata::default(),
        );
        assert!(svg.contains(r#"viewBox="0 0 32 32""#), "{density:?}");
    }
}

