//! End-to-end runs through the public API with the local providers.
//!
//! Images are built in memory and encoded as PNG so every pixel check is
//! exact.

use retouch::batch::{BatchStore, FsBatchStore};
use retouch::config::EditorConfig;
use retouch::imaging::{
    CapabilityRegistry, Channels, ImageBuffer, ImageCodec, OutputFormat, Providers, RustCodec,
};
use retouch::pipeline::{EditRequest, ErrorKind, Pipeline};
use tempfile::TempDir;

fn setup() -> (CapabilityRegistry, RustCodec) {
    let config = EditorConfig::default();
    let registry =
        CapabilityRegistry::with_providers(Providers::local(&config), &config.limits).unwrap();
    (registry, config.codec())
}

fn png(codec: &RustCodec, image: &ImageBuffer) -> Vec<u8> {
    codec.encode(image, OutputFormat::Png).unwrap()
}

fn request<'a>(image: &'a [u8], operation: &'a str, params: Option<&'a str>) -> EditRequest<'a> {
    EditRequest {
        image,
        operation,
        params,
        format: OutputFormat::Png,
    }
}

/// Dark background with a blue 20x20 square in the middle.
fn square_scene() -> ImageBuffer {
    let (w, h) = (60u32, 40u32);
    let mut data = Vec::with_capacity((w * h * 3) as usize);
    for y in 0..h {
        for x in 0..w {
            if (20..40).contains(&x) && (10..30).contains(&y) {
                data.extend_from_slice(&[200, 50, 50]);
            } else {
                data.extend_from_slice(&[30, 30, 30]);
            }
        }
    }
    ImageBuffer::from_bgr(w, h, data).unwrap()
}

#[test]
fn brightness_on_mid_gray() {
    let (registry, codec) = setup();
    let pipeline = Pipeline::new(&registry, &codec);
    let input = png(&codec, &ImageBuffer::filled(100, 100, [128, 128, 128]).unwrap());

    let done = pipeline
        .edit(&request(&input, "adjustments", Some(r#"{"brightness": 150}"#)))
        .unwrap();
    assert_eq!(done.mime_type, "image/png");
    assert_eq!((done.width, done.height), (100, 100));

    let out = codec.decode(&done.bytes).unwrap();
    assert_eq!(out.channels(), Channels::Bgr);
    assert!(out.pixels().all(|p| p == [192, 192, 192]));
}

#[test]
fn adjustments_without_params_is_identity() {
    let (registry, codec) = setup();
    let pipeline = Pipeline::new(&registry, &codec);
    let scene = square_scene();
    let done = pipeline
        .edit(&request(&png(&codec, &scene), "adjustments", None))
        .unwrap();
    assert_eq!(codec.decode(&done.bytes).unwrap(), scene);
}

#[test]
fn background_removal_keeps_subject() {
    let (registry, codec) = setup();
    let pipeline = Pipeline::new(&registry, &codec);
    let input = png(&codec, &square_scene());

    let done = pipeline
        .edit(&request(&input, "background_removal", None))
        .unwrap();
    let out = codec.decode(&done.bytes).unwrap();
    assert_eq!(out.dimensions(), (60, 40));
    assert_eq!(out.channels(), Channels::Bgr);
    assert_eq!(out.pixel(0, 0), &[255, 255, 255]);
    assert_eq!(out.pixel(59, 39), &[255, 255, 255]);
    assert_eq!(out.pixel(30, 20), &[200, 50, 50]);
}

#[test]
fn grayscale_result_is_returned_as_three_channels() {
    let (registry, codec) = setup();
    let pipeline = Pipeline::new(&registry, &codec);
    let input = png(&codec, &square_scene());

    let done = pipeline
        .edit(&request(
            &input,
            "image_enhancement.global_threshold",
            Some(r#"{"threshold": 50}"#),
        ))
        .unwrap();
    let out = codec.decode(&done.bytes).unwrap();
    assert_eq!(out.channels(), Channels::Bgr);
    assert_eq!(out.pixel(0, 0), &[0, 0, 0]);
    assert_eq!(out.pixel(30, 20), &[255, 255, 255]);
}

#[test]
fn rotate_swaps_dimensions() {
    let (registry, codec) = setup();
    let pipeline = Pipeline::new(&registry, &codec);
    let input = png(&codec, &square_scene());
    let done = pipeline
        .edit(&request(
            &input,
            "geometric_transformations.rotate",
            Some(r#"{"angle": 90}"#),
        ))
        .unwrap();
    assert_eq!((done.width, done.height), (40, 60));
}

#[test]
fn realesrgan_upscales_by_configured_factor() {
    let (registry, codec) = setup();
    let pipeline = Pipeline::new(&registry, &codec);
    let input = png(&codec, &ImageBuffer::filled(10, 8, [90, 120, 150]).unwrap());

    let done = pipeline
        .edit(&request(&input, "super_resolution.realesrgan", None))
        .unwrap();
    let scale = EditorConfig::default().super_resolution.scale;
    assert_eq!((done.width, done.height), (10 * scale, 8 * scale));
}

#[test]
fn oversized_resize_target_is_client_error() {
    let (registry, codec) = setup();
    let pipeline = Pipeline::new(&registry, &codec);
    let input = png(&codec, &square_scene());

    let err = pipeline
        .edit(&request(
            &input,
            "geometric_transformations.handle_resize",
            Some(r#"{"width": 200000, "height": 200000}"#),
        ))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameters);
    assert_eq!(err.to_failure().status, 400);
}

#[test]
fn upscale_past_pixel_limit_fails_the_transform() {
    let mut config = EditorConfig::default();
    config.limits.max_pixels = 1_000;
    let registry =
        CapabilityRegistry::with_providers(Providers::local(&config), &config.limits).unwrap();
    let codec = config.codec();
    let pipeline = Pipeline::new(&registry, &codec);
    // 80 pixels decode fine; the 4x result would be 1280
    let input = png(&codec, &ImageBuffer::filled(10, 8, [90, 120, 150]).unwrap());

    let err = pipeline
        .edit(&request(&input, "super_resolution.realesrgan", None))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransformInvocationError);
    assert_eq!(err.to_failure().status, 500);
}

#[test]
fn unknown_operation_is_client_error() {
    let (registry, codec) = setup();
    let pipeline = Pipeline::new(&registry, &codec);
    let input = png(&codec, &square_scene());

    let err = pipeline
        .edit(&request(&input, "nonexistent.op", None))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownOperation);
    let failure = err.to_failure();
    assert_eq!(failure.status, 400);
    assert!(failure.message.contains("nonexistent.op"));
}

#[test]
fn malformed_params_are_client_error() {
    let (registry, codec) = setup();
    let pipeline = Pipeline::new(&registry, &codec);
    let input = png(&codec, &square_scene());

    for params in [r#"{"brightness": "#, "[1, 2]", r#"{"brightnes": 120}"#] {
        let err = pipeline
            .edit(&request(&input, "adjustments", Some(params)))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameters, "params: {params}");
        assert_eq!(err.to_failure().status, 400);
    }
}

#[test]
fn garbage_upload_is_decode_error() {
    let (registry, codec) = setup();
    let pipeline = Pipeline::new(&registry, &codec);
    let err = pipeline
        .edit(&request(b"definitely not an image", "adjustments", None))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DecodeError);
    assert_eq!(err.to_failure().status, 400);
}

#[test]
fn edited_image_survives_batch_save_and_open() {
    let tmp = TempDir::new().unwrap();
    let (registry, codec) = setup();
    let pipeline = Pipeline::new(&registry, &codec);
    let input = png(&codec, &square_scene());

    let done = pipeline
        .edit(&request(&input, "geometric_transformations.flip_horizontal", None))
        .unwrap();
    let edited = codec.decode(&done.bytes).unwrap();

    let store = FsBatchStore::new(tmp.path().join("saved"), codec);
    let path = store.save(&edited, OutputFormat::Png).unwrap();
    assert!(path.starts_with(tmp.path().join("saved")));
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("edit-") && name.ends_with(".png"), "{name}");

    assert_eq!(store.open(&path).unwrap(), edited);
}
