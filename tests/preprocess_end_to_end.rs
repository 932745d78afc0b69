use anyhow::Result;

use frame_classifier::{ColorFormat, Frame, MemoryLayout, MobileNetV2Profile, ModelProfile};

const SIZE: usize = 224;
const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

fn expected(channel: usize, pixel: u8) -> f32 {
    (pixel as f32 / 255.0 - MEAN[channel]) / STD[channel]
}

fn uniform_bgr(width: u32, height: u32, bgr: [u8; 3]) -> Result<Frame> {
    let pixels = bgr
        .iter()
        .copied()
        .cycle()
        .take(width as usize * height as usize * 3)
        .collect();
    Frame::from_bgr8(pixels, width, height, "uniform")
}

fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-4,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn downscaled_frame_becomes_normalized_planar_rgb() -> Result<()> {
    let pipeline = MobileNetV2Profile::new().build_preprocess_pipeline();
    let mut frame = uniform_bgr(400, 300, [10, 120, 240])?;

    pipeline.apply(&mut frame)?;

    assert_eq!((frame.width(), frame.height()), (224, 224));
    assert_eq!(frame.color(), ColorFormat::Rgb);
    assert_eq!(frame.layout(), MemoryLayout::Chw);
    let values = frame.tensor_values()?;
    assert_eq!(values.len(), 3 * SIZE * SIZE);

    let plane = SIZE * SIZE;
    for (channel, pixel) in [240u8, 120, 10].into_iter().enumerate() {
        let want = expected(channel, pixel);
        for value in &values[channel * plane..(channel + 1) * plane] {
            assert_close(*value, want);
        }
    }
    Ok(())
}

#[test]
fn planar_output_keeps_pixel_positions() -> Result<()> {
    let mut pixels = Vec::with_capacity(SIZE * SIZE * 3);
    for y in 0..SIZE {
        for x in 0..SIZE {
            pixels.extend_from_slice(&[(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8]);
        }
    }
    let mut frame = Frame::from_bgr8(pixels, SIZE as u32, SIZE as u32, "gradient")?;
    MobileNetV2Profile::new()
        .build_preprocess_pipeline()
        .apply(&mut frame)?;
    let values = frame.tensor_values()?;

    let plane = SIZE * SIZE;
    for (y, x) in [(0, 0), (3, 17), (100, 200), (223, 223)] {
        let at = y * SIZE + x;
        assert_close(values[at], expected(0, ((x + y) % 256) as u8));
        assert_close(values[plane + at], expected(1, (y % 256) as u8));
        assert_close(values[2 * plane + at], expected(2, (x % 256) as u8));
    }
    Ok(())
}

#[test]
fn upscaled_frame_is_padded_with_zero_pixels() -> Result<()> {
    let pipeline = MobileNetV2Profile::new().build_preprocess_pipeline();
    let mut frame = uniform_bgr(100, 100, [50, 50, 50])?;

    pipeline.apply(&mut frame)?;

    let values = frame.tensor_values()?;
    // 124 rows of padding: 62 above, 62 below
    assert_close(values[0], expected(0, 0));
    assert_close(values[61 * SIZE + 100], expected(0, 0));
    assert_close(values[62 * SIZE + 62], expected(0, 50));
    assert_close(values[161 * SIZE + 161], expected(0, 50));
    assert_close(values[162 * SIZE + 161], expected(0, 0));
    Ok(())
}

#[test]
fn running_the_pipeline_twice_changes_nothing() -> Result<()> {
    let pipeline = MobileNetV2Profile::new().build_preprocess_pipeline();
    let mut once = uniform_bgr(320, 240, [1, 2, 3])?;
    pipeline.apply(&mut once)?;
    let mut twice = once.clone();
    pipeline.apply(&mut twice)?;

    assert_eq!(once.buffer(), twice.buffer());
    assert_eq!(twice.layout(), MemoryLayout::Chw);
    Ok(())
}
