use image::{Rgb, RgbImage};
use lanewatch_preprocess::{Letterbox, Preprocessor};

#[test]
fn cpu_smoke() -> anyhow::Result<()> {
    // 640×480 mid-grey frame
    let frame = RgbImage::from_pixel(640, 480, Rgb([128, 128, 128]));

    let pp = Preprocessor::new(320);
    let (tensor, lb) = pp.run(&frame)?;
    assert_eq!(tensor.shape(), &[1, 3, 320, 320]);
    assert_eq!(lb, Letterbox::fit(640, 480, 320)?);

    // every value is normalised
    assert!(tensor.iter().all(|v| (0.0..=1.0).contains(v)));
    Ok(())
}
