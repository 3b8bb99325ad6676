use image::{GrayImage, Luma};
use lanewatch_preprocess::Letterbox;
use lanewatch_segment::{mask_from_logits, unletterbox_mask, Postprocessor, SegmentConfig, FOREGROUND};
use ndarray::Array4;

#[test]
fn road_scene_round_trip() -> anyhow::Result<()> {
    // 1280×720 frame, 640 model input: valid rows 140..500
    let lb = Letterbox::fit(1280, 720, 640)?;

    let mut road = Array4::<f32>::zeros((1, 2, 640, 640));
    let mut lanes = Array4::<f32>::zeros((1, 2, 640, 640));
    for y in 0..640 {
        for x in 0..640 {
            road[[0, 1, y, x]] = if y >= 320 { 3.0 } else { -3.0 };
            // two long vertical strokes inside the road
            let stroke = (200..206).contains(&x) || (430..436).contains(&x);
            lanes[[0, 1, y, x]] = if y >= 320 && stroke { 3.0 } else { -3.0 };
        }
    }

    let post = Postprocessor::new(SegmentConfig::default());
    let out = post.process(Some(road.view().into_dyn()), lanes.view().into_dyn(), &lb)?;

    let lane = &out.lane;
    assert_eq!(lane.dimensions(), (1280, 720));
    // stroke at model x≈203 → frame x≈406, row 600 is inside the road
    assert_eq!(lane.get_pixel(406, 600)[0], FOREGROUND);
    assert_eq!(lane.get_pixel(640, 600)[0], 0);
    // nothing above the road
    assert!((0..1280).all(|x| lane.get_pixel(x, 100)[0] == 0));
    assert!(out.lane_prob[[600, 406]] > 0.9);
    Ok(())
}

#[test]
fn all_foreground_mask_fills_frame() -> anyhow::Result<()> {
    let lb = Letterbox::fit(640, 480, 320)?;
    let mut seg = Array4::<f32>::zeros((1, 2, 320, 320));
    seg.fill(1.0);
    for v in seg.index_axis_mut(ndarray::Axis(1), 1).iter_mut() {
        *v = 2.0;
    }
    let model = mask_from_logits(seg.view().into_dyn(), 0.5, 0.0)?;
    assert_eq!(model, GrayImage::from_pixel(320, 320, Luma([FOREGROUND])));

    let frame = unletterbox_mask(&model, &lb)?;
    assert!(frame.pixels().all(|p| p[0] == FOREGROUND));
    Ok(())
}
