use anyhow::Result;
use image::{GrayImage, Luma};
use lanewatch_lane::{LaneAnalyzer, LaneConfig};
use ndarray::Array2;

#[test]
fn lane_numbers_never_decrease_left_to_right() -> Result<()> {
    for total in 2..=8u32 {
        let cfg = LaneConfig { total_lanes: total, ego_lane: (total + 1) / 2, ..Default::default() };
        let model = LaneAnalyzer::new(cfg).analyze(Array2::<f32>::zeros((720, 1280)).view(), 1280, 720, None)?;
        assert_eq!(model.boundaries.len(), total as usize + 1);

        for y in [380, 500, 650, 719] {
            let mut prev = 1;
            for x in 25..1255 {
                let lane = model.lane_number(x, y).expect("inside roi");
                assert!(lane >= prev && lane <= total as usize);
                prev = lane;
            }
            assert_eq!(prev, total as usize, "rightmost lane reached at row {y}");
        }
    }
    Ok(())
}

#[test]
fn drivable_gate_clears_lane_pixels_off_road() -> Result<()> {
    let mut prob = Array2::<f32>::zeros((720, 1280));
    // painted stripe on and off the road
    for y in 400..720 {
        for x in 300..306 {
            prob[[y, x]] = 0.95;
            prob[[y, x + 800]] = 0.95;
        }
    }
    let mut drive = GrayImage::new(1280, 720);
    for y in 374..720 {
        for x in 0..800 {
            drive.put_pixel(x, y, Luma([255]));
        }
    }

    let model = LaneAnalyzer::new(LaneConfig::default()).analyze(prob.view(), 1280, 720, Some(&drive))?;
    let roi = model.roi;
    let at = |fx: u32, fy: u32| model.lane_mask.get_pixel(fx - roi.x, fy - roi.y)[0];
    assert_eq!(at(302, 600), 255);
    assert_eq!(at(1102, 600), 0);
    Ok(())
}
