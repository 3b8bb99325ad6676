use image::{GrayImage, Luma};
use ndarray::{Array2, ArrayViewD, Axis, Ix3};

use crate::{Result, SegmentError, FOREGROUND};

/// Softmax probability of class 1 for two-class logits `[1, 2, H, W]`
/// (or `[2, H, W]`). Output is `(H, W)`.
pub fn probability_map(seg: ArrayViewD<'_, f32>) -> Result<Array2<f32>> {
    let shape = seg.shape().to_vec();
    let seg = match seg.ndim() {
        4 if shape[0] == 1 => seg.index_axis_move(Axis(0), 0),
        3 => seg,
        _ => return Err(SegmentError::InvalidShape(shape)),
    };
    let seg = seg
        .into_dimensionality::<Ix3>()
        .map_err(|_| SegmentError::InvalidShape(shape.clone()))?;
    if seg.shape()[0] != 2 || seg.shape()[1] == 0 || seg.shape()[2] == 0 {
        return Err(SegmentError::InvalidShape(shape));
    }

    let bg = seg.index_axis(Axis(0), 0);
    let fg = seg.index_axis(Axis(0), 1);
    let mut prob = Array2::<f32>::zeros(bg.raw_dim());
    ndarray::Zip::from(&mut prob).and(&bg).and(&fg).for_each(|p, &a, &b| {
        let m = a.max(b);
        let ea = (a - m).exp();
        let eb = (b - m).exp();
        *p = eb / (ea + eb);
    });
    Ok(prob)
}

/// `p >= threshold` → 255, else 0.
pub fn mask_from_probability(prob: &Array2<f32>, threshold: f32) -> GrayImage {
    let (h, w) = prob.dim();
    GrayImage::from_fn(w as u32, h as u32, |x, y| {
        if prob[[y as usize, x as usize]] >= threshold {
            Luma([FOREGROUND])
        } else {
            Luma([0])
        }
    })
}

/// Zero the top `ratio` fraction of rows (sky / horizon).
pub fn cut_top(mask: &mut GrayImage, ratio: f32) {
    let h = mask.height();
    let rows = ((h as f32 * ratio.clamp(0.0, 1.0)) as u32).min(h);
    for y in 0..rows {
        for x in 0..mask.width() {
            mask.put_pixel(x, y, Luma([0]));
        }
    }
}

/// Logits → thresholded mask with the top strip removed (model resolution).
pub fn mask_from_logits(seg: ArrayViewD<'_, f32>, threshold: f32, top_cut_ratio: f32) -> Result<GrayImage> {
    let prob = probability_map(seg)?;
    let mut mask = mask_from_probability(&prob, threshold);
    cut_top(&mut mask, top_cut_ratio);
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;

    #[test]
    fn softmax_matches_closed_form() {
        let mut seg = Array4::<f32>::zeros((1, 2, 1, 3));
        seg[[0, 0, 0, 0]] = 0.0;
        seg[[0, 1, 0, 0]] = 0.0;
        seg[[0, 0, 0, 1]] = 1.0;
        seg[[0, 1, 0, 1]] = 3.0;
        seg[[0, 0, 0, 2]] = 1000.0; // large logits must not overflow
        seg[[0, 1, 0, 2]] = 990.0;

        let p = probability_map(seg.view().into_dyn()).unwrap();
        assert!((p[[0, 0]] - 0.5).abs() < 1e-6);
        let expected = 1.0 / (1.0 + (-2.0f32).exp());
        assert!((p[[0, 1]] - expected).abs() < 1e-6);
        assert!(p[[0, 2]].is_finite() && p[[0, 2]] < 1e-4);
    }

    #[test]
    fn threshold_is_inclusive() {
        let prob = ndarray::arr2(&[[0.5f32, 0.49, 0.9]]);
        let m = mask_from_probability(&prob, 0.5);
        assert_eq!(m.as_raw(), &vec![255, 0, 255]);
    }

    #[test]
    fn top_strip_is_removed() {
        let mut seg = Array4::<f32>::zeros((1, 2, 10, 4));
        seg.index_axis_mut(Axis(1), 1).fill(5.0);
        let mask = mask_from_logits(seg.view().into_dyn(), 0.5, 0.3).unwrap();
        for y in 0..10 {
            let expected = if y < 3 { 0 } else { 255 };
            assert_eq!(mask.get_pixel(2, y)[0], expected, "row {y}");
        }
    }

    #[test]
    fn wrong_channel_count_is_rejected() {
        let seg = Array4::<f32>::zeros((1, 3, 4, 4));
        assert!(matches!(
            probability_map(seg.view().into_dyn()),
            Err(SegmentError::InvalidShape(_))
        ));
        let flat = ndarray::Array2::<f32>::zeros((4, 4));
        assert!(probability_map(flat.view().into_dyn()).is_err());
    }
}
