use image::imageops::{self, FilterType};
use image::{GrayImage, ImageBuffer, Luma};
use lanewatch_preprocess::Letterbox;
use ndarray::Array2;

use crate::{Result, SegmentError};

fn check_model_size(got: (u32, u32), lb: &Letterbox) -> Result<()> {
    if got != (lb.size, lb.size) {
        return Err(SegmentError::SizeMismatch {
            expected: (lb.size, lb.size),
            got,
        });
    }
    Ok(())
}

/// Crop the non-padded part of a model-space mask and resample it to the
/// original frame size with nearest-neighbour (masks are categorical).
pub fn unletterbox_mask(mask: &GrayImage, lb: &Letterbox) -> Result<GrayImage> {
    check_model_size(mask.dimensions(), lb)?;
    let (vx, vy, vw, vh) = lb.valid_rect();
    let (ow, oh) = (lb.orig_w, lb.orig_h);
    if vw == 0 || vh == 0 {
        return Ok(GrayImage::new(ow, oh));
    }

    // src = floor(dst · src_len / dst_len), the usual nearest mapping
    let xs: Vec<u32> = (0..ow)
        .map(|x| vx + ((x as u64 * vw as u64 / ow as u64) as u32).min(vw - 1))
        .collect();
    let ys: Vec<u32> = (0..oh)
        .map(|y| vy + ((y as u64 * vh as u64 / oh as u64) as u32).min(vh - 1))
        .collect();

    Ok(GrayImage::from_fn(ow, oh, |x, y| *mask.get_pixel(xs[x as usize], ys[y as usize])))
}

/// Same crop as [`unletterbox_mask`] for a probability map, resampled
/// bilinearly. Input and output are `(H, W)`.
pub fn unletterbox_prob(prob: &Array2<f32>, lb: &Letterbox) -> Result<Array2<f32>> {
    let (h, w) = prob.dim();
    check_model_size((w as u32, h as u32), lb)?;
    let (vx, vy, vw, vh) = lb.valid_rect();
    let (ow, oh) = (lb.orig_w, lb.orig_h);
    if vw == 0 || vh == 0 {
        return Ok(Array2::zeros((oh as usize, ow as usize)));
    }

    let cropped: ImageBuffer<Luma<f32>, Vec<f32>> = ImageBuffer::from_fn(vw, vh, |x, y| {
        Luma([prob[[(vy + y) as usize, (vx + x) as usize]]])
    });
    let resized = imageops::resize(&cropped, ow, oh, FilterType::Triangle);

    Ok(Array2::from_shape_fn((oh as usize, ow as usize), |(y, x)| {
        resized.get_pixel(x as u32, y as u32)[0].clamp(0.0, 1.0)
    }))
}
