//! Binary mask morphology on 0/255 masks.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{close, dilate, erode, open};
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::{Result, SegmentError, FOREGROUND};

/// Odd kernel side → imageproc radius. Sides below 3 disable the operation.
fn radius_for(side: u32) -> Option<u8> {
    if side < 3 {
        return None;
    }
    let side = if side % 2 == 1 { side } else { side + 1 };
    Some((side / 2).min(u8::MAX as u32) as u8)
}

fn check_same_size(a: &GrayImage, b: &GrayImage) -> Result<()> {
    if a.dimensions() != b.dimensions() {
        return Err(SegmentError::SizeMismatch {
            expected: a.dimensions(),
            got: b.dimensions(),
        });
    }
    Ok(())
}

/// Pixel-wise AND of two masks of the same size.
pub fn and(a: &GrayImage, b: &GrayImage) -> Result<GrayImage> {
    check_same_size(a, b)?;
    Ok(GrayImage::from_fn(a.width(), a.height(), |x, y| {
        if a.get_pixel(x, y)[0] > 0 && b.get_pixel(x, y)[0] > 0 {
            Luma([FOREGROUND])
        } else {
            Luma([0])
        }
    }))
}

/// Keep lane pixels only inside the (disk-dilated) drivable area.
pub fn gate_by_drivable(lane: &GrayImage, drivable: &GrayImage, dilate_radius: u8) -> Result<GrayImage> {
    check_same_size(lane, drivable)?;
    if dilate_radius == 0 {
        return and(lane, drivable);
    }
    let grown = dilate(drivable, Norm::L2, dilate_radius);
    and(lane, &grown)
}

/// Shrink a mask with a square kernel of side `side`.
pub fn erode_square(mask: &GrayImage, side: u32) -> GrayImage {
    match radius_for(side) {
        Some(k) => erode(mask, Norm::LInf, k),
        None => mask.clone(),
    }
}

/// Open (speckle removal) then close (gap bridging) with square kernels.
pub fn open_close(mask: &GrayImage, open_side: u32, close_side: u32) -> GrayImage {
    let opened = match radius_for(open_side) {
        Some(k) => open(mask, Norm::LInf, k),
        None => mask.clone(),
    };
    match radius_for(close_side) {
        Some(k) => close(&opened, Norm::LInf, k),
        None => opened,
    }
}

/// Drop 8-connected foreground components smaller than `min_area` pixels.
pub fn remove_small_components(mask: &GrayImage, min_area: u32) -> GrayImage {
    if min_area <= 1 {
        return mask.clone();
    }
    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));

    let mut areas: Vec<u32> = Vec::new();
    for p in labels.pixels() {
        let l = p[0] as usize;
        if l == 0 {
            continue;
        }
        if areas.len() <= l {
            areas.resize(l + 1, 0);
        }
        areas[l] += 1;
    }

    let dropped = areas.iter().skip(1).filter(|&&a| a > 0 && a < min_area).count();
    log::trace!("components: {} total, {} below {} px", areas.len().saturating_sub(1), dropped, min_area);

    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        let l = labels.get_pixel(x, y)[0] as usize;
        if l != 0 && areas[l] >= min_area {
            Luma([FOREGROUND])
        } else {
            Luma([0])
        }
    })
}
