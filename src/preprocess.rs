//! Grayscale → contrast-normalized → denoised → binarized → closed mask.
//!
//! Every step is a pure function of its input image and the
//! [`PreprocessConfig`] constants, so equal inputs give byte-equal outputs.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::close;
use tracing::debug;

use crate::config::PreprocessConfig;
use crate::error::{M2cError, Result};
use crate::image_loader::PixelBuffer;

/// Intermediate images shared by the detection stages.
#[derive(Debug, Clone)]
pub struct Preprocessed {
    /// Plain luminance of the source.
    pub gray: GrayImage,
    /// Contrast-equalized and denoised luminance.
    pub enhanced: GrayImage,
    /// Binary mask, 255 = foreground (darker than its neighborhood).
    pub mask: GrayImage,
}

pub fn preprocess(buffer: &PixelBuffer, config: &PreprocessConfig) -> Result<Preprocessed> {
    let (w, h) = buffer.dimensions();
    if w == 0 || h == 0 {
        return Err(M2cError::preprocess(format!(
            "image has no pixels ({w}x{h})"
        )));
    }
    if config.clahe_tiles == 0 || config.threshold_block_radius == 0 {
        return Err(M2cError::preprocess(
            "clahe_tiles and threshold_block_radius must be non-zero",
        ));
    }

    let gray = buffer.to_gray();
    let equalized = equalize_local(&gray, config.clahe_tiles, config.clahe_clip_limit);
    let enhanced = denoise_nl_means(
        &equalized,
        config.denoise_strength,
        config.denoise_patch_radius,
        config.denoise_search_radius,
    );
    let binary = adaptive_threshold_inv(
        &enhanced,
        config.threshold_block_radius,
        config.threshold_bias,
    );
    let mask = if config.morph_radius == 0 {
        binary
    } else {
        close(&binary, Norm::LInf, config.morph_radius)
    };

    debug!(
        width = w,
        height = h,
        foreground = foreground_count(&mask),
        "preprocessed image"
    );

    Ok(Preprocessed {
        gray,
        enhanced,
        mask,
    })
}

/// Number of non-zero pixels.
pub fn foreground_count(mask: &GrayImage) -> usize {
    mask.as_raw().iter().filter(|&&v| v != 0).count()
}

/// Contrast-limited adaptive histogram equalization on a `tiles` x `tiles`
/// grid with bilinear blending between neighboring tile mappings.
pub fn equalize_local(gray: &GrayImage, tiles: u32, clip_limit: f32) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return gray.clone();
    }

    let tile_w = w.div_ceil(tiles.clamp(1, w));
    let tile_h = h.div_ceil(tiles.clamp(1, h));
    let tiles_x = w.div_ceil(tile_w);
    let tiles_y = h.div_ceil(tile_h);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(w);
            let y1 = (y0 + tile_h).min(h);
            luts.push(tile_lut(gray, x0, y0, x1, y1, clip_limit));
        }
    }

    let lut_at = |tx: u32, ty: u32| &luts[(ty * tiles_x + tx) as usize];
    let axis = |pos: u32, size: u32, count: u32| -> (u32, u32, f32) {
        let g = (pos as f32 + 0.5) / size as f32 - 0.5;
        if g <= 0.0 {
            return (0, 0, 0.0);
        }
        let lo = (g.floor() as u32).min(count - 1);
        let hi = (lo + 1).min(count - 1);
        (lo, hi, (g - lo as f32).clamp(0.0, 1.0))
    };

    GrayImage::from_fn(w, h, |x, y| {
        let v = gray.get_pixel(x, y).0[0] as usize;
        let (tx0, tx1, ax) = axis(x, tile_w, tiles_x);
        let (ty0, ty1, ay) = axis(y, tile_h, tiles_y);
        let top = lut_at(tx0, ty0)[v] as f32 * (1.0 - ax) + lut_at(tx1, ty0)[v] as f32 * ax;
        let bottom = lut_at(tx0, ty1)[v] as f32 * (1.0 - ax) + lut_at(tx1, ty1)[v] as f32 * ax;
        let value = top * (1.0 - ay) + bottom * ay;
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

fn tile_lut(gray: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, clip_limit: f32) -> [u8; 256] {
    let mut hist = [0u32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[gray.get_pixel(x, y).0[0] as usize] += 1;
        }
    }
    let total = (x1 - x0) * (y1 - y0);
    let mut lut = [0u8; 256];
    if total == 0 {
        for (i, slot) in lut.iter_mut().enumerate() {
            *slot = i as u8;
        }
        return lut;
    }

    let clip = ((clip_limit * total as f32 / 256.0) as u32).max(1);
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }
    let share = excess / 256;
    let remainder = (excess % 256) as usize;
    for (i, bin) in hist.iter_mut().enumerate() {
        *bin += share + u32::from(i < remainder);
    }

    let mut cdf = 0u32;
    for (bin, slot) in hist.iter().zip(lut.iter_mut()) {
        cdf += bin;
        *slot = ((u64::from(cdf) * 255 + u64::from(total) / 2) / u64::from(total)).min(255) as u8;
    }
    lut
}

/// Non-local means: each pixel becomes a weighted mean of pixels in its
/// search window, weighted by the similarity of their surrounding patches.
pub fn denoise_nl_means(
    gray: &GrayImage,
    strength: f32,
    patch_radius: u32,
    search_radius: u32,
) -> GrayImage {
    if strength <= 0.0 || search_radius == 0 {
        return gray.clone();
    }
    let (w, h) = gray.dimensions();
    let (wi, hi) = (w as i64, h as i64);
    let pr = patch_radius as i64;
    let sr = search_radius as i64;
    let raw = gray.as_raw();
    let at = |x: i64, y: i64| -> f32 {
        let cx = x.clamp(0, wi - 1);
        let cy = y.clamp(0, hi - 1);
        raw[(cy * wi + cx) as usize] as f32
    };
    let patch_len = ((2 * pr + 1) * (2 * pr + 1)) as f32;
    let h2 = strength * strength;

    GrayImage::from_fn(w, h, |x, y| {
        let (px, py) = (x as i64, y as i64);
        let mut weight_sum = 0.0f32;
        let mut value_sum = 0.0f32;
        for dy in -sr..=sr {
            for dx in -sr..=sr {
                let (qx, qy) = (px + dx, py + dy);
                if qx < 0 || qy < 0 || qx >= wi || qy >= hi {
                    continue;
                }
                let mut dist = 0.0f32;
                for oy in -pr..=pr {
                    for ox in -pr..=pr {
                        let d = at(px + ox, py + oy) - at(qx + ox, qy + oy);
                        dist += d * d;
                    }
                }
                let weight = (-(dist / patch_len) / h2).exp();
                weight_sum += weight;
                value_sum += weight * at(qx, qy);
            }
        }
        // The center pixel always contributes weight 1, so weight_sum >= 1.
        Luma([(value_sum / weight_sum).round().clamp(0.0, 255.0) as u8])
    })
}

/// Inverted mean-C threshold: 255 where `pixel <= local_mean - bias`.
pub fn adaptive_threshold_inv(gray: &GrayImage, block_radius: u32, bias: i32) -> GrayImage {
    let (w, h) = gray.dimensions();
    let (wu, hu) = (w as usize, h as usize);
    let stride = wu + 1;
    let mut integral = vec![0u64; stride * (hu + 1)];
    for y in 0..hu {
        let mut row_sum = 0u64;
        for x in 0..wu {
            row_sum += u64::from(gray.get_pixel(x as u32, y as u32).0[0]);
            integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row_sum;
        }
    }

    let r = block_radius as usize;
    GrayImage::from_fn(w, h, |x, y| {
        let (x, y) = (x as usize, y as usize);
        let x0 = x.saturating_sub(r);
        let y0 = y.saturating_sub(r);
        let x1 = (x + r + 1).min(wu);
        let y1 = (y + r + 1).min(hu);
        let sum = integral[y1 * stride + x1] + integral[y0 * stride + x0]
            - integral[y0 * stride + x1]
            - integral[y1 * stride + x0];
        let count = ((x1 - x0) * (y1 - y0)) as f64;
        let mean = (sum as f64 / count).round() as i32;
        let pixel = i32::from(gray.get_pixel(x as u32, y as u32).0[0]);
        Luma([if pixel <= mean - bias { 255 } else { 0 }])
    })
}
