use anyhow::{bail, Result};

use super::{sample_index, Sample, Transformation};
use crate::frame::{sample_count, Frame, MemoryLayout, PixelBuffer, CHANNELS};

/// Resize to a fixed `height` x `width`.
///
/// Growing pads with zeros around the image (odd pixel on the bottom/right); shrinking
/// resamples with area averaging. Growing one dimension while shrinking the other is
/// rejected before the frame is touched.
#[derive(Clone, Copy, Debug)]
pub struct Resize {
    height: u32,
    width: u32,
}

impl Resize {
    pub fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }
}

impl Transformation for Resize {
    fn name(&self) -> &'static str {
        "resize"
    }

    fn apply(&self, frame: &mut Frame) -> Result<()> {
        let (src_h, src_w) = (frame.height(), frame.width());
        let (dst_h, dst_w) = (self.height, self.width);

        let mixed = (dst_h > src_h && dst_w < src_w) || (dst_h < src_h && dst_w > src_w);
        if mixed {
            bail!(
                "cannot resize {}x{} to {}x{}: one dimension grows while the other shrinks",
                src_h,
                src_w,
                dst_h,
                dst_w
            );
        }
        if dst_h == src_h && dst_w == src_w {
            return Ok(());
        }

        let grow = dst_h >= src_h && dst_w >= src_w;
        if !grow && (dst_h == 0 || dst_w == 0) {
            bail!("cannot resize {}x{} to an empty frame", src_h, src_w);
        }

        let geometry = Geometry {
            layout: frame.layout(),
            src_w: src_w as usize,
            src_h: src_h as usize,
            dst_w: dst_w as usize,
            dst_h: dst_h as usize,
        };
        let resized = match frame.buffer() {
            PixelBuffer::U8(data) if grow => PixelBuffer::U8(pad(data, &geometry)?),
            PixelBuffer::U8(data) => PixelBuffer::U8(area(data, &geometry)?),
            PixelBuffer::F32(data) if grow => PixelBuffer::F32(pad(data, &geometry)?),
            PixelBuffer::F32(data) => PixelBuffer::F32(area(data, &geometry)?),
        };
        frame.replace_buffer(resized, dst_w, dst_h)
    }
}

struct Geometry {
    layout: MemoryLayout,
    src_w: usize,
    src_h: usize,
    dst_w: usize,
    dst_h: usize,
}

/// Zero-pad symmetrically. `top = Δh / 2`, the remainder goes to the bottom; same for
/// left/right.
fn pad<T: Sample>(src: &[T], g: &Geometry) -> Result<Vec<T>> {
    let mut out = vec![T::default(); sample_count(g.dst_w as u32, g.dst_h as u32)?];
    let top = (g.dst_h - g.src_h) / 2;
    let left = (g.dst_w - g.src_w) / 2;

    for c in 0..CHANNELS {
        for y in 0..g.src_h {
            for x in 0..g.src_w {
                let from = sample_index(g.layout, g.src_w, g.src_h, c, y, x);
                let to = sample_index(g.layout, g.dst_w, g.dst_h, c, y + top, x + left);
                out[to] = src[from];
            }
        }
    }
    Ok(out)
}

/// Area-averaging downsample: each destination sample is the coverage-weighted mean of
/// the source samples under its footprint.
fn area<T: Sample>(src: &[T], g: &Geometry) -> Result<Vec<T>> {
    let mut out = vec![T::default(); sample_count(g.dst_w as u32, g.dst_h as u32)?];
    let rows = area_weights(g.src_h, g.dst_h);
    let cols = area_weights(g.src_w, g.dst_w);

    for c in 0..CHANNELS {
        for (dy, row) in rows.iter().enumerate() {
            for (dx, col) in cols.iter().enumerate() {
                let mut acc = 0.0f32;
                for &(sy, wy) in row {
                    for &(sx, wx) in col {
                        let idx = sample_index(g.layout, g.src_w, g.src_h, c, sy, sx);
                        acc += wy * wx * src[idx].to_f32();
                    }
                }
                out[sample_index(g.layout, g.dst_w, g.dst_h, c, dy, dx)] = T::from_f32(acc);
            }
        }
    }
    Ok(out)
}

/// For every destination index, the source indices it covers and their normalized
/// weights (summing to 1). Requires `dst_len <= src_len`.
fn area_weights(src_len: usize, dst_len: usize) -> Vec<Vec<(usize, f32)>> {
    let scale = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|i| {
            let start = i as f64 * scale;
            let end = start + scale;
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(src_len);
            (first..last)
                .filter_map(|j| {
                    let covered = end.min(j as f64 + 1.0) - start.max(j as f64);
                    (covered > 1e-9).then(|| (j, (covered / scale) as f32))
                })
                .collect()
        })
        .collect()
}
