//! Gaussian drop-shadow generation: a presummed, opacity-quantized lookup
//! table built once at startup and sampled per window size/opacity pair
//! thereafter.
//!
//! A direct port of `make_gaussian_map`/`sum_gaussian`/`presum_gaussian`/
//! `make_shadow` (`examples/original_source/commoner.c:622-812`). The
//! algorithm is inherently a flat-array numerical kernel with no Wayland- or
//! GL-specific counterpart to draw on, so the Rust idiom applied here is
//! standard: `Vec<f64>`/`Vec<u8>` in place of the original's raw `malloc`'d
//! buffers, with the same indexing arithmetic.

use std::f64::consts::PI;

/// Number of discrete opacity levels the presummed tables are quantized to
/// (indices `0..=24` are fractional steps of `opacity_int`, index 25 is the
/// fully-opaque reference used to derive the others).
const OPACITY_LEVELS: usize = 25;

pub struct GaussianMap {
    size: usize,
    data: Vec<f64>,
}

fn gaussian(r: f64, x: f64, y: f64) -> f64 {
    (1.0 / (2.0 * PI * r * r).sqrt()) * (-(x * x + y * y) / (2.0 * r * r)).exp()
}

impl GaussianMap {
    /// `r` is the shadow blur radius; `size` grows with it so the kernel
    /// tail is captured, matching `((ceil(r*3)+1) & ~1)` from the original.
    pub fn new(r: f64) -> Self {
        let size = (((r * 3.0).ceil() as i64 + 1) & !1) as usize;
        let center = (size / 2) as f64;
        let mut data = vec![0.0; size * size];
        let mut total = 0.0;
        for y in 0..size {
            for x in 0..size {
                let g = gaussian(r, x as f64 - center, y as f64 - center);
                total += g;
                data[y * size + x] = g;
            }
        }
        for v in data.iter_mut() {
            *v /= total;
        }
        GaussianMap { size, data }
    }

    /// Integrates the kernel over the window-shaped region offset by
    /// `(x, y)`, i.e. the blurred alpha value of the shadow at that offset
    /// from the window's corner, scaled by `opacity` into a byte.
    fn sum(&self, opacity: f64, x: i32, y: i32, width: i32, height: i32) -> u8 {
        let g_size = self.size as i32;
        let center = g_size / 2;

        let fx_start = (center - x).max(0);
        let fx_end = (width + center - x).min(g_size);
        let fy_start = (center - y).max(0);
        let fy_end = (height + center - y).min(g_size);

        let mut v = 0.0;
        for fy in fy_start..fy_end {
            let row = &self.data[(fy * g_size) as usize..((fy + 1) * g_size) as usize];
            for fx in fx_start..fx_end {
                v += row[fx as usize];
            }
        }
        if v > 1.0 {
            v = 1.0;
        }
        (v * opacity * 255.0) as u8
    }
}

/// The presummed corner/top tables built once from a [`GaussianMap`] and
/// reused for every shadow the compositor draws, quantized across
/// [`OPACITY_LEVELS`] discrete opacity steps.
pub struct ShadowTables {
    gsize: usize,
    /// `(gsize+1) * (gsize+1) * 26` flat array: `[opacity][y][x]`.
    corner: Vec<u8>,
    /// `(gsize+1) * 26` flat array: `[opacity][x]`.
    top: Vec<u8>,
}

impl ShadowTables {
    pub fn build(map: &GaussianMap) -> Self {
        let gsize = map.size;
        let dim = gsize + 1;
        let mut corner = vec![0u8; dim * dim * (OPACITY_LEVELS + 1)];
        let mut top = vec![0u8; dim * (OPACITY_LEVELS + 1)];
        let center = (gsize / 2) as i32;

        for x in 0..=gsize {
            let full = map.sum(1.0, x as i32 - center, center, gsize as i32 * 2, gsize as i32 * 2);
            top[OPACITY_LEVELS * dim + x] = full;
            for opacity in 0..OPACITY_LEVELS {
                top[opacity * dim + x] = (full as usize * opacity / OPACITY_LEVELS) as u8;
            }

            for y in 0..=x {
                let full = map.sum(1.0, x as i32 - center, y as i32 - center, gsize as i32 * 2, gsize as i32 * 2);
                corner[OPACITY_LEVELS * dim * dim + y * dim + x] = full;
                corner[OPACITY_LEVELS * dim * dim + x * dim + y] = full;
                for opacity in 0..OPACITY_LEVELS {
                    let scaled = (full as usize * opacity / OPACITY_LEVELS) as u8;
                    corner[opacity * dim * dim + y * dim + x] = scaled;
                    corner[opacity * dim * dim + x * dim + y] = scaled;
                }
            }
        }

        ShadowTables { gsize, corner, top }
    }

    fn dim(&self) -> usize {
        self.gsize + 1
    }
}

/// An 8-bit alpha-only shadow image ready to upload as a `GL_R8` texture.
pub struct ShadowImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Builds the alpha mask for a `width x height` window shadow at the given
/// `opacity` (`0.0..=1.0`), using the presummed tables when the requested
/// size matches the table's blur radius and falling back to direct Gaussian
/// summation otherwise. Port of `make_shadow`
/// (`examples/original_source/commoner.c:774-847`).
pub fn make_shadow(map: &GaussianMap, tables: &ShadowTables, opacity: f64, width: u32, height: u32) -> ShadowImage {
    let gsize = tables.gsize as i32;
    let dim = tables.dim();
    let swidth = width as i32 + gsize;
    let sheight = height as i32 + gsize;
    let center = gsize / 2;
    let opacity_int = (opacity * OPACITY_LEVELS as f64) as usize;

    let mut data = vec![0u8; (swidth * sheight) as usize];

    let edge = if gsize > 0 {
        tables.top[opacity_int * dim + gsize as usize]
    } else {
        map.sum(opacity, center, center, width as i32, height as i32)
    };
    data.fill(edge);

    let ylimit = gsize.min((sheight + 1) / 2);
    let xlimit = gsize.min((swidth + 1) / 2);

    for y in 0..ylimit {
        for x in 0..xlimit {
            let d = if xlimit == gsize && ylimit == gsize {
                tables.corner[opacity_int * dim * dim + y as usize * dim + x as usize]
            } else {
                map.sum(opacity, x - center, y - center, width as i32, height as i32)
            };
            set4(&mut data, swidth, sheight, x, y, d);
        }
    }

    let x_diff = swidth - gsize * 2;
    if x_diff > 0 && ylimit > 0 {
        for y in 0..ylimit {
            let d = if ylimit == gsize {
                tables.top[opacity_int * dim + y as usize]
            } else {
                map.sum(opacity, center, y - center, width as i32, height as i32)
            };
            let row_start = (y * swidth + gsize) as usize;
            data[row_start..row_start + x_diff as usize].fill(d);
            let row_start = ((sheight - y - 1) * swidth + gsize) as usize;
            data[row_start..row_start + x_diff as usize].fill(d);
        }
    }

    for x in 0..xlimit {
        let d = if xlimit == gsize {
            tables.top[opacity_int * dim + x as usize]
        } else {
            map.sum(opacity, x - center, center, width as i32, height as i32)
        };
        for y in gsize..(sheight - gsize) {
            data[(y * swidth + x) as usize] = d;
            data[(y * swidth + (swidth - x - 1)) as usize] = d;
        }
    }

    ShadowImage {
        width: swidth as u32,
        height: sheight as u32,
        data,
    }
}

fn set4(data: &mut [u8], swidth: i32, sheight: i32, x: i32, y: i32, d: u8) {
    data[(y * swidth + x) as usize] = d;
    data[((sheight - y - 1) * swidth + x) as usize] = d;
    data[((sheight - y - 1) * swidth + (swidth - x - 1)) as usize] = d;
    data[(y * swidth + (swidth - x - 1)) as usize] = d;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaussian_map_normalizes_to_unit_sum() {
        let map = GaussianMap::new(12.0);
        let sum: f64 = map.data.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn shadow_image_is_larger_than_window_by_kernel_size() {
        let map = GaussianMap::new(12.0);
        let tables = ShadowTables::build(&map);
        let img = make_shadow(&map, &tables, 0.75, 100, 50);
        assert_eq!(img.width, 100 + map.size as u32);
        assert_eq!(img.height, 50 + map.size as u32);
    }

    #[test]
    fn fully_transparent_shadow_is_all_zero() {
        let map = GaussianMap::new(12.0);
        let tables = ShadowTables::build(&map);
        let img = make_shadow(&map, &tables, 0.0, 40, 40);
        assert!(img.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn higher_opacity_never_produces_a_darker_shadow_at_the_center() {
        let map = GaussianMap::new(12.0);
        let tables = ShadowTables::build(&map);
        let dim = map.size / 2;
        let low = make_shadow(&map, &tables, 0.25, 60, 60);
        let high = make_shadow(&map, &tables, 0.9, 60, 60);
        let idx = (dim * low.width as usize) + dim;
        assert!(high.data[idx] >= low.data[idx]);
    }
}
