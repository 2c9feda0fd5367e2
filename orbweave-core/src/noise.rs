//! Seeded 3D gradient noise.
//!
//! Classic lattice Perlin noise: a permutation table shuffled from a 64-bit seed,
//! quintic fade, twelve edge gradients. [`Perlin::sample`] is remapped to `[0, 1]`,
//! [`Perlin::signed`] keeps the raw `[-1, 1]` range.
//!
//! Same seed and same input always give the same value; the field is C2 continuous.

use core::fmt;

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::math::{clamp01, floor, lerp};

/// Perlin noise generator. Construct once per blob; sampling is read-only.
#[derive(Clone, PartialEq, Eq)]
pub struct Perlin {
    perm: [u8; 512],
    seed: u64,
}

impl fmt::Debug for Perlin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Perlin").field("seed", &self.seed).finish_non_exhaustive()
    }
}

impl Perlin {
    pub fn new(seed: u64) -> Self {
        let mut table: [u8; 256] = core::array::from_fn(|i| i as u8);
        let mut rng = StdRng::seed_from_u64(seed);
        table.shuffle(&mut rng);

        let mut perm = [0u8; 512];
        for (i, p) in perm.iter_mut().enumerate() {
            *p = table[i & 255];
        }
        Self { perm, seed }
    }

    /// Seed from a blob's unit-interval seed. Bit pattern, so distinct floats never collide.
    pub fn from_unit_seed(seed: f32) -> Self {
        Self::new(u64::from(seed.to_bits()))
    }

    #[inline]
    pub fn seed(&self) -> u64 { self.seed }

    /// Raw noise in roughly `[-1, 1]`. Zero on every integer lattice point.
    pub fn signed(&self, x: f32, y: f32, z: f32) -> f32 {
        let (xf, yf, zf) = (floor(x), floor(y), floor(z));
        let xi = (xf as i32 & 255) as usize;
        let yi = (yf as i32 & 255) as usize;
        let zi = (zf as i32 & 255) as usize;

        let (x, y, z) = (x - xf, y - yf, z - zf);
        let (u, v, w) = (fade(x), fade(y), fade(z));

        let p = &self.perm;
        let a = p[xi] as usize + yi;
        let aa = p[a] as usize + zi;
        let ab = p[a + 1] as usize + zi;
        let b = p[xi + 1] as usize + yi;
        let ba = p[b] as usize + zi;
        let bb = p[b + 1] as usize + zi;

        let near = mix(
            v,
            mix(u, grad(p[aa], x, y, z), grad(p[ba], x - 1.0, y, z)),
            mix(u, grad(p[ab], x, y - 1.0, z), grad(p[bb], x - 1.0, y - 1.0, z)),
        );
        let far = mix(
            v,
            mix(u, grad(p[aa + 1], x, y, z - 1.0), grad(p[ba + 1], x - 1.0, y, z - 1.0)),
            mix(
                u,
                grad(p[ab + 1], x, y - 1.0, z - 1.0),
                grad(p[bb + 1], x - 1.0, y - 1.0, z - 1.0),
            ),
        );
        mix(w, near, far)
    }

    /// Noise remapped to `[0, 1]`. Non-finite input yields 0.
    #[inline]
    pub fn sample(&self, x: f32, y: f32, z: f32) -> f32 {
        clamp01((self.signed(x, y, z) + 1.0) * 0.5)
    }

    /// Fractal sum of `octaves` layers, normalized back to `[0, 1]`.
    pub fn fbm(&self, x: f32, y: f32, z: f32, octaves: u32, persistence: f32, lacunarity: f32) -> f32 {
        let mut total = 0.0;
        let mut norm = 0.0;
        let mut amp = 1.0;
        let mut freq = 1.0;
        for _ in 0..octaves.max(1) {
            total += self.signed(x * freq, y * freq, z * freq) * amp;
            norm += amp;
            amp *= persistence;
            freq *= lacunarity;
        }
        if norm <= 0.0 {
            return 0.5;
        }
        clamp01((total / norm + 1.0) * 0.5)
    }
}

/// Interpolation with the weight first, the way the lattice reads.
#[inline]
fn mix(t: f32, a: f32, b: f32) -> f32 {
    lerp(a, b, t)
}

#[inline]
fn fade(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn grad(hash: u8, x: f32, y: f32, z: f32) -> f32 {
    let h = hash & 15;
    let u = if h < 8 { x } else { y };
    let v = if h < 4 {
        y
    } else if h == 12 || h == 14 {
        x
    } else {
        z
    };
    (if h & 1 == 0 { u } else { -u }) + (if h & 2 == 0 { v } else { -v })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_field() {
        let a = Perlin::new(42);
        let b = Perlin::new(42);
        for i in 0..200 {
            let t = i as f32 * 0.173;
            assert_eq!(a.sample(t, t * 0.5, 1.3 - t), b.sample(t, t * 0.5, 1.3 - t));
        }
    }

    #[test]
    fn different_seeds_differ() {
        let a = Perlin::new(1);
        let b = Perlin::new(2);
        let differs = (0..100).any(|i| {
            let t = i as f32 * 0.31 + 0.1;
            (a.sample(t, 0.7, t * 0.2) - b.sample(t, 0.7, t * 0.2)).abs() > 1e-3
        });
        assert!(differs);
    }

    #[test]
    fn output_stays_in_unit_range() {
        let n = Perlin::from_unit_seed(0.37);
        for i in -50..50 {
            for j in -10..10 {
                let v = n.sample(i as f32 * 0.37, j as f32 * 0.91, (i + j) as f32 * 0.13);
                assert!((0.0..=1.0).contains(&v), "v={v}");
            }
        }
        assert_eq!(n.sample(f32::NAN, 0.0, 0.0), 0.0);
    }

    #[test]
    fn lattice_points_are_midpoint() {
        let n = Perlin::new(7);
        assert!((n.sample(3.0, -2.0, 5.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn field_is_continuous() {
        let n = Perlin::new(9);
        let h = 1.0e-3;
        for i in 0..500 {
            let x = i as f32 * 0.0571;
            let d = (n.sample(x + h, 0.4, 1.7) - n.sample(x, 0.4, 1.7)).abs();
            assert!(d < 0.01, "jump {d} at x={x}");
        }
    }

    #[test]
    fn fbm_is_bounded() {
        let n = Perlin::new(11);
        for i in 0..100 {
            let v = n.fbm(i as f32 * 0.21, 0.3, 0.9, 4, 0.5, 2.0);
            assert!((0.0..=1.0).contains(&v));
        }
    }
}
