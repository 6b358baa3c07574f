use crate::seed::Seed;

/// Improved Perlin noise over a 256-entry permutation, normalised to `[0, 1]`.
///
/// A pure function of the permutation and the sample point. Lattice cells are
/// found with `floor`, so the field is continuous across zero.
#[derive(Debug, Clone)]
pub struct NoiseField {
    p: [u8; 512],
}

impl NoiseField {
    pub fn new(seed: &Seed) -> Self {
        let perm = seed.permutation();
        Self {
            p: std::array::from_fn(|i| perm[i & 0xff]),
        }
    }

    pub fn sample(&self, x: f64, y: f64, z: f64) -> f64 {
        let (xi, xf) = lattice(x);
        let (yi, yf) = lattice(y);
        let (zi, zf) = lattice(z);

        let u = fade(xf);
        let v = fade(yf);
        let w = fade(zf);

        let p = |i: usize| self.p[i] as usize;
        let a = p(xi) + yi;
        let b = p(xi + 1) + yi;
        let aa = p(a) + zi;
        let ab = p(a + 1) + zi;
        let ba = p(b) + zi;
        let bb = p(b + 1) + zi;

        let x1 = lerp(grad(p(aa), xf, yf, zf), grad(p(ba), xf - 1.0, yf, zf), u);
        let x2 = lerp(
            grad(p(ab), xf, yf - 1.0, zf),
            grad(p(bb), xf - 1.0, yf - 1.0, zf),
            u,
        );
        let y1 = lerp(x1, x2, v);

        let x1 = lerp(
            grad(p(aa + 1), xf, yf, zf - 1.0),
            grad(p(ba + 1), xf - 1.0, yf, zf - 1.0),
            u,
        );
        let x2 = lerp(
            grad(p(ab + 1), xf, yf - 1.0, zf - 1.0),
            grad(p(bb + 1), xf - 1.0, yf - 1.0, zf - 1.0),
            u,
        );
        let y2 = lerp(x1, x2, v);

        ((lerp(y1, y2, w) + 1.0) / 2.0).clamp(0.0, 1.0)
    }
}

fn lattice(t: f64) -> (usize, f64) {
    let floor = t.floor();
    ((floor as i64 & 0xff) as usize, t - floor)
}

fn grad(hash: usize, x: f64, y: f64, z: f64) -> f64 {
    match hash & 0xf {
        0x0 => x + y,
        0x1 => -x + y,
        0x2 => x - y,
        0x3 => -x - y,
        0x4 => x + z,
        0x5 => -x + z,
        0x6 => x - z,
        0x7 => -x - z,
        0x8 => y + z,
        0x9 => -y + z,
        0xa => y - z,
        0xb => -y - z,
        0xc => y + x,
        0xd => -y + z,
        0xe => y - x,
        _ => -y - z,
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + t * (b - a)
}

// 6t^5 - 15t^4 + 10t^3
fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn lattice_points_are_midpoint() {
        let field = NoiseField::new(&Seed::new(2));
        for (x, y) in [(0.0, 0.0), (3.0, -7.0), (-128.0, 255.0)] {
            assert!((field.sample(x, y, 0.0) - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn deterministic_per_seed() {
        let a = NoiseField::new(&Seed::new(5));
        let b = NoiseField::new(&Seed::new(5));
        assert_eq!(a.sample(1.3, -2.7, 0.0), b.sample(1.3, -2.7, 0.0));
    }

    #[test]
    fn continuous_across_zero() {
        let field = NoiseField::new(&Seed::new(2));
        let left = field.sample(-1e-9, 0.3, 0.0);
        let right = field.sample(1e-9, 0.3, 0.0);
        assert!((left - right).abs() < 1e-6);
    }

    #[test]
    fn field_varies() {
        let field = NoiseField::new(&Seed::new(2));
        let samples: Vec<f64> = (0..64).map(|i| field.sample(i as f64 * 0.37, 0.5, 0.0)).collect();
        let min = samples.iter().copied().fold(f64::MAX, f64::min);
        let max = samples.iter().copied().fold(f64::MIN, f64::max);
        assert!(max - min > 0.1);
    }

    proptest! {
        #[test]
        fn samples_stay_in_unit_range(x in -1.0e6f64..1.0e6, y in -1.0e6f64..1.0e6, z in -10.0f64..10.0) {
            let field = NoiseField::new(&Seed::new(11));
            let n = field.sample(x, y, z);
            prop_assert!((0.0..=1.0).contains(&n));
        }
    }
}
