/// Seeded 3D simplex noise plus integer white noise.
///
/// Immutable after construction, so one instance is shared by every
/// generation job without locking.
#[derive(Clone)]
pub struct Noise {
    seed: u64,
    /// Permutation table (doubled for wrapping).
    perm: [u8; 512],
}

/// One term of a weighted octave sum.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Octave {
    pub frequency: f64,
    pub weight: f64,
}

impl Octave {
    pub const fn new(frequency: f64, weight: f64) -> Self {
        Self { frequency, weight }
    }
}

impl std::fmt::Debug for Noise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Noise").field("seed", &self.seed).finish()
    }
}

impl Noise {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            perm: build_permutation(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Simplex noise sampled at `(x, y, z) * frequency`. Returns a value in [-1, 1].
    pub fn noise(&self, x: f64, y: f64, z: f64, frequency: f64) -> f64 {
        self.simplex3d(x * frequency, y * frequency, z * frequency)
            .clamp(-1.0, 1.0)
    }

    /// 2D field over `(x, z)`. Each field samples its own `plane` of the 3D noise.
    pub fn noise2(&self, x: f64, z: f64, plane: f64, frequency: f64) -> f64 {
        self.noise(x, plane / frequency, z, frequency)
    }

    /// Weighted octave sum of a 2D field. Not normalised; weights should sum to ~1.
    pub fn octaves2(&self, x: f64, z: f64, plane: f64, octaves: &[Octave]) -> f64 {
        octaves
            .iter()
            .enumerate()
            .map(|(i, o)| o.weight * self.noise2(x, z, plane + i as f64 * 17.0, o.frequency))
            .sum()
    }

    /// Weighted octave sum of the 3D field, offset by `offset` on every axis.
    pub fn octaves3(&self, x: f64, y: f64, z: f64, offset: f64, octaves: &[Octave]) -> f64 {
        octaves
            .iter()
            .map(|o| o.weight * self.noise(x + offset, y + offset, z + offset, o.frequency))
            .sum()
    }

    /// Integer hash noise in [-1, 1]. Adjacent integer coordinates are uncorrelated.
    pub fn white_noise(&self, x: i32, y: i32, z: i32) -> f64 {
        self.white_noise_salted(x, y, z, 0)
    }

    /// White noise decorrelated from other decisions at the same coordinate by `salt`.
    pub fn white_noise_salted(&self, x: i32, y: i32, z: i32, salt: u32) -> f64 {
        let folded = (self.seed ^ (self.seed >> 32)) as u32;
        let h = hash3(x, y, z, (folded ^ salt).wrapping_add(0x9E37_79B9));
        ((h & 0x00FF_FFFF) as f64 / 16_777_215.0) * 2.0 - 1.0
    }

    /// White noise remapped to [0, 1].
    pub fn white_noise01(&self, x: i32, y: i32, z: i32, salt: u32) -> f64 {
        (self.white_noise_salted(x, y, z, salt) + 1.0) * 0.5
    }

    fn simplex3d(&self, x: f64, y: f64, z: f64) -> f64 {
        const F3: f64 = 1.0 / 3.0;
        const G3: f64 = 1.0 / 6.0;

        let s = (x + y + z) * F3;
        let i = (x + s).floor();
        let j = (y + s).floor();
        let k = (z + s).floor();

        let t = (i + j + k) * G3;
        let x0 = x - (i - t);
        let y0 = y - (j - t);
        let z0 = z - (k - t);

        // Which simplex of the skewed cube we are in.
        let (i1, j1, k1, i2, j2, k2) = if x0 >= y0 {
            if y0 >= z0 {
                (1, 0, 0, 1, 1, 0)
            } else if x0 >= z0 {
                (1, 0, 0, 1, 0, 1)
            } else {
                (0, 0, 1, 1, 0, 1)
            }
        } else if y0 < z0 {
            (0, 0, 1, 0, 1, 1)
        } else if x0 < z0 {
            (0, 1, 0, 0, 1, 1)
        } else {
            (0, 1, 0, 1, 1, 0)
        };

        let x1 = x0 - i1 as f64 + G3;
        let y1 = y0 - j1 as f64 + G3;
        let z1 = z0 - k1 as f64 + G3;
        let x2 = x0 - i2 as f64 + 2.0 * G3;
        let y2 = y0 - j2 as f64 + 2.0 * G3;
        let z2 = z0 - k2 as f64 + 2.0 * G3;
        let x3 = x0 - 1.0 + 3.0 * G3;
        let y3 = y0 - 1.0 + 3.0 * G3;
        let z3 = z0 - 1.0 + 3.0 * G3;

        let ii = (i as i64 & 255) as usize;
        let jj = (j as i64 & 255) as usize;
        let kk = (k as i64 & 255) as usize;

        let p = &self.perm;
        let gi0 = p[ii + p[jj + p[kk] as usize] as usize] as usize;
        let gi1 = p[ii + i1 + p[jj + j1 + p[kk + k1] as usize] as usize] as usize;
        let gi2 = p[ii + i2 + p[jj + j2 + p[kk + k2] as usize] as usize] as usize;
        let gi3 = p[ii + 1 + p[jj + 1 + p[kk + 1] as usize] as usize] as usize;

        let n0 = corner_contribution(gi0, x0, y0, z0);
        let n1 = corner_contribution(gi1, x1, y1, z1);
        let n2 = corner_contribution(gi2, x2, y2, z2);
        let n3 = corner_contribution(gi3, x3, y3, z3);

        // Scale to roughly [-1, 1]
        32.0 * (n0 + n1 + n2 + n3)
    }
}

fn corner_contribution(gi: usize, x: f64, y: f64, z: f64) -> f64 {
    let t = 0.6 - x * x - y * y - z * z;
    if t < 0.0 {
        0.0
    } else {
        let t = t * t;
        t * t * grad3d(gi, x, y, z)
    }
}

fn grad3d(hash: usize, x: f64, y: f64, z: f64) -> f64 {
    // Cube edge midpoints.
    const GRAD: [[f64; 3]; 12] = [
        [1.0, 1.0, 0.0],
        [-1.0, 1.0, 0.0],
        [1.0, -1.0, 0.0],
        [-1.0, -1.0, 0.0],
        [1.0, 0.0, 1.0],
        [-1.0, 0.0, 1.0],
        [1.0, 0.0, -1.0],
        [-1.0, 0.0, -1.0],
        [0.0, 1.0, 1.0],
        [0.0, -1.0, 1.0],
        [0.0, 1.0, -1.0],
        [0.0, -1.0, -1.0],
    ];
    let g = &GRAD[hash % 12];
    g[0] * x + g[1] * y + g[2] * z
}

fn build_permutation(seed: u64) -> [u8; 512] {
    let mut p: [u8; 256] = [0; 256];
    for (i, val) in p.iter_mut().enumerate() {
        *val = i as u8;
    }

    // Fisher-Yates shuffle with seed
    let mut rng = seed;
    for i in (1..256).rev() {
        rng = rng
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let j = (rng >> 33) as usize % (i + 1);
        p.swap(i, j);
    }

    let mut perm = [0u8; 512];
    for (i, val) in perm.iter_mut().enumerate() {
        *val = p[i & 255];
    }
    perm
}

fn hash3(x: i32, y: i32, z: i32, seed: u32) -> u32 {
    let mut h = (x as u32).wrapping_mul(0x85eb_ca6b)
        ^ (y as u32).wrapping_mul(0x1656_67b1)
        ^ (z as u32).wrapping_mul(0xc2b2_ae35)
        ^ seed.wrapping_mul(0x27d4_eb2d);
    h ^= h >> 16;
    h = h.wrapping_mul(0x7feb_352d);
    h ^= h >> 15;
    h = h.wrapping_mul(0x846c_a68b);
    h ^= h >> 16;
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_deterministic_across_instances() {
        let a = Noise::new(1234);
        let b = Noise::new(1234);
        for i in 0..200 {
            let x = i as f64 * 3.7 - 300.0;
            let z = i as f64 * -1.3 + 50.0;
            assert_eq!(a.noise(x, 12.0, z, 0.05), b.noise(x, 12.0, z, 0.05));
            assert_eq!(a.white_noise(i, -i, i * 7), b.white_noise(i, -i, i * 7));
        }
    }

    #[test]
    fn test_noise_in_range() {
        let n = Noise::new(7);
        for i in -500..500 {
            let v = n.noise(i as f64 * 0.91, i as f64 * 0.37, i as f64 * -1.7, 0.13);
            assert!((-1.0..=1.0).contains(&v), "noise out of range: {v}");
            let w = n.white_noise(i, i * 3, -i);
            assert!((-1.0..=1.0).contains(&w), "white noise out of range: {w}");
        }
    }

    #[test]
    fn test_noise_varies() {
        let n = Noise::new(42);
        let samples: Vec<f64> = (0..64).map(|i| n.noise(i as f64, 0.5, 0.25, 0.1)).collect();
        let min = samples.iter().cloned().fold(f64::MAX, f64::min);
        let max = samples.iter().cloned().fold(f64::MIN, f64::max);
        assert!(max - min > 0.2, "noise should not be flat: {min}..{max}");
    }

    #[test]
    fn test_seed_changes_output() {
        let a = Noise::new(1);
        let b = Noise::new(2);
        let differs = (0..32).any(|i| {
            a.noise(i as f64 * 1.5, 0.3, 0.7, 0.2) != b.noise(i as f64 * 1.5, 0.3, 0.7, 0.2)
        });
        assert!(differs);
    }

    #[test]
    fn test_white_noise_neighbours_uncorrelated() {
        let n = Noise::new(99);
        let mut same_sign = 0;
        let count = 4000;
        for i in 0..count {
            let a = n.white_noise(i, 0, 0);
            let b = n.white_noise(i + 1, 0, 0);
            if (a >= 0.0) == (b >= 0.0) {
                same_sign += 1;
            }
        }
        let ratio = same_sign as f64 / count as f64;
        assert!((0.4..0.6).contains(&ratio), "neighbour sign agreement {ratio}");
    }

    #[test]
    fn test_salt_decorrelates() {
        let n = Noise::new(5);
        let differs = (0..16).filter(|&i| {
            n.white_noise_salted(i, 4, 9, 1) != n.white_noise_salted(i, 4, 9, 2)
        });
        assert!(differs.count() >= 15);
    }
}
