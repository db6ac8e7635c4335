use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Sphere diameter, the rest separation of bonded centres [m].
const DIAMETER: f64 = 5.0e-6;
/// Lattice origin [m].
const ORIGIN: f64 = 4.75e-5;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Bond length at a given frame: a damped oscillation around the rest
/// separation, as after an initial compression.
fn bond_length(frame: usize) -> f64 {
    let t = frame as f64;
    DIAMETER + 0.2e-6 * (-t / 60.0).exp() * (t / 8.0).cos()
}

/// Four spheres on the corners of a breathing square, one `x y z` record per
/// sphere per frame.
fn write_square_log(path: &Path, frames: usize, rng: &mut SimpleRng) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for frame in 0..frames {
        let side = bond_length(frame);
        let corners = [
            (ORIGIN, ORIGIN),
            (ORIGIN, ORIGIN + side),
            (ORIGIN + side, ORIGIN + side),
            (ORIGIN + side, ORIGIN),
        ];
        for (x, y) in corners {
            writeln!(
                out,
                "{:.6e} {:.6e} {:.6e}",
                x + rng.gauss(0.0, 5.0e-9),
                y + rng.gauss(0.0, 5.0e-9),
                0.0
            )?;
        }
    }
    Ok(())
}

/// Three spheres on a breathing equilateral triangle, apex on top.
fn write_triangle_log(path: &Path, frames: usize, rng: &mut SimpleRng) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for frame in 0..frames {
        let side = bond_length(frame);
        let height = side * 3.0_f64.sqrt() / 2.0;
        let corners = [
            (ORIGIN, ORIGIN),
            (ORIGIN + side, ORIGIN),
            (ORIGIN + side / 2.0, ORIGIN + height),
        ];
        for (x, y) in corners {
            writeln!(
                out,
                "{:.6e} {:.6e} {:.6e}",
                x + rng.gauss(0.0, 5.0e-9),
                y + rng.gauss(0.0, 5.0e-9),
                0.0
            )?;
        }
    }
    Ok(())
}

/// Bond stress log, `i j sigma tau sigma_max tau_max` per bond per frame.
/// The write order of the three bonds rotates between frames.
fn write_bond_log(path: &Path, frames: usize, rng: &mut SimpleRng) -> std::io::Result<()> {
    let pairs = [(0i64, 1i64), (1, 2), (0, 2)];
    let factors = [1.0, 0.85, 1.15];

    let mut out = BufWriter::new(File::create(path)?);
    for frame in 0..frames {
        for i in 0..pairs.len() {
            let b = (i + frame) % pairs.len();
            let (pi, pj) = pairs[b];
            let ramp = 1.0 + frame as f64 / 100.0;
            let sigma = 1.0e4 * ramp * factors[b] + rng.gauss(0.0, 50.0);
            let tau = 0.3 * sigma + rng.gauss(0.0, 20.0);
            writeln!(
                out,
                "{pi} {pj} {sigma:.6e} {tau:.6e} {:.6e} {:.6e}",
                5.0e4, 2.0e4
            )?;
        }
    }
    Ok(())
}

/// Contact force log: a Hertzian loading ramp followed by a stiffer
/// unloading branch with a plastic residual, tagged 0 / 1 per record.
fn write_force_log(path: &Path, steps: usize, rng: &mut SimpleRng) -> std::io::Result<()> {
    let delta_max: f64 = 1.0e-7;
    let stiffness = 1.0e8;
    let force_max = stiffness * delta_max.powf(1.5);
    let residual = 0.2 * delta_max;

    let mut out = BufWriter::new(File::create(path)?);
    for k in 0..=steps {
        let delta = delta_max * k as f64 / steps as f64;
        let force = stiffness * delta.powf(1.5);
        let slip = 0.1 * delta;
        let tangential = 0.2 * force + rng.gauss(0.0, 1.0e-6);
        writeln!(
            out,
            "0 {delta:.6e} {force:.6e} {slip:.6e} 0 {tangential:.6e}"
        )?;
    }
    for k in (0..steps).rev() {
        let delta = delta_max * k as f64 / steps as f64;
        let force = if delta > residual {
            force_max * ((delta - residual) / (delta_max - residual)).powf(1.5)
        } else {
            0.0
        };
        let slip = 0.1 * delta;
        let tangential = 0.2 * force + rng.gauss(0.0, 1.0e-6);
        writeln!(
            out,
            "1 {delta:.6e} {force:.6e} {slip:.6e} 0 {tangential:.6e}"
        )?;
    }
    Ok(())
}

fn main() {
    let mut rng = SimpleRng::new(42);

    let dir = Path::new("sample_data");
    std::fs::create_dir_all(dir).expect("Failed to create sample_data directory");

    let square = dir.join("data.txt");
    write_square_log(&square, 200, &mut rng).expect("Failed to write four-sphere log");
    println!("Wrote 200 frames of four-sphere positions to {}", square.display());

    let triangle = dir.join("three_sphere_data.txt");
    write_triangle_log(&triangle, 200, &mut rng).expect("Failed to write three-sphere log");
    println!("Wrote 200 frames of three-sphere positions to {}", triangle.display());

    let bonds = dir.join("bond_data.txt");
    write_bond_log(&bonds, 150, &mut rng).expect("Failed to write bond stress log");
    println!("Wrote 150 frames of bond stresses to {}", bonds.display());

    let force = dir.join("force.txt");
    write_force_log(&force, 100, &mut rng).expect("Failed to write force log");
    println!("Wrote loading/unloading force sweep to {}", force.display());
}
