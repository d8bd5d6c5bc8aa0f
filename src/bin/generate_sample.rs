use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;

/// Write a synthetic raw input/alpha pair for trying out the sampler.
#[derive(Debug, Parser)]
struct Args {
    /// Output directory.
    #[arg(default_value = ".")]
    dir: PathBuf,

    #[arg(long, default_value_t = 64)]
    width: usize,

    #[arg(long, default_value_t = 48)]
    height: usize,

    /// Number of label classes in the alpha file.
    #[arg(long, default_value_t = 4)]
    classes: u8,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

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

    /// Uniform integer in `[-amplitude, amplitude]`.
    fn jitter(&mut self, amplitude: i32) -> i32 {
        let span = (2 * amplitude + 1) as u64;
        (self.next_u64() % span) as i32 - amplitude
    }
}

/// Concentric rings around the image centre plus noise. The ring a pixel
/// falls in is its label, so neighbourhoods carry real signal.
fn generate(args: &Args, rng: &mut SimpleRng) -> (Vec<u8>, Vec<u8>) {
    let (cx, cy) = (args.width as f64 / 2.0, args.height as f64 / 2.0);
    let max_r = cx.hypot(cy);
    let mut input = Vec::with_capacity(args.width * args.height);
    let mut alpha = Vec::with_capacity(args.width * args.height);

    for y in 0..args.height {
        for x in 0..args.width {
            let r = (x as f64 - cx).hypot(y as f64 - cy) / max_r;
            let class = ((r * args.classes as f64) as u8).min(args.classes - 1);
            let base = 40 + class as i32 * (200 / args.classes as i32);
            input.push((base + rng.jitter(12)).clamp(0, 255) as u8);
            alpha.push(class);
        }
    }
    (input, alpha)
}

fn write_raw(path: &Path, width: usize, height: usize, samples: &[u8]) -> Result<()> {
    let mut bytes = format!("{width} {height}\n").into_bytes();
    bytes.extend_from_slice(samples);
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    if args.width == 0 || args.height == 0 {
        bail!("width and height must be positive");
    }
    if args.classes == 0 {
        bail!("need at least one class");
    }

    let mut rng = SimpleRng::new(args.seed);
    let (input, alpha) = generate(&args, &mut rng);

    std::fs::create_dir_all(&args.dir)
        .with_context(|| format!("creating {}", args.dir.display()))?;
    let input_path = args.dir.join("sample.input");
    let alpha_path = args.dir.join("sample.alpha");
    write_raw(&input_path, args.width, args.height, &input)?;
    write_raw(&alpha_path, args.width, args.height, &alpha)?;

    println!(
        "Wrote {}x{} pair ({} classes) to {} and {}",
        args.width,
        args.height,
        args.classes,
        input_path.display(),
        alpha_path.display()
    );
    Ok(())
}
