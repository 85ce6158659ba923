use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use mandelmin_core::{image_writer, RenderParameters};
use mandelmin_gpu::{render, KernelSource, WgpuApi};
use tracing_subscriber::filter::LevelFilter;

/// Render one Mandelbrot frame on a compute device.
#[derive(Parser, Debug)]
#[command(name = "mandelmin", version)]
struct Cli {
    /// Output image. The extension picks the format; unknown ones write PPM.
    #[arg(long, default_value = "result.ppm")]
    out: PathBuf,

    /// Kernel source to compile instead of the bundled one.
    #[arg(long)]
    kernel: Option<PathBuf>,

    /// JSON parameter file. Flags below override its values.
    #[arg(long)]
    params: Option<PathBuf>,

    #[arg(long, allow_negative_numbers = true)]
    center_x: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    center_y: Option<f64>,

    /// Width of the view in the complex plane.
    #[arg(long)]
    magnification: Option<f64>,

    #[arg(long)]
    iterations: Option<u32>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// More logging. Repeat for debug output.
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::ERROR;
        }
        match self.verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            _ => LevelFilter::DEBUG,
        }
    }

    fn render_parameters(&self) -> anyhow::Result<RenderParameters> {
        let mut params = match &self.params {
            Some(path) => RenderParameters::from_json_file(path)
                .with_context(|| format!("load parameters '{}'", path.display()))?,
            None => RenderParameters::default(),
        };

        if let Some(x) = self.center_x {
            params.center.0 = x;
        }
        if let Some(y) = self.center_y {
            params.center.1 = y;
        }
        if let Some(m) = self.magnification {
            params.magnification = m;
        }
        if let Some(i) = self.iterations {
            params.iterations = i;
        }
        if let Some(w) = self.width {
            params.width = w;
        }
        if let Some(h) = self.height {
            params.height = h;
        }

        params.validate().context("invalid render parameters")?;
        Ok(params)
    }

    fn kernel_source(&self) -> anyhow::Result<KernelSource> {
        match &self.kernel {
            Some(path) => Ok(KernelSource::from_file(path)?),
            None => Ok(KernelSource::embedded()),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.level())
        .with_target(false)
        .init();

    let params = cli.render_parameters()?;
    let source = cli.kernel_source()?;

    let result = render(&WgpuApi::new(), &source, &params)
        .with_context(|| format!("render with kernel {}", source.label()))?;
    log::info!(
        "{}x{} on {} in {:.1} ms",
        params.width,
        params.height,
        result.device,
        result.compute_time_ms
    );

    image_writer::save(&result.grid, &cli.out)
        .with_context(|| format!("write '{}'", cli.out.display()))?;
    println!("Wrote {}", cli.out.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("mandelmin").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_render_the_fixed_view() {
        let cli = parse(&[]);
        assert_eq!(cli.out, PathBuf::from("result.ppm"));
        assert!(cli.kernel.is_none());
        assert_eq!(cli.render_parameters().unwrap(), RenderParameters::default());
        assert_eq!(cli.level(), LevelFilter::WARN);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = parse(&[
            "--center-x",
            "-0.75",
            "--center-y",
            "0.1",
            "--width",
            "64",
            "--iterations",
            "200",
        ]);
        let params = cli.render_parameters().unwrap();
        assert_eq!(params.center, (-0.75, 0.1));
        assert_eq!(params.width, 64);
        assert_eq!(params.height, RenderParameters::default().height);
        assert_eq!(params.iterations, 200);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let cli = parse(&["--width", "0"]);
        assert!(cli.render_parameters().is_err());
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(parse(&["-v"]).level(), LevelFilter::INFO);
        assert_eq!(parse(&["-vv"]).level(), LevelFilter::DEBUG);
        assert_eq!(parse(&["-q"]).level(), LevelFilter::ERROR);
        assert!(Cli::try_parse_from(["mandelmin", "-q", "-v"]).is_err());
    }

    #[test]
    fn missing_kernel_file_is_an_error() {
        let cli = parse(&["--kernel", "/nonexistent/kernel.wgsl"]);
        assert!(cli.kernel_source().is_err());
    }
}
