pub mod config;
pub mod error;
pub mod image_writer;
pub mod mandelbrot;
pub mod pixel_grid;
pub mod work_size;

pub use config::RenderParameters;
pub use error::ConfigError;
pub use mandelbrot::MandelbrotReference;
pub use pixel_grid::{pack_rgb, unpack_rgb, PixelGrid};
pub use work_size::{align, WorkGeometry};
