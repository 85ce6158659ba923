//! Write a pixel grid to disk.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::{ExtendedColorType, ImageEncoder, ImageFormat, ImageResult, Rgb, RgbImage};

use crate::error::ConfigError;
use crate::{unpack_rgb, PixelGrid};

/// Convert the grid to an RGB image using the low three bytes of each pixel.
pub fn to_rgb_image(grid: &PixelGrid) -> RgbImage {
    RgbImage::from_fn(grid.width() as u32, grid.height() as u32, |x, y| {
        Rgb(unpack_rgb(grid[(y as usize, x as usize)]))
    })
}

/// Write `image` as binary PPM (`P6`).
///
/// `save_with_format(.., Pnm)` picks the PAM subtype, so the subtype is set
/// explicitly here.
fn write_ppm(image: &RgbImage, path: &Path) -> ImageResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    PnmEncoder::new(&mut writer)
        .with_subtype(PnmSubtype::Pixmap(SampleEncoding::Binary))
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgb8,
        )?;
    writer.flush()?;
    Ok(())
}

/// Save the grid. The format follows the extension; `.ppm`, other PNM
/// extensions and unknown extensions get binary PPM.
pub fn save(grid: &PixelGrid, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let format = ImageFormat::from_path(path).unwrap_or(ImageFormat::Pnm);
    let image = to_rgb_image(grid);
    let written = match format {
        ImageFormat::Pnm => write_ppm(&image, path),
        other => image.save_with_format(path, other),
    };
    written.map_err(|source| ConfigError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!(
        "Wrote {}x{} image to {} ({:?})",
        grid.width(),
        grid.height(),
        path.display(),
        format
    );
    Ok(())
}
