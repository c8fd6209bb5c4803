use std::{
    fs,
    io::{BufWriter, Write},
    path::Path,
};

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageEncoder};

use crate::error::{ErrorKind, IconError};
use crate::{icon_err, icon_try};

/// Writes the image as PNG, keeping its color type.
///
/// The data goes to a temporary file in the destination directory first and is renamed
/// into place at the end, so a failed run never leaves a truncated icon behind.
pub fn write_png(image: &DynamicImage, path: &Path) -> Result<(), IconError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let temp = tempfile::NamedTempFile::new_in(dir).map_err(|error| {
        icon_err!(
            ErrorKind::Io,
            "unable to create a file in '{}': {error}",
            dir.display()
        )
    })?;

    {
        // Wrap in BufWriter for performance
        let mut writer = BufWriter::new(temp.as_file());
        let encoder =
            PngEncoder::new_with_quality(&mut writer, CompressionType::Default, FilterType::Adaptive);
        icon_try!(
            ErrorKind::Io,
            encoder.write_image(
                image.as_bytes(),
                image.width(),
                image.height(),
                image.color().into(),
            )
        );
        // The buffers will be flushed automatically when the writer goes out of scope,
        // but that will not report any errors. This handles errors.
        icon_try!(ErrorKind::Io, writer.flush());
    }

    temp.persist(path).map_err(|error| {
        icon_err!(
            ErrorKind::Io,
            "unable to write image '{}': {}",
            path.display(),
            error.error
        )
    })?;
    Ok(())
}

/// Creates the directory and its parents if they do not exist yet
pub fn ensure_dir(dir: &Path) -> Result<(), IconError> {
    fs::create_dir_all(dir).map_err(|error| {
        icon_err!(
            ErrorKind::Io,
            "unable to create directory '{}': {error}",
            dir.display()
        )
    })
}
