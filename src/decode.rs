use std::path::Path;

use image::{DynamicImage, ImageReader};

use crate::error::{ErrorKind, IconError};
use crate::icon_err;

/// Loads an image, guessing the format from the file contents.
/// Unreadable, undecodable and zero-sized images are all `kind`.
pub fn decode(path: &Path, kind: ErrorKind) -> Result<DynamicImage, IconError> {
    let reader = ImageReader::open(path)
        .map_err(|e| icon_err!(kind, "unable to open image '{}': {e}", path.display()))?
        .with_guessed_format()
        .map_err(|e| icon_err!(kind, "unable to read image '{}': {e}", path.display()))?;
    let image = reader
        .decode()
        .map_err(|e| icon_err!(kind, "unable to decode image '{}': {e}", path.display()))?;
    ensure_not_empty(&image, kind)?;
    Ok(image)
}

pub fn ensure_not_empty(image: &DynamicImage, kind: ErrorKind) -> Result<(), IconError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(icon_err!(
            kind,
            "image has no pixels ({}x{})",
            image.width(),
            image.height()
        ));
    }
    Ok(())
}
