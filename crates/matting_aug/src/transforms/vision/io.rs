use crate::transforms::vision::conversion::gray_to_array;
use anyhow::{anyhow, Context, Result};
use image::{DynamicImage, ImageFormat, ImageReader, RgbImage};
use ndarray::Array2;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

// ============================================================================
// LoadImage - Base image loader
// ============================================================================

/// Loads images from file paths.
///
/// Reads the whole file through a buffered reader, sniffs the format from
/// the content (falling back to the extension) and decodes it. Color images
/// come back as RGB, mattes as single-channel luma.
///
/// # Example
/// ```ignore
/// let loader = LoadImage::new();
/// let fg = loader.load_rgb8(Path::new("fg/0001.png"))?;
/// let alpha = loader.load_grayscale(Path::new("alpha/0001.png"))?;
/// ```
#[derive(Debug, Clone)]
pub struct LoadImage {
    buffer_size: usize,
}

impl Default for LoadImage {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadImage {
    /// Creates a new image loader with an 8KB read buffer.
    pub fn new() -> Self {
        Self { buffer_size: 8192 }
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open image: {}", path.display()))?;

        let file_size = file.metadata()?.len() as usize;
        let mut reader = BufReader::with_capacity(self.buffer_size, file);
        let mut buffer = Vec::with_capacity(file_size);
        reader
            .read_to_end(&mut buffer)
            .with_context(|| format!("Failed to read image: {}", path.display()))?;
        Ok(buffer)
    }

    fn decode(&self, path: &Path) -> Result<DynamicImage> {
        let buffer = self.read_bytes(path)?;
        let mut reader = ImageReader::new(Cursor::new(buffer)).with_guessed_format()?;

        if reader.format().is_none() {
            let format = ImageFormat::from_path(path).map_err(|e| {
                anyhow!("Unrecognised image format for {}: {}", path.display(), e)
            })?;
            log::warn!(
                "Could not sniff image format of {}, decoding as {:?} from its extension",
                path.display(),
                format
            );
            reader.set_format(format);
        }

        reader
            .decode()
            .with_context(|| format!("Failed to decode image: {}", path.display()))
    }

    /// Loads as an 8-bit RGB image.
    pub fn load_rgb8(&self, path: &Path) -> Result<RgbImage> {
        Ok(self.decode(path)?.to_rgb8())
    }

    /// Loads and converts to a grayscale array (`H×W`, 0..=255).
    pub fn load_grayscale(&self, path: &Path) -> Result<Array2<f32>> {
        let image = self.decode(path)?;
        gray_to_array(&image.to_luma8())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use tempfile::{tempdir, NamedTempFile};

    fn create_test_image() -> Result<NamedTempFile> {
        // Create a test image (3x3 RGB)
        let mut test_img = RgbImage::new(3, 3);
        test_img.put_pixel(0, 0, Rgb([255, 0, 0])); // Red
        test_img.put_pixel(1, 1, Rgb([0, 255, 0])); // Green
        test_img.put_pixel(2, 2, Rgb([255, 255, 255])); // White

        let temp_file = NamedTempFile::with_suffix(".png")?;
        test_img.save(temp_file.path())?;
        Ok(temp_file)
    }

    #[test]
    fn test_load_rgb8() -> Result<()> {
        let temp_file = create_test_image()?;

        let loaded = LoadImage::new().load_rgb8(temp_file.path())?;
        assert_eq!(loaded.dimensions(), (3, 3));
        assert_eq!(loaded.get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(loaded.get_pixel(1, 1), &Rgb([0, 255, 0]));
        Ok(())
    }

    #[test]
    fn test_load_grayscale() -> Result<()> {
        let temp_file = create_test_image()?;
        let loader = LoadImage::new();

        let gray = loader.load_grayscale(temp_file.path())?;
        assert_eq!(gray.dim(), (3, 3));
        assert_eq!(gray[[2, 2]], 255.0);
        assert_eq!(gray[[0, 1]], 0.0);
        Ok(())
    }

    #[test]
    fn test_extension_fallback_without_sniffable_header() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("matte.png");
        std::fs::write(&path, b"definitely not a png")?;

        // Falls back to the extension, then fails to decode with the path attached.
        let err = LoadImage::new().load_grayscale(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("matte.png"));
        Ok(())
    }

    #[test]
    fn test_error_handling() -> Result<()> {
        let loader = LoadImage::new();
        let err = loader.load_rgb8(Path::new("nonexistent.jpg")).unwrap_err();
        assert!(err.to_string().contains("nonexistent.jpg"));

        let dir = tempdir()?;
        let unknown = dir.path().join("blob.xyz");
        std::fs::write(&unknown, b"\x00\x01\x02")?;
        let err = loader.load_rgb8(&unknown).unwrap_err();
        assert!(err.to_string().contains("Unrecognised image format"));
        Ok(())
    }
}
