pub mod image_helper {
    use image::{ImageEncoder, RgbImage};
    use std::path::{Path, PathBuf};

    pub fn save(path: &Path, frame: &RgbImage) -> Result<(), image::error::ImageError> {
        let output = std::fs::File::create(path)?;
        let encoder = image::codecs::png::PngEncoder::new(output);

        encoder.write_image(
            frame.as_raw(),
            frame.width(),
            frame.height(),
            image::ExtendedColorType::Rgb8,
        )?;

        Ok(())
    }

    /// `dir/frame_000042.png`
    pub fn snapshot_path(dir: &Path, tick: u64) -> PathBuf {
        dir.join(format!("frame_{tick:06}.png"))
    }
}
