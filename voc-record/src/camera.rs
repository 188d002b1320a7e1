//! Camera settings exported along with synthetic frames.

use crate::common::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraSettings {
    pub camera_settings: Vec<Camera>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Camera {
    #[serde(default)]
    pub name: String,
    pub captured_image_size: CapturedImageSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedImageSize {
    pub width: usize,
    pub height: usize,
}

impl CameraSettings {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).with_context(|| {
            format!("failed to read camera settings file '{}'", path.display())
        })?;
        let settings: Self = serde_json::from_str(&text).with_context(|| {
            format!("failed to parse camera settings file '{}'", path.display())
        })?;
        ensure!(
            !settings.camera_settings.is_empty(),
            "no camera found in '{}'",
            path.display()
        );
        Ok(settings)
    }

    /// The captured image size of the first camera.
    pub fn image_size(&self) -> Result<PixelSize> {
        let camera = self
            .camera_settings
            .first()
            .ok_or_else(|| format_err!("camera settings are empty"))?;
        let CapturedImageSize { width, height } = camera.captured_image_size;
        let size = HW::try_from_hw([height, width])?;
        ensure!(
            size.is_positive(),
            "captured image size of camera '{}' must be positive",
            camera.name
        );
        Ok(size)
    }
}
