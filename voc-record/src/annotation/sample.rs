use super::EncodedImage;
use crate::common::*;

/// One image loaded from the dataset with its objects in pixel units.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSample {
    pub annotation_file: PathBuf,
    pub image_file: PathBuf,
    /// The value stored in `image/filename`.
    pub filename: String,
    pub image: EncodedImage,
    /// The size used to normalize boxes.
    pub size: PixelSize,
    pub objects: Vec<ObjectLabel<PixelTLBR>>,
}

impl SourceSample {
    /// Remove objects flagged as difficult and return how many were removed.
    pub fn drop_difficult(&mut self) -> usize {
        let before = self.objects.len();
        self.objects.retain(|object| !object.difficult);
        before - self.objects.len()
    }
}

/// Keep a box if its corners are ordered, otherwise warn and drop it.
pub(crate) fn checked_box(
    annotation_file: &Path,
    class: &str,
    rect: Result<PixelTLBR>,
) -> Option<PixelTLBR> {
    match rect {
        Ok(rect) => Some(rect),
        Err(err) => {
            warn!(
                "skip object '{}' in '{}': {:?}",
                class,
                annotation_file.display(),
                err
            );
            None
        }
    }
}
