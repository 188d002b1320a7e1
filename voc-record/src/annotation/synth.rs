use super::{checked_box, EncodedImage, SourceSample};
use crate::common::*;

/// The view name given to every synthetic object.
pub const SYNTHETIC_VIEW: &str = "Frontal";

/// The per-frame annotation of a synthetic domain-randomized render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthAnnotation {
    #[serde(default)]
    pub objects: Vec<SynthObject>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthObject {
    pub class: String,
    /// The visible fraction of the object.
    pub visibility: f64,
    pub bounding_box: SynthBoundingBox,
}

/// Box corners in pixel units, each stored as `[y, x]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthBoundingBox {
    pub top_left: [f64; 2],
    pub bottom_right: [f64; 2],
}

impl SynthAnnotation {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read annotation file '{}'", path.display()))?;
        let annotation = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse annotation file '{}'", path.display()))?;
        Ok(annotation)
    }

    /// Convert objects to labels.
    ///
    /// An object counts as truncated when its visibility exceeds
    /// `visibility_thresh`. Synthetic objects are never difficult.
    pub fn to_labels(
        &self,
        annotation_file: &Path,
        visibility_thresh: R64,
    ) -> Vec<ObjectLabel<PixelTLBR>> {
        self.objects
            .iter()
            .filter_map(|obj| {
                let SynthBoundingBox {
                    top_left,
                    bottom_right,
                } = obj.bounding_box;
                let rect = checked_box(
                    annotation_file,
                    &obj.class,
                    TLBR::try_from_corners(top_left, bottom_right),
                )?;

                Some(ObjectLabel {
                    label: Label {
                        rect,
                        class: obj.class.clone(),
                    },
                    difficult: false,
                    truncated: obj.visibility > visibility_thresh.raw(),
                    view: SYNTHETIC_VIEW.to_owned(),
                })
            })
            .collect()
    }
}

/// Load a synthetic frame. The image is the `.jpg` file sharing the
/// annotation's stem. Boxes are normalized against `image_size` when given,
/// otherwise against the size in the JPEG header.
pub async fn load_synth_sample(
    annotation_file: impl AsRef<Path>,
    image_size: Option<PixelSize>,
    visibility_thresh: R64,
) -> Result<SourceSample> {
    let annotation_file = annotation_file.as_ref();
    let annotation = SynthAnnotation::open(annotation_file).await?;
    let image_file = annotation_file.with_extension("jpg");
    let image = EncodedImage::open(&image_file).await?;
    let size = image_size.unwrap_or(image.size);
    let objects = annotation.to_labels(annotation_file, visibility_thresh);

    Ok(SourceSample {
        annotation_file: annotation_file.to_owned(),
        filename: image_file.display().to_string(),
        image_file,
        image,
        size,
        objects,
    })
}
