use super::{checked_box, EncodedImage, SourceSample};
use crate::common::*;

/// The view name of VOC objects without a pose.
pub const UNSPECIFIED_VIEW: &str = "Unspecified";

/// A PASCAL VOC annotation XML document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VocAnnotation {
    pub filename: String,
    pub size: VocSize,
    #[serde(default)]
    pub object: Vec<VocObject>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct VocSize {
    pub width: usize,
    pub height: usize,
    #[serde(default)]
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VocObject {
    pub name: String,
    #[serde(default)]
    pub pose: Option<String>,
    #[serde(default)]
    pub truncated: i64,
    #[serde(default)]
    pub difficult: i64,
    pub bndbox: VocBndBox,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct VocBndBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl FromStr for VocAnnotation {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let annotation = serde_xml_rs::from_str(text)?;
        Ok(annotation)
    }
}

impl VocAnnotation {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_owned();
        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read annotation file '{}'", path.display()))?;

        tokio::task::spawn_blocking(move || {
            text.parse::<VocAnnotation>()
                .with_context(|| format!("failed to parse annotation file '{}'", path.display()))
        })
        .await?
    }

    /// The size written in the XML. It is `None` when either side is zero.
    pub fn image_size(&self) -> Option<PixelSize> {
        let VocSize { width, height, .. } = self.size;
        HW::try_from_hw([height, width])
            .ok()
            .filter(|size| size.is_positive())
    }

    pub fn to_labels(&self, annotation_file: &Path) -> Vec<ObjectLabel<PixelTLBR>> {
        self.object
            .iter()
            .filter_map(|obj| {
                let VocBndBox {
                    xmin,
                    ymin,
                    xmax,
                    ymax,
                } = obj.bndbox;
                let rect = checked_box(
                    annotation_file,
                    &obj.name,
                    TLBR::try_from_tlbr([ymin, xmin, ymax, xmax]),
                )?;
                let view = obj
                    .pose
                    .as_deref()
                    .map(str::trim)
                    .filter(|pose| !pose.is_empty())
                    .unwrap_or(UNSPECIFIED_VIEW)
                    .to_owned();

                Some(ObjectLabel {
                    label: Label {
                        rect,
                        class: obj.name.clone(),
                    },
                    difficult: obj.difficult != 0,
                    truncated: obj.truncated != 0,
                    view,
                })
            })
            .collect()
    }
}

/// Load a VOC sample. The image is `image_dir/<filename>` as named in the XML.
pub async fn load_voc_sample(
    annotation_file: impl AsRef<Path>,
    image_dir: impl AsRef<Path>,
) -> Result<SourceSample> {
    let annotation_file = annotation_file.as_ref();
    let annotation = VocAnnotation::open(annotation_file).await?;
    let image_file = image_dir.as_ref().join(&annotation.filename);
    let image = EncodedImage::open(&image_file).await?;
    let size = annotation.image_size().unwrap_or(image.size);
    let objects = annotation.to_labels(annotation_file);

    Ok(SourceSample {
        annotation_file: annotation_file.to_owned(),
        image_file,
        filename: annotation.filename,
        image,
        size,
        objects,
    })
}
