//! COCO-style annotation JSON written next to the record shards.

use crate::{common::*, label_map::LabelMap};

/// The COCO instances document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoAnnotations {
    pub images: Vec<CocoImage>,
    #[serde(rename = "type")]
    pub kind: String,
    pub annotations: Vec<CocoAnnotation>,
    pub categories: Vec<CocoCategory>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CocoImage {
    pub file_name: String,
    pub height: usize,
    pub width: usize,
    pub id: u64,
}

/// An object box in integer pixel units. `bbox` is `[x, y, width, height]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoAnnotation {
    pub area: i64,
    pub iscrowd: u8,
    pub image_id: u64,
    pub bbox: [i64; 4],
    pub category_id: i64,
    pub id: u64,
    pub ignore: u8,
    pub segmentation: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CocoCategory {
    pub supercategory: String,
    pub id: i64,
    pub name: String,
}

impl CocoAnnotations {
    /// Start a document with one category per label map entry.
    pub fn new(label_map: &LabelMap) -> Self {
        let categories = label_map
            .iter()
            .map(|(name, id)| CocoCategory {
                supercategory: "none".to_owned(),
                id,
                name: name.to_owned(),
            })
            .collect();

        Self {
            images: vec![],
            kind: "instances".to_owned(),
            annotations: vec![],
            categories,
        }
    }

    /// Register an image and return its id. Ids start from 1.
    pub fn add_image(&mut self, file_name: &str, size: &PixelSize) -> u64 {
        let id = self.images.len() as u64 + 1;
        self.images.push(CocoImage {
            file_name: file_name.to_owned(),
            height: size.h(),
            width: size.w(),
            id,
        });
        id
    }

    /// Register an object of an image and return its id. Ids start from 1
    /// and are unique across images.
    pub fn add_object(
        &mut self,
        image_id: u64,
        object: &ObjectLabel<PixelTLBR>,
        category_id: i64,
    ) -> u64 {
        let id = self.annotations.len() as u64 + 1;
        let [t, l, b, r] = object.rect().tlbr();
        let (xmin, ymin, xmax, ymax) = (l as i64, t as i64, r as i64, b as i64);
        let width = xmax - xmin;
        let height = ymax - ymin;

        self.annotations.push(CocoAnnotation {
            area: width * height,
            iscrowd: 0,
            image_id,
            bbox: [xmin, ymin, width, height],
            category_id,
            id,
            ignore: 0,
            segmentation: vec![],
        });
        id
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = serde_json::to_string(self)?;
        fs::write(path, text)
            .with_context(|| format!("failed to write '{}'", path.display()))?;
        Ok(())
    }
}

/// The COCO JSON path of an output prefix: `<dir>/json_<basename>.json`.
pub fn coco_json_path(output_path: &Path) -> Result<PathBuf> {
    let basename = output_path
        .file_name()
        .ok_or_else(|| format_err!("invalid output path '{}'", output_path.display()))?
        .to_string_lossy();
    let dir = output_path.parent().unwrap_or_else(|| Path::new(""));
    Ok(dir.join(format!("json_{}.json", basename)))
}
