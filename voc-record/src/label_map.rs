//! Class name to class id mapping.

use crate::common::*;

/// The name reserved for class id 0.
pub const BACKGROUND: &str = "background";

const SYNTHETIC_CLASSES: [&str; 8] = [
    "LGlove", "RGlove", "Shirt", "Gown", "Pants", "Hat", "Mask", "Body",
];

const PASCAL_VOC_CLASSES: [&str; 20] = [
    "aeroplane",
    "bicycle",
    "bird",
    "boat",
    "bottle",
    "bus",
    "car",
    "cat",
    "chair",
    "cow",
    "diningtable",
    "dog",
    "horse",
    "motorbike",
    "person",
    "pottedplant",
    "sheep",
    "sofa",
    "train",
    "tvmonitor",
];

/// An ordered class map where the background class takes id 0 and the rest
/// are numbered from 1 in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    classes: IndexMap<String, i64>,
}

impl LabelMap {
    /// Build a map from the foreground class names. Duplicated names are rejected.
    pub fn from_classes<I, S>(classes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut map = IndexMap::new();
        map.insert(BACKGROUND.to_owned(), 0);

        for (index, name) in classes.into_iter().enumerate() {
            let name = name.as_ref();
            ensure!(
                !map.contains_key(name),
                "duplicated class name '{}' in label map",
                name
            );
            map.insert(name.to_owned(), index as i64 + 1);
        }

        Ok(Self { classes: map })
    }

    /// The classes of the synthetic domain-randomized dataset.
    pub fn synthetic_default() -> Self {
        Self::from_classes(SYNTHETIC_CLASSES).expect("built-in class list has no duplicates")
    }

    /// The 20 PASCAL VOC classes.
    pub fn pascal_voc() -> Self {
        Self::from_classes(PASCAL_VOC_CLASSES).expect("built-in class list has no duplicates")
    }

    /// Load the `exported_object_classes` list from an object settings file.
    pub fn from_object_settings(path: impl AsRef<Path>) -> Result<Self> {
        #[derive(Deserialize)]
        struct ObjectSettings {
            exported_object_classes: Vec<String>,
        }

        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read label map file '{}'", path.display()))?;
        let ObjectSettings {
            exported_object_classes,
        } = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse label map file '{}'", path.display()))?;
        ensure!(
            !exported_object_classes.is_empty(),
            "no classes found in '{}'",
            path.display()
        );

        Self::from_classes(exported_object_classes)
            .with_context(|| format!("invalid label map file '{}'", path.display()))
    }

    pub fn id_of(&self, name: &str) -> Result<i64> {
        self.classes
            .get(name)
            .copied()
            .ok_or_else(|| format_err!("class '{}' is not in the label map", name))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Iterate `(name, id)` pairs in id order, background first.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.classes.iter().map(|(name, &id)| (name.as_str(), id))
    }
}
