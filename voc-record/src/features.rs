//! The key/value layout of an exported image record.
//!
//! Image-level fields are single-element lists. Object-level fields are
//! parallel lists where index `i` of every list describes the same object.

use crate::common::*;
use std::collections::HashMap;
use tfrecord::protobuf::feature::Kind;

pub const IMAGE_HEIGHT: &str = "image/height";
pub const IMAGE_WIDTH: &str = "image/width";
pub const IMAGE_FILENAME: &str = "image/filename";
pub const IMAGE_SOURCE_ID: &str = "image/source_id";
pub const IMAGE_KEY_SHA256: &str = "image/key/sha256";
pub const IMAGE_ENCODED: &str = "image/encoded";
pub const IMAGE_FORMAT: &str = "image/format";
pub const OBJECT_BBOX_XMIN: &str = "image/object/bbox/xmin";
pub const OBJECT_BBOX_XMAX: &str = "image/object/bbox/xmax";
pub const OBJECT_BBOX_YMIN: &str = "image/object/bbox/ymin";
pub const OBJECT_BBOX_YMAX: &str = "image/object/bbox/ymax";
pub const OBJECT_AREA: &str = "image/object/area";
pub const OBJECT_CLASS_TEXT: &str = "image/object/class/text";
pub const OBJECT_CLASS_LABEL: &str = "image/object/class/label";
pub const OBJECT_DIFFICULT: &str = "image/object/difficult";
pub const OBJECT_TRUNCATED: &str = "image/object/truncated";
pub const OBJECT_VIEW: &str = "image/object/view";

/// The per-object keys that must share one length.
pub const OBJECT_LIST_KEYS: [&str; 10] = [
    OBJECT_BBOX_XMIN,
    OBJECT_BBOX_XMAX,
    OBJECT_BBOX_YMIN,
    OBJECT_BBOX_YMAX,
    OBJECT_AREA,
    OBJECT_CLASS_TEXT,
    OBJECT_CLASS_LABEL,
    OBJECT_DIFFICULT,
    OBJECT_TRUNCATED,
    OBJECT_VIEW,
];

/// The only image encoding the exporter emits.
pub const JPEG_FORMAT: &str = "jpeg";

/// One annotated image ready to be serialized.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub height: i64,
    pub width: i64,
    pub filename: String,
    pub source_id: String,
    /// Lowercase hex SHA-256 digest of `encoded`.
    pub key_sha256: String,
    pub encoded: Vec<u8>,
    pub format: String,
    pub objects: Vec<ObjectRecord>,
}

/// One object of an [ImageRecord] with box coordinates in ratio units.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRecord {
    pub xmin: f32,
    pub xmax: f32,
    pub ymin: f32,
    pub ymax: f32,
    pub area: f32,
    pub class_text: String,
    pub class_label: i64,
    pub difficult: bool,
    pub truncated: bool,
    pub view: String,
}

impl ObjectRecord {
    /// Build an object from a normalized label and its class id.
    pub fn from_label(object: &ObjectLabel<RatioTLBR>, class_label: i64) -> Self {
        let [ymin, xmin, ymax, xmax] = object.rect().tlbr();
        let area = (xmax - xmin) * (ymax - ymin);

        Self {
            xmin: xmin as f32,
            xmax: xmax as f32,
            ymin: ymin as f32,
            ymax: ymax as f32,
            area: area as f32,
            class_text: object.class_name().to_owned(),
            class_label,
            difficult: object.difficult,
            truncated: object.truncated,
            view: object.view.clone(),
        }
    }
}

impl ImageRecord {
    pub fn num_objects(&self) -> usize {
        self.objects.len()
    }

    /// Serialize into the flat feature map.
    pub fn to_example(&self) -> Example {
        let objects = &self.objects;
        let floats = |f: fn(&ObjectRecord) -> f32| -> Feature {
            Feature::from_f32_iter(objects.iter().map(f))
        };
        let flags = |f: fn(&ObjectRecord) -> bool| -> Feature {
            Feature::from_i64_list(objects.iter().map(|obj| f(obj) as i64).collect::<Vec<_>>())
        };
        let texts = |f: fn(&ObjectRecord) -> &str| -> Feature {
            Feature::from_bytes_iter(objects.iter().map(|obj| f(obj).as_bytes().to_vec()))
        };

        let features = vec![
            (IMAGE_HEIGHT, Feature::from_i64_list(vec![self.height])),
            (IMAGE_WIDTH, Feature::from_i64_list(vec![self.width])),
            (IMAGE_FILENAME, bytes_feature(self.filename.as_bytes())),
            (IMAGE_SOURCE_ID, bytes_feature(self.source_id.as_bytes())),
            (IMAGE_KEY_SHA256, bytes_feature(self.key_sha256.as_bytes())),
            (IMAGE_ENCODED, bytes_feature(&self.encoded)),
            (IMAGE_FORMAT, bytes_feature(self.format.as_bytes())),
            (OBJECT_BBOX_XMIN, floats(|obj| obj.xmin)),
            (OBJECT_BBOX_XMAX, floats(|obj| obj.xmax)),
            (OBJECT_BBOX_YMIN, floats(|obj| obj.ymin)),
            (OBJECT_BBOX_YMAX, floats(|obj| obj.ymax)),
            (OBJECT_AREA, floats(|obj| obj.area)),
            (OBJECT_CLASS_TEXT, texts(|obj| obj.class_text.as_str())),
            (
                OBJECT_CLASS_LABEL,
                Feature::from_i64_list(
                    objects
                        .iter()
                        .map(|obj| obj.class_label)
                        .collect::<Vec<_>>(),
                ),
            ),
            (OBJECT_DIFFICULT, flags(|obj| obj.difficult)),
            (OBJECT_TRUNCATED, flags(|obj| obj.truncated)),
            (OBJECT_VIEW, texts(|obj| obj.view.as_str())),
        ];

        features
            .into_iter()
            .map(|(key, feature)| (key.to_owned(), feature))
            .collect()
    }

    /// Parse a feature map back into a record.
    ///
    /// Fails if any key is missing or mistyped, if an image-level field is not
    /// a single value, or if the object lists disagree in length.
    pub fn from_example(example: &Example) -> Result<Self> {
        let num_objects = validate_example(example)?;

        let height = int64_scalar(example, IMAGE_HEIGHT)?;
        let width = int64_scalar(example, IMAGE_WIDTH)?;
        let filename = string_scalar(example, IMAGE_FILENAME)?;
        let source_id = string_scalar(example, IMAGE_SOURCE_ID)?;
        let key_sha256 = string_scalar(example, IMAGE_KEY_SHA256)?;
        let encoded = bytes_scalar(example, IMAGE_ENCODED)?.to_vec();
        let format = string_scalar(example, IMAGE_FORMAT)?;

        let xmin = float_list(example, OBJECT_BBOX_XMIN)?;
        let xmax = float_list(example, OBJECT_BBOX_XMAX)?;
        let ymin = float_list(example, OBJECT_BBOX_YMIN)?;
        let ymax = float_list(example, OBJECT_BBOX_YMAX)?;
        let area = float_list(example, OBJECT_AREA)?;
        let class_text = bytes_list(example, OBJECT_CLASS_TEXT)?;
        let class_label = int64_list(example, OBJECT_CLASS_LABEL)?;
        let difficult = int64_list(example, OBJECT_DIFFICULT)?;
        let truncated = int64_list(example, OBJECT_TRUNCATED)?;
        let view = bytes_list(example, OBJECT_VIEW)?;

        let objects: Vec<_> = (0..num_objects)
            .map(|index| -> Result<_> {
                Ok(ObjectRecord {
                    xmin: xmin[index],
                    xmax: xmax[index],
                    ymin: ymin[index],
                    ymax: ymax[index],
                    area: area[index],
                    class_text: to_string(&class_text[index], OBJECT_CLASS_TEXT)?,
                    class_label: class_label[index],
                    difficult: difficult[index] != 0,
                    truncated: truncated[index] != 0,
                    view: to_string(&view[index], OBJECT_VIEW)?,
                })
            })
            .try_collect()?;

        Ok(Self {
            height,
            width,
            filename,
            source_id,
            key_sha256,
            encoded,
            format,
            objects,
        })
    }
}

/// Check that all per-object lists have one common length and return it.
pub fn validate_example(example: &Example) -> Result<usize> {
    let lengths: Vec<(&str, usize)> = OBJECT_LIST_KEYS
        .iter()
        .map(|&key| -> Result<_> { Ok((key, feature_len(get_feature(example, key)?))) })
        .try_collect()?;

    let (_, expect) = lengths[0];
    if let Some((key, len)) = lengths.iter().find(|(_, len)| *len != expect) {
        bail!(
            "object list '{}' has {} entries, but '{}' has {}",
            key,
            len,
            OBJECT_LIST_KEYS[0],
            expect
        );
    }

    Ok(expect)
}

/// The number of values in a feature. A feature without a kind is empty.
fn feature_len(feature: &Feature) -> usize {
    match &feature.kind {
        Some(Kind::BytesList(list)) => list.value.len(),
        Some(Kind::FloatList(list)) => list.value.len(),
        Some(Kind::Int64List(list)) => list.value.len(),
        None => 0,
    }
}

fn bytes_feature(bytes: &[u8]) -> Feature {
    Feature::from_bytes_iter(std::iter::once(bytes.to_vec()))
}

fn feature_map(example: &Example) -> Result<&HashMap<String, Feature>> {
    example
        .features
        .as_ref()
        .map(|features| &features.feature)
        .ok_or_else(|| format_err!("the example has no features"))
}

fn get_feature<'a>(example: &'a Example, key: &str) -> Result<&'a Feature> {
    feature_map(example)?
        .get(key)
        .ok_or_else(|| format_err!("missing feature '{}'", key))
}

fn int64_list<'a>(example: &'a Example, key: &str) -> Result<&'a [i64]> {
    match &get_feature(example, key)?.kind {
        Some(Kind::Int64List(list)) => Ok(list.value.as_slice()),
        None => Ok(&[][..]),
        _ => bail!("feature '{}' is not an int64 list", key),
    }
}

fn float_list<'a>(example: &'a Example, key: &str) -> Result<&'a [f32]> {
    match &get_feature(example, key)?.kind {
        Some(Kind::FloatList(list)) => Ok(list.value.as_slice()),
        None => Ok(&[][..]),
        _ => bail!("feature '{}' is not a float list", key),
    }
}

fn bytes_list<'a>(example: &'a Example, key: &str) -> Result<&'a [Vec<u8>]> {
    match &get_feature(example, key)?.kind {
        Some(Kind::BytesList(list)) => Ok(list.value.as_slice()),
        None => Ok(&[][..]),
        _ => bail!("feature '{}' is not a bytes list", key),
    }
}

fn int64_scalar(example: &Example, key: &str) -> Result<i64> {
    match int64_list(example, key)? {
        [value] => Ok(*value),
        list => bail!("feature '{}' expects 1 value, but found {}", key, list.len()),
    }
}

fn bytes_scalar<'a>(example: &'a Example, key: &str) -> Result<&'a [u8]> {
    match bytes_list(example, key)? {
        [value] => Ok(value.as_slice()),
        list => bail!("feature '{}' expects 1 value, but found {}", key, list.len()),
    }
}

fn string_scalar(example: &Example, key: &str) -> Result<String> {
    to_string(bytes_scalar(example, key)?, key)
}

fn to_string(bytes: &[u8], key: &str) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .with_context(|| format!("feature '{}' is not valid UTF-8", key))
}
