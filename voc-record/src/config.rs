//! Conversion configuration format.

use crate::{common::*, label_map::LabelMap};

/// The year name that expands to every year of a format.
pub const MERGED_YEAR: &str = "merged";

const SYNTH_DR_YEARS: &[&str] = &["ESM2020", "ESM2020_test"];
const VOC_YEARS: &[&str] = &["VOC2007", "VOC2012"];

/// The main conversion configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// The layout of the source dataset.
    pub format: AnnotationFormat,
    /// The root directory containing one sub-directory per year.
    pub data_dir: PathBuf,
    /// The split to convert. Only VOC datasets have split lists.
    #[serde(default = "default_set")]
    pub set: DatasetSplit,
    /// The VOC annotations directory, relative to the year directory.
    #[serde(default = "default_annotations_dir")]
    pub annotations_dir: PathBuf,
    /// The VOC images directory, relative to the year directory.
    #[serde(default = "default_image_subdirectory")]
    pub image_subdirectory: PathBuf,
    /// A year directory name, or `merged` for all known years.
    pub year: String,
    /// The output prefix. Shards are named `<output_path>-00000-of-0000N.tfrecord`.
    pub output_path: PathBuf,
    /// Object settings file with `exported_object_classes`.
    #[serde(default)]
    pub label_map_json_path: Option<PathBuf>,
    /// Camera settings file providing the captured image size.
    #[serde(default)]
    pub camera_settings_json_path: Option<PathBuf>,
    #[serde(default)]
    pub ignore_difficult_instances: bool,
    #[serde(default = "default_num_shards")]
    pub num_shards: NonZeroUsize,
    /// The maximum number of images per year.
    #[serde(default)]
    pub num_images: Option<usize>,
    /// Synthetic objects more visible than this are flagged as truncated.
    #[serde(default = "default_visibility_thresh")]
    pub visibility_thresh: R64,
    /// The maximum number of records waiting to be written.
    #[serde(default)]
    pub worker_buf_size: Option<usize>,
}

impl ConvertConfig {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = std::fs::read_to_string(path)?;
        let config = json5::from_str(&text)?;
        Ok(config)
    }

    /// Check option values before touching the file system.
    pub fn validate(&self) -> Result<()> {
        let years = self.format.years();
        ensure!(
            self.year == MERGED_YEAR || years.contains(&self.year.as_str()),
            "year must be in {:?} or '{}', but get '{}'",
            years,
            MERGED_YEAR,
            self.year
        );
        ensure!(
            !self.output_path.as_os_str().is_empty(),
            "output_path cannot be empty"
        );
        ensure!(
            self.output_path.file_name().is_some(),
            "output_path '{}' must end with a file name prefix",
            self.output_path.display()
        );
        ensure!(
            self.visibility_thresh >= 0.0 && self.visibility_thresh <= 1.0,
            "visibility_thresh must be within [0, 1]"
        );
        if self.format == AnnotationFormat::Voc && self.camera_settings_json_path.is_some() {
            warn!("camera_settings_json_path is ignored for VOC datasets");
        }
        Ok(())
    }

    /// The year directories to convert, in order.
    pub fn years(&self) -> Vec<&str> {
        if self.year == MERGED_YEAR {
            self.format.years().to_vec()
        } else {
            vec![self.year.as_str()]
        }
    }

    pub fn year_dir(&self, year: &str) -> PathBuf {
        self.data_dir.join(year)
    }

    /// Load the label map file, or fall back to the format's built-in classes.
    pub fn label_map(&self) -> Result<LabelMap> {
        match &self.label_map_json_path {
            Some(path) => LabelMap::from_object_settings(path),
            None => Ok(self.format.default_label_map()),
        }
    }
}

/// The layout of the source dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationFormat {
    /// One JSON file per frame next to a `.jpg` of the same stem.
    SynthDr,
    /// PASCAL VOC `Annotations`, `JPEGImages` and `ImageSets/Main`.
    Voc,
}

impl AnnotationFormat {
    pub fn years(&self) -> &'static [&'static str] {
        match self {
            Self::SynthDr => SYNTH_DR_YEARS,
            Self::Voc => VOC_YEARS,
        }
    }

    pub fn default_label_map(&self) -> LabelMap {
        match self {
            Self::SynthDr => LabelMap::synthetic_default(),
            Self::Voc => LabelMap::pascal_voc(),
        }
    }
}

impl FromStr for AnnotationFormat {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let format = match text {
            "synth_dr" => Self::SynthDr,
            "voc" => Self::Voc,
            _ => bail!("format must be 'synth_dr' or 'voc', but get '{}'", text),
        };
        Ok(format)
    }
}

/// The dataset split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetSplit {
    Train,
    Val,
    Trainval,
    Test,
}

impl DatasetSplit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Val => "val",
            Self::Trainval => "trainval",
            Self::Test => "test",
        }
    }
}

impl FromStr for DatasetSplit {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let split = match text {
            "train" => Self::Train,
            "val" => Self::Val,
            "trainval" => Self::Trainval,
            "test" => Self::Test,
            _ => bail!(
                "set must be in [\"train\", \"val\", \"trainval\", \"test\"], but get '{}'",
                text
            ),
        };
        Ok(split)
    }
}

fn default_set() -> DatasetSplit {
    DatasetSplit::Train
}

fn default_annotations_dir() -> PathBuf {
    PathBuf::from("Annotations")
}

fn default_image_subdirectory() -> PathBuf {
    PathBuf::from("JPEGImages")
}

fn default_num_shards() -> NonZeroUsize {
    NonZeroUsize::new(1).unwrap()
}

fn default_visibility_thresh() -> R64 {
    r64(0.1)
}
