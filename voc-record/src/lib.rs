//! Export annotated detection datasets into TFRecord files.
//!
//! Each image becomes one `Example` following the PASCAL VOC key layout
//! (see [features]). A COCO-style annotation JSON is written next to the
//! record shards.

mod common;

pub mod annotation;
pub mod camera;
pub mod coco;
pub mod config;
pub mod convert;
pub mod dataset;
pub mod features;
pub mod label_map;
pub mod reader;
pub mod writer;

pub use config::{AnnotationFormat, ConvertConfig, DatasetSplit};
pub use convert::{convert, ConvertSummary};
pub use features::{validate_example, ImageRecord, ObjectRecord};
pub use label_map::LabelMap;
