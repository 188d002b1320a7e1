//! Reading back exported TFRecord files.

use crate::{common::*, features::ImageRecord};
use tfrecord::{ExampleIter, RecordReaderConfig};

/// Iterate the records of one TFRecord file, validating each one.
pub fn open_records(path: impl AsRef<Path>) -> Result<impl Iterator<Item = Result<ImageRecord>>> {
    let path = path.as_ref().to_owned();
    let reader = ExampleIter::open(&path, RecordReaderConfig::default())
        .with_context(|| format!("failed to open '{}'", path.display()))?;

    let records = reader.enumerate().map(move |(index, result)| -> Result<_> {
        let example = result.with_context(|| {
            format!("failed to read record {} of '{}'", index, path.display())
        })?;
        ImageRecord::from_example(&example)
            .with_context(|| format!("invalid record {} in '{}'", index, path.display()))
    });
    Ok(records)
}
