//! Sharded TFRecord output.

use crate::common::*;
use std::{fs::File, io::BufWriter};
use tfrecord::ExampleWriter;

/// The file names of all shards of an output prefix.
///
/// Shard `i` of `n` is named `<output_path>-{i:05}-of-{n:05}.tfrecord`.
pub fn shard_paths(output_path: &Path, num_shards: NonZeroUsize) -> Vec<PathBuf> {
    let num_shards = num_shards.get();
    (0..num_shards)
        .map(|index| {
            let mut name = output_path.as_os_str().to_owned();
            name.push(format!("-{:05}-of-{:05}.tfrecord", index, num_shards));
            PathBuf::from(name)
        })
        .collect()
}

/// The number of records written to one shard file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardInfo {
    pub path: PathBuf,
    pub num_records: usize,
}

/// Writes examples round-robin over a fixed set of shard files.
pub struct ShardedWriter {
    shards: Vec<Shard>,
}

struct Shard {
    path: PathBuf,
    writer: ExampleWriter<BufWriter<File>>,
    num_records: usize,
}

impl Debug for ShardedWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let paths: Vec<_> = self.shards.iter().map(|shard| &shard.path).collect();
        f.debug_struct("ShardedWriter")
            .field("shards", &paths)
            .finish()
    }
}

impl ShardedWriter {
    /// Create or truncate every shard file of the prefix.
    pub fn create(output_path: impl AsRef<Path>, num_shards: NonZeroUsize) -> Result<Self> {
        let shards: Vec<_> = shard_paths(output_path.as_ref(), num_shards)
            .into_iter()
            .map(|path| -> Result<_> {
                let writer = ExampleWriter::create(&path)
                    .with_context(|| format!("failed to create '{}'", path.display()))?;
                Ok(Shard {
                    path,
                    writer,
                    num_records: 0,
                })
            })
            .try_collect()?;

        Ok(Self { shards })
    }

    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    /// Write the example of the `index`-th image to shard `index % num_shards`.
    pub fn write(&mut self, index: usize, example: Example) -> Result<()> {
        let num_shards = self.shards.len();
        let shard = &mut self.shards[index % num_shards];
        shard
            .writer
            .send(example)
            .with_context(|| format!("failed to write to '{}'", shard.path.display()))?;
        shard.num_records += 1;
        Ok(())
    }

    /// Flush and close all shards.
    pub fn finish(self) -> Result<Vec<ShardInfo>> {
        self.shards
            .into_iter()
            .map(|shard| -> Result<_> {
                let Shard {
                    path,
                    mut writer,
                    num_records,
                } = shard;
                writer
                    .flush()
                    .with_context(|| format!("failed to flush '{}'", path.display()))?;
                debug!("closed '{}' with {} records", path.display(), num_records);
                Ok(ShardInfo { path, num_records })
            })
            .try_collect()
    }
}
