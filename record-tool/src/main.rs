use anyhow::{format_err, Context, Result};
use clap::Parser;
use itertools::Itertools;
use noisy_float::prelude::*;
use prettytable::{cell, row, Table};
use std::{
    env,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter};
use voc_record::{reader::open_records, AnnotationFormat, ConvertConfig, DatasetSplit};

#[derive(Debug, Clone, Parser)]
/// Export detection datasets to TFRecord files and inspect the results.
enum Opts {
    /// Convert a dataset into TFRecord shards and a COCO JSON file
    Create(CreateArgs),
    /// Print the records of TFRecord files
    Info {
        /// TFRecord files
        #[clap(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Debug, Clone, clap::Args)]
struct CreateArgs {
    /// json5 configuration file. Other options are ignored when it is given.
    #[clap(long)]
    config: Option<PathBuf>,
    /// dataset layout, 'synth_dr' or 'voc'
    #[clap(long, default_value = "synth_dr")]
    format: AnnotationFormat,
    /// root directory of the raw dataset
    #[clap(long)]
    data_dir: Option<PathBuf>,
    /// split to convert: train, val, trainval or test
    #[clap(long, default_value = "train")]
    set: DatasetSplit,
    /// (relative) path to the annotations directory
    #[clap(long, default_value = "Annotations")]
    annotations_dir: PathBuf,
    /// (relative) path to the images directory
    #[clap(long, default_value = "JPEGImages")]
    image_subdirectory: PathBuf,
    /// year directory, or 'merged'
    #[clap(long, default_value = "ESM2020")]
    year: String,
    /// output prefix of TFRecord shards and the COCO JSON file
    #[clap(long)]
    output_path: Option<PathBuf>,
    /// object settings file with 'exported_object_classes'
    #[clap(long)]
    label_map_json_path: Option<PathBuf>,
    /// camera settings file with the captured image size
    #[clap(long)]
    camera_settings_json_path: Option<PathBuf>,
    /// skip objects flagged as difficult
    #[clap(long)]
    ignore_difficult_instances: bool,
    /// number of output shards
    #[clap(long, default_value = "1")]
    num_shards: NonZeroUsize,
    /// maximum number of images per year
    #[clap(long)]
    num_images: Option<usize>,
    /// synthetic objects more visible than this are flagged as truncated
    #[clap(long, default_value = "0.1")]
    visibility_thresh: f64,
}

impl CreateArgs {
    fn into_config(self) -> Result<ConvertConfig> {
        if let Some(path) = &self.config {
            return ConvertConfig::open(path)
                .with_context(|| format!("failed to load config file '{}'", path.display()));
        }

        let Self {
            format,
            data_dir,
            set,
            annotations_dir,
            image_subdirectory,
            year,
            output_path,
            label_map_json_path,
            camera_settings_json_path,
            ignore_difficult_instances,
            num_shards,
            num_images,
            visibility_thresh,
            ..
        } = self;

        Ok(ConvertConfig {
            format,
            data_dir: data_dir.ok_or_else(|| format_err!("--data-dir is required"))?,
            set,
            annotations_dir,
            image_subdirectory,
            year,
            output_path: output_path.ok_or_else(|| format_err!("--output-path is required"))?,
            label_map_json_path,
            camera_settings_json_path,
            ignore_difficult_instances,
            num_shards,
            num_images,
            visibility_thresh: R64::try_new(visibility_thresh)
                .ok_or_else(|| format_err!("--visibility-thresh must be a finite number"))?,
            worker_buf_size: None,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // setup tracing
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true).compact();
    let filter_layer = {
        let filter = EnvFilter::from_default_env();
        if env::var("RUST_LOG").is_err() {
            filter.add_directive(LevelFilter::INFO.into())
        } else {
            filter
        }
    };
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    match Opts::parse() {
        Opts::Create(args) => create(args).await?,
        Opts::Info { files } => files.iter().try_for_each(info)?,
    }

    Ok(())
}

async fn create(args: CreateArgs) -> Result<()> {
    let config = Arc::new(args.into_config()?);
    let summary = voc_record::convert(config).await?;

    summary.shards.iter().for_each(|shard| {
        info!(
            "wrote {} records to '{}'",
            shard.num_records,
            shard.path.display()
        );
    });
    if summary.num_difficult_ignored > 0 {
        info!("ignored {} difficult objects", summary.num_difficult_ignored);
    }
    info!(
        "wrote COCO annotations to '{}'",
        summary.coco_json_path.display()
    );

    Ok(())
}

fn info(file: impl AsRef<Path>) -> Result<()> {
    let file = file.as_ref();
    let mut table = Table::new();
    table.add_row(row![
        "index",
        "source_id",
        "filename",
        "size (h x w)",
        "objects",
        "classes"
    ]);

    println!("{}", file.display());

    let mut num_records = 0;
    for (index, record) in open_records(file)?.enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                // show the records read before the failure
                table.printstd();
                return Err(err);
            }
        };
        let classes = record
            .objects
            .iter()
            .map(|obj| format!("{}({})", obj.class_text, obj.class_label))
            .join(", ");

        table.add_row(row![
            index,
            record.source_id,
            record.filename,
            format!("{} x {}", record.height, record.width),
            record.num_objects(),
            classes
        ]);
        num_records += 1;
    }

    table.printstd();
    println!("{} records", num_records);

    Ok(())
}
