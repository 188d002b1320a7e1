//! The conversion pipeline.

use crate::{
    annotation::{load_synth_sample, load_voc_sample, SourceSample},
    camera::CameraSettings,
    coco::{coco_json_path, CocoAnnotations},
    common::*,
    config::{AnnotationFormat, ConvertConfig},
    dataset::list_annotation_files,
    features::{ImageRecord, ObjectRecord, JPEG_FORMAT},
    label_map::LabelMap,
    writer::{ShardInfo, ShardedWriter},
};

const DEFAULT_WORKER_BUF_SIZE: usize = 16;
const PROGRESS_INTERVAL: usize = 100;

/// The outcome of a finished conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertSummary {
    pub num_images: usize,
    pub num_objects: usize,
    /// Objects removed by `ignore_difficult_instances`.
    pub num_difficult_ignored: usize,
    pub shards: Vec<ShardInfo>,
    pub coco_json_path: PathBuf,
}

/// Convert the configured dataset into TFRecord shards and a COCO JSON file.
///
/// Samples are loaded concurrently but numbered in enumeration order, so the
/// `i`-th image always gets image id `i + 1` and lands in shard
/// `i % num_shards`.
pub async fn convert(config: Arc<ConvertConfig>) -> Result<ConvertSummary> {
    config.validate()?;

    // create output dir
    if let Some(output_dir) = config
        .output_path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
    {
        tokio::fs::create_dir_all(output_dir).await.with_context(|| {
            format!("failed to create directory '{}'", output_dir.display())
        })?;
        info!("writing to output directory '{}'", output_dir.display());
    }
    let coco_json_path = coco_json_path(&config.output_path)?;

    // load label map and camera settings
    let label_map = config.label_map()?;
    let image_size = match (config.format, &config.camera_settings_json_path) {
        (AnnotationFormat::SynthDr, Some(path)) => Some(CameraSettings::open(path)?.image_size()?),
        _ => None,
    };

    // start writer
    let (tx, rx) = flume::bounded::<(usize, Example)>(
        config.worker_buf_size.unwrap_or(DEFAULT_WORKER_BUF_SIZE),
    );
    let writer_handle = {
        let output_path = config.output_path.clone();
        let num_shards = config.num_shards;

        tokio::task::spawn_blocking(move || -> Result<_> {
            let mut writer = ShardedWriter::create(&output_path, num_shards)?;
            for (index, example) in rx.iter() {
                writer.write(index, example)?;
            }
            writer.finish()
        })
    };

    // load samples and feed the writer
    let produce_result = produce_records(config.clone(), &label_map, image_size, tx).await;

    // a writer failure closes the channel, so report it before the producer error
    let shards = writer_handle.await??;
    let (coco, counts) = produce_result?;

    {
        let path = coco_json_path.clone();
        tokio::task::spawn_blocking(move || coco.save(path)).await??;
    }

    info!(
        "converted {} images with {} objects into {} shards",
        counts.num_images,
        counts.num_objects,
        shards.len()
    );

    Ok(ConvertSummary {
        shards,
        coco_json_path,
        ..counts
    })
}

/// Load samples and send their examples to the writer. The returned summary
/// only carries the image and object counts.
async fn produce_records(
    config: Arc<ConvertConfig>,
    label_map: &LabelMap,
    image_size: Option<PixelSize>,
    tx: flume::Sender<(usize, Example)>,
) -> Result<(CocoAnnotations, ConvertSummary)> {
    let mut coco = CocoAnnotations::new(label_map);
    let mut counts = ConvertSummary::default();

    for year in config.years() {
        let files = {
            let config = config.clone();
            let year = year.to_owned();
            tokio::task::spawn_blocking(move || list_annotation_files(&config, &year)).await??
        };
        info!("found {} annotation files for '{}'", files.len(), year);

        let image_dir = config.year_dir(year).join(&config.image_subdirectory);
        let samples = stream::iter(files).par_then(None, {
            let config = config.clone();

            move |annotation_file| {
                let config = config.clone();
                let image_dir = image_dir.clone();

                async move {
                    match config.format {
                        AnnotationFormat::SynthDr => {
                            load_synth_sample(annotation_file, image_size, config.visibility_thresh)
                                .await
                        }
                        AnnotationFormat::Voc => {
                            load_voc_sample(annotation_file, image_dir).await
                        }
                    }
                }
            }
        });
        futures::pin_mut!(samples);

        let mut year_index = 0;
        while let Some(sample) = samples.next().await {
            let mut sample = sample?;

            if year_index % PROGRESS_INTERVAL == 0 {
                info!("on image {} of '{}'", year_index, year);
            }
            if config.ignore_difficult_instances {
                counts.num_difficult_ignored += sample.drop_difficult();
            }

            let record = build_record(sample, label_map, &mut coco)?;
            counts.num_objects += record.num_objects();

            tx.send_async((counts.num_images, record.to_example()))
                .await
                .map_err(|_| format_err!("the record writer stopped unexpectedly"))?;
            counts.num_images += 1;
            year_index += 1;
        }
    }

    Ok((coco, counts))
}

/// Assign the next image id, normalize boxes and register COCO entries.
fn build_record(
    sample: SourceSample,
    label_map: &LabelMap,
    coco: &mut CocoAnnotations,
) -> Result<ImageRecord> {
    let SourceSample {
        annotation_file,
        filename,
        image,
        size,
        objects,
        ..
    } = sample;
    let float_size: HW<f64> = size
        .try_cast()
        .ok_or_else(|| format_err!("invalid image size {:?}", size))?;
    let image_id = coco.add_image(&filename, &size);

    let objects: Vec<_> = objects
        .iter()
        .map(|object| -> Result<_> {
            let class_label = label_map.id_of(object.class_name()).with_context(|| {
                format!("invalid annotation file '{}'", annotation_file.display())
            })?;
            let normalized = object.normalize(&float_size).with_context(|| {
                format!("invalid annotation file '{}'", annotation_file.display())
            })?;
            coco.add_object(image_id, object, class_label);
            Ok(ObjectRecord::from_label(&normalized, class_label))
        })
        .try_collect()?;

    Ok(ImageRecord {
        height: size.h() as i64,
        width: size.w() as i64,
        filename,
        source_id: image_id.to_string(),
        key_sha256: image.key_sha256,
        encoded: image.encoded,
        format: JPEG_FORMAT.to_owned(),
        objects,
    })
}
