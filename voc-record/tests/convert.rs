use anyhow::Result;
use approx::assert_abs_diff_eq;
use sha2::{Digest, Sha256};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use voc_record::{
    coco::CocoAnnotations, convert, features::JPEG_FORMAT, reader::open_records, ConvertConfig,
    ImageRecord,
};

fn write_jpeg(path: &Path, width: u32, height: u32) {
    image::RgbImage::new(width, height).save(path).unwrap();
}

fn write_frame(year_dir: &Path, stem: &str, objects: &str) {
    fs::write(
        year_dir.join(format!("{}.json", stem)),
        format!(r#"{{ "camera_data": {{}}, "objects": [{}] }}"#, objects),
    )
    .unwrap();
    write_jpeg(&year_dir.join(format!("{}.jpg", stem)), 64, 48);
}

fn synth_object(class: &str, visibility: f64, tlbr: [f64; 4]) -> String {
    let [t, l, b, r] = tlbr;
    format!(
        r#"{{ "class": "{}", "visibility": {}, "bounding_box": {{ "top_left": [{}, {}], "bottom_right": [{}, {}] }} }}"#,
        class, visibility, t, l, b, r
    )
}

fn synth_dataset(root: &Path) -> PathBuf {
    let year_dir = root.join("data").join("ESM2020");
    fs::create_dir_all(&year_dir).unwrap();

    fs::write(
        year_dir.join("_object_settings.json"),
        r#"{ "exported_object_classes": ["Mask", "Hat"], "exported_objects": [] }"#,
    )
    .unwrap();
    fs::write(
        year_dir.join("_camera_settings.json"),
        r#"{ "camera_settings": [{ "name": "Viewpoint", "captured_image_size": { "width": 64, "height": 48 } }] }"#,
    )
    .unwrap();

    write_frame(
        &year_dir,
        "000000",
        &[
            synth_object("Mask", 0.9, [12.0, 16.0, 24.0, 48.0]),
            synth_object("Hat", 0.05, [0.0, 0.0, 48.0, 64.0]),
        ]
        .join(", "),
    );
    write_frame(&year_dir, "000001", "");
    write_frame(
        &year_dir,
        "000002",
        &synth_object("Hat", 0.5, [6.0, 8.0, 18.0, 40.0]),
    );

    year_dir
}

fn synth_config(root: &Path, year_dir: &Path, num_shards: usize) -> ConvertConfig {
    let mut config: ConvertConfig = json5::from_str(&format!(
        r#"{{
            format: "synth_dr",
            data_dir: "",
            year: "ESM2020",
            output_path: "",
            num_shards: {},
        }}"#,
        num_shards
    ))
    .unwrap();
    config.data_dir = root.join("data");
    config.output_path = root.join("out").join("esm");
    config.label_map_json_path = Some(year_dir.join("_object_settings.json"));
    config.camera_settings_json_path = Some(year_dir.join("_camera_settings.json"));
    config
}

fn read_all(paths: &[PathBuf]) -> Result<Vec<Vec<ImageRecord>>> {
    paths
        .iter()
        .map(|path| -> Result<Vec<ImageRecord>> { open_records(path)?.collect() })
        .collect()
}

#[tokio::test]
async fn convert_synthetic_dataset() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let year_dir = synth_dataset(dir.path());
    let config = synth_config(dir.path(), &year_dir, 2);

    let summary = convert(Arc::new(config)).await?;
    assert_eq!(summary.num_images, 3);
    assert_eq!(summary.num_objects, 3);
    assert_eq!(summary.shards.len(), 2);
    assert!(summary.shards[0].path.ends_with("esm-00000-of-00002.tfrecord"));
    assert_eq!(summary.shards[0].num_records, 2);
    assert_eq!(summary.shards[1].num_records, 1);

    let paths: Vec<_> = summary.shards.iter().map(|shard| shard.path.clone()).collect();
    let shards = read_all(&paths)?;
    let source_ids: Vec<Vec<_>> = shards
        .iter()
        .map(|records| records.iter().map(|r| r.source_id.as_str()).collect())
        .collect();
    assert_eq!(source_ids, vec![vec!["1", "3"], vec!["2"]]);

    // first frame
    let record = &shards[0][0];
    assert_eq!((record.height, record.width), (48, 64));
    assert_eq!(record.format, JPEG_FORMAT);
    assert_eq!(record.key_sha256, hex::encode(Sha256::digest(&record.encoded)));
    assert_eq!(
        record.encoded,
        fs::read(year_dir.join("000000.jpg"))?,
        "image bytes are stored verbatim"
    );
    assert!(record.filename.ends_with("000000.jpg"));
    assert_eq!(record.num_objects(), 2);

    let mask = &record.objects[0];
    assert_eq!(mask.class_text, "Mask");
    assert_eq!(mask.class_label, 1);
    assert_abs_diff_eq!(mask.ymin, 0.25);
    assert_abs_diff_eq!(mask.xmin, 0.25);
    assert_abs_diff_eq!(mask.ymax, 0.5);
    assert_abs_diff_eq!(mask.xmax, 0.75);
    assert_abs_diff_eq!(mask.area, 0.125);
    assert!(mask.truncated);
    assert!(!mask.difficult);
    assert_eq!(mask.view, "Frontal");

    let hat = &record.objects[1];
    assert_eq!(hat.class_label, 2);
    assert!(!hat.truncated);
    assert_abs_diff_eq!(hat.area, 1.0);

    // empty frame keeps empty but aligned lists
    assert_eq!(shards[1][0].num_objects(), 0);

    // COCO JSON
    assert_eq!(
        summary.coco_json_path,
        dir.path().join("out").join("json_esm.json")
    );
    let coco: CocoAnnotations =
        serde_json::from_str(&fs::read_to_string(&summary.coco_json_path)?)?;
    assert_eq!(coco.kind, "instances");
    assert_eq!(coco.images.len(), 3);
    assert_eq!(coco.categories.len(), 3);
    let ids: Vec<_> = coco.annotations.iter().map(|ann| (ann.id, ann.image_id)).collect();
    assert_eq!(ids, vec![(1, 1), (2, 1), (3, 3)]);
    assert_eq!(coco.annotations[0].bbox, [16, 12, 32, 12]);
    assert_eq!(coco.annotations[0].area, 384);

    Ok(())
}

#[tokio::test]
async fn num_images_limits_each_year() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let year_dir = synth_dataset(dir.path());
    let mut config = synth_config(dir.path(), &year_dir, 1);
    config.num_images = Some(2);
    config.camera_settings_json_path = None;

    let summary = convert(Arc::new(config)).await?;
    assert_eq!(summary.num_images, 2);

    let records = read_all(&[summary.shards[0].path.clone()])?.remove(0);
    assert_eq!(records.len(), 2);
    // size comes from the JPEG header without camera settings
    assert_eq!((records[0].height, records[0].width), (48, 64));

    Ok(())
}

#[tokio::test]
async fn merged_years_share_ids_and_shards() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let year_dir = synth_dataset(dir.path());
    let test_dir = dir.path().join("data").join("ESM2020_test");
    fs::create_dir_all(&test_dir)?;
    write_frame(&test_dir, "000000", &synth_object("Hat", 0.5, [0.0, 0.0, 24.0, 32.0]));
    write_frame(&test_dir, "000001", &synth_object("Mask", 0.5, [24.0, 32.0, 48.0, 64.0]));
    write_frame(&test_dir, "000002", &synth_object("Mask", 0.5, [0.0, 0.0, 8.0, 8.0]));

    let mut config = synth_config(dir.path(), &year_dir, 3);
    config.year = "merged".to_owned();
    config.num_images = Some(2);

    let summary = convert(Arc::new(config)).await?;
    assert_eq!(summary.num_images, 4);
    assert_eq!(summary.num_objects, 4);

    // the shard index keeps counting after the first year
    let paths: Vec<_> = summary.shards.iter().map(|shard| shard.path.clone()).collect();
    let shards = read_all(&paths)?;
    let source_ids: Vec<Vec<_>> = shards
        .iter()
        .map(|records| records.iter().map(|r| r.source_id.as_str()).collect())
        .collect();
    assert_eq!(source_ids, vec![vec!["1", "4"], vec!["2"], vec!["3"]]);
    assert!(shards[2][0]
        .filename
        .ends_with(&format!("ESM2020_test{}000000.jpg", std::path::MAIN_SEPARATOR)));
    assert_eq!(shards[0][1].objects[0].class_text, "Mask");

    let coco: CocoAnnotations =
        serde_json::from_str(&fs::read_to_string(&summary.coco_json_path)?)?;
    let image_ids: Vec<_> = coco.images.iter().map(|image| image.id).collect();
    assert_eq!(image_ids, vec![1, 2, 3, 4]);
    let ids: Vec<_> = coco.annotations.iter().map(|ann| (ann.id, ann.image_id)).collect();
    assert_eq!(ids, vec![(1, 1), (2, 1), (3, 3), (4, 4)]);
    assert_eq!(coco.categories.len(), 3);

    Ok(())
}

#[tokio::test]
async fn unknown_class_fails() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let year_dir = synth_dataset(dir.path());
    write_frame(
        &year_dir,
        "000003",
        &synth_object("Boots", 1.0, [0.0, 0.0, 1.0, 1.0]),
    );
    let config = synth_config(dir.path(), &year_dir, 1);

    let err = convert(Arc::new(config)).await.unwrap_err();
    assert!(format!("{:#}", err).contains("Boots"));
    Ok(())
}

#[tokio::test]
async fn non_jpeg_image_fails() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let year_dir = synth_dataset(dir.path());
    image::RgbImage::new(8, 8)
        .save_with_format(year_dir.join("000001.jpg"), image::ImageFormat::Png)?;
    let config = synth_config(dir.path(), &year_dir, 1);

    let err = convert(Arc::new(config)).await.unwrap_err();
    assert!(format!("{:#}", err).contains("000001.jpg"));
    Ok(())
}

#[tokio::test]
async fn convert_voc_dataset() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let year_dir = dir.path().join("VOCdevkit").join("VOC2007");
    for sub in ["Annotations", "JPEGImages", "ImageSets/Main"] {
        fs::create_dir_all(year_dir.join(sub))?;
    }
    fs::write(year_dir.join("ImageSets/Main/val.txt"), "000005\n")?;
    write_jpeg(&year_dir.join("JPEGImages/000005.jpg"), 100, 50);
    fs::write(
        year_dir.join("Annotations/000005.xml"),
        r#"<annotation>
            <folder>VOC2007</folder>
            <filename>000005.jpg</filename>
            <size><width>100</width><height>50</height><depth>3</depth></size>
            <segmented>0</segmented>
            <object>
                <name>chair</name>
                <pose>Rear</pose>
                <truncated>0</truncated>
                <difficult>0</difficult>
                <bndbox><xmin>10</xmin><ymin>5</ymin><xmax>60</xmax><ymax>45</ymax></bndbox>
            </object>
            <object>
                <name>chair</name>
                <pose>Unspecified</pose>
                <truncated>1</truncated>
                <difficult>1</difficult>
                <bndbox><xmin>70</xmin><ymin>10</ymin><xmax>90</xmax><ymax>30</ymax></bndbox>
            </object>
        </annotation>"#,
    )?;

    let mut config: ConvertConfig = json5::from_str(
        r#"{ format: "voc", data_dir: "", set: "val", year: "VOC2007", output_path: "" }"#,
    )?;
    config.data_dir = dir.path().join("VOCdevkit");
    config.output_path = dir.path().join("pascal");
    config.ignore_difficult_instances = true;

    let summary = convert(Arc::new(config)).await?;
    assert_eq!(summary.num_images, 1);
    assert_eq!(summary.num_objects, 1);
    assert_eq!(summary.num_difficult_ignored, 1);

    let records = read_all(&[summary.shards[0].path.clone()])?.remove(0);
    let record = &records[0];
    assert_eq!(record.filename, "000005.jpg");
    assert_eq!((record.height, record.width), (50, 100));

    let chair = &record.objects[0];
    assert_eq!(chair.class_label, 9);
    assert_eq!(chair.view, "Rear");
    assert_abs_diff_eq!(chair.xmin, 0.1);
    assert_abs_diff_eq!(chair.ymin, 0.1);
    assert_abs_diff_eq!(chair.xmax, 0.6);
    assert_abs_diff_eq!(chair.ymax, 0.9);

    Ok(())
}
