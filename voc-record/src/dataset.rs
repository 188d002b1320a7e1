//! Annotation file enumeration.

use crate::{
    common::*,
    config::{AnnotationFormat, ConvertConfig},
};

/// List annotation files of one year directory in conversion order,
/// truncated to `num_images`.
pub fn list_annotation_files(config: &ConvertConfig, year: &str) -> Result<Vec<PathBuf>> {
    let year_dir = config.year_dir(year);
    ensure!(
        year_dir.is_dir(),
        "the dataset directory '{}' does not exist",
        year_dir.display()
    );

    let mut files = match config.format {
        AnnotationFormat::SynthDr => list_synth_files(&year_dir)?,
        AnnotationFormat::Voc => {
            let list_file = year_dir
                .join("ImageSets")
                .join("Main")
                .join(format!("{}.txt", config.set.as_str()));
            let annotations_dir = year_dir.join(&config.annotations_dir);
            list_voc_files(&list_file, &annotations_dir)?
        }
    };

    if let Some(num_images) = config.num_images {
        files.truncate(num_images);
    }

    Ok(files)
}

/// Frame annotations are the `*.json` files sorted by name. Files starting
/// with `_` hold object and camera settings and are skipped.
fn list_synth_files(year_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries: Vec<_> = fs::read_dir(year_dir)
        .with_context(|| format!("failed to list directory '{}'", year_dir.display()))?
        .map(|entry| -> Result<_> {
            let entry = entry?;
            let name = entry.file_name();
            let name = match name.to_str() {
                Some(name) => name,
                None => {
                    warn!("ignore non UTF-8 file name {:?}", name);
                    return Ok(None);
                }
            };
            let is_frame = entry.file_type()?.is_file()
                && name.ends_with(".json")
                && !name.starts_with('_');
            Ok(is_frame.then(|| (name.to_owned(), entry.path())))
        })
        .filter_map(|result| result.transpose())
        .try_collect()?;

    entries.sort_by(|(lhs, _), (rhs, _)| lhs.cmp(rhs));
    Ok(entries.into_iter().map(|(_, path)| path).collect())
}

/// Image ids come from the split list, one per line.
fn list_voc_files(list_file: &Path, annotations_dir: &Path) -> Result<Vec<PathBuf>> {
    let text = fs::read_to_string(list_file)
        .with_context(|| format!("failed to read split file '{}'", list_file.display()))?;

    let files = text
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(|id| annotations_dir.join(format!("{}.xml", id)))
        .collect();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(format: &str, data_dir: &Path, year: &str) -> ConvertConfig {
        let mut config: ConvertConfig = json5::from_str(&format!(
            r#"{{ format: "{}", data_dir: "", year: "{}", output_path: "out" }}"#,
            format, year
        ))
        .unwrap();
        config.data_dir = data_dir.to_owned();
        config
    }

    #[test]
    fn synth_files_are_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let year_dir = dir.path().join("ESM2020");
        fs::create_dir(&year_dir).unwrap();
        for name in [
            "000002.json",
            "000000.json",
            "000001.json",
            "000000.jpg",
            "_object_settings.json",
            "_camera_settings.json",
        ] {
            fs::write(year_dir.join(name), "{}").unwrap();
        }
        fs::create_dir(year_dir.join("nested.json")).unwrap();

        let mut config = config("synth_dr", dir.path(), "ESM2020");
        let files = list_annotation_files(&config, "ESM2020").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|path| path.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["000000.json", "000001.json", "000002.json"]);

        config.num_images = Some(2);
        let files = list_annotation_files(&config, "ESM2020").unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[1].ends_with("000001.json"));
    }

    #[test]
    fn voc_files_follow_split_list() {
        let dir = tempfile::tempdir().unwrap();
        let main_dir = dir.path().join("VOC2012").join("ImageSets").join("Main");
        fs::create_dir_all(&main_dir).unwrap();
        fs::write(main_dir.join("train.txt"), "2008_000008\n2008_000015  1\n\n").unwrap();

        let config = config("voc", dir.path(), "VOC2012");
        let files = list_annotation_files(&config, "VOC2012").unwrap();
        assert_eq!(
            files,
            vec![
                dir.path()
                    .join("VOC2012")
                    .join("Annotations")
                    .join("2008_000008.xml"),
                dir.path()
                    .join("VOC2012")
                    .join("Annotations")
                    .join("2008_000015.xml"),
            ]
        );
    }

    #[test]
    fn missing_year_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = config("synth_dr", dir.path(), "ESM2020");
        assert!(list_annotation_files(&config, "ESM2020").is_err());
    }
}
