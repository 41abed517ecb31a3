//! Input enumeration and clustered output placement.

use crate::types::Cluster;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions the loader knows how to decode.
const IMAGE_EXTENSIONS: &[&str] = &["bmp", "gif", "jpeg", "jpg", "png", "tif", "tiff", "webp"];

/// Enumerate image files under `dir`, sorted for a deterministic input set.
pub fn list_images(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut walker = WalkDir::new(dir);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut paths = Vec::new();
    for entry in walker {
        let entry =
            entry.with_context(|| format!("failed to read directory {}", dir.display()))?;
        if entry.file_type().is_file() && has_image_extension(entry.path()) {
            paths.push(entry.into_path());
        }
    }

    paths.sort();
    Ok(paths)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Place every clustered file into a numbered subdirectory of `output_dir`,
/// one per cluster. Files are moved unless `keep_originals` is set, in
/// which case they are copied. Returns the number of files placed.
pub fn sort_into_directories(
    clusters: &[Cluster],
    output_dir: &Path,
    keep_originals: bool,
) -> Result<usize> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let mut placed = 0;
    for (index, cluster) in clusters.iter().enumerate() {
        let destination = output_dir.join(index.to_string());
        fs::create_dir_all(&destination)
            .with_context(|| format!("failed to create {}", destination.display()))?;

        for record in &cluster.records {
            let Some(name) = record.path.file_name() else {
                continue;
            };
            let target = destination.join(name);

            if keep_originals {
                fs::copy(&record.path, &target).with_context(|| {
                    format!("failed to copy {} to {}", record.path.display(), target.display())
                })?;
            } else {
                move_file(&record.path, &target)?;
            }
            placed += 1;
        }
    }

    Ok(placed)
}

/// Rename, falling back to copy+remove when source and target sit on
/// different filesystems.
fn move_file(source: &Path, target: &Path) -> Result<()> {
    if fs::rename(source, target).is_ok() {
        return Ok(());
    }

    fs::copy(source, target).with_context(|| {
        format!("failed to copy {} to {}", source.display(), target.display())
    })?;
    fs::remove_file(source)
        .with_context(|| format!("failed to remove {}", source.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FeatureRecord;

    fn touch(path: &Path) {
        fs::write(path, b"x").unwrap();
    }

    fn record(path: PathBuf) -> FeatureRecord {
        FeatureRecord {
            path,
            vector: Vec::new(),
        }
    }

    #[test]
    fn test_list_images_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b.png"));
        touch(&dir.path().join("a.JPG"));
        touch(&dir.path().join("notes.txt"));

        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        touch(&nested.join("c.png"));

        let flat = list_images(dir.path(), false).unwrap();
        let names: Vec<_> = flat
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.JPG", "b.png"]);

        let recursive = list_images(dir.path(), true).unwrap();
        assert_eq!(recursive.len(), 3);
    }

    #[test]
    fn test_sort_into_directories_moves_files() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();

        let first = input.path().join("one.png");
        let second = input.path().join("two.png");
        touch(&first);
        touch(&second);

        let clusters = vec![
            Cluster {
                records: vec![record(first.clone())],
            },
            Cluster {
                records: vec![record(second.clone())],
            },
        ];

        let placed = sort_into_directories(&clusters, output.path(), false).unwrap();
        assert_eq!(placed, 2);
        assert!(output.path().join("0").join("one.png").exists());
        assert!(output.path().join("1").join("two.png").exists());
        assert!(!first.exists());
        assert!(!second.exists());
    }

    #[test]
    fn test_sort_into_directories_copies_when_keeping_originals() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();

        let source = input.path().join("keep.png");
        touch(&source);

        let clusters = vec![Cluster {
            records: vec![record(source.clone())],
        }];

        sort_into_directories(&clusters, output.path(), true).unwrap();
        assert!(source.exists());
        assert!(output.path().join("0").join("keep.png").exists());
    }
}
