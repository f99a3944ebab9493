//! Image-folder import for small hand-drawn symbol sets.
//!
//! Files are named `<category>_<anything>.png`. Categories are numbered in
//! the order they are first seen after sorting file names.

use std::path::{Path, PathBuf};

use crate::data::dataset::{one_hot, Dataset};
use crate::error::DataError;
use crate::network::spec::InputShape;

/// Decodes image bytes, resizes to `width × height`, converts to grayscale
/// and inverts, so dark strokes on a light background become high values.
///
/// Returns a flat `Vec<f64>` of length `width * height` in `[0, 1]`.
pub fn image_bytes_to_inverted_input(bytes: &[u8], width: u32, height: u32) -> Result<Vec<f64>, String> {
    let img = image::load_from_memory(bytes).map_err(|e| e.to_string())?;
    let resized = img.resize_exact(width, height, image::imageops::FilterType::Triangle);
    let gray = resized.to_luma8();
    Ok(gray.pixels().map(|p| (255 - p.0[0]) as f64 / 255.0).collect())
}

/// Category name of a file: the file-name prefix before the first `_`.
pub fn category_of(path: &Path) -> String {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    stem.split('_').next().unwrap_or(stem).to_owned()
}

fn png_files(dir: &Path) -> Result<Vec<PathBuf>, DataError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("png")))
        .collect();
    files.sort();
    Ok(files)
}

/// Imports every `*.png` in `dir` as a single-channel dataset of `shape`.
///
/// `categories` seeds the category list (pass the training categories when
/// importing a test folder so indices agree); new names are appended.
/// Returns the dataset and the final category list.
pub fn import_images(
    dir: &Path,
    shape: InputShape,
    n_classes: usize,
    mut categories: Vec<String>,
) -> Result<(Dataset, Vec<String>), DataError> {
    let files = png_files(dir)?;
    if files.is_empty() {
        return Err(DataError::Empty(dir.display().to_string()));
    }

    let mut inputs = Vec::with_capacity(files.len());
    let mut labels = Vec::with_capacity(files.len());
    for path in &files {
        let bytes = std::fs::read(path)?;
        let pixels = image_bytes_to_inverted_input(&bytes, shape.width as u32, shape.height as u32)
            .map_err(|reason| DataError::Image { path: path.display().to_string(), reason })?;

        let category = category_of(path);
        let label = match categories.iter().position(|c| *c == category) {
            Some(i) => i,
            None => {
                categories.push(category);
                categories.len() - 1
            }
        };
        if label >= n_classes {
            return Err(DataError::Inconsistent(format!(
                "{} introduces category #{} but only {n_classes} classes are configured",
                path.display(),
                label + 1
            )));
        }
        inputs.push(pixels);
        labels.push(one_hot(label, n_classes));
    }

    let dataset = Dataset::new(inputs, labels, InputShape::new(shape.height, shape.width, 1), n_classes)?;
    Ok((dataset, categories))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn write_png(dir: &Path, name: &str, value: u8) {
        let img = GrayImage::from_pixel(8, 8, Luma([value]));
        img.save(dir.join(name)).unwrap();
    }

    #[test]
    fn test_category_of() {
        assert_eq!(category_of(Path::new("data/alpha_001.png")), "alpha");
        assert_eq!(category_of(Path::new("beta.png")), "beta");
    }

    #[test]
    fn test_import_labels_in_first_seen_order() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "beta_1.png", 0);
        write_png(dir.path(), "alpha_1.png", 255);
        write_png(dir.path(), "alpha_2.png", 255);
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let (ds, categories) = import_images(dir.path(), InputShape::new(4, 4, 1), 3, Vec::new()).unwrap();
        assert_eq!(categories, vec!["alpha".to_owned(), "beta".to_owned()]);
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.labels[0], vec![1.0, 0.0, 0.0]);
        assert_eq!(ds.labels[2], vec![0.0, 1.0, 0.0]);
        // white background inverts to 0, black ink to 1
        assert!(ds.inputs[0].iter().all(|&p| p == 0.0));
        assert!(ds.inputs[2].iter().all(|&p| p == 1.0));
    }

    #[test]
    fn test_import_respects_seeded_categories() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "beta_1.png", 0);
        let (ds, categories) =
            import_images(dir.path(), InputShape::new(4, 4, 1), 2, vec!["alpha".into(), "beta".into()]).unwrap();
        assert_eq!(categories.len(), 2);
        assert_eq!(ds.labels[0], vec![0.0, 1.0]);
    }

    #[test]
    fn test_import_rejects_too_many_categories() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a_1.png", 0);
        write_png(dir.path(), "b_1.png", 0);
        assert!(import_images(dir.path(), InputShape::new(4, 4, 1), 1, Vec::new()).is_err());
    }

    #[test]
    fn test_import_empty_folder() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            import_images(dir.path(), InputShape::new(4, 4, 1), 2, Vec::new()),
            Err(DataError::Empty(_))
        ));
    }
}
