//! Input collection for file or directory targets.

use std::path::{Path, PathBuf};

use anyhow::Result;
use log::debug;
use walkdir::WalkDir;

/// Collect all image paths from a file or directory.
pub fn collect_images(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    if !path.is_dir() {
        anyhow::bail!(
            "input path is neither file nor directory: {}",
            path.display()
        );
    }

    let exts = ["jpg", "jpeg", "png", "bmp", "webp"];
    let mut images = Vec::new();
    for entry in WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        if let Some(ext) = entry.path().extension().and_then(|e| e.to_str()) {
            let ext_lower = ext.to_ascii_lowercase();
            if exts.contains(&ext_lower.as_str()) {
                images.push(entry.path().to_path_buf());
            } else {
                debug!("Skipping non-image file {}", entry.path().display());
            }
        }
    }
    images.sort();
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn single_file_passes_through() {
        let dir = tempdir().expect("tempdir");
        let file = dir.path().join("a.png");
        fs::write(&file, b"stub").unwrap();
        let images = collect_images(&file).expect("collect");
        assert_eq!(images, vec![file]);
    }

    #[test]
    fn directory_collects_sorted_image_files_only() {
        let dir = tempdir().expect("tempdir");
        for name in ["b.png", "a.jpg", "notes.txt", "c.webp"] {
            fs::write(dir.path().join(name), b"stub").unwrap();
        }
        let images = collect_images(dir.path()).expect("collect");
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["a.jpg", "b.png", "c.webp"]);
    }

    #[test]
    fn missing_path_is_an_error() {
        assert!(collect_images(Path::new("definitely/not/here")).is_err());
    }
}
