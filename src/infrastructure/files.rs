//! Filesystem adapters: reading card images and writing exported files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::application::ExportFile;
use crate::domain::{AppError, ImageUpload, Result};

/// Read an image from disk for upload.
///
/// # Errors
/// Returns error if the file cannot be read.
pub fn load_image(path: &Path) -> Result<ImageUpload> {
    let bytes = fs::read(path)
        .map_err(|e| AppError::io(format!("Failed to read image {}", path.display()), e))?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("card")
        .to_string();

    Ok(ImageUpload {
        mime: image_mime(path).to_string(),
        file_name,
        bytes,
    })
}

/// Guess an image MIME type from the file extension.
#[must_use]
pub fn image_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// Write an exported file into `dir`, creating it if needed.
///
/// # Errors
/// Returns error if the directory or file cannot be written.
pub fn write_export(dir: &Path, file: &ExportFile) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .map_err(|e| AppError::io(format!("Failed to create directory {}", dir.display()), e))?;

    let path = dir.join(&file.file_name);
    fs::write(&path, &file.bytes)
        .map_err(|e| AppError::io(format!("Failed to write {}", path.display()), e))?;

    tracing::info!(path = %path.display(), bytes = file.bytes.len(), "Export written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_image_mime() {
        assert_eq!(image_mime(Path::new("card.JPG")), "image/jpeg");
        assert_eq!(image_mime(Path::new("card.png")), "image/png");
        assert_eq!(image_mime(Path::new("card")), "application/octet-stream");
    }

    #[test]
    fn test_load_image() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("front.png");
        fs::write(&path, [1u8, 2, 3]).unwrap();

        let upload = load_image(&path).unwrap();
        assert_eq!(upload.file_name, "front.png");
        assert_eq!(upload.mime, "image/png");
        assert_eq!(upload.bytes, vec![1, 2, 3]);

        assert!(load_image(&dir.path().join("missing.png")).is_err());
    }

    #[test]
    fn test_write_export_creates_dir() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("exports");
        let file = ExportFile {
            file_name: "contacts_2026-10-16.vcf".into(),
            mime: "text/vcard",
            bytes: b"BEGIN:VCARD".to_vec(),
        };

        let path = write_export(&out, &file).unwrap();

        assert_eq!(path, out.join("contacts_2026-10-16.vcf"));
        assert_eq!(fs::read(path).unwrap(), b"BEGIN:VCARD");
    }
}
