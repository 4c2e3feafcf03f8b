use std::path::Path;

use image::ImageFormat;
use uuid::Uuid;

use crate::errors::{AppError, Result};

pub const ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/webp"];
pub const ALLOWED_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp"];

/// Lowercased extension including the leading dot.
pub fn get_file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
}

/// Declared content type, falling back to a guess from the filename.
pub fn resolve_mime_type(declared: Option<&str>, filename: &str) -> String {
    match declared.and_then(|raw| raw.parse::<mime::Mime>().ok()) {
        Some(mime) => mime.essence_str().to_ascii_lowercase(),
        None => mime_guess::from_path(filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    }
}

pub fn validate_mime_type(mime_type: &str) -> bool {
    ALLOWED_MIME_TYPES.contains(&mime_type)
}

/// Magic-byte check so a renamed non-image is still refused.
pub fn sniff_image(data: &[u8]) -> bool {
    matches!(
        image::guess_format(data),
        Ok(ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP)
    )
}

pub fn generate_filename(extension: &str) -> String {
    format!("{}{}", Uuid::new_v4(), extension)
}

/// Runs every upload check and returns the extension to store the file under.
pub fn validate_image(filename: &str, mime_type: &str, data: &[u8]) -> Result<String> {
    let extension = get_file_extension(filename)
        .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .ok_or(AppError::InvalidFileType)?;

    if !validate_mime_type(mime_type) || !sniff_image(data) {
        return Err(AppError::InvalidFileType);
    }

    Ok(extension)
}
