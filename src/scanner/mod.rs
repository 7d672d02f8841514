use crate::error::{LeaderboardError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub file_name: String,
}

impl ImageInfo {
    fn from_path(path: &Path) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            path: path.to_path_buf(),
            file_name,
        }
    }
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "tif", "tiff"];

fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
}

fn is_image_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| is_image_extension(&ext.to_string_lossy()))
        .unwrap_or(false)
}

/// フォルダ直下の画像を列挙（ファイル名順）
pub fn scan_folder(folder: &Path) -> Result<Vec<ImageInfo>> {
    if !folder.is_dir() {
        return Err(LeaderboardError::FolderNotFound(folder.display().to_string()));
    }

    let mut images: Vec<ImageInfo> = WalkDir::new(folder)
        .max_depth(1) // 直下のみ（再帰しない）
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_image_path(e.path()))
        .map(|e| ImageInfo::from_path(e.path()))
        .collect();

    images.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    Ok(images)
}

/// 引数のパス列から画像を集める
///
/// フォルダは直下の画像に展開し、ファイルは拡張子を問わずそのまま使う。
/// 指定順を保つ。
pub fn collect_images(paths: &[PathBuf]) -> Result<Vec<ImageInfo>> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_dir() {
            images.extend(scan_folder(path)?);
        } else if path.is_file() {
            images.push(ImageInfo::from_path(path));
        } else {
            return Err(LeaderboardError::FileNotFound(path.display().to_string()));
        }
    }

    Ok(images)
}
