#![allow(dead_code)]

use std::fs;
use std::path::Path;

use serde_json::json;

pub fn bmp_bytes(width: u32, height: u32) -> Vec<u8> {
    let row_stride = (width * 3).div_ceil(4) * 4;
    let pixel_array_size = row_stride * height;
    let file_size = 54 + pixel_array_size;

    let mut bytes = Vec::with_capacity(file_size as usize);
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&file_size.to_le_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes.extend_from_slice(&54u32.to_le_bytes());

    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(&(width as i32).to_le_bytes());
    bytes.extend_from_slice(&(height as i32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&pixel_array_size.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());

    bytes.resize(file_size as usize, 0);
    bytes
}

pub fn write_bmp(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, bmp_bytes(width, height)).expect("write bmp file");
}

/// A LabelMe shape as `(label, shape_type, points)`.
pub type Shape<'a> = (&'a str, &'a str, &'a [[f64; 2]]);

/// LabelMe JSON for one image.
pub fn labelme_json(image_path: &str, width: u32, height: u32, shapes: &[Shape<'_>]) -> String {
    let shapes: Vec<_> = shapes
        .iter()
        .map(|(label, shape_type, points)| {
            json!({
                "label": label,
                "points": points,
                "group_id": null,
                "shape_type": shape_type,
                "flags": {}
            })
        })
        .collect();

    serde_json::to_string_pretty(&json!({
        "version": "5.0.1",
        "flags": {},
        "shapes": shapes,
        "imagePath": image_path,
        "imageData": null,
        "imageHeight": height,
        "imageWidth": width
    }))
    .expect("serialize labelme json")
}

pub fn write_label(path: &Path, image_path: &str, width: u32, height: u32, shapes: &[Shape<'_>]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, labelme_json(image_path, width, height, shapes)).expect("write label file");
}

/// A wrapped manifest listing `paths` as frames `0..N`.
pub fn write_manifest(path: &Path, bundle_path: &str, paths: &[&str]) {
    let images: Vec<_> = paths
        .iter()
        .enumerate()
        .map(|(frame_index, relative_path)| {
            json!({
                "frame_index": frame_index,
                "relative_path": relative_path,
                "file_name": relative_path
            })
        })
        .collect();

    let manifest = json!({
        "version": "1.0",
        "bundle_path": bundle_path,
        "image_count": paths.len(),
        "images": images
    });
    fs::write(
        path,
        serde_json::to_string_pretty(&manifest).expect("serialize manifest"),
    )
    .expect("write manifest");
}
