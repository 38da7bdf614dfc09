use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

mod common;

const CAR: common::Shape<'static> = ("car", "rectangle", &[[10.0, 10.0], [50.0, 40.0]]);

fn framelabel() -> Command {
    let mut cmd = Command::cargo_bin("framelabel").unwrap();
    cmd.env_remove("FRAMELABEL_LABELS")
        .env_remove("FRAMELABEL_IMAGES")
        .env_remove("FRAMELABEL_MANIFEST")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn runs() {
    framelabel().assert().success();
}

#[test]
fn outputs_tool_name() {
    let mut cmd = framelabel();
    cmd.arg("-V");
    cmd.assert().success().stdout("framelabel 0.1.0\n");
}

// Build subcommand tests

#[test]
fn build_with_manifest_writes_document() {
    let temp = tempfile::tempdir().unwrap();
    let labels = temp.path().join("labels");
    common::write_label(&labels.join("a.json"), "a.jpg", 640, 480, &[CAR]);
    let manifest = temp.path().join("frame_manifest.json");
    common::write_manifest(&manifest, "output/media_bundle.mp4", &["a.jpg", "b.jpg"]);
    let output = temp.path().join("out/annotations.json");

    let mut cmd = framelabel();
    cmd.arg("build")
        .arg(&labels)
        .arg("--manifest")
        .arg(&manifest)
        .arg("-o")
        .arg(&output);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("2 images, 1 categories, 1 annotations"));

    let doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(doc["info"]["frames_without_labels"], serde_json::json!(["b.jpg"]));
    assert_eq!(doc["info"]["bundle_path"], "output/media_bundle.mp4");
    assert_eq!(doc["images"][1]["frame_index"], 1);
    assert_eq!(doc["annotations"][0]["bbox"], serde_json::json!([10.0, 10.0, 40.0, 30.0]));
}

#[test]
fn build_reads_manifest_from_stdin() {
    let temp = tempfile::tempdir().unwrap();
    let labels = temp.path().join("labels");
    common::write_label(&labels.join("a.json"), "a.jpg", 640, 480, &[CAR]);
    let output = temp.path().join("annotations.json");

    let mut cmd = framelabel();
    cmd.arg("build")
        .arg(&labels)
        .args(["--manifest", "-", "--report", "json", "-o"])
        .arg(&output)
        .write_stdin(r#"[{"frame_index": 0, "relative_path": "a.jpg"}]"#);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"manifest_frames\": 1"));

    let doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(doc["info"]["frame_manifest"], "-");
}

#[test]
fn build_takes_labels_dir_from_env() {
    let temp = tempfile::tempdir().unwrap();
    let labels = temp.path().join("labels");
    common::write_label(&labels.join("img_b.json"), "img_b.jpg", 8, 8, &[CAR]);
    common::write_label(&labels.join("img_a.json"), "img_a.jpg", 8, 8, &[CAR]);
    let output = temp.path().join("annotations.json");

    let mut cmd = framelabel();
    cmd.env("FRAMELABEL_LABELS", &labels)
        .arg("build")
        .arg("-o")
        .arg(&output);
    cmd.assert().success();

    let doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(doc["images"][0]["file_name"], "img_a.jpg");
    assert!(doc["images"][0].get("frame_index").is_none());
}

#[test]
fn build_require_manifest_fails_without_one() {
    let temp = tempfile::tempdir().unwrap();
    let labels = temp.path().join("labels");
    common::write_label(&labels.join("a.json"), "a.jpg", 640, 480, &[CAR]);
    let output = temp.path().join("annotations.json");

    let mut cmd = framelabel();
    cmd.arg("build")
        .arg(&labels)
        .arg("--require-manifest")
        .arg("-o")
        .arg(&output);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("frame manifest is required"));
    assert!(!output.exists());
}

#[test]
fn build_rejects_unsupported_shape_without_writing() {
    let temp = tempfile::tempdir().unwrap();
    let labels = temp.path().join("labels");
    common::write_label(
        &labels.join("a.json"),
        "a.jpg",
        640,
        480,
        &[("wheel", "circle", &[[5.0, 5.0], [9.0, 9.0]])],
    );
    let output = temp.path().join("annotations.json");

    let mut cmd = framelabel();
    cmd.arg("build").arg(&labels).arg("-o").arg(&output);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported shape type 'circle'"));
    assert!(!output.exists());
}

#[test]
fn build_missing_image_fails_unless_skipped() {
    let temp = tempfile::tempdir().unwrap();
    let labels = temp.path().join("labels");
    let images = temp.path().join("images");
    common::write_label(&labels.join("a.json"), "a.bmp", 4, 4, &[CAR]);
    common::write_label(&labels.join("b.json"), "b.bmp", 4, 4, &[CAR]);
    common::write_bmp(&images.join("a.bmp"), 4, 4);
    let output = temp.path().join("annotations.json");

    let mut cmd = framelabel();
    cmd.arg("build")
        .arg(&labels)
        .arg("--images")
        .arg(&images)
        .arg("-o")
        .arg(&output);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("'b.bmp'"));

    let mut cmd = framelabel();
    cmd.arg("build")
        .arg(&labels)
        .arg("--images")
        .arg(&images)
        .arg("--skip-missing-images")
        .arg("-o")
        .arg(&output);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Warnings (1):"));

    let doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(doc["images"].as_array().unwrap().len(), 1);
    assert_eq!(doc["info"]["skipped_labels"], serde_json::json!(["b.json"]));
}

// Validate subcommand tests

#[test]
fn validate_built_document_succeeds() {
    let temp = tempfile::tempdir().unwrap();
    let labels = temp.path().join("labels");
    common::write_label(&labels.join("a.json"), "a.jpg", 640, 480, &[CAR]);
    let output = temp.path().join("annotations.json");

    framelabel()
        .arg("build")
        .arg(&labels)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    let mut cmd = framelabel();
    cmd.arg("validate").arg(&output);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Validation passed"));
}

#[test]
fn validate_reports_broken_document() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("broken.json");
    fs::write(
        &path,
        r#"{
            "info": {"frame_count": 2, "frames_without_labels": []},
            "images": [
                {"id": 1, "file_name": "a.jpg", "width": 10, "height": 10},
                {"id": 1, "file_name": "b.jpg", "width": 10, "height": 10}
            ],
            "annotations": [
                {"id": 1, "image_id": 7, "category_id": 9,
                 "segmentation": [[0, 0, 4, 0, 4, 4]], "bbox": [0, 0, 4, 4], "area": 8}
            ],
            "categories": [{"id": 1, "name": "car"}]
        }"#,
    )
    .unwrap();

    let mut cmd = framelabel();
    cmd.arg("validate").arg(&path);
    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("DuplicateImageId"))
        .stdout(predicate::str::contains("MissingImageRef"))
        .stdout(predicate::str::contains("MissingCategoryRef"));
}

#[test]
fn validate_json_output_format() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("empty.json");
    fs::write(&path, r#"{"images": [], "annotations": [], "categories": []}"#).unwrap();

    let mut cmd = framelabel();
    cmd.arg("validate").arg(&path).args(["--output", "json"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"error_count\": 0"))
        .stdout(predicate::str::contains("\"warning_count\": 0"));
}

#[test]
fn validate_strict_fails_on_warnings() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("unknown_dims.json");
    fs::write(
        &path,
        r#"{
            "info": {"frame_count": 1, "frames_without_labels": ["b.jpg"]},
            "images": [{"id": 1, "file_name": "b.jpg", "width": 0, "height": 0, "frame_index": 0}],
            "annotations": [],
            "categories": []
        }"#,
    )
    .unwrap();

    framelabel().arg("validate").arg(&path).assert().success();
    framelabel()
        .arg("validate")
        .arg(&path)
        .arg("--strict")
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 warning(s)"));
}

#[test]
fn validate_nonexistent_file_fails() {
    let mut cmd = framelabel();
    cmd.args(["validate", "nonexistent_file.json"]);
    cmd.assert().failure();
}

// Restore subcommand tests

#[test]
fn restore_writes_one_file_per_labeled_image() {
    let temp = tempfile::tempdir().unwrap();
    let labels = temp.path().join("labels");
    common::write_label(&labels.join("sub/a.json"), "a.jpg", 640, 480, &[CAR]);
    let manifest = temp.path().join("frame_manifest.json");
    common::write_manifest(&manifest, "bundle.mp4", &["a.jpg", "b.jpg"]);
    let document = temp.path().join("annotations.json");
    let restored = temp.path().join("restored");

    framelabel()
        .arg("build")
        .arg(&labels)
        .arg("--manifest")
        .arg(&manifest)
        .arg("-o")
        .arg(&document)
        .assert()
        .success();

    let mut cmd = framelabel();
    cmd.arg("restore").arg(&document).arg("-o").arg(&restored);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Restored 1 label file(s)"));

    let label: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(restored.join("sub/a.json")).unwrap()).unwrap();
    assert_eq!(label["imagePath"], "a.jpg");
    assert_eq!(label["frame_index"], 0);
    assert_eq!(label["shapes"][0]["shape_type"], "polygon");
}
