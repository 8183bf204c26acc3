use assert_cmd::prelude::*;
use predicates::str::contains;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

use portal_scene::write_bundle;

const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\nf 1/1 2/2 3/3\n";

fn one_pixel_png() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(1, 1, image::Rgba([204, 0, 204, 255]));
    let mut bytes = Vec::new();
    img.write_to(
        &mut std::io::Cursor::new(&mut bytes),
        image::ImageFormat::Png,
    )
    .expect("encode png");
    bytes
}

fn build_bundle() -> NamedTempFile {
    let manifest = r#"<scene>
  <baked>baked.png</baked>
  <node><name>floor001</name><mesh>floor001.obj</mesh></node>
  <node><name>Cube015</name><mesh>Cube015.obj</mesh><position>0.6 1.2 0.3</position></node>
  <node><name>poleLightB</name><mesh>poleLightB.obj</mesh></node>
  <node><name>Circle</name><mesh>Circle.obj</mesh></node>
</scene>
"#;

    let png = one_pixel_png();
    let obj = TRIANGLE.as_bytes();
    let buffer = write_bundle(
        manifest,
        &[
            ("floor001.obj", obj),
            ("Cube015.obj", obj),
            ("poleLightB.obj", obj),
            ("Circle.obj", obj),
            ("baked.png", &png),
        ],
    );

    let mut tmp = NamedTempFile::new().expect("temp bundle");
    tmp.write_all(&buffer).expect("write bundle");
    tmp
}

#[test]
fn cli_prints_scene_summary() {
    let bundle = build_bundle();
    let mut cmd = Command::cargo_bin("portal-scene").expect("binary exists");
    cmd.arg(bundle.path()).arg("--summary-only");
    cmd.assert()
        .success()
        .stdout(contains("Loaded scene with 4 nodes (40 fireflies)"))
        .stdout(contains(" - floor001 (baked)"))
        .stdout(contains(" - Cube015 (pole-light)"))
        .stdout(contains(" - poleLightB (pole-light)"))
        .stdout(contains(" - Circle (portal)"))
        .stdout(contains("baked map: baked.png"))
        .stdout(contains("floor001 material=baked vertices=3 triangles=1"));
}

#[test]
fn cli_rejects_missing_bundle() {
    let mut cmd = Command::cargo_bin("portal-scene").expect("binary exists");
    cmd.arg("/nonexistent/scene.pscn").arg("--summary-only");
    cmd.assert()
        .failure()
        .stderr(contains("failed to open bundle"));
}

#[test]
fn cli_rejects_unknown_flag() {
    let bundle = build_bundle();
    let mut cmd = Command::cargo_bin("portal-scene").expect("binary exists");
    cmd.arg(bundle.path()).arg("--frobnicate");
    cmd.assert()
        .failure()
        .stderr(contains("Unknown argument: --frobnicate"));
}

#[test]
fn cli_fails_when_a_catalogue_node_is_missing() {
    let manifest = r#"<scene>
  <baked>baked.png</baked>
  <node><name>floor001</name><mesh>floor001.obj</mesh></node>
</scene>
"#;
    let png = one_pixel_png();
    let buffer = write_bundle(
        manifest,
        &[("floor001.obj", TRIANGLE.as_bytes()), ("baked.png", &png)],
    );
    let mut tmp = NamedTempFile::new().expect("temp bundle");
    tmp.write_all(&buffer).expect("write bundle");

    let mut cmd = Command::cargo_bin("portal-scene").expect("binary exists");
    cmd.arg(tmp.path()).arg("--summary-only");
    cmd.assert().failure().stderr(contains("Circle"));
}
