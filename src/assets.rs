use anyhow::{Context, Result};
use image::RgbaImage;
use log::info;

use crate::binding::{bind_materials, BoundScene};
use crate::bundle::SceneBundle;
use crate::fireflies::FireflyField;
use crate::mesh::{load_obj_from_str, MeshData};
use crate::scene::SceneManifest;

/// CPU-side scene data ready for GPU upload: bound nodes, their decoded
/// meshes (parallel to `bound.nodes`), the baked-lighting image, and the
/// generated firefly buffers.
#[derive(Debug)]
pub struct SceneAssets {
    pub bound: BoundScene,
    pub meshes: Vec<MeshData>,
    pub baked_image: RgbaImage,
    pub fireflies: FireflyField,
}

impl SceneAssets {
    /// Loads everything the renderer needs out of the bundle.
    pub fn load(bundle: &SceneBundle) -> Result<Self> {
        let manifest =
            SceneManifest::from_xml(bundle.manifest_xml()).context("failed to parse manifest")?;
        let bound = bind_materials(&manifest).context("material binding failed")?;

        let mut meshes = Vec::with_capacity(bound.nodes.len());
        for node in &bound.nodes {
            let bytes = bundle
                .extract_file(&node.node.mesh)
                .with_context(|| format!("unable to extract mesh for {}", node.node.name))?;
            let contents = String::from_utf8(bytes)
                .with_context(|| format!("{} is not valid UTF-8", node.node.mesh))?;
            let mesh = load_obj_from_str(&contents)
                .with_context(|| format!("failed to parse OBJ mesh {}", node.node.mesh))?;
            meshes.push(mesh);
        }

        let texture_bytes = bundle
            .extract_file(&bound.baked_texture)
            .with_context(|| format!("unable to extract {}", bound.baked_texture))?;
        // The baked map is authored vertically unflipped; it is uploaded
        // exactly as decoded.
        let baked_image = image::load_from_memory(&texture_bytes)
            .with_context(|| format!("failed to decode {}", bound.baked_texture))?
            .to_rgba8();

        let fireflies = FireflyField::spawn();

        info!(
            "scene assets ready: {} nodes, baked map {}x{}, {} fireflies",
            bound.nodes.len(),
            baked_image.width(),
            baked_image.height(),
            fireflies.len()
        );

        Ok(Self {
            bound,
            meshes,
            baked_image,
            fireflies,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::write_bundle;

    const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\nf 1/1 2/2 3/3\n";

    fn manifest() -> String {
        let mut xml = String::from("<scene>\n<baked>baked.png</baked>\n");
        for name in ["floor001", "Cube015", "poleLightB", "Circle"] {
            xml.push_str(&format!(
                "<node><name>{name}</name><mesh>{name}.obj</mesh></node>\n"
            ));
        }
        xml.push_str("</scene>\n");
        xml
    }

    fn one_pixel_png() -> Vec<u8> {
        let img = RgbaImage::from_pixel(1, 1, image::Rgba([255, 0, 255, 255]));
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .expect("encode png");
        bytes
    }

    #[test]
    fn loads_meshes_texture_and_fireflies() {
        let png = one_pixel_png();
        let obj = TRIANGLE.as_bytes();
        let buffer = write_bundle(
            &manifest(),
            &[
                ("floor001.obj", obj),
                ("Cube015.obj", obj),
                ("poleLightB.obj", obj),
                ("Circle.obj", obj),
                ("baked.png", &png),
            ],
        );
        let bundle = SceneBundle::from_bytes("test", buffer).unwrap();
        let assets = SceneAssets::load(&bundle).unwrap();
        assert_eq!(assets.meshes.len(), 4);
        assert_eq!(assets.baked_image.dimensions(), (1, 1));
        assert_eq!(assets.fireflies.len(), crate::fireflies::FIREFLY_COUNT);
    }

    #[test]
    fn missing_mesh_payload_is_an_error() {
        let png = one_pixel_png();
        let obj = TRIANGLE.as_bytes();
        let buffer = write_bundle(
            &manifest(),
            &[
                ("floor001.obj", obj),
                ("Cube015.obj", obj),
                ("poleLightB.obj", obj),
                ("baked.png", &png),
            ],
        );
        let bundle = SceneBundle::from_bytes("test", buffer).unwrap();
        let err = SceneAssets::load(&bundle).unwrap_err();
        assert!(err.to_string().contains("Circle"));
    }
}
