use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

/// Parsed scene manifest: the baked texture path plus the ordered node list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SceneManifest {
    pub baked_texture: String,
    pub nodes: Vec<SceneNode>,
}

impl SceneManifest {
    /// Parses the manifest XML produced by the scene authoring step.
    ///
    /// Node order is preserved; material binding matches names against this
    /// ordered sequence.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid manifest XML")?;

        let scene = document
            .descendants()
            .find(|n| n.has_tag_name("scene"))
            .ok_or_else(|| anyhow!("manifest has no <scene> element"))?;

        let baked_texture = optional_text(&scene, "baked")
            .ok_or_else(|| anyhow!("<baked> texture path is missing"))?;

        let mut nodes = Vec::new();
        for node in scene.children().filter(|n| n.has_tag_name("node")) {
            let mut parsed = SceneNode::default();
            parsed.name = required_text(&node, "name")?;
            parsed.mesh = required_text(&node, "mesh")?;
            parsed.position = parse_vec3(optional_text(&node, "position"), parsed.position)?;
            parsed.rotation = parse_vec3(optional_text(&node, "rotation"), parsed.rotation)?;
            parsed.scale = parse_vec3(optional_text(&node, "scale"), parsed.scale)?;
            nodes.push(parsed);
        }

        Ok(Self {
            baked_texture,
            nodes,
        })
    }
}

/// Named mesh node as described by the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    pub mesh: String,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default = "default_scale")]
    pub scale: Vec3,
}

impl Default for SceneNode {
    fn default() -> Self {
        Self {
            name: String::new(),
            mesh: String::new(),
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

fn default_scale() -> Vec3 {
    Vec3::ONE
}

fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("<{tag}> tag is missing"))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    let Some(value) = value else {
        return Ok(default);
    };
    let mut numbers = value
        .split_whitespace()
        .filter_map(|component| component.parse::<f32>().ok());
    let x = numbers
        .next()
        .ok_or_else(|| anyhow!("vector is missing components"))?;
    let y = numbers
        .next()
        .ok_or_else(|| anyhow!("vector is missing components"))?;
    let z = numbers
        .next()
        .ok_or_else(|| anyhow!("vector is missing components"))?;
    Ok(Vec3::new(x, y, z))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
    <scene>
        <baked>textures/baked.png</baked>
        <node>
            <name>floor001</name>
            <mesh>meshes/floor.obj</mesh>
        </node>
        <node>
            <name>Circle</name>
            <mesh>meshes/circle.obj</mesh>
            <position>0 0.78 -1.7</position>
            <rotation>-1.57 0 0</rotation>
        </node>
    </scene>
    "#;

    #[test]
    fn parse_manifest_preserves_node_order() {
        let manifest = SceneManifest::from_xml(SAMPLE).unwrap();
        assert_eq!(manifest.baked_texture, "textures/baked.png");
        assert_eq!(manifest.nodes.len(), 2);
        assert_eq!(manifest.nodes[0].name, "floor001");
        assert_eq!(manifest.nodes[1].name, "Circle");
        assert_eq!(manifest.nodes[1].position, Vec3::new(0.0, 0.78, -1.7));
        assert_eq!(manifest.nodes[0].scale, Vec3::ONE);
    }

    #[test]
    fn missing_name_is_an_error() {
        let bad = "<scene><baked>b.png</baked><node><mesh>m.obj</mesh></node></scene>";
        assert!(SceneManifest::from_xml(bad).is_err());
    }

    #[test]
    fn missing_mesh_is_an_error() {
        let bad = "<scene><baked>b.png</baked><node><name>Circle</name></node></scene>";
        assert!(SceneManifest::from_xml(bad).is_err());
    }

    #[test]
    fn missing_baked_texture_is_an_error() {
        let bad = "<scene><node><name>a</name><mesh>m.obj</mesh></node></scene>";
        assert!(SceneManifest::from_xml(bad).is_err());
    }
}
