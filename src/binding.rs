use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scene::{SceneManifest, SceneNode};

/// Node carrying the merged static geometry with the baked-lighting map.
pub const BAKED_MESH: &str = "floor001";
/// First pole-light lamp head.
pub const POLE_LIGHT_A: &str = "Cube015";
/// Second pole-light lamp head.
pub const POLE_LIGHT_B: &str = "poleLightB";
/// The portal surface itself.
pub const PORTAL_MESH: &str = "Circle";

/// Whole-scene rotation about Y applied at bind time, so the portal faces
/// the default camera. Matches the authored asset's orientation offset.
pub const ROOT_ROTATION_Y: f32 = 3.15;

/// Material assigned to a bound node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterialKind {
    /// Static geometry sampling the baked-lighting texture.
    Baked,
    /// Flat white emissive surface (the lamp heads).
    PoleLight,
    /// Animated portal shader.
    Portal,
}

impl MaterialKind {
    pub fn label(self) -> &'static str {
        match self {
            MaterialKind::Baked => "baked",
            MaterialKind::PoleLight => "pole-light",
            MaterialKind::Portal => "portal",
        }
    }
}

/// Node with its material assignment resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundNode {
    pub node: SceneNode,
    pub material: MaterialKind,
}

/// Scene graph after material binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundScene {
    pub baked_texture: String,
    pub nodes: Vec<BoundNode>,
    /// Rotation offset applied to every node's model matrix.
    pub root_rotation_y: f32,
}

/// Errors raised while resolving the material catalogue.
///
/// Name-based lookup is a stringly-typed contract with the authoring step;
/// a missing name means the asset and the catalogue disagree, which is a
/// fatal condition reported explicitly rather than an unchecked dereference.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindingError {
    #[error("scene graph has no node named {0:?}")]
    MissingNode(&'static str),
}

const CATALOGUE: &[(&str, MaterialKind)] = &[
    (BAKED_MESH, MaterialKind::Baked),
    (POLE_LIGHT_A, MaterialKind::PoleLight),
    (POLE_LIGHT_B, MaterialKind::PoleLight),
    (PORTAL_MESH, MaterialKind::Portal),
];

/// Resolves material assignments for every node in the manifest.
///
/// The four catalogue names must all be present. Any additional node keeps
/// the baked material, since the authoring step merges the remaining static
/// geometry under the baked map.
pub fn bind_materials(manifest: &SceneManifest) -> Result<BoundScene, BindingError> {
    for (name, _) in CATALOGUE {
        if !manifest.nodes.iter().any(|node| node.name == *name) {
            return Err(BindingError::MissingNode(name));
        }
    }

    let nodes = manifest
        .nodes
        .iter()
        .map(|node| BoundNode {
            material: CATALOGUE
                .iter()
                .find(|(name, _)| *name == node.name)
                .map(|(_, kind)| *kind)
                .unwrap_or(MaterialKind::Baked),
            node: node.clone(),
        })
        .collect();

    Ok(BoundScene {
        baked_texture: manifest.baked_texture.clone(),
        nodes,
        root_rotation_y: ROOT_ROTATION_Y,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest_with(names: &[&str]) -> SceneManifest {
        SceneManifest {
            baked_texture: "textures/baked.png".to_string(),
            nodes: names
                .iter()
                .map(|name| SceneNode {
                    name: name.to_string(),
                    mesh: format!("meshes/{name}.obj"),
                    ..SceneNode::default()
                })
                .collect(),
        }
    }

    #[test]
    fn binds_full_catalogue() {
        let manifest = manifest_with(&[BAKED_MESH, POLE_LIGHT_A, POLE_LIGHT_B, PORTAL_MESH]);
        let bound = bind_materials(&manifest).unwrap();
        assert_eq!(bound.nodes.len(), 4);

        let material_of = |name: &str| {
            bound
                .nodes
                .iter()
                .find(|n| n.node.name == name)
                .unwrap()
                .material
        };
        assert_eq!(material_of(BAKED_MESH), MaterialKind::Baked);
        assert_eq!(material_of(POLE_LIGHT_A), MaterialKind::PoleLight);
        assert_eq!(material_of(POLE_LIGHT_B), MaterialKind::PoleLight);
        assert_eq!(material_of(PORTAL_MESH), MaterialKind::Portal);
        assert!((bound.root_rotation_y - ROOT_ROTATION_Y).abs() < f32::EPSILON);
    }

    #[test]
    fn missing_portal_node_is_reported_by_name() {
        let manifest = manifest_with(&[BAKED_MESH, POLE_LIGHT_A, POLE_LIGHT_B]);
        assert_eq!(
            bind_materials(&manifest),
            Err(BindingError::MissingNode(PORTAL_MESH))
        );
    }

    #[test]
    fn each_missing_catalogue_name_fails() {
        let all = [BAKED_MESH, POLE_LIGHT_A, POLE_LIGHT_B, PORTAL_MESH];
        for dropped in all {
            let kept: Vec<&str> = all.iter().copied().filter(|n| *n != dropped).collect();
            let manifest = manifest_with(&kept);
            assert_eq!(
                bind_materials(&manifest),
                Err(BindingError::MissingNode(dropped))
            );
        }
    }

    #[test]
    fn extra_nodes_fall_back_to_baked() {
        let manifest = manifest_with(&[
            BAKED_MESH,
            POLE_LIGHT_A,
            POLE_LIGHT_B,
            PORTAL_MESH,
            "fence003",
        ]);
        let bound = bind_materials(&manifest).unwrap();
        let fence = bound
            .nodes
            .iter()
            .find(|n| n.node.name == "fence003")
            .unwrap();
        assert_eq!(fence.material, MaterialKind::Baked);
    }
}
