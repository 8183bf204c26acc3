//! Runtime for baked-lighting portal scenes.
//!
//! A scene ships as a single `.pscn` bundle holding an XML manifest, OBJ
//! meshes, and a baked lighting map.  The crate parses the bundle, binds
//! each node to one of three materials (baked, pole light, portal), spawns
//! the firefly particle field, and drives a wgpu renderer with animated
//! portal and firefly shaders.  Everything up to the GPU boundary is plain
//! data and stays testable without a window.

pub mod assets;
pub mod binding;
pub mod bundle;
pub mod camera;
pub mod fireflies;
pub mod frame;
pub mod material;
pub mod mesh;
pub mod render;
pub mod scene;
pub mod ui;
pub mod viewport;

pub use assets::SceneAssets;
pub use binding::{bind_materials, BindingError, BoundNode, BoundScene, MaterialKind};
pub use bundle::{write_bundle, BundleEntry, SceneBundle};
pub use camera::OrbitCamera;
pub use fireflies::{FireflyField, FIREFLY_COUNT};
pub use frame::{FrameClock, FrameLoop};
pub use material::{FirefliesMaterial, PortalMaterial, SceneMaterials};
pub use mesh::{load_obj_from_str, MeshData};
pub use render::{EguiDraw, Renderer};
pub use scene::{SceneManifest, SceneNode};
pub use ui::DebugPanel;
pub use viewport::{Viewport, MAX_PIXEL_RATIO};
