//! Frame composition.
//!
//! The render loop hands the scene to a [`FrameRenderer`]. [`DrawList::collect`]
//! flattens the scene graph into the batches the renderer draws: lit and unlit
//! meshes, shadow catchers, the directional light and the summed ambient term.
//! It does not touch the GPU so the batching can be tested on its own.

use std::sync::Arc;

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Vector3};

use crate::{
    camera::{Camera, OPENGL_TO_WGPU_MATRIX, Projection},
    data_structures::{
        cube_map::CubeMap,
        material::Material,
        scene_graph::{DirectionalLight, MeshNode, NodeId, NodeKind, Scene},
        transform::Transform,
    },
    viewport::Viewport,
};

/// Draws one frame of a scene. The GPU renderer implements this; tests substitute
/// their own.
pub trait FrameRenderer {
    fn render(
        &mut self,
        scene: &Scene,
        camera: &Camera,
        projection: &Projection,
    ) -> anyhow::Result<()>;

    fn resize(&mut self, viewport: &Viewport);
}

#[derive(Debug)]
pub struct MeshDraw<'a> {
    pub node: NodeId,
    pub mesh: &'a MeshNode,
    pub world: Transform,
}

#[derive(Clone, Debug)]
pub struct LightDraw {
    pub position: Vector3<f32>,
    pub light: DirectionalLight,
}

impl LightDraw {
    pub fn direction(&self) -> Vector3<f32> {
        let target = Vector3::from(self.light.target);
        let dir = target - self.position;
        if dir.magnitude2() > f32::EPSILON {
            dir.normalize()
        } else {
            -Vector3::unit_y()
        }
    }

    /// Orthographic view-projection of the shadow camera.
    pub fn shadow_view_proj(&self) -> Matrix4<f32> {
        let direction = self.direction();
        let up = if direction.y.abs() > 0.99 {
            Vector3::unit_z()
        } else {
            Vector3::unit_y()
        };
        let eye = Point3::from_vec(self.position);
        let view = Matrix4::look_at_rh(eye, Point3::from(self.light.target), up);
        let s = &self.light.shadow;
        let proj = cgmath::ortho(s.left, s.right, s.bottom, s.top, s.near, s.far);
        OPENGL_TO_WGPU_MATRIX * proj * view
    }
}

#[derive(Debug, Default)]
pub struct DrawList<'a> {
    /// `Standard` and `Other` meshes.
    pub opaque: Vec<MeshDraw<'a>>,
    /// Meshes with a `Shadow` material, drawn last with blending.
    pub shadow_catchers: Vec<MeshDraw<'a>>,
    pub directional: Option<LightDraw>,
    /// Colour times intensity, summed over all ambient lights.
    pub ambient: [f32; 3],
    pub background: Option<&'a Arc<CubeMap>>,
}

impl<'a> DrawList<'a> {
    pub fn collect(scene: &'a Scene) -> Self {
        let mut list = DrawList {
            background: scene.background.as_ref(),
            ..Default::default()
        };
        scene.visit_world(&mut |node, world| match &node.kind {
            NodeKind::Mesh(mesh) => {
                let draw = MeshDraw {
                    node: node.id(),
                    mesh,
                    world: world.clone(),
                };
                match mesh.material {
                    Material::Shadow(_) => list.shadow_catchers.push(draw),
                    Material::Standard(_) | Material::Other(_) => list.opaque.push(draw),
                }
            }
            NodeKind::DirectionalLight(light) => {
                if list.directional.is_some() {
                    log::warn!("only the first directional light is drawn, ignoring {}", node.name);
                    return;
                }
                list.directional = Some(LightDraw {
                    position: world.position,
                    light: light.clone(),
                });
            }
            NodeKind::AmbientLight(ambient) => {
                for (sum, c) in list.ambient.iter_mut().zip(ambient.color) {
                    *sum += c * ambient.intensity;
                }
            }
            NodeKind::Group => {}
        });
        list
    }

    pub fn shadow_casters(&self) -> impl Iterator<Item = &MeshDraw<'a>> {
        let casts = self
            .directional
            .as_ref()
            .is_some_and(|d| d.light.cast_shadow);
        self.opaque
            .iter()
            .filter(move |draw| casts && draw.mesh.cast_shadow)
    }

    pub fn is_empty(&self) -> bool {
        self.opaque.is_empty() && self.shadow_catchers.is_empty()
    }
}
