//! Scene graph and hierarchical scene organization.
//!
//! The [`Scene`] owns a forest of [`Node`]s. Each node owns its children, carries a
//! local [`Transform`] and a [`NodeKind`] describing what it is. Ids are handed out when
//! a sub-tree is added to the scene, so nodes built elsewhere (for example by the glTF
//! loader on another thread) can be moved in as a whole.

use std::sync::Arc;

use crate::data_structures::{
    cube_map::CubeMap, material::Material, model::Geometry, transform::Transform,
};

/// Identifies a node inside one [`Scene`]. Unassigned until the node is added.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub const UNASSIGNED: NodeId = NodeId(u32::MAX);
}

#[derive(Clone, Debug)]
pub struct MeshNode {
    pub geometry: Arc<Geometry>,
    pub material: Material,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DirectionalShadow {
    pub map_size: u32,
    pub near: f32,
    pub far: f32,
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    pub bias: f32,
}

/// Light shining from the node's world position towards `target`.
#[derive(Clone, Debug, PartialEq)]
pub struct DirectionalLight {
    pub color: [f32; 3],
    pub intensity: f32,
    pub target: [f32; 3],
    pub cast_shadow: bool,
    pub shadow: DirectionalShadow,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AmbientLight {
    pub color: [f32; 3],
    pub intensity: f32,
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    Group,
    Mesh(MeshNode),
    DirectionalLight(DirectionalLight),
    AmbientLight(AmbientLight),
}

#[derive(Clone, Debug)]
pub struct Node {
    id: NodeId,
    pub name: String,
    pub transform: Transform,
    pub kind: NodeKind,
    pub visible: bool,
    /// Index of the glTF node this one was created from, if any.
    pub source_index: Option<usize>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: NodeId::UNASSIGNED,
            name: name.into(),
            transform: Transform::default(),
            kind,
            visible: true,
            source_index: None,
            children: Vec::new(),
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Group)
    }

    pub fn mesh(name: impl Into<String>, geometry: Arc<Geometry>, material: Material) -> Self {
        Self::new(
            name,
            NodeKind::Mesh(MeshNode {
                geometry,
                material,
                cast_shadow: false,
                receive_shadow: false,
            }),
        )
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn add_child(&mut self, child: Node) {
        self.children.push(child);
    }

    pub fn as_mesh(&self) -> Option<&MeshNode> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn as_mesh_mut(&mut self) -> Option<&mut MeshNode> {
        match &mut self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Depth-first, parent before children.
    pub fn traverse<'a>(&'a self, f: &mut dyn FnMut(&'a Node)) {
        f(self);
        for child in &self.children {
            child.traverse(f);
        }
    }

    pub fn traverse_mut(&mut self, f: &mut dyn FnMut(&mut Node)) {
        f(self);
        for child in self.children.iter_mut() {
            child.traverse_mut(f);
        }
    }

    pub fn find(&self, id: NodeId) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }

    fn visit_world<'a>(
        &'a self,
        parent: &Transform,
        f: &mut dyn FnMut(&'a Node, &Transform),
    ) {
        if !self.visible {
            return;
        }
        let world = parent * &self.transform;
        f(self, &world);
        for child in &self.children {
            child.visit_world(&world, f);
        }
    }
}

#[derive(Debug, Default)]
pub struct Scene {
    /// Drawn behind everything when present.
    pub background: Option<Arc<CubeMap>>,
    roots: Vec<Node>,
    next_id: u32,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves `node` and its sub-tree into the scene and returns the id of `node`.
    pub fn add(&mut self, mut node: Node) -> NodeId {
        node.traverse_mut(&mut |n| {
            n.id = NodeId(self.next_id);
            self.next_id += 1;
        });
        let id = node.id;
        self.roots.push(node);
        id
    }

    pub fn roots(&self) -> &[Node] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        let mut count = 0;
        self.traverse(&mut |_| count += 1);
        count
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.find(id).is_some()
    }

    pub fn find(&self, id: NodeId) -> Option<&Node> {
        self.roots.iter().find_map(|root| root.find(id))
    }

    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.roots.iter_mut().find_map(|root| root.find_mut(id))
    }

    pub fn traverse<'a>(&'a self, f: &mut dyn FnMut(&'a Node)) {
        for root in &self.roots {
            root.traverse(f);
        }
    }

    pub fn traverse_mut(&mut self, f: &mut dyn FnMut(&mut Node)) {
        for root in self.roots.iter_mut() {
            root.traverse_mut(f);
        }
    }

    /// Visits every visible node together with its world transform.
    ///
    /// Invisible nodes hide their whole sub-tree.
    pub fn visit_world<'a>(&'a self, f: &mut dyn FnMut(&'a Node, &Transform)) {
        let identity = Transform::default();
        for root in &self.roots {
            root.visit_world(&identity, f);
        }
    }

    pub fn world_transform(&self, id: NodeId) -> Option<Transform> {
        let mut found = None;
        self.visit_world(&mut |node, world| {
            if node.id() == id {
                found = Some(world.clone());
            }
        });
        found
    }
}
