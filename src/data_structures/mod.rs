//! Scene data: the node graph and what hangs off its nodes.
//!
//! - `scene_graph` holds the node tree, lights and world-transform resolution
//! - `transform` is a node's position, rotation and scale
//! - `model` contains vertex layouts and triangle geometry
//! - `material` describes how a mesh is shaded
//! - `cube_map` holds the six decoded environment faces
//! - `texture` wraps GPU textures and their creation

pub mod cube_map;
pub mod material;
pub mod model;
pub mod scene_graph;
pub mod texture;
pub mod transform;
