//! Mesh geometry as it is kept on the CPU and laid out for the GPU.

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Triangle list geometry. Shared between nodes through an `Arc` and uploaded to
/// the GPU once per allocation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geometry {
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

impl Geometry {
    /// A `width` x `height` plane in the XY plane facing +Z, centered on the origin.
    pub fn plane(width: f32, height: f32) -> Self {
        let (w, h) = (width / 2.0, height / 2.0);
        let normal = [0.0, 0.0, 1.0];
        let vertices = vec![
            ModelVertex {
                position: [-w, h, 0.0],
                tex_coords: [0.0, 0.0],
                normal,
            },
            ModelVertex {
                position: [w, h, 0.0],
                tex_coords: [1.0, 0.0],
                normal,
            },
            ModelVertex {
                position: [-w, -h, 0.0],
                tex_coords: [0.0, 1.0],
                normal,
            },
            ModelVertex {
                position: [w, -h, 0.0],
                tex_coords: [1.0, 1.0],
                normal,
            },
        ];
        Self {
            name: "plane".to_string(),
            vertices,
            indices: vec![0, 2, 1, 2, 3, 1],
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /**
     * Area-weighted smooth normals for geometry that ships without them.
     *
     * Each triangle adds its (unnormalized) face normal to its three corners; the sums
     * are normalized afterwards. Degenerate corners keep a zero normal.
     */
    pub fn compute_normals(&mut self) {
        let mut sums = vec![cgmath::Vector3::new(0.0f32, 0.0, 0.0); self.vertices.len()];
        for c in self.indices.chunks_exact(3) {
            let (i0, i1, i2) = (c[0] as usize, c[1] as usize, c[2] as usize);
            if i0 >= sums.len() || i1 >= sums.len() || i2 >= sums.len() {
                continue;
            }
            let p0: cgmath::Vector3<f32> = self.vertices[i0].position.into();
            let p1: cgmath::Vector3<f32> = self.vertices[i1].position.into();
            let p2: cgmath::Vector3<f32> = self.vertices[i2].position.into();
            let face = (p1 - p0).cross(p2 - p0);
            sums[i0] += face;
            sums[i1] += face;
            sums[i2] += face;
        }
        for (vertex, sum) in self.vertices.iter_mut().zip(sums) {
            let len = (sum.x * sum.x + sum.y * sum.y + sum.z * sum.z).sqrt();
            if len > f32::EPSILON {
                vertex.normal = (sum / len).into();
            }
        }
    }
}
