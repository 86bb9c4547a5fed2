//! The wgpu implementation of [`FrameRenderer`].
//!
//! Each frame the scene is flattened into a [`DrawList`], GPU copies of new
//! geometry and textures are created on first sight, per-node instance and material
//! buffers are refreshed, and two passes are recorded: the shadow map, then the
//! frame itself (skybox, opaque meshes, shadow catchers).

use std::{collections::HashMap, iter, sync::Arc};

use anyhow::bail;
use wgpu::util::DeviceExt;

use crate::{
    camera::{Camera, CameraUniform, Projection},
    context::Context,
    data_structures::{
        cube_map::CubeMap,
        material::Material,
        model::Geometry,
        scene_graph::{NodeId, Scene},
        texture::Texture,
    },
    pipelines::{Layouts, Pipelines, basic::MaterialUniform, light::LightUniform},
    render::{DrawList, FrameRenderer, MeshDraw},
    viewport::Viewport,
};

struct GpuGeometry {
    // Keeps the allocation, and with it the cache key, alive.
    _source: Arc<Geometry>,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_elements: u32,
}

struct GpuTexture {
    _source: Arc<image::RgbaImage>,
    texture: Texture,
}

struct GpuDraw {
    instance_buffer: wgpu::Buffer,
    material_buffer: wgpu::Buffer,
    material_bind_group: wgpu::BindGroup,
    texture_key: Option<usize>,
}

/// What one prepared mesh draw needs from the caches.
struct DrawItem {
    node: NodeId,
    geometry: usize,
    double_sided: bool,
}

struct Environment {
    key: Option<usize>,
    _source: Option<Arc<CubeMap>>,
    texture: Texture,
}

pub struct GpuRenderer {
    ctx: Context,
    layouts: Layouts,
    pipelines: Pipelines,

    camera_uniform: CameraUniform,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,

    light_buffer: wgpu::Buffer,
    shadow_bind_group: wgpu::BindGroup,
    shadow_map: Texture,
    environment: Environment,
    lighting_bind_group: wgpu::BindGroup,

    white: Texture,
    geometries: HashMap<usize, GpuGeometry>,
    textures: HashMap<usize, GpuTexture>,
    oversized: HashMap<usize, Arc<image::RgbaImage>>,
    draws: HashMap<NodeId, GpuDraw>,
}

fn key_of<T>(arc: &Arc<T>) -> usize {
    Arc::as_ptr(arc) as usize
}

impl GpuRenderer {
    pub fn new(ctx: Context, shadow_map_size: u32) -> anyhow::Result<Self> {
        let device = &ctx.device;
        let layouts = Layouts::new(device);
        let pipelines = Pipelines::new(device, ctx.config.format, &layouts);

        let camera_uniform = CameraUniform::new();
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layouts.camera,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        let light_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Buffer"),
            contents: bytemuck::cast_slice(&[LightUniform::from_draw_list(&DrawList::default())]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let shadow_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layouts.shadow,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: light_buffer.as_entire_binding(),
            }],
            label: Some("shadow_bind_group"),
        });
        let shadow_map = Texture::create_shadow_map(device, shadow_map_size);

        let environment = Environment {
            key: None,
            _source: None,
            texture: Texture::create_placeholder_cube(device, &ctx.queue)?,
        };
        let lighting_bind_group = mk_lighting_bind_group(
            device,
            &layouts.lighting,
            &light_buffer,
            &shadow_map,
            &environment.texture,
        )?;

        let white = Texture::create_solid(1, 1, [255, 255, 255, 255], device, &ctx.queue);

        Ok(Self {
            ctx,
            layouts,
            pipelines,
            camera_uniform,
            camera_buffer,
            camera_bind_group,
            light_buffer,
            shadow_bind_group,
            shadow_map,
            environment,
            lighting_bind_group,
            white,
            geometries: HashMap::new(),
            textures: HashMap::new(),
            oversized: HashMap::new(),
            draws: HashMap::new(),
        })
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn request_redraw(&self) {
        self.ctx.window.request_redraw();
    }

    fn sync_environment(&mut self, background: Option<&Arc<CubeMap>>) -> anyhow::Result<()> {
        let key = background.map(key_of);
        if key == self.environment.key {
            return Ok(());
        }
        let max = self.ctx.device.limits().max_texture_dimension_2d;
        let texture = match background {
            Some(cube) if Texture::fits(cube.size(), cube.size(), max) => {
                Texture::from_cube_map(&self.ctx.device, &self.ctx.queue, cube, "environment")?
            }
            Some(cube) => {
                log::warn!(
                    "environment faces are {0}x{0}, the device allows {1}, keeping the placeholder",
                    cube.size(),
                    max
                );
                Texture::create_placeholder_cube(&self.ctx.device, &self.ctx.queue)?
            }
            None => Texture::create_placeholder_cube(&self.ctx.device, &self.ctx.queue)?,
        };
        self.lighting_bind_group = mk_lighting_bind_group(
            &self.ctx.device,
            &self.layouts.lighting,
            &self.light_buffer,
            &self.shadow_map,
            &texture,
        )?;
        self.environment = Environment {
            key,
            _source: background.cloned(),
            texture,
        };
        log::info!("environment map uploaded");
        Ok(())
    }

    fn prepare_geometry(&mut self, geometry: &Arc<Geometry>) -> usize {
        let key = key_of(geometry);
        let device = &self.ctx.device;
        self.geometries.entry(key).or_insert_with(|| GpuGeometry {
            _source: Arc::clone(geometry),
            vertex_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Vertex Buffer", geometry.name)),
                contents: bytemuck::cast_slice(&geometry.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            index_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Index Buffer", geometry.name)),
                contents: bytemuck::cast_slice(&geometry.indices),
                usage: wgpu::BufferUsages::INDEX,
            }),
            num_elements: geometry.indices.len() as u32,
        });
        key
    }

    /// Returns `None` when the image is too large for the device; the draw then
    /// samples the white texture.
    fn prepare_texture(&mut self, image: &Arc<image::RgbaImage>) -> Option<usize> {
        let key = key_of(image);
        if self.oversized.contains_key(&key) {
            return None;
        }
        let (device, queue) = (&self.ctx.device, &self.ctx.queue);
        let max = device.limits().max_texture_dimension_2d;
        if !self.textures.contains_key(&key) && !Texture::fits(image.width(), image.height(), max)
        {
            log::warn!(
                "base colour texture is {}x{}, the device allows {}, drawing untextured",
                image.width(),
                image.height(),
                max
            );
            self.oversized.insert(key, Arc::clone(image));
            return None;
        }
        self.textures.entry(key).or_insert_with(|| GpuTexture {
            _source: Arc::clone(image),
            texture: Texture::from_rgba(device, queue, image, Some("base colour"), true),
        });
        Some(key)
    }

    /// Uploads whatever `draw` needs and refreshes its per-node buffers.
    fn prepare_draw(&mut self, draw: &MeshDraw) -> Option<DrawItem> {
        if draw.mesh.geometry.indices.is_empty() {
            return None;
        }
        let geometry = self.prepare_geometry(&draw.mesh.geometry);
        let (texture, double_sided) = match &draw.mesh.material {
            Material::Standard(m) => (m.base_color_texture.as_ref(), m.double_sided),
            Material::Other(m) => (m.color_texture.as_ref(), false),
            Material::Shadow(_) => (None, true),
        };
        let texture_key = texture.and_then(|t| self.prepare_texture(t));

        let instance = draw.world.to_raw();
        let material = MaterialUniform::new(&draw.mesh.material, draw.mesh.receive_shadow);

        let stale = self
            .draws
            .get(&draw.node)
            .is_none_or(|gpu| gpu.texture_key != texture_key);
        if stale {
            let gpu = self.mk_gpu_draw(draw.node, texture_key, &instance, &material);
            self.draws.insert(draw.node, gpu);
        } else if let Some(gpu) = self.draws.get(&draw.node) {
            self.ctx
                .queue
                .write_buffer(&gpu.instance_buffer, 0, bytemuck::cast_slice(&[instance]));
            self.ctx
                .queue
                .write_buffer(&gpu.material_buffer, 0, bytemuck::cast_slice(&[material]));
        }
        Some(DrawItem {
            node: draw.node,
            geometry,
            double_sided,
        })
    }

    fn mk_gpu_draw(
        &self,
        node: NodeId,
        texture_key: Option<usize>,
        instance: &crate::data_structures::transform::TransformRaw,
        material: &MaterialUniform,
    ) -> GpuDraw {
        let device = &self.ctx.device;
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Instance Buffer", node)),
            contents: bytemuck::cast_slice(&[*instance]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        let material_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Material Buffer", node)),
            contents: bytemuck::cast_slice(&[*material]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let texture = texture_key
            .and_then(|key| self.textures.get(&key))
            .map(|t| &t.texture)
            .unwrap_or(&self.white);
        let sampler = texture.sampler.as_ref().or(self.white.sampler.as_ref());
        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: material_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            },
        ];
        if let Some(sampler) = sampler {
            entries.push(wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            });
        }
        let material_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.layouts.material,
            entries: &entries,
            label: Some("material_bind_group"),
        });
        GpuDraw {
            instance_buffer,
            material_buffer,
            material_bind_group,
            texture_key,
        }
    }

    fn draw_items(&self, pass: &mut wgpu::RenderPass<'_>, items: &[DrawItem], with_material: bool) {
        for item in items {
            let (Some(geometry), Some(gpu)) =
                (self.geometries.get(&item.geometry), self.draws.get(&item.node))
            else {
                continue;
            };
            if with_material {
                pass.set_bind_group(2, &gpu.material_bind_group, &[]);
            }
            pass.set_vertex_buffer(0, geometry.vertex_buffer.slice(..));
            pass.set_vertex_buffer(1, gpu.instance_buffer.slice(..));
            pass.set_index_buffer(geometry.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..geometry.num_elements, 0, 0..1);
        }
    }
}

fn mk_lighting_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    light_buffer: &wgpu::Buffer,
    shadow_map: &Texture,
    environment: &Texture,
) -> anyhow::Result<wgpu::BindGroup> {
    let (Some(shadow_sampler), Some(env_sampler)) =
        (shadow_map.sampler.as_ref(), environment.sampler.as_ref())
    else {
        bail!("shadow map and environment need samplers");
    };
    Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: light_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&shadow_map.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(shadow_sampler),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::TextureView(&environment.view),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: wgpu::BindingResource::Sampler(env_sampler),
            },
        ],
        label: Some("lighting_bind_group"),
    }))
}

impl FrameRenderer for GpuRenderer {
    fn render(
        &mut self,
        scene: &Scene,
        camera: &Camera,
        projection: &Projection,
    ) -> anyhow::Result<()> {
        let list = DrawList::collect(scene);

        self.sync_environment(list.background)?;

        self.camera_uniform.update_view_proj(camera, projection);
        self.ctx.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[self.camera_uniform]),
        );
        let light = LightUniform::from_draw_list(&list);
        self.ctx
            .queue
            .write_buffer(&self.light_buffer, 0, bytemuck::cast_slice(&[light]));

        let opaque: Vec<DrawItem> = list
            .opaque
            .iter()
            .filter_map(|draw| self.prepare_draw(draw))
            .collect();
        let catchers: Vec<DrawItem> = list
            .shadow_catchers
            .iter()
            .filter_map(|draw| self.prepare_draw(draw))
            .collect();
        let casters: Vec<DrawItem> = list
            .shadow_casters()
            .filter_map(|draw| {
                opaque.iter().find(|item| item.node == draw.node).map(|item| DrawItem {
                    node: item.node,
                    geometry: item.geometry,
                    double_sided: item.double_sided,
                })
            })
            .collect();
        // Nodes that left the scene release their buffers.
        let live: std::collections::HashSet<NodeId> = opaque
            .iter()
            .chain(catchers.iter())
            .map(|item| item.node)
            .collect();
        self.draws.retain(|node, _| live.contains(node));

        let output = match self.ctx.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("surface lost, reconfiguring");
                self.ctx.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("timed out waiting for the next frame");
                return Ok(());
            }
            Err(e) => bail!("cannot acquire the next frame: {}", e),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadow_map.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });
            if !casters.is_empty() {
                shadow_pass.set_pipeline(&self.pipelines.shadow);
                shadow_pass.set_bind_group(0, &self.shadow_bind_group, &[]);
                self.draw_items(&mut shadow_pass, &casters, false);
            }
        }
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });
            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
            render_pass.set_bind_group(1, &self.lighting_bind_group, &[]);

            if list.background.is_some() {
                render_pass.set_pipeline(&self.pipelines.skybox);
                render_pass.draw(0..3, 0..1);
            }

            let (double_sided, single_sided): (Vec<DrawItem>, Vec<DrawItem>) =
                opaque.into_iter().partition(|item| item.double_sided);
            render_pass.set_pipeline(&self.pipelines.standard);
            self.draw_items(&mut render_pass, &single_sided, true);
            render_pass.set_pipeline(&self.pipelines.standard_double_sided);
            self.draw_items(&mut render_pass, &double_sided, true);

            render_pass.set_pipeline(&self.pipelines.shadow_catcher);
            self.draw_items(&mut render_pass, &catchers, true);
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn resize(&mut self, viewport: &Viewport) {
        self.ctx.resize(viewport);
    }
}
