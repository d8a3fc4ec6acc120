//! Depth buffer matching the swap chain size.

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

pub struct DepthTarget {
    // Keep the texture alive for the lifetime of the view.
    _tex: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl DepthTarget {
    pub fn new(device: &wgpu::Device, size: winit::dpi::PhysicalSize<u32>) -> Self {
        let tex = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Scene Depth Target"),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        Self {
            view: tex.create_view(&wgpu::TextureViewDescriptor::default()),
            _tex: tex,
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, size: winit::dpi::PhysicalSize<u32>) {
        *self = Self::new(device, size);
    }
}
