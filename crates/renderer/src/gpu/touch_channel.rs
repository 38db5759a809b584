use wgpu::util::{DeviceExt, TextureDataOrder};

use crate::touch::{TouchTexture, TOUCH_TEXTURE_SIZE};

const BYTES_PER_TEXEL: u32 = 4;

/// GPU copy of the trail raster plus the sampler the flow program reads it with.
///
/// The raster holds direction and intensity data rather than color, so it is
/// always `Rgba8Unorm` regardless of the surface color space.
pub(crate) struct TouchChannel {
    texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl TouchChannel {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, initial: &[u8]) -> Self {
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("touch trail texture"),
                size: extent(),
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            TextureDataOrder::LayerMajor,
            initial,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("touch trail sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Uploads the raster if it changed since the last upload.
    pub fn sync(&self, queue: &wgpu::Queue, touch: &mut TouchTexture) -> bool {
        if !touch.take_dirty() {
            return false;
        }
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            touch.pixels(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(TOUCH_TEXTURE_SIZE * BYTES_PER_TEXEL),
                rows_per_image: Some(TOUCH_TEXTURE_SIZE),
            },
            extent(),
        );
        true
    }
}

fn extent() -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: TOUCH_TEXTURE_SIZE,
        height: TOUCH_TEXTURE_SIZE,
        depth_or_array_layers: 1,
    }
}
