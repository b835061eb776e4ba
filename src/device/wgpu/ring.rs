//! Dynamic-offset uniform ring.
//!
//! Every uniform snapshot of a frame is written into one buffer at
//! `slot * stride` and bound with a dynamic offset. The buffer grows to the
//! next power of two when a frame needs more slots; it never shrinks.

use std::num::NonZeroU64;

pub struct UniformRing {
    label: &'static str,
    item_size: u64,
    stride: u64,
    capacity: u64,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    staging: Vec<u8>,
}

#[inline]
fn align_to(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

impl UniformRing {
    const INITIAL_CAPACITY: u64 = 16;

    #[must_use]
    pub fn layout(device: &wgpu::Device, label: &'static str, item_size: u64) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(item_size),
                },
                count: None,
            }],
        })
    }

    #[must_use]
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        label: &'static str,
        item_size: u64,
    ) -> Self {
        let alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment);
        let stride = align_to(item_size, alignment);
        let (buffer, bind_group) =
            Self::allocate(device, layout, label, item_size, stride, Self::INITIAL_CAPACITY);
        Self {
            label,
            item_size,
            stride,
            capacity: Self::INITIAL_CAPACITY,
            buffer,
            bind_group,
            staging: Vec::new(),
        }
    }

    fn allocate(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        label: &'static str,
        item_size: u64,
        stride: u64,
        capacity: u64,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: stride * capacity,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(item_size),
                }),
            }],
        });
        (buffer, bind_group)
    }

    /// Uploads `items` into consecutive slots, growing the buffer if needed.
    pub fn write<'a>(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        items: impl ExactSizeIterator<Item = &'a [u8]>,
    ) {
        let count = items.len() as u64;
        if count == 0 {
            return;
        }
        if count > self.capacity {
            let capacity = count.next_power_of_two();
            log::debug!("UniformRing {}: growing to {capacity} slots", self.label);
            let (buffer, bind_group) =
                Self::allocate(device, layout, self.label, self.item_size, self.stride, capacity);
            self.buffer = buffer;
            self.bind_group = bind_group;
            self.capacity = capacity;
        }

        self.staging.clear();
        self.staging.resize((self.stride * count) as usize, 0);
        for (slot, bytes) in items.enumerate() {
            let start = slot * self.stride as usize;
            self.staging[start..start + bytes.len()].copy_from_slice(bytes);
        }
        queue.write_buffer(&self.buffer, 0, &self.staging);
    }

    #[inline]
    #[must_use]
    pub fn offset(&self, slot: u32) -> u32 {
        (u64::from(slot) * self.stride) as u32
    }

    #[inline]
    #[must_use]
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

#[cfg(test)]
mod tests {
    use super::align_to;

    #[test]
    fn stride_respects_offset_alignment() {
        assert_eq!(align_to(48, 256), 256);
        assert_eq!(align_to(256, 256), 256);
        assert_eq!(align_to(912, 256), 1024);
    }
}
