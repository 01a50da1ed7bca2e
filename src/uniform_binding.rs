//! # Uniform Binding Module
//!
//! This module defines the `UniformBinding` struct, which owns the GPU side of the per-frame
//! uniform data: a small ring of uniform buffers, one bind group per buffer, and the bind group
//! layout shared by all of them.
//!
//! ## Overview
//!
//! The CPU writes a fresh [`FrameUniforms`] record every frame while the GPU may still be
//! reading the record of the previous frame. Writing into the same buffer would race with
//! that read, so the binding keeps `frames_in_flight` buffers and rotates through them:
//!
//! 1. **Update**: [`UniformBinding::update_buffer`] waits until the submission that last read
//!    the current slot has completed, then overwrites the slot's 80 bytes.
//! 2. **Bind**: [`UniformBinding::bind_group`] returns the bind group of the current slot, which
//!    the render pass sets at group 0.
//! 3. **Advance**: after the frame has been submitted, [`UniformBinding::advance`] records the
//!    submission index against the slot and moves on to the next one.
//!
//! On the web the browser serializes queue work and `Device::poll` has nothing to wait for, so
//! the wait is skipped there.
//!
//! ## Shader Compatibility
//!
//! Every buffer is exposed at binding `0` to both shader stages. In WGSL:
//!
//! ```wgsl
//! @group(0) @binding(0)
//! var<uniform> frame: FrameUniforms;
//! ```
//!
//! The layout declares `min_binding_size` as [`FrameUniforms::SIZE`], so a shader struct of a
//! different size is rejected when the pipeline is created rather than read out of bounds.

use std::num::NonZeroU64;

use crate::uniform_buffer::FrameUniforms;

/// One uniform buffer of the ring together with the bind group exposing it.
struct UniformSlot {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,

    /// The last submission that read this slot, if any.
    last_submission: Option<wgpu::SubmissionIndex>,
}

/// Represents the binding of the per-frame uniform buffers to the GPU pipeline.
///
/// # Fields
///
/// - `bind_group_layout`: The layout shared by every slot, needed to build the pipeline
///   layout.
/// - The slots themselves are private; use [`UniformBinding::bind_group`] to bind the current
///   one.
pub struct UniformBinding {
    /// The layout specification for the bind groups.
    ///
    /// It describes a single uniform buffer at binding `0`, visible to the vertex and fragment
    /// stages, at least [`FrameUniforms::SIZE`] bytes long.
    pub bind_group_layout: wgpu::BindGroupLayout,

    slots: Vec<UniformSlot>,
    current: usize,
}

impl UniformBinding {
    /// Creates the bind group layout.
    ///
    /// Split from [`UniformBinding::new`] so resource initialization can check the layout and
    /// the buffers in separate steps.
    pub fn create_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(FrameUniforms::SIZE as u64),
                },
                count: None,
            }],
            label: Some("Frame Uniforms Bind Group Layout"),
        })
    }

    /// Allocates `frames_in_flight` zeroed uniform buffers of [`FrameUniforms::SIZE`] bytes.
    ///
    /// A count of zero is treated as one.
    pub fn create_buffers(device: &wgpu::Device, frames_in_flight: usize) -> Vec<wgpu::Buffer> {
        (0..frames_in_flight.max(1))
            .map(|index| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!("Frame Uniforms Buffer {index}")),
                    size: FrameUniforms::SIZE as wgpu::BufferAddress,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .collect()
    }

    /// Creates one bind group per buffer and assembles the ring.
    pub fn new(
        device: &wgpu::Device,
        bind_group_layout: wgpu::BindGroupLayout,
        buffers: Vec<wgpu::Buffer>,
    ) -> Self {
        let slots = buffers
            .into_iter()
            .enumerate()
            .map(|(index, buffer)| {
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    layout: &bind_group_layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    }],
                    label: Some(&format!("Frame Uniforms Bind Group {index}")),
                });
                UniformSlot {
                    buffer,
                    bind_group,
                    last_submission: None,
                }
            })
            .collect();

        Self {
            bind_group_layout,
            slots,
            current: 0,
        }
    }

    /// Number of slots in the ring.
    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    /// Overwrites the current slot with `uniforms`.
    ///
    /// Blocks until the GPU has finished the last frame that read this slot. With more than
    /// one slot that frame is at least one frame old, so the wait is normally already over.
    pub fn update_buffer(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        uniforms: &FrameUniforms,
    ) {
        let slot = &mut self.slots[self.current];
        let last_submission = slot.last_submission.take();

        #[cfg(not(target_arch = "wasm32"))]
        {
            if let Some(submission) = last_submission {
                let result = device.poll(wgpu::Maintain::WaitForSubmissionIndex(submission));
                wait_drained_queue(result);
            }
        }
        #[cfg(target_arch = "wasm32")]
        let _ = (device, last_submission);

        queue.write_buffer(&slot.buffer, 0, uniforms.as_bytes());
    }

    /// The bind group of the current slot.
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.slots[self.current].bind_group
    }

    /// Records the submission that read the current slot and rotates to the next slot.
    pub fn advance(&mut self, submission: wgpu::SubmissionIndex) {
        self.slots[self.current].last_submission = Some(submission);
        self.current = next_slot(self.current, self.slots.len());
    }
}

/// Whether a slot wait left the submission queue empty. Logged, since with more than one
/// slot a newer frame is normally still queued.
#[cfg_attr(target_arch = "wasm32", allow(dead_code))]
fn wait_drained_queue(result: wgpu::MaintainResult) -> bool {
    let drained = result.is_queue_empty();
    if drained {
        log::debug!("Uniform slot wait returned SubmissionQueueEmpty");
    }
    drained
}

fn next_slot(current: usize, len: usize) -> usize {
    (current + 1) % len.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_rotate_in_order() {
        let mut slot = 0;
        let mut visited = Vec::new();
        for _ in 0..5 {
            visited.push(slot);
            slot = next_slot(slot, 2);
        }
        assert_eq!(visited, vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn single_slot_ring_stays_put() {
        assert_eq!(next_slot(0, 1), 0);
        assert_eq!(next_slot(0, 0), 0);
    }

    #[test]
    fn drained_queue_is_reported() {
        assert!(wait_drained_queue(wgpu::MaintainResult::SubmissionQueueEmpty));
        assert!(!wait_drained_queue(wgpu::MaintainResult::Ok));
    }

    #[test]
    fn three_slot_ring_wraps() {
        assert_eq!(next_slot(2, 3), 0);
        assert_eq!(next_slot(1, 3), 2);
    }
}
