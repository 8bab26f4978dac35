//! Per-frame draw state and the skin-matrix upload arena.

use std::collections::HashMap;

use crate::util::{Mat4, Vec3};

#[derive(Debug, Default)]
struct SkinSlot {
    bones: Vec<[f32; 16]>,
    live: bool,
}

/// GPU-layout buffers for skin matrices, keyed by joint count.
///
/// Contents are valid only for the frame that uploaded them. At each frame
/// boundary, buffers uploaded during the frame that just ended keep their
/// allocation for reuse. Buffers that frame never touched are released.
#[derive(Debug, Default)]
pub struct SkinScratch {
    slots: HashMap<usize, SkinSlot>,
}

impl SkinScratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy `joints` into the buffer for their count and return it.
    pub fn upload(&mut self, joints: &[Mat4]) -> &[[f32; 16]] {
        let slot = self.slots.entry(joints.len()).or_insert_with(|| SkinSlot {
            bones: vec![[0.0; 16]; joints.len()],
            live: false,
        });
        for (dst, m) in slot.bones.iter_mut().zip(joints) {
            *dst = m.to_cols_array();
        }
        slot.live = true;
        &slot.bones
    }

    /// Raw bytes of this frame's upload with `joint_count` joints.
    pub fn as_bytes(&self, joint_count: usize) -> Option<&[u8]> {
        self.slots
            .get(&joint_count)
            .filter(|s| s.live)
            .map(|s| bytemuck::cast_slice(s.bones.as_slice()))
    }

    /// Number of buffers currently allocated.
    pub fn buffer_count(&self) -> usize {
        self.slots.len()
    }

    /// Close the current frame: drop buffers it did not use and mark the
    /// rest empty.
    pub fn end_frame(&mut self) {
        self.slots.retain(|_, s| s.live);
        for s in self.slots.values_mut() {
            s.live = false;
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

/// Camera matrices and scratch space for one frame.
#[derive(Debug)]
pub struct DrawFrame {
    pub projection: Mat4,
    pub view: Mat4,
    pub scratch: SkinScratch,
}

impl DrawFrame {
    pub fn new(projection: Mat4, view: Mat4) -> Self {
        Self {
            projection,
            view,
            scratch: SkinScratch::new(),
        }
    }

    /// Start the next frame with new camera matrices. Skin uploads from the
    /// previous frame are discarded.
    pub fn reset(&mut self, projection: Mat4, view: Mat4) {
        self.projection = projection;
        self.view = view;
        self.scratch.end_frame();
    }

    /// Camera position in world space.
    pub fn camera_position(&self) -> Vec3 {
        self.view.inverse().w_axis.truncate()
    }

    pub fn distance_to(&self, point: Vec3) -> f32 {
        self.camera_position().distance(point)
    }
}
