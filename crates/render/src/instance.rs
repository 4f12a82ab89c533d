//! GPU instance buffers for drawing many copies of one model.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};

/// Per-instance model matrix in column-major order, ready for upload.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstanceTransform {
    /// Column-major 4x4 model matrix.
    pub model: [[f32; 4]; 4],
}

impl InstanceTransform {
    /// Zero-scale placeholder for unused slots; renders as nothing.
    pub const HIDDEN: Self = Self {
        model: [[0.0; 4]; 4],
    };

    /// Build from translation, rotation and uniform scale.
    pub fn from_trs(translation: Vec3, rotation: Quat, scale: f32) -> Self {
        let model = Mat4::from_scale_rotation_translation(Vec3::splat(scale), rotation, translation);
        Self {
            model: model.to_cols_array_2d(),
        }
    }

    /// Translation component.
    pub fn translation(&self) -> Vec3 {
        Vec3::new(self.model[3][0], self.model[3][1], self.model[3][2])
    }

    /// Uniform scale, measured from the first basis column.
    pub fn scale(&self) -> f32 {
        Vec3::new(self.model[0][0], self.model[0][1], self.model[0][2]).length()
    }

    /// Whether this slot renders nothing.
    pub fn is_hidden(&self) -> bool {
        self.scale() == 0.0
    }
}

/// Fixed-capacity array of instance transforms with a dirty flag.
///
/// Only the first `visible` entries are drawn. The owning pool is responsible
/// for keeping live instances packed into that prefix or, as here, for hiding
/// freed slots with [`InstanceTransform::HIDDEN`].
#[derive(Debug, Clone)]
pub struct InstanceBuffer {
    transforms: Vec<InstanceTransform>,
    visible: usize,
    dirty: bool,
}

impl InstanceBuffer {
    /// Buffer of `capacity` hidden instances.
    pub fn new(capacity: usize) -> Self {
        Self {
            transforms: vec![InstanceTransform::HIDDEN; capacity],
            visible: 0,
            dirty: true,
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.transforms.len()
    }

    /// Write a slot. Out-of-range slots are ignored and return `false`.
    pub fn set(&mut self, slot: usize, transform: InstanceTransform) -> bool {
        match self.transforms.get_mut(slot) {
            Some(entry) => {
                *entry = transform;
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    /// Replace a slot with the hidden placeholder.
    pub fn hide(&mut self, slot: usize) -> bool {
        self.set(slot, InstanceTransform::HIDDEN)
    }

    /// Read a slot.
    pub fn get(&self, slot: usize) -> Option<&InstanceTransform> {
        self.transforms.get(slot)
    }

    /// Set the draw count, clamped to capacity.
    pub fn set_visible(&mut self, count: usize) {
        let count = count.min(self.capacity());
        if count != self.visible {
            self.visible = count;
            self.dirty = true;
        }
    }

    /// Current draw count.
    pub fn visible(&self) -> usize {
        self.visible
    }

    /// Whether the buffer changed since the last [`take_dirty`](Self::take_dirty).
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear and return the dirty flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// All slots.
    pub fn transforms(&self) -> &[InstanceTransform] {
        &self.transforms
    }

    /// Raw bytes for GPU upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.transforms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trs_round_trips_translation_and_scale() {
        let t = InstanceTransform::from_trs(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_y(1.2),
            2.5,
        );
        assert_eq!(t.translation(), Vec3::new(1.0, 2.0, 3.0));
        assert!((t.scale() - 2.5).abs() < 1e-5);
        assert!(!t.is_hidden());
        assert!(InstanceTransform::HIDDEN.is_hidden());
    }

    #[test]
    fn buffer_tracks_dirty_and_visible() {
        let mut buffer = InstanceBuffer::new(4);
        assert!(buffer.take_dirty());
        assert!(!buffer.is_dirty());

        assert!(buffer.set(1, InstanceTransform::from_trs(Vec3::ONE, Quat::IDENTITY, 1.0)));
        assert!(buffer.is_dirty());
        assert!(!buffer.set(4, InstanceTransform::HIDDEN));

        buffer.take_dirty();
        buffer.set_visible(9);
        assert_eq!(buffer.visible(), 4);
        assert!(buffer.take_dirty());
        buffer.set_visible(4);
        assert!(!buffer.is_dirty());
    }

    #[test]
    fn bytes_cover_every_slot() {
        let buffer = InstanceBuffer::new(3);
        assert_eq!(
            buffer.as_bytes().len(),
            3 * std::mem::size_of::<InstanceTransform>()
        );
        assert_eq!(std::mem::size_of::<InstanceTransform>(), 64);
    }
}
