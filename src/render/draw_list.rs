//! Scene-level ordering of instance draws by camera distance.

/// One instance queued for drawing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawEntry {
    pub instance: usize,
    pub distance: f32,
}

/// Instances to draw this frame, with their distance to the camera.
#[derive(Clone, Debug, Default)]
pub struct DrawList {
    entries: Vec<DrawEntry>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, instance: usize, distance: f32) {
        self.entries.push(DrawEntry { instance, distance });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[DrawEntry] {
        &self.entries
    }

    /// Instance order for the opaque pass: nearest first when sorting.
    pub fn opaque_order(&self, front_to_back: bool) -> Vec<usize> {
        let mut e = self.entries.clone();
        if front_to_back {
            e.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        }
        e.into_iter().map(|d| d.instance).collect()
    }

    /// Instance order for the translucent pass: farthest first when sorting.
    pub fn translucent_order(&self, back_to_front: bool) -> Vec<usize> {
        let mut e = self.entries.clone();
        if back_to_front {
            e.sort_by(|a, b| b.distance.total_cmp(&a.distance));
        }
        e.into_iter().map(|d| d.instance).collect()
    }
}
