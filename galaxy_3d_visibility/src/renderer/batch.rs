/// Batch and BatchQueue - per-frame draw call lists.
///
/// A batch is one draw: a geometry drawn with one material pass, either
/// with its own world transform or as a range of an instance transform
/// buffer. Queues are rebuilt every frame, sorted, and optionally have
/// runs of identical static draws merged into instanced draws.

use std::sync::Arc;
use glam::Mat4;
use rdst::{RadixKey, RadixSort};
use crate::resource::{Geometry, Material, Pass};
use crate::scene::{DrawableKey, GeometryType};

/// How a batch sources its world transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BatchTransform {
    World(Mat4),
    /// Range of the owner's instance transform buffer
    Instances { start: u32, count: u32 },
}

#[derive(Debug, Clone)]
pub struct Batch {
    pub drawable: DrawableKey,
    pub geometry: Arc<Geometry>,
    pub material: Arc<Material>,
    pub pass: Arc<Pass>,
    /// Shader geometry bits, 0 for plain static geometry
    pub geometry_bits: u8,
    pub transform: BatchTransform,
    /// Shader hash, pass, material, geometry packed high to low
    pub sort_key: u64,
    /// Camera distance
    pub distance: f32,
}

impl Batch {
    pub fn new(
        drawable: DrawableKey,
        geometry: Arc<Geometry>,
        material: Arc<Material>,
        pass: Arc<Pass>,
        geometry_type: GeometryType,
        world_transform: Mat4,
        distance: f32,
    ) -> Self {
        let sort_key = state_sort_key(&pass, &material, &geometry);
        Self {
            drawable,
            geometry,
            material,
            pass,
            geometry_bits: geometry_type.bits(),
            transform: BatchTransform::World(world_transform),
            sort_key,
            distance,
        }
    }

    pub fn is_instanced(&self) -> bool {
        matches!(self.transform, BatchTransform::Instances { .. })
    }

    pub fn instance_count(&self) -> u32 {
        match self.transform {
            BatchTransform::World(_) => 1,
            BatchTransform::Instances { count, .. } => count,
        }
    }

    fn can_instance_with(&self, other: &Batch) -> bool {
        other.geometry_bits == 0
            && matches!(other.transform, BatchTransform::World(_))
            && Arc::ptr_eq(&self.pass, &other.pass)
            && Arc::ptr_eq(&self.geometry, &other.geometry)
    }
}

/// One 64-bit key so a single comparison replaces four
pub fn state_sort_key(pass: &Pass, material: &Material, geometry: &Geometry) -> u64 {
    ((pass.shader_hash() as u64) << 48)
        | ((pass.id() as u64) << 32)
        | ((material.id() as u64) << 16)
        | geometry.id() as u64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortMode {
    /// State key, nearer first within equal state
    State,
    FrontToBack,
    BackToFront,
}

/// Radix sort entry: state key above the distance bits
#[derive(Debug, Clone, Copy)]
struct SortEntry {
    key: u64,
    distance_bits: u32,
    index: u32,
}

impl RadixKey for SortEntry {
    const LEVELS: usize = 12;

    #[inline]
    fn get_level(&self, level: usize) -> u8 {
        if level < 4 {
            (self.distance_bits >> (level * 8)) as u8
        } else {
            (self.key >> ((level - 4) * 8)) as u8
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct BatchQueue {
    batches: Vec<Batch>,
}

impl BatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.batches.clear();
    }

    pub fn push(&mut self, batch: Batch) {
        self.batches.push(batch);
    }

    pub fn append(&mut self, batches: &mut Vec<Batch>) {
        self.batches.append(batches);
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Sort, then optionally merge runs of identical static draws.
    ///
    /// Merged batches append their world transforms to
    /// `instance_transforms` and the first batch of each run is rewritten
    /// to reference that range.
    pub fn sort(&mut self, instance_transforms: &mut Vec<Mat4>, mode: SortMode, convert_to_instanced: bool) {
        match mode {
            SortMode::State => self.sort_by_state(),
            SortMode::FrontToBack => self.batches.sort_by(|a, b| a.distance.total_cmp(&b.distance)),
            SortMode::BackToFront => self.batches.sort_by(|a, b| b.distance.total_cmp(&a.distance)),
        }

        if convert_to_instanced && self.batches.len() >= 2 {
            self.convert_to_instanced(instance_transforms);
        }
    }

    fn sort_by_state(&mut self) {
        if self.batches.len() < 2 {
            return;
        }

        let mut entries: Vec<SortEntry> = self.batches
            .iter()
            .enumerate()
            .map(|(index, batch)| SortEntry {
                key: batch.sort_key,
                distance_bits: batch.distance.max(0.0).to_bits(),
                index: index as u32,
            })
            .collect();
        entries.radix_sort_unstable();

        let mut slots: Vec<Option<Batch>> = self.batches.drain(..).map(Some).collect();
        self.batches.extend(entries.iter().filter_map(|entry| slots[entry.index as usize].take()));
    }

    fn convert_to_instanced(&mut self, instance_transforms: &mut Vec<Mat4>) {
        let batches = std::mem::take(&mut self.batches);
        let mut merged: Vec<Batch> = Vec::with_capacity(batches.len());

        let mut iter = batches.into_iter().peekable();
        while let Some(mut current) = iter.next() {
            let BatchTransform::World(first_transform) = current.transform else {
                merged.push(current);
                continue;
            };
            if current.geometry_bits != 0 {
                merged.push(current);
                continue;
            }

            let start = instance_transforms.len();
            while let Some(next) = iter.next_if(|next| current.can_instance_with(next)) {
                if let BatchTransform::World(transform) = next.transform {
                    if instance_transforms.len() == start {
                        instance_transforms.push(first_transform);
                    }
                    instance_transforms.push(transform);
                }
            }

            let count = instance_transforms.len() - start;
            if count > 0 {
                current.transform = BatchTransform::Instances { start: start as u32, count: count as u32 };
            }
            merged.push(current);
        }

        self.batches = merged;
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
