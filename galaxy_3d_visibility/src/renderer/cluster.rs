/// Cluster grid for clustered forward lighting.
///
/// The view frustum is cut into `NUM_CLUSTER_X` x `NUM_CLUSTER_Y` screen
/// cells and `NUM_CLUSTER_Z` exponentially spaced depth slices. Each cell
/// stores up to `MAX_LIGHTS_CLUSTER` light indices. Index 0 means "no
/// light", so light `i` of the uploaded light array is stored as `i`,
/// with entry 0 of that array left unused.
///
/// Cell volumes live in view space and only change with the projection.
/// Slices are culled independently so each one can run as its own task.

use std::sync::Arc;
use glam::{Mat4, Vec3};
use crate::camera::{Camera, Frustum};
use crate::config::{MAX_LIGHTS_CLUSTER, NUM_CLUSTERS, NUM_CLUSTER_X, NUM_CLUSTER_Y, NUM_CLUSTER_Z};
use crate::math::{BoundingBox, Intersection, Sphere};

/// Cells in one depth slice
pub const CLUSTERS_PER_SLICE: usize = NUM_CLUSTER_X * NUM_CLUSTER_Y;

/// One cell's view-space volume
#[derive(Debug, Clone)]
pub struct ClusterCell {
    pub frustum: Frustum,
    pub bounding_box: BoundingBox,
}

/// A local light in view space, ready for cell tests
#[derive(Debug, Clone)]
pub enum ClusterLight {
    Point { index: u8, sphere: Sphere },
    Spot { index: u8, frustum: Frustum, bounding_box: BoundingBox },
}

impl ClusterLight {
    /// Point light from its world-space sphere
    pub fn point(index: u8, world_sphere: &Sphere, view: &Mat4) -> Self {
        ClusterLight::Point {
            index,
            sphere: Sphere::new(view.transform_point3(world_sphere.center), world_sphere.radius),
        }
    }

    /// Spot light from its world-space cone
    pub fn spot(index: u8, world_frustum: &Frustum, view: &Mat4) -> Self {
        let frustum = world_frustum.transformed(view);
        let bounding_box = frustum.bounding_box();
        ClusterLight::Spot { index, frustum, bounding_box }
    }

    pub fn index(&self) -> u8 {
        match self {
            ClusterLight::Point { index, .. } | ClusterLight::Spot { index, .. } => *index,
        }
    }

    /// View-space depth range covered by the light, as positive distances
    fn depth_range(&self) -> (f32, f32) {
        let bbox = match self {
            ClusterLight::Point { sphere, .. } => sphere.bounding_box(),
            ClusterLight::Spot { bounding_box, .. } => *bounding_box,
        };
        (-bbox.max.z, -bbox.min.z)
    }

    fn touches(&self, cell: &ClusterCell) -> bool {
        match self {
            ClusterLight::Point { sphere, .. } => {
                sphere.intersects_box(&cell.bounding_box)
                    && cell.frustum.is_inside_sphere_fast(sphere) != Intersection::Outside
            }
            ClusterLight::Spot { frustum, bounding_box, .. } => {
                bounding_box.intersects(&cell.bounding_box)
                    && cell.frustum.is_inside_fast(bounding_box) != Intersection::Outside
                    && frustum.is_inside_fast(&cell.bounding_box) != Intersection::Outside
            }
        }
    }
}

/// Light lists of one depth slice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceLights {
    pub slice: usize,
    /// Light count per cell
    pub counts: Vec<u8>,
    /// `MAX_LIGHTS_CLUSTER` indices per cell
    pub indices: Vec<u8>,
}

#[derive(Debug)]
pub struct ClusterGrid {
    cells: Arc<Vec<ClusterCell>>,
    /// Slice start distances, plus the far end
    slice_depths: [f32; NUM_CLUSTER_Z + 1],
    /// Projection the cells were built for
    projection: Option<Mat4>,
    counts: Vec<u8>,
    indices: Vec<u8>,
}

impl Default for ClusterGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusterGrid {
    pub fn new() -> Self {
        Self {
            cells: Arc::new(Vec::new()),
            slice_depths: [0.0; NUM_CLUSTER_Z + 1],
            projection: None,
            counts: vec![0; NUM_CLUSTERS],
            indices: vec![0; NUM_CLUSTERS * MAX_LIGHTS_CLUSTER],
        }
    }

    /// Rebuild the cell volumes if the camera projection changed.
    ///
    /// Returns whether they were rebuilt.
    pub fn define(&mut self, camera: &Camera) -> bool {
        let projection = camera.projection_matrix();
        if self.projection == Some(projection) {
            return false;
        }

        let near = camera.near_clip().max(f32::EPSILON);
        let far = camera.far_clip().max(near);
        for (z, depth) in self.slice_depths.iter_mut().enumerate() {
            *depth = slice_depth(z, near, far);
        }

        let mut cells = Vec::with_capacity(NUM_CLUSTERS);
        for z in 0..NUM_CLUSTER_Z {
            let slice = camera.view_space_split_frustum(self.slice_depths[z], self.slice_depths[z + 1]);
            // vertex 0 is the +x +y corner of each end
            let near_half = slice.vertices[0];
            let far_half = slice.vertices[4];

            for y in 0..NUM_CLUSTER_Y {
                for x in 0..NUM_CLUSTER_X {
                    let corner = |half: Vec3, fx: usize, fy: usize| {
                        Vec3::new(
                            half.x * (fx as f32 / NUM_CLUSTER_X as f32 * 2.0 - 1.0),
                            half.y * (1.0 - fy as f32 / NUM_CLUSTER_Y as f32 * 2.0),
                            half.z,
                        )
                    };
                    let vertices = [
                        corner(near_half, x + 1, y),
                        corner(near_half, x + 1, y + 1),
                        corner(near_half, x, y + 1),
                        corner(near_half, x, y),
                        corner(far_half, x + 1, y),
                        corner(far_half, x + 1, y + 1),
                        corner(far_half, x, y + 1),
                        corner(far_half, x, y),
                    ];
                    cells.push(ClusterCell {
                        frustum: Frustum::from_vertices(vertices),
                        bounding_box: BoundingBox::from_points(&vertices),
                    });
                }
            }
        }

        self.cells = Arc::new(cells);
        self.projection = Some(projection);
        true
    }

    /// Shared cell volumes, for slice tasks
    pub fn cells(&self) -> Arc<Vec<ClusterCell>> {
        self.cells.clone()
    }

    pub fn is_defined(&self) -> bool {
        self.projection.is_some()
    }

    /// Near distance of each slice followed by the far distance
    pub fn slice_depths(&self) -> &[f32] {
        &self.slice_depths
    }

    /// Zero every cell
    pub fn clear(&mut self) {
        self.counts.fill(0);
        self.indices.fill(0);
    }

    /// Copy one slice's result into the grid
    pub fn store_slice(&mut self, result: &SliceLights) {
        let cell_start = result.slice * CLUSTERS_PER_SLICE;
        let cell_end = cell_start + CLUSTERS_PER_SLICE;
        if cell_end > NUM_CLUSTERS || result.counts.len() != CLUSTERS_PER_SLICE {
            return;
        }
        self.counts[cell_start..cell_end].copy_from_slice(&result.counts);
        self.indices[cell_start * MAX_LIGHTS_CLUSTER..cell_end * MAX_LIGHTS_CLUSTER].copy_from_slice(&result.indices);
    }

    /// Cull every slice on the calling thread
    pub fn cull_lights(&mut self, lights: &[ClusterLight], max_per_cell: usize) {
        let cells = self.cells.clone();
        for slice in 0..NUM_CLUSTER_Z {
            let result = cull_slice(&cells, slice, lights, max_per_cell);
            self.store_slice(&result);
        }
    }

    /// Light count of each cell, x fastest, then y, then z
    pub fn counts(&self) -> &[u8] {
        &self.counts
    }

    pub fn indices(&self) -> &[u8] {
        &self.indices
    }

    /// Lights stored in one cell
    pub fn cell_lights(&self, x: usize, y: usize, z: usize) -> &[u8] {
        let cell = cell_index(x, y, z);
        if cell >= NUM_CLUSTERS {
            return &[];
        }
        let start = cell * MAX_LIGHTS_CLUSTER;
        &self.indices[start..start + self.counts[cell] as usize]
    }

    pub fn cell(&self, x: usize, y: usize, z: usize) -> Option<&ClusterCell> {
        self.cells.get(cell_index(x, y, z))
    }
}

pub fn cell_index(x: usize, y: usize, z: usize) -> usize {
    z * CLUSTERS_PER_SLICE + y * NUM_CLUSTER_X + x
}

/// Exponential slice boundary: slice `z` starts at near * (far / near)^(z / NUM_CLUSTER_Z)
pub fn slice_depth(z: usize, near: f32, far: f32) -> f32 {
    if z >= NUM_CLUSTER_Z {
        return far;
    }
    near * (far / near).powf(z as f32 / NUM_CLUSTER_Z as f32)
}

/// Build one slice's light lists from scratch.
///
/// Cells keep at most `max_per_cell` lights, in the order given; the rest
/// are dropped.
pub fn cull_slice(cells: &[ClusterCell], slice: usize, lights: &[ClusterLight], max_per_cell: usize) -> SliceLights {
    let max_per_cell = max_per_cell.min(MAX_LIGHTS_CLUSTER);
    let mut result = SliceLights {
        slice,
        counts: vec![0; CLUSTERS_PER_SLICE],
        indices: vec![0; CLUSTERS_PER_SLICE * MAX_LIGHTS_CLUSTER],
    };

    let first = slice * CLUSTERS_PER_SLICE;
    let Some(slice_cells) = cells.get(first..first + CLUSTERS_PER_SLICE) else {
        return result;
    };

    let slice_near = -slice_cells[0].bounding_box.max.z;
    let slice_far = -slice_cells[0].bounding_box.min.z;

    for light in lights {
        let (light_near, light_far) = light.depth_range();
        if light_far < slice_near || light_near > slice_far {
            continue;
        }

        for (cell_index, cell) in slice_cells.iter().enumerate() {
            let count = result.counts[cell_index] as usize;
            if count >= max_per_cell || !light.touches(cell) {
                continue;
            }
            result.indices[cell_index * MAX_LIGHTS_CLUSTER + count] = light.index();
            result.counts[cell_index] += 1;
        }
    }

    result
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod tests;
