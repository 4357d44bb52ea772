/// OcclusionBuffer - software depth rasterizer for occlusion culling.
///
/// Occluder triangles are clipped, projected and scan-converted into a
/// small integer depth buffer from the main camera. Depth is `z / w`
/// scaled by `OCCLUSION_Z_SCALE` (smaller = closer) and screen X is
/// stepped in 16.16 fixed point. A min/max mip chain over the buffer lets
/// `is_visible` settle most boxes without touching full resolution.
///
/// Rasterization happens on one thread before the frame's collect tasks
/// start; afterwards the buffer is shared read-only.

use glam::{Mat4, Vec3, Vec4};
use crate::camera::Camera;
use crate::config::{OcclusionConfig, OCCLUSION_MIN_SIZE, OCCLUSION_X_SCALE, OCCLUSION_Z_SCALE};
use crate::engine_debug;
use crate::math::{BoundingBox, IntRect};

/// Cleared depth: farther than anything rasterized
const DEPTH_FAR: i32 = OCCLUSION_Z_SCALE as i32;

/// Clip planes in clip space, as `dot(plane, v) >= 0` inside
const CLIP_PLANES: [Vec4; 6] = [
    Vec4::new(-1.0, 0.0, 0.0, 1.0),
    Vec4::new(1.0, 0.0, 0.0, 1.0),
    Vec4::new(0.0, -1.0, 0.0, 1.0),
    Vec4::new(0.0, 1.0, 0.0, 1.0),
    Vec4::new(0.0, 0.0, -1.0, 1.0),
    Vec4::new(0.0, 0.0, 1.0, 0.0),
];

/// Polygon vertex capacity: a triangle clipped by six planes
const MAX_CLIP_VERTICES: usize = 9;

/// Depth range of one mip texel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthValue {
    pub min: i32,
    pub max: i32,
}

#[derive(Debug)]
struct MipLevel {
    width: i32,
    height: i32,
    values: Vec<DepthValue>,
}

// ===== RASTERIZER STRUCTURES =====

/// Depth gradients of a screen-space triangle
struct Gradients {
    dz_dx: f32,
    dz_dy: f32,
}

impl Gradients {
    fn new(v: &[Vec3; 3]) -> Self {
        let inv_dx = 1.0 / (((v[1].x - v[2].x) * (v[0].y - v[2].y)) - ((v[0].x - v[2].x) * (v[1].y - v[2].y)));
        let inv_dy = -inv_dx;
        Self {
            dz_dx: inv_dx * (((v[1].z - v[2].z) * (v[0].y - v[2].y)) - ((v[0].z - v[2].z) * (v[1].y - v[2].y))),
            dz_dy: inv_dy * (((v[1].z - v[2].z) * (v[0].x - v[2].x)) - ((v[0].z - v[2].z) * (v[1].x - v[2].x))),
        }
    }
}

/// One triangle edge, stepped one scanline at a time
#[derive(Clone, Copy)]
struct Edge {
    x: i32,
    x_step: i32,
    top_y: i32,
    bottom_y: i32,
    z: f32,
    z_step: f32,
}

impl Edge {
    fn new(gradients: &Gradients, top: Vec3, bottom: Vec3) -> Self {
        let top_y = top.y as i32;
        let bottom_y = bottom.y as i32;
        let slope = (bottom.x - top.x) / (bottom.y - top.y);
        let y_pre_step = (top_y + 1) as f32 - top.y;
        let x_pre_step = slope * y_pre_step;
        Self {
            x: ((x_pre_step + top.x) * OCCLUSION_X_SCALE + 0.5) as i32,
            x_step: (slope * OCCLUSION_X_SCALE + 0.5) as i32,
            top_y,
            bottom_y,
            z: top.z + x_pre_step * gradients.dz_dx + y_pre_step * gradients.dz_dy,
            z_step: slope * gradients.dz_dx + gradients.dz_dy,
        }
    }
}

// ===== OCCLUSION BUFFER =====

#[derive(Debug)]
pub struct OcclusionBuffer {
    width: i32,
    height: i32,
    buffer: Vec<i32>,
    mip_levels: Vec<MipLevel>,
    /// Whether the mip chain matches the buffer
    hierarchy_ready: bool,
    view_projection: Mat4,
    scale_x: f32,
    scale_y: f32,
    offset_x: f32,
    offset_y: f32,
    num_triangles: usize,
    max_triangles: usize,
    depth_bias: i32,
}

impl OcclusionBuffer {
    pub fn new(config: &OcclusionConfig) -> Self {
        let mut buffer = Self {
            width: 0,
            height: 0,
            buffer: Vec::new(),
            mip_levels: Vec::new(),
            hierarchy_ready: false,
            view_projection: Mat4::IDENTITY,
            scale_x: 0.0,
            scale_y: 0.0,
            offset_x: 0.0,
            offset_y: 0.0,
            num_triangles: 0,
            max_triangles: config.max_triangles,
            depth_bias: config.depth_bias,
        };
        buffer.set_size(config.width, config.height);
        buffer
    }

    /// Resize the buffer and rebuild the mip chain layout. Clears the
    /// contents. Returns false for a non-positive size.
    pub fn set_size(&mut self, width: i32, height: i32) -> bool {
        if width <= 0 || height <= 0 {
            return false;
        }
        if width == self.width && height == self.height {
            return true;
        }

        self.width = width;
        self.height = height;
        self.buffer = vec![DEPTH_FAR; (width * height) as usize];

        self.mip_levels.clear();
        let (mut mip_width, mut mip_height) = (width, height);
        loop {
            mip_width = (mip_width + 1) / 2;
            mip_height = (mip_height + 1) / 2;
            self.mip_levels.push(MipLevel {
                width: mip_width,
                height: mip_height,
                values: vec![DepthValue { min: DEPTH_FAR, max: DEPTH_FAR }; (mip_width * mip_height) as usize],
            });
            if mip_width <= OCCLUSION_MIN_SIZE && mip_height <= OCCLUSION_MIN_SIZE {
                break;
            }
        }

        // Half pixel offset
        self.scale_x = 0.5 * width as f32;
        self.scale_y = -0.5 * height as f32;
        self.offset_x = 0.5 * width as f32 + 0.5;
        self.offset_y = 0.5 * height as f32 + 0.5;
        self.reset();
        self.hierarchy_ready = false;

        engine_debug!("galaxy3d::OcclusionBuffer", "Set occlusion buffer size {}x{} with {} mip levels",
            width, height, self.mip_levels.len());
        true
    }

    pub fn set_view(&mut self, camera: &Camera) {
        self.view_projection = camera.view_projection_matrix();
    }

    pub fn set_view_projection(&mut self, view_projection: Mat4) {
        self.view_projection = view_projection;
    }

    pub fn set_max_triangles(&mut self, max_triangles: usize) {
        self.max_triangles = max_triangles;
    }

    pub fn set_depth_bias(&mut self, depth_bias: i32) {
        self.depth_bias = depth_bias;
    }

    /// Reset the triangle count without clearing depth.
    pub fn reset(&mut self) {
        self.num_triangles = 0;
    }

    /// Clear depth and reset the triangle count.
    pub fn clear(&mut self) {
        self.buffer.fill(DEPTH_FAR);
        self.hierarchy_ready = false;
        self.reset();
    }

    // ===== DRAWING =====

    /// Rasterize a triangle mesh, indexed or as a plain triangle list.
    ///
    /// Returns false once the triangle budget is exhausted; remaining
    /// triangles of the mesh are not drawn.
    pub fn draw(&mut self, model: &Mat4, vertices: &[Vec3], indices: Option<&[u32]>) -> bool {
        let transform = self.view_projection * *model;
        let project = |v: Vec3| transform * v.extend(1.0);
        self.hierarchy_ready = false;

        match indices {
            Some(indices) => {
                for triangle in indices.chunks_exact(3) {
                    if self.num_triangles >= self.max_triangles {
                        return false;
                    }
                    let corner = |i: usize| vertices.get(triangle[i] as usize).copied();
                    if let (Some(v0), Some(v1), Some(v2)) = (corner(0), corner(1), corner(2)) {
                        self.draw_triangle([project(v0), project(v1), project(v2)]);
                    }
                }
            }
            None => {
                for triangle in vertices.chunks_exact(3) {
                    if self.num_triangles >= self.max_triangles {
                        return false;
                    }
                    self.draw_triangle([project(triangle[0]), project(triangle[1]), project(triangle[2])]);
                }
            }
        }
        true
    }

    fn draw_triangle(&mut self, clip: [Vec4; 3]) {
        let outside = |v: &Vec4, plane: &Vec4| plane.dot(*v) < 0.0;

        let mut and_mask = u8::MAX;
        let mut or_mask = 0u8;
        for v in &clip {
            let mut mask = 0u8;
            for (bit, plane) in CLIP_PLANES.iter().enumerate() {
                if outside(v, plane) {
                    mask |= 1 << bit;
                }
            }
            and_mask &= mask;
            or_mask |= mask;
        }

        // Entirely behind one plane
        if and_mask != 0 {
            return;
        }

        if or_mask == 0 {
            self.draw_triangle_2d([self.viewport_transform(clip[0]), self.viewport_transform(clip[1]), self.viewport_transform(clip[2])]);
            return;
        }

        let mut polygon = [Vec4::ZERO; MAX_CLIP_VERTICES];
        polygon[..3].copy_from_slice(&clip);
        let mut count = 3;
        for (bit, plane) in CLIP_PLANES.iter().enumerate() {
            if or_mask & (1 << bit) != 0 {
                count = clip_polygon(&mut polygon, count, plane);
                if count < 3 {
                    return;
                }
            }
        }

        let first = self.viewport_transform(polygon[0]);
        for i in 1..count - 1 {
            if self.num_triangles >= self.max_triangles {
                return;
            }
            self.draw_triangle_2d([first, self.viewport_transform(polygon[i]), self.viewport_transform(polygon[i + 1])]);
        }
    }

    fn viewport_transform(&self, v: Vec4) -> Vec3 {
        let inv_w = 1.0 / v.w;
        Vec3::new(
            inv_w * v.x * self.scale_x + self.offset_x,
            inv_w * v.y * self.scale_y + self.offset_y,
            inv_w * v.z * OCCLUSION_Z_SCALE,
        )
    }

    /// Scan-convert a screen-space triangle. Back faces (clockwise in
    /// clip space) and degenerate triangles are skipped.
    fn draw_triangle_2d(&mut self, v: [Vec3; 3]) {
        let signed_area = (v[1].x - v[0].x) * (v[2].y - v[0].y) - (v[1].y - v[0].y) * (v[2].x - v[0].x);
        // Screen Y points down, so front faces have negative area
        if !(signed_area < 0.0) {
            return;
        }
        self.num_triangles += 1;

        // Sort vertices top to bottom
        let mut sorted = v;
        sorted.sort_by(|a, b| a.y.total_cmp(&b.y));
        let [top, middle, bottom] = sorted;

        let gradients = Gradients::new(&v);
        let top_to_middle = Edge::new(&gradients, top, middle);
        let top_to_bottom = Edge::new(&gradients, top, bottom);
        let middle_to_bottom = Edge::new(&gradients, middle, bottom);

        // Whether the middle vertex lies right of the long edge
        let t = (middle.y - top.y) / (bottom.y - top.y);
        let long_x = top.x + (bottom.x - top.x) * t;
        let middle_is_right = middle.x > long_x;

        if middle_is_right {
            let mut left = top_to_bottom;
            let mut right = top_to_middle;
            self.rasterize_spans(&mut left, &mut right, top_to_middle.top_y, top_to_middle.bottom_y, gradients.dz_dx);
            right = middle_to_bottom;
            self.rasterize_spans(&mut left, &mut right, middle_to_bottom.top_y, middle_to_bottom.bottom_y, gradients.dz_dx);
        } else {
            let mut left = top_to_middle;
            let mut right = top_to_bottom;
            self.rasterize_spans(&mut left, &mut right, top_to_middle.top_y, top_to_middle.bottom_y, gradients.dz_dx);
            left = middle_to_bottom;
            self.rasterize_spans(&mut left, &mut right, middle_to_bottom.top_y, middle_to_bottom.bottom_y, gradients.dz_dx);
        }
    }

    /// Fill rows `top_y..bottom_y` between two edges, keeping the minimum depth.
    fn rasterize_spans(&mut self, left: &mut Edge, right: &mut Edge, mut top_y: i32, mut bottom_y: i32, dz_dx: f32) {
        if top_y >= bottom_y {
            return;
        }

        // Advance past rows above the buffer
        if top_y < 0 {
            let clip = (-top_y).min(bottom_y - top_y);
            left.x = left.x.wrapping_add(left.x_step.wrapping_mul(clip));
            left.z += left.z_step * clip as f32;
            right.x = right.x.wrapping_add(right.x_step.wrapping_mul(clip));
            top_y += clip;
        }
        let skipped_bottom = (bottom_y - self.height).max(0);
        bottom_y = bottom_y.min(self.height);

        for y in top_y..bottom_y {
            let start = left.x >> 16;
            let end = (right.x >> 16).min(self.width);
            let mut z = left.z;
            let mut x = start;
            if x < 0 {
                z += dz_dx * (-x) as f32;
                x = 0;
            }

            let row = (y * self.width) as usize;
            while x < end {
                let depth = z as i32;
                let dest = &mut self.buffer[row + x as usize];
                if depth < *dest {
                    *dest = depth;
                }
                z += dz_dx;
                x += 1;
            }

            left.x = left.x.wrapping_add(left.x_step);
            left.z += left.z_step;
            right.x = right.x.wrapping_add(right.x_step);
        }

        // Keep the edges in step for the second half of the triangle
        if skipped_bottom > 0 {
            left.x = left.x.wrapping_add(left.x_step.wrapping_mul(skipped_bottom));
            left.z += left.z_step * skipped_bottom as f32;
            right.x = right.x.wrapping_add(right.x_step.wrapping_mul(skipped_bottom));
        }
    }

    // ===== DEPTH HIERARCHY =====

    /// Build the min/max mip chain from the full-resolution buffer.
    pub fn build_depth_hierarchy(&mut self) {
        let Some(first) = self.mip_levels.first_mut() else {
            return;
        };
        reduce_level(&self.buffer, self.width, self.height, first, |value| DepthValue { min: value, max: value });

        for i in 1..self.mip_levels.len() {
            let (done, rest) = self.mip_levels.split_at_mut(i);
            let previous = &done[i - 1];
            reduce_level(&previous.values, previous.width, previous.height, &mut rest[0], |value| value);
        }
        self.hierarchy_ready = true;
    }

    // ===== TESTING =====

    /// Conservative visibility test of a world-space box.
    ///
    /// True when nothing has been drawn, when any corner is at or behind
    /// the near plane, or when any covered texel is not nearer than the
    /// box's nearest depth.
    pub fn is_visible(&self, bbox: &BoundingBox) -> bool {
        if self.num_triangles == 0 || !bbox.is_defined() {
            return true;
        }

        let mut min_x = f32::MAX;
        let mut max_x = f32::MIN;
        let mut min_y = f32::MAX;
        let mut max_y = f32::MIN;
        let mut min_z = f32::MAX;
        for corner in bbox.corners() {
            let clip = self.view_projection * corner.extend(1.0);
            if clip.z <= 0.0 {
                return true;
            }
            let projected = self.viewport_transform(clip);
            min_x = min_x.min(projected.x);
            max_x = max_x.max(projected.x);
            min_y = min_y.min(projected.y);
            max_y = max_y.max(projected.y);
            min_z = min_z.min(projected.z);
        }

        // Rasterization offset correction plus one pixel margin
        let rect = IntRect::new(
            (min_x as i32 - 1).max(0),
            (min_y as i32 - 1).max(0),
            (max_x as i32).min(self.width - 1),
            (max_y as i32).min(self.height - 1),
        );
        if rect.left > rect.right || rect.top > rect.bottom {
            return true;
        }
        let min_z = (min_z as i32).saturating_sub(self.depth_bias);

        if self.hierarchy_ready {
            for (level, mip) in self.mip_levels.iter().enumerate().rev() {
                let shift = level + 1;
                let mut all_occluded = true;
                for y in (rect.top >> shift)..=(rect.bottom >> shift).min(mip.height - 1) {
                    let row = &mip.values[(y * mip.width) as usize..((y + 1) * mip.width) as usize];
                    for value in &row[(rect.left >> shift) as usize..=((rect.right >> shift).min(mip.width - 1)) as usize] {
                        if min_z <= value.min {
                            return true;
                        }
                        if min_z <= value.max {
                            all_occluded = false;
                        }
                    }
                }
                if all_occluded {
                    return false;
                }
            }
        }

        for y in rect.top..=rect.bottom {
            let row = &self.buffer[(y * self.width) as usize..((y + 1) * self.width) as usize];
            if row[rect.left as usize..=rect.right as usize].iter().any(|depth| min_z <= *depth) {
                return true;
            }
        }
        false
    }

    // ===== ACCESSORS =====

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Full-resolution depth values, row major
    pub fn buffer(&self) -> &[i32] {
        &self.buffer
    }

    pub fn num_mip_levels(&self) -> usize {
        self.mip_levels.len()
    }

    /// Depth range of one texel of mip `level` (0 = half resolution)
    pub fn mip_value(&self, level: usize, x: i32, y: i32) -> Option<DepthValue> {
        let mip = self.mip_levels.get(level)?;
        if x < 0 || y < 0 || x >= mip.width || y >= mip.height {
            return None;
        }
        mip.values.get((y * mip.width + x) as usize).copied()
    }

    pub fn view_projection(&self) -> &Mat4 {
        &self.view_projection
    }

    pub fn num_triangles(&self) -> usize {
        self.num_triangles
    }

    pub fn max_triangles(&self) -> usize {
        self.max_triangles
    }

    pub fn is_budget_exhausted(&self) -> bool {
        self.num_triangles >= self.max_triangles
    }
}

/// Sutherland-Hodgman clip of a convex polygon against one plane, in place.
fn clip_polygon(polygon: &mut [Vec4; MAX_CLIP_VERTICES], count: usize, plane: &Vec4) -> usize {
    let input = *polygon;
    let mut out = 0;
    for i in 0..count {
        let current = input[i];
        let next = input[(i + 1) % count];
        let d0 = plane.dot(current);
        let d1 = plane.dot(next);

        if d0 >= 0.0 && out < MAX_CLIP_VERTICES {
            polygon[out] = current;
            out += 1;
        }
        if (d0 >= 0.0) != (d1 >= 0.0) && out < MAX_CLIP_VERTICES {
            let t = d0 / (d0 - d1);
            polygon[out] = current + (next - current) * t;
            out += 1;
        }
    }
    out
}

/// Min/max reduce 2x2 blocks of a source level into `dest`.
fn reduce_level<T: Copy>(source: &[T], width: i32, height: i32, dest: &mut MipLevel, to_value: impl Fn(T) -> DepthValue) {
    for y in 0..dest.height {
        for x in 0..dest.width {
            let mut value = DepthValue { min: i32::MAX, max: i32::MIN };
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let (sx, sy) = (x * 2 + dx, y * 2 + dy);
                if sx < width && sy < height {
                    let sample = to_value(source[(sy * width + sx) as usize]);
                    value.min = value.min.min(sample.min);
                    value.max = value.max.max(sample.max);
                }
            }
            dest.values[(y * dest.width + x) as usize] = value;
        }
    }
}

#[cfg(test)]
#[path = "occlusion_buffer_tests.rs"]
mod tests;
