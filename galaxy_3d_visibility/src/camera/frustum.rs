/// Frustum - six clipping planes plus eight corner vertices.
///
/// Each plane is represented as a Vec4 (A, B, C, D) where:
/// - (A, B, C) is the inward-pointing unit normal
/// - D is the signed distance
/// - A point P is inside the frustum if dot(plane, P_homogeneous) >= 0 for all planes
///
/// Vertex layout: 0..4 are the near corners, 4..8 the far corners, each
/// ordered (+x,+y), (+x,-y), (-x,-y), (-x,+y) in the frustum's local frame.

use glam::{Mat4, Vec3, Vec4};
use crate::math::{BoundingBox, Intersection, Sphere};

/// Frustum plane indices
pub const PLANE_LEFT: usize = 0;
pub const PLANE_RIGHT: usize = 1;
pub const PLANE_BOTTOM: usize = 2;
pub const PLANE_TOP: usize = 3;
pub const PLANE_NEAR: usize = 4;
pub const PLANE_FAR: usize = 5;

pub const NUM_FRUSTUM_PLANES: usize = 6;
pub const NUM_FRUSTUM_VERTICES: usize = 8;

/// Plane mask with every plane still to be tested.
pub const PLANE_MASK_ALL: u8 = 0x3f;
/// Plane mask returned when a box is outside.
pub const PLANE_MASK_OUTSIDE: u8 = 0xff;

/// Six frustum planes for culling.
///
/// Works with both perspective and orthographic projections.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    /// Frustum planes: left, right, bottom, top, near, far
    pub planes: [Vec4; NUM_FRUSTUM_PLANES],
    /// Corner vertices: near 0..4, far 4..8
    pub vertices: [Vec3; NUM_FRUSTUM_VERTICES],
}

impl Default for Frustum {
    /// Degenerate frustum with every vertex at the origin.
    fn default() -> Self {
        Self::from_vertices([Vec3::ZERO; NUM_FRUSTUM_VERTICES])
    }
}

impl Frustum {
    /// Extract frustum planes from a view-projection matrix.
    ///
    /// Uses the Gribb & Hartmann method for a 0..1 clip depth range.
    /// Corner vertices come from unprojecting the NDC cube corners.
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let m = vp.to_cols_array_2d();

        let mut planes = [
            // Left:   row3 + row0
            Vec4::new(m[0][3] + m[0][0], m[1][3] + m[1][0], m[2][3] + m[2][0], m[3][3] + m[3][0]),
            // Right:  row3 - row0
            Vec4::new(m[0][3] - m[0][0], m[1][3] - m[1][0], m[2][3] - m[2][0], m[3][3] - m[3][0]),
            // Bottom: row3 + row1
            Vec4::new(m[0][3] + m[0][1], m[1][3] + m[1][1], m[2][3] + m[2][1], m[3][3] + m[3][1]),
            // Top:    row3 - row1
            Vec4::new(m[0][3] - m[0][1], m[1][3] - m[1][1], m[2][3] - m[2][1], m[3][3] - m[3][1]),
            // Near:   row2 (clip z >= 0)
            Vec4::new(m[0][2], m[1][2], m[2][2], m[3][2]),
            // Far:    row3 - row2
            Vec4::new(m[0][3] - m[0][2], m[1][3] - m[1][2], m[2][3] - m[2][2], m[3][3] - m[3][2]),
        ];

        for plane in &mut planes {
            let normal_len = plane.truncate().length();
            if normal_len > 0.0 {
                *plane /= normal_len;
            }
        }

        let inverse = vp.inverse();
        let ndc = |x: f32, y: f32, z: f32| inverse.project_point3(Vec3::new(x, y, z));
        let vertices = [
            ndc(1.0, 1.0, 0.0),
            ndc(1.0, -1.0, 0.0),
            ndc(-1.0, -1.0, 0.0),
            ndc(-1.0, 1.0, 0.0),
            ndc(1.0, 1.0, 1.0),
            ndc(1.0, -1.0, 1.0),
            ndc(-1.0, -1.0, 1.0),
            ndc(-1.0, 1.0, 1.0),
        ];

        Self { planes, vertices }
    }

    /// Perspective frustum. `fov` is the vertical field of view in degrees.
    ///
    /// Built in a local frame looking down -Z, then moved by `transform`.
    pub fn perspective(fov: f32, aspect_ratio: f32, zoom: f32, near: f32, far: f32, transform: &Mat4) -> Self {
        let near = near.max(0.0);
        let far = far.max(near);
        let half_view_size = (fov.to_radians() * 0.5).tan() / zoom;

        let near_y = near * half_view_size;
        let far_y = far * half_view_size;
        Self::from_extents(
            Vec3::new(near_y * aspect_ratio, near_y, near),
            Vec3::new(far_y * aspect_ratio, far_y, far),
            transform,
        )
    }

    /// Orthographic frustum. `ortho_size` is the full view height.
    pub fn orthographic(ortho_size: f32, aspect_ratio: f32, zoom: f32, near: f32, far: f32, transform: &Mat4) -> Self {
        let near = near.max(0.0);
        let far = far.max(near);
        let half_view_size = ortho_size * 0.5 / zoom;

        Self::from_extents(
            Vec3::new(half_view_size * aspect_ratio, half_view_size, near),
            Vec3::new(half_view_size * aspect_ratio, half_view_size, far),
            transform,
        )
    }

    /// Frustum from near and far half extents, with positive z meaning
    /// distance along -Z in the local frame.
    fn from_extents(near: Vec3, far: Vec3, transform: &Mat4) -> Self {
        let corner = |x: f32, y: f32, z: f32| transform.transform_point3(Vec3::new(x, y, -z));
        Self::from_vertices([
            corner(near.x, near.y, near.z),
            corner(near.x, -near.y, near.z),
            corner(-near.x, -near.y, near.z),
            corner(-near.x, near.y, near.z),
            corner(far.x, far.y, far.z),
            corner(far.x, -far.y, far.z),
            corner(-far.x, -far.y, far.z),
            corner(-far.x, far.y, far.z),
        ])
    }

    /// Frustum from its corner vertices. Planes face the vertex centroid,
    /// so reflected transforms still produce inward normals.
    pub fn from_vertices(vertices: [Vec3; NUM_FRUSTUM_VERTICES]) -> Self {
        let mut frustum = Self { planes: [Vec4::ZERO; NUM_FRUSTUM_PLANES], vertices };
        frustum.update_planes();
        frustum
    }

    /// Return transformed by a matrix.
    pub fn transformed(&self, transform: &Mat4) -> Frustum {
        Self::from_vertices(self.vertices.map(|v| transform.transform_point3(v)))
    }

    fn update_planes(&mut self) {
        let v = &self.vertices;
        let centroid = v.iter().copied().sum::<Vec3>() / NUM_FRUSTUM_VERTICES as f32;

        self.planes[PLANE_LEFT] = plane_facing(v[3], v[7], v[6], centroid);
        self.planes[PLANE_RIGHT] = plane_facing(v[1], v[5], v[4], centroid);
        self.planes[PLANE_BOTTOM] = plane_facing(v[6], v[5], v[1], centroid);
        self.planes[PLANE_TOP] = plane_facing(v[0], v[4], v[7], centroid);
        self.planes[PLANE_NEAR] = plane_facing(v[2], v[1], v[0], centroid);
        self.planes[PLANE_FAR] = plane_facing(v[5], v[6], v[7], centroid);
    }

    // ===== CONTAINMENT =====

    pub fn is_inside_point(&self, point: Vec3) -> bool {
        self.planes.iter().all(|plane| plane_distance(plane, point) >= 0.0)
    }

    pub fn is_inside_sphere(&self, sphere: &Sphere) -> Intersection {
        let mut all_inside = true;
        for plane in &self.planes {
            let dist = plane_distance(plane, sphere.center);
            if dist < -sphere.radius {
                return Intersection::Outside;
            } else if dist < sphere.radius {
                all_inside = false;
            }
        }
        if all_inside { Intersection::Inside } else { Intersection::Intersects }
    }

    /// Two-state sphere test: `Outside` or `Inside`.
    pub fn is_inside_sphere_fast(&self, sphere: &Sphere) -> Intersection {
        if self.planes.iter().any(|plane| plane_distance(plane, sphere.center) < -sphere.radius) {
            Intersection::Outside
        } else {
            Intersection::Inside
        }
    }

    /// Classify a box against the frustum (3-way test).
    pub fn is_inside(&self, bbox: &BoundingBox) -> Intersection {
        match self.is_inside_masked(bbox, PLANE_MASK_ALL) {
            PLANE_MASK_OUTSIDE => Intersection::Outside,
            0 => Intersection::Inside,
            _ => Intersection::Intersects,
        }
    }

    /// Two-state box test: `Outside` or `Inside`.
    pub fn is_inside_fast(&self, bbox: &BoundingBox) -> Intersection {
        self.is_inside_masked_fast(bbox, PLANE_MASK_ALL)
    }

    /// Classify a box while updating a plane mask for hierarchy traversal.
    ///
    /// Only planes whose bit is set in `plane_mask` are tested. Returns
    /// `PLANE_MASK_OUTSIDE` when the box is outside, otherwise the mask with
    /// the bits of planes the box lies fully inside cleared (0 = fully inside).
    pub fn is_inside_masked(&self, bbox: &BoundingBox, mut plane_mask: u8) -> u8 {
        let center = bbox.center();
        let edge = bbox.half_size();

        for (i, plane) in self.planes.iter().enumerate() {
            let bit = 1u8 << i;
            if plane_mask & bit == 0 {
                continue;
            }
            let dist = plane_distance(plane, center);
            let abs_dist = plane.truncate().abs().dot(edge);
            if dist < -abs_dist {
                return PLANE_MASK_OUTSIDE;
            } else if dist >= abs_dist {
                plane_mask &= !bit;
            }
        }

        plane_mask
    }

    /// Two-state box test restricted to the planes in `plane_mask`.
    pub fn is_inside_masked_fast(&self, bbox: &BoundingBox, plane_mask: u8) -> Intersection {
        let center = bbox.center();
        let edge = bbox.half_size();

        for (i, plane) in self.planes.iter().enumerate() {
            if plane_mask & (1u8 << i) == 0 {
                continue;
            }
            let dist = plane_distance(plane, center);
            if dist < -plane.truncate().abs().dot(edge) {
                return Intersection::Outside;
            }
        }

        Intersection::Inside
    }

    /// Test if a box intersects this frustum.
    ///
    /// Uses the "positive vertex" test: for each plane, find the box corner
    /// most in the direction of the plane normal. If that corner is outside,
    /// the box is fully outside. Conservative: may return false positives.
    pub fn intersects_aabb(&self, bbox: &BoundingBox) -> bool {
        for plane in &self.planes {
            let normal = plane.truncate();
            let p_vertex = Vec3::select(normal.cmpge(Vec3::ZERO), bbox.max, bbox.min);
            if normal.dot(p_vertex) + plane.w < 0.0 {
                return false;
            }
        }
        true
    }

    /// Exact box overlap test by separating axes. Slower than the plane
    /// tests but without false positives near frustum corners.
    pub fn is_inside_sat(&self, bbox: &BoundingBox, data: &SatData) -> Intersection {
        let box_corners = bbox.corners();
        for (axis, frustum_proj) in data.axes.iter().zip(data.frustum_proj.iter()) {
            let box_proj = project_points(&box_corners, *axis);
            if frustum_proj.1 < box_proj.0 || box_proj.1 < frustum_proj.0 {
                return Intersection::Outside;
            }
        }
        Intersection::Inside
    }

    /// Distance from a point to the frustum, 0 when inside.
    pub fn distance(&self, point: Vec3) -> f32 {
        self.planes
            .iter()
            .fold(0.0f32, |acc, plane| acc.max(-plane_distance(plane, point)))
    }

    /// Box enclosing all eight vertices.
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.vertices)
    }

    /// The 12 edges as line segments, for debug drawing.
    pub fn edges(&self) -> [(Vec3, Vec3); 12] {
        let v = &self.vertices;
        [
            (v[0], v[1]), (v[1], v[2]), (v[2], v[3]), (v[3], v[0]),
            (v[4], v[5]), (v[5], v[6]), (v[6], v[7]), (v[7], v[4]),
            (v[0], v[4]), (v[1], v[5]), (v[2], v[6]), (v[3], v[7]),
        ]
    }
}

/// Precomputed separating axes for `Frustum::is_inside_sat`.
#[derive(Debug, Clone)]
pub struct SatData {
    axes: Vec<Vec3>,
    frustum_proj: Vec<(f32, f32)>,
}

impl SatData {
    /// Box normals, frustum face normals and edge cross products.
    pub fn new(frustum: &Frustum) -> Self {
        let v = &frustum.vertices;
        let mut axes = vec![Vec3::X, Vec3::Y, Vec3::Z];

        // Near and far share a normal
        for plane in &frustum.planes[..PLANE_FAR] {
            axes.push(plane.truncate());
        }

        let edge_dirs = [
            v[0] - v[1],
            v[0] - v[3],
            v[4] - v[0],
            v[5] - v[1],
            v[6] - v[2],
            v[7] - v[3],
        ];
        for box_axis in [Vec3::X, Vec3::Y, Vec3::Z] {
            for edge in &edge_dirs {
                axes.push(box_axis.cross(*edge).normalize_or_zero());
            }
        }

        let frustum_proj = axes.iter().map(|axis| project_points(v, *axis)).collect();
        Self { axes, frustum_proj }
    }
}

// ===== HELPERS =====

#[inline]
fn plane_distance(plane: &Vec4, point: Vec3) -> f32 {
    plane.truncate().dot(point) + plane.w
}

/// Plane through three points, normal flipped to face `inside`.
fn plane_facing(v0: Vec3, v1: Vec3, v2: Vec3, inside: Vec3) -> Vec4 {
    let normal = (v1 - v0).cross(v2 - v0).normalize_or_zero();
    let plane = normal.extend(-normal.dot(v0));
    if plane_distance(&plane, inside) < 0.0 { -plane } else { plane }
}

fn project_points(points: &[Vec3], axis: Vec3) -> (f32, f32) {
    points.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), p| {
        let d = axis.dot(*p);
        (lo.min(d), hi.max(d))
    })
}

#[cfg(test)]
#[path = "frustum_tests.rs"]
mod tests;
