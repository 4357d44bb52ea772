use glam::{Mat4, Quat, Vec3};
use crate::math::{BoundingBox, Intersection, Sphere};
use super::*;

fn look_at_origin_vp(fov: f32, far: f32) -> Mat4 {
    let projection = Mat4::perspective_rh(fov, 1.0, 0.1, far);
    let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
    projection * view
}

fn cube(center: Vec3, half: f32) -> BoundingBox {
    BoundingBox::from_center_half_size(center, Vec3::splat(half))
}

// ============================================================================
// Frustum::from_view_projection
// ============================================================================

#[test]
fn test_frustum_planes_are_normalized() {
    let frustum = Frustum::from_view_projection(&look_at_origin_vp(std::f32::consts::FRAC_PI_4, 100.0));
    for plane in &frustum.planes {
        assert!((plane.truncate().length() - 1.0).abs() < 1e-4, "plane normal should be unit length");
    }
}

#[test]
fn test_frustum_vertices_from_view_projection() {
    let projection = Mat4::orthographic_rh(-10.0, 10.0, -5.0, 5.0, 1.0, 50.0);
    let frustum = Frustum::from_view_projection(&projection);

    assert!((frustum.vertices[0] - Vec3::new(10.0, 5.0, -1.0)).length() < 1e-3);
    assert!((frustum.vertices[6] - Vec3::new(-10.0, -5.0, -50.0)).length() < 1e-3);
}

#[test]
fn test_near_plane_uses_zero_to_one_depth() {
    let frustum = Frustum::from_view_projection(&Mat4::perspective_rh(1.0, 1.0, 2.0, 100.0));
    // Just behind the near plane is outside, just past it is inside
    assert!(!frustum.is_inside_point(Vec3::new(0.0, 0.0, -1.9)));
    assert!(frustum.is_inside_point(Vec3::new(0.0, 0.0, -2.1)));
}

// ============================================================================
// Frustum::intersects_aabb
// ============================================================================

#[test]
fn test_aabb_inside_frustum() {
    let frustum = Frustum::from_view_projection(&look_at_origin_vp(std::f32::consts::FRAC_PI_2, 100.0));
    assert!(frustum.intersects_aabb(&cube(Vec3::ZERO, 1.0)));
}

#[test]
fn test_aabb_outside_frustum() {
    let frustum = Frustum::from_view_projection(&look_at_origin_vp(std::f32::consts::FRAC_PI_4, 100.0));
    assert!(!frustum.intersects_aabb(&cube(Vec3::splat(100.5), 0.5)));
}

#[test]
fn test_aabb_behind_camera() {
    let frustum = Frustum::from_view_projection(&look_at_origin_vp(std::f32::consts::FRAC_PI_2, 100.0));
    let bbox = BoundingBox::new(Vec3::new(-1.0, -1.0, 10.0), Vec3::new(1.0, 1.0, 12.0));
    assert!(!frustum.intersects_aabb(&bbox));
}

#[test]
fn test_aabb_beyond_far_plane() {
    let frustum = Frustum::from_view_projection(&look_at_origin_vp(std::f32::consts::FRAC_PI_2, 10.0));
    let bbox = BoundingBox::new(Vec3::new(-1.0, -1.0, -20.0), Vec3::new(1.0, 1.0, -18.0));
    assert!(!frustum.intersects_aabb(&bbox));
}

// ============================================================================
// Three-state and masked tests
// ============================================================================

#[test]
fn test_is_inside_states() {
    let frustum = Frustum::perspective(60.0, 1.0, 1.0, 0.1, 100.0, &Mat4::IDENTITY);
    assert_eq!(frustum.is_inside(&cube(Vec3::new(0.0, 0.0, -20.0), 1.0)), Intersection::Inside);
    assert_eq!(frustum.is_inside(&cube(Vec3::new(0.0, 0.0, -100.0), 1.0)), Intersection::Intersects);
    assert_eq!(frustum.is_inside(&cube(Vec3::new(0.0, 0.0, 20.0), 1.0)), Intersection::Outside);
}

#[test]
fn test_is_inside_masked_clears_satisfied_planes() {
    let frustum = Frustum::perspective(60.0, 1.0, 1.0, 0.1, 100.0, &Mat4::IDENTITY);

    assert_eq!(frustum.is_inside_masked(&cube(Vec3::new(0.0, 0.0, -20.0), 1.0), PLANE_MASK_ALL), 0);
    assert_eq!(
        frustum.is_inside_masked(&cube(Vec3::new(0.0, 0.0, 20.0), 1.0), PLANE_MASK_ALL),
        PLANE_MASK_OUTSIDE
    );

    // Straddling only the far plane keeps just the far bit
    let mask = frustum.is_inside_masked(&cube(Vec3::new(0.0, 0.0, -100.0), 1.0), PLANE_MASK_ALL);
    assert_eq!(mask, 1 << PLANE_FAR);
}

#[test]
fn test_is_inside_masked_skips_cleared_planes() {
    let frustum = Frustum::perspective(60.0, 1.0, 1.0, 0.1, 100.0, &Mat4::IDENTITY);
    let beyond_far = cube(Vec3::new(0.0, 0.0, -200.0), 1.0);

    assert_eq!(frustum.is_inside_masked(&beyond_far, PLANE_MASK_ALL), PLANE_MASK_OUTSIDE);
    // With the far bit cleared the box is not tested against it
    let mask = PLANE_MASK_ALL & !(1 << PLANE_FAR);
    assert_ne!(frustum.is_inside_masked(&beyond_far, mask), PLANE_MASK_OUTSIDE);
    assert_eq!(frustum.is_inside_masked_fast(&beyond_far, mask), Intersection::Inside);
    assert_eq!(frustum.is_inside_masked_fast(&beyond_far, PLANE_MASK_ALL), Intersection::Outside);
}

#[test]
fn test_is_inside_sphere() {
    let frustum = Frustum::perspective(90.0, 1.0, 1.0, 0.1, 50.0, &Mat4::IDENTITY);
    assert_eq!(frustum.is_inside_sphere(&Sphere::new(Vec3::new(0.0, 0.0, -10.0), 1.0)), Intersection::Inside);
    assert_eq!(frustum.is_inside_sphere(&Sphere::new(Vec3::new(0.0, 0.0, -50.0), 1.0)), Intersection::Intersects);
    assert_eq!(frustum.is_inside_sphere(&Sphere::new(Vec3::new(0.0, 0.0, 10.0), 1.0)), Intersection::Outside);
    assert_eq!(
        frustum.is_inside_sphere_fast(&Sphere::new(Vec3::new(0.0, 0.0, -50.0), 1.0)),
        Intersection::Inside
    );
}

// ============================================================================
// Construction from parameters
// ============================================================================

#[test]
fn test_perspective_matches_view_projection() {
    let transform = Mat4::from_rotation_translation(Quat::from_rotation_y(0.7), Vec3::new(3.0, 1.0, -2.0));
    let frustum = Frustum::perspective(45.0, 1.5, 1.0, 0.5, 80.0, &transform);
    let from_vp = Frustum::from_view_projection(
        &(Mat4::perspective_rh(45f32.to_radians(), 1.5, 0.5, 80.0) * transform.inverse()),
    );

    for (a, b) in frustum.vertices.iter().zip(from_vp.vertices.iter()) {
        assert!((*a - *b).length() < 1e-2, "{a} vs {b}");
    }
    for (a, b) in frustum.planes.iter().zip(from_vp.planes.iter()) {
        assert!((*a - *b).length() < 2e-2, "{a} vs {b}");
    }
}

#[test]
fn test_orthographic_has_parallel_sides() {
    let frustum = Frustum::orthographic(20.0, 2.0, 1.0, 0.0, 30.0, &Mat4::IDENTITY);
    let bbox = frustum.bounding_box();
    assert_eq!(bbox.min, Vec3::new(-20.0, -10.0, -30.0));
    assert_eq!(bbox.max, Vec3::new(20.0, 10.0, 0.0));
}

#[test]
fn test_zoom_narrows_view() {
    let wide = Frustum::perspective(60.0, 1.0, 1.0, 0.1, 10.0, &Mat4::IDENTITY);
    let zoomed = Frustum::perspective(60.0, 1.0, 2.0, 0.1, 10.0, &Mat4::IDENTITY);
    assert!(zoomed.vertices[4].x < wide.vertices[4].x);
}

#[test]
fn test_transformed_frustum_follows_matrix() {
    let frustum = Frustum::perspective(60.0, 1.0, 1.0, 0.1, 10.0, &Mat4::IDENTITY);
    let moved = frustum.transformed(&Mat4::from_translation(Vec3::new(100.0, 0.0, 0.0)));
    let target = cube(Vec3::new(100.0, 0.0, -5.0), 0.5);
    assert_eq!(frustum.is_inside(&target), Intersection::Outside);
    assert_eq!(moved.is_inside(&target), Intersection::Inside);
}

#[test]
fn test_reflected_transform_keeps_planes_inward() {
    let frustum = Frustum::perspective(60.0, 1.0, 1.0, 0.1, 10.0, &Mat4::from_scale(Vec3::new(-1.0, 1.0, 1.0)));
    assert!(frustum.is_inside_point(Vec3::new(0.0, 0.0, -5.0)));
}

#[test]
fn test_distance_to_point() {
    let frustum = Frustum::orthographic(2.0, 1.0, 1.0, 0.0, 10.0, &Mat4::IDENTITY);
    assert_eq!(frustum.distance(Vec3::new(0.0, 0.0, -5.0)), 0.0);
    assert!((frustum.distance(Vec3::new(4.0, 0.0, -5.0)) - 3.0).abs() < 1e-5);
}

// ============================================================================
// SAT
// ============================================================================

#[test]
fn test_sat_rejects_box_near_frustum_corner() {
    let frustum = Frustum::perspective(60.0, 1.0, 1.0, 1.0, 10.0, &Mat4::IDENTITY);
    let sat = SatData::new(&frustum);

    assert_eq!(frustum.is_inside_sat(&cube(Vec3::new(0.0, 0.0, -5.0), 0.5), &sat), Intersection::Inside);
    assert_eq!(frustum.is_inside_sat(&cube(Vec3::new(0.0, 0.0, 5.0), 0.5), &sat), Intersection::Outside);

    // Diagonal box beyond the corner edge passes the plane test but not SAT
    let corner = cube(Vec3::new(7.5, 7.5, -11.0), 1.2);
    assert_ne!(frustum.is_inside(&corner), Intersection::Outside);
    assert_eq!(frustum.is_inside_sat(&corner, &sat), Intersection::Outside);
}

// ============================================================================
// Plane constants
// ============================================================================

#[test]
fn test_plane_constants() {
    assert_eq!(PLANE_LEFT, 0);
    assert_eq!(PLANE_RIGHT, 1);
    assert_eq!(PLANE_BOTTOM, 2);
    assert_eq!(PLANE_TOP, 3);
    assert_eq!(PLANE_NEAR, 4);
    assert_eq!(PLANE_FAR, 5);
    assert_eq!(PLANE_MASK_ALL, 0b11_1111);
}
