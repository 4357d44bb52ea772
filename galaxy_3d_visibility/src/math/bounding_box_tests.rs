use glam::{Mat4, Quat, Vec3};
use crate::math::{BoundingBox, Intersection, IntRect, Ray, Sphere};

fn unit_box_at(center: Vec3) -> BoundingBox {
    BoundingBox::from_center_half_size(center, Vec3::splat(0.5))
}

// ============================================================================
// BoundingBox basics
// ============================================================================

#[test]
fn test_undefined_box() {
    let b = BoundingBox::undefined();
    assert!(!b.is_defined());
    assert_eq!(BoundingBox::default(), b);
}

#[test]
fn test_merge_into_undefined_adopts_operand() {
    let mut b = BoundingBox::undefined();
    b.merge(&unit_box_at(Vec3::new(2.0, 0.0, 0.0)));
    assert_eq!(b.min, Vec3::new(1.5, -0.5, -0.5));
    assert_eq!(b.max, Vec3::new(2.5, 0.5, 0.5));
}

#[test]
fn test_merge_undefined_is_noop() {
    let mut b = unit_box_at(Vec3::ZERO);
    b.merge(&BoundingBox::undefined());
    assert_eq!(b, unit_box_at(Vec3::ZERO));
}

#[test]
fn test_from_points() {
    let b = BoundingBox::from_points(&[Vec3::new(1.0, -2.0, 3.0), Vec3::new(-1.0, 4.0, 0.0)]);
    assert_eq!(b.min, Vec3::new(-1.0, -2.0, 0.0));
    assert_eq!(b.max, Vec3::new(1.0, 4.0, 3.0));
    assert!(!BoundingBox::from_points(&[]).is_defined());
}

#[test]
fn test_infinite_box_has_finite_center_and_half_size() {
    let b = BoundingBox::infinite();
    assert_eq!(b.center(), Vec3::ZERO);
    assert!(b.half_size().is_finite());
}

#[test]
fn test_clipped_disjoint_is_undefined() {
    let a = unit_box_at(Vec3::ZERO);
    let b = unit_box_at(Vec3::new(5.0, 0.0, 0.0));
    assert!(!a.clipped(&b).is_defined());

    let c = unit_box_at(Vec3::new(0.5, 0.0, 0.0));
    let clipped = a.clipped(&c);
    assert_eq!(clipped.min.x, 0.0);
    assert_eq!(clipped.max.x, 0.5);
}

// ============================================================================
// Transform
// ============================================================================

#[test]
fn test_transformed_translation() {
    let b = unit_box_at(Vec3::ZERO).transformed(&Mat4::from_translation(Vec3::new(10.0, 0.0, -3.0)));
    assert_eq!(b.center(), Vec3::new(10.0, 0.0, -3.0));
    assert!((b.size() - Vec3::ONE).length() < 1e-6);
}

#[test]
fn test_transformed_rotation_grows_box() {
    let rotation = Mat4::from_quat(Quat::from_rotation_y(std::f32::consts::FRAC_PI_4));
    let b = unit_box_at(Vec3::ZERO).transformed(&rotation);
    let expected = std::f32::consts::SQRT_2;
    assert!((b.size().x - expected).abs() < 1e-5);
    assert!((b.size().y - 1.0).abs() < 1e-5);
}

#[test]
fn test_transformed_undefined_stays_undefined() {
    let b = BoundingBox::undefined().transformed(&Mat4::from_scale(Vec3::splat(2.0)));
    assert!(!b.is_defined());
}

// ============================================================================
// Containment
// ============================================================================

#[test]
fn test_is_inside_box_states() {
    let outer = BoundingBox::new(Vec3::splat(-10.0), Vec3::splat(10.0));
    assert_eq!(outer.is_inside(&unit_box_at(Vec3::ZERO)), Intersection::Inside);
    assert_eq!(outer.is_inside(&unit_box_at(Vec3::new(10.0, 0.0, 0.0))), Intersection::Intersects);
    assert_eq!(outer.is_inside(&unit_box_at(Vec3::new(20.0, 0.0, 0.0))), Intersection::Outside);
}

#[test]
fn test_box_is_inside_sphere_states() {
    let b = BoundingBox::new(Vec3::splat(-5.0), Vec3::splat(5.0));
    assert_eq!(b.is_inside_sphere(&Sphere::new(Vec3::ZERO, 1.0)), Intersection::Inside);
    assert_eq!(b.is_inside_sphere(&Sphere::new(Vec3::new(5.0, 0.0, 0.0), 1.0)), Intersection::Intersects);
    assert_eq!(b.is_inside_sphere(&Sphere::new(Vec3::new(8.0, 0.0, 0.0), 1.0)), Intersection::Outside);
}

#[test]
fn test_corners_and_edges() {
    let b = unit_box_at(Vec3::ZERO);
    let corners = b.corners();
    assert_eq!(corners[0], b.min);
    assert_eq!(corners[7], b.max);
    for (a, c) in b.edges() {
        // Every edge runs along exactly one axis
        let d = (c - a).abs();
        assert_eq!((d.x > 0.0) as u32 + (d.y > 0.0) as u32 + (d.z > 0.0) as u32, 1);
    }
}

// ============================================================================
// Sphere
// ============================================================================

#[test]
fn test_sphere_classifies_boxes() {
    let s = Sphere::new(Vec3::ZERO, 2.0);
    assert_eq!(s.is_inside(&unit_box_at(Vec3::ZERO)), Intersection::Inside);
    assert_eq!(s.is_inside(&unit_box_at(Vec3::new(2.0, 0.0, 0.0))), Intersection::Intersects);
    assert_eq!(s.is_inside(&unit_box_at(Vec3::new(4.0, 0.0, 0.0))), Intersection::Outside);
    // Box near the diagonal: inside the sphere's AABB but outside the sphere
    assert_eq!(s.is_inside(&unit_box_at(Vec3::splat(1.9))), Intersection::Outside);
}

#[test]
fn test_sphere_vs_sphere() {
    let s = Sphere::new(Vec3::ZERO, 5.0);
    assert_eq!(s.is_inside_sphere(&Sphere::new(Vec3::X, 1.0)), Intersection::Inside);
    assert_eq!(s.is_inside_sphere(&Sphere::new(Vec3::X * 5.0, 1.0)), Intersection::Intersects);
    assert_eq!(s.is_inside_sphere(&Sphere::new(Vec3::X * 7.0, 1.0)), Intersection::Outside);
}

// ============================================================================
// Ray
// ============================================================================

#[test]
fn test_ray_hits_box() {
    let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, -2.0));
    let dist = ray.hit_distance_box(&unit_box_at(Vec3::ZERO));
    assert!((dist - 9.5).abs() < 1e-5);
}

#[test]
fn test_ray_misses_box_behind_origin() {
    let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::Z);
    assert_eq!(ray.hit_distance_box(&unit_box_at(Vec3::ZERO)), f32::INFINITY);
}

#[test]
fn test_ray_origin_inside_box() {
    let ray = Ray::new(Vec3::ZERO, Vec3::X);
    assert_eq!(ray.hit_distance_box(&unit_box_at(Vec3::ZERO)), 0.0);
}

#[test]
fn test_ray_hits_sphere() {
    let ray = Ray::new(Vec3::new(-10.0, 0.0, 0.0), Vec3::X);
    let dist = ray.hit_distance_sphere(&Sphere::new(Vec3::ZERO, 1.0));
    assert!((dist - 9.0).abs() < 1e-4);
    let miss = Ray::new(Vec3::new(-10.0, 5.0, 0.0), Vec3::X);
    assert_eq!(miss.hit_distance_sphere(&Sphere::new(Vec3::ZERO, 1.0)), f32::INFINITY);
}

#[test]
fn test_ray_hits_triangle_either_winding() {
    let ray = Ray::new(Vec3::new(0.2, 0.2, 5.0), Vec3::NEG_Z);
    let (a, b, c) = (Vec3::ZERO, Vec3::X, Vec3::Y);
    assert!((ray.hit_distance_triangle(a, b, c) - 5.0).abs() < 1e-5);
    assert!((ray.hit_distance_triangle(a, c, b) - 5.0).abs() < 1e-5);

    let outside = Ray::new(Vec3::new(0.8, 0.8, 5.0), Vec3::NEG_Z);
    assert_eq!(outside.hit_distance_triangle(a, b, c), f32::INFINITY);
    let away = Ray::new(Vec3::new(0.2, 0.2, 5.0), Vec3::Z);
    assert_eq!(away.hit_distance_triangle(a, b, c), f32::INFINITY);
}

#[test]
fn test_zero_direction_ray_hits_nothing() {
    let ray = Ray::new(Vec3::new(5.0, 0.0, 0.0), Vec3::ZERO);
    assert_eq!(ray.hit_distance_box(&unit_box_at(Vec3::ZERO)), f32::INFINITY);
}

// ============================================================================
// IntRect
// ============================================================================

#[test]
fn test_int_rect_dimensions() {
    let r = IntRect::new(10, 20, 74, 52);
    assert_eq!(r.width(), 64);
    assert_eq!(r.height(), 32);
    assert!(!r.is_empty());
    assert!(IntRect::ZERO.is_empty());
}

#[test]
fn test_int_rect_contains_and_intersects() {
    let atlas = IntRect::new(0, 0, 1024, 1024);
    let tile = IntRect::new(512, 0, 1024, 512);
    assert!(atlas.contains(&tile));
    assert!(!tile.contains(&atlas));
    assert!(tile.intersects(&IntRect::new(1000, 500, 1100, 600)));
    // Touching edges do not intersect
    assert!(!tile.intersects(&IntRect::new(0, 0, 512, 512)));
}
