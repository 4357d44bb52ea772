use glam::IVec2;
use crate::math::IntRect;
use super::*;

fn total_free(alloc: &AreaAllocator) -> i64 {
    alloc.free_areas().iter().map(|r| r.width() as i64 * r.height() as i64).sum()
}

fn assert_disjoint(alloc: &AreaAllocator) {
    let areas = alloc.free_areas();
    for (i, a) in areas.iter().enumerate() {
        for b in &areas[i + 1..] {
            assert!(!a.intersects(b), "{a:?} overlaps {b:?}");
        }
    }
}

// ============================================================================
// allocate
// ============================================================================

#[test]
fn test_allocate_tiles_fill_atlas() {
    let mut alloc = AreaAllocator::new(1024, 1024);
    let mut seen = Vec::new();
    for _ in 0..4 {
        let pos = alloc.allocate(512, 512).expect("tile should fit");
        let rect = IntRect::from_pos_size(pos, IVec2::splat(512));
        assert!(IntRect::new(0, 0, 1024, 1024).contains(&rect));
        assert!(seen.iter().all(|r: &IntRect| !r.intersects(&rect)));
        seen.push(rect);
        assert_disjoint(&alloc);
    }
    assert_eq!(alloc.allocate(512, 512), None);
    assert_eq!(total_free(&alloc), 0);
}

#[test]
fn test_allocate_prefers_smallest_fitting_area() {
    let mut alloc = AreaAllocator::new(1024, 512);
    assert_eq!(alloc.allocate(512, 512), Some(IVec2::new(0, 0)));
    // Remaining: 512x512 on the right; a small request lands there
    assert_eq!(alloc.allocate(128, 128), Some(IVec2::new(512, 0)));
    assert_eq!(total_free(&alloc), 512 * 512 - 128 * 128);
}

#[test]
fn test_allocate_too_large_fails() {
    let mut alloc = AreaAllocator::new(256, 256);
    assert_eq!(alloc.allocate(512, 128), None);
    assert_eq!(total_free(&alloc), 256 * 256);
}

#[test]
fn test_reset_frees_everything() {
    let mut alloc = AreaAllocator::new(256, 256);
    alloc.allocate(256, 256);
    assert_eq!(total_free(&alloc), 0);
    alloc.reset(512, 256);
    assert_eq!(alloc.size(), IVec2::new(512, 256));
    assert_eq!(total_free(&alloc), 512 * 256);
}

// ============================================================================
// allocate_specific
// ============================================================================

#[test]
fn test_allocate_specific_reclaims_previous_rect() {
    let mut alloc = AreaAllocator::new(2048, 2048);
    let previous = IntRect::new(1024, 512, 1536, 1024);
    assert!(alloc.allocate_specific(previous));
    assert_eq!(total_free(&alloc), 2048 * 2048 - 512 * 512);
    assert_disjoint(&alloc);

    // Same rect cannot be taken twice
    assert!(!alloc.allocate_specific(previous));
    assert!(!alloc.allocate_specific(IntRect::new(1200, 600, 1300, 700)));
}

#[test]
fn test_allocate_after_specific_does_not_overlap() {
    let mut alloc = AreaAllocator::new(1024, 1024);
    let taken = IntRect::new(0, 0, 512, 512);
    assert!(alloc.allocate_specific(taken));
    for _ in 0..3 {
        let pos = alloc.allocate(512, 512).expect("three tiles remain");
        assert!(!IntRect::from_pos_size(pos, IVec2::splat(512)).intersects(&taken));
    }
    assert_eq!(alloc.allocate(1, 1), None);
}

#[test]
fn test_allocate_specific_outside_atlas_fails() {
    let mut alloc = AreaAllocator::new(512, 512);
    assert!(!alloc.allocate_specific(IntRect::new(256, 256, 768, 768)));
    assert!(!alloc.allocate_specific(IntRect::ZERO));
}
