mod common;

use segmap::rank_regions;

use common::*;

#[test]
fn test_mask_bounding_box_is_half_open() {
    let mut mask = Mask::new(10, 10);
    mask.set(2, 3, true);
    mask.set(6, 8, true);

    let bbox = mask.bounding_box();
    assert_eq!(bbox, RegionBox { x1: 2, y1: 3, x2: 7, y2: 9 });
    assert_eq!((bbox.width(), bbox.height()), (5, 6));
    assert_eq!(mask.count(), 2);
}

#[test]
fn test_single_pixel_mask() {
    let mut mask = Mask::new(4, 4);
    mask.set(3, 3, true);
    let bbox = mask.bounding_box();
    assert_eq!(bbox, RegionBox { x1: 3, y1: 3, x2: 4, y2: 4 });
    assert_eq!(bbox.area(), 1);
}

#[test]
fn test_mask_out_of_range_access() {
    let mut mask = Mask::new(3, 3);
    mask.set(5, 5, true);
    assert!(!mask.get(5, 5));
    assert_eq!(mask.count(), 0);
    assert!(mask.bounding_box().is_empty());
}

#[test]
fn test_score_map_top_prefers_first_on_ties() {
    let map = scores(&[("b", 0.3), ("a", 0.3), ("c", 0.1)]);
    assert_eq!(map.top(), Some(("b", 0.3)));

    let with_nan = scores(&[("x", f64::NAN), ("y", 0.2)]);
    assert_eq!(with_nan.top(), Some(("y", 0.2)));

    assert_eq!(ScoreMap::new().top(), None);
}

#[test]
fn test_score_map_insert_replaces_in_place() {
    let mut map = scores(&[("a", 0.1), ("b", 0.2)]);
    map.insert("a", 0.9);
    let entries: Vec<(&str, f64)> = map.iter().collect();
    assert_eq!(entries, vec![("a", 0.9), ("b", 0.2)]);
}

#[test]
fn test_sorted_desc_is_stable() {
    let map = scores(&[("a", 0.2), ("b", 0.5), ("c", 0.2), ("d", 0.5)]);
    let sorted: Vec<&str> = map.sorted_desc().into_iter().map(|(l, _)| l).collect();
    assert_eq!(sorted, vec!["b", "d", "a", "c"]);
}

#[test]
fn test_rank_regions_orders_and_numbers() {
    let regions = vec![
        rect_region(8, 8, (0, 0, 1, 1), 0.1),
        rect_region(8, 8, (1, 1, 2, 2), f32::NAN),
        rect_region(8, 8, (2, 2, 3, 3), 0.7),
        rect_region(8, 8, (3, 3, 4, 4), 0.7),
        rect_region(8, 8, (4, 4, 5, 5), -2.0),
    ];

    let ranked = rank_regions(regions, 10);
    let ranks: Vec<usize> = ranked.iter().map(|r| r.rank).collect();
    let origins: Vec<u32> = ranked.iter().map(|r| r.region.bbox.x1).collect();

    assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
    assert_eq!(origins, vec![2, 3, 0, 4, 1]);
}

#[test]
fn test_rank_regions_floors_limit_to_one() {
    let regions = vec![
        rect_region(8, 8, (0, 0, 1, 1), 0.1),
        rect_region(8, 8, (1, 1, 2, 2), 0.9),
    ];
    let ranked = rank_regions(regions, 0);
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].region.quality, 0.9);
}
