use nalgebra::Vector3;
use std::sync::Arc;
use wfc_catalog::{Catalog, Direction, InputWaveCell, EMPTY_GROUP, EMPTY_HASH, SOLID_GROUP, SOLID_HASH, UNSET_HASH};
use wfc_solver::{
    Bounds, BoundarySource, ExecutionMode, LevelData, OrchestrationError, RegionBuilder, RegionScheduler, SharedLevel,
};

fn level_at(x: i32, size: [i32; 3]) -> SharedLevel {
    LevelData::new(Bounds::new(Vector3::new(x, 0, 0), Vector3::new(size[0], size[1], size[2]))).shared()
}

fn hashes(level: &SharedLevel) -> Vec<u64> {
    level.read().unwrap().blocks().as_slice().to_vec()
}

fn solid_ground() -> BoundarySource {
    BoundarySource::Groups(InputWaveCell::single(SOLID_GROUP))
}

#[test]
fn test_connected_groups_follow_boundary_links() {
    let mut scheduler = RegionScheduler::new(Arc::new(Catalog::builtin()));
    for (i, x) in [0, 3, 6, 9, 12].into_iter().enumerate() {
        let mut builder = RegionBuilder::new(format!("r{i}"), level_at(x, [3, 1, 1]));
        if i == 1 {
            builder = builder.with_boundary(Direction::Left, BoundarySource::Builder(0));
        }
        if i == 3 {
            builder = builder.with_boundary(Direction::Right, BoundarySource::Builder(4));
        }
        scheduler.add_builder(builder);
    }
    assert_eq!(scheduler.connected_groups(), vec![vec![0, 1], vec![2], vec![3, 4]]);
}

#[test]
fn test_invalid_requests_are_rejected() {
    let catalog = Arc::new(Catalog::builtin());
    let mut scheduler = RegionScheduler::new(Arc::clone(&catalog));
    scheduler.add_builder(RegionBuilder::new("a", level_at(0, [1, 1, 1])));
    scheduler.add_builder(RegionBuilder::new("b", level_at(1, [1, 1, 1])));
    assert_eq!(scheduler.rebuild(&[0, 1]), Err(OrchestrationError::SpansGroups(2)));
    assert_eq!(scheduler.rebuild(&[5]), Err(OrchestrationError::UnknownBuilder(5)));

    let mut looping = RegionScheduler::new(catalog);
    looping.add_builder(
        RegionBuilder::new("self", level_at(0, [1, 1, 1])).with_boundary(Direction::Up, BoundarySource::Builder(0)),
    );
    assert_eq!(looping.rebuild(&[0]), Err(OrchestrationError::SelfBoundary(0)));
}

#[test]
fn test_dependent_region_matches_its_neighbour() {
    let mut scheduler = RegionScheduler::new(Arc::new(Catalog::builtin())).with_mode(ExecutionMode::MultiThreaded);
    let ground = scheduler.add_builder(
        RegionBuilder::new("ground", level_at(0, [3, 2, 3]))
            .with_boundary(Direction::Down, solid_ground())
            .with_seed(1),
    );
    let annex = scheduler.add_builder(
        RegionBuilder::new("annex", level_at(3, [2, 2, 3]))
            .with_boundary(Direction::Left, BoundarySource::Builder(ground))
            .with_seed(2),
    );
    assert_eq!(scheduler.rebuild_all(), Ok(true));
    for index in [ground, annex] {
        let level = &scheduler.builder(index).unwrap().level;
        assert!(hashes(level).iter().all(|&h| h == SOLID_HASH));
    }
}

#[test]
fn test_dependency_cycle_is_broken() {
    let mut scheduler = RegionScheduler::new(Arc::new(Catalog::builtin()));
    scheduler.add_builder(
        RegionBuilder::new("west", level_at(0, [2, 1, 1])).with_boundary(Direction::Right, BoundarySource::Builder(1)),
    );
    scheduler.add_builder(
        RegionBuilder::new("east", level_at(2, [2, 1, 1])).with_boundary(Direction::Left, BoundarySource::Builder(0)),
    );
    assert_eq!(scheduler.rebuild(&[1, 0]), Ok(true));
    let west = hashes(&scheduler.builders()[0].level);
    let east = hashes(&scheduler.builders()[1].level);
    assert!(west.iter().chain(&east).all(|&h| h != UNSET_HASH));
    // Built-in blocks only connect to themselves, so both halves agree.
    assert_eq!(west[1], east[0]);
}

#[test]
fn test_cycle_is_seeded_by_committed_neighbour() {
    let catalog = Arc::new(Catalog::builtin());
    let east = level_at(2, [2, 1, 1]);
    {
        let mut level = east.write().unwrap();
        let bounds = *level.bounds();
        for world in bounds.positions() {
            level.set(world, EMPTY_HASH);
        }
    }
    let mut scheduler = RegionScheduler::new(catalog);
    scheduler.add_builder(
        RegionBuilder::new("west", level_at(0, [2, 1, 1]))
            .with_boundary(Direction::Right, BoundarySource::Builder(1))
            .with_seed(5),
    );
    scheduler.add_builder(
        RegionBuilder::new("east", Arc::clone(&east))
            .with_boundary(Direction::Left, BoundarySource::Builder(0))
            .with_seed(6),
    );
    for _ in 0..3 {
        assert_eq!(scheduler.rebuild(&[0, 1]), Ok(true));
        // West is forced first and must connect to east's previous Empty cells.
        let west = hashes(&scheduler.builders()[0].level);
        assert!(west.iter().chain(&hashes(&east)).all(|&h| h == EMPTY_HASH));
    }
}

#[cfg(not(feature = "debug-contradictions"))]
#[test]
fn test_failed_region_restores_whole_subset() {
    let mut scheduler = RegionScheduler::new(Arc::new(Catalog::builtin()));
    let base = level_at(0, [2, 2, 1]);
    {
        let mut level = base.write().unwrap();
        let bounds = *level.bounds();
        for world in bounds.positions() {
            level.set(world, EMPTY_HASH);
        }
    }
    let before = hashes(&base);
    scheduler.add_builder(RegionBuilder::new("base", Arc::clone(&base)).with_seed(3));
    scheduler.add_builder(
        RegionBuilder::new("broken", level_at(2, [1, 2, 1]))
            .with_boundary(Direction::Left, BoundarySource::Builder(0))
            .with_boundary(Direction::Down, BoundarySource::Groups(InputWaveCell::single(EMPTY_GROUP)))
            .with_boundary(Direction::Up, solid_ground())
            .with_max_iterations(2),
    );

    assert_eq!(scheduler.rebuild(&[0, 1]), Ok(false));
    assert_eq!(hashes(&base), before);
    assert!(hashes(&scheduler.builders()[1].level).iter().all(|&h| h == UNSET_HASH));
}

#[test]
fn test_cancel_handle_is_shared() {
    let scheduler = RegionScheduler::new(Arc::new(Catalog::builtin()));
    let handle = scheduler.cancel_handle();
    handle.store(true, std::sync::atomic::Ordering::Relaxed);
    assert!(scheduler.cancel_handle().load(std::sync::atomic::Ordering::Relaxed));
}
