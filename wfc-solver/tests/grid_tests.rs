use nalgebra::Vector3;
use wfc_solver::grid::Grid;
use wfc_solver::level::{Bounds, LevelData};

#[test]
fn test_grid_new() {
    let grid: Grid<usize> = Grid::new(3, 4, 5);
    assert_eq!(grid.dimensions(), [3, 4, 5]);
    assert_eq!(grid.len(), 60);
    assert_eq!(*grid.get(0, 0, 0).expect("Cell (0,0,0) should exist"), 0);
    assert_eq!(*grid.get(2, 3, 4).expect("Cell (2,3,4) should exist"), 0);
}

#[test]
fn test_grid_get_mut() {
    let mut grid: Grid<usize> = Grid::new(2, 3, 4);
    if let Some(cell) = grid.get_mut(1, 2, 3) {
        *cell = 99;
    }
    assert_eq!(*grid.get(1, 2, 3).unwrap(), 99);
    assert_eq!(grid.as_slice()[grid.index(1, 2, 3).unwrap()], 99);

    assert!(grid.get_mut(2, 0, 0).is_none());
    assert!(grid.get_mut(0, 3, 0).is_none());
    assert!(grid.get_mut(0, 0, 4).is_none());
}

#[test]
fn test_grid_x_is_fastest_axis() {
    let grid: Grid<u8> = Grid::new(4, 3, 2);
    assert_eq!(grid.index(1, 0, 0), Some(1));
    assert_eq!(grid.index(0, 1, 0), Some(4));
    assert_eq!(grid.index(0, 0, 1), Some(12));
    assert_eq!(grid.coords(17), (1, 1, 1));
}

#[test]
fn test_grid_from_vec_checks_length() {
    assert!(Grid::from_vec(2, 2, 2, vec![0u8; 8]).is_some());
    assert!(Grid::from_vec(2, 2, 2, vec![0u8; 7]).is_none());
}

#[test]
fn test_level_uses_world_coordinates() {
    let bounds = Bounds::new(Vector3::new(-2, 5, 10), Vector3::new(2, 2, 2));
    let mut level = LevelData::new(bounds);
    assert_eq!(level.base_layer(), 5);
    assert_eq!(level.get(Vector3::new(-2, 5, 10)), Some(0));
    assert!(level.set(Vector3::new(-1, 6, 11), 7));
    assert!(!level.set(Vector3::new(0, 6, 11), 7));
    assert_eq!(level.blocks().get(1, 1, 1), Some(&7));
    assert_eq!(level.resolved_count(), 1);
    level.clear();
    assert_eq!(level.resolved_count(), 0);
}
