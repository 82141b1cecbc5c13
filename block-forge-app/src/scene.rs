//! Scenes: several regions solved together through a [`RegionScheduler`].

use crate::error::AppError;
use nalgebra::Vector3;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use wfc_catalog::{Catalog, Direction, InputWaveCell};
use wfc_solver::{
    input_wave_for, Bounds, BoundarySource, ExecutionMode, LevelData, RegionBuilder, RegionScheduler,
};

/// Authored scene file.
#[derive(Debug, Clone, Deserialize)]
pub struct SceneDescriptor {
    pub regions: Vec<RegionDescriptor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegionDescriptor {
    pub name: String,
    /// World position of the region's minimum corner.
    #[serde(default)]
    pub origin: [i32; 3],
    pub size: [i32; 3],
    /// Groups every cell may use; all groups when absent.
    #[serde(default)]
    pub allowed_groups: Option<Vec<String>>,
    #[serde(default)]
    pub boundaries: Vec<FaceBoundary>,
    #[serde(default)]
    pub weight_overrides: Option<Vec<f32>>,
    #[serde(default)]
    pub base_layer_only: bool,
    #[serde(default)]
    pub max_iterations: Option<u32>,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FaceBoundary {
    pub face: Direction,
    pub source: SceneBoundary,
}

/// What a face of a region is bounded by.
#[derive(Debug, Clone, Deserialize)]
pub enum SceneBoundary {
    /// Another region of the scene, by name.
    Region(String),
    /// Blocks of these groups.
    Groups(Vec<String>),
}

pub fn load_scene(path: &Path) -> Result<SceneDescriptor, AppError> {
    let content = fs::read_to_string(path)?;
    ron::from_str(&content).map_err(|e| AppError::Scene(format!("{}: {e}", path.display())))
}

impl SceneDescriptor {
    /// Creates a scheduler with one builder per region, in file order.
    pub fn build(
        &self,
        catalog: Arc<Catalog>,
        mode: ExecutionMode,
        default_max_iterations: u32,
        seed: Option<u64>,
    ) -> Result<RegionScheduler, AppError> {
        let names: HashMap<&str, usize> = self
            .regions
            .iter()
            .enumerate()
            .map(|(index, region)| (region.name.as_str(), index))
            .collect();
        if names.len() != self.regions.len() {
            return Err(AppError::Scene("region names must be unique".to_owned()));
        }

        let mut scheduler = RegionScheduler::new(Arc::clone(&catalog)).with_mode(mode);
        for (index, region) in self.regions.iter().enumerate() {
            let bounds = Bounds::new(Vector3::from(region.origin), Vector3::from(region.size));
            if bounds.volume() == 0 {
                return Err(AppError::Scene(format!("region '{}' has zero volume", region.name)));
            }
            let mut builder = RegionBuilder::new(region.name.clone(), LevelData::new(bounds).shared())
                .with_base_layer_only(region.base_layer_only)
                .with_max_iterations(region.max_iterations.unwrap_or(default_max_iterations));

            if let Some(groups) = &region.allowed_groups {
                let mask = group_mask(&catalog, groups)?;
                let mut wave = input_wave_for(&bounds);
                wave.as_mut_slice().fill(mask);
                builder = builder.with_input_wave(Arc::new(wave));
            }
            for boundary in &region.boundaries {
                let source = match &boundary.source {
                    SceneBoundary::Region(name) => {
                        let other = names.get(name.as_str()).copied().ok_or_else(|| {
                            AppError::Scene(format!("region '{}' refers to unknown region '{name}'", region.name))
                        })?;
                        BoundarySource::Builder(other)
                    }
                    SceneBoundary::Groups(groups) => BoundarySource::Groups(group_mask(&catalog, groups)?),
                };
                builder = builder.with_boundary(boundary.face, source);
            }
            if let Some(overrides) = &region.weight_overrides {
                builder = builder.with_weight_overrides(overrides.clone());
            }
            if let Some(seed) = region.seed.or(seed.map(|s| s.wrapping_add(index as u64))) {
                builder = builder.with_seed(seed);
            }
            scheduler.add_builder(builder);
        }
        Ok(scheduler)
    }
}

fn group_mask(catalog: &Catalog, names: &[String]) -> Result<InputWaveCell, AppError> {
    names
        .iter()
        .map(|name| {
            catalog
                .group_index(name)
                .ok_or_else(|| AppError::Scene(format!("unknown group '{name}'")))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(InputWaveCell::from_groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"(
        regions: [
            (
                name: "yard",
                size: (4, 2, 4),
                boundaries: [(face: down, source: Groups(["Solid"]))],
            ),
            (
                name: "annex",
                origin: (4, 0, 0),
                size: (2, 2, 4),
                allowed_groups: Some(["Solid", "Empty"]),
                boundaries: [(face: left, source: Region("yard"))],
            ),
        ],
    )"#;

    #[test]
    fn builds_builders_with_resolved_links() {
        let scene: SceneDescriptor = ron::from_str(SCENE).unwrap();
        let scheduler = scene
            .build(Arc::new(Catalog::builtin()), ExecutionMode::SingleThreaded, 4, Some(10))
            .unwrap();
        assert_eq!(scheduler.builders().len(), 2);
        let annex = &scheduler.builders()[1];
        assert_eq!(annex.boundaries[Direction::Left.index()], Some(BoundarySource::Builder(0)));
        assert_eq!(annex.seed, Some(11));
        assert!(annex.input_wave.is_some());
        assert_eq!(scheduler.connected_groups(), vec![vec![0, 1]]);
    }

    #[test]
    fn unknown_names_are_rejected() {
        let mut scene: SceneDescriptor = ron::from_str(SCENE).unwrap();
        scene.regions[1].boundaries[0].source = SceneBoundary::Region("nowhere".to_owned());
        let result = scene.build(Arc::new(Catalog::builtin()), ExecutionMode::SingleThreaded, 4, None);
        assert!(matches!(result, Err(AppError::Scene(_))));

        let mut scene: SceneDescriptor = ron::from_str(SCENE).unwrap();
        scene.regions[0].allowed_groups = Some(vec!["Lava".to_owned()]);
        let result = scene.build(Arc::new(Catalog::builtin()), ExecutionMode::SingleThreaded, 4, None);
        assert!(matches!(result, Err(AppError::Scene(_))));
    }
}
