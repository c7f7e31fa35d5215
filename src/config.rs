// no CLI/env/file parsing in here, that's main.rs's job

use serde::{Deserialize, Serialize};

use crate::order::ShelfTemperature;
use crate::shelf::Shelf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShelfPodConfig {
    pub shelves: Vec<Shelf>,
}

impl ShelfPodConfig {
    // regular shelves decay at factor 1, overflow at factor 2
    pub fn default_shelves() -> Self {
        Self {
            shelves: vec![
                Shelf::new("hot-shelf", 6, ShelfTemperature::Hot, 1.0),
                Shelf::new("cold-shelf", 6, ShelfTemperature::Cold, 1.0),
                Shelf::new("frozen-shelf", 6, ShelfTemperature::Frozen, 1.0),
                Shelf::new("overflow-shelf", 12, ShelfTemperature::Overflow, 2.0),
            ],
        }
    }

    pub fn from_json_str(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

impl Default for ShelfPodConfig {
    fn default() -> Self {
        Self::default_shelves()
    }
}
