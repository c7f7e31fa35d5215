use serde::{Deserialize, Serialize};

use crate::order::ShelfTemperature;

// equality is over (id, capacity, temperature)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shelf {
    pub id: String,
    pub capacity: usize,
    pub temperature: ShelfTemperature,
    pub decay_rate_factor: f64,
}

impl PartialEq for Shelf {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.capacity == other.capacity
            && self.temperature == other.temperature
    }
}
impl Eq for Shelf {}

impl Shelf {
    pub fn new(
        id: impl Into<String>,
        capacity: usize,
        temperature: ShelfTemperature,
        decay_rate_factor: f64,
    ) -> Self {
        Self {
            id: id.into(),
            capacity,
            temperature,
            decay_rate_factor,
        }
    }
}
