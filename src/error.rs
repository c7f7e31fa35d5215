// "shelf full" and "order already expired" are outcomes encoded in
// AddResult, not errors. what's here are programming errors: fail fast.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PodError {
    #[error("shelf {temperature:?} has no descriptor configured")]
    MissingShelf { temperature: crate::order::ShelfTemperature },

    #[error("duplicate shelf descriptor for temperature {temperature:?}")]
    DuplicateShelf { temperature: crate::order::ShelfTemperature },

    #[error(
        "cannot derive the current shelf of order {id}: state {state:?} is not StoredIn*"
    )]
    IllegalShelfQuery {
        id: String,
        state: crate::order::OrderState,
    },
}
