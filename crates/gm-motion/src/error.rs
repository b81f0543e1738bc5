use thiserror::Error;

use crate::MovementClass;

#[derive(Debug, Error)]
pub enum MotionError {
    #[error("invalid speed {speed} for {class:?}: must be finite and non-negative")]
    InvalidSpeed { class: MovementClass, speed: f32 },

    #[error("minimum ticks for {0:?} must be at least 1")]
    ZeroMinimum(MovementClass),
}

pub type MotionResult<T> = Result<T, MotionError>;
