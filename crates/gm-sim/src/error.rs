use gm_core::{GmError, NodeId};
use gm_motion::MotionError;
use gm_schedule::ScheduleError;
use gm_topology::TopologyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Core(#[from] GmError),

    #[error("topology error: {0}")]
    Topology(#[from] TopologyError),

    #[error("timing table error: {0}")]
    Motion(#[from] MotionError),

    #[error("schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("stand {0} is occupied or reserved")]
    StandUnavailable(NodeId),
}

pub type SimResult<T> = Result<T, SimError>;
