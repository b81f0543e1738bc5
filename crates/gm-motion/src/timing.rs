//! Movement classes and the speed / minimum-duration table.

use gm_core::Point2;

use crate::{MotionError, MotionResult};

// ── MovementClass ─────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MovementClass {
    Taxi,
    Landing,
    Departing,
    Holding,
    AtStand,
}

impl MovementClass {
    pub const ALL: [MovementClass; 5] = [
        MovementClass::Taxi,
        MovementClass::Landing,
        MovementClass::Departing,
        MovementClass::Holding,
        MovementClass::AtStand,
    ];

    #[inline]
    fn slot(self) -> usize {
        match self {
            MovementClass::Taxi      => 0,
            MovementClass::Landing   => 1,
            MovementClass::Departing => 2,
            MovementClass::Holding   => 3,
            MovementClass::AtStand   => 4,
        }
    }
}

// ── TimingTable ───────────────────────────────────────────────────────────────

/// Nominal speed (graph units per tick) and duration floor for one class.
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassTiming {
    pub speed:     f32,
    pub min_ticks: u32,
}

/// Per-class timing.  Defaults: taxi 0.5 u/tick (min 2), landing and
/// departing 4 u/tick (min 1), holding and at-stand stationary (min 1).
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimingTable {
    classes: [ClassTiming; 5],
}

impl Default for TimingTable {
    fn default() -> Self {
        Self {
            classes: [
                ClassTiming { speed: 0.5, min_ticks: 2 },
                ClassTiming { speed: 4.0, min_ticks: 1 },
                ClassTiming { speed: 4.0, min_ticks: 1 },
                ClassTiming { speed: 0.0, min_ticks: 1 },
                ClassTiming { speed: 0.0, min_ticks: 1 },
            ],
        }
    }
}

impl TimingTable {
    /// Replace the entry for `class`.
    pub fn with(mut self, class: MovementClass, speed: f32, min_ticks: u32) -> Self {
        self.classes[class.slot()] = ClassTiming { speed, min_ticks };
        self
    }

    #[inline]
    pub fn get(&self, class: MovementClass) -> ClassTiming {
        self.classes[class.slot()]
    }

    #[inline]
    pub fn speed(&self, class: MovementClass) -> f32 {
        self.get(class).speed
    }

    #[inline]
    pub fn min_ticks(&self, class: MovementClass) -> u32 {
        self.get(class).min_ticks
    }

    /// Ticks needed to cover `distance` in `class`.
    ///
    /// `max(min_ticks, ceil(distance / speed))`; a zero speed yields the
    /// minimum.  Never less than 1.
    pub fn duration(&self, distance: f32, class: MovementClass) -> u32 {
        let ClassTiming { speed, min_ticks } = self.get(class);
        let floor = min_ticks.max(1);
        if speed <= 0.0 || !distance.is_finite() || distance <= 0.0 {
            return floor;
        }
        let travel = (distance / speed).ceil();
        if travel >= u32::MAX as f32 {
            return u32::MAX;
        }
        floor.max(travel as u32)
    }

    pub fn validate(&self) -> MotionResult<()> {
        for class in MovementClass::ALL {
            let ClassTiming { speed, min_ticks } = self.get(class);
            if !speed.is_finite() || speed < 0.0 {
                return Err(MotionError::InvalidSpeed { class, speed });
            }
            if min_ticks == 0 {
                return Err(MotionError::ZeroMinimum(class));
            }
        }
        Ok(())
    }
}

// ── Interpolation ─────────────────────────────────────────────────────────────

/// Linear blend from `start` to `end`; `progress` is clamped to `[0, 1]`.
#[inline]
pub fn interpolate(start: Point2, end: Point2, progress: f32) -> Point2 {
    let t = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 1.0) };
    Point2::new(start.x + (end.x - start.x) * t, start.y + (end.y - start.y) * t)
}
