//! Progress of a single hop.

use gm_core::{NodeId, Point2, Tick};

use crate::{interpolate, MovementClass, TimingTable};

/// An aircraft travelling from `from` to `to`.
///
/// Progress is the share of `duration_ticks` actually moved.  A hop may be
/// held below a cap (the destination node is contested) and resumed later;
/// held ticks do not count as moved.  The duration is fixed when the hop
/// begins.
#[derive(Debug, Clone, PartialEq)]
pub struct HopState {
    pub from:           NodeId,
    pub to:             NodeId,
    pub class:          MovementClass,
    /// Tick the hop was granted.
    pub started:        Tick,
    pub duration_ticks: u32,
    /// Ticks spent moving, excluding ticks held at a cap.
    pub moved_ticks:    u32,
    /// Fraction completed, in `[0.0, 1.0]`.
    pub progress:       f32,
}

impl HopState {
    /// Begin a hop whose length is `distance` graph units.
    pub fn begin(
        from: NodeId,
        to: NodeId,
        distance: f32,
        class: MovementClass,
        timing: &TimingTable,
        now: Tick,
    ) -> Self {
        Self {
            from,
            to,
            class,
            started: now,
            duration_ticks: timing.duration(distance, class).max(1),
            moved_ticks: 0,
            progress: 0.0,
        }
    }

    /// Advance one tick without passing `cap`.  Returns `true` once the hop
    /// is complete.
    pub fn advance(&mut self, cap: f32) -> bool {
        if self.is_complete() {
            return true;
        }
        let cap = cap.clamp(0.0, 1.0);
        let moved = self.moved_ticks + 1;
        let next = (moved as f64 / self.duration_ticks as f64).min(1.0) as f32;
        if next > cap {
            // Held; never move backwards when the cap is below current progress.
            self.progress = self.progress.max(cap);
        } else {
            self.moved_ticks = moved;
            self.progress = self.progress.max(next);
        }
        self.is_complete()
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.moved_ticks >= self.duration_ticks
    }

    /// Ticks still needed at full speed.
    pub fn remaining_ticks(&self) -> u32 {
        self.duration_ticks.saturating_sub(self.moved_ticks)
    }

    /// Drawn position between the two endpoint positions.
    #[inline]
    pub fn position(&self, from_pos: Point2, to_pos: Point2) -> Point2 {
        interpolate(from_pos, to_pos, self.progress)
    }
}
