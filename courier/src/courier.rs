use std::collections::VecDeque;

use pathing::{GridMap, Point};
use serde::{Deserialize, Serialize};

use crate::error::CourierError;

/// What the courier is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    ToPickup,
    /// Standing on the pickup; leaves for the destination when the countdown runs out
    SettlingAtPickup { remaining_ticks: u32 },
    Forward,
    Return,
    ReplayToPickup,
    Paused,
}

impl Phase {
    /// Following a path, one cell per step
    pub fn is_moving(self) -> bool {
        matches!(
            self,
            Phase::ToPickup | Phase::Forward | Phase::Return | Phase::ReplayToPickup
        )
    }

    /// Anything that ticks forward on its own and can be paused
    pub fn is_active(self) -> bool {
        self.is_moving() || matches!(self, Phase::SettlingAtPickup { .. })
    }
}

/// Everything a renderer needs to place the courier sprite
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pose {
    pub position: Point,
    /// Radians, measured from the +column axis towards +row (screen coordinates)
    pub heading: f64,
    pub phase: Phase,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Courier {
    pub(crate) position: Point,
    pub(crate) heading: f64,
    pub(crate) remaining_path: VecDeque<Point>,
    pub(crate) phase: Phase,
}

impl Courier {
    pub fn new(position: Point) -> Self {
        Self {
            position,
            heading: 0.0,
            remaining_path: VecDeque::new(),
            phase: Phase::Idle,
        }
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn heading(&self) -> f64 {
        self.heading
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn remaining_path(&self) -> &VecDeque<Point> {
        &self.remaining_path
    }

    pub fn pose(&self) -> Pose {
        Pose {
            position: self.position,
            heading: self.heading,
            phase: self.phase,
        }
    }

    /// Move onto the next cell of the path.
    ///
    /// Returns `Ok(false)` if there is nothing left to walk. A next cell that is not a road in
    /// `grid` is left in place and reported as blocked.
    pub(crate) fn step(&mut self, grid: &GridMap) -> Result<bool, CourierError> {
        let Some(&next) = self.remaining_path.front() else {
            return Ok(false);
        };
        if !grid.is_road(next) {
            return Err(CourierError::RouteBlocked { at: next });
        }
        self.remaining_path.pop_front();
        if next != self.position {
            self.heading = heading_between(self.position, next);
        }
        self.position = next;
        Ok(true)
    }
}

/// Angle of the vector from `from` to `to`, with rows growing downwards
pub fn heading_between(from: Point, to: Point) -> f64 {
    let d_col = to.col as f64 - from.col as f64;
    let d_row = to.row as f64 - from.row as f64;
    d_row.atan2(d_col)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_heading() {
        let here = Point { row: 5, col: 5 };
        assert_eq!(heading_between(here, Point { row: 5, col: 6 }), 0.0);
        assert_eq!(heading_between(here, Point { row: 6, col: 5 }), FRAC_PI_2);
        assert_eq!(heading_between(here, Point { row: 4, col: 5 }), -FRAC_PI_2);
        assert_eq!(heading_between(here, Point { row: 5, col: 4 }), PI);
    }

    #[test]
    fn test_step_follows_path_and_turns() {
        let grid: GridMap = "...\n...".parse().unwrap();
        let mut courier = Courier::new(Point { row: 0, col: 0 });
        courier.remaining_path =
            VecDeque::from([Point { row: 0, col: 1 }, Point { row: 1, col: 1 }]);

        assert!(courier.step(&grid).unwrap());
        assert_eq!(courier.position(), Point { row: 0, col: 1 });
        assert_eq!(courier.heading(), 0.0);

        assert!(courier.step(&grid).unwrap());
        assert_eq!(courier.position(), Point { row: 1, col: 1 });
        assert_eq!(courier.heading(), FRAC_PI_2);

        assert!(!courier.step(&grid).unwrap());
        assert_eq!(courier.position(), Point { row: 1, col: 1 });
    }

    #[test]
    fn test_step_into_wall_is_blocked() {
        let grid: GridMap = ".#".parse().unwrap();
        let mut courier = Courier::new(Point { row: 0, col: 0 });
        let wall = Point { row: 0, col: 1 };
        courier.remaining_path = VecDeque::from([wall]);

        assert_eq!(
            courier.step(&grid),
            Err(CourierError::RouteBlocked { at: wall })
        );
        assert_eq!(courier.position(), Point { row: 0, col: 0 });
    }

    #[test]
    fn test_phase_classes() {
        assert!(Phase::Forward.is_moving());
        assert!(!Phase::SettlingAtPickup { remaining_ticks: 3 }.is_moving());
        assert!(Phase::SettlingAtPickup { remaining_ticks: 3 }.is_active());
        assert!(!Phase::Paused.is_active());
        assert!(!Phase::Idle.is_active());
    }
}
