//! The courier state machine.
//!
//! A delivery runs origin -> pickup -> destination. The machine walks the courier along one leg at
//! a time, waits at the pickup for a few ticks, and handles pause, resume, replay and the trip
//! back. Every operation takes the current grid by reference; the machine never keeps one.

use std::collections::VecDeque;

use log::{debug, info, warn};
use pathing::{GridMap, PathFinder, PathFinderState, Point};
use serde::{Deserialize, Serialize};

use crate::config::{CourierConfig, ReturnPolicy, ReturnTarget};
use crate::courier::{Courier, Phase, Pose};
use crate::error::{CourierError, NoRoute, Precondition};

/// The three waypoints of a delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub origin: Point,
    pub pickup: Point,
    pub destination: Point,
}

/// What happened during one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickEvent {
    /// Nothing to do: idle or paused
    Idle,
    /// Moving, but not yet time for the next step
    Waiting,
    Settling { remaining_ticks: u32 },
    DepartedPickup,
    Stepped(Pose),
    ReachedPickup(Pose),
    ArrivedAtDestination(Pose),
    ReturnedToStart(Pose),
}

/// Result of a command that may set the courier in motion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    /// A new leg was started, or the courier was already under way
    Moving(Phase),
    /// Picked up where a pause left off
    Resumed(Phase),
    /// The courier already stands where it was asked to go
    AlreadyArrived,
}

/// Everything needed to continue exactly where a pause interrupted
#[derive(Debug, Clone, PartialEq)]
struct PausedSnapshot {
    phase: Phase,
    /// The current position followed by the rest of the path
    path: Vec<Point>,
    heading: f64,
    frame_counter: u32,
}

/// Shortest path between two cells, or [`NoRoute::Between`].
///
/// `from == to` is a valid, empty path.
pub fn plan(grid: &GridMap, from: Point, to: Point) -> Result<Vec<Point>, CourierError> {
    match PathFinder::new(grid, from, to).finish(grid).0 {
        PathFinderState::PathFound(result) => {
            debug!("planned {} -> {}: {} steps", from, to, result.path.len());
            Ok(result.path)
        }
        _ => Err(NoRoute::Between { from, to }.into()),
    }
}

#[derive(Debug, Clone)]
pub struct CourierMachine {
    ticks_per_step: u32,
    settle_ticks: u32,
    return_policy: ReturnPolicy,
    return_target: ReturnTarget,

    courier: Courier,
    route: Option<Route>,
    /// The last planned pickup -> destination leg
    committed: Option<Vec<Point>>,
    pickup_visited: bool,
    snapshot: Option<PausedSnapshot>,
    frame_counter: u32,
}

impl CourierMachine {
    pub fn new(config: &CourierConfig) -> Self {
        Self {
            ticks_per_step: config.ticks_per_step.max(1),
            settle_ticks: config.settle_ticks,
            return_policy: config.return_policy,
            return_target: config.return_target,
            courier: Courier::new(Point { row: 0, col: 0 }),
            route: None,
            committed: None,
            pickup_visited: false,
            snapshot: None,
            frame_counter: 0,
        }
    }

    /// Forget the route, the flags and any motion. The courier waits idle at the top-left cell.
    pub fn reset(&mut self) {
        self.courier = Courier::new(Point { row: 0, col: 0 });
        self.route = None;
        self.committed = None;
        self.pickup_visited = false;
        self.snapshot = None;
        self.frame_counter = 0;
    }

    /// Take on a new route. The courier is parked at the origin and waits for [`Self::start`].
    pub fn commit_route(&mut self, route: Route, delivery_leg: Vec<Point>) {
        self.reset();
        self.courier = Courier::new(route.origin);
        self.route = Some(route);
        self.committed = Some(delivery_leg);
        info!(
            "new route: origin {} pickup {} destination {}",
            route.origin, route.pickup, route.destination
        );
    }

    pub fn courier(&self) -> &Courier {
        &self.courier
    }

    pub fn pose(&self) -> Pose {
        self.courier.pose()
    }

    pub fn phase(&self) -> Phase {
        self.courier.phase
    }

    pub fn route(&self) -> Option<Route> {
        self.route
    }

    pub fn committed_route(&self) -> Option<&[Point]> {
        self.committed.as_deref()
    }

    /// The pickup flag, until the courier has collected the parcel
    pub fn pickup_flag(&self) -> Option<Point> {
        self.route
            .filter(|_| !self.pickup_visited)
            .map(|r| r.pickup)
    }

    pub fn destination_flag(&self) -> Option<Point> {
        self.route.map(|r| r.destination)
    }

    /// Advance the courier by one animation tick
    pub fn advance_tick(&mut self, grid: &GridMap) -> Result<TickEvent, CourierError> {
        match self.courier.phase {
            Phase::Idle | Phase::Paused => Ok(TickEvent::Idle),
            Phase::SettlingAtPickup { remaining_ticks } if remaining_ticks > 1 => {
                let remaining_ticks = remaining_ticks - 1;
                self.courier.phase = Phase::SettlingAtPickup { remaining_ticks };
                Ok(TickEvent::Settling { remaining_ticks })
            }
            Phase::SettlingAtPickup { .. } => self.depart_pickup(grid),
            Phase::ToPickup | Phase::Forward | Phase::Return | Phase::ReplayToPickup => {
                self.frame_counter += 1;
                if self.frame_counter < self.ticks_per_step {
                    return Ok(TickEvent::Waiting);
                }
                self.frame_counter = 0;

                if let Err(e) = self.courier.step(grid) {
                    warn!("{}, stopping at {}", e, self.courier.position);
                    self.halt();
                    return Err(e);
                }

                if self.courier.remaining_path.is_empty() {
                    Ok(self.complete_leg())
                } else {
                    Ok(TickEvent::Stepped(self.pose()))
                }
            }
        }
    }

    pub fn pause(&mut self) -> Result<(), CourierError> {
        let phase = self.courier.phase;
        if !phase.is_active() {
            return Err(Precondition::NotMoving.into());
        }

        let mut path = Vec::with_capacity(self.courier.remaining_path.len() + 1);
        path.push(self.courier.position);
        path.extend(self.courier.remaining_path.iter().copied());
        self.snapshot = Some(PausedSnapshot {
            phase,
            path,
            heading: self.courier.heading,
            frame_counter: self.frame_counter,
        });
        self.courier.phase = Phase::Paused;
        info!("paused at {} while {:?}", self.courier.position, phase);
        Ok(())
    }

    /// Resume after a pause, or head for whichever waypoint is still due
    pub fn start(&mut self, grid: &GridMap) -> Result<Motion, CourierError> {
        match self.courier.phase {
            Phase::Paused => match self.snapshot.take() {
                Some(snapshot) => Ok(self.restore(snapshot)),
                None => {
                    self.courier.phase = Phase::Idle;
                    self.start_fresh(grid)
                }
            },
            Phase::Idle => self.start_fresh(grid),
            phase => Ok(Motion::Moving(phase)),
        }
    }

    /// Run the whole delivery again from the origin, with freshly planned legs
    pub fn replay(&mut self, grid: &GridMap) -> Result<Motion, CourierError> {
        let route = self.route.ok_or(Precondition::NoRoute)?;
        let to_pickup = self.plan_logged(grid, route.origin, route.pickup)?;
        let delivery = self.plan_logged(grid, route.pickup, route.destination)?;

        self.courier = Courier::new(route.origin);
        self.pickup_visited = false;
        self.committed = Some(delivery);
        info!("replaying route from {}", route.origin);
        Ok(self.begin_leg(Phase::ReplayToPickup, to_pickup))
    }

    pub fn return_to_start(&mut self, grid: &GridMap) -> Result<Motion, CourierError> {
        let route = self.route.ok_or(Precondition::NoRoute)?;
        if self.return_policy == ReturnPolicy::AfterArrival
            && !(self.courier.phase == Phase::Idle && self.courier.position == route.destination)
        {
            return Err(Precondition::NotAtDestination.into());
        }

        let target = match self.return_target {
            ReturnTarget::Pickup => route.pickup,
            ReturnTarget::Origin => route.origin,
        };
        let path = self.plan_logged(grid, self.courier.position, target)?;
        info!("returning from {} to {}", self.courier.position, target);
        Ok(self.begin_leg(Phase::Return, path))
    }

    fn start_fresh(&mut self, grid: &GridMap) -> Result<Motion, CourierError> {
        let route = self.route.ok_or(Precondition::NoRoute)?;
        let position = self.courier.position;

        if !self.pickup_visited {
            let path = self.plan_logged(grid, position, route.pickup)?;
            return Ok(self.begin_leg(Phase::ToPickup, path));
        }

        if position == route.destination {
            info!("already at destination {}", position);
            return Ok(Motion::AlreadyArrived);
        }
        let path = match self.cached_delivery_leg(position) {
            Some(leg) => leg,
            None => self.plan_logged(grid, position, route.destination)?,
        };
        Ok(self.begin_leg(Phase::Forward, path))
    }

    fn restore(&mut self, snapshot: PausedSnapshot) -> Motion {
        let mut path = VecDeque::from(snapshot.path);
        if let Some(position) = path.pop_front() {
            self.courier.position = position;
        }
        self.courier.remaining_path = path;
        self.courier.heading = snapshot.heading;
        self.courier.phase = snapshot.phase;
        self.frame_counter = snapshot.frame_counter;
        info!(
            "resumed at {} while {:?}",
            self.courier.position, snapshot.phase
        );
        Motion::Resumed(snapshot.phase)
    }

    fn begin_leg(&mut self, phase: Phase, path: Vec<Point>) -> Motion {
        self.snapshot = None;
        self.frame_counter = 0;
        self.courier.phase = phase;
        self.courier.remaining_path = path.into();

        if self.courier.remaining_path.is_empty() {
            self.complete_leg();
        }
        match self.courier.phase {
            Phase::Idle => Motion::AlreadyArrived,
            phase => Motion::Moving(phase),
        }
    }

    fn complete_leg(&mut self) -> TickEvent {
        match self.courier.phase {
            Phase::ToPickup | Phase::ReplayToPickup => {
                self.pickup_visited = true;
                self.courier.phase = Phase::SettlingAtPickup {
                    remaining_ticks: self.settle_ticks,
                };
                info!("picked up at {}", self.courier.position);
                TickEvent::ReachedPickup(self.pose())
            }
            Phase::Forward => {
                self.courier.phase = Phase::Idle;
                info!("delivered at {}", self.courier.position);
                TickEvent::ArrivedAtDestination(self.pose())
            }
            Phase::Return => {
                self.courier.phase = Phase::Idle;
                info!("back at {}", self.courier.position);
                TickEvent::ReturnedToStart(self.pose())
            }
            _ => {
                self.courier.phase = Phase::Idle;
                TickEvent::Idle
            }
        }
    }

    fn depart_pickup(&mut self, grid: &GridMap) -> Result<TickEvent, CourierError> {
        let Some(route) = self.route else {
            self.halt();
            return Ok(TickEvent::Idle);
        };
        let position = self.courier.position;
        let path = match self.cached_delivery_leg(position) {
            Some(leg) => leg,
            None => match self.plan_logged(grid, position, route.destination) {
                Ok(path) => path,
                Err(e) => {
                    self.halt();
                    return Err(e);
                }
            },
        };

        info!("leaving {} for {}", position, route.destination);
        self.begin_leg(Phase::Forward, path);
        Ok(TickEvent::DepartedPickup)
    }

    /// The committed pickup -> destination leg, if it starts where the courier stands
    fn cached_delivery_leg(&self, position: Point) -> Option<Vec<Point>> {
        let route = self.route?;
        self.committed
            .clone()
            .filter(|_| position == route.pickup)
    }

    fn halt(&mut self) {
        self.courier.remaining_path.clear();
        self.courier.phase = Phase::Idle;
        self.snapshot = None;
        self.frame_counter = 0;
    }

    fn plan_logged(
        &self,
        grid: &GridMap,
        from: Point,
        to: Point,
    ) -> Result<Vec<Point>, CourierError> {
        plan(grid, from, to).map_err(|e| {
            warn!("{}", e);
            e
        })
    }
}
