use std::str::FromStr;

use image::{GenericImageView, Pixel};
use log::{debug, info, warn};
use pathing::{build_grid, grid_from_rgba, GridMap, Point};
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::CourierConfig;
use crate::courier::{Courier, Pose};
use crate::error::{CourierError, NoRoute, Precondition};
use crate::machine::{plan, CourierMachine, Motion, Route, TickEvent};

/// The user-facing buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Randomize,
    Start,
    Pause,
    Replay,
    ReturnToStart,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Randomize => "randomize",
            Command::Start => "start",
            Command::Pause => "pause",
            Command::Replay => "replay",
            Command::ReturnToStart => "return",
        }
    }

    /// iterates over all commands
    pub fn iterate() -> impl Iterator<Item = Command> {
        [
            Command::Randomize,
            Command::Start,
            Command::Pause,
            Command::Replay,
            Command::ReturnToStart,
        ]
        .iter()
        .copied()
    }

    pub fn from_key_code(key: &str) -> Option<Command> {
        match key {
            "r" => Some(Command::Randomize),
            "s" => Some(Command::Start),
            "p" => Some(Command::Pause),
            "y" => Some(Command::Replay),
            "b" => Some(Command::ReturnToStart),
            _ => None,
        }
    }
}

impl FromStr for Command {
    type Err = CourierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Command::iterate()
            .find(|c| c.name() == s)
            .or_else(|| Command::from_key_code(s))
            .ok_or_else(|| CourierError::UnknownCommand(s.to_string()))
    }
}

/// What a successful [`Command`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    RouteChosen(Route),
    Motion(Motion),
    Paused,
}

/// One courier session: the map, the courier on it and the commands that drive them.
pub struct RouteController {
    config: CourierConfig,
    grid: Option<GridMap>,
    machine: CourierMachine,
    rng: ChaCha8Rng,
}

impl RouteController {
    pub fn new(config: CourierConfig) -> Result<Self, CourierError> {
        Self::with_rng(config, ChaCha8Rng::from_entropy())
    }

    /// A session whose random routes are reproducible
    pub fn with_seed(config: CourierConfig, seed: u64) -> Result<Self, CourierError> {
        Self::with_rng(config, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(config: CourierConfig, rng: ChaCha8Rng) -> Result<Self, CourierError> {
        config.validate()?;
        Ok(Self {
            machine: CourierMachine::new(&config),
            config,
            grid: None,
            rng,
        })
    }

    pub fn config(&self) -> &CourierConfig {
        &self.config
    }

    /// Build the grid from a decoded image and start over on it
    pub fn load_image<I>(&mut self, image: &I) -> Result<(), CourierError>
    where
        I: GenericImageView,
        I::Pixel: Pixel<Subpixel = u8>,
    {
        let grid = build_grid(image, self.config.cell_size, &self.config.classifier())?;
        self.load_grid(grid);
        Ok(())
    }

    /// Build the grid from a raw RGBA buffer and start over on it
    pub fn load_map_rgba(
        &mut self,
        buffer: &[u8],
        width: u32,
        height: u32,
    ) -> Result<(), CourierError> {
        let grid = grid_from_rgba(
            buffer,
            width,
            height,
            self.config.cell_size,
            &self.config.classifier(),
        )?;
        self.load_grid(grid);
        Ok(())
    }

    /// Replace the grid. Route, flags, pause state and any motion are dropped.
    pub fn load_grid(&mut self, grid: GridMap) {
        info!(
            "loaded {}x{} map with {} road cells",
            grid.columns(),
            grid.rows(),
            grid.road_cells().count()
        );
        self.grid = Some(grid);
        self.machine.reset();
    }

    /// Pick random origin, pickup and destination cells that are connected by road
    pub fn randomize_route(&mut self) -> Result<Route, CourierError> {
        let grid = self.grid.as_ref().ok_or(Precondition::MapNotLoaded)?;
        let roads: Vec<Point> = grid.road_cells().collect();
        let budget = self.config.max_route_attempts;
        let mut attempts = 0;

        while attempts < budget {
            let (Some(&origin), Some(&pickup), Some(&destination)) = (
                roads.choose(&mut self.rng),
                roads.choose(&mut self.rng),
                roads.choose(&mut self.rng),
            ) else {
                // no road cells to draw from
                break;
            };
            attempts += 1;
            if origin == pickup || pickup == destination || origin == destination {
                continue;
            }
            let (Ok(_), Ok(delivery_leg)) = (
                plan(grid, origin, pickup),
                plan(grid, pickup, destination),
            ) else {
                debug!("attempt {}: waypoints not connected", attempts);
                continue;
            };

            let route = Route {
                origin,
                pickup,
                destination,
            };
            self.machine.commit_route(route, delivery_leg);
            return Ok(route);
        }

        warn!("no connected route after {} attempts", attempts);
        Err(NoRoute::Exhausted { attempts }.into())
    }

    pub fn start(&mut self) -> Result<Motion, CourierError> {
        let grid = self.grid.as_ref().ok_or(Precondition::MapNotLoaded)?;
        self.machine.start(grid)
    }

    pub fn pause(&mut self) -> Result<(), CourierError> {
        self.grid.as_ref().ok_or(Precondition::MapNotLoaded)?;
        self.machine.pause()
    }

    pub fn replay(&mut self) -> Result<Motion, CourierError> {
        let grid = self.grid.as_ref().ok_or(Precondition::MapNotLoaded)?;
        self.machine.replay(grid)
    }

    pub fn return_to_start(&mut self) -> Result<Motion, CourierError> {
        let grid = self.grid.as_ref().ok_or(Precondition::MapNotLoaded)?;
        self.machine.return_to_start(grid)
    }

    /// Drive the courier by one animation tick. Without a map nothing happens.
    pub fn tick(&mut self) -> Result<TickEvent, CourierError> {
        match &self.grid {
            Some(grid) => self.machine.advance_tick(grid),
            None => Ok(TickEvent::Idle),
        }
    }

    pub fn handle(&mut self, command: Command) -> Result<Response, CourierError> {
        debug!("command: {}", command.name());
        match command {
            Command::Randomize => self.randomize_route().map(Response::RouteChosen),
            Command::Start => self.start().map(Response::Motion),
            Command::Pause => self.pause().map(|_| Response::Paused),
            Command::Replay => self.replay().map(Response::Motion),
            Command::ReturnToStart => self.return_to_start().map(Response::Motion),
        }
    }

    pub fn grid(&self) -> Option<&GridMap> {
        self.grid.as_ref()
    }

    pub fn courier(&self) -> &Courier {
        self.machine.courier()
    }

    pub fn pose(&self) -> Pose {
        self.machine.pose()
    }

    pub fn route(&self) -> Option<Route> {
        self.machine.route()
    }

    pub fn pickup_flag(&self) -> Option<Point> {
        self.machine.pickup_flag()
    }

    pub fn destination_flag(&self) -> Option<Point> {
        self.machine.destination_flag()
    }
}
