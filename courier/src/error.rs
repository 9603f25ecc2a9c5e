use pathing::{GridError, Point};
use thiserror::Error;

/// Everything a courier command can fail with. None of these are fatal: the command is simply not
/// carried out, and apart from [`CourierError::RouteBlocked`] the session is left as it was.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CourierError {
    #[error("no route found {0}")]
    NoRouteFound(NoRoute),

    #[error("{0}")]
    PreconditionUnmet(Precondition),

    /// The next step of the active path is no longer a road. Motion has been halted.
    #[error("route blocked at {at}")]
    RouteBlocked { at: Point },

    #[error("could not build grid: {0}")]
    Grid(#[from] GridError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unknown command {0:?}")]
    UnknownCommand(String),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum NoRoute {
    #[error("from {from} to {to}")]
    Between { from: Point, to: Point },

    #[error("for any random route after {attempts} attempts")]
    Exhausted { attempts: usize },
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    #[error("no map has been loaded")]
    MapNotLoaded,
    #[error("no route has been chosen")]
    NoRoute,
    #[error("the courier is not moving")]
    NotMoving,
    #[error("the courier has not reached the destination")]
    NotAtDestination,
}

impl From<Precondition> for CourierError {
    fn from(p: Precondition) -> Self {
        CourierError::PreconditionUnmet(p)
    }
}

impl From<NoRoute> for CourierError {
    fn from(n: NoRoute) -> Self {
        CourierError::NoRouteFound(n)
    }
}
