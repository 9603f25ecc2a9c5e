//! A delivery courier on a map image.
//!
//! [`RouteController`] is the session: it turns a map image into a road grid, picks random
//! delivery routes and exposes the start / pause / replay / return commands. The courier itself
//! is driven by [`CourierMachine`], one [`RouteController::tick`] per animation frame, and a
//! renderer reads [`Pose`] and the waypoint flags back out.

pub mod config;
pub mod controller;
pub mod courier;
pub mod error;
pub mod machine;

pub use config::{ClassifierMode, CourierConfig, ReturnPolicy, ReturnTarget};
pub use controller::{Command, Response, RouteController};
pub use courier::{heading_between, Courier, Phase, Pose};
pub use error::{CourierError, NoRoute, Precondition};
pub use machine::{plan, CourierMachine, Motion, Route, TickEvent};
