//! Goal lifecycle engine: creation, recomputation, recurrence, expiration
//! and the authorization gate in front of them.

#![warn(missing_docs)]

pub mod auth;
pub mod config;
pub mod error;
pub mod manager;
pub mod recurrence;
pub mod request;
pub mod service;
pub mod sweeper;

pub use auth::{require_role, Authorizer, Caller, Role, StaticAuthorizer};
pub use config::{EngineConfig, EngineContext};
pub use error::{GoalError, Result};
pub use manager::{BasicGoalManager, GoalManager};
pub use recurrence::{DailyRecurrence, RecurrenceSpawner};
pub use request::{CreateGoalRequest, GoalDraft, GoalPatch, UpdateGoalRequest};
pub use service::GoalService;
pub use sweeper::ExpirationSweeper;
