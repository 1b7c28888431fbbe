pub mod actions;
pub mod calc;
pub mod catalog;
pub mod disaster;
pub mod engine;
pub mod events;
pub mod modifiers;
pub mod prereq;
pub mod rates;
pub mod resources;
pub mod scenario;
pub mod scheduler;
pub mod store;
pub mod web;
pub mod world;

pub use catalog::Catalog;
pub use engine::{Engine, EngineSettings};
pub use scenario::{Scenario, ScenarioLoader};
pub use scheduler::{TickScheduler, Trigger};
