pub mod aggregator;
pub mod budget;
pub mod cancel;
pub mod context;
pub mod filter;
pub mod planner;
pub mod strategy;
pub mod supervisor;
pub mod worker;
pub mod workers;

pub use budget::BudgetTracker;
pub use cancel::CancelSignal;
pub use context::{Context, ContextSummary};
pub use planner::{DeterministicPlanner, LlmPlanner, Planner, RoundHistory, StrategyTag};
pub use strategy::{Icp, Strategy};
pub use supervisor::Supervisor;
pub use worker::WorkerResult;
