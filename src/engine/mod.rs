//! Signal engine: rolling liquidity windows, the setup lifecycle state
//! machine, cross-exchange matching, discrepancy ranking, and the poll
//! orchestrator that drives them.

pub mod discrepancy;
pub mod lifecycle;
pub mod matcher;
pub mod poller;
pub mod window;
