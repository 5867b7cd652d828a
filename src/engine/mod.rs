pub mod availability;
pub mod draft;
pub mod filter;
pub mod lifecycle;
pub mod stats;
pub mod transitions;
pub mod workflow;
