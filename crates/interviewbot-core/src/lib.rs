//! interviewbot-core: question supply, answer scoring and the session engine.
//!
//! Store and generator back ends plug in through the traits in [`traits`];
//! everything else in the system builds on the types defined here.

pub mod engine;
pub mod error;
pub mod generation;
pub mod model;
pub mod parser;
pub mod report;
pub mod scoring;
pub mod supplier;
pub mod traits;
