//! Aggregation pipeline: concurrent fan-out, per-record normalization,
//! tiered ranking.
//!
//! Adapters normalize their native records through [`normalize`]; the
//! [`aggregate::Aggregator`] queries them concurrently, ranks each source's
//! candidates with [`ranking`] and merges everything into one page.

pub mod aggregate;
pub mod normalize;
pub mod ranking;
