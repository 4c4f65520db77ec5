// ABOUTME: Training-load intelligence for activity analysis and rolling aggregates
// ABOUTME: Hosts the load model, TRIMP computation, HR zones, and both ACWR engines

//! # Training Intelligence
//!
//! The algorithmic core of the engine: multi-sport external-load
//! normalization, Banister TRIMP internal load, heart-rate zone
//! distribution, and the rolling acute/chronic aggregate machines
//! (standard and exponentially-decayed).

pub mod aggregates;
pub mod decay;
pub mod load_model;
pub mod trimp;
pub mod zones;
