//! Road Traffic Simulation Library
//!
//! A headless traffic simulation core: a road graph, vehicles routed across
//! it and a fixed-timestep pipeline of systems moving them along.

pub mod simulation;
