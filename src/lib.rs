//! Traffic Grid Library
//!
//! A deterministic, tick-driven traffic kernel for a grid of signalised
//! intersections, meant to be embedded in a host that renders or analyses it.

pub mod simulation;
