//! Marketverse - Multi-vendor virtual marketplace backend
//!
//! This crate implements the real-time presence and messaging layer of the
//! marketplace: a per-connection registry that multiplexes private
//! user-to-user message delivery and per-stall presence broadcast, backed by
//! a shared Redis presence store for durable occupancy state.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
