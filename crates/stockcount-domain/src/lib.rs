//! Domain layer - count cell interpretation and reconciliation rules

pub mod service;
