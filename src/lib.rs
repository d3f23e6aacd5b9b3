//! AnestEasy Billing - Subscription backend for the AnestEasy platform
//!
//! This crate implements subscription lifecycle management for Brazilian
//! anesthesiologists: plan purchase state, deferred plan changes, the
//! eight-day refund window, access gating, and Pagar.me webhook ingestion.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
