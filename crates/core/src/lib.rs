//! # Pathsim Core
//!
//! The pathway engine of the synthetic patient simulator.
//!
//! A pathway is a named, declarative script of clinical events (admissions, orders, results,
//! transfers, discharges) describing what happens to one or more synthetic patients over time.
//! This crate holds:
//! - the pathway data model and its strict YAML/JSON decoding
//! - expansion of templates into runnable schedules (`autogenerate` steps resolved in time)
//! - validation against the hospital's doctors, locations and order profiles
//! - the collection of loaded pathways and the strategies that pick the next one to run
//!
//! **No transport concerns**: turning steps into messages, persisting state or sending anything
//! over the wire belongs to the callers.

pub mod clock;
pub mod collection;
pub mod config;
pub mod constants;
pub mod doctors;
mod error;
pub mod locations;
pub mod manager;
pub mod order_profile;
pub mod parser;
pub mod pathway;
pub mod resources;
mod sample;
pub mod validation;

pub use error::{PathwayError, PathwayResult};
