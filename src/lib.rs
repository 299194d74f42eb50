//! chorus-delay - chorus wave power versus delay after substorm injections
//!
//! This library finds quiet times following injections in an auroral
//! index, matches them to Van Allen Probes passes, integrates chorus band
//! power from spectral survey data, and bins the result by delay after
//! injection with robust averaging.

pub mod chorus;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod day;
pub mod ephemeris;
pub mod flatten;
pub mod injection;
pub mod models;
pub mod plotting;
pub mod smoothing;
pub mod source;
pub mod stats;
pub mod store;
