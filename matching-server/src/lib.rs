//! Rider-to-driver matching server.
//!
//! Takes trip requests, finds nearby drivers through the geospatial
//! service, picks the best one by weighted score and retries with a
//! cooldown when nobody is available.

pub mod cache;
pub mod config;
pub mod domain;
pub mod geo;
pub mod matching;
pub mod pricing;
pub mod web;
