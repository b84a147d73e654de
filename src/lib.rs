//! Smart traffic sign: turns per-frame object detections into a driving
//! advisory, picks the sign to show for it and streams the result to one
//! TCP subscriber as newline-delimited JSON.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
