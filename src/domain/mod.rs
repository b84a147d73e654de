pub mod advisory;
pub mod artifact;
pub mod counts;
pub mod detection;
pub mod errors;
pub mod smoothing;
pub mod stream;
