pub mod display;
pub mod replay;
pub mod tcp;
