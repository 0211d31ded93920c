#![forbid(unsafe_code)]

pub mod badges;
pub mod board;
pub mod model;
pub mod progression;
pub mod scoring;
pub mod time;

pub use time::Clock;
