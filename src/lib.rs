#[path = "core/prng.rs"]
pub mod prng;

#[path = "core/arm.rs"]
pub mod arm;

#[path = "core/target.rs"]
pub mod target;

#[path = "core/substrate.rs"]
pub mod substrate;

#[path = "core/learning.rs"]
pub mod learning;

#[path = "core/run.rs"]
pub mod run;

pub mod observer;
