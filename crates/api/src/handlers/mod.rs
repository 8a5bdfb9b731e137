pub mod generate;
pub mod gpu;
pub mod health;
pub mod jobs;
pub mod sketches;
pub mod usage;
