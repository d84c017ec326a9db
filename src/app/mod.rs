//! Runnable front ends for the engine: an interactive window and a headless
//! loop, both driving the same demo scene.

pub mod demo;
pub mod headless;
pub mod window;
