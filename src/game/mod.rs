pub mod animation;
pub mod body;
pub mod camera;
pub mod collider;
pub mod events;
pub mod game_loop;
pub mod geometry;
pub mod group;
pub mod lists;
pub mod math;
pub mod particles;
pub mod physics;
pub mod scene;
pub mod timers;
pub mod world;
