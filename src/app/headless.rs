use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc
    },
    time::Duration
};

use tokio::time::{
    Instant,
    Interval,
    MissedTickBehavior
};

use crate::{
    config::GameConfig,
    error::EngineError,
    game::game_loop::{FrameDriver, Game},
    rendering::RecordingRenderer
};

use super::demo;

/// Fixed rate frame driver on a single threaded tokio runtime. Late ticks
/// are skipped, there is no catch-up.
pub struct IntervalDriver {
    runtime: tokio::runtime::Runtime,
    interval: Interval,
    started: Instant,
    remaining: Option<u64>,
    stop: Arc<AtomicBool>,
}

impl IntervalDriver {
    pub fn new(fps: u32, frames: Option<u64>) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;

        let interval = {
            let _guard = runtime.enter();
            let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / fps.max(1) as f64));
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        };

        Ok(Self {
            runtime,
            interval,
            started: Instant::now(),
            remaining: frames,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag that ends the driver at the next frame once set.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }
}

impl FrameDriver for IntervalDriver {
    fn next_frame(&mut self) -> Option<f64> {
        if self.stop.load(Ordering::SeqCst) || self.remaining == Some(0) {
            return None;
        }
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }
        let tick = self.runtime.block_on(self.interval.tick());
        Some(tick.duration_since(self.started).as_secs_f64() * 1000.0)
    }
}

/// Runs the demo against a [`RecordingRenderer`] until `frames` are done or
/// Ctrl-C is pressed.
pub fn run(config: GameConfig, fps: u32, frames: Option<u64>) -> Result<u64, EngineError> {
    let mut renderer = RecordingRenderer::new(config.width, config.height);
    let mut game = Game::new(config);
    demo::install(&mut game);

    let mut driver = IntervalDriver::new(fps, frames).map_err(|e| EngineError::Config(e.into()))?;
    let stop = driver.stop_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        log::info!("Captured ctrl-C, stopping the game...");
        stop.store(true, Ordering::SeqCst);
    }) {
        log::warn!("Ctrl-C handler not installed, reason: {e}");
    }

    let frames_run = game.run(&mut driver, &mut renderer)?;
    let (drawn, entities) = game.current_scene()
        .map(|s| (renderer.shape_count(), s.world.len()))
        .unwrap_or_default();
    log::info!("Headless run finished: {frames_run} frames, last frame drew {drawn} shapes of {entities} entities, {:.1} fps",
        game.clock().smoothed_fps());
    Ok(frames_run)
}

#[test]
fn test_interval_driver_counts_down() {
    let mut driver = IntervalDriver::new(1000, Some(3)).unwrap();
    let first = driver.next_frame().unwrap();
    let second = driver.next_frame().unwrap();
    assert!(second >= first);
    assert!(driver.next_frame().is_some());
    assert_eq!(driver.next_frame(), None);
}

#[test]
fn test_interval_driver_stop_flag() {
    let mut driver = IntervalDriver::new(1000, None).unwrap();
    assert!(driver.next_frame().is_some());
    driver.stop_handle().store(true, Ordering::SeqCst);
    assert_eq!(driver.next_frame(), None);
}
