//! Frame based sprite animation.
//!
//! An [`AnimationManager`] lives inside the body it animates and is stepped
//! by the scene with the frame delta, so dropping the body stops it. The
//! [`AnimationStateMachine`] picks which animation plays through named
//! trigger edges between states.

use std::collections::HashMap;

use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    /// Spritesheet frame indices, in playback order.
    pub frames: Vec<usize>,
    pub frame_duration_ms: f32,
    pub looping: bool,
}

impl Animation {
    pub fn new(frames: Vec<usize>, frame_duration_ms: f32, looping: bool) -> Self {
        Self { frames, frame_duration_ms, looping }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationManager {
    animations: HashMap<String, Animation>,
    current: Option<String>,
    step: usize,
    elapsed_ms: f32,
    playing: bool,
    finished: bool,
}

impl AnimationManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<S: AsRef<str>>(&mut self, name: S, animation: Animation) {
        self.animations.insert(name.as_ref().to_string(), animation);
    }

    pub fn with<S: AsRef<str>>(mut self, name: S, animation: Animation) -> Self {
        self.add(name, animation);
        self
    }

    /// Starts `name` from its first frame. Playing the animation that already
    /// runs keeps its progress.
    pub fn play<S: AsRef<str>>(&mut self, name: S) -> Result<(), EngineError> {
        let name = name.as_ref();
        if !self.animations.contains_key(name) {
            return Err(EngineError::AnimationNotFound(name.to_string()));
        }
        if self.playing && self.current.as_deref() == Some(name) {
            return Ok(());
        }
        self.current = Some(name.to_string());
        self.step = 0;
        self.elapsed_ms = 0.0;
        self.playing = true;
        self.finished = false;
        Ok(())
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn current_animation(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Spritesheet frame of the current step.
    pub fn current_frame(&self) -> Option<usize> {
        let animation = self.animations.get(self.current.as_ref()?)?;
        animation.frames.get(self.step).copied()
    }

    /// Advances by `dt_ms`, returns the frame to show when it changed.
    pub fn update(&mut self, dt_ms: f32) -> Option<usize> {
        if !self.playing {
            return None;
        }
        let animation = self.animations.get(self.current.as_ref()?)?;
        if animation.frames.is_empty() || animation.frame_duration_ms <= 0.0 {
            return None;
        }

        self.elapsed_ms += dt_ms;
        let mut changed = false;
        while self.elapsed_ms >= animation.frame_duration_ms {
            self.elapsed_ms -= animation.frame_duration_ms;
            if self.step + 1 < animation.frames.len() {
                self.step += 1;
                changed = true;
            } else if animation.looping {
                self.step = 0;
                changed = true;
            } else {
                self.playing = false;
                self.finished = true;
                break;
            }
        }

        if changed {
            animation.frames.get(self.step).copied()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Transition {
    from: String,
    to: String,
    trigger: String,
}

/// Graph of named states, each bound to an animation, connected by
/// trigger-labelled edges.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationStateMachine {
    states: HashMap<String, String>,
    transitions: Vec<Transition>,
    current: Option<String>,
}

impl AnimationStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `state` to `animation`. The first state added becomes current.
    pub fn add_state<S: AsRef<str>, A: AsRef<str>>(&mut self, state: S, animation: A) {
        let state = state.as_ref().to_string();
        if self.current.is_none() {
            self.current = Some(state.clone());
        }
        self.states.insert(state, animation.as_ref().to_string());
    }

    pub fn add_transition<F, T, G>(&mut self, from: F, to: T, trigger: G)
    where
        F: AsRef<str>,
        T: AsRef<str>,
        G: AsRef<str>
    {
        self.transitions.push(Transition {
            from: from.as_ref().to_string(),
            to: to.as_ref().to_string(),
            trigger: trigger.as_ref().to_string(),
        });
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn animation_of<S: AsRef<str>>(&self, state: S) -> Option<&str> {
        self.states.get(state.as_ref()).map(String::as_str)
    }

    /// Follows the edge labelled `trigger` out of the current state and starts
    /// the bound animation. Returns the new state, `None` leaves everything as is.
    pub fn fire<S: AsRef<str>>(&mut self, trigger: S, animations: &mut AnimationManager) -> Option<String> {
        let current = self.current.as_deref()?;
        let next = self.transitions.iter()
            .find(|t| t.from == current && t.trigger == trigger.as_ref())
            .map(|t| t.to.clone())?;
        self.enter(next, animations)
    }

    /// Jumps to `state` without needing an edge.
    pub fn force<S: AsRef<str>>(&mut self, state: S, animations: &mut AnimationManager) -> Option<String> {
        self.enter(state.as_ref().to_string(), animations)
    }

    fn enter(&mut self, state: String, animations: &mut AnimationManager) -> Option<String> {
        let animation = self.states.get(&state)?;
        if let Err(e) = animations.play(animation) {
            log::warn!("State '{state}' points to a missing animation, reason: {e}");
        }
        self.current = Some(state.clone());
        Some(state)
    }
}

#[cfg(test)]
fn walking_manager() -> AnimationManager {
    AnimationManager::new()
        .with("idle", Animation::new(vec![0], 100.0, true))
        .with("walk", Animation::new(vec![1, 2, 3], 100.0, true))
        .with("jump", Animation::new(vec![4, 5], 50.0, false))
}

#[test]
fn test_looping_animation_wraps() {
    let mut manager = walking_manager();
    manager.play("walk").unwrap();
    assert_eq!(manager.current_frame(), Some(1));
    assert_eq!(manager.update(50.0), None);
    assert_eq!(manager.update(50.0), Some(2));
    assert_eq!(manager.update(200.0), Some(1));
    assert!(manager.is_playing());
}

#[test]
fn test_one_shot_animation_finishes() {
    let mut manager = walking_manager();
    manager.play("jump").unwrap();
    assert_eq!(manager.update(50.0), Some(5));
    assert_eq!(manager.update(500.0), None);
    assert!(manager.is_finished());
    assert!(!manager.is_playing());
    assert_eq!(manager.current_frame(), Some(5));
}

#[test]
fn test_unknown_animation_is_rejected() {
    let mut manager = walking_manager();
    assert!(matches!(manager.play("fly"), Err(EngineError::AnimationNotFound(_))));
    assert_eq!(manager.current_animation(), None);
}

#[test]
fn test_state_machine_follows_edges_only() {
    let mut manager = walking_manager();
    let mut machine = AnimationStateMachine::new();
    machine.add_state("idle", "idle");
    machine.add_state("walking", "walk");
    machine.add_state("jumping", "jump");
    machine.add_transition("idle", "walking", "move");
    machine.add_transition("walking", "idle", "halt");
    machine.add_transition("walking", "jumping", "jump");

    assert_eq!(machine.current(), Some("idle"));
    assert_eq!(machine.fire("jump", &mut manager), None);
    assert_eq!(machine.current(), Some("idle"));

    assert_eq!(machine.fire("move", &mut manager).as_deref(), Some("walking"));
    assert_eq!(manager.current_animation(), Some("walk"));
    assert_eq!(machine.fire("jump", &mut manager).as_deref(), Some("jumping"));
    assert_eq!(manager.current_animation(), Some("jump"));

    assert_eq!(machine.force("idle", &mut manager).as_deref(), Some("idle"));
    assert_eq!(machine.force("swimming", &mut manager), None);
}
