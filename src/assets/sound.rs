use super::AudioHandle;

/// Audio output as seen by the engine. Calls are fire-and-forget.
pub trait SoundPlayer {
    fn play(&mut self, audio: &AudioHandle);
    fn pause(&mut self);
    fn stop(&mut self);
    /// Clamped to `[0, 1]`.
    fn set_volume(&mut self, volume: f32);
    fn seek(&mut self, seconds: f32);
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

/// Tracks playback state and logs it, produces no sound.
#[derive(Debug, Clone, PartialEq)]
pub struct SilentSoundPlayer {
    pub track: Option<String>,
    pub state: PlaybackState,
    pub volume: f32,
    pub position: f32,
}

impl Default for SilentSoundPlayer {
    fn default() -> Self {
        Self {
            track: None,
            state: PlaybackState::Stopped,
            volume: 1.0,
            position: 0.0,
        }
    }
}

impl SilentSoundPlayer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SoundPlayer for SilentSoundPlayer {
    fn play(&mut self, audio: &AudioHandle) {
        if self.track.as_deref() != Some(audio.key()) {
            self.position = 0.0;
        }
        self.track = Some(audio.key().to_string());
        self.state = PlaybackState::Playing;
        log::debug!("Playing '{}' from {}s", audio.key(), self.position);
    }

    fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
        self.position = 0.0;
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn seek(&mut self, seconds: f32) {
        self.position = seconds.max(0.0);
    }
}

#[test]
fn test_silent_player_state() {
    let theme = AudioHandle::new("theme", vec![]);
    let jump = AudioHandle::new("jump", vec![]);
    let mut player = SilentSoundPlayer::new();

    player.play(&theme);
    player.seek(12.5);
    player.pause();
    assert_eq!(player.state, PlaybackState::Paused);
    player.play(&theme);
    assert_eq!(player.position, 12.5);

    player.play(&jump);
    assert_eq!(player.position, 0.0);
    assert_eq!(player.track.as_deref(), Some("jump"));

    player.set_volume(3.0);
    assert_eq!(player.volume, 1.0);
    player.stop();
    assert_eq!(player.state, PlaybackState::Stopped);
}
