use crate::{
    assets::AssetError,
    config::ConfigError,
    game::{
        particles::EmitterId,
        world::{EntityId, WorldError}
    },
    rendering::RenderError
};

/// Everything the engine can report. Only [`EngineError::Render`] carrying a
/// lost context is fatal for the frame loop, the rest is logged and skipped.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("World error, reason='{0}'")]
    World(#[from] WorldError),

    #[error("Scene '{0}' does not exist")]
    SceneNotFound(String),

    #[error("Camera '{0}' does not exist")]
    CameraNotFound(String),

    #[error("Particle emitter {0} does not exist")]
    EmitterNotFound(EmitterId),

    #[error("Entity {0} is a static body, velocity cannot be changed")]
    StaticBodyMutation(EntityId),

    #[error("Entity {0} has physics disabled, collider cannot be attached")]
    PhysicsDisabled(EntityId),

    #[error("Animation '{0}' does not exist")]
    AnimationNotFound(String),

    #[error("Renderer failed, reason='{0}'")]
    Render(#[from] RenderError),

    #[error("Asset error, reason='{0}'")]
    Asset(#[from] AssetError),

    #[error("Config error, reason='{0}'")]
    Config(#[from] ConfigError),

    #[error("Window error, reason='{0}'")]
    Window(#[from] winit::error::EventLoopError),
}

impl EngineError {
    /// Errors the frame loop must not swallow.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Render(RenderError::ContextLost(_)))
    }
}

#[test]
fn test_only_context_loss_is_fatal() {
    assert!(EngineError::Render(RenderError::ContextLost("device lost".into())).is_fatal());
    assert!(!EngineError::Render(RenderError::Surface("outdated".into())).is_fatal());
    assert!(!EngineError::SceneNotFound("menu".into()).is_fatal());
    assert!(!EngineError::World(WorldError::EntityNotExist(3)).is_fatal());
}
