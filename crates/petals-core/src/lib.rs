//! Petals core engine: platform-agnostic particle lifecycle for the cursor
//! trail. Hosts feed it pointer events, timer ticks and display frames.

pub mod clock;
pub mod config;
pub mod error;
pub mod particle;
pub mod renderer;
pub mod schedule;
pub mod trail;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AnimationConfig, EngineConfig, PetalColor, Span, TrailConfig};
pub use error::{EngineError, Result};
pub use particle::{Particle, ParticleId};
pub use renderer::{PetalMotion, PetalPose, PetalRenderer, RendererPhase};
pub use trail::{Lifecycle, MoveOutcome, TrailManager};

