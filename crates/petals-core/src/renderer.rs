//! Per-petal animation: a reveal delay, then a cubic ease-out fall with drift,
//! spin and a late linear fade. Each renderer owns only its own state.

use glam::Vec2;
use petals_platform::PetalSprite;
use rand::Rng;
use tracing::trace;

use crate::config::AnimationConfig;
use crate::particle::Particle;
use crate::schedule::{FrameRequest, Timeout};

/// Motion multipliers drawn once when the renderer is created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PetalMotion {
    pub speed_y: f32,
    pub drift_x: f32,
    pub rotation_speed: f32,
}

impl PetalMotion {
    pub fn random<R: Rng + ?Sized>(config: &AnimationConfig, rng: &mut R) -> Self {
        Self {
            speed_y: config.speed_y.sample(rng),
            drift_x: config.drift_x.sample(rng),
            rotation_speed: config.rotation_speed.sample(rng),
        }
    }
}

/// Derived visual state at one instant. Never written back to the particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PetalPose {
    pub offset: Vec2,
    pub rotation: f32,
    pub opacity: f32,
    pub progress: f32,
}

pub fn ease_out_cubic(progress: f32) -> f32 {
    1.0 - (1.0 - progress).powi(3)
}

/// Fully opaque until `fade_start`, then linear down to zero at completion.
pub fn fade_opacity(progress: f32, fade_start: f32) -> f32 {
    if progress <= fade_start {
        1.0
    } else {
        (1.0 - (progress - fade_start) / (1.0 - fade_start)).max(0.0)
    }
}

pub fn pose_at(
    particle: &Particle,
    motion: &PetalMotion,
    animation: &AnimationConfig,
    elapsed_ms: f64,
) -> PetalPose {
    let progress = (elapsed_ms / animation.duration_ms).clamp(0.0, 1.0) as f32;
    let eased = ease_out_cubic(progress);
    PetalPose {
        offset: Vec2::new(
            eased * animation.drift_distance * motion.drift_x,
            eased * animation.fall_distance * motion.speed_y,
        ),
        rotation: particle.rotation + eased * animation.spin_degrees * motion.rotation_speed,
        opacity: fade_opacity(progress, animation.fade_start),
        progress,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererPhase {
    /// Invisible, waiting out the reveal delay.
    Pending,
    Animating,
    /// Final transparent pose held until the trail drops the particle.
    Finished,
    TornDown,
}

#[derive(Debug, Clone)]
pub struct PetalRenderer {
    particle: Particle,
    motion: PetalMotion,
    animation: AnimationConfig,
    reveal: Timeout,
    frame: FrameRequest,
    phase: RendererPhase,
    started_at: Option<f64>,
    last_frame: Option<f64>,
    pose: PetalPose,
}

impl PetalRenderer {
    pub fn new(particle: Particle, motion: PetalMotion, animation: AnimationConfig) -> Self {
        let reveal = Timeout::new(
            particle.id.spawned_at(),
            f64::from(particle.reveal_delay_ms),
        );
        Self {
            particle,
            motion,
            animation,
            reveal,
            frame: FrameRequest::default(),
            phase: RendererPhase::Pending,
            started_at: None,
            last_frame: None,
            pose: PetalPose {
                offset: Vec2::ZERO,
                rotation: particle.rotation,
                opacity: 0.0,
                progress: 0.0,
            },
        }
    }

    pub fn spawn<R: Rng + ?Sized>(
        particle: Particle,
        animation: &AnimationConfig,
        rng: &mut R,
    ) -> Self {
        let motion = PetalMotion::random(animation, rng);
        Self::new(particle, motion, *animation)
    }

    pub fn particle(&self) -> &Particle {
        &self.particle
    }

    pub fn motion(&self) -> &PetalMotion {
        &self.motion
    }

    pub fn phase(&self) -> RendererPhase {
        self.phase
    }

    pub fn pose(&self) -> PetalPose {
        self.pose
    }

    pub fn wants_frame(&self) -> bool {
        self.frame.is_pending()
    }

    pub fn reveal_due(&self) -> Option<f64> {
        self.reveal.is_pending().then(|| self.reveal.due())
    }

    /// Fires the reveal timer if due. Returns `true` when the petal became
    /// visible on this call.
    pub fn poll_reveal(&mut self, now: f64) -> bool {
        if self.phase != RendererPhase::Pending || !self.reveal.poll(now) {
            return false;
        }
        self.phase = RendererPhase::Animating;
        self.pose.opacity = 1.0;
        self.frame.request();
        trace!(id = self.particle.id.spawned_at(), "petal revealed");
        true
    }

    /// Advances the animation to `timestamp`. Frames that arrive without an
    /// outstanding request, or that go back in time, are ignored.
    pub fn on_frame(&mut self, timestamp: f64) -> bool {
        if self.phase != RendererPhase::Animating || !self.frame.take() {
            return false;
        }
        if self.last_frame.is_some_and(|last| timestamp < last) {
            self.frame.request();
            return false;
        }
        let started_at = *self.started_at.get_or_insert(timestamp);
        self.last_frame = Some(timestamp);
        self.pose = pose_at(
            &self.particle,
            &self.motion,
            &self.animation,
            timestamp - started_at,
        );
        if self.pose.progress >= 1.0 {
            self.phase = RendererPhase::Finished;
            trace!(id = self.particle.id.spawned_at(), "petal animation finished");
        } else {
            self.frame.request();
        }
        true
    }

    pub fn teardown(&mut self) {
        self.reveal.cancel();
        self.frame.cancel();
        self.phase = RendererPhase::TornDown;
    }

    pub fn is_visible(&self) -> bool {
        matches!(
            self.phase,
            RendererPhase::Animating | RendererPhase::Finished
        ) && self.pose.opacity > 0.0
    }

    pub fn sprite(&self) -> PetalSprite {
        PetalSprite {
            key: self.particle.id.key(),
            center: self.particle.position + self.pose.offset,
            size: self.particle.size,
            rotation_degrees: self.pose.rotation,
            color: self.particle.color.rgb(),
            opacity: self.pose.opacity,
        }
    }
}
