use glam::Vec2;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{PetalColor, TrailConfig};

/// Spawn timestamp in milliseconds. Doubles as the particle's key and as its
/// age reference.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ParticleId(pub f64);

impl ParticleId {
    pub fn spawned_at(self) -> f64 {
        self.0
    }

    pub fn age(self, now: f64) -> f64 {
        now - self.0
    }

    pub fn key(self) -> u64 {
        self.0.to_bits()
    }
}

/// Spawn parameters of one petal. Never mutated after construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub id: ParticleId,
    pub position: Vec2,
    pub color: PetalColor,
    pub size: f32,
    /// Degrees.
    pub rotation: f32,
    pub reveal_delay_ms: f32,
}

impl Particle {
    pub fn random<R: Rng + ?Sized>(
        now: f64,
        position: Vec2,
        config: &TrailConfig,
        rng: &mut R,
    ) -> Self {
        // An empty palette is rejected by config validation.
        let color = config
            .palette
            .choose(rng)
            .copied()
            .unwrap_or(PetalColor([0xFF, 0xFF, 0xFF]));
        Self {
            id: ParticleId(now),
            position,
            color,
            size: config.size.sample(rng),
            rotation: config.rotation_degrees.sample(rng),
            reveal_delay_ms: config.reveal_delay_ms.sample(rng),
        }
    }
}
