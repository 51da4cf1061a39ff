//! Engine tunables. The defaults are the shipped look; nothing here is
//! surfaced to end users, TOML loading exists for development and tests.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// An opaque palette entry, serialized as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PetalColor(pub [u8; 3]);

impl PetalColor {
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex
            .strip_prefix('#')
            .filter(|d| d.len() == 6 && d.is_ascii())
            .ok_or_else(|| EngineError::InvalidColor(hex.to_string()))?;
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| EngineError::InvalidColor(hex.to_string()))
        };
        Ok(Self([channel(0)?, channel(2)?, channel(4)?]))
    }

    pub fn rgb(self) -> [u8; 3] {
        self.0
    }
}

impl fmt::Display for PetalColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02X}{g:02X}{b:02X}")
    }
}

impl TryFrom<String> for PetalColor {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self> {
        Self::from_hex(&value)
    }
}

impl From<PetalColor> for String {
    fn from(color: PetalColor) -> Self {
        color.to_string()
    }
}

/// Half-open `[min, max)` sampling range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub min: f32,
    pub max: f32,
}

impl Span {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        rng.gen_range(self.min..self.max)
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value < self.max
    }

    fn check(&self, what: &str) -> Result<()> {
        if self.min.is_finite() && self.max.is_finite() && self.min < self.max {
            Ok(())
        } else {
            Err(EngineError::InvalidConfig(format!(
                "{what} range [{}, {}) is empty",
                self.min, self.max
            )))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailConfig {
    pub name: String,
    pub max_particles: usize,
    /// Pointer travel (px) a move must exceed before a spawn is attempted.
    pub spawn_distance: f32,
    pub spawn_interval_ms: f64,
    pub lifetime_ms: f64,
    pub sweep_interval_ms: f64,
    pub palette: Vec<PetalColor>,
    pub size: Span,
    pub rotation_degrees: Span,
    pub reveal_delay_ms: Span,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            name: "Rose petals".into(),
            max_particles: 30,
            spawn_distance: 8.0,
            spawn_interval_ms: 50.0,
            lifetime_ms: 2500.0,
            sweep_interval_ms: 500.0,
            palette: vec![
                PetalColor([0xFF, 0xDE, 0xE2]), // soft pink
                PetalColor([0xFD, 0xE1, 0xD3]), // soft peach
                PetalColor([0xFE, 0xC6, 0xA1]), // soft orange
                PetalColor([0xD9, 0x46, 0xEF]), // magenta
                PetalColor([0xF9, 0x73, 0x16]), // bright orange
                PetalColor([0xEA, 0x38, 0x4C]), // red
            ],
            size: Span::new(12.0, 18.0),
            rotation_degrees: Span::new(0.0, 360.0),
            reveal_delay_ms: Span::new(0.0, 50.0),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub duration_ms: f64,
    pub fall_distance: f32,
    pub drift_distance: f32,
    pub spin_degrees: f32,
    /// Fraction of the duration after which opacity starts falling.
    pub fade_start: f32,
    pub speed_y: Span,
    pub drift_x: Span,
    pub rotation_speed: Span,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            duration_ms: 2000.0,
            fall_distance: 60.0,
            drift_distance: 15.0,
            spin_degrees: 270.0,
            fade_start: 0.7,
            speed_y: Span::new(0.8, 1.1),
            drift_x: Span::new(-0.75, 0.75),
            rotation_speed: Span::new(-1.125, 1.125),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub trail: TrailConfig,
    pub animation: AnimationConfig,
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Longest a single petal can stay on screen: full reveal delay plus the
    /// animation itself.
    pub fn max_animation_ms(&self) -> f64 {
        self.animation.duration_ms + f64::from(self.trail.reveal_delay_ms.max)
    }

    pub fn validate(&self) -> Result<()> {
        let trail = &self.trail;
        let animation = &self.animation;

        if trail.max_particles == 0 {
            return Err(invalid("max_particles must be at least 1"));
        }
        if trail.palette.is_empty() {
            return Err(invalid("palette must not be empty"));
        }
        if !(trail.spawn_distance >= 0.0) {
            return Err(invalid("spawn_distance must be non-negative"));
        }
        for (what, value) in [
            ("spawn_interval_ms", trail.spawn_interval_ms),
            ("sweep_interval_ms", trail.sweep_interval_ms),
            ("duration_ms", animation.duration_ms),
        ] {
            if !(value > 0.0) {
                return Err(invalid(&format!("{what} must be positive")));
            }
        }
        if !(0.0..1.0).contains(&animation.fade_start) {
            return Err(invalid("fade_start must lie in [0, 1)"));
        }
        trail.size.check("size")?;
        trail.rotation_degrees.check("rotation_degrees")?;
        trail.reveal_delay_ms.check("reveal_delay_ms")?;
        animation.speed_y.check("speed_y")?;
        animation.drift_x.check("drift_x")?;
        animation.rotation_speed.check("rotation_speed")?;
        if trail.reveal_delay_ms.min < 0.0 {
            return Err(invalid("reveal_delay_ms must not be negative"));
        }
        if trail.lifetime_ms <= self.max_animation_ms() {
            return Err(invalid(&format!(
                "lifetime_ms ({}) must exceed the longest animation ({} ms)",
                trail.lifetime_ms,
                self.max_animation_ms()
            )));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> EngineError {
    EngineError::InvalidConfig(message.to_string())
}
