//! The trail manager: pointer tracking, spawn throttling, the population cap
//! and the periodic age sweep.

use std::collections::VecDeque;

use glam::Vec2;
use petals_platform::{PetalSurface, PointerSource, PointerSubscription};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use tracing::{debug, info, trace, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::particle::{Particle, ParticleId};
use crate::renderer::PetalRenderer;
use crate::schedule::Interval;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Idle,
    Active,
    TornDown,
}

/// What a single pointer move did to the trail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveOutcome {
    /// Manager not active; nothing recorded.
    Ignored,
    /// First move after activation; position recorded, tracking started.
    Bootstrapped,
    /// Position updated, movement too small to spawn.
    Moved,
    /// Far enough, but too soon after the previous spawn.
    Throttled,
    Spawned(ParticleId),
}

pub struct TrailManager<R = Pcg32> {
    config: EngineConfig,
    lifecycle: Lifecycle,
    subscription: Option<PointerSubscription>,
    pointer: Vec2,
    initialized: bool,
    /// Insertion order, which is also ascending id order.
    petals: VecDeque<PetalRenderer>,
    last_spawn: Option<f64>,
    sweep: Option<Interval>,
    rng: R,
}

impl TrailManager<Pcg32> {
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_rng(config, Pcg32::from_entropy())
    }
}

impl<R: Rng> TrailManager<R> {
    pub fn with_rng(config: EngineConfig, rng: R) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            petals: VecDeque::with_capacity(config.trail.max_particles + 1),
            config,
            lifecycle: Lifecycle::Idle,
            subscription: None,
            pointer: Vec2::ZERO,
            initialized: false,
            last_spawn: None,
            sweep: None,
            rng,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Last recorded pointer position; `None` until the first move is seen.
    pub fn pointer(&self) -> Option<Vec2> {
        self.initialized.then_some(self.pointer)
    }

    pub fn len(&self) -> usize {
        self.petals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.petals.is_empty()
    }

    pub fn particles(&self) -> impl Iterator<Item = &Particle> + '_ {
        self.petals.iter().map(PetalRenderer::particle)
    }

    pub fn renderers(&self) -> impl Iterator<Item = &PetalRenderer> + '_ {
        self.petals.iter()
    }

    pub fn wants_frame(&self) -> bool {
        self.lifecycle == Lifecycle::Active && self.petals.iter().any(PetalRenderer::wants_frame)
    }

    /// Earliest pending timer (sweep or reveal), so hosts can sleep until then.
    pub fn next_deadline(&self) -> Option<f64> {
        if self.lifecycle != Lifecycle::Active {
            return None;
        }
        self.petals
            .iter()
            .filter_map(PetalRenderer::reveal_due)
            .chain(self.sweep.and_then(|sweep| sweep.next_due()))
            .reduce(f64::min)
    }

    /// Registers with the pointer source. Tracking starts with the next move.
    pub fn activate(&mut self, source: &mut dyn PointerSource) -> Result<()> {
        match self.lifecycle {
            Lifecycle::Active => return Err(EngineError::AlreadyActive),
            Lifecycle::TornDown => return Err(EngineError::TornDown),
            Lifecycle::Idle => {}
        }
        let subscription = source.subscribe()?;
        info!(trail = %self.config.trail.name, subscription = ?subscription.id(), "trail activated");
        self.subscription = Some(subscription);
        self.lifecycle = Lifecycle::Active;
        Ok(())
    }

    /// Unsubscribes, cancels the sweep and drops every petal. Every later call
    /// into the manager is a no-op.
    pub fn deactivate(&mut self, source: &mut dyn PointerSource) -> Result<()> {
        if self.lifecycle == Lifecycle::TornDown {
            return Ok(());
        }
        self.lifecycle = Lifecycle::TornDown;
        if let Some(mut sweep) = self.sweep.take() {
            sweep.cancel();
        }
        for petal in self.petals.iter_mut() {
            petal.teardown();
        }
        let dropped = self.petals.len();
        self.petals.clear();
        info!(dropped, "trail deactivated");

        if let Some(subscription) = self.subscription.take() {
            source.unsubscribe(subscription.id())?;
        }
        Ok(())
    }

    /// One host iteration: queued input, due timers, then the display frame.
    pub fn advance(&mut self, now: f64) {
        self.pump();
        self.tick(now);
        self.on_frame(now);
    }

    /// Drains queued pointer events in arrival order.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while self.lifecycle == Lifecycle::Active {
            let Some(event) = self.subscription.as_ref().and_then(|s| s.try_next()) else {
                break;
            };
            self.handle_pointer_move(event.position, event.timestamp);
            handled += 1;
        }
        handled
    }

    pub fn handle_pointer_move(&mut self, position: Vec2, now: f64) -> MoveOutcome {
        if self.lifecycle != Lifecycle::Active {
            return MoveOutcome::Ignored;
        }
        if !self.initialized {
            self.pointer = position;
            self.initialized = true;
            self.sweep = Some(Interval::new(now, self.config.trail.sweep_interval_ms));
            info!(x = position.x, y = position.y, "pointer tracking started");
            return MoveOutcome::Bootstrapped;
        }

        // Spawn at the position recorded before this move, then record the new one.
        let previous = self.pointer;
        let outcome = if previous.distance(position) > self.config.trail.spawn_distance {
            self.try_spawn(previous, now)
        } else {
            MoveOutcome::Moved
        };
        self.pointer = position;
        outcome
    }

    fn try_spawn(&mut self, position: Vec2, now: f64) -> MoveOutcome {
        // Written so a clock running backwards (or NaN) reads as "too soon".
        if let Some(last) = self.last_spawn {
            if !(now - last >= self.config.trail.spawn_interval_ms) {
                trace!(since_last = now - last, "spawn throttled");
                return MoveOutcome::Throttled;
            }
        }
        self.last_spawn = Some(now);

        let particle = Particle::random(now, position, &self.config.trail, &mut self.rng);
        let renderer = PetalRenderer::spawn(particle, &self.config.animation, &mut self.rng);
        self.petals.push_back(renderer);
        debug!(
            id = now,
            x = position.x,
            y = position.y,
            color = %particle.color,
            live = self.petals.len(),
            "petal spawned"
        );

        while self.petals.len() > self.config.trail.max_particles {
            if let Some(mut evicted) = self.petals.pop_front() {
                evicted.teardown();
                debug!(id = evicted.particle().id.spawned_at(), "petal evicted at capacity");
            }
        }
        MoveOutcome::Spawned(particle.id)
    }

    /// Runs due timers: the age sweep and per-petal reveals. Returns how many
    /// petals the sweep removed.
    pub fn tick(&mut self, now: f64) -> usize {
        if self.lifecycle != Lifecycle::Active {
            return 0;
        }
        let sweep_due = self.sweep.as_mut().is_some_and(|sweep| sweep.poll(now));
        let swept = if sweep_due { self.sweep_expired(now) } else { 0 };
        for petal in self.petals.iter_mut() {
            petal.poll_reveal(now);
        }
        swept
    }

    /// Removes every petal whose age has reached the lifetime bound.
    pub fn sweep_expired(&mut self, now: f64) -> usize {
        let lifetime = self.config.trail.lifetime_ms;
        let mut removed = 0;
        // Ids ascend front to back, so expired petals form a prefix.
        while let Some(front) = self.petals.front() {
            if front.particle().id.age(now) < lifetime {
                break;
            }
            if let Some(mut expired) = self.petals.pop_front() {
                expired.teardown();
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, live = self.petals.len(), "swept expired petals");
        }
        removed
    }

    /// Delivers one display frame to every petal that asked for it.
    pub fn on_frame(&mut self, timestamp: f64) -> usize {
        if self.lifecycle != Lifecycle::Active {
            return 0;
        }
        self.petals
            .iter_mut()
            .filter(|petal| petal.wants_frame())
            .map(|petal| petal.on_frame(timestamp))
            .filter(|stepped| *stepped)
            .count()
    }

    /// Draws visible petals oldest first, so newer petals land on top.
    pub fn render(&self, surface: &mut dyn PetalSurface) -> petals_platform::Result<()> {
        if self.lifecycle != Lifecycle::Active {
            return Ok(());
        }
        for petal in self.petals.iter().filter(|petal| petal.is_visible()) {
            if let Err(err) = surface.draw_petal(&petal.sprite()) {
                warn!(id = petal.particle().id.spawned_at(), "failed to draw petal: {err}");
                return Err(err);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::RendererPhase;
    use petals_platform::{ChannelPointerSource, PetalSprite, PointerEvent};

    fn manager() -> (TrailManager<Pcg32>, ChannelPointerSource) {
        let mut source = ChannelPointerSource::new();
        let mut trail =
            TrailManager::with_rng(EngineConfig::default(), Pcg32::seed_from_u64(42)).unwrap();
        trail.activate(&mut source).unwrap();
        (trail, source)
    }

    #[derive(Default)]
    struct Recorder(Vec<PetalSprite>);

    impl PetalSurface for Recorder {
        fn draw_petal(&mut self, sprite: &PetalSprite) -> petals_platform::Result<()> {
            self.0.push(*sprite);
            Ok(())
        }
    }

    #[test]
    fn first_move_only_bootstraps() {
        let (mut trail, _source) = manager();
        assert_eq!(trail.pointer(), None);
        assert_eq!(
            trail.handle_pointer_move(Vec2::new(400.0, 300.0), 0.0),
            MoveOutcome::Bootstrapped
        );
        assert!(trail.is_initialized());
        assert_eq!(trail.pointer(), Some(Vec2::new(400.0, 300.0)));
        assert!(trail.is_empty());
    }

    #[test]
    fn small_moves_update_position_without_spawning() {
        let (mut trail, _source) = manager();
        trail.handle_pointer_move(Vec2::ZERO, 0.0);
        assert_eq!(
            trail.handle_pointer_move(Vec2::new(8.0, 0.0), 100.0),
            MoveOutcome::Moved
        );
        assert_eq!(trail.pointer(), Some(Vec2::new(8.0, 0.0)));
        assert!(trail.is_empty());
    }

    #[test]
    fn spawns_at_the_pre_move_position() {
        let (mut trail, _source) = manager();
        trail.handle_pointer_move(Vec2::ZERO, 0.0);
        let outcome = trail.handle_pointer_move(Vec2::new(100.0, 0.0), 10.0);
        assert_eq!(outcome, MoveOutcome::Spawned(ParticleId(10.0)));
        assert_eq!(trail.len(), 1);
        assert_eq!(trail.particles().next().unwrap().position, Vec2::ZERO);
        assert_eq!(trail.pointer(), Some(Vec2::new(100.0, 0.0)));
    }

    #[test]
    fn throttle_rejects_spawns_closer_than_interval() {
        let (mut trail, _source) = manager();
        trail.handle_pointer_move(Vec2::ZERO, 0.0);
        assert!(matches!(
            trail.handle_pointer_move(Vec2::new(20.0, 0.0), 100.0),
            MoveOutcome::Spawned(_)
        ));
        assert_eq!(
            trail.handle_pointer_move(Vec2::new(40.0, 0.0), 149.0),
            MoveOutcome::Throttled
        );
        assert_eq!(trail.pointer(), Some(Vec2::new(40.0, 0.0)));
        assert!(matches!(
            trail.handle_pointer_move(Vec2::new(60.0, 0.0), 150.0),
            MoveOutcome::Spawned(_)
        ));
        assert_eq!(trail.len(), 2);
    }

    #[test]
    fn backwards_clock_is_throttled() {
        let (mut trail, _source) = manager();
        trail.handle_pointer_move(Vec2::ZERO, 1_000.0);
        trail.handle_pointer_move(Vec2::new(20.0, 0.0), 1_000.0);
        assert_eq!(
            trail.handle_pointer_move(Vec2::new(40.0, 0.0), 500.0),
            MoveOutcome::Throttled
        );
    }

    #[test]
    fn pump_drains_subscription_in_order() {
        let (mut trail, mut source) = manager();
        source.publish(PointerEvent::new(0.0, 0.0, 0.0));
        source.publish(PointerEvent::new(50.0, 0.0, 60.0));
        source.publish(PointerEvent::new(50.0, 50.0, 120.0));
        assert_eq!(trail.pump(), 3);
        let positions: Vec<Vec2> = trail.particles().map(|p| p.position).collect();
        assert_eq!(positions, vec![Vec2::ZERO, Vec2::new(50.0, 0.0)]);
        assert_eq!(trail.pointer(), Some(Vec2::new(50.0, 50.0)));
    }

    #[test]
    fn events_before_activation_are_ignored() {
        let mut trail =
            TrailManager::with_rng(EngineConfig::default(), Pcg32::seed_from_u64(1)).unwrap();
        assert_eq!(
            trail.handle_pointer_move(Vec2::ZERO, 0.0),
            MoveOutcome::Ignored
        );
        assert!(!trail.is_initialized());
    }

    #[test]
    fn activation_is_single_shot() {
        let (mut trail, mut source) = manager();
        assert!(matches!(
            trail.activate(&mut source),
            Err(EngineError::AlreadyActive)
        ));
        trail.deactivate(&mut source).unwrap();
        assert!(matches!(
            trail.activate(&mut source),
            Err(EngineError::TornDown)
        ));
    }

    #[test]
    fn tick_reveals_and_frames_animate() {
        let (mut trail, _source) = manager();
        trail.handle_pointer_move(Vec2::ZERO, 0.0);
        trail.handle_pointer_move(Vec2::new(30.0, 0.0), 100.0);
        assert!(!trail.wants_frame());

        trail.tick(150.0);
        assert!(trail.wants_frame());
        assert_eq!(trail.on_frame(150.0), 1);
        assert_eq!(trail.on_frame(1_000.0), 1);

        let mut surface = Recorder::default();
        trail.render(&mut surface).unwrap();
        assert_eq!(surface.0.len(), 1);
        assert!(surface.0[0].center.y > 0.0);
    }

    #[test]
    fn hidden_petals_are_not_drawn() {
        let (mut trail, _source) = manager();
        trail.handle_pointer_move(Vec2::ZERO, 0.0);
        trail.handle_pointer_move(Vec2::new(30.0, 0.0), 100.0);
        let mut surface = Recorder::default();
        trail.render(&mut surface).unwrap();
        assert!(surface.0.is_empty());
    }

    #[test]
    fn next_deadline_tracks_reveal_and_sweep() {
        let (mut trail, _source) = manager();
        assert_eq!(trail.next_deadline(), None);
        trail.handle_pointer_move(Vec2::ZERO, 0.0);
        assert_eq!(trail.next_deadline(), Some(500.0));
        trail.handle_pointer_move(Vec2::new(30.0, 0.0), 100.0);
        let deadline = trail.next_deadline().unwrap();
        assert!((100.0..150.0).contains(&deadline));
    }

    #[test]
    fn teardown_silences_everything() {
        let (mut trail, mut source) = manager();
        trail.handle_pointer_move(Vec2::ZERO, 0.0);
        trail.handle_pointer_move(Vec2::new(30.0, 0.0), 100.0);
        trail.tick(200.0);
        let petal_phase_before = trail.renderers().next().unwrap().phase();
        assert_eq!(petal_phase_before, RendererPhase::Animating);

        trail.deactivate(&mut source).unwrap();
        assert_eq!(trail.lifecycle(), Lifecycle::TornDown);
        assert!(trail.is_empty());
        assert_eq!(source.subscriber_count(), 0);

        source.publish(PointerEvent::new(300.0, 300.0, 400.0));
        assert_eq!(trail.pump(), 0);
        assert_eq!(
            trail.handle_pointer_move(Vec2::new(500.0, 0.0), 500.0),
            MoveOutcome::Ignored
        );
        assert_eq!(trail.tick(5_000.0), 0);
        assert_eq!(trail.on_frame(5_000.0), 0);
        assert!(trail.is_empty());
        assert_eq!(trail.next_deadline(), None);
        trail.deactivate(&mut source).unwrap();
    }
}
