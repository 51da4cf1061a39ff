//! Host abstraction so `petals-core` never talks to a window system directly.

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// A pointer move reported by the host, in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub position: Vec2,
    /// Milliseconds on the same clock the engine ticks with.
    pub timestamp: f64,
}

impl PointerEvent {
    pub fn new(x: f32, y: f32, timestamp: f64) -> Self {
        Self {
            position: Vec2::new(x, y),
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Receiving end of a pointer subscription. Dropping it is equivalent to
/// unsubscribing; the source prunes dead subscribers on the next publish.
#[derive(Debug)]
pub struct PointerSubscription {
    id: SubscriptionId,
    receiver: Receiver<PointerEvent>,
}

impl PointerSubscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Next queued event, if any. A disconnected source reads as empty.
    pub fn try_next(&self) -> Option<PointerEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

/// Source of pointer-move events, registered against for the lifetime of a
/// trail.
pub trait PointerSource {
    fn subscribe(&mut self) -> Result<PointerSubscription>;
    fn unsubscribe(&mut self, id: SubscriptionId) -> Result<()>;
}

/// Fan-out pointer source backed by channels. The host calls [`publish`]
/// from its input handling; subscribers drain at their own pace.
///
/// [`publish`]: ChannelPointerSource::publish
#[derive(Debug, Default)]
pub struct ChannelPointerSource {
    subscribers: Vec<(SubscriptionId, Sender<PointerEvent>)>,
    next_id: u64,
}

impl ChannelPointerSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn publish(&mut self, event: PointerEvent) {
        trace!(x = event.position.x, y = event.position.y, "pointer move");
        self.subscribers.retain(|(id, sender)| {
            let alive = sender.send(event).is_ok();
            if !alive {
                debug!(?id, "dropping disconnected pointer subscriber");
            }
            alive
        });
    }
}

impl PointerSource for ChannelPointerSource {
    fn subscribe(&mut self) -> Result<PointerSubscription> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, sender));
        debug!(?id, "pointer subscriber added");
        Ok(PointerSubscription { id, receiver })
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> Result<()> {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        if self.subscribers.len() == before {
            return Err(format!("unknown pointer subscription {id:?}").into());
        }
        debug!(?id, "pointer subscriber removed");
        Ok(())
    }
}

/// Everything a surface needs to draw one petal for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PetalSprite {
    /// Stable per particle; usable as a draw-order or cache key.
    pub key: u64,
    pub center: Vec2,
    /// Width in pixels. Height is derived by the surface.
    pub size: f32,
    pub rotation_degrees: f32,
    pub color: [u8; 3],
    pub opacity: f32,
}

/// Draw target for petals. Implementations must not capture pointer input.
pub trait PetalSurface {
    fn draw_petal(&mut self, sprite: &PetalSprite) -> Result<()>;
}
