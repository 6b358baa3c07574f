use crate::block::Block;
use crossbeam_channel::{Receiver, Sender};
use tessera_common::{WorldBlockCoord, WorldChunkCoord, WorldSectorCoord};

/// Where a newly resident sector came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorSource {
    Loaded,
    Generated,
}

/// Notifications about terrain lifecycle, consumed by the game loop.
#[derive(Debug, Clone, PartialEq)]
pub enum TerrainEvent {
    SectorLoaded {
        coord: WorldSectorCoord,
        source: SectorSource,
        epoch: u64,
    },
    SectorEvicted {
        coord: WorldSectorCoord,
        epoch: u64,
    },
    SaveFailed {
        coord: WorldSectorCoord,
        reason: String,
    },
    ChunkBaked {
        coord: WorldChunkCoord,
    },
    ChunkDestroyed {
        coord: WorldChunkCoord,
    },
    BlockChanged {
        coord: WorldBlockCoord,
        previous: Block,
        current: Block,
    },
}

type Listener = Box<dyn FnMut(&TerrainEvent)>;

/// Explicit event bus owned by the game loop.
///
/// Producers on any thread hold an [`EventPublisher`]; the owner drains or
/// dispatches events to its listeners on its own thread.
pub struct EventBus {
    tx: Sender<TerrainEvent>,
    rx: Receiver<TerrainEvent>,
    listeners: Vec<Listener>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            tx,
            rx,
            listeners: Vec::new(),
        }
    }

    pub fn publisher(&self) -> EventPublisher {
        EventPublisher {
            tx: self.tx.clone(),
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&TerrainEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Take every pending event without notifying listeners.
    pub fn drain(&self) -> Vec<TerrainEvent> {
        self.rx.try_iter().collect()
    }

    /// Deliver pending events to every listener in subscription order.
    /// Returns the number of events delivered.
    pub fn dispatch(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(event) = self.rx.try_recv() {
            for listener in &mut self.listeners {
                listener(&event);
            }
            delivered += 1;
        }
        delivered
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable, thread-safe handle for publishing terrain events.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    tx: Sender<TerrainEvent>,
}

impl EventPublisher {
    /// A publisher whose events go nowhere.
    pub fn detached() -> Self {
        let (tx, _rx) = crossbeam_channel::unbounded();
        Self { tx }
    }

    pub fn publish(&self, event: TerrainEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("event bus dropped; discarding event");
        }
    }
}
