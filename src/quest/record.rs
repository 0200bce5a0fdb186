//! Quest Event Records
//!
//! The payload handed to a quest handler. Records are reused between
//! dispatches: check one out of an [`EventPool`], populate it with the
//! chained setters, invoke, and let the guard hand it back.

use std::any::Any;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::Mutex;

use super::events::EventKind;
use crate::entity::{ItemInstance, Moblike};
use crate::zone::access::ZoneAccess;

/// One occurrence delivered to a quest handler
#[derive(Default)]
pub struct QuestEvent {
    pub kind: EventKind,
    /// Whoever caused the event (the speaker, the killer, the clicker)
    pub actor: Option<Arc<dyn Moblike>>,
    /// Whoever the event happened to (the NPC spoken to, the victim)
    pub receiver: Option<Arc<dyn Moblike>>,
    pub items: Vec<ItemInstance>,
    /// Arbitrary zone data attached by the trigger site
    pub zone_data: Vec<Arc<dyn Any + Send + Sync>>,
    pub encounter_name: String,
    pub extra_data: u32,
    pub spell_id: u32,
    pub strings: Vec<String>,
    /// Bound by the dispatcher for the duration of one handler call
    zone: Option<Arc<dyn ZoneAccess>>,
}

impl QuestEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// Clear every field, keeping the list buffers' capacity
    pub fn reset(&mut self) -> &mut Self {
        self.kind = EventKind::default();
        self.actor = None;
        self.receiver = None;
        self.items.clear();
        self.zone_data.clear();
        self.encounter_name.clear();
        self.extra_data = 0;
        self.spell_id = 0;
        self.strings.clear();
        self.zone = None;
        self
    }

    pub fn kind(&mut self, kind: EventKind) -> &mut Self {
        self.kind = kind;
        self
    }

    pub fn actor(&mut self, actor: Arc<dyn Moblike>) -> &mut Self {
        self.actor = Some(actor);
        self
    }

    pub fn receiver(&mut self, receiver: Arc<dyn Moblike>) -> &mut Self {
        self.receiver = Some(receiver);
        self
    }

    pub fn spell(&mut self, spell_id: u32) -> &mut Self {
        self.spell_id = spell_id;
        self
    }

    pub fn extra(&mut self, data: u32) -> &mut Self {
        self.extra_data = data;
        self
    }

    pub fn encounter(&mut self, name: &str) -> &mut Self {
        self.encounter_name.clear();
        self.encounter_name.push_str(name);
        self
    }

    /// Replace the string list, reusing its backing storage
    pub fn strings<I, S>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.strings.clear();
        self.strings.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn items<I>(&mut self, items: I) -> &mut Self
    where
        I: IntoIterator<Item = ItemInstance>,
    {
        self.items.clear();
        self.items.extend(items);
        self
    }

    pub fn zone_data<I>(&mut self, data: I) -> &mut Self
    where
        I: IntoIterator<Item = Arc<dyn Any + Send + Sync>>,
    {
        self.zone_data.clear();
        self.zone_data.extend(data);
        self
    }

    /// Typed view of one zone data entry
    pub fn zone_data_as<T: Any>(&self, index: usize) -> Option<&T> {
        let data: &(dyn Any + Send + Sync) = self.zone_data.get(index)?.as_ref();
        data.downcast_ref::<T>()
    }

    pub fn first_string(&self) -> Option<&str> {
        self.strings.first().map(String::as_str)
    }

    /// Zone facade of the instance dispatching this event
    pub fn zone(&self) -> Option<&dyn ZoneAccess> {
        self.zone.as_deref()
    }

    pub fn zone_access(&self) -> Option<&Arc<dyn ZoneAccess>> {
        self.zone.as_ref()
    }

    pub(crate) fn bind_zone(&mut self, zone: Option<Arc<dyn ZoneAccess>>) {
        self.zone = zone;
    }
}

impl fmt::Debug for QuestEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuestEvent")
            .field("kind", &self.kind)
            .field("actor", &self.actor.as_ref().map(|a| a.name().to_string()))
            .field("receiver", &self.receiver.as_ref().map(|r| r.name().to_string()))
            .field("items", &self.items)
            .field("zone_data", &self.zone_data.len())
            .field("encounter_name", &self.encounter_name)
            .field("extra_data", &self.extra_data)
            .field("spell_id", &self.spell_id)
            .field("strings", &self.strings)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Event Pool
// ============================================================================

/// Free list of reusable event records
pub struct EventPool {
    free: Mutex<Vec<QuestEvent>>,
    max_idle: usize,
}

impl EventPool {
    pub fn new(max_idle: usize) -> Self {
        Self {
            free: Mutex::new(Vec::with_capacity(max_idle)),
            max_idle,
        }
    }

    /// Take a record out of the pool. The record is always reset, so no
    /// field from a previous event can leak into the new one.
    pub fn checkout(&self) -> PooledEvent<'_> {
        let mut event = self.free.lock().pop().unwrap_or_default();
        event.reset();
        PooledEvent { pool: self, event }
    }

    /// Number of records waiting to be reused
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    fn give_back(&self, mut event: QuestEvent) {
        // Drop actor/receiver references now rather than at the next checkout
        event.reset();
        let mut free = self.free.lock();
        if free.len() < self.max_idle {
            free.push(event);
        }
    }
}

impl Default for EventPool {
    fn default() -> Self {
        Self::new(64)
    }
}

/// A checked-out record; returns to its pool when dropped
pub struct PooledEvent<'a> {
    pool: &'a EventPool,
    event: QuestEvent,
}

impl Deref for PooledEvent<'_> {
    type Target = QuestEvent;

    fn deref(&self) -> &QuestEvent {
        &self.event
    }
}

impl DerefMut for PooledEvent<'_> {
    fn deref_mut(&mut self) -> &mut QuestEvent {
        &mut self.event
    }
}

impl Drop for PooledEvent<'_> {
    fn drop(&mut self) {
        let event = std::mem::take(&mut self.event);
        self.pool.give_back(event);
    }
}
