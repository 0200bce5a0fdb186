//! Lua Quest Scripts
//!
//! A content script is a Lua chunk defining global `event_<kind>` functions,
//! e.g. `event_say(e)` or `event_death(e)`. Each function becomes the
//! script's handler for that kind and returns true when it handled the event.
//!
//! A script runs the chunk into a few independent Lua states so that events
//! for the same script on different threads do not queue behind each other.
//! Globals a handler writes live in whichever state ran it; scripts keep
//! shared state on the zone, not in Lua globals.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use mlua::{Function, Lua, Result as LuaResult, Table, Value};
use parking_lot::{Mutex, MutexGuard};
use tracing::warn;

use crate::entity::Moblike;
use crate::quest::{EventKind, QuestEvent, QuestHandler};
use crate::zone::access::ZoneAccess;

/// Name of the Lua function handling `kind`
pub fn handler_function_name(kind: EventKind) -> String {
    format!("event_{}", kind.name())
}

/// Lua states compiled per script
pub const LUA_STATES_PER_SCRIPT: usize = 4;

/// A compiled content script backed by a pool of sandboxed Lua states
pub struct LuaScript {
    id: String,
    states: Vec<Mutex<Lua>>,
    next: AtomicUsize,
    kinds: Vec<EventKind>,
}

impl LuaScript {
    /// Run the script's chunk and collect the event functions it defines
    pub fn compile(id: &str, source: &str) -> LuaResult<Self> {
        Self::compile_with_states(id, source, LUA_STATES_PER_SCRIPT)
    }

    /// Compile into `count` Lua states (at least one)
    pub fn compile_with_states(id: &str, source: &str, count: usize) -> LuaResult<Self> {
        let mut states = Vec::with_capacity(count.max(1));
        for _ in 0..count.max(1) {
            let lua = Lua::new();
            sandbox(&lua)?;
            lua.load(source).set_name(id).exec()?;
            states.push(Mutex::new(lua));
        }

        let kinds = {
            let lua = states[0].lock();
            let globals = lua.globals();
            EventKind::ALL
                .iter()
                .copied()
                .filter(|kind| globals.get::<Function>(handler_function_name(*kind)).is_ok())
                .collect()
        };

        Ok(Self {
            id: id.to_string(),
            states,
            next: AtomicUsize::new(0),
            kinds,
        })
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Kinds this script has functions for
    pub fn kinds(&self) -> &[EventKind] {
        &self.kinds
    }

    /// One quest handler per event function
    pub fn handlers(self: &Arc<Self>) -> Vec<(EventKind, QuestHandler)> {
        self.kinds
            .iter()
            .map(|&kind| {
                let script = Arc::clone(self);
                let handler: QuestHandler = Arc::new(move |event: &mut QuestEvent| script.call(kind, event));
                (kind, handler)
            })
            .collect()
    }

    /// Call the event function. Script errors are logged and the event is
    /// left unhandled.
    pub fn call(&self, kind: EventKind, event: &QuestEvent) -> bool {
        let lua = self.acquire();
        match self.try_call(&lua, kind, event) {
            Ok(handled) => handled,
            Err(e) => {
                warn!("Quest script '{}' failed in {}: {}", self.id, handler_function_name(kind), e);
                false
            }
        }
    }

    /// Take the first free state, starting from a rotating offset. Waits on
    /// one state only when all of them are busy.
    fn acquire(&self) -> MutexGuard<'_, Lua> {
        let count = self.states.len();
        let start = self.next.fetch_add(1, Ordering::Relaxed);
        for i in 0..count {
            if let Some(lua) = self.states[(start + i) % count].try_lock() {
                return lua;
            }
        }
        self.states[start % count].lock()
    }

    fn try_call(&self, lua: &Lua, kind: EventKind, event: &QuestEvent) -> LuaResult<bool> {
        let function: Function = lua.globals().get(handler_function_name(kind))?;
        let table = event_table(lua, event)?;
        let result: Value = function.call(table)?;
        Ok(matches!(result, Value::Boolean(true)))
    }
}

/// Remove globals that reach outside the sandbox
fn sandbox(lua: &Lua) -> LuaResult<()> {
    let globals = lua.globals();
    globals.set("os", Value::Nil)?;
    globals.set("io", Value::Nil)?;
    globals.set("loadfile", Value::Nil)?;
    globals.set("dofile", Value::Nil)?;
    globals.set("require", Value::Nil)?;
    Ok(())
}

fn event_table(lua: &Lua, event: &QuestEvent) -> LuaResult<Table> {
    let table = lua.create_table()?;
    table.set("kind", event.kind.name())?;
    table.set("kind_id", event.kind.as_u16())?;
    if let Some(actor) = &event.actor {
        table.set("actor", mob_table(lua, actor.as_ref())?)?;
    }
    if let Some(receiver) = &event.receiver {
        table.set("receiver", mob_table(lua, receiver.as_ref())?)?;
    }
    table.set("spell_id", event.spell_id)?;
    table.set("extra_data", event.extra_data)?;
    table.set("encounter", event.encounter_name.as_str())?;
    table.set("strings", event.strings.clone())?;

    let items = lua.create_table()?;
    for (i, item) in event.items.iter().enumerate() {
        let entry = lua.create_table()?;
        entry.set("id", item.item_id)?;
        entry.set("name", item.name.as_str())?;
        entry.set("quantity", item.quantity)?;
        entry.set("charges", item.charges)?;
        items.set(i + 1, entry)?;
    }
    table.set("items", items)?;

    if let Some(zone) = event.zone_access() {
        table.set("zone", zone_table(lua, zone)?)?;
    }

    Ok(table)
}

fn mob_table(lua: &Lua, mob: &dyn Moblike) -> LuaResult<Table> {
    let table = lua.create_table()?;
    let position = mob.position();
    table.set("id", mob.entity_id())?;
    table.set("name", mob.name())?;
    table.set("kind", mob.mob_kind().as_str())?;
    table.set("level", mob.level())?;
    table.set("hp", mob.hp())?;
    table.set("max_hp", mob.max_hp())?;
    table.set("x", position.x)?;
    table.set("y", position.y)?;
    table.set("z", position.z)?;
    Ok(table)
}

fn zone_table(lua: &Lua, zone: &Arc<dyn ZoneAccess>) -> LuaResult<Table> {
    let table = lua.create_table()?;
    let info = zone.zone();
    table.set("zone_id", info.zone_id)?;
    table.set("instance_id", info.instance_id)?;
    table.set("short_name", info.short_name.as_str())?;
    table.set("long_name", info.long_name.as_str())?;
    table.set("npc_count", zone.npcs().len())?;

    let access = Arc::clone(zone);
    let broadcast = lua.create_function(
        move |_, (sender, message, channel): (String, String, Option<u8>)| {
            let channel = channel.unwrap_or(crate::zone::access::channel::SAY);
            access.broadcast_channel_message(&sender, &message, channel);
            Ok(())
        },
    )?;
    table.set("broadcast", broadcast)?;

    let access = Arc::clone(zone);
    let npc = lua.create_function(move |lua, npc_id: u32| match access.npc_by_id(npc_id) {
        Some(npc) => Ok(Value::Table(mob_table(lua, npc.as_ref())?)),
        None => Ok(Value::Nil),
    })?;
    table.set("npc", npc)?;

    Ok(table)
}
