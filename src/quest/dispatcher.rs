//! Quest Dispatcher
//!
//! The per-zone entry point content and simulation code talk to: bind the
//! zone facade, register handlers, invoke them.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{error, trace};

use super::events::EventKind;
use super::record::QuestEvent;
use super::registry::{HandlerRegistry, QuestHandler, RegisterArg, RegistrationError};
use crate::zone::access::ZoneAccess;

/// Quest handlers and zone facade for a single zone instance
pub struct ZoneQuestInterface {
    zone_access: RwLock<Option<Arc<dyn ZoneAccess>>>,
    handlers: HandlerRegistry,
}

impl ZoneQuestInterface {
    pub fn new(zone_access: Arc<dyn ZoneAccess>) -> Self {
        Self {
            zone_access: RwLock::new(Some(zone_access)),
            handlers: HandlerRegistry::new(),
        }
    }

    /// An interface with no zone bound yet
    pub fn detached() -> Self {
        Self {
            zone_access: RwLock::new(None),
            handlers: HandlerRegistry::new(),
        }
    }

    /// Bind the zone facade. Only rebind while nothing is dispatching.
    pub fn set_zone_access(&self, zone_access: Arc<dyn ZoneAccess>) {
        *self.zone_access.write() = Some(zone_access);
    }

    pub fn zone_access(&self) -> Option<Arc<dyn ZoneAccess>> {
        self.zone_access.read().clone()
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    pub fn register(&self, script_id: &str, args: Vec<RegisterArg>) -> Result<(), RegistrationError> {
        self.handlers.register(script_id, args)
    }

    pub fn register_handlers<I>(&self, script_id: &str, pairs: I) -> Result<(), RegistrationError>
    where
        I: IntoIterator<Item = (EventKind, QuestHandler)>,
    {
        self.handlers.register_handlers(script_id, pairs)
    }

    pub fn replace_script<I>(&self, script_id: &str, pairs: I) -> Result<(), RegistrationError>
    where
        I: IntoIterator<Item = (EventKind, QuestHandler)>,
    {
        self.handlers.replace_script(script_id, pairs)
    }

    pub fn unregister(&self, script_id: &str, kinds: &[EventKind]) {
        self.handlers.unregister(script_id, kinds);
    }

    /// Deliver an event to a script's handler for the event's kind.
    ///
    /// Returns false when the script has no handler for the kind. Otherwise
    /// the handler runs on the calling thread, outside the registry lock, and
    /// its result is returned as-is. A panicking handler is logged and
    /// counts as unhandled.
    pub fn invoke(&self, script_id: &str, event: &mut QuestEvent) -> bool {
        let Some(handler) = self.handlers.resolve(script_id, event.kind) else {
            trace!("No {} handler for script '{}'", event.kind, script_id);
            return false;
        };

        event.bind_zone(self.zone_access());
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (*handler)(&mut *event)));
        event.bind_zone(None);

        match outcome {
            Ok(handled) => handled,
            Err(payload) => {
                error!(
                    script = script_id,
                    kind = %event.kind,
                    "Quest handler panicked: {}",
                    panic_message(payload.as_ref())
                );
                false
            }
        }
    }

    /// Deliver the same event to several scripts in order. Returns true if
    /// any of them handled it.
    pub fn invoke_all<'a, I>(&self, script_ids: I, event: &mut QuestEvent) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut handled = false;
        for script_id in script_ids {
            handled |= self.invoke(script_id, event);
        }
        handled
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quest::registry::handler;
    use crate::zone::access::{ChatMessage, ZoneInfo};
    use crate::zone::state::ZoneState;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::time::{Duration, Instant};

    fn test_zone() -> Arc<ZoneState> {
        Arc::new(ZoneState::new(
            ZoneInfo::new(12, 0, "qeytoqrg", "Qeynos Hills"),
            Vec::new(),
        ))
    }

    #[test]
    fn test_scenario_death_handler() {
        let quests = ZoneQuestInterface::detached();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        quests
            .register(
                "rat1",
                vec![
                    EventKind::Death.into(),
                    handler(move |_| {
                        flag.store(true, Ordering::SeqCst);
                        true
                    })
                    .into(),
                ],
            )
            .unwrap();

        assert!(quests.invoke("rat1", &mut QuestEvent::new(EventKind::Death)));
        assert!(fired.load(Ordering::SeqCst));
        assert!(!quests.invoke("rat1", &mut QuestEvent::new(EventKind::Spawn)));
    }

    #[test]
    fn test_handler_called_once_and_result_passed_through() {
        let quests = ZoneQuestInterface::detached();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        quests
            .register_handlers(
                "guard",
                [(
                    EventKind::Aggro,
                    handler(move |_| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        false
                    }),
                )],
            )
            .unwrap();

        assert!(!quests.invoke("guard", &mut QuestEvent::new(EventKind::Aggro)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unknown_script_is_not_handled() {
        let quests = ZoneQuestInterface::detached();
        assert!(!quests.invoke("nobody", &mut QuestEvent::new(EventKind::Say)));
    }

    #[test]
    fn test_scenario_later_registration_wins() {
        let quests = ZoneQuestInterface::detached();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let (a, b) = (Arc::clone(&first), Arc::clone(&second));
        quests
            .register(
                "goblin",
                vec![
                    EventKind::Say.into(),
                    handler(move |_| {
                        a.fetch_add(1, Ordering::SeqCst);
                        true
                    })
                    .into(),
                    EventKind::Say.into(),
                    handler(move |_| {
                        b.fetch_add(1, Ordering::SeqCst);
                        true
                    })
                    .into(),
                ],
            )
            .unwrap();

        assert!(quests.invoke("goblin", &mut QuestEvent::new(EventKind::Say)));
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unregister_stops_dispatch() {
        let quests = ZoneQuestInterface::detached();
        quests
            .register_handlers(
                "orc",
                [
                    (EventKind::Say, handler(|_| true)),
                    (EventKind::Death, handler(|_| true)),
                ],
            )
            .unwrap();

        quests.unregister("orc", &[EventKind::Say]);
        assert!(!quests.invoke("orc", &mut QuestEvent::new(EventKind::Say)));
        assert!(quests.invoke("orc", &mut QuestEvent::new(EventKind::Death)));

        quests.unregister("orc", &[]);
        for kind in EventKind::ALL {
            assert!(!quests.invoke("orc", &mut QuestEvent::new(*kind)));
        }
    }

    #[test]
    fn test_panicking_handler_is_contained() {
        let quests = ZoneQuestInterface::detached();
        quests
            .register_handlers("broken", [(EventKind::Say, handler(|_| panic!("bad script")))])
            .unwrap();
        quests
            .register_handlers("healthy", [(EventKind::Say, handler(|_| true))])
            .unwrap();

        assert!(!quests.invoke("broken", &mut QuestEvent::new(EventKind::Say)));
        assert!(quests.invoke("healthy", &mut QuestEvent::new(EventKind::Say)));
        // The broken script stays registered; each call is contained
        assert!(!quests.invoke("broken", &mut QuestEvent::new(EventKind::Say)));
    }

    #[test]
    fn test_handler_sees_zone_during_call_only() {
        let zone = test_zone();
        let mut chat = zone.subscribe_chat();
        let quests = ZoneQuestInterface::new(zone.clone());
        quests
            .register_handlers(
                "crier",
                [(
                    EventKind::Say,
                    handler(|event| {
                        let Some(zone) = event.zone() else {
                            return false;
                        };
                        zone.broadcast_channel_message("Town Crier", "Hear ye!", 8);
                        zone.zone_id() == 12
                    }),
                )],
            )
            .unwrap();

        let mut event = QuestEvent::new(EventKind::Say);
        assert!(quests.invoke("crier", &mut event));
        assert!(event.zone().is_none());

        let message: ChatMessage = chat.try_recv().unwrap();
        assert_eq!(message.sender, "Town Crier");
        assert_eq!(message.message, "Hear ye!");
        assert_eq!(message.channel, 8);
    }

    #[test]
    fn test_rebinding_zone_access() {
        let quests = ZoneQuestInterface::detached();
        quests
            .register_handlers(
                "greeter",
                [(EventKind::EnterZone, handler(|event| event.zone().is_some()))],
            )
            .unwrap();

        assert!(!quests.invoke("greeter", &mut QuestEvent::new(EventKind::EnterZone)));
        quests.set_zone_access(test_zone());
        assert!(quests.invoke("greeter", &mut QuestEvent::new(EventKind::EnterZone)));
    }

    #[test]
    fn test_invoke_all_fans_out() {
        let quests = ZoneQuestInterface::detached();
        let calls = Arc::new(AtomicUsize::new(0));
        for script in ["a", "b", "c"] {
            let counter = Arc::clone(&calls);
            quests
                .register_handlers(
                    script,
                    [(
                        EventKind::Signal,
                        handler(move |_| {
                            counter.fetch_add(1, Ordering::SeqCst);
                            script == "b"
                        }),
                    )],
                )
                .unwrap();
        }

        let mut event = QuestEvent::new(EventKind::Signal);
        assert!(quests.invoke_all(["a", "b", "c", "missing"], &mut event));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_concurrent_invokes_are_not_serialized() {
        const SCRIPTS: usize = 8;
        const SLEEP: Duration = Duration::from_millis(200);

        let quests = Arc::new(ZoneQuestInterface::detached());
        for i in 0..SCRIPTS {
            quests
                .register_handlers(
                    &format!("slow{}", i),
                    [(
                        EventKind::Tick,
                        handler(|_| {
                            std::thread::sleep(SLEEP);
                            true
                        }),
                    )],
                )
                .unwrap();
        }

        let barrier = Arc::new(Barrier::new(SCRIPTS));
        let start = Instant::now();
        let threads: Vec<_> = (0..SCRIPTS)
            .map(|i| {
                let quests = Arc::clone(&quests);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    quests.invoke(&format!("slow{}", i), &mut QuestEvent::new(EventKind::Tick))
                })
            })
            .collect();

        for thread in threads {
            assert!(thread.join().unwrap());
        }

        // Serialized dispatch would take SCRIPTS * SLEEP
        assert!(start.elapsed() < SLEEP * 4, "took {:?}", start.elapsed());
    }

    #[test]
    fn test_registration_not_blocked_by_running_handler() {
        let quests = Arc::new(ZoneQuestInterface::detached());
        let entered = Arc::new(Barrier::new(2));
        let gate = Arc::clone(&entered);
        quests
            .register_handlers(
                "slow",
                [(
                    EventKind::Timer,
                    handler(move |_| {
                        gate.wait();
                        std::thread::sleep(Duration::from_millis(300));
                        true
                    }),
                )],
            )
            .unwrap();

        let runner = {
            let quests = Arc::clone(&quests);
            std::thread::spawn(move || quests.invoke("slow", &mut QuestEvent::new(EventKind::Timer)))
        };

        entered.wait();
        let start = Instant::now();
        quests
            .register_handlers("other", [(EventKind::Say, handler(|_| true))])
            .unwrap();
        quests.unregister("slow", &[]);
        assert!(start.elapsed() < Duration::from_millis(150));

        assert!(runner.join().unwrap());
        assert!(!quests.handlers().contains("slow"));
    }
}
