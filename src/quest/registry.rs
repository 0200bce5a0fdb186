//! Quest Handler Registry
//!
//! Maps a content script id to the handlers it installed, one per event
//! kind. Guarded by a single reader/writer lock so scripts can be
//! registered and reloaded while the zone keeps dispatching.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::events::EventKind;
use super::record::QuestEvent;

/// A quest handler. Returns true when the event was fully handled and the
/// simulation should skip its default behaviour.
pub type QuestHandler = Arc<dyn Fn(&mut QuestEvent) -> bool + Send + Sync>;

/// Wrap a closure as a [`QuestHandler`]
pub fn handler<F>(f: F) -> QuestHandler
where
    F: Fn(&mut QuestEvent) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

/// One element of a flat `kind, handler, kind, handler, ...` registration list
#[derive(Clone)]
pub enum RegisterArg {
    Kind(EventKind),
    Handler(QuestHandler),
}

impl From<EventKind> for RegisterArg {
    fn from(kind: EventKind) -> Self {
        RegisterArg::Kind(kind)
    }
}

impl From<QuestHandler> for RegisterArg {
    fn from(handler: QuestHandler) -> Self {
        RegisterArg::Handler(handler)
    }
}

impl fmt::Debug for RegisterArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterArg::Kind(kind) => write!(f, "Kind({})", kind),
            RegisterArg::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

/// A malformed registration, reported while content loads
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("script id must not be empty")]
    EmptyScriptId,

    #[error("script '{script_id}': expected kind/handler pairs, got {count} arguments")]
    OddArgumentCount { script_id: String, count: usize },

    #[error("script '{script_id}': argument {index} is not an event kind")]
    ExpectedKind { script_id: String, index: usize },

    #[error("script '{script_id}': argument {index} is not a quest handler")]
    ExpectedHandler { script_id: String, index: usize },
}

type ScriptHandlers = HashMap<EventKind, QuestHandler>;

/// Registry of quest handlers for one zone instance
#[derive(Default)]
pub struct HandlerRegistry {
    scripts: RwLock<HashMap<String, ScriptHandlers>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install handlers from a flat, alternating kind/handler list.
    ///
    /// The whole list is validated before anything is installed, so a
    /// malformed list leaves the registry untouched. Each pair replaces any
    /// handler already registered for the same script and kind.
    pub fn register(&self, script_id: &str, args: Vec<RegisterArg>) -> Result<(), RegistrationError> {
        let pairs = Self::pair_up(script_id, args)?;
        self.register_handlers(script_id, pairs)
    }

    /// Install already-paired handlers
    pub fn register_handlers<I>(&self, script_id: &str, pairs: I) -> Result<(), RegistrationError>
    where
        I: IntoIterator<Item = (EventKind, QuestHandler)>,
    {
        if script_id.is_empty() {
            return Err(RegistrationError::EmptyScriptId);
        }

        let mut scripts = self.scripts.write();
        let handlers = scripts.entry(script_id.to_string()).or_default();
        for (kind, handler) in pairs {
            if handlers.insert(kind, handler).is_some() {
                debug!("Script '{}' replaced its {} handler", script_id, kind);
            }
        }

        // A registration with no pairs must not leave an empty entry behind
        if handlers.is_empty() {
            scripts.remove(script_id);
        }

        Ok(())
    }

    /// Swap a script's whole handler set in one step (used by hot-reload).
    /// An empty set removes the script.
    pub fn replace_script<I>(&self, script_id: &str, pairs: I) -> Result<(), RegistrationError>
    where
        I: IntoIterator<Item = (EventKind, QuestHandler)>,
    {
        if script_id.is_empty() {
            return Err(RegistrationError::EmptyScriptId);
        }

        let handlers: ScriptHandlers = pairs.into_iter().collect();
        let mut scripts = self.scripts.write();
        if handlers.is_empty() {
            scripts.remove(script_id);
        } else {
            scripts.insert(script_id.to_string(), handlers);
        }

        Ok(())
    }

    /// Remove handlers. With no kinds the whole script is removed.
    pub fn unregister(&self, script_id: &str, kinds: &[EventKind]) {
        let mut scripts = self.scripts.write();

        if kinds.is_empty() {
            scripts.remove(script_id);
            return;
        }

        let Some(handlers) = scripts.get_mut(script_id) else {
            return;
        };
        for kind in kinds {
            handlers.remove(kind);
        }
        if handlers.is_empty() {
            scripts.remove(script_id);
        }
    }

    /// Look up the handler for a script and kind. The read lock is released
    /// before this returns.
    pub fn resolve(&self, script_id: &str, kind: EventKind) -> Option<QuestHandler> {
        let scripts = self.scripts.read();
        scripts.get(script_id)?.get(&kind).cloned()
    }

    pub fn contains(&self, script_id: &str) -> bool {
        self.scripts.read().contains_key(script_id)
    }

    pub fn handles(&self, script_id: &str, kind: EventKind) -> bool {
        self.scripts
            .read()
            .get(script_id)
            .is_some_and(|handlers| handlers.contains_key(&kind))
    }

    /// Kinds a script has handlers for, in catalog order
    pub fn kinds_for(&self, script_id: &str) -> Vec<EventKind> {
        let scripts = self.scripts.read();
        let mut kinds: Vec<EventKind> = scripts
            .get(script_id)
            .map(|handlers| handlers.keys().copied().collect())
            .unwrap_or_default();
        kinds.sort();
        kinds
    }

    pub fn script_ids(&self) -> Vec<String> {
        self.scripts.read().keys().cloned().collect()
    }

    /// Number of scripts with at least one handler
    pub fn len(&self) -> usize {
        self.scripts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.read().is_empty()
    }

    fn pair_up(
        script_id: &str,
        args: Vec<RegisterArg>,
    ) -> Result<Vec<(EventKind, QuestHandler)>, RegistrationError> {
        if script_id.is_empty() {
            return Err(RegistrationError::EmptyScriptId);
        }
        if args.len() % 2 != 0 {
            return Err(RegistrationError::OddArgumentCount {
                script_id: script_id.to_string(),
                count: args.len(),
            });
        }

        let mut pairs = Vec::with_capacity(args.len() / 2);
        let mut args = args.into_iter().enumerate();
        while let Some((index, arg)) = args.next() {
            let kind = match arg {
                RegisterArg::Kind(kind) => kind,
                RegisterArg::Handler(_) => {
                    return Err(RegistrationError::ExpectedKind {
                        script_id: script_id.to_string(),
                        index,
                    });
                }
            };
            let handler = match args.next() {
                Some((_, RegisterArg::Handler(handler))) => handler,
                Some((index, RegisterArg::Kind(_))) => {
                    return Err(RegistrationError::ExpectedHandler {
                        script_id: script_id.to_string(),
                        index,
                    });
                }
                None => {
                    return Err(RegistrationError::OddArgumentCount {
                        script_id: script_id.to_string(),
                        count: index + 1,
                    });
                }
            };
            pairs.push((kind, handler));
        }

        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(result: bool) -> QuestHandler {
        handler(move |_| result)
    }

    #[test]
    fn test_register_pairs() {
        let registry = HandlerRegistry::new();
        registry
            .register(
                "rat1",
                vec![
                    EventKind::Death.into(),
                    constant(true).into(),
                    EventKind::Spawn.into(),
                    constant(false).into(),
                ],
            )
            .unwrap();

        assert!(registry.contains("rat1"));
        assert_eq!(registry.kinds_for("rat1"), vec![EventKind::Death, EventKind::Spawn]);
        assert!(registry.handles("rat1", EventKind::Death));
        assert!(!registry.handles("rat1", EventKind::Say));
    }

    #[test]
    fn test_odd_argument_count_is_rejected_without_side_effects() {
        let registry = HandlerRegistry::new();
        let err = registry.register("x", vec![EventKind::Death.into()]).unwrap_err();

        assert_eq!(
            err,
            RegistrationError::OddArgumentCount {
                script_id: "x".to_string(),
                count: 1
            }
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_misplaced_arguments_are_rejected() {
        let registry = HandlerRegistry::new();
        registry
            .register("goblin", vec![EventKind::Say.into(), constant(true).into()])
            .unwrap();

        // Handler where a kind belongs
        let err = registry
            .register("goblin", vec![constant(false).into(), EventKind::Death.into()])
            .unwrap_err();
        assert!(matches!(err, RegistrationError::ExpectedKind { index: 0, .. }));

        // Kind where a handler belongs; the valid first pair is not applied
        let err = registry
            .register(
                "goblin",
                vec![
                    EventKind::Death.into(),
                    constant(true).into(),
                    EventKind::Spawn.into(),
                    EventKind::Say.into(),
                ],
            )
            .unwrap_err();
        assert!(matches!(err, RegistrationError::ExpectedHandler { index: 3, .. }));
        assert_eq!(registry.kinds_for("goblin"), vec![EventKind::Say]);
    }

    #[test]
    fn test_empty_script_id_is_rejected() {
        let registry = HandlerRegistry::new();
        let err = registry
            .register("", vec![EventKind::Say.into(), constant(true).into()])
            .unwrap_err();
        assert_eq!(err, RegistrationError::EmptyScriptId);
    }

    #[test]
    fn test_empty_registration_leaves_no_residue() {
        let registry = HandlerRegistry::new();
        registry.register("quiet", Vec::new()).unwrap();
        assert!(!registry.contains("quiet"));
    }

    #[test]
    fn test_unregister() {
        let registry = HandlerRegistry::new();
        registry
            .register_handlers(
                "guard",
                [
                    (EventKind::Say, constant(true)),
                    (EventKind::Aggro, constant(true)),
                ],
            )
            .unwrap();

        registry.unregister("guard", &[EventKind::Say]);
        assert!(!registry.handles("guard", EventKind::Say));
        assert!(registry.handles("guard", EventKind::Aggro));

        // Removing the last kind removes the script
        registry.unregister("guard", &[EventKind::Aggro]);
        assert!(!registry.contains("guard"));

        // Unknown scripts are ignored
        registry.unregister("nobody", &[EventKind::Say]);
        registry.unregister("nobody", &[]);
    }

    #[test]
    fn test_unregister_whole_script() {
        let registry = HandlerRegistry::new();
        registry
            .register_handlers(
                "guard",
                [(EventKind::Say, constant(true)), (EventKind::Slay, constant(true))],
            )
            .unwrap();
        registry.unregister("guard", &[]);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_replace_script() {
        let registry = HandlerRegistry::new();
        registry
            .register_handlers(
                "merchant",
                [(EventKind::Say, constant(true)), (EventKind::Trade, constant(true))],
            )
            .unwrap();

        registry
            .replace_script("merchant", [(EventKind::MerchantBuy, constant(true))])
            .unwrap();
        assert_eq!(registry.kinds_for("merchant"), vec![EventKind::MerchantBuy]);

        registry.replace_script("merchant", Vec::new()).unwrap();
        assert!(!registry.contains("merchant"));
    }
}
