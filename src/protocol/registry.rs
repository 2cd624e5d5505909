use crate::error::{status_of, Result, StageError};
use crate::protocol::message::{DhtMessage, Direction};
use std::sync::Arc;
use tracing::{debug, trace};

/// A pipeline stage.
///
/// Handlers return `Ok(())` to let the message continue and `Err` to halt
/// processing of that message. A stage that only cares about one direction
/// keeps the default for the other.
pub trait DhtModule: Send + Sync {
    fn name(&self) -> &str;

    fn handle_incoming(&self, message: &mut DhtMessage) -> Result<()> {
        let _ = message;
        Ok(())
    }

    fn handle_outgoing(&self, message: &mut DhtMessage) -> Result<()> {
        let _ = message;
        Ok(())
    }
}

/// Ordered set of pipeline stages.
///
/// Incoming messages visit modules in registration order, outgoing messages
/// in reverse, so the first module registered sees raw bytes first and
/// produces them last.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn DhtModule>>,
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.names())
            .finish()
    }
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module: Arc<dyn DhtModule>) -> Result<()> {
        if self.get(module.name()).is_some() {
            return Err(StageError::DuplicateModule(module.name().to_string()));
        }
        debug!(module = module.name(), position = self.modules.len(), "Module registered");
        self.modules.push(module);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn DhtModule>> {
        self.modules.iter().find(|m| m.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Run the pipeline matching the message's direction.
    pub fn dispatch(&self, message: &mut DhtMessage) -> Result<()> {
        let direction = message.direction;
        let result = match direction {
            Direction::Incoming => self.handle_incoming(message),
            Direction::Outgoing => self.handle_outgoing(message),
        };
        trace!(?direction, status = status_of(&result), "Message dispatched");
        result
    }

    /// Run the incoming pipeline, stopping at the first failing module.
    pub fn handle_incoming(&self, message: &mut DhtMessage) -> Result<()> {
        for module in &self.modules {
            module.handle_incoming(message).inspect_err(|e| {
                debug!(module = module.name(), status = e.status_code(), "Incoming pipeline halted");
            })?;
        }
        Ok(())
    }

    /// Run the outgoing pipeline, stopping at the first failing module.
    pub fn handle_outgoing(&self, message: &mut DhtMessage) -> Result<()> {
        for module in self.modules.iter().rev() {
            module.handle_outgoing(message).inspect_err(|e| {
                debug!(module = module.name(), status = e.status_code(), "Outgoing pipeline halted");
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::core::value::{Dict, Value};
    use std::sync::Mutex;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        halt_incoming: bool,
    }

    impl DhtModule for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn handle_incoming(&self, _message: &mut DhtMessage) -> Result<()> {
            self.log.lock().unwrap().push(format!("in:{}", self.name));
            if self.halt_incoming {
                return Err(StageError::MissingMessage);
            }
            Ok(())
        }

        fn handle_outgoing(&self, _message: &mut DhtMessage) -> Result<()> {
            self.log.lock().unwrap().push(format!("out:{}", self.name));
            Ok(())
        }
    }

    fn recorder(name: &'static str, log: &Arc<Mutex<Vec<String>>>, halt: bool) -> Arc<Recorder> {
        Arc::new(Recorder {
            name,
            log: log.clone(),
            halt_incoming: halt,
        })
    }

    #[test]
    fn test_pipeline_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ModuleRegistry::new();
        registry.register(recorder("a", &log, false)).unwrap();
        registry.register(recorder("b", &log, false)).unwrap();
        assert_eq!(registry.names(), vec!["a", "b"]);

        let mut msg = DhtMessage::incoming(b"de");
        registry.handle_incoming(&mut msg).unwrap();
        let mut msg = DhtMessage::outgoing(Dict::new());
        registry.handle_outgoing(&mut msg).unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["in:a", "in:b", "out:b", "out:a"]);
    }

    #[test]
    fn test_dispatch_follows_direction() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ModuleRegistry::new();
        registry.register(recorder("a", &log, false)).unwrap();
        registry.register(recorder("b", &log, false)).unwrap();

        let mut msg = DhtMessage::outgoing(Dict::new());
        registry.dispatch(&mut msg).unwrap();
        let mut msg = DhtMessage::incoming(b"de");
        registry.dispatch(&mut msg).unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["out:b", "out:a", "in:a", "in:b"]);
    }

    #[test]
    fn test_pipeline_halts_on_error() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ModuleRegistry::new();
        registry.register(recorder("first", &log, true)).unwrap();
        registry.register(recorder("second", &log, false)).unwrap();

        let mut msg = DhtMessage::incoming(b"de");
        let err = registry.handle_incoming(&mut msg).unwrap_err();
        assert!(matches!(err, StageError::MissingMessage));
        assert_eq!(*log.lock().unwrap(), vec!["in:first"]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ModuleRegistry::new();
        registry.register(recorder("dup", &log, false)).unwrap();
        let err = registry.register(recorder("dup", &log, false)).unwrap_err();
        assert!(matches!(err, StageError::DuplicateModule(name) if name == "dup"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_default_handlers_continue() {
        struct Passive;
        impl DhtModule for Passive {
            fn name(&self) -> &str {
                "passive"
            }
        }

        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(Passive)).unwrap();
        let mut msg = DhtMessage::outgoing(
            [(b"k".to_vec(), Value::from(1))].into_iter().collect(),
        );
        assert!(registry.handle_outgoing(&mut msg).is_ok());
        assert!(msg.wire.is_empty());
    }
}
