//! Action handler trait and registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::action::Action;
use crate::context::RpcContext;
use crate::errors::{RegistryError, RpcError};
use crate::params::Payload;
use crate::types::SuccessBody;

/// Implemented once per action.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Validate `payload`, make exactly one provider call and shape the result.
    async fn handle(&self, payload: &Payload, ctx: &RpcContext) -> Result<SuccessBody, RpcError>;
}

/// Maps each [`Action`] to its handler.
pub struct ActionRegistry {
    handlers: HashMap<Action, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register (or replace) the handler for `action`.
    pub fn register(&mut self, action: Action, handler: impl ActionHandler + 'static) {
        let _ = self.handlers.insert(action, Arc::new(handler));
    }

    /// Handler for `action`.
    pub fn get(&self, action: Action) -> Option<&Arc<dyn ActionHandler>> {
        self.handlers.get(&action)
    }

    /// Actions with a handler, in table order.
    pub fn actions(&self) -> Vec<Action> {
        Action::ALL
            .into_iter()
            .filter(|a| self.handlers.contains_key(a))
            .collect()
    }

    /// Fail unless every action in the table has a handler.
    pub fn validate(&self) -> Result<(), RegistryError> {
        let missing: Vec<&'static str> = Action::ALL
            .into_iter()
            .filter(|a| !self.handlers.contains_key(a))
            .map(Action::as_str)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(RegistryError::MissingHandlers { missing })
        }
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers;

    struct Noop;

    #[async_trait]
    impl ActionHandler for Noop {
        async fn handle(&self, _payload: &Payload, _ctx: &RpcContext) -> Result<SuccessBody, RpcError> {
            Ok(SuccessBody::status("noop"))
        }
    }

    #[test]
    fn empty_registry_fails_validation() {
        let err = ActionRegistry::new().validate().unwrap_err();
        let RegistryError::MissingHandlers { missing } = err;
        assert_eq!(missing.len(), Action::ALL.len());
    }

    #[test]
    fn partial_registry_names_missing() {
        let mut registry = ActionRegistry::new();
        for action in Action::ALL {
            if action != Action::Hibernate {
                registry.register(action, Noop);
            }
        }
        let RegistryError::MissingHandlers { missing } = registry.validate().unwrap_err();
        assert_eq!(missing, vec!["hibernate"]);
    }

    #[test]
    fn default_handlers_cover_table() {
        let mut registry = ActionRegistry::new();
        handlers::register_all(&mut registry);
        registry.validate().unwrap();
        assert_eq!(registry.actions(), Action::ALL.to_vec());
    }

    #[test]
    fn get_returns_registered() {
        let mut registry = ActionRegistry::new();
        registry.register(Action::Ping, Noop);
        assert!(registry.get(Action::Ping).is_some());
        assert!(registry.get(Action::Sleep).is_none());
    }
}
