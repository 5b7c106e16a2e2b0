//! Controller lookup by name.

use std::collections::HashMap;
use std::fmt;

use crate::controller::Controller;

type Factory = Box<dyn Fn() -> Box<dyn Controller> + Send + Sync>;

/// Name → factory table; a new controller is built for every dispatch.
#[derive(Default)]
pub struct ControllerRegistry {
    factories: HashMap<String, Factory>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a controller type constructed with `Default`.
    pub fn register<C>(&mut self, name: &str) -> &mut Self
    where
        C: Controller + Default + 'static,
    {
        self.register_with(name, || Box::new(C::default()))
    }

    /// Register a controller built by `factory`.
    pub fn register_with<F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn Controller> + Send + Sync + 'static,
    {
        if self.factories.insert(name.to_string(), Box::new(factory)).is_some() {
            tracing::warn!(controller = name, "Controller registered twice; keeping the latest");
        }
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn instantiate(&self, name: &str) -> Option<Box<dyn Controller>> {
        self.factories.get(name).map(|factory| factory())
    }
}

impl fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("ControllerRegistry").field("controllers", &names).finish()
    }
}
