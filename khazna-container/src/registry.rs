//! Per-container registry of providers, instances and values.
//!
//! The registry is filled once, while its container is declared. Instances
//! are created lazily during that pass: whichever provider is looked up
//! first gets built first, and every instance is cached under its name.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use khazna_support::rendering::{render_chain, suggest_similar};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, trace};

use crate::name::ProviderName;
use crate::provider::{ManagedProvider, ProviderClass};
use crate::resolver::Resolver;

/// A type-erased dependency: a provider instance or an injected value.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Counts of entries copied by [`Registry::absorb`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MergeStats {
    pub instances: usize,
    pub providers: usize,
    pub values: usize,
}

#[derive(Default)]
struct Entries {
    instances: IndexMap<ProviderName, Arc<dyn ManagedProvider>>,
    providers: IndexMap<ProviderName, ProviderClass>,
    values: IndexMap<ProviderName, Value>,
}

/// The merged namespace of one container.
pub(crate) struct Registry {
    container: String,
    entries: RwLock<Entries>,
    /// Names whose constructor is currently running, outermost first.
    constructing: Mutex<Vec<ProviderName>>,
    /// Registries merged in through [`Registry::absorb`]. Shared instances
    /// resolve through these, so they live as long as this one does.
    absorbed: Mutex<Vec<Arc<Registry>>>,
}

impl Registry {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            entries: RwLock::new(Entries::default()),
            constructing: Mutex::new(Vec::new()),
            absorbed: Mutex::new(Vec::new()),
        }
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// Copies every entry of `other` whose name is still free here.
    ///
    /// Instances are shared, not rebuilt. A value is only taken if no
    /// instance already uses its name. `other` is kept alive for as long
    /// as `self` is.
    pub fn absorb(&self, other: &Arc<Registry>) -> MergeStats {
        self.absorbed.lock().push(other.clone());

        let theirs = other.entries.read();
        let mut ours = self.entries.write();
        let mut stats = MergeStats::default();

        for (name, instance) in &theirs.instances {
            if !ours.instances.contains_key(name) {
                ours.instances.insert(name.clone(), instance.clone());
                stats.instances += 1;
            }
        }
        for (name, class) in &theirs.providers {
            if !ours.providers.contains_key(name) {
                ours.providers.insert(name.clone(), class.clone());
                stats.providers += 1;
            }
        }
        for (name, value) in &theirs.values {
            if !ours.values.contains_key(name) && !ours.instances.contains_key(name) {
                ours.values.insert(name.clone(), value.clone());
                stats.values += 1;
            }
        }

        stats
    }

    /// Whether `name` is already taken by a provider or an instance.
    pub fn has_provider(&self, name: &str) -> bool {
        let entries = self.entries.read();
        entries.providers.contains_key(name) || entries.instances.contains_key(name)
    }

    /// Whether `name` is taken by anything at all.
    pub fn has_name(&self, name: &str) -> bool {
        let entries = self.entries.read();
        entries.values.contains_key(name)
            || entries.instances.contains_key(name)
            || entries.providers.contains_key(name)
    }

    pub fn add_provider(&self, class: ProviderClass) {
        trace!(provider = %class.name(), container = %self.container, "Provider declared");
        self.entries.write().providers.insert(class.name().clone(), class);
    }

    pub fn add_value(&self, name: ProviderName, value: Value) {
        trace!(value = %name, container = %self.container, "Value declared");
        self.entries.write().values.insert(name, value);
    }

    /// Providers that have no instance yet, in declaration order.
    pub fn pending(&self) -> Vec<ProviderClass> {
        let entries = self.entries.read();
        entries
            .providers
            .iter()
            .filter(|(name, _)| !entries.instances.contains_key(*name))
            .map(|(_, class)| class.clone())
            .collect()
    }

    /// Returns the instance for `class`, building it if needed.
    pub fn instantiate(self: &Arc<Self>, class: &ProviderClass) -> Arc<dyn ManagedProvider> {
        if let Some(existing) = self.entries.read().instances.get(class.name()) {
            return existing.clone();
        }

        let built = {
            let _guard = Construction::enter(&self.constructing, class.name().clone());
            class.construct(Resolver::new(Arc::downgrade(self)))
        };

        let instance = self
            .entries
            .write()
            .instances
            .entry(class.name().clone())
            .or_insert(built)
            .clone();

        info!(
            provider = %class.name(),
            container = %self.container,
            "Provider injected: [{}] --> ({})",
            class.name(),
            self.container
        );
        instance
    }

    /// Looks `name` up: values first, then the construction guard, then
    /// built instances, then providers that still need building.
    pub fn resolve(self: &Arc<Self>, name: &str) -> Option<Value> {
        let class = {
            let entries = self.entries.read();

            if let Some(value) = entries.values.get(name) {
                return Some(value.clone());
            }

            if self.is_constructing(name) {
                return None;
            }

            if let Some(instance) = entries.instances.get(name) {
                return Some(instance.instance());
            }

            entries.providers.get(name).cloned()
        };

        match class {
            Some(class) => Some(self.instantiate(&class).instance()),
            None => {
                self.report_miss(name);
                None
            }
        }
    }

    /// The built instance stored under `name`, without building anything.
    pub fn instance(&self, name: &str) -> Option<Value> {
        self.entries.read().instances.get(name).map(|i| i.instance())
    }

    /// Snapshot of all instances in insertion order.
    pub fn managed_instances(&self) -> Vec<Arc<dyn ManagedProvider>> {
        self.entries.read().instances.values().cloned().collect()
    }

    pub fn instance_names(&self) -> Vec<ProviderName> {
        self.entries.read().instances.keys().cloned().collect()
    }

    pub fn value_names(&self) -> Vec<ProviderName> {
        self.entries.read().values.keys().cloned().collect()
    }

    fn is_constructing(&self, name: &str) -> bool {
        let stack = self.constructing.lock();
        if stack.iter().any(|n| n.as_str() == name) {
            debug!(
                dependency = name,
                chain = %render_chain(stack.as_slice()),
                "Dependency is still under construction, resolving as absent"
            );
            return true;
        }
        false
    }

    fn report_miss(&self, name: &str) {
        let entries = self.entries.read();
        let known: Vec<&str> = entries
            .values
            .keys()
            .chain(entries.instances.keys())
            .chain(entries.providers.keys())
            .map(ProviderName::as_str)
            .collect();
        let suggestions = suggest_similar(name, &known, 3);

        debug!(
            dependency = name,
            container = %self.container,
            suggestions = ?suggestions,
            "Dependency not found"
        );
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.read();
        f.debug_struct("Registry")
            .field("container", &self.container)
            .field("instances", &entries.instances.len())
            .field("providers", &entries.providers.len())
            .field("values", &entries.values.len())
            .finish()
    }
}

/// Keeps a name on the construction stack while its constructor runs.
struct Construction<'a> {
    stack: &'a Mutex<Vec<ProviderName>>,
}

impl<'a> Construction<'a> {
    fn enter(stack: &'a Mutex<Vec<ProviderName>>, name: ProviderName) -> Self {
        stack.lock().push(name);
        Self { stack }
    }
}

impl Drop for Construction<'_> {
    fn drop(&mut self) {
        self.stack.lock().pop();
    }
}
