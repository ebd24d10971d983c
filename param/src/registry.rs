// registry.rs — Live parameter instance registry
//
// Tracks which parameter contents blocks are currently alive, for tooling
// that needs to enumerate the inputs of an authoring session (e.g. to find
// the parameters owned by a pipeline generator). The registry is an explicit
// object passed to parameter construction; there is no process-wide instance.
//
// Registration is a scoped acquisition: `register` returns a `Registration`
// guard and dropping the guard removes the entry. A contents block owns its
// guard, so the entry lives exactly as long as the block does.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

// ── Data types ──────────────────────────────────────────────────────────────

/// Stable identifier of one registration. Allocated in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct InstanceId(pub u64);

/// What kind of object a registration stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceKind {
    ScalarParameter,
    BufferParameter,
}

/// One live registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceRecord {
    pub id: InstanceId,
    pub kind: InstanceKind,
    pub name: String,
}

#[derive(Default)]
struct RegistryState {
    next_id: u64,
    instances: BTreeMap<InstanceId, InstanceRecord>,
}

// ── Registry ────────────────────────────────────────────────────────────────

/// Shared registry of live parameter instances. Clones refer to the same
/// registry.
#[derive(Clone, Default)]
pub struct InstanceRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. The entry is removed when the returned guard drops.
    pub fn register(&self, kind: InstanceKind, name: &str) -> Registration {
        let mut state = self.state.lock();
        let id = InstanceId(state.next_id);
        state.next_id += 1;
        state.instances.insert(
            id,
            InstanceRecord {
                id,
                kind,
                name: name.to_string(),
            },
        );
        debug!(id = id.0, ?kind, name, "registered instance");
        Registration {
            registry: self.clone(),
            id,
        }
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.state.lock().instances.contains_key(&id)
    }

    /// Snapshot of all live registrations, in registration order.
    pub fn instances(&self) -> Vec<InstanceRecord> {
        self.state.lock().instances.values().cloned().collect()
    }

    pub fn instances_of(&self, kind: InstanceKind) -> Vec<InstanceRecord> {
        self.state
            .lock()
            .instances
            .values()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().instances.is_empty()
    }

    fn deregister(&self, id: InstanceId) {
        let removed = self.state.lock().instances.remove(&id);
        debug_assert!(removed.is_some(), "instance {:?} deregistered twice", id);
        debug!(id = id.0, "deregistered instance");
    }
}

impl fmt::Debug for InstanceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceRegistry")
            .field("len", &self.len())
            .finish()
    }
}

/// Guard for one registry entry; removes it on drop. Not clonable, so the
/// entry is removed exactly once.
pub struct Registration {
    registry: InstanceRegistry,
    id: InstanceId,
}

impl Registration {
    pub fn id(&self) -> InstanceId {
        self.id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.deregister(self.id);
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Registration").field(&self.id).finish()
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_drop() {
        let reg = InstanceRegistry::new();
        assert!(reg.is_empty());
        let guard = reg.register(InstanceKind::ScalarParameter, "gain");
        assert_eq!(reg.len(), 1);
        assert!(reg.contains(guard.id()));
        let id = guard.id();
        drop(guard);
        assert!(reg.is_empty());
        assert!(!reg.contains(id));
    }

    #[test]
    fn ids_increase() {
        let reg = InstanceRegistry::new();
        let a = reg.register(InstanceKind::ScalarParameter, "a");
        let b = reg.register(InstanceKind::BufferParameter, "b");
        assert!(a.id() < b.id());
        let names: Vec<_> = reg.instances().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn filter_by_kind() {
        let reg = InstanceRegistry::new();
        let _a = reg.register(InstanceKind::ScalarParameter, "a");
        let _b = reg.register(InstanceKind::BufferParameter, "b");
        let _c = reg.register(InstanceKind::BufferParameter, "c");
        let buffers = reg.instances_of(InstanceKind::BufferParameter);
        assert_eq!(buffers.len(), 2);
        assert!(buffers.iter().all(|r| r.kind == InstanceKind::BufferParameter));
    }

    #[test]
    fn clones_share_state() {
        let reg = InstanceRegistry::new();
        let other = reg.clone();
        let _g = reg.register(InstanceKind::ScalarParameter, "x");
        assert_eq!(other.len(), 1);
    }
}
