//! Scoped execution containers.
//!
//! A [`Container`] is an isolated key/value store. Exactly one container is
//! "current" for a given execution path; it is installed with
//! [`run_with_container`] or [`run_with_container_async`] and restored on
//! every exit path. The current container lives in task-local storage, so an
//! async scope follows its future across suspension points and two
//! concurrently running scopes never observe each other's container.

use std::any::{Any, TypeId};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use hookline_core::{PluginError, PluginResult};

tokio::task_local! {
    static CURRENT: Container;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SlotKey {
    Type(TypeId),
    Context(Uuid),
}

type Slot = Arc<dyn Any + Send + Sync>;

/// Isolated ambient-state handle.
///
/// Cloning is cheap and yields a handle to the same underlying store.
#[derive(Clone)]
pub struct Container {
    id: Uuid,
    slots: Arc<DashMap<SlotKey, Slot>>,
}

impl Container {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            slots: Arc::new(DashMap::new()),
        }
    }

    /// Returns the unique identifier of this container.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Stores a value keyed by its type, replacing any previous value.
    pub fn insert<T: Send + Sync + 'static>(&self, value: T) {
        self.slots
            .insert(SlotKey::Type(TypeId::of::<T>()), Arc::new(value));
    }

    /// Reads a clone of the value stored for type `T`.
    pub fn get<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.read_slot(SlotKey::Type(TypeId::of::<T>()))
    }

    /// Removes the value stored for type `T`. Returns whether one was present.
    pub fn remove<T: Send + Sync + 'static>(&self) -> bool {
        self.slots
            .remove(&SlotKey::Type(TypeId::of::<T>()))
            .is_some()
    }

    /// Returns whether both handles refer to the same store.
    pub fn same(&self, other: &Container) -> bool {
        Arc::ptr_eq(&self.slots, &other.slots)
    }

    fn read_slot<T: Clone + 'static>(&self, key: SlotKey) -> Option<T> {
        self.slots
            .get(&key)
            .and_then(|slot| slot.value().downcast_ref::<T>().cloned())
    }
}

/// Weak observer of a container's store.
#[cfg(test)]
pub(crate) struct ContainerWatch(std::sync::Weak<DashMap<SlotKey, Slot>>);

#[cfg(test)]
impl ContainerWatch {
    pub(crate) fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

#[cfg(test)]
impl Container {
    pub(crate) fn watch(&self) -> ContainerWatch {
        ContainerWatch(Arc::downgrade(&self.slots))
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id)
            .field("slots", &self.slots.len())
            .finish()
    }
}

/// Creates a fresh, empty container.
pub fn create_container() -> Container {
    Container::new()
}

/// Returns the container current for this execution path, if any.
pub fn current_container() -> Option<Container> {
    CURRENT.try_with(Container::clone).ok()
}

/// Runs `f` with `container` as the current container.
///
/// The previous container (or none) is current again once `f` returns or
/// unwinds.
pub fn run_with_container<F, R>(container: &Container, f: F) -> R
where
    F: FnOnce() -> R,
{
    CURRENT.sync_scope(container.clone(), f)
}

/// Drives `future` with `container` as the current container.
///
/// The container is re-entered every time the future is polled, so code
/// resuming after an `.await` sees the container it started with.
pub async fn run_with_container_async<F>(container: &Container, future: F) -> F::Output
where
    F: Future,
{
    CURRENT.scope(container.clone(), future).await
}

/// Typed ambient value with a default.
///
/// Each `Context` is its own key: two contexts of the same value type do not
/// share storage.
pub struct Context<T> {
    key: Uuid,
    default: Arc<T>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Context<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            default: Arc::clone(&self.default),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Context<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context").field("key", &self.key).finish()
    }
}

impl<T> Context<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a context whose reads fall back to `default`.
    pub fn new(default: T) -> Self {
        Self {
            key: Uuid::new_v4(),
            default: Arc::new(default),
            _marker: PhantomData,
        }
    }

    /// Reads the value from the current container, or the default.
    pub fn get(&self) -> T {
        current_container()
            .map(|container| self.get_in(&container))
            .unwrap_or_else(|| (*self.default).clone())
    }

    /// Reads the value from `container`, or the default.
    pub fn get_in(&self, container: &Container) -> T {
        container
            .read_slot(SlotKey::Context(self.key))
            .unwrap_or_else(|| (*self.default).clone())
    }

    /// Writes the value into the current container.
    pub fn set(&self, value: T) -> PluginResult<()> {
        let container = current_container().ok_or(PluginError::NoActiveContainer)?;
        self.set_in(&container, value);
        Ok(())
    }

    /// Writes the value into `container`.
    pub fn set_in(&self, container: &Container, value: T) {
        container
            .slots
            .insert(SlotKey::Context(self.key), Arc::new(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_container_outside_scope() {
        assert!(current_container().is_none());
    }

    #[test]
    fn test_nested_scopes_restore_previous() {
        let outer = create_container();
        let inner = create_container();

        run_with_container(&outer, || {
            assert_eq!(current_container().map(|c| c.id()), Some(outer.id()));
            run_with_container(&inner, || {
                assert_eq!(current_container().map(|c| c.id()), Some(inner.id()));
            });
            assert_eq!(current_container().map(|c| c.id()), Some(outer.id()));
        });

        assert!(current_container().is_none());
    }

    #[test]
    fn test_scope_restored_after_panic() {
        let container = create_container();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            run_with_container(&container, || panic!("boom"));
        }));
        assert!(result.is_err());
        assert!(current_container().is_none());
    }

    #[test]
    fn test_type_slots() {
        let container = Container::new();
        assert_eq!(container.get::<u32>(), None);
        container.insert(7u32);
        assert_eq!(container.get::<u32>(), Some(7));
        assert!(container.remove::<u32>());
        assert!(!container.remove::<u32>());
    }

    #[test]
    fn test_context_default_and_set() {
        let mode = Context::new("development".to_string());
        assert_eq!(mode.get(), "development");
        assert!(matches!(
            mode.set("production".to_string()),
            Err(PluginError::NoActiveContainer)
        ));

        let container = create_container();
        run_with_container(&container, || {
            mode.set("production".to_string()).expect("set");
            assert_eq!(mode.get(), "production");
        });
        assert_eq!(mode.get_in(&container), "production");
        assert_eq!(mode.get(), "development");
    }

    #[test]
    fn test_contexts_of_same_type_are_distinct() {
        let a = Context::new(1i64);
        let b = Context::new(2i64);
        let container = create_container();
        a.set_in(&container, 10);
        assert_eq!(a.get_in(&container), 10);
        assert_eq!(b.get_in(&container), 2);
    }

    #[tokio::test]
    async fn test_async_scope_survives_suspension() {
        let label = Context::new(String::new());
        let first = create_container();
        let second = create_container();
        label.set_in(&first, "first".to_string());
        label.set_in(&second, "second".to_string());

        let observe = |expected: &'static str| {
            let label = label.clone();
            async move {
                for _ in 0..3 {
                    assert_eq!(label.get(), expected);
                    tokio::task::yield_now().await;
                }
                label.get()
            }
        };

        let (a, b) = tokio::join!(
            run_with_container_async(&first, observe("first")),
            run_with_container_async(&second, observe("second")),
        );
        assert_eq!(a, "first");
        assert_eq!(b, "second");
        assert!(current_container().is_none());
    }
}
