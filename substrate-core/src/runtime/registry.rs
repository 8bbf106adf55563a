//! Typed service registry. Each service's `ActorHandle<Req, Resp>` is a
//! distinct Rust type, so looking services up by `TypeId` doubles as looking
//! them up by service identity — the same typemap technique `axum::Extension`
//! uses for per-request state, applied here to long-lived service handles.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Holds one handle per service type, resolved by the caller's turbofish.
#[derive(Default)]
pub struct ServiceRegistry {
    services: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.services.insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Panics if `T` was never registered — a wiring bug in `System::build`,
    /// not a runtime condition callers should handle.
    pub fn get<T: Send + Sync + 'static>(&self) -> Arc<T> {
        self.services
            .get(&TypeId::of::<T>())
            .unwrap_or_else(|| panic!("service {} not registered", std::any::type_name::<T>()))
            .clone()
            .downcast::<T>()
            .unwrap_or_else(|_| unreachable!("TypeId match guarantees downcast success"))
    }

    pub fn try_get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.services
            .get(&TypeId::of::<T>())?
            .clone()
            .downcast::<T>()
            .ok()
    }
}
