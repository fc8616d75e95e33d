use std::{any::type_name, sync::Arc};

use crate::{binder::Injectable, errors::InjectErrorKind, lifetime::Lifetime, resolver::Resolver};

/// Service with a start operation.
///
/// A service returning `Some` from [`Runnable::priority`] starts before every plain service,
/// lower priorities first.
pub trait Runnable: Send + Sync + 'static {
    /// Starts the service. Long-running work should keep `lifetime` and stop once it's cancelled.
    ///
    /// # Errors
    /// Any error aborts the remaining startup sequence.
    fn start(&self, lifetime: &Lifetime) -> anyhow::Result<()>;

    fn priority(&self) -> Option<i32> {
        None
    }
}

/// Runnable service whose completion can be awaited.
pub trait Joinable: Runnable {
    /// Blocks until the service completes.
    ///
    /// # Errors
    /// The first failing join cancels every other started service.
    fn join(&self) -> anyhow::Result<()>;
}

type RegisterFn = Box<dyn FnOnce(&Resolver, &str) + Send>;
type InjectFn = Box<dyn Fn(&Resolver) -> Result<(), InjectErrorKind> + Send + Sync>;

/// Instance produced by a service factory, with its declared capabilities.
pub struct Service {
    pub(crate) type_name: &'static str,
    pub(crate) registrations: Vec<RegisterFn>,
    pub(crate) inject: Option<InjectFn>,
    pub(crate) runnable: Option<Arc<dyn Runnable>>,
    pub(crate) joinable: Option<Arc<dyn Joinable>>,
}

impl Service {
    /// Service registered under its concrete type only, without injection or lifecycle.
    ///
    /// The marked fields of an [`Injectable`] instance stay unbound here,
    /// use [`Service::injectable`] or [`ServiceBuilder::inject`] for those.
    #[inline]
    #[must_use]
    pub fn new<T: Send + Sync + 'static>(instance: Arc<T>) -> Self {
        Self::builder(instance).build()
    }

    /// Service registered under its concrete type, with its marked fields bound after registration.
    ///
    /// # Panics
    /// Panics if a field marker of `T` is invalid.
    #[inline]
    #[must_use]
    pub fn injectable<T: Injectable>(instance: Arc<T>) -> Self {
        Self::builder(instance).inject().build()
    }

    #[inline]
    #[must_use]
    pub fn builder<T: Send + Sync + 'static>(instance: Arc<T>) -> ServiceBuilder<T> {
        let register: RegisterFn = {
            let instance = instance.clone();
            Box::new(move |resolver: &Resolver, name: &str| resolver.register(name, instance))
        };

        ServiceBuilder {
            service: Service {
                type_name: type_name::<T>(),
                registrations: vec![register],
                inject: None,
                runnable: None,
                joinable: None,
            },
            instance,
        }
    }

    #[inline]
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[inline]
    #[must_use]
    pub fn is_runnable(&self) -> bool {
        self.runnable.is_some()
    }

    #[inline]
    #[must_use]
    pub fn is_joinable(&self) -> bool {
        self.joinable.is_some()
    }

    pub(crate) fn register(&mut self, resolver: &Resolver, name: &str) {
        for registration in self.registrations.drain(..) {
            registration(resolver, name);
        }
    }

    pub(crate) fn inject(&self, resolver: &Resolver) -> Result<(), InjectErrorKind> {
        match &self.inject {
            Some(inject) => inject(resolver),
            None => Ok(()),
        }
    }
}

pub struct ServiceBuilder<T> {
    service: Service,
    instance: Arc<T>,
}

impl<T: Send + Sync + 'static> ServiceBuilder<T> {
    /// Binds the marked fields after every service of the context is registered.
    ///
    /// # Panics
    /// Panics if a field marker of `T` is invalid.
    #[must_use]
    pub fn inject(mut self) -> Self
    where
        T: Injectable,
    {
        let bindings = T::bindings();
        let instance = self.instance.clone();
        let inject: InjectFn = Box::new(move |resolver: &Resolver| bindings.apply(&instance, resolver));
        self.service.inject = Some(inject);
        self
    }

    #[must_use]
    pub fn runnable(mut self) -> Self
    where
        T: Runnable,
    {
        self.service.runnable = Some(self.instance.clone() as Arc<dyn Runnable>);
        self
    }

    #[must_use]
    pub fn joinable(mut self) -> Self
    where
        T: Joinable,
    {
        self.service.runnable = Some(self.instance.clone() as Arc<dyn Runnable>);
        self.service.joinable = Some(self.instance.clone() as Arc<dyn Joinable>);
        self
    }

    /// Also registers the instance as the interface `I`, under the same name.
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use servicewire::Service;
    /// trait Store: Send + Sync {}
    /// struct MemoryStore;
    /// impl Store for MemoryStore {}
    ///
    /// let service = Service::builder(Arc::new(MemoryStore))
    ///     .expose::<dyn Store>(|store| store as Arc<dyn Store>)
    ///     .build();
    /// ```
    #[must_use]
    pub fn expose<I>(mut self, cast: fn(Arc<T>) -> Arc<I>) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        let instance = cast(self.instance.clone());
        self.service
            .registrations
            .push(Box::new(move |resolver: &Resolver, name: &str| resolver.register::<I>(name, instance)));
        self
    }

    #[inline]
    #[must_use]
    pub fn build(self) -> Service {
        self.service
    }
}

impl<T: Send + Sync + 'static> From<ServiceBuilder<T>> for Service {
    #[inline]
    fn from(builder: ServiceBuilder<T>) -> Self {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::{Joinable, Runnable, Service};
    use crate::{
        binder::{Bindings, Injectable},
        inject::Injected,
        lifetime::Lifetime,
        resolver::Resolver,
    };

    use std::{ptr, sync::Arc};

    trait Named: Send + Sync {
        fn name(&self) -> &'static str;
    }

    struct Worker;

    impl Named for Worker {
        fn name(&self) -> &'static str {
            "worker"
        }
    }

    impl Runnable for Worker {
        fn start(&self, _lifetime: &Lifetime) -> anyhow::Result<()> {
            Ok(())
        }
    }

    impl Joinable for Worker {
        fn join(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_plain_service() {
        let service = Service::new(Arc::new(Worker));
        assert!(!service.is_runnable());
        assert!(!service.is_joinable());
        assert!(service.type_name().ends_with("Worker"));
    }

    #[derive(Default)]
    struct Supervisor {
        worker: Injected<Worker>,
    }

    impl Injectable for Supervisor {
        fn bindings() -> Bindings<Self> {
            Bindings::new().field("worker", "worker", |supervisor: &Self| &supervisor.worker)
        }
    }

    #[test]
    fn test_injectable_service_binds_fields() {
        let resolver = Resolver::new();
        let worker = Arc::new(Worker);
        resolver.register("worker", worker.clone());

        let supervisor = Arc::new(Supervisor::default());
        let mut service = Service::injectable(supervisor.clone());
        service.register(&resolver, "supervisor");
        service.inject(&resolver).unwrap();

        assert!(Arc::ptr_eq(supervisor.worker.get().unwrap(), &worker));
        assert!(resolver.contains::<Supervisor>("supervisor"));
    }

    #[test]
    fn test_plain_service_skips_injection() {
        let resolver = Resolver::new();
        resolver.register("worker", Arc::new(Worker));

        let supervisor = Arc::new(Supervisor::default());
        let service = Service::new(supervisor.clone());
        service.inject(&resolver).unwrap();

        assert!(!supervisor.worker.is_bound());
    }

    #[test]
    fn test_joinable_implies_runnable() {
        let service = Service::builder(Arc::new(Worker)).joinable().build();
        assert!(service.is_runnable());
        assert!(service.is_joinable());
    }

    #[test]
    fn test_register_with_exposed_interface() {
        let worker = Arc::new(Worker);
        let mut service = Service::builder(worker.clone())
            .runnable()
            .expose::<dyn Named>(|worker| worker as Arc<dyn Named>)
            .build();

        let resolver = Resolver::new();
        service.register(&resolver, "worker");

        assert!(Arc::ptr_eq(&resolver.get::<Worker>("worker").unwrap(), &worker));
        let named = resolver.get::<dyn Named>("worker").unwrap();
        assert_eq!(named.name(), "worker");
        assert!(ptr::addr_eq(Arc::as_ptr(&named), Arc::as_ptr(&worker)));
    }
}
