use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread,
};

use anyhow::anyhow;
use parking_lot::Mutex;
use tracing::{debug, error, info, info_span};

use crate::{
    config::{ConfigSource, JsonConfig},
    errors::{ContextErrorKind, RegistryErrorKind},
    lifetime::Lifetime,
    resolver::Resolver,
    service::{Joinable, Runnable, Service},
};

/// Lifecycle state of a [`ServiceContext`]. States only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Accepting registrations
    Idle,
    /// Every factory invoked, services registered and injected
    Bound,
    /// Runnable services being launched
    Starting,
    /// Runnable services launched
    Started,
    /// Waiting for joinable services
    Joining,
    /// Every joinable service completed
    Joined,
    /// Bind failed; the context can't be started
    Failed,
}

pub type ServiceFactory<C> = Box<dyn Fn(C) -> anyhow::Result<Option<Service>> + Send + Sync>;

struct ServiceDescriptor<C> {
    name: String,
    factory: ServiceFactory<C>,
}

struct BoundRunnable {
    name: String,
    runnable: Arc<dyn Runnable>,
    joinable: Option<Arc<dyn Joinable>>,
}

struct StartedService {
    name: String,
    joinable: Option<Arc<dyn Joinable>>,
    lifetime: Lifetime,
}

struct ContextInner<C> {
    state: State,
    shut_down: bool,
    descriptors: Vec<ServiceDescriptor<C>>,
    runnables: Vec<BoundRunnable>,
    started: Vec<StartedService>,
}

/// Named service factories driven through bind, start, join and shutdown.
///
/// ```
/// use std::sync::Arc;
/// use servicewire::{JsonConfig, Service, ServiceContext};
///
/// struct Clock;
///
/// let context = ServiceContext::<JsonConfig>::new();
/// context.register("clock", |_config| Ok(Some(Service::new(Arc::new(Clock)))));
/// context.bind(&JsonConfig::default()).unwrap();
///
/// assert!(context.resolver().get::<Clock>("clock").is_some());
/// ```
pub struct ServiceContext<C = JsonConfig> {
    section: Option<String>,
    resolver: Arc<Resolver>,
    inner: Mutex<ContextInner<C>>,
}

impl<C> Default for ServiceContext<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> ServiceContext<C> {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_resolver(Arc::new(Resolver::new()))
    }

    /// Creates a context registering its services into an existing resolver.
    #[inline]
    #[must_use]
    pub fn with_resolver(resolver: Arc<Resolver>) -> Self {
        Self {
            section: None,
            resolver,
            inner: Mutex::new(ContextInner {
                state: State::Idle,
                shut_down: false,
                descriptors: Vec::new(),
                runnables: Vec::new(),
                started: Vec::new(),
            }),
        }
    }

    /// Derives service configs from the `section` scope instead of the root config,
    /// so the service `cache` gets `section.cache`.
    #[inline]
    #[must_use]
    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> State {
        self.inner.lock().state
    }

    /// Registers the factory of the service `name`.
    ///
    /// # Panics
    /// - Panics if a service with the same name is already registered
    /// - Panics if the context was already bound
    pub fn register<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn(C) -> anyhow::Result<Option<Service>> + Send + Sync + 'static,
    {
        let name = name.into();
        let mut inner = self.inner.lock();

        assert!(
            inner.state == State::Idle,
            "service {name} registered in state {:?}, expected {:?}",
            inner.state,
            State::Idle,
        );
        if inner.descriptors.iter().any(|descriptor| descriptor.name == name) {
            let err = RegistryErrorKind::DuplicateService { name };
            drop(inner);
            error!("{}", err);
            panic!("{err}");
        }

        debug!(service = %name, "Service registered");
        inner.descriptors.push(ServiceDescriptor {
            name,
            factory: Box::new(factory),
        });
    }

    /// Starts bound runnable services one at a time.
    /// Services with a priority go first, in ascending priority order; plain services follow in registration order.
    ///
    /// Every started service gets its own [`Lifetime`].
    /// The context lock isn't held while a service starts, so [`Self::state`] and [`Self::shutdown`]
    /// stay available. A service whose start returns after a shutdown gets an already cancelled lifetime.
    ///
    /// The context is `Started` afterwards even if a service failed, so the services started before it
    /// can still be joined or shut down.
    ///
    /// # Errors
    /// - Returns [`ContextErrorKind::InvalidState`] unless the context is `Bound`
    /// - Returns [`ContextErrorKind::Start`] for the first failing service; the rest isn't started
    pub fn start(&self) -> Result<(), ContextErrorKind> {
        let (mut prior, plain): (Vec<_>, Vec<_>) = {
            let mut inner = self.inner.lock();
            check_state(inner.state, State::Bound, "start")?;
            inner.state = State::Starting;

            let runnables = std::mem::take(&mut inner.runnables);
            runnables.into_iter().partition(|bound| bound.runnable.priority().is_some())
        };
        prior.sort_by_key(|bound| bound.runnable.priority());

        let result = prior.into_iter().chain(plain).try_for_each(|bound| self.start_service(bound));
        self.inner.lock().state = State::Started;
        result
    }

    fn start_service(&self, BoundRunnable { name, runnable, joinable }: BoundRunnable) -> Result<(), ContextErrorKind> {
        let span = info_span!("start", service = %name, priority = runnable.priority());
        let _guard = span.enter();

        debug!("Service start ...");
        let lifetime = Lifetime::new(name.as_str());
        if let Err(source) = runnable.start(&lifetime) {
            error!("Service stopped with err: {source:#}");
            return Err(ContextErrorKind::Start { service: name, source });
        }
        info!("Service started");

        let mut inner = self.inner.lock();
        if inner.shut_down {
            lifetime.cancel();
        }
        inner.started.push(StartedService { name, joinable, lifetime });
        Ok(())
    }

    /// Blocks until every started joinable service completes, one waiter thread per service.
    /// Non-joinable services are never awaited.
    ///
    /// The context lock isn't held while waiting, so [`Self::shutdown`] can be called from another thread.
    ///
    /// # Errors
    /// - Returns [`ContextErrorKind::InvalidState`] unless the context is `Started`
    /// - Returns [`ContextErrorKind::Join`] for the first service failing (or panicking) in its join.
    ///   Its failure cancels the lifetimes of every other started service.
    pub fn join(&self) -> Result<(), ContextErrorKind> {
        let (joinables, lifetimes) = {
            let mut inner = self.inner.lock();
            check_state(inner.state, State::Started, "join")?;
            inner.state = State::Joining;

            let joinables = inner
                .started
                .iter()
                .filter_map(|started| started.joinable.clone().map(|joinable| (started.name.clone(), joinable)))
                .collect::<Vec<_>>();
            let lifetimes = inner.started.iter().map(|started| started.lifetime.clone()).collect::<Vec<_>>();
            (joinables, lifetimes)
        };

        let first_failure = Mutex::new(None);
        thread::scope(|scope| {
            for (name, joinable) in &joinables {
                let first_failure = &first_failure;
                let lifetimes = &lifetimes;

                scope.spawn(move || {
                    let span = info_span!("join", service = %name);
                    let _guard = span.enter();

                    debug!("Service join ...");
                    let result = panic::catch_unwind(AssertUnwindSafe(|| joinable.join()))
                        .unwrap_or_else(|_| Err(anyhow!("join of service {name} panicked")));

                    match result {
                        Ok(()) => info!("Service stopped"),
                        Err(source) => {
                            error!("Service stopped with err: {source:#}");

                            let mut first_failure = first_failure.lock();
                            if first_failure.is_none() {
                                *first_failure = Some(ContextErrorKind::Join {
                                    service: name.clone(),
                                    source,
                                });
                                drop(first_failure);
                                lifetimes.iter().for_each(Lifetime::cancel);
                            }
                        }
                    }
                });
            }
        });

        self.inner.lock().state = State::Joined;

        match first_failure.into_inner() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Cancels the lifetime of every started service, and of services still starting once their start returns.
    /// Never waits for services, can be called repeatedly.
    pub fn shutdown(&self) {
        let mut inner = self.inner.lock();
        inner.shut_down = true;
        for started in &inner.started {
            debug!(service = %started.name, "Service shutdown");
            started.lifetime.cancel();
        }
    }
}

impl<C: ConfigSource> ServiceContext<C> {
    /// Invokes every factory in registration order with its config scope,
    /// registers the produced services and then injects them.
    /// Injection runs once every service is registered, so it doesn't depend on registration order.
    ///
    /// A factory returning `None` opts its service out: it's neither registered nor injected.
    ///
    /// Nothing is rolled back on failure: services registered before it stay in the resolver,
    /// and the context moves to `Failed`.
    ///
    /// # Errors
    /// - Returns [`ContextErrorKind::InvalidState`] unless the context is `Idle`
    /// - Returns [`ContextErrorKind::Section`] if the services section can't be derived
    /// - Returns [`ContextErrorKind::Config`] if a service config scope can't be derived
    /// - Returns [`ContextErrorKind::Factory`] if a factory fails
    /// - Returns [`ContextErrorKind::Inject`] if a service field can't be injected
    pub fn bind(&self, config: &C) -> Result<(), ContextErrorKind> {
        let mut inner = self.inner.lock();
        check_state(inner.state, State::Idle, "bind")?;
        // Stays failed if a duplicate registration panics mid-bind.
        inner.state = State::Failed;

        let runnables = self.bind_services(&inner.descriptors, config)?;
        inner.runnables = runnables;
        inner.state = State::Bound;
        Ok(())
    }

    fn bind_services(&self, descriptors: &[ServiceDescriptor<C>], config: &C) -> Result<Vec<BoundRunnable>, ContextErrorKind> {
        let root;
        let config = match &self.section {
            Some(section) => {
                root = config.scope(section).map_err(|err| {
                    error!(section = %section, "Get services config section error: {err}");
                    ContextErrorKind::Section {
                        section: section.clone(),
                        source: Box::new(err),
                    }
                })?;
                &root
            }
            None => config,
        };

        let mut services = Vec::with_capacity(descriptors.len());
        for ServiceDescriptor { name, factory } in descriptors {
            let span = info_span!("bind", service = %name);
            let _guard = span.enter();

            let scope = match config.scope(name) {
                Ok(scope) => scope,
                Err(err) => {
                    error!("Get service config error: {err}");
                    return Err(ContextErrorKind::Config {
                        service: name.clone(),
                        source: Box::new(err),
                    });
                }
            };

            let mut service = match factory(scope) {
                Ok(Some(service)) => service,
                Ok(None) => {
                    debug!("Service opted out");
                    continue;
                }
                Err(source) => {
                    error!("Create service error: {source:#}");
                    return Err(ContextErrorKind::Factory {
                        service: name.clone(),
                        source,
                    });
                }
            };

            service.register(&self.resolver, name);
            debug!(type_name = service.type_name, "Service bound");
            services.push((name, service));
        }

        let mut runnables = Vec::new();
        for (name, service) in services {
            let span = info_span!("bind", service = %name);
            let _guard = span.enter();

            debug!(type_name = service.type_name, "Inject service");
            if let Err(source) = service.inject(&self.resolver) {
                error!(type_name = service.type_name, "Inject service failed");
                return Err(ContextErrorKind::Inject {
                    service: name.clone(),
                    type_name: service.type_name,
                    source,
                });
            }

            if let Some(runnable) = service.runnable {
                runnables.push(BoundRunnable {
                    name: name.clone(),
                    runnable,
                    joinable: service.joinable,
                });
            }
        }

        Ok(runnables)
    }
}

fn check_state(actual: State, expected: State, operation: &'static str) -> Result<(), ContextErrorKind> {
    if actual == expected {
        return Ok(());
    }

    let err = ContextErrorKind::InvalidState {
        operation,
        expected,
        actual,
    };
    error!("{}", err);
    Err(err)
}
