//! Binding recipes and constructor parameter resolution.
//!
//! Covers self, class, instance and factory bindings, names, defaults,
//! keyword-only and variadic parameters, type handles and string lookups.

use ferrous_wire::provider::downcast;
use ferrous_wire::{
    module, Arguments, DiError, DiResult, Factory, Injectable, Injector, MetricsObserver, Parameter,
    PerLookupScope, ProviderOf, Signature, Target, TargetType, TypeInfo,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ===== Test Services =====

struct MyType;

impl Injectable for MyType {
    fn signature() -> Signature {
        Signature::of::<Self>()
    }
    fn construct(_: &Arguments) -> DiResult<Self> {
        Ok(MyType)
    }
}

trait Base: Send + Sync {
    fn dep(&self) -> Arc<Dep>;
}

struct Dep;

impl Injectable for Dep {
    fn signature() -> Signature {
        Signature::of::<Self>()
    }
    fn construct(_: &Arguments) -> DiResult<Self> {
        Ok(Dep)
    }
}

struct Impl {
    dep: Arc<Dep>,
}

impl Base for Impl {
    fn dep(&self) -> Arc<Dep> {
        self.dep.clone()
    }
}

impl Injectable for Impl {
    fn signature() -> Signature {
        Signature::of::<Self>().param::<Dep>("dep")
    }
    fn construct(args: &Arguments) -> DiResult<Self> {
        Ok(Impl { dep: args.get("dep")? })
    }
}

#[derive(Debug, PartialEq)]
struct Port(u16);

struct Sequence {
    next: AtomicUsize,
}

impl Factory for Sequence {
    type Output = usize;
    fn get(&self) -> DiResult<Arc<usize>> {
        Ok(Arc::new(self.next.fetch_add(1, Ordering::SeqCst)))
    }
}

struct Greeting;

impl Injectable for Greeting {
    fn signature() -> Signature {
        Signature::of::<Self>().param::<String>("name")
    }
    fn construct(args: &Arguments) -> DiResult<Self> {
        args.get::<String>("name")?;
        Ok(Greeting)
    }
}

struct GreetingFactory {
    name: Arc<String>,
}

impl Injectable for GreetingFactory {
    fn signature() -> Signature {
        Signature::of::<Self>().param::<String>("name")
    }
    fn construct(args: &Arguments) -> DiResult<Self> {
        Ok(GreetingFactory { name: args.get("name")? })
    }
}

impl Factory for GreetingFactory {
    type Output = String;
    fn get(&self) -> DiResult<Arc<String>> {
        Ok(Arc::new(format!("hello, {}", self.name)))
    }
}

// ===== Self, Class and Instance Bindings =====

#[test]
fn test_self_binding_is_singleton_by_default() {
    let injector = Injector::builder()
        .bindings("app", |binder| {
            binder.bind::<MyType>().to_self()?;
            Ok(())
        })
        .build()
        .unwrap();

    let first = injector.get::<MyType>().unwrap();
    let second = injector.get::<MyType>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_class_binding_injects_singleton_dependency() {
    let injector = Injector::builder()
        .bindings("app", |binder| {
            binder.bind::<dyn Base>().to_class::<Impl, _>(|i| i as Arc<dyn Base>)?;
            binder.bind::<Dep>().to_self()?;
            Ok(())
        })
        .build()
        .unwrap();

    let base = injector.get::<dyn Base>().unwrap();
    let dep = injector.get::<Dep>().unwrap();
    assert!(Arc::ptr_eq(&base.dep(), &dep));
    // The bound class is resolvable on its own.
    assert!(injector.get::<Impl>().is_ok());
    assert_eq!(injector.get_type::<dyn Base>().unwrap(), TypeInfo::of::<Impl>());
}

#[test]
fn test_instance_binding_returns_the_same_value() {
    let port = Arc::new(Port(8080));
    let bound = port.clone();
    let injector = Injector::builder()
        .bindings("app", move |binder| {
            binder.bind::<Port>().to_instance(bound.clone())?;
            Ok(())
        })
        .build()
        .unwrap();

    assert!(Arc::ptr_eq(&injector.get::<Port>().unwrap(), &port));
}

#[test]
fn test_instance_binding_requires_singleton_scope() {
    let err = Injector::builder()
        .bindings("app", |binder| {
            binder
                .bind::<Port>()
                .in_scope::<PerLookupScope>()
                .to_instance(Arc::new(Port(1)))?;
            Ok(())
        })
        .build()
        .unwrap_err();
    assert!(matches!(err, DiError::NonInjectableType { .. }), "{err}");
}

#[test]
fn test_named_bindings_are_distinct_targets() {
    let injector = Injector::builder()
        .bindings("app", |binder| {
            binder.bind::<Port>().to_instance(Arc::new(Port(80)))?;
            binder.bind::<Port>().named("admin").to_instance(Arc::new(Port(9000)))?;
            Ok(())
        })
        .build()
        .unwrap();

    assert_eq!(*injector.get::<Port>().unwrap(), Port(80));
    assert_eq!(*injector.get_named::<Port>("admin").unwrap(), Port(9000));
    assert!(injector.get_named::<Port>("metrics").unwrap_err().is_no_binding());
}

// ===== Factory Bindings =====

#[test]
fn test_factory_instance_follows_scope() {
    let injector = Injector::builder()
        .bindings("app", |binder| {
            binder
                .bind::<usize>()
                .in_scope::<PerLookupScope>()
                .to_provider_instance(Sequence { next: AtomicUsize::new(10) })?;
            binder
                .bind::<usize>()
                .named("once")
                .to_provider_instance(Sequence { next: AtomicUsize::new(100) })?;
            Ok(())
        })
        .build()
        .unwrap();

    assert_eq!(*injector.get::<usize>().unwrap(), 10);
    assert_eq!(*injector.get::<usize>().unwrap(), 11);
    assert_eq!(*injector.get_named::<usize>("once").unwrap(), 100);
    assert_eq!(*injector.get_named::<usize>("once").unwrap(), 100);
    // The factory instance is itself bound.
    assert!(injector.get::<Sequence>().is_ok());
}

#[test]
fn test_factory_class_is_built_with_its_dependencies() {
    let injector = Injector::builder()
        .bindings("app", |binder| {
            binder.bind::<String>().named("name").to_instance(Arc::new("world".to_string()))?;
            binder.bind::<String>().to_provider::<GreetingFactory>()?;
            Ok(())
        })
        .build()
        .unwrap();

    assert_eq!(*injector.get::<String>().unwrap(), "hello, world");
    assert!(injector.get::<GreetingFactory>().is_ok());
}

// ===== Parameter Resolution =====

struct Server {
    port: Arc<u16>,
    host: Arc<String>,
    timeout: Arc<u32>,
    retries: Arc<u8>,
    limit: Arc<u64>,
    extra: Vec<Arc<i32>>,
}

impl Injectable for Server {
    fn signature() -> Signature {
        Signature::of::<Self>()
            .with(Parameter::of::<u16>("port").named("http"))
            .param::<String>("host")
            .param::<u32>("timeout")
            .with(Parameter::of::<u8>("retries").default_value(Arc::new(3u8)))
            .with(Parameter::of::<i32>("extra").variadic())
            .with(Parameter::of::<u64>("limit").keyword_only())
    }

    fn construct(args: &Arguments) -> DiResult<Self> {
        Ok(Server {
            port: args.get("port")?,
            host: args.get("host")?,
            timeout: args.get("timeout")?,
            retries: args.get("retries")?,
            limit: args.get("limit")?,
            extra: args.variadic()?,
        })
    }
}

fn server_injector(extra: Vec<i32>) -> DiResult<Injector> {
    Injector::builder()
        .bindings("server", move |binder| {
            binder.bind::<u16>().named("http").to_instance(Arc::new(8080))?;
            binder.bind::<u16>().named("port").to_instance(Arc::new(1))?;
            binder.bind::<u16>().to_instance(Arc::new(2))?;
            binder.bind::<String>().named("host").to_instance(Arc::new("example.org".to_string()))?;
            binder.bind::<String>().to_instance(Arc::new("fallback".to_string()))?;
            binder.bind::<u32>().to_instance(Arc::new(30))?;
            binder.bind::<u64>().to_instance(Arc::new(64))?;
            if !extra.is_empty() {
                let items = extra
                    .iter()
                    .map(|v| binder.bind_item::<i32>().to_instance(Arc::new(*v)))
                    .collect();
                binder.multi_bind::<i32>().to_items(items)?;
            }
            binder.bind::<Server>().to_self()?;
            Ok(())
        })
        .build()
}

#[test]
fn test_parameter_candidates_in_order() {
    let server = server_injector(vec![]).unwrap().get::<Server>().unwrap();
    // Tagged: only the tag is consulted.
    assert_eq!(*server.port, 8080);
    // Untagged: parameter name first, then no name.
    assert_eq!(*server.host, "example.org");
    assert_eq!(*server.timeout, 30);
    // Unbound: default.
    assert_eq!(*server.retries, 3);
    assert_eq!(*server.limit, 64);
    // Unbound variadic: empty.
    assert!(server.extra.is_empty());
}

#[test]
fn test_variadic_parameter_collects_list() {
    let server = server_injector(vec![4, 5, 6]).unwrap().get::<Server>().unwrap();
    let extra: Vec<i32> = server.extra.iter().map(|v| **v).collect();
    assert_eq!(extra, vec![4, 5, 6]);
}

#[test]
fn test_tagged_parameter_ignores_other_candidates() {
    struct Client;
    impl Injectable for Client {
        fn signature() -> Signature {
            Signature::of::<Self>().with(Parameter::of::<u16>("port").named("grpc"))
        }
        fn construct(_: &Arguments) -> DiResult<Self> {
            Ok(Client)
        }
    }

    let err = Injector::builder()
        .bindings("client", |binder| {
            binder.bind::<u16>().to_instance(Arc::new(2))?;
            binder.bind::<u16>().named("port").to_instance(Arc::new(1))?;
            binder.bind::<Client>().to_self()?;
            Ok(())
        })
        .build()
        .unwrap_err();
    match err {
        DiError::NonInjectableType { reason, .. } => assert!(reason.contains("port"), "{reason}"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_missing_parameter_fails_at_build_time() {
    let err = Injector::builder()
        .bindings("greeting", |binder| {
            binder.bind::<Greeting>().to_self()?;
            Ok(())
        })
        .build()
        .unwrap_err();
    assert!(matches!(err, DiError::NonInjectableType { .. }), "{err}");
}

struct Plugin(&'static str);

struct PluginHost {
    plugin: ProviderOf<Plugin>,
}

impl Injectable for PluginHost {
    fn signature() -> Signature {
        Signature::of::<Self>().with(Parameter::new("plugin", TargetType::optional_of::<Plugin>().provider()))
    }
    fn construct(args: &Arguments) -> DiResult<Self> {
        Ok(PluginHost { plugin: args.get_provider("plugin")? })
    }
}

#[test]
fn test_provider_of_optional_parameter_without_binding() {
    let injector = Injector::builder()
        .bindings("host", |binder| {
            binder.bind::<PluginHost>().to_self()?;
            Ok(())
        })
        .build()
        .unwrap();
    let host = injector.get::<PluginHost>().unwrap();
    assert!(host.plugin.get_optional().unwrap().is_none());

    let target = Target::new(TargetType::optional_of::<Plugin>().provider());
    assert!(injector.provider(&target).is_ok());
}

#[test]
fn test_provider_of_optional_parameter_with_binding() {
    let injector = Injector::builder()
        .bindings("host", |binder| {
            binder.bind::<Plugin>().to_instance(Arc::new(Plugin("audit")))?;
            binder.bind::<PluginHost>().to_self()?;
            Ok(())
        })
        .build()
        .unwrap();
    let host = injector.get::<PluginHost>().unwrap();
    assert_eq!(host.plugin.get_optional().unwrap().unwrap().0, "audit");
}

// ===== Lookups =====

mod first {
    pub struct Config(pub &'static str);
}

mod second {
    pub struct Config(pub &'static str);
}

#[test]
fn test_lookup_by_simple_name() {
    let injector = Injector::builder()
        .bindings("config", |binder| {
            binder.bind::<first::Config>().to_instance(Arc::new(first::Config("first")))?;
            Ok(())
        })
        .build()
        .unwrap();

    let value = injector.get_by_name("Config").unwrap();
    assert_eq!(downcast::<first::Config>(&value).unwrap().0, "first");
    assert!(injector.get_by_name("Missing").unwrap_err().is_no_binding());
}

#[test]
fn test_ambiguous_simple_name_fails() {
    let injector = Injector::builder()
        .bindings("config", |binder| {
            binder.bind::<first::Config>().to_instance(Arc::new(first::Config("first")))?;
            binder.bind::<second::Config>().to_instance(Arc::new(second::Config("second")))?;
            Ok(())
        })
        .build()
        .unwrap();

    let err = injector.get_by_name("Config").unwrap_err();
    assert!(matches!(err, DiError::NonInjectableType { .. }), "{err}");
}

#[test]
fn test_optional_and_provider_lookups() {
    let injector = Injector::builder()
        .bindings("app", |binder| {
            binder.bind::<Port>().to_instance(Arc::new(Port(5)))?;
            Ok(())
        })
        .build()
        .unwrap();

    assert_eq!(*injector.get_optional::<Port>().unwrap().unwrap(), Port(5));
    assert!(injector.get_optional::<MyType>().unwrap().is_none());

    let provider = injector.get_provider::<Port>().unwrap();
    assert!(Arc::ptr_eq(&provider.get().unwrap(), &injector.get::<Port>().unwrap()));
    assert!(injector.get_provider::<MyType>().unwrap_err().is_no_binding());

    // Type handles need a constructed type.
    assert!(matches!(
        injector.get_type::<Port>(),
        Err(DiError::NonInjectableType { .. })
    ));
}

#[test]
fn test_registered_targets_in_registration_order() {
    let injector = Injector::builder()
        .bindings("app", |binder| {
            binder.bind::<Port>().to_instance(Arc::new(Port(5)))?;
            binder.bind::<MyType>().to_self()?;
            Ok(())
        })
        .build()
        .unwrap();

    let targets = injector.registered_targets();
    let port = targets.iter().position(|t| *t == Target::of::<Port>()).unwrap();
    let my_type = targets.iter().position(|t| *t == Target::of::<MyType>()).unwrap();
    assert!(port < my_type);
}

// ===== Observers =====

#[test]
fn test_metrics_observer_counts_lookups() {
    let metrics = Arc::new(MetricsObserver::new());
    let injector = Injector::builder()
        .module(module::from_fn("app", |binder| {
            binder.bind::<MyType>().to_self()?;
            Ok(())
        }))
        .observer(metrics.clone())
        .build()
        .unwrap();

    injector.get::<MyType>().unwrap();
    injector.get::<MyType>().unwrap();
    assert!(injector.get::<Port>().is_err());

    assert_eq!(metrics.resolution_count(), 2);
    assert_eq!(metrics.failure_count(), 1);
}
