//! # ferrous-wire
//!
//! Module-based dependency injection for Rust: declare bindings in modules,
//! build an injector, and let it construct the object graph.
//!
//! ## Features
//!
//! - **Bindings**: bind a type to itself, to another constructible type, to an instance, or to a factory
//! - **Multi bindings**: contribute items to a list from several modules
//! - **Private modules**: hide internal bindings and expose only selected targets
//! - **Scopes**: per-lookup, singleton, immediate, per-thread and per-context lifetimes
//! - **Composite targets**: lists, sets, tuples, optionals, type handles and providers
//! - **Cycle detection**: construction cycles fail with the full dependency chain
//! - **Eager validation**: every binding is turned into a provider when the injector is built
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_wire::{Arguments, Binder, DiResult, Injectable, Injector, Module, Signature};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: Arc<String>,
//! }
//!
//! impl Injectable for Database {
//!     fn signature() -> Signature {
//!         Signature::of::<Self>().param::<String>("url")
//!     }
//!     fn construct(args: &Arguments) -> DiResult<Self> {
//!         Ok(Database { url: args.get("url")? })
//!     }
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! impl Injectable for UserService {
//!     fn signature() -> Signature {
//!         Signature::of::<Self>().param::<Database>("db")
//!     }
//!     fn construct(args: &Arguments) -> DiResult<Self> {
//!         Ok(UserService { db: args.get("db")? })
//!     }
//! }
//!
//! struct AppModule;
//!
//! impl Module for AppModule {
//!     fn configure(&self, binder: &mut Binder) -> DiResult<()> {
//!         binder.bind::<String>().named("url").to_instance(Arc::new("postgres://localhost".into()))?;
//!         binder.bind::<Database>().to_self()?;
//!         binder.bind::<UserService>().to_self()?;
//!         Ok(())
//!     }
//! }
//!
//! let injector = Injector::new(vec![Box::new(AppModule)]).unwrap();
//! let users = injector.get::<UserService>().unwrap();
//! assert_eq!(*users.db.url, "postgres://localhost");
//!
//! // Singleton is the default scope.
//! assert!(Arc::ptr_eq(&users.db, &injector.get::<Database>().unwrap()));
//! ```
//!
//! ## Parameter Resolution
//!
//! A constructor parameter is looked up, in order, under its name tag if it
//! has one (and nothing else), otherwise under its parameter name and then
//! without a name. Unbound parameters fall back to their default value;
//! variadic parameters fall back to an empty list.
//!
//! ## Multi Bindings
//!
//! ```rust
//! use ferrous_wire::{module, Injector};
//! use std::sync::Arc;
//!
//! trait Plugin: Send + Sync {
//!     fn name(&self) -> &str;
//! }
//!
//! struct Audit;
//! impl Plugin for Audit {
//!     fn name(&self) -> &str {
//!         "audit"
//!     }
//! }
//!
//! struct Metrics;
//! impl Plugin for Metrics {
//!     fn name(&self) -> &str {
//!         "metrics"
//!     }
//! }
//!
//! let core = module::from_fn("core", |binder| {
//!     let audit = binder.bind_item::<dyn Plugin>().to_instance(Arc::new(Audit));
//!     binder.multi_bind::<dyn Plugin>().to_items(vec![audit])?;
//!     Ok(())
//! });
//! let extra = module::from_fn("extra", |binder| {
//!     let metrics = binder.bind_item::<dyn Plugin>().to_instance(Arc::new(Metrics));
//!     binder.multi_bind::<dyn Plugin>().to_items(vec![metrics])?;
//!     Ok(())
//! });
//!
//! let injector = Injector::new(vec![Box::new(core), Box::new(extra)]).unwrap();
//! let names: Vec<_> = injector
//!     .get_list::<dyn Plugin>()
//!     .unwrap()
//!     .iter()
//!     .map(|p| p.name().to_string())
//!     .collect();
//! assert_eq!(names, ["audit", "metrics"]);
//! ```

pub mod binding;
pub mod config;
pub mod error;
pub mod injector;
pub mod key;
pub mod module;
pub mod observer;
pub mod provider;
pub mod scope;
pub mod signature;

mod registration;

pub use binding::{Binding, Factory, FactorySource, ItemBinding, PrivateModuleRef, RegisteredBinding};
pub use config::InjectorOptions;
pub use error::{DiError, DiResult};
pub use injector::{Injector, InjectorBuilder};
pub use key::{Target, TargetType, TypeInfo};
pub use module::{
    Binder, BindingBuilder, ConditionalModule, ItemBuilder, Module, ModuleHandle, MultiBindingBuilder,
    PrivateModule,
};
pub use observer::{DiObserver, MetricsObserver, TracingObserver};
pub use provider::{Provide, Provider, ProviderOf, Value};
pub use scope::{
    ContextGuard, ContextScope, ImmediateScope, PerLookupScope, Scope, ScopeRef, SingletonScope, ThreadScope,
};
pub use signature::{Arguments, Constructor, Injectable, ParamKind, Parameter, Signature};
