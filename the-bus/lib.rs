//! # the-bus
//!
//! An in-process, string-keyed call registry.
//!
//! Components bind callables (free functions, closures, methods on a shared
//! receiver) to a name, and other components call them by name later with
//! arguments whose types are only known at the call site.
//!
//! ## Core Concepts
//!
//! - **Bindings**: a key and an erased invoker. The first registration under a
//!   key wins; bindings are never removed.
//! - **Erasure**: each callable is stored behind one uniform shape. Its
//!   parameter and return types are captured at registration and checked on
//!   every call, so a mismatched call is an error, not undefined behavior.
//! - **Write-back**: arguments are copied into a container of bare values
//!   before the call. Afterwards every argument passed as `&mut T` is
//!   compared with its bare value and assigned if the callee changed it.
//!
//! ## Basic Usage
//!
//! ```rust
//! use the_bus::Bus;
//!
//! fn add(a: i32, b: i32) -> i32 {
//!   a + b
//! }
//!
//! fn double(x: &mut f64) {
//!   *x *= 2.0;
//! }
//!
//! let bus = Bus::new();
//! assert!(bus.register("add", add));
//! assert!(bus.register("double", double));
//!
//! assert_eq!(bus.call::<i32>("add", (2, 3)).unwrap(), 5);
//!
//! let mut v = 2.5;
//! bus.call::<()>("double", (&mut v,)).unwrap();
//! assert_eq!(v, 5.0);
//!
//! // The earlier binding is kept.
//! assert!(!bus.register("add", |a: i32, b: i32| a * b));
//! assert_eq!(bus.call::<i32>("add", (2, 3)).unwrap(), 5);
//! ```
//!
//! ## Methods
//!
//! Methods are bound to a receiver held in an `Arc<RwLock<T>>`. The bus keeps
//! a weak handle only; the receiver's owner decides how long it lives.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use parking_lot::RwLock;
//! use the_bus::Bus;
//!
//! struct Base {
//!   id:   i32,
//!   step: i32,
//! }
//!
//! impl Base {
//!   fn advance(&mut self, i: &mut i32) {
//!     *i += self.step;
//!   }
//!
//!   fn check_id(&self, id: i32) -> bool {
//!     id == self.id
//!   }
//! }
//!
//! let base = Arc::new(RwLock::new(Base { id: 10, step: 5 }));
//! let bus = Bus::new();
//! bus.register_method_mut("advance", &base, Base::advance);
//! bus.register_method("check_id", &base, Base::check_id);
//!
//! let mut i = 0;
//! bus.call::<()>("advance", (&mut i,)).unwrap();
//! assert_eq!(i, 5);
//! assert!(bus.call::<bool>("check_id", (10,)).unwrap());
//! ```
//!
//! ## Errors
//!
//! [`Bus::call`] returns [`CallError`] for unknown keys, argument or return
//! type mismatches, a missing return slot (calling a value-returning binding
//! as `()`), and dropped receivers. Setting
//! [`BusConfig::call_errors`] to [`ErrorPolicy::Panic`] turns these into
//! panics for applications that register everything up front.

/// Invokes `$mac!` once per supported arity with `Type ident index` triples.
macro_rules! all_arities {
  ($mac:ident) => {
    $mac!();
    $mac!(P0 p0 0);
    $mac!(P0 p0 0, P1 p1 1);
    $mac!(P0 p0 0, P1 p1 1, P2 p2 2);
    $mac!(P0 p0 0, P1 p1 1, P2 p2 2, P3 p3 3);
    $mac!(P0 p0 0, P1 p1 1, P2 p2 2, P3 p3 3, P4 p4 4);
    $mac!(P0 p0 0, P1 p1 1, P2 p2 2, P3 p3 3, P4 p4 4, P5 p5 5);
  };
}

pub(crate) use all_arities;

mod bus;
mod config;
mod error;
mod invoker;
mod marshal;
mod signature;

pub use bus::Bus;
pub use config::{
  BusConfig,
  ErrorPolicy,
};
pub use error::{
  CallError,
  ConfigError,
  Result,
};
pub use invoker::{
  ApplyFn,
  Callable,
  ErasedInvoker,
  Method,
  MethodMut,
};
pub use marshal::{
  Arg,
  ArgContainer,
  Args,
  ReturnSlot,
};
pub use signature::{
  Param,
  ParamInfo,
  ParamItem,
  ParamKind,
  Params,
  ReceiverInfo,
  Signature,
};
