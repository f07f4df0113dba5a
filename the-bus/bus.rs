use std::sync::Arc;

use foldhash::fast::RandomState;
use hashbrown::{
  HashMap,
  hash_map::Entry,
};
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::{
  config::{
    BusConfig,
    ErrorPolicy,
  },
  error::{
    CallError,
    Result,
  },
  invoker::{
    Callable,
    ErasedInvoker,
    Method,
    MethodMut,
  },
  marshal::{
    ArgContainer,
    Args,
    ReturnSlot,
  },
  signature::{
    Signature,
    is_unit,
  },
};

type Bindings = HashMap<String, Arc<ErasedInvoker>, RandomState>;

static SHARED: Lazy<Bus> = Lazy::new(Bus::new);

/// A string-keyed directory of erased callables.
///
/// Bindings are never removed or replaced: the first registration under a key
/// wins for the lifetime of the bus. The binding map is locked only for
/// lookup and insertion, never while a bound callable runs, so callables may
/// re-enter the bus.
pub struct Bus {
  bindings: RwLock<Bindings>,
  config:   BusConfig,
}

impl Default for Bus {
  fn default() -> Self {
    Self::new()
  }
}

impl Bus {
  /// An empty bus with the default configuration.
  pub fn new() -> Self {
    Self::with_config(BusConfig::default())
  }

  /// An empty bus whose binding map is pre-sized to `config.capacity`.
  pub fn with_config(config: BusConfig) -> Self {
    Self {
      bindings: RwLock::new(HashMap::with_capacity_and_hasher(
        config.capacity,
        RandomState::default(),
      )),
      config,
    }
  }

  /// The process-wide bus, created with the default configuration on first
  /// access.
  pub fn shared() -> &'static Bus {
    &SHARED
  }

  /// The configuration this bus was created with.
  pub fn config(&self) -> &BusConfig {
    &self.config
  }

  pub fn has_key(&self, key: &str) -> bool {
    self.bindings.read().contains_key(key)
  }

  /// Binds a free function or closure to `key`.
  ///
  /// Returns `false` and leaves the existing binding in place if `key` is
  /// already bound. Closures must annotate their parameter types; generic
  /// functions must be instantiated first (`show::<i32>`).
  pub fn register<F, M>(&self, key: impl Into<String>, callable: F) -> bool
  where
    F: Callable<M>,
    M: 'static,
  {
    self.insert(key.into(), || ErasedInvoker::from_callable(callable))
  }

  /// Binds a `&self` method to `key`, dispatching on `receiver`.
  ///
  /// The bus keeps only a weak handle: once every `Arc` to the receiver is
  /// dropped, calls fail with [`CallError::ReceiverDropped`]. The method may
  /// re-enter the bus and call other `&self` bindings on the same receiver.
  pub fn register_method<T, F, M>(
    &self,
    key: impl Into<String>,
    receiver: &Arc<RwLock<T>>,
    method: F,
  ) -> bool
  where
    T: Send + Sync + 'static,
    F: Method<T, M>,
    M: 'static,
  {
    let receiver = Arc::downgrade(receiver);
    self.insert(key.into(), || ErasedInvoker::from_method(receiver, method))
  }

  /// Binds a `&mut self` method to `key`, dispatching on `receiver`.
  ///
  /// The receiver is write-locked while the method runs, so a method that
  /// calls back into a binding on the same receiver deadlocks.
  pub fn register_method_mut<T, F, M>(
    &self,
    key: impl Into<String>,
    receiver: &Arc<RwLock<T>>,
    method: F,
  ) -> bool
  where
    T: Send + Sync + 'static,
    F: MethodMut<T, M>,
    M: 'static,
  {
    let receiver = Arc::downgrade(receiver);
    self.insert(key.into(), || ErasedInvoker::from_method_mut(receiver, method))
  }

  fn insert(&self, key: String, make: impl FnOnce() -> ErasedInvoker) -> bool {
    match self.bindings.write().entry(key) {
      Entry::Occupied(entry) => {
        log::debug!("'{}' is already bound; keeping the existing binding", entry.key());
        false
      },
      Entry::Vacant(entry) => {
        let invoker = make();
        log::debug!("bound '{}' as {}", entry.key(), invoker.signature());
        entry.insert(Arc::new(invoker));
        true
      },
    }
  }

  /// Calls the binding under `key` with a tuple of arguments and returns its
  /// result as `R`.
  ///
  /// `R` and the bare argument types must match the registered signature
  /// exactly (no numeric widening); a mismatch is reported instead of invoking
  /// the callable. Arguments passed as `&mut T` receive the callee's mutations
  /// after the call returns.
  ///
  /// ```rust
  /// use the_bus::Bus;
  ///
  /// fn square_inplace(x: &mut f64) {
  ///   *x *= *x;
  /// }
  ///
  /// let bus = Bus::new();
  /// bus.register("sq", square_inplace);
  ///
  /// let mut v = 3.0;
  /// bus.call::<()>("sq", (&mut v,)).unwrap();
  /// assert_eq!(v, 9.0);
  /// ```
  pub fn call<R: 'static>(&self, key: &str, args: impl Args) -> Result<R> {
    let result = self.dispatch(key, args);
    if let Err(err) = &result {
      log::debug!("call to '{}' failed: {}", key, err);
      if self.config.call_errors == ErrorPolicy::Panic {
        log::warn!("aborting on failed call to '{}'", key);
        panic!("{err}");
      }
    }
    result
  }

  fn dispatch<R: 'static, A: Args>(&self, key: &str, args: A) -> Result<R> {
    let invoker = self
      .bindings
      .read()
      .get(key)
      .cloned()
      .ok_or_else(|| CallError::UnknownKey { key: key.into() })?;

    log::trace!("dispatching '{}' ({})", key, invoker.signature());

    let (mut bare, slots) = args.pack();
    let mut slot: Option<R> = None;
    let ret = if is_unit::<R>() {
      None
    } else {
      Some(ReturnSlot::new(&mut slot))
    };
    invoker.apply(key, ArgContainer::new(&mut bare), ret)?;
    A::write_back(slots, bare);

    // `slot` is only empty here when `R` is `()`: for any other `R` a slot was
    // passed and `apply` filled it or failed.
    match slot {
      Some(value) => Ok(value),
      None => unit().ok_or_else(|| CallError::MissingReturnSlot {
        key:      key.into(),
        declared: invoker.signature().output(),
      }),
    }
  }

  /// Signature of the binding under `key`.
  pub fn signature(&self, key: &str) -> Option<Signature> {
    self
      .bindings
      .read()
      .get(key)
      .map(|invoker| invoker.signature().clone())
  }

  /// Registered keys, in no particular order.
  pub fn keys(&self) -> Vec<String> {
    self.bindings.read().keys().cloned().collect()
  }

  pub fn len(&self) -> usize {
    self.bindings.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.bindings.read().is_empty()
  }
}

impl std::fmt::Debug for Bus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Bus")
      .field("bindings", &self.len())
      .field("config", &self.config)
      .finish()
  }
}

/// `Some(())` as `Option<R>` when `R` is `()`.
fn unit<R: 'static>() -> Option<R> {
  let mut unit = Some(());
  let unit: &mut dyn std::any::Any = &mut unit;
  unit.downcast_mut::<Option<R>>().and_then(Option::take)
}
