//! Erasing concrete callables into a uniform invocable shape.
//!
//! [`Callable`], [`Method`] and [`MethodMut`] are implemented for every `Fn`
//! of supported arity whose parameters implement [`Param`]. The `Marker` type
//! parameter is the callable's `fn` pointer signature; it only exists so the
//! per-arity impls do not overlap and is inferred at registration.
//!
//! [`ErasedInvoker`] is the erased form stored by the bus. Its
//! [`apply`](ErasedInvoker::apply) checks the argument container and return
//! slot against the static types captured at construction before running the
//! callable.

use std::{
  fmt,
  sync::{
    Arc,
    Weak,
  },
};

use parking_lot::RwLock;

use crate::{
  error::{
    CallError,
    Result,
  },
  marshal::{
    ArgContainer,
    ReturnSlot,
  },
  signature::{
    Param,
    ParamItem,
    Params,
    Signature,
    is_unit,
  },
};

/// A free function, closure or function object that can be bound to a key.
pub trait Callable<Marker>: Send + Sync + 'static {
  type Params: Params;
  type Output: 'static;

  fn call(&self, bare: &mut <Self::Params as Params>::Bare) -> Self::Output;
}

/// A method taking `&Recv` that can be bound to a key together with a
/// receiver.
pub trait Method<Recv, Marker>: Send + Sync + 'static {
  type Params: Params;
  type Output: 'static;

  fn call(&self, receiver: &Recv, bare: &mut <Self::Params as Params>::Bare) -> Self::Output;
}

/// A method taking `&mut Recv` that can be bound to a key together with a
/// receiver.
pub trait MethodMut<Recv, Marker>: Send + Sync + 'static {
  type Params: Params;
  type Output: 'static;

  fn call(&self, receiver: &mut Recv, bare: &mut <Self::Params as Params>::Bare)
  -> Self::Output;
}

// The first `Fn` bound fixes the declared parameter types during inference. The
// second is the one actually called, on items borrowed from the container;
// `call_inner` selects it.
macro_rules! impl_callable {
  ($($P:ident $p:ident $i:tt),*) => {
    impl<Func, Ret, $($P),*> Callable<fn($($P),*) -> Ret> for Func
    where
      Func: Send + Sync + 'static,
      for<'f> &'f Func: Fn($($P),*) -> Ret + Fn($(ParamItem<'_, $P>),*) -> Ret,
      $($P: Param,)*
      Ret: 'static,
    {
      type Params = ($($P,)*);
      type Output = Ret;

      #[allow(unused_variables)]
      fn call(&self, bare: &mut ($(<$P as Param>::Bare,)*)) -> Ret {
        fn call_inner<Ret, $($P),*>(f: impl Fn($($P),*) -> Ret, $($p: $P),*) -> Ret {
          f($($p),*)
        }
        call_inner(self, $(<$P as Param>::project(&mut bare.$i)),*)
      }
    }

    impl<Func, Recv, Ret, $($P),*> Method<Recv, fn(&Recv, $($P),*) -> Ret> for Func
    where
      Func: Send + Sync + 'static,
      for<'f> &'f Func: Fn(&Recv, $($P),*) -> Ret + Fn(&Recv, $(ParamItem<'_, $P>),*) -> Ret,
      $($P: Param,)*
      Ret: 'static,
    {
      type Params = ($($P,)*);
      type Output = Ret;

      #[allow(unused_variables)]
      fn call(&self, receiver: &Recv, bare: &mut ($(<$P as Param>::Bare,)*)) -> Ret {
        fn call_inner<Recv, Ret, $($P),*>(
          f: impl Fn(&Recv, $($P),*) -> Ret,
          receiver: &Recv,
          $($p: $P),*
        ) -> Ret {
          f(receiver, $($p),*)
        }
        call_inner(self, receiver, $(<$P as Param>::project(&mut bare.$i)),*)
      }
    }

    impl<Func, Recv, Ret, $($P),*> MethodMut<Recv, fn(&mut Recv, $($P),*) -> Ret> for Func
    where
      Func: Send + Sync + 'static,
      for<'f> &'f Func:
        Fn(&mut Recv, $($P),*) -> Ret + Fn(&mut Recv, $(ParamItem<'_, $P>),*) -> Ret,
      $($P: Param,)*
      Ret: 'static,
    {
      type Params = ($($P,)*);
      type Output = Ret;

      #[allow(unused_variables)]
      fn call(&self, receiver: &mut Recv, bare: &mut ($(<$P as Param>::Bare,)*)) -> Ret {
        fn call_inner<Recv, Ret, $($P),*>(
          f: impl Fn(&mut Recv, $($P),*) -> Ret,
          receiver: &mut Recv,
          $($p: $P),*
        ) -> Ret {
          f(receiver, $($p),*)
        }
        call_inner(self, receiver, $(<$P as Param>::project(&mut bare.$i)),*)
      }
    }
  };
}

crate::all_arities!(impl_callable);

/// Erased body of a binding: runs the callable against a container and slot.
pub type ApplyFn =
  dyn Fn(&str, ArgContainer<'_>, Option<ReturnSlot<'_>>) -> Result<()> + Send + Sync;

/// A callable erased to a uniform shape, together with its signature.
pub struct ErasedInvoker {
  signature: Signature,
  apply:     Box<ApplyFn>,
}

impl ErasedInvoker {
  pub fn from_callable<F, M>(callable: F) -> Self
  where
    F: Callable<M>,
    M: 'static,
  {
    Self {
      signature: Signature::new::<F::Params, F::Output>(),
      apply:     erase(move |key, args, ret| {
        apply_checked::<<F::Params as Params>::Bare, F::Output>(key, args, ret, |bare| {
          Ok(<F as Callable<M>>::call(&callable, bare))
        })
      }),
    }
  }

  /// Binds `method` to a receiver the invoker does not own. The receiver is
  /// read-locked for the duration of each call. The read lock is recursive, so
  /// the method may call back into other `&self` bindings on the same receiver
  /// even while a writer is waiting.
  pub fn from_method<T, F, M>(receiver: Weak<RwLock<T>>, method: F) -> Self
  where
    T: Send + Sync + 'static,
    F: Method<T, M>,
    M: 'static,
  {
    Self {
      signature: Signature::method::<T, F::Params, F::Output>(false),
      apply:     erase(move |key, args, ret| {
        apply_checked::<<F::Params as Params>::Bare, F::Output>(key, args, ret, |bare| {
          let receiver = upgrade(&receiver, key)?;
          let receiver = receiver.read_recursive();
          Ok(<F as Method<T, M>>::call(&method, &receiver, bare))
        })
      }),
    }
  }

  /// Like [`from_method`](Self::from_method), but write-locks the receiver.
  pub fn from_method_mut<T, F, M>(receiver: Weak<RwLock<T>>, method: F) -> Self
  where
    T: Send + Sync + 'static,
    F: MethodMut<T, M>,
    M: 'static,
  {
    Self {
      signature: Signature::method::<T, F::Params, F::Output>(true),
      apply:     erase(move |key, args, ret| {
        apply_checked::<<F::Params as Params>::Bare, F::Output>(key, args, ret, |bare| {
          let receiver = upgrade(&receiver, key)?;
          let mut receiver = receiver.write();
          Ok(<F as MethodMut<T, M>>::call(&method, &mut receiver, bare))
        })
      }),
    }
  }

  pub fn signature(&self) -> &Signature {
    &self.signature
  }

  /// Runs the bound callable. `key` is only used to label errors.
  ///
  /// Fails without invoking anything if the container does not hold exactly
  /// the declared bare argument tuple, if the slot does not match the declared
  /// output, if no slot is supplied for a value-returning callable, or if a
  /// bound receiver is gone.
  pub fn apply(
    &self,
    key: &str,
    args: ArgContainer<'_>,
    ret: Option<ReturnSlot<'_>>,
  ) -> Result<()> {
    (self.apply)(key, args, ret)
  }
}

impl fmt::Debug for ErasedInvoker {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ErasedInvoker")
      .field("signature", &self.signature.to_string())
      .finish_non_exhaustive()
  }
}

fn erase<F>(apply: F) -> Box<ApplyFn>
where
  F: Fn(&str, ArgContainer<'_>, Option<ReturnSlot<'_>>) -> Result<()> + Send + Sync + 'static,
{
  Box::new(apply)
}

fn upgrade<T>(receiver: &Weak<RwLock<T>>, key: &str) -> Result<Arc<RwLock<T>>> {
  receiver.upgrade().ok_or_else(|| CallError::ReceiverDropped { key: key.into() })
}

fn apply_checked<B, R>(
  key: &str,
  args: ArgContainer<'_>,
  ret: Option<ReturnSlot<'_>>,
  call: impl FnOnce(&mut B) -> Result<R>,
) -> Result<()>
where
  B: 'static,
  R: 'static,
{
  let found = args.type_name();
  let bare = args.downcast::<B>().ok_or_else(|| {
    CallError::ArgumentMismatch {
      key: key.into(),
      expected: std::any::type_name::<B>(),
      found,
    }
  })?;

  let slot = match ret {
    Some(slot) => {
      let requested = slot.type_name();
      let slot = slot.downcast::<R>().ok_or_else(|| {
        CallError::ReturnMismatch {
          key: key.into(),
          declared: std::any::type_name::<R>(),
          requested,
        }
      })?;
      Some(slot)
    },
    None if !is_unit::<R>() => {
      return Err(CallError::MissingReturnSlot {
        key:      key.into(),
        declared: std::any::type_name::<R>(),
      });
    },
    None => None,
  };

  let value = call(bare)?;
  if let Some(slot) = slot {
    *slot = Some(value);
  }
  Ok(())
}
