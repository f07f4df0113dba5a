//! Static signature introspection for bindable callables.
//!
//! Every parameter a bound callable declares must implement [`Param`], which
//! names the parameter's *bare* type (the value stored in the argument
//! container) and how the callee borrows it back out of the container. The
//! same information is rendered at runtime as a [`Signature`].

use std::{
  any::type_name,
  fmt,
  rc::Rc,
  sync::Arc,
};

use smallvec::SmallVec;

/// How a parameter is handed to the callee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
  /// Taken by value. The callee receives its own clone of the bare value.
  Value,
  /// Borrowed immutably (`&T`).
  Shared,
  /// Borrowed mutably (`&mut T`). Mutations land in the argument container
  /// and are eligible for write-back.
  Exclusive,
}

/// A parameter type a bound callable may declare.
///
/// Implemented for `&T`, `&mut T`, `&str` and for value types. Value types are
/// enumerated rather than blanket-implemented; use [`value_types!`] to opt a
/// type of your own in.
///
/// [`value_types!`]: crate::value_types
pub trait Param {
  /// The declared type with the reference removed.
  type Bare: 'static;
  /// What the callee actually receives for a container borrowed for `'a`.
  type Item<'a>;

  const KIND: ParamKind;

  fn project<'a>(bare: &'a mut Self::Bare) -> Self::Item<'a>;
}

/// Shorthand for the item a [`Param`] yields for some borrow of the container.
pub type ParamItem<'a, P> = <P as Param>::Item<'a>;

impl<'r, T: 'static> Param for &'r mut T {
  type Bare = T;
  type Item<'a> = &'a mut T;

  const KIND: ParamKind = ParamKind::Exclusive;

  fn project<'a>(bare: &'a mut T) -> &'a mut T {
    bare
  }
}

impl<'r, T: 'static> Param for &'r T {
  type Bare = T;
  type Item<'a> = &'a T;

  const KIND: ParamKind = ParamKind::Shared;

  fn project<'a>(bare: &'a mut T) -> &'a T {
    bare
  }
}

/// String slices are stored as an owned `String` in the container.
impl<'r> Param for &'r str {
  type Bare = String;
  type Item<'a> = &'a str;

  const KIND: ParamKind = ParamKind::Shared;

  fn project<'a>(bare: &'a mut String) -> &'a str {
    bare.as_str()
  }
}

/// Implements [`Param`] and [`Arg`] for types passed by value.
///
/// The type must be `Clone + 'static`: a by-value parameter receives a clone
/// of the bare value so the container keeps the original for write-back.
///
/// ```rust
/// use the_bus::{
///   Bus,
///   value_types,
/// };
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Point {
///   x: i32,
///   y: i32,
/// }
///
/// value_types!(Point);
///
/// let bus = Bus::new();
/// bus.register("norm1", |p: Point| p.x.abs() + p.y.abs());
/// assert_eq!(bus.call::<i32>("norm1", (Point { x: 3, y: -4 },)).unwrap(), 7);
/// ```
///
/// [`Arg`]: crate::Arg
#[macro_export]
macro_rules! value_types {
  ($($ty:ty),* $(,)?) => {
    $( $crate::__value_type!([] $ty); )*
  };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __value_type {
  ([$($generic:ident),*] $ty:ty) => {
    impl<$($generic: ::std::clone::Clone + 'static),*> $crate::Param for $ty {
      type Bare = $ty;
      type Item<'a> = $ty;

      const KIND: $crate::ParamKind = $crate::ParamKind::Value;

      fn project<'a>(bare: &'a mut $ty) -> $ty {
        ::std::clone::Clone::clone(bare)
      }
    }

    impl<$($generic: ::std::clone::Clone + 'static),*> $crate::Arg for $ty {
      type Bare = $ty;
      type Slot = ();

      fn pack(self) -> ($ty, ()) {
        (self, ())
      }

      fn write_back((): (), _bare: $ty) {}
    }
  };
}

value_types!(
  (),
  bool,
  char,
  i8,
  i16,
  i32,
  i64,
  i128,
  isize,
  u8,
  u16,
  u32,
  u64,
  u128,
  usize,
  f32,
  f64,
  String,
);

crate::__value_type!([T] Vec<T>);
crate::__value_type!([T] Option<T>);
crate::__value_type!([T] Box<T>);
crate::__value_type!([T] Arc<T>);
crate::__value_type!([T] Rc<T>);

/// Runtime description of one declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamInfo {
  pub declared: &'static str,
  pub bare:     &'static str,
  pub kind:     ParamKind,
}

impl ParamInfo {
  pub fn of<P: Param>() -> Self {
    Self {
      declared: type_name::<P>(),
      bare:     type_name::<P::Bare>(),
      kind:     P::KIND,
    }
  }
}

/// An ordered list of declared parameters.
///
/// Implemented for tuples of [`Param`] up to six elements.
pub trait Params {
  /// Tuple of the bare types, in declaration order.
  type Bare: 'static;

  fn describe() -> SmallVec<[ParamInfo; 4]>;
}

macro_rules! impl_params {
  ($($P:ident $p:ident $i:tt),*) => {
    impl<$($P: Param),*> Params for ($($P,)*) {
      type Bare = ($(<$P as Param>::Bare,)*);

      fn describe() -> SmallVec<[ParamInfo; 4]> {
        #[allow(unused_mut)]
        let mut params = SmallVec::new();
        $( params.push(ParamInfo::of::<$P>()); )*
        params
      }
    }
  };
}

crate::all_arities!(impl_params);

/// The receiver half of a bound method's signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiverInfo {
  pub ty:      &'static str,
  pub mutable: bool,
}

/// Runtime rendering of a binding's static signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
  receiver: Option<ReceiverInfo>,
  params:   SmallVec<[ParamInfo; 4]>,
  bare:     &'static str,
  output:   &'static str,
  unit:     bool,
}

impl Signature {
  /// Signature of a free callable.
  pub fn new<P: Params, R: 'static>() -> Self {
    Self {
      receiver: None,
      params:   P::describe(),
      bare:     type_name::<P::Bare>(),
      output:   type_name::<R>(),
      unit:     is_unit::<R>(),
    }
  }

  /// Signature of a method bound to a receiver of type `T`.
  pub fn method<T: 'static, P: Params, R: 'static>(mutable: bool) -> Self {
    Self {
      receiver: Some(ReceiverInfo {
        ty: type_name::<T>(),
        mutable,
      }),
      ..Self::new::<P, R>()
    }
  }

  pub fn params(&self) -> &[ParamInfo] {
    &self.params
  }

  pub fn arity(&self) -> usize {
    self.params.len()
  }

  pub fn receiver(&self) -> Option<ReceiverInfo> {
    self.receiver
  }

  /// Type name of the bare argument tuple a call must supply.
  pub fn bare_args(&self) -> &'static str {
    self.bare
  }

  pub fn output(&self) -> &'static str {
    self.output
  }

  /// Whether the callable produces a result other than `()`.
  pub fn returns_value(&self) -> bool {
    !self.unit
  }

  /// Whether any parameter is a mutable borrow.
  pub fn has_out_params(&self) -> bool {
    self
      .params
      .iter()
      .any(|param| param.kind == ParamKind::Exclusive)
  }
}

impl fmt::Display for Signature {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("fn(")?;
    let mut first = true;
    if let Some(receiver) = self.receiver {
      let prefix = if receiver.mutable { "&mut " } else { "&" };
      write!(f, "{prefix}{}", receiver.ty)?;
      first = false;
    }
    for param in &self.params {
      if !first {
        f.write_str(", ")?;
      }
      f.write_str(param.declared)?;
      first = false;
    }
    f.write_str(")")?;
    if !self.unit {
      write!(f, " -> {}", self.output)?;
    }
    Ok(())
  }
}

pub(crate) fn is_unit<T: 'static>() -> bool {
  std::any::TypeId::of::<T>() == std::any::TypeId::of::<()>()
}
