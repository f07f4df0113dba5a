//! Packing call-site arguments across the erasure boundary and writing
//! mutations back afterwards.
//!
//! A call never hands the callee a reference into the caller's storage.
//! Instead each argument is packed into a bare value, the callee runs against
//! those values, and every `&mut` argument whose bare value changed is
//! assigned back into the caller's storage.

use std::any::{
  Any,
  type_name,
};

/// One call-site argument.
///
/// - `&mut T` packs a clone and writes a changed value back. This is the only
///   form that observes callee mutations, and it requires
///   `T: Clone + PartialEq`.
/// - `&T` packs a clone and never writes back. `&str` packs an owned
///   `String`.
/// - Value types (see [`value_types!`]) are moved into the container and
///   never write back.
///
/// [`value_types!`]: crate::value_types
pub trait Arg {
  type Bare: 'static;
  /// Caller storage that receives the written-back value, if any.
  type Slot;

  fn pack(self) -> (Self::Bare, Self::Slot);

  fn write_back(slot: Self::Slot, bare: Self::Bare);
}

impl<'r, T> Arg for &'r mut T
where
  T: Clone + PartialEq + 'static,
{
  type Bare = T;
  type Slot = &'r mut T;

  fn pack(self) -> (T, &'r mut T) {
    (T::clone(self), self)
  }

  fn write_back(slot: &'r mut T, bare: T) {
    if *slot != bare {
      *slot = bare;
    }
  }
}

impl<'r, T> Arg for &'r T
where
  T: Clone + 'static,
{
  type Bare = T;
  type Slot = ();

  fn pack(self) -> (T, ()) {
    (T::clone(self), ())
  }

  fn write_back((): (), _bare: T) {}
}

impl<'r> Arg for &'r str {
  type Bare = String;
  type Slot = ();

  fn pack(self) -> (String, ()) {
    (self.to_owned(), ())
  }

  fn write_back((): (), _bare: String) {}
}

/// The full argument list of a call, as a tuple of [`Arg`].
///
/// Implemented for tuples up to six elements. A single argument still needs
/// the trailing comma: `(&mut v,)`.
pub trait Args {
  type Bare: 'static;
  type Slots;

  fn pack(self) -> (Self::Bare, Self::Slots);

  /// Positionally hands each bare value back to its argument.
  fn write_back(slots: Self::Slots, bare: Self::Bare);
}

macro_rules! impl_args {
  ($($A:ident $a:ident $i:tt),*) => {
    impl<$($A: Arg),*> Args for ($($A,)*) {
      type Bare = ($(<$A as Arg>::Bare,)*);
      type Slots = ($(<$A as Arg>::Slot,)*);

      fn pack(self) -> (Self::Bare, Self::Slots) {
        let ($($a,)*) = self;
        $( let $a = <$A as Arg>::pack($a); )*
        (($($a.0,)*), ($($a.1,)*))
      }

      #[allow(unused_variables)]
      fn write_back(slots: Self::Slots, bare: Self::Bare) {
        $( <$A as Arg>::write_back(slots.$i, bare.$i); )*
      }
    }
  };
}

crate::all_arities!(impl_args);

/// The stripped argument container of one call, viewed through the erasure
/// boundary.
pub struct ArgContainer<'a> {
  values:    &'a mut dyn Any,
  type_name: &'static str,
}

impl<'a> ArgContainer<'a> {
  pub fn new<B: 'static>(values: &'a mut B) -> Self {
    Self {
      values,
      type_name: type_name::<B>(),
    }
  }

  pub fn downcast<B: 'static>(self) -> Option<&'a mut B> {
    let values = self.values;
    values.downcast_mut()
  }

  pub fn type_name(&self) -> &'static str {
    self.type_name
  }
}

/// Destination for a callee's result.
pub struct ReturnSlot<'a> {
  slot:      &'a mut dyn Any,
  type_name: &'static str,
}

impl<'a> ReturnSlot<'a> {
  pub fn new<R: 'static>(slot: &'a mut Option<R>) -> Self {
    Self {
      slot,
      type_name: type_name::<R>(),
    }
  }

  pub fn downcast<R: 'static>(self) -> Option<&'a mut Option<R>> {
    let slot = self.slot;
    slot.downcast_mut()
  }

  /// Type name of the result the caller asked for.
  pub fn type_name(&self) -> &'static str {
    self.type_name
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Clone, Debug)]
  struct NoEq(i32);

  #[test]
  fn test_pack_preserves_order() {
    let mut f = 1.5_f32;
    let (bare, _slots) = (1_i32, String::from("s"), &mut f).pack();
    assert_eq!(bare, (1, String::from("s"), 1.5));
  }

  #[test]
  fn test_str_arg_packs_owned_string() {
    let (bare, _slots) = ("char", 1_i32).pack();
    assert_eq!(bare, (String::from("char"), 1));
  }

  #[test]
  fn test_write_back_assigns_changed_value() {
    let mut v = 2.5_f64;
    let ((mut bare,), slots) = (&mut v,).pack();
    bare *= 2.0;
    <(&mut f64,)>::write_back(slots, (bare,));
    assert_eq!(v, 5.0);
  }

  #[test]
  fn test_write_back_leaves_unchanged_value() {
    let mut v = vec![1, 2, 3];
    let (bare, slots) = (&mut v,).pack();
    <(&mut Vec<i32>,)>::write_back(slots, bare);
    assert_eq!(v, vec![1, 2, 3]);
  }

  #[test]
  fn test_shared_arg_never_writes_back() {
    let v = NoEq(1);
    let ((mut bare,), slots) = (&v,).pack();
    bare.0 = 99;
    <(&NoEq,)>::write_back(slots, (bare,));
    assert_eq!(v.0, 1);
  }

  #[test]
  fn test_container_downcast_checks_type() {
    let mut values = (1_i32, 2_i32);
    assert_eq!(ArgContainer::new(&mut values).type_name(), "(i32, i32)");
    assert!(ArgContainer::new(&mut values).downcast::<(i64, i64)>().is_none());
    let container = ArgContainer::new(&mut values);
    let values = container.downcast::<(i32, i32)>();
    assert_eq!(values, Some(&mut (1, 2)));
  }

  #[test]
  fn test_return_slot_downcast_checks_type() {
    let mut slot: Option<bool> = None;
    assert!(ReturnSlot::new(&mut slot).downcast::<i32>().is_none());
    if let Some(slot) = ReturnSlot::new(&mut slot).downcast::<bool>() {
      *slot = Some(true);
    }
    assert_eq!(slot, Some(true));
  }
}
