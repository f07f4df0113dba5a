use std::sync::Arc;

use parking_lot::RwLock;
use the_bus::{
  Bus,
  CallError,
};

#[derive(Clone)]
struct Base {
  id:   i32,
  step: i32,
}

impl Base {
  fn new(id: i32, step: i32) -> Arc<RwLock<Self>> {
    Arc::new(RwLock::new(Self { id, step }))
  }

  fn base_foo(&mut self, i: &mut i32) {
    *i += self.step;
  }

  fn check_id(&self, id: i32) -> bool {
    id == self.id
  }

  fn set_step(&mut self, step: i32) -> i32 {
    std::mem::replace(&mut self.step, step)
  }
}

fn show(base: &Base) -> String {
  format!("{}:{}", base.id, base.step)
}

#[test]
fn test_same_method_on_two_receivers() {
  let base0 = Base::new(10, 5);
  let base1 = Base::new(20, 100);

  let bus = Bus::new();
  assert!(bus.register_method_mut("base_foo/0", &base0, Base::base_foo));
  assert!(bus.register_method_mut("base_foo/1", &base1, Base::base_foo));

  let mut i = 0;
  bus.call::<()>("base_foo/0", (&mut i,)).unwrap();
  assert_eq!(i, 5);
  bus.call::<()>("base_foo/1", (&mut i,)).unwrap();
  assert_eq!(i, 105);
}

#[test]
fn test_read_only_method_per_receiver() {
  let base0 = Base::new(10, 5);
  let base1 = Base::new(20, 100);

  let bus = Bus::new();
  bus.register_method("check_id/0", &base0, Base::check_id);
  bus.register_method("check_id/1", &base1, Base::check_id);

  assert_eq!(bus.call::<bool>("check_id/0", (10,)), Ok(true));
  assert_eq!(bus.call::<bool>("check_id/0", (20,)), Ok(false));
  assert_eq!(bus.call::<bool>("check_id/1", (10,)), Ok(false));
  assert_eq!(bus.call::<bool>("check_id/1", (20,)), Ok(true));
}

#[test]
fn test_receiver_is_shared_not_copied() {
  let base = Base::new(1, 2);

  let bus = Bus::new();
  bus.register_method_mut("set_step", &base, Base::set_step);
  bus.register_method_mut("base_foo", &base, Base::base_foo);

  assert_eq!(bus.call::<i32>("set_step", (7,)), Ok(2));
  assert_eq!(base.read().step, 7);

  let mut i = 1;
  bus.call::<()>("base_foo", (&mut i,)).unwrap();
  assert_eq!(i, 8);

  base.write().step = 50;
  bus.call::<()>("base_foo", (&mut i,)).unwrap();
  assert_eq!(i, 58);
}

#[test]
fn test_free_function_taking_receiver_type() {
  let bus = Bus::new();
  bus.register("show", show);

  let base = Base::new(10, 5);
  let shown = bus.call::<String>("show", (&*base.read(),));
  assert_eq!(shown, Ok("10:5".to_string()));
}

#[test]
fn test_dropped_receiver() {
  let base = Base::new(3, 1);
  let bus = Bus::new();
  bus.register_method("check_id", &base, Base::check_id);
  drop(base);

  assert_eq!(
    bus.call::<bool>("check_id", (3,)),
    Err(CallError::ReceiverDropped {
      key: "check_id".into(),
    })
  );
}

#[test]
fn test_method_signature() {
  let base = Base::new(0, 0);
  let bus = Bus::new();
  bus.register_method_mut("base_foo", &base, Base::base_foo);

  let sig = bus.signature("base_foo").unwrap();
  let receiver = sig.receiver().unwrap();
  assert!(receiver.mutable);
  assert!(receiver.ty.ends_with("Base"));
  assert!(sig.to_string().ends_with("Base, &mut i32)"));
  assert!(!sig.returns_value());
}
