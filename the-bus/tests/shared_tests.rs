use std::{
  sync::{
    Arc,
    mpsc,
  },
  thread,
  time::Duration,
};

use parking_lot::RwLock;
use the_bus::Bus;

struct Node {
  value: i32,
}

impl Node {
  fn new(value: i32) -> Arc<RwLock<Self>> {
    Arc::new(RwLock::new(Self { value }))
  }

  fn get(&self) -> i32 {
    self.value
  }

  fn set(&mut self, value: i32) {
    self.value = value;
  }
}

#[test]
fn test_shared_instance_identity() {
  let inst0 = Bus::shared();
  let inst1 = Bus::shared();
  assert!(std::ptr::eq(inst0, inst1));

  assert!(inst0.register("shared/identity", || "same"));
  assert!(inst1.has_key("shared/identity"));
  assert_eq!(inst1.call::<&str>("shared/identity", ()), Ok("same"));
}

#[test]
fn test_shared_instance_keeps_first_registration() {
  assert!(Bus::shared().register("shared/first", || 1_i32));
  assert!(!Bus::shared().register("shared/first", || 2_i32));
  assert_eq!(Bus::shared().call::<i32>("shared/first", ()), Ok(1));
}

#[test]
fn test_reentrant_call() {
  let bus = Arc::new(Bus::new());
  bus.register("inc", |i: i32| i + 1);
  bus.register("twice", {
    let bus = bus.clone();
    move |i: i32| -> i32 {
      let once = bus.call::<i32>("inc", (i,)).unwrap();
      bus.call::<i32>("inc", (once,)).unwrap()
    }
  });

  assert_eq!(bus.call::<i32>("twice", (1,)), Ok(3));
}

#[test]
fn test_recursive_call_on_same_key() {
  fn factorial(bus: &Bus, n: u64) -> u64 {
    if n <= 1 {
      1
    } else {
      n * bus.call::<u64>("factorial", (n - 1,)).unwrap()
    }
  }

  let bus = Arc::new(Bus::new());
  bus.register("factorial", {
    let bus = bus.clone();
    move |n: u64| factorial(&bus, n)
  });

  assert_eq!(bus.call::<u64>("factorial", (5_u64,)), Ok(120));
}

#[test]
fn test_register_from_inside_a_callee() {
  let bus = Arc::new(Bus::new());
  bus.register("install", {
    let bus = bus.clone();
    move |key: String, value: i32| bus.register(key, move || value)
  });

  assert_eq!(
    bus.call::<bool>("install", (String::from("installed"), 9)),
    Ok(true)
  );
  assert_eq!(bus.call::<i32>("installed", ()), Ok(9));
}

#[test]
fn test_calls_from_many_threads() {
  let bus = Arc::new(Bus::new());
  bus.register("square", |x: u64| x * x);

  let handles: Vec<_> = (0..8_u64)
    .map(|t| {
      let bus = bus.clone();
      thread::spawn(move || {
        let mut total = 0;
        for x in 0..100_u64 {
          total += bus.call::<u64>("square", (x + t,)).unwrap();
        }
        total
      })
    })
    .collect();

  let expected: u64 = (0..8_u64)
    .map(|t| (0..100_u64).map(|x| (x + t) * (x + t)).sum::<u64>())
    .sum();
  let total: u64 = handles
    .into_iter()
    .map(|handle| handle.join().unwrap())
    .sum();
  assert_eq!(total, expected);
}

#[test]
fn test_read_only_method_calls_free_binding() {
  let node = Node::new(21);
  let bus = Arc::new(Bus::new());
  bus.register("double", |x: i32| x * 2);
  bus.register_method("doubled", &node, {
    let bus = bus.clone();
    move |node: &Node| bus.call::<i32>("double", (node.value,)).unwrap()
  });

  assert_eq!(bus.call::<i32>("doubled", ()), Ok(42));
}

#[test]
fn test_read_only_method_reenters_same_receiver() {
  let node = Node::new(5);
  let bus = Arc::new(Bus::new());
  bus.register_method("get", &node, Node::get);
  bus.register_method("get_plus", &node, {
    let bus = bus.clone();
    move |_node: &Node, by: i32| bus.call::<i32>("get", ()).unwrap() + by
  });

  assert_eq!(bus.call::<i32>("get_plus", (3,)), Ok(8));
}

#[test]
fn test_reentrant_read_only_method_with_queued_writer() {
  let node = Node::new(1);
  let bus = Arc::new(Bus::new());
  bus.register_method("get", &node, Node::get);
  bus.register_method_mut("set", &node, Node::set);

  let (entered_tx, entered_rx) = mpsc::channel();
  bus.register_method("outer", &node, {
    let bus = bus.clone();
    move |_node: &Node| -> String {
      let _ = entered_tx.send(());
      // Leave time for the writer below to queue on the receiver.
      thread::sleep(Duration::from_millis(200));
      format!("outer={:?}", bus.call::<i32>("get", ()))
    }
  });

  let (done_tx, done_rx) = mpsc::channel();
  let outer = thread::spawn({
    let bus = bus.clone();
    move || {
      let _ = done_tx.send(bus.call::<String>("outer", ()));
    }
  });

  entered_rx.recv_timeout(Duration::from_secs(3)).unwrap();
  let writer = thread::spawn({
    let bus = bus.clone();
    move || bus.call::<()>("set", (2,))
  });

  assert_eq!(
    done_rx.recv_timeout(Duration::from_secs(3)),
    Ok(Ok("outer=Ok(1)".to_string()))
  );
  outer.join().unwrap();
  assert_eq!(writer.join().unwrap(), Ok(()));
  assert_eq!(node.read().value, 2);
}
