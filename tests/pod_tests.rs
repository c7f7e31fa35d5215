use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shelfpod::{
    AddResult, ManualClock, Order, OrderState, Shelf, ShelfObserver, ShelfPod, ShelfPodConfig,
    ShelfTemperature, SystemClock, Temperature,
};

fn config(hot: usize, cold: usize, frozen: usize, overflow: usize, overflow_decay: f64) -> ShelfPodConfig {
    ShelfPodConfig {
        shelves: vec![
            Shelf::new("hot", hot, ShelfTemperature::Hot, 1.0),
            Shelf::new("cold", cold, ShelfTemperature::Cold, 1.0),
            Shelf::new("frozen", frozen, ShelfTemperature::Frozen, 1.0),
            Shelf::new("overflow", overflow, ShelfTemperature::Overflow, overflow_decay),
        ],
    }
}

fn hot_order(id: &str, shelf_life_secs: u32, decay_rate: f64, now_ms: i64) -> Arc<Order> {
    Arc::new(Order::new(id, "order", Temperature::Hot, shelf_life_secs, decay_rate, now_ms))
}

#[test]
fn scenario_1_add_single_poll_single() {
    let clock = Arc::new(ManualClock::new(0));
    let pod = ShelfPod::new(config(1, 1, 1, 1, 2.0), clock.clone()).unwrap();

    let order = hot_order("A", 300, 0.45, 0);
    let result = pod.add_order(order);
    assert!(result.added);
    assert_eq!(result.state, OrderState::StoredInRegular);

    let picked = pod.poll_order().expect("should return the order");
    assert_eq!(picked.id, "A");
    assert_eq!(picked.state(), OrderState::PickedUpForDelivery);

    assert!(pod.poll_order().is_none());
}

#[test]
fn scenario_2_native_priority_orders_by_expiry_then_id() {
    let clock = Arc::new(ManualClock::new(0));
    let pod = ShelfPod::new(config(2, 1, 1, 1, 2.0), clock.clone()).unwrap();

    pod.add_order(hot_order("B", 300, 0.0, 0));
    pod.add_order(hot_order("A", 200, 0.0, 0));

    let first = pod.poll_order().unwrap();
    assert_eq!(first.id, "A");
    let second = pod.poll_order().unwrap();
    assert_eq!(second.id, "B");
}

#[test]
fn scenario_3_overflow_placement_drains_in_expiry_order() {
    let clock = Arc::new(ManualClock::new(0));
    // Hot capacity 1, overflow capacity 3: first order native, next three overflow.
    let pod = ShelfPod::new(config(1, 1, 1, 3, 2.0), clock.clone()).unwrap();

    let r1 = pod.add_order(hot_order("W", 300, 0.0, 0));
    let r2 = pod.add_order(hot_order("X", 299, 0.0, 0));
    let r3 = pod.add_order(hot_order("Y", 298, 0.0, 0));
    let r4 = pod.add_order(hot_order("Z", 297, 0.0, 0));

    assert!(r1.added && r1.shelf == ShelfTemperature::Hot);
    assert!(r2.added && r2.shelf == ShelfTemperature::Overflow);
    assert!(r3.added && r3.shelf == ShelfTemperature::Overflow);
    assert!(r4.added && r4.shelf == ShelfTemperature::Overflow);

    // All four were enqueued at age zero, so expiry order here tracks
    // shelf life directly: the shortest-lived order drains first
    // regardless of which shelf (hot or overflow) it landed on.
    let order_of_pickup: Vec<String> =
        (0..4).map(|_| pod.poll_order().unwrap().id.clone()).collect();
    assert_eq!(order_of_pickup, vec!["Z", "Y", "X", "W"]);
}

#[test]
fn scenario_4_expired_on_no_space() {
    let clock = Arc::new(ManualClock::new(0));
    let pod = ShelfPod::new(config(2, 1, 1, 2, 2.0), clock.clone()).unwrap();

    for (idx, life) in [300u32, 300, 299, 299].into_iter().enumerate() {
        let id = format!("order-{idx}");
        let result = pod.add_order(hot_order(&id, life, 0.0, 0));
        assert!(result.added, "order {id} should have been admitted");
    }

    let fifth = pod.add_order(hot_order("order-4", 298, 0.0, 0));
    assert!(!fifth.added);
    assert_eq!(fifth.state, OrderState::ExpiredOnNoSpace);
}

#[test]
fn scenario_5_came_expired_on_submission() {
    let clock = Arc::new(ManualClock::new(0));
    let pod = ShelfPod::new(config(1, 1, 1, 1, 2.0), clock).unwrap();

    let result = pod.add_order(hot_order("A", 0, 0.0, 0));
    assert!(!result.added);
    assert_eq!(result.state, OrderState::CameExpired);
}

#[tokio::test(flavor = "multi_thread")]
async fn scenario_6_mover_promotes_overflow_order_when_capacity_frees() {
    let pod = ShelfPod::new(config(1, 1, 1, 2, 2.0), Arc::new(SystemClock)).unwrap();
    pod.start_background_activities();

    let near = pod.add_order(hot_order("near", 100, 0.0, now_ms()));
    assert_eq!(near.state, OrderState::StoredInRegular);

    let far = pod.add_order(hot_order("far", 300, 0.0, now_ms()));
    assert_eq!(far.state, OrderState::StoredInOverflow);

    let first = pod.poll_order().expect("near order should be ready");
    assert_eq!(first.id, "near");

    // Bounded settle window for the mover to observe the freed permit.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let second = pod.poll_order().expect("mover should have promoted far");
    assert_eq!(second.id, "far");
    assert_eq!(second.state(), OrderState::PickedUpForDelivery);

    pod.stop_background_activities().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn scenario_7_expirer_retires_without_a_poll() {
    let pod = ShelfPod::new(config(1, 1, 1, 1, 10.0), Arc::new(SystemClock)).unwrap();
    pod.start_background_activities();

    // Saturate the hot shelf so this order lands in overflow, where the
    // decay factor of 10 burns through a 1-second shelf life almost
    // immediately.
    pod.add_order(hot_order("blocker", 600, 0.0, now_ms()));
    let short = hot_order("short-lived", 1, 0.0, now_ms());
    let result = pod.add_order(short.clone());
    assert_eq!(result.shelf, ShelfTemperature::Overflow);

    tokio::time::sleep(Duration::from_millis(1_300)).await;

    assert_eq!(short.state(), OrderState::ExpiredInOverflow);

    pod.stop_background_activities().await;
}

struct RecordingObserver {
    seen: Mutex<Vec<AddResult>>,
    calls: AtomicUsize,
}

impl RecordingObserver {
    fn new() -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }
}

impl ShelfObserver for RecordingObserver {
    fn post_add_order(&self, result: &AddResult) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(result.clone());
    }
}

#[test]
fn scenario_8_observer_fan_out() {
    let clock = Arc::new(ManualClock::new(0));
    let pod = ShelfPod::new(config(1, 1, 1, 1, 2.0), clock).unwrap();

    let observer = Arc::new(RecordingObserver::new());
    let handle = pod.add_observer(observer.clone());

    let result = pod.add_order(hot_order("A", 300, 0.0, 0));
    assert_eq!(observer.calls.load(Ordering::SeqCst), 1);
    assert_eq!(observer.seen.lock().unwrap()[0], result);

    pod.remove_observer(handle);
    pod.add_order(hot_order("B", 300, 0.0, 0));
    assert_eq!(observer.calls.load(Ordering::SeqCst), 1);
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}
