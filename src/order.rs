use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

// native temperature category, assigned at order creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Temperature {
    Hot,
    Cold,
    Frozen,
}

// shelf category, including overflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShelfTemperature {
    Hot,
    Cold,
    Frozen,
    Overflow,
}

impl From<Temperature> for ShelfTemperature {
    fn from(t: Temperature) -> Self {
        match t {
            Temperature::Hot => ShelfTemperature::Hot,
            Temperature::Cold => ShelfTemperature::Cold,
            Temperature::Frozen => ShelfTemperature::Frozen,
        }
    }
}

// only compare_and_set / set_state are allowed to touch this
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OrderState {
    Created = 0,
    StoredInRegular = 1,
    StoredInOverflow = 2,
    ExpiredInRegular = 3,
    ExpiredInOverflow = 4,
    ExpiredOnNoSpace = 5,
    CameExpired = 6,
    PickedUpForDelivery = 7,
}

impl OrderState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => OrderState::Created,
            1 => OrderState::StoredInRegular,
            2 => OrderState::StoredInOverflow,
            3 => OrderState::ExpiredInRegular,
            4 => OrderState::ExpiredInOverflow,
            5 => OrderState::ExpiredOnNoSpace,
            6 => OrderState::CameExpired,
            7 => OrderState::PickedUpForDelivery,
            other => unreachable!("invalid OrderState tag {other}"),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderState::ExpiredInRegular
                | OrderState::ExpiredInOverflow
                | OrderState::ExpiredOnNoSpace
                | OrderState::CameExpired
                | OrderState::PickedUpForDelivery
        )
    }
}

#[derive(Debug)]
pub struct Order {
    pub id: String,
    pub name: String,
    pub temperature: Temperature,
    pub shelf_life_secs: u32,
    pub decay_rate: f64,
    pub created_at_ms: i64,
    state: AtomicU8,
    time_spent_on_overflow_ms: AtomicI64,
}

impl Order {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        temperature: Temperature,
        shelf_life_secs: u32,
        decay_rate: f64,
        created_at_ms: i64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            temperature,
            shelf_life_secs,
            decay_rate,
            created_at_ms,
            state: AtomicU8::new(OrderState::Created as u8),
            time_spent_on_overflow_ms: AtomicI64::new(0),
        }
    }

    pub fn state(&self) -> OrderState {
        OrderState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, new: OrderState) {
        self.state.store(new as u8, Ordering::Release);
    }

    // false means someone else already moved this order on
    pub fn compare_and_set(&self, old: OrderState, new: OrderState) -> bool {
        self.state
            .compare_exchange(old as u8, new as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn time_spent_on_overflow_ms(&self) -> i64 {
        self.time_spent_on_overflow_ms.load(Ordering::Acquire)
    }

    pub fn set_time_spent_on_overflow_ms(&self, value_ms: i64) {
        self.time_spent_on_overflow_ms.store(value_ms, Ordering::Release);
    }

    // value(age) = shelf_life_secs*1000 - age_ms - decay_rate*factor*age_ms
    pub fn current_value_ms(&self, now_ms: i64, factor: f64) -> f64 {
        let age_ms = (now_ms - self.created_at_ms) as f64;
        self.shelf_life_secs as f64 * 1000.0 - age_ms - self.decay_rate * factor * age_ms
    }

    pub fn has_expired(&self, now_ms: i64, factor: f64) -> bool {
        self.current_value_ms(now_ms, factor) <= 0.0
    }

    // subtracting time already spent on overflow keeps promotion from
    // refreshing decay that already happened there
    pub fn expiry_at_ms(&self, now_ms: i64, factor: f64) -> i64 {
        self.created_at_ms + self.current_value_ms(now_ms, factor) as i64
            - self.time_spent_on_overflow_ms()
    }

    pub fn normalized_value(&self, now_ms: i64, factor: f64) -> f64 {
        let full = self.shelf_life_secs as f64 * 1000.0;
        if full <= 0.0 {
            return 0.0;
        }
        (self.current_value_ms(now_ms, factor) / full).clamp(0.0, 1.0)
    }

    pub fn deep_copy(&self) -> OrderSnapshot {
        OrderSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            temperature: self.temperature,
            shelf_life_secs: self.shelf_life_secs,
            decay_rate: self.decay_rate,
            created_at_ms: self.created_at_ms,
            state: self.state(),
            time_spent_on_overflow_ms: self.time_spent_on_overflow_ms(),
        }
    }
}

// equal iff id, name, temperature and shelf life match
impl PartialEq for Order {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.temperature == other.temperature
            && self.shelf_life_secs == other.shelf_life_secs
    }
}
impl Eq for Order {}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderSnapshot {
    pub id: String,
    pub name: String,
    pub temperature: Temperature,
    pub shelf_life_secs: u32,
    pub decay_rate: f64,
    pub created_at_ms: i64,
    pub state: OrderState,
    pub time_spent_on_overflow_ms: i64,
}

// wire shape for the order file reader
#[derive(Debug, Clone, Deserialize)]
pub struct OrderSpec {
    pub id: String,
    pub name: String,
    pub temp: Temperature,
    pub shelf_life_secs: u32,
    pub decay_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(shelf_life_secs: u32, decay_rate: f64) -> Order {
        Order::new("A", "Banana Split", Temperature::Hot, shelf_life_secs, decay_rate, 0)
    }

    #[test]
    fn remaining_value_decays_with_age_and_factor() {
        let o = order(300, 0.45);
        // value(age) = 300_000 - age - 0.45*factor*age
        assert_eq!(o.current_value_ms(0, 1.0) as i64, 300_000);
        let at_10s = o.current_value_ms(10_000, 1.0);
        assert_eq!(at_10s as i64, 300_000 - 10_000 - (0.45 * 10_000.0) as i64);
    }

    #[test]
    fn overflow_factor_decays_faster_than_native() {
        let o = order(300, 0.45);
        let native = o.current_value_ms(60_000, 1.0);
        let overflow = o.current_value_ms(60_000, 2.0);
        assert!(overflow < native);
    }

    #[test]
    fn has_expired_is_current_value_non_positive() {
        let o = order(1, 0.0);
        assert!(!o.has_expired(0, 1.0));
        assert!(o.has_expired(1_001, 1.0));
    }

    #[test]
    fn came_expired_shelf_life_zero() {
        let o = order(0, 0.0);
        assert!(o.has_expired(0, 1.0));
    }

    #[test]
    fn promotion_ceiling_is_enforced_by_time_spent_on_overflow() {
        let o = order(300, 0.45);
        // simulate 20s spent in overflow (factor 2) before promotion
        let overflow_expiry_before = o.expiry_at_ms(20_000, 2.0);
        o.set_time_spent_on_overflow_ms(20_000);
        let native_expiry_after = o.expiry_at_ms(20_000, 1.0);
        assert!(native_expiry_after <= overflow_expiry_before);
    }

    #[test]
    fn state_transitions_are_cas_guarded() {
        let o = order(300, 0.0);
        assert_eq!(o.state(), OrderState::Created);
        assert!(o.compare_and_set(OrderState::Created, OrderState::StoredInRegular));
        assert!(!o.compare_and_set(OrderState::Created, OrderState::StoredInOverflow));
        assert_eq!(o.state(), OrderState::StoredInRegular);
    }

    #[test]
    fn terminal_states_are_recognized() {
        assert!(OrderState::PickedUpForDelivery.is_terminal());
        assert!(OrderState::CameExpired.is_terminal());
        assert!(!OrderState::StoredInRegular.is_terminal());
        assert!(!OrderState::Created.is_terminal());
    }

    #[test]
    fn equality_is_over_id_name_temperature_and_shelf_life() {
        let a = Order::new("1", "Soup", Temperature::Hot, 300, 0.5, 0);
        let b = Order::new("1", "Soup", Temperature::Hot, 300, 0.9, 1_000);
        assert_eq!(a, b);
        let c = Order::new("1", "Soup", Temperature::Cold, 300, 0.5, 0);
        assert_ne!(a, c);
    }
}
