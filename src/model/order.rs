use crate::clock::Clock;
use crate::model::{DecodeError, ShelfClass};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::hash::{Hash, Hasher};
use std::time::Instant;

/// Type-safe identifier for Orders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl From<&str> for OrderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for OrderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A perishable order waiting on a shelf for pickup.
///
/// Identity and decay parameters are fixed at construction. Freshness is never
/// stored; it is recomputed from the creation instant whenever it is asked for:
///
/// ```text
/// freshness(now) = (shelf_life - decay_rate * age_seconds * decay_modifier) / shelf_life
/// ```
///
/// `age_seconds` is the whole number of seconds since creation. An order is
/// expired once its freshness reaches zero.
///
/// # Equality
/// Two orders are equal when `id`, `name`, `shelf_class`, `shelf_life` and
/// `decay_rate` match. The creation instant is not part of identity, so two
/// snapshots of the same logical order compare (and hash) equal.
#[derive(Debug, Clone)]
pub struct Order {
    id: OrderId,
    name: String,
    shelf_class: ShelfClass,
    shelf_life: u32,
    decay_rate: f64,
    created_at: Instant,
}

/// JSON shape of an order as it arrives at the ingestion boundary.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderWire {
    id: String,
    name: String,
    temp: ShelfClass,
    shelf_life: u32,
    decay_rate: f64,
}

impl Order {
    /// Creates an order stamped with the current system time.
    pub fn new(
        id: impl Into<OrderId>,
        name: impl Into<String>,
        shelf_class: ShelfClass,
        shelf_life: u32,
        decay_rate: f64,
    ) -> Self {
        Self::created_at(id, name, shelf_class, shelf_life, decay_rate, Instant::now())
    }

    /// Creates an order stamped by `clock`.
    pub fn with_clock(
        id: impl Into<OrderId>,
        name: impl Into<String>,
        shelf_class: ShelfClass,
        shelf_life: u32,
        decay_rate: f64,
        clock: &dyn Clock,
    ) -> Self {
        Self::created_at(id, name, shelf_class, shelf_life, decay_rate, clock.now())
    }

    /// Creates an order with an explicit creation instant.
    pub fn created_at(
        id: impl Into<OrderId>,
        name: impl Into<String>,
        shelf_class: ShelfClass,
        shelf_life: u32,
        decay_rate: f64,
        created_at: Instant,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            shelf_class,
            shelf_life,
            decay_rate,
            created_at,
        }
    }

    /// Decodes an order from its JSON wire form, stamping it with the system time.
    ///
    /// ```rust
    /// use kitchen_shelves::model::{Order, ShelfClass};
    ///
    /// let order = Order::from_json(
    ///     r#"{"id":"a1","name":"Chocolate Gelato","temp":"frozen","shelfLife":300,"decayRate":0.61}"#,
    /// ).unwrap();
    /// assert_eq!(order.shelf_class(), ShelfClass::Frozen);
    /// assert_eq!(order.shelf_life(), 300);
    /// ```
    pub fn from_json(text: &str) -> Result<Self, DecodeError> {
        Self::from_json_at(text, Instant::now())
    }

    /// Decodes an order from its JSON wire form with an explicit creation instant.
    pub fn from_json_at(text: &str, created_at: Instant) -> Result<Self, DecodeError> {
        let wire: OrderWire = serde_json::from_str(text)?;

        if wire.id.trim().is_empty() {
            return Err(DecodeError::InvalidField {
                field: "id",
                reason: "must not be empty".to_string(),
            });
        }
        if wire.shelf_life == 0 {
            return Err(DecodeError::InvalidField {
                field: "shelfLife",
                reason: "must be greater than zero".to_string(),
            });
        }
        if !(wire.decay_rate.is_finite() && wire.decay_rate > 0.0) {
            return Err(DecodeError::InvalidField {
                field: "decayRate",
                reason: format!("must be a positive number, got {}", wire.decay_rate),
            });
        }

        Ok(Self::created_at(
            wire.id,
            wire.name,
            wire.temp,
            wire.shelf_life,
            wire.decay_rate,
            created_at,
        ))
    }

    /// Encodes the identity fields back into the wire form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&OrderWire {
            id: self.id.0.clone(),
            name: self.name.clone(),
            temp: self.shelf_class,
            shelf_life: self.shelf_life,
            decay_rate: self.decay_rate,
        })
    }

    pub fn id(&self) -> &OrderId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shelf_class(&self) -> ShelfClass {
        self.shelf_class
    }

    pub fn shelf_life(&self) -> u32 {
        self.shelf_life
    }

    pub fn decay_rate(&self) -> f64 {
        self.decay_rate
    }

    pub fn created_at_instant(&self) -> Instant {
        self.created_at
    }

    /// Whole seconds elapsed between creation and `now` (zero if `now` is earlier).
    pub fn age_seconds(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.created_at).as_secs()
    }

    /// Remaining freshness at `now`. Pure: repeated calls with the same `now`
    /// return the same value.
    pub fn freshness_at(&self, now: Instant) -> f64 {
        if self.shelf_life == 0 {
            return 0.0;
        }
        let shelf_life = f64::from(self.shelf_life);
        let age = self.age_seconds(now) as f64;
        (shelf_life - self.decay_rate * age * self.shelf_class.decay_modifier()) / shelf_life
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.freshness_at(now) <= 0.0
    }
}

impl PartialEq for Order {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.shelf_class == other.shelf_class
            && self.shelf_life == other.shelf_life
            && self.decay_rate.to_bits() == other.decay_rate.to_bits()
    }
}

impl Eq for Order {}

impl Hash for Order {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.name.hash(state);
        self.shelf_class.hash(state);
        self.shelf_life.hash(state);
        self.decay_rate.to_bits().hash(state);
    }
}

impl Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {})", self.id, self.name, self.shelf_class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::collections::hash_map::DefaultHasher;
    use std::time::Duration;

    fn hash_of(order: &Order) -> u64 {
        let mut hasher = DefaultHasher::new();
        order.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_freshness_follows_decay_formula() {
        let clock = ManualClock::new();
        let order = Order::with_clock("1", "Tofu", ShelfClass::Cold, 1, 0.5, &clock);

        assert_eq!(order.freshness_at(clock.now()), 1.0);

        clock.advance(Duration::from_secs(1));
        assert_eq!(order.freshness_at(clock.now()), 0.5);
        assert!(!order.is_expired_at(clock.now()));

        clock.advance(Duration::from_secs(1));
        assert_eq!(order.freshness_at(clock.now()), 0.0);
        assert!(order.is_expired_at(clock.now()));
    }

    #[test]
    fn test_freshness_uses_class_modifier() {
        let clock = ManualClock::new();
        let order = Order::with_clock("1", "Ice", ShelfClass::Overflow, 10, 1.0, &clock);
        clock.advance(Duration::from_secs(2));
        // (10 - 1 * 2 * 2) / 10
        assert!((order.freshness_at(clock.now()) - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_freshness_is_monotonic_and_idempotent() {
        let clock = ManualClock::new();
        let order = Order::with_clock("1", "Soup", ShelfClass::Hot, 300, 0.45, &clock);

        let mut previous = order.freshness_at(clock.now());
        for _ in 0..50 {
            clock.advance(Duration::from_millis(700));
            let now = clock.now();
            let current = order.freshness_at(now);
            assert_eq!(current, order.freshness_at(now));
            assert!(current <= previous);
            previous = current;
        }
    }

    #[test]
    fn test_age_truncates_to_whole_seconds() {
        let clock = ManualClock::new();
        let order = Order::with_clock("1", "Soup", ShelfClass::Hot, 1, 1.0, &clock);
        clock.advance(Duration::from_millis(999));
        assert_eq!(order.age_seconds(clock.now()), 0);
        assert!(!order.is_expired_at(clock.now()));
        clock.advance(Duration::from_millis(1));
        assert_eq!(order.age_seconds(clock.now()), 1);
        assert!(order.is_expired_at(clock.now()));
    }

    #[test]
    fn test_equality_ignores_creation_time() {
        let clock = ManualClock::new();
        let first = Order::with_clock("1", "Pizza", ShelfClass::Hot, 100, 0.1, &clock);
        clock.advance(Duration::from_secs(30));
        let second = Order::with_clock("1", "Pizza", ShelfClass::Hot, 100, 0.1, &clock);

        assert_ne!(first.created_at_instant(), second.created_at_instant());
        assert_eq!(first, second);
        assert_eq!(hash_of(&first), hash_of(&second));

        let other = Order::with_clock("1", "Pizza", ShelfClass::Hot, 100, 0.2, &clock);
        assert_ne!(first, other);
    }

    #[test]
    fn test_from_json() {
        let text = r#"{
            "id": "972aa5b8-5d83-4d5e-8cf3-8a1a1437b18a",
            "name": "Chocolate Gelato",
            "temp": "frozen",
            "shelfLife": 300,
            "decayRate": 0.61
        }"#;

        let order = Order::from_json(text).unwrap();
        assert_eq!(order.id().0, "972aa5b8-5d83-4d5e-8cf3-8a1a1437b18a");
        assert_eq!(order.name(), "Chocolate Gelato");
        assert_eq!(order.shelf_class(), ShelfClass::Frozen);
        assert_eq!(order.shelf_life(), 300);
        assert_eq!(order.decay_rate(), 0.61);
    }

    #[test]
    fn test_from_json_rejects_malformed_input() {
        assert!(matches!(Order::from_json("{not json"), Err(DecodeError::Malformed(_))));
        assert!(matches!(
            Order::from_json(r#"{"id":"1","name":"x","temp":"warm","shelfLife":1,"decayRate":1}"#),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(
            Order::from_json(r#"{"id":"1","name":"x","temp":"hot","shelfLife":0,"decayRate":1}"#),
            Err(DecodeError::InvalidField { field: "shelfLife", .. })
        ));
        assert!(matches!(
            Order::from_json(r#"{"id":"1","name":"x","temp":"hot","shelfLife":5,"decayRate":0}"#),
            Err(DecodeError::InvalidField { field: "decayRate", .. })
        ));
        assert!(matches!(
            Order::from_json(r#"{"id":" ","name":"x","temp":"hot","shelfLife":5,"decayRate":1}"#),
            Err(DecodeError::InvalidField { field: "id", .. })
        ));
    }

    #[test]
    fn test_to_json_uses_wire_names() {
        let order = Order::new("1", "testOrder", ShelfClass::Cold, 1, 0.5);
        let text = order.to_json().unwrap();
        assert!(text.contains("\"id\":\"1\""));
        assert!(text.contains("\"name\":\"testOrder\""));
        assert!(text.contains("\"temp\":\"cold\""));
        assert!(text.contains("\"shelfLife\":1"));
        assert!(text.contains("\"decayRate\":0.5"));

        let decoded = Order::from_json(&text).unwrap();
        assert_eq!(decoded, order);
    }
}
