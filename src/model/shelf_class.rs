use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Temperature category of an order and of the shelf that stores it.
///
/// Each class carries a fixed shelf capacity and a decay multiplier. Exactly one
/// class, [`ShelfClass::Overflow`], is the overflow shelf that absorbs orders
/// whose home shelf is full. On the wire the overflow class is spelled `any`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShelfClass {
    #[serde(rename = "hot", alias = "HOT", alias = "Hot")]
    Hot,
    #[serde(rename = "cold", alias = "COLD", alias = "Cold")]
    Cold,
    #[serde(rename = "frozen", alias = "FROZEN", alias = "Frozen")]
    Frozen,
    #[serde(
        rename = "any",
        alias = "ANY",
        alias = "overflow",
        alias = "OVERFLOW",
        alias = "Overflow"
    )]
    Overflow,
}

impl ShelfClass {
    /// Every class, in shelf index order.
    pub const ALL: [ShelfClass; 4] = [
        ShelfClass::Hot,
        ShelfClass::Cold,
        ShelfClass::Frozen,
        ShelfClass::Overflow,
    ];

    /// The designated overflow class.
    pub const OVERFLOW: ShelfClass = ShelfClass::Overflow;

    pub const fn capacity(self) -> usize {
        match self {
            ShelfClass::Hot | ShelfClass::Cold | ShelfClass::Frozen => 10,
            ShelfClass::Overflow => 15,
        }
    }

    pub const fn decay_modifier(self) -> f64 {
        match self {
            ShelfClass::Hot | ShelfClass::Cold | ShelfClass::Frozen => 1.0,
            ShelfClass::Overflow => 2.0,
        }
    }

    pub const fn is_overflow(self) -> bool {
        matches!(self, ShelfClass::Overflow)
    }

    /// Position of this class in [`ShelfClass::ALL`].
    pub const fn index(self) -> usize {
        match self {
            ShelfClass::Hot => 0,
            ShelfClass::Cold => 1,
            ShelfClass::Frozen => 2,
            ShelfClass::Overflow => 3,
        }
    }

    pub const fn shelf_name(self) -> &'static str {
        match self {
            ShelfClass::Hot => "Hot shelf",
            ShelfClass::Cold => "Cold shelf",
            ShelfClass::Frozen => "Frozen shelf",
            ShelfClass::Overflow => "Overflow shelf",
        }
    }
}

impl Display for ShelfClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ShelfClass::Hot => "hot",
            ShelfClass::Cold => "cold",
            ShelfClass::Frozen => "frozen",
            ShelfClass::Overflow => "overflow",
        };
        f.write_str(label)
    }
}
