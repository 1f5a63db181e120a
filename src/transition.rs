use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_LEFT_HAND_KEYS: &str = "QWERTASDFGZXCVB";

/// Which side of the keyboard a character is typed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum Hand {
    #[strum(serialize = "L")]
    Left,
    #[strum(serialize = "R")]
    Right,
    #[strum(serialize = "S")]
    Space,
}

/// Two-letter code classifying a keystroke pair by hand
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    strum_macros::Display,
)]
pub enum TransitionClass {
    LL,
    LR,
    LS,
    RL,
    RR,
    RS,
    SL,
    SR,
    SS,
}

impl TransitionClass {
    pub const ALL: [TransitionClass; 9] = [
        TransitionClass::LL,
        TransitionClass::LR,
        TransitionClass::LS,
        TransitionClass::RL,
        TransitionClass::RR,
        TransitionClass::RS,
        TransitionClass::SL,
        TransitionClass::SR,
        TransitionClass::SS,
    ];

    pub fn from_hands(from: Hand, to: Hand) -> Self {
        use Hand::*;
        match (from, to) {
            (Left, Left) => TransitionClass::LL,
            (Left, Right) => TransitionClass::LR,
            (Left, Space) => TransitionClass::LS,
            (Right, Left) => TransitionClass::RL,
            (Right, Right) => TransitionClass::RR,
            (Right, Space) => TransitionClass::RS,
            (Space, Left) => TransitionClass::SL,
            (Space, Right) => TransitionClass::SR,
            (Space, Space) => TransitionClass::SS,
        }
    }
}

/// Split of the keyboard into left-hand keys; everything else that is not a
/// space counts as right-hand.
#[derive(Debug, Clone)]
pub struct KeyboardLayout {
    left: HashSet<char>,
}

impl KeyboardLayout {
    pub fn new(left_hand_keys: &str) -> Self {
        Self {
            left: left_hand_keys
                .chars()
                .map(|c| c.to_ascii_uppercase())
                .collect(),
        }
    }

    pub fn hand(&self, c: char) -> Hand {
        if c == ' ' {
            Hand::Space
        } else if self.left.contains(&c.to_ascii_uppercase()) {
            Hand::Left
        } else {
            Hand::Right
        }
    }

    pub fn classify(&self, from: char, to: char) -> TransitionClass {
        TransitionClass::from_hands(self.hand(from), self.hand(to))
    }
}

impl Default for KeyboardLayout {
    fn default() -> Self {
        Self::new(DEFAULT_LEFT_HAND_KEYS)
    }
}
