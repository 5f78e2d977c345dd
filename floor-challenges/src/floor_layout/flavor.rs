use rand::{
    distributions::{Distribution, Standard},
    Rng,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of machine occupying a cell of the floor.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Flavor {
    A,
    B,
    C,
    D,
}

impl Flavor {
    pub const COUNT: usize = 4;
    pub const ALL: [Flavor; Flavor::COUNT] = [Flavor::A, Flavor::B, Flavor::C, Flavor::D];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn symbol(self) -> char {
        match self {
            Flavor::A => 'A',
            Flavor::B => 'B',
            Flavor::C => 'C',
            Flavor::D => 'D',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol.to_ascii_uppercase() {
            'A' => Some(Flavor::A),
            'B' => Some(Flavor::B),
            'C' => Some(Flavor::C),
            'D' => Some(Flavor::D),
            _ => None,
        }
    }
}

// Uniform over all flavors, so `rng.gen::<Flavor>()` draws a random machine.
impl Distribution<Flavor> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Flavor {
        Flavor::ALL[rng.gen_range(0..Flavor::COUNT)]
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}
