//! Hue classes and their pixel predicates

use serde::{Deserialize, Serialize};

/// Channel floor every matching class channel must exceed
const BRIGHTNESS_FLOOR: u8 = 100;

/// Yellow needs red and green within this distance of each other
const YELLOW_BALANCE: i32 = 50;

/// One of the three keyable hue classes
///
/// Declaration order is compositing priority: a pixel matched by several
/// classes takes the background of the first one listed in [`HueClass::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HueClass {
    Blue,
    Red,
    Yellow,
}

impl HueClass {
    /// All classes, highest priority first
    pub const ALL: [HueClass; 3] = [HueClass::Blue, HueClass::Red, HueClass::Yellow];

    /// Priority rank, 0 is highest
    pub fn priority(self) -> usize {
        self.index()
    }

    /// Position in per-class arrays
    pub fn index(self) -> usize {
        match self {
            HueClass::Blue => 0,
            HueClass::Red => 1,
            HueClass::Yellow => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            HueClass::Blue => "blue",
            HueClass::Red => "red",
            HueClass::Yellow => "yellow",
        }
    }

    /// Test one pixel against this class at the given sensitivity.
    ///
    /// The threshold is `sensitivity / 2`; both sides are doubled so odd
    /// sensitivities keep the exact half without floating point.
    #[inline]
    pub fn matches(self, r: u8, g: u8, b: u8, sensitivity: Sensitivity) -> bool {
        let s = sensitivity.value() as i32;
        let (r2, g2, b2) = (r as i32 * 2, g as i32 * 2, b as i32 * 2);
        match self {
            HueClass::Blue => b2 > r2 + s && b2 > g2 + s && b > BRIGHTNESS_FLOOR,
            HueClass::Red => r2 > g2 + s && r2 > b2 + s && r > BRIGHTNESS_FLOOR,
            HueClass::Yellow => {
                r2 > b2 + s
                    && g2 > b2 + s
                    && r > BRIGHTNESS_FLOOR
                    && g > BRIGHTNESS_FLOOR
                    && (r as i32 - g as i32).abs() < YELLOW_BALANCE
            }
        }
    }
}

impl std::fmt::Display for HueClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Predicate strictness, always within 0..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Sensitivity(u8);

impl Sensitivity {
    pub const MIN: u8 = 0;
    pub const MAX: u8 = 100;

    /// Clamp `value` into range
    pub fn new(value: u8) -> Self {
        Self(value.min(Self::MAX))
    }

    /// Clamp a wider integer (slider values, CLI input)
    pub fn saturating(value: i64) -> Self {
        Self(value.clamp(Self::MIN as i64, Self::MAX as i64) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Channel difference a class channel must exceed
    pub fn threshold(self) -> f32 {
        self.0 as f32 / 2.0
    }
}

impl Default for Sensitivity {
    fn default() -> Self {
        Self(50)
    }
}

impl From<u8> for Sensitivity {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

impl From<Sensitivity> for u8 {
    fn from(value: Sensitivity) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: u8) -> Sensitivity {
        Sensitivity::new(v)
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(HueClass::ALL[0], HueClass::Blue);
        assert!(HueClass::Blue.priority() < HueClass::Red.priority());
        assert!(HueClass::Red.priority() < HueClass::Yellow.priority());
        for (i, class) in HueClass::ALL.iter().enumerate() {
            assert_eq!(class.index(), i);
        }
    }

    #[test]
    fn test_sensitivity_clamping() {
        assert_eq!(s(150).value(), 100);
        assert_eq!(Sensitivity::saturating(-5).value(), 0);
        assert_eq!(Sensitivity::saturating(1000).value(), 100);
        assert_eq!(s(0).threshold(), 0.0);
        assert_eq!(s(100).threshold(), 50.0);
        assert_eq!(s(51).threshold(), 25.5);
        assert_eq!(Sensitivity::default().value(), 50);
    }

    #[test]
    fn test_blue_scenario() {
        assert!(HueClass::Blue.matches(10, 10, 200, s(50)));
        assert!(!HueClass::Red.matches(10, 10, 200, s(50)));
        assert!(!HueClass::Yellow.matches(10, 10, 200, s(50)));
    }

    #[test]
    fn test_yellow_scenario() {
        assert!(HueClass::Yellow.matches(200, 200, 10, s(50)));
        assert!(!HueClass::Blue.matches(200, 200, 10, s(50)));
        // r == g, neither dominates the other
        assert!(!HueClass::Red.matches(200, 200, 10, s(50)));
    }

    #[test]
    fn test_red_scenario() {
        // r - g = 70, r - b = 90: red for every threshold below 70
        for v in 0..=100 {
            assert!(HueClass::Red.matches(120, 50, 30, s(v)), "sensitivity {}", v);
        }
    }

    #[test]
    fn test_black_never_matches() {
        for v in [0, 1, 50, 99, 100] {
            for class in HueClass::ALL {
                assert!(!class.matches(0, 0, 0, s(v)));
            }
        }
    }

    #[test]
    fn test_strict_boundaries() {
        // t = 25
        assert!(HueClass::Blue.matches(100, 100, 126, s(50)));
        assert!(!HueClass::Blue.matches(101, 100, 126, s(50)));
        assert!(!HueClass::Blue.matches(100, 101, 126, s(50)));
        // brightness floor is strict as well
        assert!(HueClass::Blue.matches(0, 0, 101, s(50)));
        assert!(!HueClass::Blue.matches(0, 0, 100, s(50)));

        assert!(HueClass::Red.matches(101, 0, 0, s(0)));
        assert!(!HueClass::Red.matches(100, 0, 0, s(0)));
        assert!(!HueClass::Red.matches(150, 100, 0, s(100)));
        assert!(HueClass::Red.matches(151, 100, 0, s(100)));

        // |r - g| < 50 is strict
        assert!(HueClass::Yellow.matches(200, 151, 0, s(0)));
        assert!(!HueClass::Yellow.matches(200, 150, 0, s(0)));
    }

    #[test]
    fn test_fractional_threshold() {
        // t = 25.5: b - r must be at least 26
        assert!(!HueClass::Blue.matches(100, 0, 125, s(51)));
        assert!(HueClass::Blue.matches(100, 0, 126, s(51)));
    }

    #[test]
    fn test_blue_and_red_are_exclusive() {
        // Blue needs b > r and red needs r > b, so no pixel is both
        for v in [0, 1, 50, 100] {
            for r in (0..=255u16).step_by(5) {
                for b in (0..=255u16).step_by(5) {
                    let (r, b) = (r as u8, b as u8);
                    let blue = HueClass::Blue.matches(r, 0, b, s(v));
                    let red = HueClass::Red.matches(r, 0, b, s(v));
                    assert!(!(blue && red), "({}, 0, {}) at {}", r, b, v);
                }
            }
        }
        // Magenta leaning blue stays blue only
        assert!(HueClass::Blue.matches(200, 0, 201, s(0)));
        assert!(!HueClass::Red.matches(200, 0, 201, s(0)));
    }

    #[test]
    fn test_red_and_yellow_overlap() {
        // orange: red and yellow together
        assert!(HueClass::Red.matches(250, 210, 0, s(10)));
        assert!(HueClass::Yellow.matches(250, 210, 0, s(10)));
    }

    #[test]
    fn test_predicate_is_pure() {
        for &(r, g, b) in &[(10, 10, 200), (200, 200, 10), (120, 50, 30), (0, 0, 0)] {
            for class in HueClass::ALL {
                let first = class.matches(r, g, b, s(37));
                let second = class.matches(r, g, b, s(37));
                assert_eq!(first, second);
            }
        }
    }
}
