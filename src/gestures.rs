use crate::fingers::FingerState;

/// Gesture category for one frame. Exactly one per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gesture {
    /// Index finger only.
    ScrollUp,
    /// Index and middle.
    ScrollDown,
    /// All four fingers.
    Swipe,
    /// All four tips folded onto their knuckles.
    Fist,
    None,
}

impl Gesture {
    /// Patterns are tried in priority order; the first match wins.
    pub fn classify(st: &FingerState) -> Self {
        match st.raised() {
            [true, false, false, false] => Gesture::ScrollUp,
            [true, true, false, false] => Gesture::ScrollDown,
            [true, true, true, true] => Gesture::Swipe,
            _ if st.is_fist => Gesture::Fist,
            _ => Gesture::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gesture::ScrollUp => "one-finger",
            Gesture::ScrollDown => "two-finger",
            Gesture::Swipe => "four-finger",
            Gesture::Fist => "fist",
            Gesture::None => "none",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn st(raised: [bool; 4], is_fist: bool) -> FingerState {
        FingerState {
            index_up: raised[0],
            middle_up: raised[1],
            ring_up: raised[2],
            pinky_up: raised[3],
            is_fist,
        }
    }

    #[test]
    fn defined_patterns() {
        assert_eq!(Gesture::classify(&st([true, false, false, false], false)), Gesture::ScrollUp);
        assert_eq!(Gesture::classify(&st([true, true, false, false], false)), Gesture::ScrollDown);
        assert_eq!(Gesture::classify(&st([true, true, true, true], false)), Gesture::Swipe);
        assert_eq!(Gesture::classify(&st([false; 4], true)), Gesture::Fist);
    }

    #[test]
    fn finger_patterns_outrank_fist() {
        assert_eq!(Gesture::classify(&st([true, false, false, false], true)), Gesture::ScrollUp);
        assert_eq!(Gesture::classify(&st([true, true, true, true], true)), Gesture::Swipe);
    }

    #[test]
    fn every_other_vector_is_none_unless_fist() {
        let defined = [
            [true, false, false, false],
            [true, true, false, false],
            [true, true, true, true],
        ];
        for bits in 0u8..16 {
            let raised = [bits & 1 != 0, bits & 2 != 0, bits & 4 != 0, bits & 8 != 0];
            if defined.contains(&raised) {
                continue;
            }
            assert_eq!(Gesture::classify(&st(raised, false)), Gesture::None, "{raised:?}");
            assert_eq!(Gesture::classify(&st(raised, true)), Gesture::Fist, "{raised:?}");
        }
    }
}
