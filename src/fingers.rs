//! Per-frame finger state: which fingers are raised and whether the hand is a fist.

use crate::landmarks::{
    HandLandmarks, INDEX_MCP, INDEX_TIP, MIDDLE_MCP, MIDDLE_TIP, PINKY_MCP, PINKY_TIP, RING_MCP,
    RING_TIP,
};

/// (tip, mcp) pairs for index, middle, ring and pinky.
const FINGERS: [(usize, usize); 4] = [
    (INDEX_TIP, INDEX_MCP),
    (MIDDLE_TIP, MIDDLE_MCP),
    (RING_TIP, RING_MCP),
    (PINKY_TIP, PINKY_MCP),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FingerState {
    pub index_up: bool,
    pub middle_up: bool,
    pub ring_up: bool,
    pub pinky_up: bool,
    pub is_fist: bool,
}

impl FingerState {
    /// Raised: tip above its knuckle by more than `raise_margin` (image Y grows downward).
    /// Fist: every tip within `fist_distance` of its knuckle, regardless of the raised flags.
    pub fn classify(hand: &HandLandmarks, raise_margin: f32, fist_distance: f32) -> Self {
        let raised = FINGERS.map(|(tip, mcp)| hand.get(tip).y < hand.get(mcp).y - raise_margin);
        let is_fist = FINGERS
            .iter()
            .all(|&(tip, mcp)| hand.get(tip).distance(&hand.get(mcp)) < fist_distance);

        Self {
            index_up: raised[0],
            middle_up: raised[1],
            ring_up: raised[2],
            pinky_up: raised[3],
            is_fist,
        }
    }

    pub fn raised(&self) -> [bool; 4] {
        [self.index_up, self.middle_up, self.ring_up, self.pinky_up]
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::hand;
    use super::*;
    use crate::landmarks::{LANDMARK_COUNT, Landmark};

    #[test]
    fn index_only_is_raised() {
        let st = FingerState::classify(&hand([true, false, false, false], None), 0.02, 0.1);
        assert_eq!(st.raised(), [true, false, false, false]);
        assert!(!st.is_fist);
    }

    #[test]
    fn margin_rejects_jitter_near_knuckle() {
        // tip 0.01 above the knuckle is inside the 0.02 margin
        let st = FingerState::classify(&hand([false; 4], Some(0.59)), 0.02, 0.1);
        assert!(!st.index_up);
        let st = FingerState::classify(&hand([false; 4], Some(0.57)), 0.02, 0.1);
        assert!(st.index_up);
    }

    #[test]
    fn folded_hand_is_fist() {
        let st = FingerState::classify(&hand([false; 4], None), 0.02, 0.1);
        assert!(st.is_fist);
    }

    #[test]
    fn fist_is_distance_based_not_absence_of_raised() {
        // fingers point sideways: none raised, but tips are far from knuckles
        let mut pts = vec![Landmark::new(0.5, 0.8, 0.0); LANDMARK_COUNT];
        for &(tip, mcp) in FINGERS.iter() {
            pts[mcp] = Landmark::new(0.4, 0.6, 0.0);
            pts[tip] = Landmark::new(0.7, 0.6, 0.0);
        }
        let h = HandLandmarks::from_points(&pts).unwrap();
        let st = FingerState::classify(&h, 0.02, 0.1);
        assert_eq!(st.raised(), [false; 4]);
        assert!(!st.is_fist);
    }

    #[test]
    fn fist_flag_independent_of_raised_flags() {
        // with a zero margin a barely lifted tip counts as raised yet stays within fist distance
        let st = FingerState::classify(&hand([false; 4], Some(0.58)), 0.0, 0.1);
        assert!(st.index_up);
        assert!(st.is_fist);
    }
}
