//! Health states of the atrial fibrillation model

use serde::{Deserialize, Serialize};

pub const NUM_STATES: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HealthState {
    Well,
    MinorStroke,
    MajorStroke,
    Tia,
    StrokeDeath,
    PostStroke,
    NonStrokeDeath,
}

impl HealthState {
    /// All states in matrix index order
    pub const ALL: [HealthState; NUM_STATES] = [
        HealthState::Well,
        HealthState::MinorStroke,
        HealthState::MajorStroke,
        HealthState::Tia,
        HealthState::StrokeDeath,
        HealthState::PostStroke,
        HealthState::NonStrokeDeath,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Option<HealthState> {
        Self::ALL.get(i).copied()
    }

    /// Absorbing states: the trajectory ends on entry
    pub fn is_terminal(self) -> bool {
        matches!(self, HealthState::StrokeDeath | HealthState::NonStrokeDeath)
    }

    /// Entering one of these counts as a stroke event.
    /// Post-Stroke is where every acute event recovers to, so it is not counted again.
    pub fn is_stroke_event(self) -> bool {
        matches!(
            self,
            HealthState::MinorStroke | HealthState::MajorStroke | HealthState::Tia
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            HealthState::Well => "Well",
            HealthState::MinorStroke => "Minor Stroke",
            HealthState::MajorStroke => "Major Stroke",
            HealthState::Tia => "TIA",
            HealthState::StrokeDeath => "Stroke Death",
            HealthState::PostStroke => "Post-Stroke",
            HealthState::NonStrokeDeath => "Non-Stroke Death",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip() {
        for (i, s) in HealthState::ALL.iter().enumerate() {
            assert_eq!(s.index(), i);
            assert_eq!(HealthState::from_index(i), Some(*s));
        }
        assert_eq!(HealthState::from_index(NUM_STATES), None);
    }

    #[test]
    fn test_terminal_and_stroke_classes() {
        let terminal: Vec<_> = HealthState::ALL.iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminal, vec![&HealthState::StrokeDeath, &HealthState::NonStrokeDeath]);
        assert!(!HealthState::PostStroke.is_stroke_event());
        assert!(HealthState::Tia.is_stroke_event());
        assert!(!HealthState::StrokeDeath.is_stroke_event());
    }
}
