//! Lifecycle states shared by pipelines and their children.

use std::fmt;

/// Lifecycle state. Transitions always move one step at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum State {
    #[default]
    Null,
    Paused,
    Playing,
}

impl State {
    /// The next state on the way from `self` to `target`, or `None` if already there.
    pub fn step_toward(self, target: State) -> Option<State> {
        use State::*;
        match (self, target) {
            (a, b) if a == b => None,
            (Null, _) => Some(Paused),
            (Playing, _) => Some(Paused),
            (Paused, t) => Some(t),
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Null => write!(f, "NULL"),
            State::Paused => write!(f, "PAUSED"),
            State::Playing => write!(f, "PLAYING"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_toward_passes_through_paused() {
        assert_eq!(State::Null.step_toward(State::Playing), Some(State::Paused));
        assert_eq!(State::Paused.step_toward(State::Playing), Some(State::Playing));
        assert_eq!(State::Playing.step_toward(State::Null), Some(State::Paused));
        assert_eq!(State::Paused.step_toward(State::Null), Some(State::Null));
        assert_eq!(State::Null.step_toward(State::Null), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(State::Playing.to_string(), "PLAYING");
        assert_eq!(State::default(), State::Null);
    }
}
