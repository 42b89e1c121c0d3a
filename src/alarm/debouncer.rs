use super::types::{AlarmNotification, AlarmState, AlarmTransition, ManualAlarm};
use crate::config::DebounceConfig;
use std::time::Duration;
use tracing::{debug, info};

/// Labels attached to automatic alarm notifications
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlarmLabels {
    pub location: Option<String>,
    pub description: Option<String>,
}

/// Turns per-frame verdicts into raised/cleared transitions.
///
/// Idle moves to Alarmed after `raise_after` consecutive fire verdicts and back
/// after `clear_after` consecutive clear verdicts. Repeating the current state
/// never produces a transition.
#[derive(Debug, Clone)]
pub struct AlarmDebouncer {
    policy: DebounceConfig,
    labels: AlarmLabels,
    state: AlarmState,
    streak: u32,
}

impl AlarmDebouncer {
    pub fn new(policy: DebounceConfig, labels: AlarmLabels) -> Self {
        Self {
            policy,
            labels,
            state: AlarmState::default(),
            streak: 0,
        }
    }

    /// Current automatic-channel state
    pub fn state(&self) -> AlarmState {
        self.state
    }

    pub fn labels(&self) -> &AlarmLabels {
        &self.labels
    }

    /// Feed one verdict; returns a transition only when the state changes
    pub fn observe(&mut self, fire_detected: bool, frame_time: Duration) -> Option<AlarmTransition> {
        if fire_detected == self.state.active {
            self.streak = 0;
            return None;
        }

        self.streak += 1;
        let required = if fire_detected {
            self.policy.raise_after
        } else {
            self.policy.clear_after
        }
        .max(1);

        if self.streak < required {
            debug!(
                "Verdict {} held for {}/{} frames at {:?}",
                fire_detected, self.streak, required, frame_time
            );
            return None;
        }
        self.streak = 0;

        if fire_detected {
            self.state = AlarmState {
                active: true,
                raised_at: Some(frame_time),
            };
            info!("Fire alarm raised at frame time {:?}", frame_time);
            Some(AlarmTransition::Raised(AlarmNotification::automatic(
                frame_time,
                self.labels.location.as_deref(),
                self.labels.description.as_deref(),
            )))
        } else {
            self.state = AlarmState::default();
            info!("Fire alarm cleared at frame time {:?}", frame_time);
            Some(AlarmTransition::Cleared { frame_time })
        }
    }

    /// Build a manual alarm notification without touching the automatic state
    pub fn manual(&self, request: &ManualAlarm) -> AlarmNotification {
        info!(
            "Manual alarm at '{}': {}",
            request.location(),
            request.reason()
        );
        AlarmNotification::manual(request)
    }

    /// Return to Idle, as at the start of a run
    pub fn reset(&mut self) {
        self.state = AlarmState::default();
        self.streak = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::types::AlarmClassification;

    fn debouncer() -> AlarmDebouncer {
        AlarmDebouncer::new(
            DebounceConfig::default(),
            AlarmLabels {
                location: Some("camera feed".to_string()),
                description: Some("automatic detection found possible fire".to_string()),
            },
        )
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[derive(Debug, PartialEq)]
    enum Kind {
        Raised,
        Cleared,
    }

    fn run(debouncer: &mut AlarmDebouncer, verdicts: &[bool]) -> Vec<Kind> {
        verdicts
            .iter()
            .enumerate()
            .filter_map(|(i, &v)| debouncer.observe(v, ms(i as u64 * 33)))
            .map(|t| match t {
                AlarmTransition::Raised(_) => Kind::Raised,
                AlarmTransition::Cleared { .. } => Kind::Cleared,
            })
            .collect()
    }

    #[test]
    fn test_starts_idle() {
        let d = debouncer();
        assert_eq!(d.state(), AlarmState { active: false, raised_at: None });
    }

    #[test]
    fn test_consecutive_fire_raises_once() {
        for n in [1usize, 2, 5, 50] {
            let mut d = debouncer();
            let events = run(&mut d, &vec![true; n]);
            assert_eq!(events, vec![Kind::Raised], "n = {}", n);
            assert!(d.state().active);
        }
    }

    #[test]
    fn test_round_trip_sequence() {
        let mut d = debouncer();
        let events = run(&mut d, &[true, true, false, false, true]);
        assert_eq!(events, vec![Kind::Raised, Kind::Cleared, Kind::Raised]);
    }

    #[test]
    fn test_repeated_idle_produces_nothing() {
        let mut d = debouncer();
        assert!(run(&mut d, &[false; 10]).is_empty());
        assert!(!d.state().active);
    }

    #[test]
    fn test_raised_at_tracks_transition_frame() {
        let mut d = debouncer();
        d.observe(false, ms(0));
        let transition = d.observe(true, ms(66));
        d.observe(true, ms(99));

        assert_eq!(d.state().raised_at, Some(ms(66)));
        match transition {
            Some(AlarmTransition::Raised(n)) => {
                assert_eq!(n.classification, AlarmClassification::Automatic);
                assert_eq!(n.location, "camera feed");
                assert_eq!(n.frame_time, Some(ms(66)));
            }
            other => panic!("Expected raised transition, got {:?}", other),
        }

        d.observe(false, ms(132));
        assert_eq!(d.state(), AlarmState::default());
    }

    #[test]
    fn test_manual_alarm_is_independent() {
        let mut d = debouncer();
        let request = ManualAlarm::new("server room", "operator saw smoke").unwrap();

        let manual = d.manual(&request);
        assert_eq!(manual.classification, AlarmClassification::Manual);
        assert_eq!(manual.location, "server room");
        assert!(!d.state().active);

        // Automatic detection still raises its own alarm afterwards
        assert_eq!(run(&mut d, &[true]), vec![Kind::Raised]);

        // And a manual alarm while alarmed leaves the automatic state alone
        d.manual(&request);
        assert!(d.state().active);
    }

    #[test]
    fn test_hysteresis_policy() {
        let mut d = AlarmDebouncer::new(
            DebounceConfig {
                raise_after: 3,
                clear_after: 2,
            },
            AlarmLabels::default(),
        );

        // A broken run of fire verdicts does not raise
        assert!(run(&mut d, &[true, true, false, true, true]).is_empty());

        let mut d = AlarmDebouncer::new(
            DebounceConfig {
                raise_after: 3,
                clear_after: 2,
            },
            AlarmLabels::default(),
        );
        let events = run(&mut d, &[true, true, true, false, true, false, false]);
        assert_eq!(events, vec![Kind::Raised, Kind::Cleared]);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let mut d = debouncer();
        d.observe(true, ms(0));
        d.reset();
        assert_eq!(d.state(), AlarmState::default());
        assert_eq!(run(&mut d, &[true]), vec![Kind::Raised]);
    }
}
