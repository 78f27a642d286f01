//! Player event bridge
//!
//! Classifies engine telemetry into controller actions. Stalls and fragment timeouts are left
//! to the engine's own recovery; only fatal conditions trigger provider failover.

use super::engine::EngineEvent;

/// Notice surfaced after an automatic provider switch
pub const FAILOVER_NOTICE: &str = "switched providers due to a playback error";

/// What the controller does with an engine event
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeAction {
    /// `Installing -> Playing`, apply the pending resume offset
    MarkPlaying { duration: Option<f64> },
    /// Duration became known, re-apply a resume offset that could not be placed yet
    DurationKnown(f64),
    Progress(f64),
    EnterBuffering,
    LeaveBuffering,
    /// Logged only
    Ignore(String),
    /// Tear down and consider switching providers
    Failover(String),
}

/// Outcome of a fatal error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailoverDecision {
    Switch,
    Surface,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerEventBridge;

impl PlayerEventBridge {
    pub fn classify(event: &EngineEvent) -> BridgeAction {
        match event {
            EngineEvent::FirstPlayable { duration } => BridgeAction::MarkPlaying {
                duration: duration.filter(|d| d.is_finite() && *d > 0.0),
            },
            EngineEvent::DurationChanged(duration) if duration.is_finite() && *duration > 0.0 => {
                BridgeAction::DurationKnown(*duration)
            }
            EngineEvent::DurationChanged(duration) => {
                BridgeAction::Ignore(format!("unusable duration {}", duration))
            }
            EngineEvent::TimeUpdate(position) => BridgeAction::Progress(*position),
            EngineEvent::BufferStalled => BridgeAction::EnterBuffering,
            EngineEvent::BufferResumed => BridgeAction::LeaveBuffering,
            EngineEvent::FragmentLoaded { url } => {
                BridgeAction::Ignore(format!("fragment loaded: {}", url))
            }
            EngineEvent::FragmentTimeout { url } => {
                BridgeAction::Ignore(format!("fragment timeout: {}", url))
            }
            EngineEvent::NonFatalError(detail) => {
                BridgeAction::Ignore(format!("non-fatal engine error: {}", detail))
            }
            EngineEvent::FatalError(detail) => BridgeAction::Failover(detail.clone()),
        }
    }

    /// Switch only while under the hop cap and when another provider remains
    pub fn failover_decision(hops: u32, max_hops: u32, has_alternate: bool) -> FailoverDecision {
        if has_alternate && hops < max_hops {
            FailoverDecision::Switch
        } else {
            FailoverDecision::Surface
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_transient_conditions_are_ignored() {
        let timeout = EngineEvent::FragmentTimeout {
            url: "https://cdn.test/seg-4.ts".to_string(),
        };
        assert!(matches!(
            PlayerEventBridge::classify(&timeout),
            BridgeAction::Ignore(_)
        ));
        assert!(matches!(
            PlayerEventBridge::classify(&EngineEvent::NonFatalError("levelLoadError".into())),
            BridgeAction::Ignore(_)
        ));
        assert_eq!(
            PlayerEventBridge::classify(&EngineEvent::BufferStalled),
            BridgeAction::EnterBuffering
        );
    }

    #[test]
    fn test_fatal_error_requests_failover() {
        assert_eq!(
            PlayerEventBridge::classify(&EngineEvent::FatalError("codec".into())),
            BridgeAction::Failover("codec".to_string())
        );
    }

    #[test]
    fn test_unusable_durations() {
        assert_eq!(
            PlayerEventBridge::classify(&EngineEvent::FirstPlayable {
                duration: Some(f64::INFINITY)
            }),
            BridgeAction::MarkPlaying { duration: None }
        );
        assert!(matches!(
            PlayerEventBridge::classify(&EngineEvent::DurationChanged(f64::NAN)),
            BridgeAction::Ignore(_)
        ));
        assert_eq!(
            PlayerEventBridge::classify(&EngineEvent::DurationChanged(1420.0)),
            BridgeAction::DurationKnown(1420.0)
        );
    }

    #[rstest]
    #[case(0, 1, true, FailoverDecision::Switch)]
    #[case(1, 1, true, FailoverDecision::Surface)]
    #[case(0, 1, false, FailoverDecision::Surface)]
    #[case(0, 0, true, FailoverDecision::Surface)]
    fn test_failover_decision(
        #[case] hops: u32,
        #[case] max_hops: u32,
        #[case] has_alternate: bool,
        #[case] expected: FailoverDecision,
    ) {
        assert_eq!(
            PlayerEventBridge::failover_decision(hops, max_hops, has_alternate),
            expected
        );
    }
}
