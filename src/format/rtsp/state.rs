use std::fmt;

/// Lifecycle state of one RTSP session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No media resource negotiated
    Init,
    /// Resource negotiated, not streaming
    Ready,
    /// RTP receiver active
    Playing,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Init => "INIT",
            SessionState::Ready => "READY",
            SessionState::Playing => "PLAYING",
        })
    }
}

/// Control methods the client can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Negotiate a resource and transport
    Setup,
    /// Start or resume delivery
    Play,
    /// Suspend delivery
    Pause,
    /// Release the session
    Teardown,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Setup => "SETUP",
            Method::Play => "PLAY",
            Method::Pause => "PAUSE",
            Method::Teardown => "TEARDOWN",
        })
    }
}

/// Legal transitions as `(from, method, to)`.
pub const TRANSITIONS: &[(SessionState, Method, SessionState)] = &[
    (SessionState::Init, Method::Setup, SessionState::Ready),
    (SessionState::Ready, Method::Play, SessionState::Playing),
    (SessionState::Playing, Method::Pause, SessionState::Ready),
    (SessionState::Ready, Method::Teardown, SessionState::Init),
    (SessionState::Playing, Method::Teardown, SessionState::Init),
];

/// Returns the state `method` leads to from `from`, or `None` if the method
/// is not allowed there.
pub fn transition(from: SessionState, method: Method) -> Option<SessionState> {
    TRANSITIONS
        .iter()
        .find(|(state, m, _)| *state == from && *m == method)
        .map(|&(_, _, to)| to)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATES: [SessionState; 3] = [SessionState::Init, SessionState::Ready, SessionState::Playing];
    const METHODS: [Method; 4] = [Method::Setup, Method::Play, Method::Pause, Method::Teardown];

    #[test]
    fn test_legal_transitions() {
        assert_eq!(transition(SessionState::Init, Method::Setup), Some(SessionState::Ready));
        assert_eq!(transition(SessionState::Ready, Method::Play), Some(SessionState::Playing));
        assert_eq!(transition(SessionState::Playing, Method::Pause), Some(SessionState::Ready));
        assert_eq!(transition(SessionState::Ready, Method::Teardown), Some(SessionState::Init));
        assert_eq!(transition(SessionState::Playing, Method::Teardown), Some(SessionState::Init));
    }

    #[test]
    fn test_everything_else_is_rejected() {
        let mut allowed = 0;
        for &state in &STATES {
            for &method in &METHODS {
                if transition(state, method).is_some() {
                    allowed += 1;
                }
            }
        }
        assert_eq!(allowed, TRANSITIONS.len());

        assert_eq!(transition(SessionState::Ready, Method::Setup), None);
        assert_eq!(transition(SessionState::Playing, Method::Setup), None);
        assert_eq!(transition(SessionState::Init, Method::Play), None);
        assert_eq!(transition(SessionState::Playing, Method::Play), None);
        assert_eq!(transition(SessionState::Ready, Method::Pause), None);
        assert_eq!(transition(SessionState::Init, Method::Teardown), None);
    }

    #[test]
    fn test_each_row_is_unique() {
        for (i, a) in TRANSITIONS.iter().enumerate() {
            for b in &TRANSITIONS[i + 1..] {
                assert!(!(a.0 == b.0 && a.1 == b.1), "duplicate row for {} {}", a.0, a.1);
            }
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Method::Teardown.to_string(), "TEARDOWN");
        assert_eq!(SessionState::Playing.to_string(), "PLAYING");
    }
}
