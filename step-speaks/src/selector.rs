//! Method-selection policy: which synthesis backend serves a request.
//!
//! The policy is a pure function of the caller's preferences and of
//! remote credential availability. Runtime demotion (a remote call
//! failing mid-request) is handled by the orchestrator, not here.

use crate::types::{MethodPreference, QualityPreference};

/// The backend chosen for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Paid remote synthesis.
    Remote,
    /// Free on-device synthesis.
    Local,
    /// Neither backend can serve the request.
    Unavailable,
}

/// Choose the synthesis backend for a request.
///
/// Policy, in priority order:
/// 1. An explicit `Remote` preference is never silently substituted:
///    it yields `Remote` with credentials and `Unavailable` without.
/// 2. An explicit `Local` preference always yields `Local`.
/// 3. `Auto` yields `Remote` only when the caller asked for high
///    quality and credentials are available; otherwise `Local`. Auto
///    means flexible, so missing credentials degrade quality rather
///    than failing.
pub fn select(
    preference: MethodPreference,
    quality: QualityPreference,
    remote_credentials: bool,
) -> Selection {
    match preference {
        MethodPreference::Remote => {
            if remote_credentials {
                Selection::Remote
            } else {
                Selection::Unavailable
            }
        }
        MethodPreference::Local => Selection::Local,
        MethodPreference::Auto => {
            if quality == QualityPreference::High && remote_credentials {
                Selection::Remote
            } else {
                Selection::Local
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
