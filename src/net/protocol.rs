//! Training protocol message definitions
//! These are the wire types for the newline-delimited JSON stream between the
//! training client and the server. Field names and the observation layout are
//! a stable contract with the training side and must never change silently.

use serde::{Deserialize, Serialize};

/// Length of the standard observation vector.
///
/// Field order:
/// 1. heading-error cosine
/// 2. heading-error sine
/// 3. normalized target distance
/// 4. normalized forward velocity
/// 5. normalized lateral velocity
/// 6-10. five ray-clearance fractions (left to right)
/// 11. nearest-pickup bearing cosine
/// 12. nearest-pickup bearing sine
/// 13. normalized nearest-pickup distance
/// 14. health fraction
/// 15. weapon-cooldown fraction
/// 16. small random jitter term
pub const OBS_LEN: usize = 16;

/// Length of the simplified legacy observation used by the secondary agent
/// type: `[x, y, vel_x, vel_y, health_fraction]`. A distinct, shorter schema;
/// never interleave it with the standard vector on one connection.
pub const LEGACY_OBS_LEN: usize = 5;

/// Messages sent from the training client to the server.
///
/// Lines matching neither variant are protocol errors and are dropped
/// silently (no response, connection stays open).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientMsg {
    /// One action for the next tick: `{"a": [throttle, steer, fire]}`.
    /// Throttle and steer are clamped to [-1, 1]; fire means "fire if > 0.5".
    Step { a: Vec<f64> },

    /// Inline policy artifact install:
    /// `{"cmd": "save_policy", "name": ..., "data_b64": ...}`
    SavePolicy {
        cmd: SavePolicyCmd,
        name: Option<String>,
        data_b64: Option<String>,
    },
}

/// The only recognized command verb; unknown verbs fail decoding and the
/// line is dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SavePolicyCmd {
    SavePolicy,
}

/// Messages sent from the server to the training client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMsg {
    /// Per-tick step response (also sent as the initial reset observation
    /// and as the auto-reset message after a terminal tick)
    Step {
        obs: Vec<f64>,
        reward: f64,
        done: bool,
    },

    /// Acknowledgement for a policy install
    PolicyAck {
        ok: bool,
        saved_path: Option<String>,
        error: Option<String>,
    },
}
