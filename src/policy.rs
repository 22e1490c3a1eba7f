//! Field output policy.
//!
//! Every plain field carries a [`SerializeEnum`] deciding which of the two
//! documents receives its value. Policy is per field, not per type.

use serde::{Deserialize, Serialize};

/// Which output(s) a field value belongs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerializeEnum {
    /// Neither document.
    None,
    /// Session document only.
    Session,
    /// Client document only.
    Client,
    /// Both documents (default for unannotated fields).
    #[default]
    Both,
}

/// The two documents produced by one serialization pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// Full-fidelity server-side document.
    Session,
    /// Reduced, visibility-filtered document for the renderer.
    Client,
}

impl SerializeEnum {
    /// Does a field with this policy belong in `target`?
    pub fn includes(self, target: Target) -> bool {
        matches!(
            (self, target),
            (SerializeEnum::Both, _)
                | (SerializeEnum::Session, Target::Session)
                | (SerializeEnum::Client, Target::Client)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SerializeEnum::None => "none",
            SerializeEnum::Session => "session",
            SerializeEnum::Client => "client",
            SerializeEnum::Both => "both",
        }
    }
}

impl std::fmt::Display for SerializeEnum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
