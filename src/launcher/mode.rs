//! Worker launch strategies

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::Error;

/// Strategy used to create a worker from the template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchMode {
    /// Copy-on-write fork of the daemon process itself
    Fork,
    /// Fork from a dedicated template process that preloaded the module list
    #[default]
    ForkServer,
    /// Fresh process for every worker, nothing inherited
    Spawn,
}

impl LaunchMode {
    pub const ALL: [LaunchMode; 3] = [LaunchMode::Fork, LaunchMode::ForkServer, LaunchMode::Spawn];

    /// Wire name used in `restart?method=` and the config file
    pub fn as_str(self) -> &'static str {
        match self {
            LaunchMode::Fork => "fork",
            LaunchMode::ForkServer => "forkserver",
            LaunchMode::Spawn => "spawn",
        }
    }

    /// Whether this platform can create workers with the strategy
    pub fn is_supported(self) -> bool {
        match self {
            LaunchMode::Spawn => true,
            LaunchMode::Fork | LaunchMode::ForkServer => cfg!(unix),
        }
    }
}

impl fmt::Display for LaunchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LaunchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fork" => Ok(LaunchMode::Fork),
            "forkserver" => Ok(LaunchMode::ForkServer),
            "spawn" => Ok(LaunchMode::Spawn),
            other => Err(Error::LaunchModeUnsupported(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wire_names() {
        for mode in LaunchMode::ALL {
            assert_eq!(mode.as_str().parse::<LaunchMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_parse_is_exact() {
        for bogus in ["bogus", "", "Fork", "fork-server", " spawn"] {
            let err = bogus.parse::<LaunchMode>().unwrap_err();
            assert!(matches!(err, Error::LaunchModeUnsupported(ref s) if s == bogus));
        }
    }

    #[test]
    fn test_default_is_forkserver() {
        assert_eq!(LaunchMode::default(), LaunchMode::ForkServer);
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&LaunchMode::ForkServer).unwrap();
        assert_eq!(json, "\"forkserver\"");
        let mode: LaunchMode = serde_json::from_str("\"spawn\"").unwrap();
        assert_eq!(mode, LaunchMode::Spawn);
    }

    #[test]
    fn test_spawn_is_always_supported() {
        assert!(LaunchMode::Spawn.is_supported());
        #[cfg(unix)]
        assert!(LaunchMode::ALL.iter().all(|m| m.is_supported()));
    }
}
