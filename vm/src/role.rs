use serde::{Deserialize, Serialize};
use std::fmt;

/// Subsystem a VM instance serves. At most one live instance exists per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    None,
    Server,
    Client,
    Menu,
}

impl Role {
    /// Roles that can own an instance.
    pub const LOADABLE: [Role; 3] = [Role::Server, Role::Client, Role::Menu];

    /// Short name used in logs and diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Role::None => "none",
            Role::Server => "game",
            Role::Client => "cgame",
            Role::Menu => "gui",
        }
    }

    pub fn default_entity_capacity(self) -> usize {
        match self {
            Role::None => 0,
            Role::Server => 1024,
            Role::Client => 512,
            Role::Menu => 64,
        }
    }

    pub fn default_filename(self) -> Option<&'static str> {
        match self {
            Role::None => None,
            Role::Server => Some("progs/server.dat"),
            Role::Client => Some("progs/client.dat"),
            Role::Menu => Some("progs/menus.dat"),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
