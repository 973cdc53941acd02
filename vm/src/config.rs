use memory::NativeLayout;
use serde::{Deserialize, Serialize};

use crate::loader::{ChecksumPolicy, LoadOptions};
use crate::role::Role;

/// Per-role load settings. Unset values fall back to the role's defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_checksum: Option<u32>,
    pub checksum_policy: ChecksumPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_capacity: Option<usize>,
    /// Bytes of engine-native data at the front of each entity record.
    pub native_size: usize,
    /// Offset of the script field block inside the host entity struct.
    pub field_offset: usize,
}

impl Default for RoleConfig {
    fn default() -> Self {
        let native = NativeLayout::default();
        Self {
            filename: None,
            expected_checksum: None,
            checksum_policy: ChecksumPolicy::default(),
            entity_capacity: None,
            native_size: native.native_size,
            field_offset: native.field_offset,
        }
    }
}

/// Settings of one role with every default applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSettings {
    pub filename: String,
    pub load: LoadOptions,
    pub native: NativeLayout,
    pub entity_capacity: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Enables developer-only builtins.
    pub developer: bool,
    pub server: RoleConfig,
    pub client: RoleConfig,
    pub menu: RoleConfig,
}

impl RuntimeConfig {
    pub fn role(&self, role: Role) -> Option<&RoleConfig> {
        match role {
            Role::None => None,
            Role::Server => Some(&self.server),
            Role::Client => Some(&self.client),
            Role::Menu => Some(&self.menu),
        }
    }

    pub fn role_mut(&mut self, role: Role) -> Option<&mut RoleConfig> {
        match role {
            Role::None => None,
            Role::Server => Some(&mut self.server),
            Role::Client => Some(&mut self.client),
            Role::Menu => Some(&mut self.menu),
        }
    }

    /// Resolved settings for `role`; `None` for [`Role::None`].
    pub fn settings(&self, role: Role) -> Option<RoleSettings> {
        let cfg = self.role(role)?;
        let filename = cfg
            .filename
            .clone()
            .or_else(|| role.default_filename().map(str::to_string))?;
        Some(RoleSettings {
            filename,
            load: LoadOptions::new(cfg.expected_checksum, cfg.checksum_policy),
            native: NativeLayout::new(cfg.native_size, cfg.field_offset),
            entity_capacity: cfg
                .entity_capacity
                .unwrap_or_else(|| role.default_entity_capacity()),
        })
    }
}
