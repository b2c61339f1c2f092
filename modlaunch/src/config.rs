//! Reserved property keys and environment variable names shared across
//! components (§6 EXTERNAL INTERFACES).

/// Property key holding the absolute instance path, injected before every
/// container creation.
pub const KEY_INSTANCE: &str = "launcher.instance";

/// Property key holding `<instance>/conf`, injected before every container
/// creation.
pub const KEY_INSTANCE_CONFIGURATION: &str = "launcher.instance.configuration";

/// The container's own storage-location property key.
pub const KEY_CONTAINER_STORAGE: &str = "container.storage";

/// Scoped flag on the storage key: when set, the container is told to wipe
/// its storage area. Stripped unconditionally on `start` to avoid wiping
/// state left over from a previous run.
pub const KEY_CONTAINER_STORAGE_CLEAN: &str = "container.storage.clean";

/// Environment variable selecting the logging sink: `stderr` (default),
/// `stdout`, or a file path.
pub const ENV_LOGGING_FILE: &str = "launcher.logging.file";

/// Environment variable selecting the logging verbosity.
pub const ENV_LOGGING_LEVEL: &str = "launcher.logging.level";

/// The reserved keys a user-supplied properties file must never set
/// directly; the runtime overwrites them unconditionally before use.
pub const RESERVED_KEYS: &[&str] = &[KEY_INSTANCE, KEY_INSTANCE_CONFIGURATION, KEY_CONTAINER_STORAGE];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_keys_cover_injected_properties() {
        assert!(RESERVED_KEYS.contains(&KEY_INSTANCE));
        assert!(RESERVED_KEYS.contains(&KEY_INSTANCE_CONFIGURATION));
        assert!(RESERVED_KEYS.contains(&KEY_CONTAINER_STORAGE));
    }
}
