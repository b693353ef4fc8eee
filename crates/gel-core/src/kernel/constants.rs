/// Application name
pub const APP_NAME: &str = "Eina";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine API version offered to plugins (major, minor, patch)
pub const API_VERSION_MAJOR: u64 = 0;
pub const API_VERSION_MINOR: u64 = 1;
pub const API_VERSION_PATCH: u64 = 0;

/// Environment variable holding extra, colon-separated plugin directories
pub const PLUGINS_PATH_ENV: &str = "EINA_PLUGINS_PATH";

/// Per-user plugin directory, relative to `$HOME`
pub const USER_PLUGINS_DIR: &str = ".eina/plugins";

/// System plugin directory used when none was configured at build time
pub const DEFAULT_SYSTEM_PLUGINS_DIR: &str = "/usr/lib/eina/plugins";

/// System plugin directory, overridable at build time through `EINA_PLUGINS_LIB_DIR`
pub const SYSTEM_PLUGINS_DIR: &str = match option_env!("EINA_PLUGINS_LIB_DIR") {
    Some(dir) => dir,
    None => DEFAULT_SYSTEM_PLUGINS_DIR,
};

/// Configuration directory name, relative to `$HOME`
pub const CONFIG_DIR_NAME: &str = ".eina";

/// Name of the application settings file (extension comes from the config format)
pub const SETTINGS_NAME: &str = "settings";

/// Settings key holding the persisted plugin selection
pub const PLUGINS_SETTINGS_KEY: &str = "plugins";

/// Environment variable read by the logging plugin for its filter directives
pub const LOG_ENV: &str = "EINA_LOG";

/// Plugins every run activates before the persisted selection
pub const REQUIRED_PLUGINS: &[&str] = &["logging", "settings"];
