//! Plugin discovery and module loading.
//!
//! Layout of a search path:
//!
//! ```text
//! <search path>/
//!     hello/
//!         hello.toml      optional descriptor file
//!         libhello.so     module exporting `hello_plugin`
//! ```
//!
//! With a descriptor file the module is not opened during a scan. Without
//! one, the module is opened, its declaration symbol read for the embedded
//! descriptor, and closed again. Scanning never runs plugin hooks.
use std::any::Any;
use std::collections::HashSet;
use std::ffi::OsString;
use std::panic;
use std::path::{Component, Path, PathBuf};

use libloading::{Library, Symbol};
use tokio::fs;

use crate::kernel::constants;
use crate::plugin_system::descriptor::PluginDescriptor;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::traits::Plugin;
use crate::plugin_system::version::parse_version;

/// Bumped whenever [`PluginDeclaration`] changes shape
pub const PLUGIN_ABI_VERSION: u32 = 1;

/// Version of the engine crate a module was compiled against
pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The one symbol a plugin module exports, named `<plugin name>_plugin`.
///
/// `abi_version` comes first and is checked before anything else is read.
/// Use [`declare_plugin!`](crate::declare_plugin) to define it.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct PluginDeclaration {
    pub abi_version: u32,
    pub core_version: &'static str,
    pub descriptor: fn() -> PluginDescriptor,
    pub create: fn() -> Box<dyn Plugin>,
}

/// Exports the declaration symbol of a plugin module.
///
/// ```ignore
/// fn descriptor() -> PluginDescriptor { PluginDescriptor::new("hello", "0.1.0") }
/// fn create() -> Box<dyn Plugin> { Box::new(HelloPlugin::default()) }
///
/// gel_core::declare_plugin!(hello_plugin, descriptor, create);
/// ```
#[macro_export]
macro_rules! declare_plugin {
    ($symbol:ident, $descriptor:path, $create:path) => {
        #[allow(non_upper_case_globals)]
        #[unsafe(no_mangle)]
        pub static $symbol: $crate::plugin_system::loader::PluginDeclaration =
            $crate::plugin_system::loader::PluginDeclaration {
                abi_version: $crate::plugin_system::loader::PLUGIN_ABI_VERSION,
                core_version: $crate::plugin_system::loader::CORE_VERSION,
                descriptor: $descriptor,
                create: $create,
            };
    };
}

/// Name of the declaration symbol for `plugin_name`
pub fn symbol_name(plugin_name: &str) -> String {
    format!("{}_plugin", plugin_name.replace('-', "_"))
}

/// Platform file name of the module for `plugin_name` (`libhello.so` on Linux)
pub fn module_file_name(plugin_name: &str) -> OsString {
    libloading::library_filename(plugin_name)
}

/// Search paths in precedence order: entries of `env_value` (colon-separated,
/// empty entries skipped), the per-user directory below `home`, then the
/// system directory.
pub fn build_search_paths(env_value: Option<&str>, home: Option<&Path>) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = Vec::new();
    let mut push = |path: PathBuf| {
        if !paths.contains(&path) {
            paths.push(path);
        }
    };

    if let Some(value) = env_value {
        value.split(':').filter(|entry| !entry.is_empty()).map(PathBuf::from).for_each(&mut push);
    }
    if let Some(home) = home {
        push(home.join(constants::USER_PLUGINS_DIR));
    }
    push(PathBuf::from(constants::SYSTEM_PLUGINS_DIR));

    paths
}

/// [`build_search_paths`] from the process environment
pub fn default_search_paths() -> Vec<PathBuf> {
    let env_value = std::env::var(constants::PLUGINS_PATH_ENV).ok();
    let home = std::env::var_os("HOME").map(PathBuf::from);
    build_search_paths(env_value.as_deref(), home.as_deref())
}

/// Resolved form of `path`; lexically normalized when it does not exist
fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| {
        let mut normalized = PathBuf::new();
        for component in path.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    normalized.pop();
                }
                other => normalized.push(other.as_os_str()),
            }
        }
        normalized
    })
}

/// Whether `path` lies below one of `search_paths`
pub fn is_within_search_paths(path: &Path, search_paths: &[PathBuf]) -> bool {
    let path = canonical(path);
    search_paths.iter().any(|dir| path.starts_with(canonical(dir)))
}

/// Message of a caught panic payload
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic reason".to_string()
    }
}

/// Opens the module of `name` at `path` and reads its declaration.
///
/// The declaration's function pointers point into the returned library and
/// must not outlive it.
pub fn open_module(name: &str, path: &Path) -> Result<(Library, PluginDeclaration), PluginSystemError> {
    // SAFETY: loading a plugin runs its initialisers; modules in the search
    // paths are trusted the same way the host binary is.
    let library = unsafe { Library::new(path) }.map_err(|e| PluginSystemError::ModuleNotLoadable {
        name: name.to_string(),
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let symbol = symbol_name(name);
    let declaration = {
        // SAFETY: the symbol is declared by `declare_plugin!` as a `PluginDeclaration` static.
        let sym: Symbol<*const PluginDeclaration> = unsafe { library.get(symbol.as_bytes()) }
            .map_err(|e| PluginSystemError::SymbolNotFound {
                name: name.to_string(),
                symbol: symbol.clone(),
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        let ptr = *sym;
        if ptr.is_null() {
            return Err(PluginSystemError::SymbolNotFound {
                name: name.to_string(),
                symbol,
                path: path.to_path_buf(),
                message: "symbol resolves to a null address".to_string(),
            });
        }

        // SAFETY: `abi_version` is the first field of a `repr(C)` struct and
        // stays readable whatever the rest of the layout is.
        let abi_version = unsafe { (*ptr).abi_version };
        if abi_version != PLUGIN_ABI_VERSION {
            return Err(PluginSystemError::AbiMismatch {
                name: name.to_string(),
                expected: PLUGIN_ABI_VERSION.to_string(),
                found: abi_version.to_string(),
            });
        }
        // SAFETY: same ABI version, so the whole declaration has our layout.
        unsafe { *ptr }
    };

    if declaration.core_version != CORE_VERSION {
        return Err(PluginSystemError::AbiMismatch {
            name: name.to_string(),
            expected: format!("{PLUGIN_ABI_VERSION} (gel-core {CORE_VERSION})"),
            found: format!("{} (gel-core {})", declaration.abi_version, declaration.core_version),
        });
    }

    Ok((library, declaration))
}

/// Reads the descriptor embedded in a module, then closes the module
fn read_module_descriptor(name: &str, module_path: &Path) -> Result<PluginDescriptor, PluginSystemError> {
    let (library, declaration) = open_module(name, module_path)?;
    let descriptor = panic::catch_unwind(declaration.descriptor).map_err(|payload| PluginSystemError::InfoNotFound {
        name: name.to_string(),
        reason: format!("descriptor function panicked: {}", panic_message(payload)),
    })?;
    drop(library);

    check_declared_name(name, &descriptor)?;
    parse_version(descriptor.version())?;
    Ok(descriptor)
}

/// A module must declare the plugin its directory and symbol are named after
pub(crate) fn check_declared_name(name: &str, descriptor: &PluginDescriptor) -> Result<(), PluginSystemError> {
    if descriptor.name() == name {
        Ok(())
    } else {
        Err(PluginSystemError::InfoNotFound {
            name: name.to_string(),
            reason: format!("module declares itself as '{}'", descriptor.name()),
        })
    }
}

/// Files a plugin directory may hold
struct PluginFiles {
    name: String,
    descriptor_path: PathBuf,
    module_path: PathBuf,
}

impl PluginFiles {
    fn of(plugin_dir: &Path) -> Result<Self, PluginSystemError> {
        let name = plugin_dir
            .file_name()
            .and_then(|n| n.to_str())
            .map(String::from)
            .ok_or_else(|| PluginSystemError::InvalidPath {
                path: plugin_dir.to_path_buf(),
                reason: "plugin directory has no usable name".to_string(),
            })?;
        Ok(Self {
            descriptor_path: plugin_dir.join(format!("{name}.toml")),
            module_path: plugin_dir.join(module_file_name(&name)),
            name,
        })
    }

    fn read_error(&self, source: std::io::Error) -> PluginSystemError {
        PluginSystemError::Io {
            path: self.descriptor_path.clone(),
            source,
        }
    }

    /// Builds the descriptor from the descriptor file's `content`, or from
    /// the module when there is no descriptor file
    fn describe(self, plugin_dir: &Path, content: Option<String>, module_exists: bool) -> Result<PluginDescriptor, PluginSystemError> {
        let descriptor = match content {
            Some(content) => PluginDescriptor::from_toml_str(&content, plugin_dir)?,
            None if module_exists => read_module_descriptor(&self.name, &self.module_path)?,
            None => {
                return Err(PluginSystemError::InfoNotFound {
                    name: self.name,
                    reason: format!("neither a descriptor file nor {} found", self.module_path.display()),
                });
            }
        };
        Ok(descriptor.with_pathname(Some(self.module_path)))
    }
}

/// Reads the plugin living in `plugin_dir`, preferring its descriptor file
pub fn read_plugin_dir(plugin_dir: &Path) -> Result<PluginDescriptor, PluginSystemError> {
    let files = PluginFiles::of(plugin_dir)?;
    let content = if files.descriptor_path.is_file() {
        Some(std::fs::read_to_string(&files.descriptor_path).map_err(|e| files.read_error(e))?)
    } else {
        None
    };
    let module_exists = files.module_path.is_file();
    files.describe(plugin_dir, content, module_exists)
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|meta| meta.is_file())
}

async fn read_plugin_dir_async(plugin_dir: &Path) -> Result<PluginDescriptor, PluginSystemError> {
    let files = PluginFiles::of(plugin_dir)?;
    let content = if is_file(&files.descriptor_path).await {
        Some(fs::read_to_string(&files.descriptor_path).await.map_err(|e| files.read_error(e))?)
    } else {
        None
    };
    let module_exists = is_file(&files.module_path).await;
    files.describe(plugin_dir, content, module_exists)
}

async fn candidate_dirs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut read_dir = fs::read_dir(dir).await?;
    let mut candidates = Vec::new();
    while let Some(entry) = read_dir.next_entry().await? {
        let path = entry.path();
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => candidates.push(path),
            Ok(_) => {}
            Err(e) => log::warn!("Failed to get metadata for {}: {}", path.display(), e),
        }
    }
    candidates.sort();
    Ok(candidates)
}

/// Catalogs every plugin found in `search_paths`.
///
/// Earlier paths win: a name found again later is skipped, as is a module
/// reached twice through different paths. Unreadable candidates are logged
/// and skipped.
pub async fn scan(search_paths: &[PathBuf]) -> Vec<PluginDescriptor> {
    let mut descriptors: Vec<PluginDescriptor> = Vec::new();
    let mut seen_names: HashSet<String> = HashSet::new();
    let mut seen_paths: HashSet<PathBuf> = HashSet::new();

    for dir in search_paths {
        match fs::metadata(dir).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                log::debug!("Plugin path {} is not a directory, skipping", dir.display());
                continue;
            }
            Err(_) => {
                log::debug!("Plugin path {} does not exist, skipping", dir.display());
                continue;
            }
        }

        let candidates = match candidate_dirs(dir).await {
            Ok(candidates) => candidates,
            Err(e) => {
                log::warn!("Error scanning plugin path {}: {}", dir.display(), e);
                continue;
            }
        };

        for plugin_dir in candidates {
            let canonical_dir = canonical(&plugin_dir);
            if !seen_paths.insert(canonical_dir) {
                log::debug!("Plugin {} already scanned through another path", plugin_dir.display());
                continue;
            }

            match read_plugin_dir_async(&plugin_dir).await {
                Ok(descriptor) => {
                    if seen_names.insert(descriptor.name().to_string()) {
                        log::debug!("Found plugin '{}' in {}", descriptor.name(), plugin_dir.display());
                        descriptors.push(descriptor);
                    } else {
                        log::info!(
                            "Plugin '{}' in {} is shadowed by an earlier search path",
                            descriptor.name(),
                            plugin_dir.display()
                        );
                    }
                }
                Err(e) => log::warn!("Skipping plugin candidate {}: {}", plugin_dir.display(), e),
            }
        }
    }

    descriptors
}
