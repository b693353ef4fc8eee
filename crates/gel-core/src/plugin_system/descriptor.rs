//! Static plugin metadata.
//!
//! A [`PluginDescriptor`] is built once per plugin, either by the plugin
//! itself (embedded in its module, or handed over by the host for builtin
//! plugins) or from a `<name>.toml` descriptor file sitting next to the
//! module. The engine never changes a descriptor after discovery, apart
//! from recording where its module lives.
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::plugin_system::dependency::parse_dependency_list;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::version::{parse_version, VersionRange};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDescriptor {
    name: String,
    version: String,
    dependencies: Vec<String>,
    short_description: Option<String>,
    long_description: Option<String>,
    icon_path: Option<PathBuf>,
    author: Option<String>,
    url: Option<String>,
    hidden: bool,
    api: Option<String>,
    pathname: Option<PathBuf>,
}

impl PluginDescriptor {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            dependencies: Vec::new(),
            short_description: None,
            long_description: None,
            icon_path: None,
            author: None,
            url: None,
            hidden: false,
            api: None,
            pathname: None,
        }
    }

    /// Dependencies as a comma-separated list, e.g. `"settings,window"`
    pub fn with_dependencies(mut self, depends: &str) -> Self {
        self.dependencies = parse_dependency_list(depends);
        self
    }

    pub fn with_short_description(mut self, text: impl Into<String>) -> Self {
        self.short_description = Some(text.into());
        self
    }

    pub fn with_long_description(mut self, text: impl Into<String>) -> Self {
        self.long_description = Some(text.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<PathBuf>) -> Self {
        self.icon_path = Some(icon.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Hidden plugins are never written to the persisted selection
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Semver requirement on the engine API version, e.g. `"^0.1"`
    pub fn with_api(mut self, requirement: impl Into<String>) -> Self {
        self.api = Some(requirement.into());
        self
    }

    pub(crate) fn with_pathname(mut self, pathname: Option<PathBuf>) -> Self {
        self.pathname = pathname;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn short_description(&self) -> Option<&str> {
        self.short_description.as_deref()
    }

    pub fn long_description(&self) -> Option<&str> {
        self.long_description.as_deref()
    }

    pub fn icon_path(&self) -> Option<&Path> {
        self.icon_path.as_deref()
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn api_requirement(&self) -> Option<&str> {
        self.api.as_deref()
    }

    /// Module file, `None` for plugins linked into the host
    pub fn pathname(&self) -> Option<&Path> {
        self.pathname.as_deref()
    }

    /// Directory holding the module and its data files
    pub fn dirname(&self) -> Option<&Path> {
        self.pathname.as_deref().and_then(Path::parent)
    }

    pub fn is_builtin(&self) -> bool {
        self.pathname.is_none()
    }

    /// How the plugin is referred to in the persisted selection
    pub fn reference(&self) -> String {
        match &self.pathname {
            Some(path) => path.display().to_string(),
            None => self.name.clone(),
        }
    }

    /// Parses a `<name>.toml` descriptor file found in `plugin_dir`.
    ///
    /// The `[plugin]` table must carry `name`, a semver `version`, `author`,
    /// `url` and `depends`; the name must match the directory so the module symbol can
    /// be derived from it. A relative `icon` is taken relative to `plugin_dir`.
    pub fn from_toml_str(content: &str, plugin_dir: &Path) -> Result<Self, PluginSystemError> {
        let invalid = |message: String| PluginSystemError::InvalidDescriptor {
            path: plugin_dir.to_path_buf(),
            message,
        };

        let file: DescriptorFile = toml::from_str(content).map_err(|e| invalid(e.to_string()))?;
        let raw = file.plugin;

        if raw.name.trim().is_empty() {
            return Err(invalid("empty plugin name".to_string()));
        }
        if let Some(dir_name) = plugin_dir.file_name().and_then(|n| n.to_str()) {
            if dir_name != raw.name {
                return Err(invalid(format!(
                    "plugin '{}' must live in a directory of the same name, found '{}'",
                    raw.name, dir_name
                )));
            }
        }
        parse_version(&raw.version).map_err(|e| invalid(e.to_string()))?;
        if let Some(api) = &raw.api {
            VersionRange::from_constraint(api).map_err(|e| invalid(e.to_string()))?;
        }

        let mut descriptor = PluginDescriptor::new(raw.name, raw.version)
            .with_dependencies(&raw.depends)
            .with_author(raw.author)
            .with_url(raw.url)
            .hidden(raw.hidden);
        descriptor.short_description = raw.short_description;
        descriptor.long_description = raw.long_description;
        descriptor.api = raw.api;
        descriptor.icon_path = raw.icon.map(|icon| {
            let icon = PathBuf::from(icon);
            if icon.is_relative() { plugin_dir.join(icon) } else { icon }
        });

        Ok(descriptor)
    }
}

#[derive(Deserialize)]
struct DescriptorFile {
    plugin: RawDescriptor,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawDescriptor {
    name: String,
    version: String,
    author: String,
    url: String,
    depends: String,
    short_description: Option<String>,
    long_description: Option<String>,
    icon: Option<String>,
    #[serde(default)]
    hidden: bool,
    api: Option<String>,
}
