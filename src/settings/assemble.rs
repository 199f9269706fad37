//! Builds the configuration stack described by [`LivecfgSettings`].

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::error::ConfigResult;
use crate::lifecycle::Shutdown;
use crate::loader::{ConfigurationSourceLoader, Encoding};
use crate::reload::{ConfigurationReloader, ReloadInterval};
use crate::resource::{
    ApplicationVersion, BaseDirectory, BasicResourceNameResolver, Environment,
    FixedResourceSelector, PlatformDirectory, Resource, ResourceNameResolver, ResourceSelector,
    ScanningResourceSelector, VersionedResourceNameResolver,
};
use crate::service::ConfigurationService;
use crate::settings::schema::{LivecfgSettings, LocationKind, LocationSettings};
use crate::snapshot::ResourceSnapshotManager;

/// An initialized service plus its reload policy.
#[derive(Debug)]
pub struct Assembly {
    pub service: Arc<ConfigurationService>,
    pub reload_interval: Option<ReloadInterval>,
}

impl Assembly {
    /// Spawn the periodic reloader, if reloading is enabled.
    pub fn start_reloader(&self, shutdown: &Shutdown) -> Option<JoinHandle<()>> {
        self.reload_interval.map(|interval| {
            ConfigurationReloader::new(self.service.clone(), interval).spawn(shutdown.subscribe())
        })
    }
}

/// engine → selector → manager → service. Settings are assumed validated.
pub fn assemble(settings: &LivecfgSettings, env: &Environment) -> ConfigResult<Assembly> {
    let loader = settings.engine.loader();
    let defaults = match &settings.defaults {
        Some(defaults) => Some(Resource::file(env.expand(&defaults.path)?)),
        None => None,
    };

    let service = match &settings.path {
        Some(path) => {
            let mut selector = FixedResourceSelector::new(env.expand(path)?);
            if let Some(defaults) = defaults {
                selector = selector.with_defaults(defaults);
            }
            build_service(settings, selector, loader)?
        }
        None => {
            let bases = base_directories(settings);
            let naming = naming(settings);
            let mut selector =
                ScanningResourceSelector::new(&bases, naming.as_ref(), env, &settings.name)?;
            if let Some(defaults) = defaults {
                selector = selector.with_defaults(defaults);
            }
            build_service(settings, selector, loader)?
        }
    };

    let reload_interval = match settings.reload_interval_ms {
        0 => None,
        millis => ReloadInterval::from_millis(millis),
    };
    Ok(Assembly {
        service: Arc::new(service),
        reload_interval,
    })
}

fn build_service(
    settings: &LivecfgSettings,
    selector: impl ResourceSelector + 'static,
    loader: Arc<dyn ConfigurationSourceLoader>,
) -> ConfigResult<ConfigurationService> {
    let manager = ResourceSnapshotManager::builder(selector, loader)
        .encoding(parse_encoding(settings.encoding.as_deref()))
        .defaults_encoding(parse_encoding(
            settings.defaults.as_ref().and_then(|d| d.encoding.as_deref()),
        ))
        .build()?;
    ConfigurationService::new(settings.name.clone(), manager)
}

fn parse_encoding(encoding: Option<&str>) -> Option<Encoding> {
    encoding.and_then(|e| Encoding::from_str(e).ok())
}

fn base_directories(settings: &LivecfgSettings) -> Vec<BaseDirectory> {
    if settings.locations.is_empty() {
        return BaseDirectory::default_search(&settings.name);
    }
    settings
        .locations
        .iter()
        .filter_map(|location| base_directory(location, &settings.name))
        .collect()
}

fn base_directory(location: &LocationSettings, app_name: &str) -> Option<BaseDirectory> {
    let value = location.value.clone();
    let base = match location.kind {
        LocationKind::Path => BaseDirectory::Path(value?),
        LocationKind::EnvironmentVariable => BaseDirectory::EnvironmentVariable(value?),
        LocationKind::Property => BaseDirectory::Property(value?),
        LocationKind::Home => BaseDirectory::Home(
            value
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".config").join(app_name)),
        ),
        LocationKind::Platform => match value.as_deref() {
            Some("system-config") => BaseDirectory::Platform(PlatformDirectory::SystemConfig),
            _ => BaseDirectory::Platform(PlatformDirectory::UserConfig),
        },
    };
    Some(base)
}

fn naming(settings: &LivecfgSettings) -> Box<dyn ResourceNameResolver> {
    let prefix = settings
        .naming
        .prefix
        .clone()
        .unwrap_or_else(|| settings.name.clone());
    let extension = settings
        .naming
        .extension
        .clone()
        .unwrap_or_else(|| settings.engine.default_extension().to_string());
    let version = settings
        .version
        .as_deref()
        .and_then(|v| ApplicationVersion::from_str(v).ok());
    match version {
        Some(version) => Box::new(VersionedResourceNameResolver::new(prefix, version, extension)),
        None => Box::new(BasicResourceNameResolver::new(prefix, extension)),
    }
}
