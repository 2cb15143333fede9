//! # Workshop Backend
//!
//! `ModuleBackend` over the local Steam workshop content directory.
//!
//! ## Directory Layout
//! ```text
//! <workshop>/                          <mods>/
//! ├── 1001/                            ├── 1001/          (synced copy)
//! │   ├── project.xml                  ├── .1002.partial/ (install staging)
//! │   ├── preview_icon.png             └── ...
//! │   └── ...
//! └── 1002/
//!     └── project.xml
//! ```
//!
//! ## Install Flow
//! ```text
//! sync_module(id, token)
//!   │
//!   ├── resolve entry dir from the last listing (rescan on miss)
//!   ├── copy entry ──► <mods>/.<id>.<call>.partial   (token checked per file)
//!   ├── cancelled or failed ──► remove staging, return diagnostics
//!   └── replace <mods>/<id> with the staging dir (rename)
//! ```

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use modbox_core::validation::validate_module_id;
use modbox_core::{Version, WorkshopModule};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::backend::{BackendResult, ModuleBackend};
use crate::config::BoxConfig;
use crate::error::{BoxError, BoxResult};

/// Manifest file every workshop entry carries.
pub const PROJECT_FILE: &str = "project.xml";

// =============================================================================
// project.xml
// =============================================================================

/// Fields read from a workshop entry's `project.xml`.
///
/// Numeric fields are kept as text so a blank or malformed version never
/// fails the whole listing.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModuleProject {
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "PreviewIconFile")]
    preview_icon_file: String,
    #[serde(rename = "PublishedFileId")]
    published_file_id: String,
    #[serde(rename = "VersionMajor")]
    version_major: String,
    #[serde(rename = "VersionMinor")]
    version_minor: String,
    #[serde(rename = "TargetBuild")]
    target_build: String,
    #[serde(rename = "Tags")]
    tags: ProjectTags,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProjectTags {
    #[serde(rename = "Tags")]
    tags: Vec<String>,
}

fn version_part(text: &str) -> i64 {
    text.trim().parse().unwrap_or(0)
}

impl ModuleProject {
    fn parse(entry: &str, text: &str) -> BoxResult<Self> {
        quick_xml::de::from_str(text).map_err(|e| BoxError::ProjectParse {
            entry: entry.to_string(),
            reason: e.to_string(),
        })
    }

    fn into_module(
        self,
        entry_dir: &Path,
        entry_name: &str,
        local: &HashSet<String>,
    ) -> WorkshopModule {
        let id = match self.published_file_id.trim() {
            "" => entry_name.to_string(),
            id => id.to_string(),
        };
        let icon = match self.preview_icon_file.trim() {
            "" => String::new(),
            file => entry_dir.join(file).to_string_lossy().into_owned(),
        };
        let version = Version::from_signed(
            version_part(&self.version_major),
            version_part(&self.version_minor),
            version_part(&self.target_build),
        );

        let synced = local.contains(&id);
        let mut module = WorkshopModule::new(id, self.title.trim())
            .with_version(version)
            .with_tags(self.tags.tags)
            .with_synced(synced);
        module.icon = icon;
        module
    }
}

// =============================================================================
// Workshop Backend
// =============================================================================

/// Lists workshop entries and installs them into the mods directory.
pub struct WorkshopBackend {
    workshop_dir: PathBuf,
    mods_dir: PathBuf,
    /// Module id → workshop entry directory, from the latest listing.
    index: RwLock<HashMap<String, PathBuf>>,
}

impl WorkshopBackend {
    pub fn new(workshop_dir: impl Into<PathBuf>, mods_dir: impl Into<PathBuf>) -> Self {
        WorkshopBackend {
            workshop_dir: workshop_dir.into(),
            mods_dir: mods_dir.into(),
            index: RwLock::new(HashMap::new()),
        }
    }

    /// Builds a backend from the configured paths.
    pub fn from_config(config: &BoxConfig) -> BoxResult<Self> {
        let workshop = config.require_workshop_dir()?;
        let mods = config.require_mods_dir()?;
        Ok(Self::new(workshop, mods))
    }

    pub fn workshop_dir(&self) -> &Path {
        &self.workshop_dir
    }

    pub fn mods_dir(&self) -> &Path {
        &self.mods_dir
    }

    async fn scan_and_index(&self) -> BoxResult<Vec<WorkshopModule>> {
        let workshop = self.workshop_dir.clone();
        let mods = self.mods_dir.clone();
        let entries = tokio::task::spawn_blocking(move || scan(&workshop, &mods)).await??;

        let mut index = self.index.write().unwrap_or_else(|e| e.into_inner());
        index.clear();
        let mut modules = Vec::with_capacity(entries.len());
        for (module, dir) in entries {
            index.insert(module.id.clone(), dir);
            modules.push(module);
        }
        Ok(modules)
    }

    fn lookup(&self, id: &str) -> Option<PathBuf> {
        self.index
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    async fn install(&self, id: &str, cancel: CancellationToken) -> BoxResult<()> {
        validate_module_id(id).map_err(|e| BoxError::InstallFailed {
            id: id.to_string(),
            reason: e.to_string(),
        })?;

        let entry = match self.lookup(id) {
            Some(entry) => entry,
            None => {
                self.scan_and_index().await?;
                self.lookup(id)
                    .ok_or_else(|| BoxError::ModuleNotFound(id.to_string()))?
            }
        };

        let mods = self.mods_dir.clone();
        let owned_id = id.to_string();
        tokio::task::spawn_blocking(move || install_entry(&entry, &mods, &owned_id, &cancel)).await?
    }
}

#[async_trait]
impl ModuleBackend for WorkshopBackend {
    async fn list_modules(&self) -> BackendResult<Vec<WorkshopModule>> {
        Ok(self.scan_and_index().await?)
    }

    async fn sync_module(&self, id: &str, cancel: CancellationToken) -> BackendResult<()> {
        Ok(self.install(id, cancel).await?)
    }
}

// =============================================================================
// Blocking filesystem work
// =============================================================================

fn scan(workshop: &Path, mods: &Path) -> BoxResult<Vec<(WorkshopModule, PathBuf)>> {
    if !workshop.exists() {
        debug!(dir = %workshop.display(), "Workshop directory missing, nothing listed");
        return Ok(Vec::new());
    }

    let mut dirs: Vec<PathBuf> = fs::read_dir(workshop)
        .map_err(|e| BoxError::WorkshopUnavailable(format!("{}: {}", workshop.display(), e)))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();

    let local = local_modules(mods)?;
    let mut modules = Vec::with_capacity(dirs.len());

    for dir in dirs {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let text = match fs::read_to_string(dir.join(PROJECT_FILE)) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(BoxError::ProjectRead {
                    entry: name,
                    reason: e.to_string(),
                })
            }
        };
        if text.trim().is_empty() {
            continue;
        }

        let project = ModuleProject::parse(&name, &text)?;
        let module = project.into_module(&dir, &name, &local);
        modules.push((module, dir));
    }

    info!(dir = %workshop.display(), modules = modules.len(), "Workshop scanned");
    Ok(modules)
}

/// Names of entries already present in the mods directory.
fn local_modules(mods: &Path) -> BoxResult<HashSet<String>> {
    match fs::read_dir(mods) {
        Ok(entries) => Ok(entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HashSet::new()),
        Err(e) => Err(e.into()),
    }
}

fn install_entry(
    entry: &Path,
    mods: &Path,
    id: &str,
    cancel: &CancellationToken,
) -> BoxResult<()> {
    let failed = |e: io::Error| BoxError::InstallFailed {
        id: id.to_string(),
        reason: e.to_string(),
    };

    fs::create_dir_all(mods).map_err(failed)?;
    // One staging dir per call; two installs of the same id never share one.
    let staging = mods.join(format!(".{}.{}.partial", id, Uuid::new_v4().simple()));

    if let Err(e) = copy_tree(entry, &staging, cancel).and_then(|()| {
        if cancel.is_cancelled() {
            Err(BoxError::Cancelled)
        } else {
            Ok(())
        }
    }) {
        if let Err(cleanup) = fs::remove_dir_all(&staging) {
            if cleanup.kind() != io::ErrorKind::NotFound {
                warn!(
                    staging = %staging.display(),
                    error = %cleanup,
                    "Failed to remove staging directory"
                );
            }
        }
        if e.is_cancelled() {
            info!(module = %id, "Install cancelled");
        }
        return Err(e);
    }

    let target = mods.join(id);
    if target.exists() {
        fs::remove_dir_all(&target).map_err(failed)?;
    }
    fs::rename(&staging, &target).map_err(failed)?;

    info!(module = %id, target = %target.display(), "Module installed");
    Ok(())
}

fn copy_tree(src: &Path, dst: &Path, cancel: &CancellationToken) -> BoxResult<()> {
    fs::create_dir_all(dst)?;

    for entry in WalkDir::new(src).min_depth(1) {
        if cancel.is_cancelled() {
            return Err(BoxError::Cancelled);
        }

        let entry = entry.map_err(|e| BoxError::Io(e.to_string()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| BoxError::Internal(e.to_string()))?;
        let target = dst.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &target)?;
        } else {
            debug!(path = %entry.path().display(), "Skipping non-regular file");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project_xml(id: &str, title: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<project>
  <PreviewIconFile>preview_icon.png</PreviewIconFile>
  <ItemDescription>Adds things.</ItemDescription>
  <Title>{title}</Title>
  <PublishedFileId>{id}</PublishedFileId>
  <VersionMajor>1</VersionMajor>
  <VersionMinor>2</VersionMinor>
  <TargetBuild>3</TargetBuild>
  <Tags>
    <Tags>Gameplay</Tags>
    <Tags> Classes </Tags>
    <Tags>Gameplay</Tags>
  </Tags>
</project>"#
        )
    }

    fn add_entry(workshop: &Path, id: &str, title: &str) -> PathBuf {
        let dir = workshop.join(id);
        fs::create_dir_all(dir.join("heroes")).unwrap();
        fs::write(dir.join(PROJECT_FILE), project_xml(id, title)).unwrap();
        fs::write(dir.join("heroes").join("hero.json"), "{}").unwrap();
        dir
    }

    struct Fixture {
        _root: TempDir,
        workshop: PathBuf,
        mods: PathBuf,
    }

    fn fixture() -> Fixture {
        let root = TempDir::new().unwrap();
        let workshop = root.path().join("workshop");
        let mods = root.path().join("mods");
        fs::create_dir_all(&workshop).unwrap();
        fs::create_dir_all(&mods).unwrap();
        Fixture {
            _root: root,
            workshop,
            mods,
        }
    }

    fn staging_dirs(mods: &Path) -> Vec<String> {
        fs::read_dir(mods)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".partial"))
            .collect()
    }

    #[tokio::test]
    async fn test_lists_entries_in_name_order() {
        let fx = fixture();
        add_entry(&fx.workshop, "2002", "Second");
        let first = add_entry(&fx.workshop, "1001", "First");
        fs::create_dir_all(fx.mods.join("2002")).unwrap();
        fs::create_dir_all(fx.workshop.join("3003")).unwrap();

        let backend = WorkshopBackend::new(&fx.workshop, &fx.mods);
        let modules = backend.list_modules().await.unwrap();

        assert_eq!(modules.len(), 2);
        assert_eq!(modules[0].id, "1001");
        assert_eq!(modules[0].title, "First");
        assert!(!modules[0].synced);
        assert!(modules[1].synced);
        assert_eq!(modules[0].version, Version::new(1, 2, 3));
        assert_eq!(modules[0].tags, vec!["Gameplay".to_string(), "Classes".to_string()]);
        assert_eq!(
            modules[0].icon,
            first.join("preview_icon.png").to_string_lossy()
        );
    }

    #[tokio::test]
    async fn test_missing_workshop_dir_lists_nothing() {
        let fx = fixture();
        let backend = WorkshopBackend::new(fx.workshop.join("absent"), &fx.mods);
        assert!(backend.list_modules().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_project_names_the_entry() {
        let fx = fixture();
        let dir = fx.workshop.join("4004");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(PROJECT_FILE), "<project><Title>x</Wrong></project>").unwrap();

        let backend = WorkshopBackend::new(&fx.workshop, &fx.mods);
        let failures = backend.list_modules().await.unwrap_err();

        assert_eq!(failures[0].code, "project");
        assert!(failures[0].description.contains("4004"));
    }

    #[tokio::test]
    async fn test_blank_version_defaults_to_zero() {
        let fx = fixture();
        let dir = fx.workshop.join("5005");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(PROJECT_FILE),
            concat!(
                "<project><Title>Bare</Title>",
                "<VersionMajor></VersionMajor><VersionMinor>-4</VersionMinor></project>",
            ),
        )
        .unwrap();

        let backend = WorkshopBackend::new(&fx.workshop, &fx.mods);
        let modules = backend.list_modules().await.unwrap();

        assert_eq!(modules[0].id, "5005");
        assert_eq!(modules[0].version, Version::default());
        assert!(modules[0].tags.is_empty());
        assert!(modules[0].icon.is_empty());
    }

    #[tokio::test]
    async fn test_sync_copies_entry_into_mods() {
        let fx = fixture();
        add_entry(&fx.workshop, "1001", "First");
        fs::create_dir_all(fx.mods.join("1001")).unwrap();
        fs::write(fx.mods.join("1001").join("stale.txt"), "old").unwrap();

        let backend = WorkshopBackend::new(&fx.workshop, &fx.mods);
        backend.list_modules().await.unwrap();
        backend
            .sync_module("1001", CancellationToken::new())
            .await
            .unwrap();

        let target = fx.mods.join("1001");
        assert!(target.join(PROJECT_FILE).is_file());
        assert!(target.join("heroes").join("hero.json").is_file());
        assert!(!target.join("stale.txt").exists());
        assert!(staging_dirs(&fx.mods).is_empty());
    }

    #[tokio::test]
    async fn test_sync_without_listing_rescans() {
        let fx = fixture();
        add_entry(&fx.workshop, "1001", "First");

        let backend = WorkshopBackend::new(&fx.workshop, &fx.mods);
        backend
            .sync_module("1001", CancellationToken::new())
            .await
            .unwrap();

        assert!(fx.mods.join("1001").is_dir());
    }

    #[tokio::test]
    async fn test_cancelled_sync_leaves_nothing_behind() {
        let fx = fixture();
        add_entry(&fx.workshop, "1001", "First");
        let backend = WorkshopBackend::new(&fx.workshop, &fx.mods);
        backend.list_modules().await.unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let failures = backend.sync_module("1001", token).await.unwrap_err();

        assert_eq!(failures[0].code, "cancelled");
        assert!(!fx.mods.join("1001").exists());
        assert!(staging_dirs(&fx.mods).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_module_is_not_found() {
        let fx = fixture();
        let backend = WorkshopBackend::new(&fx.workshop, &fx.mods);

        let failures = backend
            .sync_module("9999", CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(failures[0].code, "module");
    }

    #[tokio::test]
    async fn test_unsafe_id_is_rejected() {
        let fx = fixture();
        let backend = WorkshopBackend::new(&fx.workshop, &fx.mods);

        let failures = backend
            .sync_module("../escape", CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(failures[0].code, "install");
    }

    #[test]
    fn test_from_config_requires_paths() {
        let config = BoxConfig::default();
        assert!(WorkshopBackend::from_config(&config).is_err());

        let mut config = BoxConfig::default();
        config.paths.steam = Some(PathBuf::from("/steam"));
        config.paths.mods = Some(PathBuf::from("/mods"));
        let backend = WorkshopBackend::from_config(&config).unwrap();
        assert!(backend.workshop_dir().ends_with("steamapps/workshop/content/262060"));
    }
}
