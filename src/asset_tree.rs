use anyhow::{bail, Context, Result};
use notify::event::ModifyKind;
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::time::Duration;

use crate::asset_lib::{AssetLibrary, AssetType, IoError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetInformation {
    pub path: PathBuf,
    pub display_name: String,
    pub asset_type: AssetType,
    pub is_open: bool,
}

/// Group of assets; `children` index into [`AssetViewTree::all_assets`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetCategory {
    pub display_name: String,
    pub children: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssetViewTree {
    pub type_categories: Vec<AssetCategory>,
    pub all_assets: Vec<AssetInformation>,
}

impl AssetViewTree {
    /// Lists the library; `is_open` is answered by the caller's object table.
    pub fn build(library: &AssetLibrary, is_open: impl Fn(&Path) -> bool) -> Result<Self, IoError> {
        let listed = library.list_assets()?;
        let mut tree = AssetViewTree::default();
        for (path, asset_type) in listed {
            let index = tree.all_assets.len();
            let display_name =
                path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
            tree.all_assets.push(AssetInformation { is_open: is_open(&path), path, display_name, asset_type });
            let label = asset_type.label();
            match tree.type_categories.iter_mut().find(|category| category.display_name == label) {
                Some(category) => category.children.push(index),
                None => tree
                    .type_categories
                    .push(AssetCategory { display_name: label.to_string(), children: vec![index] }),
            }
        }
        tree.type_categories.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(tree)
    }

    pub fn category(&self, label: &str) -> Option<impl Iterator<Item = &AssetInformation> + '_> {
        let category = self.type_categories.iter().find(|category| category.display_name == label)?;
        Some(category.children.iter().filter_map(|index| self.all_assets.get(*index)))
    }
}

/// Watches the asset root while a tree view is open so the engine can push refreshed trees.
pub struct AssetTreeWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
}

impl AssetTreeWatcher {
    pub fn new(root: &Path) -> Result<Self> {
        if !root.exists() {
            bail!("asset root '{}' does not exist", root.display());
        }
        let (tx, rx) = channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        watcher
            .configure(NotifyConfig::default().with_compare_contents(false).with_poll_interval(Duration::from_millis(300)))
            .context("configure asset tree watcher")?;
        watcher.watch(root, RecursiveMode::Recursive).with_context(|| format!("watch {}", root.display()))?;
        Ok(Self { _watcher: watcher, rx })
    }

    /// Asset paths that were created, renamed or removed since the last call.
    pub fn drain_changes(&mut self) -> BTreeSet<PathBuf> {
        let mut changed = BTreeSet::new();
        while let Ok(event) = self.rx.try_recv() {
            match event {
                Ok(event) => {
                    if !Self::is_relevant(&event.kind) {
                        continue;
                    }
                    changed.extend(event.paths.into_iter().filter(|path| AssetType::from_path(path).is_some()));
                }
                Err(err) => log::warn!("[assets] tree watcher error: {err}"),
            }
        }
        changed
    }

    fn is_relevant(kind: &EventKind) -> bool {
        matches!(kind, EventKind::Modify(ModifyKind::Name(_)) | EventKind::Create(_) | EventKind::Remove(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn groups_assets_by_type() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("shaders")).expect("mkdir");
        fs::write(dir.path().join("shaders/a.vs"), "").expect("write");
        fs::write(dir.path().join("shaders/a.ps"), "").expect("write");
        fs::write(dir.path().join("intro.bs"), "").expect("write");
        fs::write(dir.path().join("notes.txt"), "").expect("write");
        let library = AssetLibrary::new(dir.path());
        let tree = AssetViewTree::build(&library, |path| path.ends_with("a.ps")).expect("build");
        assert_eq!(tree.all_assets.len(), 3);
        let labels: Vec<_> = tree.type_categories.iter().map(|c| c.display_name.as_str()).collect();
        assert_eq!(labels, vec!["Shaders", "Timeline Scripts"]);
        let shaders: Vec<_> = tree.category("Shaders").expect("shaders").collect();
        assert_eq!(shaders.len(), 2);
        assert!(shaders.iter().any(|info| info.is_open && info.display_name == "a.ps"));
    }
}
