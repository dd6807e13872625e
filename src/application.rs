//! Engine applications: the code the engine thread runs once per frame.
//!
//! An application is either the built-in one or a dynamic library exporting
//! [`APP_ENTRY_SYMBOL`]. The entry returns an [`AppExport`] whose `create` hands back a boxed
//! [`PegasusApp`] as a raw fat pointer.

use anyhow::Result;
use libloading::Library;
use std::mem;
use std::path::{Path, PathBuf};
use std::ptr;
use thiserror::Error;

use crate::console::LogChannel;
use crate::runtime::Runtime;

pub const PEGASUS_APP_API_VERSION: u32 = 1;
pub const APP_ENTRY_SYMBOL: &[u8] = b"pegasus_app_entry\0";

pub trait PegasusApp: Send {
    fn name(&self) -> &str;

    fn initialize(&mut self, _runtime: &mut Runtime) -> Result<()> {
        Ok(())
    }

    fn frame(&mut self, runtime: &mut Runtime, dt: f32) -> Result<()>;

    fn viewport_resized(&mut self, _runtime: &mut Runtime, _width: u32, _height: u32) {}

    fn shutdown(&mut self, _runtime: &mut Runtime) {}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadingError {
    #[error("invalid application file name '{}'", .0.display())]
    InvalidFileName(PathBuf),
    #[error("cannot load application '{}': {reason}", .path.display())]
    InvalidApplication { path: PathBuf, reason: String },
    #[error("application '{}' does not export '{symbol}'", .path.display())]
    InvalidInterface { path: PathBuf, symbol: String },
    #[error("application targets api v{found}, editor provides v{expected}")]
    ApiMismatch { found: u32, expected: u32 },
    #[error("application '{}' returned a null instance", .0.display())]
    NullApplication(PathBuf),
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct AppHandle {
    data: *mut (),
    vtable: *mut (),
}

impl AppHandle {
    pub const fn null() -> Self {
        Self { data: ptr::null_mut(), vtable: ptr::null_mut() }
    }

    pub fn is_null(&self) -> bool {
        self.data.is_null() || self.vtable.is_null()
    }

    /// # Safety
    /// The handle must be turned back into a box exactly once, by the same build of this crate.
    pub unsafe fn from_box(app: Box<dyn PegasusApp>) -> Self {
        let raw: *mut dyn PegasusApp = Box::into_raw(app);
        let erased: (*mut (), *mut ()) = mem::transmute(raw);
        Self { data: erased.0, vtable: erased.1 }
    }

    /// # Safety
    /// The handle must come from [`AppHandle::from_box`] and not be null.
    pub unsafe fn into_box(self) -> Box<dyn PegasusApp> {
        let raw: *mut dyn PegasusApp = mem::transmute((self.data, self.vtable));
        Box::from_raw(raw)
    }
}

pub type AppEntryFn = unsafe extern "C" fn() -> AppExport;
pub type AppCreateFn = unsafe extern "C" fn() -> AppHandle;

#[repr(C)]
pub struct AppExport {
    pub api_version: u32,
    pub create: AppCreateFn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplicationSource {
    Builtin,
    Library(PathBuf),
}

impl ApplicationSource {
    pub fn from_option(path: Option<PathBuf>) -> Self {
        path.map_or(Self::Builtin, Self::Library)
    }
}

pub struct LoadedApplication {
    // Declared before the library so the instance is dropped while its code is still mapped.
    app: Box<dyn PegasusApp>,
    _library: Option<Library>,
}

impl LoadedApplication {
    pub fn builtin() -> Self {
        Self { app: Box::new(BuiltinApp::default()), _library: None }
    }

    pub fn app_mut(&mut self) -> &mut dyn PegasusApp {
        self.app.as_mut()
    }

    pub fn name(&self) -> &str {
        self.app.name()
    }

    pub fn is_dynamic(&self) -> bool {
        self._library.is_some()
    }
}

pub fn load_application(source: &ApplicationSource) -> Result<LoadedApplication, LoadingError> {
    match source {
        ApplicationSource::Builtin => Ok(LoadedApplication::builtin()),
        ApplicationSource::Library(path) => load_library(path),
    }
}

fn load_library(path: &Path) -> Result<LoadedApplication, LoadingError> {
    if path.as_os_str().is_empty() || path.file_name().is_none() {
        return Err(LoadingError::InvalidFileName(path.to_path_buf()));
    }

    let library = unsafe { Library::new(path) }
        .map_err(|err| LoadingError::InvalidApplication { path: path.to_path_buf(), reason: err.to_string() })?;

    let export = {
        let entry = unsafe { library.get::<AppEntryFn>(APP_ENTRY_SYMBOL) }.map_err(|_| {
            LoadingError::InvalidInterface { path: path.to_path_buf(), symbol: "pegasus_app_entry".to_string() }
        })?;
        unsafe { entry() }
    };

    let app = instantiate(path, &export)?;
    log::info!("[app] loaded '{}' from {}", app.name(), path.display());
    Ok(LoadedApplication { app, _library: Some(library) })
}

/// Checks the export's api version and creates the instance it describes.
fn instantiate(path: &Path, export: &AppExport) -> Result<Box<dyn PegasusApp>, LoadingError> {
    if export.api_version != PEGASUS_APP_API_VERSION {
        return Err(LoadingError::ApiMismatch { found: export.api_version, expected: PEGASUS_APP_API_VERSION });
    }
    let handle = unsafe { (export.create)() };
    if handle.is_null() {
        return Err(LoadingError::NullApplication(path.to_path_buf()));
    }
    Ok(unsafe { handle.into_box() })
}

/// Application used when no library is given: keeps the frame loop and viewport bookkeeping
/// alive without drawing anything.
#[derive(Debug, Default)]
pub struct BuiltinApp {
    elapsed: f32,
}

impl PegasusApp for BuiltinApp {
    fn name(&self) -> &str {
        "builtin"
    }

    fn initialize(&mut self, runtime: &mut Runtime) -> Result<()> {
        runtime.log(LogChannel::App, "built-in application ready");
        Ok(())
    }

    fn frame(&mut self, _runtime: &mut Runtime, dt: f32) -> Result<()> {
        self.elapsed += dt;
        Ok(())
    }

    fn viewport_resized(&mut self, runtime: &mut Runtime, width: u32, height: u32) {
        runtime.log(LogChannel::App, format!("viewport {width}x{height}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path_is_an_invalid_file_name() {
        let err = load_application(&ApplicationSource::Library(PathBuf::new())).err().expect("error");
        assert_eq!(err, LoadingError::InvalidFileName(PathBuf::new()));
    }

    #[test]
    fn missing_library_is_an_invalid_application() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("libmissing_app.so");
        match load_application(&ApplicationSource::Library(path.clone())) {
            Err(LoadingError::InvalidApplication { path: reported, .. }) => assert_eq!(reported, path),
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("missing library loaded"),
        }
    }

    #[test]
    fn builtin_source_when_no_path() {
        assert_eq!(ApplicationSource::from_option(None), ApplicationSource::Builtin);
        let loaded = load_application(&ApplicationSource::Builtin).expect("builtin");
        assert_eq!(loaded.name(), "builtin");
        assert!(!loaded.is_dynamic());
    }

    unsafe extern "C" fn create_builtin() -> AppHandle {
        AppHandle::from_box(Box::new(BuiltinApp::default()))
    }

    unsafe extern "C" fn create_nothing() -> AppHandle {
        AppHandle::null()
    }

    #[test]
    fn export_from_another_api_version_is_rejected() {
        let export = AppExport { api_version: PEGASUS_APP_API_VERSION + 1, create: create_builtin };
        match instantiate(Path::new("libnext.so"), &export) {
            Err(err) => assert_eq!(err, LoadingError::ApiMismatch { found: 2, expected: 1 }),
            Ok(_) => panic!("mismatched api accepted"),
        }
    }

    #[test]
    fn null_instance_is_rejected() {
        let export = AppExport { api_version: PEGASUS_APP_API_VERSION, create: create_nothing };
        match instantiate(Path::new("libnull.so"), &export) {
            Err(err) => assert_eq!(err, LoadingError::NullApplication(PathBuf::from("libnull.so"))),
            Ok(_) => panic!("null instance accepted"),
        }
        let export = AppExport { api_version: PEGASUS_APP_API_VERSION, create: create_builtin };
        assert_eq!(instantiate(Path::new("libok.so"), &export).expect("instance").name(), "builtin");
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    #[test]
    fn library_without_entry_is_an_invalid_interface() {
        let path = PathBuf::from("libc.so.6");
        match load_application(&ApplicationSource::Library(path.clone())) {
            Err(err) => assert_eq!(
                err,
                LoadingError::InvalidInterface { path, symbol: "pegasus_app_entry".to_string() }
            ),
            Ok(_) => panic!("libc loaded as an application"),
        }
    }

    #[test]
    fn handle_round_trips_a_boxed_app() {
        let handle = unsafe { AppHandle::from_box(Box::new(BuiltinApp::default())) };
        assert!(!handle.is_null());
        assert!(AppHandle::null().is_null());
        let app = unsafe { handle.into_box() };
        assert_eq!(app.name(), "builtin");
    }
}
