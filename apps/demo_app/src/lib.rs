use anyhow::Result;
use pegasus_editor::application::{AppExport, AppHandle, PegasusApp, PEGASUS_APP_API_VERSION};
use pegasus_editor::console::LogChannel;
use pegasus_editor::runtime::Runtime;

/// Reports a heartbeat once per second with the number of open engine objects.
#[derive(Default)]
struct DemoApp {
    elapsed: f32,
    heartbeats: u32,
}

impl PegasusApp for DemoApp {
    fn name(&self) -> &str {
        "demo_app"
    }

    fn initialize(&mut self, runtime: &mut Runtime) -> Result<()> {
        let (width, height) = runtime.viewport();
        runtime.log(LogChannel::App, format!("demo app started, viewport {width}x{height}"));
        let timeline = runtime.timeline_mut();
        timeline.add_block(0, "intro", "Fade", 0, 16)?;
        timeline.add_block(0, "main", "Scene", 16, 96)?;
        Ok(())
    }

    fn frame(&mut self, runtime: &mut Runtime, dt: f32) -> Result<()> {
        self.elapsed += dt;
        if self.elapsed > 1.0 {
            self.elapsed = 0.0;
            self.heartbeats += 1;
            let open = runtime.open_objects().count();
            runtime.log(LogChannel::App, format!("heartbeat #{} ({open} objects open)", self.heartbeats));
        }
        Ok(())
    }

    fn shutdown(&mut self, runtime: &mut Runtime) {
        runtime.log(LogChannel::App, format!("demo app stopped after {} heartbeats", self.heartbeats));
    }
}

unsafe extern "C" fn create_app() -> AppHandle {
    let app: Box<dyn PegasusApp> = Box::new(DemoApp::default());
    AppHandle::from_box(app)
}

#[no_mangle]
pub extern "C" fn pegasus_app_entry() -> AppExport {
    AppExport { api_version: PEGASUS_APP_API_VERSION, create: create_app }
}
