use std::ptr;

use anyhow::Result;
use ash::vk::{self, SurfaceKHR};
use glfw::{
    fail_on_errors, Action, ClientApiHint, Glfw, GlfwReceiver, Key, PWindow, WindowEvent,
    WindowHint, WindowMode,
};
use tracing::{debug, trace, warn};

use crate::{
    instance::ExtensionRequirementsProvider,
    surface::{PresentationPlatform, SurfaceCreationError},
};

const WINDOW_WIDTH: u32 = 800;
const WINDOW_HEIGHT: u32 = 600;
const WINDOW_TITLE: &str = "Vulkan";

/// GLFW backed window. The window itself is only created together with its
/// surface, after the instance exists.
pub struct GlfwPlatform {
    glfw: Glfw,
    window: Option<(PWindow, GlfwReceiver<(f64, WindowEvent)>)>,
}

impl GlfwPlatform {
    pub fn try_new() -> Result<Self> {
        let glfw = glfw::init(fail_on_errors!())?;
        Ok(Self { glfw, window: None })
    }
}

impl ExtensionRequirementsProvider for GlfwPlatform {
    fn required_presentation_extensions(&self) -> Vec<String> {
        required_extensions_or_empty(self.glfw.get_required_instance_extensions())
    }
}

/// `None` means GLFW found no Vulkan loader or no surface extension.
fn required_extensions_or_empty(extension_names: Option<Vec<String>>) -> Vec<String> {
    let Some(extension_names) = extension_names else {
        warn!("GLFW reports no Vulkan support; surface creation will fail");
        return vec![];
    };
    debug!("Platform extension names: {:?}", extension_names);
    extension_names
}

impl PresentationPlatform for GlfwPlatform {
    fn create_surface(
        &mut self,
        instance: vk::Instance,
    ) -> Result<SurfaceKHR, SurfaceCreationError> {
        self.glfw.window_hint(WindowHint::ClientApi(ClientApiHint::NoApi));
        self.glfw.window_hint(WindowHint::Resizable(false));
        let (mut window, events) = self
            .glfw
            .create_window(WINDOW_WIDTH, WINDOW_HEIGHT, WINDOW_TITLE, WindowMode::Windowed)
            .ok_or_else(|| {
                SurfaceCreationError::Window("Failed to create GLFW window".to_owned())
            })?;
        window.set_key_polling(true);

        let mut surface = SurfaceKHR::null();
        window
            .create_window_surface(instance, ptr::null(), &mut surface)
            .result()
            .map_err(SurfaceCreationError::Rejected)?;

        self.window = Some((window, events));
        Ok(surface)
    }

    fn poll_and_check_open(&mut self) -> bool {
        let Some((window, events)) = self.window.as_mut() else {
            return false;
        };
        if window.should_close() {
            return false;
        }
        self.glfw.poll_events();
        for (_, event) in glfw::flush_messages(events) {
            trace!("{:?}", event);
            if let WindowEvent::Key(Key::Escape, _, Action::Press, _) = event {
                window.set_should_close(true);
            }
        }
        true
    }
}
