use crate::{
    assets::AssetStore,
    camera::SurfaceSize,
    config::Config,
    renderer::{backend::WgpuBackend, context::GfxContext, FrameOutcome, RenderError, Renderer},
    touch::{TouchSample, TouchState},
    ui::{FpsCounter, Overlay},
};
use anyhow::{Context, Result};
use std::{sync::Arc, time::Instant};
use thiserror::Error;
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, TouchPhase, WindowEvent},
    window::Window,
};

#[derive(Debug, Error)]
pub enum FrameError {
    #[error(transparent)]
    Surface(#[from] wgpu::SurfaceError),
    /// The process should exit.
    #[error(transparent)]
    Fatal(#[from] RenderError),
}

pub struct App {
    pub backend: WgpuBackend,
    renderer: Renderer,
    touch: TouchState,
    cursor: PhysicalPosition<f64>,
    dragging: bool,
    fps: FpsCounter,
    overlay: Option<Overlay>,
}

impl App {
    pub async fn new(window: Arc<Window>, config: &Config) -> Result<Self> {
        let gfx = GfxContext::new(window.clone(), config.power_preference.into())
            .await
            .context("creating graphics context")?;

        let overlay = (!config.no_fps).then(|| Overlay::new(&window, &gfx));

        Ok(Self {
            backend: WgpuBackend::new(gfx),
            renderer: Renderer::new(AssetStore::gopher()),
            touch: TouchState::default(),
            cursor: PhysicalPosition::default(),
            dragging: false,
            fps: FpsCounter::default(),
            overlay,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        self.backend.resize(new_size);
    }

    pub fn handle_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        if let Some(overlay) = self.overlay.as_mut() {
            if overlay.on_window_event(window, event) {
                return true;
            }
        }

        match event {
            WindowEvent::Resized(physical_size) => self.resize(*physical_size),
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = *position;
                if self.dragging {
                    self.touch_at(*position);
                }
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.dragging = *state == ElementState::Pressed;
                if self.dragging {
                    self.touch_at(self.cursor);
                }
            }
            WindowEvent::Touch(touch) => {
                if matches!(touch.phase, TouchPhase::Started | TouchPhase::Moved) {
                    self.touch_at(touch.location);
                }
            }
            _ => {}
        }

        false
    }

    fn touch_at(&self, position: PhysicalPosition<f64>) {
        self.touch
            .set(TouchSample::new(position.x as f32, position.y as f32));
    }

    pub fn render(&mut self, window: &Window) -> Result<(), FrameError> {
        let frame = self.backend.gfx.surface.get_current_texture()?;
        let swap_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let size = self.backend.gfx.size;
        let outcome = self.renderer.draw(
            &mut self.backend,
            self.touch.get(),
            SurfaceSize::new(size.width, size.height),
        )?;
        if outcome == FrameOutcome::Skipped {
            log::trace!("Renderer not ready; presenting an empty frame");
        }

        self.backend.flush(&swap_view);

        self.fps.tick(Instant::now());
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.draw(window, &self.backend.gfx, &swap_view, &self.fps);
        }

        frame.present();
        Ok(())
    }
}
