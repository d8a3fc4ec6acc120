//! Frame-rate overlay drawn with egui on top of the scene.

use crate::renderer::context::GfxContext;
use std::time::{Duration, Instant};
use winit::{event::WindowEvent, window::Window};

/// Averages frame rate over fixed sampling windows.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    period: Duration,
    window_start: Option<Instant>,
    frames: u32,
    fps: Option<f32>,
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

impl FpsCounter {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            window_start: None,
            frames: 0,
            fps: None,
        }
    }

    /// Records a presented frame.
    pub fn tick(&mut self, now: Instant) {
        let Some(start) = self.window_start else {
            self.window_start = Some(now);
            return;
        };

        self.frames += 1;
        let elapsed = now.saturating_duration_since(start);
        if elapsed >= self.period {
            self.fps = Some(self.frames as f32 / elapsed.as_secs_f32());
            self.frames = 0;
            self.window_start = Some(now);
        }
    }

    /// `None` until the first sampling window has elapsed.
    pub fn fps(&self) -> Option<f32> {
        self.fps
    }

    pub fn frame_time_ms(&self) -> Option<f32> {
        self.fps.filter(|fps| *fps > 0.0).map(|fps| 1000.0 / fps)
    }
}

pub struct Overlay {
    ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
}

impl Overlay {
    pub fn new(window: &Window, gfx: &GfxContext) -> Self {
        let ctx = egui::Context::default();
        let state = egui_winit::State::new(ctx.clone(), ctx.viewport_id(), window, None, None);
        let renderer = egui_wgpu::Renderer::new(&gfx.device, gfx.config.format, None, 1);

        Self {
            ctx,
            state,
            renderer,
        }
    }

    /// Returns true if egui consumed the event.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    pub fn draw(
        &mut self,
        window: &Window,
        gfx: &GfxContext,
        view: &wgpu::TextureView,
        fps: &FpsCounter,
    ) {
        let input = self.state.take_egui_input(window);
        self.ctx.begin_frame(input);
        draw_fps(&self.ctx, fps);
        let output = self.ctx.end_frame();

        self.state.handle_platform_output(window, output.platform_output);

        let shapes = self.ctx.tessellate(output.shapes, self.ctx.pixels_per_point());
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gfx.config.width, gfx.config.height],
            pixels_per_point: self.ctx.pixels_per_point(),
        };

        let mut encoder = gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("UI Encoder"),
            });

        for (id, delta) in &output.textures_delta.set {
            self.renderer.update_texture(&gfx.device, &gfx.queue, *id, delta);
        }
        self.renderer.update_buffers(
            &gfx.device,
            &gfx.queue,
            &mut encoder,
            &shapes,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("EGUI Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.renderer.render(&mut render_pass, &shapes, &screen_descriptor);
        }

        for id in &output.textures_delta.free {
            self.renderer.free_texture(id);
        }

        gfx.queue.submit(std::iter::once(encoder.finish()));
    }
}

fn draw_fps(ctx: &egui::Context, fps: &FpsCounter) {
    let text = match (fps.fps(), fps.frame_time_ms()) {
        (Some(fps), Some(ms)) => format!("{fps:.0} fps  {ms:.1} ms"),
        _ => "-- fps".to_string(),
    };

    egui::Area::new(egui::Id::new("fps"))
        .anchor(egui::Align2::LEFT_TOP, [8.0, 8.0])
        .interactable(false)
        .show(ctx, |ui| {
            ui.label(egui::RichText::new(text).monospace().color(egui::Color32::WHITE));
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_reading_before_first_window() {
        let mut fps = FpsCounter::default();
        let t0 = Instant::now();
        fps.tick(t0);
        fps.tick(t0 + Duration::from_millis(100));
        assert_eq!(fps.fps(), None);
        assert_eq!(fps.frame_time_ms(), None);
    }

    #[test]
    fn averages_over_the_window() {
        let mut fps = FpsCounter::new(Duration::from_millis(500));
        let t0 = Instant::now();
        fps.tick(t0);
        for i in 1..=30u32 {
            fps.tick(t0 + Duration::from_micros(16_667) * i);
        }

        let reading = fps.fps().unwrap();
        assert!((reading - 60.0).abs() < 0.01, "{reading}");
        assert!((fps.frame_time_ms().unwrap() - 16.667).abs() < 0.01);
    }

    #[test]
    fn window_restarts_after_a_reading() {
        let mut fps = FpsCounter::new(Duration::from_secs(1));
        let t0 = Instant::now();
        fps.tick(t0);
        fps.tick(t0 + Duration::from_secs(1));
        assert_eq!(fps.fps(), Some(1.0));

        // Ten frames in the next second.
        for i in 1..=10u32 {
            fps.tick(t0 + Duration::from_secs(1) + Duration::from_millis(100) * i);
        }
        assert!((fps.fps().unwrap() - 10.0).abs() < 1e-3);
    }
}
