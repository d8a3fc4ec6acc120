//! Entry point for the gopher viewer.

use anyhow::Result;
use clap::Parser;
use gopher_viewer::{
    app::{App, FrameError},
    config::Config,
};
use std::sync::Arc;
use winit::{
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

fn main() -> Result<()> {
    // Initialize logging; default to "info" if RUST_LOG is unset.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Gopher")
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height))
            .build(&event_loop)?,
    );

    let mut app = pollster::block_on(App::new(window.clone(), &config))?;
    let mut fatal = None;

    event_loop.run(|event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => {
                if !app.handle_event(&window, &event) {
                    match event {
                        WindowEvent::CloseRequested => elwt.exit(),
                        WindowEvent::KeyboardInput { event, .. } => {
                            if event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                                elwt.exit();
                            }
                        }
                        WindowEvent::RedrawRequested => match app.render(&window) {
                            Ok(()) => {}
                            Err(FrameError::Surface(wgpu::SurfaceError::Lost)) => {
                                app.resize(app.backend.gfx.size);
                            }
                            Err(FrameError::Surface(wgpu::SurfaceError::OutOfMemory)) => {
                                log::error!("WGPU out of memory – exiting.");
                                elwt.exit();
                            }
                            Err(FrameError::Surface(e)) => log::error!("Render error: {:?}", e),
                            Err(FrameError::Fatal(e)) => {
                                let err = anyhow::Error::from(e);
                                log::error!("{:#}", err);
                                fatal = Some(err);
                                elwt.exit();
                            }
                        },
                        _ => {}
                    }
                }
            }
            Event::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    })?;

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
