use clap::{Parser, ValueEnum};

/// `gopher-viewer` - spin and scale a 3D gopher by dragging across the window.
///
/// Horizontal drag position orbits the camera around the model, vertical
/// position scales it between half and one and a half times its size.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Initial window width in logical pixels.
    #[arg(long, env = "GOPHER_VIEWER_WIDTH", default_value_t = 720)]
    pub width: u32,

    /// Initial window height in logical pixels.
    #[arg(long, env = "GOPHER_VIEWER_HEIGHT", default_value_t = 1280)]
    pub height: u32,

    /// Hide the frame-rate overlay.
    #[arg(long)]
    pub no_fps: bool,

    /// Which GPU adapter to ask for when more than one is available.
    #[arg(
        long,
        value_enum,
        env = "GOPHER_VIEWER_POWER_PREFERENCE",
        default_value_t = PowerPreference::High
    )]
    pub power_preference: PowerPreference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PowerPreference {
    None,
    Low,
    High,
}

impl From<PowerPreference> for wgpu::PowerPreference {
    fn from(value: PowerPreference) -> Self {
        match value {
            PowerPreference::None => wgpu::PowerPreference::None,
            PowerPreference::Low => wgpu::PowerPreference::LowPower,
            PowerPreference::High => wgpu::PowerPreference::HighPerformance,
        }
    }
}
