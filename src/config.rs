//! Service configuration, parsed from the command line

use crate::render::CaptureConfig;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Screenshot a URL as a device sees it and frame it in a device mockup.
#[derive(Parser, Debug, Clone)]
#[command(name = "deviceshot", version, about)]
pub struct ServiceConfig {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,

    /// Directory frame asset paths are resolved against
    #[arg(long, default_value = ".")]
    pub assets: PathBuf,

    /// Navigation plus network-idle budget per capture, in milliseconds
    #[arg(long, default_value_t = 30000)]
    pub navigation_timeout_ms: u64,

    /// Quiet period before a page counts as loaded, in milliseconds
    #[arg(long, default_value_t = 500)]
    pub idle_window_ms: u64,

    /// Requests allowed in flight while still counting as idle
    #[arg(long, default_value_t = 0)]
    pub max_inflight: usize,

    /// Chrome/Chromium executable (auto-detected if omitted)
    #[arg(long)]
    pub chrome_path: Option<PathBuf>,

    /// Disable Chrome's sandbox (needed when running as root in containers)
    #[arg(long)]
    pub no_sandbox: bool,
}

impl ServiceConfig {
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            navigation_timeout_ms: self.navigation_timeout_ms,
            idle_window_ms: self.idle_window_ms,
            max_inflight: self.max_inflight,
            chrome_path: self.chrome_path.clone(),
            sandbox: !self.no_sandbox,
        }
    }
}
