//! deviceshot
//!
//! A small HTTP service that screenshots a URL the way a given device would
//! display it and places the screenshot inside that device's frame, returning
//! a single PNG.
//!
//! # Pipeline
//!
//! validate inputs → look up the device profile → capture with a headless
//! browser → underlay the capture beneath the frame asset → encode PNG.
//!
//! # Features
//!
//! - **CDP Backend** (default): captures with headless Chrome via the
//!   `headless_chrome` crate
//! - **Swappable seams**: [`PageRenderer`] and [`compose::ImageCompositor`]
//!   keep the request handler independent of the concrete engines
//!
//! # Example
//!
//! ```no_run
//! use deviceshot::{CaptureConfig, DeviceCatalog, PageRenderer};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = DeviceCatalog::builtin()?;
//! let device = catalog.lookup("apple-macbook").expect("built-in device");
//! let renderer = deviceshot::new_renderer(CaptureConfig::default())?;
//! let screenshot = renderer.capture("example.com", &device.emulation)?;
//! println!("captured {} bytes", screenshot.len());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

pub mod error;
pub use error::{Error, ErrorKind, Result};

pub mod catalog;
pub use catalog::{DeviceCatalog, DeviceProfile, Emulation};

pub mod validate;

pub mod render;
pub use render::{CaptureConfig, PageRenderer};

pub mod compose;
pub use compose::{FrameCompositor, ImageCompositor};

#[cfg(feature = "cdp")]
pub mod cdp;

pub mod config;
pub use config::ServiceConfig;

pub mod server;
pub use server::{AppState, GenerationRequest};

/// Create the default page renderer
///
/// This is the CDP renderer when the `cdp` feature is enabled (default).
#[cfg(feature = "cdp")]
pub fn new_renderer(config: CaptureConfig) -> Result<Arc<dyn PageRenderer>> {
    Ok(Arc::new(cdp::CdpRenderer::new(config)))
}

/// Without a browser backend compiled in there is nothing to capture with.
#[cfg(not(feature = "cdp"))]
pub fn new_renderer(_config: CaptureConfig) -> Result<Arc<dyn PageRenderer>> {
    Err(Error::ConfigError(
        "no page renderer backend enabled; build with the `cdp` feature".into(),
    ))
}
