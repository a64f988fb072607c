//! Chrome DevTools Protocol renderer (uses the `headless_chrome` crate)

use crate::catalog::Emulation;
use crate::render::NetworkActivity;
use crate::validate::normalize_url;
use crate::{CaptureConfig, Error, PageRenderer, Result};
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::protocol::cdp::{Emulation as CdpEmulation, Network, Page};
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

const IDLE_POLL: Duration = Duration::from_millis(50);

type SharedActivity = Arc<Mutex<NetworkActivity>>;

/// Renderer that launches a fresh headless Chrome for every capture.
#[derive(Debug, Clone, Default)]
pub struct CdpRenderer {
    config: CaptureConfig,
}

/// A launched browser and its single tab. Dropping it closes the tab and
/// kills the browser process.
struct BrowserSession {
    // kills the Chrome process when dropped
    _browser: Browser,
    tab: Arc<Tab>,
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Err(e) = self.tab.close(false) {
            warn!("Failed to close tab during teardown: {}", e);
        }
        debug!("browser session released");
    }
}

impl CdpRenderer {
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    fn launch(&self, emulation: &Emulation) -> Result<BrowserSession> {
        let (width, height) = viewport_size(emulation);
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(self.config.sandbox)
            .path(self.config.chrome_path.clone())
            .window_size(Some((width, height)))
            // keep the CDP connection alive through a slow navigation
            .idle_browser_timeout(self.config.navigation_timeout() + Duration::from_secs(10))
            .build()
            .map_err(|e| Error::InitializationError(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::InitializationError(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::InitializationError(format!("Failed to create tab: {}", e)))?;

        Ok(BrowserSession {
            _browser: browser,
            tab,
        })
    }

    fn emulate(&self, tab: &Tab, emulation: &Emulation) -> Result<()> {
        let (width, height) = viewport_size(emulation);

        tab.set_user_agent(&emulation.user_agent, None, None)
            .map_err(|e| Error::InitializationError(format!("Failed to set user agent: {}", e)))?;

        tab.call_method(CdpEmulation::SetDeviceMetricsOverride {
            width,
            height,
            device_scale_factor: emulation.device_scale_factor,
            mobile: emulation.is_mobile,
            screen_orientation: screen_orientation(emulation),
            scale: None,
            screen_width: None,
            screen_height: None,
            position_x: None,
            position_y: None,
            dont_set_visible_size: None,
            viewport: None,
            display_feature: None,
            device_posture: None,
        })
        .map_err(|e| Error::InitializationError(format!("Failed to set device metrics: {}", e)))?;

        tab.call_method(CdpEmulation::SetTouchEmulationEnabled {
            enabled: emulation.has_touch,
            max_touch_points: None,
        })
        .map_err(|e| Error::InitializationError(format!("Failed to set touch emulation: {}", e)))?;

        Ok(())
    }

    /// Count requests as they start and settle so `navigate` can
    /// tell when the page has gone quiet.
    fn track_network(&self, tab: &Tab) -> Result<SharedActivity> {
        let activity = Arc::new(Mutex::new(NetworkActivity::new(Instant::now())));
        let sink = activity.clone();

        tab.call_method(Network::Enable {
            max_total_buffer_size: None,
            max_resource_buffer_size: None,
            max_post_data_size: None,
            report_direct_socket_traffic: None,
            enable_durable_messages: None,
        })
        .map_err(|e| Error::InitializationError(format!("Failed to enable network domain: {}", e)))?;

        tab.add_event_listener(Arc::new(move |event: &Event| {
            let now = Instant::now();
            match event {
                Event::NetworkRequestWillBeSent(e) => lock(&sink).started(&e.params.request_id, now),
                Event::NetworkLoadingFinished(e) => lock(&sink).finished(&e.params.request_id, now),
                Event::NetworkLoadingFailed(e) => lock(&sink).finished(&e.params.request_id, now),
                _ => {}
            }
        }))
        .map_err(|e| Error::InitializationError(format!("Failed to add network listener: {}", e)))?;

        Ok(activity)
    }

    fn navigate(&self, tab: &Tab, url: &str, activity: &SharedActivity) -> Result<()> {
        let started = Instant::now();
        tab.set_default_timeout(self.config.navigation_timeout());

        tab.navigate_to(url)
            .map_err(|e| Error::Navigation(format!("{}: {}", url, e)))?;
        tab.wait_until_navigated()
            .map_err(|e| Error::Navigation(format!("{}: {}", url, e)))?;

        let deadline = started + self.config.navigation_timeout();
        loop {
            let now = Instant::now();
            let net = lock(activity);
            if net.is_idle(now, self.config.idle_window(), self.config.max_inflight) {
                debug!("{} idle after {} ms", url, started.elapsed().as_millis());
                return Ok(());
            }
            if now >= deadline {
                return Err(Error::Navigation(format!(
                    "{}: navigation timeout of {} ms exceeded with {} requests in flight",
                    url,
                    self.config.navigation_timeout_ms,
                    net.inflight()
                )));
            }
            drop(net);
            std::thread::sleep(IDLE_POLL);
        }
    }
}

impl PageRenderer for CdpRenderer {
    fn capture(&self, url: &str, emulation: &Emulation) -> Result<Vec<u8>> {
        let target = normalize_url(url);
        let session = self.launch(emulation)?;
        let tab = &session.tab;

        self.emulate(tab, emulation)?;
        let activity = self.track_network(tab)?;
        self.navigate(tab, &target, &activity)?;

        let png = tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| Error::RenderError(format!("Screenshot failed: {}", e)))?;

        debug!("captured {} ({} bytes)", target, png.len());
        Ok(png)
    }
}

/// Viewport for the device, turned sideways when it is flagged landscape but
/// described in portrait.
fn viewport_size(emulation: &Emulation) -> (u32, u32) {
    let (w, h) = (emulation.viewport_width, emulation.viewport_height);
    if emulation.is_landscape && w < h {
        (h, w)
    } else {
        (w, h)
    }
}

/// Orientation override for landscape devices; portrait ones keep the
/// browser default.
fn screen_orientation(emulation: &Emulation) -> Option<CdpEmulation::ScreenOrientation> {
    emulation.is_landscape.then(|| CdpEmulation::ScreenOrientation {
        Type: CdpEmulation::ScreenOrientationType::LandscapePrimary,
        angle: 90,
    })
}

fn lock(activity: &Mutex<NetworkActivity>) -> MutexGuard<'_, NetworkActivity> {
    activity.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builtin_profiles;

    #[test]
    fn landscape_viewport_is_wide() {
        let mut emu = builtin_profiles()[0].emulation.clone();
        assert_eq!(viewport_size(&emu), (414, 896));
        emu.is_landscape = true;
        assert_eq!(viewport_size(&emu), (896, 414));
    }

    #[test]
    fn landscape_devices_override_orientation() {
        let ipad = &builtin_profiles()[1].emulation;
        let orientation = screen_orientation(ipad).expect("landscape orientation");
        assert_eq!(orientation.angle, 90);
        assert!(matches!(
            orientation.Type,
            CdpEmulation::ScreenOrientationType::LandscapePrimary
        ));

        let phone = &builtin_profiles()[0].emulation;
        assert!(screen_orientation(phone).is_none());
    }

    #[test]
    #[ignore] // Requires Chrome to be installed
    fn test_cdp_capture() {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr();
        std::thread::spawn(move || {
            for req in server.incoming_requests() {
                let html = "<html><body><h1>framed</h1></body></html>";
                let _ = req.respond(tiny_http::Response::from_string(html));
            }
        });

        let renderer = CdpRenderer::default();
        let emu = builtin_profiles()[2].emulation.clone();
        let png = renderer.capture(&addr.to_string(), &emu).expect("capture failed");
        assert_eq!(&png[0..8], b"\x89PNG\r\n\x1a\n");
    }
}
