//! Page renderer seam: navigate, emulate a device, screenshot.
//!
//! Backends implement [`PageRenderer`]; the request handler only ever sees the
//! trait, so tests can swap in a renderer that never launches a browser.

use crate::catalog::Emulation;
use crate::Result;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Capture settings shared by every request
///
/// Defaults match a network-idle wait with zero connections left open for
/// half a second, bounded by a 30 second navigation timeout.
///
/// # Examples
///
/// ```
/// let cfg = deviceshot::CaptureConfig::default();
/// assert_eq!(cfg.max_inflight, 0);
/// assert!(cfg.sandbox);
/// ```
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Upper bound on navigation plus the idle wait, in milliseconds
    pub navigation_timeout_ms: u64,
    /// How long the network must stay quiet before the page counts as ready
    pub idle_window_ms: u64,
    /// Requests allowed to still be in flight when idle
    pub max_inflight: usize,
    /// Chrome/Chromium executable; auto-detected when `None`
    pub chrome_path: Option<PathBuf>,
    /// Whether to keep Chrome's sandbox enabled
    pub sandbox: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: 30000,
            idle_window_ms: 500,
            max_inflight: 0,
            chrome_path: None,
            sandbox: true,
        }
    }
}

impl CaptureConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn idle_window(&self) -> Duration {
        Duration::from_millis(self.idle_window_ms)
    }
}

/// Renders a URL as a given device would display it.
///
/// Every call must be fully isolated: no browser state survives between
/// captures, and any browser started by the call is gone when it returns,
/// whether it succeeded or not.
pub trait PageRenderer: Send + Sync {
    /// Capture a viewport screenshot of `url` (scheme optional) as encoded
    /// image bytes.
    fn capture(&self, url: &str, emulation: &Emulation) -> Result<Vec<u8>>;
}

/// In-flight request bookkeeping for the network-idle wait.
#[derive(Debug)]
pub struct NetworkActivity {
    inflight: HashSet<String>,
    last_change: Instant,
}

impl NetworkActivity {
    pub fn new(now: Instant) -> Self {
        Self {
            inflight: HashSet::new(),
            last_change: now,
        }
    }

    pub fn started(&mut self, request_id: &str, now: Instant) {
        // redirects reuse the request id
        if self.inflight.insert(request_id.to_string()) {
            self.last_change = now;
        }
    }

    pub fn finished(&mut self, request_id: &str, now: Instant) {
        if self.inflight.remove(request_id) {
            self.last_change = now;
        }
    }

    pub fn inflight(&self) -> usize {
        self.inflight.len()
    }

    /// True once at most `max_inflight` requests are open and nothing has
    /// started or finished for `window`.
    pub fn is_idle(&self, now: Instant, window: Duration, max_inflight: usize) -> bool {
        self.inflight.len() <= max_inflight
            && now.saturating_duration_since(self.last_change) >= window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(500);

    #[test]
    fn default_capture_config() {
        let cfg = CaptureConfig::default();
        assert_eq!(cfg.navigation_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.idle_window(), WINDOW);
        assert!(cfg.chrome_path.is_none());
    }

    #[test]
    fn idle_requires_quiet_window() {
        let t0 = Instant::now();
        let net = NetworkActivity::new(t0);
        assert!(!net.is_idle(t0 + Duration::from_millis(100), WINDOW, 0));
        assert!(net.is_idle(t0 + WINDOW, WINDOW, 0));
    }

    #[test]
    fn open_requests_block_idle() {
        let t0 = Instant::now();
        let mut net = NetworkActivity::new(t0);
        net.started("1", t0);
        net.started("2", t0);
        let later = t0 + Duration::from_secs(5);
        assert!(!net.is_idle(later, WINDOW, 0));
        assert!(!net.is_idle(later, WINDOW, 1));
        assert!(net.is_idle(later, WINDOW, 2));

        net.finished("1", later);
        assert!(!net.is_idle(later + Duration::from_millis(499), WINDOW, 1));
        assert!(net.is_idle(later + WINDOW, WINDOW, 1));
    }

    #[test]
    fn duplicate_and_unknown_ids_do_not_skew_count() {
        let t0 = Instant::now();
        let mut net = NetworkActivity::new(t0);
        net.started("a", t0);
        net.started("a", t0 + WINDOW);
        assert_eq!(net.inflight(), 1);
        net.finished("zzz", t0 + WINDOW);
        assert_eq!(net.inflight(), 1);
        // the repeated start did not reset the quiet window
        assert!(net.is_idle(t0 + WINDOW, WINDOW, 1));
    }
}
