//! Headless browser fetcher for JavaScript-rendered listings
//!
//! Each fetch launches Chrome, opens an isolated browsing context and a page,
//! navigates, waits for the site's "content loaded" selector and returns the
//! rendered DOM. The session is torn down before `fetch` returns, whatever
//! the outcome.

use crate::config::RenderOptions;
use crate::pipeline::fetcher::{FetchError, HtmlDocument, PageFetcher};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
#[cfg(feature = "browser")]
use chromiumoxide::error::CdpError;
#[cfg(feature = "browser")]
use chromiumoxide::handler::viewport::Viewport;
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig, Page};
#[cfg(feature = "browser")]
use futures::StreamExt;
#[cfg(feature = "browser")]
use tokio::task::JoinHandle;
#[cfg(feature = "browser")]
use tracing::{debug, info, warn};

/// Rendering viewport
pub const VIEWPORT_WIDTH: u32 = 1920;
pub const VIEWPORT_HEIGHT: u32 = 1080;

/// Flags needed for headless Chrome inside containers
pub const CHROME_ARGS: &[&str] = &["--disable-dev-shm-usage", "--disable-gpu"];

/// Common Chrome/Chromium install locations
const CHROME_PATHS: &[&str] = &[
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/snap/bin/chromium",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];

/// Executable names looked up on PATH
const CHROME_COMMANDS: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
];

const INSTALL_HINT: &str = "Chrome/Chromium not found. Install it \
    (Debian/Ubuntu: apt install chromium, Fedora: dnf install chromium, \
    macOS: brew install --cask chromium) or set chrome-executable in [site.fetch]";

/// Locates a Chrome binary
///
/// An explicit path must exist; otherwise the well-known install locations and
/// then PATH are searched.
pub fn find_chrome(explicit: Option<&str>) -> Result<PathBuf, FetchError> {
    if let Some(path) = explicit {
        let path = PathBuf::from(path);
        return if path.is_file() {
            Ok(path)
        } else {
            Err(FetchError::DependencyMissing(format!(
                "chrome-executable '{}' does not exist",
                path.display()
            )))
        };
    }

    if let Some(found) = CHROME_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|path| path.is_file())
    {
        return Ok(found);
    }

    if let Some(found) = find_chrome_command(std::env::var_os("PATH")) {
        return Ok(found);
    }

    Err(FetchError::DependencyMissing(INSTALL_HINT.to_string()))
}

/// First executable Chrome command found on the given search path
fn find_chrome_command<P: AsRef<OsStr>>(paths: Option<P>) -> Option<PathBuf> {
    let cwd = std::env::current_dir().unwrap_or_default();
    CHROME_COMMANDS
        .iter()
        .find_map(|command| which::which_in(command, paths.as_ref(), &cwd).ok())
}

/// Fetches pages through headless Chrome
pub struct BrowserFetcher {
    options: RenderOptions,
}

impl BrowserFetcher {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, target: &Url) -> Result<HtmlDocument, FetchError> {
        let chrome = find_chrome(self.options.chrome_executable.as_deref())?;
        info!(url = %target, chrome = %chrome.display(), "Launching headless browser");

        let session = BrowserSession::launch(chrome, target, &self.options).await?;
        let outcome = session.render(target, &self.options).await;
        session.release().await;

        outcome
    }

    fn mode(&self) -> &'static str {
        "rendered"
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, _target: &Url) -> Result<HtmlDocument, FetchError> {
        Err(FetchError::DependencyMissing(
            "browser support not compiled. Rebuild with: cargo build --features browser"
                .to_string(),
        ))
    }

    fn mode(&self) -> &'static str {
        "rendered"
    }
}

/// One browser process, one isolated context and at most one page
///
/// [`release`](Self::release) closes all three. Dropping without releasing
/// still kills the child process through chromiumoxide's `Drop`.
#[cfg(feature = "browser")]
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    context: Option<BrowserContextId>,
    page: Option<Page>,
}

#[cfg(feature = "browser")]
impl BrowserSession {
    async fn launch(
        chrome: PathBuf,
        target: &Url,
        options: &RenderOptions,
    ) -> Result<Self, FetchError> {
        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome)
            .no_sandbox()
            .request_timeout(request_timeout(options))
            .window_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
            .viewport(Viewport {
                width: VIEWPORT_WIDTH,
                height: VIEWPORT_HEIGHT,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: true,
                has_touch: false,
            });
        for arg in CHROME_ARGS {
            builder = builder.arg(*arg);
        }

        let config = builder.build().map_err(FetchError::DependencyMissing)?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
            FetchError::DependencyMissing(format!("failed to launch browser: {}", e))
        })?;

        // The CDP handler must be polled for the browser to make progress
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let mut session = Self {
            browser,
            handler,
            context: None,
            page: None,
        };

        match session.open_page(target).await {
            Ok(()) => Ok(session),
            Err(e) => {
                session.release().await;
                Err(e)
            }
        }
    }

    async fn open_page(&mut self, target: &Url) -> Result<(), FetchError> {
        let created = self
            .browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(|e| network(target, format!("failed to create browser context: {}", e)))?;
        let context = created.result.browser_context_id.clone();
        self.context = Some(context.clone());

        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context)
            .build()
            .map_err(|e| network(target, format!("invalid target params: {}", e)))?;

        let page = self
            .browser
            .new_page(params)
            .await
            .map_err(|e| network(target, format!("failed to open page: {}", e)))?;
        self.page = Some(page);

        Ok(())
    }

    async fn render(
        &self,
        target: &Url,
        options: &RenderOptions,
    ) -> Result<HtmlDocument, FetchError> {
        let page = self
            .page
            .as_ref()
            .ok_or_else(|| network(target, "browser page not open".to_string()))?;

        let navigation_timeout = Duration::from_secs(options.navigation_timeout_secs);
        debug!(url = %target, timeout = ?navigation_timeout, "Navigating");
        match tokio::time::timeout(navigation_timeout, page.goto(target.as_str())).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(navigation_error(target, e, navigation_timeout)),
            Err(_) => {
                return Err(FetchError::Timeout {
                    url: target.to_string(),
                    waited: navigation_timeout,
                })
            }
        }

        let wait_timeout = Duration::from_secs(options.wait_timeout_secs);
        wait_for_selector(page, &options.wait_selector, wait_timeout)
            .await
            .map_err(|waited| FetchError::Timeout {
                url: target.to_string(),
                waited,
            })?;
        debug!(selector = %options.wait_selector, "Content selector present");

        if options.settle_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(options.settle_delay_ms)).await;
        }

        let body = page
            .content()
            .await
            .map_err(|e| network(target, format!("failed to read rendered DOM: {}", e)))?;

        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .and_then(|u| Url::parse(&u).ok())
            .unwrap_or_else(|| target.clone());

        info!(url = %final_url, bytes = body.len(), "Page rendered");

        Ok(HtmlDocument {
            url: final_url,
            body,
        })
    }

    /// Closes the page, disposes the context and shuts the browser down
    async fn release(mut self) {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                debug!(error = %e, "Page close failed");
            }
        }

        if let Some(context) = self.context.take() {
            if let Err(e) = self
                .browser
                .execute(DisposeBrowserContextParams::new(context))
                .await
            {
                debug!(error = %e, "Browser context disposal failed");
            }
        }

        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "Browser close failed");
        }
        if let Err(e) = self.browser.wait().await {
            debug!(error = %e, "Waiting for browser exit failed");
        }

        self.handler.abort();
        debug!("Browser session released");
    }
}

/// Polls for `selector` until it matches or `timeout` elapses
///
/// Returns the elapsed budget on timeout.
#[cfg(feature = "browser")]
async fn wait_for_selector(page: &Page, selector: &str, timeout: Duration) -> Result<(), Duration> {
    let poll = Duration::from_millis(250);
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        if page.find_element(selector).await.is_ok() {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            warn!(selector, ?timeout, "Content selector never appeared");
            return Err(timeout);
        }
        tokio::time::sleep(poll).await;
    }
}

/// Per-command CDP deadline; must cover the longest wait the site allows
pub fn request_timeout(options: &RenderOptions) -> Duration {
    Duration::from_secs(options.navigation_timeout_secs.max(options.wait_timeout_secs))
}

/// Maps a failed `goto`; chromiumoxide reports its own navigation deadline as
/// `CdpError::Timeout`
#[cfg(feature = "browser")]
fn navigation_error(target: &Url, error: CdpError, waited: Duration) -> FetchError {
    match error {
        CdpError::Timeout => FetchError::Timeout {
            url: target.to_string(),
            waited,
        },
        other => network(target, format!("navigation failed: {}", other)),
    }
}

#[cfg(feature = "browser")]
fn network(target: &Url, message: String) -> FetchError {
    FetchError::Network {
        url: target.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn options(navigation: u64, wait: u64) -> RenderOptions {
        RenderOptions {
            wait_selector: "div.item".to_string(),
            navigation_timeout_secs: navigation,
            wait_timeout_secs: wait,
            settle_delay_ms: 0,
            chrome_executable: None,
        }
    }

    #[test]
    fn test_request_timeout_covers_long_navigation() {
        assert_eq!(request_timeout(&options(60, 30)), Duration::from_secs(60));
        assert_eq!(request_timeout(&options(10, 45)), Duration::from_secs(45));
    }

    #[cfg(feature = "browser")]
    #[test]
    fn test_cdp_navigation_timeout_is_a_timeout() {
        let target = Url::parse("https://cyware.com/search?search=india").unwrap();
        let waited = Duration::from_secs(60);

        match navigation_error(&target, CdpError::Timeout, waited) {
            FetchError::Timeout { url, waited: w } => {
                assert_eq!(url, target.to_string());
                assert_eq!(w, waited);
            }
            other => panic!("expected timeout, got {:?}", other),
        }

        let other = navigation_error(&target, CdpError::NotFound, waited);
        assert!(matches!(other, FetchError::Network { .. }));
    }

    #[test]
    fn test_explicit_chrome_path_must_exist() {
        let result = find_chrome(Some("/definitely/not/a/chrome"));
        assert!(matches!(result, Err(FetchError::DependencyMissing(_))));
    }

    #[test]
    fn test_explicit_chrome_path_accepted() {
        let fake = NamedTempFile::new().unwrap();
        let path = fake.path().to_str().unwrap();
        assert_eq!(find_chrome(Some(path)).unwrap(), fake.path());
    }

    #[cfg(unix)]
    #[test]
    fn test_path_lookup_requires_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let binary = dir.path().join("chromium");
        std::fs::write(&binary, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o644)).unwrap();

        assert_eq!(find_chrome_command(Some(dir.path())), None);

        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(find_chrome_command(Some(dir.path())), Some(binary));
    }

    #[tokio::test]
    async fn test_missing_chrome_reported_as_dependency() {
        let fetcher = BrowserFetcher::new(RenderOptions {
            wait_selector: "div.item".to_string(),
            navigation_timeout_secs: 5,
            wait_timeout_secs: 5,
            settle_delay_ms: 0,
            chrome_executable: Some("/definitely/not/a/chrome".to_string()),
        });
        let target = Url::parse("https://example.com").unwrap();

        assert!(matches!(
            fetcher.fetch(&target).await,
            Err(FetchError::DependencyMissing(_))
        ));
        assert_eq!(fetcher.mode(), "rendered");
    }
}
