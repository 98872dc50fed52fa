use crate::error::SessionError;
use crate::scrapers::traits::{ElementHandle, PageSession, SessionLauncher};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Clicks a nested link when the card has one, otherwise fires a bubbling click event
const SCRIPTED_CLICK_JS: &str = r#"
function() {
    const link = this.querySelector('a[href]');
    if (link) {
        link.click();
        return 'link';
    }
    this.dispatchEvent(new MouseEvent('click', { bubbles: true, cancelable: true, view: window }));
    return 'event';
}
"#;

/// Extra time the engine gets beyond our own timeout so ours fires first
const ENGINE_TIMEOUT_SLACK: Duration = Duration::from_secs(5);

/// Launches one headless Chrome per request
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    headless: bool,
    navigation_timeout: Duration,
}

impl ChromeLauncher {
    pub fn new(headless: bool, navigation_timeout: Duration) -> Self {
        Self {
            headless,
            navigation_timeout,
        }
    }
}

#[async_trait]
impl SessionLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<Box<dyn PageSession>, SessionError> {
        let headless = self.headless;
        let engine_timeout = self.navigation_timeout + ENGINE_TIMEOUT_SLACK;

        let session = tokio::task::spawn_blocking(move || ChromeSession::open(headless, engine_timeout))
            .await
            .context("Browser launch task panicked")??;

        Ok(Box::new(session))
    }
}

/// A Chrome process with a single tab, torn down on `release`
pub struct ChromeSession {
    browser: Mutex<Option<Browser>>,
    tab: Arc<Tab>,
    gate: TabGate,
}

/// One blocking engine call at a time per tab.
///
/// A worker whose caller gave up on a timeout keeps the gate until the engine
/// returns, so the next operation starts only after it.
#[derive(Debug, Clone, Default)]
struct TabGate(Arc<Mutex<()>>);

impl TabGate {
    fn hold<T>(&self, op: impl FnOnce() -> T) -> T {
        let _guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        op()
    }
}

/// Run `op` on the blocking pool behind `gate`, optionally bounded
async fn run_gated<T, F>(
    gate: &TabGate,
    action: &'static str,
    limit: Option<Duration>,
    op: F,
) -> Result<T, SessionError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let gate = gate.clone();
    let task = tokio::task::spawn_blocking(move || gate.hold(op));

    let joined = match limit {
        Some(after) => tokio::time::timeout(after, task)
            .await
            .map_err(|_| SessionError::Timeout { action, after })?,
        None => task.await,
    };

    joined
        .with_context(|| format!("{action} task panicked"))?
        .with_context(|| format!("{action} failed"))
        .map_err(SessionError::Browser)
}

impl ChromeSession {
    fn open(headless: bool, engine_timeout: Duration) -> Result<Self> {
        info!("Launching headless Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(headless)
            .sandbox(false)
            .window_size(Some((1440, 1000)))
            .idle_browser_timeout(engine_timeout * 4)
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;
        let tab = browser.new_tab().context("Failed to open tab")?;
        tab.set_default_timeout(engine_timeout);

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            tab,
            gate: TabGate::default(),
        })
    }

    /// Run a blocking tab operation off the async runtime, optionally bounded
    async fn with_tab<T, F>(
        &self,
        action: &'static str,
        limit: Option<Duration>,
        op: F,
    ) -> Result<T, SessionError>
    where
        T: Send + 'static,
        F: FnOnce(&Tab) -> Result<T> + Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        run_gated(&self.gate, action, limit, move || op(&tab)).await
    }
}

#[async_trait]
impl PageSession for ChromeSession {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), SessionError> {
        let url = url.to_string();
        self.with_tab("page load", Some(timeout), move |tab| {
            debug!("Navigating to {}", url);
            tab.navigate_to(&url)?;
            tab.wait_until_navigated()?;
            Ok(())
        })
        .await
    }

    async fn current_url(&self) -> Result<String, SessionError> {
        Ok(self.tab.get_url())
    }

    async fn wait_for_load(&self, timeout: Duration) -> Result<(), SessionError> {
        self.with_tab("page transition", Some(timeout), |tab| {
            tab.wait_until_navigated()?;
            Ok(())
        })
        .await
    }

    async fn find(&self, path: &str) -> Result<Option<ElementHandle>, SessionError> {
        let path = path.to_string();
        self.with_tab("element query", None, move |tab| {
            // The engine reports "no match" as an error; treat any query failure as absent
            Ok(tab
                .find_element_by_xpath(&path)
                .ok()
                .map(|_| ElementHandle::new(path.as_str())))
        })
        .await
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        let path = element.path().to_string();
        let name = name.to_string();
        self.with_tab("attribute read", None, move |tab| {
            tab.find_element_by_xpath(&path)?.get_attribute_value(&name)
        })
        .await
    }

    async fn text(&self, element: &ElementHandle) -> Result<String, SessionError> {
        let path = element.path().to_string();
        self.with_tab("text read", None, move |tab| {
            tab.find_element_by_xpath(&path)?.get_inner_text()
        })
        .await
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), SessionError> {
        let path = element.path().to_string();
        self.with_tab("native click", None, move |tab| {
            tab.find_element_by_xpath(&path)?.click()?;
            Ok(())
        })
        .await
    }

    async fn script_click(&self, element: &ElementHandle) -> Result<(), SessionError> {
        let path = element.path().to_string();
        self.with_tab("scripted click", None, move |tab| {
            let result = tab
                .find_element_by_xpath(&path)?
                .call_js_fn(SCRIPTED_CLICK_JS, vec![], false)?;
            debug!("Scripted click dispatched via {:?}", result.value);
            Ok(())
        })
        .await
    }

    async fn page_html(&self) -> Result<String, SessionError> {
        self.with_tab("html capture", None, |tab| tab.get_content()).await
    }

    async fn screenshot(&self) -> Result<Vec<u8>, SessionError> {
        self.with_tab("screenshot", None, |tab| {
            tab.capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, None, true)
        })
        .await
    }

    async fn release(&self) -> Result<(), SessionError> {
        let browser = self
            .browser
            .lock()
            .map_err(|_| SessionError::Browser(anyhow!("browser handle poisoned")))?
            .take();

        let Some(browser) = browser else {
            debug!("Browser already released");
            return Ok(());
        };

        let tab = Arc::clone(&self.tab);
        let gate = self.gate.clone();
        tokio::task::spawn_blocking(move || {
            gate.hold(|| {
                if let Err(e) = tab.close(true) {
                    warn!("Failed to close tab: {}", e);
                }
            });
            drop(browser);
        })
        .await
        .context("Browser shutdown task panicked")?;

        info!("Browser session released");
        Ok(())
    }
}
