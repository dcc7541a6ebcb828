use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use headless_chrome::protocol::cdp::Emulation;
use headless_chrome::{Browser, LaunchOptions, Tab};
use pagegrab_core::{FetchError, FetchMethod, FetchOptions, FetchResult};
use url::Url;

use super::{Fetcher, DEFAULT_USER_AGENT};

const WINDOW_SIZE: (u32, u32) = (1280, 800);
const LOCALE: &str = "ja_JP";
const ACCEPT_LANGUAGE: &str = "ja-JP,ja;q=0.9";
const TIMEZONE: &str = "Asia/Tokyo";
/// Longest time spent looking for and clicking a consent button
const CONSENT_BUDGET: Duration = Duration::from_secs(1);
/// Time after navigation and the script wait for the consent click and the
/// DOM capture. Part of the hard deadline, so a page that finishes loading
/// just inside `timeout` is still captured.
const CAPTURE_MARGIN: Duration = Duration::from_secs(2);
/// Chrome's connection is dropped after this long without a message
const IDLE_MARGIN: Duration = Duration::from_secs(5);

enum Locator {
    Css(&'static str),
    XPath(&'static str),
}

/// Consent buttons tried in order; the first one found is clicked
const CONSENT_BUTTONS: &[Locator] = &[
    Locator::XPath("//*[normalize-space(text())='同意して続行']"),
    Locator::XPath("//*[normalize-space(text())='同意して進む']"),
    Locator::XPath("//*[normalize-space(text())='同意する']"),
    Locator::XPath("//button[contains(., '同意')]"),
    Locator::Css("#consent-accept-button"),
];

/// Headless Chrome, after client-side scripts had `wait_for_js` to run.
///
/// Every call launches its own browser process. The process is owned by the
/// `Browser` value and killed when it is dropped, which happens on every exit
/// path of [`render`].
#[derive(Debug, Default)]
pub struct BrowserFetcher {
    executable: OnceLock<Result<PathBuf, String>>,
}

impl BrowserFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locate Chrome once per fetcher. Honors the `CHROME` environment variable.
    fn executable(&self) -> Result<PathBuf, FetchError> {
        self.executable
            .get_or_init(headless_chrome::browser::default_executable)
            .clone()
            .map_err(FetchError::BrowserLaunch)
    }
}

/// Hard upper bound for one render: navigation, the script wait, then the
/// capture margin
fn render_deadline(options: &FetchOptions) -> Duration {
    options.timeout + options.wait_for_js + CAPTURE_MARGIN
}

/// What is left of `wait_for_js` once `elapsed` has gone into navigation, so
/// the wait never pushes the capture past `timeout + wait_for_js`
fn script_wait(options: &FetchOptions, elapsed: Duration) -> Duration {
    options
        .wait_for_js
        .min((options.timeout + options.wait_for_js).saturating_sub(elapsed))
}

/// Split caller headers into the user-agent override and the rest
fn split_headers(options: &FetchOptions) -> (Option<&str>, HashMap<&str, &str>) {
    let user_agent = options.header("User-Agent");
    let extra = options
        .headers
        .iter()
        .filter(|(name, _)| !name.eq_ignore_ascii_case("User-Agent"))
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect();
    (user_agent, extra)
}

fn launch_error(e: impl std::fmt::Display) -> FetchError {
    FetchError::BrowserLaunch(e.to_string())
}

fn render_timeout(url: &Url, timeout: Duration) -> FetchError {
    FetchError::RenderTimeout {
        url: url.to_string(),
        timeout_ms: timeout.as_millis() as u64,
    }
}

/// Navigation failures past the tab timeout are render timeouts, anything
/// earlier (DNS, refused connections, TLS) is a network error.
fn classify_navigation(
    url: &Url,
    started: Instant,
    timeout: Duration,
    e: impl std::fmt::Display,
) -> FetchError {
    if started.elapsed() >= timeout {
        render_timeout(url, timeout)
    } else {
        FetchError::network(url.as_str(), e)
    }
}

/// Japanese locale and timezone, as a visitor from Japan would have
fn emulate_region(tab: &Tab) {
    if let Err(e) = tab.call_method(Emulation::SetLocaleOverride {
        locale: Some(LOCALE.to_string()),
    }) {
        log::warn!("Could not override the browser locale: {e}");
    }
    if let Err(e) = tab.call_method(Emulation::SetTimezoneOverride {
        timezone_id: TIMEZONE.to_string(),
    }) {
        log::warn!("Could not override the browser timezone: {e}");
    }
}

/// Click the first consent button on the page. Misses and failed clicks are
/// ignored.
fn accept_consent(tab: &Tab) {
    let started = Instant::now();
    for locator in CONSENT_BUTTONS {
        if started.elapsed() >= CONSENT_BUDGET {
            log::debug!("No consent button found within {CONSENT_BUDGET:?}");
            return;
        }
        let (found, query) = match locator {
            Locator::Css(selector) => (tab.find_element(selector), *selector),
            Locator::XPath(xpath) => (tab.find_element_by_xpath(xpath), *xpath),
        };
        let Ok(button) = found else {
            continue;
        };
        match button.click() {
            Ok(_) => {
                log::debug!("Clicked consent button {query}");
                return;
            }
            Err(e) => log::debug!("Consent button {query} did not take the click: {e}"),
        }
    }
}

fn render(executable: PathBuf, url: &Url, options: &FetchOptions) -> Result<FetchResult, FetchError> {
    let started = Instant::now();
    let navigation_error = |e| classify_navigation(url, started, options.timeout, e);

    let launch_options = LaunchOptions::default_builder()
        .headless(true)
        .path(Some(executable))
        .window_size(Some(WINDOW_SIZE))
        .idle_browser_timeout(options.timeout.max(options.wait_for_js) + IDLE_MARGIN)
        .args(vec![
            OsStr::new("--disable-blink-features=AutomationControlled"),
            OsStr::new("--lang=ja-JP"),
        ])
        .build()
        .map_err(launch_error)?;

    let browser = Browser::new(launch_options).map_err(launch_error)?;
    let tab = browser.new_tab().map_err(launch_error)?;
    tab.set_default_timeout(options.timeout);

    // Hides navigator.webdriver and friends; sets its own user agent, so ours
    // has to come after it.
    tab.enable_stealth_mode().map_err(launch_error)?;
    emulate_region(&tab);

    let (user_agent, extra_headers) = split_headers(options);
    tab.set_user_agent(
        user_agent.unwrap_or(DEFAULT_USER_AGENT),
        Some(ACCEPT_LANGUAGE),
        None,
    )
    .map_err(launch_error)?;
    if !extra_headers.is_empty() {
        tab.set_extra_http_headers(extra_headers)
            .map_err(launch_error)?;
    }

    log::debug!("Navigating headless Chrome to {url}");
    tab.navigate_to(url.as_str())
        .map_err(navigation_error)?
        .wait_until_navigated()
        .map_err(navigation_error)?;

    if started.elapsed() >= options.timeout {
        return Err(render_timeout(url, options.timeout));
    }

    accept_consent(&tab);
    std::thread::sleep(script_wait(options, started.elapsed()));

    let html = tab.get_content().map_err(navigation_error)?;
    let final_url = tab.get_url();

    log::debug!(
        "Rendered {} bytes from {final_url} in {} ms",
        html.len(),
        started.elapsed().as_millis()
    );

    Ok(FetchResult {
        content: html,
        url: url.to_string(),
        final_url,
        content_type: Some("text/html".to_string()),
        status: None,
    })
}

#[async_trait::async_trait]
impl Fetcher for BrowserFetcher {
    fn method(&self) -> FetchMethod {
        FetchMethod::Browser
    }

    fn check_available(&self) -> Result<(), FetchError> {
        self.executable().map(|_| ())
    }

    fn deadline(&self, options: &FetchOptions) -> Duration {
        render_deadline(options)
    }

    fn deadline_error(&self, url: &Url, deadline: Duration) -> FetchError {
        render_timeout(url, deadline)
    }

    async fn fetch(&self, url: &Url, options: &FetchOptions) -> Result<FetchResult, FetchError> {
        let executable = self.executable()?;
        let url = url.clone();
        let options = options.clone();

        // headless_chrome is synchronous. If the orchestrator's deadline fires
        // first, this thread still runs to the end of `render` and drops the
        // browser; the runtime waits for it on shutdown.
        tokio::task::spawn_blocking(move || render(executable, &url, &options))
            .await
            .map_err(|e| FetchError::BrowserLaunch(format!("browser task failed: {e}")))?
    }
}
