use crate::error::SessionError;
use crate::models::RoomVerdict;
use crate::scrapers::traits::{ElementHandle, PageSession, RoomClassifier, SessionLauncher};
use anyhow::anyhow;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a click on a fake element does
#[derive(Debug, Clone, Default)]
pub enum ClickEffect {
    /// Page moves to this URL
    Navigate(String),
    /// Click lands but nothing happens
    #[default]
    Nothing,
    /// Engine reports an error
    Fail,
}

#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    pub text: String,
    pub attrs: HashMap<String, String>,
    /// Number of queries that miss before the element shows up
    pub hidden_for: usize,
    pub on_click: ClickEffect,
    pub on_script_click: ClickEffect,
}

impl FakeElement {
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::default()
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn hidden_for(mut self, queries: usize) -> Self {
        self.hidden_for = queries;
        self
    }

    pub fn on_click(mut self, effect: ClickEffect) -> Self {
        self.on_click = effect;
        self
    }

    pub fn on_script_click(mut self, effect: ClickEffect) -> Self {
        self.on_script_click = effect;
        self
    }
}

#[derive(Debug, Default)]
struct FakeState {
    url: String,
    elements: HashMap<String, FakeElement>,
    queries: HashMap<String, usize>,
    visited: Vec<String>,
    slow_urls: HashSet<String>,
    broken_urls: HashSet<String>,
    native_clicks: usize,
    script_clicks: usize,
}

/// Scripted page whose counters survive being boxed into a session
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    state: Arc<Mutex<FakeState>>,
    releases: Arc<AtomicUsize>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_element(self, path: impl Into<String>, element: FakeElement) -> Self {
        self.state.lock().unwrap().elements.insert(path.into(), element);
        self
    }

    /// Loading this URL exceeds any timeout
    pub fn with_slow_url(self, url: &str) -> Self {
        self.state.lock().unwrap().slow_urls.insert(url.to_string());
        self
    }

    /// Loading this URL fails with an engine error
    pub fn with_broken_url(self, url: &str) -> Self {
        self.state.lock().unwrap().broken_urls.insert(url.to_string());
        self
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn visited(&self) -> Vec<String> {
        self.state.lock().unwrap().visited.clone()
    }

    pub fn queries(&self, path: &str) -> usize {
        self.state.lock().unwrap().queries.get(path).copied().unwrap_or(0)
    }

    pub fn native_clicks(&self) -> usize {
        self.state.lock().unwrap().native_clicks
    }

    pub fn script_clicks(&self) -> usize {
        self.state.lock().unwrap().script_clicks
    }

    fn element(&self, handle: &ElementHandle) -> Result<FakeElement, SessionError> {
        self.state
            .lock()
            .unwrap()
            .elements
            .get(handle.path())
            .cloned()
            .ok_or_else(|| SessionError::Browser(anyhow!("stale element {}", handle.path())))
    }

    fn apply(&self, effect: ClickEffect) -> Result<(), SessionError> {
        match effect {
            ClickEffect::Navigate(url) => {
                let mut state = self.state.lock().unwrap();
                state.visited.push(url.clone());
                state.url = url;
                Ok(())
            }
            ClickEffect::Nothing => Ok(()),
            ClickEffect::Fail => Err(SessionError::Browser(anyhow!("element not interactable"))),
        }
    }
}

#[async_trait]
impl PageSession for FakePage {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap();
        if state.slow_urls.contains(url) {
            return Err(SessionError::Timeout {
                action: "page load",
                after: timeout,
            });
        }
        if state.broken_urls.contains(url) {
            return Err(SessionError::Browser(anyhow!("net::ERR_NAME_NOT_RESOLVED")));
        }
        state.visited.push(url.to_string());
        state.url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String, SessionError> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn wait_for_load(&self, _timeout: Duration) -> Result<(), SessionError> {
        Ok(())
    }

    async fn find(&self, path: &str) -> Result<Option<ElementHandle>, SessionError> {
        let mut state = self.state.lock().unwrap();
        let seen = {
            let count = state.queries.entry(path.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        Ok(state
            .elements
            .get(path)
            .filter(|element| seen > element.hidden_for)
            .map(|_| ElementHandle::new(path)))
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        Ok(self.element(element)?.attrs.get(name).cloned())
    }

    async fn text(&self, element: &ElementHandle) -> Result<String, SessionError> {
        Ok(self.element(element)?.text)
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), SessionError> {
        let effect = self.element(element)?.on_click;
        self.state.lock().unwrap().native_clicks += 1;
        self.apply(effect)
    }

    async fn script_click(&self, element: &ElementHandle) -> Result<(), SessionError> {
        let effect = self.element(element)?.on_script_click;
        self.state.lock().unwrap().script_clicks += 1;
        self.apply(effect)
    }

    async fn page_html(&self) -> Result<String, SessionError> {
        Ok("<html><body></body></html>".to_string())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, SessionError> {
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn release(&self) -> Result<(), SessionError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out clones of one `FakePage`
#[derive(Debug, Clone, Default)]
pub struct FakeLauncher {
    pub page: FakePage,
    pub fail: bool,
    launches: Arc<AtomicUsize>,
}

impl FakeLauncher {
    pub fn new(page: FakePage) -> Self {
        Self {
            page,
            fail: false,
            launches: Arc::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn PageSession>, SessionError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SessionError::Browser(anyhow!("could not find a Chrome binary")));
        }
        Ok(Box::new(self.page.clone()))
    }
}

/// Says "room" for a fixed set of URLs, "unknown" for another, and records every call
#[derive(Debug, Clone, Default)]
pub struct ScriptedClassifier {
    rooms: HashSet<String>,
    unknown: HashSet<String>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedClassifier {
    pub fn rooms(urls: &[&str]) -> Self {
        Self {
            rooms: urls.iter().map(|u| u.to_string()).collect(),
            ..Self::default()
        }
    }

    /// These URLs get `Unknown`, as when the model call fails
    pub fn with_unknown(mut self, urls: &[&str]) -> Self {
        self.unknown.extend(urls.iter().map(|u| u.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RoomClassifier for ScriptedClassifier {
    async fn classify(&self, image_url: &str) -> RoomVerdict {
        self.calls.lock().unwrap().push(image_url.to_string());
        if self.rooms.contains(image_url) {
            RoomVerdict::Room
        } else if self.unknown.contains(image_url) {
            RoomVerdict::Unknown
        } else {
            RoomVerdict::NotRoom
        }
    }
}
