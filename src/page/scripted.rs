//! Scripted in-memory driver for tests.
//!
//! Plays back a sequence of page snapshots: each classifier poll or step
//! probe observes the current snapshot, and the script advances one snapshot
//! per `body_text` read (one read per poll tick). The last snapshot repeats
//! once the script is exhausted.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};

use super::driver::{ElementRef, PageDriver, ResponseRecord};
use super::locator::Locator;

// ============================================================================
// Snapshot
// ============================================================================

/// Visibility and interactability of a scripted element.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ElementState {
    pub visible: bool,
    pub enabled: bool,
}

impl Default for ElementState {
    fn default() -> Self {
        Self {
            visible: true,
            enabled: true,
        }
    }
}

/// One observable page state.
#[derive(Debug, Clone, Default)]
pub(crate) struct Snapshot {
    pub body_text: String,
    pub elements: Vec<(Locator, ElementState)>,
    pub failed: Option<ResponseRecord>,
}

impl Snapshot {
    pub(crate) fn with_text(text: &str) -> Self {
        Self {
            body_text: text.to_string(),
            ..Self::default()
        }
    }

    pub(crate) fn element(mut self, locator: Locator) -> Self {
        self.elements.push((locator, ElementState::default()));
        self
    }

    pub(crate) fn disabled_element(mut self, locator: Locator) -> Self {
        self.elements.push((
            locator,
            ElementState {
                visible: true,
                enabled: false,
            },
        ));
        self
    }
}

// ============================================================================
// Interaction Log
// ============================================================================

/// Recorded driver interactions, asserted by step and flow tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Interaction {
    Navigated(String),
    Clicked(Locator),
    Filled(Locator, String),
    Typed(Locator, String),
    Selected(Locator, String),
}

// ============================================================================
// ScriptedDriver
// ============================================================================

/// In-memory [`PageDriver`] playing back snapshots.
pub(crate) struct ScriptedDriver {
    snapshots: Vec<Snapshot>,
    tick: AtomicUsize,
    refs: Mutex<FxHashMap<String, (Locator, ElementState)>>,
    next_ref: AtomicUsize,
    pub interactions: Mutex<Vec<Interaction>>,
    /// Injected faults.
    pub fail_navigate: AtomicBool,
    pub fail_click: AtomicBool,
}

impl ScriptedDriver {
    pub(crate) fn new(snapshots: Vec<Snapshot>) -> Self {
        assert!(!snapshots.is_empty(), "script needs at least one snapshot");
        Self {
            snapshots,
            tick: AtomicUsize::new(0),
            refs: Mutex::new(FxHashMap::default()),
            next_ref: AtomicUsize::new(0),
            interactions: Mutex::new(Vec::new()),
            fail_navigate: AtomicBool::new(false),
            fail_click: AtomicBool::new(false),
        }
    }

    /// Single static snapshot, never advances.
    pub(crate) fn single(snapshot: Snapshot) -> Self {
        Self::new(vec![snapshot])
    }

    fn current(&self) -> &Snapshot {
        let idx = self.tick.load(Ordering::SeqCst).min(self.snapshots.len() - 1);
        &self.snapshots[idx]
    }

    fn advance(&self) {
        self.tick.fetch_add(1, Ordering::SeqCst);
    }

    fn issue_ref(&self, locator: &Locator, state: ElementState) -> ElementRef {
        let id = format!("el-{}", self.next_ref.fetch_add(1, Ordering::SeqCst));
        self.refs
            .lock()
            .insert(id.clone(), (locator.clone(), state));
        ElementRef::new(id)
    }

    fn lookup(&self, element: &ElementRef) -> Result<(Locator, ElementState)> {
        self.refs
            .lock()
            .get(element.as_str())
            .cloned()
            .ok_or_else(|| Error::driver(format!("unknown element ref {element}")))
    }

    pub(crate) fn log(&self) -> Vec<Interaction> {
        self.interactions.lock().clone()
    }
}

#[async_trait]
impl PageDriver for ScriptedDriver {
    async fn navigate(&self, url: &str) -> Result<()> {
        if self.fail_navigate.load(Ordering::SeqCst) {
            return Err(Error::navigation(url, "scripted refusal"));
        }
        self.interactions
            .lock()
            .push(Interaction::Navigated(url.to_string()));
        Ok(())
    }

    async fn page_url(&self) -> Result<String> {
        Ok("https://scripted.test/".to_string())
    }

    async fn find(&self, locator: &Locator) -> Result<Option<ElementRef>> {
        let found = self
            .current()
            .elements
            .iter()
            .find(|(l, _)| l == locator)
            .map(|(l, s)| self.issue_ref(l, *s));
        Ok(found)
    }

    async fn is_visible(&self, element: &ElementRef) -> Result<bool> {
        Ok(self.lookup(element)?.1.visible)
    }

    async fn is_enabled(&self, element: &ElementRef) -> Result<bool> {
        Ok(self.lookup(element)?.1.enabled)
    }

    async fn click(&self, element: &ElementRef) -> Result<()> {
        if self.fail_click.load(Ordering::SeqCst) {
            return Err(Error::driver("scripted click failure"));
        }
        let (locator, _) = self.lookup(element)?;
        self.interactions.lock().push(Interaction::Clicked(locator));
        Ok(())
    }

    async fn fill(&self, element: &ElementRef, value: &str) -> Result<()> {
        let (locator, _) = self.lookup(element)?;
        self.interactions
            .lock()
            .push(Interaction::Filled(locator, value.to_string()));
        Ok(())
    }

    async fn type_text(&self, element: &ElementRef, value: &str) -> Result<()> {
        let (locator, _) = self.lookup(element)?;
        self.interactions
            .lock()
            .push(Interaction::Typed(locator, value.to_string()));
        Ok(())
    }

    async fn select_value(&self, element: &ElementRef, value: &str) -> Result<()> {
        let (locator, _) = self.lookup(element)?;
        self.interactions
            .lock()
            .push(Interaction::Selected(locator, value.to_string()));
        Ok(())
    }

    async fn body_text(&self) -> Result<String> {
        let text = self.current().body_text.clone();
        self.advance();
        Ok(text)
    }

    async fn failed_response(&self, url_fragment: &str) -> Result<Option<ResponseRecord>> {
        Ok(self
            .current()
            .failed
            .as_ref()
            .filter(|r| r.url.contains(url_fragment))
            .cloned())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(b"scripted-screenshot".to_vec())
    }
}
