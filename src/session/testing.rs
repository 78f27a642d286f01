//! Recording engine and bootstrapper for unit tests

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{
    bootstrap::SessionBootstrapper,
    engine::{EngineFactory, PlaybackEngine},
};
use crate::{Error, Result};

/// Shared view of every engine a [`RecordingFactory`] created
#[derive(Debug, Default)]
pub struct EngineTracker {
    pub created: AtomicUsize,
    pub attached: AtomicUsize,
    pub destroyed: AtomicUsize,
    live: AtomicUsize,
    pub max_live: AtomicUsize,
    pub attached_urls: Mutex<Vec<String>>,
    pub seeks: Mutex<Vec<f64>>,
    pub headers: Mutex<Vec<BTreeMap<String, String>>>,
    position: Mutex<f64>,
    duration: Mutex<Option<f64>>,
    attach_delay: Mutex<Option<Duration>>,
    pub fail_attach: AtomicBool,
}

impl EngineTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn attached(&self) -> usize {
        self.attached.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.seeks.lock().unwrap().clone()
    }

    pub fn last_url(&self) -> Option<String> {
        self.attached_urls.lock().unwrap().last().cloned()
    }

    pub fn last_headers(&self) -> Option<BTreeMap<String, String>> {
        self.headers.lock().unwrap().last().cloned()
    }

    pub fn set_position(&self, position: f64) {
        *self.position.lock().unwrap() = position;
    }

    pub fn set_duration(&self, duration: Option<f64>) {
        *self.duration.lock().unwrap() = duration;
    }

    pub fn set_attach_delay(&self, delay: Duration) {
        *self.attach_delay.lock().unwrap() = Some(delay);
    }
}

#[derive(Debug, Clone)]
pub struct RecordingFactory {
    tracker: Arc<EngineTracker>,
}

impl RecordingFactory {
    pub fn new(tracker: Arc<EngineTracker>) -> Self {
        Self { tracker }
    }
}

impl EngineFactory for RecordingFactory {
    fn create(&self) -> Box<dyn PlaybackEngine> {
        self.tracker.created.fetch_add(1, Ordering::SeqCst);
        let live = self.tracker.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.tracker.max_live.fetch_max(live, Ordering::SeqCst);
        Box::new(RecordingEngine {
            tracker: self.tracker.clone(),
            destroyed: false,
        })
    }
}

#[derive(Debug)]
pub struct RecordingEngine {
    tracker: Arc<EngineTracker>,
    destroyed: bool,
}

#[async_trait::async_trait]
impl PlaybackEngine for RecordingEngine {
    async fn attach(&mut self, url: &str, _initial_quality: &str) -> Result<()> {
        let delay = *self.tracker.attach_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.tracker.fail_attach.load(Ordering::SeqCst) {
            return Err(Error::engine("media element rejected source"));
        }
        self.tracker.attached.fetch_add(1, Ordering::SeqCst);
        self.tracker.attached_urls.lock().unwrap().push(url.to_string());
        Ok(())
    }

    fn destroy(&mut self) {
        if !self.destroyed {
            self.destroyed = true;
            self.tracker.destroyed.fetch_add(1, Ordering::SeqCst);
            self.tracker.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn seek(&mut self, offset_secs: f64) -> Result<()> {
        self.tracker.seeks.lock().unwrap().push(offset_secs);
        self.tracker.set_position(offset_secs);
        Ok(())
    }

    fn set_fragment_headers(&mut self, headers: &BTreeMap<String, String>) {
        self.tracker.headers.lock().unwrap().push(headers.clone());
    }

    fn position(&self) -> f64 {
        *self.tracker.position.lock().unwrap()
    }

    fn duration(&self) -> Option<f64> {
        *self.tracker.duration.lock().unwrap()
    }
}

/// Records landing urls, optionally failing every call
#[derive(Debug, Default)]
pub struct RecordingBootstrapper {
    pub calls: Mutex<Vec<String>>,
    pub fail: bool,
}

impl RecordingBootstrapper {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SessionBootstrapper for RecordingBootstrapper {
    async fn bootstrap(&self, landing_url: &str) -> Result<()> {
        self.calls.lock().unwrap().push(landing_url.to_string());
        if self.fail {
            return Err(Error::bootstrap("landing page unreachable"));
        }
        Ok(())
    }
}
