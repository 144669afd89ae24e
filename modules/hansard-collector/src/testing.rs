// Test support for the crawl pipeline.
//
// MockSource (HansardSource): HashMap-backed sitting indexes and debates,
// scripted transient failures, stop triggers, and a call log. Unregistered resources answer
// NotFound, which is what the archive does for days with no sitting.
//
// Plus JSON builders for sitting indexes and debate trees.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use hansard_client::{sitting_path, HansardError, Result};
use hansard_common::House;
use serde_json::{json, Value};

use crate::traits::HansardSource;

pub const MOCK_BASE_URL: &str = "https://hansard.test";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
}

fn debate_key(href: &str) -> String {
    href.trim().trim_end_matches(".js").to_string()
}

/// Builder pattern: `.on_index()`, `.on_debate()`, `.failing()`, `.always_failing()`,
/// `.stopping_after()`.
pub struct MockSource {
    base_url: String,
    indexes: HashMap<NaiveDate, Value>,
    debates: HashMap<String, Value>,
    /// Remaining transient failures per resource key.
    failures: Mutex<HashMap<String, u32>>,
    broken: HashSet<String>,
    /// Flags raised once the keyed resource has been served.
    stops: HashMap<String, Arc<AtomicBool>>,
    calls: Mutex<Vec<String>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            base_url: MOCK_BASE_URL.to_string(),
            indexes: HashMap::new(),
            debates: HashMap::new(),
            failures: Mutex::new(HashMap::new()),
            broken: HashSet::new(),
            stops: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn on_index(mut self, date: NaiveDate, index: Value) -> Self {
        self.indexes.insert(date, index);
        self
    }

    pub fn on_debate(mut self, href: &str, document: Value) -> Self {
        self.debates.insert(debate_key(href), document);
        self
    }

    /// Fail the next `times` requests for `key` with a transient error.
    /// `key` is a debate href or a sitting path such as `/sittings/1905/aug/10`.
    pub fn failing(self, key: &str, times: u32) -> Self {
        self.failures
            .lock()
            .expect("mock lock")
            .insert(debate_key(key), times);
        self
    }

    /// Fail every request for `key` with a transient error.
    pub fn always_failing(mut self, key: &str) -> Self {
        self.broken.insert(debate_key(key));
        self
    }

    /// Raise `flag` right after `key` is served, as a Ctrl-C landing mid-crawl would.
    pub fn stopping_after(mut self, key: &str, flag: Arc<AtomicBool>) -> Self {
        self.stops.insert(debate_key(key), flag);
        self
    }

    /// Every request made so far, as resource keys, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("mock lock").clone()
    }

    pub fn calls_to(&self, key: &str) -> usize {
        let key = debate_key(key);
        self.calls().iter().filter(|c| **c == key).count()
    }

    fn respond(&self, key: String, found: Option<&Value>) -> Result<Value> {
        self.calls.lock().expect("mock lock").push(key.clone());
        if self.broken.contains(&key) {
            return Err(HansardError::transient(&key, "scripted permanent failure"));
        }
        if let Some(remaining) = self.failures.lock().expect("mock lock").get_mut(&key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(HansardError::transient(&key, "scripted failure"));
            }
        }
        if let Some(flag) = self.stops.get(&key) {
            flag.store(true, Ordering::Relaxed);
        }
        found
            .cloned()
            .ok_or_else(|| HansardError::NotFound(key))
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HansardSource for MockSource {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn sitting_index(&self, date: NaiveDate) -> Result<Value> {
        self.respond(sitting_path(date), self.indexes.get(&date))
    }

    async fn debate(&self, href: &str) -> Result<Value> {
        let key = debate_key(href);
        let found = self.debates.get(&key);
        self.respond(key, found)
    }
}

// --- JSON builders ---

/// A sitting index in the `items[]` shape, one sitting per house present.
pub fn sitting_index(debates: &[(House, &str, &str)]) -> Value {
    let mut sittings = Vec::new();
    for house in [House::Commons, House::Lords] {
        let items: Vec<Value> = debates
            .iter()
            .filter(|(h, _, _)| *h == house)
            .map(|(_, href, title)| json!({"href": href, "title": title}))
            .collect();
        if !items.is_empty() {
            let mut sitting = serde_json::Map::new();
            sitting.insert(
                format!("house_of_{}_sitting", house.as_str()),
                json!({"items": items}),
            );
            sittings.push(Value::Object(sitting));
        }
    }
    Value::Array(sittings)
}

/// A debate tree: a titled container of speeches `(member, party, text)`.
pub fn debate_doc(title: &str, speeches: &[(&str, Option<&str>, &str)]) -> Value {
    let children: Vec<Value> = speeches
        .iter()
        .map(|(member, party, text)| {
            let mut speaker = json!({"name": member});
            if let Some(party) = party {
                speaker["party"] = json!(party);
            }
            json!({"speaker": speaker, "text": text})
        })
        .collect();
    json!({"title": title, "children": children})
}
