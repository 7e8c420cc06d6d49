use std::cell::RefCell;
use std::path::PathBuf;

use mediarecon_recon::{FetchJson, ReconcileError};
use serde_json::Value;

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

pub fn load_fixture(name: &str) -> Value {
    let path = fixtures_dir().join(name);
    let text = std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    serde_json::from_str(&text).unwrap_or_else(|e| panic!("bad fixture {}: {e}", path.display()))
}

/// Serves JSON fixtures for calls whose params include every routed pair.
#[derive(Default)]
pub struct FixtureFetcher {
    routes: Vec<(Vec<(String, String)>, String)>,
    calls: RefCell<Vec<Vec<(String, String)>>>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, params: &[(&str, &str)], fixture: &str) -> Self {
        let params = params.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        self.routes.push((params, fixture.to_string()));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl FetchJson for FixtureFetcher {
    fn fetch_json(&self, url: &str, params: &[(&str, &str)]) -> Result<Value, ReconcileError> {
        let call: Vec<(String, String)> = params.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        let fixture = self
            .routes
            .iter()
            .find(|(wanted, _)| wanted.iter().all(|p| call.contains(p)))
            .map(|(_, fixture)| fixture.clone());
        self.calls.borrow_mut().push(call);
        match fixture {
            Some(name) => Ok(load_fixture(&name)),
            None => Err(ReconcileError::remote(url, format!("no fixture for {params:?}"))),
        }
    }
}
