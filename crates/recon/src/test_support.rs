//! In-memory `FetchJson` for unit tests.

use std::cell::RefCell;

use serde_json::Value;

use crate::error::ReconcileError;
use crate::gateway::FetchJson;

#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub url: String,
    pub params: Vec<(String, String)>,
}

impl Call {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }
}

struct Route {
    url: Option<String>,
    params: Vec<(String, String)>,
    response: Result<Value, ReconcileError>,
}

/// Answers each call with the first route whose params are a subset of
/// the call's params. Unrouted calls fail with a remote error.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    routes: Vec<Route>,
    calls: RefCell<Vec<Call>>,
}

fn owned(params: &[(&str, &str)]) -> Vec<(String, String)> {
    params.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, params: &[(&str, &str)], body: Value) -> Self {
        self.routes.push(Route { url: None, params: owned(params), response: Ok(body) });
        self
    }

    pub fn on_url(mut self, url: &str, params: &[(&str, &str)], body: Value) -> Self {
        self.routes.push(Route { url: Some(url.to_string()), params: owned(params), response: Ok(body) });
        self
    }

    pub fn fail(mut self, params: &[(&str, &str)], err: ReconcileError) -> Self {
        self.routes.push(Route { url: None, params: owned(params), response: Err(err) });
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl FetchJson for ScriptedFetcher {
    fn fetch_json(&self, url: &str, params: &[(&str, &str)]) -> Result<Value, ReconcileError> {
        let call = Call { url: url.to_string(), params: owned(params) };
        let route = self.routes.iter().find(|route| {
            route.url.as_deref().map_or(true, |u| u == url)
                && route.params.iter().all(|p| call.params.contains(p))
        });
        self.calls.borrow_mut().push(call);
        match route {
            Some(route) => route.response.clone(),
            None => Err(ReconcileError::remote(url, format!("no scripted route for {params:?}"))),
        }
    }
}
