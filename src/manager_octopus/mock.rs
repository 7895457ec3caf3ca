use std::cell::RefCell;
use std::collections::VecDeque;
use crate::manager_octopus::Transport;
use crate::manager_octopus::errors::OctopusError;

/// A request as seen by the mock transport
pub struct Request {
    pub url: String,
    pub query: Vec<(String, String)>,
}

impl Request {
    pub fn query_value(&self, key: &str) -> Option<String> {
        self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }
}

/// Transport returning canned responses in order and recording every request
pub struct MockTransport {
    pub responses: RefCell<VecDeque<Result<String, OctopusError>>>,
    pub requests: RefCell<Vec<Request>>,
}

impl MockTransport {
    pub fn new(responses: Vec<Result<String, OctopusError>>) -> Self {
        MockTransport { responses: RefCell::new(responses.into()), requests: RefCell::new(Vec::new()) }
    }
}

impl Transport for MockTransport {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<String, OctopusError> {
        self.requests.borrow_mut().push(Request {
            url: url.to_string(),
            query: query.iter().map(|&(k, v)| (k.to_string(), v.to_string())).collect(),
        });

        self.responses.borrow_mut().pop_front().unwrap_or(Err(OctopusError::Status(404)))
    }
}
