use thiserror::Error;

#[derive(Error, Debug)]
pub enum OctopusError {
    #[error("OctopusError::Status: Octopus responded with http status {0}")]
    Status(u16),
    #[error("OctopusError::Transport: {0}")]
    Transport(String),
    #[error("OctopusError::Document: {0}")]
    Document(#[from] serde_json::Error),
    #[error("OctopusError::PageLimit: gave up after {0} pages")]
    PageLimit(usize),
    #[error("OctopusError::NoStandingCharge: no standing charge returned from {0}")]
    NoStandingCharge(String),
}
impl From<ureq::Error> for OctopusError {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::StatusCode(status) => OctopusError::Status(status),
            e => OctopusError::Transport(e.to_string()),
        }
    }
}
