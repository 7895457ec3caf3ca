use serde::Deserialize;

/// Paginated response envelope used by Octopus list endpoints
#[derive(Deserialize)]
pub struct Page<R> {
    #[serde(default = "Vec::new")]
    pub results: Vec<R>,
    pub next: Option<String>,
}
