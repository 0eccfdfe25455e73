use serde::{Deserialize, Serialize};

/// Placeholder OMDb uses for fields it has no value for.
const NOT_AVAILABLE: &str = "N/A";

/// Raw `?i=` lookup response. Every field is optional because a failed lookup
/// only carries `Response` and `Error`.
#[derive(Debug, Clone, Deserialize)]
pub struct TitleResponse {
    #[serde(rename = "Response")]
    pub response: String,
    #[serde(rename = "Error")]
    pub error: Option<String>,
    #[serde(rename = "Title")]
    pub title: Option<String>,
    #[serde(rename = "Year")]
    pub year: Option<String>,
    #[serde(rename = "Plot")]
    pub plot: Option<String>,
    #[serde(rename = "Type")]
    pub kind: Option<String>,
    #[serde(rename = "imdbID")]
    pub imdb_id: Option<String>,
}

impl TitleResponse {
    pub fn succeeded(&self) -> bool {
        self.response.eq_ignore_ascii_case("true")
    }
}

/// A cleaned-up title record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleRecord {
    /// The id the catalog reports for this record. Differs from the requested
    /// id when the catalog has merged the requested one into another title.
    pub imdb_id: String,
    pub title: Option<String>,
    pub year: Option<String>,
    pub kind: Option<String>,
    pub plots: Vec<String>,
}

impl TitleRecord {
    /// Build a record from a successful response; `requested_id` fills in for
    /// a missing `imdbID`.
    pub fn from_response(resp: TitleResponse, requested_id: &str) -> Self {
        Self {
            imdb_id: present(resp.imdb_id).unwrap_or_else(|| requested_id.to_string()),
            title: present(resp.title),
            year: present(resp.year),
            kind: present(resp.kind),
            plots: present(resp.plot).into_iter().collect(),
        }
    }
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != NOT_AVAILABLE)
}
