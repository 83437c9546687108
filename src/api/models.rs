use serde::Deserialize;

fn default_limit() -> u32 {
    10
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Deserialize)]
pub struct PageRequest {
    pub page_title: String,
}
