use crate::config::NewsConfig;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Search terms pinned to the safety beat. Quoted phrases survive as-is
/// because the provider parses its own query syntax.
pub const DEFAULT_QUERY: &str =
    "accident OR safety OR emergency OR disaster OR rescue OR \"safety tips\"";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsResponse {
    pub total_articles: i64,
    pub articles: Vec<Article>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    pub url: String,
    #[serde(default)]
    pub image: Option<String>,
    pub published_at: String,
    pub source: ArticleSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleSource {
    pub name: String,
    pub url: String,
}

/// Thin proxy over the GNews search endpoint, keyed and filtered to
/// Philippine English-language coverage.
#[derive(Clone)]
pub struct NewsClient {
    http: reqwest::Client,
    config: NewsConfig,
}

impl NewsClient {
    pub fn new(http: reqwest::Client, config: NewsConfig) -> Self {
        Self { http, config }
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    pub async fn latest(&self) -> Result<NewsResponse> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            anyhow::bail!("news api key is not configured");
        };
        let response = self
            .http
            .get(format!("{}/search", self.config.base_url))
            .query(&[
                ("q", DEFAULT_QUERY),
                ("country", "ph"),
                ("lang", "en"),
                ("apikey", api_key),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            anyhow::bail!("news provider returned {}", response.status());
        }
        Ok(response.json::<NewsResponse>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_provider_payload() {
        let raw = r#"{
            "totalArticles": 2,
            "articles": [
                {
                    "title": "Signal No. 3 raised over Northern Luzon",
                    "description": "PAGASA warns of heavy rainfall.",
                    "content": "Residents are advised to evacuate low-lying areas...",
                    "url": "https://news.example.ph/signal-3",
                    "image": "https://news.example.ph/signal-3.jpg",
                    "publishedAt": "2024-10-21T04:30:00Z",
                    "source": {"name": "Example News", "url": "https://news.example.ph"}
                },
                {
                    "title": "Earthquake drill schedule released",
                    "url": "https://news.example.ph/drill",
                    "publishedAt": "2024-10-20T09:00:00Z",
                    "source": {"name": "Example News", "url": "https://news.example.ph"}
                }
            ]
        }"#;
        let decoded: NewsResponse = serde_json::from_str(raw).expect("decode");
        assert_eq!(decoded.total_articles, 2);
        assert_eq!(decoded.articles.len(), 2);
        assert_eq!(
            decoded.articles[0].title,
            "Signal No. 3 raised over Northern Luzon"
        );
        assert_eq!(decoded.articles[1].description, None);
        assert_eq!(decoded.articles[1].image, None);
        assert_eq!(decoded.articles[0].source.name, "Example News");
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let client = NewsClient::new(reqwest::Client::new(), NewsConfig::default());
        assert!(!client.is_configured());
        let err = client.latest().await.unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }
}
