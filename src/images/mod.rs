use std::collections::HashSet;
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use serde_json::Value;

use crate::config::{Config, ImageProviderKind};
use crate::models::Image;

pub const DEFAULT_IMAGE_TIMEOUT_SECS: u64 = 10;
pub const MAX_IMAGES_PER_POST: usize = 3;
const MAX_KEYWORD_QUERIES: usize = 2;

/// Stock photo search client for Pexels or Unsplash.
#[derive(Debug, Clone)]
pub struct ImageClient {
    http: reqwest::Client,
    provider: ImageProviderKind,
    api_key: String,
    base_url: String,
}

impl ImageClient {
    pub fn new(
        provider: ImageProviderKind,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_IMAGE_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            provider,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Option<Result<Self, reqwest::Error>> {
        let api_key = config.image_api_key()?;
        let base_url = match config.image_provider {
            ImageProviderKind::Pexels => &config.pexels_api_url,
            ImageProviderKind::Unsplash => &config.unsplash_api_url,
        };
        Some(Self::new(config.image_provider, api_key, base_url))
    }

    pub fn provider(&self) -> ImageProviderKind {
        self.provider
    }

    /// Fetch up to `count` (at most 3) images for a topic, topping up from keywords.
    pub async fn fetch_images(&self, topic: &str, keywords: &[String], count: usize) -> Vec<Image> {
        let count = count.min(MAX_IMAGES_PER_POST);
        if count == 0 {
            return Vec::new();
        }

        let mut images: Vec<Image> = Vec::with_capacity(count);
        let mut seen_ids: HashSet<String> = HashSet::new();
        let mut queries_used: HashSet<String> = HashSet::new();

        let topic = topic.trim();
        if !topic.is_empty() {
            for image in self.search(topic, count).await {
                if images.len() >= count {
                    break;
                }
                if seen_ids.insert(image.provider_id.clone()) {
                    images.push(image);
                }
            }
            queries_used.insert(topic.to_lowercase());
        }

        let mut keyword_queries = 0;
        for keyword in keywords {
            if images.len() >= count || keyword_queries >= MAX_KEYWORD_QUERIES {
                break;
            }
            let keyword = keyword.trim();
            if keyword.is_empty() || !queries_used.insert(keyword.to_lowercase()) {
                continue;
            }

            keyword_queries += 1;
            tracing::info!(keyword, "Searching images with keyword");
            let remaining = count - images.len();
            for image in self.search(keyword, remaining).await {
                if images.len() >= count {
                    break;
                }
                if seen_ids.insert(image.provider_id.clone()) {
                    images.push(image);
                }
            }
        }

        images.truncate(count);
        tracing::info!(
            topic,
            provider = self.provider.as_str(),
            fetched = images.len(),
            "Image fetch completed"
        );
        images
    }

    async fn search(&self, query: &str, count: usize) -> Vec<Image> {
        let request = match self.provider {
            ImageProviderKind::Pexels => self
                .http
                .get(format!("{}/search", self.base_url))
                .header(AUTHORIZATION, &self.api_key)
                .query(&[
                    ("query", query.to_string()),
                    ("per_page", count.min(80).to_string()),
                    ("orientation", "landscape".to_string()),
                ]),
            ImageProviderKind::Unsplash => self
                .http
                .get(format!("{}/search/photos", self.base_url))
                .header(AUTHORIZATION, format!("Client-ID {}", self.api_key))
                .header("Accept-Version", "v1")
                .query(&[
                    ("query", query.to_string()),
                    ("per_page", count.min(30).to_string()),
                    ("orientation", "landscape".to_string()),
                    ("content_filter", "high".to_string()),
                    ("order_by", "relevant".to_string()),
                ]),
        };

        let provider = self.provider.display_name();
        let response = match request.send().await {
            Ok(resp) => resp,
            Err(error) => {
                tracing::warn!(query, "{} API request failed: {}", provider, error);
                return Vec::new();
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(query, status = %status, "{} API returned an error status", provider);
            return Vec::new();
        }

        let data = match response.json::<Value>().await {
            Ok(data) => data,
            Err(error) => {
                tracing::warn!(query, "Failed to decode {} response: {}", provider, error);
                return Vec::new();
            }
        };

        let images = parse_images(self.provider, &data, query);
        tracing::info!(query, found = images.len(), "{} search completed", provider);
        images
    }
}

/// Normalize a provider search response into `Image` records; entries without a URL are skipped.
pub fn parse_images(provider: ImageProviderKind, data: &Value, query: &str) -> Vec<Image> {
    let results_key = match provider {
        ImageProviderKind::Pexels => "photos",
        ImageProviderKind::Unsplash => "results",
    };

    data.get(results_key)
        .and_then(|results| results.as_array())
        .map(|results| {
            results
                .iter()
                .filter_map(|raw| match provider {
                    ImageProviderKind::Pexels => parse_pexels_photo(raw, query),
                    ImageProviderKind::Unsplash => parse_unsplash_photo(raw, query),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_pexels_photo(raw: &Value, query: &str) -> Option<Image> {
    let src = raw.get("src");
    let medium_url = src.and_then(|s| str_field(s, "medium"));
    let url = src
        .and_then(|s| str_field(s, "large"))
        .or_else(|| medium_url.clone())?;

    Some(Image {
        url,
        medium_url,
        photographer: str_field(raw, "photographer").unwrap_or_else(|| "Unknown".to_string()),
        photographer_url: str_field(raw, "photographer_url"),
        source_url: str_field(raw, "url").unwrap_or_default(),
        alt_text: str_field(raw, "alt").unwrap_or_else(|| query.to_string()),
        width: dimension(raw, "width"),
        height: dimension(raw, "height"),
        provider: ImageProviderKind::Pexels.as_str().to_string(),
        provider_id: id_field(raw),
        search_query: Some(query.to_string()),
    })
}

fn parse_unsplash_photo(raw: &Value, query: &str) -> Option<Image> {
    let urls = raw.get("urls");
    let medium_url = urls.and_then(|u| str_field(u, "small"));
    let url = urls
        .and_then(|u| str_field(u, "regular"))
        .or_else(|| medium_url.clone())
        .or_else(|| urls.and_then(|u| str_field(u, "thumb")))?;
    let user = raw.get("user");

    Some(Image {
        url,
        medium_url,
        photographer: user
            .and_then(|u| str_field(u, "name"))
            .unwrap_or_else(|| "Unknown".to_string()),
        photographer_url: user
            .and_then(|u| u.get("links"))
            .and_then(|links| str_field(links, "html")),
        source_url: raw
            .get("links")
            .and_then(|links| str_field(links, "html"))
            .unwrap_or_default(),
        alt_text: str_field(raw, "alt_description")
            .or_else(|| str_field(raw, "description"))
            .unwrap_or_else(|| "Image".to_string()),
        width: dimension(raw, "width"),
        height: dimension(raw, "height"),
        provider: ImageProviderKind::Unsplash.as_str().to_string(),
        provider_id: id_field(raw),
        search_query: Some(query.to_string()),
    })
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn dimension(value: &Value, key: &str) -> u32 {
    value
        .get(key)
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0)
}

fn id_field(value: &Value) -> String {
    match value.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => String::new(),
    }
}

/// Markdown attribution line for an image, e.g. `Photo by [Jane](...) on [Pexels](...)`.
pub fn attribution_text(image: &Image) -> String {
    let provider = ImageProviderKind::parse(&image.provider);
    let provider_name = provider
        .map(ImageProviderKind::display_name)
        .unwrap_or(image.provider.as_str());

    match provider {
        Some(kind) if !image.source_url.is_empty() => format!(
            "Photo by [{}]({}) on [{}]({})",
            image.photographer,
            image.source_url,
            kind.display_name(),
            kind.home_url()
        ),
        _ => format!("Photo by {} on {}", image.photographer, provider_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pexels_photos_are_normalized() {
        let data = json!({
            "photos": [
                {
                    "id": 1234,
                    "width": 4000,
                    "height": 3000,
                    "url": "https://www.pexels.com/photo/1234/",
                    "photographer": "Jane Doe",
                    "photographer_url": "https://www.pexels.com/@jane",
                    "alt": "Wind turbines at sunset",
                    "src": { "large": "https://images.pexels.com/1234-large.jpg", "medium": "https://images.pexels.com/1234-medium.jpg" }
                },
                { "id": 99, "src": {} }
            ]
        });

        let images = parse_images(ImageProviderKind::Pexels, &data, "wind power");
        assert_eq!(images.len(), 1);
        let image = &images[0];
        assert_eq!(image.provider_id, "1234");
        assert_eq!(image.url, "https://images.pexels.com/1234-large.jpg");
        assert_eq!(image.medium_url.as_deref(), Some("https://images.pexels.com/1234-medium.jpg"));
        assert_eq!(image.alt_text, "Wind turbines at sunset");
        assert_eq!(image.width, 4000);
        assert_eq!(image.search_query.as_deref(), Some("wind power"));
    }

    #[test]
    fn unsplash_photos_fall_back_to_description() {
        let data = json!({
            "results": [{
                "id": "abc",
                "description": "Solar panels",
                "urls": { "regular": "https://images.unsplash.com/abc" },
                "links": { "html": "https://unsplash.com/photos/abc" },
                "user": { "name": "Sam", "links": { "html": "https://unsplash.com/@sam" } }
            }]
        });

        let images = parse_images(ImageProviderKind::Unsplash, &data, "solar");
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].alt_text, "Solar panels");
        assert_eq!(images[0].photographer, "Sam");
        assert_eq!(images[0].photographer_url.as_deref(), Some("https://unsplash.com/@sam"));
        assert_eq!(images[0].provider, "unsplash");
    }

    #[test]
    fn attribution_links_photographer_and_provider() {
        let data = json!({
            "photos": [{
                "id": 1,
                "url": "https://www.pexels.com/photo/1/",
                "photographer": "Jane Doe",
                "src": { "large": "https://images.pexels.com/1.jpg" }
            }]
        });
        let mut image = parse_images(ImageProviderKind::Pexels, &data, "q").remove(0);

        assert_eq!(
            attribution_text(&image),
            "Photo by [Jane Doe](https://www.pexels.com/photo/1/) on [Pexels](https://www.pexels.com/)"
        );

        image.source_url.clear();
        assert_eq!(attribution_text(&image), "Photo by Jane Doe on Pexels");
    }
}
