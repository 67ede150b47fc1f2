use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::config::AuditConfig;
use crate::domain::models::SeoReport;
use crate::service::http::{create_client, ClientType};

/// AI collaborator that turns a finished report into extra suggestions.
#[async_trait]
pub trait Recommender: Send + Sync {
    async fn recommend(&self, report: &SeoReport) -> Result<Vec<String>>;
}

const PERSONA: &str =
    "You are an expert SEO consultant. Your tone is professional, encouraging, and data-driven.";

const INSTRUCTIONS: &str = "Based on the SEO audit report below, suggest up to 5 specific, \
actionable improvements ranked by impact. Return one recommendation per line, with no \
headings and no extra commentary.";

/// Recommendations via the Gemini `generateContent` endpoint.
pub struct GeminiRecommender {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl GeminiRecommender {
    /// Returns `None` when no Gemini key is configured; the AI stage is then
    /// skipped entirely.
    pub fn from_config(config: &AuditConfig) -> Result<Option<Self>> {
        let Some(api_key) = config.gemini_api_key.clone() else {
            return Ok(None);
        };

        Ok(Some(Self {
            client: create_client(ClientType::Ai, config)?,
            api_key,
            model: config.gemini_model.clone(),
            endpoint: config.gemini_endpoint.trim_end_matches('/').to_string(),
        }))
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let api_url = format!(
            "{}/models/{}:generateContent?key={}",
            self.endpoint, self.model, self.api_key
        );

        let request_body = json!({
            "contents": [{
                "parts": [{
                    "text": prompt
                }]
            }]
        });

        let response = self
            .client
            .post(&api_url)
            .json(&request_body)
            .send()
            .await
            .context("Failed to send request to Gemini API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error {}: {}", status, error_text);
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse Gemini API response")?;

        let text = response_json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .context("Failed to extract text from Gemini response")?
            .to_string();

        Ok(text)
    }
}

#[async_trait]
impl Recommender for GeminiRecommender {
    async fn recommend(&self, report: &SeoReport) -> Result<Vec<String>> {
        log::info!("[AI] Requesting recommendations for {} from {}", report.url, self.model);

        let prompt = build_prompt(report)?;
        let text = self.generate(&prompt).await?;
        let recommendations = parse_recommendations(&text);

        if recommendations.is_empty() {
            anyhow::bail!("Gemini returned no usable recommendations");
        }

        log::debug!("[AI] Parsed {} recommendations", recommendations.len());
        Ok(recommendations)
    }
}

/// Prompt = persona, instructions, then the serialized report.
pub fn build_prompt(report: &SeoReport) -> Result<String> {
    let report_json =
        serde_json::to_string_pretty(report).context("Failed to serialize report for prompt")?;

    Ok(format!(
        "{}\n\n{}\n\nWebsite: {}\nSEO Score: {}/100\n\nAudit report (JSON):\n{}",
        PERSONA, INSTRUCTIONS, report.url, report.seo_score, report_json
    ))
}

/// Split model output into one recommendation per non-blank line, dropping
/// list markers.
pub fn parse_recommendations(text: &str) -> Vec<String> {
    text.lines()
        .map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();

    if let Some(rest) = line
        .strip_prefix('-')
        .or_else(|| line.strip_prefix('*'))
        .or_else(|| line.strip_prefix('•'))
    {
        return rest.trim();
    }

    // "1." / "12)" style numbering
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return rest.trim();
        }
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{PageSignals, PerformanceScores, ScoreSource, TechnicalFlags};
    use chrono::Utc;
    use mockito::Matcher;

    fn report() -> SeoReport {
        SeoReport {
            url: "https://example.com/".into(),
            signals: PageSignals {
                title: "Example Domain".into(),
                ..Default::default()
            },
            technical_flags: TechnicalFlags::default(),
            performance: PerformanceScores::new(Some(80), Some(88), ScoreSource::Estimated),
            seo_score: 42,
            recommendations: vec!["Missing H1 tag.".into()],
            categories: vec![],
            ai_recommendations: None,
            generated_at: Utc::now(),
            duration_ms: 10,
        }
    }

    fn recommender(server: &mockito::Server) -> GeminiRecommender {
        let config = AuditConfig {
            gemini_api_key: Some("test-key".into()),
            gemini_endpoint: server.url(),
            ..AuditConfig::default()
        };
        GeminiRecommender::from_config(&config).unwrap().unwrap()
    }

    fn gemini_body(text: &str) -> String {
        json!({
            "candidates": [{
                "content": { "parts": [{ "text": text }] }
            }]
        })
        .to_string()
    }

    #[test]
    fn test_parse_recommendations_strips_markers_and_blanks() {
        let text = "1. Add an H1\n\n  - Compress images  \n* Write a meta description\n• Add a sitemap\n2) Fix links\nPlain line\n   \n";
        assert_eq!(
            parse_recommendations(text),
            vec![
                "Add an H1",
                "Compress images",
                "Write a meta description",
                "Add a sitemap",
                "Fix links",
                "Plain line",
            ]
        );
    }

    #[test]
    fn test_parse_recommendations_keeps_leading_numbers_without_marker() {
        assert_eq!(
            parse_recommendations("404 pages hurt rankings"),
            vec!["404 pages hurt rankings"]
        );
    }

    #[test]
    fn test_parse_recommendations_empty_text() {
        assert!(parse_recommendations("\n \n\t\n").is_empty());
    }

    #[test]
    fn test_build_prompt_embeds_report() {
        let prompt = build_prompt(&report()).unwrap();
        assert!(prompt.contains("Website: https://example.com/"));
        assert!(prompt.contains("SEO Score: 42/100"));
        assert!(prompt.contains("\"seoScore\": 42"));
        assert!(prompt.contains("Missing H1 tag."));
    }

    #[test]
    fn test_from_config_without_key_is_none() {
        assert!(GeminiRecommender::from_config(&AuditConfig::default())
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_recommend_parses_candidate_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.0-flash:generateContent")
            .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
            .match_body(Matcher::Regex(r#""contents""#.into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(gemini_body("- Add an H1\n- Compress hero image\n"))
            .create_async()
            .await;

        let recs = recommender(&server).recommend(&report()).await.unwrap();

        assert_eq!(recs, vec!["Add an H1", "Compress hero image"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_recommend_error_status_fails() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", Matcher::Any)
            .with_status(429)
            .with_body("quota exceeded")
            .create_async()
            .await;

        let err = recommender(&server).recommend(&report()).await.unwrap_err();
        assert!(err.to_string().contains("429"), "{err}");
    }

    #[tokio::test]
    async fn test_recommend_blank_text_fails() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", Matcher::Any)
            .with_status(200)
            .with_body(gemini_body("\n\n"))
            .create_async()
            .await;

        assert!(recommender(&server).recommend(&report()).await.is_err());
    }

    #[tokio::test]
    async fn test_recommend_unexpected_shape_fails() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", Matcher::Any)
            .with_status(200)
            .with_body(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#)
            .create_async()
            .await;

        assert!(recommender(&server).recommend(&report()).await.is_err());
    }
}
