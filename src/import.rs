//! Bulk import of tasks from a study plan document.
//!
//! The document is sent, as a base64 data URI, to a generative model that is
//! asked for a JSON list of `{ taskName, deadline }` objects. The extraction
//! step sits behind [`PlanExtractor`] so the rest of the flow can run
//! without network access.

use std::path::Path;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, NaiveDate, Utc};
use log::{error, info, warn};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::AiConfig;
use crate::error::ImportError;
use crate::model::{start_of_local_day, NewTask};

/// Pasted text shorter than this is rejected.
const MIN_TEXT_LEN: usize = 10;

/// Where the study plan comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportSource {
    File { data_uri: String },
    Text { content: String },
}

impl ImportSource {
    /// Read a PDF or text file into a data URI source.
    pub fn from_path(path: &Path) -> Result<Self, ImportError> {
        let bytes = std::fs::read(path)?;
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        Ok(ImportSource::File {
            data_uri: data_uri(mime.essence_str(), &bytes),
        })
    }

    /// Turn the source into the data URI sent to the model.
    pub fn into_data_uri(self) -> Result<String, ImportError> {
        match self {
            ImportSource::File { data_uri } => {
                if !data_uri.starts_with("data:") {
                    return Err(ImportError::InvalidInput(
                        "file source is not a data URI".to_string(),
                    ));
                }
                Ok(data_uri)
            }
            ImportSource::Text { content } => {
                if content.trim().is_empty() {
                    return Err(ImportError::NoContent);
                }
                if content.chars().count() < MIN_TEXT_LEN {
                    return Err(ImportError::InvalidInput(format!(
                        "text must be at least {} characters",
                        MIN_TEXT_LEN
                    )));
                }
                Ok(data_uri("text/plain", content.as_bytes()))
            }
        }
    }
}

fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Split `data:<mime>;base64,<payload>` into its MIME type and payload.
pub fn split_data_uri(data_uri: &str) -> Option<(&str, &str)> {
    let rest = data_uri.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    Some((mime, payload))
}

/// A task as returned by the model. The deadline is free text until it is
/// parsed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedTask {
    pub task_name: String,
    pub deadline: String,
}

#[derive(Debug, Deserialize)]
struct ExtractedPlan {
    tasks: Vec<ExtractedTask>,
}

/// Something able to read tasks out of a study plan document.
pub trait PlanExtractor {
    fn extract(
        &self,
        data_uri: &str,
        current_year: i32,
    ) -> Result<Vec<ExtractedTask>, ImportError>;
}

pub fn build_prompt(current_year: i32) -> String {
    format!(
        "You are an AI assistant specialized in extracting study tasks and deadlines from study plans.\n\
         \n\
         You will receive a study plan document as input. Your goal is to identify all study tasks and their associated deadlines.\n\
         \n\
         The current year is {year}. When parsing dates like \"July 26\", assume it's for the current year.\n\
         \n\
         Output a JSON array of tasks, where each task object has a 'taskName' and a 'deadline' (ISO format e.g., YYYY-MM-DDTHH:mm:ss.sssZ) field.\n\
         \n\
         Study Plan Document:",
        year = current_year
    )
}

/// Extraction through the Gemini `generateContent` REST endpoint.
pub struct GeminiExtractor {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiExtractor {
    /// Build an extractor from the configuration, reading the API key from
    /// the configured environment variable.
    pub fn from_config(config: &AiConfig) -> Result<Self, ImportError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ImportError::MissingApiKey(config.api_key_env.clone()))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(GeminiExtractor {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn request_body(data_uri: &str, current_year: i32) -> Result<Value, ImportError> {
        let (mime, payload) = split_data_uri(data_uri).ok_or_else(|| {
            ImportError::InvalidInput("document is not a base64 data URI".to_string())
        })?;
        Ok(json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": build_prompt(current_year) },
                    { "inline_data": { "mime_type": mime, "data": payload } }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "tasks": {
                            "type": "ARRAY",
                            "description": "A list of tasks extracted from the study plan, with their deadlines.",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "taskName": { "type": "STRING", "description": "The name of the task." },
                                    "deadline": { "type": "STRING", "description": "The deadline for the task (ISO format)." }
                                },
                                "required": ["taskName", "deadline"]
                            }
                        }
                    },
                    "required": ["tasks"]
                }
            },
            "safetySettings": [
                { "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": "BLOCK_ONLY_HIGH" },
                { "category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_MEDIUM_AND_ABOVE" },
                { "category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": "BLOCK_LOW_AND_ABOVE" }
            ]
        }))
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Pull the JSON plan out of a `generateContent` response.
fn parse_response(response: GenerateResponse) -> Result<Vec<ExtractedTask>, ImportError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
        .ok_or_else(|| ImportError::Response("no candidate in the response".to_string()))?;
    let plan: ExtractedPlan =
        serde_json::from_str(&text).map_err(|err| ImportError::Response(err.to_string()))?;
    Ok(plan.tasks)
}

impl PlanExtractor for GeminiExtractor {
    fn extract(
        &self,
        data_uri: &str,
        current_year: i32,
    ) -> Result<Vec<ExtractedTask>, ImportError> {
        let body = GeminiExtractor::request_body(data_uri, current_year)?;
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()?;

        if !response.status().is_success() {
            return Err(ImportError::Request(format!(
                "generateContent failed: HTTP {}",
                response.status()
            )));
        }
        parse_response(response.json()?)
    }
}

/// Parse a deadline given by the model: RFC 3339, or a bare date taken as
/// local midnight.
pub fn parse_deadline(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(deadline) = DateTime::parse_from_rfc3339(raw) {
        return Some(deadline.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(start_of_local_day)
}

/// Run the import flow and return the tasks to add. Extraction failures are
/// logged and reported with a single user facing message.
pub fn handle_import(
    extractor: &dyn PlanExtractor,
    source: ImportSource,
    current_year: i32,
) -> Result<Vec<NewTask>, ImportError> {
    let data_uri = source.into_data_uri().map_err(|err| {
        warn!("event=import_rejected reason={:?}", err);
        err
    })?;

    let extracted = extractor.extract(&data_uri, current_year).map_err(|err| {
        error!("event=import_failed error={}", err);
        ImportError::ParseFailed
    })?;

    let mut tasks = Vec::with_capacity(extracted.len());
    for item in extracted {
        if item.task_name.trim().is_empty() {
            warn!("event=import_skipped reason=empty_name");
            continue;
        }
        match parse_deadline(&item.deadline) {
            Some(deadline) => tasks.push(NewTask::new(item.task_name.trim(), deadline)),
            None => warn!(
                "event=import_skipped reason=bad_deadline deadline={:?}",
                item.deadline
            ),
        }
    }
    info!("event=import_extracted count={}", tasks.len());
    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::date;
    use std::cell::RefCell;

    struct FakeExtractor {
        result: Result<Vec<ExtractedTask>, String>,
        seen: RefCell<Vec<(String, i32)>>,
    }

    impl FakeExtractor {
        fn returning(tasks: Vec<(&str, &str)>) -> Self {
            FakeExtractor {
                result: Ok(tasks
                    .into_iter()
                    .map(|(name, deadline)| ExtractedTask {
                        task_name: name.to_string(),
                        deadline: deadline.to_string(),
                    })
                    .collect()),
                seen: RefCell::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            FakeExtractor {
                result: Err("boom".to_string()),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl PlanExtractor for FakeExtractor {
        fn extract(
            &self,
            data_uri: &str,
            current_year: i32,
        ) -> Result<Vec<ExtractedTask>, ImportError> {
            self.seen.borrow_mut().push((data_uri.to_string(), current_year));
            self.result.clone().map_err(ImportError::Request)
        }
    }

    #[test]
    fn text_becomes_a_plain_text_data_uri() {
        let source = ImportSource::Text {
            content: "Week 1: read chapter 1".to_string(),
        };
        let uri = source.into_data_uri().unwrap();
        let (mime, payload) = split_data_uri(&uri).unwrap();
        assert_eq!(mime, "text/plain");
        assert_eq!(STANDARD.decode(payload).unwrap(), b"Week 1: read chapter 1");
    }

    #[test]
    fn short_text_and_bad_uris_are_invalid_input() {
        let short = ImportSource::Text {
            content: "too short".to_string(),
        };
        let err = short.into_data_uri().unwrap_err();
        assert!(matches!(err, ImportError::InvalidInput(_)));
        assert_eq!(err.to_string(), "Invalid input.");

        let not_uri = ImportSource::File {
            data_uri: "file:///plan.pdf".to_string(),
        };
        assert!(matches!(not_uri.into_data_uri(), Err(ImportError::InvalidInput(_))));
    }

    #[test]
    fn blank_text_is_no_content_and_never_extracted() {
        for blank in ["   ", " \n\t \n   \n  \t "] {
            let extractor = FakeExtractor::returning(vec![("Essay", "2024-07-26")]);
            let source = ImportSource::Text {
                content: blank.to_string(),
            };
            let err = handle_import(&extractor, source, 2024).unwrap_err();
            assert!(matches!(err, ImportError::NoContent));
            assert_eq!(err.to_string(), "No content provided.");
            assert!(extractor.seen.borrow().is_empty());
        }
    }

    #[test]
    fn files_are_read_with_their_mime_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.txt");
        std::fs::write(&path, "Essay due 2024-07-26").unwrap();
        let uri = ImportSource::from_path(&path).unwrap().into_data_uri().unwrap();
        assert!(uri.starts_with("data:text/plain;base64,"));

        let missing = ImportSource::from_path(&dir.path().join("absent.pdf"));
        assert_eq!(missing.unwrap_err().to_string(), "Failed to read file.");
    }

    #[test]
    fn deadlines_accept_rfc3339_and_bare_dates() {
        assert_eq!(
            parse_deadline("2024-07-26T10:00:00.000Z"),
            Some(DateTime::parse_from_rfc3339("2024-07-26T10:00:00Z").unwrap().with_timezone(&Utc))
        );
        assert_eq!(
            parse_deadline("2024-07-26"),
            Some(start_of_local_day(date(2024, 7, 26)))
        );
        assert_eq!(parse_deadline("next tuesday"), None);
    }

    #[test]
    fn import_keeps_valid_tasks_and_passes_the_year() {
        let extractor = FakeExtractor::returning(vec![
            ("Read chapter 1", "2024-07-26T00:00:00.000Z"),
            ("   ", "2024-07-27T00:00:00.000Z"),
            ("Mock exam", "someday"),
            ("Essay", "2024-08-01"),
        ]);
        let tasks = handle_import(
            &extractor,
            ImportSource::Text {
                content: "Read chapter 1 by July 26".to_string(),
            },
            2024,
        )
        .unwrap();

        let names: Vec<_> = tasks.iter().map(|t| t.task_name.as_str()).collect();
        assert_eq!(names, vec!["Read chapter 1", "Essay"]);
        let seen = extractor.seen.borrow();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].0.starts_with("data:text/plain;base64,"));
        assert_eq!(seen[0].1, 2024);
    }

    #[test]
    fn extractor_failures_collapse_into_one_message() {
        let err = handle_import(
            &FakeExtractor::failing(),
            ImportSource::Text {
                content: "a long enough study plan".to_string(),
            },
            2024,
        )
        .unwrap_err();
        assert!(matches!(err, ImportError::ParseFailed));
        assert_eq!(
            err.to_string(),
            "Failed to parse the study plan. Please check the format and try again."
        );
    }

    #[test]
    fn invalid_input_never_reaches_the_extractor() {
        let extractor = FakeExtractor::returning(vec![]);
        let result = handle_import(
            &extractor,
            ImportSource::Text {
                content: "short".to_string(),
            },
            2024,
        );
        assert!(matches!(result, Err(ImportError::InvalidInput(_))));
        assert!(extractor.seen.borrow().is_empty());
    }

    #[test]
    fn request_carries_prompt_document_and_schema() {
        let uri = data_uri("application/pdf", b"%PDF-1.4");
        let body = GeminiExtractor::request_body(&uri, 2025).unwrap();
        let parts = &body["contents"][0]["parts"];
        assert!(parts[0]["text"].as_str().unwrap().contains("The current year is 2025."));
        assert_eq!(parts[1]["inline_data"]["mime_type"], "application/pdf");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["safetySettings"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn response_text_is_parsed_as_a_plan() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "{\"tasks\": [{\"taskName\": \"Quiz\"," },
                    { "text": " \"deadline\": \"2024-07-26T00:00:00.000Z\"}]}" }
                ]}
            }]
        }))
        .unwrap();
        let tasks = parse_response(response).unwrap();
        assert_eq!(tasks[0].task_name, "Quiz");

        let empty: GenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(parse_response(empty), Err(ImportError::Response(_))));
    }
}
