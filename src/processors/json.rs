//! Structure-preserving JSON translation

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::config::TranslatorConfig;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{JsonTranslationRequest, TranslationRequest};
use crate::core::provider::TranslationProvider;

/// Translates the string leaves of a JSON value, leaving its shape untouched
#[derive(Clone)]
pub struct JsonProcessor {
    provider: Arc<dyn TranslationProvider>,
    max_depth: usize,
    max_concurrent: usize,
}

impl JsonProcessor {
    /// Create a processor using the limits from `config`
    pub fn new(provider: Arc<dyn TranslationProvider>, config: &TranslatorConfig) -> Self {
        Self::with_limits(provider, config.max_depth, config.max_concurrent)
    }

    /// Create a processor with explicit nesting and concurrency limits
    pub fn with_limits(
        provider: Arc<dyn TranslationProvider>,
        max_depth: usize,
        max_concurrent: usize,
    ) -> Self {
        Self {
            provider,
            max_depth,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Parse a JSON document, rejecting nesting beyond this processor's depth limit
    pub fn parse(&self, bytes: &[u8], context: &str) -> Result<Value> {
        parse_json(bytes, self.max_depth, context)
    }

    /// Translate the value of a [`JsonTranslationRequest`]
    pub async fn translate_request(&self, request: JsonTranslationRequest) -> Result<Value> {
        self.translate(
            request.value,
            &request.target_lang,
            request.source_lang.as_deref(),
        )
        .await
    }

    /// Translate every non-blank string leaf of `value`.
    ///
    /// Objects keep their keys and key order, arrays their length and order,
    /// and numbers, booleans, null and blank strings are returned as-is. The
    /// first provider failure aborts the whole translation.
    pub async fn translate(
        &self,
        mut value: Value,
        target_lang: &str,
        source_lang: Option<&str>,
    ) -> Result<Value> {
        {
            let slots = collect_string_leaves(&mut value, self.max_depth)?;
            if !slots.is_empty() {
                info!("Translating {} JSON values to {}", slots.len(), target_lang);
            }

            let texts: Vec<String> = slots.iter().map(|slot| slot.to_string()).collect();
            let translated = self.translate_all(texts, target_lang, source_lang).await?;

            for (slot, text) in slots.into_iter().zip(translated) {
                *slot = text;
            }
        }

        Ok(value)
    }

    /// Translate texts with at most `max_concurrent` calls in flight, keeping input order
    async fn translate_all(
        &self,
        texts: Vec<String>,
        target_lang: &str,
        source_lang: Option<&str>,
    ) -> Result<Vec<String>> {
        let provider = &self.provider;

        stream::iter(texts.into_iter().map(|text| {
            let request = TranslationRequest::new(text, target_lang).with_source_lang(source_lang);
            async move { provider.translate_text(&request).await }
        }))
        .buffered(self.max_concurrent)
        .try_collect()
        .await
    }

    /// Find JSON files in directory
    pub fn find_files(&self, dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(TranslationError::validation(format!(
                "Not a directory: {}",
                dir.display()
            )));
        }

        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(dir)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && is_json_file(path) {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        Ok(files)
    }

    /// Translate a single JSON file and write the result to `output`
    pub async fn translate_file(
        &self,
        input: &Path,
        output: &Path,
        target_lang: &str,
        source_lang: Option<&str>,
    ) -> Result<()> {
        debug!("Translating: {}", input.display());

        let content = tokio::fs::read(input).await?;
        let value = self.parse(&content, "Invalid JSON file")?;

        let translated = self.translate(value, target_lang, source_lang).await?;

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut rendered = serde_json::to_vec_pretty(&translated)?;
        rendered.push(b'\n');
        tokio::fs::write(output, rendered).await?;

        info!("Translated {} -> {}", input.display(), output.display());
        Ok(())
    }
}

fn is_json_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

fn depth_error(max_depth: usize) -> TranslationError {
    TranslationError::validation(format!(
        "JSON nesting exceeds maximum depth of {}",
        max_depth
    ))
}

/// Parse `bytes` as JSON with nesting bounded by `max_depth` instead of the
/// parser's built-in recursion limit. Syntax errors are reported as
/// `"<context>: <error>"`.
pub fn parse_json(bytes: &[u8], max_depth: usize, context: &str) -> Result<Value> {
    // a leaf at depth `max_depth` sits inside `max_depth` containers; an empty
    // container at that depth adds one more level
    if nesting_exceeds(bytes, max_depth.saturating_add(1)) {
        return Err(depth_error(max_depth));
    }

    let mut json = serde_json::Deserializer::from_slice(bytes);
    json.disable_recursion_limit();
    let value = Value::deserialize(serde_stacker::Deserializer::new(&mut json))
        .and_then(|value| json.end().map(|_| value))
        .map_err(|e| TranslationError::validation(format!("{}: {}", context, e)))?;

    Ok(value)
}

/// Whether bracket nesting in raw JSON goes deeper than `limit`, ignoring
/// brackets inside strings
fn nesting_exceeds(bytes: &[u8], limit: usize) -> bool {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for &byte in bytes {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'[' | b'{' => {
                depth += 1;
                if depth > limit {
                    return true;
                }
            }
            b']' | b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }

    false
}

/// Collect mutable references to every non-blank string leaf, in document order.
///
/// Traversal uses an explicit stack so nesting depth is bounded by `max_depth`
/// rather than by the call stack.
fn collect_string_leaves(value: &mut Value, max_depth: usize) -> Result<Vec<&mut String>> {
    let mut leaves = Vec::new();
    let mut stack = vec![(value, 0usize)];

    while let Some((node, depth)) = stack.pop() {
        if depth > max_depth {
            return Err(depth_error(max_depth));
        }

        match node {
            Value::Object(map) => {
                for child in map.values_mut().rev() {
                    stack.push((child, depth + 1));
                }
            }
            Value::Array(items) => {
                for child in items.iter_mut().rev() {
                    stack.push((child, depth + 1));
                }
            }
            Value::String(text) => {
                if !text.trim().is_empty() {
                    leaves.push(text);
                }
            }
            Value::Number(_) | Value::Bool(_) | Value::Null => {}
        }
    }

    Ok(leaves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ErrorKind;
    use crate::core::models::{DocumentUpload, UsageInfo};
    use assert_json_diff::assert_json_eq;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Uppercases input; optionally fails on one word
    #[derive(Default)]
    struct UppercaseProvider {
        calls: AtomicUsize,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl TranslationProvider for UppercaseProvider {
        async fn translate_text(&self, request: &TranslationRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // shorter strings finish later, so completion order differs from input order
            tokio::time::sleep(Duration::from_millis(20u64.saturating_sub(request.text.len() as u64))).await;
            if self.fail_on == Some(request.text.as_str()) {
                return Err(TranslationError::provider(Some(456), "Quota exceeded"));
            }
            Ok(request.text.to_uppercase())
        }

        async fn translate_document(
            &self,
            document: DocumentUpload,
            _target_lang: &str,
            _source_lang: Option<&str>,
        ) -> Result<Vec<u8>> {
            Ok(document.bytes)
        }

        async fn get_usage(&self) -> Result<UsageInfo> {
            Ok(UsageInfo::default())
        }
    }

    fn processor(provider: Arc<UppercaseProvider>, max_concurrent: usize) -> JsonProcessor {
        JsonProcessor::with_limits(provider, 1000, max_concurrent)
    }

    #[tokio::test]
    async fn test_translates_leaves_and_keeps_shape() {
        let provider = Arc::new(UppercaseProvider::default());
        let input = json!({"a": "Hello", "b": {"c": "World"}, "d": ["x", ""]});

        let output = processor(provider.clone(), 1)
            .translate(input, "DE", None)
            .await
            .unwrap();

        assert_json_eq!(output, json!({"a": "HELLO", "b": {"c": "WORLD"}, "d": ["X", ""]}));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_scalars_and_blank_strings_pass_through() {
        let provider = Arc::new(UppercaseProvider::default());
        let processor = processor(provider.clone(), 4);

        for value in [json!(42), json!(-1.5), json!(true), json!(null), json!(""), json!("  \n\t")] {
            let output = processor.translate(value.clone(), "DE", None).await.unwrap();
            assert_eq!(output, value);
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_key_order_preserved() {
        let provider = Arc::new(UppercaseProvider::default());
        let input = json!({"zeta": "z", "alpha": 1, "mid": ["m", null, false]});

        let output = processor(provider, 8).translate(input, "FR", Some("EN")).await.unwrap();

        let keys: Vec<&str> = output.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(output["mid"], json!(["M", null, false]));
    }

    #[tokio::test]
    async fn test_concurrent_results_land_in_place() {
        let provider = Arc::new(UppercaseProvider::default());
        let input = json!(["a", "bbbbbbbbbbbb", "cc", {"k": "dddddd"}, "e"]);

        let output = processor(provider, 5).translate(input, "DE", None).await.unwrap();

        assert_json_eq!(output, json!(["A", "BBBBBBBBBBBB", "CC", {"k": "DDDDDD"}, "E"]));
    }

    #[tokio::test]
    async fn test_provider_failure_aborts() {
        let provider = Arc::new(UppercaseProvider {
            fail_on: Some("boom"),
            ..Default::default()
        });
        let input = json!({"ok": "fine", "bad": "boom"});

        let err = processor(provider, 1).translate(input, "DE", None).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Provider);
        assert!(err.to_string().contains("Quota exceeded"));
    }

    #[test]
    fn test_leaves_collected_in_document_order() {
        let mut value = json!({"b": ["one", 2, {"c": "two"}], "a": "three", "e": " "});

        let leaves = collect_string_leaves(&mut value, 10).unwrap();
        let texts: Vec<&str> = leaves.iter().map(|s| s.as_str()).collect();

        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_translate_outside_async_context() {
        let processor = processor(Arc::new(UppercaseProvider::default()), 2);

        let output = tokio_test::block_on(processor.translate(json!({"crop": "rye"}), "DE", None))
            .unwrap();

        assert_eq!(output, json!({"crop": "RYE"}));
    }

    fn nested_array(depth: usize) -> String {
        format!("{}\"deep\"{}", "[".repeat(depth), "]".repeat(depth))
    }

    #[test]
    fn test_parse_allows_nesting_up_to_max_depth() {
        let mut value = parse_json(nested_array(300).as_bytes(), 1000, "Invalid JSON").unwrap();

        let leaves = collect_string_leaves(&mut value, 1000).unwrap();
        assert_eq!(leaves.len(), 1);
    }

    #[test]
    fn test_parse_rejects_nesting_beyond_max_depth() {
        let err = parse_json(nested_array(5000).as_bytes(), 1000, "Invalid JSON").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "JSON nesting exceeds maximum depth of 1000");
    }

    #[test]
    fn test_parse_ignores_brackets_inside_strings() {
        let value = parse_json(br#"{"a": "[[[[\"{{{{"}"#, 2, "Invalid JSON").unwrap();
        assert_eq!(value, json!({"a": "[[[[\"{{{{"}));

        let err = parse_json(b"{\"a\": ", 2, "Invalid JSON file").unwrap_err();
        assert!(err.to_string().starts_with("Invalid JSON file: "));

        let err = parse_json(b"{} trailing", 2, "Invalid JSON").unwrap_err();
        assert!(err.to_string().starts_with("Invalid JSON: "));
    }

    #[tokio::test]
    async fn test_depth_limit() {
        let provider = Arc::new(UppercaseProvider::default());
        let processor = JsonProcessor::with_limits(provider.clone(), 3, 1);

        let at_limit = processor.translate(json!([[["x"]]]), "DE", None).await.unwrap();
        assert_eq!(at_limit, json!([[["X"]]]));

        let err = processor
            .translate(json!([[[["x"]]]]), "DE", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_very_deep_input_is_rejected_before_any_call() {
        let provider = Arc::new(UppercaseProvider::default());
        let mut value = json!("leaf");
        for _ in 0..1500 {
            value = json!({ "n": value });
        }

        let err = processor(provider.clone(), 1)
            .translate(value, "DE", None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_translate_file_and_find_files() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(dir.path().join("labels.json"), r#"{"title": "Farm", "count": 3}"#).unwrap();
        std::fs::write(nested.join("more.JSON"), r#"["crop"]"#).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "skip").unwrap();

        let processor = processor(Arc::new(UppercaseProvider::default()), 2);
        assert_eq!(processor.find_files(dir.path(), false).unwrap().len(), 1);
        assert_eq!(processor.find_files(dir.path(), true).unwrap().len(), 2);

        let output = dir.path().join("out").join("labels.json");
        processor
            .translate_file(&dir.path().join("labels.json"), &output, "DE", None)
            .await
            .unwrap();

        let written: Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_json_eq!(written, json!({"title": "FARM", "count": 3}));
    }

    #[tokio::test]
    async fn test_translate_file_rejects_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("broken.json");
        std::fs::write(&input, "{not json").unwrap();

        let err = processor(Arc::new(UppercaseProvider::default()), 1)
            .translate_file(&input, &dir.path().join("out.json"), "DE", None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().starts_with("Invalid JSON file"));
    }
}
