// SPDX-License-Identifier: Apache-2.0

use super::{http_client, json_body, ClientError, ClientErrorKind};
use crate::config::TranslateConfig;
use async_trait::async_trait;
use reqwest::Url;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Turns an English species term into the Japanese name used downstream.
#[async_trait]
pub trait Translator: Send + Sync + 'static {
    async fn to_japanese(&self, term: &str) -> String;
}

/// Machine translation of a single English term into Japanese.
#[async_trait]
pub trait TranslationService: Send + Sync + 'static {
    fn backend_tag(&self) -> &'static str;

    async fn translate(&self, term: &str) -> Result<String, ClientError>;
}

/// Name used when a term is only known to be some kind of fish.
pub const GENERIC_FISH_JA: &str = "魚";

const GENERIC_FISH: &str = "fish";

/// English term (lowercase) to Japanese common name.
pub const DEFAULT_GLOSSARY: &[(&str, &str)] = &[
    ("mackerel", "サバ"),
    ("horse mackerel", "アジ"),
    ("jack mackerel", "マアジ"),
    ("spanish mackerel", "サワラ"),
    ("tuna", "マグロ"),
    ("salmon", "サケ"),
    ("sardine", "イワシ"),
    ("bass", "スズキ"),
    ("sea bass", "スズキ"),
    ("sea perch", "スズキ"),
    ("black bass", "ブラックバス"),
    ("striped bass", "シマスズキ"),
    ("bream", "タイ"),
    ("sea bream", "マダイ"),
    ("porgy", "タイ"),
    ("flounder", "ヒラメ"),
    ("halibut", "オヒョウ"),
    ("sole", "シタビラメ"),
    ("plaice", "カレイ"),
    ("turbot", "ターボット"),
    ("cod", "タラ"),
    ("trout", "マス"),
    ("snapper", "フエダイ"),
    ("red snapper", "フエダイ"),
    ("yellowtail", "ブリ"),
    ("amberjack", "カンパチ"),
    ("kingfish", "ヒラマサ"),
    ("grouper", "ハタ"),
    ("rockfish", "メバル"),
    ("herring", "ニシン"),
    ("anchovy", "カタクチイワシ"),
    ("bonito", "カツオ"),
    ("skipjack", "カツオ"),
    ("albacore", "ビンナガ"),
    ("swordfish", "メカジキ"),
    ("marlin", "カジキ"),
    ("barracuda", "カマス"),
    ("carp", "コイ"),
    ("catfish", "ナマズ"),
    ("pike", "カワカマス"),
    ("mullet", "ボラ"),
    ("pompano", "コバンアジ"),
    ("mahi mahi", "シイラ"),
    ("dolphinfish", "シイラ"),
    ("wahoo", "カマスサワラ"),
    ("sheepshead", "シープスヘッド"),
    ("monkfish", "アンコウ"),
    ("ray-finned fish", "条鰭類"),
    ("bony fish", "硬骨魚類"),
    ("oily fish", "青魚"),
    // Generic web entities that show up in the fish passes.
    ("pufferfish", "フグ"),
    ("puffer", "フグ"),
    ("blowfish", "フグ"),
    ("lionfish", "ミノカサゴ"),
    ("scorpionfish", "カサゴ"),
    ("stonefish", "オニダルマオコゼ"),
    ("filefish", "カワハギ"),
    ("triggerfish", "モンガラカワハギ"),
    ("flatfish", "カレイ"),
    ("flathead", "コチ"),
    ("rabbitfish", "アイゴ"),
    ("parrotfish", "ブダイ"),
    ("surgeonfish", "ニザダイ"),
    ("damselfish", "スズメダイ"),
    ("sunfish", "マンボウ"),
    ("needlefish", "ダツ"),
    ("sweetfish", "アユ"),
    ("goby", "ハゼ"),
    ("greenling", "アイナメ"),
    ("moray", "ウツボ"),
    ("conger", "アナゴ"),
    ("eel", "ウナギ"),
    ("steelhead", "ニジマス"),
];

/// Dictionary-first translator.
///
/// Lookup order: longest glossary entry contained in the term, then the
/// remote translation service (if any), then [`GENERIC_FISH_JA`] for terms
/// that merely contain "fish", then the trimmed term unchanged.
#[derive(Clone)]
pub struct GlossaryTranslator {
    entries: Vec<(String, String)>,
    remote: Option<Arc<dyn TranslationService>>,
}

impl Default for GlossaryTranslator {
    fn default() -> Self {
        Self::new(DEFAULT_GLOSSARY.iter().copied())
    }
}

impl GlossaryTranslator {
    pub fn new<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut entries: Vec<(String, String)> = entries
            .into_iter()
            .map(|(en, ja)| (en.to_lowercase(), ja.to_string()))
            .collect();
        // Longest first; ties keep insertion order.
        entries.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));
        Self {
            entries,
            remote: None,
        }
    }

    #[must_use]
    pub fn with_remote(mut self, remote: Arc<dyn TranslationService>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Glossary hit for `term`, if any.
    #[must_use]
    pub fn lookup(&self, term: &str) -> Option<&str> {
        let lowered = term.trim().to_lowercase();
        self.entries
            .iter()
            .find(|(en, _)| lowered.contains(en.as_str()))
            .map(|(_, ja)| ja.as_str())
    }

    async fn remote_lookup(&self, term: &str) -> Option<String> {
        let remote = self.remote.as_ref()?;
        match remote.translate(term).await {
            Ok(ja) => {
                let ja = ja.trim();
                if ja.is_empty() || ja.eq_ignore_ascii_case(term) {
                    debug!(backend = remote.backend_tag(), term, "translation left term unchanged");
                    None
                } else {
                    Some(ja.to_string())
                }
            }
            Err(e) => {
                warn!(backend = remote.backend_tag(), term, error = %e, "term translation failed");
                None
            }
        }
    }
}

#[async_trait]
impl Translator for GlossaryTranslator {
    async fn to_japanese(&self, term: &str) -> String {
        let term = term.trim();
        if let Some(ja) = self.lookup(term) {
            return ja.to_string();
        }
        if let Some(ja) = self.remote_lookup(term).await {
            return ja;
        }
        if term.to_lowercase().contains(GENERIC_FISH) {
            return GENERIC_FISH_JA.to_string();
        }
        term.to_string()
    }
}

/// Cloud Translation v2 (`language/translate/v2`), keyed like the vision client.
pub struct GoogleTranslateClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl GoogleTranslateClient {
    pub fn new(cfg: &TranslateConfig) -> Result<Self, ClientError> {
        let mut endpoint = Url::parse(&cfg.endpoint).map_err(|e| {
            ClientError::new(
                ClientErrorKind::Config,
                format!("invalid translate endpoint: {e}"),
            )
        })?;
        if let Some(key) = &cfg.api_key {
            endpoint.query_pairs_mut().append_pair("key", key);
        }
        Ok(Self {
            client: http_client(cfg.timeout)?,
            endpoint,
        })
    }
}

pub(crate) fn translate_body(term: &str) -> Value {
    json!({ "q": [term], "source": "en", "target": "ja", "format": "text" })
}

pub(crate) fn translated_text(payload: &Value) -> Result<String, ClientError> {
    payload
        .pointer("/data/translations/0/translatedText")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ClientError::new(ClientErrorKind::Decode, "reply has no translatedText"))
}

#[async_trait]
impl TranslationService for GoogleTranslateClient {
    fn backend_tag(&self) -> &'static str {
        "google-translate"
    }

    #[instrument(name = "translate_term", skip_all)]
    async fn translate(&self, term: &str) -> Result<String, ClientError> {
        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(&translate_body(term))
            .send()
            .await?;
        translated_text(&json_body(resp, "translate").await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeTranslation;

    #[tokio::test]
    async fn longest_contained_entry_wins() {
        let t = GlossaryTranslator::default();
        assert_eq!(t.to_japanese("Horse mackerel").await, "アジ");
        assert_eq!(t.to_japanese("Atlantic mackerel").await, "サバ");
        assert_eq!(t.to_japanese("Red Sea Bream").await, "マダイ");
        assert_eq!(t.to_japanese("Japanese Sea Bass").await, "スズキ");
        assert_eq!(t.to_japanese("Tiger pufferfish").await, "フグ");
        assert_eq!(t.to_japanese("Red lionfish").await, "ミノカサゴ");
    }

    #[tokio::test]
    async fn generic_fish_terms_become_japanese() {
        let t = GlossaryTranslator::default();
        assert_eq!(t.to_japanese("Fish").await, GENERIC_FISH_JA);
        assert_eq!(t.to_japanese(" Oarfish ").await, GENERIC_FISH_JA);
        assert_eq!(t.to_japanese("Seaweed").await, "Seaweed");
    }

    #[tokio::test]
    async fn remote_sits_between_glossary_and_generic_fallback() {
        let remote = Arc::new(FakeTranslation::returning("リュウグウノツカイ"));
        let t = GlossaryTranslator::default().with_remote(remote.clone());
        assert_eq!(t.to_japanese("Oarfish").await, "リュウグウノツカイ");
        assert_eq!(t.to_japanese("Mackerel").await, "サバ");
        assert_eq!(remote.call_count(), 1);

        let t = GlossaryTranslator::default().with_remote(Arc::new(FakeTranslation::failing("503")));
        assert_eq!(t.to_japanese("Oarfish").await, GENERIC_FISH_JA);

        let t = GlossaryTranslator::default().with_remote(Arc::new(FakeTranslation::returning("oarfish")));
        assert_eq!(t.to_japanese("Oarfish").await, GENERIC_FISH_JA);
    }

    #[test]
    fn cloud_translation_wire_shape() {
        let body = translate_body("Oarfish");
        assert_eq!(body["q"][0], "Oarfish");
        assert_eq!(body["target"], "ja");
        let reply = json!({"data": {"translations": [{"translatedText": "リュウグウノツカイ"}]}});
        assert_eq!(translated_text(&reply).expect("text"), "リュウグウノツカイ");
        assert_eq!(
            translated_text(&json!({"data": {}})).expect_err("missing").kind,
            ClientErrorKind::Decode
        );

        let client = GoogleTranslateClient::new(&TranslateConfig {
            api_key: Some("k".to_string()),
            ..TranslateConfig::default()
        })
        .expect("client");
        assert_eq!(client.endpoint.query(), Some("key=k"));
    }
}
