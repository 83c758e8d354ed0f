// SPDX-License-Identifier: Apache-2.0

use crate::clients::{
    Clock, FishingRightsQuery, FishingRightsService, GenerationRequest, TextGenerationService,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use uo_checker_model::{Coordinates, FishingRights, RecordContext, RegulationRecord};

/// Shape of the JSON object the text generator is asked to return.
const REPLY_SCHEMA: &str = r#"{
  "fishNameJa": "魚の日本語名",
  "fishNameEn": "英語名",
  "scientificName": "学名",
  "isLegal": true,
  "canTakeHome": true,
  "status": "OK | RESTRICTED | PROHIBITED | UNKNOWN",
  "legalExplanation": "持ち帰りの可否とその理由",
  "minSize": 20,
  "maxSize": null,
  "dailyLimit": null,
  "seasonalBan": ["禁漁期間の説明"],
  "bannedMonths": [7, 8],
  "isEdible": true,
  "edibilityNotes": "食用に関する注意",
  "toxicParts": ["有毒部位"],
  "preparationWarnings": "調理時の注意",
  "description": "魚の特徴",
  "season": ["旬の季節"],
  "peakSeason": "最も美味しい時期",
  "habitat": "生息域",
  "averageSize": "平均的な大きさ",
  "cookingMethods": ["刺身", "塩焼き"],
  "taste": "味の特徴",
  "nutrition": "栄養",
  "fishingRights": {
    "hasFisheryRights": false,
    "requiresLicense": false,
    "licenseType": "必要な遊漁券の種類",
    "fishingRightsArea": "漁業権の区域",
    "restrictions": "制限事項",
    "cooperativeInfo": "問い合わせ先の漁協"
  },
  "regulationSource": "根拠となる条例や規則",
  "confidence": "high | medium | low",
  "sourceUrl": "参照したURL"
}"#;

#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub max_tokens: u32,
    pub temperature: f64,
    pub attach_image: bool,
    pub search_radius_m: u32,
    pub deadline: Duration,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.2,
            attach_image: false,
            search_radius_m: 5000,
            deadline: Duration::from_secs(90),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GenerationInput<'a> {
    pub species: &'a str,
    /// Canonical prefecture.
    pub region: &'a str,
    pub locality: Option<&'a str>,
    pub coordinates: Option<Coordinates>,
    pub image: Option<&'a [u8]>,
}

impl GenerationInput<'_> {
    #[must_use]
    pub fn location_label(&self) -> String {
        match self.locality {
            Some(city) => format!("{city}, {}", self.region),
            None => self.region.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("regulation generation exceeded its {}ms deadline", .0.as_millis())]
    DeadlineExceeded(Duration),
}

/// Prompt sent to the text generator.
#[must_use]
pub fn build_prompt(input: &GenerationInput<'_>, rights: Option<&FishingRights>) -> String {
    let location = input.location_label();
    let species = input.species;
    let rights_section = rights
        .map(|r| format!("\n{}\n", r.prompt_context()))
        .unwrap_or_default();
    format!(
        "あなたは日本の釣りと海洋生物の専門家です。{location}で釣れた「{species}」という魚について、\
釣り人が持ち帰ってよいかを判断するための情報をまとめてください。\n\
{rights_section}\n\
次のJSON形式のみで回答してください。説明文やコードブロックは付けないでください。\n\
{REPLY_SCHEMA}\n\n\
重要な指示:\n\
1. {location}の漁業調整規則、都道府県の条例、漁業協同組合の規則に基づいて判断してください。\n\
2. 全長制限、採捕禁止期間、数量制限があれば必ず記載してください。\n\
3. 不確かな場合は statusを\"UNKNOWN\"、confidenceを\"low\"にしてください。\n\
4. 毒のある魚や食用に注意が必要な魚は isEdible と toxicParts に明記してください。\n\
5. 漁業権が設定されている区域では遊漁券の必要性を fishingRights に記載してください。\n\
6. 根拠となる規則名を regulationSource に、参照先があれば sourceUrl に記載してください。\n"
    )
}

/// Removes a surrounding ```json / ``` fence, if any.
#[must_use]
pub fn strip_code_fences(text: &str) -> &str {
    let mut t = text.trim();
    if let Some(rest) = t.strip_prefix("```json") {
        t = rest;
    } else if let Some(rest) = t.strip_prefix("```") {
        t = rest;
    }
    if let Some(rest) = t.strip_suffix("```") {
        t = rest;
    }
    t.trim()
}

fn parse_object(text: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("reply is JSON but not an object".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

/// Parses a generator reply; prose around the object is tolerated by retrying
/// on the outermost `{...}` slice.
pub fn parse_reply(text: &str) -> Result<Map<String, Value>, String> {
    let stripped = strip_code_fences(text);
    match parse_object(stripped) {
        Ok(map) => Ok(map),
        Err(first) => {
            let (Some(start), Some(end)) = (stripped.find('{'), stripped.rfind('}')) else {
                return Err(first);
            };
            if end <= start {
                return Err(first);
            }
            parse_object(&stripped[start..=end]).map_err(|_| first)
        }
    }
}

pub struct RegulationGenerator {
    text: Arc<dyn TextGenerationService>,
    fishing_rights: Option<Arc<dyn FishingRightsService>>,
    clock: Arc<dyn Clock>,
    settings: GeneratorSettings,
}

impl RegulationGenerator {
    pub fn new(
        text: Arc<dyn TextGenerationService>,
        fishing_rights: Option<Arc<dyn FishingRightsService>>,
        clock: Arc<dyn Clock>,
        settings: GeneratorSettings,
    ) -> Self {
        Self {
            text,
            fishing_rights,
            clock,
            settings,
        }
    }

    /// Always yields a record unless the stage deadline elapses; service and
    /// parse failures become the fallback record.
    pub async fn generate(
        &self,
        input: GenerationInput<'_>,
    ) -> Result<RegulationRecord, GenerationError> {
        let deadline = self.settings.deadline;
        tokio::time::timeout(deadline, self.generate_record(input))
            .await
            .map_err(|_| GenerationError::DeadlineExceeded(deadline))
    }

    async fn lookup_rights(&self, input: &GenerationInput<'_>) -> Option<FishingRights> {
        let service = self.fishing_rights.as_ref()?;
        let query = match input.coordinates {
            Some(coordinates) => FishingRightsQuery::Near {
                coordinates,
                radius_m: self.settings.search_radius_m,
            },
            None => FishingRightsQuery::Prefecture(input.region.to_string()),
        };
        match service.lookup(&query).await {
            Ok(features) => {
                info!(features = features.len(), "fishing rights looked up");
                Some(FishingRights::from_features(&features))
            }
            Err(e) => {
                warn!(error = %e, "fishing rights lookup failed");
                None
            }
        }
    }

    async fn generate_record(&self, input: GenerationInput<'_>) -> RegulationRecord {
        let rights = self.lookup_rights(&input).await;
        let request = GenerationRequest {
            prompt: build_prompt(&input, rights.as_ref()),
            image: input
                .image
                .filter(|_| self.settings.attach_image)
                .map(<[u8]>::to_vec),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };
        let started = Instant::now();
        let reply = self.text.generate(&request).await;
        let generated_at = self.clock.now_rfc3339();
        let ctx = RecordContext {
            species: input.species,
            region: input.region,
            locality: input.locality,
            generated_by: self.text.service_tag(),
            generated_at: &generated_at,
        };
        let mut record = match reply {
            Ok(text) => match parse_reply(&text) {
                Ok(map) => RegulationRecord::from_reply(&map, ctx),
                Err(e) => {
                    warn!(error = %e, "generator reply was not a JSON object");
                    RegulationRecord::fallback(ctx, format!("reply parse error: {e}"))
                }
            },
            Err(e) => {
                warn!(service = self.text.service_tag(), error = %e, "text generation failed");
                RegulationRecord::fallback(ctx, e.to_string())
            }
        };
        if let Some(rights) = &rights {
            record.apply_fishing_rights(rights);
        }
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            fallback = record.is_fallback(),
            status = record.status.as_str(),
            "regulation generated"
        );
        record
    }
}
