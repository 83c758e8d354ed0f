// SPDX-License-Identifier: Apache-2.0

use crate::fishing_rights::FishingRights;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const UNKNOWN_TEXT: &str = "不明";
pub const UNKNOWN_EXPLANATION: &str = "規制情報を確認できませんでした。";
const FALLBACK_GENERATOR: &str = "fallback";

/// Whether a species may be caught and kept in a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "String")]
pub enum LegalStatus {
    Ok,
    Restricted,
    Prohibited,
    #[default]
    Unknown,
}

impl LegalStatus {
    /// Case-insensitive; anything unrecognized is `Unknown`.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        match input.trim().to_ascii_uppercase().as_str() {
            "OK" => Self::Ok,
            "RESTRICTED" => Self::Restricted,
            "PROHIBITED" => Self::Prohibited,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Restricted => "RESTRICTED",
            Self::Prohibited => "PROHIBITED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl From<String> for LegalStatus {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Confidence {
    High,
    Medium,
    Low,
    #[default]
    Unknown,
}

impl Confidence {
    #[must_use]
    pub fn parse(input: &str) -> Self {
        match input.trim().to_ascii_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => Self::Unknown,
        }
    }
}

impl From<String> for Confidence {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

/// Request-side facts stamped onto every record the generator produces.
#[derive(Debug, Clone, Copy)]
pub struct RecordContext<'a> {
    pub species: &'a str,
    pub region: &'a str,
    pub locality: Option<&'a str>,
    pub generated_by: &'a str,
    pub generated_at: &'a str,
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// Legal and biological information about one species in one region.
///
/// Field names follow the JSON schema the text generator is asked to fill,
/// so a cached record serializes back exactly as it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegulationRecord {
    pub fish_name_ja: String,
    #[serde(default)]
    pub fish_name_en: Option<String>,
    #[serde(default)]
    pub scientific_name: Option<String>,

    #[serde(default)]
    pub is_legal: Option<bool>,
    #[serde(default)]
    pub can_take_home: Option<bool>,
    #[serde(default)]
    pub status: LegalStatus,
    pub legal_explanation: String,

    #[serde(default)]
    pub min_size: Option<f64>,
    #[serde(default)]
    pub max_size: Option<f64>,
    #[serde(default)]
    pub daily_limit: Option<u32>,
    #[serde(default)]
    pub seasonal_ban: Vec<String>,
    #[serde(default)]
    pub banned_months: Vec<u8>,

    #[serde(default)]
    pub is_edible: Option<bool>,
    #[serde(default)]
    pub edibility_notes: Option<String>,
    #[serde(default)]
    pub toxic_parts: Vec<String>,
    #[serde(default)]
    pub preparation_warnings: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub season: Vec<String>,
    #[serde(default)]
    pub peak_season: Option<String>,
    #[serde(default)]
    pub habitat: Option<String>,
    #[serde(default)]
    pub average_size: Option<String>,
    #[serde(default)]
    pub cooking_methods: Vec<String>,
    #[serde(default)]
    pub taste: Option<String>,
    #[serde(default)]
    pub nutrition: Option<String>,

    #[serde(default)]
    pub regulation_source: Option<String>,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub fishing_rights: Option<FishingRights>,

    pub prefecture: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub fish_identified: Option<String>,
    pub generated_by: String,
    pub generated_at: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl RegulationRecord {
    /// Safe record returned when the text generator could not be used.
    ///
    /// Never claims legality: status is `UNKNOWN`, both legality flags are
    /// false and the explanation sends the user to local authorities.
    #[must_use]
    pub fn fallback(ctx: RecordContext<'_>, error_message: impl Into<String>) -> Self {
        let unknown = || Some(UNKNOWN_TEXT.to_string());
        Self {
            fish_name_ja: ctx.species.to_string(),
            fish_name_en: Some(ctx.species.to_string()),
            scientific_name: unknown(),
            is_legal: Some(false),
            can_take_home: Some(false),
            status: LegalStatus::Unknown,
            legal_explanation: format!(
                "{}でのこの魚の規制情報を取得できませんでした。現地の漁業協同組合または水産課にお問い合わせください。",
                ctx.region
            ),
            min_size: Some(0.0),
            max_size: None,
            daily_limit: None,
            seasonal_ban: Vec::new(),
            banned_months: Vec::new(),
            is_edible: None,
            edibility_notes: Some("食用可能かどうか不明です。専門家に確認してください。".to_string()),
            toxic_parts: Vec::new(),
            preparation_warnings: unknown(),
            description: Some("魚の詳細情報を取得できませんでした。".to_string()),
            season: Vec::new(),
            peak_season: unknown(),
            habitat: unknown(),
            average_size: unknown(),
            cooking_methods: Vec::new(),
            taste: unknown(),
            nutrition: unknown(),
            regulation_source: Some("取得失敗".to_string()),
            confidence: Confidence::Low,
            source_url: None,
            fishing_rights: None,
            prefecture: ctx.region.to_string(),
            city: ctx.locality.map(str::to_string),
            fish_identified: Some(ctx.species.to_string()),
            generated_by: FALLBACK_GENERATOR.to_string(),
            generated_at: ctx.generated_at.to_string(),
            error: true,
            error_message: Some(error_message.into()),
        }
    }

    /// Builds a record from a parsed generator reply.
    ///
    /// This is the only place defaults are applied: a missing species name,
    /// status or explanation is backfilled, and every other field is read
    /// leniently (wrongly typed values become absent rather than failing).
    #[must_use]
    pub fn from_reply(reply: &Map<String, Value>, ctx: RecordContext<'_>) -> Self {
        Self {
            fish_name_ja: str_field(reply, "fishNameJa").unwrap_or_else(|| ctx.species.to_string()),
            fish_name_en: str_field(reply, "fishNameEn"),
            scientific_name: str_field(reply, "scientificName"),
            is_legal: bool_field(reply, "isLegal"),
            can_take_home: bool_field(reply, "canTakeHome"),
            status: reply
                .get("status")
                .and_then(Value::as_str)
                .map(LegalStatus::parse)
                .unwrap_or_default(),
            legal_explanation: str_field(reply, "legalExplanation")
                .unwrap_or_else(|| UNKNOWN_EXPLANATION.to_string()),
            min_size: f64_field(reply, "minSize"),
            max_size: f64_field(reply, "maxSize"),
            daily_limit: u32_field(reply, "dailyLimit"),
            seasonal_ban: str_list(reply, "seasonalBan"),
            banned_months: month_list(reply, "bannedMonths"),
            is_edible: bool_field(reply, "isEdible"),
            edibility_notes: str_field(reply, "edibilityNotes"),
            toxic_parts: str_list(reply, "toxicParts"),
            preparation_warnings: str_field(reply, "preparationWarnings"),
            description: str_field(reply, "description"),
            season: str_list(reply, "season"),
            peak_season: str_field(reply, "peakSeason"),
            habitat: str_field(reply, "habitat"),
            average_size: str_field(reply, "averageSize"),
            cooking_methods: str_list(reply, "cookingMethods"),
            taste: str_field(reply, "taste"),
            nutrition: str_field(reply, "nutrition"),
            regulation_source: str_field(reply, "regulationSource"),
            confidence: reply
                .get("confidence")
                .and_then(Value::as_str)
                .map(Confidence::parse)
                .unwrap_or_default(),
            source_url: str_field(reply, "sourceUrl"),
            fishing_rights: reply
                .get("fishingRights")
                .and_then(|v| serde_json::from_value(v.clone()).ok()),
            prefecture: ctx.region.to_string(),
            city: ctx.locality.map(str::to_string),
            fish_identified: Some(ctx.species.to_string()),
            generated_by: ctx.generated_by.to_string(),
            generated_at: ctx.generated_at.to_string(),
            error: false,
            error_message: None,
        }
    }

    /// Replaces whatever the generator said about fishing rights with looked-up data.
    pub fn apply_fishing_rights(&mut self, rights: &FishingRights) {
        self.fishing_rights = Some(rights.clone());
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.error
    }
}

fn str_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn bool_field(map: &Map<String, Value>, key: &str) -> Option<bool> {
    match map.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn f64_field(map: &Map<String, Value>, key: &str) -> Option<f64> {
    match map.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

fn u32_field(map: &Map<String, Value>, key: &str) -> Option<u32> {
    let v = f64_field(map, key)?;
    if v < 0.0 || v.fract() != 0.0 || v > f64::from(u32::MAX) {
        return None;
    }
    Some(v as u32)
}

fn str_list(map: &Map<String, Value>, key: &str) -> Vec<String> {
    match map.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

fn month_list(map: &Map<String, Value>, key: &str) -> Vec<u8> {
    let Some(Value::Array(items)) = map.get(key) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|v| match v {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().trim_end_matches('月').parse::<u64>().ok(),
            _ => None,
        })
        .filter(|m| (1..=12).contains(m))
        .map(|m| m as u8)
        .collect()
}
