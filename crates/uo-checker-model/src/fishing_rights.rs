// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

pub const MAX_DETAIL_ROWS: usize = 3;
pub const MAX_LISTED_SPECIES: usize = 5;

const UNKNOWN: &str = "不明";

/// One common-fishery-right entry as reported by the rights lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FishingRightDetail {
    pub right_number: String,
    pub cooperative: String,
    pub species: String,
    pub expiry_date: String,
}

/// Summary of fishing rights around a location, attached to regulation records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FishingRights {
    #[serde(default)]
    pub has_fishery_rights: bool,
    #[serde(default)]
    pub requires_license: bool,
    #[serde(default)]
    pub license_type: String,
    #[serde(default)]
    pub fishing_rights_area: String,
    #[serde(default)]
    pub restrictions: String,
    #[serde(default)]
    pub cooperative_info: String,
    #[serde(default)]
    pub details: Vec<FishingRightDetail>,
}

fn first_text<'a>(props: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| props.get(*k))
        .find(|v| match v {
            Value::String(s) => !s.is_empty(),
            Value::Array(a) => !a.is_empty(),
            Value::Null => false,
            _ => true,
        })
}

fn text_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("、"),
        ),
        other => Some(other.to_string()),
    }
}

impl FishingRights {
    /// Summary used when the lookup succeeded but found nothing.
    #[must_use]
    pub fn none_found() -> Self {
        Self {
            has_fishery_rights: false,
            requires_license: false,
            license_type: "なし".to_string(),
            fishing_rights_area: "自由漁業区域".to_string(),
            restrictions: "特になし".to_string(),
            cooperative_info: "地元漁業協同組合に確認することを推奨します".to_string(),
            details: Vec::new(),
        }
    }

    /// Builds the summary from raw lookup features (GeoJSON features or bare
    /// property objects). Property names are read in English or Japanese.
    #[must_use]
    pub fn from_features(features: &[Value]) -> Self {
        if features.is_empty() {
            return Self::none_found();
        }
        let mut details = Vec::new();
        let mut cooperatives = BTreeSet::new();
        let mut species_seen: Vec<String> = Vec::new();

        for feature in features {
            let props = feature.get("properties").unwrap_or(feature);
            let right_number = text_of(first_text(props, &["rightNumber", "免許番号", "漁業権番号"]));
            let cooperative = text_of(first_text(props, &["cooperative", "漁協名", "組合名"]));
            let species_raw = first_text(props, &["species", "対象魚種", "漁業種類"]);
            let expiry = text_of(first_text(props, &["expiryDate", "有効期限"]));

            if let Some(c) = &cooperative {
                cooperatives.insert(c.clone());
            }
            match species_raw {
                Some(Value::String(s)) => push_unique(&mut species_seen, s),
                Some(Value::Array(items)) => {
                    for s in items.iter().filter_map(Value::as_str) {
                        push_unique(&mut species_seen, s);
                    }
                }
                _ => {}
            }

            details.push(FishingRightDetail {
                right_number: right_number.unwrap_or_else(|| UNKNOWN.to_string()),
                cooperative: cooperative.unwrap_or_else(|| UNKNOWN.to_string()),
                species: text_of(species_raw).unwrap_or_else(|| UNKNOWN.to_string()),
                expiry_date: expiry.unwrap_or_else(|| UNKNOWN.to_string()),
            });
        }

        let coop_info = if cooperatives.is_empty() {
            "地元漁業協同組合".to_string()
        } else {
            cooperatives.into_iter().collect::<Vec<_>>().join("、")
        };

        let mut restrictions = Vec::new();
        if !species_seen.is_empty() {
            let listed = species_seen
                .iter()
                .take(MAX_LISTED_SPECIES)
                .cloned()
                .collect::<Vec<_>>()
                .join("、");
            restrictions.push(format!("対象魚種: {listed}"));
        }
        restrictions.push("遊漁の場合は事前に地元漁協に確認してください".to_string());

        let count = features.len();
        details.truncate(MAX_DETAIL_ROWS);
        Self {
            has_fishery_rights: true,
            requires_license: true,
            license_type: "共同漁業権区域(遊漁券が必要な場合があります)".to_string(),
            fishing_rights_area: format!("共同漁業権設定区域({count}件)"),
            restrictions: restrictions.join("、"),
            cooperative_info: format!("{coop_info}に事前確認を推奨"),
            details,
        }
    }

    /// Prompt section describing these rights to the text generator.
    #[must_use]
    pub fn prompt_context(&self) -> String {
        let mut out = format!(
            "## 実際の共同漁業権情報:\n- 漁業権設定: {}\n- 遊漁券必要性: {}\n- 区域: {}\n- 制限事項: {}\n- 漁協情報: {}\n",
            if self.has_fishery_rights { "あり" } else { "なし" },
            if self.requires_license { "必要な可能性あり" } else { "不要" },
            self.fishing_rights_area,
            self.restrictions,
            self.cooperative_info,
        );
        if !self.details.is_empty() {
            out.push_str("\n詳細な漁業権情報:\n");
            for d in &self.details {
                out.push_str(&format!(
                    "  - 漁業権番号: {}, 漁協: {}, 対象: {}\n",
                    d.right_number, d.cooperative, d.species
                ));
            }
        }
        out
    }
}

fn push_unique(seen: &mut Vec<String>, value: &str) {
    if !value.is_empty() && !seen.iter().any(|s| s == value) {
        seen.push(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_lookup_means_free_fishing_area() {
        let s = FishingRights::from_features(&[]);
        assert!(!s.has_fishery_rights);
        assert!(!s.requires_license);
        assert_eq!(s.fishing_rights_area, "自由漁業区域");
    }

    #[test]
    fn summarizes_japanese_and_english_properties() {
        let features = vec![
            json!({"properties": {"漁業権番号": "兵共第1号", "漁協名": "明石浦漁協", "対象魚種": ["タコ", "アワビ"]}}),
            json!({"rightNumber": "R-2", "cooperative": "林崎漁協", "species": "サザエ", "expiryDate": "2033-08-31"}),
            json!({"properties": {}}),
            json!({"properties": {"cooperative": "明石浦漁協"}}),
        ];
        let s = FishingRights::from_features(&features);
        assert!(s.requires_license);
        assert_eq!(s.fishing_rights_area, "共同漁業権設定区域(4件)");
        assert_eq!(s.details.len(), MAX_DETAIL_ROWS);
        assert_eq!(s.details[0].species, "タコ、アワビ");
        assert_eq!(s.details[1].expiry_date, "2033-08-31");
        assert_eq!(s.details[2].right_number, "不明");
        assert!(s.restrictions.starts_with("対象魚種: タコ、アワビ、サザエ"));
        assert_eq!(s.cooperative_info, "明石浦漁協、林崎漁協に事前確認を推奨");
    }

    #[test]
    fn prompt_context_lists_details() {
        let s = FishingRights::from_features(&[json!({"rightNumber": "X1", "cooperative": "C"})]);
        let ctx = s.prompt_context();
        assert!(ctx.contains("漁業権設定: あり"));
        assert!(ctx.contains("漁業権番号: X1, 漁協: C"));
    }
}
