// SPDX-License-Identifier: Apache-2.0

use crate::clients::{Annotation, ImageAnnotations, Translator, VisionService};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Curated English species keywords recognized in annotation text.
pub const DEFAULT_SPECIES_KEYWORDS: &[&str] = &[
    "mackerel",
    "tuna",
    "salmon",
    "sardine",
    "bass",
    "sea bass",
    "bream",
    "sea bream",
    "flounder",
    "cod",
    "trout",
    "snapper",
    "yellowtail",
    "amberjack",
    "grouper",
    "halibut",
    "rockfish",
    "herring",
    "anchovy",
    "bonito",
    "skipjack",
    "albacore",
    "swordfish",
    "marlin",
    "barracuda",
    "sea perch",
    "red snapper",
    "black bass",
    "striped bass",
    "carp",
    "catfish",
    "pike",
    "mullet",
    "horse mackerel",
    "jack mackerel",
    "spanish mackerel",
    "kingfish",
    "pompano",
    "mahi mahi",
    "dolphinfish",
    "wahoo",
    "sheepshead",
    "porgy",
    "sole",
    "plaice",
    "turbot",
    "monkfish",
];

const GENERIC_FISH: &str = "fish";

/// Keyword list and score thresholds for picking a species out of annotations.
/// All comparisons are strict.
#[derive(Debug, Clone, Serialize)]
pub struct MatchPolicy {
    pub keywords: Vec<String>,
    pub web_keyword_min: f64,
    pub label_keyword_min: f64,
    pub web_fish_min: f64,
    pub label_fish_min: f64,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_SPECIES_KEYWORDS.iter().map(|k| (*k).to_string()).collect(),
            web_keyword_min: 0.5,
            label_keyword_min: 0.7,
            web_fish_min: 0.6,
            label_fish_min: 0.6,
        }
    }
}

impl MatchPolicy {
    pub fn validate(&self) -> Result<(), String> {
        if self.keywords.is_empty() {
            return Err("match policy needs at least one species keyword".to_string());
        }
        for (name, v) in [
            ("UO_MATCH_WEB_KEYWORD_MIN", self.web_keyword_min),
            ("UO_MATCH_LABEL_KEYWORD_MIN", self.label_keyword_min),
            ("UO_MATCH_WEB_FISH_MIN", self.web_fish_min),
            ("UO_MATCH_LABEL_FISH_MIN", self.label_fish_min),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(format!("{name} must be within [0, 1]"));
            }
        }
        Ok(())
    }

    fn has_keyword(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPass {
    WebKeyword,
    LabelKeyword,
    WebFish,
    LabelFish,
}

impl MatchPass {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WebKeyword => "web_keyword",
            Self::LabelKeyword => "label_keyword",
            Self::WebFish => "web_fish",
            Self::LabelFish => "label_fish",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesMatch {
    /// Annotation text as reported, before translation.
    pub term: String,
    pub score: f64,
    pub pass: MatchPass,
}

fn first_match(
    items: &[Annotation],
    pass: MatchPass,
    accept: impl Fn(&str, f64) -> bool,
) -> Option<SpeciesMatch> {
    items
        .iter()
        .find(|a| accept(&a.description.to_lowercase(), a.score))
        .map(|a| SpeciesMatch {
            term: a.description.clone(),
            score: a.score,
            pass,
        })
}

/// Runs the four passes in order; the first satisfied pass wins.
#[must_use]
pub fn match_annotations(ann: &ImageAnnotations, policy: &MatchPolicy) -> Option<SpeciesMatch> {
    first_match(&ann.web_entities, MatchPass::WebKeyword, |d, s| {
        policy.has_keyword(d) && s > policy.web_keyword_min
    })
    .or_else(|| {
        first_match(&ann.labels, MatchPass::LabelKeyword, |d, s| {
            policy.has_keyword(d) && s > policy.label_keyword_min
        })
    })
    .or_else(|| {
        first_match(&ann.web_entities, MatchPass::WebFish, |d, s| {
            d.contains(GENERIC_FISH) && d != GENERIC_FISH && s > policy.web_fish_min
        })
    })
    .or_else(|| {
        first_match(&ann.labels, MatchPass::LabelFish, |d, s| {
            d.contains(GENERIC_FISH) && s > policy.label_fish_min
        })
    })
}

pub struct SpeciesIdentifier {
    vision: Arc<dyn VisionService>,
    translator: Arc<dyn Translator>,
    policy: MatchPolicy,
}

impl SpeciesIdentifier {
    pub fn new(
        vision: Arc<dyn VisionService>,
        translator: Arc<dyn Translator>,
        policy: MatchPolicy,
    ) -> Self {
        Self {
            vision,
            translator,
            policy,
        }
    }

    /// Japanese species name, or `None` when nothing fish-like was recognized
    /// or the annotation service failed.
    pub async fn identify(&self, image: &[u8]) -> Option<String> {
        let annotations = match self.vision.annotate(image).await {
            Ok(a) => a,
            Err(e) => {
                warn!(backend = self.vision.backend_tag(), error = %e, "image annotation failed");
                return None;
            }
        };
        debug!(
            labels = annotations.labels.len(),
            web_entities = annotations.web_entities.len(),
            "image annotated"
        );
        let Some(found) = match_annotations(&annotations, &self.policy) else {
            info!("no species matched");
            return None;
        };
        let species = self.translator.to_japanese(&found.term).await;
        info!(
            term = %found.term,
            score = found.score,
            pass = found.pass.as_str(),
            species = %species,
            "species matched"
        );
        Some(species)
    }
}
