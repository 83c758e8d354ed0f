// SPDX-License-Identifier: Apache-2.0
#![allow(dead_code)]

use std::sync::Arc;
use uo_checker_server::clients::{Annotation, GlossaryTranslator, ImageAnnotations};
use uo_checker_server::fakes::{FakeFishingRights, FakeTextService, FakeVision};
use uo_checker_server::{build_orchestrator, FixedClock, Orchestrator, ServiceConfig, Services};
use uo_checker_store::MemoryStore;

pub const NOW: &str = "2026-10-18T09:00:00.000Z";

pub const MACKEREL_REPLY: &str = r#"```json
{
  "fishNameJa": "マサバ",
  "fishNameEn": "Chub mackerel",
  "scientificName": "Scomber japonicus",
  "isLegal": true,
  "canTakeHome": true,
  "status": "OK",
  "legalExplanation": "兵庫県ではサバに関する全長制限はありません。",
  "minSize": "20",
  "bannedMonths": ["7月", 13],
  "isEdible": true,
  "cookingMethods": ["しめ鯖", "塩焼き"],
  "fishingRights": {"hasFisheryRights": false, "licenseType": "不要"},
  "confidence": "high"
}
```"#;

pub fn jpeg() -> Vec<u8> {
    vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46]
}

pub fn mackerel_annotations() -> ImageAnnotations {
    ImageAnnotations::new(
        vec![Annotation::new("Fish", 0.97)],
        vec![Annotation::new("Mackerel", 0.91), Annotation::new("Seafood", 0.7)],
    )
}

pub struct Harness {
    pub orchestrator: Orchestrator,
    pub cfg: ServiceConfig,
    pub vision: Arc<FakeVision>,
    pub text: Arc<FakeTextService>,
    pub rights: Arc<FakeFishingRights>,
    pub store: Arc<MemoryStore>,
}

pub fn harness_with(
    vision: FakeVision,
    text: FakeTextService,
    rights: FakeFishingRights,
    store: MemoryStore,
    tweak: impl FnOnce(&mut ServiceConfig),
) -> Harness {
    let mut cfg = ServiceConfig::default();
    cfg.store.backend = "memory".to_string();
    tweak(&mut cfg);
    let vision = Arc::new(vision);
    let text = Arc::new(text);
    let rights = Arc::new(rights);
    let store = Arc::new(store);
    let services = Services {
        vision: vision.clone(),
        text: text.clone(),
        fishing_rights: Some(rights.clone()),
        translator: Arc::new(GlossaryTranslator::default()),
        store: store.clone(),
        clock: Arc::new(FixedClock(NOW.to_string())),
    };
    Harness {
        orchestrator: build_orchestrator(&cfg, services),
        cfg,
        vision,
        text,
        rights,
        store,
    }
}

pub fn harness() -> Harness {
    harness_with(
        FakeVision::returning(mackerel_annotations()),
        FakeTextService::replying(MACKEREL_REPLY),
        FakeFishingRights::returning(Vec::new()),
        MemoryStore::default(),
        |_| {},
    )
}
