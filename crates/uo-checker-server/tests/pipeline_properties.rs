// SPDX-License-Identifier: Apache-2.0

mod pipeline_support;

use pipeline_support::{harness, harness_with, jpeg, mackerel_annotations, MACKEREL_REPLY, NOW};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::time::Duration;
use uo_checker_api::{ErrorKind, IdentifyResponse, IdentifySuccess};
use uo_checker_model::{
    CacheKey, Confidence, Coordinates, FishingRights, IdentificationRequest, LegalStatus,
    MAX_IMAGE_BYTES, UNKNOWN_EXPLANATION,
};
use uo_checker_server::clients::{
    Annotation, ClientError, ClientErrorKind, FishingRightsQuery, ImageAnnotations,
};
use uo_checker_server::fakes::{FakeFishingRights, FakeTextService, FakeVision};
use uo_checker_store::{MemoryStore, RegulationStore};

fn success(resp: IdentifyResponse) -> IdentifySuccess {
    match resp {
        IdentifyResponse::Success(s) => *s,
        IdentifyResponse::Failure(env) => panic!("expected success, got {env:?}"),
    }
}

fn hyogo_request() -> IdentificationRequest {
    IdentificationRequest::new(jpeg(), "兵庫県")
}

#[tokio::test]
async fn invalid_input_fails_before_any_network_call() {
    let h = harness();
    let oversized = vec![0_u8; MAX_IMAGE_BYTES + 1];
    let bad = [
        IdentificationRequest::new(Vec::new(), "兵庫県"),
        IdentificationRequest::new(jpeg(), "   "),
        IdentificationRequest::new(oversized, "兵庫県"),
        hyogo_request().with_coordinates(Coordinates {
            latitude: 120.0,
            longitude: 135.0,
        }),
    ];
    for req in bad {
        let resp = h.orchestrator.handle(req).await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::InvalidInput));
        assert_eq!(resp.http_status(), 400);
    }
    assert_eq!(h.vision.call_count(), 0);
    assert_eq!(h.text.call_count(), 0);
    assert_eq!(h.rights.call_count(), 0);
    assert_eq!(h.store.get_calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn cache_miss_generates_and_persists_once() {
    let h = harness();
    let out = success(h.orchestrator.handle(hyogo_request()).await);

    assert!(out.success);
    assert!(!out.from_cache);
    assert_eq!(out.identified_fish, "サバ");
    assert_eq!(out.location.region, "兵庫県");
    assert_eq!(out.timestamp, NOW);
    assert_eq!(out.data.fish_name_ja, "マサバ");
    assert_eq!(out.data.status, LegalStatus::Ok);
    assert_eq!(out.data.min_size, Some(20.0));
    assert_eq!(out.data.banned_months, vec![7]);
    assert_eq!(out.data.generated_by, "fake-text");
    assert_eq!(out.data.generated_at, NOW);
    assert_eq!(out.data.fish_identified.as_deref(), Some("サバ"));

    assert_eq!(h.text.call_count(), 1);
    assert_eq!(h.store.put_calls.load(Ordering::Relaxed), 1);
    let stored = h
        .store
        .get(&CacheKey::new("兵庫県", "サバ"))
        .await
        .expect("store read")
        .expect("entry");
    assert_eq!(stored.record, out.data);
    assert_eq!(stored.access_count, 1);
}

#[tokio::test]
async fn warm_cache_skips_generation_and_returns_identical_data() {
    let h = harness();
    let first = success(h.orchestrator.handle(hyogo_request()).await);
    let second = success(h.orchestrator.handle(hyogo_request()).await);
    let third = success(h.orchestrator.handle(hyogo_request()).await);

    assert!(second.from_cache && third.from_cache);
    assert_eq!(h.text.call_count(), 1);
    assert_eq!(h.rights.call_count(), 1);
    assert_eq!(h.store.put_calls.load(Ordering::Relaxed), 1);

    let bytes = |s: &IdentifySuccess| serde_json::to_vec(&s.data).expect("encode");
    assert_eq!(bytes(&first), bytes(&second));
    assert_eq!(bytes(&second), bytes(&third));
}

#[tokio::test]
async fn region_spellings_share_one_cache_entry() {
    let h = harness();
    let first = success(
        h.orchestrator
            .handle(IdentificationRequest::new(jpeg(), "Hyōgo Prefecture"))
            .await,
    );
    assert!(!first.from_cache);
    assert_eq!(first.location.region, "兵庫県");
    let second = success(h.orchestrator.handle(IdentificationRequest::new(jpeg(), "兵庫")).await);
    assert!(second.from_cache);
    assert_eq!(h.store.len().await, 1);
}

#[tokio::test]
async fn city_locality_resolves_an_unknown_region() {
    let h = harness();
    let out = success(
        h.orchestrator
            .handle(IdentificationRequest::new(jpeg(), "Kansai").with_locality("姫路市"))
            .await,
    );
    assert_eq!(out.location.region, "兵庫県");
    assert_eq!(out.location.locality.as_deref(), Some("姫路市"));
    assert!(h
        .store
        .get(&CacheKey::new("兵庫県", "サバ"))
        .await
        .expect("read")
        .is_some());
    assert_eq!(CacheKey::new("兵庫県", "サバ").as_str(), "兵庫-サバ");
}

#[tokio::test]
async fn text_service_failure_yields_fallback_record() {
    let h = harness_with(
        FakeVision::returning(mackerel_annotations()),
        FakeTextService::failing("upstream 529 overloaded"),
        FakeFishingRights::returning(Vec::new()),
        MemoryStore::default(),
        |_| {},
    );
    let out = success(h.orchestrator.handle(hyogo_request()).await);
    assert!(out.success);
    assert!(!out.from_cache);
    assert_eq!(out.data.status, LegalStatus::Unknown);
    assert_eq!(out.data.is_legal, Some(false));
    assert_eq!(out.data.can_take_home, Some(false));
    assert_eq!(out.data.confidence, Confidence::Low);
    assert!(out.data.error);
    assert!(out
        .data
        .error_message
        .as_deref()
        .is_some_and(|m| m.contains("529")));
    assert_eq!(out.data.generated_by, "fallback");
    assert_eq!(out.data.fishing_rights, Some(FishingRights::none_found()));
}

#[tokio::test]
async fn fallback_records_are_not_cached() {
    let text = FakeTextService::default();
    text.push_reply(Err(ClientError::new(ClientErrorKind::Status, "upstream 529 overloaded")))
        .await;
    text.push_reply(Ok(MACKEREL_REPLY.to_string())).await;
    let h = harness_with(
        FakeVision::returning(mackerel_annotations()),
        text,
        FakeFishingRights::returning(Vec::new()),
        MemoryStore::default(),
        |_| {},
    );
    let first = success(h.orchestrator.handle(hyogo_request()).await);
    assert!(first.data.is_fallback());
    assert_eq!(h.store.put_calls.load(Ordering::Relaxed), 0);

    let second = success(h.orchestrator.handle(hyogo_request()).await);
    assert!(!second.from_cache);
    assert!(!second.data.is_fallback());
    assert_eq!(h.text.call_count(), 2);
    assert_eq!(h.store.put_calls.load(Ordering::Relaxed), 1);

    let third = success(h.orchestrator.handle(hyogo_request()).await);
    assert!(third.from_cache);
    assert_eq!(h.text.call_count(), 2);
}

#[tokio::test]
async fn generic_fish_matches_are_named_in_japanese() {
    let cases = [
        (ImageAnnotations::new(vec![Annotation::new("Fish", 0.95)], Vec::new()), "魚"),
        (ImageAnnotations::new(Vec::new(), vec![Annotation::new("Pufferfish", 0.8)]), "フグ"),
        (ImageAnnotations::new(Vec::new(), vec![Annotation::new("Lionfish", 0.8)]), "ミノカサゴ"),
    ];
    for (annotations, expected) in cases {
        let h = harness_with(
            FakeVision::returning(annotations),
            FakeTextService::replying("{}"),
            FakeFishingRights::returning(Vec::new()),
            MemoryStore::default(),
            |_| {},
        );
        let out = success(h.orchestrator.handle(hyogo_request()).await);
        assert_eq!(out.identified_fish, expected);
        assert_eq!(out.data.fish_name_ja, expected);
        let key = CacheKey::new("兵庫県", expected);
        assert_eq!(key.as_str(), format!("兵庫-{expected}"));
        assert!(h.store.get(&key).await.expect("store read").is_some());
        let prompt = &h.text.requests().await[0].prompt;
        assert!(prompt.contains(&format!("「{expected}」")));
    }
}

#[tokio::test]
async fn unparseable_reply_yields_fallback_and_sparse_reply_is_backfilled() {
    let h = harness_with(
        FakeVision::returning(mackerel_annotations()),
        FakeTextService::replying("申し訳ありませんが、わかりません。"),
        FakeFishingRights::returning(Vec::new()),
        MemoryStore::default(),
        |_| {},
    );
    let out = success(h.orchestrator.handle(hyogo_request()).await);
    assert!(out.data.is_fallback());
    assert!(out
        .data
        .error_message
        .as_deref()
        .is_some_and(|m| m.contains("parse")));

    let h = harness_with(
        FakeVision::returning(mackerel_annotations()),
        FakeTextService::replying(r#"{"isLegal": "true", "dailyLimit": 10}"#),
        FakeFishingRights::returning(Vec::new()),
        MemoryStore::default(),
        |_| {},
    );
    let out = success(h.orchestrator.handle(hyogo_request()).await);
    assert!(!out.data.is_fallback());
    assert_eq!(out.data.fish_name_ja, "サバ");
    assert_eq!(out.data.status, LegalStatus::Unknown);
    assert_eq!(out.data.legal_explanation, UNKNOWN_EXPLANATION);
    assert_eq!(out.data.is_legal, Some(true));
    assert_eq!(out.data.daily_limit, Some(10));
}

#[tokio::test]
async fn unidentified_fish_stops_before_cache_and_generation() {
    let h = harness_with(
        FakeVision::returning(ImageAnnotations::new(
            vec![Annotation::new("Water", 0.99)],
            vec![Annotation::new("Boat", 0.9)],
        )),
        FakeTextService::replying(MACKEREL_REPLY),
        FakeFishingRights::returning(Vec::new()),
        MemoryStore::default(),
        |_| {},
    );
    let resp = h.orchestrator.handle(hyogo_request()).await;
    let v = serde_json::to_value(&resp).expect("encode");
    assert_eq!(v["success"], false);
    assert_eq!(v["error"], "fish not identified");
    assert_eq!(v["suggestions"].as_array().map(Vec::len), Some(3));
    assert_eq!(resp.http_status(), 422);
    assert_eq!(h.text.call_count(), 0);
    assert_eq!(h.store.get_calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn vision_failure_is_reported_as_not_identified() {
    let h = harness_with(
        FakeVision::failing("connection reset"),
        FakeTextService::replying(MACKEREL_REPLY),
        FakeFishingRights::returning(Vec::new()),
        MemoryStore::default(),
        |_| {},
    );
    let resp = h.orchestrator.handle(hyogo_request()).await;
    assert_eq!(resp.error_kind(), Some(ErrorKind::FishNotIdentified));
    assert_eq!(h.vision.call_count(), 1);
}

#[tokio::test]
async fn generation_deadline_maps_to_generation_error() {
    let h = harness_with(
        FakeVision::returning(mackerel_annotations()),
        FakeTextService::replying(MACKEREL_REPLY).with_delay(Duration::from_millis(500)),
        FakeFishingRights::returning(Vec::new()),
        MemoryStore::default(),
        |cfg| cfg.generation_deadline = Duration::from_millis(30),
    );
    let resp = h.orchestrator.handle(hyogo_request()).await;
    assert_eq!(resp.error_kind(), Some(ErrorKind::GenerationError));
    assert_eq!(resp.http_status(), 502);
    assert_eq!(h.store.put_calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn looked_up_fishing_rights_override_the_generated_block() {
    let features = vec![json!({"properties": {"漁業権番号": "兵共第12号", "漁協名": "明石浦漁協", "対象魚種": ["タコ"]}})];
    let h = harness_with(
        FakeVision::returning(mackerel_annotations()),
        FakeTextService::replying(MACKEREL_REPLY),
        FakeFishingRights::returning(features.clone()),
        MemoryStore::default(),
        |_| {},
    );
    let out = success(h.orchestrator.handle(hyogo_request()).await);
    let rights = out.data.fishing_rights.expect("rights");
    assert_eq!(rights, FishingRights::from_features(&features));
    assert!(rights.requires_license);
    assert_eq!(
        h.rights.queries().await,
        vec![FishingRightsQuery::Prefecture("兵庫県".to_string())]
    );
    let prompt = &h.text.requests().await[0].prompt;
    assert!(prompt.contains("兵共第12号"));
}

#[tokio::test]
async fn coordinates_search_nearby_rights_and_failed_lookup_keeps_reply_block() {
    let h = harness_with(
        FakeVision::returning(mackerel_annotations()),
        FakeTextService::replying(MACKEREL_REPLY),
        FakeFishingRights::failing("msil timed out"),
        MemoryStore::default(),
        |_| {},
    );
    let at = Coordinates {
        latitude: 34.64,
        longitude: 134.99,
    };
    let out = success(h.orchestrator.handle(hyogo_request().with_coordinates(at)).await);
    assert_eq!(
        h.rights.queries().await,
        vec![FishingRightsQuery::Near {
            coordinates: at,
            radius_m: 5000
        }]
    );
    let rights = out.data.fishing_rights.expect("reply block");
    assert!(!rights.has_fishery_rights);
    assert_eq!(rights.license_type, "不要");
    assert_eq!(out.location.lat, Some(34.64));
}

#[tokio::test]
async fn store_failure_degrades_to_uncached_success() {
    let h = harness_with(
        FakeVision::returning(mackerel_annotations()),
        FakeTextService::replying(MACKEREL_REPLY),
        FakeFishingRights::returning(Vec::new()),
        MemoryStore::failing(),
        |_| {},
    );
    let first = success(h.orchestrator.handle(hyogo_request()).await);
    let second = success(h.orchestrator.handle(hyogo_request()).await);
    assert!(!first.from_cache && !second.from_cache);
    assert_eq!(h.text.call_count(), 2);
    assert_eq!(first.data, second.data);
}

#[tokio::test]
async fn image_is_attached_only_when_configured() {
    let h = harness();
    success(h.orchestrator.handle(hyogo_request()).await);
    assert!(h.text.requests().await[0].image.is_none());

    let h = harness_with(
        FakeVision::returning(mackerel_annotations()),
        FakeTextService::replying(MACKEREL_REPLY),
        FakeFishingRights::returning(Vec::new()),
        MemoryStore::default(),
        |cfg| cfg.text.attach_image = true,
    );
    success(h.orchestrator.handle(hyogo_request()).await);
    let req = &h.text.requests().await[0];
    assert_eq!(req.image.as_deref(), Some(jpeg().as_slice()));
    assert_eq!(req.max_tokens, 4096);
}

#[tokio::test]
async fn panicking_stage_becomes_system_error_with_debug_detail_only_in_debug_mode() {
    let h = harness_with(
        FakeVision::panicking(),
        FakeTextService::replying(MACKEREL_REPLY),
        FakeFishingRights::returning(Vec::new()),
        MemoryStore::default(),
        |_| {},
    );
    let resp = h.orchestrator.handle(hyogo_request()).await;
    assert_eq!(resp.error_kind(), Some(ErrorKind::SystemError));
    assert_eq!(resp.http_status(), 500);
    let v = serde_json::to_value(&resp).expect("encode");
    assert!(v.get("debug").is_none());

    let h = harness_with(
        FakeVision::panicking(),
        FakeTextService::replying(MACKEREL_REPLY),
        FakeFishingRights::returning(Vec::new()),
        MemoryStore::default(),
        |cfg| cfg.debug = true,
    );
    let v = serde_json::to_value(h.orchestrator.handle(hyogo_request()).await).expect("encode");
    assert_eq!(v["debug"], "fake vision exploded");
    assert!(h.cfg.debug);
}
