// SPDX-License-Identifier: Apache-2.0

use uo_checker_model::{region_key_part, species_key_part, CacheKey};

#[test]
fn every_region_spelling_shares_one_key() {
    let expected = CacheKey::new("兵庫県", "サバ");
    for region in ["兵庫", "Hyogo", "Hyōgo Prefecture", "hyogo-ken", " 兵庫県 "] {
        assert_eq!(CacheKey::new(region, "サバ"), expected, "region {region:?}");
    }
}

#[test]
fn suffix_stripping_matches_documented_examples() {
    assert_eq!(CacheKey::new("大阪府", "アジ").as_str(), "大阪-アジ");
    assert_eq!(CacheKey::new("東京都", "Sea Bass").as_str(), "東京-sea-bass");
    assert_eq!(CacheKey::new("北海道", "サケ").as_str(), "北海道-サケ");
    assert_eq!(CacheKey::new("京都", "アユ").as_str(), "京都-アユ");
}

#[test]
fn unknown_regions_are_not_invented() {
    assert_eq!(region_key_part("Springfield"), "Springfield");
    assert_eq!(CacheKey::new("Springfield", "Trout").as_str(), "Springfield-trout");
}

#[test]
fn species_normalization_is_stable() {
    assert_eq!(species_key_part("  Red Sea Bream "), "red-sea-bream");
    assert_eq!(species_key_part("マダイ"), "マダイ");
}

#[test]
fn cache_key_serializes_as_plain_string() {
    let key = CacheKey::new("兵庫県", "サバ");
    assert_eq!(serde_json::to_string(&key).expect("encode"), "\"兵庫-サバ\"");
    assert_eq!(CacheKey::from_stored("兵庫-サバ"), key);
}
