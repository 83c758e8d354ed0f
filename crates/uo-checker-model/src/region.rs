// SPDX-License-Identifier: Apache-2.0

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Romaji name and canonical Japanese name for every prefecture.
pub const PREFECTURES: [(&str, &str); 47] = [
    ("hokkaido", "北海道"),
    ("aomori", "青森県"),
    ("iwate", "岩手県"),
    ("miyagi", "宮城県"),
    ("akita", "秋田県"),
    ("yamagata", "山形県"),
    ("fukushima", "福島県"),
    ("ibaraki", "茨城県"),
    ("tochigi", "栃木県"),
    ("gunma", "群馬県"),
    ("saitama", "埼玉県"),
    ("chiba", "千葉県"),
    ("tokyo", "東京都"),
    ("kanagawa", "神奈川県"),
    ("niigata", "新潟県"),
    ("toyama", "富山県"),
    ("ishikawa", "石川県"),
    ("fukui", "福井県"),
    ("yamanashi", "山梨県"),
    ("nagano", "長野県"),
    ("gifu", "岐阜県"),
    ("shizuoka", "静岡県"),
    ("aichi", "愛知県"),
    ("mie", "三重県"),
    ("shiga", "滋賀県"),
    ("kyoto", "京都府"),
    ("osaka", "大阪府"),
    ("hyogo", "兵庫県"),
    ("nara", "奈良県"),
    ("wakayama", "和歌山県"),
    ("tottori", "鳥取県"),
    ("shimane", "島根県"),
    ("okayama", "岡山県"),
    ("hiroshima", "広島県"),
    ("yamaguchi", "山口県"),
    ("tokushima", "徳島県"),
    ("kagawa", "香川県"),
    ("ehime", "愛媛県"),
    ("kochi", "高知県"),
    ("fukuoka", "福岡県"),
    ("saga", "佐賀県"),
    ("nagasaki", "長崎県"),
    ("kumamoto", "熊本県"),
    ("oita", "大分県"),
    ("miyazaki", "宮崎県"),
    ("kagoshima", "鹿児島県"),
    ("okinawa", "沖縄県"),
];

const ADMIN_SUFFIXES: [char; 4] = ['都', '道', '府', '県'];
const KEY_STRIPPED_SUFFIXES: [char; 3] = ['県', '府', '都'];
const ROMAJI_SUFFIXES: [&str; 5] = ["prefectural", "prefecture", "-ken", "-fu", "-to"];

const CITY_PREFECTURES: [(&str, &str); 16] = [
    ("神戸", "兵庫県"),
    ("姫路", "兵庫県"),
    ("明石", "兵庫県"),
    ("大阪", "大阪府"),
    ("京都", "京都府"),
    ("奈良", "奈良県"),
    ("和歌山", "和歌山県"),
    ("大津", "滋賀県"),
    ("東京", "東京都"),
    ("横浜", "神奈川県"),
    ("名古屋", "愛知県"),
    ("札幌", "北海道"),
    ("仙台", "宮城県"),
    ("広島", "広島県"),
    ("福岡", "福岡県"),
    ("那覇", "沖縄県"),
];

/// NFKD-decomposes `input` and drops combining marks ("Hyōgo" -> "Hyogo").
///
/// Only meant for Latin text: kana voicing marks are combining marks too.
#[must_use]
pub fn fold_diacritics(input: &str) -> String {
    input.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

fn stem(full: &str) -> &str {
    full.strip_suffix(ADMIN_SUFFIXES).unwrap_or(full)
}

fn romaji_lookup(raw: &str) -> Option<&'static str> {
    let mut folded = fold_diacritics(raw).to_lowercase();
    for suffix in ROMAJI_SUFFIXES {
        if let Some(rest) = folded.trim_end().strip_suffix(suffix) {
            folded = rest.to_string();
        }
    }
    let folded = folded.trim();
    PREFECTURES
        .iter()
        .find(|(romaji, _)| *romaji == folded)
        .map(|(_, kanji)| *kanji)
}

/// Resolves free-form region input to the canonical Japanese prefecture name.
///
/// Accepts the canonical name, its bare stem (兵庫, 東京), romaji with or
/// without macrons and an English "Prefecture" suffix. Unknown input is
/// returned trimmed but otherwise unchanged.
#[must_use]
pub fn canonical_prefecture(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if let Some((_, kanji)) = PREFECTURES.iter().find(|(_, kanji)| *kanji == trimmed) {
        return (*kanji).to_string();
    }
    if let Some((_, kanji)) = PREFECTURES.iter().find(|(_, kanji)| stem(kanji) == trimmed) {
        return (*kanji).to_string();
    }
    if trimmed.ends_with(ADMIN_SUFFIXES) {
        return trimmed.to_string();
    }
    romaji_lookup(trimmed)
        .map(str::to_string)
        .unwrap_or_else(|| trimmed.to_string())
}

/// Drops one trailing 県/府/都 from a canonical prefecture name. 北海道 is kept whole.
#[must_use]
pub fn strip_admin_suffix(canonical: &str) -> &str {
    canonical
        .strip_suffix(KEY_STRIPPED_SUFFIXES)
        .unwrap_or(canonical)
}

/// Region component of a cache key.
#[must_use]
pub fn region_key_part(raw: &str) -> String {
    strip_admin_suffix(&canonical_prefecture(raw)).to_string()
}

/// Best-effort prefecture for a well-known city name, with or without 市.
#[must_use]
pub fn prefecture_from_city(city: &str) -> Option<&'static str> {
    let trimmed = city.trim();
    let bare = trimmed.strip_suffix('市').unwrap_or(trimmed);
    CITY_PREFECTURES
        .iter()
        .find(|(name, _)| *name == bare)
        .map(|(_, pref)| *pref)
}
