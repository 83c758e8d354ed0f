// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use uo_checker_model::ValidationError;

/// Failure classes a caller can see. Serialized as the envelope's `error` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ErrorKind {
    #[serde(rename = "invalid input")]
    InvalidInput,
    #[serde(rename = "payload too large")]
    PayloadTooLarge,
    #[serde(rename = "fish not identified")]
    FishNotIdentified,
    #[serde(rename = "generation error")]
    GenerationError,
    #[serde(rename = "system error")]
    SystemError,
}

pub const NOT_IDENTIFIED_SUGGESTIONS: [&str; 3] = [
    "魚全体がはっきり写るように撮影してください",
    "明るい場所で撮影してください",
    "背景がシンプルな場所で撮影してください",
];

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid input",
            Self::PayloadTooLarge => "payload too large",
            Self::FishNotIdentified => "fish not identified",
            Self::GenerationError => "generation error",
            Self::SystemError => "system error",
        }
    }

    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::InvalidInput => 400,
            Self::PayloadTooLarge => 413,
            Self::FishNotIdentified => 422,
            Self::GenerationError => 502,
            Self::SystemError => 500,
        }
    }

    /// User-facing default message.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::InvalidInput => "入力内容に誤りがあります。",
            Self::PayloadTooLarge => "画像サイズが大きすぎます。10MB以下の画像を送信してください。",
            Self::FishNotIdentified => {
                "魚を特定できませんでした。画像が不鮮明か、魚が写っていない可能性があります。"
            }
            Self::GenerationError => {
                "規制情報の生成に時間がかかりすぎました。しばらくしてから再度お試しください。"
            }
            Self::SystemError => "システムエラーが発生しました。",
        }
    }
}

/// User-facing message for a rejected identification request.
#[must_use]
pub fn validation_message(err: &ValidationError) -> &'static str {
    match err {
        ValidationError::EmptyImage => "画像が空です。魚の写真を送信してください。",
        ValidationError::ImageTooLarge { .. } => {
            "画像サイズが大きすぎます。10MB以下の画像を送信してください。"
        }
        ValidationError::BlankRegion => "都道府県を入力してください。",
        ValidationError::PartialCoordinates => "緯度と経度は両方指定してください。",
        ValidationError::CoordinatesOutOfRange { .. } => "緯度・経度の値が範囲外です。",
        _ => ErrorKind::InvalidInput.default_message(),
    }
}
