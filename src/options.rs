//! Enumerated request options. Each serializes to the exact string the
//! Images API expects, so values pass through unchanged.

use std::fmt;

use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const MAX_PROMPT_CHARS: usize = 32_000;
pub const MIN_IMAGE_COUNT: u8 = 1;
pub const MAX_IMAGE_COUNT: u8 = 10;
pub const MAX_COMPRESSION: u8 = 100;
pub const MAX_SOURCE_IMAGES: usize = 16;
pub const MAX_SOURCE_IMAGE_BYTES: usize = 50 * 1024 * 1024;
pub const DEFAULT_MODEL: &str = "gpt-image-1";
pub const DEFAULT_COMPRESSION: u8 = 85;

macro_rules! wire_enum {
    ($name:ident { $($variant:ident => $wire:literal),+ $(,)? } default $default:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
        pub enum $name {
            $(#[serde(rename = $wire)] $variant,)+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum!(Background {
    Auto => "auto",
    Transparent => "transparent",
    Opaque => "opaque",
} default Auto);

wire_enum!(Moderation {
    Low => "low",
    Auto => "auto",
} default Low);

wire_enum!(OutputFormat {
    Jpeg => "jpeg",
    Png => "png",
    Webp => "webp",
} default Jpeg);

wire_enum!(Quality {
    Auto => "auto",
    Low => "low",
    Medium => "medium",
    High => "high",
} default Medium);

wire_enum!(ImageSize {
    Auto => "auto",
    Square => "1024x1024",
    Landscape => "1536x1024",
    Portrait => "1024x1536",
} default Auto);

impl OutputFormat {
    /// File extension for saved images; jpeg is written as `.jpg`.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }
}

pub(crate) fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

pub(crate) fn default_count() -> i64 {
    i64::from(MIN_IMAGE_COUNT)
}

pub(crate) fn default_compression() -> i64 {
    i64::from(DEFAULT_COMPRESSION)
}

pub(crate) fn validate_prompt(prompt: &str, empty_message: &str) -> Result<(), String> {
    if prompt.trim().is_empty() {
        return Err(empty_message.to_string());
    }
    let chars = prompt.chars().count();
    if chars > MAX_PROMPT_CHARS {
        return Err(format!(
            "Prompt is {chars} characters; the maximum is {MAX_PROMPT_CHARS}."
        ));
    }
    Ok(())
}

/// Counts arrive as any JSON integer so out-of-range values are reported
/// by the operation instead of failing request decoding.
pub(crate) fn validate_count(n: i64) -> Result<u8, String> {
    u8::try_from(n)
        .ok()
        .filter(|count| (MIN_IMAGE_COUNT..=MAX_IMAGE_COUNT).contains(count))
        .ok_or_else(|| {
            format!("Number of images must be between {MIN_IMAGE_COUNT} and {MAX_IMAGE_COUNT}, got {n}.")
        })
}

pub(crate) fn validate_compression(value: i64) -> Result<u8, String> {
    u8::try_from(value)
        .ok()
        .filter(|compression| *compression <= MAX_COMPRESSION)
        .ok_or_else(|| format!("Output compression must be between 0 and {MAX_COMPRESSION}, got {value}."))
}
