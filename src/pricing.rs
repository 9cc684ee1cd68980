use serde::{Deserialize, Serialize};

pub const TEXT_INPUT_USD_PER_MILLION: f64 = 5.00;
pub const IMAGE_INPUT_USD_PER_MILLION: f64 = 10.00;
pub const IMAGE_OUTPUT_USD_PER_MILLION: f64 = 40.00;

const TOKENS_PER_MILLION: f64 = 1_000_000.0;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InputTokensDetails {
    #[serde(default)]
    pub text_tokens: u64,
    #[serde(default)]
    pub image_tokens: u64,
}

/// Token usage reported by the Images API.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub input_tokens_details: InputTokensDetails,
}

impl TokenUsage {
    pub fn text_tokens(&self) -> u64 {
        self.input_tokens_details.text_tokens
    }

    pub fn image_tokens(&self) -> u64 {
        self.input_tokens_details.image_tokens
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
    pub cost_per_image: f64,
}

impl CostBreakdown {
    /// Generation bills text input only; image input tokens are not charged.
    pub fn for_generation(usage: &TokenUsage, image_count: usize) -> Self {
        let input_cost = per_million(usage.text_tokens(), TEXT_INPUT_USD_PER_MILLION);
        Self::from_parts(input_cost, usage, image_count)
    }

    pub fn for_edit(usage: &TokenUsage, image_count: usize) -> Self {
        let input_cost = per_million(usage.text_tokens(), TEXT_INPUT_USD_PER_MILLION)
            + per_million(usage.image_tokens(), IMAGE_INPUT_USD_PER_MILLION);
        Self::from_parts(input_cost, usage, image_count)
    }

    fn from_parts(input_cost: f64, usage: &TokenUsage, image_count: usize) -> Self {
        let output_cost = per_million(usage.output_tokens, IMAGE_OUTPUT_USD_PER_MILLION);
        let total_cost = input_cost + output_cost;
        let cost_per_image = if image_count == 0 {
            0.0
        } else {
            total_cost / image_count as f64
        };
        Self {
            input_cost,
            output_cost,
            total_cost,
            cost_per_image,
        }
    }
}

fn per_million(tokens: u64, rate: f64) -> f64 {
    tokens as f64 / TOKENS_PER_MILLION * rate
}
