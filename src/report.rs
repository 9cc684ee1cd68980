//! Structured operation summaries and their markdown rendering.

use std::fmt::Write as _;

use chrono::{Local, TimeZone};
use serde::Serialize;

use crate::error::ToolError;
use crate::options::{Background, ImageSize, OutputFormat, Quality};
use crate::pricing::{CostBreakdown, TokenUsage};

pub const PROMPT_ECHO_CHARS: usize = 300;

const GENERATE_TROUBLESHOOTING: &[&str] = &[
    "Verify OpenAI API key is valid",
    "Check prompt length (max 32,000 characters)",
    "Ensure sufficient API credits",
    "Try different quality/size settings",
];

const EDIT_TROUBLESHOOTING: &[&str] = &[
    "Ensure images are PNG, JPEG, or WebP format",
    "Check file sizes (max 50MB per image)",
    "Verify mask has alpha channel and matches image dimensions",
    "Try simpler edit instructions",
    "Reduce number of input images",
];

#[derive(Clone, Debug, Serialize)]
pub struct GenerationSummary {
    pub model: String,
    pub image_count: usize,
    pub quality: Quality,
    pub size: ImageSize,
    pub output_format: OutputFormat,
    pub background: Background,
    pub output_compression: u8,
    pub created: u64,
    pub usage: TokenUsage,
    pub cost: CostBreakdown,
    pub prompt: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct EditSummary {
    pub model: String,
    pub input_images: usize,
    pub output_images: usize,
    pub quality: Quality,
    pub size: ImageSize,
    pub background: Background,
    pub mask_applied: bool,
    pub created: u64,
    pub usage: TokenUsage,
    pub cost: CostBreakdown,
    pub prompt: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Generate,
    Edit,
}

#[derive(Clone, Debug, Serialize)]
pub struct FailureReport {
    pub operation: Operation,
    pub error: String,
    /// Rejected before any remote call.
    pub precondition: bool,
}

impl FailureReport {
    pub fn new(operation: Operation, err: &ToolError) -> Self {
        Self {
            operation,
            error: err.to_string(),
            precondition: err.is_precondition(),
        }
    }

    pub fn render_markdown(&self) -> String {
        if self.precondition {
            return format!("❌ **Error:** {}", self.error);
        }
        let (title, steps) = match self.operation {
            Operation::Generate => ("Generation Failed", GENERATE_TROUBLESHOOTING),
            Operation::Edit => ("Edit Failed", EDIT_TROUBLESHOOTING),
        };
        let mut out = format!("## ❌ {title}\n\n**Error:** {}\n\n**Troubleshooting:**\n", self.error);
        for step in steps {
            let _ = writeln!(out, "- {step}");
        }
        out
    }
}

impl GenerationSummary {
    pub fn render_markdown(&self) -> String {
        let mut out = String::from("## ✅ Images Generated Successfully!\n\n### 📊 Generation Details\n");
        let _ = writeln!(out, "- **Model:** {}", self.model);
        let _ = writeln!(out, "- **Images Created:** {}", self.image_count);
        let _ = writeln!(out, "- **Quality:** {}", self.quality);
        let _ = writeln!(out, "- **Size:** {}", self.size);
        let _ = writeln!(out, "- **Format:** {}", self.output_format);
        let _ = writeln!(out, "- **Background:** {}", self.background);
        let _ = writeln!(out, "- **Compression:** {}%", self.output_compression);
        let _ = writeln!(out, "- **Created:** {}", format_created(self.created));

        out.push_str("\n### 🔢 Token Usage\n");
        let _ = writeln!(out, "- **Text Tokens:** {}", group_thousands(self.usage.text_tokens()));
        let _ = writeln!(out, "- **Image Tokens:** {}", group_thousands(self.usage.image_tokens()));
        let _ = writeln!(out, "- **Output Tokens:** {}", group_thousands(self.usage.output_tokens));
        let _ = writeln!(out, "- **Total Tokens:** {}", group_thousands(self.usage.total_tokens));

        out.push_str("\n### 💰 Cost Breakdown\n");
        let _ = writeln!(out, "- **Input Cost:** ${:.4}", self.cost.input_cost);
        let _ = writeln!(out, "- **Output Cost:** ${:.4}", self.cost.output_cost);
        let _ = writeln!(out, "- **Total Cost:** ${:.4}", self.cost.total_cost);
        let _ = writeln!(out, "- **Cost per Image:** ${:.4}", self.cost.cost_per_image);

        let _ = writeln!(out, "\n### 📝 Prompt\n\"{}\"", echo_prompt(&self.prompt));
        out
    }
}

impl EditSummary {
    pub fn render_markdown(&self) -> String {
        let mut out = String::from("## ✅ Images Edited Successfully!\n\n### 📊 Edit Details\n");
        let _ = writeln!(out, "- **Model:** {}", self.model);
        let _ = writeln!(out, "- **Input Images:** {}", self.input_images);
        let _ = writeln!(out, "- **Output Images:** {}", self.output_images);
        let _ = writeln!(out, "- **Quality:** {}", self.quality);
        let _ = writeln!(out, "- **Size:** {}", self.size);
        let _ = writeln!(out, "- **Background:** {}", self.background);
        let _ = writeln!(
            out,
            "- **Mask Applied:** {}",
            if self.mask_applied { "Yes" } else { "No" }
        );
        let _ = writeln!(out, "- **Created:** {}", format_created(self.created));

        out.push_str("\n### 🔢 Token Usage\n");
        let _ = writeln!(out, "- **Text Tokens:** {}", group_thousands(self.usage.text_tokens()));
        let _ = writeln!(out, "- **Input Image Tokens:** {}", group_thousands(self.usage.image_tokens()));
        let _ = writeln!(out, "- **Output Tokens:** {}", group_thousands(self.usage.output_tokens));
        let _ = writeln!(out, "- **Total Tokens:** {}", group_thousands(self.usage.total_tokens));

        out.push_str("\n### 💰 Cost Breakdown\n");
        let _ = writeln!(out, "- **Input Cost:** ${:.4} (text + images)", self.cost.input_cost);
        let _ = writeln!(out, "- **Output Cost:** ${:.4}", self.cost.output_cost);
        let _ = writeln!(out, "- **Total Cost:** ${:.4}", self.cost.total_cost);
        let _ = writeln!(out, "- **Cost per Output Image:** ${:.4}", self.cost.cost_per_image);

        let _ = writeln!(out, "\n### 📝 Edit Instructions\n\"{}\"", echo_prompt(&self.prompt));
        out
    }
}

/// First 300 characters of the prompt, with `...` appended when cut.
pub fn echo_prompt(prompt: &str) -> String {
    match prompt.char_indices().nth(PROMPT_ECHO_CHARS) {
        Some((cut, _)) => format!("{}...", &prompt[..cut]),
        None => prompt.to_string(),
    }
}

pub fn format_created(created: u64) -> String {
    i64::try_from(created)
        .ok()
        .and_then(|secs| Local.timestamp_opt(secs, 0).single())
        .map(|time| time.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| created.to_string())
}

pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
