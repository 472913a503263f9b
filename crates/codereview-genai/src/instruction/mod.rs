use once_cell::sync::Lazy;

const STANDARD: &str = include_str!("standard.md");
const STRICT_POLICY: &str = include_str!("strict.md");

/// Exact reply the strict instruction demands for non-code input.
pub const REFUSAL_MESSAGE: &str =
    "I can only review source code. Please paste the code you would like reviewed.";

static STRICT: Lazy<String> =
    Lazy::new(|| format!("{STANDARD}{STRICT_POLICY}{REFUSAL_MESSAGE}\n"));

/// Fixed system-level directive sent with every review. Never user-controlled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SystemInstruction {
    /// Reviewer persona with numbered review dimensions and bad/enhanced pairs.
    #[default]
    Standard,
    /// Standard persona plus a canned refusal for anything that is not code.
    Strict,
}

impl SystemInstruction {
    pub fn text(self) -> &'static str {
        match self {
            SystemInstruction::Standard => STANDARD,
            SystemInstruction::Strict => STRICT.as_str(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SystemInstruction::Standard => "standard",
            SystemInstruction::Strict => "strict",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "standard" | "default" => Some(SystemInstruction::Standard),
            "strict" => Some(SystemInstruction::Strict),
            _ => None,
        }
    }
}
