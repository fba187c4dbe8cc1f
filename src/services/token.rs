use crate::services::config_loader::TokenConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenFormat {
    pub digits: u32,
    pub prefix: Option<String>,
}

impl Default for TokenFormat {
    fn default() -> Self {
        Self {
            digits: 6,
            prefix: None,
        }
    }
}

impl From<&TokenConfig> for TokenFormat {
    fn from(config: &TokenConfig) -> Self {
        Self {
            digits: config.digits.clamp(5, 6),
            prefix: config.prefix.clone().filter(|p| !p.is_empty()),
        }
    }
}

/// Rolling `acc * 31 + unit` over UTF-16 code units, wrapped to i32 each step.
pub fn rolling_hash(seed: &str) -> i32 {
    seed.encode_utf16()
        .fold(0i32, |acc, unit| acc.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Advisory attendance token. The service issues the authoritative one on a
/// successful submit; this value is shown only when it does not.
pub fn generate_token(name: &str, phone: &str, timestamp_millis: i64, format: &TokenFormat) -> String {
    let seed = format!("{name}{phone}{timestamp_millis}");
    let digits = format.digits.clamp(5, 6);
    let modulus = 10i32.pow(digits);
    let value = (rolling_hash(&seed) % modulus).unsigned_abs();
    let body = format!("{value:0width$}", width = digits as usize);
    match &format.prefix {
        Some(prefix) => format!("{prefix}{body}"),
        None => body,
    }
}
