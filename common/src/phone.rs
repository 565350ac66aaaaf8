use anyhow::anyhow;
use fancy_regex::Regex;
use once_cell::sync::Lazy;

use crate::schema::Network;

static UG_MSISDN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^256[2-9]\d{8}$").ok());

/// Normalizes local (`07XXXXXXXX`), bare (`7XXXXXXXX`) and international
/// (`+2567XXXXXXXX`) forms to `2567XXXXXXXX`.
pub fn normalize_phone(raw: &str) -> anyhow::Result<String> {
    let digits: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    let digits = digits.strip_prefix('+').unwrap_or(&digits);

    let normalized = if let Some(local) = digits.strip_prefix('0') {
        format!("256{local}")
    } else if digits.len() == 9 {
        format!("256{digits}")
    } else {
        digits.to_string()
    };

    let valid = match &*UG_MSISDN {
        Some(re) => re
            .is_match(&normalized)
            .map_err(|e| anyhow!("Regex error for phone number: {e}"))?,
        None => return Err(anyhow!("Phone regex failed to compile")),
    };
    if !valid {
        return Err(anyhow!("Invalid phone number `{}`", raw));
    }
    Ok(normalized)
}

/// Network for a normalized number, from the two digits after `256`.
pub fn detect_network(normalized: &str) -> anyhow::Result<Network> {
    let prefix = normalized
        .get(3..5)
        .ok_or_else(|| anyhow!("Phone number `{}` is too short", normalized))?;
    match prefix {
        "76" | "77" | "78" | "39" => Ok(Network::Mtn),
        "70" | "74" | "75" | "20" => Ok(Network::Airtel),
        _ => Err(anyhow!(
            "Phone number `{}` does not belong to a supported network",
            normalized
        )),
    }
}

/// Convenience for request handlers: normalize then detect.
pub fn parse_phone(raw: &str) -> anyhow::Result<(String, Network)> {
    let phone = normalize_phone(raw)?;
    let network = detect_network(&phone)?;
    Ok((phone, network))
}
