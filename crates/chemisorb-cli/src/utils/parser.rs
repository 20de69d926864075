use chemisorb::core::geometry::sites::SiteKind;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid format for '{0}'. Expected KEY=VALUE.")]
    InvalidKeyValue(String),

    #[error("Invalid slab size '{0}'. Expected NXxNYxLAYERS (e.g., '2x2x4').")]
    InvalidSize(String),

    #[error("Invalid site log '{0}'. Expected KIND=PATH (e.g., 'bridge=site-bridge/oracle.txt').")]
    InvalidSiteLog(String),

    #[error("Unknown site kind '{0}'. Expected 'on-top' or 'bridge'.")]
    UnknownSite(String),
}

/// Splits `KEY=VALUE` at the first `=`.
pub fn parse_key_value(input: &str) -> Result<(&str, &str), ParseError> {
    match input.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value.trim())),
        _ => Err(ParseError::InvalidKeyValue(input.to_string())),
    }
}

/// Parses a slab size such as `2x2x4`.
pub fn parse_size(input: &str) -> Result<[usize; 3], ParseError> {
    let parts: Vec<usize> = input
        .split(['x', 'X'])
        .map(|p| p.trim().parse::<usize>())
        .collect::<Result<_, _>>()
        .map_err(|_| ParseError::InvalidSize(input.to_string()))?;
    match parts.as_slice() {
        &[nx, ny, layers] if nx > 0 && ny > 0 && layers > 0 => Ok([nx, ny, layers]),
        _ => Err(ParseError::InvalidSize(input.to_string())),
    }
}

pub fn parse_site(input: &str) -> Result<SiteKind, ParseError> {
    input
        .parse()
        .map_err(|_| ParseError::UnknownSite(input.to_string()))
}

/// Parses a comma-separated site list, dropping duplicates but keeping order.
pub fn parse_sites(inputs: &[String]) -> Result<Vec<SiteKind>, ParseError> {
    let mut kinds = Vec::new();
    for input in inputs.iter().filter(|s| !s.trim().is_empty()) {
        let kind = parse_site(input)?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

/// Parses `KIND=PATH` as given to `--site-log`.
pub fn parse_site_log(input: &str) -> Result<(SiteKind, PathBuf), ParseError> {
    let (kind, path) =
        parse_key_value(input).map_err(|_| ParseError::InvalidSiteLog(input.to_string()))?;
    if path.is_empty() {
        return Err(ParseError::InvalidSiteLog(input.to_string()));
    }
    Ok((parse_site(kind)?, PathBuf::from(path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_value_splits_at_first_equals() {
        assert_eq!(parse_key_value("oracle.extra.x=a=b"), Ok(("oracle.extra.x", "a=b")));
        assert!(parse_key_value("relax.fmax").is_err());
        assert!(parse_key_value("=1").is_err());
    }

    #[test]
    fn size_requires_three_positive_repeats() {
        assert_eq!(parse_size("2x2x4"), Ok([2, 2, 4]));
        assert_eq!(parse_size("3X3X5"), Ok([3, 3, 5]));
        assert!(parse_size("2x2").is_err());
        assert!(parse_size("2x0x4").is_err());
        assert!(parse_size("twoxtwo").is_err());
    }

    #[test]
    fn sites_keep_order_and_drop_duplicates() {
        let input = vec!["bridge".to_string(), "top".to_string(), "bridge".to_string()];
        assert_eq!(parse_sites(&input), Ok(vec![SiteKind::Bridge, SiteKind::OnTop]));
        assert_eq!(
            parse_sites(&["hollow".to_string()]),
            Err(ParseError::UnknownSite("hollow".to_string()))
        );
    }

    #[test]
    fn site_log_pairs_kind_and_path() {
        assert_eq!(
            parse_site_log("on-top=logs/top.txt"),
            Ok((SiteKind::OnTop, PathBuf::from("logs/top.txt")))
        );
        assert!(parse_site_log("bridge=").is_err());
        assert!(parse_site_log("bridge").is_err());
    }
}
