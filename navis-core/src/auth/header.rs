use super::AuthFailure;

/// Authorization scheme name for signed device requests.
pub const AUTH_SCHEME: &str = "Navis";

/// Parsed fields of a `Navis deviceId="…",signature="…",timestamp="…"`
/// authorization value.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedAuthorization {
    pub device_id: String,
    pub signature: String,
    pub timestamp: String,
}

/// Parse a signed authorization value.
///
/// Field order is not significant and quoting is optional; unquoting strips
/// exactly one matching pair of outer quotes. A wrong scheme or any missing
/// field is a malformed header.
pub fn parse_authorization(value: &str) -> Result<SignedAuthorization, AuthFailure> {
    let value = value.trim();
    let (scheme, params) = value
        .split_once(char::is_whitespace)
        .ok_or(AuthFailure::InvalidAuthHeader)?;

    if scheme != AUTH_SCHEME {
        return Err(AuthFailure::InvalidAuthHeader);
    }

    let mut device_id = None;
    let mut signature = None;
    let mut timestamp = None;

    for pair in params.split(',') {
        let Some((key, raw)) = pair.split_once('=') else {
            continue;
        };
        let field = unquote(raw.trim());
        match key.trim() {
            "deviceId" => device_id = Some(field),
            "signature" => signature = Some(field),
            "timestamp" => timestamp = Some(field),
            _ => {}
        }
    }

    match (device_id, signature, timestamp) {
        (Some(device_id), Some(signature), Some(timestamp)) => Ok(SignedAuthorization {
            device_id,
            signature,
            timestamp,
        }),
        _ => Err(AuthFailure::InvalidAuthHeader),
    }
}

fn unquote(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        value[1..value.len() - 1].to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quoted_fields() {
        let parsed = parse_authorization(
            r#"Navis deviceId="dev-1",signature="c2ln",timestamp="2026-08-29T10:00:00Z""#,
        )
        .unwrap();
        assert_eq!(parsed.device_id, "dev-1");
        assert_eq!(parsed.signature, "c2ln");
        assert_eq!(parsed.timestamp, "2026-08-29T10:00:00Z");
    }

    #[test]
    fn test_parse_unquoted_fields() {
        let parsed =
            parse_authorization("Navis deviceId=dev-1,signature=c2ln,timestamp=ts").unwrap();
        assert_eq!(parsed.device_id, "dev-1");
    }

    #[test]
    fn test_field_order_is_insignificant() {
        let parsed =
            parse_authorization(r#"Navis timestamp="ts",deviceId="d",signature="s""#).unwrap();
        assert_eq!(parsed.device_id, "d");
        assert_eq!(parsed.signature, "s");
    }

    #[test]
    fn test_signature_keeps_base64_padding() {
        // split on the first '=' only, so padding survives
        let parsed =
            parse_authorization(r#"Navis deviceId="d",signature="YWJjZA==",timestamp="ts""#)
                .unwrap();
        assert_eq!(parsed.signature, "YWJjZA==");
    }

    #[test]
    fn test_wrong_scheme_rejected() {
        let err = parse_authorization(r#"Bearer deviceId="d",signature="s",timestamp="t""#)
            .unwrap_err();
        assert!(matches!(err, AuthFailure::InvalidAuthHeader));
    }

    #[test]
    fn test_missing_field_rejected() {
        let err = parse_authorization(r#"Navis deviceId="d",timestamp="t""#).unwrap_err();
        assert!(matches!(err, AuthFailure::InvalidAuthHeader));
    }

    #[test]
    fn test_unquote_strips_one_pair_only() {
        let parsed =
            parse_authorization(r#"Navis deviceId=""d"",signature="s",timestamp="t""#).unwrap();
        assert_eq!(parsed.device_id, r#""d""#);
    }
}
