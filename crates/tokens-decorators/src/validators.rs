//! Built-in validators.
//!
//! Validators see the text of the captured value. `Null` and empty values
//! fail every validator except `IsNot`. Arrays pass only when every element
//! passes.

use crate::datetime::{parse_date_time, parse_loose_date_time};
use crate::{number_arg, required_arg, DecoratorError, Validator, Value};
use regex::Regex;

fn check_text<F>(value: &Value, f: F) -> Result<bool, DecoratorError>
where
    F: Fn(&str) -> Result<bool, DecoratorError>,
{
    check_text_dyn(value, &f)
}

fn check_text_dyn(
    value: &Value,
    f: &dyn Fn(&str) -> Result<bool, DecoratorError>,
) -> Result<bool, DecoratorError> {
    match value {
        Value::Null => Ok(false),
        Value::Array(items) if items.is_empty() => Ok(false),
        Value::Array(items) => {
            for item in items {
                if !check_text_dyn(item, f)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        other => {
            let text = other.to_text();
            if text.is_empty() {
                Ok(false)
            } else {
                f(&text)
            }
        }
    }
}

/// Digits with an optional sign, decimal point and thousands separators.
#[derive(Debug, Default)]
pub struct IsNumeric;

impl Validator for IsNumeric {
    fn validate(&self, value: &Value, _args: &[String]) -> Result<bool, DecoratorError> {
        if let Value::Number(_) = value {
            return Ok(true);
        }
        check_text(value, |s| Ok(is_numeric(s.trim())))
    }
}

fn is_numeric(s: &str) -> bool {
    let unsigned = s.strip_prefix(['-', '+']).unwrap_or(s);
    if !unsigned.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }
    if !unsigned
        .chars()
        .all(|c| c.is_ascii_digit() || c == '.' || c == ',')
    {
        return false;
    }
    unsigned.replace(',', "").parse::<f64>().is_ok()
}

#[derive(Debug, Default)]
pub struct IsNotEmpty;

impl Validator for IsNotEmpty {
    fn validate(&self, value: &Value, _args: &[String]) -> Result<bool, DecoratorError> {
        check_text(value, |s| Ok(!s.trim().is_empty()))
    }
}

/// `IsNot(value, ...)`: the value equals none of the arguments, ignoring
/// case. An empty value passes.
#[derive(Debug, Default)]
pub struct IsNot;

impl Validator for IsNot {
    fn validate(&self, value: &Value, args: &[String]) -> Result<bool, DecoratorError> {
        required_arg("IsNot", args, 0, "value")?;
        let text = value.to_text();
        let text = text.trim();
        Ok(!args.iter().any(|a| a.trim().eq_ignore_ascii_case(text)))
    }
}

#[derive(Debug, Default)]
pub struct IsDomainName;

impl Validator for IsDomainName {
    fn validate(&self, value: &Value, _args: &[String]) -> Result<bool, DecoratorError> {
        check_text(value, |s| Ok(is_domain_name(s)))
    }
}

pub(crate) fn is_domain_name(s: &str) -> bool {
    let s = s.strip_suffix('.').unwrap_or(s);
    if s.is_empty() || s.len() > 253 {
        return false;
    }
    let labels: Vec<&str> = s.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_alphanumeric() || c == '-')
    });
    let tld = labels[labels.len() - 1];
    labels_ok && tld.len() >= 2 && !tld.chars().all(|c| c.is_ascii_digit())
}

#[derive(Debug, Default)]
pub struct IsEmail;

impl Validator for IsEmail {
    fn validate(&self, value: &Value, _args: &[String]) -> Result<bool, DecoratorError> {
        check_text(value, |s| Ok(is_email(s)))
    }
}

fn is_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && local.len() <= 64
        && !local.starts_with('.')
        && !local.ends_with('.')
        && !local.contains("..")
        && local
            .chars()
            .all(|c| c.is_alphanumeric() || "!#$%&'*+-/=?^_`{|}~.".contains(c))
        && is_domain_name(domain)
}

/// An absolute `http`, `https` or `ftp` URL with a domain, IPv4 or
/// `localhost` host.
#[derive(Debug, Default)]
pub struct IsUrl;

impl Validator for IsUrl {
    fn validate(&self, value: &Value, _args: &[String]) -> Result<bool, DecoratorError> {
        check_text(value, |s| Ok(is_url(s)))
    }
}

fn is_url(s: &str) -> bool {
    let Some((scheme, rest)) = s.split_once("://") else {
        return false;
    };
    if !["http", "https", "ftp"]
        .iter()
        .any(|known| scheme.eq_ignore_ascii_case(known))
    {
        return false;
    }
    if rest.chars().any(char::is_whitespace) {
        return false;
    }
    let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
    let authority = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    let host = match authority.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => host,
        Some(_) => return false,
        None => authority,
    };
    host.eq_ignore_ascii_case("localhost") || is_ipv4(host) || is_domain_name(host)
}

fn is_ipv4(s: &str) -> bool {
    let octets: Vec<&str> = s.split('.').collect();
    octets.len() == 4
        && octets
            .iter()
            .all(|o| !o.is_empty() && o.len() <= 3 && o.parse::<u8>().is_ok())
}

/// Any `scheme://rest` or `www.` prefixed address without whitespace.
#[derive(Debug, Default)]
pub struct IsLooseAbsoluteUrl;

impl Validator for IsLooseAbsoluteUrl {
    fn validate(&self, value: &Value, _args: &[String]) -> Result<bool, DecoratorError> {
        check_text(value, |s| {
            if s.chars().any(char::is_whitespace) {
                return Ok(false);
            }
            if let Some(rest) = s.strip_prefix("www.") {
                return Ok(!rest.is_empty());
            }
            Ok(match s.split_once("://") {
                Some((scheme, rest)) => {
                    !scheme.is_empty()
                        && scheme.chars().all(|c| c.is_ascii_alphabetic())
                        && !rest.is_empty()
                }
                None => false,
            })
        })
    }
}

/// Between 7 and 15 digits, optionally grouped with spaces, dots, dashes or
/// parentheses, with an optional leading `+`.
#[derive(Debug, Default)]
pub struct IsPhoneNumber;

impl Validator for IsPhoneNumber {
    fn validate(&self, value: &Value, _args: &[String]) -> Result<bool, DecoratorError> {
        check_text(value, |s| {
            let s = s.trim();
            let body = s.strip_prefix('+').unwrap_or(s);
            if !body
                .chars()
                .all(|c| c.is_ascii_digit() || " .-()".contains(c))
            {
                return Ok(false);
            }
            let digits = body.chars().filter(|c| c.is_ascii_digit()).count();
            Ok((7..=15).contains(&digits))
        })
    }
}

/// `IsDateTime(format, ...)`: parses with at least one of the formats.
#[derive(Debug, Default)]
pub struct IsDateTime;

impl Validator for IsDateTime {
    fn validate(&self, value: &Value, args: &[String]) -> Result<bool, DecoratorError> {
        required_arg("IsDateTime", args, 0, "format")?;
        check_text(value, |s| Ok(parse_date_time(s, args).is_some()))
    }
}

#[derive(Debug, Default)]
pub struct IsLooseDateTime;

impl Validator for IsLooseDateTime {
    fn validate(&self, value: &Value, _args: &[String]) -> Result<bool, DecoratorError> {
        check_text(value, |s| Ok(parse_loose_date_time(s).is_some()))
    }
}

#[derive(Debug, Default)]
pub struct MinLength;

impl Validator for MinLength {
    fn validate(&self, value: &Value, args: &[String]) -> Result<bool, DecoratorError> {
        let min = number_arg("MinLength", args, 0, "length")?;
        check_text(value, |s| Ok(s.chars().count() >= min))
    }
}

#[derive(Debug, Default)]
pub struct MaxLength;

impl Validator for MaxLength {
    fn validate(&self, value: &Value, args: &[String]) -> Result<bool, DecoratorError> {
        let max = number_arg("MaxLength", args, 0, "length")?;
        check_text(value, |s| Ok(s.chars().count() <= max))
    }
}

#[derive(Debug, Default)]
pub struct Contains;

impl Validator for Contains {
    fn validate(&self, value: &Value, args: &[String]) -> Result<bool, DecoratorError> {
        let needle = required_arg("Contains", args, 0, "value")?;
        check_text(value, |s| Ok(s.contains(needle)))
    }
}

#[derive(Debug, Default)]
pub struct StartsWith;

impl Validator for StartsWith {
    fn validate(&self, value: &Value, args: &[String]) -> Result<bool, DecoratorError> {
        let prefix = required_arg("StartsWith", args, 0, "value")?;
        check_text(value, |s| Ok(s.starts_with(prefix)))
    }
}

#[derive(Debug, Default)]
pub struct EndsWith;

impl Validator for EndsWith {
    fn validate(&self, value: &Value, args: &[String]) -> Result<bool, DecoratorError> {
        let suffix = required_arg("EndsWith", args, 0, "value")?;
        check_text(value, |s| Ok(s.ends_with(suffix)))
    }
}

/// `Matches(pattern)`: the whole value matches the regular expression.
#[derive(Debug, Default)]
pub struct Matches;

impl Validator for Matches {
    fn validate(&self, value: &Value, args: &[String]) -> Result<bool, DecoratorError> {
        let pattern = required_arg("Matches", args, 0, "pattern")?;
        let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
            DecoratorError::InvalidArgument {
                decorator: "Matches",
                value: format!("{} ({})", pattern, e),
                expected: "a regular expression",
            }
        })?;
        check_text(value, |s| Ok(regex.is_match(s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(v: &dyn Validator, value: &str, args: &[&str]) -> bool {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        v.validate(&Value::from(value), &args).unwrap()
    }

    #[test]
    fn test_is_numeric() {
        assert!(check(&IsNumeric, "67890", &[]));
        assert!(check(&IsNumeric, "-1,234.5", &[]));
        assert!(!check(&IsNumeric, "(not a number)", &[]));
        assert!(!check(&IsNumeric, "", &[]));
        assert!(!check(&IsNumeric, "inf", &[]));
        assert!(!IsNumeric.validate(&Value::Null, &[]).unwrap());
    }

    #[test]
    fn test_is_domain_name() {
        assert!(check(&IsDomainName, "example.com", &[]));
        assert!(check(&IsDomainName, "ns1.sub-domain.example.co.uk", &[]));
        assert!(!check(&IsDomainName, "localhost", &[]));
        assert!(!check(&IsDomainName, "-bad.com", &[]));
        assert!(!check(&IsDomainName, "has space.com", &[]));
        assert!(!check(&IsDomainName, "1.2.3.4", &[]));
    }

    #[test]
    fn test_is_email() {
        assert!(check(&IsEmail, "abuse@example.com", &[]));
        assert!(!check(&IsEmail, "abuse@", &[]));
        assert!(!check(&IsEmail, "no-at-sign.com", &[]));
        assert!(!check(&IsEmail, "a..b@example.com", &[]));
    }

    #[test]
    fn test_is_url() {
        assert!(check(&IsUrl, "https://example.com/path?q=1", &[]));
        assert!(check(&IsUrl, "http://localhost:8080", &[]));
        assert!(check(&IsUrl, "http://10.0.0.1/", &[]));
        assert!(!check(&IsUrl, "mailto:someone@example.com", &[]));
        assert!(!check(&IsUrl, "https://exa mple.com", &[]));
    }

    #[test]
    fn test_is_loose_absolute_url() {
        assert!(check(&IsLooseAbsoluteUrl, "whois://whois.example.net", &[]));
        assert!(check(&IsLooseAbsoluteUrl, "www.example.com", &[]));
        assert!(!check(&IsLooseAbsoluteUrl, "example.com", &[]));
    }

    #[test]
    fn test_is_phone_number() {
        assert!(check(&IsPhoneNumber, "+44.2079460000", &[]));
        assert!(check(&IsPhoneNumber, "(555) 123-4567", &[]));
        assert!(!check(&IsPhoneNumber, "12345", &[]));
        assert!(!check(&IsPhoneNumber, "555-CALL-NOW", &[]));
    }

    #[test]
    fn test_lengths() {
        assert!(check(&MaxLength, "abc", &["3"]));
        assert!(!check(&MaxLength, "abcd", &["3"]));
        assert!(check(&MinLength, "abcd", &["3"]));
    }

    #[test]
    fn test_max_length_without_argument_is_error() {
        let result = MaxLength.validate(&Value::from("abc"), &[]);
        assert!(matches!(
            result,
            Err(DecoratorError::MissingArgument {
                decorator: "MaxLength",
                ..
            })
        ));
    }

    #[test]
    fn test_string_predicates() {
        assert!(check(&Contains, "hello world", &["o w"]));
        assert!(check(&StartsWith, "hello", &["he"]));
        assert!(check(&EndsWith, "hello", &["lo"]));
        assert!(!check(&IsNot, "REDACTED", &["n/a", "redacted"]));
        assert!(check(&IsNot, "Alice", &["n/a"]));
    }

    #[test]
    fn test_matches() {
        assert!(check(&Matches, "AB-123", &[r"[A-Z]{2}-\d+"]));
        assert!(!check(&Matches, "xAB-123", &[r"[A-Z]{2}-\d+"]));
        let bad = Matches.validate(&Value::from("a"), &["(".to_string()]);
        assert!(matches!(bad, Err(DecoratorError::InvalidArgument { .. })));
    }

    #[test]
    fn test_date_time_validators() {
        assert!(check(&IsDateTime, "2019-01-02", &["yyyy-MM-dd"]));
        assert!(!check(&IsDateTime, "2019-13-02", &["yyyy-MM-dd"]));
        assert!(check(&IsLooseDateTime, "02-Jan-2019", &[]));
        assert!(!check(&IsLooseDateTime, "yesterday", &[]));
    }

    #[test]
    fn test_arrays_require_every_element() {
        let domains = Value::Array(vec![Value::from("a.com"), Value::from("b.org")]);
        assert!(IsDomainName.validate(&domains, &[]).unwrap());
        let mixed = Value::Array(vec![Value::from("a.com"), Value::from("nope")]);
        assert!(!IsDomainName.validate(&mixed, &[]).unwrap());
    }
}
