//! Tokenizer for `Content-Type` and `Content-Disposition` header values.

use std::collections::BTreeMap;

use crate::constants;

/// Parameters of a header value. Names are lower-cased; values are kept as
/// sent, minus quoting.
pub type Parameters = BTreeMap<String, String>;

/// A header value split into its leading value and its parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedValue {
    /// The lower-cased leading value, e.g. `text/plain` or `form-data`.
    /// Empty if the header was empty or malformed.
    pub value: String,
    pub parameters: Parameters,
}

/// Parses a header value of the form `value; name=token; name="quoted"`.
///
/// With `is_disposition` the leading value must be a single token and a
/// backslash inside a quoted string only escapes `"` or `\`, so that paths
/// such as `C:\dir\file.txt` sent unescaped by browsers survive. Otherwise the
/// leading value must be `type/subtype` and a backslash escapes any character.
///
/// Extended parameters like `filename*=utf-8''...` are stored undecoded under
/// their starred name.
///
/// # Examples
///
/// ```
/// use multipasta::parse_params;
///
/// let parsed = parse_params(r#"form-data; name="field"; filename="a.txt""#, true);
/// assert_eq!(parsed.value, "form-data");
/// assert_eq!(parsed.parameters["name"], "field");
/// assert_eq!(parsed.parameters["filename"], "a.txt");
/// ```
pub fn parse_params(input: &str, is_disposition: bool) -> ParsedValue {
    let (head, mut rest) = match input.find(';') {
        Some(idx) => (&input[..idx], &input[idx + 1..]),
        None => (input, ""),
    };

    let value = head.trim_matches(is_ows).to_ascii_lowercase();
    let valid = if is_disposition {
        is_token(&value)
    } else {
        is_media_type(&value)
    };

    if !valid {
        return ParsedValue::default();
    }

    let mut parameters = Parameters::new();

    loop {
        rest = rest.trim_start_matches(|c: char| is_ows(c) || c == ';');
        if rest.is_empty() {
            break;
        }

        let end = rest.find(|c: char| c == '=' || c == ';').unwrap_or_else(|| rest.len());
        let name = rest[..end].trim_matches(is_ows).to_ascii_lowercase();
        rest = &rest[end..];

        if !rest.starts_with('=') {
            continue;
        }
        rest = rest[1..].trim_start_matches(is_ows);

        let param_value = if rest.starts_with('"') {
            let (unquoted, after) = read_quoted(&rest[1..], is_disposition);
            rest = match after.find(';') {
                Some(idx) => &after[idx..],
                None => "",
            };
            unquoted
        } else {
            let end = rest.find(';').unwrap_or_else(|| rest.len());
            let token = rest[..end].trim_matches(is_ows).to_owned();
            rest = &rest[end..];
            token
        };

        if is_token(&name) {
            parameters.entry(name).or_insert(param_value);
        }
    }

    ParsedValue { value, parameters }
}

/// Reads a quoted string whose opening quote was already consumed. Returns
/// the unescaped content and the input after the closing quote.
fn read_quoted(input: &str, is_disposition: bool) -> (String, &str) {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        match c {
            '"' => return (out, &input[idx + 1..]),
            '\\' => match chars.peek() {
                Some(&(_, next)) if !is_disposition || next == '"' || next == '\\' => {
                    out.push(next);
                    chars.next();
                }
                _ => out.push('\\'),
            },
            c => out.push(c),
        }
    }

    // unterminated
    (out, "")
}

fn is_ows(c: char) -> bool {
    c == ' ' || c == '\t'
}

fn is_token(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b != b':' && constants::HEADER_NAME_CHARS[b as usize])
}

fn is_media_type(s: &str) -> bool {
    match s.find('/') {
        Some(idx) => is_token(&s[..idx]) && is_token(&s[idx + 1..]),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Parameters {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_content_type() {
        let parsed = parse_params("text/plain; charset=utf-8", false);
        assert_eq!(parsed.value, "text/plain");
        assert_eq!(parsed.parameters, params(&[("charset", "utf-8")]));

        let parsed = parse_params("Text/HTML ;Charset=\"UTF-8\" ; q = 1", false);
        assert_eq!(parsed.value, "text/html");
        assert_eq!(parsed.parameters, params(&[("charset", "UTF-8"), ("q", "1")]));

        let parsed = parse_params("multipart/form-data; boundary=----WebKitFormBoundaryTB2MiQ36fnSJlrhY", false);
        assert_eq!(parsed.value, "multipart/form-data");
        assert_eq!(parsed.parameters["boundary"], "----WebKitFormBoundaryTB2MiQ36fnSJlrhY");
    }

    #[test]
    fn test_invalid_leading_value() {
        assert_eq!(parse_params("", false), ParsedValue::default());
        assert_eq!(parse_params("   ", true), ParsedValue::default());
        assert_eq!(parse_params("text; charset=utf-8", false), ParsedValue::default());
        assert_eq!(parse_params("text/; charset=utf-8", false), ParsedValue::default());
        assert_eq!(parse_params("form data; name=a", true), ParsedValue::default());
        assert_eq!(parse_params("form/data; name=a", true), ParsedValue::default());
    }

    #[test]
    fn test_content_disposition() {
        let parsed = parse_params(r#"form-data; name="my field"; filename="file abc.txt""#, true);
        assert_eq!(parsed.value, "form-data");
        assert_eq!(
            parsed.parameters,
            params(&[("name", "my field"), ("filename", "file abc.txt")])
        );

        let parsed = parse_params("form-data; name=\"কখগ\"; filename=\"你好.txt\"", true);
        assert_eq!(parsed.parameters, params(&[("name", "কখগ"), ("filename", "你好.txt")]));

        let parsed = parse_params("Form-Data; NAME=plain", true);
        assert_eq!(parsed.value, "form-data");
        assert_eq!(parsed.parameters, params(&[("name", "plain")]));
    }

    #[test]
    fn test_backslashes() {
        let parsed = parse_params(r#"form-data; name="f"; filename="C:\absolute\1k_b.dat""#, true);
        assert_eq!(parsed.parameters["filename"], r"C:\absolute\1k_b.dat");

        let parsed = parse_params(r#"form-data; name="say \"hi\"""#, true);
        assert_eq!(parsed.parameters["name"], r#"say "hi""#);

        let parsed = parse_params(r#"a/b; x="q\"t\z""#, false);
        assert_eq!(parsed.parameters["x"], r#"q"tz"#);
    }

    #[test]
    fn test_quoted_semicolon() {
        let parsed = parse_params(r#"form-data; name="a;b"; filename=x"#, true);
        assert_eq!(parsed.parameters, params(&[("name", "a;b"), ("filename", "x")]));
    }

    #[test]
    fn test_extended_parameter_is_raw() {
        let parsed = parse_params("form-data; name=\"file\"; filename*=utf-8''n%C3%A4me.txt", true);
        assert_eq!(parsed.parameters["filename*"], "utf-8''n%C3%A4me.txt");
    }

    #[test]
    fn test_odd_parameters() {
        let parsed = parse_params("form-data; ; flag; name=a; name=b; =c; bad name=d", true);
        assert_eq!(parsed.parameters, params(&[("name", "a")]));

        let parsed = parse_params("form-data; name=\"unterminated", true);
        assert_eq!(parsed.parameters, params(&[("name", "unterminated")]));

        let parsed = parse_params("form-data; name=", true);
        assert_eq!(parsed.parameters, params(&[("name", "")]));
    }
}
