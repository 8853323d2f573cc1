use serde_json::Value;

/// RFC 6901 pointer into a dependency result, with its reference tokens decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPointer {
    raw: String,
    tokens: Vec<String>,
}

impl JsonPointer {
    /// `""` addresses the whole result; `#/a/b` is read as `/a/b`.
    pub fn parse(fragment: &str) -> Result<Self, JsonPointerError> {
        let raw = fragment.strip_prefix('#').unwrap_or(fragment);
        let tokens = match raw {
            "" => Vec::new(),
            _ => {
                let body = raw.strip_prefix('/').ok_or(JsonPointerError::InvalidPrefix)?;
                body.split('/').map(decode_token).collect::<Result<_, _>>()?
            }
        };
        Ok(Self {
            raw: raw.to_string(),
            tokens,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_root(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn resolve<'a>(&self, doc: &'a Value) -> Option<&'a Value> {
        self.tokens.iter().try_fold(doc, |node, token| match node {
            Value::Object(map) => map.get(token),
            Value::Array(items) => array_index(token).and_then(|i| items.get(i)),
            _ => None,
        })
    }
}

fn decode_token(segment: &str) -> Result<String, JsonPointerError> {
    let mut out = String::with_capacity(segment.len());
    let mut chars = segment.chars();
    while let Some(ch) = chars.next() {
        match (ch, ch == '~') {
            (_, false) => out.push(ch),
            (_, true) => match chars.next() {
                Some('0') => out.push('~'),
                Some('1') => out.push('/'),
                _ => return Err(JsonPointerError::InvalidEscape),
            },
        }
    }
    Ok(out)
}

/// Array indices are plain decimal without leading zeros.
fn array_index(token: &str) -> Option<usize> {
    if token.is_empty() || (token.len() > 1 && token.starts_with('0')) {
        return None;
    }
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JsonPointerError {
    #[error("json pointer must be empty or start with '/'")]
    InvalidPrefix,
    #[error("json pointer has a bad escape (only ~0 and ~1 are allowed)")]
    InvalidEscape,
}
