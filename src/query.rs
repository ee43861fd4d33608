use anyhow::{Result, anyhow};
use serde::Deserialize;
use serde_json::Value;

/// Builds `?k=v&...` in insertion order. Values are percent-encoded on the way in.
#[derive(Debug, Default)]
pub struct QueryString {
    parts: Vec<String>,
}

impl QueryString {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: &str, value: &str) {
        let value = urlencoding::encode(value);
        self.parts.push(format!("{key}={value}"));
    }

    /// For values that are already encoded.
    pub fn push_encoded(&mut self, key: &str, encoded: String) {
        self.parts.push(format!("{key}={encoded}"));
    }

    pub fn push_non_empty(&mut self, key: &str, value: &str) {
        if !value.is_empty() {
            self.push(key, value);
        }
    }

    /// `-1` (and anything negative) means unset.
    pub fn push_index(&mut self, key: &str, value: i64) {
        if value >= 0 {
            self.push(key, &value.to_string());
        }
    }

    pub fn push_terms(&mut self, key: &str, terms: &[QueryTerm]) {
        for term in terms {
            self.push_encoded(key, term.to_url_query());
        }
    }

    /// One `key=` pair per comma-separated item.
    pub fn push_list(&mut self, key: &str, list: &str) {
        for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            self.push(key, item);
        }
    }

    pub fn append_to(self, path: String) -> String {
        if self.parts.is_empty() {
            path
        } else {
            format!("{}?{}", path, self.parts.join("&"))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum QueryOp {
    Equal,
    NotEqual,
    /// Case insensitive ILIKE pattern, e.g. `%rating%`.
    MatchPattern,
    NotMatchPattern,
    /// Case insensitive POSIX regular expression.
    MatchRegExp,
    NotMatchRegExp,
    GreaterThan,
    GreaterEqual,
    LessThan,
    LessEqual,
}

impl QueryOp {
    // Longest symbols first so prefix matching picks `!?` over `!`.
    const ALL: [QueryOp; 10] = [
        QueryOp::NotMatchPattern,
        QueryOp::NotMatchRegExp,
        QueryOp::GreaterEqual,
        QueryOp::LessEqual,
        QueryOp::Equal,
        QueryOp::NotEqual,
        QueryOp::MatchPattern,
        QueryOp::MatchRegExp,
        QueryOp::GreaterThan,
        QueryOp::LessThan,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "!",
            Self::MatchPattern => "?",
            Self::NotMatchPattern => "!?",
            Self::MatchRegExp => "~",
            Self::NotMatchRegExp => "!~",
            Self::GreaterThan => ">",
            Self::GreaterEqual => ">=",
            Self::LessThan => "<",
            Self::LessEqual => "<=",
        }
    }

    /// Equality is implied on the wire.
    fn wire(self) -> &'static str {
        match self {
            Self::Equal => "",
            other => other.symbol(),
        }
    }
}

impl TryFrom<String> for QueryOp {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.symbol() == value)
            .ok_or_else(|| anyhow!("unknown query operator {value:?}"))
    }
}

/// One `aspectQuery`/`aspectOrQuery` condition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryTerm {
    pub path: String,
    pub op: QueryOp,
    pub value: Value,
}

impl QueryTerm {
    /// Parses the command-line form `path:[op]value`.
    pub fn parse(raw: &str) -> Result<Self> {
        let (path, rest) = raw
            .split_once(':')
            .ok_or_else(|| anyhow!("query term {raw:?} must look like path:[op]value"))?;
        if path.is_empty() {
            return Err(anyhow!("query term {raw:?} has an empty path"));
        }
        let (op, value) = QueryOp::ALL
            .into_iter()
            .find_map(|op| rest.strip_prefix(op.symbol()).map(|v| (op, v)))
            .unwrap_or((QueryOp::Equal, rest));
        Ok(Self {
            path: path.to_string(),
            op,
            value: Value::String(value.to_string()),
        })
    }

    /// `:` separates path from value, so colons inside the value are escaped
    /// before the whole term is escaped again.
    pub fn to_url_query(&self) -> String {
        let value = match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let value = value.replace(':', "%3A");
        let term = format!("{}:{}{}", self.path, self.op.wire(), value);
        urlencoding::encode(&term).into_owned()
    }
}
