use serde::{Deserialize, Serialize};

/// Which quote field an alert watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertKind {
    #[serde(rename = "price")]
    Price,
    #[serde(rename = "pct24")]
    Pct24,
}

impl AlertKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "price" => Some(Self::Price),
            "pct24" => Some(Self::Pct24),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Pct24 => "pct24",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Pct24 => "24h %",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Self::Price => "",
            Self::Pct24 => "%",
        }
    }
}

/// Comparison direction. Serialized as `>` / `<`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertOp {
    #[serde(rename = ">")]
    Above,
    #[serde(rename = "<")]
    Below,
}

impl AlertOp {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            ">" => Some(Self::Above),
            "<" => Some(Self::Below),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Above => ">",
            Self::Below => "<",
        }
    }

    /// Strict comparison, equality never matches.
    pub fn matches(self, current: f64, threshold: f64) -> bool {
        match self {
            Self::Above => current > threshold,
            Self::Below => current < threshold,
        }
    }
}

/// Canonical alert, the shape every stored record is normalized into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub symbol: String,

    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub op: AlertOp,
    pub value: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Body of `POST /api/alerts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAlert {
    pub symbol: String,

    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub op: AlertOp,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trigger {
    // HH:MM, UTC
    pub time: String,
    pub symbol: String,

    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub message: String,
    pub current: f64,
    pub op: AlertOp,
    pub value: f64,
    pub id: Option<String>,
}
