use serde::{Deserialize, Serialize};

/// Classification assigned to a subscription state transition. Drives the
/// reporting aggregations (expansion, contraction, churn).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    New,
    Upgrade,
    Downgrade,
    Churn,
    Renewal,
    NoChange,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::New => "new",
            ChangeType::Upgrade => "upgrade",
            ChangeType::Downgrade => "downgrade",
            ChangeType::Churn => "churn",
            ChangeType::Renewal => "renewal",
            ChangeType::NoChange => "no_change",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "new" => ChangeType::New,
            "upgrade" => ChangeType::Upgrade,
            "downgrade" => ChangeType::Downgrade,
            "churn" => ChangeType::Churn,
            "renewal" => ChangeType::Renewal,
            _ => ChangeType::NoChange,
        }
    }
}
