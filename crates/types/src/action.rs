//! API operations issued by virtual users.

use std::fmt;

/// A single API operation.
///
/// Each kind maps to exactly one endpoint and one metrics label. Purchases
/// share a single label regardless of the item bought so that per-item
/// cardinality does not fragment the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKind {
    /// `POST /api/auth`
    Authenticate,
    /// `POST /api/sendCoin`
    Transfer,
    /// `GET /api/buy/{item}`
    Purchase,
    /// `GET /api/info`
    Inquire,
}

impl ActionKind {
    /// All action kinds, in report order.
    pub const ALL: [ActionKind; 4] = [
        ActionKind::Authenticate,
        ActionKind::Transfer,
        ActionKind::Purchase,
        ActionKind::Inquire,
    ];

    /// Metrics label for this action.
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::Authenticate => "/api/auth",
            ActionKind::Transfer => "/api/sendCoin",
            ActionKind::Purchase => "/api/buy/[item]",
            ActionKind::Inquire => "/api/info",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Authenticate => "authenticate",
            ActionKind::Transfer => "transfer",
            ActionKind::Purchase => "purchase",
            ActionKind::Inquire => "inquire",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_labels_are_distinct() {
        let labels: HashSet<_> = ActionKind::ALL.iter().map(|k| k.label()).collect();
        assert_eq!(labels.len(), ActionKind::ALL.len());
    }

    #[test]
    fn test_purchase_label_is_item_independent() {
        assert!(!ActionKind::Purchase.label().contains("t-shirt"));
        assert_eq!(ActionKind::Purchase.label(), "/api/buy/[item]");
    }
}
