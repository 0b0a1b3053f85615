use crate::data_structures::{AccountGroup, AccountIdentity};

/// Namespace tag prepended to every synthetic billing account id.
pub const ACCOUNT_ID_PREFIX: &str = "BA";

pub struct AccountIdentifier {
    prefix: String,
}

impl AccountIdentifier {
    pub fn new() -> Self {
        Self {
            prefix: ACCOUNT_ID_PREFIX.to_string(),
        }
    }

    /// Resolves a raw account name (and optional duplicate suffix) into the
    /// display name and id used in the report. Accounts sharing a name but
    /// exported with different suffixes always get distinct identities.
    pub fn resolve(&self, account_name: &str, suffix: Option<&str>) -> AccountIdentity {
        let base_id = self.normalize(account_name);
        let group = AccountGroup::new(account_name, suffix);

        match suffix {
            Some(n) => AccountIdentity::new(
                group,
                format!("{} {}", account_name, n),
                format!("{}-{}-{}", self.prefix, base_id, n),
            ),
            None => AccountIdentity::new(
                group,
                account_name.to_string(),
                format!("{}-{}", self.prefix, base_id),
            ),
        }
    }

    fn normalize(&self, account_name: &str) -> String {
        let lowered = account_name.to_lowercase();
        let kept: String = lowered
            .chars()
            .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() || *c == '-')
            .collect();

        kept.split_whitespace().collect::<Vec<_>>().join("-")
    }
}

impl Default for AccountIdentifier {
    fn default() -> Self {
        Self::new()
    }
}
