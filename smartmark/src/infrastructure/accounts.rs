// smartmark/src/infrastructure/accounts.rs
use crate::config::AccountSettings;
use crate::domain::error::{ProviderError, ProviderResult};
use crate::domain::session_provider::AuthProvider;
use std::collections::HashMap;

/// Stands in for the external identity provider of the local backends:
/// maps a provider name to the account that signs in through it.
#[derive(Debug, Clone, Default)]
pub struct AccountDirectory {
    accounts: HashMap<AuthProvider, AccountSettings>,
}

impl AccountDirectory {
    pub fn new(accounts: &[AccountSettings]) -> Self {
        Self {
            accounts: accounts
                .iter()
                .map(|a| (AuthProvider::new(&a.provider), a.clone()))
                .collect(),
        }
    }

    pub fn resolve(&self, provider: &AuthProvider) -> ProviderResult<&AccountSettings> {
        self.accounts
            .get(provider)
            .ok_or_else(|| ProviderError::UnknownIdentityProvider(provider.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_configured_account_when_resolve_then_found_case_insensitively() {
        let directory = AccountDirectory::new(&[AccountSettings {
            provider: "Google".to_string(),
            email: "jane@example.com".to_string(),
            full_name: None,
            avatar_url: None,
        }]);
        let account = directory.resolve(&AuthProvider::google()).unwrap();
        assert_eq!(account.email, "jane@example.com");
    }

    #[test]
    fn given_unknown_provider_when_resolve_then_error() {
        let directory = AccountDirectory::default();
        assert_eq!(
            directory.resolve(&AuthProvider::new("github")).unwrap_err(),
            ProviderError::UnknownIdentityProvider("github".to_string())
        );
    }
}
