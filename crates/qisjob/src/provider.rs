//! Vendor accounts.
//!
//! The set of vendors is closed: each [`ProviderKind`] maps to one adapter
//! crate's [`Provider`] implementation.

use std::fmt;
use std::str::FromStr;

use qisjob_adapter_ddsim::DdsimProvider;
use qisjob_adapter_forest::ForestProvider;
use qisjob_adapter_ibm::IbmProvider;
use qisjob_adapter_qi::QiProvider;
use qisjob_hal::{Credentials, HalError, Provider};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::config::JobConfig;
use crate::error::{QisJobError, QisJobResult};

/// Supported vendors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    #[default]
    Ibmq,
    Qi,
    Forest,
    Mqt,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Ibmq,
        ProviderKind::Qi,
        ProviderKind::Forest,
        ProviderKind::Mqt,
    ];

    /// The name accepted by `--api-provider`.
    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::Ibmq => "IBMQ",
            ProviderKind::Qi => "QI",
            ProviderKind::Forest => "Forest",
            ProviderKind::Mqt => "MQT",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = QisJobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                QisJobError::argument(format!(
                    "Unknown API provider {s}, expected one of IBMQ, QI, Forest, MQT"
                ))
            })
    }
}

/// Log in to the vendor named by the configuration.
pub fn resolve_provider(config: &JobConfig) -> QisJobResult<Box<dyn Provider>> {
    debug!(provider = %config.provider, "resolving provider");
    let provider: Box<dyn Provider> = match config.provider {
        ProviderKind::Ibmq => {
            let instance = config.instance();
            let provider = match (&config.token, &config.url) {
                (Some(token), Some(url)) => IbmProvider::new(
                    &Credentials::new(token.as_str())
                        .with_url(url.as_str())
                        .with_instance(instance),
                ),
                _ => IbmProvider::from_saved_account(instance),
            };
            Box::new(provider.map_err(HalError::from)?)
        }
        ProviderKind::Qi => {
            Box::new(QiProvider::new(config.token.clone()).map_err(HalError::from)?)
        }
        ProviderKind::Forest => Box::new(ForestProvider::from_env().map_err(HalError::from)?),
        ProviderKind::Mqt => Box::new(DdsimProvider::from_env()),
    };
    Ok(provider)
}

/// The provider for one invocation, logged in on first use.
#[derive(Default)]
pub struct ProviderSlot {
    cell: OnceCell<Box<dyn Provider>>,
}

impl ProviderSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot holding an already authenticated provider.
    pub fn with_provider(provider: Box<dyn Provider>) -> Self {
        Self {
            cell: OnceCell::new_with(Some(provider)),
        }
    }

    /// The provider, resolving it from `config` the first time.
    pub async fn get(&self, config: &JobConfig) -> QisJobResult<&dyn Provider> {
        let provider = self
            .cell
            .get_or_try_init(|| async { resolve_provider(config) })
            .await?;
        debug!(provider = provider.name(), "provider ready");
        Ok(provider.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_names() {
        assert_eq!("ibmq".parse::<ProviderKind>().unwrap(), ProviderKind::Ibmq);
        assert_eq!("QI".parse::<ProviderKind>().unwrap(), ProviderKind::Qi);
        assert_eq!("forest".parse::<ProviderKind>().unwrap(), ProviderKind::Forest);
        assert_eq!(" MQT ".parse::<ProviderKind>().unwrap(), ProviderKind::Mqt);
        for kind in ProviderKind::ALL {
            assert_eq!(kind.name().parse::<ProviderKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_provider_is_argument_error() {
        let err = "Braket".parse::<ProviderKind>().unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("Braket"));
    }

    #[tokio::test]
    async fn test_mqt_resolves_without_credentials() {
        let config = JobConfig::builder().api_provider("MQT").build().unwrap();
        let slot = ProviderSlot::new();
        let provider = slot.get(&config).await.unwrap();
        assert_eq!(provider.name(), "MQT");
    }
}
