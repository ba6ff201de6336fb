use std::fs;
use std::path::Path;
use serde_yaml::{self, Value};
use errors::*;

const REQUIRED_KEYS: [&str; 4] = ["host", "port", "user", "password"];

/// Connection settings from the `mail.receive` section of the config file.
#[derive(Deserialize, Debug, Clone)]
pub struct AccountConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    #[serde(default)]
    pub tls: bool,
    #[serde(default)]
    pub starttls: bool,
    #[serde(default = "default_folder")]
    pub folder: String,
}

fn default_folder() -> String {
    "INBOX".to_string()
}

impl AccountConfig {
    pub fn load(path: &Path) -> Result<AccountConfig> {
        trace!("Reading configuration from {}", path.display());
        let content = fs::read_to_string(path)
            .chain_err(|| ErrorKind::ConfigUnreadable(path.display().to_string()))?;
        AccountConfig::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<AccountConfig> {
        let document: Value = serde_yaml::from_str(content)
            .chain_err(|| ErrorKind::ConfigSyntaxError)?;

        let receive = match document.get("mail").and_then(|mail| mail.get("receive")) {
            Some(receive) if receive.is_mapping() => receive,
            _ => {
                debug!("No mail.receive section");
                bail!(ErrorKind::ConfigIncomplete("mail.receive".to_string()));
            }
        };
        for key in REQUIRED_KEYS.iter() {
            if receive.get(*key).map_or(true, Value::is_null) {
                debug!("mail.receive.{} is missing", key);
                bail!(ErrorKind::ConfigIncomplete(format!("mail.receive.{}", key)));
            }
        }

        let account: AccountConfig = serde_yaml::from_value(receive.clone())
            .chain_err(|| ErrorKind::ConfigSyntaxError)?;
        debug!("Account {}@{}:{} (tls: {}, starttls: {}, folder: {})",
               account.user, account.host, account.port,
               account.tls, account.starttls, account.folder);
        Ok(account)
    }
}
