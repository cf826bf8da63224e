//! Named text files in a configuration folder

use crate::error::{ConfigError, Result};
use galactic_crypto::Encryptor;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A flat text file holding one configuration value.
///
/// The value is read when the item is created and kept in memory;
/// [`ConfigurationItem::write`] persists it. Encrypted items store the base64
/// form of `salt || nonce || ciphertext` produced by [`Encryptor`].
#[derive(Debug)]
pub struct ConfigurationItem {
    folder: PathBuf,
    name: String,
    encryptor: Option<Encryptor>,
    value: String,
}

impl ConfigurationItem {
    /// Open an item, loading its current value if the file exists
    pub fn new(
        folder: impl Into<PathBuf>,
        name: &str,
        encrypted: bool,
        key: Option<&str>,
    ) -> Result<Self> {
        validate_name(name)?;
        let encryptor = if encrypted {
            let key = key.ok_or_else(|| {
                ConfigError::InvalidArgument(format!(
                    "Encrypted configuration item {} requires a key",
                    name
                ))
            })?;
            Some(Encryptor::new(key)?)
        } else {
            None
        };

        let mut item = Self {
            folder: folder.into(),
            name: name.to_string(),
            encryptor,
            value: String::new(),
        };
        item.value = item.read()?;
        Ok(item)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> PathBuf {
        self.folder.join(&self.name)
    }

    pub fn is_encrypted(&self) -> bool {
        self.encryptor.is_some()
    }

    pub fn exists(&self) -> bool {
        self.path().is_file()
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    /// Non-empty lines of the value, trimmed
    pub fn lines(&self) -> Vec<&str> {
        self.value
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect()
    }

    /// Re-read the file, discarding unsaved changes
    pub fn reload(&mut self) -> Result<()> {
        self.value = self.read()?;
        Ok(())
    }

    /// Persist the value, creating the folder if needed
    pub fn write(&self) -> Result<()> {
        fs::create_dir_all(&self.folder).map_err(|e| ConfigError::io(&self.folder, e))?;

        let path = self.path();
        let contents = match &self.encryptor {
            Some(encryptor) => encryptor.encrypt_string(&self.value)?,
            None => self.value.clone(),
        };
        fs::write(&path, contents).map_err(|e| ConfigError::io(&path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if self.encryptor.is_some() {
                fs::set_permissions(&path, fs::Permissions::from_mode(0o600))
                    .map_err(|e| ConfigError::io(&path, e))?;
            }
        }

        info!(item = %self.name, encrypted = self.is_encrypted(), "Configuration item written");
        Ok(())
    }

    /// Remove the file and clear the value. Returns false if there was no file.
    pub fn delete(&mut self) -> Result<bool> {
        self.value.clear();
        let path = self.path();
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(item = %self.name, "Configuration item deleted");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ConfigError::io(&path, e)),
        }
    }

    fn read(&self) -> Result<String> {
        let path = self.path();
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(item = %self.name, "Configuration item not found, using empty value");
                return Ok(String::new());
            }
            Err(e) => return Err(ConfigError::io(&path, e)),
        };

        match &self.encryptor {
            Some(_) if contents.trim().is_empty() => Ok(String::new()),
            Some(encryptor) => Ok(encryptor.decrypt_string(&contents)?),
            None => Ok(contents),
        }
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ConfigError::InvalidArgument(
            "Configuration item name cannot be empty".to_string(),
        ));
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." || Path::new(name).is_absolute() {
        return Err(ConfigError::InvalidArgument(format!(
            "Configuration item name must be a plain file name: {}",
            name
        )));
    }
    Ok(())
}
