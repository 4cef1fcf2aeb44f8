use std::{env::current_dir, path::PathBuf};

use crate::ConfigurationLoadingError;


/// Returns the default configuration filepath, which is at
/// `{current directory}/data/configuration.toml`.
pub(crate) fn get_default_configuration_file_path() -> Result<PathBuf, ConfigurationLoadingError> {
    let mut configuration_filepath = current_dir()
        .map_err(|error| ConfigurationLoadingError::UnableToDetermineCurrentDirectory { error })?;
    configuration_filepath.push("data/configuration.toml");

    Ok(configuration_filepath)
}
