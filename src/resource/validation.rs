use regex::Regex;

use crate::error::AppError;

const NAME_PATTERN: &str = r"^[A-Za-z0-9][A-Za-z0-9._:-]*$";

/// Check that `name` is safe to use as a file name or config key.
pub fn validate_name(name: &str) -> Result<(), AppError> {
    if name.is_empty() {
        return Err(AppError::invalid_name(name, "name is empty"));
    }
    if name.contains(['/', '\\']) {
        return Err(AppError::invalid_name(name, "name contains a path separator"));
    }
    if name.contains("..") {
        return Err(AppError::invalid_name(name, "name contains '..'"));
    }
    let re = Regex::new(NAME_PATTERN)
        .map_err(|e| AppError::Config(format!("invalid name pattern: {e}")))?;
    if !re.is_match(name) {
        return Err(AppError::invalid_name(
            name,
            "must start with a letter or digit and contain only letters, digits, '-', '_', '.', ':'",
        ));
    }
    Ok(())
}

pub fn validate_names<'a, I>(names: I) -> Result<(), AppError>
where
    I: IntoIterator<Item = &'a str>,
{
    names.into_iter().try_for_each(validate_name)
}
