//! Checks shared by recipe `validate` implementations.

use crate::Glob;
use crate::OptionsError;

/// An option that must be present and not blank.
pub fn require(recipe: &str, name: &str, value: Option<&str>) -> Result<(), OptionsError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(()),
        _ => Err(OptionsError::new(recipe, &[name], format!("{name} is required"))),
    }
}

/// At least one of the named options must be set.
pub fn require_any(recipe: &str, options: &[(&str, bool)]) -> Result<(), OptionsError> {
    if options.iter().any(|(_, set)| *set) {
        return Ok(());
    }
    let names: Vec<&str> = options.iter().map(|(name, _)| *name).collect();
    Err(OptionsError::new(
        recipe,
        &names,
        format!("at least one of {} must be set", names.join(", ")),
    ))
}

/// The two options cannot both be set.
pub fn mutually_exclusive(
    recipe: &str,
    first: (&str, bool),
    second: (&str, bool),
) -> Result<(), OptionsError> {
    if first.1 && second.1 {
        return Err(OptionsError::new(
            recipe,
            &[first.0, second.0],
            format!("{} and {} are mutually exclusive", first.0, second.0),
        ));
    }
    Ok(())
}

/// An optional glob pattern must compile.
pub fn valid_glob(recipe: &str, name: &str, pattern: Option<&str>) -> Result<(), OptionsError> {
    let Some(pattern) = pattern else {
        return Ok(());
    };
    Glob::new(pattern).map(|_| ()).map_err(|err| {
        OptionsError::new(recipe, &[name], format!("{name} is not a valid glob: {err}"))
    })
}
