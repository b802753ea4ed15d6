//! Config utils.

use std::collections::HashMap;
use std::str::FromStr;

use crate::error::SimulationError;

/// Parses config value string, which consists of two parts - name and options.
/// Example: Hybrid[wan=6,util=80] parts are name Hybrid and options string "wan=6,util=80".
pub fn parse_config_value(config_str: &str) -> (String, Option<String>) {
    match config_str.split_once('[') {
        Some((l, r)) => (l.trim().to_string(), Some(r.to_string().replace(']', ""))),
        None => (config_str.trim().to_string(), None),
    }
}

/// Parses options string from config value, returns map with option names and values.
pub fn parse_options(options_str: &str) -> HashMap<String, String> {
    let mut options = HashMap::new();
    for option_str in options_str.split(',') {
        if let Some((name, value)) = option_str.split_once('=') {
            options.insert(name.trim().to_string(), value.trim().to_string());
        }
    }
    options
}

/// Reads typed option value, falling back to `default` if the option is absent.
pub fn option_or<T: FromStr>(options: &HashMap<String, String>, name: &str, default: T) -> Result<T, SimulationError> {
    match options.get(name) {
        Some(value) => value
            .parse::<T>()
            .map_err(|_| SimulationError::config(format!("invalid value of option {}: {}", name, value))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_value_with_options() {
        let (name, options) = parse_config_value("Hybrid[wan=6,util=80]");
        assert_eq!(name, "Hybrid");
        let options = parse_options(&options.unwrap());
        assert_eq!(options.get("wan").unwrap(), "6");
        assert_eq!(options.get("util").unwrap(), "80");
        assert_eq!(options.get("other"), None);
    }

    #[test]
    fn config_value_without_options() {
        assert_eq!(parse_config_value("NextFit"), ("NextFit".to_string(), None));
    }

    #[test]
    fn typed_options() {
        let options = parse_options("threshold=75.5,name=x");
        assert_eq!(option_or(&options, "threshold", 0.).unwrap(), 75.5);
        assert_eq!(option_or(&options, "missing", 3u32).unwrap(), 3);
        assert!(option_or::<f64>(&options, "name", 0.).is_err());
    }
}
