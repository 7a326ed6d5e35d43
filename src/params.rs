//! Parsing of the comma-separated candidate lists that span the grid.
//!
//! Bad entries are dropped with a warning. Only a missing list, or one where
//! nothing survives, is an error: an empty axis leaves nothing to sweep.

use tracing::warn;

use crate::activation::ActivationType;
use crate::error::ConfigError;
use crate::optimizer::Updater;

pub const LIST_SEPARATOR: char = ',';

/// Parses `raw` into typed values, in order and keeping duplicates.
///
/// Each token is trimmed and handed to `parse`; a token that is empty or
/// that `parse` rejects is skipped with a warning naming `field`.
pub fn parse_value_list<T, E, F>(raw: Option<&str>, field: &str, parse: F) -> Result<Vec<T>, ConfigError>
where
    F: Fn(&str) -> Result<T, E>,
    E: std::fmt::Display,
{
    let raw = raw.ok_or_else(|| ConfigError::EmptyList(field.to_string()))?;

    let mut values = Vec::new();
    for token in raw.split(LIST_SEPARATOR) {
        let token = token.trim();
        if token.is_empty() {
            warn!(field, "empty entry will be ignored");
            continue;
        }
        match parse(token) {
            Ok(value) => values.push(value),
            Err(reason) => warn!(field, token, %reason, "entry is not correct and will be ignored"),
        }
    }

    if values.is_empty() {
        return Err(ConfigError::EmptyList(field.to_string()));
    }
    Ok(values)
}

/// Hidden-layer widths; every width must be at least 1.
pub fn parse_hidden_widths(raw: Option<&str>) -> Result<Vec<usize>, ConfigError> {
    parse_value_list(raw, "network_architecture.numbers_of_hidden_neurons", |token| {
        let width: i64 = token.parse().map_err(|_| format!("`{}` is not an integer", token))?;
        if width < 1 {
            return Err(format!("{} neurons, at least 1 is required", width));
        }
        usize::try_from(width).map_err(|e| e.to_string())
    })
}

/// Activation names, matched exactly against [`ActivationType::NAMES`].
pub fn parse_activations(raw: Option<&str>) -> Result<Vec<ActivationType>, ConfigError> {
    parse_value_list(raw, "activation_functions", str::parse::<ActivationType>)
}

/// Updater names, matched case-insensitively.
pub fn parse_updaters(raw: Option<&str>) -> Result<Vec<Updater>, ConfigError> {
    parse_value_list(raw, "updaters", str::parse::<Updater>)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Shared buffer the fmt subscriber writes into.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Runs `f` under a subscriber that keeps only warnings, returning its
    /// result and the warning lines.
    fn warnings_while<T>(f: impl FnOnce() -> T) -> (T, Vec<String>) {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let value = tracing::subscriber::with_default(subscriber, f);

        let bytes = captured.0.lock().unwrap().clone();
        let lines = String::from_utf8(bytes)
            .unwrap()
            .lines()
            .filter(|line| line.contains("WARN"))
            .map(String::from)
            .collect();
        (value, lines)
    }

    #[test]
    fn test_each_skipped_width_logs_a_warning() {
        let (widths, warnings) = warnings_while(|| parse_hidden_widths(Some("4,-1,abc,8")));

        assert_eq!(widths.unwrap(), vec![4, 8]);
        assert_eq!(warnings.len(), 2, "{:#?}", warnings);
        assert!(warnings[0].contains("-1"));
        assert!(warnings[1].contains("abc"));
        assert!(warnings
            .iter()
            .all(|line| line.contains("network_architecture.numbers_of_hidden_neurons")));
    }

    #[test]
    fn test_clean_list_logs_nothing() {
        let (updaters, warnings) = warnings_while(|| parse_updaters(Some("SGD, adam")));

        assert_eq!(updaters.unwrap(), vec![Updater::Sgd, Updater::Adam]);
        assert!(warnings.is_empty(), "{:#?}", warnings);
    }

    #[test]
    fn test_empty_entry_logs_a_warning() {
        let (activations, warnings) = warnings_while(|| parse_activations(Some("relu,,tanh")));

        assert_eq!(
            activations.unwrap(),
            vec![ActivationType::ReLU, ActivationType::Tanh]
        );
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_invalid_widths_are_skipped() {
        assert_eq!(parse_hidden_widths(Some("4,-1,abc,8")).unwrap(), vec![4, 8]);
    }

    #[test]
    fn test_zero_width_is_skipped() {
        assert_eq!(parse_hidden_widths(Some("0,3")).unwrap(), vec![3]);
    }

    #[test]
    fn test_empty_string_is_an_error() {
        assert_eq!(
            parse_hidden_widths(Some("")),
            Err(ConfigError::EmptyList(
                "network_architecture.numbers_of_hidden_neurons".to_string()
            ))
        );
    }

    #[test]
    fn test_missing_list_is_an_error() {
        assert!(matches!(parse_activations(None), Err(ConfigError::EmptyList(_))));
        assert!(matches!(parse_updaters(None), Err(ConfigError::EmptyList(_))));
    }

    #[test]
    fn test_all_invalid_is_an_error() {
        assert!(parse_activations(Some("bogus,,RELU")).is_err());
        assert!(parse_updaters(Some("momentum")).is_err());
    }

    #[test]
    fn test_duplicates_are_kept() {
        assert_eq!(parse_hidden_widths(Some("4,4,8")).unwrap(), vec![4, 4, 8]);
        assert_eq!(
            parse_activations(Some("tanh,relu,tanh")).unwrap(),
            vec![ActivationType::Tanh, ActivationType::ReLU, ActivationType::Tanh]
        );
    }

    #[test]
    fn test_updaters_ignore_case_and_whitespace() {
        assert_eq!(
            parse_updaters(Some("adam, Nesterovs ,bogus")).unwrap(),
            vec![Updater::Adam, Updater::Nesterovs]
        );
    }

    #[derive(Debug, Clone)]
    enum Token {
        Valid(usize),
        Invalid(String),
    }

    fn token() -> impl Strategy<Value = Token> {
        prop_oneof![
            (1usize..500).prop_map(Token::Valid),
            (-500i64..1).prop_map(|n| Token::Invalid(n.to_string())),
            "[a-z]{0,4}".prop_map(Token::Invalid),
        ]
    }

    proptest! {
        #[test]
        fn valid_subset_in_order(tokens in prop::collection::vec(token(), 1..12)) {
            let raw = tokens
                .iter()
                .map(|t| match t {
                    Token::Valid(n) => n.to_string(),
                    Token::Invalid(s) => s.clone(),
                })
                .collect::<Vec<_>>()
                .join(",");
            let expected: Vec<usize> = tokens
                .iter()
                .filter_map(|t| match t {
                    Token::Valid(n) => Some(*n),
                    Token::Invalid(_) => None,
                })
                .collect();

            match parse_hidden_widths(Some(&raw)) {
                Ok(values) => prop_assert_eq!(values, expected),
                Err(_) => prop_assert!(expected.is_empty()),
            }
        }
    }
}
