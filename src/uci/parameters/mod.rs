//! Keyword driven parsing of command arguments.
//!
//! A [`Parser`] maps keywords to consumers. While scanning, every token up
//! to the next known keyword belongs to the current keyword; whatever its
//! consumer leaves behind, together with tokens no keyword claims, is
//! returned to the caller as ignored.

use std::collections::{HashMap, VecDeque};

use super::moves::MoveParseError;

mod go;
mod perft;

pub use go::{GoParameters, PlayerClock, TimeOptions, GO_PARSER};
pub use perft::{PerfStatsParameters, PerftParameters, PERFT_PARSER, PERF_STATS_PARSER};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamError {
    #[error("{0} is already registered")]
    DuplicateKeyword(String),
    #[error("Expected a value, but none is provided")]
    MissingValue,
    #[error("{0} is not a number")]
    NotANumber(String),
    #[error("Unexpected negative number {0}")]
    Negative(String),
    #[error(transparent)]
    Move(#[from] MoveParseError),
}

/// Reads the arguments of one keyword into the target.
///
/// Tokens left in the queue are reported as ignored.
pub type Consumer<T> = fn(&mut T, &mut VecDeque<String>) -> Result<(), ParamError>;

/// One keyword (with its aliases) and the consumer for its arguments.
pub struct ParamSpec<T> {
    names: &'static [&'static str],
    consumer: Consumer<T>,
}

impl<T> ParamSpec<T> {
    #[must_use]
    pub fn new(names: &'static [&'static str], consumer: Consumer<T>) -> Self {
        ParamSpec { names, consumer }
    }
}

pub struct Parser<T> {
    keywords: HashMap<&'static str, Consumer<T>>,
    leading: Option<Consumer<T>>,
}

impl<T> Parser<T> {
    /// Build a parser from keyword specifications.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::DuplicateKeyword`] if two specifications share
    /// a keyword.
    pub fn new(specs: impl IntoIterator<Item = ParamSpec<T>>) -> Result<Self, ParamError> {
        let mut parser = Parser {
            keywords: HashMap::new(),
            leading: None,
        };
        for spec in specs {
            parser.add(spec)?;
        }
        Ok(parser)
    }

    /// Register another keyword specification.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::DuplicateKeyword`] if one of its names is
    /// already registered. Names listed before the duplicate stay registered.
    pub fn add(&mut self, spec: ParamSpec<T>) -> Result<(), ParamError> {
        for name in spec.names {
            if self.keywords.contains_key(name) {
                return Err(ParamError::DuplicateKeyword((*name).to_string()));
            }
            self.keywords.insert(name, spec.consumer);
        }
        Ok(())
    }

    /// Run `consumer` on the raw token stream before keyword scanning, for
    /// commands that start with a positional argument.
    #[must_use]
    pub fn with_leading(mut self, consumer: Consumer<T>) -> Self {
        self.leading = Some(consumer);
        self
    }

    #[must_use]
    pub fn is_keyword(&self, token: &str) -> bool {
        self.keywords.contains_key(token)
    }

    /// Parse `tokens` into `target`, which should hold its default values.
    ///
    /// # Returns
    ///
    /// The ignored tokens, in input order.
    ///
    /// # Errors
    ///
    /// Propagates the first consumer error. `target` may be partially
    /// updated in that case.
    pub fn parse(
        &self,
        target: &mut T,
        tokens: &mut VecDeque<String>,
    ) -> Result<Vec<String>, ParamError> {
        if let Some(leading) = self.leading {
            leading(target, tokens)?;
        }

        let mut ignored = Vec::new();
        while let Some(token) = tokens.pop_front() {
            let Some(consumer) = self.keywords.get(token.as_str()) else {
                ignored.push(token);
                continue;
            };
            let mut arguments = VecDeque::new();
            while let Some(next) = tokens.front() {
                if self.is_keyword(next) {
                    break;
                }
                arguments.extend(tokens.pop_front());
            }
            consumer(target, &mut arguments)?;
            ignored.extend(arguments);
        }
        Ok(ignored)
    }
}

/// Pop one non-negative integer argument.
///
/// # Errors
///
/// Fails when no argument is left, when it is not an integer, or when it
/// is negative.
pub fn positive_int(arguments: &mut VecDeque<String>) -> Result<u32, ParamError> {
    let value = arguments.pop_front().ok_or(ParamError::MissingValue)?;
    let parsed: i64 = value
        .parse()
        .map_err(|_| ParamError::NotANumber(value.clone()))?;
    if parsed < 0 {
        return Err(ParamError::Negative(value));
    }
    u32::try_from(parsed).map_err(|_| ParamError::NotANumber(value))
}

/// Split a command line remainder into a token queue.
#[must_use]
pub fn tokens(text: &str) -> VecDeque<String> {
    text.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Sample {
        count: u32,
        flag: bool,
        words: Vec<String>,
    }

    fn sample_parser() -> Parser<Sample> {
        Parser::new([
            ParamSpec::new(&["count", "c"], |s: &mut Sample, tok| {
                s.count = positive_int(tok)?;
                Ok(())
            }),
            ParamSpec::new(&["flag"], |s: &mut Sample, _| {
                s.flag = true;
                Ok(())
            }),
            ParamSpec::new(&["words"], |s: &mut Sample, tok| {
                s.words.extend(tok.drain(..));
                Ok(())
            }),
        ])
        .expect("distinct keywords")
    }

    #[test]
    fn test_keywords_in_any_order() {
        let parser = sample_parser();
        let mut sample = Sample::default();
        let ignored = parser
            .parse(&mut sample, &mut tokens("words a b flag c 7"))
            .expect("valid arguments");
        assert!(ignored.is_empty());
        assert_eq!(sample.count, 7);
        assert!(sample.flag);
        assert_eq!(sample.words, vec!["a", "b"]);
    }

    #[test]
    fn test_unknown_and_unconsumed_tokens_are_ignored() {
        let parser = sample_parser();
        let mut sample = Sample::default();
        let ignored = parser
            .parse(&mut sample, &mut tokens("junk count 3 4 flag extra"))
            .expect("valid arguments");
        assert_eq!(ignored, vec!["junk", "4", "extra"]);
        assert_eq!(sample.count, 3);
    }

    #[test]
    fn test_duplicate_keyword_is_rejected() {
        let result = Parser::<Sample>::new([
            ParamSpec::new(&["count"], |_, _| Ok(())),
            ParamSpec::new(&["total", "count"], |_, _| Ok(())),
        ]);
        assert_eq!(
            result.err(),
            Some(ParamError::DuplicateKeyword("count".to_string()))
        );
    }

    #[test]
    fn test_positive_int_errors() {
        assert_eq!(positive_int(&mut tokens("")), Err(ParamError::MissingValue));
        assert_eq!(
            positive_int(&mut tokens("-1")),
            Err(ParamError::Negative("-1".to_string()))
        );
        assert_eq!(
            positive_int(&mut tokens("ten")),
            Err(ParamError::NotANumber("ten".to_string()))
        );
        assert_eq!(positive_int(&mut tokens("0")), Ok(0));
    }

    #[test]
    fn test_leading_consumer_runs_first() {
        let parser = sample_parser().with_leading(|s, tok| {
            s.count = positive_int(tok)?;
            Ok(())
        });
        let mut sample = Sample::default();
        parser
            .parse(&mut sample, &mut tokens("5 flag"))
            .expect("valid arguments");
        assert_eq!(sample.count, 5);
        assert!(sample.flag);

        let mut sample = Sample::default();
        assert_eq!(
            parser.parse(&mut sample, &mut tokens("flag")),
            Err(ParamError::NotANumber("flag".to_string()))
        );
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn word() -> impl Strategy<Value = String> {
            prop_oneof![
                Just("flag".to_string()),
                "[a-z]{1,6}".prop_filter("must not be a keyword", |w| {
                    !["count", "c", "flag", "words"].contains(&w.as_str())
                }),
            ]
        }

        proptest! {
            #[test]
            fn ignored_tokens_keep_input_order(words in prop::collection::vec(word(), 0..24)) {
                let parser = sample_parser();
                let mut sample = Sample::default();
                let mut queue: VecDeque<String> = words.iter().cloned().collect();
                let ignored = parser.parse(&mut sample, &mut queue).expect("flags never fail");
                let expected: Vec<String> = words.iter().filter(|w| *w != "flag").cloned().collect();
                prop_assert_eq!(ignored, expected);
                prop_assert_eq!(sample.flag, words.iter().any(|w| w == "flag"));
            }
        }
    }
}
