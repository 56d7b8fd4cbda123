use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::firely::internal::InternalFirely;

pub const DEFAULT_SEPARATOR: &str = ",";

type Step<'a> = Box<dyn FnMut() + 'a>;

/// Runs registered steps in the order a key lists them.
///
/// The key holds a separator-delimited list such as `"search, results, checkout"`; each token
/// runs the step registered under it.
pub struct OrderedArrayBlock<'a> {
    name: String,
    internal: Arc<InternalFirely>,
    separator: String,
    steps: HashMap<String, Step<'a>>,
}

impl<'a> OrderedArrayBlock<'a> {
    pub(crate) fn new(name: String, internal: Arc<InternalFirely>) -> Self {
        Self {
            name,
            internal,
            separator: DEFAULT_SEPARATOR.to_string(),
            steps: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn init_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Registers `step` for `key`, replacing any earlier step for the same key.
    pub fn add_step<F>(mut self, key: impl Into<String>, step: F) -> Self
    where
        F: FnMut() + 'a,
    {
        self.steps.insert(key.into(), Box::new(step));
        self
    }

    /// Runs the step of every token in the key's current value and returns how many ran.
    ///
    /// Tokens are trimmed. Tokens without a step, including empty ones, are logged and skipped.
    pub fn execute(&mut self) -> usize {
        if self.steps.is_empty() {
            return 0;
        }

        let value = self.internal.get_string(&self.name);
        let mut executed = 0;
        for token in split_tokens(&value, &self.separator) {
            match self.steps.get_mut(token) {
                Some(step) => {
                    step();
                    executed += 1;
                }
                None => self
                    .internal
                    .log_error(format!("Unknown values in {}", self.name)),
            }
        }
        executed
    }
}

// An empty separator splits between every character, with empty pieces at both ends.
fn split_tokens<'v>(value: &'v str, separator: &str) -> Vec<&'v str> {
    value.split(separator).map(str::trim).collect()
}

impl fmt::Debug for OrderedArrayBlock<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut steps: Vec<&String> = self.steps.keys().collect();
        steps.sort();
        f.debug_struct("OrderedArrayBlock")
            .field("name", &self.name)
            .field("separator", &self.separator)
            .field("steps", &steps)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::firely::config::FirelyItem;
    use crate::firely::log::FirelyLogLevel;
    use crate::test_support::{internal_activated, LogCapture};

    async fn internal_for(key: &str, value: &str) -> Arc<InternalFirely> {
        internal_activated(vec![FirelyItem::new(key, "")], &[(key, value)]).await
    }

    #[tokio::test(flavor = "current_thread")]
    async fn runs_steps_in_listed_order() {
        let internal = internal_for("ordered_steps", " c, a ,b,a").await;
        let ran = RefCell::new(Vec::new());

        let executed = OrderedArrayBlock::new("ordered_steps".to_string(), internal)
            .add_step("a", || ran.borrow_mut().push("a"))
            .add_step("b", || ran.borrow_mut().push("b"))
            .add_step("c", || ran.borrow_mut().push("c"))
            .execute();

        assert_eq!(executed, 4);
        assert_eq!(ran.into_inner(), ["c", "a", "b", "a"]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn custom_separator() {
        let internal = internal_for("ordered_pipe", "b|a").await;
        let ran = RefCell::new(Vec::new());

        let mut block = OrderedArrayBlock::new("ordered_pipe".to_string(), internal)
            .init_separator("|")
            .add_step("a", || ran.borrow_mut().push("a"))
            .add_step("b", || ran.borrow_mut().push("b"));
        assert_eq!(block.separator(), "|");
        assert_eq!(block.execute(), 2);
        drop(block);

        assert_eq!(ran.into_inner(), ["b", "a"]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn later_step_replaces_earlier_one() {
        let internal = internal_for("ordered_replace", "a").await;
        let ran = RefCell::new(Vec::new());

        let executed = OrderedArrayBlock::new("ordered_replace".to_string(), internal)
            .add_step("a", || ran.borrow_mut().push("first"))
            .add_step("a", || ran.borrow_mut().push("second"))
            .execute();

        assert_eq!(executed, 1);
        assert_eq!(ran.into_inner(), ["second"]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn without_steps_nothing_runs() {
        let internal = internal_for("ordered_empty", "a,b").await;
        let capture = LogCapture::start();
        internal.set_log_level(FirelyLogLevel::Error);

        let executed = OrderedArrayBlock::new("ordered_empty".to_string(), internal).execute();

        assert_eq!(executed, 0);
        assert_eq!(capture.count("Unknown values in ordered_empty"), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn unknown_tokens_are_logged_and_skipped() {
        let internal = internal_for("ordered_unknown", "a,x,,y").await;
        let capture = LogCapture::start();
        internal.set_log_level(FirelyLogLevel::Error);
        let ran = RefCell::new(Vec::new());

        let executed = OrderedArrayBlock::new("ordered_unknown".to_string(), internal)
            .add_step("a", || ran.borrow_mut().push("a"))
            .execute();

        assert_eq!(executed, 1);
        assert_eq!(ran.into_inner(), ["a"]);
        assert_eq!(capture.count("Unknown values in ordered_unknown"), 3);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn empty_pieces_count_as_unknown_values() {
        let internal = internal_for("ordered_gaps", "a,,b").await;
        let capture = LogCapture::start();
        internal.set_log_level(FirelyLogLevel::Error);
        let ran = RefCell::new(Vec::new());

        let executed = OrderedArrayBlock::new("ordered_gaps".to_string(), internal)
            .add_step("a", || ran.borrow_mut().push("a"))
            .add_step("b", || ran.borrow_mut().push("b"))
            .execute();

        assert_eq!(executed, 2);
        assert_eq!(ran.into_inner(), ["a", "b"]);
        assert_eq!(capture.count("Unknown values in ordered_gaps"), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn empty_value_with_steps_logs_once() {
        let internal = internal_for("ordered_blank", "").await;
        let capture = LogCapture::start();
        internal.set_log_level(FirelyLogLevel::Error);

        let executed = OrderedArrayBlock::new("ordered_blank".to_string(), internal)
            .add_step("a", || {})
            .execute();

        assert_eq!(executed, 0);
        assert_eq!(capture.count("Unknown values in ordered_blank"), 1);
    }

    #[test]
    fn splits_like_a_plain_string_split() {
        assert_eq!(split_tokens("ab", ""), ["", "a", "b", ""]);
        assert_eq!(split_tokens("a;;b; ", ";"), ["a", "", "b", ""]);
        assert_eq!(split_tokens("", ","), [""]);
    }
}
