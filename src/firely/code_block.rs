use std::fmt;
use std::sync::Arc;

use crate::firely::internal::InternalFirely;

/// A branch run at most once by [`CodeBlock::execute`].
pub type CodeBranch<'a> = Box<dyn FnOnce() + 'a>;

/// Which branch [`CodeBlock::execute`] ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchOutcome {
    /// The branch at this index matched the current value.
    Variant(usize),
    Default,
}

/// Runs one of several branches depending on which variant a key currently holds.
///
/// Variants and branches pair up by position: when the key's value equals the `i`-th variant, the
/// `i`-th branch runs. Anything else falls back to the default branch.
pub struct CodeBlock {
    name: String,
    internal: Arc<InternalFirely>,
    variants: Vec<String>,
}

impl CodeBlock {
    pub(crate) fn new(name: String, internal: Arc<InternalFirely>) -> Self {
        Self {
            name,
            internal,
            variants: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variants(&self) -> &[String] {
        &self.variants
    }

    /// Replaces the ordered list of variants.
    pub fn with_variant<I, S>(mut self, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variants = variants.into_iter().map(Into::into).collect();
        self
    }

    /// Runs exactly one of `branches` or `default`.
    pub fn execute<'a, D>(&self, default: D, branches: Vec<CodeBranch<'a>>) -> BranchOutcome
    where
        D: FnOnce() + 'a,
    {
        if branches.is_empty() {
            default();
            return BranchOutcome::Default;
        }

        if branches.len() != self.variants.len() {
            self.internal.log_error("Variants does not match CodeBranches");
        }

        let current = self.internal.get_string(&self.name);
        let selected = self
            .variants
            .iter()
            .position(|variant| *variant == current)
            .and_then(|index| branches.into_iter().nth(index).map(|branch| (index, branch)));

        match selected {
            Some((index, branch)) => {
                branch();
                BranchOutcome::Variant(index)
            }
            None => {
                default();
                BranchOutcome::Default
            }
        }
    }
}

impl fmt::Debug for CodeBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeBlock")
            .field("name", &self.name)
            .field("variants", &self.variants)
            .finish()
    }
}
