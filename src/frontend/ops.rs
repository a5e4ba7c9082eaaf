//! Operator lexicon and fixity metadata
//!
//! One table drives two unrelated orders: the *lexical* order (longest text
//! first) used when matching operator spellings inside a line, and the
//! *semantic* precedence used when the assembler consumes operators. The
//! default table is built once at startup and passed by reference into every
//! pass that needs it.

use once_cell::sync::Lazy;

/// How an operator consumes operands during assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixity {
    /// One operand on each side
    Infix,
    /// Prefix: single operand at the right
    Right,
    /// Postfix: single operand at the left
    Left,
    /// Consumes everything to the right within the current indentation block
    RightAll,
}

/// Descriptor of one operator spelling.
#[derive(Debug, Clone, Copy)]
pub struct OpDef {
    pub text: &'static str,
    /// `None` for punctuation the assembler does not model (parentheses,
    /// separators); such tokens are still matched lexically.
    pub fixity: Option<Fixity>,
    pub commutative: bool,
    /// Semantic consumption class; lower is consumed earlier (binds
    /// tighter). `None` means the operator is handled outside the
    /// precedence pass (punctuation, block-consuming operators).
    pub precedence: Option<u8>,
}

impl OpDef {
    const fn new(
        text: &'static str,
        fixity: Option<Fixity>,
        commutative: bool,
        precedence: Option<u8>,
    ) -> Self {
        Self { text, fixity, commutative, precedence }
    }

    /// Character length of the spelling (spans are character-based).
    #[inline]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    #[inline]
    pub fn is_alphabetic(&self) -> bool {
        self.text.chars().all(char::is_alphabetic)
    }
}

/// Static descriptor set, in declaration order.
///
/// Declaration order is *neither* of the two orders that matter; see
/// [`OperatorTable::lexical`] and the `precedence` field.
const DEFAULT_DEFS: &[OpDef] = &[
    OpDef::new("(", None, false, None),
    OpDef::new(")", None, false, None),
    OpDef::new(":", None, false, None),
    OpDef::new(";", None, false, None),
    OpDef::new("=", Some(Fixity::Infix), true, Some(6)),
    OpDef::new("->", Some(Fixity::Infix), false, Some(5)),
    OpDef::new("<-", Some(Fixity::Infix), false, Some(5)),
    OpDef::new("+", Some(Fixity::Infix), true, Some(1)),
    OpDef::new("-", Some(Fixity::Infix), false, Some(1)),
    OpDef::new("*", Some(Fixity::Infix), true, Some(0)),
    OpDef::new("/", Some(Fixity::Infix), false, Some(0)),
    OpDef::new("∘", Some(Fixity::Infix), false, Some(4)),
    OpDef::new("∘=", Some(Fixity::Infix), false, Some(4)),
    OpDef::new("∘+", Some(Fixity::Infix), false, Some(4)),
    OpDef::new("if", Some(Fixity::Right), false, Some(3)),
    OpDef::new("then", Some(Fixity::Right), false, Some(3)),
    OpDef::new("else", Some(Fixity::Right), false, Some(3)),
    OpDef::new("<", Some(Fixity::Infix), false, Some(2)),
    OpDef::new("==", Some(Fixity::Infix), true, Some(2)),
    OpDef::new(">", Some(Fixity::Infix), false, Some(2)),
    OpDef::new("<=", Some(Fixity::Infix), false, Some(2)),
    OpDef::new(">=", Some(Fixity::Infix), false, Some(2)),
    OpDef::new("inputs", Some(Fixity::RightAll), false, None),
    OpDef::new("outputs", Some(Fixity::RightAll), false, None),
];

/// The operator configuration value.
#[derive(Debug, Clone)]
pub struct OperatorTable {
    defs: Vec<OpDef>,
    /// Indices into `defs`, longest spelling first (stable within a length).
    lexical: Vec<usize>,
}

impl OperatorTable {
    pub fn new(defs: Vec<OpDef>) -> Self {
        let mut lexical: Vec<usize> = (0..defs.len()).collect();
        lexical.sort_by_key(|&i| std::cmp::Reverse(defs[i].char_len()));
        Self { defs, lexical }
    }

    /// Table with the language's default operator set.
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_DEFS.to_vec())
    }

    /// Descriptors in longest-text-first matching order.
    pub fn lexical(&self) -> impl Iterator<Item = &OpDef> + '_ {
        self.lexical.iter().map(move |&i| &self.defs[i])
    }

    /// Descriptor for an exact spelling.
    pub fn lookup(&self, text: &str) -> Option<&OpDef> {
        self.defs.iter().find(|d| d.text == text)
    }

    pub fn defs(&self) -> &[OpDef] {
        &self.defs
    }
}

impl Default for OperatorTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Process-wide default table; passes borrow it unless a caller injects
/// its own.
pub static DEFAULT_OPERATORS: Lazy<OperatorTable> = Lazy::new(OperatorTable::with_defaults);
