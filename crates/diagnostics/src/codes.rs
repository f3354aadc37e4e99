//! Diagnostic ID constants.
//!
//! Use these instead of string literals to get compile-time typo detection
//! and IDE autocomplete. Codes are grouped by pipeline stage:
//! `VU1xxx` parsing and macro expansion, `VU2xxx` verification,
//! `VU3xxx` advisory results of build stripping, `VU4xxx` internal
//! consistency checks.

// ── Parsing / macros ─────────────────────────────────────────────────────

/// The VU text is not syntactically valid.
pub const SYNTAX_ERROR: &str = "VU1001";
/// A `macro(name)` reference has no preceding definition.
pub const MACRO_UNDEFINED: &str = "VU1002";
/// Substituting macro values produced text that no longer parses.
pub const MACRO_PARSE: &str = "VU1003";

// ── Verification ─────────────────────────────────────────────────────────

/// No `require()` call is present.
pub const MISSING_REQUIRE: &str = "VU2001";
/// An assignment targets something other than a fresh local name.
pub const INVALID_ASSIGN_TARGET: &str = "VU2002";
/// A local name is bound twice or shadows an outer binding.
pub const IMMUTABLE_REBIND: &str = "VU2003";
/// An `if` or ternary condition is not a non-pointer boolean.
pub const NON_BOOLEAN_CONDITION: &str = "VU2004";
/// A `for` loop iterates over something that is not a sized array.
pub const NOT_AN_ARRAY: &str = "VU2005";
/// The construct is legal syntax but not part of the VU language.
pub const UNSUPPORTED_CONSTRUCT: &str = "VU2006";
/// Operand or argument types do not match.
pub const TYPE_MISMATCH: &str = "VU2007";
/// A name is neither a local, a subject member, nor an API token.
pub const UNKNOWN_SYMBOL: &str = "VU2008";
/// A predicate was called with the wrong number of arguments.
pub const ARGUMENT_COUNT: &str = "VU2009";
/// A call target is not a predicate.
pub const NOT_CALLABLE: &str = "VU2010";
/// An attribute is not a member of the receiver struct.
pub const NO_SUCH_MEMBER: &str = "VU2011";
/// A subscript is applied to a non-array, or with a non-numeric index.
pub const INVALID_SUBSCRIPT: &str = "VU2012";
/// `array_index()` was applied to something other than a loop variable.
pub const NOT_A_LOOP_VARIABLE: &str = "VU2013";
/// A predicate name was used as a value or assignment target.
pub const PREDICATE_MISUSE: &str = "VU2014";

// ── Advisory ─────────────────────────────────────────────────────────────

/// A `require()` condition folds to `False` in the current build.
pub const REQUIRE_FALSE: &str = "VU3001";
/// Part of the VU can never execute in any build.
pub const DEAD_CODE: &str = "VU3002";

// ── Internal ─────────────────────────────────────────────────────────────

/// A formatter produced output that does not re-parse to the same AST.
pub const INTERNAL_ROUND_TRIP: &str = "VU4001";

/// Every known code, in catalogue order.
pub const ALL: &[&str] = &[
    SYNTAX_ERROR,
    MACRO_UNDEFINED,
    MACRO_PARSE,
    MISSING_REQUIRE,
    INVALID_ASSIGN_TARGET,
    IMMUTABLE_REBIND,
    NON_BOOLEAN_CONDITION,
    NOT_AN_ARRAY,
    UNSUPPORTED_CONSTRUCT,
    TYPE_MISMATCH,
    UNKNOWN_SYMBOL,
    ARGUMENT_COUNT,
    NOT_CALLABLE,
    NO_SUCH_MEMBER,
    INVALID_SUBSCRIPT,
    NOT_A_LOOP_VARIABLE,
    PREDICATE_MISUSE,
    REQUIRE_FALSE,
    DEAD_CODE,
    INTERNAL_ROUND_TRIP,
];

pub(crate) fn explain(id: &str) -> Option<&'static str> {
    let text = match id {
        SYNTAX_ERROR => {
            "The VU text could not be parsed. VUs use a small Python-shaped grammar: assignments, if/elif/else, for loops, pass and expression statements. Check for documentation markup (such as ename: or pname:) left inside the expression."
        }
        MACRO_UNDEFINED => {
            "A macro(name) reference was used before any `:name: value` definition line appeared earlier in the document."
        }
        MACRO_PARSE => {
            "After substituting macro values into the VU, the resulting text is no longer valid VU syntax. Check the macro's definition value."
        }
        MISSING_REQUIRE => {
            "Every codified VU must state at least one require() condition; a VU with no requirement asserts nothing."
        }
        INVALID_ASSIGN_TARGET => {
            "Assignments bind exactly one new local name. Cascaded assignments, tuple targets, attribute targets, and assignments to API tokens, VU parameters or predicates are rejected."
        }
        IMMUTABLE_REBIND => {
            "VU variables are immutable: a name may be bound once per scope and may not shadow a variable from an enclosing scope."
        }
        NON_BOOLEAN_CONDITION => {
            "Conditions of if statements, conditional expressions and boolean operators must be booleans. Pointers must be compared with NULL explicitly."
        }
        NOT_AN_ARRAY => {
            "A for loop may only iterate over an array: a pointer or fixed-size member with a known length."
        }
        UNSUPPORTED_CONSTRUCT => {
            "The construct parses but is not part of the VU language: while loops, break, continue, for-else, chained comparisons, is/in operators, tuple or slice subscripts."
        }
        TYPE_MISMATCH => {
            "The operand or argument types are incompatible, for example comparing an enum with a handle, or applying arithmetic to a bitmask."
        }
        UNKNOWN_SYMBOL => {
            "The name is neither a VU variable, a member or parameter of the documented API, nor a known API token."
        }
        ARGUMENT_COUNT => "The predicate was called with the wrong number of arguments.",
        NOT_CALLABLE => {
            "Only the built-in predicates may be called. If a predicate was intended, it is misspelled."
        }
        NO_SUCH_MEMBER => {
            "The attribute does not exist on the receiving struct, or the receiver is not a struct."
        }
        INVALID_SUBSCRIPT => {
            "Subscripts are only allowed on arrays and must use a single numeric, non-pointer index."
        }
        NOT_A_LOOP_VARIABLE => "array_index() may only be applied to a for loop variable.",
        PREDICATE_MISUSE => {
            "A predicate name was used as a plain value, or a predicate was applied to an object of the wrong type."
        }
        REQUIRE_FALSE => {
            "After build stripping, a require() condition is constant False. This hurts VU readability; invert the VU logic instead."
        }
        DEAD_CODE => {
            "Part of the VU is removed even when every version and extension is enabled, so it can never apply."
        }
        INTERNAL_ROUND_TRIP => {
            "A formatter produced text that does not parse back to the same VU. This is a defect in the toolchain, not in the input."
        }
        _ => return None,
    };
    Some(text)
}
