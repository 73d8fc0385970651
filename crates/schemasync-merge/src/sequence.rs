//! Token sequencing.
//!
//! Two passes over a token batch before execution: an ordering pass that
//! places relationship additions after everything else, and a reversal pass
//! that turns a detected-change list into database-facing DDL tokens.

use crate::token::MergeToken;

/// Orders tokens for execution: every relationship-addition token sorts
/// after every other token, so the entities and columns a relationship joins
/// exist before the relationship is added. Relationship additions compare
/// equal among themselves; their relative order is unspecified but the sort
/// is stable, so repeated sorts of the same input agree. No other
/// inter-token dependency is modeled.
#[must_use]
pub fn sort_tokens(mut tokens: Vec<MergeToken>) -> Vec<MergeToken> {
    tokens.sort_by_key(MergeToken::is_relationship_addition);
    tokens
}

/// Replaces each token with its database-facing inverse, which re-creates
/// the prior model shape on the database side. Tokens with no database form
/// (procedure changes) are model-only and are excluded from DDL planning.
#[must_use]
pub fn reverse_for_database(tokens: &[MergeToken]) -> Vec<MergeToken> {
    tokens
        .iter()
        .filter_map(MergeToken::database_reverse)
        .collect()
}
