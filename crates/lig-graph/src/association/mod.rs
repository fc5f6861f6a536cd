//! Association engine.
//!
//! Each one-association is a two-state machine per owner: unlinked, or
//! linked to a peer. The foreign key attribute drives it; collections and
//! inverse one-associations are kept in agreement through direct calls,
//! never through listener chains:
//!
//! - `one`: resolving foreign keys, linking and unlinking, inverse binding
//! - `many`: lazily materialized collections mirroring child foreign keys
//! - `cascade`: destroy handling
//!
//! No state borrow is held across a call that may emit events.

mod cascade;
mod many;
mod one;
