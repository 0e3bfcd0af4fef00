//! Standardized tokens stored in `Listing::history` / `Listing::features`
//! that the boolean flags in `FilterSet` filter on. Adapters
//! normalizing upstream provenance data should emit these exact strings so
//! the Local Index's boolean filters (`clean_title_only`, `no_accidents`,
//! `one_owner_only`, `certified_only`) match across sources.

/// `history` fact: the title is reported clean (no salvage/rebuilt brand).
pub const TITLE_CLEAN: &str = "title:clean";
/// `history` fact: zero reported accidents.
pub const NO_ACCIDENTS: &str = "accidents:none";
/// `history` fact: exactly one prior owner.
pub const ONE_OWNER: &str = "owners:1";
/// `features` tag: the dealer lists the vehicle as certified pre-owned.
pub const CERTIFIED: &str = "certified_pre_owned";
