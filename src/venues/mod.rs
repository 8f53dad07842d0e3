//! Concrete [`crate::adapter::VenueAdapter`] implementations. Each venue
//! gets its own submodule; `reference` is the one this crate ships (spec
//! §1) to prove the adapter framework end to end.

pub mod reference;
