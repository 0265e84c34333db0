//! Field names
//!
//! Hot fields are first-class columns on the subscriber record; every
//! other name lands in the settings bag, so new settings never require a
//! migration.

/// Hot field: optional display name from the messaging channel.
pub const USERNAME: &str = "username";
/// Hot field: timestamp of the first interaction, unix seconds.
pub const FIRST_CONTACT: &str = "first_contact";
/// Hot field: subscriber locale code.
pub const LANGUAGE: &str = "language";

/// Ordered, duplicate-free list of favorite canteen ids.
pub const FAVORITES: &str = "favorites";
/// Last canteen the subscriber viewed.
pub const LAST_CANTEEN: &str = "last_canteen";
/// Time of day for the daily push notification.
pub const PUSH: &str = "push";
/// Suppress the audible alert on push delivery.
pub const PUSH_SILENT: &str = "pushsilent";
/// Decorate menus with emojis.
pub const EMOJIS: &str = "emojis";
/// Include meal notes in menus.
pub const NOTES: &str = "notes";
/// Which meal prices to show: "off", "all" or "role".
pub const PRICES: &str = "prices";
/// Free-text feedback messages, in submission order.
pub const FEEDBACK: &str = "feedback";
/// Whether the subscriber was already asked for feedback.
pub const ASKED_FEEDBACK: &str = "asked_feedback";

/// Whether a field is routed to structured storage instead of the bag.
pub fn is_hot(field: &str) -> bool {
    matches!(field, USERNAME | FIRST_CONTACT | LANGUAGE)
}
