use uuid::Uuid;

/// Mints a random (v4) UUID.
///
/// v4 leaves 122 random bits, so two tokens minted by any number of
/// concurrent callers collide with negligible probability.
pub fn new_uuid() -> Uuid {
    Uuid::new_v4()
}

/// Renders a UUID in the 32 lowercase hex character form used on the wire.
pub fn to_simple_string(uuid: Uuid) -> String {
    uuid.simple().to_string()
}
