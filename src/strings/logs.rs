pub fn config_loaded(path: &str, persona: &str, name: &str) -> String {
    format!("Loaded state from {path} (persona: {persona}, name: {name})")
}

pub fn logged_in(user: &str) -> String {
    format!("Logged in as {user}")
}

pub fn setting_display_name(name: &str) -> String {
    format!("Setting display name to: {name}")
}

pub fn set_display_name_fail(err: &str) -> String {
    format!("Failed to set display name: {err}")
}

pub const SYNC_LOOP_START: &str = "Starting sync loop...";

pub fn sync_loop_fail(err: &str) -> String {
    format!("Sync loop failed: {err}")
}

pub const SHUTDOWN: &str = "Bot shutting down.";

pub fn channel_joining(channel: &str) -> String {
    format!("Joining channel {channel}...")
}

pub fn channel_join_fail(channel: &str, err: &str) -> String {
    format!("   Failed to join channel {channel}: {err}")
}

pub fn channel_join_success(channel: &str) -> String {
    format!("   Successfully joined channel {channel}.")
}

pub fn invite_received(room_id: &str) -> String {
    format!("💌 Received invite for room {room_id:?}")
}

pub fn join_invite_fail(err: &str) -> String {
    format!("Failed to join room after invite: {err}")
}

pub const JOIN_INVITE_SUCCESS: &str = "✅ Successfully joined room!";

pub fn dispatch_fail(from: &str, err: &str) -> String {
    format!("Failed to handle message from {from}: {err}")
}
