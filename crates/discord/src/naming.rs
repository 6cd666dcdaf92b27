use {
    chanstore_channels::{Error, Result},
    serenity::all::{ChannelId, ChannelType},
};

/// Discord rejects text channel names longer than this.
pub const MAX_CHANNEL_NAME_LEN: usize = 100;

/// Map a collection name onto the form Discord stores text channel names in.
///
/// Discord lowercases text channel names and turns spaces into dashes, so a
/// lookup by the raw name would miss the channel created for it.
pub fn normalize_channel_name(name: &str) -> Result<String> {
    let normalized = name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase();

    if normalized.is_empty() {
        return Err(Error::invalid_input("collection name is empty"));
    }
    if normalized.chars().count() > MAX_CHANNEL_NAME_LEN {
        return Err(Error::invalid_input(format!(
            "collection name exceeds {MAX_CHANNEL_NAME_LEN} characters"
        )));
    }
    Ok(normalized)
}

/// Pick the text channel called `name` among `channels`.
///
/// Channels of any other kind never match. When several text channels share
/// the name the oldest (lowest id) wins so repeated lookups agree.
pub fn find_text_channel<'a>(
    channels: impl IntoIterator<Item = (ChannelId, &'a str, ChannelType)>,
    name: &str,
) -> Option<ChannelId> {
    channels
        .into_iter()
        .filter(|(_, channel_name, kind)| *kind == ChannelType::Text && *channel_name == name)
        .map(|(id, ..)| id)
        .min()
}
