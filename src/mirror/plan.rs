use crate::message::MessageRecord;
use crate::provenance::RELAY_HEADER_LINES;

use super::{Channel, MirrorError};

#[derive(Debug, Clone)]
pub(crate) enum SyncAction {
    Create { source: MessageRecord },
    Edit {
        copy: MessageRecord,
        content: String,
        edited_timestamp: Option<String>,
    },
    Delete { copy: MessageRecord },
}

/// Both snapshots are newest-first, as fetched. Deletions of orphaned relay
/// copies come first, then the remote messages are walked oldest to newest
/// so fresh copies land in the original posting order. Only copies relayed
/// by `client_username` are ever edited or deleted.
pub(crate) fn plan_actions(
    local: &[MessageRecord],
    remote: &[MessageRecord],
    client_username: &str,
) -> Result<Vec<SyncAction>, MirrorError> {
    let mut actions = Vec::new();

    for copy in local {
        let found = remote.iter().any(|original| original == copy);
        if !found && copy.is_relay_copy_by(client_username) {
            actions.push(SyncAction::Delete { copy: copy.clone() });
        }
    }

    for original in remote.iter().rev() {
        // Oldest matching copy wins when duplicates exist.
        let matched = local
            .iter()
            .rev()
            .find(|copy| **copy == *original && copy.is_relay_copy_by(client_username));
        match matched {
            Some(copy) => {
                let Some(stored) = strip_relay_header(&copy.content) else {
                    return Err(MirrorError::CorruptRelayCopy {
                        id: copy.wire_id().to_string(),
                        lines: copy.content.lines().count(),
                    });
                };
                if stored != original.content {
                    actions.push(SyncAction::Edit {
                        copy: copy.clone(),
                        content: original.content.clone(),
                        edited_timestamp: original.last_edit.clone(),
                    });
                }
            }
            None => actions.push(SyncAction::Create {
                source: original.clone(),
            }),
        }
    }

    Ok(actions)
}

// None means fewer lines than the header, which a relay never writes.
pub(crate) fn strip_relay_header(content: &str) -> Option<&str> {
    if content.lines().count() < RELAY_HEADER_LINES {
        return None;
    }
    let (_, rest) = content.split_once('\n')?;
    // A marker line without a trailing newline means the stored text is empty.
    Some(rest.split_once('\n').map_or("", |(_, body)| body))
}

pub(crate) fn pair_channels<'a>(
    local: &'a [Channel],
    remote: &'a [Channel],
) -> Vec<(&'a Channel, &'a Channel)> {
    remote
        .iter()
        .filter_map(|remote_channel| {
            local
                .iter()
                .find(|local_channel| local_channel.id == remote_channel.id)
                .map(|local_channel| (local_channel, remote_channel))
        })
        .collect()
}
