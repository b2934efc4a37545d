//! Character and player maintenance: merging duplicate characters and
//! renaming characters and players.

use tracing::{info, instrument};

use pfsledger_shared::{Character, LedgerError, Result};
use pfsledger_storage::Storage;

/// What a merge changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Signups moved onto the kept character.
    pub moved_signups: u64,
    /// Org-play number of the removed character's player, if that player was
    /// left without characters and deleted.
    pub deleted_player: Option<i64>,
}

/// Merge `remove` into `keep`: move its signups, delete it, and delete its
/// player if that leaves the player with no characters.
#[instrument(skip_all, fields(keep = %keep.org_play_id(), remove = %remove.org_play_id()))]
pub async fn merge_characters(
    storage: &Storage,
    keep: &Character,
    remove: &Character,
) -> Result<MergeOutcome> {
    if keep.id == remove.id {
        return Err(LedgerError::validation(
            "cannot merge a character into itself",
        ));
    }

    let moved_signups = storage.reassign_signups(&remove.id, &keep.id).await?;
    storage.delete_character(&remove.id).await?;
    let deleted_player = storage.delete_player_if_empty(&remove.player_id).await?;

    info!(moved_signups, ?deleted_player, "characters merged");
    Ok(MergeOutcome {
        moved_signups,
        deleted_player,
    })
}

/// Give a character a new name.
pub async fn rename_character(storage: &Storage, character_id: &str, name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LedgerError::validation("character name cannot be blank"));
    }
    match storage.rename_character(character_id, name).await? {
        0 => Err(LedgerError::not_found(format!("character {character_id}"))),
        _ => {
            info!(character_id, name, "character renamed");
            Ok(())
        }
    }
}

/// Give a player (by org-play number) a display name.
pub async fn rename_player(storage: &Storage, number: i64, name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LedgerError::validation("player name cannot be blank"));
    }
    match storage.rename_player(number, name).await? {
        0 => Err(LedgerError::not_found(format!("player {number}"))),
        _ => {
            info!(number, name, "player renamed");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::{character_history, find_characters};
    use crate::session_import::import_session;
    use crate::test_support::{payload, seed_catalog, signup, test_storage};

    async fn character(storage: &Storage, player: i64, number: i64) -> Character {
        storage
            .find_character(player, number)
            .await
            .unwrap()
            .expect("character exists")
    }

    #[tokio::test]
    async fn merge_moves_signups_and_drops_empty_player() {
        let storage = test_storage().await;
        seed_catalog(&storage).await;
        // Same hero logged under a typo'd org-play number.
        import_session(
            &storage,
            &payload("PFS2E 1-01", "2024-01-10", vec![signup(123456, 2001, "Valeros")]),
        )
        .await
        .unwrap();
        import_session(
            &storage,
            &payload("PFS2E 1-07", "2024-01-17", vec![signup(123465, 2001, "Valeros")]),
        )
        .await
        .unwrap();
        import_session(
            &storage,
            &payload("PFS2E 2-03", "2024-01-24", vec![signup(123465, 2001, "Valeros")]),
        )
        .await
        .unwrap();

        let keep = character(&storage, 123456, 2001).await;
        let remove = character(&storage, 123465, 2001).await;
        let outcome = merge_characters(&storage, &keep, &remove).await.expect("merge");

        assert_eq!(
            outcome,
            MergeOutcome {
                moved_signups: 2,
                deleted_player: Some(123465),
            }
        );
        assert!(storage.get_character(&remove.id).await.unwrap().is_none());
        assert!(storage.get_player(123465).await.unwrap().is_none());

        let history = character_history(&storage, keep).await.unwrap();
        assert_eq!(history.signups.len(), 3);
        assert_eq!(storage.counts().await.unwrap().signups, 3);
    }

    #[tokio::test]
    async fn merge_keeps_player_with_other_characters() {
        let storage = test_storage().await;
        seed_catalog(&storage).await;
        import_session(
            &storage,
            &payload(
                "PFS2E 1-01",
                "2024-01-10",
                vec![signup(1, 2001, "Lem"), signup(2, 2001, "Lem"), signup(2, 2002, "Merisiel")],
            ),
        )
        .await
        .unwrap();

        let keep = character(&storage, 1, 2001).await;
        let remove = character(&storage, 2, 2001).await;
        let outcome = merge_characters(&storage, &keep, &remove).await.unwrap();

        assert_eq!(outcome.moved_signups, 1);
        assert_eq!(outcome.deleted_player, None);
        assert!(storage.get_player(2).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn merge_into_self_is_rejected() {
        let storage = test_storage().await;
        seed_catalog(&storage).await;
        import_session(
            &storage,
            &payload("PFS2E 1-01", "2024-01-10", vec![signup(1, 2001, "Lem")]),
        )
        .await
        .unwrap();
        let lem = character(&storage, 1, 2001).await;

        let err = merge_characters(&storage, &lem, &lem).await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation { .. }));
        assert!(storage.get_character(&lem.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn renames() {
        let storage = test_storage().await;
        seed_catalog(&storage).await;
        let mut unnamed = signup(5, 2003, "");
        unnamed.character_name = None;
        import_session(&storage, &payload("PFS2E 1-01", "2024-01-10", vec![unnamed]))
            .await
            .unwrap();
        let c = character(&storage, 5, 2003).await;
        assert_eq!(c.name, None);

        rename_character(&storage, &c.id, "  Alahazra ").await.unwrap();
        let found = find_characters(&storage, "Alahazra", &[]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name.as_deref(), Some("Alahazra"));

        assert!(rename_character(&storage, &c.id, "   ").await.is_err());
        assert!(
            rename_character(&storage, "no-such-id", "X")
                .await
                .unwrap_err()
                .is_not_found()
        );

        rename_player(&storage, 5, "Pat").await.unwrap();
        assert_eq!(
            storage.get_player(5).await.unwrap().unwrap().name.as_deref(),
            Some("Pat")
        );
        assert!(rename_player(&storage, 6, "Nobody").await.unwrap_err().is_not_found());
    }
}
