//! Event stage business logic - Reads and changes the singleton event state.
//!
//! The event state row is created lazily on first access, always with id 1, so
//! concurrent first reads still converge on a single row. Admins may move the event
//! to any stage at any time; the only enforcement is on the public side, where each
//! action checks the current stage through [`ensure_stage`].

use crate::{
    entities::{EventStage, EventState, event_state},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::OnConflict};
use std::fmt;
use tracing::info;

const EVENT_STATE_ID: i32 = 1;

/// Public action gated by the event stage and consumed once per member code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageAction {
    /// Submitting nominations
    Nominate,
    /// Submitting votes
    Vote,
}

impl StageAction {
    /// The only stage in which this action is accepted.
    #[must_use]
    pub const fn required_stage(self) -> EventStage {
        match self {
            Self::Nominate => EventStage::Nominations,
            Self::Vote => EventStage::Voting,
        }
    }
}

impl fmt::Display for StageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Nominate => "nominate",
            Self::Vote => "vote",
        })
    }
}

/// Returns the current event state, creating it in the `SETUP` stage if it does not
/// exist yet.
pub async fn get_event_state<C>(db: &C) -> Result<event_state::Model>
where
    C: ConnectionTrait,
{
    if let Some(state) = find_event_state(db).await? {
        return Ok(state);
    }

    let initial = event_state::ActiveModel {
        id: Set(EVENT_STATE_ID),
        state: Set(EventStage::Setup),
        winners_visible: Set(false),
        updated_at: Set(chrono::Utc::now()),
    };
    EventState::insert(initial)
        .on_conflict(
            OnConflict::column(event_state::Column::Id)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    find_event_state(db).await?.ok_or_else(|| Error::Config {
        message: "Event state could not be initialized".to_string(),
    })
}

/// Returns only the current stage.
///
/// This function is used by the ballot pipeline inside its transaction. Like
/// [`get_event_state`] it creates the state row if it is missing.
pub async fn current_stage<C>(db: &C) -> Result<EventStage>
where
    C: ConnectionTrait,
{
    Ok(get_event_state(db).await?.state)
}

/// Moves the event to `stage`. Any stage may follow any other.
///
/// `winners_visible` is left unchanged when `None`.
pub async fn set_event_state(
    db: &DatabaseConnection,
    stage: EventStage,
    winners_visible: Option<bool>,
) -> Result<event_state::Model> {
    let current = get_event_state(db).await?;
    let previous = current.state;

    let mut active: event_state::ActiveModel = current.into();
    active.state = Set(stage);
    if let Some(visible) = winners_visible {
        active.winners_visible = Set(visible);
    }
    active.updated_at = Set(chrono::Utc::now());
    let updated = active.update(db).await?;

    if previous != stage {
        info!(from = %previous, to = %stage, "Event stage changed");
    }
    Ok(updated)
}

/// Fails with [`Error::WrongStage`] unless `stage` allows `action`.
pub fn ensure_stage(stage: EventStage, action: StageAction) -> Result<()> {
    if stage == action.required_stage() {
        Ok(())
    } else {
        Err(Error::WrongStage { action, stage })
    }
}

async fn find_event_state<C>(db: &C) -> Result<Option<event_state::Model>>
where
    C: ConnectionTrait,
{
    EventState::find()
        .order_by_asc(event_state::Column::Id)
        .one(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::PaginatorTrait;

    #[tokio::test]
    async fn test_event_state_created_lazily_in_setup() -> Result<()> {
        let db = setup_test_db().await?;
        assert_eq!(EventState::find().count(&db).await?, 0);

        let state = get_event_state(&db).await?;
        assert_eq!(state.state, EventStage::Setup);
        assert!(!state.winners_visible);

        // A second read does not create another row
        get_event_state(&db).await?;
        assert_eq!(EventState::find().count(&db).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_set_event_state_allows_any_transition() -> Result<()> {
        let db = setup_test_db().await?;

        let state = set_event_state(&db, EventStage::Closed, None).await?;
        assert_eq!(state.state, EventStage::Closed);

        let state = set_event_state(&db, EventStage::Nominations, Some(true)).await?;
        assert_eq!(state.state, EventStage::Nominations);
        assert!(state.winners_visible);

        // winners_visible is preserved when not given
        let state = set_event_state(&db, EventStage::Voting, None).await?;
        assert!(state.winners_visible);

        assert_eq!(EventState::find().count(&db).await?, 1);
        Ok(())
    }

    #[test]
    fn test_ensure_stage() {
        assert!(ensure_stage(EventStage::Nominations, StageAction::Nominate).is_ok());
        assert!(ensure_stage(EventStage::Voting, StageAction::Vote).is_ok());

        let err = ensure_stage(EventStage::Voting, StageAction::Nominate).unwrap_err();
        assert!(matches!(
            err,
            Error::WrongStage {
                action: StageAction::Nominate,
                stage: EventStage::Voting
            }
        ));
        assert!(ensure_stage(EventStage::Closed, StageAction::Vote).is_err());
        assert!(ensure_stage(EventStage::Setup, StageAction::Nominate).is_err());
    }

    #[test]
    fn test_stage_parsing() {
        assert_eq!("voting".parse::<EventStage>().unwrap(), EventStage::Voting);
        assert_eq!(" CLOSED ".parse::<EventStage>().unwrap(), EventStage::Closed);
        assert!("FINISHED".parse::<EventStage>().is_err());
    }
}
