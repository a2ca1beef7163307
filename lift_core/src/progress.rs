//! Programme progress state machine.
//!
//! `NOT_STARTED -> IN_PROGRESS -> COMPLETED`, advanced once per completed
//! workout belonging to the programme. Progress has a single writer per
//! programme; there is no version token, so two concurrent completions of
//! the same programme can race.

use crate::{Error, Programme, ProgrammeProgress, ProgrammeStatus, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Persistence seam for programmes and their progress
pub trait ProgrammeStore {
    fn load_programme(&self, id: Uuid) -> Result<Programme>;
    fn save_programme(&mut self, programme: &Programme) -> Result<()>;
    fn load_progress(&self, programme_id: Uuid) -> Result<Option<ProgrammeProgress>>;
    fn save_progress(&mut self, progress: &ProgrammeProgress) -> Result<()>;
}

/// What a completion event did to the programme
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Programme was already completed; nothing changed
    NoOp,
    Advanced,
    Completed,
}

fn adherence(completed: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        f64::from(completed) / f64::from(total) * 100.0
    }
}

/// Workouts the programme itself has marked done
fn completed_count(programme: &Programme) -> u32 {
    programme.workouts.iter().filter(|w| w.is_completed).count() as u32
}

/// (week, day) of the first workout not yet done, in template order
fn next_pending(programme: &Programme) -> Option<(u32, u32)> {
    programme
        .ordered_workouts()
        .into_iter()
        .find(|w| !w.is_completed)
        .map(|w| (w.week, w.day))
}

/// Start a programme and create its progress
pub fn activate(programme: &mut Programme, now: DateTime<Utc>) -> ProgrammeProgress {
    if programme.status == ProgrammeStatus::NotStarted {
        programme.status = ProgrammeStatus::InProgress;
        programme.started_at = Some(now);
    }
    programme.is_active = programme.status != ProgrammeStatus::Completed;

    let (current_week, current_day) = next_pending(programme).unwrap_or((1, 1));
    let total_workouts = programme.workouts.len() as u32;
    let completed_workouts = completed_count(programme);

    tracing::info!(
        "Activated programme {} ({} workouts)",
        programme.name,
        total_workouts
    );

    ProgrammeProgress {
        programme_id: programme.id,
        current_week,
        current_day,
        completed_workouts,
        total_workouts,
        adherence_percentage: adherence(completed_workouts, total_workouts),
        last_workout_date: None,
    }
}

/// Apply one workout-completed event
///
/// The workout itself is expected to be marked completed in `programme`
/// already. The completed count is taken from the programme's own flags
/// rather than incremented, so a progress write lost on an earlier event
/// is made good by the next one.
pub fn advance(
    progress: &mut ProgrammeProgress,
    programme: &mut Programme,
    now: DateTime<Utc>,
) -> Transition {
    if programme.status == ProgrammeStatus::Completed
        && progress.completed_workouts >= progress.total_workouts
    {
        tracing::debug!("Programme {} already completed, ignoring event", programme.name);
        return Transition::NoOp;
    }
    if programme.status == ProgrammeStatus::NotStarted {
        programme.status = ProgrammeStatus::InProgress;
        programme.started_at.get_or_insert(now);
    }

    let mut completed = completed_count(programme);
    progress.last_workout_date = Some(now);

    match next_pending(programme) {
        Some((week, day)) => {
            progress.current_week = week;
            progress.current_day = day;
        }
        None => {
            let persisted = programme.workouts.len() as u32;
            if programme.is_custom && persisted > progress.total_workouts {
                tracing::warn!(
                    "Programme {} total workouts {} undercounts {} persisted, correcting",
                    programme.name,
                    progress.total_workouts,
                    persisted
                );
                progress.total_workouts = persisted;
            }
        }
    }

    if completed > progress.total_workouts {
        completed = progress.total_workouts;
    }
    progress.completed_workouts = completed;

    let transition = if completed >= progress.total_workouts {
        programme.status = ProgrammeStatus::Completed;
        programme.completed_at.get_or_insert(now);
        programme.is_active = false;
        tracing::info!("Programme {} completed", programme.name);
        Transition::Completed
    } else {
        Transition::Advanced
    };

    progress.adherence_percentage = adherence(progress.completed_workouts, progress.total_workouts);

    tracing::debug!(
        "Progress for {}: {}/{} ({:.1}%), next week {} day {}",
        programme.name,
        progress.completed_workouts,
        progress.total_workouts,
        progress.adherence_percentage,
        progress.current_week,
        progress.current_day
    );

    transition
}

/// Load, advance and persist progress for a programme
///
/// Missing progress is rebuilt from the programme's workouts first. The
/// programme is saved before its progress; either write failing leaves a
/// state that [`resync_progress`] repairs on the next event.
pub fn advance_progress<S: ProgrammeStore + ?Sized>(
    store: &mut S,
    programme_id: Uuid,
    now: DateTime<Utc>,
) -> Result<ProgrammeProgress> {
    let mut programme = store.load_programme(programme_id)?;

    let mut progress = match store.load_progress(programme_id)? {
        Some(progress) => progress,
        None => {
            tracing::warn!("No progress for programme {}, rebuilding", programme_id);
            activate(&mut programme, now)
        }
    };

    if progress.programme_id != programme_id {
        return Err(Error::State(format!(
            "progress belongs to {}, not {}",
            progress.programme_id, programme_id
        )));
    }

    let transition = advance(&mut progress, &mut programme, now);
    if transition == Transition::NoOp {
        return Ok(progress);
    }

    store.save_programme(&programme)?;
    store.save_progress(&progress)?;
    Ok(progress)
}

/// Whether stored progress agrees with the programme's completion flags
fn in_sync(progress: &ProgrammeProgress, programme: &Programme) -> bool {
    let expected = completed_count(programme).min(progress.total_workouts);
    let finished = progress.completed_workouts >= progress.total_workouts;
    progress.completed_workouts == expected
        && finished == (programme.status == ProgrammeStatus::Completed)
}

/// Bring progress back in line after an event that completed no new workout
///
/// Returns `None` when progress already agrees with the programme.
pub fn resync_progress<S: ProgrammeStore + ?Sized>(
    store: &mut S,
    programme_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Option<ProgrammeProgress>> {
    let programme = store.load_programme(programme_id)?;
    if let Some(progress) = store.load_progress(programme_id)? {
        if in_sync(&progress, &programme) {
            return Ok(None);
        }
        tracing::warn!(
            "Progress for {} shows {}/{} but {} workouts are done, resyncing",
            programme.name,
            progress.completed_workouts,
            progress.total_workouts,
            completed_count(&programme)
        );
    }

    advance_progress(store, programme_id, now).map(Some)
}
