// Server-side progress bookkeeping.
// Pure functions; the store loads the records, calls these, and writes the results back.

use crate::types::{
    GameMode, Level, ModeStats, PlayerStats, Question, SubmissionPayload, SubmissionReceipt,
    UserProgress,
};
use chrono::{DateTime, Utc};

/// Reasons a submission is refused before anything is written
pub fn validate_submission(payload: &SubmissionPayload) -> Result<(), String> {
    if payload.user_id.trim().is_empty() {
        return Err("User ID is required".to_string());
    }
    if payload.level_id < 1 {
        return Err("Level ID must be a positive integer".to_string());
    }
    if payload.question_id < 1 {
        return Err("Question ID must be a positive integer".to_string());
    }
    if payload.code.trim().is_empty() {
        return Err("Code is required".to_string());
    }
    Ok(())
}

/// Id of the level after `level_id`; `None` at the top of the id range
pub fn next_level(level_id: u32) -> Option<u32> {
    level_id.checked_add(1)
}

/// Record a completed question against the user's progress and stats.
///
/// `next_level_exists` gates the Career unlock of `level_id + 1`.
pub fn apply_submission(
    progress: Option<UserProgress>,
    mut stats: PlayerStats,
    payload: &SubmissionPayload,
    next_level_exists: bool,
    now: DateTime<Utc>,
) -> SubmissionReceipt {
    let mut progress =
        progress.unwrap_or_else(|| UserProgress::new(&payload.user_id, payload.question()));

    progress.attempts += 1;
    progress.completed = true;
    progress.score = progress.score.max(payload.score);
    progress.time_spent += payload.time_spent;
    progress.completed_at = Some(now);
    progress.solution = Some(payload.code.clone());
    progress.hints_used += payload.hints_used;

    let mode_stats = stats.mode_mut(payload.game_mode);
    mode_stats.total_score += u64::from(payload.score);
    mode_stats.max_level = mode_stats.max_level.max(payload.level_id);
    mode_stats.max_question = mode_stats.max_question.max(payload.question_id);
    for key in &payload.achievements {
        if !mode_stats.achievements.contains(key) {
            mode_stats.achievements.push(*key);
        }
    }

    if payload.game_mode == GameMode::Career && next_level_exists {
        if let Some(next_level_id) = next_level(payload.level_id) {
            if !mode_stats.unlocked_levels.contains(&next_level_id) {
                mode_stats.unlocked_levels.push(next_level_id);
            }
        }
    }

    SubmissionReceipt {
        progress,
        updated_stats: stats,
    }
}

/// Mark a level completed once every one of its questions is completed
pub fn record_level_completion(
    stats: &mut ModeStats,
    level_id: u32,
    question_ids: &[u32],
    progress: &[UserProgress],
) -> bool {
    if stats.completed_levels.contains(&level_id) || question_ids.is_empty() {
        return false;
    }
    let done = question_ids.iter().all(|qid| {
        progress
            .iter()
            .any(|p| p.level_id == level_id && p.question_id == *qid && p.completed)
    });
    if done {
        stats.completed_levels.push(level_id);
    }
    done
}

/// Active levels for a mode, ordered, with unlock status for the caller
///
/// Quick Fire levels are always open. Career levels are open when listed in
/// the player's unlocked set; without a player only level 1 is open.
pub fn levels_for(levels: &[Level], mode: GameMode, stats: Option<&ModeStats>) -> Vec<Level> {
    let mut out: Vec<Level> = levels
        .iter()
        .filter(|l| l.game_mode == mode && l.is_active)
        .cloned()
        .collect();
    out.sort_by_key(|l| l.order);

    let default_unlocked = ModeStats::new(GameMode::Career).unlocked_levels;
    let unlocked = stats
        .map(|s| s.unlocked_levels.as_slice())
        .unwrap_or(default_unlocked.as_slice());

    for level in &mut out {
        level.unlocked = match mode {
            GameMode::QuickFire => true,
            GameMode::Career => unlocked.contains(&level.level_id),
        };
    }
    out
}

/// Active questions for one level, ordered by question id
pub fn questions_for(questions: &[Question], mode: GameMode, level_id: u32) -> Vec<Question> {
    let mut out: Vec<Question> = questions
        .iter()
        .filter(|q| q.game_mode == mode && q.level_id == level_id && q.is_active)
        .cloned()
        .collect();
    out.sort_by_key(|q| q.question_id);
    out
}
