use crate::error::{StoreError, StoreResult};
use crate::progress;
use crate::types::{
    Achievement, CheckJob, CheckReport, GameMode, LeaderboardEntry, Level, ModeStats,
    PlayerStats, Question, QuestionRef, SubmissionPayload, SubmissionReceipt, UserProgress,
};
use redis::{AsyncCommands, RedisResult};
use std::time::Duration;

/// Redis key semantics - defines only key layout, not runtime logic
/// Keeps the API, worker and CLI agreeing on where everything lives

pub const QUEUE_KEY: &str = "fixit:queue:checks";
pub const RESULT_PREFIX: &str = "fixit:result";
pub const LEVELS_KEY: &str = "fixit:content:levels";
pub const QUESTIONS_KEY: &str = "fixit:content:questions";
pub const ACHIEVEMENTS_KEY: &str = "fixit:content:achievements";
pub const PROGRESS_PREFIX: &str = "fixit:progress";
pub const STATS_PREFIX: &str = "fixit:stats";
pub const LEADERBOARD_PREFIX: &str = "fixit:leaderboard";
pub const LOCK_PREFIX: &str = "fixit:lock";

/// A submission lock outlives a crashed holder by at most this long
const SUBMIT_LOCK_TTL_MS: u64 = 5_000;
const SUBMIT_LOCK_ATTEMPTS: u32 = 100;
const SUBMIT_LOCK_RETRY: Duration = Duration::from_millis(25);

/// Delete the lock only while it still holds our token
const RELEASE_LOCK_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
  return redis.call("DEL", KEYS[1])
end
return 0
"#;

/// Generate result key for a check job
pub fn result_key(job_id: &uuid::Uuid) -> String {
    format!("{}:{}", RESULT_PREFIX, job_id)
}

/// Hash holding one user's per-question progress for a mode
pub fn progress_key(user_id: &str, mode: GameMode) -> String {
    format!("{}:{}:{}", PROGRESS_PREFIX, user_id, mode)
}

/// Field inside the progress hash
pub fn progress_field(level_id: u32, question_id: u32) -> String {
    format!("{}:{}", level_id, question_id)
}

pub fn stats_key(user_id: &str) -> String {
    format!("{}:{}", STATS_PREFIX, user_id)
}

pub fn leaderboard_key(mode: GameMode) -> String {
    format!("{}:{}", LEADERBOARD_PREFIX, mode)
}

/// Serializes submissions per user; stats span both modes
pub fn submit_lock_key(user_id: &str) -> String {
    format!("{}:submit:{}", LOCK_PREFIX, user_id)
}

fn to_redis_err(what: &'static str, e: serde_json::Error) -> redis::RedisError {
    redis::RedisError::from((redis::ErrorKind::TypeError, what, e.to_string()))
}

/// Push a check job onto the queue
/// Uses RPUSH for FIFO semantics
pub async fn push_job(
    conn: &mut redis::aio::ConnectionManager,
    job: &CheckJob,
) -> RedisResult<()> {
    let payload =
        serde_json::to_string(job).map_err(|e| to_redis_err("serialization error", e))?;

    conn.rpush(QUEUE_KEY, payload).await
}

/// Pop a check job from the queue
/// Uses BLPOP with timeout for graceful shutdown
pub async fn pop_job(
    conn: &mut redis::aio::ConnectionManager,
    timeout_seconds: f64,
) -> RedisResult<Option<CheckJob>> {
    let result: Option<(String, String)> = conn.blpop(QUEUE_KEY, timeout_seconds).await?;

    match result {
        Some((_key, payload)) => {
            let job: CheckJob = serde_json::from_str(&payload)
                .map_err(|e| to_redis_err("deserialization error", e))?;
            Ok(Some(job))
        }
        None => Ok(None),
    }
}

/// Store a check report with the given TTL
pub async fn store_result(
    conn: &mut redis::aio::ConnectionManager,
    report: &CheckReport,
    ttl_seconds: u64,
) -> RedisResult<()> {
    let key = result_key(&report.job_id);
    let payload =
        serde_json::to_string(report).map_err(|e| to_redis_err("serialization error", e))?;

    let _: () = redis::cmd("SET")
        .arg(&key)
        .arg(payload)
        .arg("EX")
        .arg(ttl_seconds)
        .query_async(conn)
        .await?;
    Ok(())
}

/// Retrieve a check report
pub async fn get_result(
    conn: &mut redis::aio::ConnectionManager,
    job_id: &uuid::Uuid,
) -> RedisResult<Option<CheckReport>> {
    let payload: Option<String> = conn.get(result_key(job_id)).await?;

    match payload {
        Some(data) => {
            let report: CheckReport = serde_json::from_str(&data)
                .map_err(|e| to_redis_err("deserialization error", e))?;
            Ok(Some(report))
        }
        None => Ok(None),
    }
}

async fn get_json<T: serde::de::DeserializeOwned>(
    conn: &mut redis::aio::ConnectionManager,
    key: &str,
) -> StoreResult<Option<T>> {
    let payload: Option<String> = conn.get(key).await?;
    match payload {
        Some(data) => Ok(Some(serde_json::from_str(&data)?)),
        None => Ok(None),
    }
}

/// Replace all seeded content
pub async fn seed_content(
    conn: &mut redis::aio::ConnectionManager,
    levels: &[Level],
    questions: &[Question],
    achievements: &[Achievement],
) -> StoreResult<()> {
    let levels_json = serde_json::to_string(levels)?;
    let questions_json = serde_json::to_string(questions)?;
    let achievements_json = serde_json::to_string(achievements)?;

    let _: () = redis::pipe()
        .atomic()
        .set(LEVELS_KEY, levels_json)
        .set(QUESTIONS_KEY, questions_json)
        .set(ACHIEVEMENTS_KEY, achievements_json)
        .query_async(conn)
        .await?;
    Ok(())
}

async fn all_levels(conn: &mut redis::aio::ConnectionManager) -> StoreResult<Vec<Level>> {
    Ok(get_json(conn, LEVELS_KEY).await?.unwrap_or_default())
}

async fn all_questions(conn: &mut redis::aio::ConnectionManager) -> StoreResult<Vec<Question>> {
    Ok(get_json(conn, QUESTIONS_KEY).await?.unwrap_or_default())
}

pub async fn get_achievements(
    conn: &mut redis::aio::ConnectionManager,
) -> StoreResult<Vec<Achievement>> {
    Ok(get_json(conn, ACHIEVEMENTS_KEY).await?.unwrap_or_default())
}

/// Stats for a user; a user with no submissions gets fresh stats
pub async fn get_stats(
    conn: &mut redis::aio::ConnectionManager,
    user_id: &str,
) -> StoreResult<PlayerStats> {
    Ok(get_json(conn, &stats_key(user_id)).await?.unwrap_or_default())
}

/// Levels for a mode with the caller's unlock status
pub async fn get_levels(
    conn: &mut redis::aio::ConnectionManager,
    mode: GameMode,
    user_id: Option<&str>,
) -> StoreResult<Vec<Level>> {
    let levels = all_levels(conn).await?;
    let stats = match user_id {
        Some(user_id) => Some(get_stats(conn, user_id).await?),
        None => None,
    };
    Ok(progress::levels_for(&levels, mode, stats.as_ref().map(|s| s.mode(mode))))
}

/// Questions for one level; empty when the level has none
pub async fn get_questions(
    conn: &mut redis::aio::ConnectionManager,
    mode: GameMode,
    level_id: u32,
) -> StoreResult<Vec<Question>> {
    let questions = all_questions(conn).await?;
    Ok(progress::questions_for(&questions, mode, level_id))
}

pub async fn get_question(
    conn: &mut redis::aio::ConnectionManager,
    question: QuestionRef,
) -> StoreResult<Option<Question>> {
    let questions = get_questions(conn, question.game_mode, question.level_id).await?;
    Ok(questions
        .into_iter()
        .find(|q| q.question_id == question.question_id))
}

async fn acquire_lock(
    conn: &mut redis::aio::ConnectionManager,
    key: &str,
    token: &str,
) -> StoreResult<()> {
    for _ in 0..SUBMIT_LOCK_ATTEMPTS {
        let acquired: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(token)
            .arg("NX")
            .arg("PX")
            .arg(SUBMIT_LOCK_TTL_MS)
            .query_async(conn)
            .await?;
        if acquired.is_some() {
            return Ok(());
        }
        tokio::time::sleep(SUBMIT_LOCK_RETRY).await;
    }
    Err(StoreError::Busy(format!(
        "Another submission for this user is still being recorded ({})",
        key
    )))
}

async fn release_lock(
    conn: &mut redis::aio::ConnectionManager,
    key: &str,
    token: &str,
) -> StoreResult<bool> {
    let deleted: i64 = redis::Script::new(RELEASE_LOCK_SCRIPT)
        .key(key)
        .arg(token)
        .invoke_async(conn)
        .await?;
    Ok(deleted == 1)
}

/// Record a solved question and return the updated progress and stats
///
/// The read-modify-write runs under a per-user lock (`SET NX PX` with a
/// random token), so concurrent submissions from one user are applied one
/// after the other instead of overwriting each other's stats. The final
/// write is a single MULTI/EXEC pipeline.
pub async fn submit_solution(
    conn: &mut redis::aio::ConnectionManager,
    payload: &SubmissionPayload,
) -> StoreResult<SubmissionReceipt> {
    progress::validate_submission(payload).map_err(StoreError::InvalidSubmission)?;

    let lock = submit_lock_key(&payload.user_id);
    let token = uuid::Uuid::new_v4().to_string();
    acquire_lock(conn, &lock, &token).await?;

    let receipt = record_solution(conn, payload).await;

    match release_lock(conn, &lock, &token).await {
        Ok(true) => {}
        Ok(false) => tracing::warn!(
            user_id = %payload.user_id,
            "Submission lock expired before release"
        ),
        Err(e) => tracing::warn!(
            user_id = %payload.user_id,
            error = %e,
            "Failed to release submission lock"
        ),
    }
    receipt
}

async fn record_solution(
    conn: &mut redis::aio::ConnectionManager,
    payload: &SubmissionPayload,
) -> StoreResult<SubmissionReceipt> {
    let mode = payload.game_mode;
    let progress_hash = progress_key(&payload.user_id, mode);
    let field = progress_field(payload.level_id, payload.question_id);

    let existing: Option<String> = conn.hget(&progress_hash, &field).await?;
    let existing: Option<UserProgress> = match existing {
        Some(data) => Some(serde_json::from_str(&data)?),
        None => None,
    };
    let stats = get_stats(conn, &payload.user_id).await?;
    let levels = progress::levels_for(&all_levels(conn).await?, mode, None);
    let next_level_exists = progress::next_level(payload.level_id)
        .is_some_and(|next| levels.iter().any(|l| l.level_id == next));

    let mut receipt = progress::apply_submission(
        existing,
        stats,
        payload,
        next_level_exists,
        chrono::Utc::now(),
    );

    let mut user_progress = list_progress(conn, &payload.user_id, mode).await?;
    user_progress.retain(|p| {
        !(p.level_id == payload.level_id && p.question_id == payload.question_id)
    });
    user_progress.push(receipt.progress.clone());
    if let Some(level) = levels.iter().find(|l| l.level_id == payload.level_id) {
        progress::record_level_completion(
            receipt.updated_stats.mode_mut(mode),
            level.level_id,
            &level.question_ids,
            &user_progress,
        );
    }

    let total_score = receipt.updated_stats.mode(mode).total_score;
    let _: () = redis::pipe()
        .atomic()
        .hset(&progress_hash, &field, serde_json::to_string(&receipt.progress)?)
        .set(stats_key(&payload.user_id), serde_json::to_string(&receipt.updated_stats)?)
        .zadd(leaderboard_key(mode), &payload.user_id, total_score)
        .query_async(conn)
        .await?;

    tracing::info!(
        user_id = %payload.user_id,
        game_mode = %mode,
        level_id = payload.level_id,
        question_id = payload.question_id,
        score = payload.score,
        total_score,
        "Solution recorded"
    );

    Ok(receipt)
}

async fn list_progress(
    conn: &mut redis::aio::ConnectionManager,
    user_id: &str,
    mode: GameMode,
) -> StoreResult<Vec<UserProgress>> {
    let values: Vec<String> = conn.hvals(progress_key(user_id, mode)).await?;
    let mut progress = values
        .iter()
        .map(|v| serde_json::from_str(v))
        .collect::<Result<Vec<UserProgress>, _>>()?;
    progress.sort_by_key(|p| (p.level_id, p.question_id));
    Ok(progress)
}

/// A user's progress records for a mode, ordered by level then question
pub async fn get_progress(
    conn: &mut redis::aio::ConnectionManager,
    user_id: &str,
    mode: GameMode,
) -> StoreResult<(Vec<UserProgress>, ModeStats)> {
    let progress = list_progress(conn, user_id, mode).await?;
    let stats = get_stats(conn, user_id).await?;
    Ok((progress, stats.mode(mode).clone()))
}

/// Top players for a mode by total score
pub async fn get_leaderboard(
    conn: &mut redis::aio::ConnectionManager,
    mode: GameMode,
    limit: usize,
) -> StoreResult<Vec<LeaderboardEntry>> {
    if limit == 0 {
        return Ok(Vec::new());
    }
    let top: Vec<(String, f64)> = conn
        .zrevrange_withscores(leaderboard_key(mode), 0, limit as isize - 1)
        .await?;

    let mut entries = Vec::with_capacity(top.len());
    for (idx, (user_id, score)) in top.into_iter().enumerate() {
        let stats = get_stats(conn, &user_id).await?;
        let mode_stats = stats.mode(mode);
        entries.push(LeaderboardEntry {
            rank: (idx + 1) as u32,
            user_id,
            score: score as u64,
            level: mode_stats.max_level,
            achievements: mode_stats.achievements.len(),
        });
    }
    Ok(entries)
}
