// CLI commands for managing and playing Fixit content
use anyhow::{bail, Context, Result};
use fixit_common::config::Config;
use fixit_common::game::{GameEvent, GameState};
use fixit_common::progress;
use fixit_common::redis;
use fixit_common::types::{
    Achievement, CheckReport, GameMode, Level, Question, SubmissionPayload,
};
use fixit_engine::Executor;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use std::time::Instant;
use uuid::Uuid;

/// Everything under the content directory
#[derive(Debug)]
pub struct Content {
    pub levels: Vec<Level>,
    pub questions: Vec<Question>,
    pub achievements: Vec<Achievement>,
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load levels, questions and achievements from a content directory
pub fn load_content(dir: &Path) -> Result<Content> {
    if !dir.is_dir() {
        bail!("Content directory not found: {}", dir.display());
    }
    Ok(Content {
        levels: load_json(&dir.join("levels.json"))?,
        questions: load_json(&dir.join("questions.json"))?,
        achievements: load_json(&dir.join("achievements.json"))?,
    })
}

fn parse_mode(mode: &str) -> Result<GameMode> {
    match GameMode::from_str(mode) {
        Some(mode) => Ok(mode),
        None => bail!("Invalid game mode '{}' (expected quickFire or career)", mode),
    }
}

async fn connect() -> Result<::redis::aio::ConnectionManager> {
    let config = Config::from_env();
    let client = ::redis::Client::open(config.redis_url.as_str())
        .context("Failed to create Redis client")?;
    ::redis::aio::ConnectionManager::new(client)
        .await
        .with_context(|| format!("Failed to connect to Redis at {}", config.redis_url))
}

/// Seed Redis with the content directory
pub async fn seed(content_dir: &Path) -> Result<()> {
    let content = load_content(content_dir)?;
    println!("🌱 Seeding content from {}", content_dir.display());

    let mut conn = connect().await?;
    redis::seed_content(&mut conn, &content.levels, &content.questions, &content.achievements)
        .await
        .context("Failed to seed content")?;

    println!("✅ Seeded {} levels", content.levels.len());
    println!("✅ Seeded {} questions", content.questions.len());
    println!("✅ Seeded {} achievements", content.achievements.len());
    Ok(())
}

/// Reports for every question's fixedCode, in content order
pub fn verify_questions(questions: &[Question]) -> Result<Vec<(&Question, CheckReport)>> {
    let executor = Executor::default();
    questions
        .iter()
        .map(|question| {
            let report = executor
                .check(
                    Uuid::new_v4(),
                    &question.fixed_code,
                    &question.test_cases,
                    question.is_async,
                )
                .with_context(|| format!("Engine failed on '{}'", question.title))?;
            Ok((question, report))
        })
        .collect()
}

/// Verify that every fixedCode solves its own question
pub fn verify(content_dir: &Path) -> Result<()> {
    let content = load_content(content_dir)?;
    println!("🔍 Verifying {} questions", content.questions.len());

    let mut failures = 0;
    for (question, report) in verify_questions(&content.questions)? {
        let label = format!(
            "{} L{}Q{} {}",
            question.game_mode, question.level_id, question.question_id, question.title
        );
        if report.is_solved() {
            println!("  ✅ {}", label);
        } else {
            failures += 1;
            println!("  ❌ {}", label);
            print_report(&report);
        }
    }

    if failures > 0 {
        bail!("{} question(s) have a fixedCode that does not pass", failures);
    }
    println!("✅ All questions verified");
    Ok(())
}

fn find_question(content: &Content, mode: GameMode, level_id: u32, question_id: u32) -> Result<&Question> {
    content
        .questions
        .iter()
        .find(|q| q.game_mode == mode && q.level_id == level_id && q.question_id == question_id)
        .with_context(|| {
            format!(
                "No {} question {} in level {}",
                mode, question_id, level_id
            )
        })
}

fn print_report(report: &CheckReport) {
    if let Some(error) = &report.verdict.error {
        println!("     ⛔ {}", error);
    }
    let Some(result) = &report.execution else {
        return;
    };
    if let Some(error) = &result.error {
        println!("     ⚠️  {}", error);
    }
    for outcome in &result.results {
        let actual = outcome
            .actual
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "undefined".to_string());
        println!(
            "     {} {} → expected {}, got {}",
            if outcome.passed { "✓" } else { "✗" },
            serde_json::Value::Array(outcome.input.clone()),
            outcome.expected,
            actual
        );
    }
}

/// Check a solution file against one question
pub fn check_file(
    content_dir: &Path,
    mode: &str,
    level_id: u32,
    question_id: u32,
    file: &Path,
) -> Result<()> {
    let mode = parse_mode(mode)?;
    let content = load_content(content_dir)?;
    let question = find_question(&content, mode, level_id, question_id)?;
    let source = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    println!("🧪 {}: {}", question.title, question.description);
    let report = Executor::default()
        .check(Uuid::new_v4(), &source, &question.test_cases, question.is_async)
        .context("Engine failure")?;
    print_report(&report);

    if !report.is_solved() {
        bail!("Solution does not pass");
    }
    println!("✅ Solved! {}", question.explanation);
    Ok(())
}

/// Result of playing one level locally
#[derive(Debug)]
pub struct LevelRun {
    pub state: GameState,
    /// One payload per solved question, ready for the store
    pub solves: Vec<SubmissionPayload>,
}

/// Play every question of a level with solutions from `solutions_dir`
///
/// A question without a `<questionId>.js` file is attempted with its broken
/// code, so it fails like an untouched editor would.
pub fn run_level(
    content: &Content,
    mode: GameMode,
    level_id: u32,
    solutions_dir: &Path,
    user_id: &str,
) -> Result<LevelRun> {
    let level = content
        .levels
        .iter()
        .find(|l| l.game_mode == mode && l.level_id == level_id)
        .with_context(|| format!("No {} level {}", mode, level_id))?;
    let questions = progress::questions_for(&content.questions, mode, level_id);
    if questions.is_empty() {
        bail!("No questions found for this level");
    }

    let executor = Executor::default();
    let mut solves = Vec::new();
    let mut state = GameState::new(mode).apply(GameEvent::LevelSelected {
        level_id,
        total_questions: questions.len() as u32,
        time_limit: level.time_limit,
    });

    for question in &questions {
        state = state.apply(GameEvent::QuestionStarted {
            question_id: question.question_id,
            code: question.broken_code.clone(),
        });

        let path = solutions_dir.join(format!("{}.js", question.question_id));
        if path.exists() {
            let code = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            state = state.apply(GameEvent::CodeUpdated(code));
        }

        let started = Instant::now();
        let report = executor
            .check(Uuid::new_v4(), &state.user_code, &question.test_cases, question.is_async)
            .context("Engine failure")?;
        let elapsed = started.elapsed();

        for _ in 0..elapsed.as_secs() {
            state = state.apply(GameEvent::Tick);
        }

        state = match report.execution {
            None => state.apply(GameEvent::Rejected {
                error: report.verdict.error.unwrap_or_default(),
            }),
            Some(result) => state.apply(GameEvent::Checked {
                result,
                question_points: Some(question.points),
                explanation: question.explanation.clone(),
                elapsed_secs: elapsed.as_secs_f64(),
            }),
        };

        let mark = if state.is_correct { "✅" } else { "❌" };
        println!("{} Q{} {}: {}", mark, question.question_id, question.title, state.feedback);

        if let Some(solve) = &state.last_solve {
            solves.push(SubmissionPayload {
                user_id: user_id.to_string(),
                game_mode: mode,
                level_id,
                question_id: solve.question_id,
                code: state.user_code.clone(),
                score: solve.points,
                time_spent: elapsed.as_secs(),
                hints_used: u32::from(solve.hint_used),
                achievements: solve.new_achievements.clone(),
            });
        }

        if state.is_game_over() {
            println!("💀 Out of lives");
            break;
        }
    }

    Ok(LevelRun { state, solves })
}

/// Play a level and, when a user is given, record the solves in Redis
pub async fn play(
    content_dir: &Path,
    mode: &str,
    level_id: u32,
    solutions_dir: &Path,
    user_id: Option<&str>,
) -> Result<()> {
    let mode = parse_mode(mode)?;
    let content = load_content(content_dir)?;
    println!("🎮 Playing {} level {}", mode, level_id);

    let run = run_level(&content, mode, level_id, solutions_dir, user_id.unwrap_or("local"))?;

    println!();
    println!("🏁 Score: {}", run.state.score);
    println!("   Lives: {}", run.state.lives);
    println!("   Solved: {}/{}", run.solves.len(), run.state.total_questions);
    if !run.state.achievements.is_empty() {
        let names: Vec<&str> = run
            .state
            .achievements
            .iter()
            .map(|key| {
                content
                    .achievements
                    .iter()
                    .find(|a| a.key == *key)
                    .map(|a| a.name.as_str())
                    .unwrap_or("unknown")
            })
            .collect();
        println!("   Achievements: {}", names.join(", "));
    }

    let Some(user_id) = user_id else {
        return Ok(());
    };
    if run.solves.is_empty() {
        return Ok(());
    }

    let mut conn = connect().await?;
    for payload in &run.solves {
        redis::submit_solution(&mut conn, payload)
            .await
            .with_context(|| format!("Failed to record question {}", payload.question_id))?;
    }
    let stats = redis::get_stats(&mut conn, user_id).await?;
    println!(
        "💾 Recorded {} solve(s) for {}; total {} score: {}",
        run.solves.len(),
        user_id,
        mode,
        stats.mode(mode).total_score
    );
    Ok(())
}
