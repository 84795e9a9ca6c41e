use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Game mode a level or question belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameMode {
    #[serde(rename = "quickFire")]
    QuickFire,
    #[serde(rename = "career")]
    Career,
}

impl GameMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "quickFire" => Some(GameMode::QuickFire),
            "career" => Some(GameMode::Career),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::QuickFire => "quickFire",
            GameMode::Career => "career",
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

/// One (input, expected, description) triple a submission is checked against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Positional arguments, spread into the entry point
    pub input: Vec<Value>,
    pub expected: Value,
    #[serde(default)]
    pub description: String,
}

/// What happened when a single test case ran
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub input: Vec<Value>,
    pub expected: Value,
    /// `None` when the returned value has no JSON form (undefined, functions, symbols, bigints)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<Value>,
    pub passed: bool,
    pub description: String,
}

/// Aggregate result of running a submission against its test cases
///
/// `success == false` means the submission could not be evaluated (or a case
/// faulted at runtime); `all_passed == false` with `success == true` means it
/// ran but at least one case mismatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    pub all_passed: bool,
    pub results: Vec<ExecutionOutcome>,
    pub error: Option<String>,
}

impl ExecutionResult {
    /// Structural failure: nothing ran, no outcomes
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            all_passed: false,
            results: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_solved(&self) -> bool {
        self.success && self.all_passed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationVerdict {
    pub fn accepted() -> Self {
        Self { valid: true, error: None }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
        }
    }
}

/// Points at one question in the content store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRef {
    pub game_mode: GameMode,
    pub level_id: u32,
    pub question_id: u32,
}

/// Queued request to validate and run a submission
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckJob {
    pub id: Uuid,
    pub source_code: String,
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub is_async: bool,
    #[serde(default)]
    pub question: Option<QuestionRef>,
}

/// Validation verdict plus, when the source was accepted, its execution result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReport {
    pub job_id: Uuid,
    pub verdict: ValidationVerdict,
    #[serde(default)]
    pub execution: Option<ExecutionResult>,
}

impl CheckReport {
    pub fn is_solved(&self) -> bool {
        self.verdict.valid && self.execution.as_ref().is_some_and(ExecutionResult::is_solved)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    pub level_id: u32,
    pub game_mode: GameMode,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub category: Option<String>,
    pub points: u32,
    /// Seconds; Quick Fire only
    #[serde(default)]
    pub time_limit: Option<u32>,
    #[serde(default)]
    pub question_ids: Vec<u32>,
    #[serde(default)]
    pub prerequisites: Vec<u32>,
    pub order: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub unlocked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question_id: u32,
    pub level_id: u32,
    pub game_mode: GameMode,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub category: Option<String>,
    pub broken_code: String,
    pub fixed_code: String,
    pub test_cases: Vec<TestCase>,
    pub hint: String,
    pub explanation: String,
    pub points: u32,
    #[serde(default)]
    pub is_async: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Question {
    pub fn reference(&self) -> QuestionRef {
        QuestionRef {
            game_mode: self.game_mode,
            level_id: self.level_id,
            question_id: self.question_id,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AchievementKey {
    #[serde(rename = "speedRunner")]
    SpeedRunner,
    #[serde(rename = "noHints")]
    NoHints,
    #[serde(rename = "perfectionist")]
    Perfectionist,
    #[serde(rename = "streak")]
    Streak,
    #[serde(rename = "allLevels")]
    AllLevels,
    #[serde(rename = "timeBonus")]
    TimeBonus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

/// Achievement catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Achievement {
    pub key: AchievementKey,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub category: String,
    pub points: u32,
    pub rarity: Rarity,
}

/// Per-question progress for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub user_id: String,
    pub game_mode: GameMode,
    pub level_id: u32,
    pub question_id: u32,
    pub attempts: u32,
    pub completed: bool,
    pub score: u32,
    /// Seconds, accumulated across completions
    pub time_spent: u64,
    pub hints_used: u32,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub solution: Option<String>,
}

impl UserProgress {
    pub fn new(user_id: &str, question: QuestionRef) -> Self {
        Self {
            user_id: user_id.to_string(),
            game_mode: question.game_mode,
            level_id: question.level_id,
            question_id: question.question_id,
            attempts: 0,
            completed: false,
            score: 0,
            time_spent: 0,
            hints_used: 0,
            completed_at: None,
            solution: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeStats {
    pub max_level: u32,
    pub max_question: u32,
    pub total_score: u64,
    #[serde(default)]
    pub achievements: Vec<AchievementKey>,
    #[serde(default)]
    pub completed_levels: Vec<u32>,
    /// Career only; Quick Fire levels are always open
    #[serde(default)]
    pub unlocked_levels: Vec<u32>,
}

impl ModeStats {
    pub fn new(mode: GameMode) -> Self {
        Self {
            max_level: 1,
            max_question: 1,
            total_score: 0,
            achievements: Vec::new(),
            completed_levels: Vec::new(),
            unlocked_levels: match mode {
                GameMode::Career => vec![1],
                GameMode::QuickFire => Vec::new(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub quick_fire: ModeStats,
    pub career: ModeStats,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            quick_fire: ModeStats::new(GameMode::QuickFire),
            career: ModeStats::new(GameMode::Career),
        }
    }
}

impl PlayerStats {
    pub fn mode(&self, mode: GameMode) -> &ModeStats {
        match mode {
            GameMode::QuickFire => &self.quick_fire,
            GameMode::Career => &self.career,
        }
    }

    pub fn mode_mut(&mut self, mode: GameMode) -> &mut ModeStats {
        match mode {
            GameMode::QuickFire => &mut self.quick_fire,
            GameMode::Career => &mut self.career,
        }
    }
}

/// A solved question reported by the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub user_id: String,
    pub game_mode: GameMode,
    pub level_id: u32,
    pub question_id: u32,
    pub code: String,
    pub score: u32,
    pub time_spent: u64,
    #[serde(default)]
    pub hints_used: u32,
    #[serde(default)]
    pub achievements: Vec<AchievementKey>,
}

impl SubmissionPayload {
    pub fn question(&self) -> QuestionRef {
        QuestionRef {
            game_mode: self.game_mode,
            level_id: self.level_id,
            question_id: self.question_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub progress: UserProgress,
    pub updated_stats: PlayerStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: String,
    pub score: u64,
    pub level: u32,
    pub achievements: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_game_mode_wire_names() {
        assert_eq!(serde_json::to_value(GameMode::QuickFire).unwrap(), json!("quickFire"));
        assert_eq!(GameMode::from_str("career"), Some(GameMode::Career));
        assert_eq!(GameMode::from_str("Career"), None);
    }

    #[test]
    fn test_execution_result_uses_camel_case() {
        let result = ExecutionResult::failure("No function found in code");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["allPassed"], json!(false));
        assert_eq!(value["results"], json!([]));
        assert_eq!(value["error"], json!("No function found in code"));
    }

    #[test]
    fn test_undefined_actual_is_omitted() {
        let outcome = ExecutionOutcome {
            input: vec![],
            expected: json!(1),
            actual: None,
            passed: false,
            description: String::new(),
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert!(value.get("actual").is_none());
    }

    #[test]
    fn test_career_starts_with_first_level_unlocked() {
        let stats = PlayerStats::default();
        assert_eq!(stats.career.unlocked_levels, vec![1]);
        assert!(stats.quick_fire.unlocked_levels.is_empty());
    }

    #[test]
    fn test_question_parses_seed_shape() {
        let question: Question = serde_json::from_value(json!({
            "questionId": 1,
            "levelId": 1,
            "gameMode": "career",
            "title": "Function Declaration Syntax",
            "description": "d",
            "difficulty": "Beginner",
            "brokenCode": "function calculateSum(a, b { return a + b; }",
            "fixedCode": "function calculateSum(a, b) { return a + b; }",
            "testCases": [{ "input": [5, 3], "expected": 8, "description": "adds" }],
            "hint": "h",
            "explanation": "e",
            "points": 40
        }))
        .unwrap();
        assert!(question.is_active);
        assert!(!question.is_async);
        assert_eq!(question.test_cases[0].input, vec![json!(5), json!(3)]);
    }
}
