/// Game Session Rules
///
/// Client-side bookkeeping for one play session: score, lives, streak,
/// timer and achievements. Every change goes through `GameState::apply`,
/// which consumes the old state and an event and returns the new state.
/// Nothing here performs I/O.

use crate::types::{AchievementKey, ExecutionOutcome, ExecutionResult, GameMode};

pub const STARTING_LIVES: u32 = 3;
pub const DEFAULT_QUESTION_POINTS: u32 = 50;
pub const ACHIEVEMENT_BONUS: u64 = 50;
/// Quick Fire time bonus is `floor(time_left / TIME_BONUS_WINDOW_SECS * TIME_BONUS_MAX)`
pub const TIME_BONUS_WINDOW_SECS: f64 = 120.0;
pub const TIME_BONUS_MAX: f64 = 25.0;
pub const SPEED_RUN_SECS: f64 = 30.0;
/// Streak length that must already exist before a solve unlocks `streak`
pub const STREAK_THRESHOLD: u32 = 2;

const FAILED_FEEDBACK: &str = "Some test cases failed. Check the results below.";

/// Quick Fire time bonus for the remaining seconds
pub fn time_bonus(mode: GameMode, time_left: u32) -> u32 {
    match mode {
        GameMode::QuickFire => {
            let bonus = (f64::from(time_left) / TIME_BONUS_WINDOW_SECS) * TIME_BONUS_MAX;
            bonus.floor().max(0.0) as u32
        }
        GameMode::Career => 0,
    }
}

/// Points for solving a question, before achievement bonuses
pub fn award_points(mode: GameMode, question_points: Option<u32>, time_left: u32) -> u32 {
    question_points.unwrap_or(DEFAULT_QUESTION_POINTS) + time_bonus(mode, time_left)
}

/// What the last successful check earned; used to build the server submission
#[derive(Debug, Clone, PartialEq)]
pub struct Solve {
    pub question_id: u32,
    pub points: u32,
    pub elapsed_secs: f64,
    pub new_achievements: Vec<AchievementKey>,
    pub hint_used: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    ModeSelected(GameMode),
    LevelSelected {
        level_id: u32,
        total_questions: u32,
        time_limit: Option<u32>,
    },
    QuestionStarted {
        question_id: u32,
        code: String,
    },
    CodeUpdated(String),
    HintUsed,
    /// One second elapsed on the Quick Fire clock
    Tick,
    /// The validator refused the submission; nothing ran
    Rejected { error: String },
    /// The submission ran
    Checked {
        result: ExecutionResult,
        question_points: Option<u32>,
        explanation: String,
        elapsed_secs: f64,
    },
    Skipped,
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub game_mode: Option<GameMode>,
    pub current_level: u32,
    pub current_question: u32,
    pub total_questions: u32,
    pub score: u64,
    pub lives: u32,
    pub time_limit: Option<u32>,
    pub time_left: u32,
    pub achievements: Vec<AchievementKey>,
    pub streak_count: u32,
    pub user_code: String,
    pub test_results: Vec<ExecutionOutcome>,
    pub feedback: String,
    pub is_correct: bool,
    pub hint_used: bool,
    pub attempts: u32,
    pub last_solve: Option<Solve>,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            game_mode: None,
            current_level: 1,
            current_question: 1,
            total_questions: 0,
            score: 0,
            lives: STARTING_LIVES,
            time_limit: None,
            time_left: 0,
            achievements: Vec::new(),
            streak_count: 0,
            user_code: String::new(),
            test_results: Vec::new(),
            feedback: String::new(),
            is_correct: false,
            hint_used: false,
            attempts: 0,
            last_solve: None,
        }
    }
}

impl GameState {
    pub fn new(mode: GameMode) -> Self {
        Self::default().apply(GameEvent::ModeSelected(mode))
    }

    pub fn is_quick_fire(&self) -> bool {
        self.game_mode == Some(GameMode::QuickFire)
    }

    /// Quick Fire ends when the last life is gone
    pub fn is_game_over(&self) -> bool {
        self.is_quick_fire() && self.lives == 0
    }

    pub fn is_level_complete(&self) -> bool {
        self.is_correct && self.current_question >= self.total_questions
    }

    pub fn apply(self, event: GameEvent) -> GameState {
        match event {
            GameEvent::ModeSelected(mode) => GameState {
                game_mode: Some(mode),
                current_level: 1,
                current_question: 1,
                ..self
            },
            GameEvent::LevelSelected {
                level_id,
                total_questions,
                time_limit,
            } => GameState {
                current_level: level_id,
                current_question: 1,
                total_questions,
                time_limit,
                ..self
            },
            GameEvent::QuestionStarted { question_id, code } => {
                let time_left = if self.is_quick_fire() {
                    self.time_limit.unwrap_or(0)
                } else {
                    self.time_left
                };
                GameState {
                    current_question: question_id,
                    user_code: code,
                    feedback: String::new(),
                    is_correct: false,
                    test_results: Vec::new(),
                    hint_used: false,
                    attempts: 0,
                    last_solve: None,
                    time_left,
                    ..self
                }
            }
            GameEvent::CodeUpdated(code) => GameState {
                user_code: code,
                ..self
            },
            GameEvent::HintUsed => GameState {
                hint_used: true,
                ..self
            },
            GameEvent::Tick => self.tick(),
            GameEvent::Rejected { error } => GameState {
                attempts: self.attempts + 1,
                feedback: error,
                is_correct: false,
                test_results: Vec::new(),
                ..self
            },
            GameEvent::Checked {
                result,
                question_points,
                explanation,
                elapsed_secs,
            } => self.checked(result, question_points, explanation, elapsed_secs),
            GameEvent::Skipped => {
                if self.game_mode == Some(GameMode::Career)
                    && self.current_question < self.total_questions
                {
                    GameState {
                        streak_count: 0,
                        current_question: self.current_question + 1,
                        ..self
                    }
                } else {
                    self
                }
            }
            GameEvent::Reset => GameState {
                game_mode: self.game_mode,
                ..GameState::default()
            },
        }
    }

    fn tick(self) -> GameState {
        if !self.is_quick_fire() || self.time_left == 0 {
            return self;
        }
        let time_left = self.time_left - 1;
        let lives = if time_left == 0 {
            self.lives.saturating_sub(1)
        } else {
            self.lives
        };
        GameState {
            time_left,
            lives,
            ..self
        }
    }

    fn checked(
        self,
        result: ExecutionResult,
        question_points: Option<u32>,
        explanation: String,
        elapsed_secs: f64,
    ) -> GameState {
        let attempts_before = self.attempts;
        let attempts = self.attempts + 1;

        if !result.is_solved() {
            let feedback = result
                .error
                .clone()
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| FAILED_FEEDBACK.to_string());
            let lives = if self.is_quick_fire() {
                self.lives.saturating_sub(1)
            } else {
                self.lives
            };
            return GameState {
                attempts,
                feedback,
                is_correct: false,
                test_results: result.results,
                streak_count: 0,
                lives,
                last_solve: None,
                ..self
            };
        }

        let mode = self.game_mode.unwrap_or(GameMode::Career);
        let bonus = time_bonus(mode, self.time_left);
        let points = award_points(mode, question_points, self.time_left);

        let mut earned = Vec::new();
        if elapsed_secs < SPEED_RUN_SECS {
            earned.push(AchievementKey::SpeedRunner);
        }
        if !self.hint_used {
            earned.push(AchievementKey::NoHints);
        }
        if attempts_before == 0 {
            earned.push(AchievementKey::Perfectionist);
        }
        if self.streak_count >= STREAK_THRESHOLD {
            earned.push(AchievementKey::Streak);
        }
        if bonus > 0 {
            earned.push(AchievementKey::TimeBonus);
        }
        earned.retain(|key| !self.achievements.contains(key));

        let mut achievements = self.achievements;
        achievements.extend(earned.iter().copied());
        let score =
            self.score + u64::from(points) + ACHIEVEMENT_BONUS * earned.len() as u64;

        GameState {
            attempts,
            score,
            achievements,
            streak_count: self.streak_count + 1,
            feedback: format!("Perfect! {}", explanation),
            is_correct: true,
            test_results: result.results,
            last_solve: Some(Solve {
                question_id: self.current_question,
                points,
                elapsed_secs,
                new_achievements: earned,
                hint_used: self.hint_used,
            }),
            ..self
        }
    }
}
