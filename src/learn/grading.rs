//! Quiz grading: correctness, score, letter grade, points and badges.
//!
//! Everything here is pure. The caller loads the quiz, the learner's badges and
//! the attempt history, grades, and only then persists the outcome.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::types::{Grade, ProgressStatus, Question, QuizAttempt, SubmittedAnswers};

pub const QUIZ_MASTER: &str = "Quiz Master";
pub const PERFECT_SCORE: &str = "Perfect Score";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GradingError {
    #[error("quiz has no questions, score is undefined")]
    DivisionUndefined,
    #[error("{0}")]
    ValidationFailed(String),
}

/// Resolves a submission into one optional option index per question.
///
/// Text answers that match no option become `None` and are graded as wrong.
/// Only shape problems (too many answers, bad keys) are errors.
pub fn normalize_answers(
    questions: &[Question],
    answers: &SubmittedAnswers,
) -> Result<Vec<Option<usize>>, GradingError> {
    match answers {
        SubmittedAnswers::Positional(values) => {
            if values.len() > questions.len() {
                return Err(GradingError::ValidationFailed(format!(
                    "submitted {} answers for a quiz with {} questions",
                    values.len(),
                    questions.len()
                )));
            }
            Ok(questions
                .iter()
                .enumerate()
                .map(|(i, question)| {
                    values
                        .get(i)
                        .and_then(|value| value.as_ref())
                        .and_then(|value| value.resolve(&question.options))
                })
                .collect())
        }
        SubmittedAnswers::Sparse(values) => {
            let mut resolved = vec![None; questions.len()];
            let mut seen = BTreeSet::new();
            for (key, value) in values {
                let index: usize = key.trim().parse().map_err(|_| {
                    GradingError::ValidationFailed(format!(
                        "answer key \"{key}\" is not a question index"
                    ))
                })?;
                let question = questions.get(index).ok_or_else(|| {
                    GradingError::ValidationFailed(format!("no question at index {index}"))
                })?;
                if !seen.insert(index) {
                    return Err(GradingError::ValidationFailed(format!(
                        "question {index} is answered more than once"
                    )));
                }
                resolved[index] = value
                    .as_ref()
                    .and_then(|value| value.resolve(&question.options));
            }
            Ok(resolved)
        }
    }
}

/// `round(100 * correct / total)` with halves rounded up, in integer math.
pub fn score_from_counts(correct: usize, total: usize) -> Result<u8, GradingError> {
    if total == 0 {
        return Err(GradingError::DivisionUndefined);
    }
    let correct = correct.min(total);
    let score = (200 * correct + total) / (2 * total);
    Ok(score as u8)
}

pub fn points_for_score(score: u8) -> u32 {
    (u32::from(score) + 5) / 10
}

/// What a badge predicate gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct BadgeContext<'a> {
    pub score: u8,
    /// Attempts recorded on this topic before the one being graded.
    pub previous_attempts: &'a [QuizAttempt],
}

type BadgePredicate = Arc<dyn Fn(&BadgeContext<'_>) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct BadgeRule {
    pub label: String,
    predicate: BadgePredicate,
}

impl BadgeRule {
    pub fn new<F>(label: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&BadgeContext<'_>) -> bool + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn applies(&self, ctx: &BadgeContext<'_>) -> bool {
        (self.predicate)(ctx)
    }
}

impl std::fmt::Debug for BadgeRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BadgeRule")
            .field("label", &self.label)
            .finish()
    }
}

/// Ordered badge rules. Award order follows rule order.
#[derive(Debug, Clone)]
pub struct BadgeRules {
    rules: Vec<BadgeRule>,
}

impl Default for BadgeRules {
    fn default() -> Self {
        Self::empty()
            .with_rule(BadgeRule::new(QUIZ_MASTER, |ctx| ctx.score >= 90))
            .with_rule(BadgeRule::new(PERFECT_SCORE, |ctx| ctx.score == 100))
    }
}

impl BadgeRules {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_rule(mut self, rule: BadgeRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Labels earned by `ctx` that are not already in `held`, each at most once.
    pub fn award(&self, ctx: &BadgeContext<'_>, held: &BTreeSet<String>) -> Vec<String> {
        let mut awarded: Vec<String> = Vec::new();
        for rule in &self.rules {
            if held.contains(&rule.label) || awarded.contains(&rule.label) {
                continue;
            }
            if rule.applies(ctx) {
                awarded.push(rule.label.clone());
            }
        }
        awarded
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeReport {
    pub score: u8,
    pub grade: Grade,
    pub status: ProgressStatus,
    pub correct_count: usize,
    pub total_questions: usize,
    pub points_earned: u32,
    pub new_badges: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GradingEngine {
    badges: BadgeRules,
}

impl GradingEngine {
    pub fn new(badges: BadgeRules) -> Self {
        Self { badges }
    }

    /// Grades normalized `answers` against `questions`.
    ///
    /// `held_badges` and `history` are the learner's state before this attempt.
    pub fn grade(
        &self,
        questions: &[Question],
        answers: &[Option<usize>],
        held_badges: &BTreeSet<String>,
        history: &[QuizAttempt],
    ) -> Result<GradeReport, GradingError> {
        let total_questions = questions.len();
        let correct_count = questions
            .iter()
            .enumerate()
            .filter(|(i, question)| {
                answers.get(*i).copied().flatten() == Some(question.correct_answer)
            })
            .count();

        let score = score_from_counts(correct_count, total_questions)?;
        let ctx = BadgeContext {
            score,
            previous_attempts: history,
        };

        Ok(GradeReport {
            score,
            grade: Grade::from_score(score),
            status: ProgressStatus::from_score(score),
            correct_count,
            total_questions,
            points_earned: points_for_score(score),
            new_badges: self.badges.award(&ctx, held_badges),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learn::types::AnswerValue;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn question(correct: usize) -> Question {
        Question {
            question: format!("Question with answer {correct}"),
            options: vec!["a".into(), "b".into(), "c".into()],
            correct_answer: correct,
        }
    }

    fn three_question_quiz() -> Vec<Question> {
        vec![question(0), question(1), question(0)]
    }

    #[test]
    fn test_grade_boundaries() {
        let cases = [
            (59, Grade::F),
            (60, Grade::D),
            (69, Grade::D),
            (70, Grade::C),
            (79, Grade::C),
            (80, Grade::B),
            (89, Grade::B),
            (90, Grade::A),
            (100, Grade::A),
        ];
        for (score, expected) in cases {
            assert_eq!(Grade::from_score(score), expected, "score {score}");
        }
    }

    #[test]
    fn test_two_of_three_correct() {
        let engine = GradingEngine::default();
        let report = engine
            .grade(
                &three_question_quiz(),
                &[Some(0), Some(1), Some(1)],
                &BTreeSet::new(),
                &[],
            )
            .unwrap();

        assert_eq!(report.correct_count, 2);
        assert_eq!(report.total_questions, 3);
        assert_eq!(report.score, 67);
        assert_eq!(report.grade, Grade::D);
        assert_eq!(report.status, ProgressStatus::InProgress);
        assert_eq!(report.points_earned, 7);
        assert!(report.new_badges.is_empty());
    }

    #[test]
    fn test_perfect_submission_awards_both_badges() {
        let engine = GradingEngine::default();
        let report = engine
            .grade(
                &three_question_quiz(),
                &[Some(0), Some(1), Some(0)],
                &BTreeSet::new(),
                &[],
            )
            .unwrap();

        assert_eq!(report.score, 100);
        assert_eq!(report.grade, Grade::A);
        assert_eq!(report.status, ProgressStatus::Completed);
        assert_eq!(report.points_earned, 10);
        assert_eq!(report.new_badges, vec![QUIZ_MASTER, PERFECT_SCORE]);
    }

    #[test]
    fn test_held_badges_are_not_awarded_again() {
        let engine = GradingEngine::default();
        let held: BTreeSet<String> = [QUIZ_MASTER.to_string()].into_iter().collect();
        let report = engine
            .grade(&three_question_quiz(), &[Some(0), Some(1), Some(0)], &held, &[])
            .unwrap();

        assert_eq!(report.new_badges, vec![PERFECT_SCORE]);
    }

    #[test]
    fn test_grading_is_idempotent() {
        let engine = GradingEngine::default();
        let quiz = three_question_quiz();
        let answers = [Some(0), None, Some(0)];
        let first = engine.grade(&quiz, &answers, &BTreeSet::new(), &[]).unwrap();
        let second = engine.grade(&quiz, &answers, &BTreeSet::new(), &[]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_answers_count_as_wrong() {
        let engine = GradingEngine::default();
        let report = engine
            .grade(&three_question_quiz(), &[Some(0)], &BTreeSet::new(), &[])
            .unwrap();
        assert_eq!(report.correct_count, 1);
        assert_eq!(report.score, 33);
        assert_eq!(report.points_earned, 3);
    }

    #[test]
    fn test_empty_quiz_is_division_undefined() {
        let engine = GradingEngine::default();
        let err = engine.grade(&[], &[], &BTreeSet::new(), &[]).unwrap_err();
        assert_eq!(err, GradingError::DivisionUndefined);
    }

    #[test]
    fn test_score_rounds_half_up() {
        // 1 of 8 is 12.5
        assert_eq!(score_from_counts(1, 8).unwrap(), 13);
        assert_eq!(score_from_counts(1, 3).unwrap(), 33);
        assert_eq!(score_from_counts(0, 4).unwrap(), 0);
        assert_eq!(points_for_score(65), 7);
        assert_eq!(points_for_score(64), 6);
    }

    #[test]
    fn test_text_answers_match_case_insensitively() {
        let quiz = three_question_quiz();
        let answers = SubmittedAnswers::Positional(vec![
            Some(AnswerValue::Text(" A ".into())),
            Some(AnswerValue::Text("B".into())),
            Some(AnswerValue::Text("zzz".into())),
        ]);
        let resolved = normalize_answers(&quiz, &answers).unwrap();
        assert_eq!(resolved, vec![Some(0), Some(1), None]);
    }

    #[test]
    fn test_sparse_answers() {
        let quiz = three_question_quiz();
        let mut map = BTreeMap::new();
        map.insert("2".to_string(), Some(AnswerValue::Index(0)));
        map.insert("0".to_string(), None);
        let resolved = normalize_answers(&quiz, &SubmittedAnswers::Sparse(map)).unwrap();
        assert_eq!(resolved, vec![None, None, Some(0)]);
    }

    #[test]
    fn test_sparse_null_counts_as_incorrect() {
        let quiz = three_question_quiz();
        let mut map = BTreeMap::new();
        map.insert("0".to_string(), Some(AnswerValue::Index(0)));
        map.insert("1".to_string(), None);
        let resolved = normalize_answers(&quiz, &SubmittedAnswers::Sparse(map)).unwrap();
        assert_eq!(resolved, vec![Some(0), None, None]);

        let report = GradingEngine::default()
            .grade(&quiz, &resolved, &BTreeSet::new(), &[])
            .unwrap();
        assert_eq!(report.correct_count, 1);
        assert_eq!(report.total_questions, 3);
    }

    #[test]
    fn test_sparse_keys_resolving_to_same_question_are_rejected() {
        let quiz = three_question_quiz();
        let mut map = BTreeMap::new();
        map.insert("1".to_string(), Some(AnswerValue::Index(1)));
        map.insert("01".to_string(), Some(AnswerValue::Index(0)));
        assert_eq!(
            normalize_answers(&quiz, &SubmittedAnswers::Sparse(map)),
            Err(GradingError::ValidationFailed(
                "question 1 is answered more than once".into()
            ))
        );
    }

    #[test]
    fn test_malformed_submissions_fail_validation() {
        let quiz = three_question_quiz();

        let too_many = SubmittedAnswers::Positional(vec![Some(AnswerValue::Index(0)); 4]);
        assert!(matches!(
            normalize_answers(&quiz, &too_many),
            Err(GradingError::ValidationFailed(_))
        ));

        let mut bad_key = BTreeMap::new();
        bad_key.insert("first".to_string(), Some(AnswerValue::Index(0)));
        assert!(matches!(
            normalize_answers(&quiz, &SubmittedAnswers::Sparse(bad_key)),
            Err(GradingError::ValidationFailed(_))
        ));

        let mut out_of_range = BTreeMap::new();
        out_of_range.insert("7".to_string(), Some(AnswerValue::Index(0)));
        assert!(matches!(
            normalize_answers(&quiz, &SubmittedAnswers::Sparse(out_of_range)),
            Err(GradingError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_custom_rule_sees_attempt_history() {
        let rules = BadgeRules::default().with_rule(BadgeRule::new("Persistent", |ctx| {
            ctx.previous_attempts.len() >= 2
        }));
        let engine = GradingEngine::new(rules);
        let attempt = QuizAttempt {
            quiz_id: Uuid::new_v4(),
            score: 10,
            attempted_at: Utc::now(),
        };

        let first = engine
            .grade(&three_question_quiz(), &[None], &BTreeSet::new(), &[attempt.clone()])
            .unwrap();
        assert!(first.new_badges.is_empty());

        let third = engine
            .grade(
                &three_question_quiz(),
                &[None],
                &BTreeSet::new(),
                &[attempt.clone(), attempt],
            )
            .unwrap();
        assert_eq!(third.new_badges, vec!["Persistent"]);
    }

    #[test]
    fn test_duplicate_rule_labels_award_once() {
        let rules = BadgeRules::empty()
            .with_rule(BadgeRule::new("Star", |ctx| ctx.score > 0))
            .with_rule(BadgeRule::new("Star", |ctx| ctx.score > 50));
        let awarded = rules.award(
            &BadgeContext {
                score: 80,
                previous_attempts: &[],
            },
            &BTreeSet::new(),
        );
        assert_eq!(awarded, vec!["Star"]);
    }
}
