//! Turn raw backend text into a validated question

use super::output_parser::extract_json_object;
use super::types::{Answer, Difficulty, Question};
use chrono::Utc;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

/// Fewest answer options a question may have
pub const MIN_ANSWERS: usize = 2;

/// Structural defects in a generated question
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("response does not contain a JSON object")]
    InvalidJson,

    #[error("malformed question payload: {0}")]
    Malformed(String),

    #[error("backend was unable to generate a question")]
    UnableToGenerate,

    #[error("question text is empty")]
    EmptyQuestion,

    #[error("expected at least 2 answers, got {0}")]
    TooFewAnswers(usize),

    #[error("answer {0} is empty")]
    EmptyAnswer(usize),

    #[error("{0} answers are marked correct")]
    MultipleCorrect(usize),

    #[error("correct answer index {index} is out of range for {len} answers")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("no answer is marked correct")]
    NoCorrectAnswer,
}

/// Question shape as backends emit it
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
    #[serde(default)]
    question: Option<String>,

    #[serde(default)]
    answers: Vec<RawAnswer>,

    #[serde(default, alias = "correct_answer_index")]
    correct_answer_index: Option<usize>,
}

/// Answers come either as bare strings or as flagged objects
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAnswer {
    Text(String),
    Flagged {
        text: String,
        #[serde(default, rename = "isCorrect", alias = "is_correct")]
        is_correct: bool,
    },
}

/// Normalize raw text into a question
pub fn normalize(
    raw: &str,
    topic: &str,
    difficulty: &Difficulty,
) -> Result<Question, NormalizeError> {
    normalize_with_rng(raw, topic, difficulty, &mut rand::rng())
}

/// Normalize using the given RNG for the answer shuffle
///
/// Flagged answers take precedence over `correctAnswerIndex`; the index is
/// only consulted when no answer carries a flag.
pub fn normalize_with_rng<R: Rng + ?Sized>(
    raw: &str,
    topic: &str,
    difficulty: &Difficulty,
    rng: &mut R,
) -> Result<Question, NormalizeError> {
    let json = extract_json_object(raw).ok_or(NormalizeError::InvalidJson)?;
    let payload: RawQuestion =
        serde_json::from_value(json).map_err(|e| NormalizeError::Malformed(e.to_string()))?;

    let question_text = payload
        .question
        .ok_or(NormalizeError::UnableToGenerate)?
        .trim()
        .to_string();
    if payload.answers.len() < MIN_ANSWERS {
        return Err(NormalizeError::TooFewAnswers(payload.answers.len()));
    }

    if question_text.is_empty() {
        return Err(NormalizeError::EmptyQuestion);
    }

    let mut answers = payload
        .answers
        .into_iter()
        .enumerate()
        .map(|(i, raw)| {
            let (text, is_correct) = match raw {
                RawAnswer::Text(text) => (text, false),
                RawAnswer::Flagged { text, is_correct } => (text, is_correct),
            };
            let text = text.trim();
            if text.is_empty() {
                Err(NormalizeError::EmptyAnswer(i))
            } else {
                Ok(Answer::new(text, is_correct))
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    match answers.iter().filter(|a| a.is_correct).count() {
        0 => {
            let index = payload
                .correct_answer_index
                .ok_or(NormalizeError::NoCorrectAnswer)?;
            let len = answers.len();
            answers
                .get_mut(index)
                .ok_or(NormalizeError::IndexOutOfRange { index, len })?
                .is_correct = true;
        }
        1 => {}
        n => return Err(NormalizeError::MultipleCorrect(n)),
    }

    answers.shuffle(rng);

    let correct_answer_index = answers
        .iter()
        .position(|a| a.is_correct)
        .ok_or(NormalizeError::NoCorrectAnswer)?;

    let now = Utc::now();
    Ok(Question {
        id: Uuid::new_v4(),
        topic: topic.trim().to_string(),
        difficulty: difficulty.clone(),
        question_text,
        answers,
        correct_answer_index,
        created_at: now,
        updated_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const CAPITALS: &str = r#"{"question": "What is the capital of France?", "answers": ["Paris", "Lyon", "Marseille"], "correctAnswerIndex": 0}"#;

    fn assert_single_correct(question: &Question) {
        let correct: Vec<_> = question.answers.iter().filter(|a| a.is_correct).collect();
        assert_eq!(correct.len(), 1);
        assert!(question.answers[question.correct_answer_index].is_correct);
    }

    #[test]
    fn test_capitals_scenario() {
        let question = normalize(CAPITALS, "Capitals", &Difficulty::Easy).unwrap();

        assert_eq!(question.question_text, "What is the capital of France?");
        assert_eq!(question.topic, "Capitals");
        assert_eq!(question.difficulty, Difficulty::Easy);
        assert_eq!(question.answers.len(), 3);
        assert_single_correct(&question);
        assert_eq!(question.correct_answer().text, "Paris");
        assert_eq!(question.created_at, question.updated_at);
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        let raw = r#"{"question": "Pick", "answers": ["a", "b", "c", "d", "e"], "correctAnswerIndex": 3}"#;

        for _ in 0..50 {
            let question = normalize_with_rng(raw, "t", &Difficulty::Medium, &mut rng).unwrap();
            let mut texts: Vec<_> = question.answers.iter().map(|a| a.text.as_str()).collect();
            texts.sort_unstable();
            assert_eq!(texts, vec!["a", "b", "c", "d", "e"]);
            assert_single_correct(&question);
            assert_eq!(question.correct_answer().text, "d");
        }
    }

    #[test]
    fn test_shuffle_moves_answers() {
        let mut rng = StdRng::seed_from_u64(42);
        let raw = r#"{"question": "Pick", "answers": ["a", "b", "c", "d"], "correctAnswerIndex": 0}"#;

        let positions: std::collections::HashSet<usize> = (0..40)
            .map(|_| {
                normalize_with_rng(raw, "t", &Difficulty::Easy, &mut rng)
                    .unwrap()
                    .correct_answer_index
            })
            .collect();
        assert!(positions.len() > 1);
    }

    #[test]
    fn test_trims_text() {
        let raw = r#"{"question": "  Spaced?  ", "answers": [" yes ", "no  "], "correctAnswerIndex": 1}"#;
        let question = normalize(raw, " Trim ", &Difficulty::Easy).unwrap();

        assert_eq!(question.question_text, "Spaced?");
        assert_eq!(question.topic, "Trim");
        assert!(question.answers.iter().all(|a| a.text == "yes" || a.text == "no"));
        assert_eq!(question.correct_answer().text, "no");
    }

    #[test]
    fn test_flagged_answers() {
        let raw = r#"{"question": "2+2?", "answers": [{"text": "3", "isCorrect": false}, {"text": "4", "isCorrect": true}]}"#;
        let question = normalize(raw, "math", &Difficulty::Easy).unwrap();
        assert_eq!(question.correct_answer().text, "4");
    }

    #[test]
    fn test_fenced_response() {
        let raw = format!("```json\n{}\n```", CAPITALS);
        let question = normalize(&raw, "Capitals", &Difficulty::Easy).unwrap();
        assert_eq!(question.correct_answer().text, "Paris");
    }

    #[test]
    fn test_null_question_is_unable_to_generate() {
        let err = normalize(r#"{"question": null}"#, "x", &Difficulty::Hard).unwrap_err();
        assert_eq!(err, NormalizeError::UnableToGenerate);

        let err = normalize(r#"{"answers": ["a", "b"]}"#, "x", &Difficulty::Hard).unwrap_err();
        assert_eq!(err, NormalizeError::UnableToGenerate);
    }

    #[test]
    fn test_not_json() {
        let err = normalize("Sorry, I can't do that.", "x", &Difficulty::Easy).unwrap_err();
        assert_eq!(err, NormalizeError::InvalidJson);
    }

    #[test]
    fn test_too_few_answers() {
        let raw = r#"{"question": "Q?", "answers": ["only"], "correctAnswerIndex": 0}"#;
        let err = normalize(raw, "x", &Difficulty::Easy).unwrap_err();
        assert_eq!(err, NormalizeError::TooFewAnswers(1));

        // Answer count is checked before the question text
        let raw = r#"{"question": "  ", "answers": ["only"], "correctAnswerIndex": 0}"#;
        let err = normalize(raw, "x", &Difficulty::Easy).unwrap_err();
        assert_eq!(err, NormalizeError::TooFewAnswers(1));
    }

    #[test]
    fn test_empty_texts_rejected() {
        let raw = r#"{"question": "   ", "answers": ["a", "b"], "correctAnswerIndex": 0}"#;
        assert_eq!(
            normalize(raw, "x", &Difficulty::Easy).unwrap_err(),
            NormalizeError::EmptyQuestion
        );

        let raw = r#"{"question": "Q?", "answers": ["a", "  "], "correctAnswerIndex": 0}"#;
        assert_eq!(
            normalize(raw, "x", &Difficulty::Easy).unwrap_err(),
            NormalizeError::EmptyAnswer(1)
        );
    }

    #[test]
    fn test_correct_answer_errors() {
        let raw = r#"{"question": "Q?", "answers": ["a", "b"]}"#;
        assert_eq!(
            normalize(raw, "x", &Difficulty::Easy).unwrap_err(),
            NormalizeError::NoCorrectAnswer
        );

        let raw = r#"{"question": "Q?", "answers": ["a", "b"], "correctAnswerIndex": 2}"#;
        assert_eq!(
            normalize(raw, "x", &Difficulty::Easy).unwrap_err(),
            NormalizeError::IndexOutOfRange { index: 2, len: 2 }
        );

        let raw = r#"{"question": "Q?", "answers": [{"text": "a", "isCorrect": true}, {"text": "b", "isCorrect": true}]}"#;
        assert_eq!(
            normalize(raw, "x", &Difficulty::Easy).unwrap_err(),
            NormalizeError::MultipleCorrect(2)
        );
    }

    #[test]
    fn test_malformed_payload() {
        let raw = r#"{"question": "Q?", "answers": "a, b"}"#;
        assert!(matches!(
            normalize(raw, "x", &Difficulty::Easy).unwrap_err(),
            NormalizeError::Malformed(_)
        ));
    }

    #[test]
    fn test_fresh_ids() {
        let a = normalize(CAPITALS, "Capitals", &Difficulty::Easy).unwrap();
        let b = normalize(CAPITALS, "Capitals", &Difficulty::Easy).unwrap();
        assert_ne!(a.id, b.id);
    }
}
