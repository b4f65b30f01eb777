// src/grading.rs
//
// Pure scoring engine. Grading is a function of the answer keys and the
// submitted answers alone; persistence lives in the attempts handler.

use std::collections::{HashMap, HashSet};

/// Answer key for one question: the set of option ids flagged correct.
#[derive(Debug, Clone)]
pub struct AnswerKey {
    pub question_id: i64,
    pub correct: HashSet<i64>,
}

/// One graded question: what was selected and whether it matched the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedQuestion {
    pub question_id: i64,
    pub selected: Vec<i64>,
    pub is_correct: bool,
}

/// Aggregate grading result for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeOutcome {
    /// Percentage score in [0, 100].
    pub score: i64,
    pub total_questions: i64,
    pub correct_answers: i64,
    pub questions: Vec<GradedQuestion>,
}

/// Scores a submission against the answer keys.
///
/// A question is correct only when the submitted option set equals the
/// correct set exactly; a proper subset or superset earns nothing.
/// Questions absent from `answers` are graded against the empty set.
/// A question whose key has no correct options is malformed data and is
/// always scored incorrect, so bad content can never award free points.
pub fn grade(keys: &[AnswerKey], answers: &HashMap<i64, Vec<i64>>) -> GradeOutcome {
    let mut questions = Vec::with_capacity(keys.len());
    let mut correct_answers = 0i64;

    for key in keys {
        let submitted: HashSet<i64> = answers
            .get(&key.question_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();

        let is_correct = !key.correct.is_empty() && submitted == key.correct;
        if is_correct {
            correct_answers += 1;
        }

        let mut selected: Vec<i64> = submitted.into_iter().collect();
        selected.sort_unstable();

        questions.push(GradedQuestion {
            question_id: key.question_id,
            selected,
            is_correct,
        });
    }

    let total_questions = keys.len() as i64;
    let score = if total_questions == 0 {
        0
    } else {
        (correct_answers as f64 / total_questions as f64 * 100.0).round() as i64
    };

    GradeOutcome {
        score,
        total_questions,
        correct_answers,
        questions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(question_id: i64, correct: &[i64]) -> AnswerKey {
        AnswerKey {
            question_id,
            correct: correct.iter().copied().collect(),
        }
    }

    #[test]
    fn all_single_choice_correct_scores_100() {
        let keys: Vec<AnswerKey> = (1..=5).map(|q| key(q, &[q * 10])).collect();
        let answers: HashMap<i64, Vec<i64>> = (1..=5).map(|q| (q, vec![q * 10])).collect();

        let outcome = grade(&keys, &answers);
        assert_eq!(outcome.score, 100);
        assert_eq!(outcome.correct_answers, 5);
        assert_eq!(outcome.total_questions, 5);
        assert!(outcome.questions.iter().all(|q| q.is_correct));
    }

    #[test]
    fn no_answers_scores_0() {
        let keys: Vec<AnswerKey> = (1..=5).map(|q| key(q, &[q * 10])).collect();

        let outcome = grade(&keys, &HashMap::new());
        assert_eq!(outcome.score, 0);
        assert_eq!(outcome.correct_answers, 0);
        assert_eq!(outcome.total_questions, 5);
    }

    #[test]
    fn subset_and_superset_are_incorrect() {
        let keys = vec![key(1, &[10, 11])];

        for submitted in [vec![10], vec![10, 11, 12]] {
            let answers = HashMap::from([(1, submitted)]);
            let outcome = grade(&keys, &answers);
            assert_eq!(outcome.correct_answers, 0, "partial credit must not exist");
        }

        let answers = HashMap::from([(1, vec![11, 10])]);
        let outcome = grade(&keys, &answers);
        assert_eq!(outcome.correct_answers, 1);
        assert_eq!(outcome.score, 100);
    }

    #[test]
    fn score_is_rounded_and_bounded() {
        let keys: Vec<AnswerKey> = (1..=3).map(|q| key(q, &[q])).collect();
        let answers = HashMap::from([(1, vec![1]), (2, vec![2])]);

        let outcome = grade(&keys, &answers);
        // 2/3 rounds to 67
        assert_eq!(outcome.score, 67);
        assert!(outcome.score >= 0 && outcome.score <= 100);
        assert!(outcome.correct_answers <= outcome.total_questions);
    }

    #[test]
    fn empty_test_scores_0_without_dividing() {
        let outcome = grade(&[], &HashMap::new());
        assert_eq!(outcome.score, 0);
        assert_eq!(outcome.total_questions, 0);
    }

    #[test]
    fn question_without_correct_options_never_awards_credit() {
        let keys = vec![key(1, &[])];

        let outcome = grade(&keys, &HashMap::new());
        assert_eq!(outcome.correct_answers, 0);

        let answers = HashMap::from([(1, vec![])]);
        let outcome = grade(&keys, &answers);
        assert_eq!(outcome.correct_answers, 0);
    }

    #[test]
    fn grading_is_deterministic() {
        let keys = vec![key(1, &[10, 11]), key(2, &[20])];
        let answers = HashMap::from([(1, vec![10, 11]), (2, vec![21])]);

        let first = grade(&keys, &answers);
        let second = grade(&keys, &answers);
        assert_eq!(first, second);
        assert_eq!(first.score, 50);
    }

    #[test]
    fn duplicate_selections_collapse_to_a_set() {
        let keys = vec![key(1, &[10])];
        let answers = HashMap::from([(1, vec![10, 10])]);

        let outcome = grade(&keys, &answers);
        assert_eq!(outcome.correct_answers, 1);
        assert_eq!(outcome.questions[0].selected, vec![10]);
    }
}
